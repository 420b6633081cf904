//! clconv - one-shot accelerator image convolution
//!
//! Loads an image, runs one filter kernel over it on a compute device and
//! writes the result. Exits with a stage-specific code on failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clconv_compute::{Backend, ComputeError};
use clconv_core::DeviceClass;
use clconv_io::CodecKind;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "clconv")]
#[command(author, version, about = "One-shot accelerator image convolution")]
#[command(long_about = "
Runs a single image filter kernel on a compute device.

Examples:
  clconv run                                   # rgba.png -> outRGBA.png, Sobel
  clconv run photo.png -o edges.png
  clconv run photo.png -o copy.png -k kernels/identity.cl -e identity
  clconv run --config run.yaml --device cpu
  clconv devices --formats
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter an image with a kernel
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// List backends and devices
    #[command(visible_alias = "d")]
    Devices(DevicesArgs),
}

/// Device class on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeviceArg {
    /// GPU or other accelerator
    #[value(alias = "gpu")]
    Accelerator,
    /// General-purpose processor
    #[value(name = "cpu", alias = "general-purpose")]
    GeneralPurpose,
}

impl From<DeviceArg> for DeviceClass {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Accelerator => DeviceClass::Accelerator,
            DeviceArg::GeneralPurpose => DeviceClass::GeneralPurpose,
        }
    }
}

#[derive(Args)]
struct RunArgs {
    /// Input image [default: rgba.png]
    input: Option<PathBuf>,

    /// Output image [default: outRGBA.png]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// YAML run configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Kernel source file [default: kernels/sobel.cl]
    #[arg(short, long)]
    kernel: Option<PathBuf>,

    /// Kernel entry point [default: sobel]
    #[arg(short, long)]
    entry: Option<String>,

    /// Device class
    #[arg(short, long, value_enum)]
    device: Option<DeviceArg>,

    /// Local work-group size, e.g. 16,16
    #[arg(short, long, value_delimiter = ',')]
    local: Option<Vec<usize>>,

    /// Image codec (native, third-party)
    #[arg(long)]
    codec: Option<CodecKind>,

    /// Compute backend (auto, cpu, opencl)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Round-trip the result through normalized floats on the host
    #[arg(long)]
    host_float: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

#[derive(Args)]
struct DevicesArgs {
    /// Also list supported 2D image formats per device
    #[arg(short, long)]
    formats: bool,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for a failed command: the stage code for compute errors, 1
/// otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ComputeError>().map_or(1, ComputeError::exit_code)
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ComputeError>() {
        Some(compute) => {
            eprintln!("clconv: {} failed", compute.stage());
            if let Some(status) = compute.status() {
                eprintln!("  status: {status}");
            }
            match compute.build_log() {
                Some(log) => eprintln!("  build log:\n{log}"),
                None => eprintln!("  {err:#}"),
            }
        }
        None => eprintln!("clconv: {err:#}"),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.verbose),
        Commands::Devices(args) => commands::devices::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}
