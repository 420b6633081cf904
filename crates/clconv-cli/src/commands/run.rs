//! Run command
//!
//! Builds the effective [`RunConfig`] (file, then flags) and executes it on
//! the selected backend.

use anyhow::{bail, Result};
use clconv_compute::{run_with_backend, RunConfig};
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use crate::RunArgs;

/// Configuration from `--config` (or defaults) with flag overrides applied.
pub fn effective_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => RunConfig::default(),
    };

    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(kernel) = &args.kernel {
        config.kernel_path = kernel.clone();
    }
    if let Some(entry) = &args.entry {
        config.entry = entry.clone();
    }
    if let Some(device) = args.device {
        config.device_class = device.into();
    }
    if let Some(local) = &args.local {
        match local.as_slice() {
            &[x, y] => config.local_size = [x, y],
            other => bail!("--local takes two values (e.g. 16,16), got {}", other.len()),
        }
    }
    if let Some(codec) = args.codec {
        config.codec = codec;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if args.host_float {
        config.host_float = true;
    }

    config.validate()?;
    Ok(config)
}

pub fn run(args: RunArgs, verbose: u8) -> Result<()> {
    let config = effective_config(&args)?;
    trace!(?config, "run::run");

    if args.dump_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    if verbose > 0 {
        println!(
            "Filtering {} with {}:{}",
            config.input.display(),
            config.kernel_path.display(),
            config.entry
        );
    }

    let input = config.input.clone();
    let report = run_with_backend(config)?;
    info!(device = %report.device, "run finished");

    println!(
        "{} -> {} ({}x{}, global {}x{}, local {}x{}) on {} [{}]",
        input.display(),
        report.output.display(),
        report.width,
        report.height,
        report.work.global[0],
        report.work.global[1],
        report.work.local[0],
        report.work.local[1],
        report.device,
        report.backend,
    );
    Ok(())
}
