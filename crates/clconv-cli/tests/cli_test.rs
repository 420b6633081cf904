//! Runs the `clconv` binary end to end on the host backend.

use std::path::PathBuf;
use std::process::Command;

use clconv_core::RgbaImage;
use clconv_io::{ImageCodec, NativeCodec};

fn clconv() -> Command {
    Command::new(env!("CARGO_BIN_EXE_clconv"))
}

fn kernel(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../kernels").join(name)
}

#[test]
fn test_identity_run_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rgba.png");
    let output = dir.path().join("outRGBA.png");
    let image = RgbaImage::filled(17, 9, [0, 0, 0, 255]).unwrap();
    NativeCodec::new().save(&input, &image).unwrap();

    let out = clconv()
        .args(["run", "-b", "cpu", "-e", "identity", "-o"])
        .arg(&output)
        .arg("-k")
        .arg(kernel("identity.cl"))
        .arg(&input)
        .output()
        .unwrap();

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("global 32x16"));
    assert_eq!(NativeCodec::new().load(&output).unwrap(), image);
}

#[test]
fn test_build_failure_exit_code_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.cl");
    std::fs::write(&bad, "__kernel void identity(image2d_t in) {\n").unwrap();

    let out = clconv()
        .args(["run", "-b", "cpu", "-e", "identity", "-k"])
        .arg(&bad)
        .arg(dir.path().join("in.png"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(15));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("program build failed"), "{stderr}");
    assert!(stderr.contains("CL_BUILD_PROGRAM_FAILURE"), "{stderr}");
    assert!(stderr.contains("error:"), "{stderr}");
}

#[test]
fn test_missing_input_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let out = clconv()
        .args(["run", "-b", "cpu", "-k"])
        .arg(kernel("sobel.cl"))
        .arg(dir.path().join("missing.png"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(23));
}

#[test]
fn test_devices_lists_host_runtime() {
    let out = clconv().args(["devices", "--formats"]).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("[+] CPU"));
    assert!(stdout.contains("clconv host accelerator"));
    assert!(stdout.contains("CL_RGBA / CL_UNORM_INT8"));
}
