#![forbid(unsafe_code)]

use std::process::Command;

#[test]
fn cli_help_lists_source_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_st_viewer"))
        .arg("--help")
        .output()
        .expect("run st_viewer --help");
    assert!(
        output.status.success(),
        "expected zero exit (stderr={})",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--port", "--data-dir", "--personas-dir", "--ideas-db"] {
        assert!(stdout.contains(flag), "help must mention {flag}");
    }
}

#[test]
fn cli_version_includes_pkg_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_st_viewer"))
        .arg("--version")
        .output()
        .expect("run st_viewer --version");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
