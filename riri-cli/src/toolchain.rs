//! Invoking the host C++ compiler on generated code.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Output};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

const QT_PACKAGES: &[&str] = &["Qt6Widgets", "Qt6Core", "Qt6Gui"];

pub struct Toolchain {
    pub cxx: String,
    pub optimize: bool,
    pub gui: bool,
}

impl Toolchain {
    /// Compile `cpp` into the executable `exe`.
    pub fn compile(&self, cpp: &Path, exe: &Path) -> Result<()> {
        let qt = if self.gui { qt_flags() } else { Vec::new() };
        let args = compiler_args(cpp, exe, self.optimize, &qt);
        debug!(cxx = %self.cxx, ?args, "invoking C++ compiler");

        let status = Command::new(&self.cxx)
            .args(&args)
            .status()
            .with_context(|| format!("failed to launch C++ compiler `{}`", self.cxx))?;
        if !status.success() {
            bail!("C++ compilation of {} failed ({status})", cpp.display());
        }
        Ok(())
    }
}

/// `-std=c++20 -O3|-O0 <cpp> -o <exe> -lpthread [qt flags]`
pub fn compiler_args(cpp: &Path, exe: &Path, optimize: bool, qt: &[String]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-std=c++20".into(),
        if optimize { "-O3" } else { "-O0" }.into(),
        cpp.into(),
        "-o".into(),
        exe.into(),
        "-lpthread".into(),
    ];
    args.extend(qt.iter().map(OsString::from));
    args
}

/// Compiler and linker flags for Qt, or nothing if pkg-config can't find it.
fn qt_flags() -> Vec<String> {
    let output = Command::new("pkg-config")
        .args(["--cflags", "--libs"])
        .args(QT_PACKAGES)
        .output();
    match output {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        _ => {
            warn!("pkg-config could not locate Qt6; building without Qt flags");
            Vec::new()
        }
    }
}

/// Run a built program with inherited stdio.
pub fn run_binary(exe: &Path) -> Result<ExitStatus> {
    Command::new(exe)
        .status()
        .with_context(|| format!("failed to execute {}", exe.display()))
}

/// Run a built program, capturing its output.
pub fn run_captured(exe: &Path) -> Result<Output> {
    Command::new(exe)
        .output()
        .with_context(|| format!("failed to execute {}", exe.display()))
}
