//! External programs cozi drives: the VCS client, the package manager and the
//! framework's interactive injector. Each is a trait so the commands can be
//! exercised without spawning anything.

pub mod inject;
pub mod package;
pub mod vcs;

use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::{CoziError, Result};
use crate::model::config::AppConfig;

pub use inject::{Injector, ScriptedInjector};
pub use package::{PackageManager, PnpmCli};
pub use vcs::{GitCli, Vcs};

pub struct Toolchain {
    pub vcs: Box<dyn Vcs>,
    pub packages: Box<dyn PackageManager>,
    pub injector: Box<dyn Injector>,
}

impl Toolchain {
    /// Subprocess-backed collaborators. `verbose` lets their output through.
    pub fn system(config: &AppConfig, verbose: bool) -> Self {
        Self {
            vcs: Box::new(GitCli::new(&config.toolchain.vcs, verbose)),
            packages: Box::new(PnpmCli::new(&config.toolchain.package_manager, verbose)),
            injector: Box::new(ScriptedInjector::new(
                &config.toolchain.package_manager,
                &config.injector,
            )),
        }
    }
}

/// Runs `program` to completion, discarding its output unless `verbose`.
/// No timeout: a hung child hangs the command.
pub(crate) fn run_quiet(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if verbose {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());
    }

    tracing::debug!(program, ?args, "spawning");
    let output = cmd
        .output()
        .map_err(|e| CoziError::subprocess(program, format!("could not run: {e}")))?;
    check(program, args, &output)
}

/// Runs `program` and returns its trimmed stdout.
pub(crate) fn run_captured(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .map_err(|e| CoziError::subprocess(program, format!("could not run: {e}")))?;
    check(program, args, &output)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check(program: &str, args: &[&str], output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = match stderr.trim() {
        "" => format!("`{} {}` exited with {}", program, args.join(" "), output.status),
        msg => msg.to_string(),
    };
    Err(CoziError::subprocess(program, detail))
}

/// `<program> --version`, or `None` when it is not installed.
pub fn query_version(program: &str) -> Option<String> {
    run_captured(program, &["--version"], None).ok()
}
