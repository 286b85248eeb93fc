use std::path::Path;

use crate::error::Result;
use crate::toolchain::{query_version, run_quiet};

pub trait PackageManager {
    /// `Some(pkg)` adds one package to the project at `cwd`; `None` installs
    /// exactly what the lockfile pins.
    fn install(&self, package: Option<&str>, cwd: &Path) -> Result<()>;
    fn build(&self, cwd: &Path) -> Result<()>;
    fn version(&self) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct PnpmCli {
    program: String,
    verbose: bool,
}

impl PnpmCli {
    pub fn new(program: &str, verbose: bool) -> Self {
        Self {
            program: program.to_string(),
            verbose,
        }
    }
}

impl PackageManager for PnpmCli {
    fn install(&self, package: Option<&str>, cwd: &Path) -> Result<()> {
        match package {
            Some(package) => {
                let prefix = cwd.to_string_lossy();
                run_quiet(
                    &self.program,
                    &["install", package, "--prefix", &prefix],
                    Some(cwd),
                    self.verbose,
                )
            }
            None => run_quiet(
                &self.program,
                &["install", "--frozen-lockfile"],
                Some(cwd),
                self.verbose,
            ),
        }
    }

    fn build(&self, cwd: &Path) -> Result<()> {
        run_quiet(&self.program, &["build"], Some(cwd), self.verbose)
    }

    fn version(&self) -> Option<String> {
        query_version(&self.program)
    }
}
