use std::path::Path;

use crate::error::Result;
use crate::toolchain::{run_captured, run_quiet};

pub trait Vcs {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;
    fn pull(&self, path: &Path) -> Result<()>;
    fn current_commit(&self, path: &Path) -> Result<String>;
    fn current_branch(&self, path: &Path) -> Result<String>;
    /// `status --porcelain` lines; empty when the tree is clean.
    fn status_porcelain(&self, path: &Path) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    verbose: bool,
}

impl GitCli {
    pub fn new(program: &str, verbose: bool) -> Self {
        Self {
            program: program.to_string(),
            verbose,
        }
    }

    fn path_arg(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}

impl Vcs for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = Self::path_arg(dest);
        run_quiet(&self.program, &["clone", url, &dest], None, self.verbose)
    }

    fn pull(&self, path: &Path) -> Result<()> {
        let path = Self::path_arg(path);
        run_quiet(&self.program, &["-C", &path, "pull"], None, self.verbose)
    }

    fn current_commit(&self, path: &Path) -> Result<String> {
        let path = Self::path_arg(path);
        run_captured(&self.program, &["-C", &path, "rev-parse", "--short", "HEAD"], None)
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        let path = Self::path_arg(path);
        run_captured(&self.program, &["-C", &path, "symbolic-ref", "--short", "HEAD"], None)
    }

    fn status_porcelain(&self, path: &Path) -> Result<Vec<String>> {
        let path = Self::path_arg(path);
        let out = run_captured(&self.program, &["-C", &path, "status", "--porcelain"], None)?;
        Ok(out
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}
