//! Version-control collaborator used to establish build provenance.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{BundleError, Result};

/// Synchronous queries against the repository a build is run from.
pub trait VcsProbe {
    /// Raw commit identifier of the checked-out revision, as reported.
    fn commit_id(&self) -> Result<String>;

    /// Number of modified or untracked paths in the working tree.
    fn modified_count(&self) -> Result<usize>;
}

/// [`VcsProbe`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn run(&self, args: &[&str]) -> std::result::Result<Vec<u8>, String> {
        debug!(dir = %self.repo_dir.display(), ?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| format!("failed to run git: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output.stdout)
    }
}

impl VcsProbe for GitCli {
    fn commit_id(&self) -> Result<String> {
        let stdout = self
            .run(&["rev-parse", "HEAD"])
            .map_err(BundleError::CommitLookup)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn modified_count(&self) -> Result<usize> {
        let stdout = self
            .run(&["status", "--porcelain"])
            .map_err(BundleError::StatusLookup)?;
        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|line| !line.is_empty())
            .count())
    }
}
