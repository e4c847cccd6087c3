//! In-memory version-control fake (testing only).
//!
//! Lets tests drive the provenance paths, including both fatal lookups,
//! without a real repository.

use std::cell::Cell;

use crate::error::{BundleError, Result};
use crate::git::VcsProbe;

/// Scripted [`VcsProbe`] that also counts how often it is queried.
#[derive(Debug)]
pub struct FakeVcs {
    commit: std::result::Result<String, String>,
    modified: std::result::Result<usize, String>,
    commit_calls: Cell<usize>,
    status_calls: Cell<usize>,
}

impl FakeVcs {
    pub fn new(commit: &str, modified: usize) -> Self {
        Self {
            commit: Ok(commit.to_string()),
            modified: Ok(modified),
            commit_calls: Cell::new(0),
            status_calls: Cell::new(0),
        }
    }

    /// Make the commit query fail with `reason`.
    pub fn failing_commit(mut self, reason: &str) -> Self {
        self.commit = Err(reason.to_string());
        self
    }

    /// Make the status query fail with `reason`.
    pub fn failing_status(mut self, reason: &str) -> Self {
        self.modified = Err(reason.to_string());
        self
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.get()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.get()
    }
}

impl VcsProbe for FakeVcs {
    fn commit_id(&self) -> Result<String> {
        self.commit_calls.set(self.commit_calls.get() + 1);
        self.commit.clone().map_err(BundleError::CommitLookup)
    }

    fn modified_count(&self) -> Result<usize> {
        self.status_calls.set(self.status_calls.get() + 1);
        self.modified.clone().map_err(BundleError::StatusLookup)
    }
}
