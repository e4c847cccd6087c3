//! Provenance stamping: which revision a bundle was built from, and whether
//! the working tree was clean.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BundleError, Result};
use crate::git::VcsProbe;

/// Suffix appended to the banner when the working tree has local changes.
pub const DIRTY_MARKER: &str = " - DIRTY";

/// Revision and cleanliness of the tree a build is produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceInfo {
    pub commit_hash: String,
    pub has_local_changes: bool,
}

impl ProvenanceInfo {
    /// Query the collaborator once for each fact.
    ///
    /// Either query failing aborts: a banner must never misstate its origin.
    pub fn capture(vcs: &dyn VcsProbe) -> Result<Self> {
        let raw = vcs.commit_id()?;
        let commit_hash = normalize_commit_id(&raw);
        if commit_hash.is_empty() {
            return Err(BundleError::CommitLookup(
                "collaborator returned an empty commit id".to_string(),
            ));
        }
        if !is_full_sha(&commit_hash) {
            warn!(commit = %commit_hash, "commit id is not a 40-character hex SHA");
        }

        let modified = vcs.modified_count()?;
        let info = Self {
            commit_hash,
            has_local_changes: modified > 0,
        };
        info!(
            commit = %info.commit_hash,
            dirty = info.has_local_changes,
            modified,
            "captured provenance"
        );
        Ok(info)
    }

    /// Banner embedded verbatim at the top of the emitted artifact.
    pub fn banner(&self, repository_url: &str) -> String {
        let mut banner = format!(
            "built from: {repository_url} - commit: {}",
            self.commit_hash
        );
        if self.has_local_changes {
            banner.push_str(DIRTY_MARKER);
        }
        banner
    }
}

/// Strip trailing line terminators from a reported commit id.
pub fn normalize_commit_id(raw: &str) -> String {
    raw.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string()
}

fn is_full_sha(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}
