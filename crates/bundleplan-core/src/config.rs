//! Project configuration.
//!
//! Holds the project-specific constants the stages are built from: entry
//! point, library naming, version placeholder, vendoring layout, target
//! platforms and size budgets. Every field has a default, so an absent
//! `bundleplan.toml` simply means "the stock library build".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{BundleError, Result};

/// File name looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "bundleplan.toml";

const KIB: u64 = 1024;

/// Project configuration, typically loaded from `bundleplan.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Repository URL quoted in the provenance banner.
    pub repository_url: String,

    /// Global name the bundle exposes.
    pub library_name: String,

    /// Module format of the emitted library.
    pub library_target: String,

    /// Name of the single entry chunk.
    pub entry_name: String,

    /// Entry module, relative to the working directory.
    pub entry_path: String,

    /// Source file that receives the version stamp, relative to the working directory.
    pub version_file: String,

    /// Literal token replaced by the resolved version.
    pub version_placeholder: String,

    /// Environment variable holding an explicit release version.
    pub version_env_var: String,

    /// Version used when `version_env_var` is unset.
    pub version_fallback: String,

    /// Extension (without dot) of script sources subject to transpilation.
    pub script_extension: String,

    /// Directory holding vendored third-party sources.
    pub vendor_dir: String,

    /// Subpath of `vendor_dir` that still ships untranspiled syntax.
    pub vendor_exception: String,

    /// Minimum supported version per platform.
    pub targets: BTreeMap<String, u32>,

    /// Module requests resolved from the host environment instead of bundled.
    pub externals: BTreeMap<String, String>,

    pub max_asset_bytes: u64,

    pub max_entrypoint_bytes: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            repository_url: "https://github.com/kecskesk/lib-jitsi-meet".to_string(),
            library_name: "JitsiMeetJS".to_string(),
            library_target: "umd".to_string(),
            entry_name: "lib-jitsi-meet".to_string(),
            entry_path: "./index.js".to_string(),
            version_file: "JitsiMeetJS.js".to_string(),
            version_placeholder: "{#COMMIT_HASH#}".to_string(),
            version_env_var: "LIB_JITSI_MEET_COMMIT_HASH".to_string(),
            version_fallback: "development".to_string(),
            script_extension: "js".to_string(),
            vendor_dir: "node_modules".to_string(),
            vendor_exception: "@jitsi/js-utils".to_string(),
            targets: BTreeMap::from([
                ("chrome".to_string(), 58),
                ("electron".to_string(), 2),
                ("firefox".to_string(), 54),
                ("safari".to_string(), 11),
            ]),
            externals: BTreeMap::from([("strophe.js".to_string(), "window".to_string())]),
            max_asset_bytes: 750 * KIB,
            max_entrypoint_bytes: 750 * KIB,
        }
    }
}

impl ProjectConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BundleError::Config(e.to_string()))
    }

    /// Load configuration for a build rooted at `workdir`.
    ///
    /// With an explicit path the file must exist. Without one,
    /// `workdir/bundleplan.toml` is used if present and defaults otherwise.
    pub fn load(workdir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(BundleError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let candidate = workdir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        debug!(path = %path.display(), "loading project config");
        let text = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&text)
    }
}
