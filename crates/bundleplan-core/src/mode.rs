//! Mode resolution: every setting that depends on whether the build minimizes.
//!
//! Naming and budget severity are derived together from one flag so they can
//! never disagree.

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;
use crate::invocation::BuildFlags;

/// Bundler build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        }
    }
}

/// Output file naming templates (`[name]` is the entry name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingRule {
    pub filename: String,
    pub source_map_filename: String,
}

impl NamingRule {
    pub fn minified() -> Self {
        Self {
            filename: "[name].min.js".to_string(),
            source_map_filename: "[name].min.map".to_string(),
        }
    }

    pub fn plain() -> Self {
        Self {
            filename: "[name].js".to_string(),
            source_map_filename: "[name].js.map".to_string(),
        }
    }

    pub fn is_minified(&self) -> bool {
        self.filename.ends_with(".min.js")
    }

    /// Concrete artifact file name for an entry.
    pub fn render(&self, entry_name: &str) -> String {
        self.filename.replace("[name]", entry_name)
    }
}

/// Size-budget thresholds and how a breach is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    pub max_asset_bytes: u64,
    pub max_entrypoint_bytes: u64,

    /// Breaches fail the build instead of being advisory.
    pub enforce_as_error: bool,
}

/// Source-map style emitted in every mode.
pub const DEVTOOL: &str = "source-map";

/// Settings derived from the minimize flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSettings {
    pub mode: BuildMode,
    pub devtool: String,
    pub naming: NamingRule,

    /// Cross-module concatenation, enabled only when minimizing.
    pub concatenate_modules: bool,
    pub size_limits: SizeLimits,
}

impl ModeSettings {
    pub fn resolve(flags: &BuildFlags, config: &ProjectConfig) -> Self {
        let minimize = flags.minimize;
        Self {
            mode: if minimize {
                BuildMode::Production
            } else {
                BuildMode::Development
            },
            devtool: DEVTOOL.to_string(),
            naming: if minimize {
                NamingRule::minified()
            } else {
                NamingRule::plain()
            },
            concatenate_modules: minimize,
            size_limits: SizeLimits {
                max_asset_bytes: config.max_asset_bytes,
                max_entrypoint_bytes: config.max_entrypoint_bytes,
                enforce_as_error: minimize,
            },
        }
    }

    /// Naming and enforcement both reflect the same minimize decision.
    pub fn is_consistent(&self) -> bool {
        let minimized = self.mode == BuildMode::Production;
        self.naming.is_minified() == minimized
            && self.size_limits.enforce_as_error == minimized
            && self.concatenate_modules == minimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(minimize: bool) -> ModeSettings {
        let flags = BuildFlags {
            minimize,
            analyze_bundle: false,
        };
        ModeSettings::resolve(&flags, &ProjectConfig::default())
    }

    #[test]
    fn test_minimized_settings() {
        let settings = resolve(true);
        assert_eq!(settings.mode, BuildMode::Production);
        assert_eq!(settings.naming.filename, "[name].min.js");
        assert_eq!(settings.naming.source_map_filename, "[name].min.map");
        assert!(settings.concatenate_modules);
        assert!(settings.size_limits.enforce_as_error);
        assert!(settings.is_consistent());
    }

    #[test]
    fn test_plain_settings() {
        let settings = resolve(false);
        assert_eq!(settings.mode, BuildMode::Development);
        assert_eq!(settings.naming.filename, "[name].js");
        assert_eq!(settings.naming.source_map_filename, "[name].js.map");
        assert!(!settings.concatenate_modules);
        assert!(!settings.size_limits.enforce_as_error);
        assert!(settings.is_consistent());
    }

    #[test]
    fn test_thresholds_do_not_depend_on_mode() {
        assert_eq!(resolve(true).size_limits.max_asset_bytes, 750 * 1024);
        assert_eq!(
            resolve(true).size_limits.max_entrypoint_bytes,
            resolve(false).size_limits.max_entrypoint_bytes
        );
        assert_eq!(resolve(true).devtool, resolve(false).devtool);
    }

    #[test]
    fn test_inconsistent_settings_detected() {
        let mut settings = resolve(false);
        settings.size_limits.enforce_as_error = true;
        assert!(!settings.is_consistent());
    }

    #[test]
    fn test_naming_render() {
        assert_eq!(
            NamingRule::minified().render("lib-jitsi-meet"),
            "lib-jitsi-meet.min.js"
        );
        assert_eq!(NamingRule::plain().render("lib"), "lib.js");
    }
}
