//! Invocation context: flags and version override read from the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ProjectConfig;

/// Short spelling of the optimize flag.
pub const MINIMIZE_FLAG_SHORT: &str = "-p";

/// Long spelling of the optimize flag.
pub const MINIMIZE_FLAG_LONG: &str = "--optimize-minimize";

/// Flag requesting a bundle-size report.
pub const ANALYZE_FLAG: &str = "--analyze-bundle";

/// Build switches derived from the argument tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFlags {
    pub minimize: bool,
    pub analyze_bundle: bool,
}

impl BuildFlags {
    /// Scan argument tokens for the recognised flags.
    ///
    /// Both optimize spellings mean the same thing. Unknown tokens are ignored.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let has = |flag: &str| args.iter().any(|arg| arg.as_ref() == flag);
        Self {
            minimize: has(MINIMIZE_FLAG_SHORT) || has(MINIMIZE_FLAG_LONG),
            analyze_bundle: has(ANALYZE_FLAG),
        }
    }
}

/// Version written into the designated entry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
    pub value: String,

    /// True when the value came from the environment rather than the fallback.
    pub overridden: bool,
}

impl ResolvedVersion {
    /// Take the override from `env[var]`, or `fallback` when unset or empty.
    pub fn resolve(env: &HashMap<String, String>, var: &str, fallback: &str) -> Self {
        match env.get(var).filter(|v| !v.is_empty()) {
            Some(value) => Self {
                value: value.clone(),
                overridden: true,
            },
            None => Self {
                value: fallback.to_string(),
                overridden: false,
            },
        }
    }
}

/// Everything the planner reads from the invoking process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub flags: BuildFlags,
    pub version: ResolvedVersion,
}

impl InvocationContext {
    /// Derive the context from argument tokens and an environment snapshot.
    pub fn capture<S: AsRef<str>>(
        args: &[S],
        env: &HashMap<String, String>,
        config: &ProjectConfig,
    ) -> Self {
        Self {
            flags: BuildFlags::from_args(args),
            version: ResolvedVersion::resolve(
                env,
                &config.version_env_var,
                &config.version_fallback,
            ),
        }
    }
}
