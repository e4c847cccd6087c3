//! bundleplan core
//!
//! Reads what an invocation asks for (flags, version override), establishes
//! provenance from version control, and resolves mode-dependent settings.
//! Stage assembly lives in `bundleplan-stages`.

pub mod config;
pub mod error;
pub mod fakes;
pub mod git;
pub mod invocation;
pub mod mode;
pub mod provenance;
pub mod telemetry;

pub use config::{ProjectConfig, DEFAULT_CONFIG_FILE};
pub use error::{BundleError, Result};
pub use git::{GitCli, VcsProbe};
pub use invocation::{BuildFlags, InvocationContext, ResolvedVersion};
pub use mode::{BuildMode, ModeSettings, NamingRule, SizeLimits};
pub use provenance::ProvenanceInfo;
pub use telemetry::init_tracing;
