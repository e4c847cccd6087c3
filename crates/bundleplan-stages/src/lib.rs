//! bundleplan stages
//!
//! Builds the ordered stage list for an invocation and assembles it, with
//! mode settings and the provenance banner, into a `BuildDescriptor`:
//! - version stamping of the designated entry file
//! - transpilation of first-party scripts
//! - an optional bundle-size report
//! - size-budget checks against emitted artifacts

pub mod budget;
pub mod descriptor;
pub mod pipeline;
pub mod registry;
pub mod stage;

// Re-export key types
pub use budget::{BudgetVerdict, SizeBudget};
pub use descriptor::BuildDescriptor;
pub use pipeline::{BuildPipeline, BuildRequest};
pub use registry::StageRegistry;
pub use stage::{
    FileMatcher, Pattern, ReportStage, Stage, StageDescriptor, StageRole, TranspileStage,
    VersionStampStage,
};
