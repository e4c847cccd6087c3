//! The build descriptor handed to the bundler, and its fingerprint.

use bundleplan_core::{
    BuildFlags, BuildMode, NamingRule, ProvenanceInfo, ResolvedVersion, SizeLimits,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::stage::{Stage, StageDescriptor, StageRole};

/// Everything the bundler needs for one invocation.
///
/// Built once by the assembler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    pub flags: BuildFlags,
    pub mode: BuildMode,
    pub devtool: String,

    /// Cross-module concatenation during optimization.
    pub concatenate_modules: bool,

    /// Entry chunk name to entry module.
    pub entry: BTreeMap<String, String>,
    pub output_path: PathBuf,
    pub output_naming: NamingRule,
    pub library_name: String,
    pub library_target: String,

    /// Module requests resolved from the host instead of bundled.
    pub externals: BTreeMap<String, String>,

    /// Expose real module filenames instead of a mock path.
    pub preserve_filename: bool,

    /// Version written into the designated entry file.
    pub version: ResolvedVersion,
    pub provenance: ProvenanceInfo,

    /// Text embedded verbatim at the top of the emitted artifact.
    pub banner: String,

    /// Stages in registry order.
    pub stages: Vec<Stage>,
    pub size_limits: SizeLimits,
}

impl BuildDescriptor {
    /// Ordered stage names.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn stage(&self, role: StageRole) -> Option<&Stage> {
        self.stages.iter().find(|s| s.role() == role)
    }

    /// Stages that transform the source file at `path`, in registry order.
    pub fn stages_for(&self, path: &Path) -> Vec<&Stage> {
        self.stages.iter().filter(|s| s.applies_to(path)).collect()
    }

    /// Flattened stage list for the bundler collaborator.
    pub fn stage_descriptors(&self) -> Vec<StageDescriptor> {
        self.stages.iter().map(Stage::descriptor).collect()
    }

    /// Naming, optimization and budget severity all follow the minimize flag.
    pub fn is_consistent(&self) -> bool {
        let minimize = self.flags.minimize;
        self.output_naming.is_minified() == minimize
            && self.size_limits.enforce_as_error == minimize
            && self.concatenate_modules == minimize
            && (self.mode == BuildMode::Production) == minimize
            && self.stage(StageRole::Report).is_some() == self.flags.analyze_bundle
    }

    /// Deterministic digest of the plan: ordered stage names, naming and banner.
    pub fn fingerprint(&self) -> String {
        let names: Vec<String> = self.stage_names().iter().map(|s| s.to_string()).collect();
        let mut hasher = Sha256::new();
        hasher.update(compute_stages_digest(&names).as_bytes());
        hasher.update(b"\0");
        hasher.update(self.output_naming.filename.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.output_naming.source_map_filename.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.banner.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Compute deterministic digest of ordered stage names.
fn compute_stages_digest(stages: &[String]) -> String {
    let mut hasher = Sha256::new();
    for stage in stages {
        hasher.update(stage.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
