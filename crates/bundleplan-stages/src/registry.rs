//! Stage registry: the ordered stage list for one invocation.

use bundleplan_core::{InvocationContext, ProjectConfig, Result};
use std::path::Path;
use tracing::debug;

use crate::stage::{ReportStage, Stage, TranspileStage, VersionStampStage};

/// Ordered stages, built by appending typed variants.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: Vec<Stage>,
}

impl StageRegistry {
    /// Registry for a build rooted at `root`.
    ///
    /// Version stamping and transpilation are always present; the report
    /// stage is appended only when the invocation asked for it.
    pub fn for_invocation(
        root: &Path,
        config: &ProjectConfig,
        ctx: &InvocationContext,
    ) -> Result<Self> {
        let mut registry = Self::default();
        registry.push(Stage::VersionStamp(VersionStampStage::new(
            root,
            config,
            &ctx.version.value,
        )?));
        registry.push(Stage::Transpile(TranspileStage::new(root, config)?));
        if ctx.flags.analyze_bundle {
            registry.push(Stage::Report(ReportStage::default()));
        }
        Ok(registry)
    }

    pub fn push(&mut self, stage: Stage) {
        debug!(stage = stage.name(), "registered stage");
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }
}
