//! Build planning: turns one invocation into one `BuildDescriptor`.

use bundleplan_core::{
    InvocationContext, ModeSettings, ProjectConfig, ProvenanceInfo, Result, VcsProbe,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::descriptor::BuildDescriptor;
use crate::registry::StageRegistry;

/// Inputs captured from the invoking process.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Argument tokens inspected for build flags.
    pub args: Vec<String>,

    /// Environment snapshot.
    pub env: HashMap<String, String>,

    /// Root for locating the entry files; also the output directory.
    pub workdir: PathBuf,
    pub config: ProjectConfig,
}

impl BuildRequest {
    pub fn new(args: Vec<String>, env: HashMap<String, String>, workdir: PathBuf) -> Self {
        Self {
            args,
            env,
            workdir,
            config: ProjectConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProjectConfig) -> Self {
        self.config = config;
        self
    }
}

/// Build pipeline assembler.
pub struct BuildPipeline;

impl BuildPipeline {
    /// Plan a build.
    ///
    /// Provenance is captured before assembly; if the version-control
    /// collaborator fails, no descriptor is produced.
    pub fn plan(request: &BuildRequest, vcs: &dyn VcsProbe) -> Result<BuildDescriptor> {
        let ctx =
            InvocationContext::capture(request.args.as_slice(), &request.env, &request.config);
        info!(
            minimize = ctx.flags.minimize,
            analyze_bundle = ctx.flags.analyze_bundle,
            version = %ctx.version.value,
            version_overridden = ctx.version.overridden,
            "planning build"
        );

        let mode = ModeSettings::resolve(&ctx.flags, &request.config);
        debug!(mode = mode.mode.as_str(), "resolved build mode");
        let registry = StageRegistry::for_invocation(&request.workdir, &request.config, &ctx)?;
        let provenance = ProvenanceInfo::capture(vcs)?;

        let descriptor = Self::assemble(
            ctx,
            mode,
            registry,
            provenance,
            &request.workdir,
            &request.config,
        );
        let fingerprint = descriptor.fingerprint();
        info!(
            stages = ?descriptor.stage_names(),
            fingerprint = %&fingerprint[..12],
            "build descriptor ready"
        );
        Ok(descriptor)
    }

    /// Compose already-resolved parts. Performs no I/O.
    pub fn assemble(
        ctx: InvocationContext,
        mode: ModeSettings,
        registry: StageRegistry,
        provenance: ProvenanceInfo,
        workdir: &Path,
        config: &ProjectConfig,
    ) -> BuildDescriptor {
        let banner = provenance.banner(&config.repository_url);
        debug!(%banner, "provenance banner");

        BuildDescriptor {
            flags: ctx.flags,
            mode: mode.mode,
            devtool: mode.devtool,
            concatenate_modules: mode.concatenate_modules,
            entry: BTreeMap::from([(config.entry_name.clone(), config.entry_path.clone())]),
            output_path: workdir.to_path_buf(),
            output_naming: mode.naming,
            library_name: config.library_name.clone(),
            library_target: config.library_target.clone(),
            externals: config.externals.clone(),
            preserve_filename: true,
            version: ctx.version,
            provenance,
            banner,
            stages: registry.into_stages(),
            size_limits: mode.size_limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageRole;
    use bundleplan_core::fakes::FakeVcs;
    use bundleplan_core::BuildMode;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn request(args: &[&str]) -> BuildRequest {
        BuildRequest::new(
            args.iter().map(|s| s.to_string()).collect(),
            HashMap::new(),
            PathBuf::from("/work"),
        )
    }

    #[test]
    fn test_plain_build_descriptor() {
        let descriptor = BuildPipeline::plan(&request(&[]), &FakeVcs::new(SHA, 0)).unwrap();

        assert_eq!(descriptor.mode, BuildMode::Development);
        assert_eq!(descriptor.output_naming.filename, "[name].js");
        assert!(!descriptor.size_limits.enforce_as_error);
        assert_eq!(descriptor.stage_names(), vec!["version_stamp", "transpile"]);
        assert_eq!(descriptor.entry["lib-jitsi-meet"], "./index.js");
        assert_eq!(descriptor.output_path, PathBuf::from("/work"));
        assert_eq!(descriptor.externals["strophe.js"], "window");
        assert!(descriptor.is_consistent());
    }

    #[test]
    fn test_minimized_analyzed_build_descriptor() {
        let descriptor = BuildPipeline::plan(
            &request(&["--optimize-minimize", "--analyze-bundle"]),
            &FakeVcs::new(SHA, 2),
        )
        .unwrap();

        assert_eq!(descriptor.mode, BuildMode::Production);
        assert_eq!(descriptor.output_naming.filename, "[name].min.js");
        assert!(descriptor.size_limits.enforce_as_error);
        assert!(descriptor.concatenate_modules);
        assert!(descriptor.stage(StageRole::Report).is_some());
        assert!(descriptor.banner.ends_with(" - DIRTY"));
        assert!(descriptor.is_consistent());
    }

    #[test]
    fn test_banner_independent_of_version_override() {
        let mut req = request(&[]);
        req.env
            .insert("LIB_JITSI_MEET_COMMIT_HASH".to_string(), "1.2.3".to_string());
        let vcs = FakeVcs::new(&format!("{SHA}\n"), 0);
        let descriptor = BuildPipeline::plan(&req, &vcs).unwrap();

        assert_eq!(descriptor.version.value, "1.2.3");
        assert!(descriptor.banner.contains(SHA));
        assert!(!descriptor.banner.contains("1.2.3"));
    }

    #[test]
    fn test_provenance_failure_yields_no_descriptor() {
        let vcs = FakeVcs::new(SHA, 0).failing_commit("fatal: not a git repository");
        let err = BuildPipeline::plan(&request(&["-p"]), &vcs).unwrap_err();
        assert!(err.is_provenance_failure());
        assert!(err.to_string().contains("commit lookup failed"));
    }

    #[test]
    fn test_fingerprint_stable_and_mode_sensitive() {
        let vcs = FakeVcs::new(SHA, 0);
        let a = BuildPipeline::plan(&request(&[]), &vcs).unwrap();
        let b = BuildPipeline::plan(&request(&[]), &vcs).unwrap();
        let c = BuildPipeline::plan(&request(&["-p"]), &vcs).unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
