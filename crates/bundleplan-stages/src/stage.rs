//! Stage definitions: which source files each transform applies to, and the
//! options it is handed.

use bundleplan_core::{BundleError, ProjectConfig, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Compiled regular expression that serializes as its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        Regex::new(source)
            .map(Pattern)
            .map_err(|e| BundleError::InvalidPattern {
                pattern: source.to_string(),
                source: Box::new(e),
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Forward-slash form of a path with `.` and `..` segments collapsed and no
/// trailing `/`.
///
/// Purely lexical: symlinks are not resolved.
pub fn normalize_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let absolute = text.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in text.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `..` above the filesystem root stays at the root
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Regex prefix accepting either a path under `root` or a root-relative one.
fn root_prefix(root: &Path) -> String {
    let root = normalize_path(root);
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        "^".to_string()
    } else {
        format!("^(?:{}/)?", regex::escape(root))
    }
}

/// Selects the files a stage applies to.
///
/// A path matches when `include` matches and it is not excluded. A path is
/// excluded when `exclude` matches and `exempt` does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatcher {
    pub include: Pattern,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exempt: Option<Pattern>,
}

impl FileMatcher {
    /// Match exactly one file, given relative to `root`.
    pub fn exact_file(root: &Path, relative: &str) -> Result<Self> {
        let relative = normalize_path(Path::new(relative));
        Ok(Self {
            include: Pattern::new(&format!(
                "{}{}$",
                root_prefix(root),
                regex::escape(&relative)
            ))?,
            exclude: None,
            exempt: None,
        })
    }

    /// Match every file with the given extension (no leading dot).
    pub fn by_extension(extension: &str) -> Result<Self> {
        Ok(Self {
            include: Pattern::new(&format!(r"\.{}$", regex::escape(extension)))?,
            exclude: None,
            exempt: None,
        })
    }

    /// Exclude everything under `root/dir`, except paths under `root/dir/exception`.
    pub fn excluding_dir(
        mut self,
        root: &Path,
        dir: &str,
        exception: Option<&str>,
    ) -> Result<Self> {
        let dir = normalize_path(Path::new(dir));
        let base = format!("{}{}/", root_prefix(root), regex::escape(&dir));
        self.exclude = Some(Pattern::new(&base)?);
        self.exempt = match exception {
            Some(sub) => {
                let sub = normalize_path(Path::new(sub));
                Some(Pattern::new(&format!("{base}{}/", regex::escape(&sub)))?)
            }
            None => None,
        };
        Ok(self)
    }

    pub fn matches(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        if !self.include.is_match(&path) {
            return false;
        }
        let excluded = self.exclude.as_ref().is_some_and(|p| p.is_match(&path))
            && !self.exempt.as_ref().is_some_and(|p| p.is_match(&path));
        !excluded
    }
}

/// Role of a stage in the build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Writes the release version into the designated entry file.
    VersionStamp,

    /// Downlevels script syntax for the supported platforms.
    Transpile,

    /// Writes a machine-readable bundle-size report.
    Report,
}

impl StageRole {
    pub fn name(&self) -> &'static str {
        match self {
            StageRole::VersionStamp => "version_stamp",
            StageRole::Transpile => "transpile",
            StageRole::Report => "report",
        }
    }
}

/// Replaces every occurrence of a placeholder in one designated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStampStage {
    pub matcher: FileMatcher,
    pub search: String,
    pub replace: String,
}

impl VersionStampStage {
    pub const LOADER: &'static str = "string-replace-loader";

    pub fn new(root: &Path, config: &ProjectConfig, version: &str) -> Result<Self> {
        Ok(Self {
            matcher: FileMatcher::exact_file(root, &config.version_file)?,
            search: config.version_placeholder.clone(),
            replace: version.to_string(),
        })
    }

    /// Substitute the version into `source`.
    ///
    /// Returns the input unchanged (borrowed) when the placeholder never occurs.
    pub fn apply<'a>(&self, source: &'a str) -> Cow<'a, str> {
        if self.search.is_empty() || !source.contains(&self.search) {
            return Cow::Borrowed(source);
        }
        Cow::Owned(source.replace(&self.search, &self.replace))
    }

    fn options(&self) -> Value {
        json!({
            "search": self.search,
            "replace": self.replace,
            "flags": "g",
        })
    }
}

/// Syntax downleveling for first-party scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranspileStage {
    pub matcher: FileMatcher,

    /// Minimum version per platform; unlisted platforms get the engine default.
    pub targets: BTreeMap<String, u32>,

    /// Keep static `import`/`export` intact so the bundler can tree-shake.
    pub preserve_module_syntax: bool,
    pub presets: Vec<String>,
    pub plugins: Vec<String>,
}

impl TranspileStage {
    pub const LOADER: &'static str = "babel-loader";
    pub const ENV_PRESET: &'static str = "@babel/preset-env";

    pub fn new(root: &Path, config: &ProjectConfig) -> Result<Self> {
        let exception = Some(config.vendor_exception.as_str()).filter(|s| !s.is_empty());
        let matcher = FileMatcher::by_extension(&config.script_extension)?.excluding_dir(
            root,
            &config.vendor_dir,
            exception,
        )?;

        Ok(Self {
            matcher,
            targets: config.targets.clone(),
            preserve_module_syntax: true,
            presets: vec![Self::ENV_PRESET.to_string(), "@babel/preset-flow".to_string()],
            plugins: vec![
                "@babel/plugin-transform-flow-strip-types".to_string(),
                "@babel/plugin-proposal-class-properties".to_string(),
                "@babel/plugin-proposal-export-namespace-from".to_string(),
            ],
        })
    }

    fn options(&self) -> Value {
        // `modules: false` stops the engine rewriting ES modules into CommonJS.
        let modules = if self.preserve_module_syntax {
            json!(false)
        } else {
            json!("auto")
        };
        let presets: Vec<Value> = self
            .presets
            .iter()
            .map(|preset| {
                if preset == Self::ENV_PRESET {
                    json!([preset, {
                        "modules": modules,
                        "targets": self.targets,
                    }])
                } else {
                    json!(preset)
                }
            })
            .collect();

        json!({
            "presets": presets,
            "plugins": self.plugins,
        })
    }
}

/// Bundle-size reporting sink that never opens an interactive viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStage {
    pub analyzer_mode: String,
    pub generate_stats_file: bool,
    pub stats_filename: String,
}

impl Default for ReportStage {
    fn default() -> Self {
        Self {
            analyzer_mode: "disabled".to_string(),
            generate_stats_file: true,
            stats_filename: "stats.json".to_string(),
        }
    }
}

impl ReportStage {
    pub const PLUGIN: &'static str = "webpack-bundle-analyzer";

    fn options(&self) -> Value {
        json!({
            "analyzerMode": self.analyzer_mode,
            "generateStatsFile": self.generate_stats_file,
            "statsFilename": self.stats_filename,
        })
    }
}

/// A typed stage in the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Stage {
    VersionStamp(VersionStampStage),
    Transpile(TranspileStage),
    Report(ReportStage),
}

impl Stage {
    pub fn role(&self) -> StageRole {
        match self {
            Stage::VersionStamp(_) => StageRole::VersionStamp,
            Stage::Transpile(_) => StageRole::Transpile,
            Stage::Report(_) => StageRole::Report,
        }
    }

    pub fn name(&self) -> &'static str {
        self.role().name()
    }

    /// File matcher, or `None` for stages that act on the whole output.
    pub fn matcher(&self) -> Option<&FileMatcher> {
        match self {
            Stage::VersionStamp(s) => Some(&s.matcher),
            Stage::Transpile(s) => Some(&s.matcher),
            Stage::Report(_) => None,
        }
    }

    /// Whether this stage transforms the source file at `path`.
    pub fn applies_to(&self, path: &Path) -> bool {
        self.matcher().is_some_and(|m| m.matches(path))
    }

    /// Flattened view handed to the bundler collaborator.
    pub fn descriptor(&self) -> StageDescriptor {
        let (tool, options) = match self {
            Stage::VersionStamp(s) => (VersionStampStage::LOADER, s.options()),
            Stage::Transpile(s) => (TranspileStage::LOADER, s.options()),
            Stage::Report(s) => (ReportStage::PLUGIN, s.options()),
        };

        let mut config = Map::new();
        config.insert("tool".to_string(), json!(tool));
        config.insert("options".to_string(), options);

        let matcher = self.matcher();
        StageDescriptor {
            name: self.name().to_string(),
            match_pattern: matcher.map(|m| m.include.as_str().to_string()),
            exclude_pattern: matcher
                .and_then(|m| m.exclude.as_ref())
                .map(|p| p.as_str().to_string()),
            exempt_pattern: matcher
                .and_then(|m| m.exempt.as_ref())
                .map(|p| p.as_str().to_string()),
            config,
        }
    }
}

/// Name, file-matching rule and configuration payload of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub name: String,
    pub match_pattern: Option<String>,
    pub exclude_pattern: Option<String>,
    pub exempt_pattern: Option<String>,
    pub config: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/work/lib-jitsi-meet";

    fn transpile() -> TranspileStage {
        TranspileStage::new(Path::new(ROOT), &ProjectConfig::default()).unwrap()
    }

    fn stamp(version: &str) -> VersionStampStage {
        VersionStampStage::new(Path::new(ROOT), &ProjectConfig::default(), version).unwrap()
    }

    #[test]
    fn test_stage_role_names() {
        assert_eq!(StageRole::VersionStamp.name(), "version_stamp");
        assert_eq!(StageRole::Transpile.name(), "transpile");
        assert_eq!(StageRole::Report.name(), "report");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("./index.js")), "index.js");
        assert_eq!(normalize_path(Path::new("a\\b\\c.js")), "a/b/c.js");
        assert_eq!(normalize_path(Path::new("/work/")), "/work");
        assert_eq!(normalize_path(Path::new("/work/lib/./a/../b.js")), "/work/lib/b.js");
        assert_eq!(normalize_path(Path::new("../shared/x.js")), "../shared/x.js");
        assert_eq!(normalize_path(Path::new("/../x.js")), "/x.js");
        assert_eq!(normalize_path(Path::new("/")), "/");
    }

    #[test]
    fn test_transpile_includes_first_party_scripts() {
        let stage = transpile();
        assert!(stage.matcher.matches(Path::new("/work/lib-jitsi-meet/modules/RTC/RTC.js")));
        assert!(stage.matcher.matches(Path::new("modules/xmpp/xmpp.js")));
        assert!(!stage.matcher.matches(Path::new("/work/lib-jitsi-meet/types/index.d.ts")));
        assert!(!stage.matcher.matches(Path::new("/work/lib-jitsi-meet/package.json")));
    }

    #[test]
    fn test_transpile_excludes_vendor_dir() {
        let stage = transpile();
        assert!(!stage
            .matcher
            .matches(Path::new("/work/lib-jitsi-meet/node_modules/lodash/index.js")));
        assert!(!stage.matcher.matches(Path::new("node_modules/sdp-transform/lib/parser.js")));
    }

    #[test]
    fn test_transpile_excludes_vendor_dir_through_dot_segments() {
        let stage = transpile();
        assert!(!stage
            .matcher
            .matches(Path::new("/work/lib-jitsi-meet/./node_modules/lodash/index.js")));
        assert!(!stage.matcher.matches(Path::new(
            "/work/lib-jitsi-meet/modules/../node_modules/lodash/index.js"
        )));
        assert!(!stage.matcher.matches(Path::new(
            "/work/lib-jitsi-meet/node_modules/@jitsi/js-utils/../../lodash/index.js"
        )));
        assert!(stage.matcher.matches(Path::new(
            "/work/lib-jitsi-meet/node_modules/./@jitsi/js-utils/random/index.js"
        )));
    }

    #[test]
    fn test_transpile_keeps_vendor_exception() {
        let stage = transpile();
        assert!(stage.matcher.matches(Path::new(
            "/work/lib-jitsi-meet/node_modules/@jitsi/js-utils/browser-detection/index.js"
        )));
        assert!(!stage
            .matcher
            .matches(Path::new("/work/lib-jitsi-meet/node_modules/@jitsi/logger/index.js")));
        assert!(!stage
            .matcher
            .matches(Path::new("/work/lib-jitsi-meet/node_modules/@jitsi/js-utils-extra/a.js")));
    }

    #[test]
    fn test_version_stamp_matches_only_entry_file() {
        let stage = stamp("1.2.3");
        assert!(stage.matcher.matches(Path::new("/work/lib-jitsi-meet/JitsiMeetJS.js")));
        assert!(stage.matcher.matches(Path::new("./JitsiMeetJS.js")));
        assert!(!stage.matcher.matches(Path::new("/work/lib-jitsi-meet/modules/JitsiMeetJS.js")));
        assert!(!stage.matcher.matches(Path::new("/work/lib-jitsi-meet/JitsiMeetJSX.js")));
    }

    #[test]
    fn test_version_stamp_replaces_all_occurrences() {
        let stage = stamp("1.2.3");
        let out = stage.apply("const v = '{#COMMIT_HASH#}'; log('{#COMMIT_HASH#}');");
        assert_eq!(out, "const v = '1.2.3'; log('1.2.3');");
    }

    #[test]
    fn test_version_stamp_without_placeholder_is_noop() {
        let stage = stamp("1.2.3");
        let source = "export default {};";
        let out = stage.apply(source);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, source);
    }

    #[test]
    fn test_transpile_options_preserve_module_syntax() {
        let descriptor = Stage::Transpile(transpile()).descriptor();
        let options = &descriptor.config["options"];
        let env = &options["presets"][0];
        assert_eq!(env[0], "@babel/preset-env");
        assert_eq!(env[1]["modules"], json!(false));
        assert_eq!(env[1]["targets"]["chrome"], 58);
        assert_eq!(env[1]["targets"]["safari"], 11);
        assert!(env[1]["targets"].get("edge").is_none());
        assert_eq!(options["presets"][1], "@babel/preset-flow");
        assert_eq!(options["plugins"].as_array().unwrap().len(), 3);
        assert_eq!(descriptor.config["tool"], "babel-loader");
    }

    #[test]
    fn test_version_stamp_descriptor() {
        let descriptor = Stage::VersionStamp(stamp("development")).descriptor();
        assert_eq!(descriptor.name, "version_stamp");
        assert_eq!(descriptor.config["tool"], "string-replace-loader");
        assert_eq!(descriptor.config["options"]["search"], "{#COMMIT_HASH#}");
        assert_eq!(descriptor.config["options"]["replace"], "development");
        assert_eq!(descriptor.config["options"]["flags"], "g");
        assert!(descriptor.exclude_pattern.is_none());
    }

    #[test]
    fn test_report_stage_is_non_interactive() {
        let stage = Stage::Report(ReportStage::default());
        assert!(stage.matcher().is_none());
        assert!(!stage.applies_to(Path::new("index.js")));
        let descriptor = stage.descriptor();
        assert_eq!(descriptor.config["options"]["analyzerMode"], "disabled");
        assert_eq!(descriptor.config["options"]["generateStatsFile"], true);
        assert!(descriptor.match_pattern.is_none());
    }

    #[test]
    fn test_invalid_pattern_reports_source() {
        let err = Pattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, BundleError::InvalidPattern { .. }));
    }

    #[test]
    fn test_stage_serde_tagged_by_role() {
        let stage = Stage::Report(ReportStage::default());
        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["role"], "report");
        let back: Stage = serde_json::from_value(value).unwrap();
        assert_eq!(back, stage);
    }
}
