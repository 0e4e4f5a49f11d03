use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Classes that are never offered for cleanup
pub const FORBIDDEN_CLASSES: &[&str] = &[
    "EditorUtilityWidget",
    "EditorUtilityBlueprint",
    "EditorUtilityWidgetBlueprint",
    "MapBuildDataRegistry",
];

/// How assets referenced from source or config files are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndirectPolicy {
    /// Referenced assets become roots
    #[default]
    Root,

    /// Referenced assets seed the soft traversal only
    Soft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectSettings {
    pub enabled: bool,
    pub policy: IndirectPolicy,
    pub dirs: Vec<PathBuf>,
    pub extensions: Vec<String>,
}

impl Default for IndirectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: IndirectPolicy::Root,
            dirs: vec![
                PathBuf::from("Source"),
                PathBuf::from("Config"),
                PathBuf::from("Plugins"),
            ],
            extensions: ["cpp", "h", "cs", "ini"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Everything one analysis pass needs, passed explicitly to the engine
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub project_root: PathBuf,
    pub content_root: PathBuf,
    pub mount_point: String,
    pub extensions: Vec<String>,
    pub scan_ignore: Vec<String>,
    pub scan_developer_content: bool,
    pub sidecar_suffix: String,
    pub roots: Vec<String>,
    pub root_classes: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub exclude_classes: Vec<String>,
    pub exclude_assets: Vec<String>,
    pub forbidden_classes: Vec<String>,
    pub indirect: IndirectSettings,
    pub threads: usize,
}

impl AnalysisConfig {
    pub fn new(project_root: PathBuf) -> Self {
        let content_root = project_root.join("Content");
        Self {
            project_root,
            content_root,
            mount_point: "/Game".to_string(),
            extensions: vec!["uasset".to_string(), "umap".to_string()],
            scan_ignore: vec![],
            scan_developer_content: false,
            sidecar_suffix: ".deps.json".to_string(),
            roots: vec![],
            root_classes: vec!["World".to_string()],
            exclude_paths: vec![],
            exclude_classes: vec![],
            exclude_assets: vec![],
            forbidden_classes: FORBIDDEN_CLASSES.iter().map(|s| s.to_string()).collect(),
            indirect: IndirectSettings::default(),
            threads: 0,
        }
    }

    pub fn with_content_root(mut self, content_root: PathBuf) -> Self {
        self.content_root = content_root;
        self
    }

    pub fn with_mount_point(mut self, mount_point: &str) -> Self {
        self.mount_point = mount_point.trim_end_matches('/').to_string();
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_scan_ignore(mut self, patterns: Vec<String>) -> Self {
        self.scan_ignore = patterns;
        self
    }

    pub fn with_developer_content(mut self, enabled: bool) -> Self {
        self.scan_developer_content = enabled;
        self
    }

    pub fn with_sidecar_suffix(mut self, suffix: &str) -> Self {
        self.sidecar_suffix = suffix.to_string();
        self
    }

    pub fn with_roots(mut self, roots: Vec<String>) -> Self {
        self.roots = roots;
        self
    }

    pub fn with_root_classes(mut self, classes: Vec<String>) -> Self {
        self.root_classes = classes;
        self
    }

    pub fn with_exclude_paths(mut self, patterns: Vec<String>) -> Self {
        self.exclude_paths = patterns;
        self
    }

    pub fn with_exclude_classes(mut self, classes: Vec<String>) -> Self {
        self.exclude_classes = classes;
        self
    }

    pub fn with_exclude_assets(mut self, assets: Vec<String>) -> Self {
        self.exclude_assets = assets;
        self
    }

    pub fn with_indirect(mut self, indirect: IndirectSettings) -> Self {
        self.indirect = indirect;
        self
    }

    pub fn without_indirect(mut self) -> Self {
        self.indirect.enabled = false;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Folders pruned from every scan regardless of configuration
    pub fn builtin_scan_ignore(&self) -> Vec<String> {
        let mut patterns = vec![
            format!("{}/Collections", self.mount_point),
            "**/__ExternalActors__".to_string(),
            "**/__ExternalObjects__".to_string(),
        ];
        if !self.scan_developer_content {
            patterns.push(format!("{}/Developers", self.mount_point));
        }
        patterns
    }
}
