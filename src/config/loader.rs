// Configuration loader - file format and CLI-facing defaults

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::analysis::{AnalysisConfig, IndirectPolicy, IndirectSettings};

/// Configuration for an assetsweep run, as read from disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content directory, relative to the project root
    pub content_dir: PathBuf,

    /// Mount point the content directory is exposed as
    pub mount_point: String,

    /// Assets (ids or glob patterns) that are always kept
    pub roots: Vec<String>,

    /// Classes whose assets are roots (every level by default)
    pub root_classes: Vec<String>,

    /// Exclusion rules
    pub exclude: ExcludeConfig,

    /// Content scan configuration
    pub scan: ScanConfig,

    /// Source/config path scanning
    pub indirect: IndirectConfig,

    /// Dependency metadata source
    pub registry: RegistryConfig,

    /// Worker threads for extraction (0 = all cores)
    pub threads: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    /// Glob patterns over asset ids; a plain folder path excludes its subtree
    pub paths: Vec<String>,

    /// Class names
    pub classes: Vec<String>,

    /// Explicit asset ids
    pub assets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Engine asset file extensions
    pub extensions: Vec<String>,

    /// Folders or files skipped entirely by the scan
    pub ignore: Vec<String>,

    /// Scan the Developers folder as regular content
    pub scan_developer_content: bool,

    /// Suffix of dependency sidecar files next to each asset
    pub sidecar_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndirectConfig {
    /// Look for asset paths in source and config files
    pub enabled: bool,

    /// How referenced assets are treated: root or soft
    pub policy: IndirectPolicy,

    /// Directories scanned, relative to the project root
    pub dirs: Vec<PathBuf>,

    /// Text file extensions scanned
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Whole-project registry dump; sidecars are used when unset
    pub manifest: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let analysis = AnalysisConfig::new(PathBuf::new());
        Self {
            content_dir: PathBuf::from("Content"),
            mount_point: analysis.mount_point,
            roots: vec![],
            root_classes: analysis.root_classes,
            exclude: ExcludeConfig::default(),
            scan: ScanConfig::default(),
            indirect: IndirectConfig::default(),
            registry: RegistryConfig::default(),
            threads: 0,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        let analysis = AnalysisConfig::new(PathBuf::new());
        Self {
            extensions: analysis.extensions,
            ignore: vec![],
            scan_developer_content: false,
            sidecar_suffix: analysis.sidecar_suffix,
        }
    }
}

impl Default for IndirectConfig {
    fn default() -> Self {
        let settings = IndirectSettings::default();
        Self {
            enabled: settings.enabled,
            policy: settings.policy,
            dirs: settings.dirs,
            extensions: settings.extensions,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".assetsweep.yml",
            ".assetsweep.yaml",
            ".assetsweep.toml",
            "assetsweep.yml",
            "assetsweep.yaml",
            "assetsweep.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Resolve this file configuration into the engine's analysis input
    pub fn analysis_config(&self, project_root: &Path) -> AnalysisConfig {
        let content_root = if self.content_dir.is_absolute() {
            self.content_dir.clone()
        } else {
            project_root.join(&self.content_dir)
        };

        let mut exclude_classes = self.exclude.classes.clone();
        exclude_classes.sort();
        exclude_classes.dedup();

        AnalysisConfig::new(project_root.to_path_buf())
            .with_content_root(content_root)
            .with_mount_point(&self.mount_point)
            .with_extensions(self.scan.extensions.clone())
            .with_scan_ignore(self.scan.ignore.clone())
            .with_developer_content(self.scan.scan_developer_content)
            .with_sidecar_suffix(&self.scan.sidecar_suffix)
            .with_roots(self.roots.clone())
            .with_root_classes(self.root_classes.clone())
            .with_exclude_paths(self.exclude.paths.clone())
            .with_exclude_classes(exclude_classes)
            .with_exclude_assets(self.exclude.assets.clone())
            .with_indirect(IndirectSettings {
                enabled: self.indirect.enabled,
                policy: self.indirect.policy,
                dirs: self.indirect.dirs.clone(),
                extensions: self.indirect.extensions.clone(),
            })
            .with_threads(self.threads)
    }
}
