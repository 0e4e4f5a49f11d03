use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use thiserror::Error;

use super::AnalysisConfig;
use crate::graph::{AssetId, AssetNode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Root, exclusion and scan-ignore rules compiled for matching
///
/// Glob patterns match asset ids case-insensitively and `*` does not cross
/// `/`. A pattern without glob syntax names a folder or asset and also
/// matches everything under it, for roots and exclusions alike. Plain roots
/// may be object paths (`/Game/Core/GameMode.GameMode`).
#[derive(Debug, Clone)]
pub struct CompiledRules {
    scan_ignore: GlobSet,
    root_paths: GlobSet,
    root_classes: HashSet<String>,
    exclude_paths: GlobSet,
    exclude_assets: HashSet<AssetId>,
    exclude_classes: HashSet<String>,
}

impl CompiledRules {
    pub fn compile(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        let mut scan_ignore = config.builtin_scan_ignore();
        scan_ignore.extend(config.scan_ignore.iter().cloned());

        let roots: Vec<String> = config
            .roots
            .iter()
            .map(|r| {
                if is_glob(r) {
                    r.clone()
                } else {
                    AssetId::new(r).as_str().to_string()
                }
            })
            .collect();

        let exclude_classes = config
            .exclude_classes
            .iter()
            .chain(config.forbidden_classes.iter())
            .map(|c| c.to_lowercase())
            .collect();

        Ok(Self {
            scan_ignore: build_set(scan_ignore.iter())?,
            root_paths: build_set(roots.iter())?,
            root_classes: config.root_classes.iter().map(|c| c.to_lowercase()).collect(),
            exclude_paths: build_set(config.exclude_paths.iter())?,
            exclude_assets: config.exclude_assets.iter().map(|a| AssetId::new(a)).collect(),
            exclude_classes,
        })
    }

    /// Check a mount path (`/Game/Developers`) against the scan ignore list
    pub fn is_scan_ignored(&self, mount_path: &str) -> bool {
        self.scan_ignore.is_match(mount_path)
    }

    /// Check if an asset is pinned as a root by configuration
    pub fn is_root(&self, node: &AssetNode) -> bool {
        self.root_paths.is_match(node.id.as_str())
            || self.root_classes.contains(&node.class_type.to_lowercase())
    }

    /// Check if an asset matches an exclusion rule
    pub fn is_excluded(&self, node: &AssetNode) -> bool {
        self.exclude_assets.contains(&node.id)
            || self.exclude_paths.is_match(node.id.as_str())
            || self.exclude_classes.contains(&node.class_type.to_lowercase())
    }
}

impl Default for CompiledRules {
    fn default() -> Self {
        Self {
            scan_ignore: GlobSet::empty(),
            root_paths: GlobSet::empty(),
            root_classes: HashSet::new(),
            exclude_paths: GlobSet::empty(),
            exclude_assets: HashSet::new(),
            exclude_classes: HashSet::new(),
        }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(|c: char| matches!(c, '*' | '?' | '[' | '{'))
}

fn build_set<'a>(patterns: impl Iterator<Item = &'a String>) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed = pattern.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            continue;
        }

        let mut expanded = vec![trimmed.to_string()];
        if !is_glob(trimmed) {
            expanded.push(format!("{}/**", trimmed));
        }

        for p in expanded {
            let glob = GlobBuilder::new(&p)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
    }

    builder.build().map_err(|source| ConfigError::InvalidPattern {
        pattern: "<set>".to_string(),
        source,
    })
}
