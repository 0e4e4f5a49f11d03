// Indirect references - asset paths spelled out in source and config files

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::paths::{strip_class_suffix, MountPathMatcher};
use crate::config::IndirectSettings;
use crate::graph::AssetId;
use crate::index::UnreadablePath;

/// An indexed asset named in a source or config file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndirectReference {
    pub target: AssetId,
    pub file: PathBuf,
    pub line: usize,
}

#[derive(Debug, Default)]
pub struct IndirectScan {
    /// Sorted and deduplicated
    pub references: Vec<IndirectReference>,
    pub unreadable: Vec<UnreadablePath>,
    pub files_scanned: usize,
}

impl IndirectScan {
    /// Distinct referenced assets
    pub fn targets(&self) -> BTreeSet<AssetId> {
        self.references.iter().map(|r| r.target.clone()).collect()
    }
}

/// Scans project source and config folders for mount paths
pub struct IndirectScanner<'a> {
    project_root: &'a Path,
    settings: &'a IndirectSettings,
    paths: &'a MountPathMatcher,
}

impl<'a> IndirectScanner<'a> {
    pub fn new(project_root: &'a Path, settings: &'a IndirectSettings, paths: &'a MountPathMatcher) -> Self {
        Self {
            project_root,
            settings,
            paths,
        }
    }

    /// Directories to scan; `Plugins` expands to each plugin's Source and Config
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        for dir in &self.settings.dirs {
            let full = self.project_root.join(dir);
            let is_plugins = dir
                .file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case("Plugins"));

            if !is_plugins {
                if full.is_dir() {
                    roots.push(full);
                }
                continue;
            }

            let Ok(entries) = std::fs::read_dir(&full) else {
                continue;
            };
            let mut plugins: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            plugins.sort();
            for plugin in plugins {
                for sub in ["Source", "Config"] {
                    let candidate = plugin.join(sub);
                    if candidate.is_dir() {
                        roots.push(candidate);
                    }
                }
            }
        }
        roots
    }

    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in self.scan_roots() {
            let walker = WalkBuilder::new(&root)
                .hidden(true)           // Skip hidden files
                .git_ignore(true)       // Respect .gitignore
                .build();

            for entry in walker.flatten() {
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let path = entry.into_path();
                let matches_ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| self.settings.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
                if matches_ext {
                    files.push(path);
                }
            }
        }
        files.sort();
        files.dedup();
        files
    }

    /// Scan every file and keep references whose target is in `known`
    ///
    /// A `_C` suffix (generated class) is dropped when the literal path is
    /// not an indexed asset.
    pub fn scan(&self, known: &HashSet<AssetId>, cancel: &CancellationToken) -> IndirectScan {
        let files = self.collect_files();
        info!("Scanning {} source/config files for asset paths", files.len());

        let per_file: Vec<Result<Vec<IndirectReference>, UnreadablePath>> = files
            .par_iter()
            .filter_map(|file| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.scan_file(file, known))
            })
            .collect();

        let mut result = IndirectScan {
            files_scanned: per_file.len(),
            ..Default::default()
        };
        let mut references = BTreeSet::new();
        for outcome in per_file {
            match outcome {
                Ok(found) => references.extend(found),
                Err(unreadable) => result.unreadable.push(unreadable),
            }
        }
        result.references = references.into_iter().collect();
        result.unreadable.sort();

        debug!("Found {} indirect references", result.references.len());
        result
    }

    fn scan_file(&self, file: &Path, known: &HashSet<AssetId>) -> Result<Vec<IndirectReference>, UnreadablePath> {
        let bytes = std::fs::read(file).map_err(|e| UnreadablePath {
            path: file.to_path_buf(),
            message: e.to_string(),
        })?;
        let contents = String::from_utf8_lossy(&bytes);

        if !self.paths.is_match(&contents) {
            return Ok(Vec::new());
        }
        trace!("Asset paths found in {}", file.display());

        let references = self
            .paths
            .find_all(&contents)
            .into_iter()
            .filter_map(|found| {
                let target = resolve(&found.path, known)?;
                Some(IndirectReference {
                    target,
                    file: file.to_path_buf(),
                    line: found.line,
                })
            })
            .collect();
        Ok(references)
    }
}

fn resolve(path: &str, known: &HashSet<AssetId>) -> Option<AssetId> {
    let id = AssetId::new(path);
    if known.contains(&id) {
        return Some(id);
    }
    let trimmed = AssetId::new(strip_class_suffix(path)?);
    known.contains(&trimmed).then_some(trimmed)
}
