// Asset index - content tree inventory

mod scanner;

pub use scanner::{AssetIndex, IndexWalk};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::graph::AssetId;

/// Fatal failures of a content scan
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Content root not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Content root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied { path },
            _ => ScanError::Io { path, source },
        }
    }
}

/// One engine asset file found by the scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub id: AssetId,
    pub path: PathBuf,
    pub extension: String,
    pub size_bytes: u64,
    pub folder: String,
}

/// A path the scan could not read, kept for the report
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnreadablePath {
    pub path: PathBuf,
    pub message: String,
}

/// Item produced by the lazy content walk
#[derive(Debug, Clone)]
pub enum IndexEntry {
    Asset(AssetDescriptor),
    /// Dependency sidecar next to an asset file
    Sidecar(PathBuf),
    NonEngineFile(PathBuf),
    Directory(PathBuf),
    Unreadable(UnreadablePath),
}

/// Result of a full content scan
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub content_root: PathBuf,

    /// Indexed assets, sorted by id, one per id
    pub assets: Vec<AssetDescriptor>,

    /// Files that are neither assets nor sidecars of an indexed asset
    pub non_engine_files: Vec<PathBuf>,

    /// Every walked folder below the content root
    pub directories: Vec<PathBuf>,

    /// Folders without any file beneath them, protected folders excepted
    pub empty_folders: Vec<PathBuf>,

    pub unreadable: Vec<UnreadablePath>,

    /// The walk stopped early on cancellation
    pub cancelled: bool,
}

impl Inventory {
    pub fn asset(&self, id: &AssetId) -> Option<&AssetDescriptor> {
        self.assets
            .binary_search_by(|a| a.id.cmp(id))
            .ok()
            .map(|idx| &self.assets[idx])
    }

    /// Insert or replace an asset, keeping the list sorted
    pub fn upsert_asset(&mut self, descriptor: AssetDescriptor) {
        match self.assets.binary_search_by(|a| a.id.cmp(&descriptor.id)) {
            Ok(idx) => self.assets[idx] = descriptor,
            Err(idx) => self.assets.insert(idx, descriptor),
        }
    }

    pub fn remove_asset(&mut self, id: &AssetId) -> Option<AssetDescriptor> {
        self.assets
            .binary_search_by(|a| a.id.cmp(id))
            .ok()
            .map(|idx| self.assets.remove(idx))
    }

    /// Check if a folder is never offered for removal
    pub fn is_protected_folder(&self, folder: &Path) -> bool {
        is_protected_folder(&self.content_root, folder)
    }

    /// Recompute `empty_folders` from the directory list and the disk
    ///
    /// A folder is empty when it holds no file at any depth. Folders pruned
    /// by scan rules are not in `directories`, so their parents count as
    /// occupied.
    pub fn recompute_empty_folders(&mut self) {
        let mut occupied: HashSet<&Path> = HashSet::new();
        let files = self
            .assets
            .iter()
            .map(|a| a.path.as_path())
            .chain(self.non_engine_files.iter().map(|p| p.as_path()))
            .chain(self.unreadable.iter().map(|u| u.path.as_path()));
        for file in files {
            for ancestor in file.ancestors().skip(1) {
                if !occupied.insert(ancestor) || ancestor == self.content_root {
                    break;
                }
            }
        }

        let mut candidates: Vec<&PathBuf> = self
            .directories
            .iter()
            .filter(|d| !occupied.contains(d.as_path()))
            .collect();
        // Deepest first so children are decided before parents
        candidates.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| a.cmp(b))
        });

        let mut empty: BTreeSet<PathBuf> = BTreeSet::new();
        for dir in candidates {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            let all_empty = entries.into_iter().all(|entry| match entry {
                Ok(entry) => empty.contains(&entry.path()),
                Err(_) => false,
            });
            if all_empty {
                empty.insert(dir.clone());
            }
        }

        let root = self.content_root.clone();
        self.empty_folders = empty
            .into_iter()
            .filter(|d| !is_protected_folder(&root, d))
            .collect();
    }
}

/// The content root itself, `Collections` and `Developers` (and anything
/// beneath them) are never removed
pub fn is_protected_folder(content_root: &Path, folder: &Path) -> bool {
    let Ok(rel) = folder.strip_prefix(content_root) else {
        return true;
    };
    match rel.components().next() {
        None => true,
        Some(first) => {
            let first = first.as_os_str().to_string_lossy();
            first.eq_ignore_ascii_case("Collections") || first.eq_ignore_ascii_case("Developers")
        }
    }
}

/// Mount path of a file or folder under the content root
///
/// `Content/Maps/LevelA.umap` becomes `/Game/Maps/LevelA.umap`.
pub fn mount_path(content_root: &Path, mount_point: &str, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(content_root).ok()?;
    let mut out = mount_point.trim_end_matches('/').to_string();
    for component in rel.components() {
        out.push('/');
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    Some(out)
}
