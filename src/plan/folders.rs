use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::graph::AssetId;
use crate::index::{is_protected_folder, Inventory};

/// Snapshot of which files live in which content folders
///
/// Used to predict the folders left empty once planned assets are gone.
#[derive(Debug, Clone, Default)]
pub struct FolderLayout {
    content_root: PathBuf,
    directories: Vec<PathBuf>,
    assets: Vec<(AssetId, PathBuf)>,
    /// Files and folders that always stay: non-engine files, unreadable
    /// paths, folders holding anything the scan did not walk
    pinned: Vec<PathBuf>,
}

impl FolderLayout {
    /// Build from a scan, checking each folder on disk for entries the scan
    /// skipped (hidden files, pruned folders)
    pub fn from_inventory(inventory: &Inventory, sidecar_suffix: &str) -> Self {
        let directories: HashSet<&Path> = inventory.directories.iter().map(|d| d.as_path()).collect();
        let mut known_files: HashSet<PathBuf> = HashSet::new();
        for asset in &inventory.assets {
            known_files.insert(asset.path.clone());
            let mut sidecar = asset.path.clone().into_os_string();
            sidecar.push(sidecar_suffix);
            known_files.insert(PathBuf::from(sidecar));
        }
        known_files.extend(inventory.non_engine_files.iter().cloned());

        let mut pinned: Vec<PathBuf> = inventory
            .non_engine_files
            .iter()
            .cloned()
            .chain(inventory.unreadable.iter().map(|u| u.path.clone()))
            .collect();

        for dir in &inventory.directories {
            let Ok(entries) = std::fs::read_dir(dir) else {
                pinned.push(dir.clone());
                continue;
            };
            let has_unknown = entries.filter_map(|e| e.ok()).any(|entry| {
                let path = entry.path();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir {
                    !directories.contains(path.as_path())
                } else {
                    !known_files.contains(&path)
                }
            });
            if has_unknown {
                trace!("Pinning folder with unscanned entries: {}", dir.display());
                pinned.push(dir.clone());
            }
        }

        Self {
            content_root: inventory.content_root.clone(),
            directories: inventory.directories.clone(),
            assets: inventory
                .assets
                .iter()
                .map(|a| (a.id.clone(), a.path.clone()))
                .collect(),
            pinned,
        }
    }

    /// Folders with nothing left in them after `removed` assets are gone,
    /// deepest first
    pub fn removable_folders(&self, removed: &HashSet<&AssetId>) -> Vec<PathBuf> {
        let mut occupied: HashSet<&Path> = HashSet::new();
        let remaining = self
            .assets
            .iter()
            .filter(|(id, _)| !removed.contains(id))
            .map(|(_, path)| path.as_path())
            .chain(self.pinned.iter().map(|p| p.as_path()));

        for path in remaining {
            for ancestor in path.ancestors() {
                if !occupied.insert(ancestor) || ancestor == self.content_root {
                    break;
                }
            }
        }

        let mut folders: Vec<PathBuf> = self
            .directories
            .iter()
            .filter(|d| !occupied.contains(d.as_path()))
            .filter(|d| !is_protected_folder(&self.content_root, d))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        folders.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| a.cmp(b))
        });
        folders
    }
}
