use ignore::{DirEntry, WalkBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{mount_path, AssetDescriptor, IndexEntry, Inventory, ScanError, UnreadablePath};
use crate::config::{AnalysisConfig, CompiledRules};
use crate::graph::AssetId;

/// Content tree scanner
pub struct AssetIndex<'a> {
    mount_point: String,
    extensions: Vec<String>,
    sidecar_suffix: String,
    rules: &'a CompiledRules,
    cancel: Option<CancellationToken>,
}

/// Lazy walk over a content tree
pub struct IndexWalk {
    inner: ignore::Walk,
    content_root: PathBuf,
    mount_point: String,
    extensions: Vec<String>,
    sidecar_suffix: String,
}

impl<'a> AssetIndex<'a> {
    pub fn new(config: &AnalysisConfig, rules: &'a CompiledRules) -> Self {
        Self {
            mount_point: config.mount_point.clone(),
            extensions: config.extensions.clone(),
            sidecar_suffix: config.sidecar_suffix.clone(),
            rules,
            cancel: None,
        }
    }

    /// Stop collecting entries once the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Start a lazy walk of the content tree
    ///
    /// Fails only when the root itself cannot be read.
    pub fn walk(&self, content_root: &Path) -> Result<IndexWalk, ScanError> {
        let metadata =
            std::fs::metadata(content_root).map_err(|e| ScanError::from_io(content_root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory {
                path: content_root.to_path_buf(),
            });
        }
        std::fs::read_dir(content_root).map_err(|e| ScanError::from_io(content_root, e))?;

        let rules = self.rules.clone();
        let root = content_root.to_path_buf();
        let mount = self.mount_point.clone();
        let extensions = self.extensions.clone();

        let walker = WalkBuilder::new(content_root)
            .hidden(true)           // Skip hidden files
            .git_ignore(false)      // Content trees are not source trees
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .follow_links(false)
            .filter_entry(move |entry| !is_ignored(entry, &root, &mount, &extensions, &rules))
            .build();

        Ok(IndexWalk {
            inner: walker,
            content_root: content_root.to_path_buf(),
            mount_point: self.mount_point.clone(),
            extensions: self.extensions.clone(),
            sidecar_suffix: self.sidecar_suffix.clone(),
        })
    }

    /// Scan the content tree into an inventory
    pub fn scan(&self, content_root: &Path) -> Result<Inventory, ScanError> {
        info!("Scanning content: {}", content_root.display());

        let mut inventory = Inventory {
            content_root: content_root.to_path_buf(),
            ..Default::default()
        };
        let mut sidecars = Vec::new();
        let mut assets = Vec::new();

        for entry in self.walk(content_root)? {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                warn!("Content scan cancelled");
                inventory.cancelled = true;
                break;
            }

            match entry {
                IndexEntry::Asset(descriptor) => assets.push(descriptor),
                IndexEntry::Sidecar(path) => sidecars.push(path),
                IndexEntry::NonEngineFile(path) => inventory.non_engine_files.push(path),
                IndexEntry::Directory(path) => inventory.directories.push(path),
                IndexEntry::Unreadable(unreadable) => {
                    warn!("Unreadable path {}: {}", unreadable.path.display(), unreadable.message);
                    inventory.unreadable.push(unreadable);
                }
            }
        }

        // Same id from two files (e.g. A.uasset and A.umap): first path wins
        assets.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.path.cmp(&b.path)));
        let mut seen: HashSet<AssetId> = HashSet::new();
        for descriptor in assets {
            if seen.insert(descriptor.id.clone()) {
                inventory.assets.push(descriptor);
            } else {
                warn!("Duplicate asset id {} at {}", descriptor.id, descriptor.path.display());
                inventory.unreadable.push(UnreadablePath {
                    message: format!("duplicate asset id {}", descriptor.id),
                    path: descriptor.path,
                });
            }
        }

        // Sidecars without their asset file are plain files
        let asset_paths: HashSet<&Path> =
            inventory.assets.iter().map(|a| a.path.as_path()).collect();
        let orphans: Vec<PathBuf> = sidecars
            .into_iter()
            .filter(|sidecar| {
                let owner = sidecar_owner(sidecar, &self.sidecar_suffix);
                !owner.as_deref().is_some_and(|o| asset_paths.contains(o))
            })
            .collect();
        inventory.non_engine_files.extend(orphans);

        inventory.non_engine_files.sort();
        inventory.directories.sort();
        inventory.unreadable.sort();
        inventory.recompute_empty_folders();

        info!(
            "Indexed {} assets, {} non-engine files, {} empty folders",
            inventory.assets.len(),
            inventory.non_engine_files.len(),
            inventory.empty_folders.len()
        );

        Ok(inventory)
    }

    /// Describe a single asset file, used by incremental refresh
    ///
    /// Returns `None` for paths outside the content root, non-asset files
    /// and scan-ignored paths.
    pub fn describe_file(&self, content_root: &Path, path: &Path) -> Option<AssetDescriptor> {
        let metadata = std::fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }
        if !self.is_indexed_path(content_root, path) {
            return None;
        }
        let ext = extension_of(path, &self.extensions)?;
        let id = asset_id_for(content_root, &self.mount_point, path)?;
        Some(descriptor(id, path, ext, metadata.len()))
    }

    /// Check whether a full scan would visit the path
    ///
    /// False outside the content root, below hidden entries and below
    /// scan-ignored folders.
    pub fn is_indexed_path(&self, content_root: &Path, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(content_root) else {
            return false;
        };
        if rel
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            return false;
        }
        let Some(mount) = mount_path(content_root, &self.mount_point, path) else {
            return false;
        };
        if ancestors_ignored(&mount, self.rules) {
            return false;
        }
        // Asset files are also matched by id
        !(extension_of(path, &self.extensions).is_some()
            && asset_id_for(content_root, &self.mount_point, path)
                .is_some_and(|id| self.rules.is_scan_ignored(id.as_str())))
    }

    pub fn is_sidecar(&self, path: &Path) -> bool {
        path.to_string_lossy().ends_with(&self.sidecar_suffix)
    }

    /// Asset file a sidecar belongs to
    pub fn sidecar_owner(&self, sidecar: &Path) -> Option<PathBuf> {
        sidecar_owner(sidecar, &self.sidecar_suffix)
    }
}

impl Iterator for IndexWalk {
    type Item = IndexEntry;

    fn next(&mut self) -> Option<IndexEntry> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = error_path(&err).unwrap_or_else(|| self.content_root.clone());
                    return Some(IndexEntry::Unreadable(UnreadablePath {
                        path,
                        message: err.to_string(),
                    }));
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path().to_path_buf();
            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                return Some(IndexEntry::Directory(path));
            }
            if !file_type.is_file() {
                trace!("Skipping non-regular entry {}", path.display());
                continue;
            }

            if path.to_string_lossy().ends_with(&self.sidecar_suffix) {
                return Some(IndexEntry::Sidecar(path));
            }

            let Some(ext) = extension_of(&path, &self.extensions) else {
                return Some(IndexEntry::NonEngineFile(path));
            };
            let Some(id) = asset_id_for(&self.content_root, &self.mount_point, &path) else {
                return Some(IndexEntry::NonEngineFile(path));
            };

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    return Some(IndexEntry::Unreadable(UnreadablePath {
                        path,
                        message: err.to_string(),
                    }))
                }
            };

            debug!("Found asset {} ({} bytes)", id, size);
            return Some(IndexEntry::Asset(descriptor(id, &path, ext, size)));
        }
    }
}

fn descriptor(id: AssetId, path: &Path, extension: String, size_bytes: u64) -> AssetDescriptor {
    let folder = id.folder().to_string();
    AssetDescriptor {
        id,
        path: path.to_path_buf(),
        extension,
        size_bytes,
        folder,
    }
}

fn is_ignored(
    entry: &DirEntry,
    root: &Path,
    mount: &str,
    extensions: &[String],
    rules: &CompiledRules,
) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let Some(mount_path) = mount_path(root, mount, entry.path()) else {
        return false;
    };
    if rules.is_scan_ignored(&mount_path) {
        trace!("Ignoring {}", mount_path);
        return true;
    }
    // Asset files are also matched by id
    extension_of(entry.path(), extensions).is_some()
        && asset_id_for(root, mount, entry.path()).is_some_and(|id| rules.is_scan_ignored(id.as_str()))
}

fn ancestors_ignored(folder: &str, rules: &CompiledRules) -> bool {
    let mut current = folder;
    loop {
        if rules.is_scan_ignored(current) {
            return true;
        }
        match current.rfind('/') {
            Some(idx) if idx > 0 => current = &current[..idx],
            _ => return false,
        }
    }
}

/// Lower-cased extension, if it is one of the asset extensions
fn extension_of(path: &Path, extensions: &[String]) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    extensions.contains(&ext).then_some(ext)
}

fn asset_id_for(content_root: &Path, mount_point: &str, path: &Path) -> Option<AssetId> {
    let without_ext = path.with_extension("");
    let mount = mount_path(content_root, mount_point, &without_ext)?;
    Some(AssetId::new(&mount))
}

fn sidecar_owner(sidecar: &Path, suffix: &str) -> Option<PathBuf> {
    let text = sidecar.to_str()?;
    text.strip_suffix(suffix).map(PathBuf::from)
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } => error_path(err),
        ignore::Error::WithLineNumber { err, .. } => error_path(err),
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}
