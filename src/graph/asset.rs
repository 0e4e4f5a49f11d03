use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use super::{Discovery, ReferenceKind};

/// Stable identifier for one asset package, e.g. `/Game/Maps/LevelA`.
///
/// Equality, hashing and ordering go through the canonical form (forward
/// slashes, no trailing slash, no object suffix, lower-cased). The original
/// spelling is kept for display.
#[derive(Debug, Clone)]
pub struct AssetId {
    display: String,
    canonical: String,
}

impl AssetId {
    /// Build an id from a package path, object path or export text path.
    ///
    /// Accepted forms include `/Game/A/B`, `/Game/A/B.B`, `\Game\A\B` and
    /// `Texture2D'/Game/A/B.B'`.
    pub fn new(path: &str) -> Self {
        let display = normalize(path);
        let canonical = display.to_lowercase();
        Self { display, canonical }
    }

    /// Original-case spelling after separator normalization
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Lower-cased comparison key
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Last path segment (the package name)
    pub fn name(&self) -> &str {
        self.display
            .rsplit('/')
            .next()
            .unwrap_or(self.display.as_str())
    }

    /// Package folder, e.g. `/Game/Maps` for `/Game/Maps/LevelA`
    pub fn folder(&self) -> &str {
        match self.display.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &self.display[..idx],
        }
    }

    /// Check whether this id lives under the given mount point (`/Game`)
    pub fn is_under(&self, mount_point: &str) -> bool {
        let mount = normalize(mount_point).to_lowercase();
        self.canonical == mount
            || (self.canonical.starts_with(&mount)
                && self.canonical.as_bytes().get(mount.len()) == Some(&b'/'))
    }
}

fn normalize(raw: &str) -> String {
    let mut path = raw.trim();

    // Export text form: Class'/Game/Path.Object'
    if let (Some(start), Some(end)) = (path.find('\''), path.rfind('\'')) {
        if end > start + 1 {
            path = &path[start + 1..end];
        }
    }
    let path = path.trim_matches('"');

    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split(|c: char| c == '/' || c == '\\').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        return out;
    }

    // Object path: strip `.ObjectName` (and any `:SubObject`) from the last segment
    let last_start = out.rfind('/').map(|i| i + 1).unwrap_or(0);
    if let Some(dot) = out[last_start..].find(|c: char| c == '.' || c == ':') {
        out.truncate(last_start + dot);
    }

    out
}

impl PartialEq for AssetId {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for AssetId {}

impl Hash for AssetId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for AssetId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssetId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for AssetId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| AssetId::new(&s))
    }
}

/// A reference that pointed outside the indexed set and was dropped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalReference {
    pub target: AssetId,
    pub kind: ReferenceKind,
    pub discovered: Discovery,
}

/// One asset in the dependency graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetNode {
    pub id: AssetId,

    /// Declared class, e.g. `Texture2D`, `World`, `Blueprint`
    pub class_type: String,

    pub size_bytes: u64,

    pub is_redirector: bool,

    /// Pinned as a root for the current analysis pass
    pub is_root: bool,

    /// Package folder (`/Game/Textures`)
    pub folder: String,

    /// Asset file on disk, when the node came from a content scan
    pub file: Option<PathBuf>,

    /// References that were dropped because their target is not indexed
    pub external_refs: BTreeSet<ExternalReference>,
}

impl AssetNode {
    pub fn new(id: AssetId, class_type: impl Into<String>) -> Self {
        let folder = id.folder().to_string();
        Self {
            id,
            class_type: class_type.into(),
            size_bytes: 0,
            is_redirector: false,
            is_root: false,
            folder,
            file: None,
            external_refs: BTreeSet::new(),
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_redirector(mut self, is_redirector: bool) -> Self {
        self.is_redirector = is_redirector;
        self
    }

    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }

    pub fn with_file(mut self, file: PathBuf) -> Self {
        self.file = Some(file);
        self
    }
}
