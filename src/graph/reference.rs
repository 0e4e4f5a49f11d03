use serde::{Deserialize, Serialize};

use super::AssetId;

/// Kind of reference between assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Loading the source eagerly loads the target
    Hard,

    /// Resolved at runtime (soft object paths, async loads, string paths)
    Soft,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Hard => "hard",
            ReferenceKind::Soft => "soft",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a reference was discovered
///
/// Ordered so that the stronger evidence compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discovery {
    /// Found by scanning string data for asset paths
    Inferred,

    /// Listed in the asset's dependency metadata
    Declared,
}

/// The set of reference kinds held by one ordered pair of assets
///
/// At most one entry per kind; merging keeps the strongest discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeKinds {
    pub hard: Option<Discovery>,
    pub soft: Option<Discovery>,
}

impl EdgeKinds {
    pub fn single(kind: ReferenceKind, discovered: Discovery) -> Self {
        let mut kinds = Self::default();
        kinds.insert(kind, discovered);
        kinds
    }

    /// Add a kind; returns true if the set changed
    pub fn insert(&mut self, kind: ReferenceKind, discovered: Discovery) -> bool {
        let slot = match kind {
            ReferenceKind::Hard => &mut self.hard,
            ReferenceKind::Soft => &mut self.soft,
        };
        match slot {
            Some(existing) if *existing >= discovered => false,
            _ => {
                *slot = Some(discovered);
                true
            }
        }
    }

    pub fn has(&self, kind: ReferenceKind) -> bool {
        match kind {
            ReferenceKind::Hard => self.hard.is_some(),
            ReferenceKind::Soft => self.soft.is_some(),
        }
    }

    pub fn is_hard(&self) -> bool {
        self.hard.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.hard.is_none() && self.soft.is_none()
    }

    /// Iterate the kinds present, hard first
    pub fn iter(&self) -> impl Iterator<Item = (ReferenceKind, Discovery)> {
        let hard = self.hard.map(|d| (ReferenceKind::Hard, d));
        let soft = self.soft.map(|d| (ReferenceKind::Soft, d));
        hard.into_iter().chain(soft)
    }
}

/// A single typed edge, as exposed to callers and reports
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceEdge {
    pub from: AssetId,
    pub to: AssetId,
    pub kind: ReferenceKind,
    pub discovered: Discovery,
}

impl ReferenceEdge {
    pub fn new(from: AssetId, to: AssetId, kind: ReferenceKind, discovered: Discovery) -> Self {
        Self {
            from,
            to,
            kind,
            discovered,
        }
    }
}

/// An outgoing reference before it is resolved against the graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawReference {
    pub target: AssetId,
    pub kind: ReferenceKind,
    pub discovered: Discovery,
}

impl RawReference {
    pub fn new(target: AssetId, kind: ReferenceKind, discovered: Discovery) -> Self {
        Self {
            target,
            kind,
            discovered,
        }
    }

    pub fn hard(target: &str) -> Self {
        Self::new(AssetId::new(target), ReferenceKind::Hard, Discovery::Declared)
    }

    pub fn soft(target: &str) -> Self {
        Self::new(AssetId::new(target), ReferenceKind::Soft, Discovery::Declared)
    }
}

/// Edge whose target is outside the indexed set (recorded, not an error)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DanglingReference {
    pub from: AssetId,
    pub to: AssetId,
    pub kind: ReferenceKind,
}

impl std::fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} reference from {} to unindexed {}", self.kind, self.from, self.to)
    }
}
