// Analysis module - reachability, cycles and classification

mod classifier;
mod cycles;
mod reachability;

pub use classifier::{Classifier, Seeds};
pub use cycles::CycleDetector;
pub use reachability::ReachabilityAnalyzer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::AssetId;

/// Per-asset outcome of a classification pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Hard-reachable from a root
    Used,
    /// Reachable only through at least one soft reference
    IndirectlyUsed,
    /// Not reachable, not excluded, not on a cycle
    Unused,
    /// On a hard cycle that no root reaches
    Circular,
    /// Matched by an exclusion rule, or a redirector
    Excluded,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Used,
        Classification::IndirectlyUsed,
        Classification::Unused,
        Classification::Circular,
        Classification::Excluded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Used => "used",
            Classification::IndirectlyUsed => "indirectly used",
            Classification::Unused => "unused",
            Classification::Circular => "circular",
            Classification::Excluded => "excluded",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of assets per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub total: usize,
    pub used: usize,
    pub indirectly_used: usize,
    pub unused: usize,
    pub circular: usize,
    pub excluded: usize,
}

impl ClassificationCounts {
    pub fn get(&self, class: Classification) -> usize {
        match class {
            Classification::Used => self.used,
            Classification::IndirectlyUsed => self.indirectly_used,
            Classification::Unused => self.unused,
            Classification::Circular => self.circular,
            Classification::Excluded => self.excluded,
        }
    }

    fn add(&mut self, class: Classification) {
        self.total += 1;
        match class {
            Classification::Used => self.used += 1,
            Classification::IndirectlyUsed => self.indirectly_used += 1,
            Classification::Unused => self.unused += 1,
            Classification::Circular => self.circular += 1,
            Classification::Excluded => self.excluded += 1,
        }
    }
}

/// Complete classification of one graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Exactly one entry per graph node
    pub classes: BTreeMap<AssetId, Classification>,

    /// For reached non-root assets, the asset they were first reached from
    pub reached_via: BTreeMap<AssetId, AssetId>,

    /// Hard cycles no root reaches, members sorted, list sorted
    pub cycles: Vec<Vec<AssetId>>,
}

impl ClassificationResult {
    pub fn get(&self, id: &AssetId) -> Option<Classification> {
        self.classes.get(id).copied()
    }

    /// Ids with the given classification, in canonical order
    pub fn ids_with(&self, class: Classification) -> Vec<&AssetId> {
        self.classes
            .iter()
            .filter(|(_, c)| **c == class)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn counts(&self) -> ClassificationCounts {
        let mut counts = ClassificationCounts::default();
        for class in self.classes.values() {
            counts.add(*class);
        }
        counts
    }
}
