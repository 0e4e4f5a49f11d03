// Cleanup planner - ordered, advisory deletion plan

mod folders;

pub use folders::FolderLayout;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::{Classification, ClassificationResult};
use crate::graph::{AssetId, Direction, Graph, ReferenceKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Analysis did not complete; refusing to plan deletions from partial results")]
    Incomplete,

    #[error("Report generation {report} does not match the current graph (generation {current}); re-run the analysis")]
    StaleReport { report: u64, current: u64 },
}

/// Why an asset appears in a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupReason {
    /// Nothing references the asset
    Unreferenced,
    /// Referenced only by assets that are themselves unused
    Unreachable,
    /// A kept asset holds a hard reference to it
    HardReferencedByKeptAsset,
    /// Kept alive only through soft references
    SoftReferencedOnly,
    /// Part of a hard cycle that no root reaches
    CircularIsland,
}

impl CleanupReason {
    pub fn describe(&self) -> &'static str {
        match self {
            CleanupReason::Unreferenced => "not referenced by any asset",
            CleanupReason::Unreachable => "referenced only by unused assets",
            CleanupReason::HardReferencedByKeptAsset => "hard referenced by a kept asset",
            CleanupReason::SoftReferencedOnly => "reachable only through soft references",
            CleanupReason::CircularIsland => "on a reference cycle no root reaches",
        }
    }
}

impl std::fmt::Display for CleanupReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupCandidate {
    pub id: AssetId,
    pub reason: CleanupReason,
    pub blocked_by: BTreeSet<AssetId>,
    pub size_bytes: u64,
    pub file: Option<PathBuf>,
}

/// Advisory deletion plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupPlan {
    /// Generation of the graph the plan was computed from
    pub generation: u64,

    /// Safe deletions, leaves first
    pub steps: Vec<CleanupCandidate>,

    /// Unused assets a kept asset still hard references
    pub blocked: Vec<CleanupCandidate>,

    /// Never auto-deleted: soft-only and circular assets
    pub needs_confirmation: Vec<CleanupCandidate>,

    /// Folders left empty after the steps run, deepest first
    pub folders_to_remove: Vec<PathBuf>,

    pub total_bytes: u64,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.folders_to_remove.is_empty()
    }

    pub fn step_ids(&self) -> Vec<&AssetId> {
        self.steps.iter().map(|s| &s.id).collect()
    }
}

/// Builds a cleanup plan from a classified graph
pub struct CleanupPlanner<'a> {
    layout: Option<&'a FolderLayout>,
}

impl<'a> CleanupPlanner<'a> {
    pub fn new() -> Self {
        Self { layout: None }
    }

    /// Also compute the folders the plan leaves empty
    pub fn with_layout(mut self, layout: &'a FolderLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn plan(&self, graph: &Graph, classes: &ClassificationResult) -> CleanupPlan {
        let candidates: BTreeSet<&AssetId> = classes
            .ids_with(Classification::Unused)
            .into_iter()
            .filter(|id| graph.contains(id))
            .collect();

        let (pending, blocked) = self.resolve_blocking(graph, candidates);
        let ordered = self.leaves_first(graph, &pending);

        let steps: Vec<CleanupCandidate> = ordered
            .into_iter()
            .map(|id| {
                let reason = if graph.is_referenced(id) {
                    CleanupReason::Unreachable
                } else {
                    CleanupReason::Unreferenced
                };
                self.candidate(graph, id, reason, BTreeSet::new())
            })
            .collect();

        let blocked: Vec<CleanupCandidate> = blocked
            .into_iter()
            .map(|(id, by)| self.candidate(graph, id, CleanupReason::HardReferencedByKeptAsset, by))
            .collect();

        let mut needs_confirmation: Vec<CleanupCandidate> = Vec::new();
        for (id, class) in &classes.classes {
            let reason = match class {
                Classification::IndirectlyUsed => CleanupReason::SoftReferencedOnly,
                Classification::Circular => CleanupReason::CircularIsland,
                _ => continue,
            };
            if graph.contains(id) {
                needs_confirmation.push(self.candidate(graph, id, reason, BTreeSet::new()));
            }
        }

        let folders_to_remove = match self.layout {
            Some(layout) => {
                let removed: HashSet<&AssetId> = steps.iter().map(|s| &s.id).collect();
                layout.removable_folders(&removed)
            }
            None => Vec::new(),
        };

        let total_bytes = steps.iter().map(|s| s.size_bytes).sum();

        info!(
            "Plan: {} deletions ({} bytes), {} blocked, {} need confirmation, {} folders",
            steps.len(),
            total_bytes,
            blocked.len(),
            needs_confirmation.len(),
            folders_to_remove.len()
        );

        CleanupPlan {
            generation: 0,
            steps,
            blocked,
            needs_confirmation,
            folders_to_remove,
            total_bytes,
        }
    }

    /// Demote candidates hard referenced from outside the pending set
    ///
    /// Worklist over hard edges: once an asset is blocked, every pending
    /// asset it hard references is held from outside too.
    fn resolve_blocking<'g>(
        &self,
        graph: &'g Graph,
        candidates: BTreeSet<&'g AssetId>,
    ) -> (BTreeSet<&'g AssetId>, BTreeMap<&'g AssetId, BTreeSet<AssetId>>) {
        let mut pending = candidates;
        let mut queue: VecDeque<&AssetId> = pending
            .iter()
            .copied()
            .filter(|&id| {
                graph
                    .neighbors_of_kind(id, Direction::Incoming, ReferenceKind::Hard)
                    .into_iter()
                    .any(|holder| holder != id && !pending.contains(holder))
            })
            .collect();

        let mut demoted: Vec<&AssetId> = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !pending.remove(id) {
                continue;
            }
            demoted.push(id);
            for dep in graph.neighbors_of_kind(id, Direction::Outgoing, ReferenceKind::Hard) {
                if dep != id && pending.contains(dep) {
                    queue.push_back(dep);
                }
            }
        }

        let blocked: BTreeMap<&AssetId, BTreeSet<AssetId>> = demoted
            .into_iter()
            .map(|id| {
                let holders: BTreeSet<AssetId> = graph
                    .neighbors_of_kind(id, Direction::Incoming, ReferenceKind::Hard)
                    .into_iter()
                    .filter(|holder| *holder != id && !pending.contains(holder))
                    .cloned()
                    .collect();
                debug!("Blocked {}: held by {} kept assets", id, holders.len());
                (id, holders)
            })
            .collect();

        (pending, blocked)
    }

    /// Emit candidates whose hard dependencies among the pending set are
    /// already emitted, in canonical order per round
    fn leaves_first<'g>(&self, graph: &'g Graph, pending: &BTreeSet<&'g AssetId>) -> Vec<&'g AssetId> {
        let mut waiting: HashMap<&AssetId, usize> = pending
            .iter()
            .map(|&id| {
                let deps = graph
                    .neighbors_of_kind(id, Direction::Outgoing, ReferenceKind::Hard)
                    .into_iter()
                    .filter(|dep| *dep != id && pending.contains(dep))
                    .count();
                (id, deps)
            })
            .collect();

        let mut ordered = Vec::with_capacity(pending.len());
        let mut round: BTreeSet<&AssetId> = waiting
            .iter()
            .filter(|(_, &deps)| deps == 0)
            .map(|(&id, _)| id)
            .collect();

        while !round.is_empty() {
            let mut next = BTreeSet::new();
            for id in round {
                waiting.remove(id);
                ordered.push(id);
                for holder in graph.neighbors_of_kind(id, Direction::Incoming, ReferenceKind::Hard) {
                    if holder == id {
                        continue;
                    }
                    if let Some(deps) = waiting.get_mut(holder) {
                        *deps -= 1;
                        if *deps == 0 {
                            next.insert(holder);
                        }
                    }
                }
            }
            round = next;
        }

        // Unused assets carry no hard cycles; emit any that slip through as is
        let mut stuck: Vec<&AssetId> = waiting.into_keys().collect();
        stuck.sort();
        ordered.extend(stuck);

        ordered
    }

    fn candidate(
        &self,
        graph: &Graph,
        id: &AssetId,
        reason: CleanupReason,
        blocked_by: BTreeSet<AssetId>,
    ) -> CleanupCandidate {
        let node = graph.node(id);
        CleanupCandidate {
            id: id.clone(),
            reason,
            blocked_by,
            size_bytes: node.map(|n| n.size_bytes).unwrap_or(0),
            file: node.and_then(|n| n.file.clone()),
        }
    }
}

impl Default for CleanupPlanner<'_> {
    fn default() -> Self {
        Self::new()
    }
}
