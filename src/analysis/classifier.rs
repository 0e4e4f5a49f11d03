use super::{Classification, ClassificationResult, CycleDetector, ReachabilityAnalyzer};
use crate::graph::{AssetId, Graph};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Inputs of a classification pass besides the graph itself
#[derive(Debug, Clone, Default)]
pub struct Seeds {
    /// Roots in addition to nodes flagged `is_root`
    pub roots: BTreeSet<AssetId>,

    /// Extra starting points of the soft traversal
    pub soft: BTreeSet<AssetId>,

    /// Assets matched by exclusion rules
    pub excluded: BTreeSet<AssetId>,
}

impl Seeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, id: &str) -> Self {
        self.roots.insert(AssetId::new(id));
        self
    }

    pub fn with_soft(mut self, id: &str) -> Self {
        self.soft.insert(AssetId::new(id));
        self
    }

    pub fn with_excluded(mut self, id: &str) -> Self {
        self.excluded.insert(AssetId::new(id));
        self
    }
}

/// Assigns exactly one classification to every asset
///
/// Precedence: root or hard reach, then soft reach, then exclusion or
/// redirector, then hard cycle, then unused.
pub struct Classifier {
    reachability: ReachabilityAnalyzer,
    cycles: CycleDetector,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            reachability: ReachabilityAnalyzer::new(),
            cycles: CycleDetector::new(),
        }
    }

    pub fn classify(&self, graph: &Graph, seeds: &Seeds) -> ClassificationResult {
        let mut roots: BTreeSet<&AssetId> = graph
            .nodes()
            .filter(|n| n.is_root)
            .map(|n| &n.id)
            .collect();
        roots.extend(seeds.roots.iter().filter(|id| graph.contains(id)));
        info!("Classifying {} assets from {} roots", graph.node_count(), roots.len());

        let mut visited: BTreeMap<AssetId, Option<AssetId>> = BTreeMap::new();

        // Hard pass: Used
        let used: BTreeSet<AssetId> = self
            .reachability
            .traverse(graph, roots.iter().copied(), &mut visited, |k| k.is_hard())
            .into_iter()
            .collect();

        // Soft pass from everything used, plus soft seeds: IndirectlyUsed
        let soft_starts: Vec<&AssetId> = used.iter().chain(seeds.soft.iter()).collect();
        let indirect: BTreeSet<AssetId> = self
            .reachability
            .traverse(graph, soft_starts, &mut visited, |k| !k.is_empty())
            .into_iter()
            .collect();

        let unreached: BTreeSet<AssetId> = graph
            .sorted_ids()
            .into_iter()
            .filter(|id| !visited.contains_key(*id))
            .cloned()
            .collect();
        let cycles = self.cycles.find_cycles(graph, &unreached);
        let on_cycle: HashSet<&AssetId> = cycles.iter().flatten().collect();

        let mut classes = BTreeMap::new();
        for node in graph.nodes() {
            let id = &node.id;
            let class = if used.contains(id) {
                Classification::Used
            } else if indirect.contains(id) {
                Classification::IndirectlyUsed
            } else if node.is_redirector || seeds.excluded.contains(id) {
                Classification::Excluded
            } else if on_cycle.contains(id) {
                Classification::Circular
            } else {
                Classification::Unused
            };
            debug!("{} -> {}", id, class);
            classes.insert(id.clone(), class);
        }

        let reached_via = visited
            .into_iter()
            .filter_map(|(id, via)| via.map(|parent| (id, parent)))
            .collect();

        let result = ClassificationResult {
            classes,
            reached_via,
            cycles,
        };
        let counts = result.counts();
        info!(
            "Classified: {} used, {} indirectly used, {} unused, {} circular, {} excluded",
            counts.used, counts.indirectly_used, counts.unused, counts.circular, counts.excluded
        );
        result
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
