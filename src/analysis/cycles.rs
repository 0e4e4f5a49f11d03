// Cycle detector - hard reference islands that nothing outside keeps alive
//
// Assets on such an island reference each other, so none of them looks
// unreferenced, yet no root reaches them. They are surfaced separately and
// never auto-deleted.

use crate::graph::{AssetId, Graph};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Detector for hard-reference cycles
pub struct CycleDetector;

impl CycleDetector {
    pub fn new() -> Self {
        Self
    }

    /// Find hard cycles made only of assets in `unreached`
    ///
    /// A cycle is a strongly connected component of the hard-edge subgraph
    /// with more than one member, or a single asset with a hard self
    /// reference. Members are sorted, and so is the returned list.
    pub fn find_cycles(&self, graph: &Graph, unreached: &BTreeSet<AssetId>) -> Vec<Vec<AssetId>> {
        // Hard-only snapshot over the unreached assets
        let mut snapshot: DiGraph<&AssetId, ()> = DiGraph::new();
        let mut index: HashMap<&AssetId, NodeIndex> = HashMap::new();
        for id in unreached {
            if graph.contains(id) {
                index.insert(id, snapshot.add_node(id));
            }
        }
        for (id, &from) in &index {
            for target in graph.neighbors_where(id, petgraph::Direction::Outgoing, |k| k.is_hard()) {
                if let Some(&to) = index.get(target) {
                    snapshot.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<AssetId>> = tarjan_scc(&snapshot)
            .into_iter()
            .filter(|scc| match scc.as_slice() {
                [single] => snapshot.contains_edge(*single, *single),
                members => members.len() > 1,
            })
            .map(|scc| {
                let mut members: Vec<AssetId> = scc.into_iter().map(|idx| snapshot[idx].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();

        debug!("Found {} unreached hard cycles", cycles.len());
        cycles
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}
