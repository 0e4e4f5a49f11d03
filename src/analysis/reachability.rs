use crate::graph::{AssetId, Direction, EdgeKinds, Graph};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Breadth-first reachability over the asset graph
///
/// Frontiers expand level by level in canonical id order, so the first
/// parent recorded for each asset is stable across runs.
pub struct ReachabilityAnalyzer;

impl ReachabilityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Multi-source BFS following edges accepted by `follow`
    ///
    /// `visited` maps every reached asset to the asset it was reached from
    /// (`None` for starts). Assets already in `visited` are not revisited.
    /// Returns the assets newly reached by this call, in discovery order.
    pub fn traverse<'g, I, F>(
        &self,
        graph: &'g Graph,
        starts: I,
        visited: &mut BTreeMap<AssetId, Option<AssetId>>,
        follow: F,
    ) -> Vec<AssetId>
    where
        I: IntoIterator<Item = &'g AssetId>,
        F: Fn(&EdgeKinds) -> bool,
    {
        let mut reached = Vec::new();
        let mut frontier: BTreeSet<&AssetId> = BTreeSet::new();

        for start in starts {
            if !graph.contains(start) {
                continue;
            }
            if !visited.contains_key(start) {
                visited.insert(start.clone(), None);
                reached.push(start.clone());
            }
            frontier.insert(start);
        }

        while !frontier.is_empty() {
            let mut next = BTreeSet::new();
            for id in &frontier {
                for neighbor in graph.neighbors_where(id, Direction::Outgoing, &follow) {
                    if visited.contains_key(neighbor) {
                        continue;
                    }
                    trace!("Reached {} via {}", neighbor, id);
                    visited.insert(neighbor.clone(), Some((*id).clone()));
                    reached.push(neighbor.clone());
                    next.insert(neighbor);
                }
            }
            frontier = next;
        }

        reached
    }
}

impl Default for ReachabilityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
