mod asset;
mod builder;
pub mod reference;

pub use asset::{AssetId, AssetNode, ExternalReference};
pub use builder::{dangling_references, GraphBuilder};
pub(crate) use builder::node_for;
pub use reference::{DanglingReference, Discovery, EdgeKinds, RawReference, ReferenceEdge, ReferenceKind};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
pub use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// Result of adding a single edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// A new ordered pair was linked
    Added,
    /// The pair existed and gained a kind or a stronger discovery
    Merged,
    /// The identical edge was already present
    Unchanged,
    /// Target is not indexed; recorded as an external reference on the source
    External,
    /// Source is not indexed; nothing recorded
    MissingSource,
}

/// The asset dependency graph
///
/// Nodes are owned here. Every stored edge has both endpoints present; edges
/// to unknown targets live on the source node as external references and are
/// promoted automatically when the target is inserted later.
#[derive(Debug)]
pub struct Graph {
    /// Nodes are assets, edges carry the set of reference kinds for the pair.
    /// Stable indices survive node removal during incremental updates.
    inner: StableDiGraph<AssetNode, EdgeKinds>,

    /// Map from AssetId to node index
    node_map: HashMap<AssetId, NodeIndex>,

    /// Unknown target -> sources holding an external reference to it
    external_index: HashMap<AssetId, BTreeSet<AssetId>>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            inner: StableDiGraph::new(),
            node_map: HashMap::new(),
            external_index: HashMap::new(),
        }
    }

    /// Insert an asset, or update the metadata of an existing one
    ///
    /// Updating keeps the node's edges, external references and root flag.
    /// A newly inserted asset picks up any external references that other
    /// nodes were holding for it.
    pub fn upsert_asset(&mut self, node: AssetNode) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node.id) {
            if let Some(existing) = self.inner.node_weight_mut(idx) {
                existing.class_type = node.class_type;
                existing.size_bytes = node.size_bytes;
                existing.is_redirector = node.is_redirector;
                existing.folder = node.folder;
                existing.file = node.file;
            }
            return idx;
        }

        let id = node.id.clone();
        let idx = self.inner.add_node(node);
        self.node_map.insert(id.clone(), idx);
        self.promote_external(&id);
        idx
    }

    /// Add a typed reference between two assets
    pub fn add_edge(
        &mut self,
        from: &AssetId,
        to: &AssetId,
        kind: ReferenceKind,
        discovered: Discovery,
    ) -> EdgeOutcome {
        let Some(&from_idx) = self.node_map.get(from) else {
            return EdgeOutcome::MissingSource;
        };
        let Some(&to_idx) = self.node_map.get(to) else {
            self.record_external(from_idx, to.clone(), kind, discovered);
            return EdgeOutcome::External;
        };

        match self.inner.find_edge(from_idx, to_idx) {
            Some(edge) => match self.inner.edge_weight_mut(edge) {
                Some(kinds) => {
                    if kinds.insert(kind, discovered) {
                        EdgeOutcome::Merged
                    } else {
                        EdgeOutcome::Unchanged
                    }
                }
                None => EdgeOutcome::Unchanged,
            },
            None => {
                self.inner
                    .add_edge(from_idx, to_idx, EdgeKinds::single(kind, discovered));
                EdgeOutcome::Added
            }
        }
    }

    /// Replace every outgoing reference of an asset
    ///
    /// Returns the references that could not be linked because their target
    /// is not indexed.
    pub fn replace_outgoing<I>(&mut self, id: &AssetId, references: I) -> Vec<DanglingReference>
    where
        I: IntoIterator<Item = RawReference>,
    {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };

        let outgoing: Vec<_> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in outgoing {
            self.inner.remove_edge(edge);
        }
        self.clear_external(idx);

        let mut dangling = Vec::new();
        for reference in references {
            if self.add_edge(id, &reference.target, reference.kind, reference.discovered)
                == EdgeOutcome::External
            {
                dangling.push(DanglingReference {
                    from: id.clone(),
                    to: reference.target,
                    kind: reference.kind,
                });
            }
        }
        dangling
    }

    /// Remove an asset and its edges
    ///
    /// Edges that pointed at the removed asset become external references on
    /// their sources, so no dangling edge survives.
    pub fn remove_node(&mut self, id: &AssetId) -> Option<AssetNode> {
        let idx = self.node_map.remove(id)?;

        let incoming: Vec<(NodeIndex, EdgeKinds)> = self
            .inner
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.source() != idx)
            .map(|e| (e.source(), *e.weight()))
            .collect();
        for (source, kinds) in incoming {
            for (kind, discovered) in kinds.iter() {
                self.record_external(source, id.clone(), kind, discovered);
            }
        }

        self.clear_external(idx);
        self.inner.remove_node(idx)
    }

    /// Set or clear the root flag of an asset
    pub fn set_root(&mut self, id: &AssetId, is_root: bool) -> bool {
        match self.node_map.get(id).and_then(|&idx| self.inner.node_weight_mut(idx)) {
            Some(node) => {
                node.is_root = is_root;
                true
            }
            None => false,
        }
    }

    /// Clear the root flag on every asset
    pub fn clear_roots(&mut self) {
        for idx in self.node_map.values() {
            if let Some(node) = self.inner.node_weight_mut(*idx) {
                node.is_root = false;
            }
        }
    }

    /// Get an asset by id
    pub fn node(&self, id: &AssetId) -> Option<&AssetNode> {
        self.node_map
            .get(id)
            .and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.node_map.contains_key(id)
    }

    /// All assets, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &AssetNode> {
        self.inner.node_weights()
    }

    /// All asset ids in canonical order
    pub fn sorted_ids(&self) -> Vec<&AssetId> {
        let mut ids: Vec<&AssetId> = self.node_map.keys().collect();
        ids.sort();
        ids
    }

    /// Neighbors in the given direction, in canonical order
    ///
    /// `Outgoing` answers "what does this asset use", `Incoming` answers
    /// "what uses this asset".
    pub fn neighbors(&self, id: &AssetId, direction: Direction) -> Vec<&AssetId> {
        self.neighbors_where(id, direction, |_| true)
    }

    /// Neighbors linked by at least one reference of the given kind
    pub fn neighbors_of_kind(
        &self,
        id: &AssetId,
        direction: Direction,
        kind: ReferenceKind,
    ) -> Vec<&AssetId> {
        self.neighbors_where(id, direction, |kinds| kinds.has(kind))
    }

    /// Neighbors whose connecting edge satisfies the predicate
    pub fn neighbors_where<F>(&self, id: &AssetId, direction: Direction, follow: F) -> Vec<&AssetId>
    where
        F: Fn(&EdgeKinds) -> bool,
    {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };

        let mut neighbors: Vec<&AssetId> = self
            .inner
            .edges_directed(idx, direction)
            .filter(|e| follow(e.weight()))
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.inner.node_weight(other).map(|n| &n.id)
            })
            .collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    /// Reference kinds held by the ordered pair, if linked
    pub fn edge_kinds(&self, from: &AssetId, to: &AssetId) -> Option<&EdgeKinds> {
        let from_idx = *self.node_map.get(from)?;
        let to_idx = *self.node_map.get(to)?;
        let edge = self.inner.find_edge(from_idx, to_idx)?;
        self.inner.edge_weight(edge)
    }

    /// Every edge expanded per kind, sorted
    pub fn edges(&self) -> Vec<ReferenceEdge> {
        let mut edges: Vec<ReferenceEdge> = self
            .inner
            .edge_references()
            .filter_map(|e| {
                let from = &self.inner.node_weight(e.source())?.id;
                let to = &self.inner.node_weight(e.target())?.id;
                Some(
                    e.weight()
                        .iter()
                        .map(|(kind, discovered)| {
                            ReferenceEdge::new(from.clone(), to.clone(), kind, discovered)
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect();
        edges.sort();
        edges
    }

    /// Check if anything references the asset, ignoring self references
    pub fn is_referenced(&self, id: &AssetId) -> bool {
        self.neighbors(id, Direction::Incoming)
            .into_iter()
            .any(|source| source != id)
    }

    /// Get the number of assets
    pub fn node_count(&self) -> usize {
        self.node_map.len()
    }

    /// Get the number of linked ordered pairs
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Get the underlying petgraph for advanced operations
    pub fn inner(&self) -> &StableDiGraph<AssetNode, EdgeKinds> {
        &self.inner
    }

    /// Get node index for an asset id
    pub fn node_index(&self, id: &AssetId) -> Option<NodeIndex> {
        self.node_map.get(id).copied()
    }

    /// One entry per target and kind, keeping the strongest discovery
    fn record_external(
        &mut self,
        source: NodeIndex,
        target: AssetId,
        kind: ReferenceKind,
        discovered: Discovery,
    ) {
        let Some(node) = self.inner.node_weight_mut(source) else {
            return;
        };
        let existing = node
            .external_refs
            .iter()
            .find(|ext| ext.target == target && ext.kind == kind)
            .cloned();
        if let Some(existing) = existing {
            if existing.discovered >= discovered {
                return;
            }
            node.external_refs.remove(&existing);
        }
        self.external_index
            .entry(target.clone())
            .or_default()
            .insert(node.id.clone());
        node.external_refs.insert(ExternalReference {
            target,
            kind,
            discovered,
        });
    }

    fn clear_external(&mut self, idx: NodeIndex) {
        let Some(node) = self.inner.node_weight_mut(idx) else {
            return;
        };
        let refs = std::mem::take(&mut node.external_refs);
        let source = node.id.clone();
        for ext in refs {
            if let Some(sources) = self.external_index.get_mut(&ext.target) {
                sources.remove(&source);
                if sources.is_empty() {
                    self.external_index.remove(&ext.target);
                }
            }
        }
    }

    /// Turn external references to `target` into real edges
    fn promote_external(&mut self, target: &AssetId) {
        let Some(sources) = self.external_index.remove(target) else {
            return;
        };

        for source in sources {
            let Some(&idx) = self.node_map.get(&source) else {
                continue;
            };
            let kinds: Vec<(ReferenceKind, Discovery)> = match self.inner.node_weight_mut(idx) {
                Some(node) => {
                    let matching: Vec<ExternalReference> = node
                        .external_refs
                        .iter()
                        .filter(|ext| &ext.target == target)
                        .cloned()
                        .collect();
                    for ext in &matching {
                        node.external_refs.remove(ext);
                    }
                    matching.into_iter().map(|ext| (ext.kind, ext.discovered)).collect()
                }
                None => continue,
            };
            for (kind, discovered) in kinds {
                self.add_edge(&source, target, kind, discovered);
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
