use super::{AssetNode, DanglingReference, Graph};
use crate::extract::{default_class, ExtractedAsset};
use crate::index::{AssetDescriptor, Inventory};
use tracing::{debug, info};

/// Builder for constructing the asset dependency graph
pub struct GraphBuilder {
    /// The graph being built
    graph: Graph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    /// Build a graph from a scan and its extraction results
    pub fn build(inventory: &Inventory, extracted: &[ExtractedAsset]) -> (Graph, Vec<DanglingReference>) {
        let mut builder = Self::new();
        builder.add_inventory(inventory);
        builder.add_extracted(extracted);
        builder.finish()
    }

    /// Add a node for every indexed asset
    pub fn add_inventory(&mut self, inventory: &Inventory) {
        for descriptor in &inventory.assets {
            self.graph.upsert_asset(node_for(
                descriptor,
                default_class(&descriptor.extension),
                false,
            ));
        }
    }

    /// Add extracted assets and their outgoing references
    ///
    /// All nodes are inserted before any edge, so a reference only ends up
    /// external when its target is truly unindexed.
    pub fn add_extracted(&mut self, extracted: &[ExtractedAsset]) {
        for asset in extracted {
            self.graph.upsert_asset(node_for(
                &asset.descriptor,
                &asset.class_type,
                asset.is_redirector,
            ));
        }

        for asset in extracted {
            let from = &asset.descriptor.id;
            for reference in &asset.references {
                self.graph
                    .add_edge(from, &reference.target, reference.kind, reference.discovered);
            }
        }
    }

    /// Finish building and report references to unindexed assets
    pub fn finish(self) -> (Graph, Vec<DanglingReference>) {
        let dangling = dangling_references(&self.graph);

        info!(
            "Graph built: {} assets, {} linked pairs, {} dangling references",
            self.graph.node_count(),
            self.graph.edge_count(),
            dangling.len()
        );

        (self.graph, dangling)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph node for an indexed asset
pub(crate) fn node_for(descriptor: &AssetDescriptor, class_type: &str, is_redirector: bool) -> AssetNode {
    AssetNode::new(descriptor.id.clone(), class_type)
        .with_size(descriptor.size_bytes)
        .with_redirector(is_redirector)
        .with_file(descriptor.path.clone())
}

/// Every external reference held by the graph, sorted
pub fn dangling_references(graph: &Graph) -> Vec<DanglingReference> {
    let mut dangling: Vec<DanglingReference> = graph
        .nodes()
        .flat_map(|node| {
            node.external_refs.iter().map(move |ext| DanglingReference {
                from: node.id.clone(),
                to: ext.target.clone(),
                kind: ext.kind,
            })
        })
        .collect();
    dangling.sort();

    for d in &dangling {
        debug!("Dangling: {}", d);
    }
    dangling
}
