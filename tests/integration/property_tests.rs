//! Property tests over randomly generated asset graphs
//!
//! Graphs are drawn with proptest: up to thirty assets spread over a few
//! folders, a sprinkling of roots and exclusions, and hard and soft edges
//! (self references and cycles included). Failures shrink to a minimal graph.

use assetsweep::analysis::{Classification, ClassificationResult, Classifier, Seeds};
use assetsweep::graph::{AssetId, AssetNode, Direction, Discovery, Graph, ReferenceKind};
use assetsweep::plan::{CleanupPlan, CleanupPlanner};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

const FOLDERS: [&str; 4] = ["Maps", "Props", "UI", "FX"];

/// Generated graph description, replayable in any insertion order
#[derive(Debug, Clone)]
struct Shape {
    assets: Vec<(AssetId, bool)>,
    edges: Vec<(usize, usize, ReferenceKind)>,
    excluded: Vec<usize>,
}

impl Shape {
    fn build(&self, reversed: bool) -> (Graph, Seeds) {
        let mut graph = Graph::new();
        let mut order: Vec<usize> = (0..self.assets.len()).collect();
        if reversed {
            order.reverse();
        }
        for &n in &order {
            let (id, is_root) = &self.assets[n];
            graph.upsert_asset(
                AssetNode::new(id.clone(), "Blueprint")
                    .with_root(*is_root)
                    .with_size(n as u64),
            );
        }

        let mut edges = self.edges.clone();
        if reversed {
            edges.reverse();
        }
        for (from, to, kind) in edges {
            graph.add_edge(&self.assets[from].0, &self.assets[to].0, kind, Discovery::Declared);
        }

        let mut seeds = Seeds::new();
        for &n in &self.excluded {
            seeds = seeds.with_excluded(self.assets[n].0.as_str());
        }
        (graph, seeds)
    }
}

fn kind_strategy() -> impl Strategy<Value = ReferenceKind> {
    prop_oneof![
        2 => Just(ReferenceKind::Hard),
        1 => Just(ReferenceKind::Soft),
    ]
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    (2usize..32).prop_flat_map(|count| {
        (
            prop::collection::vec((0..FOLDERS.len(), prop::bool::weighted(0.125)), count),
            prop::collection::vec((0..count, 0..count, kind_strategy()), 0..count * 2),
            prop::collection::vec(prop::bool::weighted(0.1), count),
        )
            .prop_map(|(assets, edges, excluded)| Shape {
                assets: assets
                    .into_iter()
                    .enumerate()
                    .map(|(n, (folder, is_root))| {
                        (AssetId::new(&format!("/Game/{}/A{:02}", FOLDERS[folder], n)), is_root)
                    })
                    .collect(),
                edges,
                excluded: excluded
                    .into_iter()
                    .enumerate()
                    .filter(|(_, excluded)| *excluded)
                    .map(|(n, _)| n)
                    .collect(),
            })
    })
}

fn analyze(shape: &Shape, reversed: bool) -> (Graph, ClassificationResult, CleanupPlan) {
    let (graph, seeds) = shape.build(reversed);
    let classes = Classifier::new().classify(&graph, &seeds);
    let plan = CleanupPlanner::new().plan(&graph, &classes);
    (graph, classes, plan)
}

fn class_of(classes: &ClassificationResult, id: &AssetId) -> Classification {
    classes.get(id).unwrap_or_else(|| panic!("{} has no classification", id))
}

fn is_kept(class: Classification) -> bool {
    matches!(class, Classification::Used | Classification::IndirectlyUsed)
}

proptest! {
    #[test]
    fn test_every_asset_has_exactly_one_classification(shape in shape_strategy()) {
        let (graph, classes, _) = analyze(&shape, false);

        prop_assert_eq!(classes.classes.len(), graph.node_count());
        for node in graph.nodes() {
            prop_assert!(classes.get(&node.id).is_some(), "{} has no classification", node.id);
        }
        prop_assert_eq!(classes.counts().total, graph.node_count());
    }

    #[test]
    fn test_roots_and_their_hard_closure_are_used(shape in shape_strategy()) {
        let (graph, classes, _) = analyze(&shape, false);

        for node in graph.nodes() {
            let class = class_of(&classes, &node.id);
            if node.is_root {
                prop_assert_eq!(class, Classification::Used, "root {}", node.id);
            }
            if class == Classification::Used {
                for dep in graph.neighbors_of_kind(&node.id, Direction::Outgoing, ReferenceKind::Hard) {
                    prop_assert_eq!(
                        class_of(&classes, dep),
                        Classification::Used,
                        "{} hard references {}",
                        node.id,
                        dep
                    );
                }
            }
        }
    }

    #[test]
    fn test_nothing_reachable_from_kept_assets_is_unused_or_circular(shape in shape_strategy()) {
        let (graph, classes, _) = analyze(&shape, false);

        for node in graph.nodes() {
            if !is_kept(class_of(&classes, &node.id)) {
                continue;
            }
            for dep in graph.neighbors(&node.id, Direction::Outgoing) {
                prop_assert!(
                    is_kept(class_of(&classes, dep)),
                    "{} reaches {}",
                    node.id,
                    dep
                );
            }
        }
    }

    #[test]
    fn test_plan_never_deletes_a_hard_referenced_asset(shape in shape_strategy()) {
        let (graph, classes, plan) = analyze(&shape, false);

        let deleted: BTreeSet<&AssetId> = plan.steps.iter().map(|s| &s.id).collect();
        for step in &plan.steps {
            prop_assert_eq!(class_of(&classes, &step.id), Classification::Unused);
            for holder in graph.neighbors_of_kind(&step.id, Direction::Incoming, ReferenceKind::Hard) {
                prop_assert!(
                    deleted.contains(holder),
                    "{} is deleted while {} keeps a hard reference",
                    step.id,
                    holder
                );
            }
        }

        // Every unused asset is either planned or blocked
        let blocked: BTreeSet<&AssetId> = plan.blocked.iter().map(|c| &c.id).collect();
        let unused: BTreeSet<&AssetId> = classes.ids_with(Classification::Unused).into_iter().collect();
        let accounted: BTreeSet<&AssetId> = deleted.union(&blocked).copied().collect();
        prop_assert_eq!(accounted, unused);
        prop_assert!(deleted.is_disjoint(&blocked));
        for candidate in &plan.blocked {
            prop_assert!(!candidate.blocked_by.is_empty(), "{} blocked by nothing", candidate.id);
        }
    }

    #[test]
    fn test_steps_come_after_their_hard_dependencies(shape in shape_strategy()) {
        let (graph, _, plan) = analyze(&shape, false);

        let position: HashMap<&AssetId, usize> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(pos, s)| (&s.id, pos))
            .collect();

        for (pos, step) in plan.steps.iter().enumerate() {
            for dep in graph.neighbors_of_kind(&step.id, Direction::Outgoing, ReferenceKind::Hard) {
                if let Some(&dep_pos) = position.get(dep) {
                    prop_assert!(
                        dep == &step.id || dep_pos < pos,
                        "{} comes before its dependency {}",
                        step.id,
                        dep
                    );
                }
            }
        }
    }

    #[test]
    fn test_results_do_not_depend_on_insertion_order(shape in shape_strategy()) {
        let (_, classes, plan) = analyze(&shape, false);
        let (_, again, plan_again) = analyze(&shape, false);
        let (_, reversed, plan_reversed) = analyze(&shape, true);

        prop_assert_eq!(&classes, &again);
        prop_assert_eq!(&plan, &plan_again);
        prop_assert_eq!(&classes.classes, &reversed.classes);
        prop_assert_eq!(&classes.cycles, &reversed.cycles);
        prop_assert_eq!(&plan, &plan_reversed);
    }
}
