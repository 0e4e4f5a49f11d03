// Engine facade - scan, extract, build, classify, plan

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{ClassificationResult, Classifier, Seeds};
use crate::config::{AnalysisConfig, CompiledRules, Config, ConfigError, IndirectPolicy};
use crate::extract::{
    default_class, AssetRegistry, ExtractedAsset, ExtractionWarning, IndirectReference, IndirectScanner, ManifestRegistry,
    MountPathMatcher, ReferenceExtractor, RegistryError, SidecarRegistry,
};
use crate::graph::{dangling_references, node_for, AssetId, Graph, GraphBuilder};
use crate::index::{AssetIndex, Inventory, ScanError, UnreadablePath};
use crate::plan::{CleanupPlan, CleanupPlanner, FolderLayout, PlanError};
use crate::report::{AnalysisStatus, AnalysisWarning, AssetEntry, ClassificationReport};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid mount point pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no analysis has been run yet")]
    NotAnalyzed,
}

/// Everything kept between passes
struct EngineState {
    config: AnalysisConfig,
    rules: CompiledRules,
    paths: MountPathMatcher,
    inventory: Inventory,
    graph: Graph,
    classes: ClassificationResult,
    layout: FolderLayout,
    extraction_warnings: BTreeMap<AssetId, ExtractionWarning>,
    indirect_references: Vec<IndirectReference>,
    indirect_unreadable: Vec<UnreadablePath>,
    status: AnalysisStatus,
}

/// Owns the graph and runs analysis passes over a content tree
///
/// The graph is only rebuilt through `&mut self`, so a plan can never be
/// computed while a pass is rewriting it.
pub struct Engine {
    registry: Box<dyn AssetRegistry>,
    cancel: CancellationToken,
    generation: u64,
    state: Option<EngineState>,
}

impl Engine {
    pub fn new(registry: Box<dyn AssetRegistry>) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
            generation: 0,
            state: None,
        }
    }

    /// Engine with the registry named by a file configuration
    pub fn from_config(config: &Config, project_root: &Path) -> Result<Self, RegistryError> {
        Ok(Self::new(registry_from_config(config, project_root)?))
    }

    /// Request cancellation of the running pass
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this engine from another thread
    ///
    /// Tokens are one-shot: a handle cancels the pass it was taken before or
    /// during. After a cancelled pass, the next pass starts with a fresh
    /// token and callers need a new handle.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Generation of the current graph; bumped on every analysis or refresh
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.state.as_ref().map(|s| &s.graph)
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        self.state.as_ref().map(|s| &s.inventory)
    }

    /// Run a full pass: scan, extract, build, classify
    ///
    /// Per-asset problems become warnings in the report. Only a content root
    /// that cannot be read, or invalid rules, fail the pass.
    pub fn run_analysis(&mut self, config: &AnalysisConfig) -> Result<ClassificationReport, EngineError> {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        info!("Analyzing {}", config.content_root.display());

        let rules = CompiledRules::compile(config)?;
        let paths = MountPathMatcher::new(&config.mount_point)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;

        let inventory = AssetIndex::new(config, &rules)
            .with_cancellation(self.cancel.clone())
            .scan(&config.content_root)?;

        let extractor = ReferenceExtractor::new(self.registry.as_ref(), &paths);
        let batch = pool.install(|| extractor.extract_all(&inventory.assets, &self.cancel));

        let (mut graph, _) = GraphBuilder::build(&inventory, &batch.extracted);

        let mut indirect_references = Vec::new();
        let mut indirect_unreadable = Vec::new();
        if config.indirect.enabled && !self.cancel.is_cancelled() {
            let known: HashSet<AssetId> = inventory.assets.iter().map(|a| a.id.clone()).collect();
            let scanner = IndirectScanner::new(&config.project_root, &config.indirect, &paths);
            let scan = pool.install(|| scanner.scan(&known, &self.cancel));
            info!(
                "Indirect scan: {} files, {} references",
                scan.files_scanned,
                scan.references.len()
            );
            indirect_references = scan.references;
            indirect_unreadable = scan.unreadable;
        }

        let cancelled = inventory.cancelled || batch.cancelled || self.cancel.is_cancelled();
        if cancelled {
            warn!("Analysis cancelled; results are partial");
        }

        let seeds = resolve_seeds(&mut graph, &rules, &indirect_references, config.indirect.policy);
        let classes = Classifier::new().classify(&graph, &seeds);
        let layout = FolderLayout::from_inventory(&inventory, &config.sidecar_suffix);

        self.generation += 1;
        self.state = Some(EngineState {
            config: config.clone(),
            rules,
            paths,
            inventory,
            graph,
            classes,
            layout,
            extraction_warnings: batch
                .warnings
                .into_iter()
                .map(|w| (w.asset.clone(), w))
                .collect(),
            indirect_references,
            indirect_unreadable,
            status: if cancelled {
                AnalysisStatus::Cancelled
            } else {
                AnalysisStatus::Complete
            },
        });

        self.report()
    }

    /// Re-describe only the changed files and reclassify
    ///
    /// Paths may be asset files, sidecars, non-engine files or deleted
    /// folders. An existing folder in the list triggers a full pass. Paths a
    /// full scan would skip are ignored, and source and config files are
    /// rescanned so indirect references track the current asset set.
    pub fn refresh(&mut self, changed: &[PathBuf]) -> Result<ClassificationReport, EngineError> {
        let config = match &self.state {
            Some(state) => state.config.clone(),
            None => return Err(EngineError::NotAnalyzed),
        };
        if changed.iter().any(|p| p.is_dir()) {
            debug!("Folder changed, running a full pass");
            return self.run_analysis(&config);
        }

        let Some(state) = self.state.as_mut() else {
            return Err(EngineError::NotAnalyzed);
        };
        let index = AssetIndex::new(&state.config, &state.rules);
        let content_root = state.config.content_root.clone();

        let mut updated = Vec::new();
        let mut touched: BTreeSet<PathBuf> = BTreeSet::new();
        for path in changed {
            let path = if index.is_sidecar(path) {
                match index.sidecar_owner(path) {
                    Some(owner) => owner,
                    None => continue,
                }
            } else {
                path.clone()
            };
            if !path.starts_with(&content_root) || !touched.insert(path.clone()) {
                continue;
            }

            if let Some(descriptor) = index.describe_file(&content_root, &path) {
                updated.push(descriptor);
                continue;
            }

            // Gone, or no longer an indexed asset
            let removed: Vec<AssetId> = state
                .inventory
                .assets
                .iter()
                .filter(|a| a.path.starts_with(&path))
                .map(|a| a.id.clone())
                .collect();
            for id in removed {
                debug!("Removing {}", id);
                state.inventory.remove_asset(&id);
                state.graph.remove_node(&id);
                state.extraction_warnings.remove(&id);
            }

            state.inventory.non_engine_files.retain(|f| !f.starts_with(&path));
            state.inventory.directories.retain(|d| !d.starts_with(&path) || path.exists());
            if path.is_file() && !index.is_sidecar(&path) && index.is_indexed_path(&content_root, &path) {
                state.inventory.non_engine_files.push(path.clone());
            }
        }

        // Nodes first, so references between refreshed assets link up
        for descriptor in &updated {
            let class = state
                .graph
                .node(&descriptor.id)
                .map(|n| n.class_type.clone())
                .unwrap_or_else(|| default_class(&descriptor.extension).to_string());
            state.graph.upsert_asset(node_for(descriptor, &class, false));
            state.inventory.upsert_asset(descriptor.clone());
        }

        let extractor = ReferenceExtractor::new(self.registry.as_ref(), &state.paths);
        for descriptor in &updated {
            let extracted = match extractor.extract(descriptor) {
                Ok(extracted) => {
                    state.extraction_warnings.remove(&descriptor.id);
                    extracted
                }
                Err(warning) => {
                    warn!("Extraction failed for {}", warning);
                    state.extraction_warnings.insert(descriptor.id.clone(), warning);
                    ExtractedAsset::empty(descriptor)
                }
            };
            state.graph.upsert_asset(node_for(
                descriptor,
                &extracted.class_type,
                extracted.is_redirector,
            ));
            state.graph.replace_outgoing(&descriptor.id, extracted.references);
        }

        // Folders of new files
        for file in updated
            .iter()
            .map(|d| d.path.as_path())
            .chain(state.inventory.non_engine_files.iter().map(|p| p.as_path()))
        {
            for ancestor in file.ancestors().skip(1) {
                if ancestor == content_root || !ancestor.starts_with(&content_root) {
                    break;
                }
                state.inventory.directories.push(ancestor.to_path_buf());
            }
        }
        state.inventory.directories.sort();
        state.inventory.directories.dedup();
        state.inventory.non_engine_files.sort();
        state.inventory.non_engine_files.dedup();
        state.inventory.recompute_empty_folders();

        // Source and config files may name assets that just came back
        if state.config.indirect.enabled {
            if self.cancel.is_cancelled() {
                self.cancel = CancellationToken::new();
            }
            let known: HashSet<AssetId> = state.graph.sorted_ids().into_iter().cloned().collect();
            let scanner = IndirectScanner::new(&state.config.project_root, &state.config.indirect, &state.paths);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(state.config.threads)
                .build()?;
            let scan = pool.install(|| scanner.scan(&known, &self.cancel));
            if self.cancel.is_cancelled() {
                warn!("Refresh cancelled; results are partial");
                state.status = AnalysisStatus::Cancelled;
            }
            state.indirect_references = scan.references;
            state.indirect_unreadable = scan.unreadable;
        }

        let seeds = resolve_seeds(
            &mut state.graph,
            &state.rules,
            &state.indirect_references,
            state.config.indirect.policy,
        );
        state.classes = Classifier::new().classify(&state.graph, &seeds);
        state.layout = FolderLayout::from_inventory(&state.inventory, &state.config.sidecar_suffix);

        info!("Refreshed {} assets", updated.len());
        self.generation += 1;
        self.report()
    }

    /// Report of the current graph
    pub fn report(&self) -> Result<ClassificationReport, EngineError> {
        let state = self.state.as_ref().ok_or(EngineError::NotAnalyzed)?;
        Ok(build_report(state, self.generation))
    }

    /// Plan deletions for a report of the current generation
    pub fn compute_plan(&self, report: &ClassificationReport) -> Result<CleanupPlan, PlanError> {
        if !report.is_complete() {
            return Err(PlanError::Incomplete);
        }
        let state = match &self.state {
            Some(state) if report.generation == self.generation => state,
            _ => {
                return Err(PlanError::StaleReport {
                    report: report.generation,
                    current: self.generation,
                })
            }
        };
        if state.status != AnalysisStatus::Complete {
            return Err(PlanError::Incomplete);
        }

        let mut plan = CleanupPlanner::new()
            .with_layout(&state.layout)
            .plan(&state.graph, &state.classes);
        plan.generation = self.generation;
        Ok(plan)
    }
}

/// Registry selected by configuration: a manifest when set, sidecars otherwise
pub fn registry_from_config(
    config: &Config,
    project_root: &Path,
) -> Result<Box<dyn AssetRegistry>, RegistryError> {
    match &config.registry.manifest {
        Some(manifest) => {
            let path = if manifest.is_absolute() {
                manifest.clone()
            } else {
                project_root.join(manifest)
            };
            info!("Using registry manifest {}", path.display());
            Ok(Box::new(ManifestRegistry::load(&path)?))
        }
        None => Ok(Box::new(SidecarRegistry::new(&config.scan.sidecar_suffix))),
    }
}

/// Pin roots on the graph and collect soft and excluded seeds
fn resolve_seeds(
    graph: &mut Graph,
    rules: &CompiledRules,
    indirect: &[IndirectReference],
    policy: IndirectPolicy,
) -> Seeds {
    graph.clear_roots();

    let mut seeds = Seeds::new();
    let mut roots = Vec::new();
    for node in graph.nodes() {
        if rules.is_root(node) {
            roots.push(node.id.clone());
        }
        if rules.is_excluded(node) {
            seeds.excluded.insert(node.id.clone());
        }
    }

    for reference in indirect {
        match policy {
            IndirectPolicy::Root => roots.push(reference.target.clone()),
            IndirectPolicy::Soft => {
                seeds.soft.insert(reference.target.clone());
            }
        }
    }

    for id in &roots {
        graph.set_root(id, true);
    }
    debug!("{} roots, {} soft seeds, {} excluded", roots.len(), seeds.soft.len(), seeds.excluded.len());
    seeds
}

fn build_report(state: &EngineState, generation: u64) -> ClassificationReport {
    let graph = &state.graph;

    let assets: Vec<AssetEntry> = graph
        .sorted_ids()
        .into_iter()
        .filter_map(|id| graph.node(id))
        .filter_map(|node| {
            let classification = state.classes.get(&node.id)?;
            Some(AssetEntry {
                id: node.id.clone(),
                class_type: node.class_type.clone(),
                size_bytes: node.size_bytes,
                classification,
                is_root: node.is_root,
                is_redirector: node.is_redirector,
                folder: node.folder.clone(),
                file: node.file.clone(),
                reached_via: state.classes.reached_via.get(&node.id).cloned(),
                external_refs: node.external_refs.iter().cloned().collect(),
            })
        })
        .collect();

    let mut warnings: Vec<AnalysisWarning> = state
        .extraction_warnings
        .values()
        .cloned()
        .map(AnalysisWarning::from)
        .chain(dangling_references(graph).into_iter().map(AnalysisWarning::from))
        .chain(state.inventory.unreadable.iter().map(|u| AnalysisWarning::UnreadablePath {
            path: u.path.clone(),
            message: u.message.clone(),
        }))
        .chain(state.indirect_unreadable.iter().map(|u| AnalysisWarning::IndirectScan {
            path: u.path.clone(),
            message: u.message.clone(),
        }))
        .collect();
    warnings.sort();

    ClassificationReport {
        generation,
        status: state.status,
        counts: state.classes.counts(),
        assets,
        cycles: state.classes.cycles.clone(),
        warnings,
        indirect_references: state.indirect_references.clone(),
        non_engine_files: state.inventory.non_engine_files.clone(),
        empty_folders: state.inventory.empty_folders.clone(),
        unreadable: state.inventory.unreadable.clone(),
    }
}
