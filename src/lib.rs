//! assetsweep - Find and safely plan removal of unused game assets
//!
//! This library builds a dependency graph over a game project's content tree,
//! classifies every asset by reachability from the project's roots, and
//! produces an ordered, advisory cleanup plan.
//!
//! # Architecture
//!
//! The analysis pipeline consists of:
//! 1. **Asset Index** - Walk the content tree and inventory asset files
//! 2. **Reference Extraction** - Read each asset's declared dependencies
//!    from an [`AssetRegistry`], plus asset paths found in source and config
//! 3. **Graph Building** - Typed hard/soft reference graph over the assets
//! 4. **Classification** - Used, indirectly used, unused, circular, excluded
//! 5. **Cleanup Planning** - Leaves-first deletion order with blocking
//!
//! [`Engine`] drives the pipeline; the host executes plans with
//! [`Quarantine`], which moves files aside instead of deleting them.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod extract;
pub mod graph;
pub mod index;
pub mod plan;
pub mod refactor;
pub mod report;
pub mod watch;

pub use analysis::{Classification, ClassificationCounts, ClassificationResult, Classifier, Seeds};
pub use config::{AnalysisConfig, Config, IndirectPolicy};
pub use engine::{registry_from_config, Engine, EngineError};
pub use extract::{AssetMetadata, AssetRegistry, ManifestRegistry, MemoryRegistry, RegistryError, SidecarRegistry};
pub use graph::{AssetId, AssetNode, Graph, GraphBuilder, ReferenceKind};
pub use index::{AssetIndex, Inventory, ScanError};
pub use plan::{CleanupPlan, CleanupPlanner, CleanupReason, PlanError};
pub use refactor::{Quarantine, QuarantineError, UndoScript};
pub use report::{AnalysisStatus, AnalysisWarning, ClassificationReport, Reporter, ReportFormat};
pub use tokio_util::sync::CancellationToken;
pub use watch::{FileWatcher, WatchError};
