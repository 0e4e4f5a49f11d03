use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::{Classification, ClassificationCounts};
use crate::extract::{ExtractionWarning, IndirectReference};
use crate::graph::{AssetId, DanglingReference, ExternalReference, ReferenceKind};
use crate::index::UnreadablePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    /// Stopped by cancellation; classifications are partial
    Cancelled,
}

/// Recovered problem surfaced alongside the results
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// Dependency metadata of one asset could not be read
    Extraction { asset: AssetId, message: String },

    /// Reference to an asset outside the indexed content
    DanglingReference {
        from: AssetId,
        to: AssetId,
        reference: ReferenceKind,
    },

    /// Content path the scan could not read
    UnreadablePath { path: PathBuf, message: String },

    /// Source or config file the indirect scan could not read
    IndirectScan { path: PathBuf, message: String },
}

impl From<ExtractionWarning> for AnalysisWarning {
    fn from(w: ExtractionWarning) -> Self {
        AnalysisWarning::Extraction {
            asset: w.asset,
            message: w.message,
        }
    }
}

impl From<DanglingReference> for AnalysisWarning {
    fn from(d: DanglingReference) -> Self {
        AnalysisWarning::DanglingReference {
            from: d.from,
            to: d.to,
            reference: d.kind,
        }
    }
}

impl std::fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisWarning::Extraction { asset, message } => {
                write!(f, "failed to read dependencies of {}: {}", asset, message)
            }
            AnalysisWarning::DanglingReference { from, to, reference } => {
                write!(f, "{} references unindexed {} ({})", from, to, reference)
            }
            AnalysisWarning::UnreadablePath { path, message } => {
                write!(f, "unreadable {}: {}", path.display(), message)
            }
            AnalysisWarning::IndirectScan { path, message } => {
                write!(f, "could not scan {}: {}", path.display(), message)
            }
        }
    }
}

/// Per-asset line of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: AssetId,
    pub class_type: String,
    pub size_bytes: u64,
    pub classification: Classification,
    pub is_root: bool,
    pub is_redirector: bool,
    pub folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Asset this one was first reached from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reached_via: Option<AssetId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub external_refs: Vec<ExternalReference>,
}

/// Result of one analysis pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Graph generation the report describes
    pub generation: u64,
    pub status: AnalysisStatus,
    pub counts: ClassificationCounts,
    /// Sorted by id
    pub assets: Vec<AssetEntry>,
    pub cycles: Vec<Vec<AssetId>>,
    pub warnings: Vec<AnalysisWarning>,
    pub indirect_references: Vec<IndirectReference>,
    pub non_engine_files: Vec<PathBuf>,
    pub empty_folders: Vec<PathBuf>,
    pub unreadable: Vec<UnreadablePath>,
}

impl ClassificationReport {
    pub fn is_complete(&self) -> bool {
        self.status == AnalysisStatus::Complete
    }

    pub fn asset(&self, id: &AssetId) -> Option<&AssetEntry> {
        self.assets
            .binary_search_by(|a| a.id.cmp(id))
            .ok()
            .map(|idx| &self.assets[idx])
    }

    pub fn classification(&self, id: &str) -> Option<Classification> {
        self.asset(&AssetId::new(id)).map(|a| a.classification)
    }

    pub fn with_class(&self, class: Classification) -> impl Iterator<Item = &AssetEntry> {
        self.assets.iter().filter(move |a| a.classification == class)
    }
}
