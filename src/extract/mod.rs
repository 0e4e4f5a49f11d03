// Reference extraction - dependency metadata per asset

mod indirect;
mod manifest;
mod memory;
mod paths;
mod sidecar;

pub use indirect::{IndirectReference, IndirectScan, IndirectScanner};
pub use manifest::ManifestRegistry;
pub use memory::MemoryRegistry;
pub use paths::{MountPathMatcher, PathMatch};
pub use sidecar::SidecarRegistry;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::graph::{AssetId, Discovery, RawReference, ReferenceKind};
use crate::index::AssetDescriptor;

/// Class name that marks an asset as a redirector
pub const REDIRECTOR_CLASS: &str = "ObjectRedirector";

/// Dependency metadata of one asset, as declared by the host registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetMetadata {
    /// Declared class; the extension's default class is used when absent
    pub class: Option<String>,

    /// Package paths loaded together with this asset
    pub hard: Vec<String>,

    /// Package paths resolved at runtime
    pub soft: Vec<String>,

    /// Free-form string properties scanned for mount paths
    pub strings: Vec<String>,
}

impl AssetMetadata {
    pub fn new(class: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            ..Default::default()
        }
    }

    pub fn with_hard<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hard.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_soft<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.soft.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_strings<I, S>(mut self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strings.extend(strings.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dependency metadata in {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Asset {0} is not in the registry")]
    Missing(AssetId),
}

/// Source of per-asset dependency metadata
///
/// Implementations are queried from worker threads.
pub trait AssetRegistry: Send + Sync {
    fn describe(&self, asset: &AssetDescriptor) -> Result<AssetMetadata, RegistryError>;
}

/// Outgoing references of one asset
#[derive(Debug, Clone)]
pub struct ExtractedAsset {
    pub descriptor: AssetDescriptor,
    pub class_type: String,
    pub is_redirector: bool,
    pub references: Vec<RawReference>,
}

impl ExtractedAsset {
    /// Placeholder for an asset whose metadata could not be read
    pub fn empty(descriptor: &AssetDescriptor) -> Self {
        Self {
            descriptor: descriptor.clone(),
            class_type: default_class(&descriptor.extension).to_string(),
            is_redirector: false,
            references: Vec::new(),
        }
    }
}

/// Per-asset extraction failure; the asset stays indexed without references
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtractionWarning {
    pub asset: AssetId,
    pub message: String,
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.asset, self.message)
    }
}

/// Result of extracting a batch of assets
#[derive(Debug, Default)]
pub struct ExtractionBatch {
    /// One entry per asset that was started, failed ones included
    pub extracted: Vec<ExtractedAsset>,
    pub warnings: Vec<ExtractionWarning>,
    pub cancelled: bool,
}

/// Class assumed for assets without declared metadata
pub fn default_class(extension: &str) -> &'static str {
    if extension.eq_ignore_ascii_case("umap") {
        "World"
    } else {
        "Unknown"
    }
}

/// Turns registry metadata into typed outgoing references
pub struct ReferenceExtractor<'a> {
    registry: &'a dyn AssetRegistry,
    paths: &'a MountPathMatcher,
}

impl<'a> ReferenceExtractor<'a> {
    pub fn new(registry: &'a dyn AssetRegistry, paths: &'a MountPathMatcher) -> Self {
        Self { registry, paths }
    }

    /// Extract the outgoing references of one asset
    pub fn extract(&self, asset: &AssetDescriptor) -> Result<ExtractedAsset, ExtractionWarning> {
        let metadata = self
            .registry
            .describe(asset)
            .map_err(|e| ExtractionWarning {
                asset: asset.id.clone(),
                message: e.to_string(),
            })?;

        let class_type = metadata
            .class
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| default_class(&asset.extension).to_string());
        let is_redirector = class_type.eq_ignore_ascii_case(REDIRECTOR_CLASS);

        let mut references = BTreeSet::new();
        for path in &metadata.hard {
            if let Some(target) = target_id(path) {
                references.insert(RawReference::new(target, ReferenceKind::Hard, Discovery::Declared));
            }
        }
        for path in &metadata.soft {
            if let Some(target) = target_id(path) {
                references.insert(RawReference::new(target, ReferenceKind::Soft, Discovery::Declared));
            }
        }
        for text in &metadata.strings {
            for found in self.paths.find_all(text) {
                references.insert(RawReference::new(
                    AssetId::new(&found.path),
                    ReferenceKind::Soft,
                    Discovery::Inferred,
                ));
            }
        }

        debug!(
            "Extracted {} ({}): {} references",
            asset.id,
            class_type,
            references.len()
        );

        Ok(ExtractedAsset {
            descriptor: asset.clone(),
            class_type,
            is_redirector,
            references: references.into_iter().collect(),
        })
    }

    /// Extract every asset on the current rayon pool
    ///
    /// Cancellation is checked before each asset is started. Failures never
    /// affect siblings: the failing asset is kept with no references.
    pub fn extract_all(&self, assets: &[AssetDescriptor], cancel: &CancellationToken) -> ExtractionBatch {
        info!("Extracting references from {} assets", assets.len());

        let outcomes: Vec<Result<ExtractedAsset, (ExtractedAsset, ExtractionWarning)>> = assets
            .par_iter()
            .filter_map(|asset| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(
                    self.extract(asset)
                        .map_err(|warning| (ExtractedAsset::empty(asset), warning)),
                )
            })
            .collect();

        let mut batch = ExtractionBatch {
            cancelled: outcomes.len() < assets.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(extracted) => batch.extracted.push(extracted),
                Err((placeholder, warning)) => {
                    warn!("Extraction failed for {}", warning);
                    batch.extracted.push(placeholder);
                    batch.warnings.push(warning);
                }
            }
        }
        batch.warnings.sort();

        batch
    }
}

fn target_id(path: &str) -> Option<AssetId> {
    let id = AssetId::new(path);
    (!id.as_str().is_empty()).then_some(id)
}
