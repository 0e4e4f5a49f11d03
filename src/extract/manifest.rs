use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use super::{AssetMetadata, AssetRegistry, RegistryError};
use crate::graph::AssetId;
use crate::index::AssetDescriptor;

/// Whole-project registry dump in a single JSON document
///
/// ```json
/// { "assets": { "/Game/Maps/LevelA": { "class": "World", "hard": ["/Game/Tex/T_Rock"] } } }
/// ```
pub struct ManifestRegistry {
    assets: HashMap<AssetId, AssetMetadata>,
}

#[derive(Deserialize)]
struct ManifestFile {
    #[serde(default)]
    assets: BTreeMap<String, AssetMetadata>,
}

impl ManifestRegistry {
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&contents).map_err(|message| RegistryError::Malformed {
            path: path.to_path_buf(),
            message,
        })?;
        info!("Loaded registry manifest with {} assets", registry.len());
        Ok(registry)
    }

    pub fn from_json(contents: &str) -> Result<Self, String> {
        let file: ManifestFile = serde_json::from_str(contents).map_err(|e| e.to_string())?;
        let assets = file
            .assets
            .into_iter()
            .map(|(id, metadata)| (AssetId::new(&id), metadata))
            .collect();
        Ok(Self { assets })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetRegistry for ManifestRegistry {
    fn describe(&self, asset: &AssetDescriptor) -> Result<AssetMetadata, RegistryError> {
        self.assets
            .get(&asset.id)
            .cloned()
            .ok_or_else(|| RegistryError::Missing(asset.id.clone()))
    }
}
