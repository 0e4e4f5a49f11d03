use std::collections::HashMap;
use std::path::PathBuf;

use super::{AssetMetadata, AssetRegistry, RegistryError};
use crate::graph::AssetId;
use crate::index::AssetDescriptor;

/// In-memory registry for embedders and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    assets: HashMap<AssetId, Result<AssetMetadata, String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, id: &str, metadata: AssetMetadata) -> Self {
        self.insert(AssetId::new(id), metadata);
        self
    }

    /// Register an asset whose metadata cannot be read
    pub fn with_failure(mut self, id: &str, message: &str) -> Self {
        self.assets.insert(AssetId::new(id), Err(message.to_string()));
        self
    }

    pub fn insert(&mut self, id: AssetId, metadata: AssetMetadata) {
        self.assets.insert(id, Ok(metadata));
    }
}

impl AssetRegistry for MemoryRegistry {
    fn describe(&self, asset: &AssetDescriptor) -> Result<AssetMetadata, RegistryError> {
        match self.assets.get(&asset.id) {
            Some(Ok(metadata)) => Ok(metadata.clone()),
            Some(Err(message)) => Err(RegistryError::Malformed {
                path: PathBuf::from(asset.id.as_str()),
                message: message.clone(),
            }),
            None => Err(RegistryError::Missing(asset.id.clone())),
        }
    }
}
