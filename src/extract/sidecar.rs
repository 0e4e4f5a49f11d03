use std::path::PathBuf;

use super::{AssetMetadata, AssetRegistry, RegistryError};
use crate::index::AssetDescriptor;

/// Reads `<asset file><suffix>` JSON files written next to each asset
///
/// An asset without a sidecar has no declared references.
pub struct SidecarRegistry {
    suffix: String,
}

impl SidecarRegistry {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
        }
    }

    fn sidecar_path(&self, asset: &AssetDescriptor) -> PathBuf {
        let mut path = asset.path.clone().into_os_string();
        path.push(&self.suffix);
        PathBuf::from(path)
    }
}

impl Default for SidecarRegistry {
    fn default() -> Self {
        Self::new(".deps.json")
    }
}

impl AssetRegistry for SidecarRegistry {
    fn describe(&self, asset: &AssetDescriptor) -> Result<AssetMetadata, RegistryError> {
        let path = self.sidecar_path(asset);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AssetMetadata::default());
            }
            Err(source) => return Err(RegistryError::Io { path, source }),
        };

        serde_json::from_str(&contents).map_err(|e| RegistryError::Malformed {
            path,
            message: e.to_string(),
        })
    }
}
