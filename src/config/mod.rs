mod analysis;
mod loader;
mod rules;

pub use analysis::{AnalysisConfig, IndirectPolicy, IndirectSettings, FORBIDDEN_CLASSES};
pub use loader::{Config, ExcludeConfig, IndirectConfig, RegistryConfig, ScanConfig};
pub use rules::{CompiledRules, ConfigError};
