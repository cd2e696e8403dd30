//! I/O modules: scene providers, the ground-truth catalog, configuration and result tables

pub mod provider;
pub mod catalog;
pub mod config;
pub mod export;
pub mod delimited;

pub use provider::{GroupBy, MemoryProvider, ProviderResponse, Resampling, SceneProvider, SceneQuery};
pub use catalog::CatalogReader;
pub use config::ValidationConfig;
pub use export::{merge_with_catalog, read_sample_table, write_confusion_table, write_report_json, write_sample_table};
