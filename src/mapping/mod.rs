// src/mapping/mod.rs
// ============================================================================
// MAPPING - Tablas de nombres HF ↔ convención interna
// ============================================================================

pub mod error;
pub mod template;
pub mod table;
pub mod factory;
pub mod qwen2;
pub mod llama;

// Re-exports
pub use error::MappingError;
pub use template::{classify, ClassifiedKey, KeyTemplate, PLACEHOLDER};
pub use table::{InverseTable, MappingEntry, NamingTable};
pub use factory::{create_adapter, detect_architecture, load_config, Architecture};
