// src/lib.rs
// ============================================================================
// STATEDICT-BRIDGE - Traductor de state dicts HuggingFace ↔ convención interna
// ============================================================================

pub mod adapter;
pub mod config;
pub mod mapping;
pub mod safetensor;

// Re-exports principales
pub use adapter::{ConversionReport, Direction, KeyOutcome, StateDict, StateDictAdapter};
pub use config::{qwen2_5_flavor, ModelArgs};
pub use mapping::{create_adapter, Architecture, MappingError, NamingTable};
pub use safetensor::list_tensor_names;
