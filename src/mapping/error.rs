// src/mapping/error.rs
// ============================================================================
// MAPPING ERRORS - Fallos estructurales de la tabla de nombres
// ============================================================================
//
// Solo la construcción falla. La conversión nunca devuelve error: las claves
// no reconocidas o descartadas se omiten.
//
// ============================================================================

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Malformed template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("Duplicate source template '{template}'")]
    DuplicateSource { template: String },

    #[error("Placeholder mismatch: '{from}' -> '{to}' (both sides must be layer-scoped or both global)")]
    PlaceholderMismatch { from: String, to: String },

    #[error("Ambiguous inverse: '{first}' and '{second}' both map to '{destination}'")]
    AmbiguousInverse {
        destination: String,
        first: String,
        second: String,
    },

    #[error("Global template '{global}' is shadowed by layer-scoped template '{layer_scoped}'")]
    ShadowedTemplate { global: String, layer_scoped: String },
}

pub type Result<T> = std::result::Result<T, MappingError>;
