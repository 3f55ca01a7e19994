// src/mapping/template.rs
// ============================================================================
// KEY TEMPLATES - Plantillas con un índice de capa opcional
// ============================================================================
//
// "model.layers.{}.mlp.up_proj.weight" → layer-scoped
// "lm_head.weight"                     → global
//
// La clasificación de una clave concreta es un escaneo lineal: la PRIMERA
// racha de dígitos decimales es el índice de capa y se sustituye por "{}".
//
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use super::error::{MappingError, Result};

/// Marcador posicional del índice de capa
pub const PLACEHOLDER: &str = "{}";

/// Plantilla validada: como mucho un placeholder, sin llaves sueltas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyTemplate {
    raw: String,
    layer_scoped: bool,
}

impl KeyTemplate {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(malformed(&raw, "empty template"));
        }

        let placeholders = raw.matches(PLACEHOLDER).count();
        if placeholders > 1 {
            return Err(malformed(
                &raw,
                format!("{} placeholders, at most one allowed", placeholders),
            ));
        }

        // Cualquier llave fuera del placeholder es un error de tabla
        let stripped = raw.replacen(PLACEHOLDER, "", 1);
        if stripped.contains('{') || stripped.contains('}') {
            return Err(malformed(&raw, "stray brace outside placeholder"));
        }

        // classify toma la primera racha de dígitos como índice: una plantilla
        // con dígitos antes del placeholder (o pegados detrás) nunca se alcanza
        if let Some(pos) = raw.find(PLACEHOLDER) {
            if raw[..pos].bytes().any(|b| b.is_ascii_digit()) {
                return Err(malformed(&raw, "digit before placeholder"));
            }
            let after = &raw[pos + PLACEHOLDER.len()..];
            if after.bytes().next().map_or(false, |b| b.is_ascii_digit()) {
                return Err(malformed(&raw, "digit right after placeholder"));
            }
        }

        Ok(Self {
            layer_scoped: placeholders == 1,
            raw,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_layer_scoped(&self) -> bool {
        self.layer_scoped
    }

    /// Sustituye el índice en el placeholder. Las plantillas globales se
    /// devuelven tal cual.
    pub fn render(&self, index: Option<&str>) -> String {
        match (self.layer_scoped, index) {
            (true, Some(idx)) => self.raw.replacen(PLACEHOLDER, idx, 1),
            _ => self.raw.clone(),
        }
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn malformed(template: &str, reason: impl Into<String>) -> MappingError {
    MappingError::MalformedTemplate {
        template: template.to_string(),
        reason: reason.into(),
    }
}

// ============================================================================
// CLASIFICACIÓN DE CLAVES
// ============================================================================

/// Clave concreta descompuesta en (plantilla, índice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedKey<'a> {
    pub template: Cow<'a, str>,
    /// Índice tal cual aparece en la clave ("12" sigue siendo "12", "007" sigue siendo "007")
    pub index: Option<&'a str>,
}

impl ClassifiedKey<'_> {
    pub fn is_layer_scoped(&self) -> bool {
        self.index.is_some()
    }
}

/// Localiza la primera racha máxima de dígitos ASCII.
pub fn first_digit_run(key: &str) -> Option<(usize, usize)> {
    let bytes = key.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let len = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    Some((start, start + len))
}

/// "model.layers.12.mlp.up_proj.weight" → ("model.layers.{}.mlp.up_proj.weight", Some("12"))
pub fn classify(key: &str) -> ClassifiedKey<'_> {
    match first_digit_run(key) {
        Some((start, end)) => {
            let mut template = String::with_capacity(key.len() - (end - start) + PLACEHOLDER.len());
            template.push_str(&key[..start]);
            template.push_str(PLACEHOLDER);
            template.push_str(&key[end..]);
            ClassifiedKey {
                template: Cow::Owned(template),
                index: Some(&key[start..end]),
            }
        }
        None => ClassifiedKey {
            template: Cow::Borrowed(key),
            index: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layer_scoped() {
        let t = KeyTemplate::parse("model.layers.{}.self_attn.q_proj.weight").unwrap();
        assert!(t.is_layer_scoped());
        assert_eq!(t.render(Some("3")), "model.layers.3.self_attn.q_proj.weight");
    }

    #[test]
    fn test_parse_global() {
        let t = KeyTemplate::parse("lm_head.weight").unwrap();
        assert!(!t.is_layer_scoped());
        assert_eq!(t.render(None), "lm_head.weight");
        assert_eq!(t.render(Some("5")), "lm_head.weight");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            KeyTemplate::parse("layers.{}.experts.{}.w1"),
            Err(MappingError::MalformedTemplate { .. })
        ));
        assert!(matches!(
            KeyTemplate::parse(""),
            Err(MappingError::MalformedTemplate { .. })
        ));
        assert!(matches!(
            KeyTemplate::parse("layers.{N}.w1"),
            Err(MappingError::MalformedTemplate { .. })
        ));
        assert!(matches!(
            KeyTemplate::parse("layers.}{.w1"),
            Err(MappingError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_digits_around_placeholder() {
        for raw in ["model.h2.layers.{}.w", "w1{}.x", "layers.{}0.x", "1{}"] {
            assert!(
                matches!(KeyTemplate::parse(raw), Err(MappingError::MalformedTemplate { .. })),
                "{} should be rejected",
                raw
            );
        }
        // Dígitos detrás del índice, separados, son válidos
        assert!(KeyTemplate::parse("layers.{}.experts.15.w1").is_ok());
        assert!(KeyTemplate::parse("layers.{}.w1").is_ok());
    }

    #[test]
    fn test_parsed_template_matches_classify() {
        let t = KeyTemplate::parse("layers.{}.experts.15.w1").unwrap();
        let rendered = t.render(Some("4"));
        assert_eq!(classify(&rendered).template, t.as_str());
        assert_eq!(classify(&rendered).index, Some("4"));
    }

    #[test]
    fn test_classify_layer_key() {
        let c = classify("model.layers.7.input_layernorm.weight");
        assert_eq!(c.template, "model.layers.{}.input_layernorm.weight");
        assert_eq!(c.index, Some("7"));
        assert!(c.is_layer_scoped());
    }

    #[test]
    fn test_classify_keeps_index_verbatim() {
        assert_eq!(classify("layers.12.ffn_norm.weight").index, Some("12"));
        assert_eq!(classify("layers.012.ffn_norm.weight").index, Some("012"));
    }

    #[test]
    fn test_classify_only_first_run() {
        let c = classify("model.layers.3.mlp.experts.15.w1");
        assert_eq!(c.template, "model.layers.{}.mlp.experts.15.w1");
        assert_eq!(c.index, Some("3"));
    }

    #[test]
    fn test_classify_global_key() {
        let c = classify("lm_head.weight");
        assert_eq!(c.template, "lm_head.weight");
        assert_eq!(c.index, None);
        assert!(matches!(c.template, Cow::Borrowed(_)));
    }

    #[test]
    fn test_first_digit_run() {
        assert_eq!(first_digit_run("abc"), None);
        assert_eq!(first_digit_run("a12b3"), Some((1, 3)));
        assert_eq!(first_digit_run("99"), Some((0, 2)));
    }
}
