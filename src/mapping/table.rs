// src/mapping/table.rs
// ============================================================================
// NAMING TABLE - Tabla ordenada externa → interna (o descarte)
// ============================================================================
//
// Formato de entrada:
//   [("model.layers.{}.self_attn.q_proj.weight", Some("layers.{}.attention.wq.weight")),
//    ("model.layers.{}.self_attn.rotary_emb.inv_freq", None),   ← reconocida, descartada
//    ...]
//
// En disco (JSON):
//   [["lm_head.weight", "output.weight"], ["model.layers.{}.self_attn.rotary_emb.inv_freq", null]]
//
// Toda la validación ocurre aquí, una sola vez. Si la tabla está mal formada
// se rechaza antes de tocar ningún checkpoint.
//
// ============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use log::debug;

use super::error::{MappingError, Result};
use super::template::{classify, KeyTemplate};

/// Entrada de la tabla. `destination == None` es el marcador de descarte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub source: KeyTemplate,
    pub destination: Option<KeyTemplate>,
}

impl MappingEntry {
    pub fn is_drop(&self) -> bool {
        self.destination.is_none()
    }
}

/// Tabla inmutable con índice por plantilla de origen.
#[derive(Debug, Clone)]
pub struct NamingTable {
    entries: Vec<MappingEntry>,
    by_source: HashMap<String, usize>,
}

impl NamingTable {
    pub fn new<I, S, D>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Option<D>)>,
        S: Into<String>,
        D: Into<String>,
    {
        let mut entries = Vec::new();
        let mut by_source = HashMap::new();

        for (source, destination) in pairs {
            let source = KeyTemplate::parse(source)?;
            let destination = destination.map(|d| KeyTemplate::parse(d)).transpose()?;

            if let Some(dest) = &destination {
                if dest.is_layer_scoped() != source.is_layer_scoped() {
                    return Err(MappingError::PlaceholderMismatch {
                        from: source.to_string(),
                        to: dest.to_string(),
                    });
                }
            }

            if by_source.contains_key(source.as_str()) {
                return Err(MappingError::DuplicateSource {
                    template: source.to_string(),
                });
            }

            by_source.insert(source.as_str().to_string(), entries.len());
            entries.push(MappingEntry { source, destination });
        }

        check_shadowing(entries.iter().map(|e| &e.source))?;

        debug!(
            "Naming table: {} entries ({} dropped)",
            entries.len(),
            entries.iter().filter(|e| e.is_drop()).count()
        );

        Ok(Self { entries, by_source })
    }

    /// Tabla estática (`&[(&str, Option<&str>)]`)
    pub fn from_static(pairs: &[(&str, Option<&str>)]) -> Result<Self> {
        Self::new(pairs.iter().copied())
    }

    /// Parsea una tabla JSON: array de pares `[source, destination | null]`.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let pairs: Vec<(String, Option<String>)> =
            serde_json::from_str(json).context("Invalid naming table JSON")?;
        Ok(Self::new(pairs)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&data)
            .with_context(|| format!("Invalid naming table in {}", path.display()))
    }

    /// Busca por plantilla de origen. `Some(None)` = reconocida pero descartada.
    pub fn lookup(&self, source: &str) -> Option<Option<&KeyTemplate>> {
        self.by_source
            .get(source)
            .map(|&idx| self.entries[idx].destination.as_ref())
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// INVERSE TABLE
// ============================================================================

/// Vista inversa destino → origen, sin entradas descartadas.
#[derive(Debug, Clone)]
pub struct InverseTable {
    by_destination: HashMap<String, KeyTemplate>,
}

impl InverseTable {
    /// Falla si dos orígenes distintos comparten destino.
    pub fn build(table: &NamingTable) -> Result<Self> {
        let mut by_destination: HashMap<String, KeyTemplate> = HashMap::new();

        for entry in table.iter() {
            let Some(dest) = &entry.destination else {
                continue;
            };

            if let Some(first) = by_destination.get(dest.as_str()) {
                return Err(MappingError::AmbiguousInverse {
                    destination: dest.to_string(),
                    first: first.to_string(),
                    second: entry.source.to_string(),
                });
            }

            by_destination.insert(dest.as_str().to_string(), entry.source.clone());
        }

        check_shadowing(table.entries().iter().filter_map(|e| e.destination.as_ref()))?;

        Ok(Self { by_destination })
    }

    pub fn lookup(&self, destination: &str) -> Option<&KeyTemplate> {
        self.by_destination.get(destination)
    }

    pub fn len(&self) -> usize {
        self.by_destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_destination.is_empty()
    }
}

/// Una plantilla global con dígitos cuya clasificación coincide con una
/// plantilla layer-scoped del mismo lado nunca se alcanzaría (y en el lado
/// destino podría colisionar con una clave renderizada).
fn check_shadowing<'a>(templates: impl Iterator<Item = &'a KeyTemplate> + Clone) -> Result<()> {
    let layer_scoped: HashMap<&str, &KeyTemplate> = templates
        .clone()
        .filter(|t| t.is_layer_scoped())
        .map(|t| (t.as_str(), t))
        .collect();

    for global in templates.filter(|t| !t.is_layer_scoped()) {
        let classified = classify(global.as_str());
        if classified.index.is_none() {
            continue;
        }
        if let Some(scoped) = layer_scoped.get(&*classified.template) {
            return Err(MappingError::ShadowedTemplate {
                global: global.to_string(),
                layer_scoped: scoped.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &[(&str, Option<&str>)] = &[
        ("model.embed_tokens.weight", Some("tok_embeddings.weight")),
        ("model.layers.{}.self_attn.q_proj.weight", Some("layers.{}.attention.wq.weight")),
        ("model.layers.{}.self_attn.rotary_emb.inv_freq", None),
        ("lm_head.weight", Some("output.weight")),
    ];

    #[test]
    fn test_table_preserves_order() {
        let table = NamingTable::from_static(SMALL).unwrap();
        assert_eq!(table.len(), 4);
        let sources: Vec<&str> = table.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources[0], "model.embed_tokens.weight");
        assert_eq!(sources[3], "lm_head.weight");
    }

    #[test]
    fn test_lookup_distinguishes_drop_from_absent() {
        let table = NamingTable::from_static(SMALL).unwrap();
        assert_eq!(
            table.lookup("lm_head.weight").unwrap().unwrap().as_str(),
            "output.weight"
        );
        assert_eq!(table.lookup("model.layers.{}.self_attn.rotary_emb.inv_freq"), Some(None));
        assert_eq!(table.lookup("model.unknown.weight"), None);
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let err = NamingTable::from_static(&[
            ("lm_head.weight", Some("output.weight")),
            ("lm_head.weight", None),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            MappingError::DuplicateSource { template: "lm_head.weight".to_string() }
        );
    }

    #[test]
    fn test_placeholder_mismatch_rejected() {
        let err =
            NamingTable::from_static(&[("model.layers.{}.mlp.up_proj.weight", Some("w3.weight"))])
                .unwrap_err();
        assert!(matches!(err, MappingError::PlaceholderMismatch { .. }));

        let err = NamingTable::from_static(&[("model.norm.weight", Some("layers.{}.norm.weight"))])
            .unwrap_err();
        assert!(matches!(err, MappingError::PlaceholderMismatch { .. }));
    }

    #[test]
    fn test_malformed_template_rejected() {
        let err = NamingTable::from_static(&[(
            "model.layers.{}.experts.{}.w1",
            Some("layers.{}.moe.experts.{}.w1"),
        )])
        .unwrap_err();
        assert!(matches!(err, MappingError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_shadowed_source_rejected() {
        let err = NamingTable::from_static(&[
            ("model.layers.{}.mlp.up_proj.weight", Some("layers.{}.feed_forward.w3.weight")),
            ("model.layers.0.mlp.up_proj.weight", Some("first_w3.weight")),
        ])
        .unwrap_err();
        assert!(matches!(err, MappingError::ShadowedTemplate { .. }));
    }

    #[test]
    fn test_global_with_digits_allowed() {
        let table =
            NamingTable::from_static(&[("vision.conv1.weight", Some("patch_conv.weight"))]).unwrap();
        assert!(InverseTable::build(&table).is_ok());
    }

    #[test]
    fn test_inverse_skips_drops() {
        let table = NamingTable::from_static(SMALL).unwrap();
        let inverse = InverseTable::build(&table).unwrap();
        assert_eq!(inverse.len(), 3);
        assert_eq!(
            inverse.lookup("layers.{}.attention.wq.weight").unwrap().as_str(),
            "model.layers.{}.self_attn.q_proj.weight"
        );
    }

    #[test]
    fn test_inverse_ambiguity_rejected() {
        let table = NamingTable::from_static(&[
            ("model.layers.{}.self_attn.q_proj.weight", Some("layers.{}.attention.wq.weight")),
            ("model.layers.{}.attn.q.weight", Some("layers.{}.attention.wq.weight")),
        ])
        .unwrap();
        let err = InverseTable::build(&table).unwrap_err();
        assert_eq!(
            err,
            MappingError::AmbiguousInverse {
                destination: "layers.{}.attention.wq.weight".to_string(),
                first: "model.layers.{}.self_attn.q_proj.weight".to_string(),
                second: "model.layers.{}.attn.q.weight".to_string(),
            }
        );
    }

    #[test]
    fn test_shadowed_destination_rejected() {
        let table = NamingTable::from_static(&[
            ("model.layers.{}.mlp.up_proj.weight", Some("layers.{}.w3.weight")),
            ("extra_w3.weight", Some("layers.0.w3.weight")),
        ])
        .unwrap();
        assert!(matches!(
            InverseTable::build(&table),
            Err(MappingError::ShadowedTemplate { .. })
        ));
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"[
            ["lm_head.weight", "output.weight"],
            ["model.layers.{}.self_attn.rotary_emb.inv_freq", null]
        ]"#;
        let table = NamingTable::from_json_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.entries()[1].is_drop());
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(NamingTable::from_json_str("{\"lm_head.weight\": 1}").is_err());
        assert!(NamingTable::from_json_str(r#"[["a.{}.{}", null]]"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(&path, r#"[["model.norm.weight", "norm.weight"]]"#).unwrap();

        let table = NamingTable::load(&path).unwrap();
        assert_eq!(table.lookup("model.norm.weight").unwrap().unwrap().as_str(), "norm.weight");

        assert!(NamingTable::load(&dir.path().join("missing.json")).is_err());
    }
}
