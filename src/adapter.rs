// src/adapter.rs
// ============================================================================
// STATE DICT ADAPTER - Convierte claves HF ↔ convención interna
// ============================================================================
//
// El adapter es PURO:
// - Solo reubica valores bajo una clave nueva (nunca los inspecciona)
// - Nunca muta la entrada, siempre devuelve un mapa nuevo
// - Claves no reconocidas o descartadas se omiten, sin error
//
// Flujo por clave:
//   "model.layers.12.mlp.up_proj.weight"
//     → classify  → ("model.layers.{}.mlp.up_proj.weight", "12")
//     → lookup    → "layers.{}.feed_forward.w3.weight"
//     → render    → "layers.12.feed_forward.w3.weight"
//
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::config::ModelArgs;
use crate::mapping::error::Result;
use crate::mapping::table::{InverseTable, NamingTable};
use crate::mapping::template::{classify, KeyTemplate, PLACEHOLDER};

/// Mapa plano nombre → handle de valor opaco
pub type StateDict<V> = HashMap<String, V>;

/// Sentido de la conversión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Convención externa (HF) → interna
    ToInternal,
    /// Convención interna → externa (HF)
    ToExternal,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToInternal => "to_internal",
            Self::ToExternal => "to_external",
        }
    }
}

/// Resultado de traducir una sola clave
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Renamed(String),
    /// Reconocida, destino = drop
    Dropped,
    /// Ninguna entrada de la tabla la reconoce
    Unrecognized,
}

/// Diagnóstico opcional de una conversión
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub renamed: usize,
    pub dropped: usize,
    pub unrecognized: Vec<String>,
}

impl ConversionReport {
    pub fn total(&self) -> usize {
        self.renamed + self.dropped + self.unrecognized.len()
    }

    pub fn is_lossless(&self) -> bool {
        self.dropped == 0 && self.unrecognized.is_empty()
    }

    fn record(&mut self, key: &str, outcome: &KeyOutcome) {
        match outcome {
            KeyOutcome::Renamed(_) => self.renamed += 1,
            KeyOutcome::Dropped => self.dropped += 1,
            KeyOutcome::Unrecognized => self.unrecognized.push(key.to_string()),
        }
    }
}

pub struct StateDictAdapter {
    table: NamingTable,
    inverse: InverseTable,
    model_args: ModelArgs,
    hf_assets_path: Option<PathBuf>,
}

impl StateDictAdapter {
    /// Construye el adapter y cachea la tabla inversa.
    /// Falla si la inversión es ambigua.
    pub fn new(
        table: NamingTable,
        model_args: ModelArgs,
        hf_assets_path: Option<PathBuf>,
    ) -> Result<Self> {
        let inverse = InverseTable::build(&table)?;

        debug!(
            "StateDictAdapter: {} entries, {} invertible",
            table.len(),
            inverse.len()
        );

        Ok(Self {
            table,
            inverse,
            model_args,
            hf_assets_path,
        })
    }

    pub fn table(&self) -> &NamingTable {
        &self.table
    }

    pub fn model_args(&self) -> &ModelArgs {
        &self.model_args
    }

    /// Pista para colaboradores (tokenizer, config.json junto a los pesos)
    pub fn hf_assets_path(&self) -> Option<&Path> {
        self.hf_assets_path.as_deref()
    }

    // ═══════════════════════════════════════════════════════════════════
    // CLAVE INDIVIDUAL
    // ═══════════════════════════════════════════════════════════════════

    pub fn translate_key(&self, key: &str, direction: Direction) -> KeyOutcome {
        let outcome = match direction {
            Direction::ToInternal => self.resolve(key, |t| self.table.lookup(t)),
            Direction::ToExternal => self.resolve(key, |t| self.inverse.lookup(t).map(Some)),
        };

        if !matches!(outcome, KeyOutcome::Renamed(_)) {
            trace!("{}: skipping '{}' ({:?})", direction.name(), key, outcome);
        }

        outcome
    }

    /// `lookup` devuelve `Some(None)` para drop, `None` para no reconocida.
    fn resolve<'t>(
        &'t self,
        key: &str,
        lookup: impl Fn(&str) -> Option<Option<&'t KeyTemplate>>,
    ) -> KeyOutcome {
        let classified = classify(key);

        // 1. Plantilla layer-scoped con el índice capturado
        if let Some(index) = classified.index {
            if let Some(found) = lookup(&*classified.template) {
                return match found {
                    Some(dest) => KeyOutcome::Renamed(dest.render(Some(index))),
                    None => KeyOutcome::Dropped,
                };
            }
        }

        // 2. Clave completa como plantilla global (también globales con dígitos: "conv1.weight")
        if !key.contains(PLACEHOLDER) {
            if let Some(found) = lookup(key) {
                return match found {
                    Some(dest) => KeyOutcome::Renamed(dest.render(None)),
                    None => KeyOutcome::Dropped,
                };
            }
        }

        KeyOutcome::Unrecognized
    }

    // ═══════════════════════════════════════════════════════════════════
    // CONVERSIÓN DE STATE DICTS
    // ═══════════════════════════════════════════════════════════════════

    /// Interna → HF. Clona los handles (deben ser baratos: Arc, offsets...).
    pub fn to_external<V: Clone>(&self, state_dict: &StateDict<V>) -> StateDict<V> {
        self.convert(state_dict, Direction::ToExternal).0
    }

    /// HF → interna.
    pub fn to_internal<V: Clone>(&self, hf_state_dict: &StateDict<V>) -> StateDict<V> {
        self.convert(hf_state_dict, Direction::ToInternal).0
    }

    pub fn to_external_with_report<V: Clone>(
        &self,
        state_dict: &StateDict<V>,
    ) -> (StateDict<V>, ConversionReport) {
        self.convert(state_dict, Direction::ToExternal)
    }

    pub fn to_internal_with_report<V: Clone>(
        &self,
        hf_state_dict: &StateDict<V>,
    ) -> (StateDict<V>, ConversionReport) {
        self.convert(hf_state_dict, Direction::ToInternal)
    }

    /// Variante que consume la entrada y mueve los valores sin clonar.
    pub fn into_external<V>(&self, state_dict: StateDict<V>) -> StateDict<V> {
        self.convert_owned(state_dict, Direction::ToExternal).0
    }

    pub fn into_internal<V>(&self, hf_state_dict: StateDict<V>) -> StateDict<V> {
        self.convert_owned(hf_state_dict, Direction::ToInternal).0
    }

    pub fn convert<V: Clone>(
        &self,
        input: &StateDict<V>,
        direction: Direction,
    ) -> (StateDict<V>, ConversionReport) {
        let mut output = HashMap::with_capacity(input.len());
        let mut report = ConversionReport::default();

        for (key, value) in input {
            let outcome = self.translate_key(key, direction);
            report.record(key, &outcome);
            if let KeyOutcome::Renamed(new_key) = outcome {
                output.insert(new_key, value.clone());
            }
        }

        log_summary(direction, &report);
        (output, report)
    }

    pub fn convert_owned<V>(
        &self,
        input: StateDict<V>,
        direction: Direction,
    ) -> (StateDict<V>, ConversionReport) {
        let mut output = HashMap::with_capacity(input.len());
        let mut report = ConversionReport::default();

        for (key, value) in input {
            let outcome = self.translate_key(&key, direction);
            report.record(&key, &outcome);
            if let KeyOutcome::Renamed(new_key) = outcome {
                output.insert(new_key, value);
            }
        }

        log_summary(direction, &report);
        (output, report)
    }
}

fn log_summary(direction: Direction, report: &ConversionReport) {
    trace!(
        "{}: {} renamed, {} dropped, {} unrecognized",
        direction.name(),
        report.renamed,
        report.dropped,
        report.unrecognized.len()
    );
}
