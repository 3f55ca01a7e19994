// src/mapping/factory.rs
// ============================================================================
// ADAPTER FACTORY - Crea el adapter correcto para cada arquitectura
// ============================================================================

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::Value;

use super::llama::LLAMA3_TABLE;
use super::qwen2::QWEN2_5_TABLE;
use super::table::NamingTable;
use crate::adapter::StateDictAdapter;
use crate::config::ModelArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Qwen2,
    Llama,
}

impl Architecture {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Qwen2 => "qwen2",
            Self::Llama => "llama",
        }
    }

    pub fn table_entries(&self) -> &'static [(&'static str, Option<&'static str>)] {
        match self {
            Self::Qwen2 => QWEN2_5_TABLE,
            Self::Llama => LLAMA3_TABLE,
        }
    }

    pub fn naming_table(&self) -> super::error::Result<NamingTable> {
        NamingTable::from_static(self.table_entries())
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "qwen2" | "qwen2.5" | "qwen" => Ok(Self::Qwen2),
            "llama" | "llama3" | "mistral" | "deepseek" | "codellama" => Ok(Self::Llama),
            other => anyhow::bail!("Unknown architecture: {}", other),
        }
    }
}

/// Detecta la arquitectura desde config.json (model_type, luego architectures)
pub fn detect_architecture(config: &Value) -> Option<Architecture> {
    if let Some(model_type) = config.get("model_type").and_then(|v| v.as_str()) {
        let mt = model_type.to_lowercase();
        if mt.contains("qwen") {
            return Some(Architecture::Qwen2);
        }
        if mt.contains("llama") || mt.contains("mistral") || mt.contains("deepseek") {
            return Some(Architecture::Llama);
        }
    }

    if let Some(arch) = config
        .get("architectures")
        .and_then(|v| v.as_array())
        .and_then(|archs| archs.first())
        .and_then(|v| v.as_str())
    {
        let arch_lower = arch.to_lowercase();
        if arch_lower.contains("qwen") {
            return Some(Architecture::Qwen2);
        }
        if arch_lower.contains("llama")
            || arch_lower.contains("mistral")
            || arch_lower.contains("deepseek")
        {
            return Some(Architecture::Llama);
        }
    }

    None
}

/// Lee config.json de un directorio de assets HF
pub fn load_config(model_path: &Path) -> Result<Value> {
    let config_path = model_path.join("config.json");

    if !config_path.exists() {
        anyhow::bail!("No config.json found in {}", model_path.display());
    }

    let data = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let config: Value = serde_json::from_str(&data)
        .with_context(|| format!("Invalid JSON in {}", config_path.display()))?;

    Ok(config)
}

/// Crea el adapter para un directorio de assets HF
pub fn create_adapter(model_path: &Path) -> Result<StateDictAdapter> {
    let config = load_config(model_path)?;

    let arch = match detect_architecture(&config) {
        Some(arch) => arch,
        None => {
            warn!(
                "Unknown architecture in {}, falling back to llama table",
                model_path.display()
            );
            Architecture::Llama
        }
    };
    info!("Detected architecture: {}", arch);

    let args = ModelArgs::from_hf_config(&config);
    let adapter =
        StateDictAdapter::new(arch.naming_table()?, args, Some(model_path.to_path_buf()))?;
    Ok(adapter)
}
