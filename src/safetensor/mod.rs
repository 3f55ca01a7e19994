// src/safetensor/mod.rs
// ============================================================================
// SAFETENSOR KEYS - Lista nombres de tensores de un modelo HuggingFace
// ============================================================================
//
// Solo lee la cabecera (8 bytes little-endian + JSON). Los datos de los
// tensores nunca se tocan.
//
// ============================================================================

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;

const METADATA_KEY: &str = "__metadata__";

/// Cabecera mayor que esto = archivo corrupto
const MAX_HEADER_SIZE: u64 = 100 * 1024 * 1024;

/// model.safetensors.index.json
#[derive(Debug, Deserialize)]
struct SafetensorIndex {
    weight_map: HashMap<String, String>,
}

/// Nombres de tensores de un único .safetensors, ordenados.
pub fn read_tensor_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut header_size_bytes = [0u8; 8];
    reader
        .read_exact(&mut header_size_bytes)
        .with_context(|| format!("Truncated safetensor header in {}", path.display()))?;
    let header_size = u64::from_le_bytes(header_size_bytes);

    if header_size > MAX_HEADER_SIZE {
        return Err(anyhow!(
            "Safetensor header too large ({} bytes) in {}",
            header_size,
            path.display()
        ));
    }

    let mut header_bytes = vec![0u8; header_size as usize];
    reader
        .read_exact(&mut header_bytes)
        .with_context(|| format!("Truncated safetensor header in {}", path.display()))?;

    let header: HashMap<String, Value> =
        serde_json::from_slice(&header_bytes).with_context(|| "Invalid safetensor header JSON")?;

    let mut names: Vec<String> = header
        .into_keys()
        .filter(|name| name != METADATA_KEY)
        .collect();
    names.sort();
    Ok(names)
}

/// Nombres desde `model.safetensors.index.json` (weight_map)
pub fn read_index_names(path: &Path) -> Result<Vec<String>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let index: SafetensorIndex = serde_json::from_str(&data)
        .with_context(|| format!("Invalid safetensor index {}", path.display()))?;

    let mut names: Vec<String> = index.weight_map.into_keys().collect();
    names.sort();
    Ok(names)
}

/// Acepta un archivo .safetensors, un index.json o un directorio con shards.
pub fn list_tensor_names(path: &Path) -> Result<Vec<String>> {
    if path.is_file() {
        let is_index = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.ends_with(".index.json"));
        return if is_index {
            read_index_names(path)
        } else {
            read_tensor_names(path)
        };
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("Cannot read directory {}", path.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "safetensors"))
        .collect();

    if paths.is_empty() {
        return Err(anyhow!("No .safetensors files in {}", path.display()));
    }

    // Ordenar para consistencia
    paths.sort();

    let mut names = Vec::new();
    for shard in &paths {
        names.extend(read_tensor_names(shard)?);
    }
    names.sort();
    names.dedup();
    Ok(names)
}
