// src/main.rs
// ============================================================================
// STATEDICT-BRIDGE CLI
// ============================================================================
//
// Uso simple (detecta arquitectura desde config.json):
//   statedict-bridge ./Qwen2.5-7B
//
// Claves internas → HF con tabla propia:
//   statedict-bridge --table my_table.json --direction to-external \
//       --keys internal_keys.txt
//
// ============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use regex::Regex;

use statedict_bridge::{
    adapter::{Direction, StateDict, StateDictAdapter},
    config::{qwen2_5_flavor, ModelArgs, QWEN2_5_FLAVORS},
    mapping::{detect_architecture, load_config, Architecture, NamingTable},
    safetensor::list_tensor_names,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    /// HF → interna
    ToInternal,
    /// Interna → HF
    ToExternal,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::ToInternal => Direction::ToInternal,
            DirectionArg::ToExternal => Direction::ToExternal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "statedict-bridge")]
#[command(about = "Show how checkpoint keys map between HuggingFace and internal naming")]
#[command(version)]
struct Args {
    /// HF asset directory (config.json + safetensors)
    #[arg(value_name = "MODEL")]
    model: Option<PathBuf>,

    /// Architecture preset (qwen2, llama). Overrides detection
    #[arg(long)]
    arch: Option<Architecture>,

    /// Custom naming table (JSON array of [source, destination|null])
    #[arg(long)]
    table: Option<PathBuf>,

    /// Qwen2.5 flavor for model args when there is no config.json
    #[arg(long)]
    flavor: Option<String>,

    /// Conversion direction
    #[arg(short, long, value_enum, default_value = "to-internal")]
    direction: DirectionArg,

    /// Keys source: .safetensors, index.json, shard folder or text file (one key per line)
    #[arg(short, long)]
    keys: Option<PathBuf>,

    /// Only keys matching this regex
    #[arg(long)]
    filter: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let adapter = build_adapter(&args)?;
    let direction: Direction = args.direction.into();

    let keys_path = args
        .keys
        .as_ref()
        .or(args.model.as_ref())
        .ok_or_else(|| anyhow::anyhow!("No keys source. Use --keys or a MODEL directory"))?;

    let mut keys = read_keys(keys_path)?;
    if let Some(pattern) = &args.filter {
        let re = Regex::new(pattern)
            .with_context(|| format!("Invalid --filter regex: {}", pattern))?;
        keys.retain(|k| re.is_match(k));
    }
    debug!("{} keys from {}", keys.len(), keys_path.display());

    // Valor = nombre original, así la salida dice de dónde viene cada clave
    let input: StateDict<String> = keys.iter().map(|k| (k.clone(), k.clone())).collect();
    let (output, report) = adapter.convert(&input, direction);

    println!("═══════════════════════════════════════════════════════════════");
    println!("  STATEDICT-BRIDGE - {}", direction.name());
    println!("═══════════════════════════════════════════════════════════════");

    let mut pairs: Vec<(&String, &String)> = output.iter().map(|(new, old)| (old, new)).collect();
    pairs.sort();
    for (old, new) in pairs {
        println!("  {} -> {}", old, new);
    }

    if args.verbose && !report.unrecognized.is_empty() {
        let mut unrecognized = report.unrecognized.clone();
        unrecognized.sort();
        println!("\n[UNRECOGNIZED]");
        for key in unrecognized {
            println!("  - {}", key);
        }
    }

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  Renamed:      {}", report.renamed);
    println!("  Dropped:      {}", report.dropped);
    println!("  Unrecognized: {}", report.unrecognized.len());
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}

fn build_adapter(args: &Args) -> Result<StateDictAdapter> {
    let config = args.model.as_deref().map(load_config).transpose()?;

    let table = match &args.table {
        Some(path) => NamingTable::load(path)?,
        None => {
            let arch = match (args.arch, &config) {
                (Some(arch), _) => arch,
                (None, Some(config)) => detect_architecture(config).unwrap_or_else(|| {
                    warn!("Unknown architecture, falling back to llama table");
                    Architecture::Llama
                }),
                (None, None) => anyhow::bail!("No table. Use MODEL, --arch or --table"),
            };
            info!("Architecture: {}", arch);
            arch.naming_table()?
        }
    };

    let model_args = match (&args.flavor, &config) {
        (Some(flavor), _) => qwen2_5_flavor(flavor).ok_or_else(|| {
            anyhow::anyhow!("Unknown flavor '{}'. Available: {}", flavor, QWEN2_5_FLAVORS.join(", "))
        })?,
        (None, Some(config)) => ModelArgs::from_hf_config(config),
        (None, None) => ModelArgs::default(),
    };

    let adapter = StateDictAdapter::new(table, model_args, args.model.clone())?;
    Ok(adapter)
}

/// Lee claves desde safetensors (archivo, index o carpeta) o un .txt
fn read_keys(path: &Path) -> Result<Vec<String>> {
    let is_text = path.is_file()
        && !path.extension().map_or(false, |e| e == "safetensors" || e == "json");

    if !is_text {
        return list_tensor_names(path);
    }

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}
