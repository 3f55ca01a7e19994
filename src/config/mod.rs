// src/config/mod.rs
// ============================================================================
// CONFIG - Forma del modelo (contexto opaco para el adapter)
// ============================================================================
//
// El algoritmo de mapeo no mira estos valores. Viajan con el adapter para
// los colaboradores (loader, writer) que sí los necesitan.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArgs {
    pub dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    pub n_kv_heads: usize,
    pub vocab_size: usize,
    pub head_dim: usize,
    pub hidden_dim: usize,
    pub norm_eps: f64,
    pub rope_theta: f64,
    pub qk_norm: bool,
    pub max_seq_len: usize,
    pub enable_weight_tying: bool,
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            dim: 4096,
            n_layers: 32,
            n_heads: 32,
            n_kv_heads: 8,
            vocab_size: 151936,
            head_dim: 128,
            hidden_dim: 11008,
            norm_eps: 1e-6,
            rope_theta: 1_000_000.0,
            qk_norm: false,
            max_seq_len: 32768,
            enable_weight_tying: false,
        }
    }
}

impl ModelArgs {
    /// Lee un config.json de HuggingFace. Campos ausentes → default.
    pub fn from_hf_config(config: &Value) -> Self {
        let d = Self::default();

        let dim = usize_field(config, "hidden_size").unwrap_or(d.dim);
        let n_heads = usize_field(config, "num_attention_heads").unwrap_or(d.n_heads);
        let n_kv_heads = usize_field(config, "num_key_value_heads").unwrap_or(n_heads);

        // head_dim explícito o derivado
        let head_dim = usize_field(config, "head_dim")
            .unwrap_or_else(|| if n_heads > 0 { dim / n_heads } else { d.head_dim });

        Self {
            dim,
            n_layers: usize_field(config, "num_hidden_layers").unwrap_or(d.n_layers),
            n_heads,
            n_kv_heads,
            vocab_size: usize_field(config, "vocab_size").unwrap_or(d.vocab_size),
            head_dim,
            hidden_dim: usize_field(config, "intermediate_size").unwrap_or(d.hidden_dim),
            norm_eps: config["rms_norm_eps"].as_f64().unwrap_or(d.norm_eps),
            rope_theta: config["rope_theta"].as_f64().unwrap_or(d.rope_theta),
            qk_norm: d.qk_norm,
            max_seq_len: usize_field(config, "max_position_embeddings").unwrap_or(d.max_seq_len),
            enable_weight_tying: config["tie_word_embeddings"]
                .as_bool()
                .unwrap_or(d.enable_weight_tying),
        }
    }
}

/// Entero no negativo que cabe en usize; si no, None (y se usa el default)
fn usize_field(config: &Value, key: &str) -> Option<usize> {
    config[key].as_u64().and_then(|v| usize::try_from(v).ok())
}

// ============================================================================
// QWEN2.5 FLAVORS
// ============================================================================

pub const QWEN2_5_FLAVORS: &[&str] = &["debugmodel", "0.5B", "1.5B", "3B", "7B", "14B", "32B", "72B"];

/// Presets Qwen2.5 por nombre de variante.
pub fn qwen2_5_flavor(name: &str) -> Option<ModelArgs> {
    // (vocab, head_dim, dim, n_layers, n_heads, n_kv_heads, hidden_dim, tying)
    let (vocab_size, head_dim, dim, n_layers, n_heads, n_kv_heads, hidden_dim, enable_weight_tying) =
        match name {
            "debugmodel" => (2048, 128, 256, 8, 16, 8, 3072, true),
            "0.5B" => (152064, 64, 896, 24, 14, 2, 4864, true),
            "1.5B" => (152064, 128, 1536, 28, 12, 2, 8960, false),
            "3B" => (152064, 128, 2048, 36, 16, 2, 11008, false),
            "7B" => (152064, 128, 3584, 28, 28, 4, 18944, false),
            "14B" => (152064, 128, 5120, 48, 40, 8, 13824, false),
            "32B" => (152064, 128, 5120, 64, 40, 8, 27648, false),
            "72B" => (152064, 128, 8192, 80, 64, 8, 29568, false),
            _ => return None,
        };

    Some(ModelArgs {
        dim,
        n_layers,
        n_heads,
        n_kv_heads,
        vocab_size,
        head_dim,
        hidden_dim,
        norm_eps: 1e-6,
        rope_theta: 1_000_000.0,
        qk_norm: true,
        max_seq_len: if name == "debugmodel" { 4096 } else { 32768 },
        enable_weight_tying,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_hf_config() {
        let config = json!({
            "model_type": "qwen2",
            "hidden_size": 896,
            "num_hidden_layers": 24,
            "num_attention_heads": 14,
            "num_key_value_heads": 2,
            "intermediate_size": 4864,
            "vocab_size": 151936,
            "rms_norm_eps": 1e-6,
            "rope_theta": 1000000.0,
            "max_position_embeddings": 32768,
            "tie_word_embeddings": true
        });

        let args = ModelArgs::from_hf_config(&config);
        assert_eq!(args.dim, 896);
        assert_eq!(args.n_layers, 24);
        assert_eq!(args.n_kv_heads, 2);
        assert_eq!(args.head_dim, 64);
        assert_eq!(args.hidden_dim, 4864);
        assert!(args.enable_weight_tying);
    }

    #[test]
    fn test_from_hf_config_defaults() {
        let args = ModelArgs::from_hf_config(&json!({ "num_attention_heads": 16 }));
        assert_eq!(args.n_heads, 16);
        // sin num_key_value_heads → MHA
        assert_eq!(args.n_kv_heads, 16);
        assert_eq!(args.dim, 4096);
        assert_eq!(args.head_dim, 256);
    }

    #[test]
    fn test_from_hf_config_rejects_non_integer_fields() {
        let d = ModelArgs::default();
        let args = ModelArgs::from_hf_config(&json!({
            "num_hidden_layers": -4,
            "vocab_size": "big",
            "intermediate_size": 1.5,
        }));
        assert_eq!(args.n_layers, d.n_layers);
        assert_eq!(args.vocab_size, d.vocab_size);
        assert_eq!(args.hidden_dim, d.hidden_dim);
        assert_eq!(usize_field(&json!({ "x": 7 }), "x"), Some(7));
    }

    #[test]
    fn test_flavors() {
        for name in QWEN2_5_FLAVORS {
            assert!(qwen2_5_flavor(name).is_some(), "missing flavor {}", name);
        }

        let args = qwen2_5_flavor("7B").unwrap();
        assert_eq!(args.dim, 3584);
        assert_eq!(args.n_layers, 28);
        assert_eq!(args.n_kv_heads, 4);
        assert!(!args.enable_weight_tying);

        let debug = qwen2_5_flavor("debugmodel").unwrap();
        assert_eq!(debug.max_seq_len, 4096);
        assert!(debug.enable_weight_tying);

        assert!(qwen2_5_flavor("9000B").is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let args = qwen2_5_flavor("0.5B").unwrap();
        let json = serde_json::to_string(&args).unwrap();
        let back: ModelArgs = serde_json::from_str(&json).unwrap();
        assert_eq!(args, back);
    }
}
