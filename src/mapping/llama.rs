// src/mapping/llama.rs
// ============================================================================
// LLAMA TABLE - Nombres Llama/Mistral/DeepSeek (HF) → convención interna
// ============================================================================
//
// Igual que Qwen2 pero sin bias de atención.
//
// ============================================================================

pub const LLAMA3_TABLE: &[(&str, Option<&str>)] = &[
    ("model.embed_tokens.weight", Some("tok_embeddings.weight")),
    ("model.layers.{}.self_attn.q_proj.weight", Some("layers.{}.attention.wq.weight")),
    ("model.layers.{}.self_attn.k_proj.weight", Some("layers.{}.attention.wk.weight")),
    ("model.layers.{}.self_attn.v_proj.weight", Some("layers.{}.attention.wv.weight")),
    ("model.layers.{}.self_attn.o_proj.weight", Some("layers.{}.attention.wo.weight")),
    ("model.layers.{}.self_attn.rotary_emb.inv_freq", None),
    ("model.layers.{}.mlp.gate_proj.weight", Some("layers.{}.feed_forward.w1.weight")),
    ("model.layers.{}.mlp.up_proj.weight", Some("layers.{}.feed_forward.w3.weight")),
    ("model.layers.{}.mlp.down_proj.weight", Some("layers.{}.feed_forward.w2.weight")),
    ("model.layers.{}.input_layernorm.weight", Some("layers.{}.attention_norm.weight")),
    ("model.layers.{}.post_attention_layernorm.weight", Some("layers.{}.ffn_norm.weight")),
    ("model.norm.weight", Some("norm.weight")),
    ("lm_head.weight", Some("output.weight")),
];
