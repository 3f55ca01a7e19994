// src/mapping/qwen2.rs
// ============================================================================
// QWEN2 TABLE - Nombres Qwen2/Qwen2.5 (HF) → convención interna
// ============================================================================
//
// Soporta: Qwen2, Qwen2.5, Qwen2.5-Instruct, Qwen2.5-Coder, etc.
// Todos usan los mismos nombres de tensores.
//
// ============================================================================

pub const QWEN2_5_TABLE: &[(&str, Option<&str>)] = &[
    ("model.embed_tokens.weight", Some("tok_embeddings.weight")),
    // ATTENTION (q/k/v con bias)
    ("model.layers.{}.self_attn.q_proj.weight", Some("layers.{}.attention.wq.weight")),
    ("model.layers.{}.self_attn.q_proj.bias", Some("layers.{}.attention.wq.bias")),
    ("model.layers.{}.self_attn.k_proj.weight", Some("layers.{}.attention.wk.weight")),
    ("model.layers.{}.self_attn.k_proj.bias", Some("layers.{}.attention.wk.bias")),
    ("model.layers.{}.self_attn.v_proj.weight", Some("layers.{}.attention.wv.weight")),
    ("model.layers.{}.self_attn.v_proj.bias", Some("layers.{}.attention.wv.bias")),
    ("model.layers.{}.self_attn.o_proj.weight", Some("layers.{}.attention.wo.weight")),
    ("model.layers.{}.self_attn.rotary_emb.inv_freq", None),
    // MLP (SwiGLU: gate → w1, up → w3, down → w2)
    ("model.layers.{}.mlp.gate_proj.weight", Some("layers.{}.feed_forward.w1.weight")),
    ("model.layers.{}.mlp.up_proj.weight", Some("layers.{}.feed_forward.w3.weight")),
    ("model.layers.{}.mlp.down_proj.weight", Some("layers.{}.feed_forward.w2.weight")),
    // LAYER NORMS
    ("model.layers.{}.input_layernorm.weight", Some("layers.{}.attention_norm.weight")),
    ("model.layers.{}.post_attention_layernorm.weight", Some("layers.{}.ffn_norm.weight")),
    ("model.norm.weight", Some("norm.weight")),
    ("lm_head.weight", Some("output.weight")),
];
