//! Transformer Block
//!
//! One layer of the decoder: causal self-attention followed by the
//! position-wise feed-forward network, each wrapped in a pre-norm residual
//! connection.
//!
//! ## Architecture
//!
//! ```text
//! x ──→ LayerNorm → MultiHeadAttention ──→ (+) ──→ LayerNorm → FeedForward ──→ (+) ──→ output
//! │                                        ↑  │                                ↑
//! └────────────────────────────────────────┘  └────────────────────────────────┘
//! ```
//!
//! ## Pre-Norm Residuals
//!
//! Normalization is applied *before* each sublayer, and the raw sublayer
//! output is added back to the unnormalized input:
//!
//! ```text
//! x'  = x  + attn(norm(x))
//! x'' = x' + ffwd(norm(x'))
//! ```
//!
//! The hidden state is only ever updated additively, never overwritten, so
//! a stack of these blocks stays stable at depth. Each block is a pure
//! function of its input and its weights.

use rand::rngs::StdRng;

use super::attention::MultiHeadAttention;
use super::layer_norm::LayerNorm;
use super::mlp::FeedForward;
use crate::tensor::Tensor;

/// Pre-norm residual block: attention sublayer plus feed-forward sublayer.
#[derive(Debug)]
pub struct Block {
    pub ln1: LayerNorm,
    pub attn: MultiHeadAttention,
    pub ln2: LayerNorm,
    pub mlp: FeedForward,
}

impl Block {
    /// Create a transformer block.
    ///
    /// # Arguments
    ///
    /// * `d_model` - Embedding dimension
    /// * `n_head` - Number of attention heads; must divide `d_model`
    /// * `dropout_rate` - Dropout probability for both sublayers
    /// * `rng` - Seeded RNG for weight initialization
    pub fn new(d_model: usize, n_head: usize, dropout_rate: f32, rng: &mut StdRng) -> Self {
        Self {
            ln1: LayerNorm::new(d_model),
            attn: MultiHeadAttention::new(d_model, n_head, dropout_rate, rng),
            ln2: LayerNorm::new(d_model),
            mlp: FeedForward::new(d_model, dropout_rate, rng),
        }
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor [seq_len, d_model]
    ///
    /// # Returns
    ///
    /// Output tensor [seq_len, d_model]
    pub fn forward(&self, x: &Tensor) -> Tensor {
        // Attention sublayer with residual connection
        let x = x.add(&self.attn.forward(&self.ln1.forward(x)));

        // Feed-forward sublayer with residual connection
        x.add(&self.mlp.forward(&self.ln2.forward(&x)))
    }

    /// Number of learnable parameters.
    pub fn num_parameters(&self) -> usize {
        let attn_params: usize = self
            .attn
            .heads
            .iter()
            .map(|h| h.wq.num_parameters() + h.wk.num_parameters() + h.wv.num_parameters())
            .sum::<usize>()
            + self.attn.out_proj.num_parameters();
        let norm_params = self.ln1.gamma.data.len()
            + self.ln1.beta.data.len()
            + self.ln2.gamma.data.len()
            + self.ln2.beta.data.len();

        attn_params + norm_params + self.mlp.num_parameters()
    }
}
