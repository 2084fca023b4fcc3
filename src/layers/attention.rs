//! Causal Self-Attention
//!
//! Attention lets each position gather information from the positions
//! before it. This module implements one attention head and the multi-head
//! wrapper that runs several heads side by side.
//!
//! ## Scaled Dot-Product Attention
//!
//! ```text
//! Q, K, V = x @ Wq, x @ Wk, x @ Wv       (no bias terms)
//! scores  = (Q @ K^T) / sqrt(head_size)
//! weights = softmax(masked scores)
//! output  = weights @ V
//! ```
//!
//! ## Why Scaling?
//!
//! Dot products grow with the projection dimension. Dividing by
//! sqrt(head_size) keeps the scores in a range where softmax still
//! produces a usable spread instead of saturating.
//!
//! ## Causal Masking
//!
//! Position `i` must never observe a later position `j > i`, so those
//! scores are set to `-inf` before softmax. The stable softmax maps them to
//! exactly zero weight, and every row still sums to one over the positions
//! it is allowed to see. A single-token input makes the mask a no-op: the
//! 1x1 weight matrix holds exactly 1 and the output equals the value row.
//!
//! ## Multiple Heads
//!
//! Each head owns its own projections and attends independently in a
//! `head_size = d_model / n_head` subspace. Head outputs are concatenated
//! back to `d_model` and mixed by one output projection. Heads read shared
//! input and write disjoint output columns, so they run in parallel with
//! results identical to a sequential pass.

use rand::rngs::StdRng;
use rayon::prelude::*;

use super::dropout::Dropout;
use super::linear::Linear;
use crate::tensor::Tensor;

/// Build the causal mask for a sequence of the given length.
///
/// Non-zero entries mark the future positions `(i, j)` with `j > i` that
/// attention must not see; `masked_fill` replaces their scores with `-inf`.
fn causal_mask(seq_len: usize) -> Tensor {
    let mut mask = vec![0.0; seq_len * seq_len];
    for i in 0..seq_len {
        for j in i + 1..seq_len {
            mask[i * seq_len + j] = 1.0;
        }
    }
    Tensor::new(mask, vec![seq_len, seq_len])
}

/// One head of causal self-attention.
///
/// Projects the input into a `head_size`-dimensional subspace and computes
/// causally-masked, softmax-weighted aggregation of values there.
#[derive(Debug)]
pub struct AttentionHead {
    pub wq: Linear,
    pub wk: Linear,
    pub wv: Linear,
    pub dropout: Dropout,
    pub head_size: usize,
}

impl AttentionHead {
    /// Create a head projecting from `d_model` into `head_size` dimensions.
    ///
    /// The query/key/value projections carry no bias.
    pub fn new(d_model: usize, head_size: usize, dropout_rate: f32, rng: &mut StdRng) -> Self {
        Self {
            wq: Linear::new_no_bias(d_model, head_size, rng),
            wk: Linear::new_no_bias(d_model, head_size, rng),
            wv: Linear::new_no_bias(d_model, head_size, rng),
            dropout: Dropout::new(dropout_rate),
            head_size,
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
    /// Output tensor [seq_len, head_size]
    pub fn forward(&self, x: &Tensor) -> Tensor {
        self.forward_with_weights(x).0
    }

    /// Forward pass that also returns the normalized attention weights.
    ///
    /// The weights are the [seq_len, seq_len] matrix after masking and
    /// softmax but before dropout: row `i` sums to 1 and is zero for every
    /// column `j > i`.
    pub fn forward_with_weights(&self, x: &Tensor) -> (Tensor, Tensor) {
        let seq_len = x.shape[0];

        // Project to Q, K, V
        let q = self.wq.forward(x);
        let k = self.wk.forward(x);
        let v = self.wv.forward(x);

        // Scaled dot-product scores
        let scale = 1.0 / (self.head_size as f32).sqrt();
        let scores = q.matmul(&k.transpose(-2, -1)).mul_scalar(scale);

        // Causal mask, then row-wise softmax
        let masked_scores = scores.masked_fill(&causal_mask(seq_len), f32::NEG_INFINITY);
        let attn_weights = masked_scores.softmax(-1);

        // Dropout on the weights (identity at inference)
        let attn_dropped = self.dropout.forward(&attn_weights);

        // Weighted aggregation of values
        let out = attn_dropped.matmul(&v);

        (out, attn_weights)
    }
}

/// Multi-head causal self-attention.
///
/// Runs `n_head` independent [`AttentionHead`]s on the same input,
/// concatenates their outputs along the feature axis and applies one
/// output projection.
#[derive(Debug)]
pub struct MultiHeadAttention {
    pub heads: Vec<AttentionHead>,
    pub out_proj: Linear,
    pub dropout: Dropout,
    pub d_model: usize,
}

impl MultiHeadAttention {
    /// Create a multi-head attention layer.
    ///
    /// # Arguments
    ///
    /// * `d_model` - Embedding dimension
    /// * `n_head` - Number of heads; must divide `d_model` exactly
    /// * `dropout_rate` - Dropout probability
    /// * `rng` - Seeded RNG for weight initialization
    pub fn new(d_model: usize, n_head: usize, dropout_rate: f32, rng: &mut StdRng) -> Self {
        assert_eq!(d_model % n_head, 0, "d_model must be divisible by n_head");
        let head_size = d_model / n_head;

        let heads = (0..n_head)
            .map(|_| AttentionHead::new(d_model, head_size, dropout_rate, rng))
            .collect();
        let out_proj = Linear::new(d_model, d_model, rng);

        Self {
            heads,
            out_proj,
            dropout: Dropout::new(dropout_rate),
            d_model,
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
        let seq_len = x.shape[0];
        let head_size = self.d_model / self.heads.len();

        // Heads are independent: shared read-only input, disjoint outputs
        let head_outs: Vec<Tensor> = self.heads.par_iter().map(|head| head.forward(x)).collect();

        // Concatenate head outputs along the feature axis
        let mut concat = vec![0.0; seq_len * self.d_model];
        for (h, out) in head_outs.iter().enumerate() {
            for i in 0..seq_len {
                let src = i * head_size;
                let dst = i * self.d_model + h * head_size;
                concat[dst..dst + head_size].copy_from_slice(&out.data[src..src + head_size]);
            }
        }

        let y = self
            .out_proj
            .forward(&Tensor::new(concat, vec![seq_len, self.d_model]));
        self.dropout.forward(&y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_input(seq_len: usize, d_model: usize) -> Tensor {
        let data: Vec<f32> = (0..seq_len * d_model)
            .map(|i| ((i * 7 % 13) as f32) / 13.0 - 0.5)
            .collect();
        Tensor::new(data, vec![seq_len, d_model])
    }

    #[test]
    fn test_weights_strictly_lower_triangular() {
        let mut rng = StdRng::seed_from_u64(1);
        let head = AttentionHead::new(8, 4, 0.0, &mut rng);
        let x = test_input(4, 8);

        let (_, weights) = head.forward_with_weights(&x);

        assert_eq!(weights.shape, vec![4, 4]);
        for i in 0..4 {
            for j in 0..4 {
                let w = weights.data[i * 4 + j];
                if j > i {
                    assert_eq!(w, 0.0, "future position ({}, {}) has weight {}", i, j, w);
                } else {
                    assert!(w > 0.0, "allowed position ({}, {}) has weight {}", i, j, w);
                }
            }
        }
        // Row 0 attends to one position, row 3 to all four
        assert!((weights.data[0] - 1.0).abs() < 1e-6);
        let row3_nonzero = weights.data[12..16].iter().filter(|&&w| w > 0.0).count();
        assert_eq!(row3_nonzero, 4);
    }

    #[test]
    fn test_weight_rows_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(2);
        let head = AttentionHead::new(8, 4, 0.0, &mut rng);
        for seq_len in [1, 2, 5, 8] {
            let x = test_input(seq_len, 8);
            let (_, weights) = head.forward_with_weights(&x);

            for i in 0..seq_len {
                let sum: f32 = weights.data[i * seq_len..(i + 1) * seq_len].iter().sum();
                assert!(
                    (sum - 1.0).abs() < 1e-6,
                    "row {} sums to {} for seq_len {}",
                    i,
                    sum,
                    seq_len
                );
            }
        }
    }

    #[test]
    fn test_single_token_output_equals_value_row() {
        let mut rng = StdRng::seed_from_u64(3);
        let head = AttentionHead::new(8, 4, 0.0, &mut rng);
        let x = test_input(1, 8);

        let (out, weights) = head.forward_with_weights(&x);
        let v = head.wv.forward(&x);

        assert_eq!(weights.data, vec![1.0]);
        assert_eq!(out.data, v.data);
    }

    #[test]
    fn test_head_output_shape() {
        let mut rng = StdRng::seed_from_u64(4);
        let head = AttentionHead::new(8, 4, 0.0, &mut rng);
        for seq_len in [1, 3, 6] {
            let out = head.forward(&test_input(seq_len, 8));
            assert_eq!(out.shape, vec![seq_len, 4]);
        }
    }

    #[test]
    fn test_multi_head_output_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let mha = MultiHeadAttention::new(8, 2, 0.0, &mut rng);
        for seq_len in [1, 3, 6] {
            let out = mha.forward(&test_input(seq_len, 8));
            assert_eq!(out.shape, vec![seq_len, 8]);
        }
    }

    #[test]
    fn test_forward_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(6);
        let mha = MultiHeadAttention::new(8, 4, 0.0, &mut rng);
        let x = test_input(5, 8);

        let a = mha.forward(&x);
        let b = mha.forward(&x);
        assert_eq!(a.data, b.data);
    }
}
