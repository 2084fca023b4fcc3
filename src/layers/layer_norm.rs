//! Layer Normalization
//!
//! Normalizes each position's activation vector to zero mean and unit
//! variance, then applies a learnable scale (gamma) and shift (beta).
//! Applied before each sublayer in a block and once more after the last
//! block.
//!
//! ## Forward Pass
//!
//! ```text
//! 1. mean = sum(x) / N              per row
//! 2. var  = sum((x - mean)^2) / N   per row
//! 3. y    = gamma * (x - mean) / sqrt(var + eps) + beta
//! ```
//!
//! Unlike batch normalization, every row is normalized independently, so
//! the result does not depend on what else is in the batch and rows can be
//! processed in parallel.

use rayon::prelude::*;

use crate::tensor::Tensor;

/// Layer normalization over the feature dimension.
#[derive(Debug)]
pub struct LayerNorm {
    /// Scale parameter: [d_model]
    pub gamma: Tensor,
    /// Shift parameter: [d_model]
    pub beta: Tensor,
    /// Small constant preventing division by zero
    pub eps: f32,
}

impl LayerNorm {
    /// Create a new layer normalization layer.
    ///
    /// gamma starts at 1 and beta at 0, so a fresh layer is close to the
    /// identity (up to the normalization itself).
    ///
    /// # Arguments
    ///
    /// * `d_model` - Feature dimension to normalize over
    pub fn new(d_model: usize) -> Self {
        Self {
            gamma: Tensor::new(vec![1.0; d_model], vec![d_model]),
            beta: Tensor::new(vec![0.0; d_model], vec![d_model]),
            eps: 1e-5,
        }
    }

    /// Forward pass: normalize each row of a [seq_len, d_model] tensor.
    pub fn forward(&self, x: &Tensor) -> Tensor {
        assert_eq!(
            x.shape.len(),
            2,
            "LayerNorm expects a 2D input, got {:?}",
            x.shape
        );
        let rows = x.shape[0];
        let cols = x.shape[1];
        assert_eq!(
            cols,
            self.gamma.data.len(),
            "LayerNorm width mismatch: input {:?}, gamma len {}",
            x.shape,
            self.gamma.data.len()
        );

        let gamma = &self.gamma.data;
        let beta = &self.beta.data;
        let eps = self.eps;

        let result: Vec<f32> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|i| {
                let row = &x.data[i * cols..(i + 1) * cols];

                let mean: f32 = row.iter().sum::<f32>() / cols as f32;
                let variance: f32 = row
                    .iter()
                    .map(|&v| {
                        let diff = v - mean;
                        diff * diff
                    })
                    .sum::<f32>()
                    / cols as f32;
                let inv_std = 1.0 / (variance + eps).sqrt();

                let normed: Vec<f32> = row
                    .iter()
                    .enumerate()
                    .map(|(j, &v)| (v - mean) * inv_std * gamma[j] + beta[j])
                    .collect();
                normed.into_iter()
            })
            .collect();

        Tensor::new(result, x.shape.clone())
    }
}
