//! Linear Layer (Fully Connected)
//!
//! The linear layer is the fundamental building block of the model.
//! It performs an affine transformation: y = x @ W + b
//!
//! ## Shapes
//!
//! ```text
//! Input:  x [seq_len, in_features]
//! Weight: W [in_features, out_features]
//! Bias:   b [out_features]          (optional)
//! Output: y [seq_len, out_features]
//! ```
//!
//! The query/key/value projections inside an attention head carry no bias
//! term, so the bias is an `Option` here and those layers are built with
//! [`Linear::new_no_bias`].
//!
//! ## Initialization
//!
//! Weights are drawn from N(0, 0.02) through a caller-supplied seeded RNG,
//! so two models built from the same seed are identical tensor for tensor.
//! Biases start at zero.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::tensor::Tensor;

/// Linear projection with an optional bias.
#[derive(Debug)]
pub struct Linear {
    /// Weight matrix: [in_features, out_features]
    pub weight: Tensor,
    /// Bias vector: [out_features], absent for bias-free projections
    pub bias: Option<Tensor>,
}

impl Linear {
    /// Create a linear layer with a zero-initialized bias.
    ///
    /// # Arguments
    ///
    /// * `in_features` - Input dimension
    /// * `out_features` - Output dimension
    /// * `rng` - Seeded RNG the weights are drawn from
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        Self {
            weight: init_weight(in_features, out_features, rng),
            bias: Some(Tensor::zeros(vec![out_features])),
        }
    }

    /// Create a linear layer without a bias term.
    pub fn new_no_bias(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        Self {
            weight: init_weight(in_features, out_features, rng),
            bias: None,
        }
    }

    /// Forward pass: y = x @ W (+ b).
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor [seq_len, in_features]
    ///
    /// # Returns
    ///
    /// Output tensor [seq_len, out_features]
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let y = x.matmul(&self.weight);
        match &self.bias {
            Some(bias) => y.add(bias),
            None => y,
        }
    }

    /// Number of learnable parameters in this layer.
    pub fn num_parameters(&self) -> usize {
        let bias_len = self.bias.as_ref().map_or(0, |b| b.data.len());
        self.weight.data.len() + bias_len
    }
}

/// Draw a [in_features, out_features] weight matrix from N(0, 0.02).
fn init_weight(in_features: usize, out_features: usize, rng: &mut StdRng) -> Tensor {
    let normal = Normal::new(0.0, 0.02).unwrap();
    let weight_data: Vec<f32> = (0..in_features * out_features)
        .map(|_| normal.sample(rng))
        .collect();
    Tensor::new(weight_data, vec![in_features, out_features])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_identity_weight_passes_input_through() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut linear = Linear::new(3, 3, &mut rng);
        linear.weight = Tensor::new(
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            vec![3, 3],
        );

        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let y = linear.forward(&x);

        assert_eq!(y.shape, vec![2, 3]);
        assert_eq!(y.data, x.data);
    }

    #[test]
    fn test_bias_added_per_row() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut linear = Linear::new(2, 2, &mut rng);
        linear.weight = Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
        linear.bias = Some(Tensor::new(vec![10.0, 20.0], vec![2]));

        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let y = linear.forward(&x);

        assert_eq!(y.data, vec![11.0, 22.0, 13.0, 24.0]);
    }

    #[test]
    fn test_no_bias_layer_has_no_bias() {
        let mut rng = StdRng::seed_from_u64(7);
        let linear = Linear::new_no_bias(4, 2, &mut rng);

        assert!(linear.bias.is_none());
        assert_eq!(linear.num_parameters(), 8);
    }

    #[test]
    fn test_same_seed_same_weights() {
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a = Linear::new(8, 8, &mut rng_a);
        let b = Linear::new(8, 8, &mut rng_b);

        assert_eq!(a.weight.data, b.weight.data);
    }
}
