//! Position-Wise Feed-Forward Network
//!
//! The second sublayer of every transformer block: a two-layer projection
//! applied identically and independently to each position.
//!
//! ## Architecture
//!
//! ```text
//! x → Linear (d_model → 4*d_model) → ReLU → Linear (4*d_model → d_model) → Dropout
//! ```
//!
//! ## No Cross-Position Mixing
//!
//! Every row of the input is transformed on its own; position `i`'s output
//! depends only on position `i`'s input. Mixing information across
//! positions is attention's job, and keeping the two concerns separate is
//! what makes the block's division of labor legible.
//!
//! ## Expansion Factor
//!
//! The hidden layer is 4x the embedding width, the standard transformer
//! ratio: wide enough to give the block its per-position capacity, small
//! enough that the residual stream stays the narrow path.

use rand::rngs::StdRng;

use super::activation::relu;
use super::dropout::Dropout;
use super::linear::Linear;
use crate::tensor::Tensor;

/// Two-layer feed-forward network with ReLU, applied per position.
#[derive(Debug)]
pub struct FeedForward {
    /// Expansion: [d_model, 4*d_model]
    pub fc1: Linear,
    /// Projection back: [4*d_model, d_model]
    pub fc2: Linear,
    pub dropout: Dropout,
}

impl FeedForward {
    /// Create a feed-forward network with 4x hidden expansion.
    ///
    /// # Arguments
    ///
    /// * `d_model` - Embedding dimension
    /// * `dropout_rate` - Dropout probability
    /// * `rng` - Seeded RNG for weight initialization
    pub fn new(d_model: usize, dropout_rate: f32, rng: &mut StdRng) -> Self {
        let hidden = 4 * d_model;
        Self {
            fc1: Linear::new(d_model, hidden, rng),
            fc2: Linear::new(hidden, d_model, rng),
            dropout: Dropout::new(dropout_rate),
        }
    }

    /// Forward pass: expand, rectify, project back.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor [seq_len, d_model]
    ///
    /// # Returns
    ///
    /// Output tensor [seq_len, d_model]
    pub fn forward(&self, x: &Tensor) -> Tensor {
        let h = relu(&self.fc1.forward(x));
        self.dropout.forward(&self.fc2.forward(&h))
    }

    /// Number of learnable parameters.
    pub fn num_parameters(&self) -> usize {
        self.fc1.num_parameters() + self.fc2.num_parameters()
    }
}
