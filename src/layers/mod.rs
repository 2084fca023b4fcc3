//! Model Layers
//!
//! The building blocks the decoder stack is assembled from. Every layer is
//! forward-only: weights are read-only during execution and each `forward`
//! is a pure function of its input and parameters.
//!
//! ## Layers
//!
//! - **linear**: Fully connected projection, with or without bias
//! - **layer_norm**: Layer normalization
//! - **dropout**: Dropout regularization (identity at inference)
//! - **activation**: ReLU activation
//! - **attention**: Causal self-attention, single head and multi-head
//! - **mlp**: Position-wise feed-forward network
//! - **block**: Complete transformer block (pre-norm, residual)

pub mod activation;
pub mod attention;
pub mod block;
pub mod dropout;
pub mod layer_norm;
pub mod linear;
pub mod mlp;

// Re-export main types for convenience
pub use activation::relu;
pub use attention::{AttentionHead, MultiHeadAttention};
pub use block::Block;
pub use dropout::Dropout;
pub use layer_norm::LayerNorm;
pub use linear::Linear;
pub use mlp::FeedForward;
