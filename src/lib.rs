//! Mynah: Causal Attention and Autoregressive Decoding
//!
//! A decoder-only transformer forward core implemented from scratch in
//! Rust: token and positional embeddings, pre-norm residual blocks with
//! causal multi-head attention, and a sampling loop that extends a token
//! sequence one prediction at a time. Named after the mynah, the bird
//! that repeats what it hears.
//!
//! Everything is forward-only. Models are randomly initialized from a
//! seed or restored from a checkpoint; there is no gradient machinery.
//!
//! # Modules
//!
//! - [`tensor`] - Row-major f32 tensors with parallel matrix multiply
//! - [`config`] - Model hyperparameters, presets and validation
//! - [`layers`] - Linear, layer norm, attention, feed-forward, block
//! - [`model`] - Embeddings and the decoder stack forward pass
//! - [`generate`] - The decoding loop and pluggable samplers
//! - [`checkpoint`] - Binary save/load of weights and config
//! - [`eval`] - Average loss and perplexity over a token stream
//! - [`error`] - Crate-wide error type
//!
//! # Example
//!
//! ```rust
//! use mynah::{CategoricalSampler, Config, Decoder};
//!
//! // Small model, deterministically initialized from a seed
//! let model = Decoder::new(&Config::tiny(64), 42).unwrap();
//!
//! // Extend a seed sequence by eight sampled token ids
//! let mut sampler = CategoricalSampler::new(7);
//! let out = model.generate(&[1, 2, 3], 8, 1.0, &mut sampler).unwrap();
//!
//! assert_eq!(out.len(), 11);
//! assert_eq!(out[..3], [1, 2, 3]);
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod eval;
pub mod generate;
pub mod layers;
pub mod model;
pub mod tensor;

// Re-export main types for convenience
pub use config::Config;
pub use error::{ModelError, Result};
pub use eval::{average_loss, perplexity};
pub use generate::{CategoricalSampler, GreedySampler, Sampler};
pub use model::{Decoder, Embedding};
pub use tensor::Tensor;
