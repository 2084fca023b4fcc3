//! Model Configuration
//!
//! Defines the architecture hyperparameters for a decoder-only attention
//! model. The configuration is an explicit, immutable value passed at
//! construction time; nothing in the crate reads global state.
//!
//! # Fields
//!
//! - `vocab_size`: Number of tokens in the vocabulary
//! - `d_model`: Embedding dimension (width of the model)
//! - `n_head`: Number of attention heads per layer
//! - `n_layer`: Number of transformer blocks
//! - `seq_len`: Maximum sequence length (context window)
//! - `dropout`: Dropout probability applied inside the blocks
//!
//! # The Divisibility Invariant
//!
//! Each attention head projects into `head_size = d_model / n_head`
//! dimensions, and the head outputs are concatenated back to `d_model`.
//! That only works when `n_head` divides `d_model` exactly, so
//! [`Config::validate`] rejects any configuration where it doesn't.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Architecture hyperparameters for a decoder model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub d_model: usize,
    pub n_head: usize,
    pub n_layer: usize,
    pub seq_len: usize,
    pub dropout: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vocab_size: 512,
            d_model: 128,
            n_head: 4,
            n_layer: 4,
            seq_len: 256,
            dropout: 0.1,
        }
    }
}

impl Config {
    /// Create a tiny config for quick experiments and tests.
    ///
    /// # Arguments
    ///
    /// * `vocab_size` - Size of vocabulary (e.g., from tokenizer)
    pub fn tiny(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            d_model: 32,
            n_head: 2,
            n_layer: 2,
            seq_len: 32,
            dropout: 0.0,
        }
    }

    /// Create a small config, a reasonable balance of speed and capacity.
    ///
    /// # Arguments
    ///
    /// * `vocab_size` - Size of vocabulary
    pub fn small(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            d_model: 128,
            n_head: 4,
            n_layer: 3,
            seq_len: 128,
            dropout: 0.1,
        }
    }

    /// Create a medium config with substantial capacity.
    ///
    /// # Arguments
    ///
    /// * `vocab_size` - Size of vocabulary
    pub fn medium(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            d_model: 256,
            n_head: 8,
            n_layer: 6,
            seq_len: 256,
            dropout: 0.1,
        }
    }

    /// Per-head projection dimension: `d_model / n_head`.
    ///
    /// Only meaningful for a configuration that passes [`Config::validate`].
    pub fn head_size(&self) -> usize {
        self.d_model / self.n_head
    }

    /// Check the configuration for structural validity.
    ///
    /// Called by the model constructor; a failed validation is fatal and
    /// never retried.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if any dimension is zero, if
    /// `d_model` is not divisible by `n_head`, or if `dropout` lies outside
    /// `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(ModelError::InvalidConfig {
                reason: "vocab_size must be at least 1".to_string(),
            });
        }
        if self.d_model == 0 || self.n_head == 0 || self.n_layer == 0 || self.seq_len == 0 {
            return Err(ModelError::InvalidConfig {
                reason: "d_model, n_head, n_layer and seq_len must all be at least 1".to_string(),
            });
        }
        if self.d_model % self.n_head != 0 {
            return Err(ModelError::InvalidConfig {
                reason: format!(
                    "d_model ({}) must be divisible by n_head ({})",
                    self.d_model, self.n_head
                ),
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig {
                reason: format!("dropout ({}) must lie in [0, 1)", self.dropout),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_passes() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::tiny(64).validate().is_ok());
        assert!(Config::small(256).validate().is_ok());
        assert!(Config::medium(1024).validate().is_ok());
    }

    #[test]
    fn test_head_size() {
        let config = Config::medium(100);
        assert_eq!(config.head_size(), 256 / 8);
    }

    #[test]
    fn test_indivisible_heads_rejected() {
        let config = Config {
            d_model: 10,
            n_head: 3,
            ..Config::tiny(64)
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig { .. }));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = Config {
            vocab_size: 0,
            ..Config::tiny(64)
        };
        assert!(config.validate().is_err());

        let config = Config {
            n_layer: 0,
            ..Config::tiny(64)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dropout_range() {
        let config = Config {
            dropout: 1.0,
            ..Config::tiny(64)
        };
        assert!(config.validate().is_err());

        let config = Config {
            dropout: -0.1,
            ..Config::tiny(64)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = Config::small(777);
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
