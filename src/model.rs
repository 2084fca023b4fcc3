//! Decoder Model
//!
//! The full forward pipeline from token ids to vocabulary logits:
//!
//! ```text
//! Token ids [batch, seq_len]
//!     ↓
//! Token Embedding + Position Embedding    [seq_len, d_model] per sequence
//!     ↓
//! Block 1 (attention + feed-forward)
//!     ↓
//!     ...
//!     ↓
//! Block n_layer
//!     ↓
//! LayerNorm
//!     ↓
//! Linear → logits [batch, seq_len, vocab_size]
//! ```
//!
//! ## Forward Only
//!
//! Weights are created once (seeded initialization or a checkpoint) and are
//! read-only during execution. Every forward call allocates its hidden
//! state fresh and discards it; nothing is cached between calls.
//!
//! ## Loss
//!
//! When target ids are supplied, the logits are scored with cross-entropy,
//! flattened so each time-step counts independently: the mean negative
//! log-likelihood of each target under a numerically stable log-softmax of
//! the corresponding logit row.
//!
//! ## Input Validation
//!
//! The public entry points check their inputs and return [`ModelError`]
//! values for caller misuse: ids at or above `vocab_size`, sequences longer
//! than the context window, empty or ragged batches. Past validation, the
//! tensor math itself treats shape mismatches as programming errors and
//! panics.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::config::Config;
use crate::error::{ModelError, Result};
use crate::layers::{Block, LayerNorm, Linear};
use crate::tensor::Tensor;

/// Learnable lookup table from an integer index to a `d_model` vector.
///
/// Used twice: over token ids (`vocab_size` rows) and over positions
/// (`seq_len` rows). Rows are drawn from N(0, 0.02) at construction.
#[derive(Debug)]
pub struct Embedding {
    /// Embedding table: [num_embeddings, d_model]
    pub weight: Tensor,
}

impl Embedding {
    /// Create an embedding table with seeded random initialization.
    ///
    /// # Arguments
    ///
    /// * `num_embeddings` - Number of rows (vocabulary size or context length)
    /// * `d_model` - Embedding dimension
    /// * `rng` - Seeded RNG the rows are drawn from
    pub fn new(num_embeddings: usize, d_model: usize, rng: &mut StdRng) -> Self {
        let normal = Normal::new(0.0, 0.02).unwrap();
        let weight_data: Vec<f32> = (0..num_embeddings * d_model)
            .map(|_| normal.sample(rng))
            .collect();

        Self {
            weight: Tensor::new(weight_data, vec![num_embeddings, d_model]),
        }
    }

    /// Look up the rows for a sequence of indices.
    ///
    /// # Arguments
    ///
    /// * `ids` - Indices into the table, each `< num_embeddings`
    ///
    /// # Returns
    ///
    /// Tensor of shape [ids.len(), d_model]
    pub fn forward(&self, ids: &[usize]) -> Tensor {
        let d_model = self.weight.shape[1];
        let mut output = Vec::with_capacity(ids.len() * d_model);

        for &id in ids {
            assert!(
                id < self.weight.shape[0],
                "Embedding index {} out of range for table of {} rows",
                id,
                self.weight.shape[0]
            );
            let start = id * d_model;
            output.extend_from_slice(&self.weight.data[start..start + d_model]);
        }

        Tensor::new(output, vec![ids.len(), d_model])
    }

    /// Number of learnable parameters.
    pub fn num_parameters(&self) -> usize {
        self.weight.data.len()
    }
}

/// Decoder-only transformer: embeddings, a block stack, and the projection
/// to vocabulary logits.
#[derive(Debug)]
pub struct Decoder {
    pub config: Config,
    pub token_embedding: Embedding,
    pub position_embedding: Embedding,
    pub blocks: Vec<Block>,
    pub ln_f: LayerNorm,
    pub lm_head: Linear,
}

impl Decoder {
    /// Create a model with seeded random initialization.
    ///
    /// Two models built from the same configuration and seed are identical
    /// tensor for tensor.
    ///
    /// # Arguments
    ///
    /// * `config` - Architecture hyperparameters (validated here)
    /// * `seed` - Seed for the weight-initialization RNG
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if the configuration fails
    /// [`Config::validate`].
    pub fn new(config: &Config, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let token_embedding = Embedding::new(config.vocab_size, config.d_model, &mut rng);
        let position_embedding = Embedding::new(config.seq_len, config.d_model, &mut rng);
        let blocks = (0..config.n_layer)
            .map(|_| Block::new(config.d_model, config.n_head, config.dropout, &mut rng))
            .collect();
        let ln_f = LayerNorm::new(config.d_model);
        let lm_head = Linear::new(config.d_model, config.vocab_size, &mut rng);

        Ok(Self {
            config: config.clone(),
            token_embedding,
            position_embedding,
            blocks,
            ln_f,
            lm_head,
        })
    }

    /// Forward pass: token ids to logits, with an optional loss.
    ///
    /// Sequences in the batch are independent and are processed in
    /// parallel; each is embedded, run through the block stack, normalized
    /// and projected on its own.
    ///
    /// # Arguments
    ///
    /// * `token_ids` - Batch of sequences, all the same length `T <= seq_len`
    /// * `targets` - Optional batch shaped like `token_ids`; when present,
    ///   the mean cross-entropy of every position against its target is
    ///   returned alongside the logits
    ///
    /// # Returns
    ///
    /// `(logits, loss)` where logits has shape [batch, T, vocab_size] and
    /// loss is `Some` exactly when targets were given.
    ///
    /// # Errors
    ///
    /// [`ModelError::EmptySequence`] for an empty batch or sequence,
    /// [`ModelError::ContextOverflow`] if `T > seq_len`,
    /// [`ModelError::TokenOutOfRange`] for an id `>= vocab_size`, and
    /// [`ModelError::RaggedBatch`] when lengths disagree within the batch
    /// or between inputs and targets.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mynah::{Config, Decoder};
    ///
    /// let model = Decoder::new(&Config::tiny(64), 42).unwrap();
    /// let (logits, loss) = model.forward(&[vec![1, 2, 3, 4]], None).unwrap();
    /// assert_eq!(logits.shape, vec![1, 4, 64]);
    /// assert!(loss.is_none());
    /// ```
    pub fn forward(
        &self,
        token_ids: &[Vec<usize>],
        targets: Option<&[Vec<usize>]>,
    ) -> Result<(Tensor, Option<f32>)> {
        let seq_len = self.validate_batch(token_ids)?;
        if let Some(target_ids) = targets {
            if target_ids.len() != token_ids.len() {
                return Err(ModelError::RaggedBatch {
                    expected: token_ids.len(),
                    got: target_ids.len(),
                });
            }
            let target_len = self.validate_batch(target_ids)?;
            if target_len != seq_len {
                return Err(ModelError::RaggedBatch {
                    expected: seq_len,
                    got: target_len,
                });
            }
        }

        let batch_size = token_ids.len();
        let vocab_size = self.config.vocab_size;

        // Sequences are independent, so the batch dimension parallelizes
        // without changing any per-sequence arithmetic.
        let per_sequence: Vec<Tensor> = token_ids
            .par_iter()
            .map(|seq| self.forward_sequence(seq))
            .collect();

        let mut logits_data = Vec::with_capacity(batch_size * seq_len * vocab_size);
        for logits in &per_sequence {
            logits_data.extend_from_slice(&logits.data);
        }
        let logits = Tensor::new(logits_data, vec![batch_size, seq_len, vocab_size]);

        let loss = targets.map(|target_ids| {
            let mut total = 0.0;
            for (b, target_seq) in target_ids.iter().enumerate() {
                for (t, &target) in target_seq.iter().enumerate() {
                    let start = (b * seq_len + t) * vocab_size;
                    total += nll(&logits.data[start..start + vocab_size], target);
                }
            }
            total / (batch_size * seq_len) as f32
        });

        Ok((logits, loss))
    }

    /// Run one validated sequence through the pipeline.
    ///
    /// Returns [T, vocab_size] logits.
    fn forward_sequence(&self, ids: &[usize]) -> Tensor {
        let positions: Vec<usize> = (0..ids.len()).collect();

        let tok_emb = self.token_embedding.forward(ids);
        let pos_emb = self.position_embedding.forward(&positions);
        let mut x = tok_emb.add(&pos_emb);

        for block in &self.blocks {
            x = block.forward(&x);
        }

        let x = self.ln_f.forward(&x);
        self.lm_head.forward(&x)
    }

    /// Check a batch for the errors the forward contract names.
    ///
    /// Returns the common sequence length.
    fn validate_batch(&self, batch: &[Vec<usize>]) -> Result<usize> {
        let first = batch.first().ok_or(ModelError::EmptySequence)?;
        let seq_len = first.len();
        if seq_len == 0 {
            return Err(ModelError::EmptySequence);
        }
        if seq_len > self.config.seq_len {
            return Err(ModelError::ContextOverflow {
                len: seq_len,
                seq_len: self.config.seq_len,
            });
        }

        for seq in batch {
            if seq.len() != seq_len {
                return Err(ModelError::RaggedBatch {
                    expected: seq_len,
                    got: seq.len(),
                });
            }
            for &id in seq {
                if id >= self.config.vocab_size {
                    return Err(ModelError::TokenOutOfRange {
                        id,
                        vocab_size: self.config.vocab_size,
                    });
                }
            }
        }

        Ok(seq_len)
    }

    /// Count the learnable parameters across the whole model.
    pub fn count_parameters(&self) -> usize {
        let blocks: usize = self.blocks.iter().map(|b| b.num_parameters()).sum();

        self.token_embedding.num_parameters()
            + self.position_embedding.num_parameters()
            + blocks
            + self.ln_f.gamma.data.len()
            + self.ln_f.beta.data.len()
            + self.lm_head.num_parameters()
    }
}

/// Negative log-likelihood of `target` under a stable log-softmax of one
/// logit row.
///
/// Subtracting the row maximum before exponentiating keeps the sum finite
/// for arbitrarily large logits.
fn nll(logits: &[f32], target: usize) -> f32 {
    let max = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    -((logits[target] - max) - exp_sum.ln())
}
