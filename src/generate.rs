//! Autoregressive Generation
//!
//! The decoding loop that turns the forward pass into a text generator:
//! repeatedly predict a distribution over the next token, sample one id,
//! append it, and go again.
//!
//! ## The Loop
//!
//! ```text
//! for each of max_new_tokens steps:
//!   1. Truncate the sequence to its last seq_len ids (the context window)
//!   2. Forward the window; keep only the final time-step's logits
//!   3. Scale by 1/temperature, softmax to probabilities
//!   4. Sample one id through the injected Sampler
//!   5. Append it to the sequence
//! ```
//!
//! Tokens that fall out of the window are structurally invisible to every
//! later prediction; the model genuinely cannot see them. The loop runs
//! exactly `max_new_tokens` times with no early stopping, so an
//! end-of-sequence id, if one is sampled, is appended like any other token.
//!
//! ## Pluggable Sampling
//!
//! The choice of next id is the only stochastic step in the whole crate,
//! so it is injected as a [`Sampler`] rather than drawn from a global RNG.
//! [`CategoricalSampler`] owns a seeded generator and gives reproducible
//! runs; [`GreedySampler`] takes the argmax and has no randomness at all;
//! tests can supply anything that implements the trait.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{ModelError, Result};
use crate::model::Decoder;

/// Strategy for picking the next token id from a probability distribution.
pub trait Sampler {
    /// Pick an index from `probs`, a vector of probabilities summing to 1.
    fn sample(&mut self, probs: &[f32]) -> usize;
}

/// Samples from the categorical distribution the probabilities describe.
///
/// Owns a seeded RNG, so a generation run is a pure function of the model
/// weights, the seed sequence, the temperature and this sampler's seed.
pub struct CategoricalSampler {
    rng: StdRng,
}

impl CategoricalSampler {
    /// Create a sampler seeded for reproducible draws.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for CategoricalSampler {
    fn sample(&mut self, probs: &[f32]) -> usize {
        let draw: f32 = self.rng.random();

        // Walk the cumulative distribution until it passes the draw
        let mut cumsum = 0.0;
        for (i, &p) in probs.iter().enumerate() {
            cumsum += p;
            if draw < cumsum {
                return i;
            }
        }
        probs.len() - 1
    }
}

/// Always picks the most probable id (ties go to the lowest index).
pub struct GreedySampler;

impl Sampler for GreedySampler {
    fn sample(&mut self, probs: &[f32]) -> usize {
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }
        best
    }
}

impl Decoder {
    /// Extend a seed sequence by `max_new_tokens` sampled ids.
    ///
    /// Each step forwards only the trailing `seq_len` ids of the sequence,
    /// so the context window is enforced here and the forward pass never
    /// sees an over-long input, no matter how far generation runs.
    ///
    /// # Arguments
    ///
    /// * `seed_ids` - Starting sequence, at least one id, all `< vocab_size`
    /// * `max_new_tokens` - Exact number of ids to append
    /// * `temperature` - Divisor on the logits before the sampling softmax;
    ///   `1.0` is neutral, lower sharpens the distribution, higher flattens
    ///   it. Must be positive.
    /// * `sampler` - Strategy that picks an id from each step's distribution
    ///
    /// # Returns
    ///
    /// The full sequence: the seed followed by exactly `max_new_tokens`
    /// new ids.
    ///
    /// # Errors
    ///
    /// [`ModelError::EmptySequence`] for an empty seed,
    /// [`ModelError::TokenOutOfRange`] for a seed id `>= vocab_size`, and
    /// [`ModelError::InvalidConfig`] for a non-positive temperature.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mynah::{CategoricalSampler, Config, Decoder};
    ///
    /// let model = Decoder::new(&Config::tiny(64), 42).unwrap();
    /// let mut sampler = CategoricalSampler::new(7);
    ///
    /// let out = model.generate(&[1, 2, 3], 5, 1.0, &mut sampler).unwrap();
    /// assert_eq!(out.len(), 8);
    /// ```
    pub fn generate(
        &self,
        seed_ids: &[usize],
        max_new_tokens: usize,
        temperature: f32,
        sampler: &mut dyn Sampler,
    ) -> Result<Vec<usize>> {
        if seed_ids.is_empty() {
            return Err(ModelError::EmptySequence);
        }
        for &id in seed_ids {
            if id >= self.config.vocab_size {
                return Err(ModelError::TokenOutOfRange {
                    id,
                    vocab_size: self.config.vocab_size,
                });
            }
        }
        if temperature <= 0.0 {
            return Err(ModelError::InvalidConfig {
                reason: format!("temperature ({}) must be positive", temperature),
            });
        }

        let vocab_size = self.config.vocab_size;
        let mut tokens = seed_ids.to_vec();

        for _ in 0..max_new_tokens {
            // Only the trailing context window is visible to the model
            let window_start = tokens.len().saturating_sub(self.config.seq_len);
            let window = tokens[window_start..].to_vec();
            let window_len = window.len();

            let (logits, _) = self.forward(std::slice::from_ref(&window), None)?;

            // The last time-step's logits are the distribution over the
            // next token; earlier steps predict ids we already have.
            let last = &logits.data[(window_len - 1) * vocab_size..window_len * vocab_size];
            let probs = softmax_with_temperature(last, temperature);

            tokens.push(sampler.sample(&probs));
        }

        Ok(tokens)
    }
}

/// Stable softmax of one logit row after dividing by `temperature`.
fn softmax_with_temperature(logits: &[f32], temperature: f32) -> Vec<f32> {
    let scaled: Vec<f32> = logits.iter().map(|&x| x / temperature).collect();

    let max = scaled.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_values: Vec<f32> = scaled.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exp_values.iter().sum();

    exp_values.into_iter().map(|v| v / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn tiny_model(vocab_size: usize, seed: u64) -> Decoder {
        Decoder::new(&Config::tiny(vocab_size), seed).unwrap()
    }

    #[test]
    fn test_output_length_is_seed_plus_new() {
        let model = tiny_model(11, 30);
        for (seed_len, new_tokens) in [(1, 0), (1, 5), (4, 12)] {
            let seed: Vec<usize> = (0..seed_len).collect();
            let mut sampler = CategoricalSampler::new(1);

            let out = model.generate(&seed, new_tokens, 1.0, &mut sampler).unwrap();

            assert_eq!(out.len(), seed_len + new_tokens);
            assert_eq!(out[..seed_len], seed[..]);
        }
    }

    #[test]
    fn test_all_generated_ids_in_vocab() {
        let model = tiny_model(5, 31);
        let mut sampler = CategoricalSampler::new(2);

        let out = model.generate(&[2], 40, 1.0, &mut sampler).unwrap();

        assert!(out.iter().all(|&id| id < 5));
    }

    #[test]
    fn test_same_seeds_reproduce_the_run() {
        let model = tiny_model(11, 32);

        let mut sampler_a = CategoricalSampler::new(99);
        let mut sampler_b = CategoricalSampler::new(99);
        let a = model.generate(&[3, 1, 4], 16, 1.0, &mut sampler_a).unwrap();
        let b = model.generate(&[3, 1, 4], 16, 1.0, &mut sampler_b).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_scenario() {
        // vocab 5, d_model 4, two heads, window of 3, one block
        let config = Config {
            vocab_size: 5,
            d_model: 4,
            n_head: 2,
            n_layer: 1,
            seq_len: 3,
            dropout: 0.0,
        };
        let model = Decoder::new(&config, 33).unwrap();
        let mut sampler = CategoricalSampler::new(3);

        let out = model.generate(&[2], 2, 1.0, &mut sampler).unwrap();

        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|&id| id < 5));
    }

    #[test]
    fn test_seed_longer_than_context_window() {
        let config = Config {
            seq_len: 3,
            ..Config::tiny(11)
        };
        let model = Decoder::new(&config, 34).unwrap();
        let mut sampler = CategoricalSampler::new(4);

        // Longer than the window: generation truncates, forward never errors
        let seed = vec![0, 1, 2, 3, 4, 5, 6];
        let out = model.generate(&seed, 5, 1.0, &mut sampler).unwrap();

        assert_eq!(out.len(), 12);
    }

    #[test]
    fn test_prediction_depends_only_on_window() {
        let config = Config {
            seq_len: 4,
            ..Config::tiny(11)
        };
        let model = Decoder::new(&config, 35).unwrap();

        // Same trailing window, different earlier prefixes. The truncation
        // makes everything before the window invisible, so the greedy
        // continuations must agree.
        let seed_a = vec![0, 0, 1, 2, 3, 4];
        let seed_b = vec![9, 7, 1, 2, 3, 4];

        let out_a = model.generate(&seed_a, 3, 1.0, &mut GreedySampler).unwrap();
        let out_b = model.generate(&seed_b, 3, 1.0, &mut GreedySampler).unwrap();

        assert_eq!(out_a[seed_a.len()..], out_b[seed_b.len()..]);
    }

    #[test]
    fn test_empty_seed_rejected() {
        let model = tiny_model(11, 36);
        let mut sampler = CategoricalSampler::new(5);

        let err = model.generate(&[], 4, 1.0, &mut sampler).unwrap_err();
        assert_eq!(err, ModelError::EmptySequence);
    }

    #[test]
    fn test_out_of_range_seed_id_rejected() {
        let model = tiny_model(11, 37);
        let mut sampler = CategoricalSampler::new(6);

        let err = model.generate(&[0, 11], 4, 1.0, &mut sampler).unwrap_err();
        assert_eq!(
            err,
            ModelError::TokenOutOfRange {
                id: 11,
                vocab_size: 11
            }
        );
    }

    #[test]
    fn test_non_positive_temperature_rejected() {
        let model = tiny_model(11, 38);
        let mut sampler = CategoricalSampler::new(7);

        assert!(model.generate(&[1], 4, 0.0, &mut sampler).is_err());
        assert!(model.generate(&[1], 4, -1.0, &mut sampler).is_err());
    }

    #[test]
    fn test_greedy_sampler_takes_argmax() {
        let mut sampler = GreedySampler;
        assert_eq!(sampler.sample(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(sampler.sample(&[0.5, 0.25, 0.25]), 0);
        // Ties resolve to the lowest index
        assert_eq!(sampler.sample(&[0.5, 0.5]), 0);
    }

    #[test]
    fn test_categorical_sampler_honors_point_mass() {
        let mut sampler = CategoricalSampler::new(8);
        for _ in 0..20 {
            assert_eq!(sampler.sample(&[0.0, 0.0, 1.0, 0.0]), 2);
        }
    }

    #[test]
    fn test_categorical_sampler_reproducible() {
        let probs = [0.25, 0.25, 0.25, 0.25];
        let mut a = CategoricalSampler::new(123);
        let mut b = CategoricalSampler::new(123);

        let draws_a: Vec<usize> = (0..32).map(|_| a.sample(&probs)).collect();
        let draws_b: Vec<usize> = (0..32).map(|_| b.sample(&probs)).collect();

        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_softmax_with_temperature() {
        let probs = softmax_with_temperature(&[1.0, 2.0, 3.0], 1.0);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);

        // Lower temperature sharpens the distribution toward the argmax
        let sharp = softmax_with_temperature(&[1.0, 2.0, 3.0], 0.25);
        assert!(sharp[2] > probs[2]);

        // Extreme logits stay finite thanks to max subtraction
        let extreme = softmax_with_temperature(&[1e4, -1e4, 0.0], 1.0);
        assert!(extreme.iter().all(|p| p.is_finite()));
        let sum: f32 = extreme.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}
