//! Evaluation Helpers
//!
//! Forward-only scoring of a token stream: slide the model's context window
//! across the stream, collect the cross-entropy of each window against its
//! one-step-shifted targets, and average. No gradients are involved, so this
//! is cheap enough to run on every checkpoint.

use crate::error::{ModelError, Result};
use crate::model::Decoder;

/// Average next-token cross-entropy of `model` over a token stream.
///
/// Windows of `seq_len` input tokens are taken at offsets `0, stride,
/// 2*stride, ...` for as long as a full window plus its shifted target fits.
/// A stride equal to `seq_len` scores each token once; smaller strides
/// overlap windows for a smoother estimate.
///
/// # Arguments
///
/// * `model` - The model to score
/// * `tokens` - Token stream, at least `seq_len + 1` ids long
/// * `stride` - Offset between window starts; must be nonzero
///
/// # Returns
///
/// Mean loss across all windows (nats per token).
///
/// # Errors
///
/// [`ModelError::InvalidConfig`] for a zero stride and
/// [`ModelError::SequenceTooShort`] when no full window fits. Token ids are
/// validated by the forward pass itself.
pub fn average_loss(model: &Decoder, tokens: &[usize], stride: usize) -> Result<f32> {
    if stride == 0 {
        return Err(ModelError::InvalidConfig {
            reason: "stride must be nonzero".to_string(),
        });
    }

    let seq_len = model.config.seq_len;
    if tokens.len() < seq_len + 1 {
        return Err(ModelError::SequenceTooShort {
            len: tokens.len(),
            min: seq_len + 1,
        });
    }

    let mut total_loss = 0.0;
    let mut windows = 0;

    let mut start = 0;
    while start + seq_len + 1 <= tokens.len() {
        // Target is the input shifted one position (next-token prediction)
        let input = vec![tokens[start..start + seq_len].to_vec()];
        let target = vec![tokens[start + 1..start + seq_len + 1].to_vec()];

        let (_, loss) = model.forward(&input, Some(&target))?;
        if let Some(loss) = loss {
            total_loss += loss;
            windows += 1;
        }

        start += stride;
    }

    Ok(total_loss / windows as f32)
}

/// Perplexity corresponding to a mean cross-entropy in nats.
pub fn perplexity(loss: f32) -> f32 {
    loss.exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tensor::Tensor;

    #[test]
    fn test_single_window_matches_forward_loss() {
        let config = Config::tiny(11);
        let model = Decoder::new(&config, 40).unwrap();

        // Exactly one window fits, so the average is that window's loss
        let tokens: Vec<usize> = (0..config.seq_len + 1).map(|i| i % 11).collect();
        let avg = average_loss(&model, &tokens, 7).unwrap();

        let input = vec![tokens[..config.seq_len].to_vec()];
        let target = vec![tokens[1..].to_vec()];
        let (_, loss) = model.forward(&input, Some(&target)).unwrap();

        assert_eq!(avg, loss.unwrap());
    }

    #[test]
    fn test_uniform_logits_score_ln_vocab() {
        let config = Config::tiny(7);
        let mut model = Decoder::new(&config, 41).unwrap();
        model.lm_head.weight = Tensor::zeros(vec![config.d_model, 7]);
        model.lm_head.bias = Some(Tensor::zeros(vec![7]));

        let tokens: Vec<usize> = (0..config.seq_len * 3).map(|i| i % 7).collect();
        let avg = average_loss(&model, &tokens, config.seq_len).unwrap();

        assert!((avg - (7.0f32).ln()).abs() < 1e-4);
    }

    #[test]
    fn test_overlapping_windows_average_finite() {
        let config = Config::tiny(11);
        let model = Decoder::new(&config, 42).unwrap();

        let tokens: Vec<usize> = (0..config.seq_len * 2).map(|i| (i * 3) % 11).collect();
        let avg = average_loss(&model, &tokens, 5).unwrap();

        assert!(avg.is_finite());
        assert!(avg > 0.0);
    }

    #[test]
    fn test_zero_stride_rejected() {
        let config = Config::tiny(11);
        let model = Decoder::new(&config, 43).unwrap();
        let tokens: Vec<usize> = (0..config.seq_len + 1).map(|i| i % 11).collect();

        assert!(average_loss(&model, &tokens, 0).is_err());
    }

    #[test]
    fn test_short_stream_rejected() {
        let config = Config::tiny(11);
        let model = Decoder::new(&config, 44).unwrap();

        // seq_len tokens is one short of the minimum
        let tokens: Vec<usize> = (0..config.seq_len).map(|i| i % 11).collect();
        let err = average_loss(&model, &tokens, 1).unwrap_err();

        assert_eq!(
            err,
            ModelError::SequenceTooShort {
                len: config.seq_len,
                min: config.seq_len + 1
            }
        );
    }

    #[test]
    fn test_perplexity_is_exp_of_loss() {
        assert_eq!(perplexity(0.0), 1.0);
        assert!((perplexity((7.0f32).ln()) - 7.0).abs() < 1e-4);
    }
}
