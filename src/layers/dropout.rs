//! Dropout Layer
//!
//! Dropout randomly zeros out activations during training to prevent
//! overfitting. During inference it passes values through unchanged, which
//! is the mode this crate runs in; the stochastic path exists for an
//! external training driver that flips the `training` flag.

use crate::tensor::Tensor;

/// Dropout layer.
///
/// Kept values are scaled by `1 / (1 - rate)` so the expected activation
/// magnitude is unchanged (inverted dropout).
#[derive(Debug)]
pub struct Dropout {
    pub rate: f32,
    pub training: bool,
}

impl Dropout {
    /// Create a new dropout layer in inference mode.
    ///
    /// # Arguments
    ///
    /// * `rate` - Dropout probability (0.0 = no dropout, 1.0 = drop all)
    pub fn new(rate: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&rate),
            "Dropout rate must be between 0.0 and 1.0"
        );
        Self {
            rate,
            training: false,
        }
    }

    /// Forward pass.
    ///
    /// Identity unless `training` is set and `rate > 0`.
    pub fn forward(&self, x: &Tensor) -> Tensor {
        if !self.training || self.rate == 0.0 {
            return x.clone();
        }

        if self.rate >= 1.0 {
            return Tensor::zeros(x.shape.clone());
        }

        let scale = 1.0 / (1.0 - self.rate);
        let mut output = Tensor::zeros(x.shape.clone());
        for i in 0..x.data.len() {
            if rand::random::<f32>() > self.rate {
                output.data[i] = x.data[i] * scale;
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_is_identity() {
        let dropout = Dropout::new(0.9);
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let y = dropout.forward(&x);

        assert_eq!(y.data, x.data);
    }

    #[test]
    fn test_training_zeroes_and_rescales() {
        let mut dropout = Dropout::new(0.5);
        dropout.training = true;

        let x = Tensor::new(vec![1.0; 1000], vec![1000]);
        let y = dropout.forward(&x);

        let zeros = y.data.iter().filter(|&&v| v == 0.0).count();
        let kept = y.data.iter().filter(|&&v| v != 0.0).count();
        assert!(zeros > 0);
        assert!(kept > 0);
        // Kept values are scaled by 1 / (1 - 0.5)
        assert!(y.data.iter().all(|&v| v == 0.0 || v == 2.0));
    }

    #[test]
    fn test_rate_one_drops_everything() {
        let mut dropout = Dropout::new(1.0);
        dropout.training = true;

        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]);
        let y = dropout.forward(&x);

        assert!(y.data.iter().all(|&v| v == 0.0));
    }
}
