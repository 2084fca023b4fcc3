//! Activation Functions
//!
//! ## ReLU (Rectified Linear Unit)
//!
//! ```text
//! relu(x) = max(0, x)
//! ```
//!
//! The feed-forward network rectifies its hidden activations: negative
//! values become zero, positive values pass through unchanged. It is cheap,
//! introduces the nonlinearity the two-layer feed-forward needs, and keeps
//! the arithmetic easy to reason about.

use rayon::prelude::*;

use crate::tensor::Tensor;

/// ReLU activation, applied element-wise.
///
/// # Example
///
/// ```rust
/// # use mynah::layers::relu;
/// # use mynah::Tensor;
/// let x = Tensor::new(vec![-1.0, 0.0, 2.5], vec![1, 3]);
/// assert_eq!(relu(&x).data, vec![0.0, 0.0, 2.5]);
/// ```
pub fn relu(x: &Tensor) -> Tensor {
    let result = x.data.par_iter().map(|&val| val.max(0.0)).collect();
    Tensor::new(result, x.shape.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_zeroes_negatives() {
        let x = Tensor::new(vec![-3.0, -0.5, 0.0, 0.5, 3.0], vec![1, 5]);
        let y = relu(&x);

        assert_eq!(y.data, vec![0.0, 0.0, 0.0, 0.5, 3.0]);
        assert_eq!(y.shape, x.shape);
    }
}
