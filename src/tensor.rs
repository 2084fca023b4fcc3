//! Tensor Operations
//!
//! A minimal tensor library carrying exactly the operations the attention
//! engine needs. Tensors store multi-dimensional arrays as flat row-major
//! data plus a shape.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f32>` storing all elements in row-major order
//! - **Shape**: Dimensions of the tensor (e.g., `[seq, dim]`)
//!
//! ## Example
//!
//! ```rust
//! use mynah::Tensor;
//!
//! // Create a 2x3 matrix
//! let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let tensor = Tensor::new(data, vec![2, 3]);
//!
//! // Matrix multiplication
//! let other = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2]);
//! let result = tensor.matmul(&other);
//! assert_eq!(result.shape, vec![2, 2]);
//! ```
//!
//! ## Performance
//!
//! The hot operations use Rayon:
//!
//! - **Matrix multiplication**: Cache-blocked algorithm with parallel row
//!   processing
//! - **Element-wise operations**: Parallel iteration over data
//! - **Softmax**: Parallel computation per row
//!
//! Parallel splits never reorder a floating-point reduction, so every
//! operation produces bit-for-bit the same result as its sequential
//! counterpart. Shape errors in this module are programming mistakes and
//! panic via `assert!`; the validated model entry points make them
//! unreachable from the public API.

use rayon::prelude::*;

/// A multi-dimensional array of `f32` values.
///
/// Tensors store data in a contiguous `Vec<f32>` indexed by shape. All
/// operations use row-major (C-style) memory layout.
///
/// # Memory Layout
///
/// For shape `[2, 3]`, data is stored as:
/// `[row0_col0, row0_col1, row0_col2, row1_col0, row1_col1, row1_col2]`
#[derive(Clone, Debug)]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f32>,
    /// Shape of the tensor (dimensions)
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with given data and shape.
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mynah::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// assert_eq!(tensor.shape, vec![2, 2]);
    /// ```
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_size
        );

        Self { data, shape }
    }

    /// Create a tensor filled with zeros.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mynah::Tensor;
    /// let tensor = Tensor::zeros(vec![3, 4]);
    /// assert_eq!(tensor.data.len(), 12);
    /// assert!(tensor.data.iter().all(|&x| x == 0.0));
    /// ```
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        let data = vec![0.0; size];
        Self::new(data, shape)
    }

    /// Inner loop of matrix multiplication, structured for auto-vectorization.
    /// Computes: result[j] += a_val * b[j] for all j.
    #[inline(always)]
    fn matmul_inner_simd(a_val: f32, b: &[f32], result: &mut [f32]) {
        for (r, &b_val) in result.iter_mut().zip(b.iter()) {
            *r += a_val * b_val;
        }
    }

    /// 2D matrix multiplication.
    ///
    /// For `A @ B` where `A` is `[m, k]` and `B` is `[k, n]`:
    /// - Result shape: `[m, n]`
    /// - Each element `C[i,j] = sum(A[i,l] * B[l,j])` over l
    ///
    /// # Performance
    ///
    /// - **Small matrices** (< 1K ops): sequential computation
    /// - **Large matrices** (>= 1K ops): parallel cache-blocked algorithm
    ///
    /// Both paths accumulate each output element in ascending `l` order, so
    /// they produce identical results.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions are incompatible or either operand is
    /// not 2D.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mynah::Tensor;
    /// let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// let b = Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
    /// let c = a.matmul(&b);
    /// assert_eq!(c.data, vec![1.0, 2.0, 3.0, 4.0]);
    /// ```
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert!(
            self.shape.len() == 2 && other.shape.len() == 2,
            "Unsupported matmul shapes: {:?} @ {:?}",
            self.shape,
            other.shape
        );
        assert_eq!(
            self.shape[1], other.shape[0],
            "Matrix dimensions incompatible: [{}, {}] @ [{}, {}]",
            self.shape[0], self.shape[1], other.shape[0], other.shape[1]
        );

        let m = self.shape[0];
        let n = other.shape[1];
        let k = self.shape[1];

        // Use parallel version for larger matrices (work threshold: 1000 operations)
        if m * n * k >= 1_000 {
            return self.matmul_parallel_blocked(other, m, n, k);
        }

        // Sequential version for small matrices (avoids parallel overhead)
        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += self.data[i * k + l] * other.data[l * n + j];
                }
                result[i * n + j] = sum;
            }
        }

        Tensor::new(result, vec![m, n])
    }

    /// Parallel cache-blocked matrix multiplication.
    ///
    /// 1. **Cache blocking**: Processes data in 8x8 blocks that fit in L1
    /// 2. **Parallel processing**: Distributes row blocks across CPU cores
    /// 3. **Memory locality**: Inner loops access memory sequentially
    ///
    /// Each output row lives in exactly one chunk and accumulates its inner
    /// products in the same ascending order as the sequential path.
    fn matmul_parallel_blocked(&self, other: &Tensor, m: usize, n: usize, k: usize) -> Tensor {
        const BLOCK_SIZE: usize = 8;

        let mut result = vec![0.0; m * n];

        // Parallelize over output row blocks
        result
            .par_chunks_mut(BLOCK_SIZE * n)
            .enumerate()
            .for_each(|(block_i, result_block)| {
                let i_start = block_i * BLOCK_SIZE;
                let i_end = (i_start + BLOCK_SIZE).min(m);

                for j_start in (0..n).step_by(BLOCK_SIZE) {
                    let j_end = (j_start + BLOCK_SIZE).min(n);

                    for k_start in (0..k).step_by(BLOCK_SIZE) {
                        let k_end = (k_start + BLOCK_SIZE).min(k);

                        for i in i_start..i_end {
                            let row_offset = (i - i_start) * n;
                            for k_idx in k_start..k_end {
                                let a_val = self.data[i * k + k_idx];

                                Self::matmul_inner_simd(
                                    a_val,
                                    &other.data[k_idx * n + j_start..k_idx * n + j_end],
                                    &mut result_block[row_offset + j_start..row_offset + j_end],
                                );
                            }
                        }
                    }
                }
            });

        Tensor::new(result, vec![m, n])
    }

    /// Softmax along the last axis of a 2D tensor, computed per row.
    ///
    /// # Numerical Stability
    ///
    /// Uses the numerically stable version:
    ///
    /// ```text
    /// softmax(x)[i] = exp(x[i] - max(x)) / sum(exp(x[j] - max(x)))
    /// ```
    ///
    /// Subtracting the row maximum prevents overflow in exp() while
    /// producing the same result (the max factors cancel out). A side effect
    /// that the attention mask relies on: entries holding `-inf` map to
    /// exactly `0.0`, because `exp(-inf) == 0`.
    ///
    /// # Arguments
    ///
    /// * `axis` - Axis along which to compute softmax (use -1 for last axis)
    ///
    /// # Panics
    ///
    /// Panics unless the tensor is 2D and `axis` names its last dimension.
    pub fn softmax(&self, axis: isize) -> Tensor {
        let axis_pos = if axis < 0 {
            (self.shape.len() as isize + axis) as usize
        } else {
            axis as usize
        };
        assert!(
            self.shape.len() == 2 && axis_pos == 1,
            "Unsupported softmax: shape {:?}, axis {}",
            self.shape,
            axis
        );

        let rows = self.shape[0];
        let cols = self.shape[1];

        // Parallel softmax computation per row
        let result: Vec<f32> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|i| {
                let start = i * cols;
                let end = start + cols;
                let row = &self.data[start..end];

                // Find max for numerical stability
                let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

                // Compute exp(x - max)
                let exp_values: Vec<f32> = row.iter().map(|&x| (x - max).exp()).collect();

                // Normalize
                let sum: f32 = exp_values.iter().sum();
                exp_values.into_iter().map(move |val| val / sum)
            })
            .collect();

        Tensor::new(result, self.shape.clone())
    }

    /// Element-wise addition with broadcasting support.
    ///
    /// Supports two patterns:
    ///
    /// 1. **Exact match**: same shape
    /// 2. **Broadcast last dim**: `[*, n] + [n]` (e.g., adding a bias)
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mynah::Tensor;
    /// let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
    /// let b = Tensor::new(vec![1.0, 1.0, 1.0, 1.0], vec![2, 2]);
    /// let c = a.add(&b);
    /// assert_eq!(c.data, vec![2.0, 3.0, 4.0, 5.0]);
    /// ```
    pub fn add(&self, other: &Tensor) -> Tensor {
        // === EXACT MATCH: Same shape ===
        if self.shape == other.shape {
            let result = self
                .data
                .par_iter()
                .zip(&other.data)
                .map(|(a, b)| a + b)
                .collect();
            return Tensor::new(result, self.shape.clone());
        }

        // === BROADCAST LAST DIM: [*, n] + [n] (e.g., bias addition) ===
        if self.shape.len() > other.shape.len() {
            let last_dim = *self.shape.last().unwrap();
            if other.data.len() == last_dim {
                let result: Vec<f32> = (0..self.data.len())
                    .into_par_iter()
                    .map(|i| {
                        let other_idx = i % last_dim;
                        self.data[i] + other.data[other_idx]
                    })
                    .collect();
                return Tensor::new(result, self.shape.clone());
            }
        }

        panic!(
            "Unsupported broadcast for add: {:?} + {:?}",
            self.shape, other.shape
        );
    }

    /// Multiply all elements by a scalar.
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        let result = self.data.par_iter().map(|&x| x * scalar).collect();
        Tensor::new(result, self.shape.clone())
    }

    /// Transpose the two dimensions of a 2D tensor.
    ///
    /// # Arguments
    ///
    /// * `dim1` - First dimension to swap (supports negative indexing)
    /// * `dim2` - Second dimension to swap (supports negative indexing)
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mynah::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    /// let transposed = tensor.transpose(-2, -1);
    /// assert_eq!(transposed.shape, vec![3, 2]);
    /// assert_eq!(transposed.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    /// ```
    pub fn transpose(&self, dim1: isize, dim2: isize) -> Tensor {
        let ndim = self.shape.len() as isize;

        // Convert negative indices
        let d1 = if dim1 < 0 { ndim + dim1 } else { dim1 } as usize;
        let d2 = if dim2 < 0 { ndim + dim2 } else { dim2 } as usize;

        assert!(
            self.shape.len() == 2 && d1.min(d2) == 0 && d1.max(d2) == 1,
            "Unsupported transpose: shape {:?}, dims ({}, {})",
            self.shape,
            dim1,
            dim2
        );

        let rows = self.shape[0];
        let cols = self.shape[1];
        let mut result = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                result[j * rows + i] = self.data[i * cols + j];
            }
        }

        Tensor::new(result, vec![cols, rows])
    }

    /// Replace values where the mask is non-zero with the given value.
    ///
    /// Used for causal masking in attention (setting future positions to
    /// `-inf` before softmax).
    ///
    /// # Arguments
    ///
    /// * `mask` - Mask tensor of the same shape (non-zero = replace)
    /// * `value` - Value to fill where the mask is set
    pub fn masked_fill(&self, mask: &Tensor, value: f32) -> Tensor {
        assert_eq!(self.shape, mask.shape, "Mask shape must match tensor shape");
        let result = self
            .data
            .par_iter()
            .zip(&mask.data)
            .map(|(&x, &m)| if m != 0.0 { value } else { x })
            .collect();
        Tensor::new(result, self.shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_small() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let b = Tensor::new(vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0], vec![3, 2]);
        let c = a.matmul(&b);

        assert_eq!(c.shape, vec![2, 2]);
        assert_eq!(c.data, vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_blocked_matches_naive() {
        // 24x24 @ 24x24 exceeds the parallel threshold, so this exercises
        // the blocked path against a naive reference computed here. Both
        // accumulate in the same order, so the comparison is exact.
        let m = 24;
        let a_data: Vec<f32> = (0..m * m)
            .map(|i| ((i * 31 % 17) as f32) * 0.25 - 2.0)
            .collect();
        let b_data: Vec<f32> = (0..m * m)
            .map(|i| ((i * 13 % 23) as f32) * 0.125 - 1.0)
            .collect();
        let a = Tensor::new(a_data.clone(), vec![m, m]);
        let b = Tensor::new(b_data.clone(), vec![m, m]);

        let c = a.matmul(&b);

        let mut expected = vec![0.0f32; m * m];
        for i in 0..m {
            for j in 0..m {
                let mut sum = 0.0f32;
                for l in 0..m {
                    sum += a_data[i * m + l] * b_data[l * m + j];
                }
                expected[i * m + j] = sum;
            }
        }
        assert_eq!(c.data, expected);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, -1.0, 0.0, 1.0], vec![2, 3]);
        let s = t.softmax(-1);

        for row in 0..2 {
            let sum: f32 = s.data[row * 3..(row + 1) * 3].iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        // Larger inputs get larger probabilities
        assert!(s.data[2] > s.data[1] && s.data[1] > s.data[0]);
    }

    #[test]
    fn test_softmax_extreme_values_stay_finite() {
        let t = Tensor::new(vec![1e4, -1e4, 0.0, 5e3, -5e3, 2.5e3], vec![2, 3]);
        let s = t.softmax(-1);

        assert!(s.data.iter().all(|v| v.is_finite()));
        for row in 0..2 {
            let sum: f32 = s.data[row * 3..(row + 1) * 3].iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_softmax_neg_infinity_becomes_zero() {
        let t = Tensor::new(
            vec![0.5, f32::NEG_INFINITY, 1.5, f32::NEG_INFINITY],
            vec![2, 2],
        );
        let s = t.softmax(-1);

        assert_eq!(s.data[1], 0.0);
        assert_eq!(s.data[3], 0.0);
        assert_eq!(s.data[0], 1.0);
        assert_eq!(s.data[2], 1.0);
    }

    #[test]
    fn test_add_exact_and_bias_broadcast() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let b = Tensor::new(vec![10.0, 20.0, 30.0, 40.0], vec![2, 2]);
        assert_eq!(a.add(&b).data, vec![11.0, 22.0, 33.0, 44.0]);

        let bias = Tensor::new(vec![0.5, -0.5], vec![2]);
        assert_eq!(a.add(&bias).data, vec![1.5, 1.5, 3.5, 3.5]);
    }

    #[test]
    fn test_mul_scalar() {
        let t = Tensor::new(vec![1.0, -2.0, 3.0], vec![1, 3]);
        assert_eq!(t.mul_scalar(0.5).data, vec![0.5, -1.0, 1.5]);
    }

    #[test]
    fn test_transpose_2d() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let tt = t.transpose(-2, -1);

        assert_eq!(tt.shape, vec![3, 2]);
        assert_eq!(tt.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_masked_fill() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let mask = Tensor::new(vec![0.0, 1.0, 0.0, 1.0], vec![2, 2]);
        let filled = t.masked_fill(&mask, f32::NEG_INFINITY);

        assert_eq!(filled.data[0], 1.0);
        assert_eq!(filled.data[1], f32::NEG_INFINITY);
        assert_eq!(filled.data[2], 3.0);
        assert_eq!(filled.data[3], f32::NEG_INFINITY);
    }
}
