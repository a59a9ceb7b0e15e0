use serde::Deserialize;

/// How the weighted sum of a convolution is scaled before the bias is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Divide by the sum of all weights (falls back to 1 when the sum is zero).
    #[default]
    Sum,
    /// Leave the weighted sum unscaled.
    Unit,
}

/// Square `n x n` weight matrix driving the convolution stage.
///
/// `n` is odd and at least 3, and is fixed for the lifetime of the kernel:
/// weight updates replace individual cells but never resize the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    /// Row-major, `size * size` entries.
    weights: Vec<f32>,
    anchor: (usize, usize),
    normalization: Normalization,
    bias: f32,
}

pub const MIN_KERNEL_SIZE: usize = 3;

impl Kernel {
    /// A `size x size` kernel with every weight set to `value`.
    pub fn filled(size: usize, value: f32) -> Result<Self, KernelError> {
        validate_size(size)?;
        Ok(Self {
            size,
            weights: vec![value; size * size],
            anchor: (size / 2, size / 2),
            normalization: Normalization::default(),
            bias: 0.0,
        })
    }

    /// A kernel that reproduces its input: 1 at the centre, 0 elsewhere.
    pub fn identity(size: usize) -> Result<Self, KernelError> {
        let mut kernel = Self::filled(size, 0.0)?;
        let c = size / 2;
        kernel.weights[c * size + c] = 1.0;
        Ok(kernel.with_normalization(Normalization::Unit))
    }

    /// Build a kernel from `size * size` row-major weights.
    pub fn from_weights(size: usize, weights: Vec<f32>) -> Result<Self, KernelError> {
        validate_size(size)?;
        if weights.len() != size * size {
            return Err(KernelError::WeightCount {
                expected: size * size,
                got: weights.len(),
            });
        }
        Ok(Self {
            size,
            weights,
            anchor: (size / 2, size / 2),
            normalization: Normalization::default(),
            bias: 0.0,
        })
    }

    pub fn with_anchor(mut self, row: usize, col: usize) -> Result<Self, KernelError> {
        if row >= self.size || col >= self.size {
            return Err(KernelError::Anchor {
                row,
                col,
                size: self.size,
            });
        }
        self.anchor = (row, col);
        Ok(self)
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    // -- Accessors ----------------------------------------------------------------

    pub fn size(&self) -> usize {
        self.size
    }

    /// `(row, col)` of the matrix cell aligned with the output pixel.
    pub fn anchor(&self) -> (usize, usize) {
        self.anchor
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Row-major weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weight(&self, row: usize, col: usize) -> Result<f32, KernelError> {
        self.check_bounds(row, col)?;
        Ok(self.weights[row * self.size + col])
    }

    pub fn set_weight(&mut self, row: usize, col: usize, value: f32) -> Result<(), KernelError> {
        self.check_bounds(row, col)?;
        self.weights[row * self.size + col] = value;
        Ok(())
    }

    /// The value the weighted sum is divided by.
    pub fn divisor(&self) -> f32 {
        match self.normalization {
            Normalization::Unit => 1.0,
            Normalization::Sum => {
                let sum: f32 = self.weights.iter().sum();
                if sum.abs() < f32::EPSILON {
                    1.0
                } else {
                    sum
                }
            }
        }
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), KernelError> {
        if row >= self.size || col >= self.size {
            return Err(KernelError::OutOfBounds {
                row,
                col,
                size: self.size,
            });
        }
        Ok(())
    }
}

fn validate_size(size: usize) -> Result<(), KernelError> {
    if size < MIN_KERNEL_SIZE || size % 2 == 0 {
        return Err(KernelError::InvalidSize(size));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("invalid kernel size {0}: must be odd and at least 3")]
    InvalidSize(usize),
    #[error("kernel cell ({row}, {col}) is outside a {size}x{size} kernel")]
    OutOfBounds { row: usize, col: usize, size: usize },
    #[error("kernel needs {expected} weights, got {got}")]
    WeightCount { expected: usize, got: usize },
    #[error("anchor ({row}, {col}) is outside a {size}x{size} kernel")]
    Anchor { row: usize, col: usize, size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_even_and_small_sizes() {
        for size in [0, 1, 2, 4, 8] {
            assert_eq!(
                Kernel::filled(size, 1.0).unwrap_err(),
                KernelError::InvalidSize(size),
                "size {size} should be rejected"
            );
        }
        assert!(Kernel::filled(5, 1.0).is_ok());
    }

    #[test]
    fn anchor_defaults_to_centre() {
        let kernel = Kernel::filled(5, 1.0).unwrap();
        assert_eq!(kernel.anchor(), (2, 2));
        assert!(kernel.clone().with_anchor(0, 4).is_ok());
        assert!(matches!(
            kernel.with_anchor(5, 0),
            Err(KernelError::Anchor { .. })
        ));
    }

    #[test]
    fn weight_access_is_bounds_checked() {
        let mut kernel = Kernel::filled(3, 1.0).unwrap();
        kernel.set_weight(2, 1, -1.5).unwrap();
        assert_eq!(kernel.weight(2, 1), Ok(-1.5));
        assert!(matches!(
            kernel.set_weight(3, 0, 2.0),
            Err(KernelError::OutOfBounds { row: 3, col: 0, size: 3 })
        ));
        assert_eq!(kernel.size(), 3);
        assert_eq!(kernel.weights().len(), 9);
    }

    #[test]
    fn from_weights_checks_length() {
        let err = Kernel::from_weights(3, vec![1.0; 8]).unwrap_err();
        assert_eq!(err, KernelError::WeightCount { expected: 9, got: 8 });
    }

    #[test]
    fn divisor_follows_normalization() {
        let ones = Kernel::filled(3, 1.0).unwrap();
        assert_eq!(ones.divisor(), 9.0);
        assert_eq!(ones.with_normalization(Normalization::Unit).divisor(), 1.0);

        // Laplacian-style kernel sums to zero
        let mut edge = Kernel::filled(3, -1.0).unwrap();
        edge.set_weight(1, 1, 8.0).unwrap();
        assert_eq!(edge.divisor(), 1.0);
    }

    #[test]
    fn identity_has_single_centre_weight() {
        let kernel = Kernel::identity(3).unwrap();
        assert_eq!(kernel.weights(), &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(kernel.divisor(), 1.0);
    }
}
