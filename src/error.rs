use std::fmt;

/// Failure conditions with meaning beyond a plain message. Carried inside
/// `anyhow::Error` so callers can downcast on the ones they care about.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleTransferError {
    /// The total loss left the finite range during optimization. Aborting
    /// here avoids writing a corrupted output image.
    DivergedOptimization { step: usize, loss: f64 },
    /// Content and style tensors disagree in shape after preprocessing.
    ShapeMismatch { expected: Vec<i64>, found: Vec<i64> },
}

impl fmt::Display for StyleTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivergedOptimization { step, loss } => {
                write!(f, "optimization diverged at step {} (loss = {})", step, loss)
            }
            Self::ShapeMismatch { expected, found } => {
                write!(
                    f,
                    "shape mismatch: expected {:?}, found {:?}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for StyleTransferError {}
