use std::fmt;

/// All failure modes surfaced by this crate.
///
/// Shape and hyperparameter problems are rejected at the API boundary
/// (construction or the offending call) instead of propagating as
/// low-level array errors or silently wrong results.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    LabelOutOfRange {
        index: usize,
        label: usize,
        num_classes: usize,
    },
    InvalidHyperparameter {
        name: &'static str,
        value: f64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShapeMismatch { context, expected, actual } => {
                write!(f, "shape mismatch in {}: expected {:?}, got {:?}", context, expected, actual)
            }
            Error::LabelOutOfRange { index, label, num_classes } => {
                write!(f, "label {} at sample {} is out of range for {} classes", label, index, num_classes)
            }
            Error::InvalidHyperparameter { name, value } => {
                write!(f, "invalid hyperparameter {}: {}", name, value)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
