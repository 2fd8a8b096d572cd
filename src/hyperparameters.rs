use crate::error::{Error, Result};

/// Training hyperparameters, validated at construction.
///
/// A zero epoch count would silently perform no training steps and a
/// non-positive learning rate would move parameters the wrong way, so
/// both are rejected up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Hyperparameters {
    pub fn new(epochs: usize, learning_rate: f64) -> Result<Self> {
        if epochs == 0 {
            return Err(Error::InvalidHyperparameter { name: "epochs", value: 0.0 });
        }
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(Error::InvalidHyperparameter { name: "learning_rate", value: learning_rate });
        }
        Ok(Hyperparameters { epochs, learning_rate })
    }
}
