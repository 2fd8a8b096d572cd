mod activation;
mod error;
mod hyperparameters;
mod layers;
mod loss;
mod model;

pub use activation::{relu, relu_derivative, softmax};
pub use error::{Error, Result};
pub use hyperparameters::Hyperparameters;
pub use layers::{maxpool2x2, maxpool2x2_backward, Conv2D, ConvGradients, Dense, DenseGradients};
pub use loss::cross_entropy;
pub use model::{CnnConfig, ForwardTrace, SimpleCnn};
