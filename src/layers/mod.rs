pub mod conv2d;
pub mod dense;
pub mod max_pool;

pub use conv2d::{Conv2D, ConvGradients};
pub use dense::{Dense, DenseGradients};
pub use max_pool::{maxpool2x2, maxpool2x2_backward};
