use ndarray::{Array1, Array4};
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};

/// Per-call gradients for a [`Conv2D`] layer, produced by `backward` and
/// consumed by `apply_gradients`. Not retained across calls.
#[derive(Debug, Clone)]
pub struct ConvGradients {
    pub filters: Array4<f64>,
    pub biases: Array1<f64>,
}

/// Valid (no padding), stride-1 convolution layer.
///
/// Owns a bank of `num_filters` kernels of shape
/// (filter_size, filter_size, input_channels) plus one bias per filter.
#[derive(Debug, Clone)]
pub struct Conv2D {
    pub num_filters: usize,
    pub filter_size: usize,
    pub input_channels: usize,
    pub filters: Array4<f64>,
    pub biases: Array1<f64>,
}

impl Conv2D {
    /// Constructs a convolution layer with He-normal filter
    /// initialization and zero biases.
    pub fn new(num_filters: usize, filter_size: usize, input_channels: usize) -> Result<Self> {
        if num_filters == 0 {
            return Err(Error::InvalidHyperparameter { name: "num_filters", value: 0.0 });
        }
        if filter_size == 0 {
            return Err(Error::InvalidHyperparameter { name: "filter_size", value: 0.0 });
        }
        if input_channels == 0 {
            return Err(Error::InvalidHyperparameter { name: "input_channels", value: 0.0 });
        }

        let fan_in = filter_size * filter_size * input_channels;
        let std_dev = (2.0 / fan_in as f64).sqrt();
        let normal = Normal::new(0.0, std_dev).unwrap();
        let mut rng = rand::rng();

        let filters = Array4::from_shape_fn(
            (num_filters, filter_size, filter_size, input_channels),
            |_| normal.sample(&mut rng),
        );
        let biases = Array1::zeros(num_filters);

        Ok(Conv2D { num_filters, filter_size, input_channels, filters, biases })
    }

    fn check_input(&self, x: &Array4<f64>) -> Result<(usize, usize, usize)> {
        let (n, h, w, c) = x.dim();
        let k = self.filter_size;
        if c != self.input_channels || h < k || w < k {
            return Err(Error::ShapeMismatch {
                context: "conv2d input (batch, height, width, channels)",
                expected: vec![n.max(1), k, k, self.input_channels],
                actual: vec![n, h, w, c],
            });
        }
        Ok((n, h - k + 1, w - k + 1))
    }

    /// Forward pass: (n, h, w, cin) -> (n, h-k+1, w-k+1, num_filters).
    ///
    /// Each output element is the dot product between one filter and the
    /// input patch under it, plus that filter's bias.
    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>> {
        let (n, out_h, out_w) = self.check_input(x)?;
        let k = self.filter_size;

        let mut out = Array4::zeros((n, out_h, out_w, self.num_filters));
        for sample in 0..n {
            for i in 0..out_h {
                for j in 0..out_w {
                    for f in 0..self.num_filters {
                        let mut acc = self.biases[f];
                        for u in 0..k {
                            for v in 0..k {
                                for ch in 0..self.input_channels {
                                    acc += x[[sample, i + u, j + v, ch]]
                                        * self.filters[[f, u, v, ch]];
                                }
                            }
                        }
                        out[[sample, i, j, f]] = acc;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Backward pass against the same input `x` the matching forward saw.
    ///
    /// Returns the input gradient (a full/transposed correlation of the
    /// upstream gradient with the filters) together with the filter and
    /// bias gradients, accumulated over the batch and all output
    /// positions. Parameters are not touched here; see
    /// [`Conv2D::apply_gradients`].
    pub fn backward(&self, x: &Array4<f64>, d_out: &Array4<f64>) -> Result<(Array4<f64>, ConvGradients)> {
        let (n, out_h, out_w) = self.check_input(x)?;
        let k = self.filter_size;
        let (dn, dh, dw, df) = d_out.dim();
        if (dn, dh, dw, df) != (n, out_h, out_w, self.num_filters) {
            return Err(Error::ShapeMismatch {
                context: "conv2d upstream gradient",
                expected: vec![n, out_h, out_w, self.num_filters],
                actual: vec![dn, dh, dw, df],
            });
        }

        let mut d_filters = Array4::zeros(self.filters.raw_dim());
        let mut d_biases = Array1::zeros(self.num_filters);
        let mut d_x = Array4::zeros(x.raw_dim());

        for sample in 0..n {
            for i in 0..out_h {
                for j in 0..out_w {
                    for f in 0..self.num_filters {
                        let g = d_out[[sample, i, j, f]];
                        d_biases[f] += g;
                        for u in 0..k {
                            for v in 0..k {
                                for ch in 0..self.input_channels {
                                    d_filters[[f, u, v, ch]] += x[[sample, i + u, j + v, ch]] * g;
                                    d_x[[sample, i + u, j + v, ch]] += self.filters[[f, u, v, ch]] * g;
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok((d_x, ConvGradients { filters: d_filters, biases: d_biases }))
    }

    /// Plain gradient-descent step: `param -= learning_rate * gradient`.
    pub fn apply_gradients(&mut self, grads: &ConvGradients, learning_rate: f64) {
        self.filters = &self.filters - learning_rate * &grads.filters;
        self.biases = &self.biases - learning_rate * &grads.biases;
    }
}
