use ndarray::{Array1, Array2, Axis};
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};

/// Per-call gradients for a [`Dense`] layer.
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Fully-connected layer over flat (batch, features) inputs.
#[derive(Debug, Clone)]
pub struct Dense {
    pub in_features: usize,
    pub out_features: usize,
    /// (in_features, out_features)
    pub weights: Array2<f64>,
    /// Broadcast over the batch in forward.
    pub bias: Array1<f64>,
}

impl Dense {
    /// Constructs a dense layer with He-normal weight initialization and
    /// zero bias.
    pub fn new(in_features: usize, out_features: usize) -> Result<Self> {
        if in_features == 0 {
            return Err(Error::InvalidHyperparameter { name: "in_features", value: 0.0 });
        }
        if out_features == 0 {
            return Err(Error::InvalidHyperparameter { name: "out_features", value: 0.0 });
        }

        let std_dev = (2.0 / in_features as f64).sqrt();
        let normal = Normal::new(0.0, std_dev).unwrap();
        let mut rng = rand::rng();

        let weights = Array2::from_shape_fn((in_features, out_features), |_| normal.sample(&mut rng));
        let bias = Array1::zeros(out_features);

        Ok(Dense { in_features, out_features, weights, bias })
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        let (n, f) = x.dim();
        if f != self.in_features {
            return Err(Error::ShapeMismatch {
                context: "dense input (batch, features)",
                expected: vec![n.max(1), self.in_features],
                actual: vec![n, f],
            });
        }
        Ok(())
    }

    /// Forward pass: `input . weights + bias`.
    pub fn forward(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        Ok(x.dot(&self.weights) + &self.bias)
    }

    /// Backward pass against the same input `x` the matching forward saw.
    ///
    /// The returned input gradient is `d_out . weights^T` with the
    /// current (pre-update) weights; parameters are only changed by
    /// [`Dense::apply_gradients`].
    pub fn backward(&self, x: &Array2<f64>, d_out: &Array2<f64>) -> Result<(Array2<f64>, DenseGradients)> {
        self.check_input(x)?;
        let n = x.dim().0;
        let (dn, df) = d_out.dim();
        if (dn, df) != (n, self.out_features) {
            return Err(Error::ShapeMismatch {
                context: "dense upstream gradient",
                expected: vec![n, self.out_features],
                actual: vec![dn, df],
            });
        }

        let d_weights = x.t().dot(d_out);
        let d_bias = d_out.sum_axis(Axis(0));
        let d_input = d_out.dot(&self.weights.t());

        Ok((d_input, DenseGradients { weights: d_weights, bias: d_bias }))
    }

    /// Plain gradient-descent step: `param -= learning_rate * gradient`.
    pub fn apply_gradients(&mut self, grads: &DenseGradients, learning_rate: f64) {
        self.weights = &self.weights - learning_rate * &grads.weights;
        self.bias = &self.bias - learning_rate * &grads.bias;
    }
}
