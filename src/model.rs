use ndarray::{Array2, Array4};

use crate::activation::{relu, relu_derivative, softmax};
use crate::error::{Error, Result};
use crate::hyperparameters::Hyperparameters;
use crate::layers::{maxpool2x2, maxpool2x2_backward, Conv2D, Dense};
use crate::loss::cross_entropy;

/// Architecture of the fixed conv -> ReLU -> pool -> flatten -> dense ->
/// softmax pipeline, validated once before any tensor flows.
///
/// The default is the canonical MNIST-sized network: 28x28 single-channel
/// input, 8 filters of 3x3, 10 classes (which makes the flatten width
/// 13 * 13 * 8). The flatten width is always derived from these fields,
/// never hardcoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CnnConfig {
    pub input_height: usize,
    pub input_width: usize,
    pub input_channels: usize,
    pub num_filters: usize,
    pub filter_size: usize,
    pub num_classes: usize,
}

impl Default for CnnConfig {
    fn default() -> Self {
        CnnConfig {
            input_height: 28,
            input_width: 28,
            input_channels: 1,
            num_filters: 8,
            filter_size: 3,
            num_classes: 10,
        }
    }
}

impl CnnConfig {
    /// Spatial size of the convolution output: input - filter_size + 1.
    pub fn conv_output(&self) -> (usize, usize) {
        (
            self.input_height - self.filter_size + 1,
            self.input_width - self.filter_size + 1,
        )
    }

    /// Spatial size after 2x2 pooling.
    pub fn pooled_output(&self) -> (usize, usize) {
        let (h, w) = self.conv_output();
        (h / 2, w / 2)
    }

    /// Width of the flattened feature vector fed to the dense layer.
    pub fn flat_features(&self) -> usize {
        let (h, w) = self.pooled_output();
        h * w * self.num_filters
    }

    /// Checks the whole pipeline for shape consistency up front: the
    /// convolution must produce a non-empty output and its spatial
    /// dimensions must be even so 2x2 pooling divides them exactly.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("input_height", self.input_height),
            ("input_width", self.input_width),
            ("input_channels", self.input_channels),
            ("num_filters", self.num_filters),
            ("filter_size", self.filter_size),
            ("num_classes", self.num_classes),
        ] {
            if value == 0 {
                return Err(Error::InvalidHyperparameter { name, value: 0.0 });
            }
        }

        if self.input_height < self.filter_size || self.input_width < self.filter_size {
            return Err(Error::ShapeMismatch {
                context: "network config (input smaller than filter)",
                expected: vec![self.filter_size, self.filter_size],
                actual: vec![self.input_height, self.input_width],
            });
        }

        let (conv_h, conv_w) = self.conv_output();
        if conv_h % 2 != 0 || conv_w % 2 != 0 {
            return Err(Error::ShapeMismatch {
                context: "network config (conv output must have even spatial dims for 2x2 pooling)",
                expected: vec![conv_h + conv_h % 2, conv_w + conv_w % 2],
                actual: vec![conv_h, conv_w],
            });
        }
        Ok(())
    }
}

/// Immutable record of one forward pass, consumed by the matching
/// backward call.
///
/// Holding these tensors explicitly (rather than in hidden per-layer
/// caches) makes the forward/backward pairing visible in the API: a
/// backward call can only ever see the activations of the forward call
/// that produced its trace.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    /// The network input, needed by the convolution backward.
    pub input: Array4<f64>,
    /// Raw convolution output before ReLU; the ReLU derivative mask is
    /// evaluated here.
    pub pre_activation: Array4<f64>,
    /// Post-ReLU, pre-pool tensor; the max reference for pooling backward.
    pub activated: Array4<f64>,
    /// Flattened pooled features, the dense layer's input.
    pub flat: Array2<f64>,
}

/// Fixed-topology classifier: Conv2D -> ReLU -> maxpool 2x2 -> flatten ->
/// Dense -> softmax.
///
/// The orchestrator owns no parameters itself; it routes tensors and
/// gradients between the two stateful layers in the right order.
#[derive(Debug, Clone)]
pub struct SimpleCnn {
    pub config: CnnConfig,
    pub conv: Conv2D,
    pub fc: Dense,
}

impl SimpleCnn {
    pub fn new(config: CnnConfig) -> Result<Self> {
        config.validate()?;
        let conv = Conv2D::new(config.num_filters, config.filter_size, config.input_channels)?;
        let fc = Dense::new(config.flat_features(), config.num_classes)?;
        Ok(SimpleCnn { config, conv, fc })
    }

    fn check_input(&self, x: &Array4<f64>) -> Result<usize> {
        let (n, h, w, c) = x.dim();
        if n == 0
            || h != self.config.input_height
            || w != self.config.input_width
            || c != self.config.input_channels
        {
            return Err(Error::ShapeMismatch {
                context: "network input (batch, height, width, channels)",
                expected: vec![
                    n.max(1),
                    self.config.input_height,
                    self.config.input_width,
                    self.config.input_channels,
                ],
                actual: vec![n, h, w, c],
            });
        }
        Ok(n)
    }

    /// Full forward pass. Returns per-sample class probabilities together
    /// with the trace the matching backward call needs.
    pub fn forward(&self, x: &Array4<f64>) -> Result<(Array2<f64>, ForwardTrace)> {
        let n = self.check_input(x)?;

        let pre_activation = self.conv.forward(x)?;
        let activated = relu(&pre_activation);
        let pooled = maxpool2x2(&activated)?;
        let flat = pooled
            .into_shape_with_order((n, self.config.flat_features()))
            .unwrap();
        let logits = self.fc.forward(&flat)?;
        let probs = softmax(&logits);

        let trace = ForwardTrace {
            input: x.clone(),
            pre_activation,
            activated,
            flat,
        };
        Ok((probs, trace))
    }

    /// Full backward pass from the combined softmax + cross-entropy
    /// gradient (`probs` with 1 subtracted at each sample's true class,
    /// already divided by the batch size).
    ///
    /// Stages run in reverse order: dense -> unflatten -> pooling backward
    /// against the trace's post-ReLU tensor -> ReLU mask at the trace's
    /// pre-activation tensor -> convolution. Both layers' parameters are
    /// updated exactly once per call.
    pub fn backward(&mut self, trace: &ForwardTrace, d_out: &Array2<f64>, learning_rate: f64) -> Result<()> {
        let n = self.check_input(&trace.input)?;
        let (dn, dc) = d_out.dim();
        if (dn, dc) != (n, self.config.num_classes) {
            return Err(Error::ShapeMismatch {
                context: "network output gradient (batch, classes)",
                expected: vec![n, self.config.num_classes],
                actual: vec![dn, dc],
            });
        }

        let (pool_h, pool_w) = self.config.pooled_output();

        let (d_flat, fc_grads) = self.fc.backward(&trace.flat, d_out)?;
        let d_pooled = d_flat
            .into_shape_with_order((n, pool_h, pool_w, self.config.num_filters))
            .unwrap();
        let d_activated = maxpool2x2_backward(&d_pooled, &trace.activated)?;
        let d_pre_activation = relu_derivative(&trace.pre_activation) * &d_activated;
        let (_d_input, conv_grads) = self.conv.backward(&trace.input, &d_pre_activation)?;

        self.conv.apply_gradients(&conv_grads, learning_rate);
        self.fc.apply_gradients(&fc_grads, learning_rate);
        Ok(())
    }

    /// Full-set gradient descent: one forward pass, one loss report, and
    /// one backward pass over the entire training set per epoch. No
    /// batching, shuffling, or early stopping.
    ///
    /// Returns the mean cross-entropy loss of each epoch, in order.
    pub fn train(
        &mut self,
        images: &Array4<f64>,
        labels: &[usize],
        hyper: &Hyperparameters,
    ) -> Result<Vec<f64>> {
        let n = self.check_input(images)?;
        if labels.len() != n {
            return Err(Error::ShapeMismatch {
                context: "training labels",
                expected: vec![n],
                actual: vec![labels.len()],
            });
        }
        for (index, &label) in labels.iter().enumerate() {
            if label >= self.config.num_classes {
                return Err(Error::LabelOutOfRange {
                    index,
                    label,
                    num_classes: self.config.num_classes,
                });
            }
        }

        let mut losses = Vec::with_capacity(hyper.epochs);
        for epoch in 0..hyper.epochs {
            let (probs, trace) = self.forward(images)?;
            let loss = cross_entropy(&probs, labels)?;
            println!("Epoch {}, Loss: {}", epoch + 1, loss);

            // Combined softmax + cross-entropy gradient
            let mut grad = probs;
            for (i, &label) in labels.iter().enumerate() {
                grad[[i, label]] -= 1.0;
            }
            grad /= n as f64;

            self.backward(&trace, &grad, hyper.learning_rate)?;
            losses.push(loss);
        }
        Ok(losses)
    }
}
