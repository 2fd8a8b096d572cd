use ndarray::{Array2, Array4, Axis};

/// Elementwise ReLU: max(0, x).
pub fn relu(x: &Array4<f64>) -> Array4<f64> {
    x.mapv(|v| v.max(0.0))
}

/// Elementwise ReLU derivative, used as a gradient mask.
///
/// Strictly positive inputs map to 1.0, everything else (including
/// exactly 0.0) maps to 0.0.
pub fn relu_derivative(x: &Array4<f64>) -> Array4<f64> {
    x.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

/// Row-wise softmax over (batch, classes) logits.
///
/// Each row's max is subtracted before exponentiating to avoid overflow,
/// then the row is normalized to sum to 1.
pub fn softmax(x: &Array2<f64>) -> Array2<f64> {
    let mut out = x.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}
