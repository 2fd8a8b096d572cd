use ndarray::Array2;

use crate::error::{Error, Result};

/// Floor applied to predicted probabilities before taking the log, so a
/// true-class probability of exactly 0 yields a large finite loss instead
/// of infinity. Documented policy; gradients never pass through the loss
/// value itself, so training dynamics are unaffected.
const PROB_FLOOR: f64 = 1e-15;

/// Mean cross-entropy over the batch.
///
/// # Arguments
///
/// * `pred` - Post-softmax probabilities, shape (batch, classes)
/// * `labels` - One class index per sample
pub fn cross_entropy(pred: &Array2<f64>, labels: &[usize]) -> Result<f64> {
    let (n, classes) = pred.dim();
    if labels.len() != n || n == 0 {
        return Err(Error::ShapeMismatch {
            context: "cross_entropy labels",
            expected: vec![n.max(1)],
            actual: vec![labels.len()],
        });
    }

    let mut total = 0.0;
    for (i, &label) in labels.iter().enumerate() {
        if label >= classes {
            return Err(Error::LabelOutOfRange { index: i, label, num_classes: classes });
        }
        total -= pred[[i, label]].max(PROB_FLOOR).ln();
    }
    Ok(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cross_entropy_non_negative() {
        let pred = array![[0.7, 0.3], [0.2, 0.8]];
        let loss = cross_entropy(&pred, &[0, 1]).unwrap();
        assert!(loss >= 0.0);
    }

    #[test]
    fn test_cross_entropy_approaches_zero_for_confident_prediction() {
        let confident = array![[0.999999, 0.000001]];
        let uncertain = array![[0.5, 0.5]];
        let lo = cross_entropy(&confident, &[0]).unwrap();
        let hi = cross_entropy(&uncertain, &[0]).unwrap();
        assert!(lo < 1e-5);
        assert!(hi > lo);
    }

    #[test]
    fn test_cross_entropy_zero_probability_stays_finite() {
        let pred = array![[0.0, 1.0]];
        let loss = cross_entropy(&pred, &[0]).unwrap();
        assert!(loss.is_finite());
        assert!(loss > 30.0); // -ln(1e-15)
    }

    #[test]
    fn test_cross_entropy_rejects_out_of_range_label() {
        let pred = array![[0.5, 0.5]];
        let err = cross_entropy(&pred, &[2]).unwrap_err();
        assert_eq!(err, Error::LabelOutOfRange { index: 0, label: 2, num_classes: 2 });
    }

    #[test]
    fn test_cross_entropy_rejects_label_count_mismatch() {
        let pred = array![[0.5, 0.5], [0.5, 0.5]];
        assert!(cross_entropy(&pred, &[0]).is_err());
    }
}
