use ndarray::Array4;

use crate::error::{Error, Result};

fn check_even_spatial(x: &Array4<f64>, context: &'static str) -> Result<(usize, usize, usize, usize)> {
    let (n, h, w, c) = x.dim();
    if h % 2 != 0 || w % 2 != 0 {
        return Err(Error::ShapeMismatch {
            context,
            expected: vec![n, h + h % 2, w + w % 2, c],
            actual: vec![n, h, w, c],
        });
    }
    Ok((n, h, w, c))
}

/// 2x2 max pooling, stride 2, no padding.
///
/// Partitions each channel plane into disjoint 2x2 blocks and keeps the
/// block maximum. Input height and width must both be even; odd
/// dimensions are rejected rather than truncated.
pub fn maxpool2x2(x: &Array4<f64>) -> Result<Array4<f64>> {
    let (n, h, w, c) = check_even_spatial(x, "maxpool2x2 input (height and width must be even)")?;

    let mut out = Array4::zeros((n, h / 2, w / 2, c));
    for sample in 0..n {
        for i in (0..h).step_by(2) {
            for j in (0..w).step_by(2) {
                for ch in 0..c {
                    let mut max = f64::NEG_INFINITY;
                    for u in 0..2 {
                        for v in 0..2 {
                            max = max.max(x[[sample, i + u, j + v, ch]]);
                        }
                    }
                    out[[sample, i / 2, j / 2, ch]] = max;
                }
            }
        }
    }
    Ok(out)
}

/// Backward pass of 2x2 max pooling.
///
/// `x` must be the same pre-pool tensor the matching forward call saw;
/// each block's max is recomputed from it and the upstream gradient is
/// routed to every position equal to that max. On ties the full upstream
/// value is duplicated to each tied position, never split.
pub fn maxpool2x2_backward(d_out: &Array4<f64>, x: &Array4<f64>) -> Result<Array4<f64>> {
    let (n, h, w, c) = check_even_spatial(x, "maxpool2x2_backward reference (height and width must be even)")?;
    let (dn, dh, dw, dc) = d_out.dim();
    if (dn, dh, dw, dc) != (n, h / 2, w / 2, c) {
        return Err(Error::ShapeMismatch {
            context: "maxpool2x2_backward upstream gradient",
            expected: vec![n, h / 2, w / 2, c],
            actual: vec![dn, dh, dw, dc],
        });
    }

    let mut dx = Array4::zeros(x.raw_dim());
    for sample in 0..n {
        for i in (0..h).step_by(2) {
            for j in (0..w).step_by(2) {
                for ch in 0..c {
                    let g = d_out[[sample, i / 2, j / 2, ch]];
                    let mut max = f64::NEG_INFINITY;
                    for u in 0..2 {
                        for v in 0..2 {
                            max = max.max(x[[sample, i + u, j + v, ch]]);
                        }
                    }
                    // Exact comparison is intentional: every position tied
                    // at the max receives the full upstream value.
                    for u in 0..2 {
                        for v in 0..2 {
                            if x[[sample, i + u, j + v, ch]] == max {
                                dx[[sample, i + u, j + v, ch]] += g;
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(dx)
}
