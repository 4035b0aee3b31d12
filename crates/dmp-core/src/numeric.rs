use crate::{DmpError, DmpResult};
use nalgebra::{DMatrix, DVector};

/// Scalar type of every state, time and parameter.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> DmpResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DmpError::NonFinite { what, value: v })
    }
}

/// Reject values that are not strictly positive (time constants, decay rates).
pub fn ensure_positive(v: Real, what: &'static str) -> DmpResult<Real> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(DmpError::invalid_parameter(format!(
            "{what} must be positive, got {v}"
        )))
    }
}

/// Fail with `InvalidState` unless `v` has exactly `expected` entries.
pub fn ensure_len(v: &DVector<Real>, expected: usize, what: &str) -> DmpResult<()> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(DmpError::invalid_state(format!(
            "{what} has length {}, expected {expected}",
            v.len()
        )))
    }
}

/// Times passed to analytical solutions must be non-negative and non-decreasing.
pub fn ensure_time_sequence(ts: &DVector<Real>) -> DmpResult<()> {
    let mut prev = 0.0;
    for (i, &t) in ts.iter().enumerate() {
        ensure_finite(t, "time")?;
        if t < 0.0 {
            return Err(DmpError::invalid_parameter(format!(
                "time at index {i} is negative ({t})"
            )));
        }
        if i > 0 && t < prev {
            return Err(DmpError::invalid_parameter(format!(
                "times must be non-decreasing (index {i}: {t} < {prev})"
            )));
        }
        prev = t;
    }
    Ok(())
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: Real, end: Real, n: usize) -> DVector<Real> {
    match n {
        0 => DVector::zeros(0),
        1 => DVector::from_element(1, start),
        _ => {
            let step = (end - start) / (n - 1) as Real;
            DVector::from_fn(n, |i, _| {
                if i == n - 1 {
                    end
                } else {
                    start + step * i as Real
                }
            })
        }
    }
}

/// Largest absolute element-wise difference between two equally shaped matrices.
///
/// Returns `Real::INFINITY` when shapes differ so that comparisons against a
/// tolerance fail instead of panicking.
pub fn max_abs_diff(a: &DMatrix<Real>, b: &DMatrix<Real>) -> Real {
    if a.shape() != b.shape() {
        return Real::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, Real::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_name_their_source() {
        assert_eq!(ensure_finite(2.5, "alpha"), Ok(2.5));
        for v in [Real::NAN, Real::INFINITY, Real::NEG_INFINITY] {
            match ensure_finite(v, "alpha") {
                Err(DmpError::NonFinite { what, value }) => {
                    assert_eq!(what, "alpha");
                    assert!(value.is_nan() || value.is_infinite());
                }
                other => panic!("expected NonFinite, got {other:?}"),
            }
        }
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(0.5, "tau").is_ok());
        assert!(matches!(
            ensure_positive(0.0, "tau"),
            Err(DmpError::InvalidParameter { .. })
        ));
        assert!(ensure_positive(-1.0, "alpha").is_err());
    }

    #[test]
    fn linspace_hits_both_ends() {
        let ts = linspace(0.0, 0.5, 51);
        assert_eq!(ts.len(), 51);
        assert_eq!(ts[0], 0.0);
        assert_eq!(ts[50], 0.5);
        assert!((ts[1] - 0.01).abs() < 1e-15);
    }

    #[test]
    fn time_sequence_validation() {
        assert!(ensure_time_sequence(&DVector::from_vec(vec![0.0, 0.1, 0.1, 0.3])).is_ok());
        assert!(ensure_time_sequence(&DVector::from_vec(vec![0.0, 0.2, 0.1])).is_err());
        assert!(ensure_time_sequence(&DVector::from_vec(vec![-0.1, 0.2])).is_err());
    }

    #[test]
    fn max_abs_diff_shape_mismatch_is_infinite() {
        let a = DMatrix::<Real>::zeros(2, 2);
        let b = DMatrix::<Real>::zeros(2, 3);
        assert!(max_abs_diff(&a, &b).is_infinite());
    }
}
