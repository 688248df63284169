//! Constrained single-objective ordering
//!
//! Fitness layout: `[objective, ec_0 .. ec_{nec-1}, ic_0 .. ic_{nic-1}]`.
//! An equality constraint is satisfied when its absolute value is within
//! tolerance, an inequality constraint when its value does not exceed the
//! tolerance.

use std::cmp::Ordering;

use crate::error::{PelagoError, PelagoResult};

fn violations(f: &[f64], nec: usize, tol: &[f64]) -> (usize, f64) {
    let mut count = 0usize;
    let mut norm = 0.0f64;
    for (j, c) in f[1..].iter().enumerate() {
        let excess = if j < nec {
            c.abs() - tol[j]
        } else {
            c - tol[j]
        };
        if excess > 0.0 {
            count += 1;
            norm += excess * excess;
        }
    }
    (count, norm.sqrt())
}

/// Sort a constrained single-objective population.
///
/// Returns the indices of `fs` from best to worst: feasible individuals
/// first, ordered by objective; infeasible individuals after, ordered by
/// number of violated constraints, then by the norm of the violations, then
/// by objective. The sort is stable.
///
/// # Errors
///
/// Fails with [`PelagoError::DimensionMismatch`] when a fitness vector does
/// not have `1 + tol.len()` components or `nec > tol.len()`.
pub fn sort_population_con(
    fs: &[Vec<f64>],
    nec: usize,
    tol: &[f64],
) -> PelagoResult<Vec<usize>> {
    let nc = tol.len();
    if nec > nc {
        return Err(PelagoError::DimensionMismatch {
            expected: nc,
            actual: nec,
        });
    }
    for f in fs {
        if f.len() != 1 + nc {
            return Err(PelagoError::DimensionMismatch {
                expected: 1 + nc,
                actual: f.len(),
            });
        }
    }
    let keys: Vec<(usize, f64, f64)> = fs
        .iter()
        .map(|f| {
            let (count, norm) = violations(f, nec, tol);
            (count, norm, f[0])
        })
        .collect();
    let mut order: Vec<usize> = (0..fs.len()).collect();
    order.sort_by(|&a, &b| {
        let (ca, na, fa) = keys[a];
        let (cb, nb, fb) = keys[b];
        match (ca == 0, cb == 0) {
            (true, true) => fa.partial_cmp(&fb).unwrap_or(Ordering::Equal),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => ca
                .cmp(&cb)
                .then_with(|| na.partial_cmp(&nb).unwrap_or(Ordering::Equal))
                .then_with(|| fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)),
        }
    });
    Ok(order)
}
