//! Benchmark problems
//!
//! Small standard test functions used throughout the test suite and handy
//! as smoke tests for user algorithms.

use crate::error::PelagoResult;
use crate::problem::UserDefinedProblem;

/// Sphere function: `f(x) = sum(x_i^2)` on `[-5, 5]^dim`
///
/// Single-objective, unconstrained, with an exact gradient. The global
/// minimum is the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sphere {
    dim: usize,
}

impl Sphere {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl UserDefinedProblem for Sphere {
    fn fitness(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
        Ok(vec![x.iter().map(|v| v * v).sum()])
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![-5.0; self.dim], vec![5.0; self.dim])
    }

    fn has_gradient(&self) -> bool {
        true
    }

    fn gradient(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
        Ok(x.iter().map(|v| 2.0 * v).collect())
    }

    fn name(&self) -> String {
        "Sphere".to_string()
    }

    fn extra_info(&self) -> String {
        format!("dimension: {}", self.dim)
    }
}

/// Rastrigin function on `[-5.12, 5.12]^dim`
///
/// `f(x) = 10 dim + sum(x_i^2 - 10 cos(2 pi x_i))`. Highly multimodal, the
/// global minimum is the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rastrigin {
    dim: usize,
}

impl Rastrigin {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl UserDefinedProblem for Rastrigin {
    fn fitness(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
        let sum: f64 = x
            .iter()
            .map(|v| v * v - 10.0 * (2.0 * std::f64::consts::PI * v).cos())
            .sum();
        Ok(vec![10.0 * x.len() as f64 + sum])
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![-5.12; self.dim], vec![5.12; self.dim])
    }

    fn name(&self) -> String {
        "Rastrigin".to_string()
    }

    fn extra_info(&self) -> String {
        format!("dimension: {}", self.dim)
    }
}
