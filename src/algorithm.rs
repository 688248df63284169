//! Algorithm abstraction
//!
//! An algorithm is an opaque population transformer: it receives a
//! [`Population`] by value and returns an evolved one. User algorithms
//! implement [`UserDefinedAlgorithm`] and are stored type-erased inside the
//! [`Algorithm`] handle.

use std::any::Any;
use std::fmt;

use crate::error::{PelagoError, PelagoResult};
use crate::population::population::Population;

/// Interface for user-supplied algorithms.
///
/// `evolve` takes the population by value and must not retain references to
/// it after returning. Algorithms must be cheap to clone and safe to call
/// from the island worker thread.
pub trait UserDefinedAlgorithm: Send + Sync {
    /// Evolve a population
    fn evolve(&self, pop: Population) -> PelagoResult<Population>;

    /// Human-readable algorithm name
    fn name(&self) -> String {
        "unnamed algorithm".to_string()
    }

    /// Extra human-readable details
    fn extra_info(&self) -> String {
        String::new()
    }
}

trait DynAlgorithm: UserDefinedAlgorithm {
    fn clone_boxed(&self) -> Box<dyn DynAlgorithm>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynAlgorithm for T
where
    T: UserDefinedAlgorithm + Clone + Any,
{
    fn clone_boxed(&self) -> Box<dyn DynAlgorithm> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased algorithm handle
pub struct Algorithm {
    inner: Box<dyn DynAlgorithm>,
}

impl Algorithm {
    /// Wrap a user algorithm
    pub fn new(uda: impl UserDefinedAlgorithm + Clone + Any) -> Self {
        Self {
            inner: Box::new(uda),
        }
    }

    /// Evolve a population
    pub fn evolve(&self, pop: Population) -> PelagoResult<Population> {
        self.inner.evolve(pop)
    }

    /// Algorithm name
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Extra human-readable details
    pub fn extra_info(&self) -> String {
        self.inner.extra_info()
    }

    /// Borrow the wrapped user algorithm, if it is of type `T`
    pub fn extract<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Clone for Algorithm {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
        }
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm").field("name", &self.name()).finish()
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::new(NullAlgorithm)
    }
}

/// Identity algorithm: returns the population unchanged
///
/// Useful as a placeholder and for exercising migration in isolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullAlgorithm;

impl UserDefinedAlgorithm for NullAlgorithm {
    fn evolve(&self, pop: Population) -> PelagoResult<Population> {
        Ok(pop)
    }

    fn name(&self) -> String {
        "Null algorithm".to_string()
    }
}

/// Plain gradient descent on problems exposing an exact gradient
///
/// Each call to `evolve` runs `iters` descent steps of length `step` on
/// every individual, clamping to the problem bounds, then re-evaluates.
/// Only defined for unconstrained single-objective problems.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientDescent {
    iters: usize,
    step: f64,
}

impl GradientDescent {
    pub fn new(iters: usize, step: f64) -> Self {
        Self { iters, step }
    }
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self {
            iters: 10,
            step: 0.1,
        }
    }
}

impl UserDefinedAlgorithm for GradientDescent {
    fn evolve(&self, mut pop: Population) -> PelagoResult<Population> {
        let prob = pop.problem().clone();
        if prob.nobj() > 1 || prob.nc() > 0 {
            return Err(PelagoError::invalid_op(
                "gradient descent requires an unconstrained single-objective problem",
            ));
        }
        if !prob.has_gradient() {
            return Err(PelagoError::invalid_op(format!(
                "problem '{}' does not expose a gradient",
                prob.name()
            )));
        }
        let (lb, ub) = prob.bounds();
        for i in 0..pop.len() {
            let mut x = pop.xs()[i].clone();
            for _ in 0..self.iters {
                let g = prob.gradient(&x)?;
                if g.len() != x.len() {
                    return Err(PelagoError::DimensionMismatch {
                        expected: x.len(),
                        actual: g.len(),
                    });
                }
                for j in 0..x.len() {
                    x[j] = (x[j] - self.step * g[j]).clamp(lb[j], ub[j]);
                }
            }
            pop.set_x(i, &x)?;
        }
        Ok(pop)
    }

    fn name(&self) -> String {
        "Gradient descent".to_string()
    }

    fn extra_info(&self) -> String {
        format!("iterations: {}, step: {}", self.iters, self.step)
    }
}

pub mod prelude {
    pub use super::{Algorithm, GradientDescent, NullAlgorithm, UserDefinedAlgorithm};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::benchmarks::Sphere;
    use crate::problem::Problem;

    #[test]
    fn test_null_algorithm_is_identity() {
        let pop = Population::new(Problem::new(Sphere::new(2)).unwrap(), 5, 42).unwrap();
        let before: Vec<_> = pop.xs().to_vec();
        let evolved = Algorithm::new(NullAlgorithm).evolve(pop).unwrap();
        assert_eq!(evolved.xs(), before.as_slice());
    }

    #[test]
    fn test_gradient_descent_improves_sphere() {
        let pop = Population::new(Problem::new(Sphere::new(3)).unwrap(), 6, 7).unwrap();
        let before = pop.champion_f().unwrap()[0];
        let evolved = Algorithm::new(GradientDescent::default()).evolve(pop).unwrap();
        let after = evolved.champion_f().unwrap()[0];
        assert!(after < before);
    }

    #[test]
    fn test_gradient_descent_needs_gradient() {
        let pop = Population::new(Problem::default(), 2, 0).unwrap();
        let err = Algorithm::new(GradientDescent::default())
            .evolve(pop)
            .unwrap_err();
        assert!(matches!(err, PelagoError::InvalidOperation(_)));
    }

    #[test]
    fn test_extract() {
        let algo = Algorithm::new(GradientDescent::new(5, 0.2));
        assert_eq!(
            algo.extract::<GradientDescent>(),
            Some(&GradientDescent::new(5, 0.2))
        );
        assert!(algo.extract::<NullAlgorithm>().is_none());
    }
}
