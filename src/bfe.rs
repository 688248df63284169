//! Batch fitness evaluation
//!
//! A batch fitness evaluator (BFE) maps many decision vectors to their
//! fitness vectors in one call. Islands and populations use a BFE when one
//! is supplied; problems may also expose their own vectorised path through
//! [`UserDefinedProblem::batch_fitness`](crate::problem::UserDefinedProblem::batch_fitness).

use std::any::Any;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{PelagoError, PelagoResult};
use crate::problem::Problem;

/// Interface for user-supplied batch evaluators
pub trait UserDefinedBfe: Send + Sync {
    /// Evaluate every decision vector in `xs` under `prob`
    fn call(&self, prob: &Problem, xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>>;

    /// Human-readable evaluator name
    fn name(&self) -> String {
        "unnamed bfe".to_string()
    }
}

trait DynBfe: UserDefinedBfe {
    fn clone_boxed(&self) -> Box<dyn DynBfe>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynBfe for T
where
    T: UserDefinedBfe + Clone + Any,
{
    fn clone_boxed(&self) -> Box<dyn DynBfe> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased batch-evaluator handle
///
/// Validates input and output dimensions around the wrapped evaluator.
pub struct Bfe {
    inner: Box<dyn DynBfe>,
}

impl Bfe {
    /// Wrap a user batch evaluator
    pub fn new(udbfe: impl UserDefinedBfe + Clone + Any) -> Self {
        Self {
            inner: Box::new(udbfe),
        }
    }

    /// Evaluate every decision vector in `xs` under `prob`
    pub fn call(&self, prob: &Problem, xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>> {
        for x in xs {
            if x.len() != prob.nx() {
                return Err(PelagoError::DimensionMismatch {
                    expected: prob.nx(),
                    actual: x.len(),
                });
            }
        }
        let fs = self.inner.call(prob, xs)?;
        if fs.len() != xs.len() {
            return Err(PelagoError::DimensionMismatch {
                expected: xs.len(),
                actual: fs.len(),
            });
        }
        for f in &fs {
            if f.len() != prob.nf() {
                return Err(PelagoError::DimensionMismatch {
                    expected: prob.nf(),
                    actual: f.len(),
                });
            }
        }
        Ok(fs)
    }

    /// Evaluator name
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Borrow the wrapped evaluator, if it is of type `T`
    pub fn extract<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Clone for Bfe {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
        }
    }
}

impl fmt::Debug for Bfe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bfe").field("name", &self.name()).finish()
    }
}

impl Default for Bfe {
    fn default() -> Self {
        Self::new(ThreadBfe)
    }
}

/// Delegates to the problem's own batch fitness implementation
///
/// Fails with [`PelagoError::InvalidOperation`] when the problem does not
/// provide one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemberBfe;

impl UserDefinedBfe for MemberBfe {
    fn call(&self, prob: &Problem, xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>> {
        prob.batch_fitness(xs)
    }

    fn name(&self) -> String {
        "Member bfe".to_string()
    }
}

/// Evaluates decision vectors with data parallelism (requires the
/// `parallel` feature; falls back to a sequential loop without it)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThreadBfe;

#[cfg(feature = "parallel")]
impl UserDefinedBfe for ThreadBfe {
    fn call(&self, prob: &Problem, xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>> {
        xs.par_iter().map(|x| prob.fitness(x)).collect()
    }

    fn name(&self) -> String {
        "Thread bfe".to_string()
    }
}

#[cfg(not(feature = "parallel"))]
impl UserDefinedBfe for ThreadBfe {
    fn call(&self, prob: &Problem, xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>> {
        xs.iter().map(|x| prob.fitness(x)).collect()
    }

    fn name(&self) -> String {
        "Thread bfe".to_string()
    }
}

pub mod prelude {
    pub use super::{Bfe, MemberBfe, ThreadBfe, UserDefinedBfe};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::benchmarks::Sphere;

    #[test]
    fn test_thread_bfe_matches_scalar_path() {
        let prob = Problem::new(Sphere::new(2)).unwrap();
        let xs = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![3.0, 4.0]];
        let fs = Bfe::new(ThreadBfe).call(&prob, &xs).unwrap();
        assert_eq!(fs, vec![vec![0.0], vec![2.0], vec![25.0]]);
    }

    #[test]
    fn test_member_bfe_requires_batch_path() {
        let prob = Problem::new(Sphere::new(2)).unwrap();
        let err = Bfe::new(MemberBfe).call(&prob, &[vec![0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, PelagoError::InvalidOperation(_)));
    }

    #[test]
    fn test_bfe_validates_input_dimension() {
        let prob = Problem::new(Sphere::new(2)).unwrap();
        let err = Bfe::default().call(&prob, &[vec![0.0]]).unwrap_err();
        assert!(matches!(err, PelagoError::DimensionMismatch { .. }));
    }
}
