//! Problem abstraction
//!
//! A problem is an opaque evaluator: it maps a decision vector to a fitness
//! vector and reports the dimensions of both. User problems implement
//! [`UserDefinedProblem`] and are stored type-erased inside the [`Problem`]
//! handle, which validates dimensions at every boundary crossing.
//!
//! A fitness vector packs, in order: `nobj` objectives, `nec` equality
//! constraints and `nic` inequality constraints, so its length is
//! `nobj + nec + nic`. All objectives are minimised; equality constraints
//! are satisfied at zero, inequality constraints when non-positive.

pub mod benchmarks;

use std::any::Any;
use std::fmt;

use crate::error::{PelagoError, PelagoResult};

/// Interface for user-supplied optimization problems.
///
/// Implementors only need `fitness` and `bounds`; every other capability has
/// a conservative default. Problems must be cheap to clone and safe to call
/// from multiple threads at once.
pub trait UserDefinedProblem: Send + Sync {
    /// Evaluate the fitness vector of a decision vector.
    ///
    /// The input length is guaranteed to match the problem dimension by the
    /// time this is called through a [`Problem`] handle.
    fn fitness(&self, x: &[f64]) -> PelagoResult<Vec<f64>>;

    /// Lower and upper bounds of the decision space, one pair per dimension
    fn bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Number of objectives
    fn nobj(&self) -> usize {
        1
    }

    /// Number of equality constraints
    fn nec(&self) -> usize {
        0
    }

    /// Number of inequality constraints
    fn nic(&self) -> usize {
        0
    }

    /// Number of trailing integer dimensions in the decision vector
    fn nix(&self) -> usize {
        0
    }

    /// Whether [`UserDefinedProblem::batch_fitness`] is implemented
    fn has_batch_fitness(&self) -> bool {
        false
    }

    /// Evaluate many decision vectors at once
    fn batch_fitness(&self, _xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>> {
        Err(PelagoError::invalid_op(format!(
            "problem '{}' does not implement batch fitness evaluation",
            self.name()
        )))
    }

    /// Whether [`UserDefinedProblem::gradient`] is implemented
    fn has_gradient(&self) -> bool {
        false
    }

    /// Gradient of the fitness with respect to the decision vector
    fn gradient(&self, _x: &[f64]) -> PelagoResult<Vec<f64>> {
        Err(PelagoError::invalid_op(format!(
            "problem '{}' does not implement gradients",
            self.name()
        )))
    }

    /// Whether [`UserDefinedProblem::hessians`] is implemented
    fn has_hessians(&self) -> bool {
        false
    }

    /// Hessians of the fitness components
    fn hessians(&self, _x: &[f64]) -> PelagoResult<Vec<Vec<f64>>> {
        Err(PelagoError::invalid_op(format!(
            "problem '{}' does not implement hessians",
            self.name()
        )))
    }

    /// Human-readable problem name
    fn name(&self) -> String {
        "unnamed problem".to_string()
    }

    /// Extra human-readable details
    fn extra_info(&self) -> String {
        String::new()
    }
}

/// Object-safe capability table behind the [`Problem`] handle.
///
/// Cloning and downcasting are part of the table so the handle can be a
/// value type.
trait DynProblem: UserDefinedProblem {
    fn clone_boxed(&self) -> Box<dyn DynProblem>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynProblem for T
where
    T: UserDefinedProblem + Clone + Any,
{
    fn clone_boxed(&self) -> Box<dyn DynProblem> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased problem handle
///
/// Wraps a [`UserDefinedProblem`], caches its dimensions and enforces the
/// dimension contracts on every fitness call. Construction validates the
/// user problem once; a handle that exists is always internally consistent.
pub struct Problem {
    inner: Box<dyn DynProblem>,
    nx: usize,
    nf: usize,
}

impl Problem {
    /// Construct a handle from a user problem, validating its reported shape.
    ///
    /// # Errors
    ///
    /// Returns [`PelagoError::ContractViolation`] when the bounds are empty,
    /// of unequal length, non-finite or inverted, when `nobj` is zero, when
    /// the integer dimension exceeds the total dimension or when an integer
    /// dimension has non-integral bounds.
    pub fn new(udp: impl UserDefinedProblem + Clone + Any) -> PelagoResult<Self> {
        let (lb, ub) = udp.bounds();
        if lb.is_empty() {
            return Err(PelagoError::contract("problem bounds must not be empty"));
        }
        if lb.len() != ub.len() {
            return Err(PelagoError::contract(format!(
                "lower bounds have length {}, upper bounds {}",
                lb.len(),
                ub.len()
            )));
        }
        for (i, (l, u)) in lb.iter().zip(ub.iter()).enumerate() {
            if !l.is_finite() || !u.is_finite() {
                return Err(PelagoError::contract(format!(
                    "bounds of dimension {i} are not finite"
                )));
            }
            if l > u {
                return Err(PelagoError::contract(format!(
                    "lower bound {l} of dimension {i} exceeds upper bound {u}"
                )));
            }
        }
        if udp.nobj() == 0 {
            return Err(PelagoError::contract(
                "a problem must have at least one objective",
            ));
        }
        let nx = lb.len();
        let nix = udp.nix();
        if nix > nx {
            return Err(PelagoError::contract(format!(
                "integer dimension {nix} exceeds problem dimension {nx}"
            )));
        }
        for i in nx - nix..nx {
            if lb[i].fract() != 0.0 || ub[i].fract() != 0.0 {
                return Err(PelagoError::contract(format!(
                    "bounds of integer dimension {i} must be integral"
                )));
            }
        }
        let nf = udp.nobj() + udp.nec() + udp.nic();
        Ok(Self {
            inner: Box::new(udp),
            nx,
            nf,
        })
    }

    /// Evaluate a decision vector, enforcing both dimension contracts.
    pub fn fitness(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
        if x.len() != self.nx {
            return Err(PelagoError::DimensionMismatch {
                expected: self.nx,
                actual: x.len(),
            });
        }
        let f = self.inner.fitness(x)?;
        if f.len() != self.nf {
            return Err(PelagoError::DimensionMismatch {
                expected: self.nf,
                actual: f.len(),
            });
        }
        Ok(f)
    }

    /// Evaluate many decision vectors through the problem's own batch path.
    ///
    /// Fails with [`PelagoError::InvalidOperation`] when the problem does not
    /// implement batch evaluation; use a
    /// [`ThreadBfe`](crate::bfe::ThreadBfe) in that case.
    pub fn batch_fitness(&self, xs: &[Vec<f64>]) -> PelagoResult<Vec<Vec<f64>>> {
        for x in xs {
            if x.len() != self.nx {
                return Err(PelagoError::DimensionMismatch {
                    expected: self.nx,
                    actual: x.len(),
                });
            }
        }
        let fs = self.inner.batch_fitness(xs)?;
        if fs.len() != xs.len() {
            return Err(PelagoError::DimensionMismatch {
                expected: xs.len(),
                actual: fs.len(),
            });
        }
        for f in &fs {
            if f.len() != self.nf {
                return Err(PelagoError::DimensionMismatch {
                    expected: self.nf,
                    actual: f.len(),
                });
            }
        }
        Ok(fs)
    }

    /// Gradient of the fitness at `x`
    pub fn gradient(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
        if x.len() != self.nx {
            return Err(PelagoError::DimensionMismatch {
                expected: self.nx,
                actual: x.len(),
            });
        }
        self.inner.gradient(x)
    }

    /// Hessians of the fitness components at `x`
    pub fn hessians(&self, x: &[f64]) -> PelagoResult<Vec<Vec<f64>>> {
        if x.len() != self.nx {
            return Err(PelagoError::DimensionMismatch {
                expected: self.nx,
                actual: x.len(),
            });
        }
        self.inner.hessians(x)
    }

    /// Decision vector dimension
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Fitness vector dimension (`nobj + nec + nic`)
    pub fn nf(&self) -> usize {
        self.nf
    }

    /// Number of objectives
    pub fn nobj(&self) -> usize {
        self.inner.nobj()
    }

    /// Number of equality constraints
    pub fn nec(&self) -> usize {
        self.inner.nec()
    }

    /// Number of inequality constraints
    pub fn nic(&self) -> usize {
        self.inner.nic()
    }

    /// Total number of constraints
    pub fn nc(&self) -> usize {
        self.inner.nec() + self.inner.nic()
    }

    /// Number of trailing integer dimensions
    pub fn nix(&self) -> usize {
        self.inner.nix()
    }

    /// Decision-space bounds
    pub fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        self.inner.bounds()
    }

    /// Whether the problem implements batch fitness evaluation
    pub fn has_batch_fitness(&self) -> bool {
        self.inner.has_batch_fitness()
    }

    /// Whether the problem implements gradients
    pub fn has_gradient(&self) -> bool {
        self.inner.has_gradient()
    }

    /// Whether the problem implements hessians
    pub fn has_hessians(&self) -> bool {
        self.inner.has_hessians()
    }

    /// Problem name
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Extra human-readable details
    pub fn extra_info(&self) -> String {
        self.inner.extra_info()
    }

    /// Borrow the wrapped user problem, if it is of type `T`
    pub fn extract<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Clone for Problem {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            nx: self.nx,
            nf: self.nf,
        }
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("name", &self.name())
            .field("nx", &self.nx)
            .field("nf", &self.nf)
            .finish()
    }
}

impl Default for Problem {
    fn default() -> Self {
        // NullProblem always passes validation.
        Self::new(NullProblem).expect("null problem is valid")
    }
}

/// Placeholder problem: one dimension on `[0, 1]`, constant zero fitness
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullProblem;

impl UserDefinedProblem for NullProblem {
    fn fitness(&self, _x: &[f64]) -> PelagoResult<Vec<f64>> {
        Ok(vec![0.0])
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![0.0], vec![1.0])
    }

    fn name(&self) -> String {
        "Null problem".to_string()
    }
}

pub mod prelude {
    pub use super::benchmarks::*;
    pub use super::{NullProblem, Problem, UserDefinedProblem};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct BadBounds;

    impl UserDefinedProblem for BadBounds {
        fn fitness(&self, _x: &[f64]) -> PelagoResult<Vec<f64>> {
            Ok(vec![0.0])
        }

        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![1.0, 0.0], vec![0.0, 1.0])
        }
    }

    #[derive(Clone)]
    struct WrongFitnessLen;

    impl UserDefinedProblem for WrongFitnessLen {
        fn fitness(&self, _x: &[f64]) -> PelagoResult<Vec<f64>> {
            Ok(vec![0.0, 1.0])
        }

        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![0.0], vec![1.0])
        }
    }

    #[test]
    fn test_null_problem_dimensions() {
        let p = Problem::default();
        assert_eq!(p.nx(), 1);
        assert_eq!(p.nf(), 1);
        assert_eq!(p.nobj(), 1);
        assert_eq!(p.nc(), 0);
        assert_eq!(p.name(), "Null problem");
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(matches!(
            Problem::new(BadBounds),
            Err(PelagoError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_fitness_dimension_enforced() {
        let p = Problem::new(WrongFitnessLen).unwrap();
        assert!(matches!(
            p.fitness(&[0.5]),
            Err(PelagoError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));
        assert!(matches!(
            p.fitness(&[0.5, 0.5]),
            Err(PelagoError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_extract_roundtrip() {
        let p = Problem::default();
        assert!(p.extract::<NullProblem>().is_some());
        assert!(p.extract::<BadBounds>().is_none());
    }

    #[test]
    fn test_batch_fitness_unimplemented() {
        let p = Problem::default();
        assert!(matches!(
            p.batch_fitness(&[vec![0.5]]),
            Err(PelagoError::InvalidOperation(_))
        ));
        assert!(!p.has_batch_fitness());
    }
}
