//! User-defined islands
//!
//! A user-defined island (UDI) decides where and how an evolution runs: on
//! the island's worker thread, on a pool, in another process. The island
//! hands it an [`EvolveContext`] holding the snapshots staged for this step
//! and installs whatever the UDI returns.

use std::any::Any;
use std::fmt;

use crate::algorithm::Algorithm;
use crate::bfe::Bfe;
use crate::error::PelagoResult;
use crate::population::population::Population;
use crate::problem::Problem;

/// Snapshots staged for one evolve step.
///
/// The population already contains any migrants merged for this step.
/// Mutating the originals through the context is impossible; the UDI
/// returns the evolved state instead.
pub struct EvolveContext {
    algorithm: Algorithm,
    population: Population,
    bfe: Option<Bfe>,
}

impl EvolveContext {
    pub(crate) fn new(algorithm: Algorithm, population: Population, bfe: Option<Bfe>) -> Self {
        Self {
            algorithm,
            population,
            bfe,
        }
    }

    /// The island's algorithm at the start of the step
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// The island's population at the start of the step, migrants included
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The problem the population is bound to
    pub fn problem(&self) -> &Problem {
        self.population.problem()
    }

    /// The island's batch evaluator, when one was supplied
    pub fn bfe(&self) -> Option<&Bfe> {
        self.bfe.as_ref()
    }
}

/// Interface for user-defined islands
pub trait UserDefinedIsland: Send + Sync {
    /// Run one evolution and return the evolved (algorithm, population).
    ///
    /// Must be safe to invoke repeatedly.
    fn run_evolve(&self, ctx: &EvolveContext) -> PelagoResult<(Algorithm, Population)>;

    /// Human-readable island name
    fn name(&self) -> String {
        "unnamed island".to_string()
    }

    /// Extra human-readable details
    fn extra_info(&self) -> String {
        String::new()
    }
}

trait DynUdi: UserDefinedIsland {
    fn clone_boxed(&self) -> Box<dyn DynUdi>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynUdi for T
where
    T: UserDefinedIsland + Clone + Any,
{
    fn clone_boxed(&self) -> Box<dyn DynUdi> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased UDI handle
pub struct UdIsland {
    inner: Box<dyn DynUdi>,
}

impl UdIsland {
    /// Wrap a user-defined island
    pub fn new(udi: impl UserDefinedIsland + Clone + Any) -> Self {
        Self {
            inner: Box::new(udi),
        }
    }

    /// Run one evolution
    pub fn run_evolve(&self, ctx: &EvolveContext) -> PelagoResult<(Algorithm, Population)> {
        self.inner.run_evolve(ctx)
    }

    /// Island name
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Extra human-readable details
    pub fn extra_info(&self) -> String {
        self.inner.extra_info()
    }

    /// Borrow the wrapped UDI, if it is of type `T`
    pub fn extract<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Clone for UdIsland {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
        }
    }
}

impl fmt::Debug for UdIsland {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdIsland").field("name", &self.name()).finish()
    }
}

impl Default for UdIsland {
    fn default() -> Self {
        Self::new(ThreadIsland)
    }
}

/// Default UDI: runs the algorithm directly on the island's worker thread
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThreadIsland;

impl UserDefinedIsland for ThreadIsland {
    fn run_evolve(&self, ctx: &EvolveContext) -> PelagoResult<(Algorithm, Population)> {
        let evolved = ctx.algorithm().evolve(ctx.population().clone())?;
        Ok((ctx.algorithm().clone(), evolved))
    }

    fn name(&self) -> String {
        "Thread island".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::NullAlgorithm;
    use crate::problem::benchmarks::Sphere;

    #[test]
    fn test_thread_island_runs_algorithm() {
        let prob = Problem::new(Sphere::new(2)).unwrap();
        let pop = Population::new(prob, 3, 42).unwrap();
        let ctx = EvolveContext::new(Algorithm::new(NullAlgorithm), pop.clone(), None);
        let (algo, evolved) = UdIsland::default().run_evolve(&ctx).unwrap();
        assert_eq!(algo.name(), "Null algorithm");
        assert_eq!(evolved.xs(), pop.xs());
        assert_eq!(evolved.ids(), pop.ids());
    }

    #[test]
    fn test_context_exposes_problem() {
        let prob = Problem::new(Sphere::new(4)).unwrap();
        let pop = Population::new(prob, 1, 0).unwrap();
        let ctx = EvolveContext::new(Algorithm::default(), pop, None);
        assert_eq!(ctx.problem().nx(), 4);
        assert!(ctx.bfe().is_none());
    }
}
