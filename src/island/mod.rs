//! Islands
//!
//! An island is one asynchronous evolutionary worker: it carries an
//! [`Algorithm`], a [`Population`], a user-defined island strategy and an
//! optional batch evaluator. `evolve(n)` enqueues n evolution tasks on the
//! island's private FIFO queue and returns immediately; a dedicated worker
//! thread runs them one at a time. Failures of user code are latched and
//! surface only through [`Island::wait_check`].
//!
//! When an island belongs to an archipelago it pulls migrants from its
//! topological neighbours before each evolution and publishes its own
//! emigrants afterwards.

pub mod udi;
mod worker;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::algorithm::Algorithm;
use crate::archipelago::{migration, ArchiCore};
use crate::bfe::Bfe;
use crate::error::{PelagoError, PelagoResult};
use crate::island::udi::{EvolveContext, ThreadIsland, UdIsland};
use crate::island::worker::TaskQueue;
use crate::population::population::Population;
use crate::problem::Problem;
use crate::rng;
use crate::utils::{lock, read, write};

static NEXT_ISLAND_ID: AtomicU64 = AtomicU64::new(1);

/// Coarse state of an island or archipelago
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvolveStatus {
    /// No task queued or executing, no unconsumed error
    Idle,
    /// At least one task queued or executing
    Busy,
    /// A task failed and the error has not been consumed by `wait_check`
    Error,
}

pub(crate) struct IslandShared {
    id: u64,
    algorithm: Mutex<Algorithm>,
    population: Mutex<Population>,
    bfe: Option<Bfe>,
    udi: UdIsland,
    // Earliest unconsumed task failure.
    error: Mutex<Option<PelagoError>>,
    // Non-owning back-reference to the archipelago this island belongs to.
    links: RwLock<Option<Weak<ArchiCore>>>,
}

impl IslandShared {
    fn upgrade_links(&self) -> Option<Arc<ArchiCore>> {
        read(&self.links).as_ref().and_then(Weak::upgrade)
    }
}

/// One asynchronous evolutionary worker
pub struct Island {
    shared: Arc<IslandShared>,
    queue: TaskQueue,
}

impl Island {
    /// Island with a random population of `size` individuals, evolving with
    /// the default [`ThreadIsland`] strategy.
    pub fn new(algorithm: Algorithm, problem: Problem, size: usize, seed: u64) -> PelagoResult<Self> {
        IslandBuilder::new()
            .algorithm(algorithm)
            .problem(problem)
            .pop_size(size)
            .seed(seed)
            .build()
    }

    /// Island around an existing population
    pub fn with_population(algorithm: Algorithm, population: Population) -> PelagoResult<Self> {
        IslandBuilder::new()
            .algorithm(algorithm)
            .population(population)
            .build()
    }

    /// Start building an island with optional UDI, batch evaluator and seed
    pub fn builder() -> IslandBuilder {
        IslandBuilder::new()
    }

    fn from_parts(
        udi: UdIsland,
        algorithm: Algorithm,
        population: Population,
        bfe: Option<Bfe>,
    ) -> PelagoResult<Self> {
        let shared = Arc::new(IslandShared {
            id: NEXT_ISLAND_ID.fetch_add(1, Ordering::Relaxed),
            algorithm: Mutex::new(algorithm),
            population: Mutex::new(population),
            bfe,
            udi,
            error: Mutex::new(None),
            links: RwLock::new(None),
        });
        let task_shared = Arc::clone(&shared);
        let queue = TaskQueue::spawn(move || evolve_step(&task_shared)).map_err(|e| {
            PelagoError::invalid_op(format!("failed to spawn the island worker thread: {e}"))
        })?;
        Ok(Self { shared, queue })
    }

    /// Enqueue `n` evolution tasks and return immediately
    pub fn evolve(&self, n: u32) {
        tracing::debug!(island = self.shared.id, tasks = n, "evolve requested");
        self.queue.enqueue(n as usize);
    }

    /// Coarse state of the island. `Error` dominates as long as a latched
    /// failure has not been consumed by [`Island::wait_check`].
    pub fn status(&self) -> EvolveStatus {
        if lock(&self.shared.error).is_some() {
            EvolveStatus::Error
        } else if self.queue.is_busy() {
            EvolveStatus::Busy
        } else {
            EvolveStatus::Idle
        }
    }

    /// Block until the task queue is drained. Never fails.
    pub fn wait(&self) {
        self.queue.wait();
    }

    /// Block until the task queue is drained, then consume and return the
    /// earliest latched error, if any.
    pub fn wait_check(&self) -> PelagoResult<()> {
        self.queue.wait();
        match lock(&self.shared.error).take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Deep copy of the island's algorithm, safe during evolution
    pub fn get_algorithm(&self) -> Algorithm {
        lock(&self.shared.algorithm).clone()
    }

    /// Deep copy of the island's population, safe during evolution
    pub fn get_population(&self) -> Population {
        lock(&self.shared.population).clone()
    }

    /// Deep copy of the problem the island's population is bound to
    pub fn get_problem(&self) -> Problem {
        lock(&self.shared.population).problem().clone()
    }

    /// Decision vector of the population's champion
    pub fn get_champion_x(&self) -> PelagoResult<Vec<f64>> {
        lock(&self.shared.population).champion_x()
    }

    /// Fitness vector of the population's champion
    pub fn get_champion_f(&self) -> PelagoResult<Vec<f64>> {
        lock(&self.shared.population).champion_f()
    }

    /// Name of the island's UDI
    pub fn get_name(&self) -> String {
        self.shared.udi.name()
    }

    /// Description of the island's moving parts
    pub fn get_extra_info(&self) -> String {
        let (algorithm, problem, size) = {
            let pop = lock(&self.shared.population);
            (
                lock(&self.shared.algorithm).name(),
                pop.problem().name(),
                pop.len(),
            )
        };
        format!(
            "algorithm: {algorithm}\nproblem: {problem}\npopulation size: {size}\n{}",
            self.shared.udi.extra_info()
        )
    }

    pub(crate) fn id(&self) -> u64 {
        self.shared.id
    }

    pub(crate) fn link(&self, core: &Arc<ArchiCore>) {
        *write(&self.shared.links) = Some(Arc::downgrade(core));
    }

    pub(crate) fn install_population(&self, population: Population) {
        *lock(&self.shared.population) = population;
    }
}

impl Clone for Island {
    /// Deep copy. Waits for the source island to finish its queued work
    /// first; the copy is standalone, idle and carries no latched error.
    fn clone(&self) -> Self {
        self.wait();
        Self::from_parts(
            self.shared.udi.clone(),
            self.get_algorithm(),
            self.get_population(),
            self.shared.bfe.clone(),
        )
        .expect("failed to spawn the worker thread of a cloned island")
    }
}

impl fmt::Debug for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Island")
            .field("name", &self.get_name())
            .field("status", &self.status())
            .finish()
    }
}

/// One evolution task. Any failure, panics included, is latched; the island
/// state is only updated on full success.
fn evolve_step(shared: &IslandShared) {
    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| run_one_evolve(shared))) {
        Ok(result) => result,
        Err(payload) => Err(PelagoError::user(panic_message(payload.as_ref()))),
    };
    if let Err(e) = outcome {
        tracing::debug!(island = shared.id, error = %e, "evolution task failed");
        let mut slot = lock(&shared.error);
        if slot.is_none() {
            *slot = Some(e);
        }
    }
}

fn run_one_evolve(shared: &IslandShared) -> PelagoResult<()> {
    let links = shared.upgrade_links();

    // Stage snapshots; the live state stays untouched until the step
    // succeeds as a whole.
    let algorithm = lock(&shared.algorithm).clone();
    let mut population = lock(&shared.population).clone();

    if let Some(core) = &links {
        let index = core.island_index(shared.id)?;
        let (nx, nf) = {
            let prob = population.problem();
            (prob.nx(), prob.nf())
        };
        let migrants = core.pull_migrants(index, nx, nf)?;
        if !migrants.is_empty() {
            tracing::trace!(island = shared.id, count = migrants.len(), "merging migrants");
            core.merge_migrants(&mut population, &migrants)?;
        }
    }

    let ctx = EvolveContext::new(algorithm, population, shared.bfe.clone());
    let (new_algorithm, new_population) = shared.udi.run_evolve(&ctx)?;

    {
        let current = lock(&shared.population);
        let prob = current.problem();
        if new_population.problem().nx() != prob.nx()
            || new_population.problem().nf() != prob.nf()
        {
            return Err(PelagoError::contract(
                "the evolved population is bound to a problem of different dimensions",
            ));
        }
    }
    *lock(&shared.algorithm) = new_algorithm;
    *lock(&shared.population) = new_population;

    if let Some(core) = &links {
        let index = core.island_index(shared.id)?;
        let emigrants = {
            let population = lock(&shared.population);
            migration::select_emigrants(&population)?
        };
        core.publish_migrants(index, emigrants)?;
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in user-supplied code".to_string()
    }
}

/// Builder covering every island constructor form
///
/// Either a problem (with `pop_size` and optionally `seed`) or a ready-made
/// population must be supplied, together with an algorithm. UDI and batch
/// evaluator are optional.
#[derive(Default)]
pub struct IslandBuilder {
    udi: Option<UdIsland>,
    algorithm: Option<Algorithm>,
    problem: Option<Problem>,
    bfe: Option<Bfe>,
    population: Option<Population>,
    pop_size: usize,
    seed: Option<u64>,
}

impl IslandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the island execution strategy (default: [`ThreadIsland`])
    pub fn udi(mut self, udi: UdIsland) -> Self {
        self.udi = Some(udi);
        self
    }

    /// Set the algorithm (required)
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the problem a random population will be built from
    pub fn problem(mut self, problem: Problem) -> Self {
        self.problem = Some(problem);
        self
    }

    /// Set the batch evaluator used for population construction and exposed
    /// to the UDI
    pub fn bfe(mut self, bfe: Bfe) -> Self {
        self.bfe = Some(bfe);
        self
    }

    /// Use an existing population instead of building a random one
    pub fn population(mut self, population: Population) -> Self {
        self.population = Some(population);
        self
    }

    /// Size of the random population built from the problem
    pub fn pop_size(mut self, size: usize) -> Self {
        self.pop_size = size;
        self
    }

    /// Seed of the random population (default: drawn from the process-wide
    /// seed source)
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the island
    pub fn build(self) -> PelagoResult<Island> {
        let algorithm = self
            .algorithm
            .ok_or_else(|| PelagoError::contract("an island requires an algorithm"))?;
        let population = match (self.population, self.problem) {
            (Some(_), Some(_)) => {
                return Err(PelagoError::contract(
                    "supply either a population or a problem, not both",
                ))
            }
            (Some(population), None) => population,
            (None, Some(problem)) => {
                let seed = self.seed.unwrap_or_else(rng::next_seed);
                match &self.bfe {
                    Some(bfe) => Population::new_with_bfe(problem, bfe, self.pop_size, seed)?,
                    None => Population::new(problem, self.pop_size, seed)?,
                }
            }
            (None, None) => {
                return Err(PelagoError::contract(
                    "an island requires a problem or a population",
                ))
            }
        };
        let udi = self.udi.unwrap_or_else(|| UdIsland::new(ThreadIsland));
        Island::from_parts(udi, algorithm, population, self.bfe)
    }
}

pub mod prelude {
    pub use super::udi::*;
    pub use super::{EvolveStatus, Island, IslandBuilder};
}
