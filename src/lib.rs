//! # pelago
//!
//! The concurrency and migration core of a parallel metaheuristic
//! optimization framework.
//!
//! An [`Archipelago`](archipelago::Archipelago) owns a collection of
//! [`Island`](island::Island)s, each an asynchronous evolutionary worker
//! carrying a [`Population`](population::population::Population), an
//! [`Algorithm`](algorithm::Algorithm) and a user-defined execution
//! strategy. Islands periodically exchange individuals along a directed
//! weighted [`Topology`](topology::Topology): before each evolution an
//! island pulls migrants published by its neighbours, and after each
//! evolution it publishes its own best individual to the archipelago's
//! migrant database.
//!
//! ## Features
//!
//! - **Plug-in architecture**: problems, algorithms, island strategies,
//!   batch evaluators and topologies are type-erased value handles around
//!   user implementations
//! - **Asynchronous evolution**: per-island task queues with a dedicated
//!   worker thread, FIFO ordering and per-island error capture
//! - **Migration**: weighted topologies, per-individual migration draws,
//!   configurable merge policy
//! - **State persistence**: numeric snapshots of populations, migrants and
//!   topology edges, saved as JSON or binary
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use pelago::prelude::*;
//!
//! fn main() -> PelagoResult<()> {
//!     let archi = Archipelago::builder()
//!         .islands(8)
//!         .algorithm(Algorithm::new(GradientDescent::default()))
//!         .problem(Problem::new(Sphere::new(10))?)
//!         .pop_size(20)
//!         .seed(42)
//!         .topology(Topology::new(Ring::default()))
//!         .build()?;
//!
//!     archi.evolve(100);
//!     archi.wait_check()?;
//!
//!     for f in archi.get_champions_f()? {
//!         println!("champion fitness: {:.6}", f[0]);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module overview
//!
//! - [`archipelago`]: the island container, migration coordination and the
//!   [`ArchipelagoBuilder`](archipelago::ArchipelagoBuilder)
//! - [`island`]: asynchronous islands, the task queue and user-defined
//!   island strategies
//! - [`population`]: populations and the migrant exchange type
//! - [`problem`] / [`algorithm`] / [`bfe`]: the evaluator, evolver and
//!   batch-evaluator handles
//! - [`topology`]: migration graphs
//! - [`checkpoint`]: state snapshots and persistence
//! - [`utils`]: constrained and multi-objective population orderings
//! - [`rng`]: the process-wide seed source

pub mod algorithm;
pub mod archipelago;
pub mod bfe;
pub mod checkpoint;
pub mod error;
pub mod island;
pub mod population;
pub mod problem;
pub mod rng;
pub mod topology;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithm::prelude::*;
    pub use crate::archipelago::prelude::*;
    pub use crate::bfe::prelude::*;
    pub use crate::checkpoint::prelude::*;
    pub use crate::error::*;
    pub use crate::island::prelude::*;
    pub use crate::population::prelude::*;
    pub use crate::problem::prelude::*;
    pub use crate::topology::prelude::*;
    pub use crate::utils::prelude::*;
}
