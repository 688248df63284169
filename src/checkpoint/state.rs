//! State snapshots
//!
//! Persisted state captures the numeric content of an archipelago: per
//! island the population sequences and seed, plus the migrant database and
//! the topology edges. User plug-ins (problems, algorithms, UDIs) are
//! recorded by name only and re-attached on restore, so they never need to
//! be serializable.

use serde::{Deserialize, Serialize};

use crate::archipelago::Archipelago;
use crate::error::{PelagoError, PelagoResult};
use crate::population::group::IndividualsGroup;
use crate::population::population::Population;
use crate::topology::{FreeTopology, Topology, UserDefinedTopology};

/// Current state schema version
pub const STATE_VERSION: u32 = 1;

/// Raw sequences of one population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationState {
    pub ids: Vec<u64>,
    pub xs: Vec<Vec<f64>>,
    pub fs: Vec<Vec<f64>>,
    pub seed: u64,
}

impl PopulationState {
    /// Snapshot a population's sequences
    pub fn capture(pop: &Population) -> Self {
        Self {
            ids: pop.ids().to_vec(),
            xs: pop.xs().to_vec(),
            fs: pop.fs().to_vec(),
            seed: pop.seed(),
        }
    }

    /// Rebuild a population bound to `problem` from this snapshot.
    ///
    /// Every sequence is validated against the problem dimensions.
    pub fn into_population(
        self,
        problem: crate::problem::Problem,
    ) -> PelagoResult<Population> {
        Population::from_parts(problem, self.ids, self.xs, self.fs, self.seed)
    }
}

/// State of one island
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IslandState {
    pub population: PopulationState,
    pub problem_name: String,
    pub algorithm_name: String,
    pub udi_name: String,
}

/// Full archipelago state: islands, migrant database, topology edges
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchipelagoState {
    pub version: u32,
    pub islands: Vec<IslandState>,
    pub migrants: Vec<IndividualsGroup>,
    pub topology: FreeTopology,
}

impl Archipelago {
    /// Snapshot the archipelago's numeric state.
    ///
    /// Taken under the proper locks; call after [`Archipelago::wait`] for a
    /// quiescent snapshot.
    pub fn state(&self) -> PelagoResult<ArchipelagoState> {
        let islands = self
            .iter()
            .map(|island| IslandState {
                population: PopulationState::capture(&island.get_population()),
                problem_name: island.get_problem().name(),
                algorithm_name: island.get_algorithm().name(),
                udi_name: island.get_name(),
            })
            .collect();
        Ok(ArchipelagoState {
            version: STATE_VERSION,
            islands,
            migrants: self.get_migrants_db(),
            topology: FreeTopology::from_topology(&self.get_topology())?,
        })
    }

    /// Load a snapshot into this archipelago.
    ///
    /// The archipelago must be structurally identical to the one the state
    /// was captured from: same island count, and per island a problem of
    /// matching dimensions. Live problem, algorithm and UDI handles are
    /// kept. Waits for ongoing evolutions to finish; everything is
    /// validated before anything is mutated, so on error the archipelago is
    /// untouched.
    pub fn restore(&mut self, state: ArchipelagoState) -> PelagoResult<()> {
        if state.version > STATE_VERSION {
            return Err(PelagoError::contract(format!(
                "state version {} is newer than the supported version {}",
                state.version, STATE_VERSION
            )));
        }
        if state.islands.len() != self.len() {
            return Err(PelagoError::contract(format!(
                "the state holds {} islands but the archipelago has {}",
                state.islands.len(),
                self.len()
            )));
        }
        if state.migrants.len() != self.len() {
            return Err(PelagoError::contract(format!(
                "the state holds {} migrant slots but the archipelago has {} islands",
                state.migrants.len(),
                self.len()
            )));
        }
        if state.topology.num_vertices() != self.len() {
            return Err(PelagoError::contract(format!(
                "the state topology has {} vertices but the archipelago has {} islands",
                state.topology.num_vertices(),
                self.len()
            )));
        }
        self.wait();

        // Validation pass: build every replacement population and check the
        // migrant slots before mutating anything.
        let mut populations = Vec::with_capacity(self.len());
        for (island, island_state) in self.iter().zip(&state.islands) {
            let problem = island.get_problem();
            populations.push(island_state.population.clone().into_population(problem)?);
        }
        for (island, group) in self.iter().zip(&state.migrants) {
            let problem = island.get_problem();
            for (_, x, f) in group.iter() {
                if x.len() != problem.nx() {
                    return Err(PelagoError::DimensionMismatch {
                        expected: problem.nx(),
                        actual: x.len(),
                    });
                }
                if f.len() != problem.nf() {
                    return Err(PelagoError::DimensionMismatch {
                        expected: problem.nf(),
                        actual: f.len(),
                    });
                }
            }
        }

        // Commit pass: nothing below can fail.
        for (island, population) in self.iter().zip(populations) {
            island.install_population(population);
        }
        let ArchipelagoState {
            migrants, topology, ..
        } = state;
        self.set_migrants_db(migrants)?;
        self.set_topology(Topology::new(topology))?;
        Ok(())
    }
}
