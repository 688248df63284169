//! Archipelago
//!
//! An archipelago owns a collection of [`Island`]s, the migrant database
//! and the [`Topology`] connecting the islands. Its interface mirrors the
//! island's: evolution is initiated with [`Archipelago::evolve`], progress
//! is observed with [`Archipelago::status`] and completion is awaited with
//! [`Archipelago::wait`] / [`Archipelago::wait_check`].
//!
//! Islands reach back into the archipelago through a shared core holding
//! the island-index map, the migrant database and the topology. The core is
//! reference-counted, so moving an archipelago never invalidates in-flight
//! evolutions.

pub mod migration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::ops::Index;
use std::sync::{Arc, Mutex, RwLock};

use crate::algorithm::Algorithm;
use crate::bfe::Bfe;
use crate::error::{PelagoError, PelagoResult};
use crate::island::udi::UdIsland;
use crate::island::{EvolveStatus, Island};
use crate::population::group::IndividualsGroup;
use crate::population::population::Population;
use crate::problem::Problem;
use crate::rng;
use crate::topology::Topology;
use crate::utils::{lock, read, write};

use self::migration::ImmigrationPolicy;

/// Shared state islands reach through their back-reference.
///
/// Lock order: an island never holds one of its own locks while taking a
/// lock here, and the only pair taken together is `rng` before `migrants`.
pub(crate) struct ArchiCore {
    // Island id -> index within the archipelago.
    idx_map: Mutex<HashMap<u64, usize>>,
    // Slot i holds the emigrants most recently published by island i.
    migrants: Mutex<Vec<IndividualsGroup>>,
    topology: RwLock<Topology>,
    policy: RwLock<ImmigrationPolicy>,
    // Drives the per-individual migration draws.
    rng: Mutex<StdRng>,
}

impl ArchiCore {
    fn new(topology: Topology, seed: u64) -> Self {
        Self {
            idx_map: Mutex::new(HashMap::new()),
            migrants: Mutex::new(Vec::new()),
            topology: RwLock::new(topology),
            policy: RwLock::new(ImmigrationPolicy::default()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub(crate) fn island_index(&self, id: u64) -> PelagoResult<usize> {
        lock(&self.idx_map).get(&id).copied().ok_or_else(|| {
            PelagoError::NotFound("the island is not a member of this archipelago".to_string())
        })
    }

    /// Pull emigrants destined for island `index`: for every incoming edge,
    /// each individual in the source's slot is taken with probability equal
    /// to the edge weight clamped to `[0, 1]`. Taken individuals leave the
    /// database.
    ///
    /// Islands of one archipelago may be bound to different problems, so
    /// every candidate is validated against the destination dimensions
    /// before anything is drained; on a mismatch the database is untouched
    /// and no migrant is lost.
    pub(crate) fn pull_migrants(
        &self,
        index: usize,
        nx: usize,
        nf: usize,
    ) -> PelagoResult<IndividualsGroup> {
        let (sources, weights) = read(&self.topology).get_connections(index)?;
        let mut picked = IndividualsGroup::default();
        if sources.is_empty() {
            return Ok(picked);
        }
        let mut rng = lock(&self.rng);
        let mut db = lock(&self.migrants);
        let size = db.len();
        for &source in &sources {
            let slot = db.get(source).ok_or_else(|| {
                PelagoError::contract(format!(
                    "the topology reported source {source} but the archipelago has {size} islands"
                ))
            })?;
            for (_, x, f) in slot.iter() {
                if x.len() != nx {
                    return Err(PelagoError::DimensionMismatch {
                        expected: nx,
                        actual: x.len(),
                    });
                }
                if f.len() != nf {
                    return Err(PelagoError::DimensionMismatch {
                        expected: nf,
                        actual: f.len(),
                    });
                }
            }
        }
        for (source, weight) in sources.into_iter().zip(weights) {
            let slot = &mut db[source];
            if slot.is_empty() {
                continue;
            }
            let p = weight.clamp(0.0, 1.0);
            let chosen: Vec<bool> = (0..slot.len()).map(|_| rng.gen_bool(p)).collect();
            let mut taken = slot.drain_where(|i| chosen[i]);
            picked.append(&mut taken);
        }
        Ok(picked)
    }

    /// Merge pulled migrants into a population under the current policy.
    pub(crate) fn merge_migrants(
        &self,
        pop: &mut Population,
        group: &IndividualsGroup,
    ) -> PelagoResult<()> {
        let policy = *read(&self.policy);
        migration::merge_migrants(pop, group, policy)
    }

    /// Replace slot `index` with freshly selected emigrants.
    pub(crate) fn publish_migrants(
        &self,
        index: usize,
        group: IndividualsGroup,
    ) -> PelagoResult<()> {
        let mut db = lock(&self.migrants);
        let size = db.len();
        let slot = db
            .get_mut(index)
            .ok_or(PelagoError::OutOfRange { index, size })?;
        tracing::trace!(island = index, count = group.len(), "publishing emigrants");
        *slot = group;
        Ok(())
    }
}

/// A collection of islands with a topology and a migrant database
pub struct Archipelago {
    islands: Vec<Island>,
    core: Arc<ArchiCore>,
}

impl Archipelago {
    /// Largest number of islands an archipelago can hold
    pub const MAX_SIZE: usize = u32::MAX as usize;

    /// Empty archipelago with the default edgeless topology
    pub fn new() -> Self {
        Self::raw(Topology::default())
    }

    /// Empty archipelago with the given topology.
    ///
    /// The topology must start empty; it grows with the archipelago.
    pub fn with_topology(topology: Topology) -> PelagoResult<Self> {
        if topology.num_vertices() != 0 {
            return Err(PelagoError::contract(format!(
                "the initial topology must have no vertices, found {}",
                topology.num_vertices()
            )));
        }
        Ok(Self::raw(topology))
    }

    fn raw(topology: Topology) -> Self {
        Self {
            islands: Vec::new(),
            core: Arc::new(ArchiCore::new(topology, rng::next_seed())),
        }
    }

    /// Start building an archipelago of n equally configured islands
    pub fn builder() -> ArchipelagoBuilder {
        ArchipelagoBuilder::default()
    }

    /// Take ownership of an island and append it.
    ///
    /// The new island gets index `len() - 1`; the topology grows by one
    /// vertex and the migrant database by one empty slot. References
    /// obtained through [`Archipelago::iter`] or indexing are invalidated.
    pub fn push_back(&mut self, island: Island) -> PelagoResult<()> {
        if self.islands.len() >= Self::MAX_SIZE {
            return Err(PelagoError::Overflow {
                max: Self::MAX_SIZE,
            });
        }
        let index = self.islands.len();
        island.link(&self.core);
        lock(&self.core.idx_map).insert(island.id(), index);
        lock(&self.core.migrants).push(IndividualsGroup::default());
        write(&self.core.topology).push_back();
        self.islands.push(island);
        tracing::debug!(index, "island added to the archipelago");
        Ok(())
    }

    /// Number of islands
    pub fn len(&self) -> usize {
        self.islands.len()
    }

    /// Whether the archipelago holds no islands
    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    /// Borrow the island at `index`
    pub fn get(&self, index: usize) -> PelagoResult<&Island> {
        self.islands.get(index).ok_or(PelagoError::OutOfRange {
            index,
            size: self.islands.len(),
        })
    }

    /// Iterate over the islands
    pub fn iter(&self) -> std::slice::Iter<'_, Island> {
        self.islands.iter()
    }

    /// Call [`Island::evolve`] on every island in index order
    pub fn evolve(&self, n: u32) {
        for island in &self.islands {
            island.evolve(n);
        }
    }

    /// Block until every island is idle. Never fails.
    pub fn wait(&self) {
        for island in &self.islands {
            island.wait();
        }
    }

    /// Block until every island is idle, consuming latched errors.
    ///
    /// Every island is drained even when an early one failed; the first
    /// error in index order is returned.
    pub fn wait_check(&self) -> PelagoResult<()> {
        let mut first = None;
        for island in &self.islands {
            if let Err(e) = island.wait_check() {
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Aggregate status: `Error` when any island has a latched error,
    /// otherwise `Busy` when any island is busy, otherwise `Idle`.
    pub fn status(&self) -> EvolveStatus {
        let mut busy = false;
        for island in &self.islands {
            match island.status() {
                EvolveStatus::Error => return EvolveStatus::Error,
                EvolveStatus::Busy => busy = true,
                EvolveStatus::Idle => {}
            }
        }
        if busy {
            EvolveStatus::Busy
        } else {
            EvolveStatus::Idle
        }
    }

    /// Index of an island within this archipelago.
    ///
    /// Fails with [`PelagoError::NotFound`] when the island is not a member.
    pub fn get_island_idx(&self, island: &Island) -> PelagoResult<usize> {
        self.core.island_index(island.id())
    }

    /// Atomically read and clear migrant slot `index`
    pub fn extract_migrants(&mut self, index: usize) -> PelagoResult<IndividualsGroup> {
        let mut db = lock(&self.core.migrants);
        let size = db.len();
        let slot = db
            .get_mut(index)
            .ok_or(PelagoError::OutOfRange { index, size })?;
        Ok(std::mem::take(slot))
    }

    /// Deep copy of the migrant database
    pub fn get_migrants_db(&self) -> Vec<IndividualsGroup> {
        lock(&self.core.migrants).clone()
    }

    /// Replace the migrant database wholesale.
    ///
    /// `db` must have one slot per island.
    pub fn set_migrants_db(&mut self, db: Vec<IndividualsGroup>) -> PelagoResult<()> {
        if db.len() != self.islands.len() {
            return Err(PelagoError::contract(format!(
                "the migrant database has {} slots but the archipelago has {} islands",
                db.len(),
                self.islands.len()
            )));
        }
        *lock(&self.core.migrants) = db;
        Ok(())
    }

    /// Deep copy of the topology
    pub fn get_topology(&self) -> Topology {
        read(&self.core.topology).clone()
    }

    /// Replace the topology.
    ///
    /// The new topology must already have one vertex per island. Waits for
    /// every island to reach idle before swapping, so no in-flight migration
    /// observes the replacement.
    pub fn set_topology(&mut self, topology: Topology) -> PelagoResult<()> {
        if topology.num_vertices() != self.islands.len() {
            return Err(PelagoError::contract(format!(
                "the topology has {} vertices but the archipelago has {} islands",
                topology.num_vertices(),
                self.islands.len()
            )));
        }
        self.wait();
        *write(&self.core.topology) = topology;
        Ok(())
    }

    /// Incoming connections of island `index` under the current topology
    pub fn get_island_connections(&self, index: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)> {
        if index >= self.islands.len() {
            return Err(PelagoError::OutOfRange {
                index,
                size: self.islands.len(),
            });
        }
        read(&self.core.topology).get_connections(index)
    }

    /// Champion decision vectors of every island, in index order
    pub fn get_champions_x(&self) -> PelagoResult<Vec<Vec<f64>>> {
        self.islands.iter().map(Island::get_champion_x).collect()
    }

    /// Champion fitness vectors of every island, in index order
    pub fn get_champions_f(&self) -> PelagoResult<Vec<Vec<f64>>> {
        self.islands.iter().map(Island::get_champion_f).collect()
    }

    /// The policy applied when migrants are merged into a population
    pub fn immigration_policy(&self) -> ImmigrationPolicy {
        *read(&self.core.policy)
    }

    /// Set the policy applied when migrants are merged into a population
    pub fn set_immigration_policy(&mut self, policy: ImmigrationPolicy) {
        *write(&self.core.policy) = policy;
    }
}

impl Default for Archipelago {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for Archipelago {
    type Output = Island;

    fn index(&self, index: usize) -> &Island {
        &self.islands[index]
    }
}

impl Clone for Archipelago {
    /// Deep copy. Waits for the source to reach idle first; the copy is
    /// idle, holds copies of the islands, migrant database and topology,
    /// and does not inherit pending tasks.
    fn clone(&self) -> Self {
        self.wait();
        let mut out = Archipelago::new();
        for island in &self.islands {
            let copy = island.clone();
            let index = out.islands.len();
            copy.link(&out.core);
            lock(&out.core.idx_map).insert(copy.id(), index);
            out.islands.push(copy);
        }
        *write(&out.core.topology) = read(&self.core.topology).clone();
        *lock(&out.core.migrants) = lock(&self.core.migrants).clone();
        *write(&out.core.policy) = *read(&self.core.policy);
        out
    }
}

impl Drop for Archipelago {
    /// Waits for every island to finish its queued work before the islands
    /// are released.
    fn drop(&mut self) {
        self.wait();
    }
}

impl std::fmt::Debug for Archipelago {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archipelago")
            .field("islands", &self.islands.len())
            .field("topology", &read(&self.core.topology).name())
            .field("status", &self.status())
            .finish()
    }
}

/// Builder for an archipelago of n equally configured islands
///
/// A supplied seed feeds a meta generator that derives a distinct
/// population seed for every island; the islands never share a seed
/// verbatim.
#[derive(Default)]
pub struct ArchipelagoBuilder {
    n: usize,
    algorithm: Option<Algorithm>,
    problem: Option<Problem>,
    udi: Option<UdIsland>,
    bfe: Option<Bfe>,
    pop_size: usize,
    seed: Option<u64>,
    topology: Option<Topology>,
    policy: ImmigrationPolicy,
}

impl ArchipelagoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of islands to create
    pub fn islands(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Algorithm every island starts with (required)
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Problem every island's population is built from (required)
    pub fn problem(mut self, problem: Problem) -> Self {
        self.problem = Some(problem);
        self
    }

    /// Execution strategy shared by the islands
    pub fn udi(mut self, udi: UdIsland) -> Self {
        self.udi = Some(udi);
        self
    }

    /// Batch evaluator shared by the islands
    pub fn bfe(mut self, bfe: Bfe) -> Self {
        self.bfe = Some(bfe);
        self
    }

    /// Population size per island
    pub fn pop_size(mut self, size: usize) -> Self {
        self.pop_size = size;
        self
    }

    /// Seed of the meta generator deriving per-island population seeds
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Migration topology (default: [`Unconnected`](crate::topology::Unconnected))
    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Migrant merge policy (default: [`ImmigrationPolicy::Append`])
    pub fn immigration_policy(mut self, policy: ImmigrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the archipelago
    pub fn build(self) -> PelagoResult<Archipelago> {
        let algorithm = self
            .algorithm
            .ok_or_else(|| PelagoError::contract("an archipelago requires an algorithm"))?;
        let problem = self
            .problem
            .ok_or_else(|| PelagoError::contract("an archipelago requires a problem"))?;
        let mut archi = match self.topology {
            Some(t) => Archipelago::with_topology(t)?,
            None => Archipelago::new(),
        };
        archi.set_immigration_policy(self.policy);
        let mut meta = StdRng::seed_from_u64(self.seed.unwrap_or_else(rng::next_seed));
        for _ in 0..self.n {
            let island_seed: u64 = meta.gen();
            let mut builder = Island::builder()
                .algorithm(algorithm.clone())
                .problem(problem.clone())
                .pop_size(self.pop_size)
                .seed(island_seed);
            if let Some(udi) = &self.udi {
                builder = builder.udi(udi.clone());
            }
            if let Some(bfe) = &self.bfe {
                builder = builder.bfe(bfe.clone());
            }
            archi.push_back(builder.build()?)?;
        }
        Ok(archi)
    }
}

pub mod prelude {
    pub use super::migration::ImmigrationPolicy;
    pub use super::{Archipelago, ArchipelagoBuilder};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::NullAlgorithm;
    use crate::problem::benchmarks::Sphere;
    use crate::topology::{Ring, Unconnected};

    fn sphere_archi(n: usize) -> Archipelago {
        Archipelago::builder()
            .islands(n)
            .algorithm(Algorithm::new(NullAlgorithm))
            .problem(Problem::new(Sphere::new(2)).unwrap())
            .pop_size(3)
            .seed(42)
            .build()
            .unwrap()
    }

    #[test]
    fn test_push_back_keeps_structures_aligned() {
        let mut archi = Archipelago::new();
        for i in 1..=5 {
            let island = Island::new(
                Algorithm::new(NullAlgorithm),
                Problem::new(Sphere::new(2)).unwrap(),
                2,
                i,
            )
            .unwrap();
            archi.push_back(island).unwrap();
        }
        assert_eq!(archi.len(), 5);
        assert_eq!(archi.get_migrants_db().len(), 5);
        assert_eq!(archi.get_topology().num_vertices(), 5);
        for i in 0..5 {
            assert_eq!(archi.get_island_idx(&archi[i]).unwrap(), i);
        }
    }

    #[test]
    fn test_builder_derives_distinct_seeds() {
        let archi = sphere_archi(3);
        assert_eq!(archi.len(), 3);
        let a = archi[0].get_population();
        let b = archi[1].get_population();
        assert_ne!(a.seed(), b.seed());
        assert_ne!(a.xs(), b.xs());
    }

    #[test]
    fn test_builder_same_seed_reproduces() {
        let a = sphere_archi(3);
        let b = sphere_archi(3);
        for i in 0..3 {
            assert_eq!(
                a[i].get_population().xs(),
                b[i].get_population().xs()
            );
        }
    }

    #[test]
    fn test_get_out_of_range() {
        let archi = sphere_archi(2);
        assert!(archi.get(1).is_ok());
        assert!(matches!(
            archi.get(2),
            Err(PelagoError::OutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_foreign_island_not_found() {
        let archi = sphere_archi(2);
        let stranger = Island::new(
            Algorithm::new(NullAlgorithm),
            Problem::new(Sphere::new(2)).unwrap(),
            1,
            0,
        )
        .unwrap();
        assert!(matches!(
            archi.get_island_idx(&stranger),
            Err(PelagoError::NotFound(_))
        ));
    }

    #[test]
    fn test_extract_migrants_reads_and_clears() {
        let mut archi = sphere_archi(2);
        let mut group = IndividualsGroup::default();
        group.push(1, vec![0.0, 0.0], vec![0.0]);
        archi
            .set_migrants_db(vec![group.clone(), IndividualsGroup::default()])
            .unwrap();
        let taken = archi.extract_migrants(0).unwrap();
        assert_eq!(taken, group);
        assert!(archi.extract_migrants(0).unwrap().is_empty());
    }

    #[test]
    fn test_set_migrants_db_size_checked() {
        let mut archi = sphere_archi(2);
        let r = archi.set_migrants_db(vec![IndividualsGroup::default()]);
        assert!(matches!(r, Err(PelagoError::ContractViolation(_))));
    }

    #[test]
    fn test_set_topology_size_checked() {
        let mut archi = sphere_archi(3);
        assert!(archi.set_topology(Topology::default()).is_err());
        let mut ring = Ring::default();
        for _ in 0..3 {
            crate::topology::UserDefinedTopology::push_back(&mut ring);
        }
        archi.set_topology(Topology::new(ring)).unwrap();
        let (sources, _) = archi.get_island_connections(0).unwrap();
        assert_eq!(sources, vec![2, 1]);
    }

    #[test]
    fn test_with_topology_requires_empty_graph() {
        let mut grown = Unconnected::default();
        crate::topology::UserDefinedTopology::push_back(&mut grown);
        assert!(Archipelago::with_topology(Topology::new(grown)).is_err());
        assert!(Archipelago::with_topology(Topology::new(Ring::default())).is_ok());
    }

    #[test]
    fn test_status_and_wait_on_idle() {
        let archi = sphere_archi(3);
        assert_eq!(archi.status(), EvolveStatus::Idle);
        archi.evolve(1);
        archi.wait();
        assert_ne!(archi.status(), EvolveStatus::Busy);
        archi.wait_check().unwrap();
    }

    #[test]
    fn test_clone_copies_state_not_tasks() {
        let mut archi = sphere_archi(2);
        let mut group = IndividualsGroup::default();
        group.push(5, vec![1.0, 1.0], vec![2.0]);
        archi
            .set_migrants_db(vec![group.clone(), IndividualsGroup::default()])
            .unwrap();
        let copy = archi.clone();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.status(), EvolveStatus::Idle);
        assert_eq!(copy.get_migrants_db()[0], group);
        assert_eq!(copy.get_topology().num_vertices(), 2);
        for i in 0..2 {
            assert_eq!(copy.get_island_idx(&copy[i]).unwrap(), i);
            assert_eq!(
                copy[i].get_population().ids(),
                archi[i].get_population().ids()
            );
        }
        // The copies are distinct islands; the source still resolves too.
        assert!(archi.get_island_idx(&copy[0]).is_err());
    }
}
