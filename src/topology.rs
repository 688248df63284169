//! Migration topologies
//!
//! A topology is a directed weighted graph over island indices: an edge
//! `s -> d` with weight `w` makes island `d` pull individuals published by
//! island `s`, each with probability `w` (clamped to `[0, 1]` at the point
//! of use). Topologies grow one vertex at a time as islands are added to an
//! archipelago.
//!
//! User topologies implement [`UserDefinedTopology`] as plain structs; the
//! archipelago serialises access to the handle, so implementations do not
//! need interior locking.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

use crate::error::{PelagoError, PelagoResult};

/// Interface for user-supplied topologies
pub trait UserDefinedTopology: Send + Sync {
    /// Add one vertex to the graph
    fn push_back(&mut self);

    /// Incoming connections of vertex `idx`: source indices and the weight
    /// of each edge. Weights must be finite and non-negative.
    fn get_connections(&self, idx: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)>;

    /// Current number of vertices
    fn num_vertices(&self) -> usize;

    /// Human-readable topology name
    fn name(&self) -> String {
        "unnamed topology".to_string()
    }
}

trait DynTopology: UserDefinedTopology {
    fn clone_boxed(&self) -> Box<dyn DynTopology>;
    fn as_any(&self) -> &dyn Any;
}

impl<T> DynTopology for T
where
    T: UserDefinedTopology + Clone + Any,
{
    fn clone_boxed(&self) -> Box<dyn DynTopology> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Type-erased topology handle
pub struct Topology {
    inner: Box<dyn DynTopology>,
}

impl Topology {
    /// Wrap a user topology
    pub fn new(udt: impl UserDefinedTopology + Clone + Any) -> Self {
        Self {
            inner: Box::new(udt),
        }
    }

    /// Add one vertex to the graph
    pub fn push_back(&mut self) {
        self.inner.push_back();
    }

    /// Incoming connections of vertex `idx`, validated: equal-length
    /// sequences and finite non-negative weights.
    pub fn get_connections(&self, idx: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)> {
        let (sources, weights) = self.inner.get_connections(idx)?;
        if sources.len() != weights.len() {
            return Err(PelagoError::contract(format!(
                "topology '{}' returned {} sources but {} weights",
                self.name(),
                sources.len(),
                weights.len()
            )));
        }
        for w in &weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(PelagoError::contract(format!(
                    "topology '{}' returned an invalid edge weight {w}",
                    self.name()
                )));
            }
        }
        Ok((sources, weights))
    }

    /// Current number of vertices
    pub fn num_vertices(&self) -> usize {
        self.inner.num_vertices()
    }

    /// Topology name
    pub fn name(&self) -> String {
        self.inner.name()
    }

    /// Borrow the wrapped user topology, if it is of type `T`
    pub fn extract<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Clone for Topology {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
        }
    }
}

impl fmt::Debug for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("name", &self.name())
            .field("num_vertices", &self.num_vertices())
            .finish()
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(Unconnected::default())
    }
}

fn check_vertex(idx: usize, n: usize) -> PelagoResult<()> {
    if idx >= n {
        return Err(PelagoError::OutOfRange {
            index: idx,
            size: n,
        });
    }
    Ok(())
}

/// Edgeless topology: no migration ever happens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unconnected {
    n: usize,
}

impl UserDefinedTopology for Unconnected {
    fn push_back(&mut self) {
        self.n += 1;
    }

    fn get_connections(&self, idx: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)> {
        check_vertex(idx, self.n)?;
        Ok((Vec::new(), Vec::new()))
    }

    fn num_vertices(&self) -> usize {
        self.n
    }

    fn name(&self) -> String {
        "Unconnected".to_string()
    }
}

/// Bidirectional ring: every vertex is connected to its two neighbours
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    n: usize,
    weight: f64,
}

impl Ring {
    pub fn new(weight: f64) -> Self {
        Self { n: 0, weight }
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl UserDefinedTopology for Ring {
    fn push_back(&mut self) {
        self.n += 1;
    }

    fn get_connections(&self, idx: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)> {
        check_vertex(idx, self.n)?;
        let sources = match self.n {
            0 | 1 => Vec::new(),
            2 => vec![1 - idx],
            n => vec![(idx + n - 1) % n, (idx + 1) % n],
        };
        let weights = vec![self.weight; sources.len()];
        Ok((sources, weights))
    }

    fn num_vertices(&self) -> usize {
        self.n
    }

    fn name(&self) -> String {
        "Ring".to_string()
    }
}

/// Complete graph: every vertex is connected to every other
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullyConnected {
    n: usize,
    weight: f64,
}

impl FullyConnected {
    pub fn new(weight: f64) -> Self {
        Self { n: 0, weight }
    }
}

impl Default for FullyConnected {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl UserDefinedTopology for FullyConnected {
    fn push_back(&mut self) {
        self.n += 1;
    }

    fn get_connections(&self, idx: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)> {
        check_vertex(idx, self.n)?;
        let sources: Vec<usize> = (0..self.n).filter(|&j| j != idx).collect();
        let weights = vec![self.weight; sources.len()];
        Ok((sources, weights))
    }

    fn num_vertices(&self) -> usize {
        self.n
    }

    fn name(&self) -> String {
        "Fully connected".to_string()
    }
}

/// Explicit directed graph built edge by edge
///
/// Also the persisted form of any topology: the connection lists of an
/// arbitrary topology can be captured into a `FreeTopology` with
/// [`FreeTopology::from_topology`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FreeTopology {
    // inward[d] lists (source, weight) for every edge ending at d.
    inward: Vec<Vec<(usize, f64)>>,
}

impl FreeTopology {
    /// Empty graph with `n` vertices
    pub fn with_vertices(n: usize) -> Self {
        Self {
            inward: vec![Vec::new(); n],
        }
    }

    /// Add a directed edge `from -> to` with the given weight.
    ///
    /// # Errors
    ///
    /// Fails with [`PelagoError::OutOfRange`] when either endpoint does not
    /// exist and with [`PelagoError::ContractViolation`] for a non-finite or
    /// negative weight.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: f64) -> PelagoResult<()> {
        check_vertex(from, self.inward.len())?;
        check_vertex(to, self.inward.len())?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(PelagoError::contract(format!(
                "edge weight {weight} must be finite and non-negative"
            )));
        }
        self.inward[to].push((from, weight));
        Ok(())
    }

    /// Capture the full connection structure of any topology
    pub fn from_topology(t: &Topology) -> PelagoResult<Self> {
        let n = t.num_vertices();
        let mut free = Self::with_vertices(n);
        for d in 0..n {
            let (sources, weights) = t.get_connections(d)?;
            for (s, w) in sources.into_iter().zip(weights) {
                free.add_edge(s, d, w)?;
            }
        }
        Ok(free)
    }
}

impl UserDefinedTopology for FreeTopology {
    fn push_back(&mut self) {
        self.inward.push(Vec::new());
    }

    fn get_connections(&self, idx: usize) -> PelagoResult<(Vec<usize>, Vec<f64>)> {
        check_vertex(idx, self.inward.len())?;
        let (sources, weights) = self.inward[idx].iter().copied().unzip();
        Ok((sources, weights))
    }

    fn num_vertices(&self) -> usize {
        self.inward.len()
    }

    fn name(&self) -> String {
        "Free topology".to_string()
    }
}

pub mod prelude {
    pub use super::{
        FreeTopology, FullyConnected, Ring, Topology, Unconnected, UserDefinedTopology,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grown<T: UserDefinedTopology + Clone + Any>(mut udt: T, n: usize) -> Topology {
        for _ in 0..n {
            udt.push_back();
        }
        Topology::new(udt)
    }

    #[test]
    fn test_unconnected_has_no_edges() {
        let t = grown(Unconnected::default(), 4);
        assert_eq!(t.num_vertices(), 4);
        for i in 0..4 {
            let (s, w) = t.get_connections(i).unwrap();
            assert!(s.is_empty());
            assert!(w.is_empty());
        }
    }

    #[test]
    fn test_out_of_range_vertex() {
        let t = grown(Unconnected::default(), 2);
        assert!(matches!(
            t.get_connections(2),
            Err(PelagoError::OutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_ring_neighbours() {
        let t = grown(Ring::new(0.5), 4);
        let (s, w) = t.get_connections(0).unwrap();
        assert_eq!(s, vec![3, 1]);
        assert_eq!(w, vec![0.5, 0.5]);
        let (s, _) = t.get_connections(2).unwrap();
        assert_eq!(s, vec![1, 3]);
    }

    #[test]
    fn test_ring_small_sizes() {
        let t = grown(Ring::default(), 1);
        assert!(t.get_connections(0).unwrap().0.is_empty());
        let t = grown(Ring::default(), 2);
        assert_eq!(t.get_connections(0).unwrap().0, vec![1]);
        assert_eq!(t.get_connections(1).unwrap().0, vec![0]);
    }

    #[test]
    fn test_fully_connected() {
        let t = grown(FullyConnected::default(), 3);
        let (s, w) = t.get_connections(1).unwrap();
        assert_eq!(s, vec![0, 2]);
        assert_eq!(w, vec![1.0, 1.0]);
    }

    #[test]
    fn test_free_topology_edges() {
        let mut free = FreeTopology::with_vertices(3);
        free.add_edge(0, 2, 0.25).unwrap();
        free.add_edge(1, 2, 0.75).unwrap();
        let t = Topology::new(free);
        let (s, w) = t.get_connections(2).unwrap();
        assert_eq!(s, vec![0, 1]);
        assert_eq!(w, vec![0.25, 0.75]);
        assert!(t.get_connections(0).unwrap().0.is_empty());
    }

    #[test]
    fn test_free_topology_rejects_bad_edges() {
        let mut free = FreeTopology::with_vertices(2);
        assert!(free.add_edge(0, 5, 1.0).is_err());
        assert!(free.add_edge(0, 1, -1.0).is_err());
        assert!(free.add_edge(0, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_capture_ring_as_free_topology() {
        let ring = grown(Ring::new(0.5), 3);
        let free = FreeTopology::from_topology(&ring).unwrap();
        assert_eq!(free.num_vertices(), 3);
        let (s, w) = free.get_connections(0).unwrap();
        assert_eq!(s, vec![2, 1]);
        assert_eq!(w, vec![0.5, 0.5]);
    }
}
