//! Parallel-sequence container for individuals in transit
//!
//! An [`IndividualsGroup`] is the currency of migration: three aligned
//! sequences of IDs, decision vectors and fitness vectors, detached from any
//! problem. Empty groups are valid.

use serde::{Deserialize, Serialize};

use crate::error::{PelagoError, PelagoResult};

/// Aligned (ID, decision vector, fitness vector) triples
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndividualsGroup {
    ids: Vec<u64>,
    xs: Vec<Vec<f64>>,
    fs: Vec<Vec<f64>>,
}

impl IndividualsGroup {
    /// Build a group from its three sequences.
    ///
    /// # Errors
    ///
    /// Returns [`PelagoError::ContractViolation`] when the sequences have
    /// different lengths.
    pub fn new(ids: Vec<u64>, xs: Vec<Vec<f64>>, fs: Vec<Vec<f64>>) -> PelagoResult<Self> {
        if ids.len() != xs.len() || ids.len() != fs.len() {
            return Err(PelagoError::contract(format!(
                "individuals group sequences have lengths {}, {} and {}",
                ids.len(),
                xs.len(),
                fs.len()
            )));
        }
        Ok(Self { ids, xs, fs })
    }

    /// Append one individual
    pub fn push(&mut self, id: u64, x: Vec<f64>, f: Vec<f64>) {
        self.ids.push(id);
        self.xs.push(x);
        self.fs.push(f);
    }

    /// Move all individuals of `other` into this group
    pub fn append(&mut self, other: &mut IndividualsGroup) {
        self.ids.append(&mut other.ids);
        self.xs.append(&mut other.xs);
        self.fs.append(&mut other.fs);
    }

    /// Number of individuals
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the group holds no individuals
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Remove all individuals
    pub fn clear(&mut self) {
        self.ids.clear();
        self.xs.clear();
        self.fs.clear();
    }

    /// Individual IDs
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Decision vectors
    pub fn xs(&self) -> &[Vec<f64>] {
        &self.xs
    }

    /// Fitness vectors
    pub fn fs(&self) -> &[Vec<f64>] {
        &self.fs
    }

    /// Iterate over `(id, x, f)` triples
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f64], &[f64])> {
        self.ids
            .iter()
            .zip(self.xs.iter())
            .zip(self.fs.iter())
            .map(|((id, x), f)| (*id, x.as_slice(), f.as_slice()))
    }

    /// Remove the individuals selected by `select` and return them as a new
    /// group, preserving order on both sides.
    pub(crate) fn drain_where(&mut self, mut select: impl FnMut(usize) -> bool) -> Self {
        let mut taken = Self::default();
        let mut kept = Self::default();
        for (i, ((id, x), f)) in self
            .ids
            .drain(..)
            .zip(self.xs.drain(..))
            .zip(self.fs.drain(..))
            .enumerate()
        {
            if select(i) {
                taken.push(id, x, f);
            } else {
                kept.push(id, x, f);
            }
        }
        *self = kept;
        taken
    }
}
