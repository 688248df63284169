//! Population type
//!
//! A population owns the individuals of one island: aligned triples of
//! unique 64-bit IDs, decision vectors and fitness vectors, bound to the
//! [`Problem`] that evaluated them. The three sequences always have equal
//! length, every decision vector has the problem dimension and every fitness
//! vector the fitness dimension.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

use crate::bfe::Bfe;
use crate::error::{PelagoError, PelagoResult};
use crate::population::group::IndividualsGroup;
use crate::problem::Problem;
use crate::utils::constrained::sort_population_con;

/// A collection of individuals bound to a problem
///
/// Given a fixed seed and a fixed problem, the sequence of generated IDs and
/// random decision vectors is reproducible.
pub struct Population {
    prob: Problem,
    ids: Vec<u64>,
    xs: Vec<Vec<f64>>,
    fs: Vec<Vec<f64>>,
    rng: StdRng,
    seed: u64,
}

impl Population {
    /// Create a population of `size` random individuals.
    ///
    /// Decision vectors are drawn uniformly within the problem bounds and
    /// evaluated one by one.
    pub fn new(prob: Problem, size: usize, seed: u64) -> PelagoResult<Self> {
        let mut pop = Self::empty(prob, seed);
        for _ in 0..size {
            let x = pop.random_decision_vector();
            pop.push_back(&x)?;
        }
        Ok(pop)
    }

    /// Create a population of `size` random individuals, evaluating their
    /// fitness through a batch evaluator.
    pub fn new_with_bfe(prob: Problem, bfe: &Bfe, size: usize, seed: u64) -> PelagoResult<Self> {
        let mut pop = Self::empty(prob, seed);
        let xs: Vec<Vec<f64>> = (0..size).map(|_| pop.random_decision_vector()).collect();
        let fs = bfe.call(&pop.prob, &xs)?;
        for (x, f) in xs.into_iter().zip(fs) {
            let id = pop.rng.gen();
            pop.ids.push(id);
            pop.xs.push(x);
            pop.fs.push(f);
        }
        Ok(pop)
    }

    /// Create an empty population bound to `prob`
    pub fn empty(prob: Problem, seed: u64) -> Self {
        Self {
            prob,
            ids: Vec::new(),
            xs: Vec::new(),
            fs: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Rebuild a population from previously captured raw sequences.
    ///
    /// The random engine is reseeded from `seed`, so ID generation resumes
    /// from the start of the stream rather than from where it left off.
    pub(crate) fn from_parts(
        prob: Problem,
        ids: Vec<u64>,
        xs: Vec<Vec<f64>>,
        fs: Vec<Vec<f64>>,
        seed: u64,
    ) -> PelagoResult<Self> {
        if ids.len() != xs.len() || ids.len() != fs.len() {
            return Err(PelagoError::contract(format!(
                "population sequences have lengths {}, {} and {}",
                ids.len(),
                xs.len(),
                fs.len()
            )));
        }
        for x in &xs {
            if x.len() != prob.nx() {
                return Err(PelagoError::DimensionMismatch {
                    expected: prob.nx(),
                    actual: x.len(),
                });
            }
        }
        for f in &fs {
            if f.len() != prob.nf() {
                return Err(PelagoError::DimensionMismatch {
                    expected: prob.nf(),
                    actual: f.len(),
                });
            }
        }
        let mut pop = Self::empty(prob, seed);
        pop.ids = ids;
        pop.xs = xs;
        pop.fs = fs;
        Ok(pop)
    }

    /// Append a decision vector, evaluating its fitness and assigning a
    /// fresh 64-bit ID.
    ///
    /// On any failure the population is left unchanged.
    pub fn push_back(&mut self, x: &[f64]) -> PelagoResult<()> {
        if x.len() != self.prob.nx() {
            return Err(PelagoError::DimensionMismatch {
                expected: self.prob.nx(),
                actual: x.len(),
            });
        }
        // The handle validates the fitness dimension; nothing is appended
        // until both vectors are known good.
        let f = self.prob.fitness(x)?;
        let id = self.rng.gen();
        self.ids.push(id);
        self.xs.push(x.to_vec());
        self.fs.push(f);
        Ok(())
    }

    /// Draw a random decision vector within the problem bounds.
    ///
    /// Trailing integer dimensions are drawn uniformly on the integer grid
    /// of their bounds.
    pub fn random_decision_vector(&mut self) -> Vec<f64> {
        let (lb, ub) = self.prob.bounds();
        let nx = self.prob.nx();
        let ncx = nx - self.prob.nix();
        let mut x = Vec::with_capacity(nx);
        for i in 0..nx {
            if i < ncx {
                if lb[i] == ub[i] {
                    x.push(lb[i]);
                } else {
                    x.push(self.rng.gen_range(lb[i]..=ub[i]));
                }
            } else {
                x.push(self.rng.gen_range(lb[i] as i64..=ub[i] as i64) as f64);
            }
        }
        x
    }

    /// Overwrite the `i`-th individual's decision and fitness vectors
    /// without re-evaluating. The ID is preserved.
    pub fn set_xf(&mut self, i: usize, x: &[f64], f: &[f64]) -> PelagoResult<()> {
        if i >= self.len() {
            return Err(PelagoError::OutOfRange {
                index: i,
                size: self.len(),
            });
        }
        if x.len() != self.prob.nx() {
            return Err(PelagoError::DimensionMismatch {
                expected: self.prob.nx(),
                actual: x.len(),
            });
        }
        if f.len() != self.prob.nf() {
            return Err(PelagoError::DimensionMismatch {
                expected: self.prob.nf(),
                actual: f.len(),
            });
        }
        self.xs[i].copy_from_slice(x);
        self.fs[i].copy_from_slice(f);
        Ok(())
    }

    /// Overwrite the `i`-th individual's decision vector and re-evaluate its
    /// fitness. The ID is preserved.
    pub fn set_x(&mut self, i: usize, x: &[f64]) -> PelagoResult<()> {
        let f = self.prob.fitness(x)?;
        self.set_xf(i, x, &f)
    }

    /// Index of the best individual under the constrained single-objective
    /// ordering, with a scalar tolerance broadcast to every constraint.
    ///
    /// Unconstrained problems use the plain objective minimum; constrained
    /// problems rank feasible individuals first. Fails with
    /// [`PelagoError::InvalidOperation`] on empty or multi-objective
    /// populations.
    pub fn champion(&self, tol: f64) -> PelagoResult<usize> {
        self.champion_with_tol(&vec![tol; self.prob.nc()])
    }

    /// Like [`Population::champion`], with one tolerance per constraint.
    pub fn champion_with_tol(&self, tol: &[f64]) -> PelagoResult<usize> {
        if self.is_empty() {
            return Err(PelagoError::invalid_op(
                "cannot determine the champion of an empty population",
            ));
        }
        if self.prob.nobj() > 1 {
            return Err(PelagoError::invalid_op(
                "the champion is only defined for single-objective problems",
            ));
        }
        if tol.len() != self.prob.nc() {
            return Err(PelagoError::DimensionMismatch {
                expected: self.prob.nc(),
                actual: tol.len(),
            });
        }
        if self.prob.nc() > 0 {
            let order = sort_population_con(&self.fs, self.prob.nec(), tol)?;
            return Ok(order[0]);
        }
        let mut best = 0;
        for i in 1..self.len() {
            if self.fs[i][0]
                .partial_cmp(&self.fs[best][0])
                .map_or(false, |o| o.is_lt())
            {
                best = i;
            }
        }
        Ok(best)
    }

    /// Decision vector of the champion (scalar tolerance zero)
    pub fn champion_x(&self) -> PelagoResult<Vec<f64>> {
        Ok(self.xs[self.champion(0.0)?].clone())
    }

    /// Fitness vector of the champion (scalar tolerance zero)
    pub fn champion_f(&self) -> PelagoResult<Vec<f64>> {
        Ok(self.fs[self.champion(0.0)?].clone())
    }

    /// Append migrants wholesale, preserving their IDs.
    ///
    /// All individuals are validated against the problem dimensions before
    /// any is appended.
    pub(crate) fn inject(&mut self, group: &IndividualsGroup) -> PelagoResult<()> {
        for (_, x, f) in group.iter() {
            if x.len() != self.prob.nx() {
                return Err(PelagoError::DimensionMismatch {
                    expected: self.prob.nx(),
                    actual: x.len(),
                });
            }
            if f.len() != self.prob.nf() {
                return Err(PelagoError::DimensionMismatch {
                    expected: self.prob.nf(),
                    actual: f.len(),
                });
            }
        }
        for (id, x, f) in group.iter() {
            self.ids.push(id);
            self.xs.push(x.to_vec());
            self.fs.push(f.to_vec());
        }
        Ok(())
    }

    /// Replace the `i`-th individual wholesale, ID included.
    pub(crate) fn replace(&mut self, i: usize, id: u64, x: &[f64], f: &[f64]) -> PelagoResult<()> {
        self.set_xf(i, x, f)?;
        self.ids[i] = id;
        Ok(())
    }

    /// The problem the individuals are evaluated under
    pub fn problem(&self) -> &Problem {
        &self.prob
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

    /// Seed of the population's random engine
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of individuals
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the population holds no individuals
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Clone for Population {
    fn clone(&self) -> Self {
        Self {
            prob: self.prob.clone(),
            ids: self.ids.clone(),
            xs: self.xs.clone(),
            fs: self.fs.clone(),
            rng: self.rng.clone(),
            seed: self.seed,
        }
    }
}

impl fmt::Debug for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("problem", &self.prob.name())
            .field("size", &self.len())
            .field("seed", &self.seed)
            .finish()
    }
}
