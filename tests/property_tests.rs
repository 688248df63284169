//! Property-based tests for pelago
//!
//! Uses proptest to verify the data-model invariants.

use pelago::error::PelagoResult;
use pelago::population::group::IndividualsGroup;
use pelago::population::population::Population;
use pelago::problem::{Problem, UserDefinedProblem};
use pelago::utils::constrained::sort_population_con;
use pelago::utils::multi_objective::{pareto_dominance, sort_population_mo};
use proptest::prelude::*;

#[derive(Clone)]
struct BoxProblem {
    dim: usize,
    half: f64,
}

impl UserDefinedProblem for BoxProblem {
    fn fitness(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
        Ok(vec![x.iter().map(|v| v * v).sum()])
    }

    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (vec![-self.half; self.dim], vec![self.half; self.dim])
    }
}

fn box_problem(dim: usize, half: f64) -> Problem {
    Problem::new(BoxProblem { dim, half }).unwrap()
}

proptest! {
    // ==================== Population invariants ====================

    #[test]
    fn population_sequences_stay_aligned(
        dim in 1usize..8,
        size in 0usize..25,
        seed in any::<u64>()
    ) {
        let pop = Population::new(box_problem(dim, 5.0), size, seed).unwrap();
        prop_assert_eq!(pop.ids().len(), size);
        prop_assert_eq!(pop.xs().len(), size);
        prop_assert_eq!(pop.fs().len(), size);
        for x in pop.xs() {
            prop_assert_eq!(x.len(), dim);
        }
        for f in pop.fs() {
            prop_assert_eq!(f.len(), 1);
        }
    }

    #[test]
    fn push_back_reads_back_exactly(
        x in prop::collection::vec(-5.0..5.0f64, 1..8),
        seed in any::<u64>()
    ) {
        let mut pop = Population::empty(box_problem(x.len(), 5.0), seed);
        pop.push_back(&x).unwrap();
        let expected: f64 = x.iter().map(|v| v * v).sum();
        prop_assert_eq!(pop.xs()[0].clone(), x);
        prop_assert_eq!(pop.fs()[0].clone(), vec![expected]);
    }

    #[test]
    fn random_vectors_respect_bounds(
        dim in 1usize..8,
        half in 0.1..50.0f64,
        seed in any::<u64>()
    ) {
        let pop = Population::new(box_problem(dim, half), 10, seed).unwrap();
        for x in pop.xs() {
            for v in x {
                prop_assert!(*v >= -half && *v <= half);
            }
        }
    }

    #[test]
    fn identical_seeds_reproduce_ids_and_xs(
        dim in 1usize..6,
        size in 1usize..15,
        seed in any::<u64>()
    ) {
        let a = Population::new(box_problem(dim, 5.0), size, seed).unwrap();
        let b = Population::new(box_problem(dim, 5.0), size, seed).unwrap();
        prop_assert_eq!(a.ids(), b.ids());
        prop_assert_eq!(a.xs(), b.xs());
    }

    #[test]
    fn champion_is_the_objective_minimum(
        size in 1usize..20,
        seed in any::<u64>()
    ) {
        let pop = Population::new(box_problem(3, 5.0), size, seed).unwrap();
        let champ = pop.champion(0.0).unwrap();
        for f in pop.fs() {
            prop_assert!(pop.fs()[champ][0] <= f[0]);
        }
    }

    // ==================== Ordering properties ====================

    #[test]
    fn constrained_sort_is_a_permutation_with_feasible_first(
        fs in prop::collection::vec(prop::collection::vec(-10.0..10.0f64, 3), 1..20)
    ) {
        let order = sort_population_con(&fs, 1, &[1.0, 0.0]).unwrap();
        let mut sorted = order.clone();
        sorted.sort();
        prop_assert_eq!(sorted, (0..fs.len()).collect::<Vec<_>>());

        let feasible = |f: &Vec<f64>| f[1].abs() <= 1.0 && f[2] <= 0.0;
        let mut seen_infeasible = false;
        for &i in &order {
            if feasible(&fs[i]) {
                prop_assert!(!seen_infeasible, "feasible after infeasible");
            } else {
                seen_infeasible = true;
            }
        }
    }

    #[test]
    fn multi_objective_sort_is_a_permutation(
        fs in prop::collection::vec(prop::collection::vec(0.0..10.0f64, 2), 1..20)
    ) {
        let order = sort_population_mo(&fs).unwrap();
        let mut sorted = order.clone();
        sorted.sort();
        prop_assert_eq!(sorted, (0..fs.len()).collect::<Vec<_>>());
    }

    #[test]
    fn earlier_never_dominated_by_later(
        fs in prop::collection::vec(prop::collection::vec(0.0..10.0f64, 2), 2..15)
    ) {
        let order = sort_population_mo(&fs).unwrap();
        for (pos, &i) in order.iter().enumerate() {
            for &j in &order[pos + 1..] {
                prop_assert!(
                    !pareto_dominance(&fs[j], &fs[i]),
                    "a later individual dominates an earlier one"
                );
            }
        }
    }

    // ==================== Individuals group invariants ====================

    #[test]
    fn group_stays_aligned_under_push_and_append(
        items in prop::collection::vec((any::<u64>(), -5.0..5.0f64, 0.0..25.0f64), 0..20),
        at in 0usize..20
    ) {
        let split = at.min(items.len());
        let mut left = IndividualsGroup::default();
        let mut right = IndividualsGroup::default();
        for (k, (id, x, f)) in items.iter().enumerate() {
            let target = if k < split { &mut left } else { &mut right };
            target.push(*id, vec![*x], vec![*f]);
        }
        left.append(&mut right);
        prop_assert_eq!(left.len(), items.len());
        prop_assert!(right.is_empty());
        prop_assert_eq!(left.ids().len(), left.xs().len());
        prop_assert_eq!(left.ids().len(), left.fs().len());
        let ids: Vec<u64> = items.iter().map(|(id, _, _)| *id).collect();
        prop_assert_eq!(left.ids(), ids.as_slice());
    }
}
