//! Emigrant selection and immigrant merging
//!
//! The selection side is fixed: an island publishes its single best
//! individual after each successful evolution (the champion for
//! single-objective problems, a best-front member by non-dominated sorting
//! otherwise). The merge side is configurable through
//! [`ImmigrationPolicy`], set on the archipelago.

use serde::{Deserialize, Serialize};

use crate::error::PelagoResult;
use crate::population::group::IndividualsGroup;
use crate::population::population::Population;
use crate::utils::constrained::sort_population_con;
use crate::utils::multi_objective::sort_population_mo;

/// How migrants are merged into a destination population
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImmigrationPolicy {
    /// Append migrants, growing the population
    #[default]
    Append,
    /// Overwrite the current worst individual with each migrant
    ReplaceWorst,
}

/// Pick the emigrants an island publishes after a successful evolution.
pub(crate) fn select_emigrants(pop: &Population) -> PelagoResult<IndividualsGroup> {
    if pop.is_empty() {
        return Ok(IndividualsGroup::default());
    }
    let best = if pop.problem().nobj() == 1 {
        pop.champion(0.0)?
    } else {
        sort_population_mo(pop.fs())?[0]
    };
    let mut group = IndividualsGroup::default();
    group.push(pop.ids()[best], pop.xs()[best].clone(), pop.fs()[best].clone());
    Ok(group)
}

fn worst_index(pop: &Population) -> PelagoResult<usize> {
    let prob = pop.problem();
    if prob.nobj() > 1 {
        let order = sort_population_mo(pop.fs())?;
        return Ok(order[order.len() - 1]);
    }
    if prob.nc() > 0 {
        let order = sort_population_con(pop.fs(), prob.nec(), &vec![0.0; prob.nc()])?;
        return Ok(order[order.len() - 1]);
    }
    let mut worst = 0;
    for i in 1..pop.len() {
        if pop.fs()[i][0]
            .partial_cmp(&pop.fs()[worst][0])
            .map_or(false, |o| o.is_gt())
        {
            worst = i;
        }
    }
    Ok(worst)
}

/// Merge migrants into a population under the given policy.
pub(crate) fn merge_migrants(
    pop: &mut Population,
    group: &IndividualsGroup,
    policy: ImmigrationPolicy,
) -> PelagoResult<()> {
    match policy {
        ImmigrationPolicy::Append => pop.inject(group),
        ImmigrationPolicy::ReplaceWorst => {
            for (id, x, f) in group.iter() {
                if pop.is_empty() {
                    let mut single = IndividualsGroup::default();
                    single.push(id, x.to_vec(), f.to_vec());
                    pop.inject(&single)?;
                } else {
                    let worst = worst_index(pop)?;
                    pop.replace(worst, id, x, f)?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::benchmarks::Sphere;
    use crate::problem::{Problem, UserDefinedProblem};

    fn sphere_pop(size: usize, seed: u64) -> Population {
        Population::new(Problem::new(Sphere::new(2)).unwrap(), size, seed).unwrap()
    }

    #[test]
    fn test_select_emigrants_picks_champion() {
        let mut pop = sphere_pop(4, 42);
        pop.set_x(3, &[0.0, 0.0]).unwrap();
        let group = select_emigrants(&pop).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group.ids()[0], pop.ids()[3]);
        assert_eq!(group.xs()[0], vec![0.0, 0.0]);
    }

    #[test]
    fn test_select_emigrants_empty_population() {
        let pop = Population::empty(Problem::new(Sphere::new(2)).unwrap(), 0);
        assert!(select_emigrants(&pop).unwrap().is_empty());
    }

    #[derive(Clone)]
    struct TwoObjectives;

    impl UserDefinedProblem for TwoObjectives {
        fn fitness(&self, x: &[f64]) -> PelagoResult<Vec<f64>> {
            Ok(vec![x[0] * x[0], (x[0] - 1.0) * (x[0] - 1.0)])
        }

        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![-2.0], vec![2.0])
        }

        fn nobj(&self) -> usize {
            2
        }
    }

    #[test]
    fn test_select_emigrants_multiobjective_uses_front() {
        let mut pop = Population::new(Problem::new(TwoObjectives).unwrap(), 3, 1).unwrap();
        pop.set_x(0, &[0.5]).unwrap(); // on the Pareto front
        pop.set_x(1, &[-2.0]).unwrap(); // dominated
        pop.set_x(2, &[2.0]).unwrap(); // dominated
        let group = select_emigrants(&pop).unwrap();
        assert_eq!(group.ids()[0], pop.ids()[0]);
    }

    #[test]
    fn test_merge_append_grows_population() {
        let mut pop = sphere_pop(2, 1);
        let mut group = IndividualsGroup::default();
        group.push(9, vec![1.0, 1.0], vec![2.0]);
        merge_migrants(&mut pop, &group, ImmigrationPolicy::Append).unwrap();
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.ids()[2], 9);
    }

    #[test]
    fn test_merge_replace_worst_keeps_size() {
        let mut pop = sphere_pop(3, 1);
        pop.set_x(0, &[0.1, 0.1]).unwrap();
        pop.set_x(1, &[5.0, 5.0]).unwrap(); // the worst
        pop.set_x(2, &[1.0, 1.0]).unwrap();
        let mut group = IndividualsGroup::default();
        group.push(9, vec![0.0, 0.0], vec![0.0]);
        merge_migrants(&mut pop, &group, ImmigrationPolicy::ReplaceWorst).unwrap();
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.ids()[1], 9);
        assert_eq!(pop.xs()[1], vec![0.0, 0.0]);
    }
}
