//! Multi-objective orderings
//!
//! Pareto dominance, fast non-dominated sorting and the derived strict
//! ordering of a multi-objective population. All objectives are minimised.
//!
//! Reference: Deb, K., Pratap, A., Agarwal, S., & Meyarivan, T. (2002).
//! A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II.

use std::cmp::Ordering;

use crate::error::{PelagoError, PelagoResult};

/// Whether `a` Pareto-dominates `b`: no component worse, at least one better
pub fn pareto_dominance(a: &[f64], b: &[f64]) -> bool {
    let at_least_as_good = a.iter().zip(b.iter()).all(|(x, y)| x <= y);
    let strictly_better = a.iter().zip(b.iter()).any(|(x, y)| x < y);
    at_least_as_good && strictly_better
}

/// Fast non-dominated sort.
///
/// Returns fronts of indices into `fs`; `fronts[0]` is the Pareto-optimal
/// front.
pub fn fast_non_dominated_sorting(fs: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = fs.len();
    if n == 0 {
        return vec![];
    }

    // domination_count[i] = number of individuals that dominate i
    let mut domination_count = vec![0usize; n];
    // dominated_set[i] = individuals that i dominates
    let mut dominated_set: Vec<Vec<usize>> = vec![vec![]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if pareto_dominance(&fs[i], &fs[j]) {
                dominated_set[i].push(j);
                domination_count[j] += 1;
            } else if pareto_dominance(&fs[j], &fs[i]) {
                dominated_set[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = vec![];
    let mut current_front: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();

    while !current_front.is_empty() {
        let mut next_front = vec![];
        for &i in &current_front {
            for &j in &dominated_set[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next_front.push(j);
                }
            }
        }
        fronts.push(current_front);
        current_front = next_front;
    }

    fronts
}

/// Crowding distance of every member of one front.
///
/// Boundary members of each objective get an infinite distance.
pub fn crowding_distance(front: &[&[f64]]) -> Vec<f64> {
    let n = front.len();
    let mut distance = vec![0.0f64; n];
    if n < 3 {
        for d in &mut distance {
            *d = f64::INFINITY;
        }
        return distance;
    }
    let nobj = front[0].len();
    let mut order: Vec<usize> = (0..n).collect();
    for m in 0..nobj {
        order.sort_by(|&a, &b| {
            front[a][m]
                .partial_cmp(&front[b][m])
                .unwrap_or(Ordering::Equal)
        });
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        let span = front[order[n - 1]][m] - front[order[0]][m];
        if span == 0.0 {
            continue;
        }
        for k in 1..n - 1 {
            distance[order[k]] +=
                (front[order[k + 1]][m] - front[order[k - 1]][m]) / span;
        }
    }
    distance
}

/// Strict ordering of a multi-objective population.
///
/// Indices are returned front by front; within a front, members with larger
/// crowding distance come first.
///
/// # Errors
///
/// Fails with [`PelagoError::DimensionMismatch`] when the fitness vectors do
/// not all have the same length.
pub fn sort_population_mo(fs: &[Vec<f64>]) -> PelagoResult<Vec<usize>> {
    if fs.is_empty() {
        return Ok(vec![]);
    }
    let nobj = fs[0].len();
    for f in fs {
        if f.len() != nobj {
            return Err(PelagoError::DimensionMismatch {
                expected: nobj,
                actual: f.len(),
            });
        }
    }
    let mut order = Vec::with_capacity(fs.len());
    for front in fast_non_dominated_sorting(fs) {
        let points: Vec<&[f64]> = front.iter().map(|&i| fs[i].as_slice()).collect();
        let distance = crowding_distance(&points);
        let mut ranked: Vec<usize> = (0..front.len()).collect();
        ranked.sort_by(|&a, &b| {
            distance[b]
                .partial_cmp(&distance[a])
                .unwrap_or(Ordering::Equal)
        });
        order.extend(ranked.into_iter().map(|k| front[k]));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pareto_dominance() {
        assert!(pareto_dominance(&[1.0, 1.0], &[2.0, 2.0]));
        assert!(pareto_dominance(&[1.0, 2.0], &[1.0, 3.0]));
        assert!(!pareto_dominance(&[1.0, 3.0], &[2.0, 2.0]));
        assert!(!pareto_dominance(&[1.0, 1.0], &[1.0, 1.0]));
    }

    #[test]
    fn test_non_dominated_sorting_fronts() {
        let fs = vec![
            vec![1.0, 4.0], // front 0
            vec![2.0, 2.0], // front 0
            vec![4.0, 1.0], // front 0
            vec![3.0, 3.0], // dominated by [2, 2]
            vec![5.0, 5.0], // dominated by everything
        ];
        let fronts = fast_non_dominated_sorting(&fs);
        assert_eq!(fronts.len(), 3);
        assert_eq!(fronts[0], vec![0, 1, 2]);
        assert_eq!(fronts[1], vec![3]);
        assert_eq!(fronts[2], vec![4]);
    }

    #[test]
    fn test_sort_population_mo_is_permutation() {
        let fs = vec![
            vec![1.0, 4.0],
            vec![2.0, 2.0],
            vec![4.0, 1.0],
            vec![3.0, 3.0],
            vec![5.0, 5.0],
        ];
        let mut order = sort_population_mo(&fs).unwrap();
        // Front members precede dominated individuals.
        assert!(order.iter().position(|&i| i == 4).unwrap() == 4);
        order.sort();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_crowding_prefers_boundary_points() {
        let fs = vec![
            vec![1.0, 5.0],
            vec![3.0, 3.0],
            vec![2.9, 3.1], // crowded next to [3, 3]
            vec![5.0, 1.0],
        ];
        let order = sort_population_mo(&fs).unwrap();
        // The crowded pair ends up last within the front.
        assert!(order[3] == 1 || order[3] == 2);
    }

    #[test]
    fn test_sort_population_mo_rejects_ragged_input() {
        let fs = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(sort_population_mo(&fs).is_err());
    }

    #[test]
    fn test_single_objective_degenerates_to_total_order() {
        let fs = vec![vec![3.0], vec![1.0], vec![2.0]];
        let fronts = fast_non_dominated_sorting(&fs);
        assert_eq!(fronts, vec![vec![1], vec![2], vec![0]]);
    }
}
