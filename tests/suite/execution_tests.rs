//! End-to-end execution on the dense backend.

use std::collections::HashMap;

use num_complex::Complex;
use pretty_assertions::assert_eq;
use strided_contract::backend::{DenseBackend, DenseTensor};
use strided_contract::launch::{CacheManager, Executor, PlanConfig, execute, execute_into};
use strided_contract::network::{IndexGraphBuilder, IndexLabel, from_ncon};
use strided_contract::optimization::{ContractionStrategy, create_plan};
use strided_contract::{ContractError, ncon};

/// Evaluates an NCON network by summing over every label assignment.
fn direct_sum(index_lists: &[Vec<i64>], tensors: &[&DenseTensor<f64>], output: &[i64]) -> Vec<f64> {
    let mut extents: HashMap<i64, usize> = HashMap::new();
    for (list, tensor) in index_lists.iter().zip(tensors) {
        for (label, &d) in list.iter().zip(tensor.dims()) {
            extents.insert(*label, d);
        }
    }
    let mut all: Vec<i64> = extents.keys().copied().collect();
    all.sort_unstable();

    let out_size: usize = output.iter().map(|l| extents[l]).product();
    let mut result = vec![0.0; out_size.max(1)];
    let mut assignment = vec![0usize; all.len()];
    let value_of = |assignment: &[usize], label: i64| {
        let pos = all.iter().position(|&l| l == label).unwrap();
        assignment[pos]
    };

    loop {
        let mut product = 1.0;
        for (list, tensor) in index_lists.iter().zip(tensors) {
            let index: Vec<usize> = list.iter().map(|&l| value_of(&assignment, l)).collect();
            product *= tensor.get(&index).unwrap();
        }
        let mut offset = 0;
        for &l in output {
            offset = offset * extents[&l] + value_of(&assignment, l);
        }
        result[offset] += product;

        // odometer over all labels
        let mut axis = all.len();
        loop {
            if axis == 0 {
                return result;
            }
            axis -= 1;
            assignment[axis] += 1;
            if assignment[axis] < extents[&all[axis]] {
                break;
            }
            assignment[axis] = 0;
        }
    }
}

fn filled(dims: &[usize], seed: usize) -> DenseTensor<f64> {
    DenseTensor::from_fn(dims, |ix| {
        let h = ix.iter().enumerate().fold(seed, |acc, (k, &i)| acc * 7 + (k + 1) * i);
        (h % 5) as f64 - 2.0
    })
}

#[test]
fn test_scenario_matches_direct_summation() {
    let lists = vec![vec![-1, 3, 1, -2, 2], vec![3, 2, 4, -5], vec![1, 4, -4, -3]];
    // extents: -1:2 -2:3 -3:2 -4:3 -5:2, 1:2 2:3 3:2 4:2
    let a = filled(&[2, 2, 2, 3, 3], 1);
    let b = filled(&[2, 3, 2, 2], 2);
    let c = filled(&[2, 2, 3, 2], 3);
    let expected = direct_sum(&lists, &[&a, &b, &c], &[-1, -2, -3, -4, -5]);

    let network = from_ncon(lists.clone()).unwrap();
    let backend = DenseBackend::<f64>::new();
    let cache = CacheManager::default();

    for strategy in [
        ContractionStrategy::Ncon,
        ContractionStrategy::Optimal,
        ContractionStrategy::LeftToRight,
    ] {
        let plan = create_plan(&network, &PlanConfig::default().with_strategy(strategy)).unwrap();
        let result = execute(&backend, &plan, &[&a, &b, &c], &cache).unwrap();
        assert_eq!(result.dims(), &[2, 3, 2, 3, 2]);
        assert_eq!(result.data(), expected.as_slice());
    }
}

#[test]
fn test_trace_inside_network() {
    let lists = vec![vec![1, 1, 2], vec![2, -1]];
    let a = filled(&[3, 3, 2], 4);
    let b = filled(&[2, 4], 5);
    let expected = direct_sum(&lists, &[&a, &b], &[-1]);

    let result = ncon(&DenseBackend::<f64>::new(), &[&a, &b], &lists).unwrap();

    assert_eq!(result.data(), expected.as_slice());
}

#[test]
fn test_full_contraction_to_scalar() {
    let lists = vec![vec![1, 2], vec![2, 3], vec![3, 1]];
    let m = filled(&[3, 3], 6);
    let expected = direct_sum(&lists, &[&m, &m, &m], &[]);

    let result = ncon(&DenseBackend::<f64>::new(), &[&m, &m, &m], &lists).unwrap();

    assert!(result.dims().is_empty());
    assert_eq!(result.to_scalar(), Some(expected[0]));
}

#[test]
fn test_alpha_beta_scaling() {
    let network = from_ncon([vec![-1, 1], vec![1, -2]]).unwrap();
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();
    let a = DenseTensor::new([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let b = DenseTensor::new([2, 2], vec![5.0, 6.0, 7.0, 8.0]).unwrap();
    let mut c = DenseTensor::new([2, 2], vec![1.0, 1.0, 1.0, 1.0]).unwrap();

    let backend = DenseBackend::<f64>::new();
    let cache = CacheManager::default();
    execute_into(&backend, &plan, &[&a, &b], &mut c, 2.0, 10.0, &cache).unwrap();

    // a * b = [19, 22, 43, 50]
    assert_eq!(c.data(), &[48.0, 54.0, 96.0, 110.0]);
}

#[test]
fn test_alpha_only_reaches_final_instruction() {
    let network = from_ncon([vec![-1, 1], vec![1, 2], vec![2, -2]]).unwrap();
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();
    let id = DenseTensor::from_fn([2, 2], |ix| if ix[0] == ix[1] { 1.0 } else { 0.0 });

    let backend = DenseBackend::<f64>::new();
    let cache = CacheManager::default();
    let result = Executor::new(&backend, &cache)
        .execute(&plan, &[&id, &id, &id], 3.0)
        .unwrap();

    assert_eq!(result.data(), &[3.0, 0.0, 0.0, 3.0]);
}

#[test]
fn test_conjugation_flags() {
    let i = Complex::new(0.0, 1.0);
    let one = Complex::new(1.0, 0.0);
    let u = DenseTensor::new([2], vec![one, i]).unwrap();
    let v = DenseTensor::new([2], vec![i, one]).unwrap();

    let network = IndexGraphBuilder::new()
        .conj_factor(['k'])
        .factor(['k'])
        .build()
        .unwrap();
    let backend = DenseBackend::<Complex<f64>>::new();
    let cache = CacheManager::default();

    // conj(u) . v = 1 * i + (-i) * 1 = 0
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();
    let dot = execute(&backend, &plan, &[&u, &v], &cache).unwrap();
    assert_eq!(dot.to_scalar(), Some(Complex::new(0.0, 0.0)));

    // conjugating the whole expression flips both flags: u . conj(u) = 2
    let plan = create_plan(&network, &PlanConfig::default().with_conjugate(true)).unwrap();
    let dot = execute(&backend, &plan, &[&u, &u], &cache).unwrap();
    assert_eq!(dot.to_scalar(), Some(Complex::new(2.0, 0.0)));
}

#[test]
fn test_repeated_execution_reuses_temporaries() {
    let lists = vec![vec![-1, 1], vec![1, 2], vec![2, 3], vec![3, -2]];
    let network = from_ncon(lists.clone()).unwrap();
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();
    let m = filled(&[3, 3], 7);

    let backend = DenseBackend::<f64>::new();
    let cache = CacheManager::default();
    let first = execute(&backend, &plan, &[&m, &m, &m, &m], &cache).unwrap();
    let misses = cache.stats().misses;
    let second = execute(&backend, &plan, &[&m, &m, &m, &m], &cache).unwrap();

    assert_eq!(first, second);
    assert_eq!(misses, plan.temporaries().len() as u64);
    assert_eq!(cache.stats().misses, misses);
    assert_eq!(cache.stats().hits, misses);
    assert_eq!(first.data(), direct_sum(&lists, &[&m, &m, &m, &m], &[-1, -2]).as_slice());
}

#[test]
fn test_dimension_mismatch_stops_execution() {
    let network = from_ncon([vec![-1, 1], vec![1, 2], vec![2, -2]]).unwrap();
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();
    let a = filled(&[2, 2], 1);
    let b = filled(&[2, 3], 2);
    let c = filled(&[4, 2], 3);

    let backend = DenseBackend::<f64>::new();
    let cache = CacheManager::default();
    let err = execute(&backend, &plan, &[&a, &b, &c], &cache).unwrap_err();

    assert_eq!(
        err,
        ContractError::DimensionMismatch {
            label: IndexLabel::Int(2),
            expected: 3,
            got: 4
        }
    );
    // the temporary acquired before the failure went back to the cache
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.total_bytes(), 2 * 3 * 8);
}

#[test]
fn test_label_occurring_three_times_fails_before_execution() {
    let err = from_ncon([vec![1, 1], vec![1, -1]]).unwrap_err();
    assert!(matches!(err, ContractError::MalformedNetwork { count: 3, .. }));
}
