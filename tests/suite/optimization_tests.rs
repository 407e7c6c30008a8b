//! Contraction tree optimization tests.

use core::cmp::Ordering;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use strided_contract::launch::PlanConfig;
use strided_contract::network::{ContractionNetwork, IndexGraphBuilder, IndexLabel};
use strided_contract::optimization::{
    ContractionOptimizer, ContractionTree, Cost, CostModel, MAX_OPTIMAL_FACTORS, create_plan, explicit_tree,
    optimal_tree,
};
use strided_contract::ContractError;

fn chain(extents: &[usize]) -> (ContractionNetwork, CostModel) {
    let label = |k: usize| IndexLabel::name(format!("l{k}"));
    let mut builder = IndexGraphBuilder::new();
    for k in 0..extents.len() - 1 {
        builder.push_factor([label(k), label(k + 1)], false);
    }
    let network = builder
        .output([label(0), label(extents.len() - 1)])
        .build()
        .unwrap();
    let model = CostModel::from_extents(extents.iter().enumerate().map(|(k, &d)| (label(k), d)));
    (network, model)
}

#[test]
fn test_three_chain_matches_brute_force() {
    // A[10x20] B[20x30] C[30x40]
    let (network, model) = chain(&[10, 20, 30, 40]);
    let ab_c = 10 * 20 * 30 + 10 * 30 * 40;
    let a_bc = 20 * 30 * 40 + 10 * 20 * 40;
    let ac_b = 10 * 20 * 30 * 40 + 10 * 20 * 30 * 40;
    let best = ab_c.min(a_bc).min(ac_b);

    let tree = optimal_tree(&network, &model).unwrap();

    assert_eq!(tree.total_cost(), &Cost::from(best as u64));
    assert_eq!(tree.to_string(), "((0,1),2)");

    assert!(explicit_tree(&network, &[], &model).is_err());
    let right_first = explicit_tree(&network, &[IndexLabel::name("l2"), IndexLabel::name("l1")], &model).unwrap();
    assert_eq!(right_first.total_cost(), &Cost::from(a_bc as u64));
}

#[test]
fn test_skewed_chain_prefers_right_pair() {
    // A[40x30] B[30x20] C[20x10]
    let (network, model) = chain(&[40, 30, 20, 10]);
    let tree = optimal_tree(&network, &model).unwrap();

    assert_eq!(tree.to_string(), "(0,(1,2))");
    assert_eq!(tree.total_cost(), &Cost::from((30 * 20 * 10 + 40 * 30 * 10) as u64));
}

#[test]
fn test_tree_shape_counts() {
    let (network, model) = chain(&[3, 4, 5, 6, 7, 8]);
    let tree = optimal_tree(&network, &model).unwrap();

    assert_eq!(tree.num_leaves(), 5);
    assert_eq!(tree.num_internal(), 4);
    assert_eq!(tree.nodes().len(), 9);
}

#[test]
fn test_single_factor_tree() {
    let network = IndexGraphBuilder::new().factor(['i', 'i', 'j']).build().unwrap();
    let tree = optimal_tree(&network, &CostModel::default()).unwrap();

    assert_eq!(tree.num_leaves(), 1);
    assert_eq!(tree.num_internal(), 0);
    assert!(tree.total_cost().is_zero());
}

#[test]
fn test_too_many_factors() {
    let extents = vec![2; MAX_OPTIMAL_FACTORS + 2];
    let (network, model) = chain(&extents);
    assert_eq!(network.num_factors(), MAX_OPTIMAL_FACTORS + 1);

    let err = optimal_tree(&network, &model).unwrap_err();
    assert_eq!(
        err,
        ContractError::TooManyFactors {
            count: MAX_OPTIMAL_FACTORS + 1,
            max: MAX_OPTIMAL_FACTORS
        }
    );
}

#[test]
fn test_mixed_cost_symbols_fail_planning() {
    let network = IndexGraphBuilder::new()
        .factor(['i', 'j'])
        .factor(['j', 'k'])
        .output(['i', 'k'])
        .build()
        .unwrap();
    let config = PlanConfig::new().with_cost_model(CostModel::default().with_cost('i', Cost::var("D")));

    let err = create_plan(&network, &config).unwrap_err();
    match err {
        ContractError::IncomparableCost { left, right } => {
            let mentions = |s: &str| (s.contains('D'), s.contains('χ'));
            assert!(
                mentions(&left) == (true, false) && mentions(&right) == (false, true)
                    || mentions(&left) == (false, true) && mentions(&right) == (true, false),
                "{left} vs {right}"
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_polynomial_costs_on_ring() {
    // four-factor ring, every label costs χ
    let network = IndexGraphBuilder::new()
        .factor(['a', 'b', 'x'])
        .factor(['b', 'c'])
        .factor(['c', 'd', 'y'])
        .factor(['d', 'a'])
        .build()
        .unwrap();
    let model = CostModel::default();

    let optimal = optimal_tree(&network, &model).unwrap();
    let reference = ContractionTree::left_to_right(&network, &model).unwrap();

    assert_ne!(
        optimal.total_cost().try_cmp(reference.total_cost()).unwrap(),
        Ordering::Greater
    );
    assert_eq!(optimal.total_cost().symbol(), Some("χ"));
}

fn ring_or_chain(extents: Vec<usize>, closed: bool) -> (ContractionNetwork, CostModel) {
    let n = extents.len();
    let label = |k: usize| IndexLabel::name(format!("l{}", k % n));
    let mut builder = IndexGraphBuilder::new();
    let factors = if closed { n } else { n - 1 };
    for k in 0..factors {
        builder.push_factor([label(k), label(k + 1), IndexLabel::name(format!("o{k}"))], false);
    }
    let network = builder.build().unwrap();
    let mut model = CostModel::from_extents(extents.iter().enumerate().map(|(k, &d)| (label(k), d)));
    for k in 0..factors {
        model = model.with_cost(IndexLabel::name(format!("o{k}")), 2u64);
    }
    (network, model)
}

proptest! {
    #[test]
    fn prop_optimal_never_worse_than_left_to_right(
        extents in prop::collection::vec(1usize..12, 3..8),
        closed in any::<bool>(),
    ) {
        let (network, model) = ring_or_chain(extents, closed);

        let pruned = ContractionOptimizer::new(&network, &model).optimize().unwrap();
        let exhaustive = ContractionOptimizer::new(&network, &model)
            .with_pruning(false)
            .optimize()
            .unwrap();
        let reference = ContractionTree::left_to_right(&network, &model).unwrap();

        prop_assert_ne!(pruned.total_cost().try_cmp(reference.total_cost()).unwrap(), Ordering::Greater);
        prop_assert_eq!(pruned.total_cost(), exhaustive.total_cost());
        prop_assert_eq!(pruned.num_internal(), network.num_factors() - 1);
    }
}
