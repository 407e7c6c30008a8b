//! NCON ordering and plan lowering tests.

use pretty_assertions::assert_eq;
use strided_contract::launch::PlanConfig;
use strided_contract::network::{ContractionNetwork, from_ncon, labels};
use strided_contract::optimization::{
    ContractionStrategy, CostModel, Instruction, Operand, Scale, create_plan, ncon_tree,
};
use strided_contract::ContractError;

fn scenario() -> ContractionNetwork {
    from_ncon([vec![-1, 3, 1, -2, 2], vec![3, 2, 4, -5], vec![1, 4, -4, -3]]).unwrap()
}

#[test]
fn test_scenario_contracts_a_and_c_first() {
    let network = scenario();
    let tree = ncon_tree(&network, &CostModel::default()).unwrap();

    assert_eq!(tree.to_string(), "((0,2),1)");
    assert_eq!(tree.num_internal(), 2);
}

#[test]
fn test_ncon_ordering_is_deterministic() {
    let first = create_plan(&scenario(), &PlanConfig::default()).unwrap();
    let second = create_plan(&scenario(), &PlanConfig::default()).unwrap();

    assert_eq!(first.tree().to_string(), second.tree().to_string());
    assert_eq!(first.instructions(), second.instructions());
    assert_eq!(first.temporaries(), second.temporaries());
    assert_ne!(first.id(), second.id());
}

#[test]
fn test_scenario_lowering() {
    let plan = create_plan(&scenario(), &PlanConfig::default().with_plan_id(7)).unwrap();

    assert_eq!(plan.id(), 7);
    assert_eq!(plan.num_inputs(), 3);
    assert_eq!(plan.instructions().len(), 2);
    assert_eq!(plan.temporaries().len(), 1);

    let slot = plan.temporaries()[0].slot;
    match &plan.instructions()[0] {
        Instruction::Contract { a, b, dst, alpha, beta, .. } => {
            assert_eq!((*a, *b), (Operand::Input(0), Operand::Input(2)));
            assert_eq!(*dst, Operand::Temporary(slot));
            assert_eq!((*alpha, *beta), (Scale::One, Scale::Zero));
        }
        other => panic!("expected a contraction, got {other:?}"),
    }
    match &plan.instructions()[1] {
        Instruction::Contract { a, b, dst, alpha, beta, .. } => {
            assert_eq!((*a, *b), (Operand::Temporary(slot), Operand::Input(1)));
            assert_eq!(*dst, Operand::Destination);
            assert_eq!((*alpha, *beta), (Scale::Alpha, Scale::Beta));
        }
        other => panic!("expected a contraction, got {other:?}"),
    }

    assert_eq!(
        plan.operand_labels(Operand::Destination),
        labels([-1i64, -2, -3, -4, -5]).as_slice()
    );
}

#[test]
fn test_explicit_order_changes_tree() {
    let config = PlanConfig::default().with_order([3i64, 2, 1, 4]);
    let plan = create_plan(&scenario(), &config).unwrap();

    assert_eq!(plan.tree().to_string(), "((0,1),2)");

    let incomplete = PlanConfig::default().with_order([3i64, 2]);
    let err = create_plan(&scenario(), &incomplete).unwrap_err();
    assert!(matches!(err, ContractError::InvalidOrder { .. }));
}

#[test]
fn test_cost_model_switches_to_optimal_search() {
    let config = PlanConfig::default().with_cost_model(CostModel::default());
    let plan = create_plan(&scenario(), &config).unwrap();
    let reference = create_plan(
        &scenario(),
        &PlanConfig::default().with_strategy(ContractionStrategy::LeftToRight),
    )
    .unwrap();

    assert!(!reference.cost().try_lt(plan.cost()).unwrap());
}

#[test]
fn test_traced_leaf_emits_trace_first() {
    let network = from_ncon([vec![1, 1, 2], vec![2, -1]]).unwrap();
    let plan = create_plan(&network, &PlanConfig::default()).unwrap();

    assert!(matches!(
        plan.instructions()[0],
        Instruction::Trace {
            src: Operand::Input(0),
            dst: Operand::Temporary(_),
            ..
        }
    ));
    assert!(matches!(
        plan.instructions().last(),
        Some(Instruction::Contract {
            dst: Operand::Destination,
            ..
        })
    ));
}
