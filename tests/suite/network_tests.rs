//! Network construction and validation tests.

use pretty_assertions::assert_eq;
use strided_contract::network::{IndexGraphBuilder, IndexLabel, from_ncon, labels};
use strided_contract::ContractError;

#[test]
fn test_ncon_default_output_is_sorted_by_magnitude() {
    let network = from_ncon([vec![-1, 3, 1, -2, 2], vec![3, 2, 4, -5], vec![1, 4, -4, -3]]).unwrap();

    assert!(network.is_ncon());
    assert_eq!(network.output(), labels([-1i64, -2, -3, -4, -5]).as_slice());
    assert_eq!(network.contracted_ids().count(), 4);
}

#[test]
fn test_named_default_output_follows_appearance() {
    let network = IndexGraphBuilder::new()
        .factor(['k', 'i', 'j'])
        .factor(['j', 'b', 'a'])
        .build()
        .unwrap();

    assert!(!network.is_ncon());
    assert_eq!(network.output(), labels(['k', 'i', 'b', 'a']).as_slice());
}

#[test]
fn test_explicit_output_is_kept() {
    let network = IndexGraphBuilder::new()
        .factor(["row", "inner"])
        .factor(["inner", "col"])
        .output(["col", "row"])
        .build()
        .unwrap();

    assert_eq!(network.output(), labels(["col", "row"]).as_slice());
    let inner = network.id_of(&IndexLabel::name("inner")).unwrap();
    assert!(network.is_contracted(inner));
    assert!(!network.is_traced(inner));
}

#[test]
fn test_trace_label_inside_one_factor() {
    let network = IndexGraphBuilder::new().factor(['i', 'i', 'j']).build().unwrap();

    let i = network.id_of(&'i'.into()).unwrap();
    assert!(network.is_traced(i));
    assert_eq!(network.output(), labels(['j']).as_slice());
}

#[test]
fn test_label_occurring_three_times_is_rejected() {
    let err = from_ncon([vec![1, -1], vec![1, 2], vec![1, 2]]).unwrap_err();

    match err {
        ContractError::MalformedNetwork { label, count, .. } => {
            assert_eq!(label, IndexLabel::Int(1));
            assert_eq!(count, 3);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_output_must_match_free_labels() {
    let missing = IndexGraphBuilder::new()
        .factor(['i', 'j'])
        .output(['i'])
        .build()
        .unwrap_err();
    assert!(matches!(missing, ContractError::MalformedNetwork { .. }));

    let contracted = IndexGraphBuilder::new()
        .factor(['i', 'j'])
        .factor(['j', 'k'])
        .output(['i', 'j', 'k'])
        .build()
        .unwrap_err();
    assert!(matches!(contracted, ContractError::MalformedNetwork { .. }));

    let repeated = IndexGraphBuilder::new()
        .factor(['i', 'j'])
        .output(['i', 'j', 'i'])
        .build()
        .unwrap_err();
    assert!(matches!(repeated, ContractError::MalformedNetwork { .. }));

    let unknown = IndexGraphBuilder::new()
        .factor(['i'])
        .output(['i', 'z'])
        .build()
        .unwrap_err();
    assert!(matches!(unknown, ContractError::MalformedNetwork { .. }));
}

#[test]
fn test_empty_network() {
    let err = IndexGraphBuilder::new().build().unwrap_err();
    assert_eq!(err, ContractError::EmptyNetwork);
}

#[test]
fn test_conjugated_network_flips_flags() {
    let network = IndexGraphBuilder::new()
        .factor(['i', 'j'])
        .conj_factor(['j', 'k'])
        .build()
        .unwrap();

    let flipped = network.conjugated();
    assert!(flipped.factor(0).is_conj());
    assert!(!flipped.factor(1).is_conj());
    assert!(!flipped.conjugated().factor(0).is_conj());
}

#[test]
fn test_primed_labels_are_distinct() {
    let a = IndexLabel::name("a");
    let network = IndexGraphBuilder::new()
        .factor([a.clone(), a.prime()])
        .factor([a.prime(), IndexLabel::name("b")])
        .build()
        .unwrap();

    assert_eq!(network.output(), &[a, IndexLabel::name("b")]);
}
