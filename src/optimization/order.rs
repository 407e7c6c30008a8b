//! Label-ordered contraction trees.
//!
//! Labels are processed in a fixed order. For each label the two nodes that
//! currently hold its occurrences are merged, contracting every label they
//! share. Labels whose occurrences already sit in one node are skipped. Any
//! nodes left disconnected are then joined left to right by their first factor.

use hashbrown::HashSet;

use super::cost::CostModel;
use super::tree::{ContractionTree, NodeId, TreeBuilder};
use crate::error::{ContractError, ContractResult};
use crate::network::{ContractionNetwork, IndexLabel};

/// Deterministic tree for networks following the NCON convention.
///
/// Positive labels are contracted in increasing order.
pub fn ncon_tree(network: &ContractionNetwork, model: &CostModel) -> ContractResult<ContractionTree> {
    let mut positive: Vec<(i64, usize)> = network
        .contracted_ids()
        .filter_map(|id| network.label(id).as_int().map(|v| (v, id)))
        .filter(|&(v, _)| v > 0)
        .collect();
    positive.sort_unstable();

    ordered_tree(network, model, positive.into_iter().map(|(_, id)| id))
}

/// Tree following a caller-supplied contraction order.
///
/// The order must name every contracted label of the network exactly once.
pub fn explicit_tree(
    network: &ContractionNetwork,
    order: &[IndexLabel],
    model: &CostModel,
) -> ContractResult<ContractionTree> {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut ids = Vec::with_capacity(order.len());

    for label in order {
        let id = network
            .id_of(label)
            .ok_or_else(|| ContractError::invalid_order(format!("label {label} does not occur")))?;
        if !network.is_contracted(id) {
            return Err(ContractError::invalid_order(format!(
                "label {label} is not contracted"
            )));
        }
        if !seen.insert(id) {
            return Err(ContractError::invalid_order(format!(
                "label {label} is listed twice"
            )));
        }
        ids.push(id);
    }

    if let Some(missing) = network.contracted_ids().find(|id| !seen.contains(id)) {
        return Err(ContractError::invalid_order(format!(
            "contracted label {} is missing from the order",
            network.label(missing)
        )));
    }

    ordered_tree(network, model, ids)
}

fn ordered_tree(
    network: &ContractionNetwork,
    model: &CostModel,
    label_ids: impl IntoIterator<Item = usize>,
) -> ContractResult<ContractionTree> {
    let mut builder = TreeBuilder::new(network, model);
    let mut node_of: Vec<NodeId> = (0..network.num_factors())
        .map(|factor| builder.leaf(factor))
        .collect();

    for id in label_ids {
        let occ = network.occurrences(id);
        let (a, b) = (node_of[occ[0].factor], node_of[occ[1].factor]);
        if a == b {
            continue;
        }

        let joined = builder.join(a, b)?;
        for node in node_of.iter_mut().filter(|n| **n == a || **n == b) {
            *node = joined;
        }
    }

    // node_of is indexed by factor, so first appearances are in first-factor order
    let mut remaining: Vec<NodeId> = Vec::new();
    for &node in &node_of {
        if !remaining.contains(&node) {
            remaining.push(node);
        }
    }

    let mut iter = remaining.into_iter();
    if let Some(mut acc) = iter.next() {
        for node in iter {
            acc = builder.join(acc, node)?;
        }
    }

    Ok(builder.finish())
}
