//! Cost model for contraction operations.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::poly::Cost;
use crate::error::ContractResult;
use crate::network::{ContractionNetwork, IndexLabel, LabelSet};

/// Default name of the scaling variable.
pub const DEFAULT_SYMBOL: &str = "χ";

/// How the labels passed to [`CostModel::listed`] are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListedAs {
    /// Listed labels cost the scaling variable, all others cost 1.
    Expensive,
    /// Listed labels cost 1, all others cost the scaling variable.
    Cheap,
}

/// Assigns a [`Cost`] to every label of a network.
///
/// Joining two intermediates costs the product of the label costs of every
/// label open on either side, which covers both the surviving labels and the
/// ones summed at that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    costs: HashMap<IndexLabel, Cost>,
    default: Cost,
}

impl Default for CostModel {
    /// Every label costs the scaling variable `χ`.
    fn default() -> Self {
        Self {
            costs: HashMap::new(),
            default: Cost::var(DEFAULT_SYMBOL),
        }
    }
}

impl CostModel {
    /// Explicit `(label, cost)` pairs. Unlisted labels cost 1.
    pub fn explicit<L, C>(pairs: impl IntoIterator<Item = (L, C)>) -> Self
    where
        L: Into<IndexLabel>,
        C: Into<Cost>,
    {
        Self {
            costs: pairs
                .into_iter()
                .map(|(l, c)| (l.into(), c.into()))
                .collect(),
            default: Cost::one(),
        }
    }

    /// All listed labels share one cost. Unlisted labels cost 1.
    pub fn uniform_listed<L: Into<IndexLabel>>(
        labels: impl IntoIterator<Item = L>,
        cost: impl Into<Cost>,
    ) -> Self {
        let cost = cost.into();
        Self::explicit(labels.into_iter().map(|l| (l, cost.clone())))
    }

    /// Listed labels marked as expensive or cheap relative to a scaling variable.
    pub fn listed<L: Into<IndexLabel>>(
        labels: impl IntoIterator<Item = L>,
        listed_as: ListedAs,
        symbol: &str,
    ) -> Self {
        let var = Cost::var(symbol);
        match listed_as {
            ListedAs::Expensive => Self::uniform_listed(labels, var),
            ListedAs::Cheap => Self {
                costs: labels.into_iter().map(|l| (l.into(), Cost::one())).collect(),
                default: var,
            },
        }
    }

    /// Integer costs equal to the dimension extents.
    pub fn from_extents<L: Into<IndexLabel>>(extents: impl IntoIterator<Item = (L, usize)>) -> Self {
        Self::explicit(extents.into_iter().map(|(l, d)| (l, Cost::from(d))))
    }

    /// Every unlisted label costs `cost`.
    pub fn with_default(mut self, cost: impl Into<Cost>) -> Self {
        self.default = cost.into();
        self
    }

    /// Overrides the cost of one label.
    pub fn with_cost(mut self, label: impl Into<IndexLabel>, cost: impl Into<Cost>) -> Self {
        self.costs.insert(label.into(), cost.into());
        self
    }

    /// Cost of a label.
    pub fn cost_of(&self, label: &IndexLabel) -> &Cost {
        self.costs.get(label).unwrap_or(&self.default)
    }

    /// Costs indexed by the network's interned label ids.
    pub fn resolve(&self, network: &ContractionNetwork) -> Vec<Cost> {
        (0..network.num_labels())
            .map(|id| self.cost_of(network.label(id)).clone())
            .collect()
    }

    /// Computes the cost of joining two intermediates with open label sets `a` and `b`.
    pub fn compute_pairwise_cost(
        label_costs: &[Cost],
        a: &LabelSet,
        b: &LabelSet,
    ) -> ContractResult<Cost> {
        a.union(b)
            .iter()
            .try_fold(Cost::one(), |acc, id| acc.checked_mul(&label_costs[id]))
    }
}
