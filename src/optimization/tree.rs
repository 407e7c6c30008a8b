//! Binary contraction trees.

use core::fmt;

use super::cost::CostModel;
use super::poly::Cost;
use crate::error::ContractResult;
use crate::network::{ContractionNetwork, IndexLabel, LabelSet};

/// Index of a node inside a [`ContractionTree`].
pub type NodeId = usize;

/// A node of a contraction tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// An input factor.
    Leaf { factor: usize },
    /// A pairwise contraction of two subtrees.
    Internal {
        left: NodeId,
        right: NodeId,
        /// Labels summed at this step, in label-id order.
        contracted: Vec<IndexLabel>,
        /// Cost of this step alone.
        cost: Cost,
    },
}

/// A full binary tree over the factors of a network.
///
/// Nodes are stored in an arena in post order: children always precede their
/// parent and the root is the last node.
#[derive(Debug, Clone)]
pub struct ContractionTree {
    nodes: Vec<TreeNode>,
    open: Vec<LabelSet>,
    total_cost: Cost,
}

impl ContractionTree {
    #[inline]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.nodes.len() - 1
    }

    /// Sum of the costs of all internal nodes.
    #[inline]
    pub fn total_cost(&self) -> &Cost {
        &self.total_cost
    }

    /// Label ids that are open on the result of a node.
    pub fn open_set(&self, id: NodeId) -> &LabelSet {
        &self.open[id]
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    pub fn num_internal(&self) -> usize {
        self.nodes.len() - self.num_leaves()
    }

    /// Left-deep tree `((F0 * F1) * F2) * ...`.
    pub fn left_to_right(network: &ContractionNetwork, model: &CostModel) -> ContractResult<Self> {
        let mut builder = TreeBuilder::new(network, model);
        let mut acc = builder.leaf(0);
        for factor in 1..network.num_factors() {
            let next = builder.leaf(factor);
            acc = builder.join(acc, next)?;
        }
        Ok(builder.finish())
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        match &self.nodes[id] {
            TreeNode::Leaf { factor } => write!(f, "{factor}"),
            TreeNode::Internal { left, right, .. } => {
                write!(f, "(")?;
                self.write_node(f, *left)?;
                write!(f, ",")?;
                self.write_node(f, *right)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for ContractionTree {
    /// Nested pairs of factor indices, e.g. `((0,2),1)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root())
    }
}

/// Incrementally assembles a tree, pricing every join with a cost model.
pub(crate) struct TreeBuilder<'a> {
    network: &'a ContractionNetwork,
    label_costs: Vec<Cost>,
    nodes: Vec<TreeNode>,
    open: Vec<LabelSet>,
    total_cost: Cost,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(network: &'a ContractionNetwork, model: &CostModel) -> Self {
        Self::with_costs(network, model.resolve(network))
    }

    pub(crate) fn with_costs(network: &'a ContractionNetwork, label_costs: Vec<Cost>) -> Self {
        Self {
            network,
            label_costs,
            nodes: Vec::with_capacity(2 * network.num_factors()),
            open: Vec::with_capacity(2 * network.num_factors()),
            total_cost: Cost::zero(),
        }
    }

    pub(crate) fn leaf(&mut self, factor: usize) -> NodeId {
        self.nodes.push(TreeNode::Leaf { factor });
        self.open.push(self.network.factor_open_set(factor));
        self.nodes.len() - 1
    }

    pub(crate) fn join(&mut self, left: NodeId, right: NodeId) -> ContractResult<NodeId> {
        let (a, b) = (&self.open[left], &self.open[right]);
        let cost = CostModel::compute_pairwise_cost(&self.label_costs, a, b)?;
        let contracted = a
            .intersection(b)
            .iter()
            .map(|id| self.network.label(id).clone())
            .collect();
        let open = a.symmetric_difference(b);

        self.total_cost = self.total_cost.checked_add(&cost)?;
        self.nodes.push(TreeNode::Internal {
            left,
            right,
            contracted,
            cost,
        });
        self.open.push(open);
        Ok(self.nodes.len() - 1)
    }

    /// Finishes the tree; the most recently added node is the root.
    pub(crate) fn finish(self) -> ContractionTree {
        ContractionTree {
            nodes: self.nodes,
            open: self.open,
            total_cost: self.total_cost,
        }
    }
}
