//! Contraction order optimization and lowering.
//!
//! Implements several strategies for choosing a contraction tree:
//! - Optimal: exhaustive subset search with branch-and-bound pruning
//! - NCON: positive labels in increasing order
//! - Explicit: a caller-supplied label order
//! - Left-to-right: the left-deep tree in factor order

mod compile;
mod cost;
mod dynamic;
mod order;
mod plan;
mod poly;
mod tree;

pub use compile::TreeCompiler;
pub use cost::{CostModel, DEFAULT_SYMBOL, ListedAs};
pub use dynamic::{ContractionOptimizer, MAX_OPTIMAL_FACTORS, optimal_tree};
pub use order::{explicit_tree, ncon_tree};
pub use plan::{
    CompiledPlan, ContractionStrategy, Instruction, Operand, Scale, TemporarySpec, create_plan,
};
pub use poly::{Cost, Poly};
pub use tree::{ContractionTree, NodeId, TreeNode};
