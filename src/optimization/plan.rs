//! Compiled contraction plans.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::compile::TreeCompiler;
use super::cost::CostModel;
use super::dynamic::ContractionOptimizer;
use super::order::{explicit_tree, ncon_tree};
use super::poly::Cost;
use super::tree::ContractionTree;
use crate::error::{ContractError, ContractResult};
use crate::launch::PlanConfig;
use crate::network::{ContractionNetwork, IndexLabel};

static NEXT_PLAN_ID: AtomicU64 = AtomicU64::new(1);

/// Strategy for choosing the contraction tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContractionStrategy {
    /// Optimal search when a cost model is given, otherwise NCON order for
    /// NCON-style labels and left-to-right for everything else.
    #[default]
    Auto,
    /// Exhaustive cost-minimizing search.
    Optimal,
    /// Contract positive labels in increasing order.
    Ncon,
    /// Left-deep tree in factor order.
    LeftToRight,
    /// Contract the listed labels in the given order.
    Explicit(Vec<IndexLabel>),
}

/// Where an instruction reads from or writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Input buffer bound to the factor with this index.
    Input(usize),
    /// Intermediate result in this temporary slot.
    Temporary(usize),
    /// The caller's destination buffer.
    Destination,
}

/// Scalar attached to a primitive call.
///
/// Only the final instruction sees the caller's scalars; every temporary is
/// written with `One` and `Zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    One,
    Zero,
    Alpha,
    Beta,
}

/// A primitive call of a compiled plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `dst = beta * dst + alpha * permute(op(src))`, dst axis k = src axis `perm[k]`.
    Add {
        src: Operand,
        conj: bool,
        dst: Operand,
        perm: Vec<usize>,
        alpha: Scale,
        beta: Scale,
    },
    /// Like `Add`, summing over each pair of src axes in `pairs`.
    Trace {
        src: Operand,
        conj: bool,
        dst: Operand,
        perm: Vec<usize>,
        pairs: Vec<(usize, usize)>,
        alpha: Scale,
        beta: Scale,
    },
    /// Pairwise contraction over axes `cind_a` of `a` and `cind_b` of `b`.
    ///
    /// dst axis k is axis `perm[k]` of the open axes of `a` followed by the
    /// open axes of `b`.
    Contract {
        a: Operand,
        conj_a: bool,
        b: Operand,
        conj_b: bool,
        dst: Operand,
        cind_a: Vec<usize>,
        cind_b: Vec<usize>,
        perm: Vec<usize>,
        alpha: Scale,
        beta: Scale,
    },
}

impl Instruction {
    /// Operand written by this instruction.
    pub fn destination(&self) -> Operand {
        match self {
            Instruction::Add { dst, .. }
            | Instruction::Trace { dst, .. }
            | Instruction::Contract { dst, .. } => *dst,
        }
    }

    /// Operands read by this instruction.
    pub fn sources(&self) -> Vec<Operand> {
        match self {
            Instruction::Add { src, .. } | Instruction::Trace { src, .. } => vec![*src],
            Instruction::Contract { a, b, .. } => vec![*a, *b],
        }
    }
}

/// Shape description of an intermediate result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporarySpec {
    /// Slot id, the position of the producing tree node.
    pub slot: usize,
    /// Labels in axis order.
    pub labels: Vec<IndexLabel>,
    /// For each axis, the `(input, axis)` that provides its extent.
    pub extents: Vec<(usize, usize)>,
}

/// A network lowered to primitive calls, ready to be executed any number of times.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    pub(crate) id: u64,
    pub(crate) network: ContractionNetwork,
    pub(crate) tree: ContractionTree,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) temporaries: Vec<TemporarySpec>,
}

impl CompiledPlan {
    /// Plan id used in cache keys.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn network(&self) -> &ContractionNetwork {
        &self.network
    }

    #[inline]
    pub fn tree(&self) -> &ContractionTree {
        &self.tree
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[inline]
    pub fn temporaries(&self) -> &[TemporarySpec] {
        &self.temporaries
    }

    /// Temporary with the given slot id.
    pub fn temporary(&self, slot: usize) -> Option<&TemporarySpec> {
        self.temporaries.iter().find(|t| t.slot == slot)
    }

    /// Total cost of the contraction tree.
    pub fn cost(&self) -> &Cost {
        self.tree.total_cost()
    }

    /// Number of input buffers an execution must supply.
    pub fn num_inputs(&self) -> usize {
        self.network.num_factors()
    }

    /// Labels of an operand in axis order.
    pub fn operand_labels(&self, operand: Operand) -> &[IndexLabel] {
        match operand {
            Operand::Input(i) => self.network.factor(i).labels(),
            Operand::Temporary(slot) => self.temporary(slot).map_or(&[], |t| t.labels.as_slice()),
            Operand::Destination => self.network.output(),
        }
    }
}

impl fmt::Display for CompiledPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "plan {} for {}", self.id, self.network)?;
        writeln!(f, "  tree {} with cost {}", self.tree, self.tree.total_cost())?;
        for (i, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "  {i}: {instruction:?}")?;
        }
        Ok(())
    }
}

/// Chooses a contraction tree for `network` and lowers it to primitive calls.
///
/// The network is validated at construction, so planning only fails on an
/// inconsistent order, conflicting cost symbols or too many factors for the
/// optimal search.
pub fn create_plan(network: &ContractionNetwork, config: &PlanConfig) -> ContractResult<CompiledPlan> {
    let network = if config.conjugate {
        network.conjugated()
    } else {
        network.clone()
    };

    let default_model = CostModel::default();
    let model = config.cost_model.as_ref().unwrap_or(&default_model);

    let strategy = match &config.strategy {
        ContractionStrategy::Auto if config.cost_model.is_some() => ContractionStrategy::Optimal,
        ContractionStrategy::Auto if network.is_ncon() => ContractionStrategy::Ncon,
        ContractionStrategy::Auto => ContractionStrategy::LeftToRight,
        other => other.clone(),
    };

    let tree = match &strategy {
        ContractionStrategy::Optimal => ContractionOptimizer::new(&network, model)
            .with_pruning(config.prune)
            .optimize()?,
        ContractionStrategy::Ncon if !network.is_ncon() => {
            return Err(ContractError::invalid_order(
                "labels do not follow the NCON convention",
            ));
        }
        ContractionStrategy::Ncon => ncon_tree(&network, model)?,
        ContractionStrategy::Explicit(order) => explicit_tree(&network, order, model)?,
        ContractionStrategy::LeftToRight | ContractionStrategy::Auto => {
            ContractionTree::left_to_right(&network, model)?
        }
    };

    let id = config
        .plan_id
        .unwrap_or_else(|| NEXT_PLAN_ID.fetch_add(1, Ordering::Relaxed));

    let (instructions, temporaries) = TreeCompiler::new(&network, &tree).compile();

    log::debug!(
        "plan {} ({:?}): tree {} with cost {}, {} instructions, {} temporaries",
        id,
        strategy,
        tree,
        tree.total_cost(),
        instructions.len(),
        temporaries.len()
    );

    Ok(CompiledPlan {
        id,
        network,
        tree,
        instructions,
        temporaries,
    })
}
