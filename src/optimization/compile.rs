//! Lowering of contraction trees to primitive calls.

use super::plan::{Instruction, Operand, Scale, TemporarySpec};
use super::tree::{ContractionTree, NodeId, TreeNode};
use crate::network::{ContractionNetwork, IndexLabel};

/// A compiled node result: where it lives and what its axes are.
struct Value {
    operand: Operand,
    conj: bool,
    labels: Vec<IndexLabel>,
    /// `(input, axis)` providing the extent of each axis.
    extents: Vec<(usize, usize)>,
}

impl Value {
    fn position(&self, label: &IndexLabel) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// Walks a contraction tree in post order and emits one instruction per step.
///
/// Leaves without repeated labels are read in place. A leaf with a repeated
/// label is traced first. Internal nodes become pairwise contractions whose
/// result keeps the open labels of the left child followed by those of the
/// right child. The root writes straight into the destination, in output
/// order, and is the only instruction carrying the caller's scalars.
pub struct TreeCompiler<'a> {
    network: &'a ContractionNetwork,
    tree: &'a ContractionTree,
    instructions: Vec<Instruction>,
    temporaries: Vec<TemporarySpec>,
}

impl<'a> TreeCompiler<'a> {
    pub fn new(network: &'a ContractionNetwork, tree: &'a ContractionTree) -> Self {
        Self {
            network,
            tree,
            instructions: Vec::new(),
            temporaries: Vec::new(),
        }
    }

    pub fn compile(mut self) -> (Vec<Instruction>, Vec<TemporarySpec>) {
        let root = self.tree.root();
        let value = self.compile_node(root, true);

        // an untraced root leaf has produced no instruction yet
        if value.operand != Operand::Destination {
            let perm = self
                .network
                .output()
                .iter()
                .filter_map(|l| value.position(l))
                .collect();
            self.instructions.push(Instruction::Add {
                src: value.operand,
                conj: value.conj,
                dst: Operand::Destination,
                perm,
                alpha: Scale::Alpha,
                beta: Scale::Beta,
            });
        }

        (self.instructions, self.temporaries)
    }

    fn compile_node(&mut self, id: NodeId, is_root: bool) -> Value {
        let tree = self.tree;
        match tree.node(id) {
            TreeNode::Leaf { factor } => self.compile_leaf(id, *factor, is_root),
            TreeNode::Internal {
                left,
                right,
                contracted,
                ..
            } => {
                let a = self.compile_node(*left, false);
                let b = self.compile_node(*right, false);
                self.compile_join(id, a, b, contracted, is_root)
            }
        }
    }

    fn compile_leaf(&mut self, id: NodeId, factor: usize, is_root: bool) -> Value {
        let network = self.network;
        let f = network.factor(factor);
        let labels = f.labels();

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            if let Some(j) = labels[i + 1..].iter().position(|l| l == label) {
                pairs.push((i, i + 1 + j));
            }
        }

        let kept: Vec<usize> = (0..labels.len())
            .filter(|axis| !pairs.iter().any(|&(p, q)| p == *axis || q == *axis))
            .collect();

        if pairs.is_empty() {
            return Value {
                operand: Operand::Input(factor),
                conj: f.is_conj(),
                labels: labels.to_vec(),
                extents: (0..labels.len()).map(|axis| (factor, axis)).collect(),
            };
        }

        let result_labels: Vec<IndexLabel> = if is_root {
            network.output().to_vec()
        } else {
            kept.iter().map(|&axis| labels[axis].clone()).collect()
        };
        let perm: Vec<usize> = result_labels
            .iter()
            .filter_map(|l| kept.iter().copied().find(|&axis| &labels[axis] == l))
            .collect();
        let extents: Vec<(usize, usize)> = perm.iter().map(|&axis| (factor, axis)).collect();

        let (dst, alpha, beta) = self.destination(id, is_root, &result_labels, &extents);
        self.instructions.push(Instruction::Trace {
            src: Operand::Input(factor),
            conj: f.is_conj(),
            dst,
            perm,
            pairs,
            alpha,
            beta,
        });

        Value {
            operand: dst,
            conj: false,
            labels: result_labels,
            extents,
        }
    }

    fn compile_join(
        &mut self,
        id: NodeId,
        a: Value,
        b: Value,
        contracted: &[IndexLabel],
        is_root: bool,
    ) -> Value {
        let cind_a: Vec<usize> = contracted.iter().filter_map(|l| a.position(l)).collect();
        let cind_b: Vec<usize> = contracted.iter().filter_map(|l| b.position(l)).collect();

        // (label, extent source) for the open axes of a followed by those of b
        let open: Vec<(IndexLabel, (usize, usize))> = a
            .labels
            .iter()
            .zip(&a.extents)
            .enumerate()
            .filter(|(axis, _)| !cind_a.contains(axis))
            .chain(
                b.labels
                    .iter()
                    .zip(&b.extents)
                    .enumerate()
                    .filter(|(axis, _)| !cind_b.contains(axis)),
            )
            .map(|(_, (l, e))| (l.clone(), *e))
            .collect();

        let result_labels: Vec<IndexLabel> = if is_root {
            self.network.output().to_vec()
        } else {
            open.iter().map(|(l, _)| l.clone()).collect()
        };
        let perm: Vec<usize> = result_labels
            .iter()
            .filter_map(|l| open.iter().position(|(o, _)| o == l))
            .collect();
        let extents: Vec<(usize, usize)> = perm.iter().map(|&k| open[k].1).collect();

        let (dst, alpha, beta) = self.destination(id, is_root, &result_labels, &extents);
        self.instructions.push(Instruction::Contract {
            a: a.operand,
            conj_a: a.conj,
            b: b.operand,
            conj_b: b.conj,
            dst,
            cind_a,
            cind_b,
            perm,
            alpha,
            beta,
        });

        Value {
            operand: dst,
            conj: false,
            labels: result_labels,
            extents,
        }
    }

    fn destination(
        &mut self,
        id: NodeId,
        is_root: bool,
        labels: &[IndexLabel],
        extents: &[(usize, usize)],
    ) -> (Operand, Scale, Scale) {
        if is_root {
            return (Operand::Destination, Scale::Alpha, Scale::Beta);
        }
        self.temporaries.push(TemporarySpec {
            slot: id,
            labels: labels.to_vec(),
            extents: extents.to_vec(),
        });
        (Operand::Temporary(id), Scale::One, Scale::Zero)
    }
}
