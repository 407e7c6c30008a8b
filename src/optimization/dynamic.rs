//! Optimal contraction tree via dynamic programming.
//!
//! Finds the globally optimal contraction order by trying all possible
//! bipartitions of every subset of factors. Exponential in the number of
//! factors, but optimal.

use hashbrown::HashMap;

use super::cost::CostModel;
use super::poly::Cost;
use super::tree::{ContractionTree, NodeId, TreeBuilder};
use crate::error::{ContractError, ContractResult};
use crate::network::{ContractionNetwork, LabelSet};

/// Maximum number of factors handled by the exhaustive search.
pub const MAX_OPTIMAL_FACTORS: usize = 30;

/// Factor count above which the search logs a warning.
const SLOW_SEARCH_FACTORS: usize = 16;

#[derive(Debug, Clone)]
struct Entry {
    cost: Cost,
    /// Left part of the best bipartition; zero for single factors.
    split: u64,
}

/// Exhaustive, cost-minimizing search over contraction trees.
///
/// Subsets of factors are bitmasks. Each subset is solved once, by
/// increasing size, from the memoized solutions of its two parts.
#[derive(Debug, Clone)]
pub struct ContractionOptimizer<'a> {
    network: &'a ContractionNetwork,
    model: &'a CostModel,
    prune: bool,
}

impl<'a> ContractionOptimizer<'a> {
    pub fn new(network: &'a ContractionNetwork, model: &'a CostModel) -> Self {
        Self {
            network,
            model,
            prune: true,
        }
    }

    /// Enables or disables branch-and-bound pruning. On by default.
    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Runs the search and returns the cheapest tree.
    pub fn optimize(&self) -> ContractResult<ContractionTree> {
        let n = self.network.num_factors();
        if n > MAX_OPTIMAL_FACTORS {
            return Err(ContractError::TooManyFactors {
                count: n,
                max: MAX_OPTIMAL_FACTORS,
            });
        }
        if n > SLOW_SEARCH_FACTORS {
            log::warn!("exhaustive contraction search over {n} factors may be slow");
        }

        let reference = ContractionTree::left_to_right(self.network, self.model)?;
        if n <= 2 {
            return Ok(reference);
        }

        let label_costs = self.model.resolve(self.network);
        let bound = reference.total_cost().clone();

        let mut open: HashMap<u64, LabelSet> = HashMap::new();
        let mut memo: HashMap<u64, Entry> = HashMap::new();

        for factor in 0..n {
            let subset = 1u64 << factor;
            open.insert(subset, self.network.factor_open_set(factor));
            memo.insert(
                subset,
                Entry {
                    cost: Cost::zero(),
                    split: 0,
                },
            );
        }

        let mut pruned = 0usize;

        for size in 2..=n {
            for subset in subsets_of_size(n, size) {
                let low = subset & subset.wrapping_neg();
                let rest = subset ^ low;

                let subset_open = open[&low].symmetric_difference(&open[&rest]);
                open.insert(subset, subset_open);

                let mut best: Option<Entry> = None;

                for sub in proper_submasks(rest) {
                    let left = low | sub;
                    let right = rest ^ sub;

                    let (Some(l), Some(r)) = (memo.get(&left), memo.get(&right)) else {
                        continue;
                    };

                    let partial = l.cost.checked_add(&r.cost)?;
                    if let (true, Some(b)) = (self.prune, &best) {
                        if !partial.try_lt(&b.cost)? {
                            pruned += 1;
                            continue;
                        }
                    }

                    let join =
                        CostModel::compute_pairwise_cost(&label_costs, &open[&left], &open[&right])?;
                    let total = partial.checked_add(&join)?;

                    if self.prune && bound.try_lt(&total)? {
                        pruned += 1;
                        continue;
                    }

                    let better = match &best {
                        Some(b) => total.try_lt(&b.cost)?,
                        None => true,
                    };
                    if better {
                        best = Some(Entry {
                            cost: total,
                            split: left,
                        });
                    }
                }

                if let Some(entry) = best {
                    memo.insert(subset, entry);
                }
            }
        }

        let full = full_mask(n);
        if !memo.contains_key(&full) {
            log::debug!("optimal search found nothing below the bound, using left-to-right");
            return Ok(reference);
        }

        let mut builder = TreeBuilder::with_costs(self.network, label_costs);
        build_subtree(&mut builder, &memo, full)?;
        let tree = builder.finish();

        log::debug!(
            "optimal search over {} factors: cost {} (left-to-right {}), {} candidates pruned",
            n,
            tree.total_cost(),
            bound,
            pruned
        );

        Ok(tree)
    }
}

/// Finds the optimal contraction tree with pruning enabled.
pub fn optimal_tree(
    network: &ContractionNetwork,
    model: &CostModel,
) -> ContractResult<ContractionTree> {
    ContractionOptimizer::new(network, model).optimize()
}

fn build_subtree(
    builder: &mut TreeBuilder<'_>,
    memo: &HashMap<u64, Entry>,
    subset: u64,
) -> ContractResult<NodeId> {
    if subset.count_ones() == 1 {
        return Ok(builder.leaf(subset.trailing_zeros() as usize));
    }
    let left = memo
        .get(&subset)
        .map(|e| e.split)
        .ok_or_else(|| ContractError::invalid_order("missing optimizer entry"))?;
    let l = build_subtree(builder, memo, left)?;
    let r = build_subtree(builder, memo, subset ^ left)?;
    builder.join(l, r)
}

fn full_mask(n: usize) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

/// Generates all subsets of {0..n-1} with exactly `size` elements.
fn subsets_of_size(n: usize, size: usize) -> Vec<u64> {
    let mut result = Vec::new();
    generate_subsets(n, size, 0, 0, &mut result);
    result
}

fn generate_subsets(n: usize, size: usize, start: usize, current: u64, result: &mut Vec<u64>) {
    if size == 0 {
        result.push(current);
        return;
    }
    if start >= n || n - start < size {
        return;
    }

    // Include start
    generate_subsets(n, size - 1, start + 1, current | (1u64 << start), result);
    // Exclude start
    generate_subsets(n, size, start + 1, current, result);
}

/// Submasks of `set` other than `set` itself, in descending order, ending with zero.
fn proper_submasks(set: u64) -> impl Iterator<Item = u64> {
    let mut next = if set == 0 { None } else { Some((set - 1) & set) };
    core::iter::from_fn(move || {
        let current = next?;
        next = if current == 0 {
            None
        } else {
            Some((current - 1) & set)
        };
        Some(current)
    })
}
