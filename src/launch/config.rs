//! Configuration for planning and for the temporary cache.

use serde::{Deserialize, Serialize};

use crate::network::IndexLabel;
use crate::optimization::{ContractionStrategy, CostModel};

/// Configuration options for planning a contraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Strategy for choosing the contraction tree.
    pub strategy: ContractionStrategy,
    /// Label costs; when set, `Auto` runs the optimal search.
    pub cost_model: Option<CostModel>,
    /// Conjugate the whole expression.
    pub conjugate: bool,
    /// Branch-and-bound pruning in the optimal search.
    pub prune: bool,
    /// Fixed plan id for cache keys; a fresh id is drawn when unset.
    pub plan_id: Option<u64>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            strategy: ContractionStrategy::Auto,
            cost_model: None,
            conjugate: false,
            prune: true,
            plan_id: None,
        }
    }
}

impl PlanConfig {
    /// Creates a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the contraction strategy.
    pub fn with_strategy(mut self, strategy: ContractionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the cost model.
    pub fn with_cost_model(mut self, model: CostModel) -> Self {
        self.cost_model = Some(model);
        self
    }

    /// Contracts labels in the given order.
    pub fn with_order<L: Into<IndexLabel>>(mut self, order: impl IntoIterator<Item = L>) -> Self {
        self.strategy = ContractionStrategy::Explicit(order.into_iter().map(Into::into).collect());
        self
    }

    /// Conjugates the whole expression.
    pub fn with_conjugate(mut self, conjugate: bool) -> Self {
        self.conjugate = conjugate;
        self
    }

    /// Enables or disables pruning in the optimal search.
    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Fixes the plan id.
    pub fn with_plan_id(mut self, id: u64) -> Self {
        self.plan_id = Some(id);
        self
    }

    /// Optimal search with every label costing `χ`.
    pub fn optimal() -> Self {
        Self::new()
            .with_strategy(ContractionStrategy::Optimal)
            .with_cost_model(CostModel::default())
    }
}

/// Default cache budget, 1 GiB.
pub const DEFAULT_CACHE_BYTES: usize = 1 << 30;

/// Upper bound on the bytes held by the temporary cache.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CacheBudget {
    /// A fixed number of bytes.
    Bytes(usize),
    /// A fraction of `total_memory`, which the caller supplies in bytes.
    ///
    /// The system memory size is not probed; pass the value reported by the
    /// platform to get a fraction of total system memory.
    Fraction { fraction: f64, total_memory: usize },
}

impl CacheBudget {
    /// Budget in bytes.
    pub fn resolve(&self) -> usize {
        match *self {
            CacheBudget::Bytes(bytes) => bytes,
            CacheBudget::Fraction {
                fraction,
                total_memory,
            } => (fraction.clamp(0.0, 1.0) * total_memory as f64) as usize,
        }
    }
}

impl Default for CacheBudget {
    fn default() -> Self {
        CacheBudget::Bytes(DEFAULT_CACHE_BYTES)
    }
}

/// Configuration options for a [`CacheManager`](super::CacheManager).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub budget: CacheBudget,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget: CacheBudget::default(),
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(mut self, budget: CacheBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
