//! Launch module for contraction plans.
//!
//! Holds the configuration types, the temporary cache and the executor that
//! walks a compiled plan against a backend.

mod cache;
mod config;
mod executor;

pub use cache::{BufferSpec, CacheKey, CacheManager, CacheStats, ExecutionContext};
pub use config::{CacheBudget, CacheConfig, DEFAULT_CACHE_BYTES, PlanConfig};
pub use executor::{Executor, execute, execute_into};
