//! # Strided Contract
//!
//! Planning, lowering and temporary caching for tensor contraction networks.
//!
//! ## Features
//!
//! - Label graphs with NCON sign conventions and validated output order
//! - Optimal contraction trees by subset dynamic programming with branch-and-bound
//! - Deterministic NCON ordering, explicit orders and left-to-right fallback
//! - Polynomial costs in a scaling variable `χ` next to plain integer costs
//! - Lowering to permuted add, partial trace and pairwise contraction
//! - Bounded LRU cache of intermediate buffers, keyed by plan, slot and context
//! - Dense CPU reference backend
//!
//! ## Example
//!
//! ```
//! use strided_contract::backend::{DenseBackend, DenseTensor};
//! use strided_contract::launch::{CacheManager, PlanConfig, execute};
//! use strided_contract::network::from_ncon;
//! use strided_contract::optimization::create_plan;
//!
//! // Matrix chain A * B * C
//! let network = from_ncon([vec![-1, 1], vec![1, 2], vec![2, -2]]).unwrap();
//! let plan = create_plan(&network, &PlanConfig::optimal()).unwrap();
//!
//! let a = DenseTensor::from_fn([2, 3], |ix| (ix[0] + ix[1]) as f64);
//! let b = DenseTensor::from_fn([3, 4], |ix| (ix[0] * ix[1]) as f64);
//! let c = DenseTensor::from_fn([4, 2], |ix| ix[0] as f64 - ix[1] as f64);
//!
//! let cache = CacheManager::default();
//! let abc = execute(&DenseBackend::<f64>::new(), &plan, &[&a, &b, &c], &cache).unwrap();
//! assert_eq!(abc.dims(), &[2, 2]);
//! ```

pub mod backend;
pub mod error;
pub mod functions;
pub mod launch;
pub mod network;
pub mod optimization;

pub use error::{ContractError, ContractResult};
pub use functions::{ncon, ncon_with, scalar, tensor_add, tensor_contract, tensor_copy, tensor_product, tensor_trace};
pub use launch::{CacheManager, Executor, PlanConfig, execute, execute_into};
pub use network::{ContractionNetwork, IndexGraphBuilder, IndexLabel, from_ncon};
pub use optimization::{CompiledPlan, ContractionStrategy, Cost, CostModel, create_plan, create_plan as plan};
