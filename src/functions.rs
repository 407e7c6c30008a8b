//! One-shot functions over labeled tensors.
//!
//! Each function builds a network, plans it and executes it with an unshared,
//! disabled cache. Hold a [`CompiledPlan`](crate::optimization::CompiledPlan)
//! and a [`CacheManager`] to reuse temporaries across calls instead.

use num_traits::One;

use crate::backend::{Backend, DenseTensor, Element};
use crate::error::{ContractError, ContractResult};
use crate::launch::{CacheManager, Executor, PlanConfig};
use crate::network::{ContractionNetwork, IndexGraphBuilder, IndexLabel};
use crate::optimization::{CostModel, create_plan};

fn labeled<L: Clone + Into<IndexLabel>>(factors: &[(&[L], bool)], output: &[L]) -> ContractResult<ContractionNetwork> {
    let mut builder = IndexGraphBuilder::new();
    for &(labels, conj) in factors {
        builder.push_factor(labels.iter().cloned(), conj);
    }
    builder.output(output.iter().cloned()).build()
}

fn plan_and_run<B: Backend>(
    backend: &B,
    network: &ContractionNetwork,
    config: &PlanConfig,
    inputs: &[&B::Buffer],
) -> ContractResult<B::Buffer> {
    let plan = create_plan(network, config)?;
    let cache = CacheManager::disabled();
    Executor::new(backend, &cache).execute(&plan, inputs, B::Scalar::one())
}

/// Permuted copy: `C[ic] = op(A[ia])`.
pub fn tensor_copy<B, L>(backend: &B, a: &B::Buffer, ia: &[L], conj: bool, ic: &[L]) -> ContractResult<B::Buffer>
where
    B: Backend,
    L: Clone + Into<IndexLabel>,
{
    let network = labeled(&[(ia, conj)], ic)?;
    plan_and_run(backend, &network, &PlanConfig::default(), &[a])
}

/// `C[ic] = beta * C[ic] + alpha * op(A[ia])`.
#[allow(clippy::too_many_arguments)]
pub fn tensor_add<B, L>(
    backend: &B,
    alpha: B::Scalar,
    a: &B::Buffer,
    ia: &[L],
    conj: bool,
    beta: B::Scalar,
    c: &mut B::Buffer,
    ic: &[L],
) -> ContractResult<()>
where
    B: Backend,
    L: Clone + Into<IndexLabel>,
{
    let network = labeled(&[(ia, conj)], ic)?;
    let plan = create_plan(&network, &PlanConfig::default())?;
    let cache = CacheManager::disabled();
    Executor::new(backend, &cache).execute_into(&plan, &[a], c, alpha, beta)
}

/// Partial trace: labels repeated in `ia` are summed over.
pub fn tensor_trace<B, L>(backend: &B, a: &B::Buffer, ia: &[L], conj: bool, ic: &[L]) -> ContractResult<B::Buffer>
where
    B: Backend,
    L: Clone + Into<IndexLabel>,
{
    tensor_copy(backend, a, ia, conj, ic)
}

/// Pairwise contraction over the labels shared by `ia` and `ib`.
#[allow(clippy::too_many_arguments)]
pub fn tensor_contract<B, L>(
    backend: &B,
    a: &B::Buffer,
    ia: &[L],
    conj_a: bool,
    b: &B::Buffer,
    ib: &[L],
    conj_b: bool,
    ic: &[L],
) -> ContractResult<B::Buffer>
where
    B: Backend,
    L: Clone + Into<IndexLabel>,
{
    let network = labeled(&[(ia, conj_a), (ib, conj_b)], ic)?;
    plan_and_run(backend, &network, &PlanConfig::default(), &[a, b])
}

/// Outer product; `ia` and `ib` must not share a label.
pub fn tensor_product<B, L>(
    backend: &B,
    a: &B::Buffer,
    ia: &[L],
    b: &B::Buffer,
    ib: &[L],
    ic: &[L],
) -> ContractResult<B::Buffer>
where
    B: Backend,
    L: Clone + Into<IndexLabel>,
{
    let network = labeled(&[(ia, false), (ib, false)], ic)?;
    if let Some(id) = network.contracted_ids().next() {
        return Err(ContractError::malformed(
            network.label(id).clone(),
            2,
            "an outer product cannot contract labels",
        ));
    }
    plan_and_run(backend, &network, &PlanConfig::default(), &[a, b])
}

/// Options for [`ncon_with`].
#[derive(Debug, Clone, Default)]
pub struct NconOptions {
    /// Per-tensor conjugation flags; missing entries mean no conjugation.
    pub conj: Vec<bool>,
    /// Explicit order of the contracted labels.
    pub order: Option<Vec<i64>>,
    /// Explicit output order of the free labels.
    pub output: Option<Vec<i64>>,
    /// Runs the optimal search instead of the NCON ordering.
    pub cost_model: Option<CostModel>,
}

impl NconOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conj(mut self, conj: impl IntoIterator<Item = bool>) -> Self {
        self.conj = conj.into_iter().collect();
        self
    }

    pub fn with_order(mut self, order: impl IntoIterator<Item = i64>) -> Self {
        self.order = Some(order.into_iter().collect());
        self
    }

    pub fn with_output(mut self, output: impl IntoIterator<Item = i64>) -> Self {
        self.output = Some(output.into_iter().collect());
        self
    }

    pub fn with_cost_model(mut self, model: CostModel) -> Self {
        self.cost_model = Some(model);
        self
    }
}

/// Contracts a network given in NCON form.
///
/// ```
/// use strided_contract::backend::{DenseBackend, DenseTensor};
/// use strided_contract::functions::ncon;
///
/// let v = DenseTensor::new([3], vec![1.0, 2.0, 3.0]).unwrap();
/// let w = DenseTensor::new([3], vec![4.0, 5.0, 6.0]).unwrap();
///
/// let dot = ncon(&DenseBackend::<f64>::new(), &[&v, &w], &[vec![1], vec![1]]).unwrap();
/// assert_eq!(dot.to_scalar(), Some(32.0));
/// ```
pub fn ncon<B: Backend>(
    backend: &B,
    tensors: &[&B::Buffer],
    index_lists: &[Vec<i64>],
) -> ContractResult<B::Buffer> {
    ncon_with(backend, tensors, index_lists, &NconOptions::default())
}

/// [`ncon`] with conjugation flags, an explicit order, output or cost model.
pub fn ncon_with<B: Backend>(
    backend: &B,
    tensors: &[&B::Buffer],
    index_lists: &[Vec<i64>],
    options: &NconOptions,
) -> ContractResult<B::Buffer> {
    if tensors.len() != index_lists.len() {
        return Err(ContractError::ArityMismatch {
            expected: index_lists.len(),
            got: tensors.len(),
        });
    }

    let mut builder = IndexGraphBuilder::new();
    for (i, list) in index_lists.iter().enumerate() {
        let conj = options.conj.get(i).copied().unwrap_or(false);
        builder.push_factor(list.iter().copied(), conj);
    }
    if let Some(output) = &options.output {
        builder = builder.output(output.iter().copied());
    }
    let network = builder.build()?;

    let mut config = PlanConfig::default();
    if let Some(model) = &options.cost_model {
        config = config.with_cost_model(model.clone());
    }
    if let Some(order) = &options.order {
        config = config.with_order(order.iter().copied());
    }
    plan_and_run(backend, &network, &config, tensors)
}

/// The value of a tensor with a single element.
pub fn scalar<T: Element>(tensor: &DenseTensor<T>) -> ContractResult<T> {
    tensor.to_scalar().ok_or_else(|| {
        ContractError::backend(format!(
            "expected a single element, tensor has dimensions {:?}",
            tensor.dims()
        ))
    })
}
