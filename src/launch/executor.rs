//! Plan execution engine.
//!
//! Runs the instructions of a [`CompiledPlan`] against a [`Backend`], pulling
//! temporaries from a [`CacheManager`] and handing them back as soon as the
//! instruction consuming them has run.

use hashbrown::HashMap;
use num_traits::{One, Zero};

use super::cache::{BufferSpec, CacheKey, CacheManager, ExecutionContext};
use crate::backend::Backend;
use crate::error::{ContractError, ContractResult};
use crate::network::IndexLabel;
use crate::optimization::{CompiledPlan, Instruction, Operand, Scale};

/// Executes compiled plans on one backend with one cache.
///
/// # Example
///
/// ```
/// use strided_contract::backend::{DenseBackend, DenseTensor};
/// use strided_contract::launch::{CacheManager, Executor, PlanConfig};
/// use strided_contract::network::from_ncon;
/// use strided_contract::optimization::create_plan;
///
/// let network = from_ncon([vec![-1, 1], vec![1, -2]]).unwrap();
/// let plan = create_plan(&network, &PlanConfig::default()).unwrap();
///
/// let a = DenseTensor::new([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let b = DenseTensor::new([2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
///
/// let backend = DenseBackend::<f64>::new();
/// let cache = CacheManager::default();
/// let c = Executor::new(&backend, &cache).execute(&plan, &[&a, &b], 1.0).unwrap();
///
/// assert_eq!(c.data(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
pub struct Executor<'a, B: Backend> {
    backend: &'a B,
    cache: &'a CacheManager,
    context: ExecutionContext,
}

impl<'a, B: Backend> Executor<'a, B> {
    pub fn new(backend: &'a B, cache: &'a CacheManager) -> Self {
        Self {
            backend,
            cache,
            context: ExecutionContext::MAIN,
        }
    }

    /// Sets the execution context used in cache keys.
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Evaluates the plan into a freshly allocated destination, scaled by `alpha`.
    pub fn execute(
        &self,
        plan: &CompiledPlan,
        inputs: &[&B::Buffer],
        alpha: B::Scalar,
    ) -> ContractResult<B::Buffer> {
        let input_dims = self.check_inputs(plan, inputs)?;
        let dims: Vec<usize> = plan
            .network()
            .output()
            .iter()
            .map(|label| extent_of(plan, &input_dims, label))
            .collect::<ContractResult<_>>()?;

        let mut dst = self.backend.allocate_like(inputs[0], &dims)?;
        self.run(plan, inputs, &input_dims, &mut dst, alpha, B::Scalar::zero())?;
        Ok(dst)
    }

    /// Evaluates `dst = beta * dst + alpha * (plan result)`.
    pub fn execute_into(
        &self,
        plan: &CompiledPlan,
        inputs: &[&B::Buffer],
        dst: &mut B::Buffer,
        alpha: B::Scalar,
        beta: B::Scalar,
    ) -> ContractResult<()> {
        let input_dims = self.check_inputs(plan, inputs)?;

        let output = plan.network().output();
        let dst_dims = self.backend.dims(dst);
        if dst_dims.len() != output.len() {
            return Err(ContractError::backend(format!(
                "destination has {} dimensions, the output has {} labels",
                dst_dims.len(),
                output.len()
            )));
        }

        self.run(plan, inputs, &input_dims, dst, alpha, beta)
    }

    fn check_inputs(&self, plan: &CompiledPlan, inputs: &[&B::Buffer]) -> ContractResult<Vec<Vec<usize>>> {
        if inputs.len() != plan.num_inputs() {
            return Err(ContractError::ArityMismatch {
                expected: plan.num_inputs(),
                got: inputs.len(),
            });
        }

        inputs
            .iter()
            .enumerate()
            .map(|(factor, buffer)| {
                let dims = self.backend.dims(buffer);
                let expected = plan.network().factor(factor).rank();
                if dims.len() != expected {
                    return Err(ContractError::RankMismatch {
                        factor,
                        expected,
                        got: dims.len(),
                    });
                }
                Ok(dims)
            })
            .collect()
    }

    fn run(
        &self,
        plan: &CompiledPlan,
        inputs: &[&B::Buffer],
        input_dims: &[Vec<usize>],
        dst: &mut B::Buffer,
        alpha: B::Scalar,
        beta: B::Scalar,
    ) -> ContractResult<()> {
        log::debug!(
            "executing plan {} ({} instructions) in {:?}",
            plan.id(),
            plan.instructions().len(),
            self.context
        );

        let mut temps: HashMap<usize, B::Buffer> = HashMap::new();
        let result = self.run_instructions(plan, inputs, input_dims, dst, alpha, beta, &mut temps);

        // on failure, temporaries still held go back to the cache
        for (slot, buffer) in temps.drain() {
            self.cache.release(self.key(plan, slot), buffer);
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn run_instructions(
        &self,
        plan: &CompiledPlan,
        inputs: &[&B::Buffer],
        input_dims: &[Vec<usize>],
        dst: &mut B::Buffer,
        alpha: B::Scalar,
        beta: B::Scalar,
        temps: &mut HashMap<usize, B::Buffer>,
    ) -> ContractResult<()> {
        let dst_dims = self.backend.dims(dst);
        let scale = |s: Scale| match s {
            Scale::One => B::Scalar::one(),
            Scale::Zero => B::Scalar::zero(),
            Scale::Alpha => alpha,
            Scale::Beta => beta,
        };
        let dims_of = |operand: Operand| -> Vec<usize> {
            match operand {
                Operand::Input(i) => input_dims[i].clone(),
                Operand::Temporary(slot) => plan.temporary(slot).map_or_else(Vec::new, |t| {
                    t.extents.iter().map(|&(f, axis)| input_dims[f][axis]).collect()
                }),
                Operand::Destination => dst_dims.clone(),
            }
        };

        for instruction in plan.instructions() {
            check_extents(plan, instruction, &dims_of)?;

            let target = instruction.destination();
            let mut out = match target {
                Operand::Temporary(slot) => {
                    let dims = dims_of(target);
                    let spec = BufferSpec::new(dims.clone(), self.backend.element_type(inputs[0]));
                    Some(self.cache.acquire(self.key(plan, slot), &spec, || {
                        self.backend.allocate_like(inputs[0], &dims)
                    })?)
                }
                _ => None,
            };

            let status = {
                let out_ref: &mut B::Buffer = match out.as_mut() {
                    Some(buffer) => buffer,
                    None => &mut *dst,
                };
                self.dispatch(instruction, inputs, temps, out_ref, &scale)
            };

            if let (Operand::Temporary(slot), Some(buffer)) = (target, out.take()) {
                temps.insert(slot, buffer);
            }
            status?;

            for source in instruction.sources() {
                if let Operand::Temporary(slot) = source {
                    if let Some(buffer) = temps.remove(&slot) {
                        self.cache.release(self.key(plan, slot), buffer);
                    }
                }
            }
        }
        Ok(())
    }

    fn dispatch(
        &self,
        instruction: &Instruction,
        inputs: &[&B::Buffer],
        temps: &HashMap<usize, B::Buffer>,
        out: &mut B::Buffer,
        scale: &impl Fn(Scale) -> B::Scalar,
    ) -> ContractResult<()> {
        match instruction {
            Instruction::Add {
                src,
                conj,
                perm,
                alpha,
                beta,
                ..
            } => {
                let src = operand(*src, inputs, temps)?;
                self.backend
                    .add(scale(*alpha), src, *conj, scale(*beta), out, perm)
            }
            Instruction::Trace {
                src,
                conj,
                perm,
                pairs,
                alpha,
                beta,
                ..
            } => {
                let src = operand(*src, inputs, temps)?;
                self.backend
                    .trace(scale(*alpha), src, *conj, scale(*beta), out, perm, pairs)
            }
            Instruction::Contract {
                a,
                conj_a,
                b,
                conj_b,
                cind_a,
                cind_b,
                perm,
                alpha,
                beta,
                ..
            } => {
                let a = operand(*a, inputs, temps)?;
                let b = operand(*b, inputs, temps)?;
                self.backend.contract(
                    scale(*alpha),
                    a,
                    *conj_a,
                    b,
                    *conj_b,
                    scale(*beta),
                    out,
                    cind_a,
                    cind_b,
                    perm,
                )
            }
        }
    }

    fn key(&self, plan: &CompiledPlan, slot: usize) -> CacheKey {
        CacheKey::new(plan.id(), slot, self.context)
    }
}

/// Evaluates a plan into a new buffer, with `alpha = 1` in the main context.
pub fn execute<B: Backend>(
    backend: &B,
    plan: &CompiledPlan,
    inputs: &[&B::Buffer],
    cache: &CacheManager,
) -> ContractResult<B::Buffer> {
    Executor::new(backend, cache).execute(plan, inputs, B::Scalar::one())
}

/// Evaluates `dst = beta * dst + alpha * (plan result)` in the main context.
pub fn execute_into<B: Backend>(
    backend: &B,
    plan: &CompiledPlan,
    inputs: &[&B::Buffer],
    dst: &mut B::Buffer,
    alpha: B::Scalar,
    beta: B::Scalar,
    cache: &CacheManager,
) -> ContractResult<()> {
    Executor::new(backend, cache).execute_into(plan, inputs, dst, alpha, beta)
}

fn operand<'b, T>(
    operand: Operand,
    inputs: &'b [&'b T],
    temps: &'b HashMap<usize, T>,
) -> ContractResult<&'b T> {
    match operand {
        Operand::Input(i) => inputs
            .get(i)
            .copied()
            .ok_or_else(|| ContractError::backend(format!("no input buffer {i}"))),
        Operand::Temporary(slot) => temps
            .get(&slot)
            .ok_or_else(|| ContractError::backend(format!("temporary {slot} is not available"))),
        Operand::Destination => Err(ContractError::backend("destination used as a source")),
    }
}

/// Extent of an output label, taken from the input axis where it occurs.
fn extent_of(plan: &CompiledPlan, input_dims: &[Vec<usize>], label: &IndexLabel) -> ContractResult<usize> {
    let network = plan.network();
    let occurrence = network
        .id_of(label)
        .and_then(|id| network.occurrences(id).first().copied())
        .ok_or_else(|| ContractError::malformed(label.clone(), 0, "output label has no occurrence"))?;
    Ok(input_dims[occurrence.factor][occurrence.axis])
}

/// Checks that every label touched by an instruction has one extent.
fn check_extents(
    plan: &CompiledPlan,
    instruction: &Instruction,
    dims_of: &impl Fn(Operand) -> Vec<usize>,
) -> ContractResult<()> {
    let mismatch = |label: &IndexLabel, expected: usize, got: usize| ContractError::DimensionMismatch {
        label: label.clone(),
        expected,
        got,
    };

    // (label, extent) of each source axis that survives, in the order perm indexes
    let (open, dst, perm) = match instruction {
        Instruction::Add { src, dst, perm, .. } => {
            let labels = plan.operand_labels(*src);
            let dims = dims_of(*src);
            let open: Vec<(&IndexLabel, usize)> = labels.iter().zip(dims).collect();
            (open, *dst, perm)
        }
        Instruction::Trace {
            src, dst, perm, pairs, ..
        } => {
            let labels = plan.operand_labels(*src);
            let dims = dims_of(*src);
            for &(p, q) in pairs {
                if dims[p] != dims[q] {
                    return Err(mismatch(&labels[p], dims[p], dims[q]));
                }
            }
            let open: Vec<(&IndexLabel, usize)> = labels.iter().zip(dims).collect();
            (open, *dst, perm)
        }
        Instruction::Contract {
            a,
            b,
            dst,
            cind_a,
            cind_b,
            perm,
            ..
        } => {
            let (labels_a, dims_a) = (plan.operand_labels(*a), dims_of(*a));
            let (labels_b, dims_b) = (plan.operand_labels(*b), dims_of(*b));
            for (&p, &q) in cind_a.iter().zip(cind_b) {
                if dims_a[p] != dims_b[q] {
                    return Err(mismatch(&labels_a[p], dims_a[p], dims_b[q]));
                }
            }
            let open: Vec<(&IndexLabel, usize)> = labels_a
                .iter()
                .zip(dims_a)
                .enumerate()
                .filter(|(axis, _)| !cind_a.contains(axis))
                .map(|(_, x)| x)
                .chain(
                    labels_b
                        .iter()
                        .zip(dims_b)
                        .enumerate()
                        .filter(|(axis, _)| !cind_b.contains(axis))
                        .map(|(_, x)| x),
                )
                .collect();
            (open, *dst, perm)
        }
    };

    let dst_dims = dims_of(dst);
    for (k, &source) in perm.iter().enumerate() {
        let (label, extent) = open[source];
        match dst_dims.get(k) {
            Some(&got) if got != extent => return Err(mismatch(label, extent, got)),
            _ => {}
        }
    }
    Ok(())
}
