//! Backend contract for the three contraction primitives.
//!
//! Every primitive follows the `dst = beta * dst + alpha * op(inputs)` pattern,
//! where `op` optionally conjugates its operand. When `beta` is zero the
//! destination is overwritten, so uninitialized or stale buffers are fine.

mod dense;

use core::fmt::Debug;

use num_complex::Complex;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::error::ContractResult;

pub use dense::{DenseBackend, DenseTensor};

/// Element type of a buffer, used for cache accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    F16,
    F32,
    F64,
    C32,
    C64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementType::F16 => 2,
            ElementType::F32 => 4,
            ElementType::F64 | ElementType::C32 => 8,
            ElementType::C64 => 16,
        }
    }
}

/// Scalar element usable by the reference backend and by the executor.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + Zero + One + 'static {
    const ELEMENT: ElementType;

    /// Complex conjugate; identity for real types.
    fn conj(self) -> Self;
}

impl Element for half::f16 {
    const ELEMENT: ElementType = ElementType::F16;

    #[inline]
    fn conj(self) -> Self {
        self
    }
}

impl Element for f32 {
    const ELEMENT: ElementType = ElementType::F32;

    #[inline]
    fn conj(self) -> Self {
        self
    }
}

impl Element for f64 {
    const ELEMENT: ElementType = ElementType::F64;

    #[inline]
    fn conj(self) -> Self {
        self
    }
}

impl Element for Complex<f32> {
    const ELEMENT: ElementType = ElementType::C32;

    #[inline]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

impl Element for Complex<f64> {
    const ELEMENT: ElementType = ElementType::C64;

    #[inline]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
}

/// Backend trait for strided tensor primitives.
///
/// Buffers are opaque to the planner and executor; they only see dimensions
/// and element types. Permutations map destination axes to source axes:
/// destination axis `k` is source axis `perm[k]`.
pub trait Backend {
    /// Owned tensor storage.
    type Buffer: Send + 'static;
    /// Scalar type of `alpha` and `beta`.
    type Scalar: Element;

    /// Dimensions of a buffer.
    fn dims(&self, buffer: &Self::Buffer) -> Vec<usize>;

    /// Element type of a buffer.
    fn element_type(&self, buffer: &Self::Buffer) -> ElementType;

    /// Allocates a buffer with the element type of `reference` and the given dimensions.
    fn allocate_like(&self, reference: &Self::Buffer, dims: &[usize]) -> ContractResult<Self::Buffer>;

    /// `dst = beta * dst + alpha * permute(op(src))`.
    fn add(
        &self,
        alpha: Self::Scalar,
        src: &Self::Buffer,
        conj: bool,
        beta: Self::Scalar,
        dst: &mut Self::Buffer,
        perm: &[usize],
    ) -> ContractResult<()>;

    /// Like [`add`](Backend::add), summing over each pair of source axes in `pairs`.
    ///
    /// `perm` lists the source axes that survive, in destination order.
    #[allow(clippy::too_many_arguments)]
    fn trace(
        &self,
        alpha: Self::Scalar,
        src: &Self::Buffer,
        conj: bool,
        beta: Self::Scalar,
        dst: &mut Self::Buffer,
        perm: &[usize],
        pairs: &[(usize, usize)],
    ) -> ContractResult<()>;

    /// `dst = beta * dst + alpha * sum op(a) * op(b)` over axes `cind_a` of `a`
    /// paired with axes `cind_b` of `b`.
    ///
    /// Destination axis `k` is axis `perm[k]` of the open axes of `a`
    /// followed by the open axes of `b`.
    #[allow(clippy::too_many_arguments)]
    fn contract(
        &self,
        alpha: Self::Scalar,
        a: &Self::Buffer,
        conj_a: bool,
        b: &Self::Buffer,
        conj_b: bool,
        beta: Self::Scalar,
        dst: &mut Self::Buffer,
        cind_a: &[usize],
        cind_b: &[usize],
        perm: &[usize],
    ) -> ContractResult<()>;
}
