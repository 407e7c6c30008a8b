//! Dense row-major reference backend.

use core::marker::PhantomData;

use super::{Backend, Element, ElementType};
use crate::error::{ContractError, ContractResult};

/// Owned dense tensor in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor<T> {
    dims: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> DenseTensor<T> {
    /// Wraps row-major data; its length must match the product of `dims`.
    pub fn new(dims: impl Into<Vec<usize>>, data: Vec<T>) -> ContractResult<Self> {
        let dims = dims.into();
        let len: usize = dims.iter().product();
        if data.len() != len {
            return Err(ContractError::backend(format!(
                "tensor of dims {:?} needs {} elements, got {}",
                dims,
                len,
                data.len()
            )));
        }
        Ok(Self { dims, data })
    }

    pub fn zeros(dims: impl Into<Vec<usize>>) -> Self {
        let dims = dims.into();
        let len = dims.iter().product();
        Self {
            dims,
            data: vec![T::zero(); len],
        }
    }

    /// Fills the tensor by evaluating `f` at every multi-index.
    pub fn from_fn(dims: impl Into<Vec<usize>>, mut f: impl FnMut(&[usize]) -> T) -> Self {
        let dims = dims.into();
        let mut data = Vec::with_capacity(dims.iter().product());
        for_each_index(&dims, |index| data.push(f(index)));
        Self { dims, data }
    }

    /// Rank-0 tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            dims: Vec::new(),
            data: vec![value],
        }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Element at a multi-index, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.dims.len() || index.iter().zip(&self.dims).any(|(i, d)| i >= d) {
            return None;
        }
        let offset: usize = index
            .iter()
            .zip(row_major_strides(&self.dims))
            .map(|(i, s)| i * s)
            .sum();
        self.data.get(offset).copied()
    }

    /// The single value of a tensor with exactly one element.
    pub fn to_scalar(&self) -> Option<T> {
        match self.data.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }
}

/// Reference implementation of [`Backend`] over [`DenseTensor`].
///
/// Plain nested loops, meant for testing and small problems.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseBackend<T> {
    _marker: PhantomData<T>,
}

impl<T> DenseBackend<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Backend for DenseBackend<T> {
    type Buffer = DenseTensor<T>;
    type Scalar = T;

    fn dims(&self, buffer: &DenseTensor<T>) -> Vec<usize> {
        buffer.dims.clone()
    }

    fn element_type(&self, _buffer: &DenseTensor<T>) -> ElementType {
        T::ELEMENT
    }

    fn allocate_like(&self, _reference: &DenseTensor<T>, dims: &[usize]) -> ContractResult<DenseTensor<T>> {
        Ok(DenseTensor::zeros(dims))
    }

    fn add(
        &self,
        alpha: T,
        src: &DenseTensor<T>,
        conj: bool,
        beta: T,
        dst: &mut DenseTensor<T>,
        perm: &[usize],
    ) -> ContractResult<()> {
        self.trace(alpha, src, conj, beta, dst, perm, &[])
    }

    fn trace(
        &self,
        alpha: T,
        src: &DenseTensor<T>,
        conj: bool,
        beta: T,
        dst: &mut DenseTensor<T>,
        perm: &[usize],
        pairs: &[(usize, usize)],
    ) -> ContractResult<()> {
        if perm.len() + 2 * pairs.len() != src.dims.len() {
            return Err(ContractError::backend(format!(
                "trace of a rank-{} tensor with {} kept and {} paired axes",
                src.dims.len(),
                perm.len(),
                pairs.len()
            )));
        }
        check_dst_dims(dst, perm.iter().map(|&axis| src.dims[axis]))?;

        let strides = row_major_strides(&src.dims);
        let mut traced_dims = Vec::with_capacity(pairs.len());
        let mut traced_strides = Vec::with_capacity(pairs.len());
        for &(p, q) in pairs {
            if src.dims[p] != src.dims[q] {
                return Err(ContractError::backend(format!(
                    "traced axes {p} and {q} have extents {} and {}",
                    src.dims[p], src.dims[q]
                )));
            }
            traced_dims.push(src.dims[p]);
            traced_strides.push(strides[p] + strides[q]);
        }
        let kept_strides: Vec<usize> = perm.iter().map(|&axis| strides[axis]).collect();

        let dst_dims = dst.dims.clone();
        let mut linear = 0;
        for_each_index(&dst_dims, |index| {
            let base = offset(index, &kept_strides);
            let mut sum = T::zero();
            for_each_index(&traced_dims, |t| {
                sum = sum + op(src.data[base + offset(t, &traced_strides)], conj);
            });
            update(&mut dst.data[linear], alpha, sum, beta);
            linear += 1;
        });
        Ok(())
    }

    fn contract(
        &self,
        alpha: T,
        a: &DenseTensor<T>,
        conj_a: bool,
        b: &DenseTensor<T>,
        conj_b: bool,
        beta: T,
        dst: &mut DenseTensor<T>,
        cind_a: &[usize],
        cind_b: &[usize],
        perm: &[usize],
    ) -> ContractResult<()> {
        if cind_a.len() != cind_b.len() {
            return Err(ContractError::backend("contracted axis lists differ in length"));
        }

        let strides_a = row_major_strides(&a.dims);
        let strides_b = row_major_strides(&b.dims);

        let mut inner_dims = Vec::with_capacity(cind_a.len());
        let mut inner_a = Vec::with_capacity(cind_a.len());
        let mut inner_b = Vec::with_capacity(cind_b.len());
        for (&p, &q) in cind_a.iter().zip(cind_b) {
            if a.dims[p] != b.dims[q] {
                return Err(ContractError::backend(format!(
                    "contracted axes {p} and {q} have extents {} and {}",
                    a.dims[p], b.dims[q]
                )));
            }
            inner_dims.push(a.dims[p]);
            inner_a.push(strides_a[p]);
            inner_b.push(strides_b[q]);
        }

        // open axes of a then of b: (extent, stride in a, stride in b)
        let open: Vec<(usize, usize, usize)> = (0..a.dims.len())
            .filter(|axis| !cind_a.contains(axis))
            .map(|axis| (a.dims[axis], strides_a[axis], 0))
            .chain(
                (0..b.dims.len())
                    .filter(|axis| !cind_b.contains(axis))
                    .map(|axis| (b.dims[axis], 0, strides_b[axis])),
            )
            .collect();
        if perm.len() != open.len() {
            return Err(ContractError::backend(format!(
                "permutation of length {} for {} open axes",
                perm.len(),
                open.len()
            )));
        }
        check_dst_dims(dst, perm.iter().map(|&k| open[k].0))?;

        let outer_a: Vec<usize> = perm.iter().map(|&k| open[k].1).collect();
        let outer_b: Vec<usize> = perm.iter().map(|&k| open[k].2).collect();

        let dst_dims = dst.dims.clone();
        let mut linear = 0;
        for_each_index(&dst_dims, |index| {
            let base_a = offset(index, &outer_a);
            let base_b = offset(index, &outer_b);
            let mut sum = T::zero();
            for_each_index(&inner_dims, |c| {
                let x = op(a.data[base_a + offset(c, &inner_a)], conj_a);
                let y = op(b.data[base_b + offset(c, &inner_b)], conj_b);
                sum = sum + x * y;
            });
            update(&mut dst.data[linear], alpha, sum, beta);
            linear += 1;
        });
        Ok(())
    }
}

#[inline]
fn op<T: Element>(value: T, conj: bool) -> T {
    if conj { value.conj() } else { value }
}

#[inline]
fn update<T: Element>(slot: &mut T, alpha: T, value: T, beta: T) {
    *slot = if beta.is_zero() {
        alpha * value
    } else {
        beta * *slot + alpha * value
    };
}

#[inline]
fn offset(index: &[usize], strides: &[usize]) -> usize {
    index.iter().zip(strides).map(|(i, s)| i * s).sum()
}

fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for k in (0..dims.len().saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * dims[k + 1];
    }
    strides
}

fn check_dst_dims<T>(dst: &DenseTensor<T>, expected: impl Iterator<Item = usize>) -> ContractResult<()> {
    let expected: Vec<usize> = expected.collect();
    if dst.dims != expected {
        return Err(ContractError::backend(format!(
            "destination has dims {:?}, expected {:?}",
            dst.dims, expected
        )));
    }
    Ok(())
}

/// Calls `f` with every multi-index of `dims` in row-major order.
///
/// A rank-0 shape has exactly one (empty) index; a zero extent has none.
fn for_each_index(dims: &[usize], mut f: impl FnMut(&[usize])) {
    if dims.contains(&0) {
        return;
    }
    let mut index = vec![0; dims.len()];
    loop {
        f(&index);
        let mut k = dims.len();
        loop {
            if k == 0 {
                return;
            }
            k -= 1;
            index[k] += 1;
            if index[k] < dims[k] {
                break;
            }
            index[k] = 0;
        }
    }
}
