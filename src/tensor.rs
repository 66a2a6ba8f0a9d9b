//! Host Tensors
//!
//! This module provides the minimal tensor type the layer-norm entry points
//! operate on. It stands in for a framework-native tensor: typed storage,
//! a shape, row-major strides and a device tag.
//!
//! ## Core Concepts
//!
//! - **Storage**: one flat, typed buffer per tensor, shared behind an `Arc` so
//!   views (such as [`Tensor::transpose`]) never copy
//! - **Shape**: dimensions of the tensor (e.g., `[batch, seq, hidden]`)
//! - **Strides**: step sizes for each dimension; a tensor is contiguous when
//!   its strides are the row-major strides of its shape
//! - **Device**: where the tensor is placed. Storage is always host resident;
//!   the tag decides which kernel may consume the tensor
//!
//! ## Example
//!
//! ```rust
//! use fused_layer_norm::{DType, Tensor};
//!
//! let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
//! assert_eq!(t.shape(), &[2, 3]);
//! assert!(t.is_contiguous());
//!
//! let t = t.transpose(0, 1);
//! assert_eq!(t.shape(), &[3, 2]);
//! assert!(!t.is_contiguous());
//!
//! let h = Tensor::full(vec![4], 0.5, DType::F16);
//! assert_eq!(h.to_f64_vec(), vec![0.5; 4]);
//! ```

use half::f16;
use rand::Rng;
use rand_distr::Distribution;
use rayon::prelude::*;
use std::sync::Arc;

use crate::device::Device;
use crate::dtype::DType;

/// Flat typed element buffer
#[derive(Clone, Debug, PartialEq)]
pub enum Storage {
    U8(Vec<u8>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Applies `$body` to the inner vector of every storage variant.
macro_rules! with_storage {
    ($storage:expr, $v:ident => $body:expr) => {
        match $storage {
            Storage::U8($v) => $body,
            Storage::I8($v) => $body,
            Storage::I16($v) => $body,
            Storage::I32($v) => $body,
            Storage::I64($v) => $body,
            Storage::F16($v) => $body,
            Storage::F32($v) => $body,
            Storage::F64($v) => $body,
        }
    };
}

impl Storage {
    /// Zero-filled storage of `len` elements
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::U8 => Storage::U8(vec![0; len]),
            DType::I8 => Storage::I8(vec![0; len]),
            DType::I16 => Storage::I16(vec![0; len]),
            DType::I32 => Storage::I32(vec![0; len]),
            DType::I64 => Storage::I64(vec![0; len]),
            DType::F16 => Storage::F16(vec![f16::ZERO; len]),
            DType::F32 => Storage::F32(vec![0.0; len]),
            DType::F64 => Storage::F64(vec![0.0; len]),
        }
    }

    /// Converts `values` into storage of the given dtype
    ///
    /// Float to integer conversion truncates toward zero and saturates at
    /// the bounds of the integer type.
    pub fn from_f64(dtype: DType, values: &[f64]) -> Self {
        match dtype {
            DType::U8 => Storage::U8(values.iter().map(|&v| v as u8).collect()),
            DType::I8 => Storage::I8(values.iter().map(|&v| v as i8).collect()),
            DType::I16 => Storage::I16(values.iter().map(|&v| v as i16).collect()),
            DType::I32 => Storage::I32(values.iter().map(|&v| v as i32).collect()),
            DType::I64 => Storage::I64(values.iter().map(|&v| v as i64).collect()),
            DType::F16 => Storage::F16(values.par_iter().map(|&v| f16::from_f64(v)).collect()),
            DType::F32 => Storage::F32(values.par_iter().map(|&v| v as f32).collect()),
            DType::F64 => Storage::F64(values.to_vec()),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Storage::U8(_) => DType::U8,
            Storage::I8(_) => DType::I8,
            Storage::I16(_) => DType::I16,
            Storage::I32(_) => DType::I32,
            Storage::I64(_) => DType::I64,
            Storage::F16(_) => DType::F16,
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_storage!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads element `idx` widened to f64
    #[inline]
    pub fn get_f64(&self, idx: usize) -> f64 {
        match self {
            Storage::U8(v) => v[idx] as f64,
            Storage::I8(v) => v[idx] as f64,
            Storage::I16(v) => v[idx] as f64,
            Storage::I32(v) => v[idx] as f64,
            Storage::I64(v) => v[idx] as f64,
            Storage::F16(v) => v[idx].to_f64(),
            Storage::F32(v) => v[idx] as f64,
            Storage::F64(v) => v[idx],
        }
    }

    /// Overwrites the whole buffer with `values`, keeping the dtype
    fn assign_f64(&mut self, values: &[f64]) {
        assert_eq!(
            self.len(),
            values.len(),
            "Cannot assign {} values to storage of {} elements",
            values.len(),
            self.len()
        );
        *self = Storage::from_f64(self.dtype(), values);
    }
}

/// A multi-dimensional array with typed storage and a device tag
///
/// # Memory Layout
///
/// For shape `[2, 3]` a contiguous tensor stores
/// `[r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]` with strides `[3, 1]`.
/// After `transpose(0, 1)` the shape is `[3, 2]` and the strides `[1, 3]`;
/// the storage is shared and the tensor is no longer contiguous.
#[derive(Clone, Debug)]
pub struct Tensor {
    storage: Arc<Storage>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    device: Device,
}

impl Tensor {
    /// Create a new f32 tensor on the CPU with given data and shape
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self::from_storage(Storage::F32(data), shape)
    }

    /// Create a tensor from existing storage
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal storage length
    pub fn from_storage(storage: Storage, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            storage.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            storage.len(),
            shape,
            expected_size
        );

        let strides = Self::compute_strides(&shape);
        Self {
            storage: Arc::new(storage),
            shape,
            strides,
            device: Device::Cpu,
        }
    }

    /// Create a tensor of the given dtype from f64 values
    pub fn from_f64(data: &[f64], shape: Vec<usize>, dtype: DType) -> Self {
        Self::from_storage(Storage::from_f64(dtype, data), shape)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: Vec<usize>, dtype: DType) -> Self {
        let size: usize = shape.iter().product();
        Self::from_storage(Storage::zeros(dtype, size), shape)
    }

    pub fn ones(shape: Vec<usize>, dtype: DType) -> Self {
        Self::full(shape, 1.0, dtype)
    }

    /// Create a tensor with every element set to `value`
    pub fn full(shape: Vec<usize>, value: f64, dtype: DType) -> Self {
        let size: usize = shape.iter().product();
        Self::from_f64(&vec![value; size], shape, dtype)
    }

    /// Allocate a tensor whose contents the caller is about to overwrite
    ///
    /// Safe Rust has no uninitialized buffers, so the storage is
    /// zero-filled.
    pub fn empty(shape: Vec<usize>, dtype: DType, device: Device) -> Self {
        Self::zeros(shape, dtype).to_device(device)
    }

    /// Allocate a contiguous tensor with the shape, dtype and device of `other`
    pub fn empty_like(other: &Tensor) -> Self {
        Self::empty(other.shape.clone(), other.dtype(), other.device)
    }

    /// Create a tensor by sampling every element from `distribution`
    ///
    /// # Example
    ///
    /// ```rust
    /// # use fused_layer_norm::{DType, Tensor};
    /// use rand_distr::Normal;
    ///
    /// let mut rng = rand::rng();
    /// let normal = Normal::new(0.0, 1.0).unwrap();
    /// let t = Tensor::sample(vec![4, 8], DType::F32, &normal, &mut rng);
    /// assert_eq!(t.numel(), 32);
    /// ```
    pub fn sample<D, R>(shape: Vec<usize>, dtype: DType, distribution: &D, rng: &mut R) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        let size: usize = shape.iter().product();
        let data: Vec<f64> = (0..size).map(|_| distribution.sample(rng)).collect();
        Self::from_f64(&data, shape, dtype)
    }

    /// Compute strides from shape (row-major layout)
    ///
    /// For shape `[d0, d1, d2]`, strides are `[d1*d2, d2, 1]`
    fn compute_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of dimensions
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Whether the strides are the row-major strides of the shape
    ///
    /// Dimensions of size one are ignored, since stepping along them never
    /// happens. A tensor without elements is always contiguous.
    pub fn is_contiguous(&self) -> bool {
        if self.numel() == 0 {
            return true;
        }
        let expected = Self::compute_strides(&self.shape);
        self.shape
            .iter()
            .zip(self.strides.iter().zip(&expected))
            .all(|(&size, (&s, &e))| size == 1 || s == e)
    }

    /// Place the tensor on `device`
    ///
    /// Storage stays on the host; only the placement tag changes.
    pub fn to_device(mut self, device: Device) -> Tensor {
        self.device = device;
        self
    }

    /// Convert every element to `dtype`
    pub fn to_dtype(&self, dtype: DType) -> Tensor {
        Self::from_f64(&self.to_f64_vec(), self.shape.clone(), dtype).to_device(self.device)
    }

    /// Storage index of the element at logical (row-major) position `flat`
    fn storage_index(&self, flat: usize) -> usize {
        let mut remaining = flat;
        let mut idx = 0;
        for d in (0..self.shape.len()).rev() {
            let size = self.shape[d];
            idx += (remaining % size) * self.strides[d];
            remaining /= size;
        }
        idx
    }

    /// All elements in logical order, widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let n = self.numel();
        if self.is_contiguous() {
            return (0..n).map(|i| self.storage.get_f64(i)).collect();
        }
        (0..n)
            .map(|i| self.storage.get_f64(self.storage_index(i)))
            .collect()
    }

    /// All elements in logical order, converted to f32
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.to_f64_vec().into_iter().map(|v| v as f32).collect()
    }

    /// Element at the given multi-dimensional index
    ///
    /// # Panics
    ///
    /// Panics if the index rank or any coordinate is out of range
    pub fn get(&self, index: &[usize]) -> f64 {
        assert_eq!(index.len(), self.shape.len(), "Index rank mismatch");
        let mut idx = 0;
        for ((&i, &size), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            assert!(i < size, "Index {:?} out of range for shape {:?}", index, self.shape);
            idx += i * stride;
        }
        self.storage.get_f64(idx)
    }

    /// Overwrite every element with `values`, given in logical order
    ///
    /// The tensor must be contiguous. Storage shared with other tensors is
    /// copied first, so views of the old contents are unaffected.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not contiguous or the length differs
    pub fn assign_f64(&mut self, values: &[f64]) {
        assert!(self.is_contiguous(), "Cannot assign into a non-contiguous tensor");
        Arc::make_mut(&mut self.storage).assign_f64(values);
    }

    /// Transpose two dimensions
    ///
    /// Returns a view sharing storage with `self`; the result is generally
    /// not contiguous. Supports negative indexing.
    pub fn transpose(&self, dim1: isize, dim2: isize) -> Tensor {
        let ndim = self.shape.len() as isize;
        let d1 = if dim1 < 0 { ndim + dim1 } else { dim1 } as usize;
        let d2 = if dim2 < 0 { ndim + dim2 } else { dim2 } as usize;

        let mut view = self.clone();
        view.shape.swap(d1, d2);
        view.strides.swap(d1, d2);
        view
    }

    /// Return a contiguous tensor with the same contents
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }
        Self::from_f64(&self.to_f64_vec(), self.shape.clone(), self.dtype()).to_device(self.device)
    }

    /// Reshape tensor to new shape
    ///
    /// Total number of elements must remain the same. Non-contiguous tensors
    /// are materialized first.
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        let new_size: usize = new_shape.iter().product();
        assert_eq!(
            self.numel(),
            new_size,
            "Cannot reshape: element count mismatch"
        );
        let mut out = self.contiguous();
        out.shape = new_shape.to_vec();
        out.strides = Self::compute_strides(new_shape);
        out
    }
}
