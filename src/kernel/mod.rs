//! Layer Norm Kernels
//!
//! The entry points in [`crate::ops`] validate arguments, split the input
//! into rows and allocate outputs. The numerical work happens behind the
//! [`LayerNormKernel`] trait, so a device backend can be plugged in without
//! touching the bookkeeping.
//!
//! ## Contract
//!
//! A kernel receives tensors that already passed every check:
//!
//! - all operands live on [`LayerNormKernel::device`] and are contiguous
//! - `input` is `n1 x n2` once flattened, gamma/beta hold `n2` elements
//! - outputs are allocated with their final shape and dtype
//!
//! A kernel may still refuse a dtype it does not implement by returning
//! [`LayerNormError::UnsupportedDType`](crate::LayerNormError::UnsupportedDType).
//!
//! ## Kernels
//!
//! - **cpu**: reference implementation, row-parallel via Rayon

pub mod cpu;

pub use cpu::CpuKernel;

use crate::alloc::{BackwardOutput, ForwardOutput};
use crate::args::RowSplit;
use crate::device::Device;
use crate::error::Result;
use crate::tensor::Tensor;

/// Operands shared by the forward and backward kernels
#[derive(Clone, Copy, Debug)]
pub struct KernelArgs<'a> {
    pub input: &'a Tensor,
    pub split: RowSplit,
    pub normalized_shape: &'a [usize],
    pub gamma: Option<&'a Tensor>,
    pub beta: Option<&'a Tensor>,
    pub epsilon: f64,
}

/// Extra operands of the backward kernel
#[derive(Clone, Copy, Debug)]
pub struct GradientInputs<'a> {
    /// Gradient of the loss with respect to the forward output
    pub dout: &'a Tensor,
    /// Per-row mean saved by the forward pass
    pub mean: &'a Tensor,
    /// Per-row inverse standard deviation saved by the forward pass
    pub invvar: &'a Tensor,
}

/// A forward/backward layer-norm kernel pair
pub trait LayerNormKernel: Send + Sync {
    /// Short name used in logs and entry point docs
    fn name(&self) -> &str;

    /// Device every operand must be placed on
    fn device(&self) -> Device;

    /// Fill `outputs.output`, `outputs.mean` and `outputs.invvar`
    fn forward(&self, args: &KernelArgs<'_>, outputs: &mut ForwardOutput) -> Result<()>;

    /// Fill `outputs.grad_input` and, for affine calls, the parameter gradients
    fn backward(
        &self,
        args: &KernelArgs<'_>,
        grads: &GradientInputs<'_>,
        outputs: &mut BackwardOutput,
    ) -> Result<()>;
}
