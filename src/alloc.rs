//! Output allocation
//!
//! Outputs are allocated before the kernel runs so the kernel only ever
//! fills buffers it was handed.

use crate::tensor::Tensor;

/// Results of a forward pass
#[derive(Clone, Debug)]
pub struct ForwardOutput {
    /// Normalized input, same shape and dtype as the input
    pub output: Tensor,
    /// Per-row mean, shape `[n1]`
    pub mean: Tensor,
    /// Per-row inverse standard deviation `1 / sqrt(var + eps)`, shape `[n1]`
    pub invvar: Tensor,
}

/// Results of a backward pass
#[derive(Clone, Debug)]
pub struct BackwardOutput {
    pub grad_input: Tensor,
    pub grad_gamma: Option<Tensor>,
    pub grad_beta: Option<Tensor>,
}

/// Allocate `output`, `mean` and `invvar` for an input split into `n1` rows
///
/// The statistics use [`DType::stats_dtype`](crate::DType::stats_dtype) of
/// the input dtype and the input's device.
pub fn allocate_forward_outputs(input: &Tensor, n1: usize) -> ForwardOutput {
    let output = Tensor::empty_like(input);
    let mean = Tensor::empty(vec![n1], input.dtype().stats_dtype(), input.device());
    let invvar = Tensor::empty_like(&mean);
    ForwardOutput {
        output,
        mean,
        invvar,
    }
}

/// Allocate the gradient buffers: one per differentiable operand
pub fn allocate_backward_outputs(
    input: &Tensor,
    gamma: Option<&Tensor>,
    beta: Option<&Tensor>,
) -> BackwardOutput {
    BackwardOutput {
        grad_input: Tensor::empty_like(input),
        grad_gamma: gamma.map(Tensor::empty_like),
        grad_beta: beta.map(Tensor::empty_like),
    }
}
