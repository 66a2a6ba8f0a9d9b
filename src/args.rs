//! Argument Validation and Shape Decomposition
//!
//! Every entry point starts here. The input is viewed as a matrix of `n1`
//! rows and `n2` columns, where the columns are the trailing dimensions named
//! by `normalized_shape`:
//!
//! ```text
//! input shape:      [d0, d1, ..., dk, s0, s1, ..., sm]
//! normalized_shape:                  [s0, s1, ..., sm]
//!
//! n1 = d0 * d1 * ... * dk     (1 when the input has no leading dims)
//! n2 = s0 * s1 * ... * sm
//! ```
//!
//! The kernel normalizes each of the `n1` rows independently over its `n2`
//! elements.

use crate::device::Device;
use crate::error::{LayerNormError, Result};
use crate::tensor::Tensor;

/// The `n1 x n2` row split of an input tensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowSplit {
    /// Number of independently normalized rows
    pub n1: usize,
    /// Number of elements per row
    pub n2: usize,
}

/// Split `input_shape` into rows over the trailing `normalized_shape` dims
///
/// Fails with [`LayerNormError::InputShapeMismatch`] when the input has
/// fewer dimensions than `normalized_shape` or its trailing dimensions
/// differ from it.
///
/// # Example
///
/// ```rust
/// # use fused_layer_norm::args::{compute_n1_n2, RowSplit};
/// let split = compute_n1_n2(&[4, 16, 32, 8], &[32, 8])?;
/// assert_eq!(split, RowSplit { n1: 64, n2: 256 });
/// # Ok::<(), fused_layer_norm::LayerNormError>(())
/// ```
pub fn compute_n1_n2(input_shape: &[usize], normalized_shape: &[usize]) -> Result<RowSplit> {
    let idiff = match input_shape.len().checked_sub(normalized_shape.len()) {
        Some(idiff) if &input_shape[idiff..] == normalized_shape => idiff,
        _ => {
            return Err(LayerNormError::InputShapeMismatch {
                normalized_shape: normalized_shape.to_vec(),
                input_shape: input_shape.to_vec(),
            })
        }
    };

    let n2 = normalized_shape.iter().product();
    let n1 = input_shape[..idiff].iter().product();
    Ok(RowSplit { n1, n2 })
}

/// Validate `input` against `normalized_shape` and compute the row split
///
/// Fails when `normalized_shape` is empty, or when the input has fewer
/// dimensions than `normalized_shape` or trailing dimensions that differ
/// from it.
pub fn check_input(input: &Tensor, normalized_shape: &[usize]) -> Result<RowSplit> {
    if normalized_shape.is_empty() {
        return Err(LayerNormError::EmptyNormalizedShape {
            normalized_shape: normalized_shape.to_vec(),
        });
    }
    compute_n1_n2(input.shape(), normalized_shape)
}

/// Validate the affine parameters against `normalized_shape`
///
/// Absent parameters are not checked. Gamma is checked before beta.
pub fn check_params(
    normalized_shape: &[usize],
    gamma: Option<&Tensor>,
    beta: Option<&Tensor>,
) -> Result<()> {
    for (param, tensor) in [("gamma", gamma), ("beta", beta)] {
        if let Some(t) = tensor {
            if t.shape() != normalized_shape {
                return Err(LayerNormError::ParamShapeMismatch {
                    param,
                    shape: t.shape().to_vec(),
                    normalized_shape: normalized_shape.to_vec(),
                });
            }
        }
    }
    Ok(())
}

/// Full argument check: input first, then parameters
pub fn check_args(
    input: &Tensor,
    normalized_shape: &[usize],
    gamma: Option<&Tensor>,
    beta: Option<&Tensor>,
) -> Result<RowSplit> {
    let split = check_input(input, normalized_shape)?;
    check_params(normalized_shape, gamma, beta)?;
    Ok(split)
}

/// Every tensor operand must live on the kernel's device and be contiguous
pub fn check_tensor(name: &'static str, tensor: &Tensor, device: Device) -> Result<()> {
    if tensor.device() != device {
        return Err(LayerNormError::WrongDevice {
            name,
            expected: device,
            actual: tensor.device(),
        });
    }
    if !tensor.is_contiguous() {
        return Err(LayerNormError::NotContiguous { name });
    }
    Ok(())
}
