use thiserror::Error;

use crate::device::Device;
use crate::dtype::DType;

/// Renders the trailing part of the expected input shape, `[*, 2, 3]`.
fn star_shape(normalized_shape: &[usize]) -> String {
    let mut s = String::from("[*");
    for size in normalized_shape {
        s.push_str(&format!(", {}", size));
    }
    s.push(']');
    s
}

#[derive(Error, Debug)]
pub enum LayerNormError {
    #[error(
        "Expected normalized_shape to be at least 1-dimensional, i.e., containing at least one element, but got normalized_shape={normalized_shape:?}"
    )]
    EmptyNormalizedShape { normalized_shape: Vec<usize> },

    #[error(
        "Given normalized_shape={normalized_shape:?}, expected input with shape {}, but got input of size {input_shape:?}",
        star_shape(.normalized_shape)
    )]
    InputShapeMismatch {
        normalized_shape: Vec<usize>,
        input_shape: Vec<usize>,
    },

    #[error(
        "Expected {param} to be of same shape as normalized_shape, but got {param} of shape {shape:?} and normalized_shape={normalized_shape:?}"
    )]
    ParamShapeMismatch {
        param: &'static str,
        shape: Vec<usize>,
        normalized_shape: Vec<usize>,
    },

    #[error("{name} must be a {} tensor, but it is on {actual}", .expected.kind())]
    WrongDevice {
        name: &'static str,
        expected: Device,
        actual: Device,
    },

    #[error("{name} must be contiguous")]
    NotContiguous { name: &'static str },

    #[error("{op} is not implemented for dtype {dtype}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    #[error("Expected {name} of size {expected:?}, but got {name} of size {actual:?}")]
    TensorShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Expected {name} of dtype {expected}, but got {actual}")]
    StatsDTypeMismatch {
        name: &'static str,
        expected: DType,
        actual: DType,
    },

    #[error("Kernel '{kernel}' did not produce {output}")]
    MissingKernelOutput {
        kernel: String,
        output: &'static str,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayerNormError>;
