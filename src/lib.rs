//! Fused Layer Norm: Layer Normalization Entry Points
//!
//! Binds a forward/backward layer-normalization kernel pair, with and without
//! learnable affine parameters, behind four entry points. The crate does the
//! bookkeeping around the kernel: argument validation, splitting the input
//! into `n1 x n2` rows, allocating outputs and dispatching to a
//! [`LayerNormKernel`].
//!
//! # Modules
//!
//! - [`ops`] - the `forward`, `forward_affine`, `backward` and
//!   `backward_affine` entry points
//! - [`args`] - shape validation and the `n1 x n2` row split
//! - [`alloc`] - output allocation and the statistics dtype rule
//! - [`kernel`] - the kernel trait and the CPU reference kernel
//! - [`extension`] - entry point names and descriptions
//! - [`layers`] - the [`FusedLayerNorm`] module wrapper
//! - [`tensor`] - the host tensor the entry points operate on
//! - [`config`] - JSON layer configuration
//!
//! # Example
//!
//! ```rust
//! use fused_layer_norm::{ops, DType, Tensor};
//!
//! let x = Tensor::from_f64(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3], DType::F64);
//! let gamma = Tensor::ones(vec![3], DType::F64);
//! let beta = Tensor::zeros(vec![3], DType::F64);
//!
//! let fwd = ops::forward_affine(&x, &[3], &gamma, &beta, 1e-5)?;
//! let dout = Tensor::ones(vec![2, 3], DType::F64);
//! let grads = ops::backward_affine(&dout, &fwd.mean, &fwd.invvar, &x, &[3], &gamma, &beta, 1e-5)?;
//! assert_eq!(grads.grad_beta.to_f64_vec(), vec![2.0, 2.0, 2.0]);
//! # Ok::<(), fused_layer_norm::LayerNormError>(())
//! ```

pub mod alloc;
pub mod args;
pub mod config;
pub mod device;
pub mod dtype;
pub mod error;
pub mod extension;
pub mod kernel;
pub mod layers;
pub mod logging;
pub mod ops;
pub mod tensor;

// Re-export main types for convenience
pub use alloc::{BackwardOutput, ForwardOutput};
pub use args::RowSplit;
pub use config::LayerNormConfig;
pub use device::Device;
pub use dtype::DType;
pub use error::{LayerNormError, Result};
pub use extension::EntryPoint;
pub use kernel::{CpuKernel, LayerNormKernel};
pub use layers::{FusedLayerNorm, LayerNormCache, LayerNormGradients};
pub use logging::init_logger;
pub use ops::{AffineGradients, LayerNormOps};
pub use tensor::{Storage, Tensor};
