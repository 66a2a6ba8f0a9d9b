//! Layer Normalization Module
//!
//! [`FusedLayerNorm`] owns the layer state (normalized shape, epsilon and the
//! optional learnable gamma/beta) and routes each pass to the matching entry
//! point in [`crate::ops`]:
//!
//! | elementwise_affine | forward          | backward          |
//! |--------------------|------------------|-------------------|
//! | `false`            | `forward`        | `backward`        |
//! | `true`             | `forward_affine` | `backward_affine` |
//!
//! ## Forward Pass
//!
//! ```text
//! x_norm = (x - mean) / √(var + ε)
//! y      = γ * x_norm + β            (affine only)
//! ```
//!
//! The statistics `mean` and `invvar` are kept in a [`LayerNormCache`] so the
//! backward pass does not recompute them.
//!
//! ## Example
//!
//! ```rust
//! use fused_layer_norm::{FusedLayerNorm, Tensor};
//!
//! let ln = FusedLayerNorm::new(vec![4]);
//! let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 2.0, 2.0, 2.0, 6.0], vec![2, 4]);
//! let (y, cache) = ln.forward(&x)?;
//! let grads = ln.backward(&Tensor::new(vec![1.0; 8], vec![2, 4]), &cache)?;
//! assert_eq!(y.shape(), &[2, 4]);
//! assert_eq!(grads.x.shape(), &[2, 4]);
//! # Ok::<(), fused_layer_norm::LayerNormError>(())
//! ```

use crate::config::LayerNormConfig;
use crate::dtype::DType;
use crate::error::Result;
use crate::kernel::{CpuKernel, LayerNormKernel};
use crate::ops::LayerNormOps;
use crate::tensor::Tensor;

/// Layer normalization over the trailing `normalized_shape` dimensions
pub struct FusedLayerNorm<K: LayerNormKernel = CpuKernel> {
    pub normalized_shape: Vec<usize>,
    pub eps: f64,
    /// Scale parameter, shaped like `normalized_shape`
    pub gamma: Option<Tensor>,
    /// Shift parameter, shaped like `normalized_shape`
    pub beta: Option<Tensor>,
    ops: LayerNormOps<K>,
}

impl FusedLayerNorm<CpuKernel> {
    /// Create an affine layer with the default epsilon on the CPU kernel
    ///
    /// # Initialization
    ///
    /// - gamma initialized to 1.0 (no scaling initially)
    /// - beta initialized to 0.0 (no shift initially)
    /// - eps = 1e-5
    pub fn new(normalized_shape: Vec<usize>) -> Self {
        let config = LayerNormConfig::new(normalized_shape);
        Self::build(&config, CpuKernel)
    }

    pub fn from_config(config: &LayerNormConfig) -> Result<Self> {
        Self::with_kernel(config, CpuKernel)
    }
}

impl<K: LayerNormKernel> FusedLayerNorm<K> {
    /// Create a layer whose passes run on `kernel`
    ///
    /// Parameters are placed on the kernel's device.
    pub fn with_kernel(config: &LayerNormConfig, kernel: K) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, kernel))
    }

    fn build(config: &LayerNormConfig, kernel: K) -> Self {
        let mut layer = Self {
            normalized_shape: config.normalized_shape.clone(),
            eps: config.eps,
            gamma: None,
            beta: None,
            ops: LayerNormOps::new(kernel),
        };
        if config.elementwise_affine {
            layer.reset_parameters();
        }
        layer
    }

    pub fn elementwise_affine(&self) -> bool {
        self.gamma.is_some()
    }

    /// Set gamma to ones and beta to zeros
    pub fn reset_parameters(&mut self) {
        let device = self.ops.kernel().device();
        let shape = self.normalized_shape.clone();
        self.gamma = Some(Tensor::ones(shape.clone(), DType::F32).to_device(device));
        self.beta = Some(Tensor::zeros(shape, DType::F32).to_device(device));
    }

    /// Forward pass
    ///
    /// # Returns
    ///
    /// Tuple of (output, cache) where:
    /// - output: Normalized tensor, same shape as `x`
    /// - cache: Stores values needed for backward pass
    pub fn forward(&self, x: &Tensor) -> Result<(Tensor, LayerNormCache)> {
        let out = match (&self.gamma, &self.beta) {
            (Some(gamma), Some(beta)) => {
                self.ops
                    .forward_affine(x, &self.normalized_shape, gamma, beta, self.eps)?
            }
            _ => self.ops.forward(x, &self.normalized_shape, self.eps)?,
        };

        let cache = LayerNormCache {
            x: x.clone(),
            mean: out.mean,
            invvar: out.invvar,
        };
        Ok((out.output, cache))
    }

    /// Backward pass
    ///
    /// Computes gradients for the input and, when affine, for gamma and beta.
    pub fn backward(&self, grad_out: &Tensor, cache: &LayerNormCache) -> Result<LayerNormGradients> {
        match (&self.gamma, &self.beta) {
            (Some(gamma), Some(beta)) => {
                let grads = self.ops.backward_affine(
                    grad_out,
                    &cache.mean,
                    &cache.invvar,
                    &cache.x,
                    &self.normalized_shape,
                    gamma,
                    beta,
                    self.eps,
                )?;
                Ok(LayerNormGradients {
                    x: grads.grad_input,
                    gamma: Some(grads.grad_gamma),
                    beta: Some(grads.grad_beta),
                })
            }
            _ => {
                let x = self.ops.backward(
                    grad_out,
                    &cache.mean,
                    &cache.invvar,
                    &cache.x,
                    &self.normalized_shape,
                    self.eps,
                )?;
                Ok(LayerNormGradients {
                    x,
                    gamma: None,
                    beta: None,
                })
            }
        }
    }

    /// Short description of the layer, e.g. `[768], eps=0.00001, elementwise_affine=true`
    pub fn extra_repr(&self) -> String {
        format!(
            "{:?}, eps={}, elementwise_affine={}",
            self.normalized_shape,
            self.eps,
            self.elementwise_affine()
        )
    }
}

/// Cache for layer norm backward pass
#[derive(Clone, Debug)]
pub struct LayerNormCache {
    pub x: Tensor,
    pub mean: Tensor,
    pub invvar: Tensor,
}

/// Gradients for layer norm
#[derive(Clone, Debug)]
pub struct LayerNormGradients {
    pub x: Tensor,
    pub gamma: Option<Tensor>,
    pub beta: Option<Tensor>,
}
