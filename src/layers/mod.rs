//! Neural Network Layers
//!
//! Layer wrappers around the entry points in [`crate::ops`]. Each layer
//! follows the same pattern:
//!
//! ```rust,ignore
//! impl Layer {
//!     pub fn forward(&self, x: &Tensor) -> Result<(Tensor, Cache)> { }
//!     pub fn backward(&self, grad: &Tensor, cache: &Cache) -> Result<Gradients> { }
//! }
//! ```
//!
//! The cache carries whatever the backward pass needs from the forward pass.

pub mod layer_norm;

pub use layer_norm::{FusedLayerNorm, LayerNormCache, LayerNormGradients};
