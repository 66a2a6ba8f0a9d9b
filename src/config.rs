//! Layer norm configuration
//!
//! A [`LayerNormConfig`] describes one normalization layer and is stored as
//! JSON:
//!
//! ```json
//! { "normalized_shape": [768], "eps": 1e-5, "elementwise_affine": true }
//! ```
//!
//! `eps` and `elementwise_affine` may be omitted and fall back to the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{LayerNormError, Result};

pub const DEFAULT_EPS: f64 = 1e-5;

fn default_eps() -> f64 {
    DEFAULT_EPS
}

fn default_affine() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerNormConfig {
    /// Trailing input dimensions to normalize over
    pub normalized_shape: Vec<usize>,
    /// Added to the variance before taking the square root
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Whether the layer owns learnable gamma/beta
    #[serde(default = "default_affine")]
    pub elementwise_affine: bool,
}

impl LayerNormConfig {
    pub fn new(normalized_shape: Vec<usize>) -> Self {
        Self {
            normalized_shape,
            eps: DEFAULT_EPS,
            elementwise_affine: true,
        }
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_elementwise_affine(mut self, affine: bool) -> Self {
        self.elementwise_affine = affine;
        self
    }

    /// Number of elements per normalized row
    pub fn n2(&self) -> usize {
        self.normalized_shape.iter().product()
    }

    pub fn validate(&self) -> Result<()> {
        if self.normalized_shape.is_empty() {
            return Err(LayerNormError::EmptyNormalizedShape {
                normalized_shape: Vec::new(),
            });
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(LayerNormError::Config {
                message: format!("eps must be a positive finite number, got {}", self.eps),
            });
        }
        Ok(())
    }

    /// Load and validate a JSON config
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: LayerNormConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: LayerNormConfig = serde_json::from_str(r#"{"normalized_shape": [16, 4]}"#).unwrap();
        assert_eq!(config.eps, DEFAULT_EPS);
        assert!(config.elementwise_affine);
        assert_eq!(config.n2(), 64);
    }

    #[test]
    fn test_validate() {
        assert!(LayerNormConfig::new(vec![8]).validate().is_ok());
        assert!(LayerNormConfig::new(vec![]).validate().is_err());
        assert!(LayerNormConfig::new(vec![8]).with_eps(0.0).validate().is_err());
        assert!(LayerNormConfig::new(vec![8]).with_eps(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ln.json");

        let config = LayerNormConfig::new(vec![768])
            .with_eps(1e-6)
            .with_elementwise_affine(false);
        config.save_json(&path).unwrap();

        let loaded = LayerNormConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"normalized_shape": [], "eps": 1e-5}"#).unwrap();

        let err = LayerNormConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, LayerNormError::EmptyNormalizedShape { .. }));
    }
}
