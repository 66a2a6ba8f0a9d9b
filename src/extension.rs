//! Entry-point registry
//!
//! The host framework looks entry points up by name. This module owns those
//! names and their one-line descriptions, in registration order.

use std::fmt;
use std::str::FromStr;

use crate::device::Device;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    ForwardAffine,
    Forward,
    BackwardAffine,
    Backward,
}

impl EntryPoint {
    /// Registration order
    pub const ALL: [EntryPoint; 4] = [
        EntryPoint::ForwardAffine,
        EntryPoint::Forward,
        EntryPoint::BackwardAffine,
        EntryPoint::Backward,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntryPoint::ForwardAffine => "forward_affine",
            EntryPoint::Forward => "forward",
            EntryPoint::BackwardAffine => "backward_affine",
            EntryPoint::Backward => "backward",
        }
    }

    pub fn is_affine(self) -> bool {
        matches!(self, EntryPoint::ForwardAffine | EntryPoint::BackwardAffine)
    }

    pub fn is_backward(self) -> bool {
        matches!(self, EntryPoint::Backward | EntryPoint::BackwardAffine)
    }

    /// One-line description naming the backend, e.g. `LayerNorm forward (CUDA)`
    pub fn doc(self, device: Device) -> String {
        let pass = if self.is_backward() { "backward" } else { "forward" };
        format!("LayerNorm {} ({})", pass, device.kind())
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntryPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryPoint::ALL
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = EntryPoint::ALL.iter().map(|e| e.name()).collect();
                format!("unknown entry point '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for ep in EntryPoint::ALL {
            assert_eq!(ep.name().parse::<EntryPoint>().unwrap(), ep);
        }
    }

    #[test]
    fn test_unknown_name_lists_choices() {
        let err = "forward_fused".parse::<EntryPoint>().unwrap_err();
        assert!(err.contains("forward_affine, forward, backward_affine, backward"));
    }

    #[test]
    fn test_docs() {
        assert_eq!(EntryPoint::BackwardAffine.doc(Device::Cuda(0)), "LayerNorm backward (CUDA)");
        assert_eq!(EntryPoint::Forward.doc(Device::Cpu), "LayerNorm forward (CPU)");
        assert!(EntryPoint::ForwardAffine.is_affine());
        assert!(!EntryPoint::Forward.is_backward());
    }
}
