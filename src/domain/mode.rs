// ============================================================
// Layer 3 — Network Dimensionality Mode
// ============================================================
// The network runs in one of two convolutional modes:
//
//   Planar     — 2D convolutions over single slices [N, C, H, W]
//   Volumetric — 3D convolutions over whole volumes [N, C, D, H, W]
//
// The mode is an enum rather than a free-form string, so an
// unsupported dimensionality is unrepresentable: the only place
// a string enters the system is CLI parsing, which fails fast
// with the list of accepted values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetMode {
    /// 2D convolutions — one axial slice at a time
    Planar,
    /// 3D convolutions — whole volumes
    Volumetric,
}

impl FromStr for NetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "2d" | "planar" => Ok(NetMode::Planar),
            "3d" | "volumetric" => Ok(NetMode::Volumetric),
            other => Err(format!(
                "unsupported network mode '{other}' — expected '2d' or '3d'"
            )),
        }
    }
}

impl fmt::Display for NetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetMode::Planar => write!(f, "2d"),
            NetMode::Volumetric => write!(f, "3d"),
        }
    }
}
