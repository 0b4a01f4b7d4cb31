//! Validation and normalization of `r,g,b[,a]` color specifications.
//!
//! Only the syntax is checked. Component ranges are left to the renderer,
//! so `999,0,0,0.5` is accepted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Color assigned to new glass records
pub const DEFAULT_GLASS_COLOR: &str = "255,255,255,0.3";

static COLOR_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+,[0-9]+,[0-9]+(,([0-9]+(\.[0-9]*)?|\.[0-9]+))?$").expect("color spec pattern compiles")
});

/// Strip whitespace and check the 3/4 component shape
pub fn normalize(spec: &str) -> Option<String> {
    let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
    COLOR_SPEC.is_match(&compact).then_some(compact)
}

pub fn is_valid(spec: &str) -> bool {
    normalize(spec).is_some()
}

/// Display color for the preview control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swatch {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Swatch {
    pub fn neutral() -> Self {
        Self {
            r: 204,
            g: 204,
            b: 204,
            a: 1.0,
        }
    }

    /// Parse a spec for display, clamping components into displayable range
    pub fn from_spec(spec: &str) -> Option<Self> {
        let compact = normalize(spec)?;
        let mut parts = compact.split(',');

        let mut channel = || -> Option<u8> {
            let value: u64 = parts.next()?.parse().ok()?;
            Some(value.min(255) as u8)
        };
        let r = channel()?;
        let g = channel()?;
        let b = channel()?;

        let a = match parts.next() {
            Some(alpha) => alpha.parse::<f32>().ok()?.clamp(0.0, 1.0),
            None => 1.0,
        };

        Some(Self { r, g, b, a })
    }

    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Default for Swatch {
    fn default() -> Self {
        Self::neutral()
    }
}
