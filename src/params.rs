//! Rule constants for the ring convolution.
//!
//! Two parameter sets are in use and neither is canonical, so the rule is
//! configuration data: pick a preset or supply a custom [`RuleParams`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmoothLifeError};

/// Largest accepted [`RuleParams::offset_extent`]. Every cell visits
/// `(2 * extent + 1)^2` offsets per tick on both the host and the device.
pub const MAX_EXTENT: i32 = 32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RuleParams {
    /// R1: upper bound of the inner ring (normalized distance)
    pub inner_radius: f32,
    /// R2: upper bound of the outer ring, also the integer offset extent
    pub outer_radius: f32,
    /// B1
    pub birth_lo: f32,
    /// B2
    pub birth_hi: f32,
    /// D1
    pub death_lo: f32,
    /// D2
    pub death_hi: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RulePreset {
    /// R2 = 4
    #[default]
    Compact,
    /// R2 = 5
    Wide,
}

impl RulePreset {
    pub const ALL: [RulePreset; 2] = [RulePreset::Compact, RulePreset::Wide];

    pub fn params(self) -> RuleParams {
        match self {
            RulePreset::Compact => RuleParams {
                inner_radius: 1.0,
                outer_radius: 4.0,
                birth_lo: 0.23,
                birth_hi: 0.336,
                death_lo: 0.477,
                death_hi: 0.5,
            },
            RulePreset::Wide => RuleParams {
                inner_radius: 1.0,
                outer_radius: 5.0,
                birth_lo: 0.257,
                birth_hi: 0.336,
                death_lo: 0.365,
                death_hi: 0.549,
            },
        }
    }
}

impl Default for RuleParams {
    fn default() -> Self {
        RulePreset::default().params()
    }
}

impl RuleParams {
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.inner_radius,
            self.outer_radius,
            self.birth_lo,
            self.birth_hi,
            self.death_lo,
            self.death_hi,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SmoothLifeError::InvalidParams(format!(
                "non-finite value in {:?}",
                self
            )));
        }
        if self.inner_radius < 0.0 {
            return Err(SmoothLifeError::InvalidParams(format!(
                "inner radius {} is negative",
                self.inner_radius
            )));
        }
        if self.inner_radius >= self.outer_radius {
            return Err(SmoothLifeError::InvalidParams(format!(
                "inner radius {} must be below outer radius {}",
                self.inner_radius, self.outer_radius
            )));
        }
        if self.offset_extent() > MAX_EXTENT {
            return Err(SmoothLifeError::InvalidParams(format!(
                "outer radius {} exceeds the offset limit of {}",
                self.outer_radius, MAX_EXTENT
            )));
        }
        if self.birth_lo >= self.birth_hi {
            return Err(SmoothLifeError::InvalidParams(format!(
                "birth thresholds out of order: {} >= {}",
                self.birth_lo, self.birth_hi
            )));
        }
        if self.death_lo >= self.death_hi {
            return Err(SmoothLifeError::InvalidParams(format!(
                "death thresholds out of order: {} >= {}",
                self.death_lo, self.death_hi
            )));
        }
        Ok(())
    }

    /// Largest integer offset visited in each axis; the kernel walks
    /// `-extent..=extent` in x and y.
    pub fn offset_extent(&self) -> i32 {
        self.outer_radius.floor() as i32
    }
}
