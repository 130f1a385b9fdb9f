//! Generation 0.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{check_size, Grid};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedPattern {
    #[default]
    TwoDisks,
    Noise { density: f32, seed: u64 },
}

impl SeedPattern {
    pub fn generate(&self, width: u32, height: u32) -> Result<Grid> {
        match *self {
            SeedPattern::TwoDisks => two_disks(width, height),
            SeedPattern::Noise { density, seed } => noise(width, height, density, seed),
        }
    }
}

/// Two filled disks of radius min(W,H)/6 centred at (2W/5, H/2) and
/// (3W/5, H/2). A cell is alive when its pixel center lies strictly inside
/// either disk. This is the only place that works in pixel space.
pub fn two_disks(width: u32, height: u32) -> Result<Grid> {
    check_size(width, height)?;
    let w = width as f32;
    let h = height as f32;
    let radius = w.min(h) / 6.0;
    let radius_sq = radius * radius;
    let centers = [[2.0 * w / 5.0, h / 2.0], [3.0 * w / 5.0, h / 2.0]];

    let mut grid = Grid::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let inside = centers.iter().any(|c| {
                let dx = px - c[0];
                let dy = py - c[1];
                dx * dx + dy * dy < radius_sq
            });
            if inside {
                grid.set(x, y, 1.0);
            }
        }
    }
    Ok(grid)
}

/// Random binary soup; identical `seed` gives identical grids. Density is
/// clamped to [0, 1], and a non-finite density gives an empty grid.
pub fn noise(width: u32, height: u32, density: f32, seed: u64) -> Result<Grid> {
    check_size(width, height)?;
    // NaN survives clamp and gen_bool rejects it
    let density = if density.is_finite() {
        density.clamp(0.0, 1.0) as f64
    } else {
        0.0
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid = Grid::new(width, height)?;
    for cell in grid.cells_mut() {
        if rng.gen_bool(density) {
            *cell = 1.0;
        }
    }
    Ok(grid)
}
