//! Per-cell SmoothLife rule, host reference.
//!
//! For every integer offset (dx, dy) in [-R2, R2]^2 the offset is converted to
//! normalized units by dividing by the resolution, so the ring extents are
//! measured in texture space, not in pixels. Offsets with |offset| <= R1 feed
//! the inner ring, R1 < |offset| <= R2 the outer ring; both are weighted by
//! exp(-10 |offset|). The two ring averages are mixed 50/50 and pushed through
//! the birth/death smoothsteps.
//!
//! `shaders/step.wgsl` evaluates the same arithmetic on the GPU.

use crate::grid::Grid;
use crate::params::RuleParams;

/// Exponential falloff applied to every contributing offset.
pub const WEIGHT_FALLOFF: f32 = 10.0;

/// Cubic Hermite threshold: 0 below `e0`, 1 above `e1`.
#[inline]
pub fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
pub fn offset_weight(d: f32) -> f32 {
    (-d * WEIGHT_FALLOFF).exp()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ring {
    Inner,
    Outer,
}

/// Ring membership for a normalized distance; `None` past the outer ring.
#[inline]
pub fn classify(d: f32, params: &RuleParams) -> Option<Ring> {
    if d <= params.inner_radius {
        Some(Ring::Inner)
    } else if d <= params.outer_radius {
        Some(Ring::Outer)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StencilTap {
    pub dx: i32,
    pub dy: i32,
    /// (dx / W, dy / H)
    pub offset: [f32; 2],
    pub distance: f32,
    pub weight: f32,
    pub ring: Ring,
}

/// The offsets a cell aggregates at a given resolution. Depends only on the
/// rule and the resolution, so it is built once per surface size.
#[derive(Debug, Clone)]
pub struct Stencil {
    taps: Vec<StencilTap>,
    params: RuleParams,
}

impl Stencil {
    pub fn new(params: &RuleParams, width: u32, height: u32) -> Self {
        let extent = params.offset_extent();
        let w = width as f32;
        let h = height as f32;
        let side = 2 * extent.max(0) as usize + 1;
        let mut taps = Vec::with_capacity(side.checked_mul(side).unwrap_or(0));
        for dy in -extent..=extent {
            for dx in -extent..=extent {
                let offset = [dx as f32 / w, dy as f32 / h];
                let distance = (offset[0] * offset[0] + offset[1] * offset[1]).sqrt();
                if let Some(ring) = classify(distance, params) {
                    taps.push(StencilTap {
                        dx,
                        dy,
                        offset,
                        distance,
                        weight: offset_weight(distance),
                        ring,
                    });
                }
            }
        }
        Self {
            taps,
            params: *params,
        }
    }

    pub fn taps(&self) -> &[StencilTap] {
        &self.taps
    }

    pub fn params(&self) -> &RuleParams {
        &self.params
    }

    /// Weighted inner/outer sums around the texel center of (x, y).
    pub fn aggregate(&self, grid: &Grid, x: u32, y: u32) -> RingSums {
        let [u, v] = grid.texel_center(x, y);
        let mut sums = RingSums::default();
        for tap in &self.taps {
            let value = grid.sample(u + tap.offset[0], v + tap.offset[1]);
            sums.add(tap.ring, value, tap.weight);
        }
        sums
    }

    /// Next value of cell (x, y).
    pub fn next_value(&self, grid: &Grid, x: u32, y: u32) -> f32 {
        let current = grid.get(x, y);
        let sums = self.aggregate(grid, x, y);
        transition(current, sums.neighbor_state(), &self.params)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RingSums {
    pub inner_sum: f32,
    pub inner_weight: f32,
    pub outer_sum: f32,
    pub outer_weight: f32,
}

impl RingSums {
    #[inline]
    fn add(&mut self, ring: Ring, value: f32, weight: f32) {
        match ring {
            Ring::Inner => {
                self.inner_sum += value * weight;
                self.inner_weight += weight;
            }
            Ring::Outer => {
                self.outer_sum += value * weight;
                self.outer_weight += weight;
            }
        }
    }

    /// An empty ring averages to 0.
    pub fn inner_state(&self) -> f32 {
        if self.inner_weight > 0.0 {
            self.inner_sum / self.inner_weight
        } else {
            0.0
        }
    }

    pub fn outer_state(&self) -> f32 {
        if self.outer_weight > 0.0 {
            self.outer_sum / self.outer_weight
        } else {
            0.0
        }
    }

    pub fn neighbor_state(&self) -> f32 {
        0.5 * self.inner_state() + 0.5 * self.outer_state()
    }
}

/// Birth/death blend for one cell.
#[inline]
pub fn transition(current: f32, neighbor_state: f32, params: &RuleParams) -> f32 {
    let birth = smoothstep(params.birth_lo, params.birth_hi, neighbor_state);
    let death = smoothstep(params.death_lo, params.death_hi, neighbor_state);
    current * (1.0 - death) + (1.0 - current) * birth
}

/// Single-cell evaluation without a cached stencil.
pub fn next_value(grid: &Grid, x: u32, y: u32, params: &RuleParams) -> f32 {
    Stencil::new(params, grid.width(), grid.height()).next_value(grid, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RulePreset;

    #[test]
    fn smoothstep_edges_and_midpoint() {
        assert_eq!(smoothstep(0.23, 0.336, 0.23), 0.0);
        assert_eq!(smoothstep(0.23, 0.336, 0.336), 1.0);
        assert!((smoothstep(0.23, 0.336, 0.283) - 0.5).abs() < 1e-3);
        assert!((smoothstep(0.23, 0.336, 0.2829) - 0.5).abs() < 0.01);
        assert_eq!(smoothstep(0.23, 0.336, -5.0), 0.0);
        assert_eq!(smoothstep(0.23, 0.336, 5.0), 1.0);
    }

    #[test]
    fn smoothstep_is_monotonic() {
        let mut last = 0.0;
        for i in 0..=1000 {
            let x = 0.23 + (0.336 - 0.23) * i as f32 / 1000.0;
            let y = smoothstep(0.23, 0.336, x);
            assert!(y >= last, "decreased at x = {x}");
            last = y;
        }
    }

    #[test]
    fn ring_partition_800x600() {
        let params = RuleParams {
            inner_radius: 1.0,
            outer_radius: 4.0,
            ..RulePreset::Compact.params()
        };
        let stencil = Stencil::new(&params, 800, 600);
        let extent = params.offset_extent();
        let mut expected_inner = 0;
        let mut expected_outer = 0;
        for dy in -extent..=extent {
            for dx in -extent..=extent {
                let ox = dx as f32 / 800.0;
                let oy = dy as f32 / 600.0;
                let d = (ox * ox + oy * oy).sqrt();
                let hits: Vec<_> = stencil
                    .taps()
                    .iter()
                    .filter(|t| t.dx == dx && t.dy == dy)
                    .collect();
                if d <= 4.0 {
                    assert_eq!(hits.len(), 1, "offset ({dx},{dy}) counted {} times", hits.len());
                    let want = if d <= 1.0 { Ring::Inner } else { Ring::Outer };
                    assert_eq!(hits[0].ring, want);
                    match want {
                        Ring::Inner => expected_inner += 1,
                        Ring::Outer => expected_outer += 1,
                    }
                } else {
                    assert!(hits.is_empty());
                }
            }
        }
        // at this resolution every offset is far inside R1
        assert_eq!(expected_inner, 81);
        assert_eq!(expected_outer, 0);
        assert_eq!(stencil.taps().len(), 81);
    }

    #[test]
    fn ring_partition_unit_resolution() {
        // 1x1 makes normalized distance equal pixel distance, exercising both rings
        for preset in RulePreset::ALL {
            let params = preset.params();
            let stencil = Stencil::new(&params, 1, 1);
            let extent = params.offset_extent();
            let mut inner = 0;
            let mut outer = 0;
            for dy in -extent..=extent {
                for dx in -extent..=extent {
                    let d = ((dx * dx + dy * dy) as f32).sqrt();
                    match classify(d, &params) {
                        Some(Ring::Inner) => inner += 1,
                        Some(Ring::Outer) => outer += 1,
                        None => assert!(d > params.outer_radius),
                    }
                }
            }
            let taps = stencil.taps();
            assert_eq!(taps.iter().filter(|t| t.ring == Ring::Inner).count(), inner);
            assert_eq!(taps.iter().filter(|t| t.ring == Ring::Outer).count(), outer);
            assert_eq!(inner, 5);
            assert!(outer > 0);
        }
    }

    #[test]
    fn weights_decay_with_distance() {
        assert_eq!(offset_weight(0.0), 1.0);
        assert!(offset_weight(0.1) > offset_weight(0.2));
        assert!((offset_weight(0.1) - (-1.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn empty_inner_ring_contributes_zero() {
        let sums = RingSums {
            outer_sum: 2.0,
            outer_weight: 4.0,
            ..RingSums::default()
        };
        assert_eq!(sums.inner_state(), 0.0);
        assert_eq!(sums.neighbor_state(), 0.25);
    }

    #[test]
    fn transition_stays_in_unit_range() {
        for preset in RulePreset::ALL {
            let params = preset.params();
            for ci in 0..=20 {
                for ni in 0..=50 {
                    let current = ci as f32 / 20.0;
                    let neighbor = ni as f32 / 50.0;
                    let next = transition(current, neighbor, &params);
                    assert!(
                        (-1e-6..=1.0 + 1e-6).contains(&next),
                        "{preset:?}: transition({current}, {neighbor}) = {next}"
                    );
                }
            }
        }
    }

    #[test]
    fn corner_aggregate_repeats_edge_samples() {
        let mut grid = Grid::new(20, 20).unwrap();
        grid.set(0, 0, 1.0);
        let stencil = Stencil::new(&RulePreset::Compact.params(), 20, 20);

        // clamping folds the 5x5 out-of-range quadrant onto the corner texel
        let corner = stencil.aggregate(&grid, 0, 0);
        assert!(corner.inner_state() > 20.0 / 81.0);

        for (x, y) in [(19, 19), (19, 0), (0, 19)] {
            let sums = stencil.aggregate(&grid, x, y);
            assert_eq!(sums.inner_state(), 0.0, "wrapped into ({x},{y})");
            assert_eq!(sums.outer_state(), 0.0);
        }
    }
}
