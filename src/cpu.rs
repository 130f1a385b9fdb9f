//! Host ping-pong stepper.
//!
//! Two grids, one flag. A tick reads only the current grid and writes only
//! the other one, rows in parallel, then flips the flag.

use rayon::prelude::*;

use crate::error::{Result, SmoothLifeError};
use crate::grid::Grid;
use crate::kernel::Stencil;
use crate::params::RuleParams;

pub struct CpuStepper {
    grid_a: Grid,
    grid_b: Grid,
    current_is_a: bool,
    stencil: Stencil,
    generation: u64,
    elapsed: f32,
}

impl CpuStepper {
    pub fn new(seed: Grid, params: &RuleParams) -> Result<Self> {
        params.validate()?;
        let grid_b = Grid::new(seed.width(), seed.height())?;
        let stencil = Stencil::new(params, seed.width(), seed.height());
        Ok(Self {
            grid_a: seed,
            grid_b,
            current_is_a: true,
            stencil,
            generation: 0,
            elapsed: 0.0,
        })
    }

    /// Latest completed generation.
    pub fn current(&self) -> &Grid {
        if self.current_is_a {
            &self.grid_a
        } else {
            &self.grid_b
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Time handed to the most recent tick. The rule does not consume it.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn params(&self) -> &RuleParams {
        self.stencil.params()
    }

    /// Computes generation N+1 from generation N and makes it current.
    pub fn step(&mut self, elapsed: f32) {
        let (read, write) = if self.current_is_a {
            (&self.grid_a, &mut self.grid_b)
        } else {
            (&self.grid_b, &mut self.grid_a)
        };
        let stencil = &self.stencil;
        let width = read.width() as usize;

        write
            .cells_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = stencil.next_value(read, x as u32, y as u32);
                }
            });

        self.current_is_a = !self.current_is_a;
        self.generation += 1;
        self.elapsed = elapsed;
    }

    /// Replaces generation 0; dimensions must match the allocated grids.
    pub fn reset(&mut self, seed: Grid) -> Result<()> {
        if seed.width() != self.grid_a.width() || seed.height() != self.grid_a.height() {
            return Err(SmoothLifeError::GridMismatch {
                expected: self.grid_a.cells().len(),
                actual: seed.cells().len(),
            });
        }
        self.grid_a = seed;
        self.grid_b.cells_mut().fill(0.0);
        self.current_is_a = true;
        self.generation = 0;
        self.elapsed = 0.0;
        Ok(())
    }
}
