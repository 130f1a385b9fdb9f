//! Host-side state surface: a W x H grid of cell values in [0, 1].

use image::GrayImage;

use crate::error::{Result, SmoothLifeError};

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<f32>,
}

pub(crate) fn check_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SmoothLifeError::DegenerateSize { width, height });
    }
    Ok(())
}

impl Grid {
    /// Zero-filled (all dead) grid.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_size(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![0.0; width as usize * height as usize],
        })
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Result<Self> {
        let mut grid = Self::new(width, height)?;
        grid.cells.fill(value);
        Ok(grid)
    }

    /// Wraps row-major cell data (`y * width + x`).
    pub fn from_cells(width: u32, height: u32, cells: Vec<f32>) -> Result<Self> {
        check_size(width, height)?;
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(SmoothLifeError::GridMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let idx = self.index(x, y);
        self.cells[idx] = value;
    }

    /// Nearest-texel lookup at a normalized coordinate with clamp-to-edge
    /// addressing: anything outside [0,1] repeats the border texel.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let x = ((u * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((v * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        self.get(x as u32, y as u32)
    }

    /// Normalized coordinate of the pixel center of (x, y).
    #[inline]
    pub fn texel_center(&self, x: u32, y: u32) -> [f32; 2] {
        [
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        ]
    }

    /// Sum of all cell values.
    pub fn population(&self) -> f64 {
        self.cells.iter().map(|&c| c as f64).sum()
    }

    pub fn max_abs_diff(&self, other: &Grid) -> f32 {
        self.cells
            .iter()
            .zip(&other.cells)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }

    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = self.get(x, y).clamp(0.0, 1.0);
            image::Luma([(value * 255.0).round() as u8])
        })
    }
}
