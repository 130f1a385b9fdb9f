//! SmoothLife: a continuous-state cellular automaton stepped on the GPU.
//!
//! Two state surfaces ping-pong every tick. The per-cell rule aggregates an
//! inner and an outer ring of neighbors with exponential distance weights and
//! blends birth/death through smoothstep thresholds. [`cpu::CpuStepper`] is
//! the host reference; [`gpu`] runs the same rule as a compute shader and
//! presents the newest generation.

pub mod cpu;
pub mod error;
pub mod gpu;
pub mod grid;
pub mod kernel;
pub mod params;
pub mod seed;
pub mod settings;

pub use cpu::CpuStepper;
pub use error::{Result, SmoothLifeError};
pub use grid::Grid;
pub use params::{RuleParams, RulePreset};
pub use seed::SeedPattern;
pub use settings::Settings;
