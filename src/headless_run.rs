// Headless GPU run checked against the CPU reference
// Run with: cargo run --release --bin headless_run -- [ticks] [width] [height] [compact|wide] [out.png]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use smoothlife::gpu::{GpuContext, GpuStepper, StateSurfaces};
use smoothlife::{seed, CpuStepper, RulePreset};

const TOLERANCE: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    Compact,
    Wide,
}

impl From<Preset> for RulePreset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Compact => RulePreset::Compact,
            Preset::Wide => RulePreset::Wide,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "headless_run")]
#[command(about = "Run SmoothLife on the GPU without a window and compare against the CPU")]
struct Options {
    /// Number of generations to simulate
    #[arg(default_value_t = 60)]
    ticks: u32,

    /// Grid width in cells
    #[arg(default_value_t = 256)]
    width: u32,

    /// Grid height in cells
    #[arg(default_value_t = 256)]
    height: u32,

    /// Rule parameter set
    #[arg(value_enum, default_value_t = Preset::Compact)]
    preset: Preset,

    /// Write the final GPU generation as a grayscale PNG
    png: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let options = Options::parse();
    let preset = RulePreset::from(options.preset);
    let params = preset.params();
    let generation_zero = seed::two_disks(options.width, options.height)?;

    let ctx = pollster::block_on(GpuContext::headless()).context("GPU initialization failed")?;
    let mut surfaces = StateSurfaces::new(&ctx, options.width, options.height)?;
    surfaces.upload(&ctx, &generation_zero)?;
    let mut stepper = GpuStepper::new(&ctx, &surfaces, &params)?;
    let mut reference = CpuStepper::new(generation_zero, &params)?;

    let gpu_start = Instant::now();
    for tick in 0..options.ticks {
        stepper.step(&ctx, &mut surfaces, tick as f32 / 60.0);
    }
    let gpu_grid = surfaces.read_current(&ctx)?;
    let gpu_time = gpu_start.elapsed();

    let cpu_start = Instant::now();
    for tick in 0..options.ticks {
        reference.step(tick as f32 / 60.0);
    }
    let cpu_time = cpu_start.elapsed();

    let diff = gpu_grid.max_abs_diff(reference.current());
    println!(
        "{}x{} {:?}, {} ticks | GPU {:.2} ms | CPU {:.2} ms | population {:.1} | max |gpu - cpu| = {:.3e}",
        options.width,
        options.height,
        preset,
        options.ticks,
        gpu_time.as_secs_f64() * 1000.0,
        cpu_time.as_secs_f64() * 1000.0,
        gpu_grid.population(),
        diff
    );

    if let Some(path) = &options.png {
        gpu_grid
            .to_gray_image()
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    // Divergence compounds over many ticks; only a single tick is held to the
    // tight bound.
    if options.ticks == 1 && diff > TOLERANCE {
        bail!("GPU and CPU disagree after one tick: {diff}");
    }
    Ok(())
}
