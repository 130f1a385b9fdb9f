// SmoothLife - GPU continuous-state cellular automaton
// Licensed under MIT License

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use smoothlife::gpu::{preferred_target_format, GpuContext, GpuStepper, Presenter, StateSurfaces};
use smoothlife::{Grid, Settings};
use winit::{
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

/// Times startup phases through `log::debug!`; enable with
/// `RUST_LOG=smoothlife=debug`.
struct StartupTrace {
    start: Instant,
    last: Instant,
}

impl StartupTrace {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    /// Logs the phase that just finished and returns (phase, total) in ms.
    fn phase_done(&mut self, phase: &str) -> (f64, f64) {
        let now = Instant::now();
        let phase_ms = now.duration_since(self.last).as_secs_f64() * 1000.0;
        let total_ms = now.duration_since(self.start).as_secs_f64() * 1000.0;
        self.last = now;
        log::debug!("startup: {phase} took {phase_ms:.2} ms ({total_ms:.2} ms total)");
        (phase_ms, total_ms)
    }
}

struct SmoothLifeState {
    ctx: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    surfaces: StateSurfaces,
    stepper: GpuStepper,
    presenter: Presenter,

    settings: Settings,
    start: Instant,
    paused: bool,
    single_step: bool,

    frame_count: u32,
    frame_time_sum: f32,
    last_fps_update: Instant,
}

impl SmoothLifeState {
    async fn new(window: Arc<Window>, settings: Settings) -> anyhow::Result<Self> {
        let mut trace = StartupTrace::new();

        let (ctx, surface) = GpuContext::for_window(window.clone())
            .await
            .context("GPU initialization failed")?;
        trace.phase_done("device");

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let surface_caps = surface.get_capabilities(&ctx.adapter);
        let surface_format = preferred_target_format(&surface_caps.formats)
            .context("surface reports no formats")?;
        let present_mode = if !settings.vsync
            && surface_caps
                .present_modes
                .contains(&wgpu::PresentMode::Immediate)
        {
            wgpu::PresentMode::Immediate
        } else {
            wgpu::PresentMode::Fifo
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);
        trace.phase_done("surface");

        let mut surfaces = StateSurfaces::new(&ctx, width, height)
            .context("allocating state surfaces")?;
        let seed = settings
            .seed
            .generate(width, height)
            .context("seeding generation 0")?;
        surfaces.upload(&ctx, &seed)?;
        trace.phase_done("generation 0");

        let rule = settings.rule();
        let stepper = GpuStepper::new(&ctx, &surfaces, &rule).context("building step kernel")?;
        trace.phase_done("step pipeline");
        let presenter = Presenter::new(&ctx, &surfaces, surface_format)
            .context("building present pipeline")?;
        trace.phase_done("present pipeline");

        log::info!(
            "SmoothLife {}x{} with {:?} (R1={}, R2={}, B=[{}, {}], D=[{}, {}])",
            width,
            height,
            settings.preset,
            rule.inner_radius,
            rule.outer_radius,
            rule.birth_lo,
            rule.birth_hi,
            rule.death_lo,
            rule.death_hi
        );

        Ok(Self {
            ctx,
            surface,
            surface_config,
            surfaces,
            stepper,
            presenter,
            settings,
            start: Instant::now(),
            paused: false,
            single_step: false,
            frame_count: 0,
            frame_time_sum: 0.0,
            last_fps_update: Instant::now(),
        })
    }

    /// Partial-resolution state is meaningless, so a resize reallocates both
    /// surfaces at the new size and starts again from generation 0.
    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.ctx.device, &self.surface_config);

        self.surfaces = StateSurfaces::new(&self.ctx, width, height)?;
        self.presenter.attach(&self.ctx, &self.surfaces);
        self.reseed()?;
        log::info!("Resized to {}x{}, reseeded", width, height);
        Ok(())
    }

    fn reseed(&mut self) -> anyhow::Result<()> {
        let seed = self
            .settings
            .seed
            .generate(self.surfaces.width(), self.surfaces.height())?;
        self.surfaces.upload(&self.ctx, &seed)?;
        // rebinds to the (possibly new) surfaces and restarts the generation count
        self.stepper.attach(&self.ctx, &self.surfaces);
        self.start = Instant::now();
        Ok(())
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        log::info!(
            "{} at generation {}",
            if self.paused { "Paused" } else { "Resumed" },
            self.stepper.generation()
        );
    }

    fn request_single_step(&mut self) {
        if self.paused {
            self.single_step = true;
        }
    }

    fn get_fps_and_frame_time(&mut self) -> Option<(f32, f32)> {
        let elapsed = self.last_fps_update.elapsed();
        if elapsed.as_secs_f32() >= 0.5 && self.frame_count > 0 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            let avg_frame_time_ms = (self.frame_time_sum / self.frame_count as f32) * 1000.0;
            self.frame_count = 0;
            self.frame_time_sum = 0.0;
            self.last_fps_update = Instant::now();
            return Some((fps, avg_frame_time_ms));
        }
        None
    }

    fn update_window_title(&mut self, window: &Window) {
        if let Some((fps, frame_time_ms)) = self.get_fps_and_frame_time() {
            let title = format!(
                "SmoothLife - {}x{} | gen {} | {:.0} FPS | {:.2} ms/frame{}",
                self.surfaces.width(),
                self.surfaces.height(),
                self.stepper.generation(),
                fps,
                frame_time_ms,
                if self.paused { " | paused" } else { "" }
            );
            window.set_title(&title);
        }
    }

    /// One frame: compute the tick(s), then draw the surface that was just
    /// written. Both go into the same submission so the draw is ordered after
    /// the compute work; generation N+1 is on screen the frame it exists.
    fn frame(&mut self, dt: f32) -> Result<(), wgpu::SurfaceError> {
        self.frame_count += 1;
        self.frame_time_sum += dt;

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let ticks = if !self.paused {
            self.settings.ticks_per_frame
        } else if std::mem::take(&mut self.single_step) {
            1
        } else {
            0
        };
        let elapsed = self.start.elapsed().as_secs_f32();
        for _ in 0..ticks {
            self.stepper
                .encode_step(&self.ctx, &mut encoder, &mut self.surfaces, elapsed);
        }

        self.presenter.encode_present(
            &self.ctx,
            &mut encoder,
            &view,
            (self.surface_config.width, self.surface_config.height),
            &self.surfaces,
        );

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn save_screenshot(&self) -> anyhow::Result<PathBuf> {
        let grid: Grid = self.surfaces.read_current(&self.ctx)?;
        let dir = &self.settings.screenshot_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!(
            "smoothlife_{}_gen{}.png",
            timestamp,
            self.stepper.generation()
        ));
        grid.to_gray_image()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

fn load_settings(path: &Path) -> Settings {
    match Settings::load_or_create(path) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!(
                "Failed to load settings from {}: {}; using defaults",
                path.display(),
                err
            );
            Settings::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let settings = load_settings(&Settings::default_path());

    let event_loop = EventLoop::new().context("creating event loop")?;
    let window = Arc::new(
        event_loop
            .create_window(
                winit::window::WindowAttributes::default()
                    .with_title("SmoothLife")
                    .with_inner_size(winit::dpi::PhysicalSize::new(
                        settings.window_width,
                        settings.window_height,
                    )),
            )
            .context("creating window")?,
    );

    let mut state = pollster::block_on(SmoothLifeState::new(window.clone(), settings))?;
    let mut last_frame = Instant::now();

    event_loop.run(move |event, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => control_flow.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => control_flow.exit(),
                KeyCode::Space => state.toggle_pause(),
                KeyCode::KeyN => state.request_single_step(),
                KeyCode::KeyR => {
                    if let Err(err) = state.reseed() {
                        log::error!("Reseed failed: {:#}", err);
                        control_flow.exit();
                    }
                }
                KeyCode::KeyP => match state.save_screenshot() {
                    Ok(path) => log::info!("Saved {}", path.display()),
                    Err(err) => log::error!("Screenshot failed: {:#}", err),
                },
                _ => {}
            },
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    if let Err(err) = state.resize(physical_size.width, physical_size.height) {
                        log::error!("Resize failed: {:#}", err);
                        control_flow.exit();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - last_frame).as_secs_f32();
                last_frame = now;

                match state.frame(dt) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.surface.configure(&state.ctx.device, &state.surface_config);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory, exiting");
                        control_flow.exit();
                    }
                    Err(e) => log::warn!("{:?}", e),
                }
                state.update_window_title(&window);
            }
            _ => {}
        },
        Event::AboutToWait => {
            window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_trace_accumulates_phases() {
        let mut trace = StartupTrace::new();
        let (first, total_after_first) = trace.phase_done("first");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let (second, total) = trace.phase_done("second");
        assert!(first >= 0.0);
        assert!(second >= 2.0);
        assert!(total >= total_after_first + second - 1e-9);
    }
}
