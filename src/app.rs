use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

use crate::config::{
    Config, DEFAULT_CELL_SIZE, MAX_CELLS_X, MAX_CELLS_Y, MAX_TOTAL_CELLS, MIN_CELL_SIZE,
    RENDER_PARAMS_THROTTLE_MS, ZOOM_MAX, ZOOM_MIN,
};
use crate::engine::{run, run_with_cache, TileCache};
use crate::gpu::{GpuContext, OutputBuffer, RenderParams, RenderPipeline, StepPipeline};
use crate::simulation::Seed;

/// Discrete cell sizes the wheel zoom steps through, filtered to the
/// configured zoom bounds at runtime.
const ZOOM_LEVELS: &[u32] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 14, 15, 16, 18, 20, 24, 25, 28, 30, 32, 36, 40, 45, 50, 60,
    70, 75, 80, 90, 100, 120, 140, 150, 160, 180, 200, 250, 300, 350, 400, 450, 500,
];

/// Floating-point viewport anchor in world (column, generation) space.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub offset_x: f32,
    pub offset_y: f32,
    pub zoom: f32,
}

struct DragState {
    start_x: f64,
    start_y: f64,
    viewport_at_start: Viewport,
}

/// GPU-side state: context, pipelines, the render params buffer, and the
/// output of the last completed compute.
struct Gfx {
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    step: StepPipeline,
    render: RenderPipeline,
    params_buffer: wgpu::Buffer,
    output: Option<OutputBuffer>,
    bind_group: Option<wgpu::BindGroup>,
}

/// The windowed application: owns the viewport, the debounce state, and
/// the tile cache, and calls into the engine once per settled viewport.
pub struct App {
    config: Config,
    seed: Seed,
    window: Option<Arc<Window>>,
    gfx: Option<Gfx>,
    cache: Option<TileCache>,
    viewport: Viewport,
    /// Viewport the current output buffer was computed for.
    buffer_viewport: Viewport,
    cell_size: u32,
    drag: Option<DragState>,
    cursor: (f64, f64),
    needs_recompute: bool,
    last_viewport_change: Option<Instant>,
    last_params_update: Option<Instant>,
    window_width: u32,
    window_height: u32,
    fps: FpsCounter,
}

impl App {
    pub fn new(config: Config) -> Self {
        let seed = Seed::from_arg(config.initial_state.as_deref());
        let cache = if config.cache_tiles > 0 {
            Some(TileCache::new(config.cache_tiles, config.tile_size))
        } else {
            log::info!("tile cache disabled, using the direct path");
            None
        };

        let window_width = config.width;
        let window_height = config.height;
        let viewport = Self::initial_viewport(window_width, DEFAULT_CELL_SIZE);

        Self {
            config,
            seed,
            window: None,
            gfx: None,
            cache,
            viewport,
            buffer_viewport: viewport,
            cell_size: DEFAULT_CELL_SIZE,
            drag: None,
            cursor: (0.0, 0.0),
            needs_recompute: false,
            last_viewport_change: None,
            last_params_update: None,
            window_width,
            window_height,
            fps: FpsCounter::new(),
        }
    }

    /// Centred horizontally on world column 0, anchored at generation 0.
    fn initial_viewport(window_width: u32, cell_size: u32) -> Viewport {
        let visible_x = window_width as f32 / cell_size as f32;
        Viewport {
            offset_x: -visible_x / 2.0,
            offset_y: 0.0,
            zoom: 1.0,
        }
    }

    fn mark_viewport_changed(&mut self) {
        self.last_viewport_change = Some(Instant::now());
        self.needs_recompute = true;
    }

    fn maybe_recompute(&mut self) {
        if !self.needs_recompute {
            return;
        }
        let settled = match self.last_viewport_change {
            Some(at) => at.elapsed() >= Duration::from_millis(self.config.debounce_ms),
            None => true,
        };
        if settled {
            self.compute_frame();
            self.last_viewport_change = None;
        }
    }

    /// Runs the engine for the current viewport and swaps in the result.
    /// Oversize requests are skipped without touching cache or output.
    fn compute_frame(&mut self) {
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };

        if self.cell_size < MIN_CELL_SIZE {
            log::warn!(
                "cell size {} below minimum {}, skipping frame",
                self.cell_size,
                MIN_CELL_SIZE
            );
            return;
        }

        let visible_x = (self.window_width as f32 / self.cell_size as f32).ceil() as u32;
        let visible_y = (self.window_height as f32 / self.cell_size as f32).ceil() as u32;
        if visible_x > MAX_CELLS_X || visible_y > MAX_CELLS_Y {
            log::warn!(
                "viewport of {}x{} cells exceeds limits, skipping frame",
                visible_x,
                visible_y
            );
            return;
        }
        let total_cells = u64::from(visible_x) * 3 * u64::from(visible_y);
        if total_cells > MAX_TOTAL_CELLS {
            log::warn!(
                "{} cells per frame exceeds the {} ceiling, skipping frame",
                total_cells,
                MAX_TOTAL_CELLS
            );
            return;
        }

        let clamped_y = self.viewport.offset_y.max(0.0);
        let start_generation = clamped_y as u32;
        let iterations = visible_y;
        let horizontal_offset = self.viewport.offset_x as i32;

        let output = match &mut self.cache {
            Some(cache) => run_with_cache(
                &gfx.gpu.device,
                &gfx.gpu.queue,
                &gfx.step,
                self.config.rule,
                start_generation,
                iterations,
                visible_x,
                horizontal_offset,
                &self.seed,
                cache,
            ),
            None => run(
                &gfx.gpu.device,
                &gfx.gpu.queue,
                &gfx.step,
                self.config.rule,
                start_generation,
                iterations,
                visible_x,
                horizontal_offset,
                &self.seed,
            ),
        };

        self.buffer_viewport = Viewport {
            offset_y: clamped_y,
            ..self.viewport
        };

        let params = RenderParams {
            visible_width: output.visible_width,
            visible_height: output.height,
            simulated_width: output.simulated_width,
            padding_left: output.padding_left,
            cell_size: self.cell_size,
            window_width: self.window_width,
            window_height: self.window_height,
            _padding: 0,
            viewport_offset_x: self.buffer_viewport.offset_x as i32,
            viewport_offset_y: self.buffer_viewport.offset_y as i32,
            buffer_offset_x: self.buffer_viewport.offset_x as i32,
            buffer_offset_y: self.buffer_viewport.offset_y as i32,
        };
        gfx.gpu
            .queue
            .write_buffer(&gfx.params_buffer, 0, bytemuck::bytes_of(&params));

        let bind_group = gfx
            .render
            .bind(&gfx.gpu.device, &output.buffer, &gfx.params_buffer);
        gfx.output = Some(output);
        gfx.bind_group = Some(bind_group);
        self.needs_recompute = false;
    }

    /// Refreshes the reprojection offsets so panning shifts the stale
    /// buffer while a recompute is pending. Throttled to spare the queue.
    fn update_render_params(&mut self) {
        let Some(gfx) = self.gfx.as_ref() else {
            return;
        };
        let Some(output) = gfx.output.as_ref() else {
            return;
        };
        if let Some(at) = self.last_params_update {
            if at.elapsed() < Duration::from_millis(RENDER_PARAMS_THROTTLE_MS) {
                return;
            }
        }

        let params = RenderParams {
            visible_width: output.visible_width,
            visible_height: output.height,
            simulated_width: output.simulated_width,
            padding_left: output.padding_left,
            cell_size: self.cell_size,
            window_width: self.window_width,
            window_height: self.window_height,
            _padding: 0,
            viewport_offset_x: self.viewport.offset_x as i32,
            viewport_offset_y: self.viewport.offset_y.max(0.0) as i32,
            buffer_offset_x: self.buffer_viewport.offset_x as i32,
            buffer_offset_y: self.buffer_viewport.offset_y as i32,
        };
        gfx.gpu
            .queue
            .write_buffer(&gfx.params_buffer, 0, bytemuck::bytes_of(&params));
        self.last_params_update = Some(Instant::now());
    }

    fn draw(&mut self) {
        self.update_render_params();

        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };

        let frame = match gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gfx.surface.configure(&gfx.gpu.device, &gfx.surface_config);
                return;
            }
            Err(e) => {
                log::error!("surface error: {:?}", e);
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gfx
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        if let Some(bind_group) = &gfx.bind_group {
            gfx.render.draw(&mut encoder, &view, bind_group);
        }

        gfx.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        if let Some(fps) = self.fps.tick() {
            if let Some(window) = &self.window {
                window.set_title(&format!(
                    "CAE - Rule {} | {:.0} FPS | {}px/cell",
                    self.config.rule, fps, self.cell_size
                ));
            }
        }
    }

    // --- Viewport manipulation ---

    fn screen_to_world(&self, sx: f64, sy: f64, cell_size: u32) -> (f32, f32) {
        let visible_x = self.window_width as f32 / cell_size as f32;
        let visible_y = self.window_height as f32 / cell_size as f32;
        let frac_x = sx as f32 / self.window_width as f32;
        let frac_y = sy as f32 / self.window_height as f32;
        (
            self.viewport.offset_x + frac_x * visible_x,
            self.viewport.offset_y + frac_y * visible_y,
        )
    }

    fn apply_pan(&mut self, current_x: f64, current_y: f64) {
        let Some(drag) = &self.drag else {
            return;
        };
        let delta_x = (current_x - drag.start_x) as f32;
        let delta_y = (current_y - drag.start_y) as f32;
        let visible_x = self.window_width as f32 / self.cell_size as f32;
        let visible_y = self.window_height as f32 / self.cell_size as f32;

        self.viewport.offset_x =
            drag.viewport_at_start.offset_x - delta_x / self.window_width as f32 * visible_x;
        self.viewport.offset_y =
            drag.viewport_at_start.offset_y - delta_y / self.window_height as f32 * visible_y;
        // Generation 0 is the floor of the world.
        self.viewport.offset_y = self.viewport.offset_y.max(0.0);

        self.mark_viewport_changed();
    }

    fn zoom_levels(&self) -> Vec<u32> {
        let min = ((DEFAULT_CELL_SIZE as f32 * ZOOM_MIN).max(1.0)) as u32;
        let max = (DEFAULT_CELL_SIZE as f32 * ZOOM_MAX) as u32;
        ZOOM_LEVELS
            .iter()
            .copied()
            .filter(|&s| s >= min && s <= max)
            .collect()
    }

    fn handle_zoom(&mut self, delta: f32) {
        let levels = self.zoom_levels();
        if levels.is_empty() {
            return;
        }

        let current = self.cell_size;
        let current_idx = levels
            .iter()
            .position(|&s| s >= current)
            .unwrap_or(levels.len() - 1);
        let new_idx = if delta > 0.0 {
            (current_idx + 1).min(levels.len() - 1)
        } else {
            current_idx.saturating_sub(1)
        };

        let new_cell_size = levels[new_idx];
        if new_cell_size != current {
            self.apply_zoom_at_point(new_cell_size, self.cursor.0, self.cursor.1);
        }
    }

    /// Changes the cell size while keeping the world point under the cursor
    /// fixed on screen.
    fn apply_zoom_at_point(&mut self, new_cell_size: u32, anchor_x: f64, anchor_y: f64) {
        let (world_x, world_y) = self.screen_to_world(anchor_x, anchor_y, self.cell_size);
        let frac_x = anchor_x as f32 / self.window_width as f32;
        let frac_y = anchor_y as f32 / self.window_height as f32;

        self.cell_size = new_cell_size;
        self.viewport.zoom = new_cell_size as f32 / DEFAULT_CELL_SIZE as f32;

        let new_visible_x = self.window_width as f32 / new_cell_size as f32;
        let new_visible_y = self.window_height as f32 / new_cell_size as f32;
        self.viewport.offset_x = world_x - frac_x * new_visible_x;
        self.viewport.offset_y = (world_y - frac_y * new_visible_y).max(0.0);

        self.mark_viewport_changed();
    }

    fn reset_viewport(&mut self) {
        log::info!("resetting viewport");
        self.cell_size = DEFAULT_CELL_SIZE;
        self.viewport = Self::initial_viewport(self.window_width, self.cell_size);
        self.mark_viewport_changed();
    }

    fn toggle_fullscreen(&mut self) {
        if let Some(window) = &self.window {
            if window.fullscreen().is_some() {
                window.set_fullscreen(None);
            } else {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            }
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key_code: KeyCode) {
        match key_code {
            KeyCode::Escape => {
                log::info!("escape pressed, exiting");
                event_loop.exit();
            }
            KeyCode::Digit0 | KeyCode::Numpad0 => self.reset_viewport(),
            KeyCode::F11 => self.toggle_fullscreen(),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut attrs = Window::default_attributes()
            .with_title(format!("CAE - Rule {}", self.config.rule))
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_min_inner_size(PhysicalSize::new(500, 500));
        if self.config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        let gpu = GpuContext::new().expect("failed to initialise GPU");
        let (surface, surface_config) = gpu
            .create_surface(window.clone())
            .expect("failed to create surface");

        let step = StepPipeline::new(&gpu.device);
        let render = RenderPipeline::new(&gpu.device, surface_config.format);
        let params_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("render-params"),
            size: std::mem::size_of::<RenderParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let size = window.inner_size();
        self.window_width = size.width;
        self.window_height = size.height;
        self.viewport = Self::initial_viewport(self.window_width, self.cell_size);
        self.buffer_viewport = self.viewport;

        self.window = Some(window.clone());
        self.gfx = Some(Gfx {
            gpu,
            surface,
            surface_config,
            step,
            render,
            params_buffer,
            output: None,
            bind_group: None,
        });

        self.compute_frame();
        window.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width == 0 || new_size.height == 0 {
                    return;
                }
                self.window_width = new_size.width;
                self.window_height = new_size.height;
                if let Some(gfx) = self.gfx.as_mut() {
                    gfx.surface_config.width = new_size.width;
                    gfx.surface_config.height = new_size.height;
                    gfx.surface.configure(&gfx.gpu.device, &gfx.surface_config);
                }
                self.mark_viewport_changed();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key_code) = event.physical_key {
                        self.handle_key(event_loop, key_code);
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    match state {
                        ElementState::Pressed => {
                            self.drag = Some(DragState {
                                start_x: self.cursor.0,
                                start_y: self.cursor.1,
                                viewport_at_start: self.viewport,
                            });
                        }
                        ElementState::Released => {
                            self.drag = None;
                        }
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                if self.drag.is_some() {
                    self.apply_pan(position.x, position.y);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 60.0,
                };
                if amount != 0.0 {
                    self.handle_zoom(amount);
                }
            }
            WindowEvent::RedrawRequested => {
                self.maybe_recompute();
                self.draw();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Simple FPS counter.
struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    /// Ticks the counter; returns `Some(fps)` once per second.
    fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();
        if elapsed.as_secs_f64() >= 1.0 {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.frame_count = 0;
            self.last_update = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}
