use std::sync::Arc;
use std::time::Instant;

use chip8_core::System;
use chip8_gpu::{BlitPipeline, FramebufferTexture};
use winit::window::Window;

use crate::input::{InputAction, InputState, Key};

// ---------------------------------------------------------------------------
// Simple FPS counter — logs to console once per second
// ---------------------------------------------------------------------------

struct FpsCounter {
    frames: u32,
    last_report: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            last_report: Instant::now(),
        }
    }

    /// Increment the frame count.  Returns the FPS value if a full second has
    /// elapsed since the last report (so the caller can log it).
    fn tick(&mut self) -> Option<f32> {
        self.frames += 1;
        let elapsed = self.last_report.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let fps = self.frames as f32 / elapsed;
            self.frames = 0;
            self.last_report = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,

    blit: BlitPipeline,
    frame_tex: FramebufferTexture,
    /// Texture + sampler binding; the framebuffer texture never changes size,
    /// so one bind group serves every frame.
    frame_bg: wgpu::BindGroup,

    system: System,
    /// ROM image kept around so Reset can reload it.
    rom: Vec<u8>,
    cycles_per_frame: u32,
    paused: bool,

    input: InputState,
    fps: FpsCounter,
}

impl App {
    /// Initialise wgpu for a given window.  The window is wrapped in `Arc` so
    /// that the surface can safely hold a `'static` reference to it.
    pub fn new(window: Arc<Window>, system: System, rom: Vec<u8>, cycles_per_frame: u32) -> Self {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        // ---- Instance -------------------------------------------------------
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // ---- Surface --------------------------------------------------------
        let surface = instance
            .create_surface(Arc::clone(&window))
            .expect("failed to create wgpu surface");

        // ---- Adapter --------------------------------------------------------
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("no suitable GPU adapter found");

        log::info!("GPU adapter: {}", adapter.get_info().name);

        // ---- Device & Queue -------------------------------------------------
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("chip8-app device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("failed to create GPU device");

        // ---- Surface configuration ------------------------------------------
        let surface_caps = surface.get_capabilities(&adapter);

        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);
        log::info!(
            "Surface configured: {}×{} {:?} Fifo",
            surface_config.width,
            surface_config.height,
            format
        );

        // ---- Display resources ----------------------------------------------
        let blit = BlitPipeline::new(&device, format);
        let frame_tex = FramebufferTexture::new(&device);
        let frame_bg = blit.bind(&device, frame_tex.view());

        Self {
            surface,
            device,
            queue,
            surface_config,
            blit,
            frame_tex,
            frame_bg,
            system,
            rom,
            cycles_per_frame,
            paused: false,
            input: InputState::new(),
            fps: FpsCounter::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Resize
    // -------------------------------------------------------------------------

    /// Reconfigure the surface.  The framebuffer texture stays 64×32; the
    /// fullscreen quad stretches it to whatever the window size is.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width == 0 || new_height == 0 {
            return;
        }
        self.surface_config.width = new_width;
        self.surface_config.height = new_height;
        self.surface.configure(&self.device, &self.surface_config);

        log::debug!("Surface resized to {}×{}", new_width, new_height);
    }

    // -------------------------------------------------------------------------
    // Input — called by main.rs window_event handler
    // -------------------------------------------------------------------------

    /// Translate a key state change and return the resulting action, if any.
    pub fn on_key(&self, key: Key, pressed: bool) -> Option<InputAction> {
        self.input.on_key(key, pressed)
    }

    /// Apply an action to the app state.
    ///
    /// Returns `true` if the app should exit (i.e. action was `Quit`).
    pub fn handle_action(&mut self, action: InputAction) -> bool {
        match action {
            InputAction::Keypad { key, pressed } => {
                if pressed {
                    self.system.press_key(key);
                } else {
                    self.system.release_key(key);
                }
            }

            InputAction::TogglePause => {
                self.paused = !self.paused;
                log::info!("{}", if self.paused { "Paused" } else { "Resumed" });
            }

            InputAction::Reset => {
                self.system.reset();
                if let Err(e) = self.system.load(std::io::Cursor::new(&self.rom)) {
                    log::error!("reset failed to reload ROM: {e}");
                } else {
                    log::info!("Reset");
                    self.paused = false;
                }
            }

            InputAction::Quit => return true,
        }
        false
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Run one full frame: step the interpreter, upload the framebuffer, draw.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if let Some(fps) = self.fps.tick() {
            log::debug!(
                "FPS: {:.1}  pc: {:#05X}  paused: {}",
                fps,
                self.system.registers.pc,
                self.paused,
            );
        }

        // --- Interpreter ------------------------------------------------------
        if !self.paused {
            for _ in 0..self.cycles_per_frame {
                if let Err(e) = self.system.tick() {
                    log::error!("interpreter halted: {e}");
                    self.paused = true;
                    break;
                }
            }
        }

        // --- Upload the 64×32 byte plane --------------------------------------
        let pixels = self.system.framebuffer();
        self.frame_tex.upload(&self.queue, &pixels);

        // --- Fullscreen blit ---------------------------------------------------
        let output = self.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        self.blit.record(&mut encoder, &surface_view, &self.frame_bg);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
