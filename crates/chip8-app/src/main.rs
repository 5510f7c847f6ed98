use std::path::PathBuf;
use std::sync::Arc;

use chip8_core::System;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod app;
mod input;

use app::App;
use input::Key;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(about = "CHIP-8 interpreter with a wgpu grayscale display.")]
struct Args {
    /// ROM image to run. A builtin demo program runs when omitted.
    rom: Option<PathBuf>,

    /// Interpreter instructions executed per rendered frame.
    #[arg(long, default_value_t = 10)]
    cycles_per_frame: u32,
}

/// Draws two font glyphs and parks in a jump-to-self loop. Stands in for a
/// ROM when none is given on the command line.
#[rustfmt::skip]
const DEMO_ROM: &[u8] = &[
    0x60, 0x0A, // V0 = 10
    0x61, 0x0A, // V1 = 10
    0xA0, 0x00, // I = glyph "0"
    0xD0, 0x15, // draw at (10, 10)
    0x60, 0x0E, // V0 = 14
    0xA0, 0x05, // I = glyph "1"
    0xD0, 0x15, // draw at (14, 10)
    0x12, 0x0E, // loop forever
];

// ---------------------------------------------------------------------------
// Key mapping — winit physical keys → input::Key
// ---------------------------------------------------------------------------

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyZ => Key::Z,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyP => Key::P,
        KeyCode::F5 => Key::F5,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Handler — winit ApplicationHandler
// ---------------------------------------------------------------------------

/// State handed from `main` to `resumed`, where the window finally exists.
struct Boot {
    system: System,
    rom: Vec<u8>,
    cycles_per_frame: u32,
}

struct Handler {
    window: Option<Arc<Window>>,
    app: Option<App>,
    boot: Option<Boot>,
}

impl ApplicationHandler for Handler {
    /// Called once on desktop when the event loop starts.
    /// Creates the window then initialises the wgpu surface.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(boot) = self.boot.take() else {
            return;
        };

        let window_attrs = Window::default_attributes()
            .with_title("CHIP-8")
            .with_inner_size(winit::dpi::LogicalSize::new(800u32, 400u32));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("failed to create window"),
        );

        log::info!("Window created (800×400)");

        let gpu_app = App::new(
            Arc::clone(&window),
            boot.system,
            boot.rom,
            boot.cycles_per_frame,
        );
        self.window = Some(window);
        self.app = Some(gpu_app);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            // ----------------------------------------------------------------
            // Exit
            // ----------------------------------------------------------------
            WindowEvent::CloseRequested => {
                log::info!("Close requested — exiting");
                event_loop.exit();
            }

            // ----------------------------------------------------------------
            // Keyboard — keypad state changes and control keys
            // ----------------------------------------------------------------
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let Some(app) = &mut self.app else { return };
                let Some(key) = map_key(code) else { return };
                if let Some(action) = app.on_key(key, state == ElementState::Pressed) {
                    if app.handle_action(action) {
                        log::info!("Quit requested — exiting");
                        event_loop.exit();
                    }
                }
            }

            // ----------------------------------------------------------------
            // Resize — reconfigure the wgpu surface
            // ----------------------------------------------------------------
            WindowEvent::Resized(new_size) => {
                if let Some(app) = &mut self.app {
                    app.resize(new_size.width, new_size.height);
                }
            }

            // ----------------------------------------------------------------
            // Redraw — run interpreter cycles and present the framebuffer
            // ----------------------------------------------------------------
            WindowEvent::RedrawRequested => {
                if let Some(app) = &mut self.app {
                    match app.render() {
                        Ok(()) => {}
                        // Surface lost / outdated: reconfigure and try again next frame.
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            if let Some(window) = &self.window {
                                let size = window.inner_size();
                                app.resize(size.width, size.height);
                            }
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("GPU out of memory — exiting");
                            event_loop.exit();
                        }
                        Err(e) => log::warn!("render error: {e:?}"),
                    }
                }
            }

            _ => {}
        }
    }

    /// Drive continuous redraws (game-loop style).
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    let args = Args::parse();

    let rom = match &args.rom {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => {
                log::info!("Loaded ROM {} ({} bytes)", path.display(), bytes.len());
                bytes
            }
            Err(e) => {
                log::error!("failed to read {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => {
            log::info!("No ROM given — running the builtin demo");
            DEMO_ROM.to_vec()
        }
    };

    let mut system = System::default();
    if let Err(e) = system.load(std::io::Cursor::new(&rom)) {
        log::error!("failed to load ROM: {e}");
        std::process::exit(1);
    }

    let event_loop = EventLoop::new().expect("failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut handler = Handler {
        window: None,
        app: None,
        boot: Some(Boot {
            system,
            rom,
            cycles_per_frame: args.cycles_per_frame,
        }),
    };
    event_loop.run_app(&mut handler).expect("event loop error");
}
