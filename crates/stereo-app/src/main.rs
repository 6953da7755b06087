// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use stereo_compose::{
    Buttons, FrameOutcome, SessionHandle, SessionParts, SessionRegistry, ViewerKind,
};
use stereo_core::init_tracing;
use stereo_platform::window_size;
use stereo_render_gl::GlDevice;
use tracing::{error, info};

use stereo_platform::winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

mod audio;
mod config;
mod input;
mod scene;
mod tracker;

use audio::LoggingAudio;
use config::{load_cfg, AppCfg, ViewerChoice};
use input::{KeyboardControllerSource, KeyboardInput};
use scene::DemoScene;
use tracker::DesktopTracker;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file
    #[arg(long, default_value = "stereo.toml")]
    config: PathBuf,
    /// Viewer to emulate: cardboard | daydream | unknown
    #[arg(long, value_enum)]
    viewer: Option<ViewerChoice>,
    /// Report multiview support to the compositor
    #[arg(long)]
    multiview: bool,
}

type Registry = SessionRegistry<DesktopTracker, GlDevice, DemoScene>;

struct App {
    // Sessions own the GL context, so they go before the window.
    registry: Registry,
    session: Option<SessionHandle>,
    window: Option<Window>,
    cfg: AppCfg,
    input: KeyboardInput,

    exiting: bool,
    frames: u32,
    last_fps_instant: Instant,
}

impl App {
    fn new(cfg: AppCfg) -> Self {
        Self {
            registry: Registry::new(),
            session: None,
            window: None,
            cfg,
            input: KeyboardInput::default(),
            exiting: false,
            frames: 0,
            last_fps_instant: Instant::now(),
        }
    }

    fn start_session(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.cfg.window.title.clone())
            .with_inner_size(LogicalSize::new(self.cfg.window.width, self.cfg.window.height));
        let window = event_loop.create_window(attrs)?;
        let size = window_size(window.inner_size());

        let device = GlDevice::new(&window, &window, size)?;
        device.set_vsync(self.cfg.window.vsync);
        let scene = DemoScene::new(device.gl());
        let parts = SessionParts {
            platform: DesktopTracker::new(&self.cfg.viewer, size),
            device,
            scene,
            audio: Arc::new(Mutex::new(LoggingAudio::new(self.cfg.audio_assets.clone()))),
            controllers: Box::new(KeyboardControllerSource::new(self.input.clone())),
            config: self.cfg.compositor,
        };

        let handle = self.registry.create_session(parts);
        if !self.registry.initialize_graphics(handle) {
            self.registry.destroy_session(handle);
            bail!("graphics initialization failed");
        }
        info!(
            "session {} up: {}x{}, vsync={}",
            handle.as_raw(),
            size.width,
            size.height,
            self.cfg.window.vsync
        );

        self.session = Some(handle);
        self.window = Some(window);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.session
            .and_then(|h| self.registry.get(h))
            .is_some_and(|s| s.lifecycle().is_paused())
    }

    fn toggle_pause(&mut self) {
        let Some(handle) = self.session else {
            return;
        };
        if self.is_paused() {
            self.registry.resume(handle);
            self.request_redraw();
        } else {
            self.registry.pause(handle);
        }
    }

    /// Queues a Cardboard/Daydream swap; the tracker applies it on resume.
    fn swap_viewer(&self) {
        let Some(session) = self.session.and_then(|h| self.registry.get(h)) else {
            return;
        };
        let tracker = session.platform();
        let next = match tracker.viewer() {
            ViewerKind::Daydream => ViewerKind::Cardboard,
            _ => ViewerKind::Daydream,
        };
        tracker.request_viewer(next);
        info!("viewer {next} inserted; takes effect on resume");
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        if let Some(handle) = self.session.take() {
            self.registry.destroy_session(handle);
        }
        self.window = None;
        event_loop.exit();
    }

    fn request_redraw(&self) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        match self.session {
            None => {
                if let Err(e) = self.start_session(event_loop) {
                    error!("startup failed: {e:#}");
                    self.shutdown(event_loop);
                    return;
                }
            }
            Some(handle) => self.registry.resume(handle),
        }

        event_loop.set_control_flow(if self.cfg.window.vsync {
            ControlFlow::Wait
        } else {
            ControlFlow::Poll
        });
        self.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(handle) = self.session {
            self.registry.pause(handle);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                let size = window_size(new_size);
                info!("Resized → {}x{}", size.width, size.height);
                if let Some(session) = self.session.and_then(|h| self.registry.get(h)) {
                    session.platform().set_window_size(size);
                    session.compositor().device().resize_surface(size);
                }
                self.request_redraw();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match logical_key.as_ref() {
                Key::Named(NamedKey::Space) => self.input.press(Buttons::APP),
                Key::Named(NamedKey::Escape) => self.shutdown(event_loop),
                Key::Character("p") => self.toggle_pause(),
                Key::Character("v") => self.swap_viewer(),
                _ => {}
            },

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(handle) = self.session {
                    self.registry.set_fly_state(handle, true);
                }
            }

            WindowEvent::RedrawRequested => {
                if self.exiting || self.is_paused() {
                    return;
                }
                if let Some(handle) = self.session {
                    if self.registry.render_frame(handle) == FrameOutcome::Presented {
                        self.frames = self.frames.saturating_add(1);
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }
        if self.is_paused() {
            self.frames = 0;
            return;
        }
        self.request_redraw();

        let now = Instant::now();
        if now.duration_since(self.last_fps_instant).as_secs_f32() >= 1.0 {
            info!("fps ~ {}", self.frames);
            self.frames = 0;
            self.last_fps_instant = now;
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg = load_cfg(&args.config);
    cfg.apply_overrides(args.viewer, args.multiview);
    info!(
        "viewer = {:?}, multiview = {}",
        cfg.viewer.kind, cfg.viewer.multiview
    );

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App::new(cfg);
    event_loop.run_app(&mut app)?;
    Ok(())
}
