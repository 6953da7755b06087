// SPDX-License-Identifier: CEPL-1.0
//! Session object and the handle table exposed to the platform boundary.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::thread::{self, JoinHandle};

use stereo_render::{GraphicsDevice, Scene, StreamingTexture, VideoFrame};
use tracing::{debug, error, info, warn};

use crate::compositor::{FrameCompositor, FrameOutcome};
use crate::config::CompositorConfig;
use crate::controller::ControllerSource;
use crate::error::ComposeError;
use crate::lifecycle::Lifecycle;
use crate::platform::{with_audio, SharedAudio, TrackingPlatform};

/// Everything a session is built from.
pub struct SessionParts<P, D, S> {
    pub platform: P,
    pub device: D,
    pub scene: S,
    pub audio: SharedAudio,
    pub controllers: Box<dyn ControllerSource>,
    pub config: CompositorConfig,
}

pub struct Session<P, D: GraphicsDevice, S> {
    platform: P,
    scene: S,
    lifecycle: Lifecycle,
    compositor: FrameCompositor<D>,
    audio_init: Option<JoinHandle<()>>,
}

impl<P, D, S> Session<P, D, S>
where
    P: TrackingPlatform,
    D: GraphicsDevice,
    S: Scene,
{
    pub fn create(parts: SessionParts<P, D, S>) -> Result<Self, ComposeError> {
        let SessionParts {
            platform,
            device,
            scene,
            audio,
            controllers,
            config,
        } = parts;

        let lifecycle = Lifecycle::new(platform.viewer_kind(), audio.clone(), controllers)?;
        let audio_init = spawn_audio_init(audio);
        let compositor = FrameCompositor::new(device, config, platform.now());

        Ok(Self {
            platform,
            scene,
            lifecycle,
            compositor,
            audio_init,
        })
    }

    pub fn initialize_graphics(&mut self) -> Result<(), ComposeError> {
        self.compositor
            .initialize_graphics(&self.platform, self.lifecycle.viewer_kind())?;
        self.scene.init().map_err(ComposeError::SceneInit)
    }

    pub fn render_frame(&mut self) -> FrameOutcome {
        if self.lifecycle.is_paused() {
            debug!("render_frame while paused");
            return FrameOutcome::Skipped;
        }
        self.compositor
            .draw_frame(&self.platform, &mut self.scene, &mut self.lifecycle)
    }

    pub fn set_fly_state(&mut self, flying_forward: bool) {
        self.scene.set_flying_forward(flying_forward);
    }

    pub fn pause(&mut self) {
        self.lifecycle.pause(&mut self.platform);
    }

    pub fn resume(&mut self) {
        self.lifecycle.resume(&mut self.platform);
    }

    pub fn streaming_texture(&self) -> StreamingTexture {
        self.scene.streaming_texture()
    }

    /// Hands raw decoded pixels to the scene, tagged with the streaming
    /// texture they belong to.
    pub fn enqueue_frame(&mut self, frame_id: i32, width: u32, height: u32, data: &[u8]) {
        let texture_id = self.scene.streaming_texture().id;
        self.scene.enqueue_frame(VideoFrame {
            frame_id,
            texture_id,
            width,
            height,
            data,
        });
    }

    pub fn before_texture_update(&mut self) {
        self.scene.before_texture_update();
    }

    pub fn after_texture_update(&mut self) {
        self.scene.after_texture_update();
    }

    pub fn host_address(&self) -> Option<String> {
        self.scene.host_address()
    }

    pub fn on_text_message(&mut self, id: i32, text: &str) {
        self.scene.on_text_message(id, text);
    }

    pub fn on_connected(&mut self) {
        self.scene.on_connected();
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn compositor(&self) -> &FrameCompositor<D> {
        &self.compositor
    }
}

impl<P, D: GraphicsDevice, S> Session<P, D, S> {
    /// Blocks until the audio initialization thread has finished.
    pub fn wait_for_audio(&mut self) {
        if let Some(handle) = self.audio_init.take() {
            if handle.join().is_err() {
                warn!("audio initialization thread panicked");
            }
        }
    }
}

impl<P, D: GraphicsDevice, S> Drop for Session<P, D, S> {
    fn drop(&mut self) {
        self.wait_for_audio();
    }
}

/// Audio assets load off the render thread; only audio state is touched.
fn spawn_audio_init(audio: SharedAudio) -> Option<JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name("audio-init".into())
        .spawn(move || {
            if let Err(err) = with_audio(&audio, |engine| engine.initialize()) {
                error!("audio initialization failed: {err:#}");
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!("could not spawn audio initialization thread: {err}");
            None
        }
    }
}

/// Opaque, non-zero session handle for callers across a language boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionHandle(NonZeroU64);

impl SessionHandle {
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(SessionHandle)
    }

    pub fn as_raw(self) -> u64 {
        self.0.get()
    }
}

pub struct SessionRegistry<P, D: GraphicsDevice, S> {
    next_id: NonZeroU64,
    sessions: HashMap<SessionHandle, Session<P, D, S>>,
}

impl<P, D: GraphicsDevice, S> Default for SessionRegistry<P, D, S> {
    fn default() -> Self {
        Self {
            next_id: NonZeroU64::MIN,
            sessions: HashMap::new(),
        }
    }
}

impl<P, D, S> SessionRegistry<P, D, S>
where
    P: TrackingPlatform,
    D: GraphicsDevice,
    S: Scene,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn try_create_session(
        &mut self,
        parts: SessionParts<P, D, S>,
    ) -> Result<SessionHandle, ComposeError> {
        let session = Session::create(parts)?;
        let handle = SessionHandle(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.sessions.insert(handle, session);
        info!("session {} created", handle.as_raw());
        Ok(handle)
    }

    /// Aborts the process if the session cannot be created.
    pub fn create_session(&mut self, parts: SessionParts<P, D, S>) -> SessionHandle {
        match self.try_create_session(parts) {
            Ok(handle) => handle,
            Err(err) => {
                error!("*** session creation failed: {err}");
                std::process::abort();
            }
        }
    }

    pub fn destroy_session(&mut self, handle: SessionHandle) -> bool {
        let removed = self.sessions.remove(&handle).is_some();
        if removed {
            info!("session {} destroyed", handle.as_raw());
        } else {
            warn!("destroy_session: unknown handle {}", handle.as_raw());
        }
        removed
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&Session<P, D, S>> {
        self.sessions.get(&handle)
    }

    fn with_session<R>(
        &mut self,
        handle: SessionHandle,
        op: &str,
        f: impl FnOnce(&mut Session<P, D, S>) -> R,
    ) -> Option<R> {
        match self.sessions.get_mut(&handle) {
            Some(session) => Some(f(session)),
            None => {
                warn!("{op}: unknown handle {}", handle.as_raw());
                None
            }
        }
    }

    pub fn initialize_graphics(&mut self, handle: SessionHandle) -> bool {
        self.with_session(handle, "initialize_graphics", |s| {
            s.initialize_graphics()
                .map_err(|err| error!("initialize_graphics failed: {err}"))
                .is_ok()
        })
        .unwrap_or(false)
    }

    pub fn render_frame(&mut self, handle: SessionHandle) -> FrameOutcome {
        self.with_session(handle, "render_frame", Session::render_frame)
            .unwrap_or(FrameOutcome::Skipped)
    }

    pub fn set_fly_state(&mut self, handle: SessionHandle, flying_forward: bool) {
        self.with_session(handle, "set_fly_state", |s| s.set_fly_state(flying_forward));
    }

    pub fn pause(&mut self, handle: SessionHandle) {
        self.with_session(handle, "pause", Session::pause);
    }

    pub fn resume(&mut self, handle: SessionHandle) {
        self.with_session(handle, "resume", Session::resume);
    }

    pub fn streaming_texture(&mut self, handle: SessionHandle) -> StreamingTexture {
        self.with_session(handle, "streaming_texture", |s| s.streaming_texture())
            .unwrap_or_default()
    }

    pub fn enqueue_frame(
        &mut self,
        handle: SessionHandle,
        frame_id: i32,
        width: u32,
        height: u32,
        data: &[u8],
    ) {
        self.with_session(handle, "enqueue_frame", |s| {
            s.enqueue_frame(frame_id, width, height, data)
        });
    }

    pub fn before_texture_update(&mut self, handle: SessionHandle) {
        self.with_session(handle, "before_texture_update", Session::before_texture_update);
    }

    pub fn after_texture_update(&mut self, handle: SessionHandle) {
        self.with_session(handle, "after_texture_update", Session::after_texture_update);
    }

    pub fn host_address(&mut self, handle: SessionHandle) -> Option<String> {
        self.with_session(handle, "host_address", |s| s.host_address())
            .flatten()
    }

    pub fn on_text_message(&mut self, handle: SessionHandle, id: i32, text: &str) {
        self.with_session(handle, "on_text_message", |s| s.on_text_message(id, text));
    }

    pub fn on_connected(&mut self, handle: SessionHandle) {
        self.with_session(handle, "on_connected", Session::on_connected);
    }
}
