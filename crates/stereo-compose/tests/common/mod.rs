// SPDX-License-Identifier: CEPL-1.0
//! Recording test doubles for every collaborator of the compositor.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use stereo_compose::{
    AudioEngine, CompositorConfig, Controller, ControllerSource, ControllerState, Session,
    SessionParts, TimePoint, TrackingPlatform, ViewerKind,
};
use stereo_math::{FieldOfView, Size2D, Transform4x4, UvRect};
use stereo_render::{
    BufferSpec, BufferViewport, BufferViewportList, Eye, Frame, GraphicsDevice, RenderArgs,
    Scene, StreamingTexture, Swapchain, TargetHandle, UpdateArgs, VideoFrame,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateSwapchain(Vec<BufferSpec>),
    Resize(usize, Size2D),
    Acquire,
    HeadPose(TimePoint),
    RecommendedViewports,
    Update(UpdateArgs),
    Bind(usize),
    Render(RenderArgs),
    Unbind,
    Submit(BufferViewportList, Transform4x4),
    FlyState(bool),
    PauseTracking,
    ResumeTracking,
    RefreshViewer,
    AudioInit,
    AudioPause,
    AudioResume,
    ControllerInit,
    ControllerUpdate,
    ControllerPause,
    ControllerResume,
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn updates(&self) -> Vec<UpdateArgs> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    pub fn renders(&self) -> Vec<RenderArgs> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Render(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    pub fn submits(&self) -> Vec<(BufferViewportList, Transform4x4)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Submit(list, head) => Some((list, head)),
                _ => None,
            })
            .collect()
    }
}

pub const LEFT_FOV: FieldOfView = FieldOfView {
    left: 50.0,
    right: 40.0,
    bottom: 45.0,
    top: 45.0,
};
pub const RIGHT_FOV: FieldOfView = FieldOfView {
    left: 40.0,
    right: 50.0,
    bottom: 45.0,
    top: 45.0,
};

pub fn head_pose() -> Transform4x4 {
    Transform4x4::from_rows([
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

pub fn eye_from_head(eye: Eye) -> Transform4x4 {
    match eye {
        Eye::Left => Transform4x4::translation(0.032, 0.0, 0.0),
        Eye::Right => Transform4x4::translation(-0.032, 0.0, 0.0),
    }
}

pub struct PlatformState {
    pub now_nanos: u64,
    pub max_size: Size2D,
    pub multiview: bool,
    pub viewer: ViewerKind,
    pub tracking: Option<Transform4x4>,
}

#[derive(Clone)]
pub struct PlatformHandle(pub Arc<Mutex<PlatformState>>);

impl PlatformHandle {
    pub fn advance(&self, nanos: u64) {
        self.0.lock().unwrap().now_nanos += nanos;
    }
    pub fn set_max_size(&self, size: Size2D) {
        self.0.lock().unwrap().max_size = size;
    }
    pub fn set_tracking(&self, pose: Option<Transform4x4>) {
        self.0.lock().unwrap().tracking = pose;
    }
    pub fn set_viewer(&self, viewer: ViewerKind) {
        self.0.lock().unwrap().viewer = viewer;
    }
    pub fn now(&self) -> TimePoint {
        TimePoint::from_nanos(self.0.lock().unwrap().now_nanos)
    }
}

pub struct MockPlatform {
    state: PlatformHandle,
    journal: Journal,
}

impl TrackingPlatform for MockPlatform {
    fn now(&self) -> TimePoint {
        self.state.now()
    }

    fn maximum_effective_render_target_size(&self) -> Size2D {
        self.state.0.lock().unwrap().max_size
    }

    fn recommended_viewports(&self) -> BufferViewportList {
        self.journal.push(Call::RecommendedViewports);
        BufferViewportList::new(
            BufferViewport {
                source_fov: LEFT_FOV,
                source_uv: UvRect::new(0.0, 0.5, 0.0, 1.0),
                source_layer: 0,
            },
            BufferViewport {
                source_fov: RIGHT_FOV,
                source_uv: UvRect::new(0.5, 1.0, 0.0, 1.0),
                source_layer: 0,
            },
        )
    }

    fn head_from_start_space(&self, at: TimePoint) -> Option<Transform4x4> {
        self.journal.push(Call::HeadPose(at));
        self.state.0.lock().unwrap().tracking
    }

    fn eye_from_head(&self, eye: Eye) -> Transform4x4 {
        eye_from_head(eye)
    }

    fn pause_tracking(&mut self) {
        self.journal.push(Call::PauseTracking);
    }

    fn resume_tracking(&mut self) {
        self.journal.push(Call::ResumeTracking);
    }

    fn refresh_viewer_profile(&mut self) {
        self.journal.push(Call::RefreshViewer);
    }

    fn supports_multiview(&self) -> bool {
        self.state.0.lock().unwrap().multiview
    }

    fn viewer_kind(&self) -> ViewerKind {
        self.state.0.lock().unwrap().viewer
    }
}

#[derive(Default)]
pub struct DeviceState {
    pub failing_acquires: u32,
    pub pending_errors: VecDeque<u32>,
    pub sizes: Vec<Size2D>,
}

#[derive(Clone, Default)]
pub struct DeviceHandle(pub Arc<Mutex<DeviceState>>);

impl DeviceHandle {
    pub fn fail_next_acquires(&self, n: u32) {
        self.0.lock().unwrap().failing_acquires = n;
    }
    pub fn push_error(&self, code: u32) {
        self.0.lock().unwrap().pending_errors.push_back(code);
    }
    pub fn pending_errors(&self) -> usize {
        self.0.lock().unwrap().pending_errors.len()
    }
    pub fn buffer_size(&self, index: usize) -> Size2D {
        self.0.lock().unwrap().sizes[index]
    }
}

pub struct MockDevice {
    pub state: DeviceHandle,
    pub journal: Journal,
}

impl GraphicsDevice for MockDevice {
    type Swapchain = MockSwapchain;

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_swapchain(&mut self, specs: &[BufferSpec]) -> Result<MockSwapchain> {
        self.journal.push(Call::CreateSwapchain(specs.to_vec()));
        self.state.0.lock().unwrap().sizes = specs.iter().map(|s| s.size).collect();
        Ok(MockSwapchain {
            state: self.state.clone(),
            journal: self.journal.clone(),
        })
    }

    fn take_error(&mut self) -> Option<u32> {
        self.state.0.lock().unwrap().pending_errors.pop_front()
    }
}

pub struct MockSwapchain {
    pub state: DeviceHandle,
    pub journal: Journal,
}

impl Swapchain for MockSwapchain {
    type Frame = MockFrame;

    fn acquire_frame(&mut self) -> Result<MockFrame> {
        self.journal.push(Call::Acquire);
        let mut state = self.state.0.lock().unwrap();
        if state.failing_acquires > 0 {
            state.failing_acquires -= 1;
            return Err(anyhow!("swapchain exhausted"));
        }
        Ok(MockFrame {
            journal: self.journal.clone(),
        })
    }

    fn resize_buffer(&mut self, index: usize, size: Size2D) -> Result<()> {
        self.journal.push(Call::Resize(index, size));
        self.state.0.lock().unwrap().sizes[index] = size;
        Ok(())
    }

    fn buffer_size(&self, index: usize) -> Option<Size2D> {
        self.state.0.lock().unwrap().sizes.get(index).copied()
    }
}

pub struct MockFrame {
    journal: Journal,
}

pub const PRIMARY_FBO: TargetHandle = TargetHandle(11);

pub fn layer_target(index: usize, layer: u32) -> TargetHandle {
    TargetHandle(1000 + 10 * index as u32 + layer)
}

impl Frame for MockFrame {
    fn bind_buffer(&mut self, index: usize) {
        self.journal.push(Call::Bind(index));
    }

    fn framebuffer_object(&self, index: usize) -> TargetHandle {
        TargetHandle(PRIMARY_FBO.0 + index as u32)
    }

    fn layer_object(&self, index: usize, layer: u32) -> TargetHandle {
        layer_target(index, layer)
    }

    fn unbind(&mut self) {
        self.journal.push(Call::Unbind);
    }

    fn submit(self, viewports: &BufferViewportList, head_from_world: &Transform4x4) {
        self.journal.push(Call::Submit(*viewports, *head_from_world));
    }
}

pub struct RecordingScene {
    pub journal: Journal,
    pub enqueued: Vec<(i32, u32, u32, u32, Vec<u8>)>,
    pub messages: Vec<(i32, String)>,
    pub connected: bool,
    pub texture_updates: u32,
}

pub const STREAMING_TEXTURE: StreamingTexture = StreamingTexture {
    id: 7,
    width: 1280,
    height: 720,
};

impl Scene for RecordingScene {
    fn update(&mut self, args: &UpdateArgs) {
        self.journal.push(Call::Update(*args));
    }

    fn render(&mut self, args: &RenderArgs) {
        self.journal.push(Call::Render(*args));
    }

    fn set_flying_forward(&mut self, flying_forward: bool) {
        self.journal.push(Call::FlyState(flying_forward));
    }

    fn streaming_texture(&self) -> StreamingTexture {
        STREAMING_TEXTURE
    }

    fn enqueue_frame(&mut self, frame: VideoFrame<'_>) {
        self.enqueued.push((
            frame.frame_id,
            frame.texture_id,
            frame.width,
            frame.height,
            frame.data.to_vec(),
        ));
    }

    fn before_texture_update(&mut self) {
        self.texture_updates += 1;
    }

    fn after_texture_update(&mut self) {
        self.texture_updates += 1;
    }

    fn host_address(&self) -> Option<String> {
        Some("ws://10.0.0.2".into())
    }

    fn on_text_message(&mut self, id: i32, text: &str) {
        self.messages.push((id, text.to_owned()));
    }

    fn on_connected(&mut self) {
        self.connected = true;
    }
}

pub struct MockAudio {
    journal: Journal,
}

impl AudioEngine for MockAudio {
    fn initialize(&mut self) -> Result<()> {
        self.journal.push(Call::AudioInit);
        Ok(())
    }

    fn pause(&mut self) {
        self.journal.push(Call::AudioPause);
    }

    fn resume(&mut self) {
        self.journal.push(Call::AudioResume);
    }
}

#[derive(Clone, Default)]
pub struct ControllerScript(pub Arc<Mutex<VecDeque<ControllerState>>>);

impl ControllerScript {
    pub fn push(&self, state: ControllerState) {
        self.0.lock().unwrap().push_back(state);
    }
}

pub struct MockController {
    journal: Journal,
    script: ControllerScript,
}

impl Controller for MockController {
    fn update(&mut self, state: &mut ControllerState) {
        self.journal.push(Call::ControllerUpdate);
        let next = self.script.0.lock().unwrap().pop_front();
        match next {
            Some(next) => *state = next,
            None => state.buttons_down = Default::default(),
        }
    }

    fn pause(&mut self) {
        self.journal.push(Call::ControllerPause);
    }

    fn resume(&mut self) {
        self.journal.push(Call::ControllerResume);
    }
}

pub struct MockControllerSource {
    journal: Journal,
    script: ControllerScript,
    pub fail: Arc<Mutex<bool>>,
}

impl ControllerSource for MockControllerSource {
    fn init(&mut self) -> Result<Box<dyn Controller>> {
        self.journal.push(Call::ControllerInit);
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("controller service unavailable"));
        }
        Ok(Box::new(MockController {
            journal: self.journal.clone(),
            script: self.script.clone(),
        }))
    }
}

pub type TestSession = Session<MockPlatform, MockDevice, RecordingScene>;

pub struct Options {
    pub max_size: Size2D,
    pub multiview: bool,
    pub viewer: ViewerKind,
    pub controller_fails: bool,
    pub config: CompositorConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_size: Size2D::new(1920, 1080),
            multiview: false,
            viewer: ViewerKind::Daydream,
            controller_fails: false,
            config: CompositorConfig::default(),
        }
    }
}

pub struct Harness {
    pub journal: Journal,
    pub platform: PlatformHandle,
    pub device: DeviceHandle,
    pub controller: ControllerScript,
    pub controller_fails: Arc<Mutex<bool>>,
}

pub fn parts(opts: Options) -> (SessionParts<MockPlatform, MockDevice, RecordingScene>, Harness) {
    let journal = Journal::default();
    let platform = PlatformHandle(Arc::new(Mutex::new(PlatformState {
        now_nanos: 1_000_000_000,
        max_size: opts.max_size,
        multiview: opts.multiview,
        viewer: opts.viewer,
        tracking: Some(head_pose()),
    })));
    let device = DeviceHandle::default();
    let controller = ControllerScript::default();
    let controller_fails = Arc::new(Mutex::new(opts.controller_fails));

    let parts = SessionParts {
        platform: MockPlatform {
            state: platform.clone(),
            journal: journal.clone(),
        },
        device: MockDevice {
            state: device.clone(),
            journal: journal.clone(),
        },
        scene: RecordingScene {
            journal: journal.clone(),
            enqueued: Vec::new(),
            messages: Vec::new(),
            connected: false,
            texture_updates: 0,
        },
        audio: Arc::new(Mutex::new(MockAudio {
            journal: journal.clone(),
        })),
        controllers: Box::new(MockControllerSource {
            journal: journal.clone(),
            script: controller.clone(),
            fail: controller_fails.clone(),
        }),
        config: opts.config,
    };

    let harness = Harness {
        journal,
        platform,
        device,
        controller,
        controller_fails,
    };
    (parts, harness)
}

/// A session with graphics initialized and the journal cleared.
pub fn session(opts: Options) -> (TestSession, Harness) {
    let (parts, harness) = parts(opts);
    let mut session = Session::create(parts).expect("session");
    session.wait_for_audio();
    session.initialize_graphics().expect("graphics");
    harness.journal.clear();
    (session, harness)
}
