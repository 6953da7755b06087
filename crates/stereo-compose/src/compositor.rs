// SPDX-License-Identifier: CEPL-1.0
//! The per-frame protocol:
//!
//! 1. poll input and apply it
//! 2. resize the primary target if the recommendation moved
//! 3. acquire a swapchain frame (may block)
//! 4. predict the head pose at now + latency
//! 5. refresh both eye viewports and eye views
//! 6. update the scene with the elapsed time
//! 7. bind, build both render passes, render once
//! 8. unbind, submit, poll GPU errors

use stereo_math::{pixel_rect_from_uv, Size2D, Transform4x4};
use stereo_render::{
    BufferSpec, ColorFormat, DepthStencilFormat, Eye, Frame, GraphicsDevice, RenderArgs,
    RenderPass, Scene, Swapchain, UpdateArgs,
};
use tracing::{debug, error, info, warn};

use crate::config::CompositorConfig;
use crate::controller::{InputEvent, InputSource};
use crate::error::ComposeError;
use crate::platform::{TimePoint, TrackingPlatform, ViewerKind};
use crate::pose::HeadPoseEstimator;
use crate::sizer::{framebuffer_size, recommended_render_size, FramebufferSizer};
use crate::viewport::{ViewMode, ViewportManager};

pub const PRIMARY_BUFFER: usize = 0;
pub const OVERLAY_BUFFER: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    Skipped,
}

/// Buffer specs for the primary stereo target and the overlay target.
pub fn target_specs(config: &CompositorConfig, render_size: Size2D, mode: ViewMode) -> [BufferSpec; 2] {
    let depth = if config.depth {
        DepthStencilFormat::Depth16
    } else {
        DepthStencilFormat::None
    };
    let mut primary = BufferSpec::new(framebuffer_size(render_size, mode))
        .with_color(ColorFormat::Rgba8888)
        .with_depth_stencil(depth)
        .with_samples(config.samples);
    if mode.is_multiview() {
        primary = primary.with_multiview_layers(2);
    }

    let overlay = BufferSpec::new(config.overlay_size())
        .with_color(ColorFormat::Rgba8888)
        .with_depth_stencil(DepthStencilFormat::None)
        .with_samples(1);

    [primary, overlay]
}

/// The swapchain holding the primary and overlay targets.
pub struct RenderTargetSet<C> {
    swapchain: C,
    specs: [BufferSpec; 2],
}

impl<C: Swapchain> RenderTargetSet<C> {
    pub fn create<D>(device: &mut D, specs: [BufferSpec; 2]) -> Result<Self, ComposeError>
    where
        D: GraphicsDevice<Swapchain = C>,
    {
        let swapchain = device
            .create_swapchain(&specs)
            .map_err(ComposeError::Graphics)?;
        Ok(Self { swapchain, specs })
    }

    pub fn primary_spec(&self) -> &BufferSpec {
        &self.specs[PRIMARY_BUFFER]
    }

    pub fn swapchain_mut(&mut self) -> &mut C {
        &mut self.swapchain
    }
}

pub struct FrameCompositor<D: GraphicsDevice> {
    config: CompositorConfig,
    device: D,
    targets: Option<RenderTargetSet<D::Swapchain>>,
    viewports: ViewportManager,
    sizer: FramebufferSizer,
    estimator: HeadPoseEstimator,
    head_view: Transform4x4,
    eye_views: [Transform4x4; 2],
    last_update: TimePoint,
    frame_index: u64,
}

impl<D: GraphicsDevice> FrameCompositor<D> {
    pub fn new(device: D, config: CompositorConfig, now: TimePoint) -> Self {
        Self {
            config,
            device,
            targets: None,
            viewports: ViewportManager::default(),
            sizer: FramebufferSizer::new(ViewMode::SingleView),
            estimator: HeadPoseEstimator::new(config.prediction_latency_ns),
            head_view: Transform4x4::IDENTITY,
            eye_views: [Transform4x4::IDENTITY; 2],
            last_update: now,
            frame_index: 0,
        }
    }

    /// Must run on the render thread with a current graphics context.
    pub fn initialize_graphics<P>(
        &mut self,
        platform: &P,
        viewer: ViewerKind,
    ) -> Result<(), ComposeError>
    where
        P: TrackingPlatform + ?Sized,
    {
        self.device.initialize().map_err(ComposeError::Graphics)?;

        // Multiview support is only meaningful once the device is up.
        let mode = ViewMode::select(
            platform.supports_multiview(),
            self.config.allow_multiview,
            viewer,
        );
        info!(
            "{}",
            if mode.is_multiview() {
                "Using multiview."
            } else {
                "Not using multiview."
            }
        );

        let render_size =
            recommended_render_size(platform.maximum_effective_render_target_size());
        let specs = target_specs(&self.config, render_size, mode);
        let targets = RenderTargetSet::create(&mut self.device, specs)?;
        info!(
            "render targets ready: primary {}x{} x{} layer(s), overlay {}x{}",
            specs[PRIMARY_BUFFER].size.width,
            specs[PRIMARY_BUFFER].size.height,
            specs[PRIMARY_BUFFER].layers,
            specs[OVERLAY_BUFFER].size.width,
            specs[OVERLAY_BUFFER].size.height
        );

        self.viewports = ViewportManager::new(mode);
        self.sizer = FramebufferSizer::with_render_size(mode, render_size);
        self.targets = Some(targets);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.targets.is_some()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.viewports.mode()
    }

    pub fn render_size(&self) -> Size2D {
        self.sizer.render_size()
    }

    pub fn head_view(&self) -> &Transform4x4 {
        &self.head_view
    }

    pub fn eye_views(&self) -> &[Transform4x4; 2] {
        &self.eye_views
    }

    pub fn viewports(&self) -> &ViewportManager {
        &self.viewports
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn targets(&self) -> Option<&RenderTargetSet<D::Swapchain>> {
        self.targets.as_ref()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Runs one frame to submission or abandons it; never unwinds past the
    /// frame.
    pub fn draw_frame<P, S, I>(&mut self, platform: &P, scene: &mut S, input: &mut I) -> FrameOutcome
    where
        P: TrackingPlatform + ?Sized,
        S: Scene + ?Sized,
        I: InputSource + ?Sized,
    {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        match self.compose(platform, scene, input, frame_index) {
            Ok(()) => {
                self.check_gpu_error("draw_frame");
                FrameOutcome::Presented
            }
            Err(err) => {
                error!("frame {frame_index} skipped: {err}");
                FrameOutcome::Skipped
            }
        }
    }

    fn compose<P, S, I>(
        &mut self,
        platform: &P,
        scene: &mut S,
        input: &mut I,
        frame_index: u64,
    ) -> Result<(), ComposeError>
    where
        P: TrackingPlatform + ?Sized,
        S: Scene + ?Sized,
        I: InputSource + ?Sized,
    {
        let targets = self.targets.as_mut().ok_or(ComposeError::NotInitialized)?;

        if let Some(InputEvent::PrimaryAction) = input.poll_input() {
            scene.set_flying_forward(false);
        }

        let recommended = recommended_render_size(platform.maximum_effective_render_target_size());
        self.sizer
            .prepare(targets.swapchain_mut(), recommended, frame_index)?;

        let mut frame = targets
            .swapchain_mut()
            .acquire_frame()
            .map_err(ComposeError::AcquireFrame)?;

        match self.estimator.predict(platform, platform.now()) {
            Some(head) => self.head_view = head,
            None => debug!("frame {frame_index}: no fresh head pose, reusing last"),
        }

        self.viewports.refresh(platform);
        let eye_from_head = Eye::BOTH.map(|eye| platform.eye_from_head(eye));
        for eye in Eye::BOTH {
            self.eye_views[eye.index()] = eye_from_head[eye.index()] * self.head_view;
        }

        let time_now = platform.now();
        scene.update(&UpdateArgs {
            head_from_world: self.head_view,
            delta_seconds: time_now.seconds_since(self.last_update),
        });
        self.last_update = time_now;

        frame.bind_buffer(PRIMARY_BUFFER);
        let target = frame.framebuffer_object(PRIMARY_BUFFER);
        // Rects cover one layer, not the whole render size.
        let target_size = self.sizer.framebuffer_size();
        let passes = Eye::BOTH.map(|eye| {
            let viewport = self.viewports.viewport(eye);
            RenderPass {
                viewport: pixel_rect_from_uv(target_size, &viewport.source_uv),
                eye_from_head: eye_from_head[eye.index()],
                eye_view: self.eye_views[eye.index()],
                fov: viewport.source_fov,
                layer: viewport.source_layer,
                target: frame.layer_object(PRIMARY_BUFFER, viewport.source_layer),
            }
        });
        scene.render(&RenderArgs {
            passes,
            target,
            multiview: self.viewports.mode().is_multiview(),
        });

        frame.unbind();
        frame.submit(self.viewports.list(), &self.head_view);
        Ok(())
    }

    fn check_gpu_error(&mut self, label: &str) {
        if let Some(code) = self.device.take_error() {
            warn!("GL error @ {label}: 0x{code:x}");
        }
    }
}
