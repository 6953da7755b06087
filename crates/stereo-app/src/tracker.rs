// SPDX-License-Identifier: CEPL-1.0
use glam::Mat4;
use std::cell::Cell;
use std::time::Instant;
use stereo_compose::{TimePoint, TrackingPlatform, ViewerKind};
use stereo_math::{FieldOfView, Size2D, Transform4x4, UvRect};
use stereo_render::{BufferViewport, BufferViewportList, Eye};
use tracing::info;

use crate::config::ViewerCfg;

/// Simulated headset: the head turns slowly about the vertical axis and
/// the window is the display, split side by side.
pub struct DesktopTracker {
    epoch: Instant,
    window: Cell<Size2D>,
    viewer: ViewerKind,
    pending_viewer: Cell<Option<ViewerKind>>,
    multiview: bool,
    tracking: bool,
    ipd_m: f32,
    fov: FieldOfView,
    yaw_rate: f32,
}

impl DesktopTracker {
    pub fn new(cfg: &ViewerCfg, window: Size2D) -> Self {
        Self {
            epoch: Instant::now(),
            window: Cell::new(window),
            viewer: cfg.kind.kind(),
            pending_viewer: Cell::new(None),
            multiview: cfg.multiview,
            tracking: true,
            ipd_m: cfg.ipd_m,
            fov: FieldOfView::symmetric(cfg.fov_degrees),
            yaw_rate: cfg.yaw_rate,
        }
    }

    pub fn set_window_size(&self, size: Size2D) {
        self.window.set(size);
    }

    /// Takes effect on the next viewer profile refresh, as swapping a
    /// physical viewer would.
    pub fn request_viewer(&self, viewer: ViewerKind) {
        self.pending_viewer.set(Some(viewer));
    }

    pub fn viewer(&self) -> ViewerKind {
        self.viewer
    }
}

impl TrackingPlatform for DesktopTracker {
    fn now(&self) -> TimePoint {
        let nanos = self.epoch.elapsed().as_nanos();
        TimePoint::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn maximum_effective_render_target_size(&self) -> Size2D {
        self.window.get()
    }

    fn recommended_viewports(&self) -> BufferViewportList {
        BufferViewportList::new(
            BufferViewport {
                source_fov: self.fov,
                source_uv: UvRect::new(0.0, 0.5, 0.0, 1.0),
                source_layer: 0,
            },
            BufferViewport {
                source_fov: self.fov,
                source_uv: UvRect::new(0.5, 1.0, 0.0, 1.0),
                source_layer: 0,
            },
        )
    }

    fn head_from_start_space(&self, at: TimePoint) -> Option<Transform4x4> {
        if !self.tracking {
            return None;
        }
        let seconds = at.seconds_since(TimePoint::default());
        let yaw = self.yaw_rate * seconds;
        // head_from_world undoes the head's own rotation.
        Some(Mat4::from_rotation_y(-yaw).into())
    }

    fn eye_from_head(&self, eye: Eye) -> Transform4x4 {
        let half = self.ipd_m * 0.5;
        match eye {
            Eye::Left => Transform4x4::translation(half, 0.0, 0.0),
            Eye::Right => Transform4x4::translation(-half, 0.0, 0.0),
        }
    }

    fn pause_tracking(&mut self) {
        self.tracking = false;
    }

    fn resume_tracking(&mut self) {
        self.tracking = true;
    }

    fn refresh_viewer_profile(&mut self) {
        if let Some(viewer) = self.pending_viewer.take() {
            info!("viewer profile: {} -> {viewer}", self.viewer);
            self.viewer = viewer;
        }
    }

    fn supports_multiview(&self) -> bool {
        self.multiview
    }

    fn viewer_kind(&self) -> ViewerKind {
        self.viewer
    }
}
