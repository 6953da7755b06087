// SPDX-License-Identifier: CEPL-1.0
use stereo_math::UvRect;
use stereo_render::{BufferViewport, BufferViewportList, Eye};
use tracing::error;

use crate::platform::{TrackingPlatform, ViewerKind};

/// Fixed for the lifetime of a session once graphics are initialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    SingleView,
    /// Both eyes live in one 2-layer texture array, picked by layer index.
    Multiview,
}

impl ViewMode {
    /// An unrecognized viewer never gets multiview, whatever the hardware
    /// reports.
    pub fn select(supports_multiview: bool, allowed: bool, viewer: ViewerKind) -> ViewMode {
        if !viewer.is_recognized() {
            error!("unexpected viewer type {viewer}; falling back to single view");
            return ViewMode::SingleView;
        }
        if supports_multiview && allowed {
            ViewMode::Multiview
        } else {
            ViewMode::SingleView
        }
    }

    pub fn is_multiview(self) -> bool {
        self == ViewMode::Multiview
    }
}

#[derive(Debug, Default)]
pub struct ViewportManager {
    mode: ViewMode,
    list: BufferViewportList,
}

impl ViewportManager {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            list: BufferViewportList::default(),
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn list(&self) -> &BufferViewportList {
        &self.list
    }

    pub fn viewport(&self, eye: Eye) -> &BufferViewport {
        self.list.get(eye)
    }

    /// Reloads the platform defaults. The recommended viewports assume a
    /// flat side-by-side target, so multiview rewrites them to full-frame
    /// UVs selected by layer.
    pub fn refresh<P>(&mut self, platform: &P) -> &BufferViewportList
    where
        P: TrackingPlatform + ?Sized,
    {
        self.list = platform.recommended_viewports();
        if self.mode.is_multiview() {
            for eye in Eye::BOTH {
                let vp = &mut self.list[eye];
                vp.source_uv = UvRect::FULL;
                vp.source_layer = eye.index() as u32;
            }
        }
        &self.list
    }
}
