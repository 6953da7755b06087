// SPDX-License-Identifier: CEPL-1.0
use stereo_math::{half_pixel_count, Size2D};
use stereo_render::Swapchain;
use tracing::{info, warn};

use crate::compositor::PRIMARY_BUFFER;
use crate::error::ComposeError;
use crate::viewport::ViewMode;

/// Returns the size to commit and whether it differs from `current`.
pub fn ensure_size(current: Size2D, recommended: Size2D) -> (Size2D, bool) {
    if current != recommended {
        (recommended, true)
    } else {
        (current, false)
    }
}

/// With 2x MSAA about half the pixels give similar quality.
pub fn recommended_render_size(maximum_effective: Size2D) -> Size2D {
    half_pixel_count(maximum_effective)
}

/// Storage actually allocated for the primary target. A multiview array
/// holds two layers of half the stereo width each.
pub fn framebuffer_size(render_size: Size2D, mode: ViewMode) -> Size2D {
    match mode {
        ViewMode::SingleView => render_size,
        ViewMode::Multiview => Size2D::new(render_size.width / 2, render_size.height),
    }
}

/// Tracks the committed render size of the primary target.
#[derive(Debug)]
pub struct FramebufferSizer {
    render_size: Size2D,
    mode: ViewMode,
    last_resize_frame: Option<u64>,
}

impl FramebufferSizer {
    pub fn new(mode: ViewMode) -> Self {
        Self::with_render_size(mode, Size2D::ZERO)
    }

    /// For a target that was just allocated at `render_size`.
    pub fn with_render_size(mode: ViewMode, render_size: Size2D) -> Self {
        Self {
            render_size,
            mode,
            last_resize_frame: None,
        }
    }

    pub fn render_size(&self) -> Size2D {
        self.render_size
    }

    pub fn framebuffer_size(&self) -> Size2D {
        framebuffer_size(self.render_size, self.mode)
    }

    /// Resizes the primary buffer in place when the recommendation moved.
    /// At most one resize per `frame_index`.
    pub fn prepare<C>(
        &mut self,
        swapchain: &mut C,
        recommended: Size2D,
        frame_index: u64,
    ) -> Result<bool, ComposeError>
    where
        C: Swapchain + ?Sized,
    {
        let (size, resized) = ensure_size(self.render_size, recommended);
        if !resized {
            return Ok(false);
        }
        if self.last_resize_frame == Some(frame_index) {
            warn!("frame {frame_index}: primary target already resized, deferring");
            return Ok(false);
        }

        let storage = framebuffer_size(size, self.mode);
        swapchain
            .resize_buffer(PRIMARY_BUFFER, storage)
            .map_err(ComposeError::Resize)?;
        info!(
            "primary target resized to {}x{} (render size {}x{})",
            storage.width, storage.height, size.width, size.height
        );

        self.render_size = size;
        self.last_resize_frame = Some(frame_index);
        Ok(true)
    }
}
