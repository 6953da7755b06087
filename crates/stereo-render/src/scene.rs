// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use stereo_math::{FieldOfView, PixelRect, Transform4x4};

use crate::TargetHandle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateArgs {
    pub head_from_world: Transform4x4,
    pub delta_seconds: f32,
}

/// Everything one eye needs to draw into the bound target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPass {
    pub viewport: PixelRect,
    pub eye_from_head: Transform4x4,
    /// `eye_from_head * head_from_world`.
    pub eye_view: Transform4x4,
    pub fov: FieldOfView,
    pub layer: u32,
    /// Where this eye draws; the layer target under multiview.
    pub target: TargetHandle,
}

/// Both eyes go out in one call so the scene can instance across layers
/// when `multiview` is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderArgs {
    pub passes: [RenderPass; 2],
    pub target: TargetHandle,
    pub multiview: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingTexture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// A decoded video frame handed to the scene for upload.
#[derive(Clone, Copy, Debug)]
pub struct VideoFrame<'a> {
    pub frame_id: i32,
    pub texture_id: u32,
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

/// The scene drawn by the compositor. Opaque apart from these calls.
pub trait Scene {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, args: &UpdateArgs);
    fn render(&mut self, args: &RenderArgs);
    fn set_flying_forward(&mut self, flying_forward: bool);

    fn streaming_texture(&self) -> StreamingTexture {
        StreamingTexture::default()
    }
    fn enqueue_frame(&mut self, _frame: VideoFrame<'_>) {}
    fn before_texture_update(&mut self) {}
    fn after_texture_update(&mut self) {}
    fn host_address(&self) -> Option<String> {
        None
    }
    fn on_text_message(&mut self, _id: i32, _text: &str) {}
    fn on_connected(&mut self) {}
}
