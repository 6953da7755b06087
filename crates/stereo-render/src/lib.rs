// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use stereo_math::{Size2D, Transform4x4};

mod scene;
mod viewport;

pub use scene::{RenderArgs, RenderPass, Scene, StreamingTexture, UpdateArgs, VideoFrame};
pub use viewport::{BufferViewport, BufferViewportList, Eye};

/// Native framebuffer object name handed to the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorFormat {
    #[default]
    Rgba8888,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DepthStencilFormat {
    None,
    #[default]
    Depth16,
}

/// Allocation request for one buffer of a swapchain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSpec {
    pub size: Size2D,
    pub color: ColorFormat,
    pub depth_stencil: DepthStencilFormat,
    pub samples: u32,
    /// 1 for a flat target, 2 for a multiview texture array.
    pub layers: u32,
}

impl BufferSpec {
    pub fn new(size: Size2D) -> Self {
        Self {
            size,
            color: ColorFormat::default(),
            depth_stencil: DepthStencilFormat::default(),
            samples: 1,
            layers: 1,
        }
    }

    pub fn with_color(mut self, color: ColorFormat) -> Self {
        self.color = color;
        self
    }

    pub fn with_depth_stencil(mut self, depth_stencil: DepthStencilFormat) -> Self {
        self.depth_stencil = depth_stencil;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_multiview_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }
}

/// One acquired swapchain image set. Dropping a frame without submitting it
/// hands the buffers back unpresented.
pub trait Frame {
    fn bind_buffer(&mut self, index: usize);
    fn framebuffer_object(&self, index: usize) -> TargetHandle;
    /// Target that draws into one layer of a multiview buffer.
    fn layer_object(&self, index: usize, _layer: u32) -> TargetHandle {
        self.framebuffer_object(index)
    }
    fn unbind(&mut self);
    fn submit(self, viewports: &BufferViewportList, head_from_world: &Transform4x4)
    where
        Self: Sized;
}

pub trait Swapchain {
    type Frame: Frame;

    /// May block until the display compositor releases a buffer.
    fn acquire_frame(&mut self) -> Result<Self::Frame>;
    /// Reallocates storage of buffer `index` in place.
    fn resize_buffer(&mut self, index: usize, size: Size2D) -> Result<()>;
    fn buffer_size(&self, index: usize) -> Option<Size2D>;
}

pub trait GraphicsDevice {
    type Swapchain: Swapchain;

    /// Called once on the render thread with a current context.
    fn initialize(&mut self) -> Result<()>;
    fn create_swapchain(&mut self, specs: &[BufferSpec]) -> Result<Self::Swapchain>;
    /// Pops the oldest pending GPU error code, if any.
    fn take_error(&mut self) -> Option<u32>;
}
