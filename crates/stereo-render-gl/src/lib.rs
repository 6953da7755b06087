// SPDX-License-Identifier: CEPL-1.0
//! OpenGL backend: offscreen stereo targets in a small ring, presented side
//! by side on a glutin window surface.

use anyhow::{anyhow, bail, Context, Result};
use glow::HasContext as _;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::num::NonZeroU32;
use std::rc::Rc;
use stereo_math::{pixel_rect_from_uv, Size2D, Transform4x4};
use stereo_render::{
    BufferSpec, BufferViewportList, Frame, GraphicsDevice, Swapchain, TargetHandle,
};
use tracing::{debug, error, info, warn};

use glutin::display::{Display, DisplayApiPreference};

mod context;
mod target;

use context::{make_current, Presenter};
use target::{check_size, size_limit, GlTarget, TargetView};

/// Images in flight before `acquire_frame` reuses one.
pub const SWAPCHAIN_DEPTH: usize = 3;

pub fn compile_program(gl: &glow::Context, vert_src: &str, frag_src: &str) -> Result<glow::Program> {
    unsafe {
        let vs = gl
            .create_shader(glow::VERTEX_SHADER)
            .map_err(anyhow::Error::msg)?;
        let fs = gl
            .create_shader(glow::FRAGMENT_SHADER)
            .map_err(anyhow::Error::msg)?;

        gl.shader_source(vs, vert_src);
        gl.compile_shader(vs);

        if !gl.get_shader_compile_status(vs) {
            return Err(anyhow!("GL vert compile: {}", gl.get_shader_info_log(vs)));
        }

        gl.shader_source(fs, frag_src);
        gl.compile_shader(fs);

        if !gl.get_shader_compile_status(fs) {
            return Err(anyhow!("GL frag compile: {}", gl.get_shader_info_log(fs)));
        }

        let program = gl.create_program().map_err(anyhow::Error::msg)?;

        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            return Err(anyhow!("GL link: {}", gl.get_program_info_log(program)));
        }

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        Ok(program)
    }
}

fn fbo_handle(fbo: Option<glow::Framebuffer>) -> TargetHandle {
    TargetHandle(fbo.map_or(0, |f| f.0.get()))
}

/// The framebuffer named by a handle; `None` is the window's default one.
pub fn framebuffer(handle: TargetHandle) -> Option<glow::Framebuffer> {
    NonZeroU32::new(handle.0).map(glow::NativeFramebuffer)
}

pub struct GlDevice {
    gl: Rc<glow::Context>,
    presenter: Rc<Presenter>,
    vsync: bool,
}

impl GlDevice {
    pub fn new(
        window: &dyn HasWindowHandle,
        display_handle: &dyn HasDisplayHandle,
        size: Size2D,
    ) -> Result<Self> {
        let wh = window
            .window_handle()
            .map_err(|e| anyhow!("{e}"))?
            .as_raw();
        let dh = display_handle
            .display_handle()
            .map_err(|e| anyhow!("{e}"))?
            .as_raw();

        let display =
            unsafe { Display::new(dh, DisplayApiPreference::Egl) }.context("Display::new")?;

        let (presenter, gl) = make_current(&display, wh, size)?;
        let device = Self {
            gl: Rc::new(gl),
            presenter: Rc::new(presenter),
            vsync: true,
        };
        device.set_vsync(device.vsync);
        Ok(device)
    }

    /// Shared handle for scenes drawing on this context.
    pub fn gl(&self) -> Rc<glow::Context> {
        self.gl.clone()
    }

    pub fn window_size(&self) -> Size2D {
        self.presenter.size()
    }

    pub fn resize_surface(&self, size: Size2D) {
        self.presenter.resize(size);
        self.set_vsync(self.vsync);
    }

    pub fn set_vsync(&self, vsync: bool) {
        if let Err(err) = self.presenter.set_vsync(vsync) {
            warn!("vsync {vsync}: {err:#}");
        }
    }
}

impl GraphicsDevice for GlDevice {
    type Swapchain = GlSwapchain;

    fn initialize(&mut self) -> Result<()> {
        let gl = &self.gl;
        unsafe {
            info!(
                "GL {} on {}",
                gl.get_parameter_string(glow::VERSION),
                gl.get_parameter_string(glow::RENDERER)
            );
            gl.enable(glow::CULL_FACE);
            gl.front_face(glow::CCW);
            gl.cull_face(glow::BACK);
            gl.disable(glow::FRAMEBUFFER_SRGB);
        }
        Ok(())
    }

    fn create_swapchain(&mut self, specs: &[BufferSpec]) -> Result<GlSwapchain> {
        let mut swapchain = GlSwapchain {
            gl: self.gl.clone(),
            presenter: self.presenter.clone(),
            images: Vec::with_capacity(SWAPCHAIN_DEPTH),
            next: 0,
        };
        for slot in 0..SWAPCHAIN_DEPTH {
            swapchain.images.push(Vec::with_capacity(specs.len()));
            for (index, spec) in specs.iter().enumerate() {
                let target = unsafe { GlTarget::create(&self.gl, *spec) }
                    .with_context(|| format!("image {slot} buffer {index}"))?;
                swapchain.images[slot].push(target);
            }
        }
        debug!("swapchain: {SWAPCHAIN_DEPTH} images of {} buffers", specs.len());
        Ok(swapchain)
    }

    fn take_error(&mut self) -> Option<u32> {
        let code = unsafe { self.gl.get_error() };
        (code != glow::NO_ERROR).then_some(code)
    }
}

pub struct GlSwapchain {
    gl: Rc<glow::Context>,
    presenter: Rc<Presenter>,
    /// `images[slot][buffer]`.
    images: Vec<Vec<GlTarget>>,
    next: usize,
}

impl Swapchain for GlSwapchain {
    type Frame = GlFrame;

    fn acquire_frame(&mut self) -> Result<GlFrame> {
        if self.images.is_empty() {
            bail!("swapchain has no images");
        }
        let slot = self.next;
        self.next = (self.next + 1) % self.images.len();
        Ok(GlFrame {
            gl: self.gl.clone(),
            presenter: self.presenter.clone(),
            targets: self.images[slot].iter().map(|t| t.view().clone()).collect(),
        })
    }

    /// Resizes `index` in every image, or leaves all of them as they were.
    fn resize_buffer(&mut self, index: usize, size: Size2D) -> Result<()> {
        let old = self.buffer_size(index).ok_or_else(|| anyhow!("no buffer {index}"))?;
        let gl = &self.gl;
        unsafe { check_size(size, size_limit(gl))? };
        if self.images.iter().any(|image| image.len() <= index) {
            bail!("buffer {index} missing from an image");
        }
        resize_all(&mut self.images, old, size, |image, to| unsafe {
            image[index].resize(gl, to)
        })
        .with_context(|| format!("resize buffer {index} to {}x{}", size.width, size.height))
    }

    fn buffer_size(&self, index: usize) -> Option<Size2D> {
        self.images.first()?.get(index).map(|t| t.spec().size)
    }
}

/// Applies `resize` to each item in turn. If one fails, the items before
/// it are put back to `old`.
fn resize_all<T>(
    items: &mut [T],
    old: Size2D,
    size: Size2D,
    mut resize: impl FnMut(&mut T, Size2D) -> Result<()>,
) -> Result<()> {
    for done in 0..items.len() {
        if let Err(err) = resize(&mut items[done], size) {
            for item in &mut items[..done] {
                if let Err(restore) = resize(item, old) {
                    error!("restoring {}x{} failed: {restore:#}", old.width, old.height);
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

impl Drop for GlSwapchain {
    fn drop(&mut self) {
        for target in self.images.iter_mut().flatten() {
            unsafe { target.destroy(&self.gl) };
        }
    }
}

pub struct GlFrame {
    gl: Rc<glow::Context>,
    presenter: Rc<Presenter>,
    targets: Vec<TargetView>,
}

impl GlFrame {
    fn draw_fbo(&self, index: usize, layer: u32) -> Option<glow::Framebuffer> {
        self.targets
            .get(index)
            .and_then(|t| t.draw.get(layer as usize).copied())
    }
}

impl Frame for GlFrame {
    fn bind_buffer(&mut self, index: usize) {
        let Some(fbo) = self.draw_fbo(index, 0) else {
            warn!("bind_buffer: no buffer {index}");
            return;
        };
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo)) };
    }

    fn framebuffer_object(&self, index: usize) -> TargetHandle {
        fbo_handle(self.draw_fbo(index, 0))
    }

    fn layer_object(&self, index: usize, layer: u32) -> TargetHandle {
        fbo_handle(self.draw_fbo(index, layer))
    }

    fn unbind(&mut self) {
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
    }

    /// Blits each eye's source rectangle into its half of the window. There
    /// is no reprojection, so the head pose goes unused.
    fn submit(self, viewports: &BufferViewportList, _head_from_world: &Transform4x4) {
        let window = self.presenter.size();
        let Some(primary) = self.targets.first() else {
            return;
        };
        if window.is_empty() {
            return;
        }
        let gl = &self.gl;
        let half = window.width / 2;

        unsafe {
            primary.resolve_samples(gl);
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            gl.viewport(0, 0, window.width, window.height);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            for (eye, viewport) in viewports.iter() {
                let src = pixel_rect_from_uv(primary.size, &viewport.source_uv);
                let dst_left = eye.index() as i32 * half;
                gl.bind_framebuffer(
                    glow::READ_FRAMEBUFFER,
                    primary.read_fbo(viewport.source_layer),
                );
                gl.blit_framebuffer(
                    src.left,
                    src.bottom,
                    src.right(),
                    src.top(),
                    dst_left,
                    0,
                    dst_left + half,
                    window.height,
                    glow::COLOR_BUFFER_BIT,
                    glow::LINEAR,
                );
            }
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }

        if let Err(err) = self.presenter.swap_buffers() {
            warn!("present failed: {err:#}");
        }
    }
}
