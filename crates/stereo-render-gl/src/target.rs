// SPDX-License-Identifier: CEPL-1.0
use anyhow::{bail, Result};
use glow::HasContext as _;
use stereo_math::Size2D;
use stereo_render::{BufferSpec, ColorFormat, DepthStencilFormat};
use tracing::{debug, error};

/// Framebuffer names of one target, copied into each acquired frame.
#[derive(Clone, Debug)]
pub(crate) struct TargetView {
    pub size: Size2D,
    /// One draw framebuffer per layer.
    pub draw: Vec<glow::Framebuffer>,
    /// Single-sample copy of a multisampled draw buffer.
    pub resolve: Option<glow::Framebuffer>,
}

impl TargetView {
    /// Framebuffer to read `layer` from once the frame is finished.
    pub fn read_fbo(&self, layer: u32) -> Option<glow::Framebuffer> {
        self.resolve.or_else(|| self.draw.get(layer as usize).copied())
    }

    /// Multisample resolve. Leaves the read and draw bindings changed.
    ///
    /// # Safety
    /// The context owning these framebuffers must be current.
    pub unsafe fn resolve_samples(&self, gl: &glow::Context) {
        let (Some(resolve), Some(&draw)) = (self.resolve, self.draw.first()) else {
            return;
        };
        let (w, h) = (self.size.width, self.size.height);
        gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(draw));
        gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(resolve));
        gl.blit_framebuffer(
            0,
            0,
            w,
            h,
            0,
            0,
            w,
            h,
            glow::COLOR_BUFFER_BIT,
            glow::NEAREST,
        );
    }
}

#[derive(Clone, Copy, Debug)]
struct RenderbufferStorage {
    name: glow::Renderbuffer,
    internal: u32,
    samples: u32,
}

/// GPU storage behind one [`BufferSpec`].
///
/// Names are created once; resizing re-specifies storage on them so the
/// framebuffers handed to earlier frames stay valid.
pub(crate) struct GlTarget {
    spec: BufferSpec,
    view: TargetView,
    layers: u32,
    color: glow::Texture,
    renderbuffers: Vec<RenderbufferStorage>,
}

fn color_formats(color: ColorFormat) -> (u32, u32, u32) {
    match color {
        ColorFormat::Rgba8888 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
    }
}

fn depth_format(depth: DepthStencilFormat) -> Option<(u32, u32)> {
    match depth {
        DepthStencilFormat::None => None,
        DepthStencilFormat::Depth16 => Some((glow::DEPTH_COMPONENT16, glow::DEPTH_ATTACHMENT)),
    }
}

/// Errors unless `size` is non-empty and within `limit` on both axes.
pub(crate) fn check_size(size: Size2D, limit: i32) -> Result<()> {
    if size.is_empty() {
        bail!("cannot allocate a {}x{} target", size.width, size.height);
    }
    if size.width > limit || size.height > limit {
        bail!(
            "{}x{} exceeds the {limit} pixel limit",
            size.width,
            size.height
        );
    }
    Ok(())
}

/// Largest edge both textures and renderbuffers accept.
///
/// # Safety
/// The context must be current.
pub(crate) unsafe fn size_limit(gl: &glow::Context) -> i32 {
    gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE)
        .min(gl.get_parameter_i32(glow::MAX_RENDERBUFFER_SIZE))
}

unsafe fn check_complete(gl: &glow::Context, what: &str) -> Result<()> {
    let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
    if status != glow::FRAMEBUFFER_COMPLETE {
        bail!("{what} framebuffer incomplete: 0x{status:x}");
    }
    Ok(())
}

impl GlTarget {
    /// # Safety
    /// The context must be current.
    pub unsafe fn create(gl: &glow::Context, spec: BufferSpec) -> Result<Self> {
        check_size(spec.size, size_limit(gl))?;
        let layers = spec.layers.max(1);
        let (internal, _, _) = color_formats(spec.color);
        let depth = depth_format(spec.depth_stencil);
        // Layered targets are drawn single-sampled.
        let samples = if layers > 1 { 1 } else { spec.samples.max(1) };
        if samples != spec.samples.max(1) {
            debug!("multiview target drops {}x MSAA", spec.samples);
        }

        let color = gl.create_texture().map_err(anyhow::Error::msg)?;
        let mut target = GlTarget {
            spec,
            view: TargetView {
                size: spec.size,
                draw: Vec::new(),
                resolve: None,
            },
            layers,
            color,
            renderbuffers: Vec::new(),
        };

        let tex_target = target.texture_target();
        gl.bind_texture(tex_target, Some(color));
        gl.tex_parameter_i32(tex_target, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(tex_target, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(tex_target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(tex_target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.bind_texture(tex_target, None);
        target.specify_color(gl);

        let result = if samples > 1 {
            target.attach_multisampled(gl, samples, internal, depth)
        } else {
            target.attach_layers(gl, layers, depth)
        };
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);

        if let Err(err) = result {
            target.destroy(gl);
            return Err(err);
        }
        Ok(target)
    }

    fn texture_target(&self) -> u32 {
        if self.layers > 1 {
            glow::TEXTURE_2D_ARRAY
        } else {
            glow::TEXTURE_2D
        }
    }

    /// (Re)specifies the color texture at the current size.
    unsafe fn specify_color(&self, gl: &glow::Context) {
        let (w, h) = (self.spec.size.width, self.spec.size.height);
        let (internal, format, ty) = color_formats(self.spec.color);
        let tex_target = self.texture_target();
        gl.bind_texture(tex_target, Some(self.color));
        if self.layers > 1 {
            gl.tex_image_3d(
                tex_target,
                0,
                internal as i32,
                w,
                h,
                self.layers as i32,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            );
        } else {
            gl.tex_image_2d(
                tex_target,
                0,
                internal as i32,
                w,
                h,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            );
        }
        gl.bind_texture(tex_target, None);
    }

    unsafe fn specify_renderbuffer(&self, gl: &glow::Context, rb: &RenderbufferStorage) {
        let (w, h) = (self.spec.size.width, self.spec.size.height);
        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(rb.name));
        if rb.samples > 1 {
            gl.renderbuffer_storage_multisample(
                glow::RENDERBUFFER,
                rb.samples as i32,
                rb.internal,
                w,
                h,
            );
        } else {
            gl.renderbuffer_storage(glow::RENDERBUFFER, rb.internal, w, h);
        }
    }

    unsafe fn renderbuffer(
        &mut self,
        gl: &glow::Context,
        samples: u32,
        internal: u32,
    ) -> Result<glow::Renderbuffer> {
        let name = gl.create_renderbuffer().map_err(anyhow::Error::msg)?;
        let rb = RenderbufferStorage {
            name,
            internal,
            samples,
        };
        self.renderbuffers.push(rb);
        self.specify_renderbuffer(gl, &rb);
        Ok(name)
    }

    unsafe fn framebuffer(&mut self, gl: &glow::Context) -> Result<glow::Framebuffer> {
        let fbo = gl.create_framebuffer().map_err(anyhow::Error::msg)?;
        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
        Ok(fbo)
    }

    /// Multisampled color and depth renderbuffers, resolved into the
    /// texture.
    unsafe fn attach_multisampled(
        &mut self,
        gl: &glow::Context,
        samples: u32,
        internal: u32,
        depth: Option<(u32, u32)>,
    ) -> Result<()> {
        let draw = self.framebuffer(gl)?;
        self.view.draw.push(draw);
        let color_rb = self.renderbuffer(gl, samples, internal)?;
        gl.framebuffer_renderbuffer(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::RENDERBUFFER,
            Some(color_rb),
        );
        if let Some((format, attachment)) = depth {
            let depth_rb = self.renderbuffer(gl, samples, format)?;
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment,
                glow::RENDERBUFFER,
                Some(depth_rb),
            );
        }
        check_complete(gl, "draw")?;

        let resolve = self.framebuffer(gl)?;
        self.view.resolve = Some(resolve);
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(self.color),
            0,
        );
        check_complete(gl, "resolve")
    }

    /// Draws straight into the texture, one framebuffer per layer.
    unsafe fn attach_layers(
        &mut self,
        gl: &glow::Context,
        layers: u32,
        depth: Option<(u32, u32)>,
    ) -> Result<()> {
        for layer in 0..layers {
            let fbo = self.framebuffer(gl)?;
            self.view.draw.push(fbo);
            if layers > 1 {
                gl.framebuffer_texture_layer(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    Some(self.color),
                    0,
                    layer as i32,
                );
            } else {
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    Some(self.color),
                    0,
                );
            }
            if let Some((format, attachment)) = depth {
                let rb = self.renderbuffer(gl, 1, format)?;
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::RENDERBUFFER,
                    Some(rb),
                );
            }
            check_complete(gl, "layer")?;
        }
        Ok(())
    }

    pub fn spec(&self) -> &BufferSpec {
        &self.spec
    }

    pub fn view(&self) -> &TargetView {
        &self.view
    }

    /// # Safety
    /// The context must be current.
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        for fbo in self.view.draw.drain(..).chain(self.view.resolve.take()) {
            gl.delete_framebuffer(fbo);
        }
        for rb in self.renderbuffers.drain(..) {
            gl.delete_renderbuffer(rb.name);
        }
        gl.delete_texture(self.color);
    }
}

impl GlTarget {
    /// Re-specifies every attachment at `size` and checks each framebuffer.
    unsafe fn specify(&mut self, gl: &glow::Context, size: Size2D) -> Result<()> {
        self.spec.size = size;
        self.view.size = size;
        self.specify_color(gl);
        for rb in &self.renderbuffers {
            self.specify_renderbuffer(gl, rb);
        }
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);

        let mut result = Ok(());
        for &fbo in self.view.draw.iter().chain(&self.view.resolve) {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            result = check_complete(gl, "resized");
            if result.is_err() {
                break;
            }
        }
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        result
    }

    /// Resizes in place, keeping every name and format. On failure the
    /// previous size is restored.
    ///
    /// # Safety
    /// The context must be current.
    pub unsafe fn resize(&mut self, gl: &glow::Context, size: Size2D) -> Result<()> {
        let old = self.spec.size;
        if size == old {
            return Ok(());
        }
        check_size(size, size_limit(gl))?;
        if let Err(err) = self.specify(gl, size) {
            if let Err(restore) = self.specify(gl, old) {
                error!("restoring {}x{} failed: {restore:#}", old.width, old.height);
            }
            return Err(err);
        }
        Ok(())
    }
}
