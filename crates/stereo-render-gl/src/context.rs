// SPDX-License-Identifier: CEPL-1.0
use anyhow::{anyhow, Context, Result};
use raw_window_handle::RawWindowHandle;
use std::cell::Cell;
use std::ffi::CString;
use std::num::NonZeroU32;
use stereo_math::Size2D;

use glutin::{
    config::ConfigTemplateBuilder,
    context::{
        ContextApi, ContextAttributesBuilder, NotCurrentContext, PossiblyCurrentContext, Version,
    },
    display::Display,
    prelude::*,
    surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};

fn nonzero(v: i32) -> NonZeroU32 {
    NonZeroU32::new(v.max(1) as u32).unwrap_or(NonZeroU32::MIN)
}

/// The window surface and the context current on it.
pub(crate) struct Presenter {
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    size: Cell<Size2D>,
}

impl Presenter {
    pub(crate) fn size(&self) -> Size2D {
        self.size.get()
    }

    pub(crate) fn resize(&self, size: Size2D) {
        self.size.set(size);
        if size.is_empty() {
            return;
        }
        self.surface
            .resize(&self.context, nonzero(size.width), nonzero(size.height));
    }

    pub(crate) fn set_vsync(&self, vsync: bool) -> Result<()> {
        let interval = if vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        self.surface
            .set_swap_interval(&self.context, interval)
            .context("set_swap_interval")
    }

    pub(crate) fn swap_buffers(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .context("swap_buffers")
    }
}

/// Creates a GL 3.3 core context on the window and loads its entry points.
pub(crate) fn make_current(
    display: &Display,
    window_handle: RawWindowHandle,
    size: Size2D,
) -> Result<(Presenter, glow::Context)> {
    let template = ConfigTemplateBuilder::new().build();
    let mut configs = unsafe { display.find_configs(template) }.context("find_configs")?;
    let config = configs.next().ok_or_else(|| anyhow!("no GL configs"))?;

    let sattrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        window_handle,
        nonzero(size.width),
        nonzero(size.height),
    );
    let surface = unsafe { display.create_window_surface(&config, &sattrs) }
        .context("create_window_surface")?;
    let ctx_attrs = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .build(Some(window_handle));
    let not_current: NotCurrentContext =
        unsafe { display.create_context(&config, &ctx_attrs) }.context("create_context")?;

    let context = not_current.make_current(&surface).context("make_current")?;

    let gl = unsafe {
        glow::Context::from_loader_function(|s| match CString::new(s) {
            Ok(name) => display.get_proc_address(&name) as *const _,
            Err(_) => std::ptr::null(),
        })
    };

    let presenter = Presenter {
        context,
        surface,
        size: Cell::new(size),
    };
    Ok((presenter, gl))
}
