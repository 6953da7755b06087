// SPDX-License-Identifier: CEPL-1.0
//! Windowing for the desktop harness.

pub use winit;

use stereo_math::Size2D;
use winit::dpi::PhysicalSize;

/// Clamps to `i32`; a minimized window reports zero.
pub fn window_size(size: PhysicalSize<u32>) -> Size2D {
    let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
    Size2D::new(clamp(size.width), clamp(size.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size() {
        assert_eq!(window_size(PhysicalSize::new(1920, 1080)), Size2D::new(1920, 1080));
        assert!(window_size(PhysicalSize::new(0, 0)).is_empty());
        assert_eq!(window_size(PhysicalSize::new(u32::MAX, 1)).width, i32::MAX);
    }
}
