// SPDX-License-Identifier: CEPL-1.0
use std::ops::{Index, IndexMut};
use stereo_math::{FieldOfView, UvRect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Left = 0,
    Right = 1,
}

impl Eye {
    /// Paired arrays are always indexed in this order.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// How one eye samples the rendered target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferViewport {
    pub source_fov: FieldOfView,
    pub source_uv: UvRect,
    pub source_layer: u32,
}

impl Default for BufferViewport {
    fn default() -> Self {
        Self {
            source_fov: FieldOfView::default(),
            source_uv: UvRect::FULL,
            source_layer: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BufferViewportList {
    viewports: [BufferViewport; 2],
}

impl BufferViewportList {
    pub fn new(left: BufferViewport, right: BufferViewport) -> Self {
        Self {
            viewports: [left, right],
        }
    }

    pub fn get(&self, eye: Eye) -> &BufferViewport {
        &self.viewports[eye.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Eye, &BufferViewport)> {
        Eye::BOTH.into_iter().zip(self.viewports.iter())
    }
}

impl Index<Eye> for BufferViewportList {
    type Output = BufferViewport;

    fn index(&self, eye: Eye) -> &BufferViewport {
        self.get(eye)
    }
}

impl IndexMut<Eye> for BufferViewportList {
    fn index_mut(&mut self, eye: Eye) -> &mut BufferViewport {
        &mut self.viewports[eye.index()]
    }
}
