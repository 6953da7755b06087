// SPDX-License-Identifier: CEPL-1.0
use serde::Deserialize;
use stereo_math::Size2D;

use crate::pose::DEFAULT_PREDICTION_LATENCY_NANOS;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CompositorConfig {
    /// Motion-to-photon budget added to "now" before sampling the head pose.
    #[serde(default = "default_latency")]
    pub prediction_latency_ns: u64,
    #[serde(default = "default_overlay_size")]
    pub overlay_size: [i32; 2],
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default = "default_true")]
    pub depth: bool,
    #[serde(default = "default_true")]
    pub allow_multiview: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        CompositorConfig {
            prediction_latency_ns: default_latency(),
            overlay_size: default_overlay_size(),
            samples: default_samples(),
            depth: true,
            allow_multiview: true,
        }
    }
}

impl CompositorConfig {
    pub fn overlay_size(&self) -> Size2D {
        Size2D::new(self.overlay_size[0], self.overlay_size[1])
    }
}

fn default_latency() -> u64 {
    DEFAULT_PREDICTION_LATENCY_NANOS
}
fn default_overlay_size() -> [i32; 2] {
    [128, 128]
}
// 2x MSAA makes up for shading roughly half the pixels.
fn default_samples() -> u32 {
    2
}
fn default_true() -> bool {
    true
}
