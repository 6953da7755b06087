// SPDX-License-Identifier: CEPL-1.0
use stereo_math::Transform4x4;

use crate::platform::{TimePoint, TrackingPlatform};

/// Time between submitting a frame without vsync and its photons reaching
/// the display.
pub const DEFAULT_PREDICTION_LATENCY_NANOS: u64 = 50_000_000;

/// Extrapolates the head pose to when the frame will actually be seen.
#[derive(Clone, Copy, Debug)]
pub struct HeadPoseEstimator {
    latency_nanos: u64,
}

impl Default for HeadPoseEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_PREDICTION_LATENCY_NANOS)
    }
}

impl HeadPoseEstimator {
    pub fn new(latency_nanos: u64) -> Self {
        Self { latency_nanos }
    }

    pub fn target_time(&self, now: TimePoint) -> TimePoint {
        now.add_nanos(self.latency_nanos)
    }

    /// `None` when tracking has no pose; the caller keeps its last one.
    pub fn predict<P>(&self, platform: &P, now: TimePoint) -> Option<Transform4x4>
    where
        P: TrackingPlatform + ?Sized,
    {
        platform.head_from_start_space(self.target_time(now))
    }
}
