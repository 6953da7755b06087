// SPDX-License-Identifier: CEPL-1.0
//! Collaborators the compositor drives but does not own the implementation of.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use stereo_math::{Size2D, Transform4x4};
use stereo_render::{BufferViewportList, Eye};

/// Monotonic timestamp in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePoint {
    nanos: u64,
}

impl TimePoint {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub fn as_nanos(self) -> u64 {
        self.nanos
    }

    pub fn add_nanos(self, nanos: u64) -> Self {
        Self {
            nanos: self.nanos.saturating_add(nanos),
        }
    }

    /// Seconds elapsed since `earlier`; zero if the clock went backwards.
    pub fn seconds_since(self, earlier: TimePoint) -> f32 {
        (self.nanos.saturating_sub(earlier.nanos) as f64 * 1e-9) as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerKind {
    Cardboard,
    Daydream,
    /// Raw value reported by a platform this build does not know about.
    Unrecognized(i32),
}

impl ViewerKind {
    pub fn is_recognized(self) -> bool {
        !matches!(self, ViewerKind::Unrecognized(_))
    }
}

impl fmt::Display for ViewerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerKind::Cardboard => f.write_str("CARDBOARD"),
            ViewerKind::Daydream => f.write_str("DAYDREAM"),
            ViewerKind::Unrecognized(raw) => write!(f, "UNKNOWN({raw})"),
        }
    }
}

/// Head tracking and display calibration.
pub trait TrackingPlatform {
    fn now(&self) -> TimePoint;
    fn maximum_effective_render_target_size(&self) -> Size2D;
    fn recommended_viewports(&self) -> BufferViewportList;
    /// Head-from-start-space transform extrapolated to `at`. `None` while
    /// tracking has nothing to report.
    fn head_from_start_space(&self, at: TimePoint) -> Option<Transform4x4>;
    fn eye_from_head(&self, eye: Eye) -> Transform4x4;
    fn pause_tracking(&mut self);
    fn resume_tracking(&mut self);
    fn refresh_viewer_profile(&mut self);
    fn supports_multiview(&self) -> bool;
    fn viewer_kind(&self) -> ViewerKind;
}

pub trait AudioEngine: Send {
    /// Runs once on the initialization thread.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    fn pause(&mut self);
    fn resume(&mut self);
}

pub type SharedAudio = Arc<Mutex<dyn AudioEngine>>;

pub(crate) fn with_audio<R>(audio: &SharedAudio, f: impl FnOnce(&mut dyn AudioEngine) -> R) -> R {
    let mut guard = audio.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *guard)
}
