// SPDX-License-Identifier: CEPL-1.0
//! Per-frame composition of a stereo VR scene: pose prediction, per-eye
//! viewports, adaptive render-target sizing and frame submission.

pub mod compositor;
pub mod config;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod platform;
pub mod pose;
pub mod session;
pub mod sizer;
pub mod viewport;

pub use compositor::{FrameCompositor, FrameOutcome, RenderTargetSet};
pub use config::CompositorConfig;
pub use controller::{
    Buttons, ConnectionState, Controller, ControllerApiStatus, ControllerSource, ControllerState,
    InputEvent, InputSource, NoInput,
};
pub use error::ComposeError;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use platform::{AudioEngine, SharedAudio, TimePoint, TrackingPlatform, ViewerKind};
pub use pose::HeadPoseEstimator;
pub use session::{Session, SessionHandle, SessionParts, SessionRegistry};
pub use sizer::FramebufferSizer;
pub use viewport::{ViewMode, ViewportManager};
