// SPDX-License-Identifier: CEPL-1.0
use tracing::{debug, error, info};

use crate::controller::{
    Buttons, Controller, ControllerSource, ControllerState, InputEvent, InputSource,
};
use crate::error::ComposeError;
use crate::platform::{with_audio, SharedAudio, TrackingPlatform, ViewerKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Active,
    Paused,
}

/// Keeps tracking, audio and the optional controller in step with the
/// session's pause state. Transitions are synchronous with the render
/// thread: no frame may be in flight while one runs.
pub struct Lifecycle {
    state: LifecycleState,
    viewer_kind: ViewerKind,
    audio: SharedAudio,
    controllers: Box<dyn ControllerSource>,
    controller: Option<Box<dyn Controller>>,
    controller_state: ControllerState,
}

impl Lifecycle {
    /// Fails if the viewer needs a controller and it cannot be brought up.
    pub fn new(
        viewer_kind: ViewerKind,
        audio: SharedAudio,
        controllers: Box<dyn ControllerSource>,
    ) -> Result<Self, ComposeError> {
        match viewer_kind {
            ViewerKind::Unrecognized(_) => error!("Unexpected viewer type: {viewer_kind}"),
            _ => info!("Viewer type: {viewer_kind}"),
        }

        let mut lifecycle = Self {
            state: LifecycleState::Active,
            viewer_kind,
            audio,
            controllers,
            controller: None,
            controller_state: ControllerState::default(),
        };
        lifecycle.resume_controller_as_needed()?;
        Ok(lifecycle)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == LifecycleState::Paused
    }

    pub fn viewer_kind(&self) -> ViewerKind {
        self.viewer_kind
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some()
    }

    pub fn controller_state(&self) -> &ControllerState {
        &self.controller_state
    }

    pub fn pause<P>(&mut self, platform: &mut P)
    where
        P: TrackingPlatform + ?Sized,
    {
        if self.is_paused() {
            debug!("pause ignored: already paused");
            return;
        }
        platform.pause_tracking();
        with_audio(&self.audio, |audio| audio.pause());
        if let Some(controller) = self.controller.as_mut() {
            controller.pause();
        }
        self.state = LifecycleState::Paused;
        info!("session paused");
    }

    /// The viewer may have been swapped while paused, so calibration and
    /// viewer kind are re-read.
    pub fn resume<P>(&mut self, platform: &mut P)
    where
        P: TrackingPlatform + ?Sized,
    {
        if !self.is_paused() {
            debug!("resume ignored: already active");
            return;
        }
        platform.resume_tracking();
        platform.refresh_viewer_profile();
        with_audio(&self.audio, |audio| audio.resume());

        let viewer_kind = platform.viewer_kind();
        if viewer_kind != self.viewer_kind {
            info!("viewer changed: {} -> {viewer_kind}", self.viewer_kind);
        }
        self.viewer_kind = viewer_kind;
        if let Err(err) = self.resume_controller_as_needed() {
            error!("continuing without controller: {err}");
        }

        self.state = LifecycleState::Active;
        info!("session resumed");
    }

    /// Cardboard drops the controller; Daydream creates it once and resumes
    /// it.
    fn resume_controller_as_needed(&mut self) -> Result<(), ComposeError> {
        match self.viewer_kind {
            ViewerKind::Cardboard => {
                if self.controller.take().is_some() {
                    info!("controller released");
                }
            }
            ViewerKind::Daydream => {
                let controller = match self.controller.take() {
                    Some(controller) => controller,
                    None => {
                        let controller = self
                            .controllers
                            .init()
                            .map_err(ComposeError::ControllerInit)?;
                        info!("controller initialized");
                        controller
                    }
                };
                self.controller.insert(controller).resume();
            }
            ViewerKind::Unrecognized(_) => {
                error!("unexpected viewer type {}; controller left as is", self.viewer_kind);
            }
        }
        Ok(())
    }
}

impl InputSource for Lifecycle {
    fn poll_input(&mut self) -> Option<InputEvent> {
        let controller = self.controller.as_mut()?;
        let old_status = self.controller_state.api_status;
        let old_connection = self.controller_state.connection_state;

        controller.update(&mut self.controller_state);

        let state = &self.controller_state;
        if state.api_status != old_status || state.connection_state != old_connection {
            info!(
                "controller API status: {}, connection state: {}",
                state.api_status, state.connection_state
            );
        }

        state
            .buttons_down
            .intersects(Buttons::PRIMARY_ACTION)
            .then_some(InputEvent::PrimaryAction)
    }
}
