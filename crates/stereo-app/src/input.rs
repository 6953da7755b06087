// SPDX-License-Identifier: CEPL-1.0
use anyhow::Result;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use stereo_compose::{
    Buttons, ConnectionState, Controller, ControllerApiStatus, ControllerSource, ControllerState,
};

/// Presses collected from window events, drained once per frame.
#[derive(Clone, Default)]
pub struct KeyboardInput(Arc<AtomicU32>);

impl KeyboardInput {
    pub fn press(&self, buttons: Buttons) {
        self.0.fetch_or(buttons.bits(), Ordering::Relaxed);
    }

    fn take(&self) -> Buttons {
        Buttons::from_bits_truncate(self.0.swap(0, Ordering::Relaxed))
    }
}

pub struct KeyboardControllerSource {
    input: KeyboardInput,
}

impl KeyboardControllerSource {
    pub fn new(input: KeyboardInput) -> Self {
        Self { input }
    }
}

impl ControllerSource for KeyboardControllerSource {
    fn init(&mut self) -> Result<Box<dyn Controller>> {
        Ok(Box::new(KeyboardController {
            input: self.input.clone(),
            paused: false,
        }))
    }
}

/// The keyboard standing in for a handheld controller.
pub struct KeyboardController {
    input: KeyboardInput,
    paused: bool,
}

impl Controller for KeyboardController {
    fn update(&mut self, state: &mut ControllerState) {
        let pressed = self.input.take();
        state.api_status = ControllerApiStatus::Ok;
        if self.paused {
            state.connection_state = ConnectionState::Disconnected;
            state.buttons_down = Buttons::empty();
        } else {
            state.connection_state = ConnectionState::Connected;
            state.buttons_down = pressed;
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
        self.input.take();
    }
}
