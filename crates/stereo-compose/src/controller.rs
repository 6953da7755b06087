// SPDX-License-Identifier: CEPL-1.0
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Buttons that went down since the previous update.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Buttons: u32 {
        const CLICK = 1 << 0;
        const HOME = 1 << 1;
        const APP = 1 << 2;
        const VOLUME_UP = 1 << 3;
        const VOLUME_DOWN = 1 << 4;
    }
}

impl Buttons {
    pub const PRIMARY_ACTION: Buttons = Buttons::APP.union(Buttons::CLICK);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControllerApiStatus {
    Ok,
    Unsupported,
    NotAuthorized,
    #[default]
    Unavailable,
    ServiceObsolete,
    ClientObsolete,
    Malfunction,
}

impl fmt::Display for ControllerApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerApiStatus::Ok => "ok",
            ControllerApiStatus::Unsupported => "unsupported",
            ControllerApiStatus::NotAuthorized => "not_authorized",
            ControllerApiStatus::Unavailable => "unavailable",
            ControllerApiStatus::ServiceObsolete => "service_obsolete",
            ControllerApiStatus::ClientObsolete => "client_obsolete",
            ControllerApiStatus::Malfunction => "malfunction",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Scanning => "scanning",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        })
    }
}

/// Latest controller snapshot, refreshed once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub api_status: ControllerApiStatus,
    pub connection_state: ConnectionState,
    pub buttons_down: Buttons,
}

pub trait Controller: Send {
    fn update(&mut self, state: &mut ControllerState);
    fn pause(&mut self);
    fn resume(&mut self);
}

/// Creates the controller subsystem for viewers that ship one. Sessions
/// own their source, so it moves with the session between threads.
pub trait ControllerSource: Send {
    fn init(&mut self) -> anyhow::Result<Box<dyn Controller>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    PrimaryAction,
}

/// Polled once at the start of every frame, on the render thread.
pub trait InputSource {
    fn poll_input(&mut self) -> Option<InputEvent>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll_input(&mut self) -> Option<InputEvent> {
        None
    }
}
