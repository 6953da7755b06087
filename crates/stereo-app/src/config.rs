// SPDX-License-Identifier: CEPL-1.0
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use stereo_compose::{CompositorConfig, ViewerKind};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ViewerChoice {
    Cardboard,
    #[default]
    Daydream,
    /// Reports a viewer type the compositor does not know.
    Unknown,
}

impl ViewerChoice {
    pub fn kind(self) -> ViewerKind {
        match self {
            ViewerChoice::Cardboard => ViewerKind::Cardboard,
            ViewerChoice::Daydream => ViewerKind::Daydream,
            ViewerChoice::Unknown => ViewerKind::Unrecognized(-1),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowCfg {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
}

/// The simulated headset.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ViewerCfg {
    #[serde(default)]
    pub kind: ViewerChoice,
    #[serde(default)]
    pub multiview: bool,
    #[serde(default = "default_ipd")]
    pub ipd_m: f32,
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    /// Head yaw speed in radians per second.
    #[serde(default = "default_yaw_rate")]
    pub yaw_rate: f32,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct AppCfg {
    #[serde(default)]
    pub window: WindowCfg,
    #[serde(default)]
    pub viewer: ViewerCfg,
    #[serde(default)]
    pub compositor: CompositorConfig,
    /// Directory the audio engine loads from; none skips the check.
    #[serde(default)]
    pub audio_assets: Option<PathBuf>,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            vsync: true,
        }
    }
}

impl Default for ViewerCfg {
    fn default() -> Self {
        ViewerCfg {
            kind: ViewerChoice::default(),
            multiview: false,
            ipd_m: default_ipd(),
            fov_degrees: default_fov(),
            yaw_rate: default_yaw_rate(),
        }
    }
}

impl AppCfg {
    /// Command-line flags win over the file.
    pub fn apply_overrides(&mut self, viewer: Option<ViewerChoice>, multiview: bool) {
        if let Some(kind) = viewer {
            self.viewer.kind = kind;
        }
        if multiview {
            self.viewer.multiview = true;
        }
    }
}

fn default_title() -> String {
    "stereo".into()
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}
fn default_ipd() -> f32 {
    0.064
}
fn default_fov() -> f32 {
    45.0
}
fn default_yaw_rate() -> f32 {
    0.25
}

pub fn parse_cfg(s: &str) -> Result<AppCfg, toml::de::Error> {
    toml::from_str::<AppCfg>(s)
}

pub fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s).unwrap_or_else(|e| {
            warn!("{}: {e}; using defaults", path.display());
            AppCfg::default()
        }),
        Err(_) => AppCfg::default(),
    }
}
