// SPDX-License-Identifier: CEPL-1.0
use anyhow::{bail, Result};
use std::path::PathBuf;
use stereo_compose::AudioEngine;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioState {
    Loading,
    Playing,
    Paused,
}

/// Stand-in spatial audio engine: checks its asset directory and logs
/// transitions.
pub struct LoggingAudio {
    assets: Option<PathBuf>,
    state: AudioState,
}

impl LoggingAudio {
    pub fn new(assets: Option<PathBuf>) -> Self {
        Self {
            assets,
            state: AudioState::Loading,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }
}

impl AudioEngine for LoggingAudio {
    fn initialize(&mut self) -> Result<()> {
        if let Some(dir) = &self.assets {
            if !dir.is_dir() {
                bail!("audio assets not found at {}", dir.display());
            }
            debug!("audio assets at {}", dir.display());
        }
        if self.state == AudioState::Loading {
            self.state = AudioState::Playing;
        }
        info!("audio engine ready");
        Ok(())
    }

    fn pause(&mut self) {
        self.state = AudioState::Paused;
        info!("audio paused");
    }

    fn resume(&mut self) {
        self.state = AudioState::Playing;
        info!("audio resumed");
    }
}
