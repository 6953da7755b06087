// SPDX-License-Identifier: CEPL-1.0
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("graphics not initialized")]
    NotInitialized,
    #[error("failed to acquire swapchain frame: {0:#}")]
    AcquireFrame(anyhow::Error),
    #[error("failed to resize primary render target: {0:#}")]
    Resize(anyhow::Error),
    #[error("graphics setup failed: {0:#}")]
    Graphics(anyhow::Error),
    #[error("controller subsystem failed to initialize: {0:#}")]
    ControllerInit(anyhow::Error),
    #[error("scene failed to initialize: {0:#}")]
    SceneInit(anyhow::Error),
}
