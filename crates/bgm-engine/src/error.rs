//! Error types for the engine module.

use thiserror::Error;

use bgm_audio::{AudioError, StatusCode};
use bgm_ipc::InitPhase;

/// Errors that can occur while bringing the audio engine up.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Platform settings are unusable.
    #[error("Platform configuration failed: {0}")]
    PlatformConfig(String),

    /// A mandatory subsystem failed to initialize.
    #[error("{phase} initialization failed: {status}", phase = .subsystem.name())]
    SubsystemInit {
        subsystem: InitPhase,
        status: StatusCode,
    },

    /// The initialization bank could not be loaded.
    #[error("Cannot load {bank}: {status}")]
    BankLoad { bank: String, status: StatusCode },

    /// `init` called on a live engine.
    #[error("Audio engine already initialized")]
    AlreadyInitialized,
}

impl EngineError {
    /// The backend status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::SubsystemInit { status, .. } | Self::BankLoad { status, .. } => Some(*status),
            Self::PlatformConfig(_) | Self::AlreadyInitialized => None,
        }
    }
}

/// Errors that can occur in the background music scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene needs a live audio engine.
    #[error("Audio engine not initialized")]
    EngineNotInitialized,

    /// The scene's bank could not be loaded.
    #[error("Cannot load {bank}: {status}")]
    BankLoad { bank: String, status: StatusCode },

    /// Registration or routing setup failed.
    #[error("Scene setup failed: {0}")]
    Setup(#[from] AudioError),

    /// Toggle received while the scene is inactive.
    #[error("Scene is not active")]
    NotActive,
}
