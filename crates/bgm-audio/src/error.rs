//! Error types for the audio module.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status returned by a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// Unspecified failure.
    Fail,

    /// Subsystem the call depends on is not initialized.
    NotInitialized,

    /// Subsystem is already initialized.
    AlreadyInitialized,

    /// A parameter was rejected.
    InvalidParameter,

    /// A memory pool could not be allocated.
    InsufficientMemory,

    /// A file could not be found.
    FileNotFound,

    /// A bank could not be read or parsed.
    BankReadError,

    /// Unknown game object, bank or output.
    IdNotFound,

    /// The output device is not ready or not supported.
    DeviceNotReady,
}

impl StatusCode {
    /// Numeric status code, as logged in diagnostics.
    pub fn code(self) -> i32 {
        match self {
            Self::Fail => 2,
            Self::NotInitialized => 3,
            Self::AlreadyInitialized => 4,
            Self::InvalidParameter => 31,
            Self::InsufficientMemory => 52,
            Self::FileNotFound => 66,
            Self::BankReadError => 64,
            Self::IdNotFound => 15,
            Self::DeviceNotReady => 63,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Errors that can occur during audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// A backend call returned a failure status.
    #[error("{operation} returned {status}")]
    Backend {
        operation: &'static str,
        status: StatusCode,
    },

    /// A sound bank could not be loaded.
    #[error("Cannot load {bank}: {status}")]
    BankLoad { bank: String, status: StatusCode },

    /// Routing request violates the routing policy.
    #[error("Routing error: {0}")]
    Routing(String),
}

impl AudioError {
    /// Wrap a backend status for the named operation.
    pub fn backend(operation: &'static str, status: StatusCode) -> Self {
        Self::Backend { operation, status }
    }

    /// The backend status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Backend { status, .. } | Self::BankLoad { status, .. } => Some(*status),
            Self::Routing(_) => None,
        }
    }
}
