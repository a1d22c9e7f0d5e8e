//! Sound engine backend seam and output routing.
//!
//! This crate abstracts the audio middleware behind [`SoundEngineBackend`],
//! ships an in-process [`SimulatedBackend`] used by the demo and the tests,
//! and implements the routing policy that keeps non-recordable music off
//! the recordable output.

mod backend;
mod error;
mod routing;
mod simulated;

pub use backend::{BankId, OutputFlags, OutputType, PlayingId, SoundEngineBackend};
pub use error::{AudioError, StatusCode};
pub use routing::OutputRouting;
pub use simulated::{FaultPoint, SimulatedBackend, SimulatedProbe};

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Result type for raw backend calls.
pub type BackendResult<T> = Result<T, StatusCode>;

/// Device id passed when adding a secondary output; ignored for BGM outputs.
pub const BGM_OUTPUT_DEVICE_ID: u32 = 0;
