//! Events sent from the engine loop to the host.

use serde::{Deserialize, Serialize};

use crate::state::{SceneState, ToggleControl};
use crate::types::EngineStatsSnapshot;

/// Events that the engine loop can send to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostEvent {
    /// Engine initialized and the loop is running.
    Ready {
        /// Whether the authoring-tool communication channel came up.
        communication: bool,
    },

    /// Engine initialization failed; the loop exits.
    InitFailed {
        /// Diagnostic message.
        message: String,
    },

    /// Scene state has changed.
    SceneStateChanged {
        /// Previous state.
        previous: SceneState,

        /// Current state.
        current: SceneState,
    },

    /// A button label must be redrawn.
    LabelChanged {
        /// Button whose label changed.
        control: ToggleControl,

        /// New label text.
        text: String,
    },

    /// Response to `GetState`.
    Status {
        /// Current scene state.
        scene: SceneState,

        /// Engine counters.
        stats: EngineStatsSnapshot,
    },

    /// Message the host should present to the user (message box).
    UserMessage {
        /// Dialog title.
        title: String,

        /// Dialog body.
        text: String,
    },

    /// Error occurred.
    Error {
        /// Whether the loop keeps running.
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Engine has shut down.
    Shutdown,
}
