//! Commands sent from the host to the engine loop.

use serde::{Deserialize, Serialize};

use crate::state::ToggleControl;

/// Commands that the host can send to the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostCommand {
    /// Activate the background music scene.
    ActivateScene,

    /// Deactivate the background music scene and release its registrations.
    DeactivateScene,

    /// A play/stop button was pressed.
    Toggle(ToggleControl),

    /// Request current scene state and engine statistics.
    GetState,

    /// Terminate the engine and stop the loop.
    Shutdown,
}
