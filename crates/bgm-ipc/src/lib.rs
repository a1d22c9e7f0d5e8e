//! Typed host<->engine messages for the BGM router.
//!
//! This crate defines the message, state and configuration types shared
//! between the host application loop and the audio engine facade.

mod commands;
mod events;
mod state;
mod types;

pub use commands::HostCommand;
pub use events::HostEvent;
pub use state::{InitPhase, SceneState, ToggleControl};
pub use types::{
    Capabilities, DeviceSettings, EngineConfig, EngineStatsSnapshot, GameObjectId, InitSettings,
    MemorySettings, MusicSettings, PathSettings, SceneConfig, StreamSettings,
    DEFAULT_LISTENER_ID, NON_RECORDABLE_EMITTER_ID, RECORDABLE_EMITTER_ID,
    SECONDARY_LISTENER_ID,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (host → engine).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (engine → host).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<HostCommand>, Receiver<HostCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<HostEvent>, Receiver<HostEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
