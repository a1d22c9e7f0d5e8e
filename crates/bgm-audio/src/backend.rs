//! The audio middleware seam.

use std::path::Path;

use serde::{Deserialize, Serialize};

use bgm_ipc::{
    DeviceSettings, GameObjectId, InitSettings, MemorySettings, MusicSettings, StreamSettings,
};

use crate::BackendResult;

/// Identifier of a loaded sound bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankId(pub u32);

/// Identifier of a playing event instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayingId(pub u32);

impl PlayingId {
    /// Returned when an event could not be posted.
    pub const INVALID: Self = Self(0);

    /// Whether the post produced a playing instance.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Kind of platform output endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputType {
    /// Main output; captured by OS recording features.
    Main,

    /// Console background-music endpoint.
    Bgm,
}

/// Flags applied to a secondary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFlags {
    /// Default behavior.
    Default,

    /// Output is excluded from OS recording (DVR).
    NotRecordable,
}

/// Trait implemented by sound engine backends.
///
/// Mirrors the subsystem surface of the audio middleware: each subsystem has
/// an init call returning a status, a liveness query where the middleware
/// offers one, and an infallible terminate call. Callers are responsible for
/// ordering.
pub trait SoundEngineBackend: Send {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    fn init_memory_manager(&mut self, settings: &MemorySettings) -> BackendResult<()>;
    fn is_memory_manager_initialized(&self) -> bool;
    fn term_memory_manager(&mut self);

    fn create_stream_manager(&mut self, settings: &StreamSettings) -> BackendResult<()>;
    fn has_stream_manager(&self) -> bool;
    fn destroy_stream_manager(&mut self);

    /// Create the blocking low-level I/O device inside the stream manager.
    fn init_low_level_io(&mut self, settings: &DeviceSettings) -> BackendResult<()>;
    fn term_low_level_io(&mut self);

    /// Set where the I/O device resolves bank files.
    fn set_bank_paths(&mut self, base_path: &Path, language_dir: Option<&Path>)
        -> BackendResult<()>;

    fn set_current_language(&mut self, language: &str) -> BackendResult<()>;

    fn init_sound_engine(&mut self, settings: &InitSettings) -> BackendResult<()>;
    fn is_sound_engine_initialized(&self) -> bool;
    fn term_sound_engine(&mut self);

    fn init_music_engine(&mut self, settings: &MusicSettings) -> BackendResult<()>;
    fn term_music_engine(&mut self);

    fn init_communication(&mut self, app_network_name: &str) -> BackendResult<()>;
    fn term_communication(&mut self);

    fn load_bank(&mut self, name: &str) -> BackendResult<BankId>;
    fn unload_bank(&mut self, name: &str) -> BackendResult<()>;

    fn register_game_object(&mut self, id: GameObjectId, name: &str) -> BackendResult<()>;
    fn unregister_game_object(&mut self, id: GameObjectId) -> BackendResult<()>;

    /// Listeners used by every emitter without an explicit listener set.
    fn set_default_listeners(&mut self, listeners: &[GameObjectId]) -> BackendResult<()>;

    /// Override the listener set of one emitter.
    fn set_listeners(&mut self, emitter: GameObjectId, listeners: &[GameObjectId])
        -> BackendResult<()>;

    fn add_secondary_output(
        &mut self,
        device_id: u32,
        output: OutputType,
        listeners: &[GameObjectId],
        flags: OutputFlags,
    ) -> BackendResult<()>;

    fn remove_secondary_output(&mut self, device_id: u32, output: OutputType)
        -> BackendResult<()>;

    /// Post a named event on an emitter.
    ///
    /// Unknown events and unregistered emitters yield [`PlayingId::INVALID`].
    fn post_event(&mut self, event: &str, emitter: GameObjectId) -> PlayingId;

    /// Stop every sound, or only those playing on `scope`.
    fn stop_all(&mut self, scope: Option<GameObjectId>);

    /// Render one frame of audio.
    fn render_audio(&mut self) -> BackendResult<()>;
}
