//! Common types used across host messages and configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of a game object registered with the sound engine.
///
/// Emitters and listeners share this identity space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameObjectId(pub u64);

impl fmt::Display for GameObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Listener registered at engine init and used as the default listener set.
pub const DEFAULT_LISTENER_ID: GameObjectId = GameObjectId(10000);

/// Listener tied to the non-recordable secondary output.
pub const SECONDARY_LISTENER_ID: GameObjectId = GameObjectId(10001);

/// Emitter for music that may be captured by OS recording.
pub const RECORDABLE_EMITTER_ID: GameObjectId = GameObjectId(10);

/// Emitter for music that must never reach a recordable output.
pub const NON_RECORDABLE_EMITTER_ID: GameObjectId = GameObjectId(20);

/// Memory manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Maximum number of memory pools.
    pub max_num_pools: u32,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self { max_num_pools: 20 }
    }
}

/// Stream manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Size of the stream manager's own pool in bytes.
    pub memory_size: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            memory_size: 64 * 1024,
        }
    }
}

/// Low-level I/O streaming device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// I/O buffer memory in bytes; must be a multiple of `granularity`.
    pub io_memory_size: u32,

    /// I/O request granularity in bytes.
    pub granularity: u32,

    /// Maximum number of concurrent I/O transfers.
    pub max_concurrent_io: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            io_memory_size: 2 * 1024 * 1024,
            granularity: 16 * 1024,
            max_concurrent_io: 8,
        }
    }
}

/// Core sound engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitSettings {
    /// Default pool size in bytes.
    pub default_pool_size: u32,

    /// Lower engine (mixer) pool size in bytes.
    pub lower_engine_pool_size: u32,
}

impl Default for InitSettings {
    fn default() -> Self {
        Self {
            default_pool_size: 2 * 1024 * 1024,
            lower_engine_pool_size: 1024 * 1024,
        }
    }
}

/// Music layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    /// Multiplier applied to the streaming look-ahead of music tracks.
    pub streaming_look_ahead_ratio: f32,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            streaming_look_ahead_ratio: 1.0,
        }
    }
}

/// Where sound banks are looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Base directory for bank files.
    pub base_path: PathBuf,

    /// Directory, relative to `base_path`, holding language-specific banks.
    pub language_dir: Option<PathBuf>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("GeneratedSoundBanks"),
            language_dir: None,
        }
    }
}

/// Optional platform and build capabilities, resolved at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Try to open the authoring-tool communication channel.
    pub communication: bool,

    /// Platform exposes a distinct non-recordable audio output.
    pub secondary_output: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            communication: cfg!(debug_assertions),
            secondary_output: false,
        }
    }
}

/// Configuration for initializing the audio engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub memory: MemorySettings,
    pub stream: StreamSettings,
    pub device: DeviceSettings,
    pub init: InitSettings,
    pub music: MusicSettings,
    pub paths: PathSettings,

    /// Current language used to resolve localized assets.
    pub language: String,

    /// Bank loaded as the last step of initialization.
    pub init_bank: String,

    pub capabilities: Capabilities,

    /// Name announced on the communication channel.
    pub app_network_name: String,

    /// Listener registered at init and used as the default listener set.
    pub default_listener: GameObjectId,

    /// Host frame interval in milliseconds (one `update` per frame).
    pub frame_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory: MemorySettings::default(),
            stream: StreamSettings::default(),
            device: DeviceSettings::default(),
            init: InitSettings::default(),
            music: MusicSettings::default(),
            paths: PathSettings::default(),
            language: "English(US)".to_string(),
            init_bank: "Init.bnk".to_string(),
            capabilities: Capabilities::default(),
            app_network_name: "BGM Router Demo".to_string(),
            default_listener: DEFAULT_LISTENER_ID,
            frame_interval_ms: 16,
        }
    }
}

/// Configuration for the background music scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Scene title.
    pub title: String,

    /// Scene description shown under the title.
    pub description: String,

    /// Bank holding the music events.
    pub bank: String,

    pub recordable_emitter: GameObjectId,
    pub non_recordable_emitter: GameObjectId,

    /// Listener tied to the non-recordable output.
    pub secondary_listener: GameObjectId,

    pub recordable_event: String,
    pub non_recordable_event: String,

    pub recordable_label: String,
    pub non_recordable_label: String,

    /// Label shown while a control is playing.
    pub stop_label: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            title: "Background Music Demo".to_string(),
            description: "This demo shows how to setup the background music so the DVR \
                          doesn't record it. This is necessary on platforms that support \
                          recording features (DVR) and enforce the proper use of licensed \
                          music. Both streams will be muted when the OS-provided music \
                          player starts."
                .to_string(),
            bank: "BGM.bnk".to_string(),
            recordable_emitter: RECORDABLE_EMITTER_ID,
            non_recordable_emitter: NON_RECORDABLE_EMITTER_ID,
            secondary_listener: SECONDARY_LISTENER_ID,
            recordable_event: "Play_RecordableMusic".to_string(),
            non_recordable_event: "Play_NonRecordableMusic".to_string(),
            recordable_label: "Play recordable music".to_string(),
            non_recordable_label: "Play non-recordable music".to_string(),
            stop_label: "Stop".to_string(),
        }
    }
}

/// Snapshot of engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatsSnapshot {
    /// Number of `update` calls that rendered audio.
    pub frames_rendered: u64,

    /// Number of play events posted.
    pub events_posted: u64,

    /// Number of stop requests issued.
    pub stop_requests: u64,

    /// Number of failed initialization attempts.
    pub init_failures: u64,
}
