//! Engine lifecycle and scene state machine types.

use serde::{Deserialize, Serialize};

/// The current state of the background music scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneState {
    /// Scene is not active; nothing is registered with the engine.
    #[default]
    Inactive,

    /// Scene is active: bank loaded, emitters registered, routing configured.
    Active {
        /// Recordable music is playing.
        recordable: bool,

        /// Non-recordable music is playing.
        non_recordable: bool,
    },
}

impl SceneState {
    /// Active with nothing playing.
    pub const BANK_LOADED: Self = Self::Active {
        recordable: false,
        non_recordable: false,
    };

    /// Returns true if the scene is active.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Returns true if the given control is currently playing.
    pub fn is_playing(&self, control: ToggleControl) -> bool {
        match (self, control) {
            (Self::Active { recordable, .. }, ToggleControl::Recordable) => *recordable,
            (Self::Active { non_recordable, .. }, ToggleControl::NonRecordable) => *non_recordable,
            (Self::Inactive, _) => false,
        }
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Active {
                recordable: false,
                non_recordable: false,
            } => "BankLoaded",
            Self::Active {
                recordable: true,
                non_recordable: false,
            } => "Playing(Recordable)",
            Self::Active {
                recordable: false,
                non_recordable: true,
            } => "Playing(NonRecordable)",
            Self::Active {
                recordable: true,
                non_recordable: true,
            } => "Playing(Both)",
        }
    }
}

/// The two play/stop buttons of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToggleControl {
    /// Music routed to the main, recordable output.
    Recordable,

    /// Music routed only to the secondary, non-recordable output.
    NonRecordable,
}

impl ToggleControl {
    /// Both controls, in display order.
    pub const ALL: [Self; 2] = [Self::Recordable, Self::NonRecordable];
}

/// Engine initialization phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitPhase {
    /// Validating platform settings.
    ConfigurePlatform,

    /// Initializing the memory manager.
    MemoryManager,

    /// Creating the stream manager.
    StreamManager,

    /// Initializing the low-level I/O device.
    LowLevelIo,

    /// Initializing the core sound engine.
    SoundEngine,

    /// Initializing the music layer.
    MusicEngine,

    /// Opening the authoring-tool communication channel (optional).
    Communication,

    /// Registering the default listener.
    DefaultListener,

    /// Configuring the sound bank search paths.
    SoundBankPaths,

    /// Selecting the current language.
    Language,

    /// Loading the initialization bank.
    InitBank,
}

impl InitPhase {
    /// First phase of initialization.
    pub const FIRST: Self = Self::ConfigurePlatform;

    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::ConfigurePlatform => Some(Self::MemoryManager),
            Self::MemoryManager => Some(Self::StreamManager),
            Self::StreamManager => Some(Self::LowLevelIo),
            Self::LowLevelIo => Some(Self::SoundEngine),
            Self::SoundEngine => Some(Self::MusicEngine),
            Self::MusicEngine => Some(Self::Communication),
            Self::Communication => Some(Self::DefaultListener),
            Self::DefaultListener => Some(Self::SoundBankPaths),
            Self::SoundBankPaths => Some(Self::Language),
            Self::Language => Some(Self::InitBank),
            Self::InitBank => None,
        }
    }

    /// Returns the previous phase, if any (for rollback).
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::ConfigurePlatform => None,
            Self::MemoryManager => Some(Self::ConfigurePlatform),
            Self::StreamManager => Some(Self::MemoryManager),
            Self::LowLevelIo => Some(Self::StreamManager),
            Self::SoundEngine => Some(Self::LowLevelIo),
            Self::MusicEngine => Some(Self::SoundEngine),
            Self::Communication => Some(Self::MusicEngine),
            Self::DefaultListener => Some(Self::Communication),
            Self::SoundBankPaths => Some(Self::DefaultListener),
            Self::Language => Some(Self::SoundBankPaths),
            Self::InitBank => Some(Self::Language),
        }
    }

    /// Whether a failure in this phase aborts initialization.
    pub fn is_mandatory(self) -> bool {
        !matches!(self, Self::Communication)
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::ConfigurePlatform => "platform configuration",
            Self::MemoryManager => "memory manager",
            Self::StreamManager => "stream manager",
            Self::LowLevelIo => "low-level I/O",
            Self::SoundEngine => "sound engine",
            Self::MusicEngine => "music engine",
            Self::Communication => "communication",
            Self::DefaultListener => "default listener",
            Self::SoundBankPaths => "sound bank paths",
            Self::Language => "language",
            Self::InitBank => "init bank",
        }
    }

    /// Iterate all phases in initialization order.
    pub fn all() -> impl Iterator<Item = Self> {
        std::iter::successors(Some(Self::FIRST), |phase| phase.next())
    }
}
