//! Audio engine facade and background music scene.
//!
//! This crate brings the sound engine up and down in dependency order,
//! drives the demo scene that splits music between the recordable and
//! non-recordable outputs, and runs the host loop that pumps rendering
//! once per frame.

mod error;
mod facade;
mod host;
mod lifecycle;
mod scene;
mod stats;

pub use error::{EngineError, SceneError};
pub use facade::AudioEngine;
pub use host::HostLoop;
pub use lifecycle::LifecycleManager;
pub use scene::{BgmScene, PlaybackToggle};
pub use stats::EngineStats;

use bgm_audio::SoundEngineBackend;
use bgm_ipc::{EngineConfig, HostCommand, HostEvent, SceneConfig};
use crossbeam_channel::{Receiver, Sender};

/// Result type for engine lifecycle operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Create a host loop owning a fresh engine and scene.
pub fn create_host_loop(
    backend: Box<dyn SoundEngineBackend>,
    engine_config: EngineConfig,
    scene_config: SceneConfig,
    command_rx: Receiver<HostCommand>,
    event_tx: Sender<HostEvent>,
) -> HostLoop {
    let engine = AudioEngine::new(backend, engine_config);
    let scene = BgmScene::new(scene_config);
    HostLoop::new(engine, scene, command_rx, event_tx)
}
