//! Audio engine facade.

use tracing::{debug, info, instrument, trace, warn};

use bgm_audio::{AudioError, AudioResult, BankId, PlayingId, SoundEngineBackend};
use bgm_ipc::{EngineConfig, EngineStatsSnapshot, GameObjectId};

use crate::error::EngineError;
use crate::lifecycle::LifecycleManager;
use crate::stats::EngineStats;
use crate::EngineResult;

/// Owns the sound engine backend and its lifecycle.
///
/// The engine owns its backend by value, so there is exactly one owner of the
/// native runtime at any time. Share it with subsystems by reference.
pub struct AudioEngine {
    backend: Box<dyn SoundEngineBackend>,
    config: EngineConfig,
    lifecycle: LifecycleManager,
    stats: EngineStats,
    initialized: bool,
}

impl AudioEngine {
    /// Create an engine; nothing is initialized until [`AudioEngine::init`].
    pub fn new(backend: Box<dyn SoundEngineBackend>, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            lifecycle: LifecycleManager::new(),
            stats: EngineStats::new(),
            initialized: false,
        }
    }

    /// Initialize every subsystem in dependency order.
    ///
    /// On failure everything already initialized has been torn down.
    #[instrument(name = "engine_init", skip(self), fields(backend = self.backend.name()))]
    pub fn init(&mut self) -> EngineResult<()> {
        if self.initialized {
            warn!("Audio engine already initialized");
            return Err(EngineError::AlreadyInitialized);
        }

        match self.lifecycle.initialize(self.backend.as_mut(), &self.config) {
            Ok(()) => {
                self.initialized = true;
                info!(
                    communication = self.lifecycle.communication_available(),
                    "Audio engine initialized"
                );
                Ok(())
            }
            Err(e) => {
                self.stats.record_init_failure();
                Err(e)
            }
        }
    }

    /// Tear every live subsystem down in reverse order. Safe to repeat.
    #[instrument(name = "engine_term", skip(self))]
    pub fn term(&mut self) {
        if self.initialized {
            info!("Terminating audio engine");
        }
        self.lifecycle.rollback(self.backend.as_mut());
        self.initialized = false;
    }

    /// Render one frame. Call once per host frame while initialized.
    pub fn update(&mut self) {
        if !self.initialized {
            trace!("Update skipped, engine not initialized");
            return;
        }

        match self.backend.render_audio() {
            Ok(()) => self.stats.record_frame(),
            Err(status) => warn!(%status, "render_audio failed"),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether the authoring-tool communication channel is open.
    pub fn communication_available(&self) -> bool {
        self.lifecycle.communication_available()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Load a sound bank by name.
    pub fn load_bank(&mut self, bank: &str) -> AudioResult<BankId> {
        let id = self
            .backend
            .load_bank(bank)
            .map_err(|status| AudioError::BankLoad {
                bank: bank.to_string(),
                status,
            })?;
        debug!(bank, id = id.0, "Bank loaded");
        Ok(id)
    }

    /// Unload a sound bank by name.
    pub fn unload_bank(&mut self, bank: &str) -> AudioResult<()> {
        self.backend
            .unload_bank(bank)
            .map_err(|status| AudioError::backend("unload_bank", status))?;
        debug!(bank, "Bank unloaded");
        Ok(())
    }

    /// Post a named event on an emitter.
    ///
    /// Unknown events and unregistered emitters are no-ops.
    pub fn post_event(&mut self, event: &str, emitter: GameObjectId) -> PlayingId {
        let playing_id = self.backend.post_event(event, emitter);
        if playing_id.is_valid() {
            self.stats.record_event_posted();
            debug!(event, %emitter, playing_id = playing_id.0, "Event posted");
        } else {
            debug!(event, %emitter, "Event post ignored by the engine");
        }
        playing_id
    }

    /// Stop every sound, or only those on `scope`.
    pub fn stop_all(&mut self, scope: Option<GameObjectId>) {
        self.stats.record_stop();
        self.backend.stop_all(scope);
        match scope {
            Some(emitter) => debug!(%emitter, "Stopped sounds on emitter"),
            None => debug!("Stopped all sounds"),
        }
    }

    /// Direct access to the backend for registration and routing calls.
    pub fn backend_mut(&mut self) -> &mut dyn SoundEngineBackend {
        self.backend.as_mut()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.term();
    }
}

#[cfg(test)]
mod tests {
    use bgm_audio::{FaultPoint, SimulatedBackend, SimulatedProbe, StatusCode};

    use super::*;

    fn engine() -> (AudioEngine, SimulatedProbe) {
        let backend = SimulatedBackend::with_demo_banks();
        let probe = backend.probe();
        let mut config = EngineConfig::default();
        config.capabilities.communication = false;
        (AudioEngine::new(Box::new(backend), config), probe)
    }

    #[test]
    fn test_init_then_term_leaves_nothing_live() {
        let (mut engine, probe) = engine();

        engine.init().unwrap();
        assert!(engine.is_initialized());
        assert!(!probe.live_subsystems().is_empty());

        engine.term();
        assert!(!engine.is_initialized());
        assert!(probe.is_clean());
    }

    #[test]
    fn test_init_twice_rejected() {
        let (mut engine, probe) = engine();
        engine.init().unwrap();
        probe.clear_journal();

        assert!(matches!(engine.init(), Err(EngineError::AlreadyInitialized)));
        assert!(probe.journal().is_empty());
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_term_is_idempotent() {
        let (mut engine, probe) = engine();
        engine.init().unwrap();
        engine.term();
        probe.clear_journal();

        engine.term();
        assert!(probe.journal().is_empty());
    }

    #[test]
    fn test_failed_init_can_be_retried() {
        let (mut engine, probe) = engine();
        probe.fail(FaultPoint::LoadBank("Init.bnk".to_string()), StatusCode::BankReadError);

        let err = engine.init().unwrap_err();
        assert!(matches!(err, EngineError::BankLoad { .. }));
        assert!(probe.is_clean());
        assert_eq!(engine.stats().init_failures, 1);

        probe.clear_faults();
        engine.init().unwrap();
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_update_renders_only_while_initialized() {
        let (mut engine, probe) = engine();
        engine.update();
        assert_eq!(probe.frames_rendered(), 0);

        engine.init().unwrap();
        engine.update();
        engine.update();
        assert_eq!(probe.frames_rendered(), 2);
        assert_eq!(engine.stats().frames_rendered, 2);

        engine.term();
        engine.update();
        assert_eq!(probe.frames_rendered(), 2);
    }

    #[test]
    fn test_render_failure_is_not_fatal() {
        let (mut engine, probe) = engine();
        engine.init().unwrap();
        probe.fail(FaultPoint::RenderAudio, StatusCode::Fail);

        engine.update();
        assert!(engine.is_initialized());
        assert_eq!(engine.stats().frames_rendered, 0);
    }

    #[test]
    fn test_drop_terminates_engine() {
        let (mut engine, probe) = engine();
        engine.init().unwrap();

        drop(engine);
        assert!(probe.is_clean());
    }

    #[test]
    fn test_post_to_unregistered_emitter_is_noop() {
        let (mut engine, _probe) = engine();
        engine.init().unwrap();
        engine.load_bank("BGM.bnk").unwrap();

        let id = engine.post_event("Play_RecordableMusic", GameObjectId(42));
        assert!(!id.is_valid());
        assert_eq!(engine.stats().events_posted, 0);
    }
}
