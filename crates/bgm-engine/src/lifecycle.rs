//! Subsystem initialization tracking and ordered teardown.

use tracing::{debug, error, info, instrument, warn};

use bgm_audio::{BankId, SoundEngineBackend, StatusCode};
use bgm_ipc::{EngineConfig, GameObjectId, InitPhase};

use crate::error::EngineError;
use crate::EngineResult;

/// Subsystems the backend offers no liveness query for.
#[derive(Debug, Default)]
struct LiveSubsystems {
    low_level_io: bool,
    music_engine: bool,
    communication: bool,
    default_listener: Option<GameObjectId>,
    init_bank: Option<(String, BankId)>,
}

/// Brings subsystems up phase by phase and releases them in reverse.
///
/// Teardown walks back from the furthest phase reached and checks each
/// subsystem's liveness before releasing it, so it is safe after a partial
/// failure and safe to repeat.
#[derive(Debug, Default)]
pub struct LifecycleManager {
    current_phase: Option<InitPhase>,
    live: LiveSubsystems,
}

impl LifecycleManager {
    /// Create a manager with nothing initialized.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize every phase in order, unwinding on the first mandatory failure.
    #[instrument(name = "init_subsystems", skip_all, fields(backend = backend.name()))]
    pub fn initialize(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        config: &EngineConfig,
    ) -> EngineResult<()> {
        if let Some(reached) = self.current_phase {
            warn!(phase = reached.name(), "Subsystems already initialized");
            return Err(EngineError::AlreadyInitialized);
        }

        let mut phase = InitPhase::FIRST;

        loop {
            self.current_phase = Some(phase);

            if let Err(e) = self.init_phase(backend, config, phase) {
                if phase.is_mandatory() {
                    error!(phase = phase.name(), status = ?e.status().map(|s| s.code()), "{}", e);
                    self.rollback(backend);
                    return Err(e);
                }
                warn!(
                    phase = phase.name(),
                    "{}. Communication between the authoring tool and the game will not be possible.",
                    e
                );
            }

            match phase.next() {
                Some(next) => phase = next,
                None => break,
            }
        }

        info!("Audio subsystems initialized");
        Ok(())
    }

    fn init_phase(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        config: &EngineConfig,
        phase: InitPhase,
    ) -> EngineResult<()> {
        debug!("Initializing phase: {}", phase.name());
        let failed = |status: StatusCode| EngineError::SubsystemInit {
            subsystem: phase,
            status,
        };

        match phase {
            InitPhase::ConfigurePlatform => validate_platform(config),
            InitPhase::MemoryManager => backend.init_memory_manager(&config.memory).map_err(failed),
            InitPhase::StreamManager => {
                backend.create_stream_manager(&config.stream).map_err(failed)
            }
            InitPhase::LowLevelIo => {
                backend.init_low_level_io(&config.device).map_err(failed)?;
                self.live.low_level_io = true;
                Ok(())
            }
            InitPhase::SoundEngine => backend.init_sound_engine(&config.init).map_err(failed),
            InitPhase::MusicEngine => {
                backend.init_music_engine(&config.music).map_err(failed)?;
                self.live.music_engine = true;
                Ok(())
            }
            InitPhase::Communication => {
                if !config.capabilities.communication {
                    debug!("Communication disabled by configuration");
                    return Ok(());
                }
                backend
                    .init_communication(&config.app_network_name)
                    .map_err(failed)?;
                self.live.communication = true;
                Ok(())
            }
            InitPhase::DefaultListener => {
                let listener = config.default_listener;
                backend
                    .register_game_object(listener, "Listener (Default)")
                    .map_err(failed)?;
                self.live.default_listener = Some(listener);
                backend.set_default_listeners(&[listener]).map_err(failed)
            }
            InitPhase::SoundBankPaths => backend
                .set_bank_paths(&config.paths.base_path, config.paths.language_dir.as_deref())
                .map_err(failed),
            InitPhase::Language => backend.set_current_language(&config.language).map_err(failed),
            InitPhase::InitBank => {
                let id = backend
                    .load_bank(&config.init_bank)
                    .map_err(|status| EngineError::BankLoad {
                        bank: config.init_bank.clone(),
                        status,
                    })?;
                self.live.init_bank = Some((config.init_bank.clone(), id));
                Ok(())
            }
        }
    }

    /// Release subsystems from the furthest phase reached backwards.
    #[instrument(name = "rollback_subsystems", skip_all)]
    pub fn rollback(&mut self, backend: &mut dyn SoundEngineBackend) {
        if let Some(mut phase) = self.current_phase.take() {
            loop {
                self.rollback_phase(backend, phase);

                match phase.previous() {
                    Some(prev) => phase = prev,
                    None => break,
                }
            }
        }
    }

    fn rollback_phase(&mut self, backend: &mut dyn SoundEngineBackend, phase: InitPhase) {
        match phase {
            InitPhase::InitBank => {
                if let Some((bank, _)) = self.live.init_bank.take() {
                    debug!("Unloading {}", bank);
                    if let Err(status) = backend.unload_bank(&bank) {
                        warn!(%status, "Failed to unload {}", bank);
                    }
                }
            }
            InitPhase::Language | InitPhase::SoundBankPaths | InitPhase::ConfigurePlatform => {
                // Nothing to release
            }
            InitPhase::DefaultListener => {
                if let Some(listener) = self.live.default_listener.take() {
                    if backend.is_sound_engine_initialized() {
                        if let Err(status) = backend.unregister_game_object(listener) {
                            warn!(%status, "Failed to unregister default listener");
                        }
                    }
                }
            }
            InitPhase::Communication => {
                if std::mem::take(&mut self.live.communication) {
                    info!("Terminating communication");
                    backend.term_communication();
                }
            }
            InitPhase::MusicEngine => {
                if std::mem::take(&mut self.live.music_engine) {
                    info!("Terminating music engine");
                    backend.term_music_engine();
                }
            }
            InitPhase::SoundEngine => {
                if backend.is_sound_engine_initialized() {
                    info!("Terminating sound engine");
                    backend.term_sound_engine();
                }
            }
            InitPhase::LowLevelIo => {
                if std::mem::take(&mut self.live.low_level_io) && backend.has_stream_manager() {
                    info!("Terminating low-level I/O");
                    backend.term_low_level_io();
                }
            }
            InitPhase::StreamManager => {
                if backend.has_stream_manager() {
                    info!("Destroying stream manager");
                    backend.destroy_stream_manager();
                }
            }
            InitPhase::MemoryManager => {
                if backend.is_memory_manager_initialized() {
                    info!("Terminating memory manager");
                    backend.term_memory_manager();
                }
            }
        }
    }

    /// Whether the optional communication channel is open.
    pub fn communication_available(&self) -> bool {
        self.live.communication
    }

    /// Furthest phase reached, `None` when nothing is initialized.
    pub fn current_phase(&self) -> Option<InitPhase> {
        self.current_phase
    }
}

fn validate_platform(config: &EngineConfig) -> EngineResult<()> {
    let invalid = |message: &str| Err(EngineError::PlatformConfig(message.to_string()));

    if config.memory.max_num_pools == 0 {
        return invalid("memory manager needs at least one pool");
    }
    if config.init.default_pool_size == 0 || config.init.lower_engine_pool_size == 0 {
        return invalid("sound engine pool sizes must be non-zero");
    }
    if config.device.granularity == 0
        || config.device.io_memory_size % config.device.granularity != 0
    {
        return invalid("I/O memory size must be a non-zero multiple of the granularity");
    }
    if config.language.is_empty() {
        return invalid("language must be set");
    }
    if config.init_bank.is_empty() {
        return invalid("init bank name must be set");
    }
    if config.frame_interval_ms == 0 {
        return invalid("frame interval must be non-zero");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bgm_audio::{FaultPoint, SimulatedBackend, SimulatedProbe};

    use super::*;

    fn backend() -> (SimulatedBackend, SimulatedProbe) {
        let backend = SimulatedBackend::with_demo_banks();
        let probe = backend.probe();
        (backend, probe)
    }

    fn config(communication: bool) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.capabilities.communication = communication;
        config
    }

    fn fault_for(phase: InitPhase) -> Option<FaultPoint> {
        match phase {
            InitPhase::ConfigurePlatform => None,
            InitPhase::MemoryManager => Some(FaultPoint::MemoryManager),
            InitPhase::StreamManager => Some(FaultPoint::StreamManager),
            InitPhase::LowLevelIo => Some(FaultPoint::LowLevelIo),
            InitPhase::SoundEngine => Some(FaultPoint::SoundEngine),
            InitPhase::MusicEngine => Some(FaultPoint::MusicEngine),
            InitPhase::Communication => Some(FaultPoint::Communication),
            InitPhase::DefaultListener => Some(FaultPoint::RegisterGameObject(
                bgm_ipc::DEFAULT_LISTENER_ID,
            )),
            InitPhase::SoundBankPaths => Some(FaultPoint::BankPaths),
            InitPhase::Language => Some(FaultPoint::Language),
            InitPhase::InitBank => Some(FaultPoint::LoadBank("Init.bnk".to_string())),
        }
    }

    #[test]
    fn test_teardown_runs_in_reverse_order() {
        let (mut backend, probe) = backend();
        let mut lifecycle = LifecycleManager::new();

        lifecycle.initialize(&mut backend, &config(true)).unwrap();
        assert_eq!(
            probe.live_subsystems(),
            vec![
                "memory_manager",
                "stream_manager",
                "low_level_io",
                "sound_engine",
                "music_engine",
                "communication"
            ]
        );

        probe.clear_journal();
        lifecycle.rollback(&mut backend);

        assert_eq!(
            probe.journal(),
            vec![
                "unload_bank",
                "unregister_game_object",
                "term_communication",
                "term_music_engine",
                "term_sound_engine",
                "term_low_level_io",
                "destroy_stream_manager",
                "term_memory_manager",
            ]
        );
        assert!(probe.is_clean());
    }

    #[test]
    fn test_every_mandatory_failure_unwinds_completely() {
        for phase in InitPhase::all().filter(|p| p.is_mandatory()) {
            let Some(fault) = fault_for(phase) else {
                continue;
            };
            let (mut backend, probe) = backend();
            probe.fail(fault, bgm_audio::StatusCode::Fail);
            let mut lifecycle = LifecycleManager::new();

            let result = lifecycle.initialize(&mut backend, &config(true));

            assert!(result.is_err(), "{} failure must abort init", phase.name());
            assert!(
                probe.is_clean(),
                "{} failure left {:?} live",
                phase.name(),
                probe.live_subsystems()
            );
            assert_eq!(lifecycle.current_phase(), None);
        }
    }

    #[test]
    fn test_failure_reports_subsystem_and_status() {
        let (mut backend, probe) = backend();
        probe.fail(FaultPoint::SoundEngine, bgm_audio::StatusCode::InsufficientMemory);
        let mut lifecycle = LifecycleManager::new();

        let err = lifecycle.initialize(&mut backend, &config(false)).unwrap_err();
        match err {
            EngineError::SubsystemInit { subsystem, status } => {
                assert_eq!(subsystem, InitPhase::SoundEngine);
                assert_eq!(status.code(), 52);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_communication_failure_is_not_fatal() {
        let (mut backend, probe) = backend();
        probe.fail(FaultPoint::Communication, bgm_audio::StatusCode::DeviceNotReady);
        let mut lifecycle = LifecycleManager::new();

        lifecycle.initialize(&mut backend, &config(true)).unwrap();
        assert!(!lifecycle.communication_available());
        assert!(!probe.live_subsystems().contains(&"communication"));

        lifecycle.rollback(&mut backend);
        assert!(!probe.journal().contains(&"term_communication"));
        assert!(probe.is_clean());
    }

    #[test]
    fn test_invalid_platform_config_touches_nothing() {
        let (mut backend, probe) = backend();
        let mut config = config(false);
        config.device.io_memory_size = 1000;
        let mut lifecycle = LifecycleManager::new();

        let err = lifecycle.initialize(&mut backend, &config).unwrap_err();
        assert!(matches!(err, EngineError::PlatformConfig(_)));
        assert!(probe.journal().is_empty());
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let (mut backend, probe) = backend();
        let mut lifecycle = LifecycleManager::new();
        lifecycle.initialize(&mut backend, &config(false)).unwrap();

        lifecycle.rollback(&mut backend);
        probe.clear_journal();
        lifecycle.rollback(&mut backend);

        assert!(probe.journal().is_empty());
    }

    #[test]
    fn test_paths_and_language_applied() {
        let (mut backend, probe) = backend();
        let mut config = config(false);
        config.language = "French(France)".to_string();
        let mut lifecycle = LifecycleManager::new();

        lifecycle.initialize(&mut backend, &config).unwrap();
        assert_eq!(probe.current_language().as_deref(), Some("French(France)"));
        assert_eq!(probe.bank_path(), Some(config.paths.base_path.clone()));
        assert_eq!(probe.loaded_banks(), vec!["Init.bnk"]);
        assert_eq!(probe.default_listeners(), vec![bgm_ipc::DEFAULT_LISTENER_ID]);
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let (mut backend, probe) = backend();
        let mut lifecycle = LifecycleManager::new();
        lifecycle.initialize(&mut backend, &config(false)).unwrap();
        let live = probe.live_subsystems();
        probe.clear_journal();

        let err = lifecycle.initialize(&mut backend, &config(false)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyInitialized));
        assert!(probe.journal().is_empty());
        assert_eq!(probe.live_subsystems(), live);
        assert_eq!(lifecycle.current_phase(), Some(InitPhase::InitBank));

        lifecycle.rollback(&mut backend);
        assert!(probe.is_clean());
    }

}
