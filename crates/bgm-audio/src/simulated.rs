//! In-process stand-in for the audio middleware.
//!
//! Tracks subsystem liveness, registrations, listener sets, secondary
//! outputs and playing instances, and can be told to fail any call. A
//! [`SimulatedProbe`] shares the state so callers can inspect it after the
//! backend has been handed to the engine.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use bgm_ipc::{
    DeviceSettings, GameObjectId, InitSettings, MemorySettings, MusicSettings, StreamSettings,
};

use crate::backend::{BankId, OutputFlags, OutputType, PlayingId, SoundEngineBackend};
use crate::error::StatusCode;
use crate::BackendResult;

/// A backend call that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    MemoryManager,
    StreamManager,
    LowLevelIo,
    SoundEngine,
    MusicEngine,
    Communication,
    BankPaths,
    Language,
    LoadBank(String),
    RegisterGameObject(GameObjectId),
    UnregisterGameObject(GameObjectId),
    SetListeners(GameObjectId),
    AddSecondaryOutput,
    RenderAudio,
}

#[derive(Debug, Clone)]
struct Playback {
    id: PlayingId,
    event: String,
    bank: String,
    emitter: GameObjectId,
}

#[derive(Debug, Clone)]
struct SecondaryOutput {
    listeners: Vec<GameObjectId>,
    flags: OutputFlags,
}

#[derive(Debug, Default)]
struct SimState {
    memory: bool,
    stream_manager: bool,
    io_device: bool,
    sound_engine: bool,
    music_engine: bool,
    communication: bool,

    base_path: Option<PathBuf>,
    language: Option<String>,

    /// Banks that exist on "disk", with the events they define.
    catalog: HashMap<String, BTreeSet<String>>,
    loaded_banks: BTreeMap<String, BankId>,
    unload_counts: HashMap<String, u32>,
    next_bank_id: u32,

    objects: BTreeMap<GameObjectId, String>,
    default_listeners: Vec<GameObjectId>,
    listener_overrides: HashMap<GameObjectId, Vec<GameObjectId>>,
    secondary_outputs: HashMap<OutputType, SecondaryOutput>,

    playing: Vec<Playback>,
    next_playing_id: u32,
    events_posted: u64,
    frames_rendered: u64,

    faults: HashMap<FaultPoint, StatusCode>,
    journal: Vec<&'static str>,
}

impl SimState {
    fn check(&mut self, call: &'static str, point: FaultPoint) -> BackendResult<()> {
        self.journal.push(call);
        match self.faults.get(&point) {
            Some(status) => {
                trace!(call, %status, "Injected fault");
                Err(*status)
            }
            None => Ok(()),
        }
    }

    fn require(&self, live: bool) -> BackendResult<()> {
        if live {
            Ok(())
        } else {
            Err(StatusCode::NotInitialized)
        }
    }

    fn effective_listeners(&self, emitter: GameObjectId) -> Vec<GameObjectId> {
        self.listener_overrides
            .get(&emitter)
            .cloned()
            .unwrap_or_else(|| self.default_listeners.clone())
    }

    fn clear_engine_state(&mut self) {
        self.loaded_banks.clear();
        self.objects.clear();
        self.default_listeners.clear();
        self.listener_overrides.clear();
        self.secondary_outputs.clear();
        self.playing.clear();
    }
}

/// Hand out `counter` and advance it, wrapping past zero (the invalid id).
fn next_id(counter: &mut u32) -> u32 {
    let id = *counter;
    *counter = match counter.wrapping_add(1) {
        0 => 1,
        next => next,
    };
    id
}

/// Simulated sound engine backend.
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    /// Create a backend with an empty bank catalog.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                next_bank_id: 1,
                next_playing_id: 1,
                ..SimState::default()
            })),
        }
    }

    /// Create a backend whose catalog holds the demo banks.
    pub fn with_demo_banks() -> Self {
        Self::new().with_bank("Init.bnk", &[]).with_bank(
            "BGM.bnk",
            &["Play_RecordableMusic", "Play_NonRecordableMusic"],
        )
    }

    /// Add a bank defining `events` to the catalog.
    pub fn with_bank(self, name: &str, events: &[&str]) -> Self {
        self.state.lock().catalog.insert(
            name.to_string(),
            events.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    /// Handle for inspecting and steering this backend.
    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundEngineBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn init_memory_manager(&mut self, settings: &MemorySettings) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("init_memory_manager", FaultPoint::MemoryManager)?;
        if state.memory {
            return Err(StatusCode::AlreadyInitialized);
        }
        if settings.max_num_pools == 0 {
            return Err(StatusCode::InvalidParameter);
        }
        state.memory = true;
        Ok(())
    }

    fn is_memory_manager_initialized(&self) -> bool {
        self.state.lock().memory
    }

    fn term_memory_manager(&mut self) {
        let mut state = self.state.lock();
        state.journal.push("term_memory_manager");
        state.memory = false;
    }

    fn create_stream_manager(&mut self, _settings: &StreamSettings) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("create_stream_manager", FaultPoint::StreamManager)?;
        let memory = state.memory;
        state.require(memory)?;
        state.stream_manager = true;
        Ok(())
    }

    fn has_stream_manager(&self) -> bool {
        self.state.lock().stream_manager
    }

    fn destroy_stream_manager(&mut self) {
        let mut state = self.state.lock();
        state.journal.push("destroy_stream_manager");
        state.stream_manager = false;
    }

    fn init_low_level_io(&mut self, settings: &DeviceSettings) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("init_low_level_io", FaultPoint::LowLevelIo)?;
        let stream_manager = state.stream_manager;
        state.require(stream_manager)?;
        if settings.granularity == 0 || settings.io_memory_size % settings.granularity != 0 {
            return Err(StatusCode::InvalidParameter);
        }
        state.io_device = true;
        Ok(())
    }

    fn term_low_level_io(&mut self) {
        let mut state = self.state.lock();
        state.journal.push("term_low_level_io");
        state.io_device = false;
        state.base_path = None;
    }

    fn set_bank_paths(
        &mut self,
        base_path: &Path,
        language_dir: Option<&Path>,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("set_bank_paths", FaultPoint::BankPaths)?;
        let io_device = state.io_device;
        state.require(io_device)?;
        let path = match language_dir {
            Some(dir) => base_path.join(dir),
            None => base_path.to_path_buf(),
        };
        state.base_path = Some(path);
        Ok(())
    }

    fn set_current_language(&mut self, language: &str) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("set_current_language", FaultPoint::Language)?;
        let stream_manager = state.stream_manager;
        state.require(stream_manager)?;
        if language.is_empty() {
            return Err(StatusCode::InvalidParameter);
        }
        state.language = Some(language.to_string());
        Ok(())
    }

    fn init_sound_engine(&mut self, settings: &InitSettings) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("init_sound_engine", FaultPoint::SoundEngine)?;
        let deps = state.memory && state.stream_manager;
        state.require(deps)?;
        if state.sound_engine {
            return Err(StatusCode::AlreadyInitialized);
        }
        if settings.default_pool_size == 0 || settings.lower_engine_pool_size == 0 {
            return Err(StatusCode::InsufficientMemory);
        }
        state.sound_engine = true;
        Ok(())
    }

    fn is_sound_engine_initialized(&self) -> bool {
        self.state.lock().sound_engine
    }

    fn term_sound_engine(&mut self) {
        let mut state = self.state.lock();
        state.journal.push("term_sound_engine");
        state.sound_engine = false;
        state.clear_engine_state();
    }

    fn init_music_engine(&mut self, _settings: &MusicSettings) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("init_music_engine", FaultPoint::MusicEngine)?;
        let sound_engine = state.sound_engine;
        state.require(sound_engine)?;
        state.music_engine = true;
        Ok(())
    }

    fn term_music_engine(&mut self) {
        let mut state = self.state.lock();
        state.journal.push("term_music_engine");
        state.music_engine = false;
    }

    fn init_communication(&mut self, app_network_name: &str) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("init_communication", FaultPoint::Communication)?;
        let sound_engine = state.sound_engine;
        state.require(sound_engine)?;
        trace!(app_network_name, "Communication channel open");
        state.communication = true;
        Ok(())
    }

    fn term_communication(&mut self) {
        let mut state = self.state.lock();
        state.journal.push("term_communication");
        state.communication = false;
    }

    fn load_bank(&mut self, name: &str) -> BackendResult<BankId> {
        let mut state = self.state.lock();
        state.check("load_bank", FaultPoint::LoadBank(name.to_string()))?;
        let ready = state.sound_engine && state.io_device;
        state.require(ready)?;
        if let Some(id) = state.loaded_banks.get(name) {
            return Ok(*id);
        }
        if !state.catalog.contains_key(name) {
            return Err(StatusCode::FileNotFound);
        }
        let id = BankId(next_id(&mut state.next_bank_id));
        state.loaded_banks.insert(name.to_string(), id);
        Ok(id)
    }

    fn unload_bank(&mut self, name: &str) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.journal.push("unload_bank");
        if state.loaded_banks.remove(name).is_none() {
            return Err(StatusCode::IdNotFound);
        }
        *state.unload_counts.entry(name.to_string()).or_default() += 1;
        state.playing.retain(|p| p.bank != name);
        Ok(())
    }

    fn register_game_object(&mut self, id: GameObjectId, name: &str) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("register_game_object", FaultPoint::RegisterGameObject(id))?;
        let sound_engine = state.sound_engine;
        state.require(sound_engine)?;
        state.objects.insert(id, name.to_string());
        Ok(())
    }

    fn unregister_game_object(&mut self, id: GameObjectId) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("unregister_game_object", FaultPoint::UnregisterGameObject(id))?;
        if state.objects.remove(&id).is_none() {
            return Err(StatusCode::IdNotFound);
        }
        state.listener_overrides.remove(&id);
        state.default_listeners.retain(|l| *l != id);
        for listeners in state.listener_overrides.values_mut() {
            listeners.retain(|l| *l != id);
        }
        state.playing.retain(|p| p.emitter != id);
        Ok(())
    }

    fn set_default_listeners(&mut self, listeners: &[GameObjectId]) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.journal.push("set_default_listeners");
        if listeners.iter().any(|l| !state.objects.contains_key(l)) {
            return Err(StatusCode::IdNotFound);
        }
        state.default_listeners = listeners.to_vec();
        Ok(())
    }

    fn set_listeners(
        &mut self,
        emitter: GameObjectId,
        listeners: &[GameObjectId],
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("set_listeners", FaultPoint::SetListeners(emitter))?;
        let known = state.objects.contains_key(&emitter)
            && listeners.iter().all(|l| state.objects.contains_key(l));
        if !known {
            return Err(StatusCode::IdNotFound);
        }
        state.listener_overrides.insert(emitter, listeners.to_vec());
        Ok(())
    }

    fn add_secondary_output(
        &mut self,
        _device_id: u32,
        output: OutputType,
        listeners: &[GameObjectId],
        flags: OutputFlags,
    ) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.check("add_secondary_output", FaultPoint::AddSecondaryOutput)?;
        let sound_engine = state.sound_engine;
        state.require(sound_engine)?;
        if output == OutputType::Main || state.secondary_outputs.contains_key(&output) {
            return Err(StatusCode::InvalidParameter);
        }
        if listeners.iter().any(|l| !state.objects.contains_key(l)) {
            return Err(StatusCode::IdNotFound);
        }
        state.secondary_outputs.insert(
            output,
            SecondaryOutput {
                listeners: listeners.to_vec(),
                flags,
            },
        );
        Ok(())
    }

    fn remove_secondary_output(&mut self, _device_id: u32, output: OutputType) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.journal.push("remove_secondary_output");
        match state.secondary_outputs.remove(&output) {
            Some(_) => Ok(()),
            None => Err(StatusCode::IdNotFound),
        }
    }

    fn post_event(&mut self, event: &str, emitter: GameObjectId) -> PlayingId {
        let mut state = self.state.lock();
        state.journal.push("post_event");
        if !state.sound_engine || !state.objects.contains_key(&emitter) {
            return PlayingId::INVALID;
        }
        let bank = state
            .loaded_banks
            .keys()
            .find(|bank| {
                state
                    .catalog
                    .get(bank.as_str())
                    .is_some_and(|events| events.contains(event))
            })
            .cloned();
        let Some(bank) = bank else {
            return PlayingId::INVALID;
        };

        let id = PlayingId(next_id(&mut state.next_playing_id));
        state.events_posted += 1;
        state.playing.push(Playback {
            id,
            event: event.to_string(),
            bank,
            emitter,
        });
        id
    }

    fn stop_all(&mut self, scope: Option<GameObjectId>) {
        let mut state = self.state.lock();
        state.journal.push("stop_all");
        match scope {
            Some(emitter) => state.playing.retain(|p| p.emitter != emitter),
            None => state.playing.clear(),
        }
    }

    fn render_audio(&mut self) -> BackendResult<()> {
        let mut state = self.state.lock();
        if let Some(status) = state.faults.get(&FaultPoint::RenderAudio) {
            return Err(*status);
        }
        let sound_engine = state.sound_engine;
        state.require(sound_engine)?;
        state.frames_rendered += 1;
        Ok(())
    }
}

/// Shared view into a [`SimulatedBackend`].
#[derive(Clone)]
pub struct SimulatedProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedProbe {
    /// Make every call at `point` fail with `status`.
    pub fn fail(&self, point: FaultPoint, status: StatusCode) {
        self.state.lock().faults.insert(point, status);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Names of subsystems that are currently live, in init order.
    pub fn live_subsystems(&self) -> Vec<&'static str> {
        let state = self.state.lock();
        [
            ("memory_manager", state.memory),
            ("stream_manager", state.stream_manager),
            ("low_level_io", state.io_device),
            ("sound_engine", state.sound_engine),
            ("music_engine", state.music_engine),
            ("communication", state.communication),
        ]
        .into_iter()
        .filter_map(|(name, live)| live.then_some(name))
        .collect()
    }

    /// True when nothing is live and nothing is registered or loaded.
    pub fn is_clean(&self) -> bool {
        let clean_subsystems = self.live_subsystems().is_empty();
        let state = self.state.lock();
        clean_subsystems
            && state.objects.is_empty()
            && state.loaded_banks.is_empty()
            && state.secondary_outputs.is_empty()
            && state.playing.is_empty()
    }

    pub fn registered_objects(&self) -> Vec<GameObjectId> {
        self.state.lock().objects.keys().copied().collect()
    }

    pub fn object_name(&self, id: GameObjectId) -> Option<String> {
        self.state.lock().objects.get(&id).cloned()
    }

    pub fn loaded_banks(&self) -> Vec<String> {
        self.state.lock().loaded_banks.keys().cloned().collect()
    }

    /// How many times `bank` was successfully unloaded.
    pub fn unload_count(&self, bank: &str) -> u32 {
        self.state.lock().unload_counts.get(bank).copied().unwrap_or(0)
    }

    pub fn default_listeners(&self) -> Vec<GameObjectId> {
        self.state.lock().default_listeners.clone()
    }

    /// Listener set an emitter currently reaches.
    pub fn listeners_of(&self, emitter: GameObjectId) -> Vec<GameObjectId> {
        self.state.lock().effective_listeners(emitter)
    }

    /// Whether an emitter is heard on the main (recordable) output.
    pub fn reaches_main_output(&self, emitter: GameObjectId) -> bool {
        let state = self.state.lock();
        state
            .effective_listeners(emitter)
            .iter()
            .any(|l| state.default_listeners.contains(l))
    }

    /// Listeners and flags of a secondary output, if one is attached.
    pub fn secondary_output(&self, output: OutputType) -> Option<(Vec<GameObjectId>, OutputFlags)> {
        self.state
            .lock()
            .secondary_outputs
            .get(&output)
            .map(|o| (o.listeners.clone(), o.flags))
    }

    /// Events currently playing on an emitter.
    pub fn playing_on(&self, emitter: GameObjectId) -> Vec<String> {
        self.state
            .lock()
            .playing
            .iter()
            .filter(|p| p.emitter == emitter)
            .map(|p| p.event.clone())
            .collect()
    }

    pub fn is_playing(&self, id: PlayingId) -> bool {
        self.state.lock().playing.iter().any(|p| p.id == id)
    }

    /// Number of posts that produced a playing instance.
    pub fn events_posted(&self) -> u64 {
        self.state.lock().events_posted
    }

    pub fn frames_rendered(&self) -> u64 {
        self.state.lock().frames_rendered
    }

    pub fn current_language(&self) -> Option<String> {
        self.state.lock().language.clone()
    }

    pub fn bank_path(&self) -> Option<PathBuf> {
        self.state.lock().base_path.clone()
    }

    /// Backend calls recorded so far, oldest first.
    pub fn journal(&self) -> Vec<&'static str> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized() -> (SimulatedBackend, SimulatedProbe) {
        let mut backend = SimulatedBackend::with_demo_banks();
        let probe = backend.probe();
        backend.init_memory_manager(&MemorySettings::default()).unwrap();
        backend.create_stream_manager(&StreamSettings::default()).unwrap();
        backend.init_low_level_io(&DeviceSettings::default()).unwrap();
        backend.init_sound_engine(&InitSettings::default()).unwrap();
        (backend, probe)
    }

    #[test]
    fn test_subsystem_dependencies_enforced() {
        let mut backend = SimulatedBackend::new();
        assert_eq!(
            backend.create_stream_manager(&StreamSettings::default()),
            Err(StatusCode::NotInitialized)
        );
        assert_eq!(
            backend.init_sound_engine(&InitSettings::default()),
            Err(StatusCode::NotInitialized)
        );
    }

    #[test]
    fn test_post_to_unregistered_emitter_is_noop() {
        let (mut backend, probe) = initialized();
        backend.load_bank("BGM.bnk").unwrap();

        let id = backend.post_event("Play_RecordableMusic", GameObjectId(99));
        assert!(!id.is_valid());
        assert_eq!(probe.events_posted(), 0);
    }

    #[test]
    fn test_post_unknown_event_is_noop() {
        let (mut backend, probe) = initialized();
        backend.load_bank("BGM.bnk").unwrap();
        backend.register_game_object(GameObjectId(10), "emitter").unwrap();

        assert!(!backend.post_event("Play_Nothing", GameObjectId(10)).is_valid());
        assert!(backend
            .post_event("Play_RecordableMusic", GameObjectId(10))
            .is_valid());
        assert_eq!(probe.playing_on(GameObjectId(10)), vec!["Play_RecordableMusic"]);
    }

    #[test]
    fn test_stop_all_scoped_to_emitter() {
        let (mut backend, probe) = initialized();
        backend.load_bank("BGM.bnk").unwrap();
        backend.register_game_object(GameObjectId(10), "a").unwrap();
        backend.register_game_object(GameObjectId(20), "b").unwrap();
        backend.post_event("Play_RecordableMusic", GameObjectId(10));
        backend.post_event("Play_NonRecordableMusic", GameObjectId(20));

        backend.stop_all(Some(GameObjectId(10)));
        assert!(probe.playing_on(GameObjectId(10)).is_empty());
        assert_eq!(probe.playing_on(GameObjectId(20)).len(), 1);

        backend.stop_all(None);
        assert!(probe.playing_on(GameObjectId(20)).is_empty());
    }

    #[test]
    fn test_missing_bank_reports_file_not_found() {
        let (mut backend, _probe) = initialized();
        assert_eq!(backend.load_bank("Missing.bnk"), Err(StatusCode::FileNotFound));
    }

    #[test]
    fn test_injected_fault_is_returned() {
        let mut backend = SimulatedBackend::new();
        let probe = backend.probe();
        probe.fail(FaultPoint::MemoryManager, StatusCode::InsufficientMemory);

        assert_eq!(
            backend.init_memory_manager(&MemorySettings::default()),
            Err(StatusCode::InsufficientMemory)
        );
        assert!(probe.live_subsystems().is_empty());

        probe.clear_faults();
        assert!(backend.init_memory_manager(&MemorySettings::default()).is_ok());
        assert_eq!(probe.live_subsystems(), vec!["memory_manager"]);
    }

    #[test]
    fn test_term_sound_engine_drops_registrations() {
        let (mut backend, probe) = initialized();
        backend.load_bank("Init.bnk").unwrap();
        backend.register_game_object(GameObjectId(1), "x").unwrap();

        backend.term_sound_engine();
        assert!(probe.registered_objects().is_empty());
        assert!(probe.loaded_banks().is_empty());
    }

    #[test]
    fn test_playing_ids_wrap_without_reusing_invalid() {
        let (mut backend, _probe) = initialized();
        backend.load_bank("BGM.bnk").unwrap();
        backend.register_game_object(GameObjectId(10), "emitter").unwrap();
        backend.state.lock().next_playing_id = u32::MAX;

        let last = backend.post_event("Play_RecordableMusic", GameObjectId(10));
        let wrapped = backend.post_event("Play_RecordableMusic", GameObjectId(10));

        assert_eq!(last, PlayingId(u32::MAX));
        assert_eq!(wrapped, PlayingId(1));
        assert!(wrapped.is_valid());
    }

    #[test]
    fn test_bank_ids_wrap_without_reusing_zero() {
        let (mut backend, _probe) = initialized();
        backend.state.lock().next_bank_id = u32::MAX;

        assert_eq!(backend.load_bank("Init.bnk"), Ok(BankId(u32::MAX)));
        assert_eq!(backend.load_bank("BGM.bnk"), Ok(BankId(1)));
    }

}
