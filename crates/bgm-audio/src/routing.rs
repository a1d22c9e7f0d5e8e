//! Output routing for recordable and non-recordable music.
//!
//! Emitters left alone reach the default listener, which feeds the main
//! output and is therefore captured by OS recording. An emitter given an
//! exclusive secondary listener is only heard on the output tied to that
//! listener.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, instrument, warn};

use bgm_ipc::{Capabilities, GameObjectId};

use crate::backend::{OutputFlags, OutputType, SoundEngineBackend};
use crate::error::AudioError;
use crate::{AudioResult, BGM_OUTPUT_DEVICE_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectRole {
    Emitter,
    Listener,
}

/// Registers emitters/listeners and assigns non-default output routing.
pub struct OutputRouting {
    secondary_output_supported: bool,
    default_listener: GameObjectId,
    registered: BTreeMap<GameObjectId, (ObjectRole, String)>,
    exclusive: HashMap<GameObjectId, GameObjectId>,
    secondary_output: Option<GameObjectId>,
}

impl OutputRouting {
    /// Create a routing controller for the given platform capabilities.
    pub fn new(capabilities: Capabilities, default_listener: GameObjectId) -> Self {
        Self {
            secondary_output_supported: capabilities.secondary_output,
            default_listener,
            registered: BTreeMap::new(),
            exclusive: HashMap::new(),
            secondary_output: None,
        }
    }

    /// Register a sound-emitting game object.
    pub fn register_emitter(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        id: GameObjectId,
        name: &str,
    ) -> AudioResult<()> {
        self.register(backend, id, name, ObjectRole::Emitter)
    }

    /// Register a listener game object.
    pub fn register_listener(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        id: GameObjectId,
        name: &str,
    ) -> AudioResult<()> {
        self.register(backend, id, name, ObjectRole::Listener)
    }

    fn register(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        id: GameObjectId,
        name: &str,
        role: ObjectRole,
    ) -> AudioResult<()> {
        if id == self.default_listener {
            return Err(AudioError::Routing(format!(
                "{id} is reserved for the default listener"
            )));
        }
        if let Some((_, existing)) = self.registered.get(&id) {
            return Err(AudioError::Routing(format!(
                "{id} already registered as \"{existing}\""
            )));
        }

        backend
            .register_game_object(id, name)
            .map_err(|status| AudioError::backend("register_game_object", status))?;
        debug!(%id, name, ?role, "Registered game object");
        self.registered.insert(id, (role, name.to_string()));
        Ok(())
    }

    /// Unregister a game object previously registered through this controller.
    pub fn unregister(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        id: GameObjectId,
    ) -> AudioResult<()> {
        if !self.registered.contains_key(&id) {
            return Err(AudioError::Routing(format!("{id} is not registered")));
        }

        // Keep tracking the id until the backend has released it.
        backend
            .unregister_game_object(id)
            .map_err(|status| AudioError::backend("unregister_game_object", status))?;

        self.registered.remove(&id);
        self.exclusive.remove(&id);
        self.exclusive.retain(|_, listener| *listener != id);
        debug!(%id, "Unregistered game object");
        Ok(())
    }

    /// Make `emitter` audible only through `listener`.
    ///
    /// The default listener is refused: it feeds the recordable output.
    #[instrument(name = "set_exclusive_output", skip(self, backend))]
    pub fn set_exclusive_output(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        emitter: GameObjectId,
        listener: GameObjectId,
    ) -> AudioResult<()> {
        if listener == self.default_listener {
            return Err(AudioError::Routing(format!(
                "{listener} is the default listener; exclusive routing needs a secondary one"
            )));
        }
        match self.registered.get(&emitter) {
            Some((ObjectRole::Emitter, _)) => {}
            _ => {
                return Err(AudioError::Routing(format!(
                    "{emitter} is not a registered emitter"
                )))
            }
        }
        match self.registered.get(&listener) {
            Some((ObjectRole::Listener, _)) => {}
            _ => {
                return Err(AudioError::Routing(format!(
                    "{listener} is not a registered listener"
                )))
            }
        }

        backend
            .set_listeners(emitter, &[listener])
            .map_err(|status| AudioError::backend("set_listeners", status))?;
        self.exclusive.insert(emitter, listener);
        info!(%emitter, %listener, "Emitter routed exclusively");
        Ok(())
    }

    /// Attach the platform's non-recordable output to `listener`.
    ///
    /// Returns `Ok(false)` without touching the backend when the platform has
    /// no such output.
    #[instrument(name = "add_secondary_output", skip(self, backend))]
    pub fn add_secondary_output(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
        listener: GameObjectId,
    ) -> AudioResult<bool> {
        if !self.secondary_output_supported {
            debug!("Platform has no non-recordable output, skipping");
            return Ok(false);
        }
        if let Some(existing) = self.secondary_output {
            return Err(AudioError::Routing(format!(
                "secondary output already attached to {existing}"
            )));
        }

        backend
            .add_secondary_output(
                BGM_OUTPUT_DEVICE_ID,
                OutputType::Bgm,
                &[listener],
                OutputFlags::NotRecordable,
            )
            .map_err(|status| AudioError::backend("add_secondary_output", status))?;
        self.secondary_output = Some(listener);
        info!(%listener, "Non-recordable output attached");
        Ok(true)
    }

    /// Detach the non-recordable output if one was attached.
    #[instrument(name = "remove_secondary_output", skip(self, backend))]
    pub fn remove_secondary_output(
        &mut self,
        backend: &mut dyn SoundEngineBackend,
    ) -> AudioResult<()> {
        if self.secondary_output.take().is_none() {
            return Ok(());
        }

        backend
            .remove_secondary_output(BGM_OUTPUT_DEVICE_ID, OutputType::Bgm)
            .map_err(|status| {
                warn!(%status, "Failed to remove non-recordable output");
                AudioError::backend("remove_secondary_output", status)
            })
    }

    /// Listener set the controller assigned to an emitter.
    pub fn listeners_of(&self, emitter: GameObjectId) -> Vec<GameObjectId> {
        match self.exclusive.get(&emitter) {
            Some(listener) => vec![*listener],
            None => vec![self.default_listener],
        }
    }

    /// Whether an emitter's audio can reach the recordable output.
    pub fn is_recordable(&self, emitter: GameObjectId) -> bool {
        self.listeners_of(emitter).contains(&self.default_listener)
    }

    pub fn is_registered(&self, id: GameObjectId) -> bool {
        self.registered.contains_key(&id)
    }

    pub fn has_secondary_output(&self) -> bool {
        self.secondary_output.is_some()
    }

    pub fn secondary_output_supported(&self) -> bool {
        self.secondary_output_supported
    }

    /// Ids registered through this controller, ascending.
    pub fn registered(&self) -> Vec<GameObjectId> {
        self.registered.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use bgm_ipc::{DeviceSettings, InitSettings, MemorySettings, StreamSettings};

    use super::*;
    use crate::error::StatusCode;
    use crate::simulated::{FaultPoint, SimulatedBackend, SimulatedProbe};

    const DEFAULT: GameObjectId = GameObjectId(10000);
    const SECONDARY: GameObjectId = GameObjectId(10001);
    const MUSIC: GameObjectId = GameObjectId(20);

    fn engine_with_default_listener() -> (SimulatedBackend, SimulatedProbe) {
        let mut backend = SimulatedBackend::with_demo_banks();
        let probe = backend.probe();
        backend.init_memory_manager(&MemorySettings::default()).unwrap();
        backend.create_stream_manager(&StreamSettings::default()).unwrap();
        backend.init_low_level_io(&DeviceSettings::default()).unwrap();
        backend.init_sound_engine(&InitSettings::default()).unwrap();
        backend.register_game_object(DEFAULT, "Listener (Default)").unwrap();
        backend.set_default_listeners(&[DEFAULT]).unwrap();
        (backend, probe)
    }

    fn capabilities(secondary_output: bool) -> Capabilities {
        Capabilities {
            communication: false,
            secondary_output,
        }
    }

    #[test]
    fn test_exclusive_output_excludes_default_listener() {
        let (mut backend, probe) = engine_with_default_listener();
        let mut routing = OutputRouting::new(capabilities(true), DEFAULT);

        routing.register_listener(&mut backend, SECONDARY, "Secondary Listener").unwrap();
        assert!(routing.add_secondary_output(&mut backend, SECONDARY).unwrap());
        routing.register_emitter(&mut backend, MUSIC, "Non-recordable music").unwrap();
        assert!(probe.reaches_main_output(MUSIC));

        routing.set_exclusive_output(&mut backend, MUSIC, SECONDARY).unwrap();

        assert_eq!(routing.listeners_of(MUSIC), vec![SECONDARY]);
        assert_eq!(probe.listeners_of(MUSIC), vec![SECONDARY]);
        assert!(!probe.reaches_main_output(MUSIC));
        assert!(!routing.is_recordable(MUSIC));
        assert_eq!(
            probe.secondary_output(OutputType::Bgm),
            Some((vec![SECONDARY], OutputFlags::NotRecordable))
        );
    }

    #[test]
    fn test_exclusive_output_rejects_default_listener() {
        let (mut backend, probe) = engine_with_default_listener();
        let mut routing = OutputRouting::new(capabilities(true), DEFAULT);
        routing.register_emitter(&mut backend, MUSIC, "music").unwrap();

        let err = routing.set_exclusive_output(&mut backend, MUSIC, DEFAULT);
        assert!(matches!(err, Err(AudioError::Routing(_))));
        assert!(!probe.journal().contains(&"set_listeners"));
    }

    #[test]
    fn test_secondary_output_skipped_without_capability() {
        let (mut backend, probe) = engine_with_default_listener();
        let mut routing = OutputRouting::new(capabilities(false), DEFAULT);
        routing.register_listener(&mut backend, SECONDARY, "Secondary Listener").unwrap();

        assert!(!routing.add_secondary_output(&mut backend, SECONDARY).unwrap());
        routing.remove_secondary_output(&mut backend).unwrap();

        let journal = probe.journal();
        assert!(!journal.contains(&"add_secondary_output"));
        assert!(!journal.contains(&"remove_secondary_output"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let (mut backend, _probe) = engine_with_default_listener();
        let mut routing = OutputRouting::new(capabilities(false), DEFAULT);

        routing.register_emitter(&mut backend, MUSIC, "music").unwrap();
        assert!(routing.register_emitter(&mut backend, MUSIC, "again").is_err());
        assert!(routing.register_listener(&mut backend, DEFAULT, "default").is_err());
    }

    #[test]
    fn test_unregister_clears_routing() {
        let (mut backend, probe) = engine_with_default_listener();
        let mut routing = OutputRouting::new(capabilities(false), DEFAULT);
        routing.register_listener(&mut backend, SECONDARY, "Secondary Listener").unwrap();
        routing.register_emitter(&mut backend, MUSIC, "music").unwrap();
        routing.set_exclusive_output(&mut backend, MUSIC, SECONDARY).unwrap();

        routing.unregister(&mut backend, MUSIC).unwrap();
        routing.unregister(&mut backend, SECONDARY).unwrap();

        assert!(routing.registered().is_empty());
        assert_eq!(probe.registered_objects(), vec![DEFAULT]);
        assert!(routing.unregister(&mut backend, MUSIC).is_err());
    }

    #[test]
    fn test_failed_unregister_keeps_tracking() {
        let (mut backend, probe) = engine_with_default_listener();
        let mut routing = OutputRouting::new(capabilities(false), DEFAULT);
        routing.register_listener(&mut backend, SECONDARY, "Secondary Listener").unwrap();
        routing.register_emitter(&mut backend, MUSIC, "music").unwrap();
        routing.set_exclusive_output(&mut backend, MUSIC, SECONDARY).unwrap();
        probe.fail(FaultPoint::UnregisterGameObject(MUSIC), StatusCode::Fail);

        let err = routing.unregister(&mut backend, MUSIC).unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::Fail));
        assert!(routing.is_registered(MUSIC));
        assert_eq!(routing.listeners_of(MUSIC), vec![SECONDARY]);
        assert!(probe.registered_objects().contains(&MUSIC));

        probe.clear_faults();
        routing.unregister(&mut backend, MUSIC).unwrap();
        assert!(!routing.is_registered(MUSIC));
        assert_eq!(routing.listeners_of(MUSIC), vec![DEFAULT]);
    }

}
