//! Background music demo scene.
//!
//! Two play/stop buttons post music on two emitters: one left on default
//! routing (heard on the main output, captured by DVR) and one routed
//! exclusively to a secondary listener tied to the console's
//! non-recordable BGM output.

use tracing::{debug, info, instrument, warn};

use bgm_audio::{AudioError, AudioResult, OutputRouting};
use bgm_ipc::{GameObjectId, SceneConfig, SceneState, ToggleControl};

use crate::error::SceneError;
use crate::facade::AudioEngine;
use crate::SceneResult;

/// Play/stop state of one button.
#[derive(Debug, Clone)]
pub struct PlaybackToggle {
    control: ToggleControl,
    emitter: GameObjectId,
    event: String,
    idle_label: String,
    playing: bool,
}

impl PlaybackToggle {
    fn new(control: ToggleControl, emitter: GameObjectId, event: &str, idle_label: &str) -> Self {
        Self {
            control,
            emitter,
            event: event.to_string(),
            idle_label: idle_label.to_string(),
            playing: false,
        }
    }

    pub fn control(&self) -> ToggleControl {
        self.control
    }

    pub fn emitter(&self) -> GameObjectId {
        self.emitter
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Label shown on the button.
    pub fn label<'a>(&'a self, stop_label: &'a str) -> &'a str {
        if self.playing {
            stop_label
        } else {
            &self.idle_label
        }
    }
}

/// The background music scene.
pub struct BgmScene {
    config: SceneConfig,
    state: SceneState,
    routing: Option<OutputRouting>,
    recordable: PlaybackToggle,
    non_recordable: PlaybackToggle,
}

impl BgmScene {
    /// Create an inactive scene.
    pub fn new(config: SceneConfig) -> Self {
        let recordable = PlaybackToggle::new(
            ToggleControl::Recordable,
            config.recordable_emitter,
            &config.recordable_event,
            &config.recordable_label,
        );
        let non_recordable = PlaybackToggle::new(
            ToggleControl::NonRecordable,
            config.non_recordable_emitter,
            &config.non_recordable_event,
            &config.non_recordable_label,
        );

        Self {
            config,
            state: SceneState::Inactive,
            routing: None,
            recordable,
            non_recordable,
        }
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Routing set up by the last activation, while active.
    pub fn routing(&self) -> Option<&OutputRouting> {
        self.routing.as_ref()
    }

    pub fn toggle_state(&self, control: ToggleControl) -> &PlaybackToggle {
        match control {
            ToggleControl::Recordable => &self.recordable,
            ToggleControl::NonRecordable => &self.non_recordable,
        }
    }

    /// Current label of a button.
    pub fn label(&self, control: ToggleControl) -> &str {
        self.toggle_state(control).label(&self.config.stop_label)
    }

    /// Load the bank, register emitters and configure routing.
    #[instrument(name = "scene_activate", skip_all)]
    pub fn activate(&mut self, engine: &mut AudioEngine) -> SceneResult<()> {
        if self.state.is_active() {
            debug!("Scene already active");
            return Ok(());
        }
        if !engine.is_initialized() {
            return Err(SceneError::EngineNotInitialized);
        }

        let bank = self.config.bank.clone();
        engine.load_bank(&bank).map_err(|e| match e {
            AudioError::BankLoad { bank, status } => SceneError::BankLoad { bank, status },
            other => SceneError::Setup(other),
        })?;

        let mut routing = OutputRouting::new(
            engine.config().capabilities,
            engine.config().default_listener,
        );

        if let Err(e) = self.configure_routing(&mut routing, engine) {
            warn!("Scene setup failed, unwinding: {}", e);
            if let Err(unwind) = routing.remove_secondary_output(engine.backend_mut()) {
                warn!("{}", unwind);
            }
            for id in routing.registered().into_iter().rev() {
                if let Err(unwind) = routing.unregister(engine.backend_mut(), id) {
                    warn!("{}", unwind);
                }
            }
            if let Err(unwind) = engine.unload_bank(&bank) {
                warn!("{}", unwind);
            }
            return Err(SceneError::Setup(e));
        }

        self.routing = Some(routing);
        self.recordable.playing = false;
        self.non_recordable.playing = false;
        self.state = SceneState::BANK_LOADED;

        info!(scene = %self.config.title, "Scene active");
        Ok(())
    }

    fn configure_routing(
        &self,
        routing: &mut OutputRouting,
        engine: &mut AudioEngine,
    ) -> AudioResult<()> {
        let secondary = self.config.secondary_listener;

        routing.register_listener(engine.backend_mut(), secondary, "Secondary Listener")?;
        routing.add_secondary_output(engine.backend_mut(), secondary)?;

        routing.register_emitter(engine.backend_mut(), self.recordable.emitter, "Recordable music")?;
        routing.register_emitter(
            engine.backend_mut(),
            self.non_recordable.emitter,
            "Non-recordable music",
        )?;

        // The recordable emitter keeps default routing.
        routing.set_exclusive_output(engine.backend_mut(), self.non_recordable.emitter, secondary)
    }

    /// Handle a button press; returns the button's new label.
    #[instrument(name = "scene_toggle", skip(self, engine))]
    pub fn toggle(&mut self, engine: &mut AudioEngine, control: ToggleControl) -> SceneResult<String> {
        if !self.state.is_active() {
            return Err(SceneError::NotActive);
        }

        let toggle = match control {
            ToggleControl::Recordable => &mut self.recordable,
            ToggleControl::NonRecordable => &mut self.non_recordable,
        };

        if toggle.playing {
            engine.stop_all(Some(toggle.emitter));
            toggle.playing = false;
        } else {
            engine.post_event(&toggle.event, toggle.emitter);
            toggle.playing = true;
        }

        self.state = SceneState::Active {
            recordable: self.recordable.playing,
            non_recordable: self.non_recordable.playing,
        };

        Ok(self.label(control).to_string())
    }

    /// Stop everything and release the scene's registrations and bank.
    ///
    /// Every step runs regardless of earlier failures.
    #[instrument(name = "scene_deactivate", skip_all)]
    pub fn deactivate(&mut self, engine: &mut AudioEngine) {
        if !self.state.is_active() {
            debug!("Scene not active");
            return;
        }

        engine.stop_all(None);

        let mut routing = self.routing.take();
        if let Some(routing) = routing.as_mut() {
            for emitter in [self.recordable.emitter, self.non_recordable.emitter] {
                if let Err(e) = routing.unregister(engine.backend_mut(), emitter) {
                    warn!("{}", e);
                }
            }
        }

        if let Err(e) = engine.unload_bank(&self.config.bank) {
            warn!("{}", e);
        }

        if let Some(routing) = routing.as_mut() {
            if let Err(e) = routing.remove_secondary_output(engine.backend_mut()) {
                warn!("{}", e);
            }
            if let Err(e) = routing.unregister(engine.backend_mut(), self.config.secondary_listener) {
                warn!("{}", e);
            }
        }

        self.recordable.playing = false;
        self.non_recordable.playing = false;
        self.state = SceneState::Inactive;
        info!(scene = %self.config.title, "Scene released");
    }
}
