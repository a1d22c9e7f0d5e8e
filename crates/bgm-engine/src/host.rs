//! Host application loop.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, instrument, warn};

use bgm_ipc::{HostCommand, HostEvent, SceneState, ToggleControl};

use crate::error::{EngineError, SceneError};
use crate::facade::AudioEngine;
use crate::scene::BgmScene;

/// Drives the engine and the scene from host commands, one frame at a time.
///
/// All engine and scene calls happen on the thread running [`HostLoop::run`].
pub struct HostLoop {
    command_rx: Receiver<HostCommand>,
    event_tx: Sender<HostEvent>,
    engine: AudioEngine,
    scene: BgmScene,
    frame_interval: Duration,
}

impl HostLoop {
    /// Create a host loop around an engine and a scene.
    pub fn new(
        engine: AudioEngine,
        scene: BgmScene,
        command_rx: Receiver<HostCommand>,
        event_tx: Sender<HostEvent>,
    ) -> Self {
        let frame_interval = Duration::from_millis(engine.config().frame_interval_ms.max(1));
        Self {
            command_rx,
            event_tx,
            engine,
            scene,
            frame_interval,
        }
    }

    /// Run the loop (blocking) until `Shutdown` or the command channel closes.
    #[instrument(name = "host_run", skip(self))]
    pub fn run(&mut self) {
        info!("Host loop starting");

        if let Err(e) = self.engine.init() {
            error!("Audio engine initialization failed: {}", e);
            if let EngineError::BankLoad { bank, .. } = &e {
                self.send_user_message(format!("Cannot load {bank}!"));
            }
            self.send_event(HostEvent::InitFailed {
                message: e.to_string(),
            });
            self.send_event(HostEvent::Shutdown);
            return;
        }

        self.send_event(HostEvent::Ready {
            communication: self.engine.communication_available(),
        });

        let mut next_frame = Instant::now() + self.frame_interval;

        loop {
            let timeout = next_frame.saturating_duration_since(Instant::now());

            match self.command_rx.recv_timeout(timeout) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    break;
                }
            }

            let now = Instant::now();
            if now >= next_frame {
                self.engine.update();
                next_frame += self.frame_interval;
                if next_frame < now {
                    // Fell behind; skip the missed frames.
                    next_frame = now + self.frame_interval;
                }
            }
        }

        self.shutdown();
        info!("Host loop stopped");
    }

    /// Handle a command. Returns false if the loop should stop.
    fn handle_command(&mut self, command: HostCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            HostCommand::ActivateScene => self.activate_scene(),
            HostCommand::DeactivateScene => self.deactivate_scene(),
            HostCommand::Toggle(control) => self.toggle(control),
            HostCommand::GetState => self.send_event(HostEvent::Status {
                scene: self.scene.state(),
                stats: self.engine.stats(),
            }),
            HostCommand::Shutdown => return false,
        }

        true
    }

    fn activate_scene(&mut self) {
        let previous = self.scene.state();

        match self.scene.activate(&mut self.engine) {
            Ok(()) => {
                self.notify_transition(previous);
                if !previous.is_active() {
                    for control in ToggleControl::ALL {
                        self.send_label(control);
                    }
                }
            }
            Err(e) => {
                warn!("Scene activation failed: {}", e);
                if let SceneError::BankLoad { bank, .. } = &e {
                    self.send_user_message(format!("Cannot load {bank}"));
                }
                self.send_event(HostEvent::Error {
                    recoverable: true,
                    message: e.to_string(),
                });
            }
        }
    }

    fn deactivate_scene(&mut self) {
        let previous = self.scene.state();
        self.scene.deactivate(&mut self.engine);
        self.notify_transition(previous);
    }

    fn toggle(&mut self, control: ToggleControl) {
        let previous = self.scene.state();

        match self.scene.toggle(&mut self.engine, control) {
            Ok(text) => {
                self.send_event(HostEvent::LabelChanged { control, text });
                self.notify_transition(previous);
            }
            Err(e) => {
                warn!(?control, "Toggle rejected: {}", e);
                self.send_event(HostEvent::Error {
                    recoverable: true,
                    message: e.to_string(),
                });
            }
        }
    }

    fn shutdown(&mut self) {
        info!("Shutting down audio");
        self.scene.deactivate(&mut self.engine);
        self.engine.term();
        self.send_event(HostEvent::Shutdown);
    }

    fn notify_transition(&self, previous: SceneState) {
        let current = self.scene.state();
        if previous == current {
            return;
        }

        debug!(
            previous = %previous.name(),
            current = %current.name(),
            "Scene transition"
        );
        self.send_event(HostEvent::SceneStateChanged { previous, current });
    }

    fn send_label(&self, control: ToggleControl) {
        self.send_event(HostEvent::LabelChanged {
            control,
            text: self.scene.label(control).to_string(),
        });
    }

    fn send_user_message(&self, text: String) {
        self.send_event(HostEvent::UserMessage {
            title: "Error".to_string(),
            text,
        });
    }

    fn send_event(&self, event: HostEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread::{self, JoinHandle};

    use bgm_audio::{FaultPoint, SimulatedBackend, SimulatedProbe, StatusCode};
    use bgm_ipc::{command_channel, event_channel, EngineConfig, SceneConfig};

    use super::*;
    use crate::create_host_loop;

    struct Harness {
        command_tx: Sender<HostCommand>,
        event_rx: Receiver<HostEvent>,
        probe: SimulatedProbe,
        handle: JoinHandle<()>,
    }

    impl Harness {
        fn start(backend: SimulatedBackend) -> Self {
            let probe = backend.probe();
            let mut config = EngineConfig::default();
            config.capabilities.communication = false;
            config.capabilities.secondary_output = true;
            config.frame_interval_ms = 1;

            let (command_tx, command_rx) = command_channel();
            let (event_tx, event_rx) = event_channel();
            let handle = thread::spawn(move || {
                let mut host = create_host_loop(
                    Box::new(backend),
                    config,
                    SceneConfig::default(),
                    command_rx,
                    event_tx,
                );
                host.run();
            });

            Self {
                command_tx,
                event_rx,
                probe,
                handle,
            }
        }

        fn send(&self, command: HostCommand) {
            self.command_tx.send(command).unwrap();
        }

        fn next_event(&self) -> HostEvent {
            self.event_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("event expected")
        }

        fn wait_for<T>(&self, mut pick: impl FnMut(HostEvent) -> Option<T>) -> T {
            loop {
                if let Some(value) = pick(self.next_event()) {
                    return value;
                }
            }
        }

        fn finish(self) -> SimulatedProbe {
            self.handle.join().unwrap();
            self.probe
        }
    }

    #[test]
    fn test_full_session_through_channels() {
        let harness = Harness::start(SimulatedBackend::with_demo_banks());
        assert!(matches!(harness.next_event(), HostEvent::Ready { communication: false }));

        harness.send(HostCommand::ActivateScene);
        let current = harness.wait_for(|event| match event {
            HostEvent::SceneStateChanged { current, .. } => Some(current),
            _ => None,
        });
        assert_eq!(current, SceneState::BANK_LOADED);

        harness.send(HostCommand::Toggle(ToggleControl::NonRecordable));
        let text = harness.wait_for(|event| match event {
            HostEvent::LabelChanged {
                control: ToggleControl::NonRecordable,
                text,
            } if text == "Stop" => Some(text),
            _ => None,
        });
        assert_eq!(text, "Stop");

        harness.send(HostCommand::GetState);
        let (scene, stats) = harness.wait_for(|event| match event {
            HostEvent::Status { scene, stats } => Some((scene, stats)),
            _ => None,
        });
        assert!(scene.is_playing(ToggleControl::NonRecordable));
        assert_eq!(stats.events_posted, 1);
        assert!(!harness.probe.reaches_main_output(bgm_ipc::NON_RECORDABLE_EMITTER_ID));

        harness.send(HostCommand::Shutdown);
        harness.wait_for(|event| matches!(event, HostEvent::Shutdown).then_some(()));

        let probe = harness.finish();
        assert!(probe.is_clean());
        assert_eq!(probe.unload_count("BGM.bnk"), 1);
    }

    #[test]
    fn test_init_bank_failure_reports_message_and_stops() {
        let backend = SimulatedBackend::with_demo_banks();
        backend
            .probe()
            .fail(FaultPoint::LoadBank("Init.bnk".to_string()), StatusCode::BankReadError);
        let harness = Harness::start(backend);

        match harness.next_event() {
            HostEvent::UserMessage { title, text } => {
                assert_eq!(title, "Error");
                assert_eq!(text, "Cannot load Init.bnk!");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(harness.next_event(), HostEvent::InitFailed { .. }));
        assert!(matches!(harness.next_event(), HostEvent::Shutdown));

        let probe = harness.finish();
        assert!(probe.is_clean());
    }

    #[test]
    fn test_toggle_before_activation_is_recoverable_error() {
        let harness = Harness::start(SimulatedBackend::with_demo_banks());
        assert!(matches!(harness.next_event(), HostEvent::Ready { .. }));

        harness.send(HostCommand::Toggle(ToggleControl::Recordable));
        assert!(matches!(
            harness.next_event(),
            HostEvent::Error {
                recoverable: true,
                ..
            }
        ));

        let Harness {
            command_tx,
            event_rx,
            probe,
            handle,
        } = harness;
        drop(command_tx);
        handle.join().unwrap();

        let last = event_rx.try_iter().last();
        assert!(matches!(last, Some(HostEvent::Shutdown)));
        assert!(probe.is_clean());
    }

    #[test]
    fn test_frames_pumped_while_idle() {
        let harness = Harness::start(SimulatedBackend::with_demo_banks());
        assert!(matches!(harness.next_event(), HostEvent::Ready { .. }));

        thread::sleep(Duration::from_millis(50));
        harness.send(HostCommand::GetState);
        let stats = harness.wait_for(|event| match event {
            HostEvent::Status { stats, .. } => Some(stats),
            _ => None,
        });
        assert!(stats.frames_rendered > 0);

        harness.send(HostCommand::Shutdown);
        harness.finish();
    }
}
