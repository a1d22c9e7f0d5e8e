//! Text rendering of the demo scene.

use std::fmt::Write as _;

use bgm_ipc::{HostEvent, SceneConfig, SceneState, ToggleControl};

/// What the host shows: title, description and the two buttons.
#[derive(Debug, Clone)]
pub struct DemoView {
    title: String,
    description: String,
    recordable_label: String,
    non_recordable_label: String,
    scene: SceneState,
    communication: bool,
    finished: bool,
}

impl DemoView {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            recordable_label: config.recordable_label.clone(),
            non_recordable_label: config.non_recordable_label.clone(),
            scene: SceneState::Inactive,
            communication: false,
            finished: false,
        }
    }

    /// Fold an engine event into the view.
    pub fn apply(&mut self, event: &HostEvent) {
        match event {
            HostEvent::Ready { communication } => self.communication = *communication,
            HostEvent::SceneStateChanged { current, .. } => self.scene = *current,
            HostEvent::Status { scene, .. } => self.scene = *scene,
            HostEvent::LabelChanged { control, text } => match control {
                ToggleControl::Recordable => self.recordable_label = text.clone(),
                ToggleControl::NonRecordable => self.non_recordable_label = text.clone(),
            },
            HostEvent::Shutdown => self.finished = true,
            HostEvent::InitFailed { .. }
            | HostEvent::UserMessage { .. }
            | HostEvent::Error { .. } => {}
        }
    }

    pub fn label(&self, control: ToggleControl) -> &str {
        match control {
            ToggleControl::Recordable => &self.recordable_label,
            ToggleControl::NonRecordable => &self.non_recordable_label,
        }
    }

    pub fn scene(&self) -> SceneState {
        self.scene
    }

    /// Whether the engine loop has shut down.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Render the scene as a keyboard menu.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ==", self.title);
        let _ = writeln!(out, "{}", self.description);
        let _ = writeln!(out);
        if self.scene.is_active() {
            let _ = writeln!(out, "  [r] {}", self.label(ToggleControl::Recordable));
            let _ = writeln!(out, "  [n] {}", self.label(ToggleControl::NonRecordable));
            let _ = writeln!(out, "  [d] Leave scene");
        } else {
            let _ = writeln!(out, "  [a] Enter scene");
        }
        let _ = writeln!(out, "  [s] Status   [m] Menu   [q] Quit");
        let _ = write!(
            out,
            "scene: {}{}",
            self.scene.name(),
            if self.communication { "  (authoring tool connected)" } else { "" }
        );
        out
    }
}

/// One-line description of an event for the console.
pub fn describe(event: &HostEvent) -> String {
    match event {
        HostEvent::Ready { communication } => {
            format!("engine ready (communication: {communication})")
        }
        HostEvent::InitFailed { message } => format!("engine failed to start: {message}"),
        HostEvent::SceneStateChanged { previous, current } => {
            format!("scene {} -> {}", previous.name(), current.name())
        }
        HostEvent::LabelChanged { control, text } => format!("{control:?} button: \"{text}\""),
        HostEvent::Status { scene, stats } => format!(
            "scene {} | frames {} | events {} | stops {} | init failures {}",
            scene.name(),
            stats.frames_rendered,
            stats.events_posted,
            stats.stop_requests,
            stats.init_failures
        ),
        HostEvent::UserMessage { title, text } => format!("[{title}] {text}"),
        HostEvent::Error {
            recoverable,
            message,
        } => {
            if *recoverable {
                format!("error: {message}")
            } else {
                format!("fatal error: {message}")
            }
        }
        HostEvent::Shutdown => "engine stopped".to_string(),
    }
}
