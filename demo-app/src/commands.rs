//! Keyboard command handlers.

use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, instrument};

use bgm_ipc::{HostCommand, HostEvent, ToggleControl};

use crate::AppState;

/// What a line of keyboard input asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Forward a command to the engine loop.
    Command(HostCommand),
    /// Redraw the menu.
    Menu,
    /// Leave the demo.
    Quit,
}

/// Map a line of input to an action. Only the first character counts.
pub fn parse_input(line: &str) -> Option<Input> {
    let key = line.trim().chars().next()?.to_ascii_lowercase();
    let input = match key {
        'a' => Input::Command(HostCommand::ActivateScene),
        'd' => Input::Command(HostCommand::DeactivateScene),
        'r' => Input::Command(HostCommand::Toggle(ToggleControl::Recordable)),
        'n' => Input::Command(HostCommand::Toggle(ToggleControl::NonRecordable)),
        's' => Input::Command(HostCommand::GetState),
        'm' => Input::Menu,
        'q' => Input::Quit,
        _ => return None,
    };
    Some(input)
}

/// Send a command to the engine loop.
#[instrument(skip(state))]
pub fn send_command(state: &AppState, command: HostCommand) -> Result<(), String> {
    debug!("Sending command");
    state
        .command_tx
        .send(command)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Wait up to `timeout` for the first event, then drain whatever else is queued.
///
/// Every returned event has already been applied to the view.
pub fn poll_events(state: &AppState, timeout: Duration) -> Vec<HostEvent> {
    let rx = state.event_rx.lock();
    let mut events = Vec::new();

    match rx.recv_timeout(timeout) {
        Ok(event) => events.push(event),
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return events,
    }
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    drop(rx);

    let mut view = state.view.lock();
    for event in &events {
        view.apply(event);
    }
    events
}

/// Wait until an event matching `pick` arrives, applying everything seen.
pub fn wait_for(
    state: &AppState,
    timeout: Duration,
    mut pick: impl FnMut(&HostEvent) -> bool,
) -> Option<Vec<HostEvent>> {
    let mut seen = Vec::new();
    loop {
        let batch = poll_events(state, timeout);
        if batch.is_empty() {
            return None;
        }
        let found = batch.iter().any(&mut pick);
        seen.extend(batch);
        if found {
            return Some(seen);
        }
    }
}
