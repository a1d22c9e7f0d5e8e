//! Headless host for the background music routing demo.

mod commands;
mod config;
mod view;

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bgm_audio::SimulatedBackend;
use bgm_engine::create_host_loop;
use bgm_ipc::{command_channel, event_channel, HostCommand, HostEvent};

pub use commands::{parse_input, Input};
pub use config::{config_path, DemoConfig, CONFIG_ENV_VAR};
pub use view::{describe, DemoView};

const EVENT_WAIT: Duration = Duration::from_millis(250);
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Application state shared between the input loop and command handlers.
pub struct AppState {
    pub command_tx: Sender<HostCommand>,
    pub event_rx: Mutex<Receiver<HostEvent>>,
    pub view: Mutex<DemoView>,
}

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "bgm_demo=debug,bgm_engine=debug,bgm_audio=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn print_events(events: &[HostEvent]) {
    for event in events {
        println!("{}", describe(event));
    }
}

pub fn run() -> anyhow::Result<()> {
    init_logging();
    info!("BGM demo starting");

    let config = DemoConfig::load(config_path().as_deref())?;

    // Create IPC channels
    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    // Start the engine loop in a background thread
    let DemoConfig {
        engine: engine_config,
        scene: scene_config,
    } = config;
    let view = DemoView::new(&scene_config);
    let handle = thread::Builder::new()
        .name("bgm-host".to_string())
        .spawn(move || {
            let backend = SimulatedBackend::with_demo_banks();
            let mut host = create_host_loop(
                Box::new(backend),
                engine_config,
                scene_config,
                command_rx,
                event_tx,
            );
            host.run();
        })
        .context("Failed to spawn engine thread")?;

    let state = AppState {
        command_tx,
        event_rx: Mutex::new(event_rx),
        view: Mutex::new(view),
    };

    let startup = commands::wait_for(&state, SHUTDOWN_WAIT, |event| {
        matches!(event, HostEvent::Ready { .. } | HostEvent::Shutdown)
    })
    .context("Engine thread did not report readiness")?;
    print_events(&startup);

    if state.view.lock().is_finished() {
        let _ = handle.join();
        bail!("Audio engine failed to initialize");
    }

    println!("{}", state.view.lock().render());
    input_loop(&state)?;

    if !state.view.lock().is_finished() {
        if let Err(e) = commands::send_command(&state, HostCommand::Shutdown) {
            warn!("{}", e);
        }
        match commands::wait_for(&state, SHUTDOWN_WAIT, |event| {
            matches!(event, HostEvent::Shutdown)
        }) {
            Some(events) => print_events(&events),
            None => warn!("Engine thread did not confirm shutdown"),
        }
    }

    if handle.join().is_err() {
        error!("Engine thread panicked");
        bail!("Engine thread panicked");
    }

    info!("BGM demo stopped");
    Ok(())
}

fn input_loop(state: &AppState) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            info!("Input closed");
            return Ok(());
        };
        let line = line.context("Failed to read input")?;

        match parse_input(&line) {
            Some(Input::Command(command)) => {
                if let Err(e) = commands::send_command(state, command) {
                    error!("{}", e);
                    return Ok(());
                }
                print_events(&commands::poll_events(state, EVENT_WAIT));
                if state.view.lock().is_finished() {
                    return Ok(());
                }
            }
            Some(Input::Menu) => println!("{}", state.view.lock().render()),
            Some(Input::Quit) => return Ok(()),
            None => println!("unknown key, [m] shows the menu"),
        }
    }
}
