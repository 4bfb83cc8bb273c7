//! `kat` — turns the numpad into a mouse.
//!
//! Assembly follows `smallvil`'s `main.rs`: a small `init_logging` that
//! prefers `RUST_LOG` and falls back to a verbosity-derived level, then one
//! `calloop::EventLoop` whose `Data` is this crate's own state struct
//! (`Daemon`, playing the role `Smallvil`/`CalloopData` play there), with
//! every grabbed keyboard registered as its own `Generic` fd source — the
//! same idiom `Smallvil::init_wayland_listener` uses for the Wayland
//! display's poll fd.

mod config;
mod devices;
mod errors;
mod feedback;
mod keys;
mod movement;
mod pointer;
mod router;
mod sink;
mod source;
mod state;

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use calloop::generic::Generic;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, Interest, Mode, PostAction, RegistrationToken};
use clap::Parser;
use evdev::Device;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::{KatError, Result};
use crate::feedback::{Feedback, TracingFeedback};
use crate::pointer::{PointerBackend, X11Pointer};
use crate::sink::{is_benign_shutdown_error, KeyboardSink, MouseSink};
use crate::state::AppState;

/// Turns the numpad into a mouse: double-Ctrl-tap toggled pointer, jump,
/// scroll and drag control over raw evdev/uinput.
#[derive(Debug, Parser)]
#[command(name = "kat", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Ignored if
    /// `RUST_LOG` is set.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the config file (default: `$HOME/.config/kat/config.ini`).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        error!("{err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return;
    }
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = Config::load(&config_path)?;
    info!(path = %config_path.display(), "loaded config");

    let mut devices = devices::discover_and_grab_keyboards();
    if devices.is_empty() {
        return Err(KatError::NoKeyboardsFound);
    }
    info!(count = devices.len(), "grabbed keyboards");

    let keyboard =
        KeyboardSink::create().map_err(|source| KatError::SinkCreate { kind: "keyboard", source })?;
    let mouse = MouseSink::create().map_err(|source| KatError::SinkCreate { kind: "mouse", source })?;
    let pointer: Arc<dyn PointerBackend> = Arc::new(X11Pointer::connect()?);
    let feedback: Arc<dyn Feedback> = Arc::new(TracingFeedback);
    let mouse = Arc::new(Mutex::new(mouse));

    let app = Arc::new(AppState::new(config, config_path));
    install_signal_handlers(Arc::clone(&app)).map_err(KatError::Signal)?;

    let movement_handle = {
        let app = Arc::clone(&app);
        let mouse = Arc::clone(&mouse);
        let pointer = Arc::clone(&pointer);
        let feedback = Arc::clone(&feedback);
        std::thread::spawn(move || {
            let engine = movement::MovementEngine::new(&app, &mouse, pointer.as_ref(), feedback.as_ref());
            engine.run();
        })
    };

    let result = run_event_loop(&app, &mut devices, keyboard, Arc::clone(&mouse), pointer, feedback);

    app.request_shutdown();
    if let Err(err) = movement_handle.join() {
        warn!("movement engine thread panicked: {err:?}");
    }
    devices::ungrab_all(&mut devices);
    if let Err(err) = app.flush_config() {
        warn!("failed to flush config on shutdown: {err}");
    }

    result
}

struct Daemon {
    devices: Vec<Option<Device>>,
    tokens: Vec<Option<RegistrationToken>>,
    handle: calloop::LoopHandle<'static, Daemon>,
    app: Arc<AppState>,
    keyboard: KeyboardSink,
    mouse: Arc<Mutex<MouseSink>>,
    pointer: Arc<dyn PointerBackend>,
    feedback: Arc<dyn Feedback>,
}

impl Daemon {
    fn drain_and_route(&mut self, idx: usize) {
        let Some(device) = self.devices[idx].as_mut() else {
            return;
        };
        match source::drain_key_events(device) {
            source::DrainResult::Events(events) => {
                for event in events {
                    self.route_one(event);
                }
            }
            source::DrainResult::WouldBlock => {}
            source::DrainResult::Gone => {
                self.devices[idx] = None;
                if let Some(token) = self.tokens[idx].take() {
                    self.handle.remove(token);
                }
            }
        }
    }

    fn route_one(&mut self, event: source::RawEvent) {
        let mut modal = self.app.modal.lock().expect("modal mutex poisoned");
        let mut cfg = self.app.config.lock().expect("config mutex poisoned");
        let mut svc = router::Services {
            keyboard: &mut self.keyboard,
            mouse: &self.mouse,
            pointer: self.pointer.as_ref(),
            feedback: self.feedback.as_ref(),
        };
        if let Err(err) = router::route_event(&self.app, &mut modal, &mut cfg, &mut svc, event.key, event.value) {
            if !is_benign_shutdown_error(&err) {
                warn!("sink write failed while routing event: {err}");
            }
        }
    }
}

/// A fd-number-only wrapper so a `Generic` source can poll a device's
/// descriptor without taking ownership of the `evdev::Device` itself — the
/// real device stays in `Daemon::devices`, looked up by index when its
/// source fires.
struct BorrowedFdSource(RawFd);

impl AsFd for BorrowedFdSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        unsafe { BorrowedFd::borrow_raw(self.0) }
    }
}

fn run_event_loop(
    app: &Arc<AppState>,
    devices: &mut Vec<Device>,
    keyboard: KeyboardSink,
    mouse: Arc<Mutex<MouseSink>>,
    pointer: Arc<dyn PointerBackend>,
    feedback: Arc<dyn Feedback>,
) -> Result<()> {
    let mut event_loop: EventLoop<Daemon> =
        EventLoop::try_new().map_err(|err| KatError::EventLoop(err.to_string()))?;
    let handle = event_loop.handle();
    let signal = event_loop.get_signal();

    let mut daemon = Daemon {
        devices: devices.drain(..).map(Some).collect(),
        tokens: Vec::new(),
        handle: handle.clone(),
        app: Arc::clone(app),
        keyboard,
        mouse,
        pointer,
        feedback,
    };
    daemon.tokens = vec![None; daemon.devices.len()];

    for idx in 0..daemon.devices.len() {
        let fd = daemon.devices[idx]
            .as_ref()
            .expect("freshly populated")
            .as_raw_fd();
        let source = Generic::new(BorrowedFdSource(fd), Interest::READ, Mode::Level);
        let token = handle
            .insert_source(source, move |_, _, daemon: &mut Daemon| {
                daemon.drain_and_route(idx);
                Ok(PostAction::Continue)
            })
            .map_err(|err| KatError::EventLoop(err.to_string()))?;
        daemon.tokens[idx] = Some(token);
    }

    // Debounced config save: flushes at most once every 250ms (§9).
    handle
        .insert_source(Timer::from_duration(Duration::from_millis(250)), |_, _, daemon| {
            if let Err(err) = daemon.app.flush_config() {
                warn!("debounced config flush failed: {err}");
            }
            TimeoutAction::ToDuration(Duration::from_millis(250))
        })
        .map_err(|err| KatError::EventLoop(err.to_string()))?;

    event_loop
        .run(Duration::from_secs(1), &mut daemon, |daemon| {
            if !daemon.app.is_running() {
                signal.stop();
            }
        })
        .map_err(|err| KatError::EventLoop(err.to_string()))
}

fn install_signal_handlers(app: Arc<AppState>) -> std::result::Result<(), std::io::Error> {
    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))?;
    std::thread::spawn(move || loop {
        if term.load(Ordering::Relaxed) {
            app.request_shutdown();
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    });
    Ok(())
}
