//! Top-level error type for the daemon.
//!
//! Mirrors the shape of `backend::x11::X11Error` in the teacher crate: one
//! `thiserror` enum per failure family named in the error-handling design, with
//! `#[from]` conversions from the lower-level error types so `?` works end to
//! end from `main` down through every component.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::devices::DeviceError;
use crate::pointer::PointerError;
use crate::sink::SinkError;

#[derive(Debug, thiserror::Error)]
pub enum KatError {
    #[error("no physical keyboards found under /dev/input")]
    NoKeyboardsFound,

    #[error("failed to create virtual {kind} sink: {source}")]
    SinkCreate {
        kind: &'static str,
        #[source]
        source: SinkError,
    },

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("pointer backend error: {0}")]
    Pointer(#[from] PointerError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    #[error("event loop error: {0}")]
    EventLoop(String),

    #[error("no usable $HOME and /tmp is not writable either (tried {0:?})")]
    NoConfigHome(Vec<PathBuf>),
}

pub type Result<T> = std::result::Result<T, KatError>;
