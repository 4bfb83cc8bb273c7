//! Pointer Backend (§4.F, §6) — abstract query + warp + screen geometry,
//! with an X11 implementation underneath.
//!
//! Grounded the way `backend::x11::mod.rs` opens its connection: a bare
//! `RustConnection::connect(None)`, the first screen taken from
//! `connection.setup().roots`, and `tracing` spans/events around setup
//! rather than a logger object threaded through by hand.

use std::sync::Arc;

use tracing::{debug, instrument};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::ConnectionExt;
use x11rb::rust_connection::{ConnectError, ConnectionError, ReplyError};

#[derive(Debug, thiserror::Error)]
pub enum PointerError {
    #[error("connecting to the X server failed")]
    Connect(#[from] ConnectError),
    #[error("X11 protocol error")]
    Protocol(#[from] ReplyError),
    #[error("X11 connection error")]
    Connection(#[from] ConnectionError),
}

/// Query + warp + screen geometry, kept abstract so the router and movement
/// engine can be tested against an in-memory fake instead of a real X
/// server (§10 ambient test tooling). X11 is the only implementation that
/// ships; a Wayland backend would implement the same trait.
pub trait PointerBackend: Send + Sync {
    fn screen_size(&self) -> (i32, i32);
    fn pointer_position(&self) -> Result<(i32, i32), PointerError>;
    fn warp(&self, x: i32, y: i32) -> Result<(), PointerError>;
}

pub struct X11Pointer {
    conn: Arc<x11rb::rust_connection::RustConnection>,
    root: u32,
    screen_size: (i32, i32),
}

impl X11Pointer {
    #[instrument(name = "x11_pointer_connect")]
    pub fn connect() -> Result<X11Pointer, PointerError> {
        let (conn, screen_num) = x11rb::rust_connection::RustConnection::connect(None)?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_size = (screen.width_in_pixels as i32, screen.height_in_pixels as i32);
        debug!(width = screen_size.0, height = screen_size.1, "connected to X server");
        Ok(X11Pointer {
            conn: Arc::new(conn),
            root,
            screen_size,
        })
    }
}

impl PointerBackend for X11Pointer {
    fn screen_size(&self) -> (i32, i32) {
        self.screen_size
    }

    fn pointer_position(&self) -> Result<(i32, i32), PointerError> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((reply.root_x as i32, reply.root_y as i32))
    }

    fn warp(&self, x: i32, y: i32) -> Result<(), PointerError> {
        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, x as i16, y as i16)?;
        self.conn.sync()?;
        Ok(())
    }
}

/// A true Euclidean modulo wrap: `((x + dx) mod w, (y + dy) mod h)`, always
/// non-negative, so a step off the left edge lands on the right edge rather
/// than going negative (§4.E, invariant in §8).
pub fn wrap(pos: (i32, i32), delta: (i32, i32), screen: (i32, i32)) -> (i32, i32) {
    let wrap_axis = |value: i32, extent: i32| -> i32 {
        if extent <= 0 {
            return 0;
        }
        ((value % extent) + extent) % extent
    };
    (
        wrap_axis(pos.0 + delta.0, screen.0),
        wrap_axis(pos.1 + delta.1, screen.1),
    )
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// An in-memory `PointerBackend` used by router/movement-engine tests,
    /// matching the fake-beside-the-trait style of `Session for ()` in the
    /// teacher's `backend::session::mod`.
    pub struct FakePointer {
        pub screen: (i32, i32),
        pub position: Mutex<(i32, i32)>,
    }

    impl FakePointer {
        pub fn new(screen: (i32, i32), position: (i32, i32)) -> FakePointer {
            FakePointer {
                screen,
                position: Mutex::new(position),
            }
        }
    }

    impl PointerBackend for FakePointer {
        fn screen_size(&self) -> (i32, i32) {
            self.screen
        }

        fn pointer_position(&self) -> Result<(i32, i32), PointerError> {
            Ok(*self.position.lock().unwrap())
        }

        fn warp(&self, x: i32, y: i32) -> Result<(), PointerError> {
            *self.position.lock().unwrap() = (x, y);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_result_in_range_for_negative_delta() {
        let result = wrap((5, 5), (-10, -10), (1920, 1080));
        assert_eq!(result, (1915, 1075));
    }

    #[test]
    fn wrap_handles_positive_overflow() {
        let result = wrap((1915, 1075), (10, 10), (1920, 1080));
        assert_eq!(result, (5, 5));
    }

    #[test]
    fn jump_to_center_with_margin() {
        // Ctrl+Shift+KP5 lands on screen center regardless of margin; margin
        // only governs the edge/corner jumps.
        let screen = (1920, 1080);
        assert_eq!((screen.0 / 2, screen.1 / 2), (960, 540));
    }
}
