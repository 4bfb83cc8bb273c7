//! Event Source (§4.B) — draining one grabbed device's queued events.
//!
//! Registration onto the bounded multiplexed wait happens in `main.rs` via
//! `calloop::generic::Generic`, the same fd-source idiom `smallvil`'s state
//! setup uses for the Wayland display socket
//! (`Generic::new(fd, Interest::READ, Mode::Level)`); this module only owns
//! the per-device drain-to-`RawEvent` step, independent of calloop, so it's
//! exercised in tests without a loop.

use evdev::{Device, EventType, Key};
use tracing::warn;

/// A single `EV_KEY` report: `(code, value)` with the timestamp stripped —
/// the router only ever reasons about press (1) / release (0) / autorepeat
/// (2), never wall-clock-from-the-kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub key: Key,
    pub value: i32,
}

pub enum DrainResult {
    /// Zero or more `EV_KEY` events were queued (possibly none — a `SYN` or
    /// `MSC` report with no key changes still drains to empty).
    Events(Vec<RawEvent>),
    /// Nothing was queued; the descriptor would have blocked.
    WouldBlock,
    /// The device is gone (unplugged, `ENODEV`, zero-byte read). The caller
    /// should remove this descriptor from the wait set (§4.B).
    Gone,
}

/// Drains every event currently queued for `device`, keeping only `EV_KEY`
/// reports. Other event types (`EV_MSC` scan codes, `EV_SYN`) are read and
/// discarded so they never desynchronize evdev's internal event buffering.
pub fn drain_key_events(device: &mut Device) -> DrainResult {
    match device.fetch_events() {
        Ok(events) => {
            let keys = events
                .filter(|event| event.event_type() == EventType::KEY)
                .map(|event| RawEvent {
                    key: Key::new(event.code()),
                    value: event.value(),
                })
                .collect();
            DrainResult::Events(keys)
        }
        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => DrainResult::WouldBlock,
        Err(err) => {
            let name = device.name().unwrap_or("<unnamed>").to_string();
            if matches!(err.raw_os_error(), Some(libc::ENODEV)) || err.kind() == std::io::ErrorKind::UnexpectedEof
            {
                warn!(device = %name, "device disappeared: {err}");
            } else {
                warn!(device = %name, "poll error reading device: {err}");
            }
            DrainResult::Gone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_event_carries_key_and_value() {
        let event = RawEvent {
            key: crate::keys::KP6,
            value: 1,
        };
        assert_eq!(event.key, crate::keys::KP6);
        assert_eq!(event.value, 1);
    }
}
