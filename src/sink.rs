//! Virtual Sinks (§4.A, §4.G) — the two `/dev/uinput` devices the daemon
//! owns exclusively and is the only writer to.
//!
//! Built on `evdev::uinput::VirtualDeviceBuilder`/`VirtualDevice` rather than
//! the separate `uinput` crate: `other_examples/DualLink`'s injector builds
//! its mouse sink the same way (`VirtualDeviceBuilder::new()?.name(..)
//! .with_keys(&keys)?.with_relative_axes(&axes)?.build()?`, then
//! `.emit(&events)?`), and its `RelativeAxisType` already carries
//! `REL_WHEEL_HI_RES`/`REL_HWHEEL_HI_RES` as ordinary capability bits to
//! advertise up front — unlike the older `uinput` crate, which predates both
//! codes and has no typed variant for either.

use std::thread;
use std::time::Duration;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key, RelativeAxisType};

#[derive(Debug, thiserror::Error)]
#[error("uinput error: {0}")]
pub struct SinkError(#[from] std::io::Error);

fn sync() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
}

/// `(type, code, value)` + a synchronization marker — the virtual keyboard
/// sink. Advertises a broad span of key codes so verbatim forwarding (§4.D's
/// fallback path) never hits an unregistered key, matching the range
/// `other_examples/DualLink`'s injector advertises for its own keyboard sink.
pub struct KeyboardSink {
    device: VirtualDevice,
}

impl KeyboardSink {
    pub fn create() -> Result<KeyboardSink, SinkError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 1u16..=248 {
            keys.insert(Key::new(code));
        }
        let device = VirtualDeviceBuilder::new()?
            .name("kat virtual keyboard")
            .with_keys(&keys)?
            .build()?;
        Ok(KeyboardSink { device })
    }

    /// Emits a press (`value = 1`), release (`0`), or autorepeat (`2`) of
    /// `key`, followed by a sync marker.
    pub fn emit(&mut self, key: Key, value: i32) -> Result<(), SinkError> {
        let events = [InputEvent::new(EventType::KEY, key.code(), value), sync()];
        self.device.emit(&events)?;
        Ok(())
    }
}

/// The virtual mouse sink: relative X/Y, a click/hold left/right/middle
/// button set, and both the legacy integer wheel and the hi-res wheel.
pub struct MouseSink {
    device: VirtualDevice,
}

impl MouseSink {
    pub fn create() -> Result<MouseSink, SinkError> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_LEFT);
        keys.insert(Key::BTN_RIGHT);
        keys.insert(Key::BTN_MIDDLE);

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_WHEEL_HI_RES);
        axes.insert(RelativeAxisType::REL_HWHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL_HI_RES);

        let device = VirtualDeviceBuilder::new()?
            .name("kat virtual mouse")
            .with_keys(&keys)?
            .with_relative_axes(&axes)?
            .build()?;
        Ok(MouseSink { device })
    }

    pub fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        let mut events = Vec::with_capacity(3);
        if dx != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_X.0, dx));
        }
        if dy != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, RelativeAxisType::REL_Y.0, dy));
        }
        if events.is_empty() {
            return Ok(());
        }
        events.push(sync());
        self.device.emit(&events)?;
        Ok(())
    }

    /// Translates a signed wheel `speed` into hi-res units (`speed * 120`)
    /// plus, when that is non-zero, an integer notch (`hi_res / 120`) on the
    /// legacy axis — §4.E's wheel-emission rule. `vertical = true` selects
    /// `REL_WHEEL`/`REL_WHEEL_HI_RES`, `false` selects the horizontal pair
    /// (unused today but kept symmetric).
    pub fn wheel(&mut self, speed: f64, vertical: bool) -> Result<(), SinkError> {
        let hi_res = (speed * 120.0).round() as i32;
        if hi_res == 0 {
            return Ok(());
        }
        let (hi_res_axis, notch_axis) = if vertical {
            (RelativeAxisType::REL_WHEEL_HI_RES, RelativeAxisType::REL_WHEEL)
        } else {
            (RelativeAxisType::REL_HWHEEL_HI_RES, RelativeAxisType::REL_HWHEEL)
        };
        let mut events = vec![InputEvent::new(EventType::RELATIVE, hi_res_axis.0, hi_res)];
        let notches = hi_res / 120;
        if notches != 0 {
            events.push(InputEvent::new(EventType::RELATIVE, notch_axis.0, notches));
        }
        events.push(sync());
        self.device.emit(&events)?;
        Ok(())
    }

    pub fn press(&mut self, button: MouseButton) -> Result<(), SinkError> {
        let events = [InputEvent::new(EventType::KEY, button.code(), 1), sync()];
        self.device.emit(&events)?;
        Ok(())
    }

    pub fn release(&mut self, button: MouseButton) -> Result<(), SinkError> {
        let events = [InputEvent::new(EventType::KEY, button.code(), 0), sync()];
        self.device.emit(&events)?;
        Ok(())
    }

    /// Press, sync, 10ms delay, release, sync — the click sequence from
    /// §4.G.
    pub fn click(&mut self, button: MouseButton) -> Result<(), SinkError> {
        self.press(button)?;
        thread::sleep(Duration::from_millis(10));
        self.release(button)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn code(self) -> u16 {
        match self {
            MouseButton::Left => Key::BTN_LEFT.code(),
            MouseButton::Right => Key::BTN_RIGHT.code(),
            MouseButton::Middle => Key::BTN_MIDDLE.code(),
        }
    }
}

/// Write failures that mean the sink (or the kernel path to it) is gone —
/// dropped silently on the shutdown path rather than logged (§4.G, §7),
/// classified the same way `source.rs` classifies a vanished input device.
pub fn is_benign_shutdown_error(err: &SinkError) -> bool {
    matches!(err.0.raw_os_error(), Some(libc::ENODEV))
        || matches!(
            err.0.kind(),
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotFound
        )
}
