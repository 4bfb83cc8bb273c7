//! Device Discovery & Grabbing (§4.A).
//!
//! Enumeration and classification follow `other_examples/imathew-QwertDvert`'s
//! daemon (`evdev::enumerate()`, `device.supported_keys()`,
//! `device.grab()`), generalized from that remapper's single name substring
//! filter to the spec's capability-plus-name-exclusion rule.

use evdev::{Device, Key};
use tracing::{info, warn};

pub const MAX_KEYBOARDS: usize = 16;

const VIRTUAL_DEVICE_MARKERS: [&str; 4] = ["evdev", "uinput", "Virtual", "py-"];

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to grab device {name:?}: {source}")]
    Grab {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// True iff `device` advertises key events including alphabetic A, space,
/// and Left Control, and its name doesn't match a known virtual-device
/// marker (§4.A).
fn is_physical_keyboard(device: &Device) -> bool {
    let Some(keys) = device.supported_keys() else {
        return false;
    };
    let has_required_keys =
        keys.contains(Key::KEY_A) && keys.contains(Key::KEY_SPACE) && keys.contains(Key::KEY_LEFTCTRL);
    if !has_required_keys {
        return false;
    }
    let name = device.name().unwrap_or("");
    !VIRTUAL_DEVICE_MARKERS.iter().any(|marker| name.contains(marker))
}

/// Enumerates `/dev/input/event*`, classifies each as a physical keyboard or
/// not, and exclusively grabs up to `MAX_KEYBOARDS` matches. A grab failure
/// on one device is logged and that device is skipped rather than aborting
/// discovery — one stuck device should not take down the whole daemon.
pub fn discover_and_grab_keyboards() -> Vec<Device> {
    let mut keyboards = Vec::new();
    for (path, mut device) in evdev::enumerate() {
        if keyboards.len() >= MAX_KEYBOARDS {
            warn!("reached the {} keyboard cap, ignoring {:?}", MAX_KEYBOARDS, path);
            break;
        }
        if !is_physical_keyboard(&device) {
            continue;
        }
        let name = device.name().unwrap_or("<unnamed>").to_string();
        match device.grab() {
            Ok(()) => {
                info!(device = %name, path = %path.display(), "grabbed keyboard");
                keyboards.push(device);
            }
            Err(source) => {
                warn!(error = %source, "failed to grab keyboard {name:?}, skipping it");
            }
        }
    }
    keyboards
}

/// Ungrabs every still-open descriptor. Symmetric with discovery: a failure
/// on one device is logged and the rest still get ungrabbed (§5 shutdown).
pub fn ungrab_all(devices: &mut [Device]) {
    for device in devices.iter_mut() {
        if let Err(source) = device.ungrab() {
            let name = device.name().unwrap_or("<unnamed>");
            warn!(error = %source, "failed to ungrab {name:?} during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VIRTUAL_DEVICE_MARKERS;

    #[test]
    fn virtual_markers_cover_spec_list() {
        assert_eq!(VIRTUAL_DEVICE_MARKERS, ["evdev", "uinput", "Virtual", "py-"]);
    }
}
