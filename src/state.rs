//! Modal State (§3, §5 ownership) — the one record T1 and T2 share.
//!
//! `AppState` bundles the mutex-protected modal record with the config and
//! the running flag. Rust's borrow checker has no notion of an intentionally
//! "unlocked, tolerant of torn reads" field the way the original's raw
//! process-global struct does; the nearest honest idiom is a `Mutex` the
//! movement engine holds only long enough to snapshot, same as it already
//! does for the modal record (§5 already requires this discipline for the
//! modal fields — we simply apply it to config too instead of leaving a
//! genuine data race in safe code).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use evdev::Key;

use crate::config::Config;
use crate::keys::Direction;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DirectionLatches: u8 {
        const UP         = 0b0000_0001;
        const DOWN       = 0b0000_0010;
        const LEFT       = 0b0000_0100;
        const RIGHT      = 0b0000_1000;
        const UP_LEFT    = 0b0001_0000;
        const UP_RIGHT   = 0b0010_0000;
        const DOWN_LEFT  = 0b0100_0000;
        const DOWN_RIGHT = 0b1000_0000;
    }
}

impl DirectionLatches {
    pub fn for_direction(dir: Direction) -> DirectionLatches {
        match dir {
            Direction::Up => DirectionLatches::UP,
            Direction::Down => DirectionLatches::DOWN,
            Direction::Left => DirectionLatches::LEFT,
            Direction::Right => DirectionLatches::RIGHT,
            Direction::UpLeft => DirectionLatches::UP_LEFT,
            Direction::UpRight => DirectionLatches::UP_RIGHT,
            Direction::DownLeft => DirectionLatches::DOWN_LEFT,
            Direction::DownRight => DirectionLatches::DOWN_RIGHT,
        }
    }

    pub fn set_direction(&mut self, dir: Direction, held: bool) {
        self.set(DirectionLatches::for_direction(dir), held);
    }

    pub fn iter_held(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |d| self.contains(DirectionLatches::for_direction(*d)))
    }
}

/// A Control press that arrived but has not yet been emitted to the virtual
/// keyboard sink, awaiting disambiguation (§3, §4.C, §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCtrl {
    None,
    Left,
    Right,
}

impl PendingCtrl {
    pub fn key(self) -> Option<Key> {
        match self {
            PendingCtrl::None => None,
            PendingCtrl::Left => Some(crate::keys::LEFT_CTRL),
            PendingCtrl::Right => Some(crate::keys::RIGHT_CTRL),
        }
    }

    pub fn for_key(key: Key) -> PendingCtrl {
        if key == crate::keys::LEFT_CTRL {
            PendingCtrl::Left
        } else {
            PendingCtrl::Right
        }
    }
}

/// Which Controls were retroactively emitted as a press, so their eventual
/// release can be paired and forwarded too (§3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardedCtrl {
    pub left: bool,
    pub right: bool,
}

impl ForwardedCtrl {
    pub fn is_forwarded(&self, key: Key) -> bool {
        if key == crate::keys::LEFT_CTRL {
            self.left
        } else {
            self.right
        }
    }

    pub fn mark(&mut self, key: Key, forwarded: bool) {
        if key == crate::keys::LEFT_CTRL {
            self.left = forwarded;
        } else {
            self.right = forwarded;
        }
    }
}

/// The config panel's own small bit of modal state: whether it is showing,
/// and which of the 13 rows is currently selected for KP4/KP6 adjustment.
#[derive(Debug, Clone, Copy, Default)]
pub struct Panel {
    pub active: bool,
    pub selected_row: usize,
    pub opened_at: Option<(i32, i32)>,
    pub last_activity: Option<Instant>,
}

/// The shared modal record (§3). Every field here is touched by the router
/// thread (T1); `directions`, `scroll_up`, `scroll_down`, `autoscroll_up`,
/// `autoscroll_down`, `ctrl_pressed`, and `mouse_mode` are also read by the
/// movement engine thread (T2) under the same lock.
#[derive(Debug)]
pub struct ModalState {
    pub ctrl_pressed: bool,
    pub alt_pressed: bool,
    pub shift_pressed: bool,
    pub mouse_mode: bool,
    pub directions: DirectionLatches,
    pub scroll_up: bool,
    pub scroll_down: bool,
    pub autoscroll_up: bool,
    pub autoscroll_down: bool,
    pub left_button_held: bool,
    pub drag_locked: bool,
    pub drag_popup_visible: bool,
    pub last_ctrl_press_time: Option<Instant>,
    pub last_alt_press_time: Option<Instant>,
    pub pending_ctrl: PendingCtrl,
    pub forwarded_ctrl: ForwardedCtrl,
    pub movement_start_time: Option<Instant>,
    pub adjust_start_times: HashMap<Key, Instant>,
    pub last_autoscroll_feedback_time: Option<Instant>,
    pub panel: Panel,
}

impl Default for ModalState {
    fn default() -> ModalState {
        ModalState {
            ctrl_pressed: false,
            alt_pressed: false,
            shift_pressed: false,
            mouse_mode: false,
            directions: DirectionLatches::empty(),
            scroll_up: false,
            scroll_down: false,
            autoscroll_up: false,
            autoscroll_down: false,
            left_button_held: false,
            drag_locked: false,
            drag_popup_visible: false,
            last_ctrl_press_time: None,
            last_alt_press_time: None,
            pending_ctrl: PendingCtrl::None,
            forwarded_ctrl: ForwardedCtrl::default(),
            movement_start_time: None,
            adjust_start_times: HashMap::new(),
            last_autoscroll_feedback_time: None,
            panel: Panel::default(),
        }
    }
}

impl ModalState {
    /// Clears every directional and scroll latch. Called on a Ctrl *press*
    /// transition (§4.C) and on panel show (§4.H) — neither case restores
    /// them afterward, matching original_source's actual behavior (see
    /// DESIGN.md's resolution of the corresponding Open Question).
    pub fn clear_movement_latches(&mut self) {
        self.directions = DirectionLatches::empty();
        self.scroll_up = false;
        self.scroll_down = false;
    }

    pub fn clear_autoscroll(&mut self) {
        self.autoscroll_up = false;
        self.autoscroll_down = false;
    }

    /// A read-only snapshot of exactly the fields the movement engine needs,
    /// taken under the lock and used after releasing it (§5).
    pub fn snapshot_for_movement(&self) -> MovementSnapshot {
        MovementSnapshot {
            directions: self.directions,
            scroll_up: self.scroll_up,
            scroll_down: self.scroll_down,
            ctrl_pressed: self.ctrl_pressed,
            mouse_mode: self.mouse_mode,
            autoscroll_up: self.autoscroll_up,
            autoscroll_down: self.autoscroll_down,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MovementSnapshot {
    pub directions: DirectionLatches,
    pub scroll_up: bool,
    pub scroll_down: bool,
    pub ctrl_pressed: bool,
    pub mouse_mode: bool,
    pub autoscroll_up: bool,
    pub autoscroll_down: bool,
}

/// Everything T1 and T2 share, plus the daemon-wide shutdown flag.
pub struct AppState {
    pub modal: Mutex<ModalState>,
    pub config: Mutex<Config>,
    pub config_path: std::path::PathBuf,
    pub config_dirty: AtomicBool,
    pub running: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, config_path: std::path::PathBuf) -> AppState {
        AppState {
            modal: Mutex::new(ModalState::default()),
            config: Mutex::new(config),
            config_path,
            config_dirty: AtomicBool::new(false),
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn mark_config_dirty(&self) {
        self.config_dirty.store(true, Ordering::Relaxed);
    }

    /// Flushes a pending dirty save synchronously, per the debounce
    /// guarantee in §9: panel-hide and shutdown never leave an edit unsaved.
    pub fn flush_config(&self) -> Result<(), crate::config::ConfigError> {
        if self.config_dirty.swap(false, Ordering::Relaxed) {
            let cfg = *self.config.lock().expect("modal state mutex poisoned");
            cfg.save(&self.config_path)?;
        }
        Ok(())
    }

    /// Unconditional save of an already-held `cfg`, used by the panel-hide
    /// path (router and movement engine both reach it via
    /// `router::hide_panel_and_save`), which always persists rather than only
    /// when dirty. Takes `cfg` by reference instead of re-locking
    /// `self.config`: the router calls this while still holding its own
    /// config guard for the duration of `route_event`, and `Mutex` is not
    /// reentrant, so a second lock attempt on that path would deadlock.
    pub fn save_config_with(&self, cfg: &crate::config::Config) -> Result<(), crate::config::ConfigError> {
        cfg.save(&self.config_path)?;
        self.config_dirty.store(false, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_latches_round_trip_through_bitflags() {
        let mut latches = DirectionLatches::empty();
        latches.set_direction(Direction::UpRight, true);
        assert!(latches.contains(DirectionLatches::UP_RIGHT));
        let held: Vec<_> = latches.iter_held().collect();
        assert_eq!(held, vec![Direction::UpRight]);
    }

    #[test]
    fn forwarded_ctrl_tracks_each_side_independently() {
        let mut forwarded = ForwardedCtrl::default();
        forwarded.mark(crate::keys::LEFT_CTRL, true);
        assert!(forwarded.is_forwarded(crate::keys::LEFT_CTRL));
        assert!(!forwarded.is_forwarded(crate::keys::RIGHT_CTRL));
    }
}
