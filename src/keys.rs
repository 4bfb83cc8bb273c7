//! Named evdev key codes and the numpad direction/latch vocabulary.
//!
//! The event router works in terms of `evdev::Key` throughout; this module
//! just gives the handful of keys mouse-mode cares about short, searchable
//! names instead of repeating `evdev::Key::KEY_KP7` everywhere.

use evdev::Key;

pub const LEFT_CTRL: Key = Key::KEY_LEFTCTRL;
pub const RIGHT_CTRL: Key = Key::KEY_RIGHTCTRL;
pub const LEFT_ALT: Key = Key::KEY_LEFTALT;
pub const RIGHT_ALT: Key = Key::KEY_RIGHTALT;
pub const LEFT_SHIFT: Key = Key::KEY_LEFTSHIFT;
pub const RIGHT_SHIFT: Key = Key::KEY_RIGHTSHIFT;
pub const ESC: Key = Key::KEY_ESC;
pub const NUMLOCK: Key = Key::KEY_NUMLOCK;

pub const KP0: Key = Key::KEY_KP0;
pub const KP1: Key = Key::KEY_KP1;
pub const KP2: Key = Key::KEY_KP2;
pub const KP3: Key = Key::KEY_KP3;
pub const KP4: Key = Key::KEY_KP4;
pub const KP5: Key = Key::KEY_KP5;
pub const KP6: Key = Key::KEY_KP6;
pub const KP7: Key = Key::KEY_KP7;
pub const KP8: Key = Key::KEY_KP8;
pub const KP9: Key = Key::KEY_KP9;
pub const KP_DOT: Key = Key::KEY_KPDOT;
pub const KP_SLASH: Key = Key::KEY_KPSLASH;
pub const KP_ASTERISK: Key = Key::KEY_KPASTERISK;
pub const KP_MINUS: Key = Key::KEY_KPMINUS;
pub const KP_PLUS: Key = Key::KEY_KPPLUS;
pub const KP_ENTER: Key = Key::KEY_KPENTER;

pub const ARROW_UP: Key = Key::KEY_UP;
pub const ARROW_DOWN: Key = Key::KEY_DOWN;
pub const ARROW_LEFT: Key = Key::KEY_LEFT;
pub const ARROW_RIGHT: Key = Key::KEY_RIGHT;

pub fn is_ctrl(key: Key) -> bool {
    key == LEFT_CTRL || key == RIGHT_CTRL
}

pub fn is_alt(key: Key) -> bool {
    key == LEFT_ALT || key == RIGHT_ALT
}

pub fn is_shift(key: Key) -> bool {
    key == LEFT_SHIFT || key == RIGHT_SHIFT
}

/// One of the eight numpad directional latches, in clock order from the
/// physical layout of the numpad (KP8 = up, KP2 = down, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ];

    pub fn from_key(key: Key) -> Option<Direction> {
        match key {
            KP8 => Some(Direction::Up),
            KP2 => Some(Direction::Down),
            KP4 => Some(Direction::Left),
            KP6 => Some(Direction::Right),
            KP7 => Some(Direction::UpLeft),
            KP9 => Some(Direction::UpRight),
            KP1 => Some(Direction::DownLeft),
            KP3 => Some(Direction::DownRight),
            _ => None,
        }
    }

    /// `(sign_x, sign_y, diagonal)` — the axis signs this direction
    /// contributes, and whether it counts as a diagonal (contributes the
    /// `round(step * 0.7071)` component rather than the full step).
    pub fn axes(self) -> (i32, i32, bool) {
        match self {
            Direction::Up => (0, -1, false),
            Direction::Down => (0, 1, false),
            Direction::Left => (-1, 0, false),
            Direction::Right => (1, 0, false),
            Direction::UpLeft => (-1, -1, true),
            Direction::UpRight => (1, -1, true),
            Direction::DownLeft => (-1, 1, true),
            Direction::DownRight => (1, 1, true),
        }
    }
}

/// The drag-preserving set from the router's drag-auto-release rule: while
/// `left_button_held`, only these keys may be pressed without releasing the
/// drag. Every other press tears the drag down first.
pub fn preserves_drag(key: Key) -> bool {
    key == KP0 || key == KP_DOT || is_ctrl(key) || is_shift(key)
}

/// Keys that may be pressed while autoscroll is active without cancelling it:
/// the three modifiers plus the adjustment keys that tune autoscroll's own
/// parameters (so a held Alt+adjustment combo doesn't fight the autoscroll
/// guard that only looks at bare presses).
pub fn allowed_while_autoscroll(key: Key) -> bool {
    is_ctrl(key) || is_alt(key) || is_shift(key) || key == KP_PLUS || key == KP_ENTER || key == KP_DOT
}
