//! Movement Engine (§4.E) — the background thread that turns held latches
//! into pointer motion and wheel emission.
//!
//! Runs on its own `std::thread`, independent of the calloop event loop T1
//! drives, because its cadence is a variable sleep (the acceleration ramp,
//! the jump interval, the scroll interval) rather than "wake on fd
//! readable". Each tick takes the modal lock only long enough to copy out
//! `MovementSnapshot` plus a `Config` value — both `Copy` — then does all
//! I/O (pointer query/warp, wheel emission) after releasing it, per §5's
//! "T2 performs no I/O under lock" rule.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::Config;
use crate::feedback::Feedback;
use crate::keys::Direction;
use crate::pointer::{wrap, PointerBackend};
use crate::sink::{is_benign_shutdown_error, MouseSink};
use crate::state::{AppState, MovementSnapshot};

/// How often the engine polls when nothing is latched — cheap enough not to
/// matter, fine-grained enough that mouse mode toggling or a fresh latch
/// never waits more than this before the first tick notices it.
const IDLE_POLL: Duration = Duration::from_millis(16);

const PANEL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MovementEngine<'a> {
    app: &'a AppState,
    mouse: &'a Mutex<MouseSink>,
    pointer: &'a dyn PointerBackend,
    feedback: &'a dyn Feedback,
}

impl<'a> MovementEngine<'a> {
    pub fn new(
        app: &'a AppState,
        mouse: &'a Mutex<MouseSink>,
        pointer: &'a dyn PointerBackend,
        feedback: &'a dyn Feedback,
    ) -> MovementEngine<'a> {
        MovementEngine { app, mouse, pointer, feedback }
    }

    /// Runs until `app.is_running()` goes false (§5 shutdown). Intended to be
    /// the body of the spawned thread in `main.rs`.
    pub fn run(&self) {
        while self.app.is_running() {
            let delay = self.tick();
            thread::sleep(delay);
        }
    }

    fn tick(&self) -> Duration {
        self.maybe_dismiss_panel();

        let snapshot = {
            let modal = self.app.modal.lock().expect("modal mutex poisoned");
            modal.snapshot_for_movement()
        };
        let cfg = *self.app.config.lock().expect("config mutex poisoned");

        if !snapshot.mouse_mode {
            self.reset_ramp();
            return IDLE_POLL;
        }

        if !snapshot.directions.is_empty() {
            if snapshot.ctrl_pressed {
                self.reset_ramp();
                self.apply_jump_step(&snapshot, &cfg);
                return Duration::from_millis(cfg.jump_interval_ms.max(1) as u64);
            }
            let interval = self.smooth_interval(&cfg);
            self.apply_smooth_step(&snapshot, &cfg);
            return interval;
        }
        self.reset_ramp();

        if snapshot.scroll_up || snapshot.scroll_down || snapshot.autoscroll_up || snapshot.autoscroll_down {
            self.apply_wheel(&snapshot, &cfg);
            let autoscroll_active = snapshot.autoscroll_up || snapshot.autoscroll_down;
            let interval_ms = if autoscroll_active { cfg.autoscroll_interval_ms } else { cfg.scroll_interval_ms };
            return Duration::from_millis(interval_ms.max(1) as u64);
        }

        IDLE_POLL
    }

    fn reset_ramp(&self) {
        let mut modal = self.app.modal.lock().expect("modal mutex poisoned");
        modal.movement_start_time = None;
    }

    /// Ramps the tick interval from `movement_interval_slow_ms` down to
    /// `movement_interval_fast_ms` over `movement_acceleration_time` seconds
    /// of continuously-held direction (§4.E). The pixel step itself
    /// (`mouse_speed`) does not change — only how often a step is taken.
    fn smooth_interval(&self, cfg: &Config) -> Duration {
        let now = Instant::now();
        let start = {
            let mut modal = self.app.modal.lock().expect("modal mutex poisoned");
            *modal.movement_start_time.get_or_insert(now)
        };
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        let accel = cfg.movement_acceleration_time.max(0.001);
        let t = (elapsed / accel).min(1.0);
        let slow = cfg.movement_interval_slow_ms as f64;
        let fast = cfg.movement_interval_fast_ms as f64;
        let ms = slow + (fast - slow) * t;
        Duration::from_millis(ms.round().max(1.0) as u64)
    }

    /// Sums every held direction's contribution — diagonals contribute
    /// `round(mouse_speed * 0.7071)` rather than the full step (§4.E) — then
    /// warps the pointer by the combined delta, wrapping at screen edges.
    fn apply_smooth_step(&self, snapshot: &MovementSnapshot, cfg: &Config) {
        let (dx, dy) = combined_delta(snapshot, cfg.mouse_speed as i32);
        if dx == 0 && dy == 0 {
            return;
        }
        self.warp_by(dx, dy);
    }

    fn apply_jump_step(&self, snapshot: &MovementSnapshot, cfg: &Config) {
        let mut dx = 0i32;
        let mut dy = 0i32;
        for dir in snapshot.directions.iter_held() {
            let (sx, sy, diagonal) = dir.axes();
            let step = if diagonal {
                (cfg.jump_diagonal as f64 * std::f64::consts::FRAC_1_SQRT_2).round() as i32
            } else if sx != 0 {
                cfg.jump_horizontal as i32
            } else {
                cfg.jump_vertical as i32
            };
            dx += sx * step;
            dy += sy * step;
        }
        if dx == 0 && dy == 0 {
            return;
        }
        self.warp_by(dx, dy);
    }

    fn warp_by(&self, dx: i32, dy: i32) {
        let pos = match self.pointer.pointer_position() {
            Ok(pos) => pos,
            Err(err) => {
                warn!("could not read pointer position: {err}");
                return;
            }
        };
        let screen = self.pointer.screen_size();
        let target = wrap(pos, (dx, dy), screen);
        if let Err(err) = self.pointer.warp(target.0, target.1) {
            warn!("pointer warp failed: {err}");
        }
    }

    /// Wheel direction convention: up is positive. `scroll_up`/`autoscroll_up`
    /// emit a positive-speed tick, the down latches a negative one; holding
    /// both cancels out rather than picking a winner.
    fn apply_wheel(&self, snapshot: &MovementSnapshot, cfg: &Config) {
        let autoscroll_active = snapshot.autoscroll_up || snapshot.autoscroll_down;
        let speed = if autoscroll_active { cfg.autoscroll_speed } else { cfg.scroll_speed };
        let up = snapshot.scroll_up || snapshot.autoscroll_up;
        let down = snapshot.scroll_down || snapshot.autoscroll_down;
        let signed = if up && !down {
            speed
        } else if down && !up {
            -speed
        } else {
            return;
        };
        let mut sink = self.mouse.lock().expect("mouse sink mutex poisoned");
        if let Err(err) = sink.wheel(signed, true) {
            if !is_benign_shutdown_error(&err) {
                warn!("wheel emission failed: {err}");
            }
        }
    }

    /// Closes the config panel when it has been idle for `PANEL_TIMEOUT` or
    /// the pointer has moved away from where it was opened (§4.H).
    fn maybe_dismiss_panel(&self) {
        let (opened_at, timed_out) = {
            let modal = self.app.modal.lock().expect("modal mutex poisoned");
            if !modal.panel.active {
                return;
            }
            let timed_out = modal
                .panel
                .last_activity
                .map(|t| Instant::now().saturating_duration_since(t) > PANEL_TIMEOUT)
                .unwrap_or(false);
            (modal.panel.opened_at, timed_out)
        };
        let moved = match (opened_at, self.pointer.pointer_position()) {
            (Some(opened), Ok(current)) => opened != current,
            _ => false,
        };
        if !timed_out && !moved {
            return;
        }
        let mut modal = self.app.modal.lock().expect("modal mutex poisoned");
        if !modal.panel.active {
            return;
        }
        // Unlike the router path, this thread holds no config guard of its
        // own going in, so locking here is safe (no reentrant lock attempt).
        let cfg = self.app.config.lock().expect("config mutex poisoned");
        crate::router::hide_panel_and_save(self.app, &mut modal, &cfg, self.feedback);
    }
}

fn combined_delta(snapshot: &MovementSnapshot, mouse_speed: i32) -> (i32, i32) {
    let mut dx = 0i32;
    let mut dy = 0i32;
    for dir in snapshot.directions.iter_held() {
        let (sx, sy, diagonal) = dir.axes();
        let step = if diagonal {
            (mouse_speed as f64 * std::f64::consts::FRAC_1_SQRT_2).round() as i32
        } else {
            mouse_speed
        };
        dx += sx * step;
        dy += sy * step;
    }
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DirectionLatches;

    fn snapshot_with(directions: DirectionLatches) -> MovementSnapshot {
        MovementSnapshot {
            directions,
            scroll_up: false,
            scroll_down: false,
            ctrl_pressed: false,
            mouse_mode: true,
            autoscroll_up: false,
            autoscroll_down: false,
        }
    }

    #[test]
    fn single_direction_uses_full_step() {
        let snap = snapshot_with(DirectionLatches::RIGHT);
        assert_eq!(combined_delta(&snap, 10), (10, 0));
    }

    #[test]
    fn diagonal_direction_scales_by_inverse_root_two() {
        let snap = snapshot_with(DirectionLatches::UP_RIGHT);
        assert_eq!(combined_delta(&snap, 10), (7, -7));
    }

    #[test]
    fn opposing_directions_cancel() {
        let mut latches = DirectionLatches::empty();
        latches.set_direction(Direction::Left, true);
        latches.set_direction(Direction::Right, true);
        assert_eq!(combined_delta(&snapshot_with(latches), 10), (0, 0));
    }
}
