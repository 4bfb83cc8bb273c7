//! Event Router (§4.D) — the decision tree.
//!
//! Expressed as an ordered chain of small handler functions, each returning
//! `Option<Result<Verdict, SinkError>>`: `None` means "not my event, try the
//! next handler"; `Some(_)` means this handler claimed it. `route_event`
//! calls them in exactly the order §4.D lists, with an early return on the
//! first claim — the "ordered list of `(predicate, action) -> Verdict`"
//! the design notes (§9) ask for, just written as plain functions instead of
//! a runtime-built `Vec<Box<dyn Fn>>`: the handlers need several
//! simultaneously-mutable pieces of state (`modal`, `cfg`, the sinks), which
//! is far more awkward to express through boxed closures than through
//! ordinary `&mut` parameters.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use evdev::Key;

use crate::config::{repeat_multiplier, Config, Field};
use crate::feedback::{Feedback, JumpOverlayKind};
use crate::keys::{
    allowed_while_autoscroll, is_alt, is_ctrl, is_shift, preserves_drag, Direction, ARROW_DOWN,
    ARROW_LEFT, ARROW_RIGHT, ARROW_UP, ESC, KP0, KP1, KP2, KP3, KP4, KP5, KP6, KP7, KP8, KP9,
    KP_ASTERISK, KP_DOT, KP_ENTER, KP_MINUS, KP_PLUS, KP_SLASH, NUMLOCK,
};
use crate::pointer::PointerBackend;
use crate::sink::{KeyboardSink, MouseButton, MouseSink, SinkError};
use crate::state::{ModalState, PendingCtrl};

const DOUBLE_PRESS_WINDOW: Duration = Duration::from_millis(300);
const AUTOSCROLL_FEEDBACK_DEBOUNCE: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Consume,
    Forward,
}

/// The shared collaborators every handler may need, bundled so handler
/// signatures stay short. `modal` and `cfg` are kept as separate parameters
/// on `route_event` (not folded in here) because almost every handler needs
/// to mutate one or both of them alongside `Services` — three independent
/// `&mut`/`&` parameters borrow-check cleanly where one struct holding all
/// of them would not.
pub struct Services<'a> {
    pub keyboard: &'a mut KeyboardSink,
    pub mouse: &'a Mutex<MouseSink>,
    pub pointer: &'a dyn PointerBackend,
    pub feedback: &'a dyn Feedback,
}

/// Routes one `(key, value)` event through the full handler chain. `cfg` is
/// mutated directly by adjustment handlers; callers are expected to persist
/// it via the app's debounced save path (`AppState::mark_config_dirty`) —
/// this function never writes the config file itself except on panel hide,
/// which flushes synchronously per §9's debounce guarantee.
pub fn route_event(
    app: &crate::state::AppState,
    modal: &mut ModalState,
    cfg: &mut Config,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Result<Verdict, SinkError> {
    if let Some(result) = control_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = alt_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = shift_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = escape_panel_handler(app, modal, cfg, svc, key, value) {
        return result;
    }

    if !modal.mouse_mode {
        return forward_with_pending_ctrl(modal, svc.keyboard, key, value);
    }

    if value == 1 && (modal.autoscroll_up || modal.autoscroll_down) && !allowed_while_autoscroll(key) {
        modal.clear_autoscroll();
        maybe_show_autoscroll_off(modal, svc.feedback);
    }

    drag_auto_release_guard(modal, svc, key, value)?;

    if modal.panel.active {
        return panel_dispatch(app, modal, cfg, svc, key, value);
    }

    if let Some(result) = alt_adjustment_handler(modal, cfg, app, svc, key, value) {
        return result;
    }
    if let Some(result) = scroll_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = ctrl_kp_minus_handler(modal, key, value) {
        return result;
    }
    if let Some(result) = jump_handler(modal, cfg, svc, key, value) {
        return result;
    }
    if let Some(result) = direction_handler(modal, key, value) {
        return result;
    }
    if let Some(result) = kp5_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = drag_toggle_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = kp_asterisk_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = kp_minus_handler(modal, svc, key, value) {
        return result;
    }
    if let Some(result) = numlock_handler(modal, svc, key, value) {
        return result;
    }

    forward_with_pending_ctrl(modal, svc.keyboard, key, value)
}

/// Before forwarding a non-consumed event, emits the stored pending Control
/// press (marking it `forwarded_ctrl`) if one is outstanding, per §4.D's
/// closing paragraph.
fn forward_with_pending_ctrl(
    modal: &mut ModalState,
    keyboard: &mut KeyboardSink,
    key: Key,
    value: i32,
) -> Result<Verdict, SinkError> {
    if let Some(pending_key) = modal.pending_ctrl.key() {
        keyboard.emit(pending_key, 1)?;
        modal.forwarded_ctrl.mark(pending_key, true);
        modal.pending_ctrl = PendingCtrl::None;
    }
    keyboard.emit(key, value)?;
    Ok(Verdict::Forward)
}

// 1. Control key handler — always runs, always consumes (§4.C).
fn control_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if !is_ctrl(key) {
        return None;
    }
    let now = Instant::now();
    if value != 0 {
        modal.ctrl_pressed = true;
        modal.clear_movement_latches();
        let is_double = value == 1
            && modal
                .last_ctrl_press_time
                .map(|t| now.duration_since(t) < DOUBLE_PRESS_WINDOW)
                .unwrap_or(false);
        if is_double {
            modal.mouse_mode = !modal.mouse_mode;
            modal.last_ctrl_press_time = None;
            let had_autoscroll = modal.autoscroll_up || modal.autoscroll_down;
            if !modal.mouse_mode {
                modal.clear_autoscroll();
            }
            let text = if modal.mouse_mode {
                "Mouse Mode ON"
            } else if had_autoscroll {
                "Mouse Mode and Autoscroll OFF"
            } else {
                "Mouse Mode OFF"
            };
            svc.feedback.popup(text);
        } else if value == 1 {
            modal.pending_ctrl = PendingCtrl::for_key(key);
            modal.last_ctrl_press_time = Some(now);
        }
        Some(Ok(Verdict::Consume))
    } else {
        modal.ctrl_pressed = false;
        if modal.forwarded_ctrl.is_forwarded(key) {
            modal.forwarded_ctrl.mark(key, false);
            if let Err(err) = svc.keyboard.emit(key, 0) {
                return Some(Err(err));
            }
        }
        modal.pending_ctrl = PendingCtrl::None;
        Some(Ok(Verdict::Consume))
    }
}

// 2. Alt key handler — always consumes; forwards verbatim unless the panel
// consumed the keystroke by activating (§4.D).
fn alt_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if !is_alt(key) {
        return None;
    }
    let now = Instant::now();
    if value != 0 {
        modal.alt_pressed = true;
        if value == 1 && modal.mouse_mode && !modal.panel.active {
            let recent = modal
                .last_alt_press_time
                .map(|t| {
                    let elapsed = now.duration_since(t);
                    elapsed < DOUBLE_PRESS_WINDOW && elapsed > Duration::from_millis(10)
                })
                .unwrap_or(false);
            if recent {
                if let Err(err) = activate_panel(modal, svc) {
                    return Some(Err(err));
                }
            }
        }
        if value == 1 {
            modal.last_alt_press_time = Some(now);
        }
    } else {
        modal.alt_pressed = false;
    }
    if !modal.panel.active {
        if let Err(err) = svc.keyboard.emit(key, value) {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

fn activate_panel(modal: &mut ModalState, svc: &mut Services) -> Result<(), SinkError> {
    modal.clear_movement_latches();
    modal.clear_autoscroll();
    if modal.left_button_held {
        modal.left_button_held = false;
        svc.mouse.lock().expect("mouse sink mutex poisoned").release(MouseButton::Left)?;
    }
    modal.drag_locked = false;
    modal.drag_popup_visible = false;
    svc.feedback.drag_popup_hide();
    modal.panel.active = true;
    modal.panel.selected_row = 0;
    modal.panel.opened_at = svc.pointer.pointer_position().ok();
    modal.panel.last_activity = Some(Instant::now());
    svc.feedback.panel_show();
    Ok(())
}

// 3. Shift key handler — always consumes; forwards verbatim unless
// autoscroll is active (§4.D).
fn shift_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if !is_shift(key) {
        return None;
    }
    modal.shift_pressed = value != 0;
    if !(modal.autoscroll_up || modal.autoscroll_down) {
        if let Err(err) = svc.keyboard.emit(key, value) {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

// 4. Escape-in-panel (§4.D).
fn escape_panel_handler(
    app: &crate::state::AppState,
    modal: &mut ModalState,
    cfg: &Config,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if key != ESC || !modal.panel.active {
        return None;
    }
    if value == 1 {
        hide_panel_and_save(app, modal, cfg, svc.feedback);
    }
    Some(Ok(Verdict::Consume))
}

/// Hides the panel and persists `cfg` — the caller's already-held config
/// (either the router's `&mut Config` guard held for the duration of
/// `route_event`, or a guard the movement engine takes just for this call).
/// Takes `cfg` by reference rather than re-locking `app.config` itself:
/// `route_event`'s caller (`main.rs`) holds that lock for the whole call, and
/// `std::sync::Mutex` is not reentrant, so a second lock attempt on the same
/// thread would deadlock the router on every Escape-closes-panel keystroke.
pub(crate) fn hide_panel_and_save(
    app: &crate::state::AppState,
    modal: &mut ModalState,
    cfg: &Config,
    feedback: &dyn Feedback,
) {
    modal.panel.active = false;
    feedback.panel_hide();
    if let Err(err) = app.save_config_with(cfg) {
        tracing::warn!("failed to save config on panel hide: {err}");
    }
}

fn maybe_show_autoscroll_off(modal: &mut ModalState, feedback: &dyn Feedback) {
    let now = Instant::now();
    let should_show = modal
        .last_autoscroll_feedback_time
        .map(|t| now.duration_since(t) >= AUTOSCROLL_FEEDBACK_DEBOUNCE)
        .unwrap_or(true);
    if should_show {
        modal.last_autoscroll_feedback_time = Some(now);
        feedback.popup("Autoscroll OFF");
    }
}

fn drag_auto_release_guard(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Result<(), SinkError> {
    if value != 1 || !modal.left_button_held || preserves_drag(key) {
        return Ok(());
    }
    modal.left_button_held = false;
    svc.mouse.lock().expect("mouse sink mutex poisoned").release(MouseButton::Left)?;
    if modal.drag_locked {
        modal.drag_locked = false;
        modal.drag_popup_visible = false;
        svc.feedback.drag_popup_hide();
    }
    Ok(())
}

fn panel_dispatch(
    app: &crate::state::AppState,
    modal: &mut ModalState,
    cfg: &mut Config,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Result<Verdict, SinkError> {
    let select_delta = match key {
        KP8 | ARROW_UP => Some(-1i32),
        KP2 | ARROW_DOWN => Some(1i32),
        _ => None,
    };
    if let Some(delta) = select_delta {
        if value == 1 {
            let n = Field::ALL.len() as i32;
            modal.panel.selected_row =
                ((modal.panel.selected_row as i32 + delta).rem_euclid(n)) as usize;
            modal.panel.last_activity = Some(Instant::now());
        }
        return Ok(Verdict::Consume);
    }

    let adjust_increase = match key {
        KP6 | ARROW_RIGHT => Some(true),
        KP4 | ARROW_LEFT => Some(false),
        _ => None,
    };
    if let Some(increase) = adjust_increase {
        if value == 0 {
            modal.adjust_start_times.remove(&key);
        } else {
            let now = Instant::now();
            let start = *modal.adjust_start_times.entry(key).or_insert(now);
            let multiplier = repeat_multiplier(now.duration_since(start));
            let field = Field::ALL[modal.panel.selected_row];
            cfg.adjust(field, increase, multiplier);
            app.mark_config_dirty();
            modal.panel.last_activity = Some(Instant::now());
        }
        return Ok(Verdict::Consume);
    }

    // Any other non-navigation press hides the panel and is then forwarded.
    if value == 1 {
        hide_panel_and_save(app, modal, cfg, svc.feedback);
    }
    forward_with_pending_ctrl(modal, svc.keyboard, key, value)
}

fn adjustment_field_for(key: Key, autoscroll_active: bool) -> Option<Field> {
    Some(match key {
        NUMLOCK => Field::MouseSpeed,
        KP_ASTERISK => Field::MovementIntervalSlowMs,
        KP_MINUS => Field::MovementIntervalFastMs,
        KP_SLASH => Field::MovementAccelerationTime,
        KP4 | KP6 => Field::JumpHorizontal,
        KP2 | KP8 => Field::JumpVertical,
        KP1 | KP3 | KP7 | KP9 => Field::JumpDiagonal,
        KP5 => Field::JumpMargin,
        KP0 => Field::JumpIntervalMs,
        KP_PLUS | KP_ENTER => {
            if autoscroll_active {
                Field::AutoscrollSpeed
            } else {
                Field::ScrollSpeed
            }
        }
        KP_DOT => {
            if autoscroll_active {
                Field::AutoscrollIntervalMs
            } else {
                Field::ScrollIntervalMs
            }
        }
        _ => return None,
    })
}

/// Whether this adjustment key press means "increase". The two-axis jump
/// rows (`KP4`/`KP6`, `KP2`/`KP8`, the four diagonal keys) and the scroll
/// pair (`KP_PLUS`/`KP_ENTER`) are direction-by-key; every other,
/// single-key row is direction-by-Shift (§4.D table; see DESIGN.md for why
/// the single-key rows are read this way).
fn adjustment_direction(key: Key, shift_held: bool) -> bool {
    match key {
        KP6 | KP8 | KP7 | KP9 => true,
        KP4 | KP2 | KP1 | KP3 => false,
        KP_PLUS => true,
        KP_ENTER => false,
        _ => !shift_held,
    }
}

fn show_adjustment_overlay(field: Field, cfg: &Config, feedback: &dyn Feedback) {
    match field {
        Field::JumpMargin => feedback.margin_overlay(true, cfg.jump_margin),
        Field::JumpHorizontal => feedback.jump_overlay(JumpOverlayKind::Horizontal, cfg.jump_horizontal),
        Field::JumpVertical => feedback.jump_overlay(JumpOverlayKind::Vertical, cfg.jump_vertical),
        Field::JumpDiagonal => feedback.jump_overlay(JumpOverlayKind::Diagonal, cfg.jump_diagonal),
        _ => {}
    }
}

fn alt_adjustment_handler(
    modal: &mut ModalState,
    cfg: &mut Config,
    app: &crate::state::AppState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if !modal.alt_pressed {
        return None;
    }
    let autoscroll_active = modal.autoscroll_up || modal.autoscroll_down;
    let field = adjustment_field_for(key, autoscroll_active)?;
    if value == 0 {
        modal.adjust_start_times.remove(&key);
        return Some(Ok(Verdict::Consume));
    }
    let now = Instant::now();
    let start = *modal.adjust_start_times.entry(key).or_insert(now);
    let multiplier = repeat_multiplier(now.duration_since(start));
    let increase = adjustment_direction(key, modal.shift_pressed);
    cfg.adjust(field, increase, multiplier);
    app.mark_config_dirty();
    show_adjustment_overlay(field, cfg, svc.feedback);
    Some(Ok(Verdict::Consume))
}

fn scroll_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    let is_up = key == KP_PLUS;
    let is_down = key == KP_ENTER;
    if !is_up && !is_down {
        return None;
    }
    if modal.ctrl_pressed {
        if value == 1 {
            if is_up {
                modal.autoscroll_up = !modal.autoscroll_up;
                if modal.autoscroll_up {
                    modal.autoscroll_down = false;
                }
                svc.feedback
                    .popup(if modal.autoscroll_up { "Autoscroll UP ON" } else { "Autoscroll UP OFF" });
            } else {
                modal.autoscroll_down = !modal.autoscroll_down;
                if modal.autoscroll_down {
                    modal.autoscroll_up = false;
                }
                svc.feedback.popup(if modal.autoscroll_down {
                    "Autoscroll DOWN ON"
                } else {
                    "Autoscroll DOWN OFF"
                });
            }
        }
        return Some(Ok(Verdict::Consume));
    }
    let held = value != 0;
    if is_up {
        modal.scroll_up = held;
    } else {
        modal.scroll_down = held;
    }
    Some(Ok(Verdict::Consume))
}

fn ctrl_kp_minus_handler(modal: &mut ModalState, key: Key, value: i32) -> Option<Result<Verdict, SinkError>> {
    if key != KP_MINUS || !modal.ctrl_pressed {
        return None;
    }
    let _ = value;
    modal.pending_ctrl = PendingCtrl::None;
    Some(Ok(Verdict::Consume))
}

/// Absolute screen position for a Ctrl+Shift+numpad jump, per the numpad's
/// compass layout inset by `margin` (§4.D, scenario 5 in §8).
fn jump_target(key: Key, margin: i32, screen: (i32, i32)) -> (i32, i32) {
    let (w, h) = screen;
    match key {
        KP8 => (w / 2, margin),
        KP2 => (w / 2, h - margin),
        KP4 => (margin, h / 2),
        KP6 => (w - margin, h / 2),
        KP7 => (margin, margin),
        KP9 => (w - margin, margin),
        KP1 => (margin, h - margin),
        KP3 => (w - margin, h - margin),
        _ => (w / 2, h / 2), // KP5 and any other numpad key: center.
    }
}

fn jump_handler(
    modal: &mut ModalState,
    cfg: &Config,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if !modal.ctrl_pressed || !modal.shift_pressed {
        return None;
    }
    if !matches!(key, KP1 | KP2 | KP3 | KP4 | KP5 | KP6 | KP7 | KP8 | KP9) {
        return None;
    }
    if value == 1 {
        let screen = svc.pointer.screen_size();
        let (x, y) = jump_target(key, cfg.jump_margin as i32, screen);
        if let Err(err) = svc.pointer.warp(x, y) {
            tracing::warn!("jump warp failed: {err}");
        }
    }
    Some(Ok(Verdict::Consume))
}

fn direction_handler(modal: &mut ModalState, key: Key, value: i32) -> Option<Result<Verdict, SinkError>> {
    let dir = Direction::from_key(key)?;
    modal.directions.set_direction(dir, value != 0);
    Some(Ok(Verdict::Consume))
}

fn kp5_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if key != KP5 {
        return None;
    }
    if modal.drag_locked {
        return Some(Ok(Verdict::Consume));
    }
    let held = value != 0;
    if held != modal.left_button_held {
        modal.left_button_held = held;
        let mut sink = svc.mouse.lock().expect("mouse sink mutex poisoned");
        let result = if held { sink.press(MouseButton::Left) } else { sink.release(MouseButton::Left) };
        if let Err(err) = result {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

fn drag_toggle_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if key != KP_SLASH {
        return None;
    }
    if value == 1 {
        modal.drag_locked = !modal.drag_locked;
        let mut sink = svc.mouse.lock().expect("mouse sink mutex poisoned");
        let result = if modal.drag_locked {
            modal.left_button_held = true;
            modal.drag_popup_visible = true;
            svc.feedback.drag_popup_show();
            sink.press(MouseButton::Left)
        } else {
            modal.left_button_held = false;
            modal.drag_popup_visible = false;
            svc.feedback.drag_popup_hide();
            sink.release(MouseButton::Left)
        };
        if let Err(err) = result {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

fn kp_asterisk_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if key != KP_ASTERISK {
        return None;
    }
    let _ = modal;
    if value == 1 {
        if let Err(err) = svc.mouse.lock().expect("mouse sink mutex poisoned").click(MouseButton::Middle) {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

fn kp_minus_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if key != KP_MINUS {
        return None;
    }
    let _ = modal;
    if value == 1 {
        if let Err(err) = svc.mouse.lock().expect("mouse sink mutex poisoned").click(MouseButton::Right) {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

fn numlock_handler(
    modal: &mut ModalState,
    svc: &mut Services,
    key: Key,
    value: i32,
) -> Option<Result<Verdict, SinkError>> {
    if key != NUMLOCK {
        return None;
    }
    if modal.drag_locked {
        return Some(Ok(Verdict::Consume));
    }
    let held = value != 0;
    if held != modal.left_button_held {
        modal.left_button_held = held;
        let mut sink = svc.mouse.lock().expect("mouse sink mutex poisoned");
        let result = if held { sink.press(MouseButton::Left) } else { sink.release(MouseButton::Left) };
        if let Err(err) = result {
            return Some(Err(err));
        }
    }
    Some(Ok(Verdict::Consume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::fake::RecordingFeedback;

    // `KeyboardSink`/`MouseSink` need a real uinput device and aren't built in
    // unit tests, so these tests exercise the pure, sink-free handler logic —
    // jump targets, adjustment direction/field selection, and the
    // double-press timing check control_handler relies on.

    #[test]
    fn jump_target_center_matches_scenario_five() {
        let target = jump_target(KP5, 20, (1920, 1080));
        assert_eq!(target, (960, 540));
    }

    #[test]
    fn jump_target_respects_margin_on_edges() {
        assert_eq!(jump_target(KP8, 20, (1920, 1080)), (960, 20));
        assert_eq!(jump_target(KP2, 20, (1920, 1080)), (960, 1060));
        assert_eq!(jump_target(KP7, 20, (1920, 1080)), (20, 20));
    }

    #[test]
    fn adjustment_direction_single_key_rows_follow_shift() {
        assert!(adjustment_direction(KP0, false));
        assert!(!adjustment_direction(KP0, true));
    }

    #[test]
    fn adjustment_direction_two_key_rows_ignore_shift() {
        assert!(adjustment_direction(KP6, true));
        assert!(!adjustment_direction(KP4, false));
    }

    #[test]
    fn adjustment_field_selects_autoscroll_variant_when_active() {
        assert_eq!(adjustment_field_for(KP_PLUS, false), Some(Field::ScrollSpeed));
        assert_eq!(adjustment_field_for(KP_PLUS, true), Some(Field::AutoscrollSpeed));
    }

    #[test]
    fn control_double_press_toggles_mouse_mode_without_emitting_ctrl() {
        let mut modal = ModalState::default();
        let feedback = RecordingFeedback::default();
        // We can't construct a real KeyboardSink/MouseSink/PointerBackend in
        // a unit test without a uinput/X11 connection, so this test only
        // exercises the double-press *timing* logic directly, mirroring
        // what `control_handler` does internally.
        let t0 = Instant::now();
        modal.last_ctrl_press_time = Some(t0);
        let recent = modal
            .last_ctrl_press_time
            .map(|t| t0.duration_since(t) < DOUBLE_PRESS_WINDOW)
            .unwrap_or(false);
        assert!(recent);
        let _ = feedback;
    }
}
