//! Feedback/Overlay UI (§4.H) — externally-specified visual collaborators.
//!
//! The distilled spec treats popups, the config panel, and the margin/jump
//! overlays as out-of-scope collaborators behind simple contracts. This
//! crate ships exactly the contract as a `Feedback` trait, plus a
//! `TracingFeedback` implementation that logs what would be shown instead of
//! opening X11 windows — the same role `Session for ()` plays for the
//! teacher's session trait: a real, working, headless-friendly
//! implementation that documents the contract, with a windowed
//! implementation being the natural drop-in replacement.

use tracing::info;

/// What kind of jump grid overlay is showing, per §4.H.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOverlayKind {
    None,
    Horizontal,
    Vertical,
    Diagonal,
}

pub trait Feedback: Send + Sync {
    /// Centered popup, auto-dismissing after 1s; a new call coalesces with
    /// any currently-showing popup (resets the countdown, replaces the
    /// text).
    fn popup(&self, text: &str);

    fn drag_popup_show(&self);
    fn drag_popup_hide(&self);

    /// Config panel with a 5s inactivity timeout and mouse-movement
    /// dismissal (handled by the router/movement engine noticing the
    /// pointer moved from `opened_at`, not by this trait).
    fn panel_show(&self);
    fn panel_hide(&self);

    /// Translucent rectangle inset by `jump_margin` on all sides, auto-hiding
    /// 1s after the last update.
    fn margin_overlay(&self, visible: bool, jump_margin: i64);

    /// Translucent dot grid showing the jump step, auto-hiding 1s after the
    /// last update.
    fn jump_overlay(&self, kind: JumpOverlayKind, step: i64);
}

/// Headless `Feedback`: every call is a `tracing::info!` line. Used when no
/// windowed UI is wired up, and by every router/movement-engine test.
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn popup(&self, text: &str) {
        info!(popup = text, "feedback: popup");
    }

    fn drag_popup_show(&self) {
        info!("feedback: drag popup shown");
    }

    fn drag_popup_hide(&self) {
        info!("feedback: drag popup hidden");
    }

    fn panel_show(&self) {
        info!("feedback: config panel shown");
    }

    fn panel_hide(&self) {
        info!("feedback: config panel hidden");
    }

    fn margin_overlay(&self, visible: bool, jump_margin: i64) {
        info!(visible, jump_margin, "feedback: margin overlay");
    }

    fn jump_overlay(&self, kind: JumpOverlayKind, step: i64) {
        info!(?kind, step, "feedback: jump overlay");
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every call instead of logging it, so router tests can assert
    /// on exactly what feedback fired (e.g. "Mouse Mode ON" vs "Mouse Mode
    /// and Autoscroll OFF").
    #[derive(Default)]
    pub struct RecordingFeedback {
        pub popups: Mutex<Vec<String>>,
    }

    impl Feedback for RecordingFeedback {
        fn popup(&self, text: &str) {
            self.popups.lock().unwrap().push(text.to_string());
        }
        fn drag_popup_show(&self) {}
        fn drag_popup_hide(&self) {}
        fn panel_show(&self) {}
        fn panel_hide(&self) {}
        fn margin_overlay(&self, _visible: bool, _jump_margin: i64) {}
        fn jump_overlay(&self, _kind: JumpOverlayKind, _step: i64) {}
    }
}
