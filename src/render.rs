//! Render-state snapshots -- what a drawing collaborator needs for one frame.
//!
//! The core never draws. Each tick produces a [`RenderSnapshot`] with the
//! key boxes (while active), the highlighted key, the hold progress and the
//! typed text; colors, fonts and blending belong to whoever consumes it.

use std::time::Duration;

use crate::ipc::escape_string;
use crate::keyboard::{GestureMachine, GesturePhase, HandSample, KeySpec, TextBuffer};

/// Draw instructions for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub active: bool,
    pub phase: GesturePhase,
    /// Key boxes in layout order; empty while inactive.
    pub keys: Vec<KeySpec>,
    /// Key under the typing fingertip.
    pub highlighted_key: Option<String>,
    /// Progress (0.0-1.0) of the hold currently shown to the user.
    pub dwell_progress: f32,
    /// Fingertip the machine consumed this tick, for the activation ring.
    pub cursor: Option<HandSample>,
    /// Uncommitted text line.
    pub buffer_text: String,
}

impl RenderSnapshot {
    pub fn build(machine: &GestureMachine, buffer: &TextBuffer, now: Duration) -> Self {
        Self {
            active: machine.is_active(),
            phase: machine.phase(),
            keys: machine
                .layout()
                .map(|layout| layout.keys().to_vec())
                .unwrap_or_default(),
            highlighted_key: machine.hovered().map(str::to_string),
            dwell_progress: machine.dwell_progress(now),
            cursor: machine.cursor(),
            buffer_text: buffer.text(),
        }
    }

    /// Snapshot as an s-expression plist.
    pub fn to_sexp(&self) -> String {
        let keys = if self.keys.is_empty() {
            "nil".to_string()
        } else {
            let items: Vec<String> = self
                .keys
                .iter()
                .map(|k| {
                    format!(
                        "(:label \"{}\" :x {:.1} :y {:.1} :w {:.1} :h {:.1})",
                        escape_string(&k.label),
                        k.x,
                        k.y,
                        k.width,
                        k.height
                    )
                })
                .collect();
            format!("({})", items.join(" "))
        };
        let highlighted = match &self.highlighted_key {
            Some(label) => format!("\"{}\"", escape_string(label)),
            None => "nil".to_string(),
        };
        let cursor = match &self.cursor {
            Some(s) => format!("(:hand {} :x {:.0} :y {:.0})", s.hand.as_str(), s.x, s.y),
            None => "nil".to_string(),
        };
        format!(
            "(:active {} :phase {} :highlighted {} :progress {:.2} :cursor {} :buffer \"{}\" :keys {})",
            if self.active { "t" } else { "nil" },
            self.phase.as_str(),
            highlighted,
            self.dwell_progress,
            cursor,
            escape_string(&self.buffer_text),
            keys,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
