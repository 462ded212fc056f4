//! Session state — the single struct that owns a keyboard's gesture machine,
//! text buffer and pending output events.
//!
//! The driver feeds one tick per frame through [`KeyboardSession::tick`] and
//! drains [`KeyboardEvent`]s afterwards. One session serves one user; hosts
//! with several users keep one session each and serialize ticks per session.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, info};

use crate::ipc::{escape_string, format_event};
use crate::keyboard::{GestureConfig, GestureEvent, GestureMachine, HandSample, TextBuffer};
use crate::render::RenderSnapshot;

// ── Config ─────────────────────────────────────────────────

/// How the keyboard starts out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartupMode {
    /// Hidden until the activation hand holds steady.
    Dwell,
    /// Open from the first tick with the layout anchored at (x, y).
    AlwaysOn { x: f32, y: f32 },
}

/// Everything needed to build a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub gesture: GestureConfig,
    pub startup: StartupMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            startup: StartupMode::Dwell,
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// Output events for the commit sink.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyboardEvent {
    /// The keyboard opened at (x, y).
    Activated { x: f32, y: f32 },
    /// The keyboard closed.
    Deactivated,
    /// A key was committed to the buffer.
    KeyCommitted { label: String },
    /// Enter (or an explicit flush) completed a line.
    LineCommitted { text: String },
    /// A confirmed key was dropped by the commit debounce.
    CommitSuppressed { label: String },
}

impl KeyboardEvent {
    /// Convert the event to an IPC s-expression.
    pub fn to_sexp(&self) -> String {
        match self {
            Self::Activated { x, y } => {
                let (x, y) = (format!("{:.0}", x), format!("{:.0}", y));
                format_event("keyboard-activated", &[("x", x.as_str()), ("y", y.as_str())])
            }
            Self::Deactivated => format_event("keyboard-deactivated", &[]),
            Self::KeyCommitted { label } => {
                format_event("key-committed", &[("label", quoted(label).as_str())])
            }
            Self::LineCommitted { text } => {
                format_event("line-committed", &[("text", quoted(text).as_str())])
            }
            Self::CommitSuppressed { label } => {
                format_event("commit-suppressed", &[("label", quoted(label).as_str())])
            }
        }
    }
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

// ── Session ────────────────────────────────────────────────

/// One keyboard session: gesture machine, typed text and the event queue.
pub struct KeyboardSession {
    pub machine: GestureMachine,
    pub buffer: TextBuffer,
    startup: StartupMode,
    events: VecDeque<KeyboardEvent>,
    /// Ticks processed since creation or the last reset.
    pub ticks: u64,
    /// Lines committed since creation or the last reset.
    pub lines_committed: u64,
    last_tick: Option<Duration>,
}

impl KeyboardSession {
    pub fn new(config: SessionConfig) -> Self {
        let mut session = Self {
            machine: GestureMachine::new(config.gesture),
            buffer: TextBuffer::new(),
            startup: config.startup,
            events: VecDeque::new(),
            ticks: 0,
            lines_committed: 0,
            last_tick: None,
        };
        session.apply_startup();
        session
    }

    fn apply_startup(&mut self) {
        if let StartupMode::AlwaysOn { x, y } = self.startup {
            self.machine.activate_at(x, y, None);
        }
    }

    /// Run one frame through hit-testing, the gesture machine and the buffer.
    pub fn tick(&mut self, samples: &[HandSample], now: Duration) -> RenderSnapshot {
        if let Some(last) = self.last_tick {
            if now < last {
                debug!(
                    "Tick timestamp went backwards ({}ms < {}ms)",
                    now.as_millis(),
                    last.as_millis()
                );
            }
        }
        self.last_tick = Some(now);
        self.ticks += 1;

        for event in self.machine.update(samples, now) {
            match event {
                GestureEvent::Activated { x, y, .. } => {
                    self.events.push_back(KeyboardEvent::Activated { x, y });
                }
                GestureEvent::Deactivated => {
                    self.events.push_back(KeyboardEvent::Deactivated);
                }
                GestureEvent::KeyConfirmed { label } => self.commit(label),
                GestureEvent::CommitSuppressed { label } => {
                    self.events.push_back(KeyboardEvent::CommitSuppressed { label });
                }
            }
        }

        self.snapshot(now)
    }

    fn commit(&mut self, label: String) {
        debug!("[KEY PRESSED] {}", label);
        let line = self.buffer.commit(&label);
        self.events.push_back(KeyboardEvent::KeyCommitted { label });
        if let Some(text) = line {
            self.push_line(text);
        }
    }

    fn push_line(&mut self, text: String) {
        info!("Line committed: {:?}", text);
        self.lines_committed += 1;
        self.events.push_back(KeyboardEvent::LineCommitted { text });
    }

    /// Current render state without advancing the machine.
    pub fn snapshot(&self, now: Duration) -> RenderSnapshot {
        RenderSnapshot::build(&self.machine, &self.buffer, now)
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<KeyboardEvent> {
        self.events.drain(..).collect()
    }

    /// Commit the buffer as a line without pressing Enter.
    pub fn flush(&mut self) -> String {
        let text = self.buffer.flush();
        self.push_line(text.clone());
        text
    }

    /// Drop typed text and pending events and return to the startup state.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.buffer = TextBuffer::new();
        self.events.clear();
        self.ticks = 0;
        self.lines_committed = 0;
        self.last_tick = None;
        self.apply_startup();
        info!("Keyboard session reset");
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let config = self.machine.config();
        let hovered = match self.machine.hovered() {
            Some(label) => format!("\"{}\"", escape_string(label)),
            None => "nil".to_string(),
        };
        let typing_hand = self
            .machine
            .typing_hand()
            .map(|h| h.as_str())
            .unwrap_or("nil");
        format!(
            "(:phase {} :template {} :key-count {} :hovered {} :typing-hand {} :buffer-len {} :ticks {} :lines {} :key-hold-ms {} :activation-ms {} :deactivation-ms {} :tolerance-px {:.0} :min-commit-interval-ms {})",
            self.machine.phase().as_str(),
            config.template.as_str(),
            self.machine.layout().map(|l| l.len()).unwrap_or(0),
            hovered,
            typing_hand,
            self.buffer.len(),
            self.ticks,
            self.lines_committed,
            config.key_hold.as_millis(),
            config.activation_hold.as_millis(),
            config.deactivation_hold.as_millis(),
            config.anchor_tolerance_px,
            config.min_commit_interval.as_millis(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{GesturePhase, Hand};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn always_on(key_hold_ms: u64) -> KeyboardSession {
        KeyboardSession::new(SessionConfig {
            gesture: GestureConfig {
                key_hold: ms(key_hold_ms),
                ..GestureConfig::default()
            },
            startup: StartupMode::AlwaysOn { x: 0.0, y: 0.0 },
        })
    }

    fn center(session: &KeyboardSession, label: &str) -> HandSample {
        let k = session.machine.layout().unwrap().get(label).unwrap();
        HandSample::new(Hand::Left, k.x, k.y)
    }

    /// Hold each key for one full confirm period, with a miss in between.
    fn type_keys(session: &mut KeyboardSession, keys: &[&str], hold_ms: u64, t: &mut u64) {
        for key in keys {
            let sample = center(session, key);
            session.tick(&[sample], ms(*t));
            *t += hold_ms;
            session.tick(&[sample], ms(*t));
            *t += 10;
            session.tick(&[], ms(*t));
            *t += 10;
        }
    }

    #[test]
    fn test_hello_world_line() {
        let mut session = always_on(500);
        let mut t = 0;
        type_keys(
            &mut session,
            &["H", "E", "L", "L", "O", "Space", "W", "O", "R", "L", "D", "Enter"],
            500,
            &mut t,
        );

        let events = session.take_events();
        let lines: Vec<&KeyboardEvent> = events
            .iter()
            .filter(|e| matches!(e, KeyboardEvent::LineCommitted { .. }))
            .collect();
        assert_eq!(
            lines,
            vec![&KeyboardEvent::LineCommitted {
                text: "HELLO WORLD".to_string()
            }]
        );
        assert!(session.buffer.is_empty());
        assert_eq!(session.lines_committed, 1);
        assert!(session.take_events().is_empty(), "events are drained once");
    }

    #[test]
    fn test_backspace_on_empty_session_buffer() {
        let mut session = always_on(500);
        let mut t = 0;
        type_keys(&mut session, &["Backspace", "Backspace", "A"], 500, &mut t);
        assert_eq!(session.buffer.text(), "A");
    }

    #[test]
    fn test_tick_snapshot_reflects_commit() {
        let mut session = always_on(500);
        let k = center(&session, "K");
        session.tick(&[k], ms(0));
        let snap = session.tick(&[k], ms(500));
        assert_eq!(snap.buffer_text, "K");
        assert!(snap.highlighted_key.is_none());
        assert_eq!(
            session.take_events(),
            vec![KeyboardEvent::KeyCommitted {
                label: "K".to_string()
            }]
        );
    }

    #[test]
    fn test_dwell_session_activation_events() {
        let mut session = KeyboardSession::new(SessionConfig::default());
        let s = HandSample::new(Hand::Left, 400.0, 300.0);
        session.tick(&[s], ms(0));
        session.tick(&[s], ms(33));
        let snap = session.tick(&[s], ms(5033));
        assert!(snap.active);
        assert_eq!(
            session.take_events(),
            vec![KeyboardEvent::Activated { x: 400.0, y: 300.0 }]
        );
    }

    #[test]
    fn test_buffer_survives_deactivation() {
        let mut session = always_on(500);
        let mut t = 0;
        type_keys(&mut session, &["G", "O"], 500, &mut t);

        let esc = center(&session, "ESC");
        session.tick(&[esc], ms(t));
        session.tick(&[esc], ms(t + 3000));
        assert_eq!(session.machine.phase(), GesturePhase::Inactive);
        assert_eq!(session.buffer.text(), "GO");
        assert!(session.take_events().contains(&KeyboardEvent::Deactivated));
    }

    #[test]
    fn test_flush_and_reset() {
        let mut session = always_on(500);
        let mut t = 0;
        type_keys(&mut session, &["N", "O"], 500, &mut t);

        assert_eq!(session.flush(), "NO");
        assert!(session.buffer.is_empty());
        assert!(session
            .take_events()
            .contains(&KeyboardEvent::LineCommitted { text: "NO".to_string() }));

        type_keys(&mut session, &["X"], 500, &mut t);
        session.reset();
        assert!(session.buffer.is_empty());
        assert!(session.take_events().is_empty());
        assert_eq!(session.ticks, 0);
        // Always-on sessions come back open.
        assert!(session.machine.is_active());
    }

    #[test]
    fn test_event_sexp() {
        assert_eq!(
            KeyboardEvent::KeyCommitted { label: "A".to_string() }.to_sexp(),
            "(:type :event :event :key-committed :label \"A\")"
        );
        assert_eq!(
            KeyboardEvent::LineCommitted { text: "a \"b\"".to_string() }.to_sexp(),
            "(:type :event :event :line-committed :text \"a \\\"b\\\"\")"
        );
        assert_eq!(
            KeyboardEvent::Activated { x: 10.4, y: 20.0 }.to_sexp(),
            "(:type :event :event :keyboard-activated :x 10 :y 20)"
        );
        assert_eq!(
            KeyboardEvent::Deactivated.to_sexp(),
            "(:type :event :event :keyboard-deactivated)"
        );
    }

    #[test]
    fn test_reset_mid_activation_returns_to_startup() {
        let mut session = KeyboardSession::new(SessionConfig::default());
        let s = HandSample::new(Hand::Left, 400.0, 300.0);
        session.tick(&[s], ms(0));
        session.tick(&[s], ms(100));
        assert_eq!(session.machine.phase(), GesturePhase::Activating);

        session.reset();
        assert_eq!(session.machine.phase(), GesturePhase::Inactive);

        let snap = session.tick(&[s], ms(5100));
        assert!(!snap.active, "hold from before the reset must not carry over");
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_commit_suppressed_reaches_event_queue() {
        let mut session = KeyboardSession::new(SessionConfig {
            gesture: GestureConfig {
                key_hold: ms(500),
                min_commit_interval: ms(2000),
                ..GestureConfig::default()
            },
            startup: StartupMode::AlwaysOn { x: 0.0, y: 0.0 },
        });
        let mut t = 0;
        type_keys(&mut session, &["P", "Q"], 500, &mut t);

        let events = session.take_events();
        assert_eq!(
            events,
            vec![
                KeyboardEvent::KeyCommitted { label: "P".to_string() },
                KeyboardEvent::CommitSuppressed { label: "Q".to_string() },
            ]
        );
        assert_eq!(session.buffer.text(), "P", "suppressed keys are not typed");
        assert_eq!(
            events[1].to_sexp(),
            "(:type :event :event :commit-suppressed :label \"Q\")"
        );
    }

    #[test]
    fn test_status_sexp() {
        let session = KeyboardSession::new(SessionConfig::default());
        let sexp = session.status_sexp();
        assert!(sexp.contains(":phase inactive"));
        assert!(sexp.contains(":template classic"));
        assert!(sexp.contains(":key-count 0"));
        assert!(sexp.contains(":hovered nil"));
        assert!(sexp.contains(":key-hold-ms 2000"));
        assert!(sexp.contains(":activation-ms 5000"));
        assert!(sexp.contains(":tolerance-px 15"));
    }
}
