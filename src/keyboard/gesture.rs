//! Gesture state machine — dwell activation, per-key hold confirmation and
//! ESC-hold deactivation.
//!
//! While inactive, a steady hold of the activation hand opens the keyboard
//! at the fingertip. While active, the typing hand's fingertip is hit-tested
//! every tick; holding on one key confirms it, holding on ESC closes the
//! keyboard. All timing comes from the timestamps passed to [`GestureMachine::update`].

use std::time::Duration;

use tracing::{debug, info};

use super::dwell::DwellTimer;
use super::hand_tracking::{sample_for, Hand, HandPolicy, HandSample};
use super::hit_test::hit_point;
use super::layout::{KeyMetrics, Layout, LayoutTemplate};

// ── Phase ──────────────────────────────────────────────────

/// Coarse machine state, derived from which timers are armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    /// Keyboard hidden, no activation dwell running.
    Inactive,
    /// Keyboard hidden, activation hand holding steady.
    Activating,
    /// Keyboard shown.
    Active,
    /// Keyboard shown, fingertip holding on the deactivation key.
    Deactivating,
}

impl GesturePhase {
    /// String representation for IPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Deactivating => "deactivating",
        }
    }
}

// ── Events ─────────────────────────────────────────────────

/// Transitions and confirmations produced by one update.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// The keyboard opened with its layout anchored at (x, y).
    Activated { hand: Option<Hand>, x: f32, y: f32 },
    /// The deactivation hold completed and the layout was dropped.
    Deactivated,
    /// A key hold completed; the key should be committed.
    KeyConfirmed { label: String },
    /// A key hold completed too soon after the previous commit.
    CommitSuppressed { label: String },
}

// ── Config ─────────────────────────────────────────────────

/// Timing, geometry and hand-selection settings.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Steady hold needed to open the keyboard.
    pub activation_hold: Duration,
    /// Hold on the deactivation key needed to close the keyboard.
    pub deactivation_hold: Duration,
    /// Hold on a key needed to commit it.
    pub key_hold: Duration,
    /// Per-axis drift (px) tolerated while holding for activation.
    pub anchor_tolerance_px: f32,
    /// Minimum time between two commits; earlier confirmations are dropped.
    pub min_commit_interval: Duration,
    /// Label of the key that closes the keyboard.
    pub deactivation_key: String,
    /// Which hands activate and type.
    pub hands: HandPolicy,
    /// Rows generated on activation.
    pub template: LayoutTemplate,
    /// Key geometry.
    pub metrics: KeyMetrics,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            activation_hold: Duration::from_secs(5),
            deactivation_hold: Duration::from_secs(3),
            key_hold: Duration::from_secs(2),
            anchor_tolerance_px: 15.0,
            min_commit_interval: Duration::ZERO,
            deactivation_key: "ESC".to_string(),
            hands: HandPolicy::default(),
            template: LayoutTemplate::Classic,
            metrics: KeyMetrics::default(),
        }
    }
}

// ── State machine ──────────────────────────────────────────

/// Activation, hover and confirmation state for one keyboard.
#[derive(Debug, Clone)]
pub struct GestureMachine {
    config: GestureConfig,
    /// Present exactly while the keyboard is active.
    layout: Option<Layout>,
    /// Point the layout was generated at.
    layout_anchor: Option<(f32, f32)>,
    /// Reference point for the activation steadiness check.
    anchor: Option<(f32, f32)>,
    activation: DwellTimer,
    deactivation: DwellTimer,
    confirm: DwellTimer,
    /// Key currently under the typing fingertip.
    hovered: Option<String>,
    /// Hand that completed the activation dwell.
    activator: Option<Hand>,
    /// Hand whose samples are hit-tested while active.
    typing_hand: Option<Hand>,
    /// Last fingertip sample the machine consumed.
    cursor: Option<HandSample>,
    last_commit: Option<Duration>,
}

impl GestureMachine {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            activation: DwellTimer::new(config.activation_hold),
            deactivation: DwellTimer::new(config.deactivation_hold),
            confirm: DwellTimer::new(config.key_hold),
            config,
            layout: None,
            layout_anchor: None,
            anchor: None,
            hovered: None,
            activator: None,
            typing_hand: None,
            cursor: None,
            last_commit: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn phase(&self) -> GesturePhase {
        match (&self.layout, self.activation.is_running(), self.deactivation.is_running()) {
            (None, false, _) => GesturePhase::Inactive,
            (None, true, _) => GesturePhase::Activating,
            (Some(_), _, false) => GesturePhase::Active,
            (Some(_), _, true) => GesturePhase::Deactivating,
        }
    }

    pub fn is_active(&self) -> bool {
        self.layout.is_some()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn cursor(&self) -> Option<HandSample> {
        self.cursor
    }

    pub fn typing_hand(&self) -> Option<Hand> {
        self.typing_hand
    }

    /// Progress of whichever hold is currently visible to the user:
    /// activation while hidden, ESC hold or key hold while shown.
    pub fn dwell_progress(&self, now: Duration) -> f32 {
        match self.phase() {
            GesturePhase::Inactive => 0.0,
            GesturePhase::Activating => self.activation.progress(now),
            GesturePhase::Deactivating => self.deactivation.progress(now),
            GesturePhase::Active => self.confirm.progress(now),
        }
    }

    /// Consume one tick of fingertip samples.
    pub fn update(&mut self, samples: &[HandSample], now: Duration) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        if self.layout.is_some() {
            self.update_active(samples, now, &mut events);
        } else {
            self.update_inactive(samples, now, &mut events);
        }
        events
    }

    fn update_inactive(
        &mut self,
        samples: &[HandSample],
        now: Duration,
        events: &mut Vec<GestureEvent>,
    ) {
        let Some(sample) = sample_for(samples, self.config.hands.activation_hand) else {
            // Tracking lost breaks continuity; the anchor is kept.
            self.cursor = None;
            self.activation.reset();
            return;
        };
        self.cursor = Some(sample);

        let tol = self.config.anchor_tolerance_px;
        let steady = self
            .anchor
            .map(|(ax, ay)| (sample.x - ax).abs() < tol && (sample.y - ay).abs() < tol)
            .unwrap_or(false);

        if !steady {
            self.anchor = Some((sample.x, sample.y));
            self.activation.reset();
            return;
        }

        if self.activation.update(true, now) {
            self.activate_at(sample.x, sample.y, Some(sample.hand));
            events.push(GestureEvent::Activated {
                hand: Some(sample.hand),
                x: sample.x,
                y: sample.y,
            });
        }
    }

    fn update_active(
        &mut self,
        samples: &[HandSample],
        now: Duration,
        events: &mut Vec<GestureEvent>,
    ) {
        if self.typing_hand.is_none() {
            self.typing_hand = self.config.hands.resolve_typing_hand(self.activator, samples);
            if let Some(hand) = self.typing_hand {
                debug!("Typing hand locked to {}", hand.as_str());
            }
        }

        let sample = self.typing_hand.and_then(|hand| sample_for(samples, hand));
        self.cursor = sample;

        let hit_label = self.layout.as_ref().and_then(|layout| {
            hit_point(layout, sample.map(|s| (s.x, s.y))).map(|k| k.label.clone())
        });

        let Some(label) = hit_label else {
            // A miss cancels any partial key or ESC hold.
            self.hovered = None;
            self.confirm.reset();
            self.deactivation.reset();
            return;
        };

        if label == self.config.deactivation_key {
            self.confirm.reset();
            self.hovered = Some(label);
            if self.deactivation.update(true, now) {
                self.deactivate();
                events.push(GestureEvent::Deactivated);
            }
            return;
        }

        self.deactivation.reset();
        if self.hovered.as_deref() != Some(label.as_str()) {
            debug!("Hover: {}", label);
            self.confirm.reset();
            self.hovered = Some(label.clone());
        }

        if !self.confirm.update(true, now) {
            return;
        }

        // Re-arm so a lingering fingertip needs a fresh full hold.
        self.hovered = None;
        self.confirm.reset();

        if let Some(last) = self.last_commit {
            if now.saturating_sub(last) < self.config.min_commit_interval {
                debug!("Commit of {} suppressed by debounce", label);
                events.push(GestureEvent::CommitSuppressed { label });
                return;
            }
        }
        self.last_commit = Some(now);
        debug!("Key confirmed: {}", label);
        events.push(GestureEvent::KeyConfirmed { label });
    }

    /// Open the keyboard with its layout anchored at (x, y).
    ///
    /// `activator` is the hand that performed the activation, or `None` for a
    /// keyboard that starts open.
    pub fn activate_at(&mut self, x: f32, y: f32, activator: Option<Hand>) {
        self.layout = Some(Layout::from_template(
            x,
            y,
            self.config.template,
            &self.config.metrics,
        ));
        self.layout_anchor = Some((x, y));
        self.anchor = None;
        self.activation.reset();
        self.deactivation.reset();
        self.confirm.reset();
        self.hovered = None;
        self.activator = activator;
        self.typing_hand = self.config.hands.resolve_typing_hand(activator, &[]);
        info!("Virtual keyboard activated at ({:.0}, {:.0})", x, y);
    }

    /// Close the keyboard and drop its layout.
    pub fn deactivate(&mut self) {
        self.layout = None;
        self.layout_anchor = None;
        self.anchor = None;
        self.activation.reset();
        self.deactivation.reset();
        self.confirm.reset();
        self.hovered = None;
        self.activator = None;
        self.typing_hand = None;
        info!("Virtual keyboard deactivated");
    }

    /// Drop all runtime state whatever the phase: layout, anchor, cursor,
    /// timers and the debounce reference. Configuration is kept.
    pub fn reset(&mut self) {
        self.layout = None;
        self.layout_anchor = None;
        self.anchor = None;
        self.activation.reset();
        self.deactivation.reset();
        self.confirm.reset();
        self.hovered = None;
        self.activator = None;
        self.typing_hand = None;
        self.cursor = None;
        self.last_commit = None;
        debug!("Gesture machine reset");
    }

    // ── Runtime configuration ─────────────────────────────

    pub fn set_key_hold(&mut self, hold: Duration) {
        self.config.key_hold = hold;
        self.confirm = DwellTimer::new(hold);
        self.hovered = None;
        debug!("Key hold set to {}ms", hold.as_millis());
    }

    pub fn set_activation_hold(&mut self, hold: Duration) {
        self.config.activation_hold = hold;
        self.activation = DwellTimer::new(hold);
        debug!("Activation hold set to {}ms", hold.as_millis());
    }

    pub fn set_deactivation_hold(&mut self, hold: Duration) {
        self.config.deactivation_hold = hold;
        self.deactivation = DwellTimer::new(hold);
        debug!("Deactivation hold set to {}ms", hold.as_millis());
    }

    pub fn set_anchor_tolerance(&mut self, tolerance_px: f32) {
        self.config.anchor_tolerance_px = tolerance_px;
    }

    pub fn set_min_commit_interval(&mut self, interval: Duration) {
        self.config.min_commit_interval = interval;
    }

    /// Switch templates. An open keyboard is regenerated in place.
    pub fn set_template(&mut self, template: LayoutTemplate, metrics: KeyMetrics) {
        self.config.template = template;
        self.config.metrics = metrics;
        if let Some((x, y)) = self.layout_anchor {
            self.layout = Some(Layout::from_template(x, y, template, &metrics));
            self.hovered = None;
            self.confirm.reset();
            self.deactivation.reset();
        }
        debug!("Layout template set to {}", template.as_str());
    }
}

// ── Tests ──────────────────────────────────────────────────
