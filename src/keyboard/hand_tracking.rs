//! Hand tracking input boundary.
//!
//! The landmark model lives outside this crate; all the keyboard sees per
//! frame is zero or more fingertip samples tagged with a hand identity.
//! This module also owns the policy that decides which hand's samples the
//! gesture state machine consumes.

// ── Hand enum ──────────────────────────────────────────────

/// Which hand a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a hand name. Accepts the tracker's capitalized labels too.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

// ── Samples ────────────────────────────────────────────────

/// One fingertip coordinate for one tracked hand, in render-surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSample {
    pub hand: Hand,
    pub x: f32,
    pub y: f32,
}

impl HandSample {
    pub fn new(hand: Hand, x: f32, y: f32) -> Self {
        Self { hand, x, y }
    }
}

/// First sample in `samples` that belongs to `hand`.
pub fn sample_for(samples: &[HandSample], hand: Hand) -> Option<HandSample> {
    samples.iter().copied().find(|s| s.hand == hand)
}

// ── Hand policy ────────────────────────────────────────────

/// Which hand drives typing once the keyboard is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingHand {
    /// The hand that completed the activation dwell, locked until deactivation.
    Activator,
    /// Always this hand, regardless of who activated.
    Fixed(Hand),
}

impl TypingHand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activator => "activator",
            Self::Fixed(hand) => hand.as_str(),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("activator") {
            return Some(Self::Activator);
        }
        Hand::from_str(s).map(Self::Fixed)
    }
}

/// Explicit hand discrimination for activation and typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandPolicy {
    /// Only this hand's samples can arm the activation dwell.
    pub activation_hand: Hand,
    /// Which hand's samples are hit-tested while active.
    pub typing_hand: TypingHand,
}

impl Default for HandPolicy {
    fn default() -> Self {
        Self {
            activation_hand: Hand::Left,
            typing_hand: TypingHand::Activator,
        }
    }
}

impl HandPolicy {
    /// Resolve the hand locked in for typing.
    ///
    /// `activator` is the hand that opened the keyboard, if any. With no
    /// activator (always-on start) an `Activator` policy adopts whichever hand
    /// shows up first in `samples`.
    pub fn resolve_typing_hand(
        &self,
        activator: Option<Hand>,
        samples: &[HandSample],
    ) -> Option<Hand> {
        match self.typing_hand {
            TypingHand::Fixed(hand) => Some(hand),
            TypingHand::Activator => activator.or_else(|| samples.first().map(|s| s.hand)),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
