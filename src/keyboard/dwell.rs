//! Dwell timer — "has this condition held continuously for at least T".
//!
//! Shared by the activation hold, the ESC deactivation hold and per-key
//! confirmation. The timer never re-arms itself after firing: a caller that
//! keeps feeding `true` after a fire sees `true` on every tick until it calls
//! [`DwellTimer::reset`] or the condition breaks.

use std::time::Duration;

/// Continuity-based hold timer driven by caller-supplied timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellTimer {
    /// When the condition most recently became true, if it still is.
    start: Option<Duration>,
    /// Hold time required to fire.
    pub threshold: Duration,
}

impl DwellTimer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            start: None,
            threshold,
        }
    }

    /// Feed this tick's condition. Returns true once the condition has held
    /// for at least `threshold`.
    ///
    /// The tick that first sees `true` only starts the clock and never fires,
    /// even with a zero threshold.
    pub fn update(&mut self, condition: bool, now: Duration) -> bool {
        if !condition {
            self.start = None;
            return false;
        }
        match self.start {
            None => {
                self.start = Some(now);
                false
            }
            Some(start) => now.saturating_sub(start) >= self.threshold,
        }
    }

    /// Disarm the timer.
    pub fn reset(&mut self) {
        self.start = None;
    }

    /// Whether the clock is currently running.
    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }

    /// Time held so far (zero when disarmed or when `now` precedes the start).
    pub fn elapsed(&self, now: Duration) -> Duration {
        self.start
            .map(|start| now.saturating_sub(start))
            .unwrap_or(Duration::ZERO)
    }

    /// Fraction of the threshold held so far, clamped to `0.0..=1.0`.
    pub fn progress(&self, now: Duration) -> f32 {
        if !self.is_running() {
            return 0.0;
        }
        if self.threshold.is_zero() {
            return 1.0;
        }
        (self.elapsed(now).as_secs_f32() / self.threshold.as_secs_f32()).clamp(0.0, 1.0)
    }
}

// ── Tests ──────────────────────────────────────────────────
