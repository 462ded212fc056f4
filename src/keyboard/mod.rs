//! Virtual air keyboard core — everything between a fingertip coordinate and
//! a committed key.
//!
//! Provides:
//! - `hand_tracking`: fingertip samples and the hand-selection policy
//! - `layout`: key hitbox generation from row templates
//! - `hit_test`: point-in-key lookup
//! - `dwell`: continuity-based hold timer
//! - `gesture`: activation / hover / confirm / deactivation state machine
//! - `text_buffer`: committed text with Enter/Space/Backspace handling
//!
//! Nothing here blocks or reads a clock; every time-dependent call takes the
//! current timestamp as an argument.

pub mod dwell;
pub mod gesture;
pub mod hand_tracking;
pub mod layout;
pub mod text_buffer;

pub use gesture::{GestureConfig, GestureEvent, GestureMachine, GesturePhase};
pub use hand_tracking::{Hand, HandPolicy, HandSample, TypingHand};
pub use layout::{KeyMetrics, KeySpec, Layout, LayoutTemplate};
pub use text_buffer::TextBuffer;
