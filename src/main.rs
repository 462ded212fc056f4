//! air-keyboard - dwell-driven virtual keyboard for fingertip tracking
//!
//! Reads per-frame hand samples as s-expressions, runs the gesture pipeline,
//! and writes responses, commit events and optional render snapshots.

mod backend;
pub mod ipc;
pub mod keyboard;
mod render;
mod state;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::info;

use keyboard::{GestureConfig, Hand, HandPolicy, LayoutTemplate, TypingHand};
use state::{SessionConfig, StartupMode};

#[derive(Parser, Debug)]
#[command(name = "air-keyboard", about = "Dwell-driven air virtual keyboard")]
struct Cli {
    /// Backend to use: replay (timestamps from messages) or live (monotonic clock)
    #[arg(long, default_value = "replay")]
    backend: String,

    /// Read messages from a file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Attach render snapshots to tick responses
    #[arg(long)]
    snapshots: bool,

    /// Row template: classic or full
    #[arg(long, default_value = "classic")]
    template: String,

    /// Hold time (ms) on a key before it commits
    #[arg(long)]
    key_hold_ms: Option<u64>,

    /// Steady hold time (ms) that opens the keyboard
    #[arg(long)]
    activation_ms: Option<u64>,

    /// Hold time (ms) on ESC that closes the keyboard
    #[arg(long)]
    deactivation_ms: Option<u64>,

    /// Drift (px per axis) tolerated during the activation hold
    #[arg(long)]
    tolerance_px: Option<f32>,

    /// Minimum time (ms) between two commits
    #[arg(long)]
    min_commit_interval_ms: Option<u64>,

    /// Hand that activates the keyboard: left or right
    #[arg(long, default_value = "left")]
    activation_hand: String,

    /// Hand that types: activator, left or right
    #[arg(long, default_value = "activator")]
    typing_hand: String,

    /// Start open with the layout anchored at X,Y
    #[arg(long, value_name = "X,Y")]
    always_on: Option<String>,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

impl Cli {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let template = LayoutTemplate::from_str(&self.template)
            .ok_or_else(|| anyhow!("unknown template: {}. Use: classic or full", self.template))?;
        let activation_hand = Hand::from_str(&self.activation_hand)
            .ok_or_else(|| anyhow!("unknown activation hand: {}", self.activation_hand))?;
        let typing_hand = TypingHand::from_str(&self.typing_hand)
            .ok_or_else(|| anyhow!("unknown typing hand: {}", self.typing_hand))?;

        let mut gesture = GestureConfig {
            template,
            metrics: template.default_metrics(),
            hands: HandPolicy {
                activation_hand,
                typing_hand,
            },
            ..GestureConfig::default()
        };
        // The full template ships with its own debounce and hold preset.
        if template == LayoutTemplate::Full {
            gesture.key_hold = Duration::from_millis(500);
            gesture.min_commit_interval = Duration::from_millis(200);
        }
        if let Some(ms) = self.key_hold_ms {
            gesture.key_hold = Duration::from_millis(ms);
        }
        if let Some(ms) = self.activation_ms {
            gesture.activation_hold = Duration::from_millis(ms);
        }
        if let Some(ms) = self.deactivation_ms {
            gesture.deactivation_hold = Duration::from_millis(ms);
        }
        if let Some(px) = self.tolerance_px {
            gesture.anchor_tolerance_px = px;
        }
        if let Some(ms) = self.min_commit_interval_ms {
            gesture.min_commit_interval = Duration::from_millis(ms);
        }

        let startup = match &self.always_on {
            Some(point) => {
                let (x, y) = parse_point(point)
                    .with_context(|| format!("invalid --always-on value: {point}"))?;
                StartupMode::AlwaysOn { x, y }
            }
            None => StartupMode::Dwell,
        };

        Ok(SessionConfig { gesture, startup })
    }
}

/// Parse an "X,Y" pair of pixel coordinates.
fn parse_point(s: &str) -> anyhow::Result<(f32, f32)> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("expected X,Y"))?;
    let x: f32 = x.trim().parse().context("bad X coordinate")?;
    let y: f32 = y.trim().parse().context("bad Y coordinate")?;
    if !x.is_finite() || !y.is_finite() {
        return Err(anyhow!("coordinates must be finite"));
    }
    Ok((x, y))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("air-keyboard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing; stdout is reserved for the protocol stream
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "air_keyboard=info".into()),
        )
        .init();

    info!("air-keyboard v{} starting", env!("CARGO_PKG_VERSION"));
    info!("backend: {}", cli.backend);

    let backend_type = backend::BackendType::from_str(&cli.backend)
        .ok_or_else(|| anyhow!("unknown backend: {}. Use: replay or live", cli.backend))?;
    let session = cli.session_config()?;
    info!(
        "template: {}, key hold: {}ms, typing hand: {}",
        session.gesture.template.as_str(),
        session.gesture.key_hold.as_millis(),
        session.gesture.hands.typing_hand.as_str()
    );

    backend::run(
        backend_type,
        session,
        backend::StreamConfig {
            input: cli.input,
            snapshots: cli.snapshots,
        },
    )
}
