//! Stream backend — one s-expression message per line in, responses and
//! events out.
//!
//! Reads stdin (or a recorded file), stamps ticks according to the backend
//! type, and writes every response and event line to stdout. Logging goes to
//! stderr so stdout stays a clean protocol stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use super::{BackendType, StreamConfig};
use crate::ipc::dispatch::{handle_message, DispatchOptions, TickClock};
use crate::state::{KeyboardSession, SessionConfig};

/// Counters reported when the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Messages dispatched (blank and comment lines excluded).
    pub messages: u64,
    /// Lines written to the output.
    pub lines_out: u64,
}

/// Run the session until the input is exhausted.
pub fn run(
    backend: BackendType,
    session_config: SessionConfig,
    config: StreamConfig,
) -> anyhow::Result<()> {
    let mut session = KeyboardSession::new(session_config);

    let reader: Box<dyn BufRead> = match &config.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            info!("Reading messages from {}", path.display());
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading messages from stdin");
            Box::new(BufReader::new(io::stdin()))
        }
    };
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    info!(
        "{} backend initialized (snapshots: {}), entering message loop",
        backend.as_str(),
        config.snapshots
    );

    let stats = pump(reader, &mut writer, &mut session, backend, config.snapshots)?;

    info!(
        "{} backend shutting down ({} message(s), {} tick(s), {} line(s) committed)",
        backend.as_str(),
        stats.messages,
        session.ticks,
        session.lines_committed
    );
    Ok(())
}

/// Dispatch every line of `reader` and write the output lines to `writer`.
///
/// Blank lines and lines starting with `;` are skipped.
pub fn pump<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    session: &mut KeyboardSession,
    backend: BackendType,
    snapshots: bool,
) -> anyhow::Result<StreamStats> {
    let start = Instant::now();
    let mut stats = StreamStats::default();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read input line {}", lineno + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        let clock = match backend {
            BackendType::Replay => TickClock::Message,
            BackendType::Live => TickClock::Fixed(start.elapsed()),
        };
        let opts = DispatchOptions { clock, snapshots };

        stats.messages += 1;
        for out in handle_message(session, trimmed, opts) {
            writeln!(writer, "{}", out).context("failed to write output")?;
            stats.lines_out += 1;
        }
        writer.flush().context("failed to flush output")?;
    }

    debug!("input exhausted after {} message(s)", stats.messages);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StartupMode;
    use std::io::Cursor;

    fn run_replay(session: &mut KeyboardSession, input: &str) -> (StreamStats, Vec<String>) {
        let mut out = Vec::new();
        let stats = pump(
            Cursor::new(input.to_string()),
            &mut out,
            session,
            BackendType::Replay,
            false,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        (stats, text.lines().map(str::to_string).collect())
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let mut session = KeyboardSession::new(SessionConfig::default());
        let (stats, lines) = run_replay(
            &mut session,
            "\n; recorded session\n(:type :status :id 1)\n   \n",
        );
        assert_eq!(stats.messages, 1);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("(:type :response :id 1 :status :ok"));
    }

    #[test]
    fn test_errors_do_not_stop_the_stream() {
        let mut session = KeyboardSession::new(SessionConfig::default());
        let (stats, lines) = run_replay(
            &mut session,
            "(:type :tick\n(:type :nope :id 2)\n(:type :status :id 3)\n",
        );
        assert_eq!(stats.messages, 3);
        assert!(lines[0].contains(":status :error"));
        assert!(lines[1].contains(":status :error"));
        assert!(lines[2].contains(":id 3 :status :ok"));
    }

    #[test]
    fn test_replayed_typing_session() {
        let mut session = KeyboardSession::new(SessionConfig {
            startup: StartupMode::AlwaysOn { x: 0.0, y: 0.0 },
            ..SessionConfig::default()
        });
        let layout = session.machine.layout().unwrap().clone();
        let mut script = String::new();
        let mut t = 0.0;
        for label in ["O", "K", "Enter"] {
            let k = layout.get(label).unwrap();
            for dt in [0.0, 2.0] {
                script.push_str(&format!(
                    "(:type :tick :t {} :samples ((:hand left :x {} :y {})))\n",
                    t + dt,
                    k.x,
                    k.y
                ));
            }
            script.push_str(&format!("(:type :tick :t {} :samples ())\n", t + 2.5));
            t += 3.0;
        }

        let (stats, lines) = run_replay(&mut session, &script);
        assert_eq!(stats.messages, 9);
        assert!(
            lines.contains(&"(:type :event :event :line-committed :text \"OK\")".to_string()),
            "output was {:?}",
            lines
        );
        assert_eq!(session.lines_committed, 1);
        assert!(session.buffer.is_empty());
    }

    #[test]
    fn test_live_clock_ignores_message_time() {
        let mut session = KeyboardSession::new(SessionConfig::default());
        let mut out = Vec::new();
        let stats = pump(
            Cursor::new("(:type :tick :id 1 :samples ())\n"),
            &mut out,
            &mut session,
            BackendType::Live,
            true,
        )
        .unwrap();
        assert_eq!(stats, StreamStats { messages: 1, lines_out: 1 });
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(":snapshot (:active nil"));
    }
}
