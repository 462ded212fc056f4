//! Backend abstraction — replay and live stream drivers.

pub mod stream;

use std::path::PathBuf;

use crate::state::SessionConfig;

/// Backend type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Tick timestamps come from each message's `:t` field.
    Replay,
    /// Tick timestamps come from a monotonic clock started at launch.
    Live,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::Live => "live",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "replay" => Some(Self::Replay),
            "live" => Some(Self::Live),
            _ => None,
        }
    }
}

/// Stream I/O settings.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Read messages from this file instead of stdin.
    pub input: Option<PathBuf>,
    /// Attach render snapshots to tick responses.
    pub snapshots: bool,
}

/// Run a keyboard session with the selected backend.
pub fn run(
    backend: BackendType,
    session: SessionConfig,
    config: StreamConfig,
) -> anyhow::Result<()> {
    stream::run(backend, session, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_names() {
        for b in [BackendType::Replay, BackendType::Live] {
            assert_eq!(BackendType::from_str(b.as_str()), Some(b));
        }
        assert_eq!(BackendType::from_str("drm"), None);
    }
}
