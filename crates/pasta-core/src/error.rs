use std::fmt;

/// Machine-readable error codes for operators and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidThreshold,
    InvalidWindow,
    TranscriptParseError,
    TranscriptReadFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::InvalidThreshold => "E1101",
            Self::InvalidWindow => "E1102",
            Self::TranscriptParseError => "E4001",
            Self::TranscriptReadFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidThreshold => "Invalid copypasta threshold",
            Self::InvalidWindow => "Invalid copypasta window",
            Self::TranscriptParseError => "Transcript line parse error",
            Self::TranscriptReadFailed => "Transcript read failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .pasta/config.toml and retry."),
            Self::InvalidThreshold => Some("Set `need` to at least 1."),
            Self::InvalidWindow => Some("Set `within_ms` to a positive number of milliseconds."),
            Self::TranscriptParseError => {
                Some("Each line must be a JSON object with at, id, sender and text fields.")
            }
            Self::TranscriptReadFailed => Some("Check the transcript path and read permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while configuring channels or reading transcripts.
///
/// The structures themselves never fail; these cover the edges where
/// operator input enters the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("E1101: channel {channel:?} needs at least one sender, got need = 0")]
    InvalidThreshold { channel: String },

    #[error("E1102: channel {channel:?} has an empty copypasta window")]
    InvalidWindow { channel: String },

    #[error("E1002: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("E4001: line {line}: {source}")]
    TranscriptParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("E5001: {0}")]
    TranscriptRead(#[from] std::io::Error),
}

impl Error {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidThreshold { .. } => ErrorCode::InvalidThreshold,
            Self::InvalidWindow { .. } => ErrorCode::InvalidWindow,
            Self::ConfigParse(_) => ErrorCode::ConfigParseError,
            Self::TranscriptParse { .. } => ErrorCode::TranscriptParseError,
            Self::TranscriptRead(_) => ErrorCode::TranscriptReadFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// The message is not currently recognized as copypasta.
///
/// This is the ordinary outcome of
/// [`DuplicateWindow::check`](crate::window::DuplicateWindow::check) and
/// is told apart by its type, never by inspecting a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
#[error("message is not copypasta")]
pub struct NotCopypasta;
