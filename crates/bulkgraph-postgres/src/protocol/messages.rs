//! Messages exchanged during a COPY session.

use std::fmt;

/// Client-to-server messages a load sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendMessage {
    /// Simple-protocol statement.
    Query(String),
    /// A slice of COPY text-format rows.
    CopyData(Vec<u8>),
    /// End of the COPY input.
    CopyDone,
    /// Abort the COPY; the server rolls the statement back.
    CopyFail(String),
}

impl FrontendMessage {
    /// Type byte that starts the frame.
    pub const fn tag(&self) -> u8 {
        match self {
            FrontendMessage::Query(_) => b'Q',
            FrontendMessage::CopyData(_) => b'd',
            FrontendMessage::CopyDone => b'c',
            FrontendMessage::CopyFail(_) => b'f',
        }
    }
}

/// Server-to-client messages, decoded as far as a load needs them.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    ReadyForQuery(TransactionStatus),
    /// Command tag, e.g. `COPY 42` or `BEGIN`.
    CommandComplete(String),
    /// The server is waiting for COPY data.
    CopyInResponse {
        /// `0` for text, `1` for binary.
        format: i8,
        columns: usize,
    },
    ErrorResponse(ServerError),
    NoticeResponse(ServerError),
    ParameterStatus { name: String, value: String },
    /// A well-formed message whose content a load never uses (row
    /// descriptions, data rows, notifications, empty query responses).
    Skipped(u8),
}

impl BackendMessage {
    /// Messages that can arrive between any two replies.
    pub const fn is_asynchronous(&self) -> bool {
        matches!(
            self,
            BackendMessage::NoticeResponse(_)
                | BackendMessage::ParameterStatus { .. }
                | BackendMessage::Skipped(b'A')
        )
    }
}

/// Transaction state carried by ReadyForQuery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Idle,
    InTransaction,
    /// Inside a transaction that has already failed; only ROLLBACK succeeds.
    Failed,
}

impl TransactionStatus {
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Idle => b'I',
            Self::InTransaction => b'T',
            Self::Failed => b'E',
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'I' => Self::Idle,
            b'T' => Self::InTransaction,
            b'E' => Self::Failed,
            _ => return None,
        })
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::InTransaction => "in transaction",
            Self::Failed => "in failed transaction",
        })
    }
}

/// Fields of an ErrorResponse or NoticeResponse.
///
/// Only the fields that help explain a rejected load are kept; positions,
/// source locations and routine names are dropped while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerError {
    pub severity: String,
    /// Five-character SQLSTATE.
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    /// For COPY this names the offending input line.
    pub context: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub constraint: Option<String>,
}

impl ServerError {
    /// SQLSTATE class: the first two characters of the code.
    pub fn class(&self) -> &str {
        self.code.get(..2).unwrap_or("")
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code, self.message)?;
        for (label, value) in [
            ("detail", &self.detail),
            ("hint", &self.hint),
            ("context", &self.context),
        ] {
            if let Some(value) = value {
                write!(f, "; {label}: {value}")?;
            }
        }
        Ok(())
    }
}
