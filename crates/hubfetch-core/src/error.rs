use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HubError>;

/// Why the transport never got a meaningful answer from the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Dns,
    Tls,
    Refused,
    Timeout,
    Other,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionKind::Dns => "DNS resolution failed",
            ConnectionKind::Tls => "TLS handshake failed",
            ConnectionKind::Refused => "connection refused",
            ConnectionKind::Timeout => "connection timed out",
            ConnectionKind::Other => "connection failed",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Invalid {what}: {message}")]
    Parse { what: &'static str, message: String },

    #[error("Could not reach hub ({kind}): {message}")]
    Connection { kind: ConnectionKind, message: String },

    #[error("Hub rejected credentials: {0}")]
    AuthRejected(String),

    #[error("Authentication cancelled")]
    AuthCancelled,

    #[error("Could not read credential file {}: {source}", path.display())]
    CredentialResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid certificate material: {0}")]
    InvalidCertificate(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Not signed in to the hub")]
    AuthRequired,

    #[error("Transfer interrupted: {0}")]
    Stream(String),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid connection options: {0}")]
    Config(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl HubError {
    pub(crate) fn parse(what: &'static str, message: impl Into<String>) -> Self {
        HubError::Parse {
            what,
            message: message.into(),
        }
    }

    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
    }

    /// Map a non-2xx response of an authenticated request to an error.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body.trim());
        match status.as_u16() {
            401 | 403 => HubError::AuthRejected(if truncated.is_empty() {
                status.to_string()
            } else {
                truncated
            }),
            404 => HubError::NotFound(truncated),
            _ => HubError::Http {
                status,
                body: truncated,
            },
        }
    }

    /// True for failures that happened before the hub said anything.
    pub fn is_connection(&self) -> bool {
        matches!(self, HubError::Connection { .. })
    }
}
