//! Error types for the guidance server.

use thiserror::Error;

/// Terminal failure of a robot session.
///
/// The `Syntax`, `LoginFailed` and `Logic` kinds are reported to the robot
/// with the matching `30x` response before the error propagates; the
/// remaining kinds close the stream silently.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed or oversized client message. `301 SYNTAX ERROR` was sent.
    #[error("malformed or oversized client message")]
    Syntax,

    /// Confirmation code did not match the expected hash. `300 LOGIN FAILED`
    /// was sent.
    #[error("confirmation hash mismatch")]
    LoginFailed,

    /// Client violated the protocol state machine. `302 LOGIC ERROR` was
    /// sent.
    #[error("logic error: {0}")]
    Logic(&'static str),

    /// No byte arrived within the active receive timeout.
    #[error("no data within the receive timeout")]
    Timeout,

    /// The underlying stream failed (including the peer closing it).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every cell of the search patch was scanned without yielding the
    /// secret.
    #[error("scan exhausted the search patch without finding the secret")]
    SecretNotFound,
}

/// Result type alias using SessionError.
pub type Result<T> = std::result::Result<T, SessionError>;
