//! Botwire error types.
//!
//! # Error Classification
//!
//! Errors are grouped by how far they propagate:
//!
//! - **Subsystem-internal** ([`DecodeError`] on a single frame): logged and
//!   swallowed by the session, the connection stays up. Only fatal while a
//!   handshake is in progress.
//! - **Session lifecycle** ([`LoginError`], [`BotError::ReconnectExhausted`]):
//!   surfaced as a terminal transition to `Closed`, observable via `join()`
//!   and offline events, and returned to whoever called `login()`.
//! - **Caller operations** (`DeliveryTimeout`, `PermissionDenied`,
//!   `NoSuchContact`, `EventCancelled`): returned directly to the call site.
//!
//! The `Decode`, `Crypto` and `Login` variants keep their source error via
//! `#[source]`/`#[from]` so tools like `anyhow` show the full chain.

use std::time::Duration;

use thiserror::Error;

use crate::codec::crypto::CryptoError;
use crate::codec::DecodeError;
use crate::contact::ContactKind;

/// Reasons a login attempt can fail.
///
/// Fatal to the attempt; never retried automatically beyond the bounded
/// captcha loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Server rejected the credentials.
    #[error("wrong password")]
    WrongPassword,

    /// A captcha was required and could not be answered.
    #[error("captcha unresolved after {rounds} round(s)")]
    CaptchaUnresolved {
        /// Captcha rounds attempted before giving up.
        rounds: u32,
    },

    /// Server refused the login for another reason.
    #[error("login rejected by server: {0}")]
    Rejected(String),

    /// Server could not be reached or the connection broke mid-handshake.
    #[error("network unreachable: {0}")]
    Network(String),

    /// Handshake traffic could not be understood.
    #[error("handshake protocol error: {0}")]
    Protocol(String),

    /// Whole login (captcha rounds included) exceeded its deadline.
    #[error("login timed out after {0:?}")]
    Timeout(Duration),
}

impl LoginError {
    /// Whether retrying with the same credentials can never succeed.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::WrongPassword | Self::Rejected(_))
    }
}

/// Botwire errors.
#[derive(Error, Debug)]
pub enum BotError {
    /// Login failed.
    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    /// A frame could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[source] CryptoError),

    /// No correlated reply arrived after every retry.
    #[error("Delivery timed out after {attempts} attempt(s)")]
    DeliveryTimeout {
        /// Number of transmissions made.
        attempts: u32,
    },

    /// The bot lacks the privilege required for the action.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Lookup by an unknown id, or use of a stale contact handle.
    #[error("No such {kind} {id}")]
    NoSuchContact {
        /// Which contact list was searched.
        kind: ContactKind,
        /// The id that was not found.
        id: u64,
    },

    /// No live bot with this uin is registered.
    #[error("No such bot {0}")]
    NoSuchBot(u64),

    /// A live bot with this uin already exists in this process.
    #[error("Bot {0} already exists")]
    DuplicateBot(u64),

    /// The handle's owning bot has been dropped.
    #[error("Bot has been dropped")]
    BotDropped,

    /// A subscriber cancelled the event guarding this action.
    #[error("Event cancelled")]
    EventCancelled,

    /// The session was closed while the operation was pending.
    #[error("Session closed")]
    SessionClosed,

    /// The operation needs an online session.
    #[error("Bot is not online")]
    NotOnline,

    /// The server forced the bot offline.
    #[error("Forced offline: {title}: {message}")]
    ForcedOffline {
        /// Notice title.
        title: String,
        /// Notice body.
        message: String,
    },

    /// Automatic reconnection gave up.
    #[error("Reconnection failed after {attempts} attempt(s)")]
    ReconnectExhausted {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Server answered a request with an error.
    #[error("Remote error {code}: {message}")]
    Remote {
        /// Server error code.
        code: i32,
        /// Human-readable message.
        message: String,
    },

    /// Media upload or download failed.
    #[error("Media error: {0}")]
    Media(String),

    /// An argument is outside the range the server accepts.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected protocol traffic.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for botwire operations
pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    /// Build a `NoSuchContact` error.
    pub fn no_such(kind: ContactKind, id: u64) -> Self {
        Self::NoSuchContact { kind, id }
    }
}

impl From<CryptoError> for BotError {
    fn from(err: CryptoError) -> Self {
        BotError::Crypto(err)
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Media(err.to_string())
    }
}

impl From<toml::de::Error> for BotError {
    fn from(err: toml::de::Error) -> Self {
        BotError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_credential_failure() {
        assert!(LoginError::WrongPassword.is_credential_failure());
        assert!(LoginError::Rejected("banned".into()).is_credential_failure());
        assert!(!LoginError::Network("refused".into()).is_credential_failure());
        assert!(!LoginError::CaptchaUnresolved { rounds: 1 }.is_credential_failure());
    }

    #[test]
    fn test_error_display() {
        let err = BotError::no_such(ContactKind::Group, 42);
        assert_eq!(err.to_string(), "No such group 42");

        let err: BotError = LoginError::WrongPassword.into();
        assert_eq!(err.to_string(), "Login failed: wrong password");
    }
}
