use thiserror::Error;

/// Errors produced while loading, encoding or persisting temp data.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload is not valid base64 or is a truncated/malformed binary buffer.
    #[error("temp data payload is corrupt")]
    CorruptData,

    /// The protected payload failed its integrity check.
    #[error("temp data payload failed authentication")]
    AuthenticationFailed,

    #[error("unsupported temp data format version: {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported temp data value type: {0}")]
    UnsupportedType(String),

    /// The host did not install session support for this request.
    #[error("session support is not enabled for this request")]
    SessionUnavailable,

    #[error(transparent)]
    Session(#[from] tower_sessions_core::session::Error),

    #[error("temp data cookie exceeds max_cookie_bytes ({size} > {max})")]
    CookieTooLarge { size: usize, max: usize },

    #[error("temp data encode failed: {0}")]
    Encode(String),

    #[error("temp data backend failed: {0}")]
    Backend(String),
}

impl Error {
    /// Whether this error describes bad payload bytes rather than a host or backend problem.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::CorruptData
                | Error::AuthenticationFailed
                | Error::UnsupportedVersion(_)
                | Error::UnsupportedType(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
