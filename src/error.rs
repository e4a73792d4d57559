//! Error taxonomy for the acquisition pipeline.
//!
//! Errors are grouped by who can act on them: transport failures are retried,
//! authentication failures stop the process, catalog failures are converted
//! into a terminal item outcome by the pipeline.

use thiserror::Error;

/// Failure of a single HTTP exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("cannot decode response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, TransportError::Status(403))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return TransportError::Status(status.as_u16());
        }

        if err.is_decode() {
            return TransportError::Decode(err.to_string());
        }

        TransportError::Network(err.to_string())
    }
}

/// Failure to obtain a usable session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The stored credential maps to no user. It must be cleared, never retried.
    #[error("Wrong credentials!")]
    InvalidCredential,

    #[error("Unable to initialize the catalog API: {0}")]
    Unavailable(String),

    #[error("Session token still rejected after {0} consecutive refreshes")]
    RefreshLimit(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    /// Recovered inside the session by refreshing the token.
    #[error("session token required")]
    TokenExpired,

    #[error("Other users private playlists are not supported!")]
    PrivatePlaylist,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    NoAlternative(#[from] NoAlternative),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Only authentication failures abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }
}

/// A catalog URL that does not name a downloadable collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("\"{0}\" is not a catalog URL")]
    Unrecognized(String),

    #[error("Unsupported link type \"{0}\"")]
    UnsupportedType(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed writing tags: {0}")]
pub struct TagError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed decrypting payload: {0}")]
pub struct DecryptError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no alternative track found")]
pub struct NoAlternative;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
