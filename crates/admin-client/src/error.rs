use thiserror::Error;

/// Errors surfaced by the request pipeline and everything built on it.
///
/// The type is `Clone` so a single failure can be handed to every caller
/// sharing one in-flight request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, DNS...).
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP-layer failure without a recognizable business code.
    #[error("HTTP error: status {status}")]
    Http { status: u16, message: String },

    /// The backend answered with a non-success business code.
    #[error("Business error {code}: {message}")]
    Business { code: String, message: String },

    /// Captcha rejected by the backend.
    #[error("Captcha error {code}: {message}")]
    Captcha { code: String, message: String },

    /// The access token was still rejected after a refresh and one retry.
    #[error("Access token expired: {0}")]
    TokenExpired(String),

    /// The session can no longer be recovered; the user must sign in again.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// The response could not be decoded into the expected payload.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (bad path, unserializable body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Business {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Stable string code identifying the failure.
    ///
    /// Business and captcha errors report the backend code verbatim.
    pub fn code(&self) -> &str {
        match self {
            Self::Network(_) => "NETWORK_ERROR",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Business { code, .. } | Self::Captcha { code, .. } => code,
            Self::TokenExpired(_) => "TOKEN_EXPIRED",
            Self::SessionExpired(_) => "SESSION_EXPIRED",
            Self::Decode(_) => "DECODE_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable message suitable for a notification.
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } if !message.is_empty() => message.clone(),
            Self::Business { message, .. } | Self::Captcha { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the error is one of the authentication subtypes.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired(_) | Self::SessionExpired(_) | Self::Captcha { .. }
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) => ErrorCategory::Network,
            Self::Http { .. } => ErrorCategory::Http,
            Self::Business { .. } => ErrorCategory::Business,
            Self::Captcha { .. } | Self::TokenExpired(_) | Self::SessionExpired(_) => {
                ErrorCategory::Auth
            }
            Self::Decode(_) | Self::InvalidRequest(_) => ErrorCategory::Serialization,
            Self::Storage(_) => ErrorCategory::System,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Error categories for logging and notification routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Http,
    Business,
    Auth,
    Serialization,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::Business => "business",
            Self::Auth => "auth",
            Self::Serialization => "serialization",
            Self::System => "system",
        };
        f.write_str(name)
    }
}

/// Failures of the local key/value tiers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
