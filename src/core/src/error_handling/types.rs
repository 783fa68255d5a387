use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBaseUrl(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBaseUrl(e) => write!(f, "Base URL error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failure of a single request against the backend API.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request never produced an HTTP response (refused, reset, DNS...).
    Network(String),
    /// The backend answered with a non-2xx status.
    Http { status: u16, body: Option<String> },
    /// A 2xx response whose body did not match the expected shape.
    Decode(String),
}

impl TransportError {
    /// Text suitable for an operator-facing notification.
    ///
    /// The backend reports failures as `{"message": "..."}`; that message wins,
    /// then the raw body, then a generic description.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Http {
                body: Some(body), ..
            } => match serde_json::from_str::<serde_json::Value>(body) {
                Ok(value) => match value.get("message").and_then(|m| m.as_str()) {
                    Some(message) => message.to_string(),
                    None => body.clone(),
                },
                Err(_) => body.clone(),
            },
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(e) => write!(f, "Network error: {}", e),
            TransportError::Http { status, .. } => {
                write!(f, "Request failed with status code {}", status)
            }
            TransportError::Decode(e) => write!(f, "Unexpected response body: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Client-side constraint violations. These never reach the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField(&'static str),
    InvalidPattern(String),
    InvalidPort,
    InvalidLimit,
    NotPersisted,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(name) => write!(f, "Field `{}` is required", name),
            ValidationError::InvalidPattern(e) => write!(f, "Invalid regular expression: {}", e),
            ValidationError::InvalidPort => write!(f, "Port must be between 1 and 65535"),
            ValidationError::InvalidLimit => write!(f, "Limit must be at least 1"),
            ValidationError::NotPersisted => write!(f, "Entity has not been created yet"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Error of an editor action: either the form is invalid or the request failed.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorError {
    Validation(ValidationError),
    Transport(TransportError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::Validation(e) => write!(f, "Validation error: {}", e),
            EditorError::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<ValidationError> for EditorError {
    fn from(err: ValidationError) -> Self {
        EditorError::Validation(err)
    }
}

impl From<TransportError> for EditorError {
    fn from(err: TransportError) -> Self {
        EditorError::Transport(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    Transport(TransportError),
    Validation(ValidationError),
    UnknownStream(i64),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Transport(e) => write!(f, "Transport error: {}", e),
            FeedError::Validation(e) => write!(f, "Validation error: {}", e),
            FeedError::UnknownStream(id) => write!(f, "Stream {} is not in the feed", id),
        }
    }
}

impl std::error::Error for FeedError {}

impl From<TransportError> for FeedError {
    fn from(err: TransportError) -> Self {
        FeedError::Transport(err)
    }
}

impl From<ValidationError> for FeedError {
    fn from(err: ValidationError) -> Self {
        FeedError::Validation(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}
