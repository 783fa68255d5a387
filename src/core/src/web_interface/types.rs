use serde::Serialize;

/// JSON error payload, the same shape the backend uses.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub selected: i64,
}
