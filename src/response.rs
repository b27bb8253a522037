use serde::Serialize;

pub const REGISTERED: &str = "User registered successfully";
pub const LOGGED_IN: &str = "User logged in successfully";
pub const FETCHED: &str = "Data fetched successfully";
pub const ADDED: &str = "Data added successfully";
pub const UPDATED: &str = "Data updated successfully";
pub const DELETED: &str = "Data deleted successfully";

/// Envelope shared by every JSON response, success or failure.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
