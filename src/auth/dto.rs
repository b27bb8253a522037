use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub prefix: &'static str,
}

impl AuthResponse {
    pub fn bearer(token: String) -> Self {
        Self {
            token,
            prefix: "Bearer",
        }
    }
}
