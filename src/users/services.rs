use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    repo::UserRepository,
    repo_types::{NewUser, User},
};
use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password,
    },
    db::RepoError,
    error::AppError,
};

pub const USERNAME_EMPTY: &str = "Username cannot be empty";
pub const EMAIL_INVALID: &str = "Invalid email format";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 5 characters long";
const MIN_PASSWORD_LEN: usize = 5;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::Validation(USERNAME_EMPTY.into()));
    }
    Ok(())
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    validate_username(&req.username)?;
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation(EMAIL_INVALID.into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(PASSWORD_TOO_SHORT.into()));
    }
    Ok(())
}

/// Registration, login and self-service profile changes.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    #[instrument(skip(self, req))]
    pub async fn register(&self, mut req: RegisterRequest) -> Result<User, AppError> {
        req.email = normalize_email(&req.email);
        validate_registration(&req).inspect_err(|e| warn!(reason = %e, "registration rejected"))?;

        let password_hash = password::hash(req.password).await?;
        let user = self
            .users
            .create(NewUser {
                username: req.username.trim().to_string(),
                email: req.email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => AppError::Conflict("Email already registered".into()),
                other => other.into(),
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password both fail with `AuthenticationFailed`.
    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> Result<User, AppError> {
        let email = normalize_email(&req.email);
        let user = self.users.find_by_email(&email).await?;

        // Unknown emails pay for a hash check too, so timing matches a wrong password.
        let stored = user.as_ref().map(|u| u.password_hash.clone());
        let matched = password::verify_or_dummy(req.password, stored).await?;

        match user {
            Some(user) if matched => {
                info!(user_id = %user.id, "user logged in");
                Ok(user)
            }
            Some(user) => {
                warn!(user_id = %user.id, "login with wrong password");
                Err(AppError::AuthenticationFailed)
            }
            None => {
                warn!("login for unknown email");
                Err(AppError::AuthenticationFailed)
            }
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    #[instrument(skip(self))]
    pub async fn update_username(&self, user_id: Uuid, username: &str) -> Result<User, AppError> {
        validate_username(username)?;
        self.users
            .update_username(user_id, username.trim())
            .await
            .map_err(user_not_found)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.delete(user_id).await.map_err(user_not_found)?;
        info!(%user_id, "user deleted");
        Ok(())
    }
}

fn user_not_found(e: RepoError) -> AppError {
    match e {
        RepoError::NotFound => AppError::NotFound("User not found".into()),
        other => other.into(),
    }
}
