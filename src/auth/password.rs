//! Argon2id credential hashing. Stored values are PHC strings.
//!
//! The async entry points run on the blocking pool.

use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::sync::OnceCell;
use tracing::error;

// Stand-in credential for logins whose email has no account.
static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

pub async fn hash(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_blocking(&plain))
        .await
        .context("password hashing task panicked")?
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub async fn verify(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_blocking(&plain, &stored))
        .await
        .context("password verification task panicked")?
}

/// Like `verify`, but with no stored hash it still runs one verification
/// against a throwaway hash and reports a mismatch. Both outcomes cost the same.
pub async fn verify_or_dummy(plain: String, stored: Option<String>) -> anyhow::Result<bool> {
    match stored {
        Some(stored) => verify(plain, stored).await,
        None => {
            let dummy = DUMMY_HASH
                .get_or_try_init(|| hash("todo-api placeholder credential".into()))
                .await?;
            verify(plain, dummy.clone()).await?;
            Ok(false)
        }
    }
}

fn hash_blocking(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash error");
            anyhow::anyhow!(e.to_string())
        })
}

fn verify_blocking(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
