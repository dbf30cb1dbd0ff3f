//! Account registration shared by the signup page and the `create-user` command.

use recipe_core::password::{hash_password, verify_password};
use recipe_core::search::FormErrors;
use recipe_core::{CatalogError, Storage, User};
use thiserror::Error;
use tracing::info;

use crate::forms::{SignupForm, USERNAME_TAKEN};

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("signup form is invalid")]
    Invalid(FormErrors),

    #[error("{}", USERNAME_TAKEN)]
    Taken,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] CatalogError),
}

impl RegisterError {
    /// Field errors to show on the signup form, if the failure is the user's.
    pub fn form_errors(&self) -> Option<FormErrors> {
        match self {
            RegisterError::Invalid(errors) => Some(errors.clone()),
            RegisterError::Taken => {
                let mut errors = FormErrors::new();
                errors.add("username", USERNAME_TAKEN);
                Some(errors)
            }
            _ => None,
        }
    }
}

/// Hashes on the blocking pool.
pub async fn hash_blocking(password: String) -> Result<String, RegisterError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| RegisterError::Hashing(e.to_string()))
}

pub async fn verify_blocking(password: String, stored: String) -> Result<bool, RegisterError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| RegisterError::Hashing(e.to_string()))
}

/// Validates the form, checks the username is free, and stores the user.
pub async fn register(storage: &dyn Storage, form: &SignupForm) -> Result<User, RegisterError> {
    let (username, password) = form.validate().map_err(RegisterError::Invalid)?;

    if storage.get_user_by_username(&username).await?.is_some() {
        return Err(RegisterError::Taken);
    }

    let password_hash = hash_blocking(password).await?;
    let user = match storage.create_user(&username, &password_hash).await {
        Ok(user) => user,
        Err(CatalogError::Conflict(_)) => return Err(RegisterError::Taken),
        Err(e) => return Err(e.into()),
    };

    info!(user = %user.username, "User registered");
    Ok(user)
}
