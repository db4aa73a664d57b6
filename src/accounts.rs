//! Client registration, login and password changes.

use crate::backend::BookingBackend;
use crate::error::{BookingError, Result};
use crate::types::{Client, ClientId, NewClient, Role};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand_core::OsRng;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

lazy_static! {
    static ref PHONE_NUMBER: Regex = Regex::new(r"^[0-9+()\- ]{8,20}$").unwrap();
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(regex(path = *PHONE_NUMBER))]
    pub phone: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6))]
    pub new_password: String,
    #[validate(length(min = 1))]
    pub confirm_password: String,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| BookingError::Storage(format!("password hashing failed: {err}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn register<T: BookingBackend>(backend: &T, request: RegisterRequest) -> Result<Client> {
    let request = RegisterRequest {
        email: normalize_email(&request.email),
        ..request
    };
    request.validate()?;
    let client = backend.register_client(NewClient {
        name: request.name.trim().to_string(),
        email: request.email,
        phone: request.phone.filter(|phone| !phone.trim().is_empty()),
        password_hash: hash_password(&request.password)?,
        role: Role::Client,
    })?;
    info!(client_id = client.id, "Registered client");
    Ok(client)
}

pub fn authenticate<T: BookingBackend>(backend: &T, request: &LoginRequest) -> Result<Client> {
    let email = normalize_email(&request.email);
    request.validate()?;
    let client = backend
        .client_by_email(&email)?
        .ok_or(BookingError::InvalidCredentials)?;
    if !verify_password(&request.password, &client.password_hash) {
        warn!(client_id = client.id, "Login with wrong password");
        return Err(BookingError::InvalidCredentials);
    }
    Ok(client)
}

pub fn change_password<T: BookingBackend>(
    backend: &T,
    client_id: ClientId,
    request: ChangePasswordRequest,
) -> Result<()> {
    request.validate()?;
    if request.new_password != request.confirm_password {
        return Err(BookingError::InvalidInput("passwords do not match".into()));
    }
    let client = backend
        .client(client_id)?
        .ok_or(BookingError::NotFound("client"))?;
    if !verify_password(&request.current_password, &client.password_hash) {
        return Err(BookingError::InvalidCredentials);
    }
    backend.update_password(client_id, hash_password(&request.new_password)?)
}

/// Creates the admin account on first start. Does nothing if the e-mail is taken.
pub fn seed_admin<T: BookingBackend>(backend: &T, email: &str, password: &str) -> Result<()> {
    let email = normalize_email(email);
    if let Some(existing) = backend.client_by_email(&email)? {
        if existing.role != Role::Admin {
            warn!(%email, "Configured admin e-mail belongs to a client account");
        }
        return Ok(());
    }
    backend.register_client(NewClient {
        name: "Admin".into(),
        email: email.clone(),
        phone: None,
        password_hash: hash_password(password)?,
        role: Role::Admin,
    })?;
    info!(%email, "Created admin account");
    Ok(())
}
