use actix_web::http::header::HeaderMap;
use anyhow::{anyhow, Context};
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use uuid::Uuid;

use crate::configuration::OperatorSettings;
use crate::records::RecordStore;
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials.")]
    InvalidCredentials(#[source] anyhow::Error),

    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

// verified in place of a missing account so unknown usernames cost the same.
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$\
    CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTwllSAxT0zRno";

/// Checks basic auth credentials against the configured operator account and
/// returns the operator's username.
#[tracing::instrument(name = "validate operator credentials", skip(credentials, operator))]
pub async fn validate_credentials(
    credentials: Credentials,
    operator: &OperatorSettings,
) -> Result<String, AuthError> {
    let stored = (credentials.username == operator.username)
        .then(|| (operator.username.clone(), operator.password_hash.clone()));

    verify_stored_credentials(stored, credentials.password).await
}

/// Checks basic auth credentials (email and password) against the stored
/// student accounts and returns the student's id.
#[tracing::instrument(
    name = "validate student credentials",
    skip(credentials, records),
    fields(username = %credentials.username)
)]
pub async fn validate_student_credentials(
    credentials: Credentials,
    records: &dyn RecordStore,
) -> Result<Uuid, AuthError> {
    let stored = records
        .get_student_credentials(&credentials.username)
        .await
        .context("failed to retrieve stored credentials.")?;

    verify_stored_credentials(stored, credentials.password).await
}

async fn verify_stored_credentials<T>(
    stored: Option<(T, Secret<String>)>,
    password: Secret<String>,
) -> Result<T, AuthError> {
    let (account, expected_password_hash) = match stored {
        Some((account, hash)) => (Some(account), hash),
        None => (None, Secret::new(DUMMY_PASSWORD_HASH.to_string())),
    };

    spawn_blocking_with_tracing(move || {
        verify_password_hash(expected_password_hash, password)
    })
    .await
    .context("failed to spawn blocking task.")??;

    account
        .ok_or_else(|| anyhow!("unknown username."))
        .map_err(AuthError::InvalidCredentials)
}

#[tracing::instrument(
    name = "verify password hash",
    skip(expected_password_hash, password_candidate)
)]
pub fn verify_password_hash(
    expected_password_hash: Secret<String>,
    password_candidate: Secret<String>,
) -> Result<(), AuthError> {
    let expected_password_hash =
        PasswordHash::new(expected_password_hash.expose_secret())
            .context("failed to parse hash to PHC string format.")?;

    Argon2::default()
        .verify_password(
            password_candidate.expose_secret().as_bytes(),
            &expected_password_hash,
        )
        .context("invalid password")
        .map_err(AuthError::InvalidCredentials)
}

/// Hashes a password into an argon2id PHC string.
pub fn compute_password_hash(
    password: Secret<String>,
) -> Result<Secret<String>, anyhow::Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params::new(15000, 2, 1, None)
        .map_err(|e| anyhow!(e))
        .context("invalid argon2 parameters")?;
    let password_hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow!(e))
        .context("failed to hash password")?
        .to_string();

    Ok(Secret::new(password_hash))
}

pub fn basic_authentication(
    headers: &HeaderMap,
) -> Result<Credentials, anyhow::Error> {
    let header_value = headers
        .get("Authorization")
        .context("The 'Authorization' header was missing")?
        .to_str()
        .context("The 'Authorization' header was not a valid UTF8 string.")?;

    let base64encoded_credentials = header_value
        .strip_prefix("Basic ")
        .context("The authorization scheme was not 'Basic'.")?;

    let decoded_credentials = base64::engine::general_purpose::STANDARD
        .decode(base64encoded_credentials)
        .context("Failed to base64-decode 'Basic' credentials.")?;

    let decoded_credentials = String::from_utf8(decoded_credentials)
        .context("The decoded credential string is not valid UTF8.")?;

    let mut credentials = decoded_credentials.splitn(2, ':');
    let username = credentials
        .next()
        .ok_or_else(|| anyhow!("A username must be provided in 'Basic' auth."))?
        .to_string();
    let password = credentials
        .next()
        .ok_or_else(|| anyhow!("A password must be provided in 'Basic' auth."))?
        .to_string();

    Ok(Credentials {
        username,
        password: Secret::new(password),
    })
}
