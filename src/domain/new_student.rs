use secrecy::{ExposeSecret, Secret};

use crate::domain::{RecipientEmail, StudentProfile};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug)]
pub struct NewStudent {
    pub email: RecipientEmail,
    pub password: Secret<String>,
    pub profile: StudentProfile,
}

/// Checks that both password fields agree and that the password length is
/// acceptable. Runs before anything touches the network or the store.
pub fn confirm_password(
    password: Secret<String>,
    confirmation: &Secret<String>,
) -> Result<Secret<String>, String> {
    if password.expose_secret() != confirmation.expose_secret() {
        return Err("Passwords do not match.".to_string());
    }

    let length = password.expose_secret().chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {} characters long.",
            MAX_PASSWORD_LENGTH
        ));
    }

    Ok(password)
}
