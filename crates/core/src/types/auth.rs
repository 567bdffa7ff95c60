//! Authentication types.
//!
//! Tokens are wrapped in [`SecretString`] so they never appear in
//! `Debug` output or logs.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::id::ProfileId;

/// Login credentials sent to `auth/login`.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
}

impl Credentials {
    /// Build credentials from an email and plain-text password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token pair returned by `auth/login` and `auth/refresh-token`.
#[derive(Clone, Deserialize)]
pub struct LoginTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl std::fmt::Debug for LoginTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Payload for `auth/refresh-token`.
#[derive(Clone, Serialize)]
pub struct RefreshToken {
    #[serde(rename = "refreshToken", serialize_with = "expose_secret")]
    pub refresh_token: SecretString,
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub name: String,
    pub role: String,
    pub avatar: String,
}

fn expose_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("user@example.com"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_serialize_exposes_password() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let json = serde_json::to_value(&creds).expect("serialize credentials");
        assert_eq!(json["password"], "hunter2");
    }
}
