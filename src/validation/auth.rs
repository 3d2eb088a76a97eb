use garde::Validate;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Email + password as posted to `/auth/register` and `/auth/login`.
///
/// Fields default to empty so a missing field is reported as a 400 by
/// validation instead of a body-decoding rejection.
#[derive(Deserialize, Validate, Debug)]
pub struct Credentials {
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

impl Credentials {
    /// Validates the payload and returns the normalized (trimmed, lowercased) email.
    pub fn validated_email(&self) -> Result<String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation(
                "email and password are required".to_string(),
            ));
        }

        let normalized = Credentials {
            email: normalize_email(&self.email),
            password: self.password.clone(),
        };
        normalized.validate().map_err(|report| {
            tracing::debug!("Credential validation failed: {}", report);
            AppError::Validation(report.to_string())
        })?;

        Ok(normalized.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Identifier + app password posted to `/auth/bluesky/login`.
#[derive(Deserialize, Validate, Debug)]
pub struct BlueskyLogin {
    #[serde(default)]
    #[garde(length(min = 1, max = 253))]
    pub identifier: String,
    #[serde(default)]
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

impl BlueskyLogin {
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|_| {
            AppError::Validation("identifier and app password are required".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(matches!(
            creds("", "pw").validated_email(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            creds("a@example.com", "").validated_email(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(creds("not-an-email", "pw").validated_email().is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            creds("  Alice@Example.COM ", "pw").validated_email().unwrap(),
            "alice@example.com"
        );
    }
}
