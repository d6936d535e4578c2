//! Credentials for the provider, read from the environment at startup.

use crate::core::error::VolumapperError;

pub const AWS_ACCESS_KEY_ID_ENV_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_ENV_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Static credentials read once at startup.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    secret_access_key: String,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
        }
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Read both credential variables; a missing or empty one is fatal.
    pub fn from_env() -> Result<Self, VolumapperError> {
        Ok(Self::new(
            &required_env(AWS_ACCESS_KEY_ID_ENV_VAR)?,
            &required_env(AWS_SECRET_ACCESS_KEY_ENV_VAR)?,
        ))
    }
}

fn required_env(name: &str) -> Result<String, VolumapperError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(VolumapperError::EnvVarError(format!(
            "environment variable {} must be defined",
            name
        ))),
    }
}
