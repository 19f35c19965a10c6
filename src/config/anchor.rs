//! Anchoring side-channel configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

const MIN_SALT_LEN: usize = 16;

/// Settings for mirroring milestone events to an external ledger.
///
/// The salt keeps anchored digests from being linked back to group or
/// user identifiers; it is required only when anchoring is enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Label of the target network, carried on every anchor record
    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "empty_salt")]
    pub salt: SecretString,
}

impl AnchorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }
        let salt = self.salt.expose_secret();
        if salt.is_empty() {
            return Err(ValidationError::MissingRequired("ANCHOR_SALT"));
        }
        if salt.len() < MIN_SALT_LEN {
            return Err(ValidationError::AnchorSaltTooShort(MIN_SALT_LEN));
        }
        Ok(())
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            network: default_network(),
            salt: empty_salt(),
        }
    }
}

fn default_network() -> String {
    "dry-run".to_string()
}

fn empty_salt() -> SecretString {
    SecretString::new(String::new())
}
