//! Service credentials
//!
//! Builds the immutable credentials value from named configuration
//! parameters supplied by the host. Secret decryption is delegated to an
//! external facility behind the [`DecryptSecret`] trait; the decrypted
//! password lives only inside the [`Credentials`] value and is redacted
//! from all `Debug` output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Configuration parameter name for the service account user.
pub const PARAM_USERNAME: &str = "Username";

/// Configuration parameter name for the encrypted service password.
pub const PARAM_PASSWORD: &str = "Password";

/// Configuration parameter name for the ERP client identifier.
pub const PARAM_CLIENT: &str = "Client";

/// An opaque encrypted secret as stored in host configuration.
///
/// The payload's interpretation belongs to the external decrypt facility;
/// this type only carries it around without exposing it in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecureValue {
    raw: String,
}

impl SecureValue {
    /// Wrap an encrypted payload.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw encrypted payload, for the decrypt facility.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Debug for SecureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureValue")
            .field("raw", &"[REDACTED]")
            .finish()
    }
}

/// One named configuration parameter from the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigParameter {
    /// Plain-text value, if the parameter carries one.
    #[serde(default)]
    pub value: Option<String>,

    /// Encrypted value, if the parameter is a secret.
    #[serde(default)]
    pub secure_value: Option<SecureValue>,
}

impl ConfigParameter {
    /// Create a plain-text parameter.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            secure_value: None,
        }
    }

    /// Create a secret parameter.
    pub fn secure(value: impl Into<String>) -> Self {
        Self {
            value: None,
            secure_value: Some(SecureValue::new(value)),
        }
    }
}

/// Named configuration parameters as supplied by the host.
pub type ConfigParameters = HashMap<String, ConfigParameter>;

/// External secure-string facility: one decrypt call, opaque value in,
/// plaintext out.
pub trait DecryptSecret: Send + Sync {
    /// Decrypt an opaque secure value into plaintext.
    fn decrypt(&self, value: &SecureValue) -> ConnectorResult<String>;
}

/// Username/password/client tuple used to authenticate against the remote
/// service. Built once per configuration load and reused read-only.
#[derive(Clone)]
pub struct Credentials {
    /// Service account user, trimmed of surrounding whitespace.
    pub username: Option<String>,

    /// Decrypted plaintext password. Never logged.
    password: Option<String>,

    /// ERP client identifier, trimmed of surrounding whitespace.
    pub client: Option<String>,
}

impl Credentials {
    /// Build credentials from the host's configuration parameters.
    ///
    /// The keys [`PARAM_USERNAME`], [`PARAM_PASSWORD`] and [`PARAM_CLIENT`]
    /// must all be present; a missing key is a fatal configuration error.
    /// Parameters whose inner value is absent leave the corresponding
    /// field unset.
    pub fn from_parameters(
        parameters: &ConfigParameters,
        decrypt: &dyn DecryptSecret,
    ) -> ConnectorResult<Self> {
        let username = required(parameters, PARAM_USERNAME)?
            .value
            .as_deref()
            .map(|v| v.trim().to_string());

        let password = match &required(parameters, PARAM_PASSWORD)?.secure_value {
            Some(secure) => Some(decrypt.decrypt(secure)?),
            None => None,
        };

        let client = required(parameters, PARAM_CLIENT)?
            .value
            .as_deref()
            .map(|v| v.trim().to_string());

        Ok(Self {
            username,
            password,
            client,
        })
    }

    /// The decrypted password, for the wire codec only.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("client", &self.client)
            .finish()
    }
}

fn required<'a>(
    parameters: &'a ConfigParameters,
    name: &str,
) -> ConnectorResult<&'a ConfigParameter> {
    parameters
        .get(name)
        .ok_or_else(|| ConnectorError::MissingParameter {
            name: name.to_string(),
        })
}
