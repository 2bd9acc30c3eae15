//! Credential vault: ciphertext in the store, plaintext only in memory.

use integrahub_common::crypto::EncryptionService;
use integrahub_common::{CommonError, ErrorClassification};
use integrahub_domain::constants::ENV_ENCRYPTION_KEY;
use integrahub_domain::{CredentialMap, HubError, Result};
use serde_json::Value;

use super::ports::SealedFields;

/// Encrypts credential payloads and individual field values.
#[derive(Debug, Clone)]
pub struct CredentialVault {
    cipher: EncryptionService,
}

impl CredentialVault {
    pub const fn new(cipher: EncryptionService) -> Self {
        Self { cipher }
    }

    /// Build from a raw 32-byte key.
    pub fn from_key(key: &[u8]) -> Result<Self> {
        EncryptionService::new(key).map(Self::new).map_err(into_hub_error)
    }

    /// Build from `ENCRYPTION_KEY`.
    pub fn from_env() -> Result<Self> {
        EncryptionService::from_env(ENV_ENCRYPTION_KEY).map(Self::new).map_err(into_hub_error)
    }

    /// Serialize as canonical JSON and seal.
    pub fn encrypt_credentials(&self, credentials: &CredentialMap) -> Result<Vec<u8>> {
        let plaintext =
            serde_json::to_vec(credentials).map_err(|e| into_hub_error(CommonError::from(e)))?;
        let sealed = self.cipher.seal(&plaintext).map_err(into_hub_error)?;
        tracing::debug!(
            fields = credentials.len(),
            bytes = sealed.len(),
            "credentials encrypted"
        );
        Ok(sealed)
    }

    pub fn decrypt_credentials(&self, sealed: &[u8]) -> Result<CredentialMap> {
        let plaintext = self.cipher.open(sealed).map_err(into_hub_error)?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            HubError::Crypto(format!(
                "decrypted credentials are not a JSON object: {}",
                CommonError::from(e)
            ))
        })
    }

    /// Seal a single value; output is base64 of `nonce || ciphertext || tag`.
    pub fn encrypt_value(&self, value: &str) -> Result<String> {
        self.cipher.seal_to_base64(value.as_bytes()).map_err(into_hub_error)
    }

    pub fn decrypt_value(&self, sealed: &str) -> Result<String> {
        let plaintext = self.cipher.open_base64(sealed).map_err(into_hub_error)?;
        String::from_utf8(plaintext)
            .map_err(|_| HubError::Crypto("decrypted value is not valid UTF-8".into()))
    }

    /// Seal every field of a string-valued map independently.
    pub fn encrypt_fields(&self, credentials: &CredentialMap) -> Result<SealedFields> {
        credentials
            .iter()
            .map(|(field, value)| match value {
                Value::String(plain) => Ok((field.clone(), self.encrypt_value(plain)?)),
                _ => Err(HubError::Validation(format!("credential field '{field}' must be a string"))),
            })
            .collect()
    }

    /// Open every field; a failure names the offending field.
    pub fn decrypt_fields(&self, sealed: &SealedFields) -> Result<CredentialMap> {
        sealed
            .iter()
            .map(|(field, value)| {
                self.decrypt_value(value)
                    .map(|plain| (field.clone(), Value::String(plain)))
                    .map_err(|e| e.with_context(format!("field '{field}'")))
            })
            .collect()
    }
}

/// Map a primitive failure onto the hub taxonomy.
pub fn into_hub_error(err: CommonError) -> HubError {
    if err.is_critical() {
        tracing::warn!(severity = %err.severity(), error = %err, "credential primitive failed");
    }
    match err {
        CommonError::Config { .. } => HubError::Config(err.to_string()),
        CommonError::Crypto { message } => HubError::Crypto(message),
        CommonError::Serialization { .. } => HubError::Internal(err.to_string()),
    }
}
