//! AES-256-GCM primitive backing the credential vault.
//!
//! Every sealed payload uses the same byte layout:
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! [`EncryptionService::seal_to_base64`] / [`EncryptionService::open_base64`]
//! wrap that layout in standard base64 for string-valued fields.
//!
//! ## Usage
//!
//! ```rust
//! use integrahub_common::crypto::encryption::EncryptionService;
//!
//! let service = EncryptionService::new(b"0123456789abcdef0123456789abcdef")?;
//!
//! let sealed = service.seal(b"sensitive data")?;
//! let opened = service.open(&sealed)?;
//! assert_eq!(opened, b"sensitive data");
//! # Ok::<(), integrahub_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CommonError, CommonResult};

/// Required key length in bytes for AES-256.
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes for AES-GCM.
pub const NONCE_LEN: usize = 12;

const TAG_LEN: usize = 16;

/// Process-wide AES-256-GCM service.
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::config_field(
                "encryption_key",
                format!("encryption key must be exactly {KEY_LEN} bytes, got {}", key.len()),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CommonError::config(format!("failed to create cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Create a service from the raw bytes of an environment variable.
    ///
    /// The variable value is used verbatim (not hex or base64 decoded) and
    /// must be exactly 32 bytes long.
    pub fn from_env(var: &str) -> CommonResult<Self> {
        let value = Zeroizing::new(
            std::env::var(var)
                .map_err(|_| CommonError::config_field(var, "environment variable is not set"))?,
        );
        Self::new(value.as_bytes())
    }

    /// Encrypt `plaintext` into `nonce || ciphertext || tag`.
    pub fn seal(&self, plaintext: &[u8]) -> CommonResult<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CommonError::crypto("encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a `nonce || ciphertext || tag` payload.
    pub fn open(&self, sealed: &[u8]) -> CommonResult<Vec<u8>> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CommonError::crypto(format!(
                "ciphertext too short: {} bytes",
                sealed.len()
            )));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| {
            tracing::debug!(bytes = sealed.len(), "authenticated decryption failed");
            CommonError::crypto("authentication tag mismatch")
        })
    }

    /// Encrypt and encode the sealed payload as standard base64.
    pub fn seal_to_base64(&self, plaintext: &[u8]) -> CommonResult<String> {
        Ok(BASE64.encode(self.seal(plaintext)?))
    }

    /// Decode a base64 sealed payload and decrypt it.
    pub fn open_base64(&self, encoded: &str) -> CommonResult<Vec<u8>> {
        let sealed = BASE64
            .decode(encoded.trim())
            .map_err(|e| CommonError::crypto(format!("base64 decode failed: {e}")))?;
        self.open(&sealed)
    }
}
