//! Shared cryptographic primitives used by the credential vault.

pub mod encryption;

pub use encryption::{EncryptionService, KEY_LEN, NONCE_LEN};
