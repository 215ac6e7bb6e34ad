//! Cryptography for credentials at rest.

pub mod vault;

pub use vault::{VaultCrypto, VaultError};
