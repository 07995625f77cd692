//! Encryption for page files at rest.
//!
//! Responsibilities:
//! - Provide AES-256-GCM encryption and decryption of whole page files.
//! - Handle key derivation using Argon2id.
//! - Manage master key sources (Keyring, Password, Env).
//!
//! Does NOT handle:
//! - Deciding which files are encrypted (see `pattern.rs`).
//! - Parsing the decrypted text (see `page.rs`).
//!
//! Invariants:
//! - Encrypted files are self-describing: magic + version + salt + nonce +
//!   ciphertext, so a container can be decrypted with nothing but the key
//!   source.
//! - The salt is only used for password-derived keys but is always present
//!   in the container.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use rand::RngExt;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::constants::{
    APP_NAME, ENCRYPTED_PAGE_MAGIC, ENCRYPTED_PAGE_VERSION, KEYRING_MASTER_KEY_ENTRY,
};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = ENCRYPTED_PAGE_MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;

/// Errors that can occur during encryption operations.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("invalid key size: expected 32 bytes")]
    InvalidKeySize,

    #[error("not an encrypted page file: {0}")]
    BadContainer(&'static str),

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("environment variable error: {0}")]
    Env(String),
}

pub type Result<T> = std::result::Result<T, CipherError>;

/// Sources for the master encryption key.
#[derive(Debug, Clone)]
pub enum MasterKeySource {
    /// Use a random key stored in the OS keyring, generated on first use.
    Keyring,
    /// Derive a key from a user-provided password.
    Password(SecretString),
    /// Use a hex-encoded 32-byte key from an environment variable.
    Env(String),
}

impl MasterKeySource {
    /// Resolves the master key source into a 32-byte key.
    pub fn resolve(&self, salt: Option<&[u8]>) -> Result<[u8; 32]> {
        match self {
            Self::Keyring => {
                let entry = keyring::Entry::new(APP_NAME, KEYRING_MASTER_KEY_ENTRY)?;
                match entry.get_password() {
                    Ok(p) => decode_hex_key(&p),
                    Err(keyring::Error::NoEntry) => {
                        // Generate a new random key and store it
                        let mut key = [0u8; 32];
                        rand::rng().fill(&mut key);
                        entry.set_password(&hex::encode(key))?;
                        Ok(key)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Self::Password(pw) => {
                let salt = salt.ok_or_else(|| {
                    CipherError::KeyDerivationFailed(
                        "salt required for password-based encryption".to_string(),
                    )
                })?;
                derive_key(pw, salt)
            }
            Self::Env(var_name) => {
                let val = std::env::var(var_name)
                    .map_err(|_| CipherError::Env(format!("{} not set", var_name)))?;
                decode_hex_key(val.trim())
            }
        }
    }
}

fn decode_hex_key(hex_key: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_key).map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(CipherError::InvalidKeySize);
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Derives a 32-byte key from a password and salt using Argon2id.
fn derive_key(password: &SecretString, salt: &[u8]) -> Result<[u8; 32]> {
    let argon2 = Argon2::default();
    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| CipherError::KeyDerivationFailed(e.to_string()))?;
    Ok(key)
}

/// Whole-file encryption for page files.
///
/// Container layout: `CSPG` magic, one version byte, 16-byte salt, 12-byte
/// nonce, ciphertext (including the GCM tag).
#[derive(Debug, Clone)]
pub struct PageCipher {
    source: MasterKeySource,
}

impl PageCipher {
    pub fn new(source: MasterKeySource) -> Self {
        Self { source }
    }

    /// Encrypts page text into a self-describing container.
    pub fn encrypt_page(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt);
        let key = self.source.resolve(Some(&salt))?;

        let cipher = Aes256Gcm::new((&key).into());
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut container = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        container.extend_from_slice(ENCRYPTED_PAGE_MAGIC);
        container.push(ENCRYPTED_PAGE_VERSION);
        container.extend_from_slice(&salt);
        container.extend_from_slice(&nonce_bytes);
        container.extend_from_slice(&ciphertext);
        Ok(container)
    }

    /// Decrypts a container produced by `encrypt_page`.
    pub fn decrypt_page(&self, container: &[u8]) -> Result<Vec<u8>> {
        if container.len() < HEADER_LEN {
            return Err(CipherError::BadContainer("file too short"));
        }
        let (magic, rest) = container.split_at(ENCRYPTED_PAGE_MAGIC.len());
        if magic != ENCRYPTED_PAGE_MAGIC {
            return Err(CipherError::BadContainer("bad magic"));
        }
        let (version, rest) = (rest[0], &rest[1..]);
        if version != ENCRYPTED_PAGE_VERSION {
            return Err(CipherError::UnsupportedVersion(version));
        }
        let (salt, rest) = rest.split_at(SALT_LEN);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

        let key = self.source.resolve(Some(salt))?;
        let cipher = Aes256Gcm::new((&key).into());
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))
    }
}
