//! Password handling for the upstream connection.
//!
//! Stored passwords are `base64(nonce || AES-256-GCM ciphertext || tag)`.
//! Anything that does not decrypt under the built-in key is taken to be a
//! plaintext password typed by an operator.

use crate::db::{DbConfig, RawDbConfig};
use crate::duration::Duration;
use crate::model::SourceConfig;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Read timeout applied to connections opened for discovery and replication.
pub const DB_READ_TIMEOUT: Duration = Duration::from_secs(30);

const BUILTIN_KEY: [u8; 32] = [
    0x5c, 0x1e, 0x93, 0x07, 0xa2, 0x4b, 0xd8, 0x6f, 0x31, 0xc9, 0x0e, 0x77, 0xb4, 0x52, 0xea,
    0x18, 0x9d, 0x63, 0x2a, 0xf1, 0x46, 0x0b, 0xce, 0x85, 0x3f, 0xd0, 0x71, 0x9a, 0x26, 0xe4,
    0x58, 0xbb,
];

const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Invalid cipher key")]
    InvalidKey,
    #[error("Failed to generate nonce")]
    Nonce,
    #[error("Failed to seal password")]
    Seal,
}

/// AES-256-GCM cipher for config passwords.
pub struct PasswordCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl PasswordCipher {
    pub fn new(key: &[u8; 32]) -> Result<Self, CipherError> {
        let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CipherError::InvalidKey)?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Cipher with the key compiled into the worker.
    pub fn builtin() -> Result<Self, CipherError> {
        Self::new(&BUILTIN_KEY)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::Nonce)?;

        let mut buffer = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut buffer,
            )
            .map_err(|_| CipherError::Seal)?;

        let mut output = Vec::with_capacity(NONCE_LEN + buffer.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&buffer);
        Ok(STANDARD.encode(output))
    }

    /// Decrypt a stored password. `None` if `stored` is not an encrypted
    /// payload for this key.
    pub fn decrypt(&self, stored: &str) -> Option<String> {
        let raw = STANDARD.decode(stored).ok()?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return None;
        }
        let (nonce_bytes, sealed) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).ok()?;

        let mut buffer = sealed.to_vec();
        let plaintext = self.key.open_in_place(nonce, Aad::empty(), &mut buffer).ok()?;
        String::from_utf8(plaintext.to_vec()).ok()
    }
}

/// Encrypt `plaintext` for storage in a config file.
pub fn encrypt(plaintext: &str) -> Result<String, CipherError> {
    PasswordCipher::builtin()?.encrypt(plaintext)
}

/// Decrypt `stored`, or return it unchanged if it is not an encrypted payload.
///
/// Hand-written configs may carry a plaintext password.
pub fn decrypt_or_plaintext(stored: &str) -> String {
    PasswordCipher::builtin()
        .ok()
        .and_then(|cipher| cipher.decrypt(stored))
        .unwrap_or_else(|| stored.to_string())
}

impl SourceConfig {
    /// A copy of this config with the connection password decrypted.
    ///
    /// `self` is left untouched; the clone is meant for opening connections
    /// and should not be persisted.
    pub fn decrypted_clone(&self) -> SourceConfig {
        let mut clone = self.clone();
        if !clone.from.password.is_empty() {
            clone.from.password = decrypt_or_plaintext(&clone.from.password);
        }
        clone
    }

    /// Connection descriptor for the upstream: decrypted password plus the
    /// operational read timeout.
    pub fn generate_db_config(&self) -> DbConfig {
        let mut from = self.decrypted_clone().from;
        from.raw = RawDbConfig::default().with_read_timeout(DB_READ_TIMEOUT);
        from
    }
}
