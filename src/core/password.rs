//! Profile password gate.
//!
//! A protected profile stores a fixed validation phrase encrypted with a key derived from
//! the password (Argon2id, then AES-256-GCM). Unlocking means deriving the key again and
//! checking that the phrase decrypts to the expected text. Table data is not encrypted.

use crate::errors::{Error, Result};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use argon2::{Argon2, Params, Version};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Plaintext that a correct password decrypts the stored phrase to
pub const VALIDATION_PHRASE: &str = "stockbook:profile-unlocked";

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Argon2id cost parameters, stored next to each ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub time_cost: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.time_cost,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| Error::Crypto {
            message: format!("Invalid key derivation parameters: {e}"),
        })?;
        Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// The validation phrase as persisted in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPhrase {
    /// Base64 Argon2 salt
    pub salt: String,
    /// Base64 AES-GCM nonce
    pub nonce: String,
    /// Base64 ciphertext including the authentication tag
    pub ciphertext: String,
    /// Cost parameters used to derive the key
    #[serde(flatten)]
    pub kdf: KdfParams,
}

/// Key derived from a password; zeroed when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([redacted])")
    }
}

impl DerivedKey {
    /// Derives a key from `password` and `salt` with Argon2id.
    pub fn derive(password: &str, salt: &[u8], params: &KdfParams) -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        params
            .argon2()?
            .hash_password_into(password.as_bytes(), salt, &mut key)
            .map_err(|e| Error::Crypto {
                message: format!("Key derivation failed: {e}"),
            })?;
        Ok(Self { key })
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| Error::Crypto {
            message: e.to_string(),
        })
    }
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|e| Error::Crypto {
            message: format!("Stored {field} is not valid base64: {e}"),
        })
}

/// Encrypts [`VALIDATION_PHRASE`] under a key derived from `password` with a fresh salt
/// and nonce.
pub fn encrypt_phrase(password: &str, params: &KdfParams) -> Result<(EncryptedPhrase, DerivedKey)> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = DerivedKey::derive(password, &salt, params)?;
    let ciphertext = key
        .cipher()?
        .encrypt(Nonce::from_slice(&nonce), VALIDATION_PHRASE.as_bytes())
        .map_err(|e| Error::Crypto {
            message: format!("Encryption failed: {e}"),
        })?;

    let phrase = EncryptedPhrase {
        salt: general_purpose::STANDARD.encode(salt),
        nonce: general_purpose::STANDARD.encode(nonce),
        ciphertext: general_purpose::STANDARD.encode(ciphertext),
        kdf: *params,
    };
    Ok((phrase, key))
}

/// Checks `password` against a stored phrase, returning the derived key on success.
///
/// # Errors
/// Returns [`Error::AuthFailure`] when decryption fails or the plaintext differs.
pub fn verify_phrase(password: &str, stored: &EncryptedPhrase) -> Result<DerivedKey> {
    let salt = decode("salt", &stored.salt)?;
    let nonce = decode("nonce", &stored.nonce)?;
    let ciphertext = decode("ciphertext", &stored.ciphertext)?;
    if nonce.len() != NONCE_LEN {
        return Err(Error::Crypto {
            message: format!("Stored nonce has {} bytes, expected {NONCE_LEN}", nonce.len()),
        });
    }

    let key = DerivedKey::derive(password, &salt, &stored.kdf)?;
    let mut plaintext = key
        .cipher()?
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|_| Error::AuthFailure)?;

    let matches = plaintext == VALIDATION_PHRASE.as_bytes();
    plaintext.zeroize();
    if matches { Ok(key) } else { Err(Error::AuthFailure) }
}

/// Whether the active profile's data may be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// A password is required before data access
    Locked,
    /// Data access is allowed
    Unlocked,
}

/// Lock state of one profile plus the key held while unlocked.
#[derive(Debug)]
pub struct PasswordGate {
    params: KdfParams,
    phrase: Option<EncryptedPhrase>,
    key: Option<DerivedKey>,
    state: LockState,
}

impl PasswordGate {
    /// A gate with no stored phrase, which is unlocked.
    #[must_use]
    pub const fn new(params: KdfParams) -> Self {
        Self {
            params,
            phrase: None,
            key: None,
            state: LockState::Unlocked,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> LockState {
        self.state
    }

    /// Shorthand for `state() == LockState::Unlocked`
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.state == LockState::Unlocked
    }

    /// Whether a password is set
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.phrase.is_some()
    }

    /// Key derived at the last successful unlock, if still held
    #[must_use]
    pub const fn key(&self) -> Option<&DerivedKey> {
        self.key.as_ref()
    }

    /// Stored phrase, for persisting to the profile configuration
    #[must_use]
    pub const fn phrase(&self) -> Option<&EncryptedPhrase> {
        self.phrase.as_ref()
    }

    /// Resets the gate for a newly opened profile: locked if it has a phrase,
    /// unlocked otherwise. Any held key is dropped.
    pub fn reset_for(&mut self, phrase: Option<EncryptedPhrase>) {
        self.key = None;
        self.state = if phrase.is_some() {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        self.phrase = phrase;
    }

    /// Unlocks the gate if `password` decrypts the stored phrase.
    ///
    /// A gate without a phrase unlocks for any password. A failed attempt leaves the
    /// state unchanged.
    pub fn validate(&mut self, password: &str) -> Result<()> {
        let Some(phrase) = &self.phrase else {
            self.state = LockState::Unlocked;
            return Ok(());
        };

        match verify_phrase(password, phrase) {
            Ok(key) => {
                self.key = Some(key);
                self.state = LockState::Unlocked;
                debug!("Password accepted");
                Ok(())
            }
            Err(e) => {
                warn!("Password rejected");
                Err(e)
            }
        }
    }

    /// Locks the gate and zeroes the held key.
    pub fn logout(&mut self) {
        self.key = None;
        self.state = LockState::Locked;
    }

    /// Sets a new password. The gate must be unlocked.
    ///
    /// # Errors
    /// Returns [`Error::SessionLocked`] while locked and [`Error::Validation`] for an
    /// empty password.
    pub fn set_password(&mut self, new_password: &str) -> Result<&EncryptedPhrase> {
        if !self.is_unlocked() {
            return Err(Error::SessionLocked);
        }
        if new_password.is_empty() {
            return Err(Error::Validation {
                message: "Password cannot be empty".to_string(),
            });
        }

        let (phrase, key) = encrypt_phrase(new_password, &self.params)?;
        self.key = Some(key);
        info!("Profile password set");
        Ok(self.phrase.insert(phrase))
    }

    /// Replaces the password after checking the current one.
    ///
    /// # Errors
    /// Returns [`Error::AuthFailure`] if `old_password` is wrong.
    pub fn change_password(
        &mut self,
        old_password: &str,
        new_password: &str,
    ) -> Result<&EncryptedPhrase> {
        self.check_current(old_password)?;
        self.set_password(new_password)
    }

    /// Drops the stored phrase after checking the current password. The profile is
    /// left unlocked and ungated.
    ///
    /// # Errors
    /// Returns [`Error::AuthFailure`] if `password` is wrong.
    pub fn remove_password(&mut self, password: &str) -> Result<()> {
        self.check_current(password)?;
        self.phrase = None;
        self.key = None;
        self.state = LockState::Unlocked;
        info!("Profile password removed");
        Ok(())
    }

    fn check_current(&self, password: &str) -> Result<()> {
        if !self.is_unlocked() {
            return Err(Error::SessionLocked);
        }
        match &self.phrase {
            Some(phrase) => verify_phrase(password, phrase).map(|_| ()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const FAST: KdfParams = KdfParams {
        memory_kib: 256,
        time_cost: 1,
        parallelism: 1,
    };

    fn locked_gate(password: &str) -> PasswordGate {
        let (phrase, _) = encrypt_phrase(password, &FAST).unwrap();
        let mut gate = PasswordGate::new(FAST);
        gate.reset_for(Some(phrase));
        gate
    }

    #[test]
    fn test_verify_phrase_accepts_correct_password() {
        let (phrase, _) = encrypt_phrase("hunter2", &FAST).unwrap();
        assert!(verify_phrase("hunter2", &phrase).is_ok());
        assert!(matches!(
            verify_phrase("hunter3", &phrase),
            Err(Error::AuthFailure)
        ));
    }

    #[test]
    fn test_encrypt_uses_fresh_salt_and_nonce() {
        let (a, _) = encrypt_phrase("same", &FAST).unwrap();
        let (b, _) = encrypt_phrase("same", &FAST).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_is_auth_failure() {
        let (mut phrase, _) = encrypt_phrase("hunter2", &FAST).unwrap();
        let mut bytes = general_purpose::STANDARD.decode(&phrase.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        phrase.ciphertext = general_purpose::STANDARD.encode(bytes);

        assert!(matches!(
            verify_phrase("hunter2", &phrase),
            Err(Error::AuthFailure)
        ));
    }

    #[test]
    fn test_phrase_serializes_with_flattened_kdf() {
        let (phrase, _) = encrypt_phrase("hunter2", &FAST).unwrap();
        let json = serde_json::to_value(&phrase).unwrap();
        assert_eq!(json["memory_kib"], 256);
        assert!(json["salt"].is_string());

        let back: EncryptedPhrase = serde_json::from_value(json).unwrap();
        assert_eq!(back, phrase);
    }

    #[test]
    fn test_gate_lifecycle() {
        let mut gate = locked_gate("secret");
        assert_eq!(gate.state(), LockState::Locked);

        assert!(matches!(gate.validate("wrong"), Err(Error::AuthFailure)));
        assert_eq!(gate.state(), LockState::Locked);

        gate.validate("secret").unwrap();
        assert!(gate.is_unlocked());
        assert!(gate.key().is_some());

        gate.logout();
        assert_eq!(gate.state(), LockState::Locked);
        assert!(gate.key().is_none());
    }

    #[test]
    fn test_gate_without_phrase_is_unlocked() {
        let mut gate = PasswordGate::new(FAST);
        assert!(gate.is_unlocked());
        assert!(!gate.has_password());

        gate.logout();
        assert!(!gate.is_unlocked());
        gate.validate("anything").unwrap();
        assert!(gate.is_unlocked());
    }

    #[test]
    fn test_set_password_requires_unlocked() {
        let mut gate = locked_gate("secret");
        assert!(matches!(
            gate.set_password("new"),
            Err(Error::SessionLocked)
        ));

        gate.validate("secret").unwrap();
        let phrase = gate.set_password("new").unwrap().clone();
        assert!(verify_phrase("new", &phrase).is_ok());

        assert!(matches!(
            gate.set_password(""),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_change_password_checks_old() {
        let mut gate = locked_gate("secret");
        gate.validate("secret").unwrap();

        assert!(matches!(
            gate.change_password("nope", "next"),
            Err(Error::AuthFailure)
        ));
        assert!(gate.is_unlocked());

        gate.change_password("secret", "next").unwrap();
        gate.logout();
        assert!(gate.validate("secret").is_err());
        gate.validate("next").unwrap();
    }

    #[test]
    fn test_remove_password() {
        let mut gate = locked_gate("secret");
        gate.validate("secret").unwrap();

        gate.remove_password("secret").unwrap();
        assert!(!gate.has_password());
        assert!(gate.phrase().is_none());
        assert!(gate.is_unlocked());
    }

    #[test]
    fn test_reset_for_switches_state() {
        let mut gate = locked_gate("secret");
        gate.reset_for(None);
        assert!(gate.is_unlocked());

        let (phrase, _) = encrypt_phrase("other", &FAST).unwrap();
        gate.reset_for(Some(phrase));
        assert!(!gate.is_unlocked());
    }

    #[test]
    fn test_derived_key_debug_is_redacted() {
        let key = DerivedKey::derive("secret", &[0u8; SALT_LEN], &FAST).unwrap();
        assert_eq!(format!("{key:?}"), "DerivedKey([redacted])");
    }
}
