//! Symmetric encryption for stored connection strings
//!
//! Connection strings are encrypted with AES-256-CBC under a fixed 32-byte
//! key supplied at startup. Each call draws a fresh random IV; the stored
//! form is `hex(iv):hex(ciphertext)`.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::rand::{SecureRandom, SystemRandom};

use crate::{MongodeskError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Required key length in bytes
pub const KEY_LEN: usize = 32;

/// IV length in bytes (one AES block)
pub const IV_LEN: usize = 16;

/// Reversible, keyed encryption of one string at a time
pub struct SecretCodec {
    key: [u8; KEY_LEN],
    rng: SystemRandom,
}

impl SecretCodec {
    /// Create a codec from raw key bytes.
    ///
    /// Fails unless the key is exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            MongodeskError::Configuration(format!(
                "Encryption key must be exactly {} bytes, got {}",
                KEY_LEN,
                key.len()
            ))
        })?;

        Ok(Self {
            key,
            rng: SystemRandom::new(),
        })
    }

    /// Create a codec from a configured key value: either 64 hex characters
    /// or exactly 32 raw bytes.
    pub fn from_key_material(material: &str) -> Result<Self> {
        let material = material.trim();
        if material.is_empty() {
            return Err(MongodeskError::Configuration(
                "Encryption key is required".to_string(),
            ));
        }

        if material.len() == KEY_LEN * 2
            && material.bytes().all(|b| b.is_ascii_hexdigit())
        {
            let bytes = hex::decode(material).map_err(|e| {
                MongodeskError::Configuration(format!("Invalid hex encryption key: {}", e))
            })?;
            return Self::new(&bytes);
        }

        Self::new(material.as_bytes())
    }

    /// Generate a fresh random key, hex encoded
    pub fn generate_key_hex() -> Result<String> {
        let mut key = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut key)
            .map_err(|_| MongodeskError::Configuration("Failed to generate random key".into()))?;
        Ok(hex::encode(key))
    }

    /// Encrypt `plaintext` into `hex(iv):hex(ciphertext)`
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; IV_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| MongodeskError::Configuration("Failed to generate IV".into()))?;

        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &iv)
            .map_err(|e| MongodeskError::Configuration(format!("Invalid cipher setup: {}", e)))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        Ok(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    /// Decrypt a value produced by [`SecretCodec::encrypt`]
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let (iv_hex, ciphertext_hex) = encrypted
            .split_once(':')
            .filter(|(_, rest)| !rest.contains(':'))
            .ok_or_else(|| {
                MongodeskError::Decryption("Invalid encrypted value format".to_string())
            })?;

        let iv = hex::decode(iv_hex)
            .map_err(|_| MongodeskError::Decryption("Invalid IV encoding".to_string()))?;
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|_| MongodeskError::Decryption("Invalid ciphertext encoding".to_string()))?;

        if iv.len() != IV_LEN {
            return Err(MongodeskError::Decryption(format!(
                "IV must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }

        let cipher = Aes256CbcDec::new_from_slices(&self.key, &iv)
            .map_err(|e| MongodeskError::Decryption(format!("Invalid cipher setup: {}", e)))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| {
                MongodeskError::Decryption(
                    "Failed to decrypt value (wrong key or corrupted data)".to_string(),
                )
            })?;

        String::from_utf8(plaintext).map_err(|_| {
            MongodeskError::Decryption("Decrypted value is not valid UTF-8".to_string())
        })
    }

    /// Structural check for `hex(iv):hex(ciphertext)` without decrypting
    pub fn is_encrypted_format(value: &str) -> bool {
        let Some((iv_hex, ciphertext_hex)) = value.split_once(':') else {
            return false;
        };

        iv_hex.len() == IV_LEN * 2
            && !ciphertext_hex.is_empty()
            && ciphertext_hex.len() % 2 == 0
            && iv_hex.bytes().all(|b| b.is_ascii_hexdigit())
            && ciphertext_hex.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec").finish_non_exhaustive()
    }
}
