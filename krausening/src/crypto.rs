//! Decryption of `ENC(...)` property values.
//!
//! Encrypted values use the standard password-based string encryption: the
//! text inside `ENC(...)` is base64 of an 8-byte salt followed by DES-CBC
//! ciphertext. Key and IV come from MD5 applied to the password and salt,
//! then to its own output, 1000 times in total.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};
use std::fmt;
use std::sync::Arc;

type DesCbcDecryptor = cbc::Decryptor<des::Des>;

const SALT_LEN: usize = 8;
const BLOCK_LEN: usize = 8;
const KEY_ROUNDS: usize = 1000;
const PREFIX: &str = "ENC(";
const SUFFIX: &str = ")";

/// Decrypts `ENC(...)` values with a master password.
///
/// The password is never printed by the `Debug` implementation.
///
/// # Examples
///
/// ```
/// use krausening::ValueDecryptor;
///
/// let decryptor = ValueDecryptor::new("krausening-secret");
/// let plain = decryptor
///     .decrypt("AQIDBAUGBwj3Qb33R3zI99gZHLwn50cq")
///     .expect("valid ciphertext");
/// assert_eq!(plain, "s3cr3t-value");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ValueDecryptor {
    password: Arc<str>,
}

impl fmt::Debug for ValueDecryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueDecryptor")
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ValueDecryptor {
    /// Create a decryptor for `password`.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Arc::from(password.into()),
        }
    }

    /// Returns the text inside `ENC(...)` when `value` is an encrypted value.
    ///
    /// Surrounding whitespace is ignored on both the value and the payload.
    #[must_use]
    pub fn encrypted_payload(value: &str) -> Option<&str> {
        value
            .trim()
            .strip_prefix(PREFIX)?
            .strip_suffix(SUFFIX)
            .map(str::trim)
    }

    /// Decrypt a base64 payload (the text inside `ENC(...)`).
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the payload is not valid
    /// base64, is too short, does not decrypt under this password, or does
    /// not decrypt to UTF-8.
    pub fn decrypt(&self, payload: &str) -> Result<String, String> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|err| format!("invalid base64: {err}"))?;
        let Some((salt, ciphertext)) = bytes.split_at_checked(SALT_LEN) else {
            return Err("payload shorter than its salt".to_owned());
        };
        if ciphertext.is_empty() || !ciphertext.len().is_multiple_of(BLOCK_LEN) {
            return Err(format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
                ciphertext.len()
            ));
        }
        let (key, iv) = derive_key_iv(self.password.as_bytes(), salt);
        let mut buffer = ciphertext.to_vec();
        let plain = DesCbcDecryptor::new_from_slices(&key, &iv)
            .map_err(|err| err.to_string())?
            .decrypt_padded_mut::<Pkcs7>(&mut buffer)
            .map_err(|_| "wrong password or corrupt ciphertext".to_owned())?;
        String::from_utf8(plain.to_vec()).map_err(|_| "decrypted value is not UTF-8".to_owned())
    }
}

fn derive_key_iv(password: &[u8], salt: &[u8]) -> ([u8; 8], [u8; 8]) {
    let mut digest = Md5::new().chain_update(password).chain_update(salt).finalize();
    for _ in 1..KEY_ROUNDS {
        digest = Md5::digest(digest);
    }
    let mut key = [0_u8; 8];
    let mut iv = [0_u8; 8];
    let (left, right) = digest.split_at(8);
    key.copy_from_slice(left);
    iv.copy_from_slice(right);
    (key, iv)
}
