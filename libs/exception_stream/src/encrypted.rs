//! Encrypted debug values and the trust check guarding their decryption.

use byte_stream::ByteBuffer;

use crate::Result;
use crate::error::Error;

/// Marks a debug value string as encrypted. The hex cipher text follows it.
pub const ENCRYPTED_PREFIX: &str = "Extract_Encrypted: ";

const KEY_SEED: [u32; 4] = [0x6D2B_79F5, 0x1B87_3593, 0xCC9E_2D51, 0xE654_6B64];

/// The ICE key for debug values, a level 2 key.
fn debug_value_key() -> [u8; 16] {
    let mut key = [0u8; 16];
    let mut rotate = 0u32;
    for (chunk, seed) in key.chunks_exact_mut(4).zip(KEY_SEED) {
        let word = seed.rotate_left(rotate) ^ 0x9E37_79B9;
        chunk.copy_from_slice(&word.to_le_bytes());
        rotate += 7;
    }

    key
}

/// Decides whether the current caller may see decrypted debug values.
pub trait CallerVerifier {
    /// Returns whether the caller is trusted.
    fn is_trusted(&self) -> bool;
}

/// Trusts every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAll;

/// Trusts no caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustNone;

impl CallerVerifier for TrustAll {
    fn is_trusted(&self) -> bool {
        true
    }
}

impl CallerVerifier for TrustNone {
    fn is_trusted(&self) -> bool {
        false
    }
}

impl<F: Fn() -> bool> CallerVerifier for F {
    fn is_trusted(&self) -> bool {
        self()
    }
}

/// Returns whether `value` carries the encrypted-value marker.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Encrypts a debug value into its marked text form.
///
/// # Errors
///
/// Returns `Err` if the value is too long to be written.
pub fn encrypt_debug_value(value: &str) -> Result<String> {
    let mut buf = ByteBuffer::new();
    buf.write_string(value)?;

    let text = ice_cipher::encrypt_s(&buf.get_bytes(ice_cipher::BLOCK_SIZE), &debug_value_key())?;
    Ok(format!("{ENCRYPTED_PREFIX}{text}"))
}

/// Decrypts a value produced by [`encrypt_debug_value`].
///
/// The verifier is asked before anything else is done with the value.
///
/// # Errors
///
/// Returns [`Error::InvalidCaller`] if the caller is not trusted,
/// [`Error::NotEncrypted`] if the marker is missing, or another error if the
/// cipher text is malformed.
pub fn decrypt_debug_value(value: &str, verifier: &dyn CallerVerifier) -> Result<String> {
    if !verifier.is_trusted() {
        log::warn!("refused to decrypt a debug value for an untrusted caller");
        return Err(Error::InvalidCaller);
    }

    let text = value.strip_prefix(ENCRYPTED_PREFIX).ok_or(Error::NotEncrypted)?;
    let plain = ice_cipher::decrypt_s(text, &debug_value_key())?;

    let mut buf = ByteBuffer::from_bytes(plain);
    Ok(buf.read_string()?)
}
