//! Implementation of the ICE ("Information Concealment Engine") block cipher
//! by Matthew Kwan, plus the byte scrambling and hex wrapping used to protect
//! individual debug values.
//!
//! ICE is a 64-bit Feistel cipher with key-dependent bit permutation. An
//! [`IceKey`] of level `n` takes `8 * n` key bytes and runs `16 * n` rounds.
//! Level 0 is "Thin-ICE" with an 8 byte key and 8 rounds.
//!
//! Multi-block data is encrypted block by block without chaining (ECB). This
//! keeps values compatible with everything encrypted so far, but identical
//! plaintext blocks produce identical ciphertext blocks.
//!
//! # Examples
//!
//! ```
//! let key = *b"\x01\x23\x45\x67\x89\xAB\xCD\xEF";
//! let text = ice_cipher::encrypt_s(b"connection string", &key).unwrap();
//! let back = ice_cipher::decrypt_s(&text, &key).unwrap();
//! assert_eq!(back, b"connection string");
//! ```

// for benchmarks
#[cfg(test)]
use criterion as _;

mod block;
pub mod error;
mod key;
mod sbox;
mod scramble;

pub use block::{decrypt, decrypt_s, encrypt, encrypt_s, encrypt_s_with};
pub use error::Error;
pub use key::IceKey;
pub use scramble::scramble_data;

/// Result type with [`Error`] error variant.
pub type Result<T> = std::result::Result<T, Error>;

/// The size of a single cipher block in bytes.
pub const BLOCK_SIZE: usize = 8;
