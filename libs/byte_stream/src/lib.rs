//! # Byte Stream
//!
//! Cursor-based binary buffer used to marshal exception trees between
//! processes. The format is not self-describing, except for
//! [tagged values](tagged), and both sides must agree on the sequence of
//! fields.
//!
//! The primitives are as follows:
//!
//! - fixed-width integers: little-endian, 2, 4, or 8 bytes
//! - `double`: 8-byte IEEE-754, little-endian
//! - `bool`: single byte, written as 0 or 1, any nonzero byte reads as `true`
//! - `string`: `u32` byte count followed by ASCII bytes
//! - `datetime`: 8-byte tick count with kind bits (see [`datetime`])
//! - `ctime`: `i64` seconds since the unix epoch, 0 meaning "unset"
//! - `guid`: 16 bytes in the mixed-endian GUID layout
//! - `nested`: `u32` byte count followed by the raw bytes of another buffer
//!
//! Buffers are carried as uppercase hex text when embedded in log lines, see
//! [`ByteBuffer::to_hex`].

mod buffer;
pub mod datetime;
pub mod error;
pub mod tagged;
#[cfg(test)]
mod tests;

pub use buffer::ByteBuffer;
pub use error::Error;
pub use tagged::{EType, TaggedValue};

/// Result type with [`Error`] error variant.
pub type Result<T> = std::result::Result<T, Error>;
