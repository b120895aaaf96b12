//! Error handling type.

/// Argument errors for cipher operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The key is empty or its length is not a multiple of 8.
    #[error("key length {0} must be a nonzero multiple of 8")]
    KeyLength(usize),
    /// The key length does not match the level the key was created with.
    #[error("key length must be {expected} for this key, but is {actual}")]
    KeySize {
        /// The length the key schedule needs.
        expected: usize,
        /// The length that was provided.
        actual: usize,
    },
    /// The data length is not a multiple of the block size.
    #[error("data length {0} must be a multiple of 8")]
    BlockLength(usize),
    /// The output buffer length differs from the input length.
    #[error("output length must be {expected}, but is {actual}")]
    OutputLength {
        /// The input length.
        expected: usize,
        /// The output buffer length.
        actual: usize,
    },
    /// Encrypted text is too short to hold the scramble key.
    #[error("encrypted data of length {0} is too short")]
    Truncated(usize),
    /// Encrypted text is not valid hex.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}
