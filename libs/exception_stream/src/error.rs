//! Error handling type.

/// Error when encoding or decoding an exception tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Reading or writing the byte stream failed.
    #[error(transparent)]
    Stream(#[from] byte_stream::Error),

    /// Encrypting or decrypting a debug value failed.
    #[error(transparent)]
    Cipher(#[from] ice_cipher::Error),

    /// The stream does not start with the exception signature.
    #[error("invalid exception signature {0:?}")]
    BadSignature(String),

    /// The stream was written by a newer version of the format.
    #[error("unknown exception version {found}, the latest supported version is {supported}")]
    UnknownVersion {
        /// The version found in the stream.
        found: u32,
        /// The newest version this library can read.
        supported: u32,
    },

    /// The exception chain holds more than [`MAX_DEPTH`](crate::MAX_DEPTH)
    /// exceptions.
    #[error("exception chain is nested deeper than {0} levels")]
    NestingTooDeep(usize),

    /// The caller is not trusted to decrypt debug values.
    #[error("invalid caller, not allowed to decrypt values")]
    InvalidCaller,

    /// A value passed for decryption lacks the encrypted-value marker.
    #[error("value is not encrypted")]
    NotEncrypted,

    /// A log line could not be parsed.
    #[error("malformed log line: {0}")]
    LogLine(&'static str),
}
