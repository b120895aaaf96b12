//! Error handling type.

/// Potential errors to encounter when reading from or writing to a
/// [`ByteBuffer`](crate::ByteBuffer).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A read requested more bytes than remain in the buffer.
    #[error("cannot read {requested} bytes at position {position}, buffer length is {length}")]
    OutOfBounds {
        /// The read position at the time of the read.
        position: usize,
        /// The amount of bytes the read required.
        requested: usize,
        /// The total length of the buffer.
        length: usize,
    },

    /// The read position was set outside of the buffer.
    #[error("read position {position} is out of range for buffer length {length}")]
    ReadPosition {
        /// The requested position.
        position: usize,
        /// The total length of the buffer.
        length: usize,
    },

    /// Length-prefixed data was too long to fit its `u32` length prefix.
    #[error("length {0} does not fit into a length prefix")]
    LengthOverflow(usize),

    /// A string contained a byte that is not ASCII.
    #[error("string data contains non-ascii byte at position {position}")]
    InvalidAscii {
        /// The buffer position of the offending byte.
        position: usize,
    },

    /// A date time value is outside of the representable range.
    #[error("date time value {0} is out of range")]
    DateTimeRange(i64),

    /// The type tag of a tagged value is not known or cannot be decoded.
    #[error("cannot decode type with tag {0}")]
    UnknownType(u32),

    /// A value of this runtime type cannot be stored as a tagged value.
    #[error("unsupported type `{0}` for tagged value")]
    UnsupportedType(&'static str),

    /// Hex text for a buffer was invalid.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}
