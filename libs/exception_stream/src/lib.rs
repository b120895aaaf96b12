//! Serialization of exception trees into the byte stream format.
//!
//! An [`ExceptionNode`] carries an ELI code, a message, an optional inner
//! exception, resolutions, typed debug data, a stack trace, and a
//! [`ContextInfo`] snapshot of the process it was raised in. The whole chain
//! is written into a [`ByteBuffer`](byte_stream::ByteBuffer) and carried as
//! hex text.
//!
//! The fields are written in this order:
//!
//! | field | encoding |
//! |---|---|
//! | signature | string, always [`SIGNATURE`] |
//! | version | `u32`, [`CURRENT_VERSION`] when writing |
//! | ELI code, message | string |
//! | has inner | bool |
//! | inner exception | nested buffer, only if "has inner" is set |
//! | resolutions | `u32` count, then strings |
//! | debug data | `u32` count, then string key and tagged value pairs |
//! | stack trace | `u32` count, then strings, most recent frame first |
//! | application state | pid `u32`, machine, application, user, version strings, exception guid, `ctime` |
//! | workflow state | file id `i32`, action id `i32`, database server and name strings |
//! | FPS context | string |
//!
//! The last three sections are optional when reading, so streams written by
//! older versions still decode. Their fields keep default values when absent.
//!
//! Chains longer than [`MAX_DEPTH`] exceptions are neither written nor read.

mod codec;
mod context;
mod encrypted;
pub mod error;
mod legacy;
mod log_line;
mod node;

pub use byte_stream::{EType, TaggedValue};
pub use codec::{CURRENT_VERSION, MAX_DEPTH, SIGNATURE};
pub use context::{ContextInfo, application, set_application};
pub use encrypted::{
    CallerVerifier, ENCRYPTED_PREFIX, TrustAll, TrustNone, decrypt_debug_value,
    encrypt_debug_value, is_encrypted,
};
pub use error::Error;
pub use log_line::LogLine;
pub use node::{DebugEntry, ExceptionNode};


/// Result type with [`Error`] error variant.
pub type Result<T> = std::result::Result<T, Error>;
