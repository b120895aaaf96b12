//! Type-tagged values for schema-less key/value data.
//!
//! A tagged value is written as a `u32` [`EType`] tag followed by the payload
//! of the matching primitive. The numeric tags are part of the wire format:
//! existing tags must never change and new kinds may only be appended.

use std::any::{Any, type_name};
use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::buffer::ByteBuffer;
use crate::error::Error;

/// The wire tag of a [`TaggedValue`].
///
/// `Octets` and `None` are reserved by the format but never written, and
/// reading them fails. `Int` is a legacy alias that decodes as
/// [`TaggedValue::Int32`], just like `Long`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum EType {
    String = 0,
    Octets = 1,
    Int = 2,
    Long = 3,
    UnsignedLong = 4,
    Double = 5,
    Boolean = 6,
    None = 7,
    Int64 = 8,
    Int16 = 9,
    DateTime = 10,
    Guid = 11,
}

/// A value together with its runtime type.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    String(String),
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    Double(f64),
    DateTime(OffsetDateTime),
    Guid(Uuid),
}

impl TaggedValue {
    /// The tag this value is written with.
    #[must_use]
    pub fn etype(&self) -> EType {
        match self {
            Self::String(_) => EType::String,
            Self::Bool(_) => EType::Boolean,
            Self::Int16(_) => EType::Int16,
            Self::Int32(_) => EType::Long,
            Self::Int64(_) => EType::Int64,
            Self::UInt32(_) => EType::UnsignedLong,
            Self::Double(_) => EType::Double,
            Self::DateTime(_) => EType::DateTime,
            Self::Guid(_) => EType::Guid,
        }
    }

    /// Converts a value of an arbitrary type by inspecting it at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] if `T` has no tagged representation.
    pub fn from_any<T: Any>(value: &T) -> Result<Self, Error> {
        let any = value as &dyn Any;

        macro_rules! try_as {
            ($($Ty:ty => |$v:ident| $out:expr),* $(,)?) => { $(
                if let Some($v) = any.downcast_ref::<$Ty>() {
                    return Ok($out);
                }
            )* };
        }

        try_as!(
            String => |v| Self::String(v.clone()),
            &'static str => |v| Self::String((*v).to_owned()),
            bool => |v| Self::Bool(*v),
            i16 => |v| Self::Int16(*v),
            i32 => |v| Self::Int32(*v),
            i64 => |v| Self::Int64(*v),
            u32 => |v| Self::UInt32(*v),
            f64 => |v| Self::Double(*v),
            OffsetDateTime => |v| Self::DateTime(*v),
            Uuid => |v| Self::Guid(*v),
        );

        Err(Error::UnsupportedType(type_name::<T>()))
    }

    /// The string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widens any integer payload to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::Int64(v) => Some(v),
            Self::UInt32(v) => Some(v.into()),
            _ => None,
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::Int16(v) => fmt::Display::fmt(v, f),
            Self::Int32(v) => fmt::Display::fmt(v, f),
            Self::Int64(v) => fmt::Display::fmt(v, f),
            Self::UInt32(v) => fmt::Display::fmt(v, f),
            Self::Double(v) => fmt::Display::fmt(v, f),
            Self::DateTime(v) => {
                let text = v.format(&Rfc3339).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            },
            Self::Guid(v) => fmt::Display::fmt(v, f),
        }
    }
}

macro_rules! impl_from {
    ($($Ty:ty => $Var:ident),* $(,)?) => { $(
        impl From<$Ty> for TaggedValue {
            fn from(value: $Ty) -> Self {
                Self::$Var(value)
            }
        }
    )* };
}

impl From<&str> for TaggedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl_from!(
    String => String,
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    f64 => Double,
    OffsetDateTime => DateTime,
    Uuid => Guid,
);

impl ByteBuffer {
    /// Writes a value prefixed with its [`EType`] tag.
    ///
    /// # Errors
    ///
    /// Returns `Err` if writing the payload fails, i.e. for strings that are
    /// too long or date times before year 1.
    pub fn write_tagged(&mut self, value: &TaggedValue) -> Result<(), Error> {
        self.write_u32(value.etype().into());
        match value {
            TaggedValue::String(v) => self.write_string(v)?,
            TaggedValue::Bool(v) => self.write_bool(*v),
            TaggedValue::Int16(v) => self.write_i16(*v),
            TaggedValue::Int32(v) => self.write_i32(*v),
            TaggedValue::Int64(v) => self.write_i64(*v),
            TaggedValue::UInt32(v) => self.write_u32(*v),
            TaggedValue::Double(v) => self.write_f64(*v),
            TaggedValue::DateTime(v) => self.write_datetime(*v)?,
            TaggedValue::Guid(v) => self.write_guid(*v),
        }

        Ok(())
    }

    /// Reads a value written by [`write_tagged`](Self::write_tagged).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the tag is unknown or reserved, or
    /// another error if the payload is invalid.
    pub fn read_tagged(&mut self) -> Result<TaggedValue, Error> {
        self.rewind_on_err(Self::read_tagged_payload)
    }

    fn read_tagged_payload(&mut self) -> Result<TaggedValue, Error> {
        let tag = self.read_u32()?;
        let etype = EType::try_from(tag).map_err(|_| Error::UnknownType(tag))?;

        Ok(match etype {
            EType::String => TaggedValue::String(self.read_string()?),
            EType::Int | EType::Long => TaggedValue::Int32(self.read_i32()?),
            EType::UnsignedLong => TaggedValue::UInt32(self.read_u32()?),
            EType::Double => TaggedValue::Double(self.read_f64()?),
            EType::Boolean => TaggedValue::Bool(self.read_bool()?),
            EType::Int64 => TaggedValue::Int64(self.read_i64()?),
            EType::Int16 => TaggedValue::Int16(self.read_i16()?),
            EType::DateTime => TaggedValue::DateTime(self.read_datetime()?),
            EType::Guid => TaggedValue::Guid(self.read_guid()?),
            EType::Octets | EType::None => return Err(Error::UnknownType(tag)),
        })
    }
}
