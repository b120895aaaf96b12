use time::OffsetDateTime;
use uuid::Uuid;

use crate::datetime;
use crate::error::Error;

/// Growable byte buffer with a forward-only read cursor.
///
/// Writes always append to the end. Reads consume bytes starting at the
/// [read position](Self::read_position). A read that fails leaves the read
/// position where it was, including reads of length-prefixed data that fail
/// after the prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
    read_position: usize,
    /// End of the readable bytes while inside [`read_nested_with`](Self::read_nested_with).
    read_limit: Option<usize>,
}

impl ByteBuffer {
    /// Creates a new empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding existing bytes, positioned at the start.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            read_position: 0,
            read_limit: None,
        }
    }

    /// Decodes hex text into a buffer, positioned at the start.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the text is not valid hex.
    pub fn from_hex(text: &str) -> Result<Self, Error> {
        Ok(Self::from_bytes(hex::decode(text)?))
    }

    /// Encodes the whole buffer as uppercase hex text.
    ///
    /// The read position is irrelevant for this.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.bytes)
    }

    /// The total count of bytes written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no bytes were written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The position the next read will start at.
    #[must_use]
    pub fn read_position(&self) -> usize {
        self.read_position
    }

    /// Moves the read cursor.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `position` is not an index into the readable bytes.
    pub fn set_read_position(&mut self, position: usize) -> Result<(), Error> {
        if position >= self.read_end() {
            return Err(Error::ReadPosition {
                position,
                length: self.read_end(),
            });
        }

        self.read_position = position;
        Ok(())
    }

    /// Whether every byte has been read.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.read_position == self.read_end()
    }

    /// The count of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.read_end() - self.read_position
    }

    /// The position reads may not go past.
    fn read_end(&self) -> usize {
        self.read_limit.unwrap_or(self.bytes.len())
    }

    /// Borrows all written bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Unwraps the buffer into its written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Copies all written bytes, padding the end with zeros until the length
    /// is a multiple of `pad_to_multiple`.
    ///
    /// A multiple of 0 or 1 applies no padding.
    #[must_use]
    pub fn get_bytes(&self, pad_to_multiple: usize) -> Vec<u8> {
        let mut out = self.bytes.clone();
        if pad_to_multiple > 1 {
            let len = out.len().next_multiple_of(pad_to_multiple);
            out.resize(len, 0);
        }

        out
    }

    // writing

    /// Appends bytes verbatim.
    pub fn write_bytes(&mut self, raw: &[u8]) {
        self.bytes.extend_from_slice(raw);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value.into());
    }

    /// Writes a `u32` length prefix for data of length `len`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `len` exceeds [`u32::MAX`].
    fn write_len(&mut self, len: usize) -> Result<(), Error> {
        let len = u32::try_from(len).map_err(|_| Error::LengthOverflow(len))?;
        self.write_u32(len);
        Ok(())
    }

    /// Writes a length-prefixed ASCII string.
    ///
    /// Every char outside of ASCII is written as a single `?`, so the length
    /// prefix is the count of chars rather than UTF-8 bytes in that case.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the string is longer than [`u32::MAX`].
    pub fn write_string(&mut self, value: &str) -> Result<(), Error> {
        if value.is_ascii() {
            self.write_len(value.len())?;
            self.write_bytes(value.as_bytes());
            return Ok(());
        }

        log::warn!("non-ascii chars in {value:?} are written as `?`");

        let ascii: Vec<u8> = value
            .chars()
            .map(|c| u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b'?'))
            .collect();

        self.write_len(ascii.len())?;
        self.write_bytes(&ascii);
        Ok(())
    }

    /// Writes a date time as ticks with the UTC kind.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is before year 1.
    pub fn write_datetime(&mut self, value: OffsetDateTime) -> Result<(), Error> {
        self.write_i64(datetime::to_binary(value)?);
        Ok(())
    }

    /// Writes an optional date time as unix seconds, with [`None`] as 0.
    pub fn write_ctime(&mut self, value: Option<OffsetDateTime>) {
        self.write_i64(datetime::to_ctime(value));
    }

    pub fn write_guid(&mut self, value: Uuid) {
        self.write_bytes(&value.to_bytes_le());
    }

    /// Writes the contents of another buffer, prefixed with their length.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the nested buffer is longer than [`u32::MAX`].
    pub fn write_nested(&mut self, nested: &Self) -> Result<(), Error> {
        self.write_len(nested.len())?;
        self.write_bytes(nested.as_bytes());
        Ok(())
    }
}

// short reads are the only failure for most of these
#[allow(clippy::missing_errors_doc)]
impl ByteBuffer {
    /// Reads `count` bytes, borrowing them from the buffer.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8], Error> {
        let start = self.read_position;
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.read_end())
            .ok_or(Error::OutOfBounds {
                position: start,
                requested: count,
                length: self.read_end(),
            })?;

        self.read_position = end;
        Ok(&self.bytes[start..end])
    }

    /// Reads a constant size chunk of bytes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let (out, _) = self.bytes[self.read_position..self.read_end()]
            .split_first_chunk::<N>()
            .ok_or(Error::OutOfBounds {
                position: self.read_position,
                requested: N,
                length: self.read_end(),
            })?;

        let out = *out;
        self.read_position += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let [b] = self.read_array()?;
        Ok(b)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        self.read_array().map(i16::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        self.read_array().map(i64::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64, Error> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Reads a single byte as a bool. Any nonzero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    fn read_len(&mut self) -> Result<usize, Error> {
        let len = self.read_u32()?;
        // u32 always fits on the targets we support
        usize::try_from(len).map_err(|_| Error::LengthOverflow(usize::MAX))
    }

    /// Reads a length-prefixed ASCII string.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the data is cut short or contains non-ASCII bytes.
    pub fn read_string(&mut self) -> Result<String, Error> {
        self.rewind_on_err(|buf| {
            let len = buf.read_len()?;
            let start = buf.read_position;
            let raw = buf.read_bytes(len)?;

            if let Some(offset) = raw.iter().position(|b| !b.is_ascii()) {
                return Err(Error::InvalidAscii {
                    position: start + offset,
                });
            }

            // all ascii is also valid utf-8
            Ok(raw.iter().copied().map(char::from).collect())
        })
    }

    pub fn read_datetime(&mut self) -> Result<OffsetDateTime, Error> {
        self.rewind_on_err(|buf| datetime::from_binary(buf.read_i64()?))
    }

    pub fn read_ctime(&mut self) -> Result<Option<OffsetDateTime>, Error> {
        self.rewind_on_err(|buf| datetime::from_ctime(buf.read_i64()?))
    }

    pub fn read_guid(&mut self) -> Result<Uuid, Error> {
        self.read_array().map(Uuid::from_bytes_le)
    }

    /// Reads a length-prefixed nested buffer into a new buffer, positioned at
    /// its start.
    ///
    /// This copies the nested bytes. Use [`read_nested_with`](Self::read_nested_with)
    /// to read them in place.
    pub fn read_nested(&mut self) -> Result<Self, Error> {
        self.rewind_on_err(|buf| {
            let len = buf.read_len()?;
            buf.read_bytes(len).map(Self::from_bytes)
        })
    }

    /// Reads a length-prefixed nested buffer in place.
    ///
    /// While `read` runs, the buffer ends where the nested data ends, so
    /// [`is_eof`](Self::is_eof) and out-of-bounds checks apply to the nested
    /// data only. Afterwards the read position is just past the nested data,
    /// even if `read` left some of it unread.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the nested data is cut short or `read` fails. The read
    /// position is restored to before the length prefix in that case.
    pub fn read_nested_with<T, E, F>(&mut self, read: F) -> Result<T, E>
    where
        E: From<Error>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let start = self.read_position;
        let end = self.rewind_on_err(|buf| {
            let len = buf.read_len()?;
            if len > buf.remaining() {
                return Err(Error::OutOfBounds {
                    position: buf.read_position,
                    requested: len,
                    length: buf.read_end(),
                });
            }

            Ok(buf.read_position + len)
        })?;

        let outer_limit = self.read_limit.replace(end);
        let result = read(self);
        self.read_limit = outer_limit;

        self.read_position = if result.is_ok() { end } else { start };
        result
    }

    /// Runs `read`, restoring the read position if it fails.
    pub(crate) fn rewind_on_err<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let start = self.read_position;
        let result = read(self);
        if result.is_err() {
            self.read_position = start;
        }

        result
    }
}
