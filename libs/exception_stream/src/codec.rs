//! Reading and writing [`ExceptionNode`] trees.

use byte_stream::ByteBuffer;

use crate::Result;
use crate::context::ContextInfo;
use crate::error::Error;
use crate::legacy;
use crate::node::ExceptionNode;

/// The string every exception stream starts with.
pub const SIGNATURE: &str = "UCLIDException Object Version 2";

/// The stream version written by this library.
///
/// Version 1 ends after the stack trace. Version 2 adds the application
/// state, version 3 the workflow state and version 4 the FPS context.
pub const CURRENT_VERSION: u32 = 4;

/// The most exceptions a chain may hold, counting the outermost one.
pub const MAX_DEPTH: usize = 128;

impl ExceptionNode {
    /// Serializes the exception chain into a new buffer.
    ///
    /// Pending stack frames of every node are recorded first.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the chain is longer than [`MAX_DEPTH`], a count or
    /// length does not fit into 32 bits, or a date time is outside the
    /// representable range.
    pub fn to_buffer(&self) -> Result<ByteBuffer> {
        if self.iter_chain().nth(MAX_DEPTH).is_some() {
            return Err(Error::NestingTooDeep(MAX_DEPTH));
        }

        let mut buf = ByteBuffer::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Serializes the exception chain into raw bytes.
    ///
    /// # Errors
    ///
    /// Same as [`to_buffer`](Self::to_buffer).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.to_buffer()?.into_bytes())
    }

    /// Serializes the exception chain into its hex text form.
    ///
    /// # Errors
    ///
    /// Same as [`to_buffer`](Self::to_buffer).
    pub fn to_hex(&self) -> Result<String> {
        Ok(self.to_buffer()?.to_hex())
    }

    /// Deserializes an exception chain from the current read position of
    /// `buf`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the signature is wrong, the version is newer than
    /// [`CURRENT_VERSION`], the chain is longer than [`MAX_DEPTH`], or the
    /// data is truncated or malformed.
    pub fn from_buffer(buf: &mut ByteBuffer) -> Result<Self> {
        read_node(buf, 1)
    }

    /// Deserializes an exception chain from raw bytes.
    ///
    /// # Errors
    ///
    /// Same as [`from_buffer`](Self::from_buffer).
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        read_node(&mut ByteBuffer::from_bytes(bytes), 1)
    }

    /// Deserializes an exception chain from its hex text form.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `text` is not valid hex or for the same reasons as
    /// [`from_buffer`](Self::from_buffer).
    pub fn from_hex(text: &str) -> Result<Self> {
        read_node(&mut ByteBuffer::from_hex(text)?, 1)
    }

    fn write_to(&self, buf: &mut ByteBuffer) -> Result<()> {
        self.record_stack_trace();

        buf.write_string(SIGNATURE)?;
        buf.write_u32(CURRENT_VERSION);
        buf.write_string(self.eli_code())?;
        buf.write_string(self.message())?;

        buf.write_bool(self.has_inner());
        if let Some(inner) = self.inner() {
            let mut nested = ByteBuffer::new();
            inner.write_to(&mut nested)?;
            buf.write_nested(&nested)?;
        }

        write_count(buf, self.resolutions().len())?;
        for resolution in self.resolutions() {
            buf.write_string(resolution)?;
        }

        write_count(buf, self.debug_data().len())?;
        for entry in self.debug_data() {
            buf.write_string(&entry.key)?;
            buf.write_tagged(&entry.value)?;
        }

        let stack = self.stack_trace();
        write_count(buf, stack.len())?;
        for frame in &stack {
            buf.write_string(frame)?;
        }

        write_context(buf, self.context())
    }
}

fn write_count(buf: &mut ByteBuffer, count: usize) -> Result<()> {
    let count = u32::try_from(count).map_err(|_| byte_stream::Error::LengthOverflow(count))?;
    buf.write_u32(count);
    Ok(())
}

fn write_context(buf: &mut ByteBuffer, context: &ContextInfo) -> Result<()> {
    buf.write_u32(context.pid);
    buf.write_string(&context.machine_name)?;
    buf.write_string(&context.app_name)?;
    buf.write_string(&context.user_name)?;
    buf.write_string(&context.app_version)?;
    buf.write_guid(context.exception_id);
    buf.write_ctime(context.exception_time);

    buf.write_i32(context.file_id);
    buf.write_i32(context.action_id);
    buf.write_string(&context.database_server)?;
    buf.write_string(&context.database_name)?;

    buf.write_string(&context.fps_context)?;
    Ok(())
}

/// Caps the capacity reserved up front for a stored count.
///
/// The count comes from untrusted data, so a corrupt value must not lead to a
/// huge allocation before reading fails.
fn capacity(count: u32) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX).min(64)
}

/// Reads a node at `depth` in its chain, with the outermost node at depth 1.
fn read_node(buf: &mut ByteBuffer, depth: usize) -> Result<ExceptionNode> {
    if depth > MAX_DEPTH {
        return Err(Error::NestingTooDeep(MAX_DEPTH));
    }

    let signature = buf.read_string()?;
    if signature != SIGNATURE {
        return Err(Error::BadSignature(signature));
    }

    let version = buf.read_u32()?;
    if version > CURRENT_VERSION {
        return Err(Error::UnknownVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }

    let eli_code = buf.read_string()?;
    let message = buf.read_string()?;
    let mut node = ExceptionNode::from_parts(eli_code, message);

    if buf.read_bool()? {
        let inner = buf.read_nested_with(|nested| read_node(nested, depth + 1))?;
        node.set_inner(inner);
    }

    let count = buf.read_u32()?;
    for _ in 0..count {
        node.add_resolution(buf.read_string()?);
    }

    let count = buf.read_u32()?;
    for _ in 0..count {
        let key = buf.read_string()?;
        let value = buf.read_tagged()?;
        if !legacy::apply(&mut node, &key, &value) {
            node.push_decoded_debug(key, value);
        }
    }

    let count = buf.read_u32()?;
    let mut frames = Vec::with_capacity(capacity(count));
    for _ in 0..count {
        frames.push(buf.read_string()?);
    }

    node.set_decoded_stack(frames);
    read_context(buf, node.context_mut())?;

    if !buf.is_eof() {
        log::debug!(
            "ignoring {} trailing bytes after version {version} exception {}",
            buf.remaining(),
            node.eli_code(),
        );
    }

    Ok(node)
}

/// Reads the optional trailing sections. Each one is only present if the
/// buffer has not ended yet.
fn read_context(buf: &mut ByteBuffer, context: &mut ContextInfo) -> Result<()> {
    if buf.is_eof() {
        return Ok(());
    }

    context.pid = buf.read_u32()?;
    context.machine_name = buf.read_string()?;
    context.app_name = buf.read_string()?;
    context.user_name = buf.read_string()?;
    context.app_version = buf.read_string()?;
    context.exception_id = buf.read_guid()?;
    context.exception_time = buf.read_ctime()?;

    if buf.is_eof() {
        return Ok(());
    }

    context.file_id = buf.read_i32()?;
    context.action_id = buf.read_i32()?;
    context.database_server = buf.read_string()?;
    context.database_name = buf.read_string()?;

    if buf.is_eof() {
        return Ok(());
    }

    context.fps_context = buf.read_string()?;
    Ok(())
}
