use std::backtrace::Backtrace;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use byte_stream::TaggedValue;

use crate::Result;
use crate::context::ContextInfo;
use crate::encrypted::{self, CallerVerifier};

/// A named debug value attached to an exception.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugEntry {
    pub key: String,
    pub value: TaggedValue,
}

/// Stack frames of a node.
///
/// `frames` is the recorded trace with the most recent frame last. Frames
/// reported through [`ExceptionNode::capture_frames`] sit in `captured` until
/// recorded; `recorded` counts how many of them were already moved over.
#[derive(Debug, Clone, Default)]
struct StackTrace {
    frames: Vec<String>,
    captured: Vec<String>,
    recorded: usize,
}

/// A single exception in a chain of exceptions.
///
/// The outermost node owns its cause as [`inner`](Self::inner), which may in
/// turn own its cause, and so on. Nodes are always trees: there are no
/// shared or cyclic inner references.
///
/// Dropping, cloning, comparing and formatting walk the chain in a loop, so
/// chains of any length are fine in memory. Only chains up to
/// [`MAX_DEPTH`](crate::MAX_DEPTH) can be serialized.
#[derive(Default)]
pub struct ExceptionNode {
    eli_code: String,
    message: String,
    inner: Option<Box<Self>>,
    resolutions: Vec<String>,
    debug_data: Vec<DebugEntry>,
    stack: Mutex<StackTrace>,
    context: ContextInfo,
}

impl ExceptionNode {
    /// Creates a new exception with a freshly captured [`ContextInfo`].
    #[must_use]
    pub fn new(eli_code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut node = Self::from_parts(eli_code.into(), message.into());
        node.context = ContextInfo::capture();
        node
    }

    /// Creates a new exception caused by `inner`.
    ///
    /// The new context inherits the workflow fields `inner` has set.
    #[must_use]
    pub fn wrap(eli_code: impl Into<String>, message: impl Into<String>, inner: Self) -> Self {
        let mut node = Self::new(eli_code, message);
        node.context.inherit_from(&inner.context);
        node.inner = Some(Box::new(inner));
        node
    }

    pub fn eli_code(&self) -> &str {
        &self.eli_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_inner(&self) -> bool {
        self.inner.is_some()
    }

    pub fn inner(&self) -> Option<&Self> {
        self.inner.as_deref()
    }

    /// Removes and returns the inner exception.
    pub fn take_inner(&mut self) -> Option<Self> {
        self.inner.take().map(|b| *b)
    }

    pub fn resolutions(&self) -> &[String] {
        &self.resolutions
    }

    pub fn debug_data(&self) -> &[DebugEntry] {
        &self.debug_data
    }

    /// Gets the first debug value stored under `key`.
    pub fn debug_value(&self, key: &str) -> Option<&TaggedValue> {
        self.debug_data
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.value)
    }

    pub fn context(&self) -> &ContextInfo {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ContextInfo {
        &mut self.context
    }

    /// Iterates this node followed by each inner exception, outermost first.
    pub fn iter_chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |n| n.inner())
    }

    /// Adds a suggested resolution.
    pub fn add_resolution(&mut self, resolution: impl Into<String>) {
        self.resolutions.push(resolution.into());
    }

    /// Appends a debug value. Keys may repeat and the order is kept.
    pub fn add_debug(&mut self, key: impl Into<String>, value: impl Into<TaggedValue>) {
        self.debug_data.push(DebugEntry {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Appends a debug value in encrypted form.
    ///
    /// The value is converted to its display text and stored as a string
    /// produced by [`encrypt_debug_value`](crate::encrypt_debug_value).
    ///
    /// # Errors
    ///
    /// Returns `Err` if the text cannot be written or encrypted.
    pub fn add_encrypted_debug(
        &mut self,
        key: impl Into<String>,
        value: impl Into<TaggedValue>,
    ) -> Result<()> {
        let text = value.into().to_string();
        let encrypted = encrypted::encrypt_debug_value(&text)?;
        self.add_debug(key, encrypted);
        Ok(())
    }

    /// Gets the debug data with every encrypted value decrypted.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `verifier` rejects the caller or any encrypted value
    /// is malformed.
    pub fn decrypted_debug_data(&self, verifier: &dyn CallerVerifier) -> Result<Vec<DebugEntry>> {
        let mut out = Vec::with_capacity(self.debug_data.len());
        for entry in &self.debug_data {
            let value = match entry.value.as_str() {
                Some(text) if encrypted::is_encrypted(text) => {
                    TaggedValue::String(encrypted::decrypt_debug_value(text, verifier)?)
                },
                _ => entry.value.clone(),
            };

            out.push(DebugEntry {
                key: entry.key.clone(),
                value,
            });
        }

        Ok(out)
    }

    /// Pushes a frame onto the recorded stack trace.
    pub fn push_stack_frame(&mut self, frame: impl Into<String>) {
        self.stack
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .frames
            .push(frame.into());
    }

    /// Reports frames of the call stack the exception passed through, outermost
    /// first. They are added to the stack trace by the next
    /// [`record_stack_trace`](Self::record_stack_trace).
    pub fn capture_frames<I>(&self, frames: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.lock_stack()
            .captured
            .extend(frames.into_iter().map(Into::into));
    }

    /// Reports the current thread's backtrace via [`capture_frames`](Self::capture_frames).
    pub fn capture_backtrace(&self) {
        let trace = Backtrace::force_capture().to_string();
        let frames: Vec<&str> = trace
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        // backtraces list the most recent frame first
        self.capture_frames(frames.into_iter().rev());
    }

    /// Moves captured frames that were not recorded yet onto the stack trace.
    ///
    /// Repeated calls never add the same captured frame twice. Returns the
    /// number of frames added.
    pub fn record_stack_trace(&self) -> usize {
        let mut stack = self.lock_stack();
        let StackTrace { frames, captured, recorded } = &mut *stack;

        let pending = captured.get(*recorded..).unwrap_or_default();
        frames.extend_from_slice(pending);

        let added = pending.len();
        *recorded = captured.len();

        if added != 0 {
            log::trace!("recorded {added} stack frames for {}", self.eli_code);
        }

        added
    }

    /// Gets the recorded stack trace, most recent frame first.
    pub fn stack_trace(&self) -> Vec<String> {
        self.lock_stack().frames.iter().rev().cloned().collect()
    }

    fn lock_stack(&self) -> MutexGuard<'_, StackTrace> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds a node from decoded parts. Captured frames start out empty.
    pub(crate) fn from_parts(eli_code: String, message: String) -> Self {
        Self {
            eli_code,
            message,
            inner: None,
            resolutions: Vec::new(),
            debug_data: Vec::new(),
            stack: Mutex::default(),
            context: ContextInfo::default(),
        }
    }

    /// Clones this node without its inner exception.
    fn clone_local(&self) -> Self {
        Self {
            eli_code: self.eli_code.clone(),
            message: self.message.clone(),
            inner: None,
            resolutions: self.resolutions.clone(),
            debug_data: self.debug_data.clone(),
            stack: Mutex::new(self.lock_stack().clone()),
            context: self.context.clone(),
        }
    }

    /// Compares this node to `other`, ignoring their inner exceptions.
    fn eq_local(&self, other: &Self) -> bool {
        // locking the same mutex twice would deadlock
        if std::ptr::eq(self, other) {
            return true;
        }

        self.eli_code == other.eli_code
            && self.message == other.message
            && self.resolutions == other.resolutions
            && self.debug_data == other.debug_data
            && self.context == other.context
            && self.lock_stack().frames == other.lock_stack().frames
    }

    pub(crate) fn set_inner(&mut self, inner: Self) {
        self.inner = Some(Box::new(inner));
    }

    pub(crate) fn push_decoded_debug(&mut self, key: String, value: TaggedValue) {
        self.debug_data.push(DebugEntry { key, value });
    }

    /// Replaces the recorded frames. `frames` is most recent first.
    pub(crate) fn set_decoded_stack(&mut self, mut frames: Vec<String>) {
        frames.reverse();
        self.stack.get_mut().unwrap_or_else(PoisonError::into_inner).frames = frames;
    }
}

impl Drop for ExceptionNode {
    fn drop(&mut self) {
        // unlink one node at a time instead of recursing through the boxes
        let mut next = self.inner.take();
        while let Some(mut node) = next {
            next = node.inner.take();
        }
    }
}

impl Clone for ExceptionNode {
    fn clone(&self) -> Self {
        // rebuild from the innermost exception outwards
        let causes: Vec<&Self> = self.iter_chain().skip(1).collect();
        let inner = causes.into_iter().rev().fold(None, |inner, node| {
            let mut copy = node.clone_local();
            copy.inner = inner;
            Some(Box::new(copy))
        });

        let mut copy = self.clone_local();
        copy.inner = inner;
        copy
    }
}

/// Compares everything that is written to the stream. Captured frames that
/// were not recorded yet are ignored.
impl PartialEq for ExceptionNode {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.iter_chain();
        let mut right = other.iter_chain();
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) if a.eq_local(b) => {},
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

/// Lists the chain outermost first rather than nesting each inner exception.
impl fmt::Debug for ExceptionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter_chain().map(NodeFields))
            .finish()
    }
}

struct NodeFields<'a>(&'a ExceptionNode);

impl fmt::Debug for NodeFields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0;
        f.debug_struct("ExceptionNode")
            .field("eli_code", &node.eli_code)
            .field("message", &node.message)
            .field("resolutions", &node.resolutions)
            .field("debug_data", &node.debug_data)
            .field("stack", &*node.lock_stack())
            .field("context", &node.context)
            .finish()
    }
}

impl fmt::Display for ExceptionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, node) in self.iter_chain().enumerate() {
            if depth != 0 {
                f.write_str("caused by: ")?;
            }

            writeln!(f, "{}: {}", node.eli_code, node.message)?;

            for resolution in &node.resolutions {
                writeln!(f, "    resolution: {resolution}")?;
            }

            for entry in &node.debug_data {
                writeln!(f, "    {} = {}", entry.key, entry.value)?;
            }

            for frame in node.stack_trace() {
                writeln!(f, "    stack: {frame}")?;
            }
        }

        Ok(())
    }
}
