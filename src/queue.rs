//! Queue tags and their on-disk encoding.

use std::fmt;
use std::str::FromStr;

use crate::error::{ByplayError, Result};

/// The queue jobs land on when none is named.
pub const DEFAULT_QUEUE: &str = "default";

/// Separator that marks a namespaced tag. Queue tags are plain symbolic
/// names; anything namespaced is rejected at the API boundary.
const NAMESPACE_SEPARATOR: char = '/';

/// A validated queue tag.
///
/// The in-process tag and the stored string are the same text; `Queue::new`
/// enforces the invariants (non-empty, no namespace separator) so that every
/// `Queue` value is storable as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Queue(String);

impl Queue {
    /// Validate and wrap a queue tag.
    ///
    /// Fails with [`ByplayError::NamespacedQueue`] if the tag contains `/`,
    /// and with [`ByplayError::EmptyQueueTag`] if it is empty. An absent tag
    /// is not valid here; callers substitute [`Queue::default`] first.
    pub fn new(tag: impl Into<String>) -> Result<Self> {
        Ok(Self(encode(&tag.into())?))
    }

    /// Wrap a string read back from the `queue` column.
    ///
    /// Total: stored strings were validated on the way in.
    pub fn from_stored(stored: impl Into<String>) -> Self {
        Self(stored.into())
    }

    /// The stored form of this tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the tag, returning the stored form.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self(DEFAULT_QUEUE.to_string())
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Queue {
    type Err = ByplayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Map a symbolic queue tag to its stored string.
pub fn encode(tag: &str) -> Result<String> {
    if tag.is_empty() {
        return Err(ByplayError::EmptyQueueTag);
    }
    if tag.contains(NAMESPACE_SEPARATOR) {
        return Err(ByplayError::NamespacedQueue(tag.to_string()));
    }
    Ok(tag.to_string())
}

/// Map a stored string back to its queue tag.
pub fn decode(stored: &str) -> Queue {
    Queue::from_stored(stored)
}
