//! Per-scene unique identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric identifier unique within the scene that assigned it.
///
/// Unlike string ids and names, which callers pick freely and may repeat,
/// a `UniqueId` is handed out by the scene's `UniqueIdGenerator` and is never
/// reused for the lifetime of that scene.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(pub u64);

impl UniqueId {
    /// Create a UniqueId from a raw value (for lookups/testing)
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueId({})", self.0)
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic counter owned by one scene.
///
/// Each scene holds its own generator, so two scenes in the same process hand
/// out overlapping numbers without interfering with each other.
#[derive(Debug, Clone)]
pub struct UniqueIdGenerator {
    next: u64,
}

impl Default for UniqueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueIdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next id
    pub fn next_id(&mut self) -> UniqueId {
        let id = UniqueId(self.next);
        self.next += 1;
        id
    }

    /// Make sure future ids are strictly above `id`.
    ///
    /// Used when an entity arrives with an id assigned elsewhere.
    pub fn ensure_above(&mut self, id: UniqueId) {
        if self.next <= id.0 {
            self.next = id.0 + 1;
        }
    }

    /// The value the next call to `next_id` will return
    pub fn peek(&self) -> u64 {
        self.next
    }
}
