//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a registered bone chain within a scheduler.
///
/// Assigned by the scheduler on successful registration from a
/// monotonic counter, so an id is never reused for a different chain
/// over the scheduler's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u32);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ChainId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Handle to a transform owned by the host application.
///
/// The engine never interprets the value; it is only passed back to the
/// [`TransformStore`](crate::TransformStore) that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub u32);

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TransformId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
