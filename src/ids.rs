//! Type-safe identifiers using the newtype pattern.
//!
//! Mirrors the identifier idiom used throughout the engine: each ID is a
//! distinct type so a [`PointerId`] can never be mixed up with an
//! [`InkId`] at compile time, niche-optimized where a `NonZeroU64` is a
//! natural fit so `Option<Id>` costs nothing extra.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a live pointer contact (pen tip, finger, mouse
/// button, hover). Uses `i32` to match platform pointer-event APIs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct PointerId(i32);

impl PointerId {
    /// Creates a new pointer ID.
    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Canonical ID used for the (singular) mouse pointer.
    pub const MOUSE: Self = Self(0);
}

impl fmt::Debug for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointerId({})", self.0)
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pointer:{}", self.0)
    }
}

impl From<i32> for PointerId {
    #[inline]
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<PointerId> for i32 {
    #[inline]
    fn from(id: PointerId) -> Self {
        id.0
    }
}

static INK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an [`crate::ink::Ink`]. Generated internally;
/// hosts never construct one directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InkId(NonZeroU64);

impl InkId {
    pub(crate) fn next() -> Self {
        let raw = INK_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).expect("counter starts at 1 and only increments"))
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for InkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InkId({})", self.0)
    }
}

impl fmt::Display for InkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ink:{}", self.0)
    }
}

/// Identifier for a host-registered target element (an SVG group or
/// node). Opaque; hosts choose their own numbering scheme.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TargetId(u64);

impl TargetId {
    /// Creates a new target ID from a host-chosen value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target:{}", self.0)
    }
}

impl From<u64> for TargetId {
    #[inline]
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

static TIMER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a scheduled [`crate::timer::GestureTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub(crate) fn next() -> Self {
        Self(TIMER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_id() {
        let id = PointerId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(format!("{:?}", id), "PointerId(42)");
        assert_eq!(format!("{}", id), "pointer:42");
    }

    #[test]
    fn test_pointer_id_hash_dedup() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(PointerId::new(1));
        set.insert(PointerId::new(2));
        set.insert(PointerId::new(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_ink_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<InkId>>(),
            std::mem::size_of::<InkId>()
        );
    }

    #[test]
    fn test_ink_id_unique() {
        let a = InkId::next();
        let b = InkId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_timer_id_unique() {
        let a = TimerId::next();
        let b = TimerId::next();
        assert_ne!(a, b);
    }
}
