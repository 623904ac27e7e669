//! Lifetime brands for heap handles.

use core::marker::PhantomData;

/// A marker type that is invariant in its lifetime parameter `'id`.
///
/// Heaps and their handles carry this marker so that handles minted by one
/// `Heap::new` scope can never be unified with another heap's handles. Identity
/// comparisons between `ObjectId`s are only meaningful inside one brand.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvariantLifetime<'id>(PhantomData<fn(&'id ()) -> &'id ()>);

impl<'id> InvariantLifetime<'id> {
    /// Creates a new invariant lifetime marker.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}
