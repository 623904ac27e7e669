//! Identity-keyed visited set for one measurement.
//!
//! Keys are host handles, whose equality is object identity. Two objects
//! with equal content are still two entries.

use core::hash::Hash;
use std::collections::HashSet;

pub(crate) struct VisitedSet<H> {
    seen: HashSet<H>,
}

impl<H: Copy + Eq + Hash> VisitedSet<H> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    /// Returns `true` iff this call observed the object as not-yet-visited and
    /// marks it visited.
    #[inline(always)]
    pub(crate) fn try_visit(&mut self, obj: H) -> bool {
        self.seen.insert(obj)
    }
}
