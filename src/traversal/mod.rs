//! Deep-size traversal.
//!
//! [`DeepSizer`] walks an object graph depth-first from a root, charging each
//! reachable object its shallow size exactly once:
//! - objects are deduplicated by identity, so shared and cyclic references
//!   are counted on first touch only
//! - flyweights reached below the root cost nothing; the root itself is always
//!   charged, whatever its category
//! - reference arrays charge their elements, primitive arrays are opaque
//! - static fields are never visited
//!
//! Recursion depth follows the longest reference chain. Very deep graphs can
//! exhaust the call stack.
//!
//! # Example
//!
//! ```rust
//! use heapsize::heap::{Boxed, ClassDef, FieldDef, Heap};
//! use heapsize::oracle::LayoutOracle;
//! use heapsize::DeepSizer;
//!
//! Heap::new(|mut heap| {
//!     let holder = heap
//!         .define_class(
//!             ClassDef::new("Holder")
//!                 .field(FieldDef::reference("count", "Integer"))
//!                 .field(FieldDef::reference("label", "String")),
//!         )
//!         .unwrap();
//!     let obj = heap.alloc(holder).unwrap();
//!     let count = heap.boxed(Boxed::Int(3));
//!     let label = heap.new_string("hello");
//!     heap.set_ref(obj, "count", Some(count)).unwrap();
//!     heap.set_ref(obj, "label", Some(label)).unwrap();
//!
//!     let oracle = LayoutOracle::default();
//!     let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
//!     // 24 (holder) + 0 (cached box) + 24 (string) + 24 (its bytes)
//!     assert_eq!(sizer.deep_size_of(obj).unwrap(), 72);
//! });
//! ```

#[cfg(feature = "parallel")]
pub mod parallel;
mod visited;

#[cfg(test)]
mod tests;

use crate::flyweight::FlyweightClassifier;
use crate::model::{Shape, TypeIntrospector};
use crate::oracle::FootprintOracle;
use crate::visitor::{NullVisitor, Observed, Visitor};
use crate::SizeError;
use visited::VisitedSet;

/// Measures deep sizes over one host model.
///
/// Built with [`DeepSizer::new`] and configured with the `with_*` methods.
/// Without an oracle, construction succeeds and the first shallow-size request
/// fails with [`SizeError::OracleUnavailable`].
pub struct DeepSizer<'a, M: TypeIntrospector, V = NullVisitor> {
    model: &'a M,
    oracle: Option<&'a dyn FootprintOracle<M>>,
    visitor: V,
    flyweights: FlyweightClassifier<M::Handle>,
}

impl<'a, M: TypeIntrospector> DeepSizer<'a, M> {
    /// A sizer over `model` with no oracle, a [`NullVisitor`] and no extra
    /// interned objects.
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            oracle: None,
            visitor: NullVisitor,
            flyweights: FlyweightClassifier::default(),
        }
    }
}

impl<'a, M: TypeIntrospector, V: Visitor<M>> DeepSizer<'a, M, V> {
    /// Sets the footprint oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: &'a dyn FootprintOracle<M>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Replaces the visitor.
    #[must_use]
    pub fn with_visitor<W: Visitor<M>>(self, visitor: W) -> DeepSizer<'a, M, W> {
        DeepSizer {
            model: self.model,
            oracle: self.oracle,
            visitor,
            flyweights: self.flyweights,
        }
    }

    /// Adds objects the caller knows to be shared. They cost nothing when
    /// reached below the root, unless a built-in category already decides them.
    #[must_use]
    pub fn with_interned(mut self, objects: impl IntoIterator<Item = M::Handle>) -> Self {
        self.flyweights.extend(objects);
        self
    }

    /// The visitor.
    pub fn visitor(&self) -> &V {
        &self.visitor
    }

    /// The visitor, mutably.
    pub fn visitor_mut(&mut self) -> &mut V {
        &mut self.visitor
    }

    /// Consumes the sizer, returning the visitor.
    pub fn into_visitor(self) -> V {
        self.visitor
    }

    /// Shallow size of `obj`, straight from the oracle.
    ///
    /// # Errors
    /// Returns [`SizeError::OracleUnavailable`] if no oracle was configured,
    /// or the oracle's own error.
    pub fn shallow_size_of(&self, obj: M::Handle) -> Result<u64, SizeError> {
        let oracle = self.oracle.ok_or(SizeError::OracleUnavailable)?;
        oracle.shallow_size(self.model, obj)
    }

    /// Deep size of everything reachable from `root`, including `root`.
    ///
    /// A null root measures 0 bytes. Each call uses a fresh visited set.
    ///
    /// # Errors
    /// Any oracle, introspector or visitor failure aborts the walk; no partial
    /// size is returned. A total beyond `u64::MAX` fails with
    /// [`SizeError::Overflow`].
    pub fn deep_size_of(&mut self, root: impl Into<Option<M::Handle>>) -> Result<u64, SizeError> {
        let root = root.into();
        let mut visited = VisitedSet::new();
        let bytes = self.visit_object(root, &mut visited, 0)?;
        trace_event!(debug, ?root, bytes, "measured deep size");
        Ok(bytes)
    }

    fn visit_object(
        &mut self,
        obj: Option<M::Handle>,
        visited: &mut VisitedSet<M::Handle>,
        level: usize,
    ) -> Result<u64, SizeError> {
        let model = self.model;
        // The membership check inserts, so it must run before the flyweight test.
        let charged = match obj {
            Some(handle) => {
                visited.try_visit(handle)
                    && !(level > 0 && self.flyweights.is_flyweight(model, handle)?)
            }
            None => false,
        };
        let observed = Observed::new(model, obj);
        let handle = match obj {
            Some(handle) if charged => handle,
            _ => {
                trace_event!(trace, ?obj, level, "zero-cost object");
                self.visitor.start_object(observed, level, 0)?;
                self.visitor.end_object(observed, level, 0)?;
                return Ok(0);
            }
        };

        let shallow = self.shallow_size_of(handle)?;
        self.visitor.start_object(observed, level, shallow)?;
        let nested = match model.shape(handle)? {
            Shape::ReferenceArray(elements) => {
                let mut bytes = 0;
                for &element in elements {
                    bytes = add(bytes, self.visit_object(element, visited, level + 1)?)?;
                }
                bytes
            }
            Shape::Instance | Shape::PrimitiveArray { .. } => {
                self.visit_fields(handle, visited, level + 1)?
            }
        };
        let total = add(shallow, nested)?;
        self.visitor.end_object(observed, level, total)?;
        Ok(total)
    }

    fn visit_fields(
        &mut self,
        obj: M::Handle,
        visited: &mut VisitedSet<M::Handle>,
        level: usize,
    ) -> Result<u64, SizeError> {
        let model = self.model;
        let ty = model.type_of(obj)?;
        let mut bytes = 0;
        for field in model.fields_of(ty)?.iter().filter(|f| !f.is_static()) {
            let declared = field.declared_type();
            self.visitor.start_field(field.name(), declared, level)?;
            if field.is_reference() {
                let value = model.read_field(obj, field)?;
                bytes = add(bytes, self.visit_object(value, visited, level)?)?;
            }
            self.visitor.end_field(field.name(), declared, level)?;
        }
        Ok(bytes)
    }
}

#[inline]
fn add(total: u64, bytes: u64) -> Result<u64, SizeError> {
    total.checked_add(bytes).ok_or(SizeError::Overflow)
}
