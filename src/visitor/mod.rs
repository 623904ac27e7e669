//! Traversal observers.
//!
//! The engine reports its walk through four hooks, called in strict stack
//! order: every `start_object` is closed by one `end_object` at the same
//! level before a sibling starts, and field pairs nest inside their owner's
//! object pair. A hook returning `Err` aborts the whole measurement.

mod tree_dump;
#[cfg(feature = "tracing")]
mod tracing_visitor;

pub use tree_dump::TreeDump;
#[cfg(feature = "tracing")]
pub use tracing_visitor::TracingVisitor;

use crate::model::{FieldType, ObjectModel, Shape};
use crate::SizeError;

/// A possibly-null object as seen by a visitor, with access to its model for
/// descriptive queries.
pub struct Observed<'m, M: ObjectModel + ?Sized> {
    model: &'m M,
    handle: Option<M::Handle>,
}

impl<'m, M: ObjectModel + ?Sized> Clone for Observed<'m, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'m, M: ObjectModel + ?Sized> Copy for Observed<'m, M> {}

impl<'m, M: ObjectModel + ?Sized> Observed<'m, M> {
    pub(crate) fn new(model: &'m M, handle: Option<M::Handle>) -> Self {
        Self { model, handle }
    }

    /// The observed object, or `None` for a null reference.
    pub fn handle(&self) -> Option<M::Handle> {
        self.handle
    }

    /// Whether this is a null reference.
    pub fn is_null(&self) -> bool {
        self.handle.is_none()
    }

    /// The model the object lives in.
    pub fn model(&self) -> &'m M {
        self.model
    }

    /// Identity marker of the object.
    pub fn identity(&self) -> Option<u64> {
        self.handle.map(|h| self.model.identity(h))
    }

    /// Runtime type name of the object.
    pub fn type_name(&self) -> Option<&'m str> {
        let handle = self.handle?;
        let ty = self.model.type_of(handle).ok()?;
        Some(self.model.type_name(ty))
    }

    /// A short label: `Type@id` for objects, `Elem[len]@id` for arrays,
    /// `null` for null references.
    pub fn label(&self) -> String {
        let Some(handle) = self.handle else {
            return "null".to_owned();
        };
        let name = self.type_name().unwrap_or("?");
        let id = self.model.identity(handle);
        let len = match self.model.shape(handle) {
            Ok(Shape::ReferenceArray(elements)) => Some(elements.len()),
            Ok(Shape::PrimitiveArray { len, .. }) => Some(len),
            _ => None,
        };
        match len {
            Some(len) => {
                let element = name.strip_suffix("[]").unwrap_or(name);
                format!("{element}[{len}]@{id:x}")
            }
            None => format!("{name}@{id:x}"),
        }
    }
}

/// Receives push/pop notifications of object and field visits.
///
/// Every hook defaults to doing nothing.
pub trait Visitor<M: ObjectModel + ?Sized> {
    /// An object is entered. `shallow_bytes` is 0 for null, already-visited and
    /// flyweight objects.
    ///
    /// # Errors
    /// Any error aborts the measurement.
    fn start_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        shallow_bytes: u64,
    ) -> Result<(), SizeError> {
        let _ = (obj, level, shallow_bytes);
        Ok(())
    }

    /// An object is left. `deep_bytes` is everything charged to it.
    ///
    /// # Errors
    /// Any error aborts the measurement.
    fn end_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        deep_bytes: u64,
    ) -> Result<(), SizeError> {
        let _ = (obj, level, deep_bytes);
        Ok(())
    }

    /// A field of the current object is entered.
    ///
    /// # Errors
    /// Any error aborts the measurement.
    fn start_field(&mut self, name: &str, declared: &FieldType, level: usize) -> Result<(), SizeError> {
        let _ = (name, declared, level);
        Ok(())
    }

    /// A field of the current object is left.
    ///
    /// # Errors
    /// Any error aborts the measurement.
    fn end_field(&mut self, name: &str, declared: &FieldType, level: usize) -> Result<(), SizeError> {
        let _ = (name, declared, level);
        Ok(())
    }
}

/// A visitor that ignores every notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullVisitor;

impl<M: ObjectModel + ?Sized> Visitor<M> for NullVisitor {}

impl<M: ObjectModel + ?Sized, V: Visitor<M> + ?Sized> Visitor<M> for &mut V {
    fn start_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        shallow_bytes: u64,
    ) -> Result<(), SizeError> {
        (**self).start_object(obj, level, shallow_bytes)
    }

    fn end_object(
        &mut self,
        obj: Observed<'_, M>,
        level: usize,
        deep_bytes: u64,
    ) -> Result<(), SizeError> {
        (**self).end_object(obj, level, deep_bytes)
    }

    fn start_field(&mut self, name: &str, declared: &FieldType, level: usize) -> Result<(), SizeError> {
        (**self).start_field(name, declared, level)
    }

    fn end_field(&mut self, name: &str, declared: &FieldType, level: usize) -> Result<(), SizeError> {
        (**self).end_field(name, declared, level)
    }
}
