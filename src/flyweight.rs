//! Flyweight classification.
//!
//! A flyweight is a shared canonical instance standing for a value: an enum
//! constant, an interned string, a shared boolean, a cached small box, a type
//! descriptor or a type loader. Reached through a reference, such an object
//! is not charged to the referrer.
//!
//! The rule set is closed. A new category means a new [`ValueClass`] variant
//! and a new arm here.

use crate::model::{ObjectModel, ValueClass};
use crate::SizeError;

/// Decides whether a non-null object is a well-known shared instance.
#[derive(Debug, Clone)]
pub struct FlyweightClassifier<H> {
    interned: Vec<H>,
}

impl<H> Default for FlyweightClassifier<H> {
    fn default() -> Self {
        Self {
            interned: Vec::new(),
        }
    }
}

impl<H: Copy + Eq> FlyweightClassifier<H> {
    /// A classifier that additionally treats `interned` as flyweights.
    pub fn new(interned: impl IntoIterator<Item = H>) -> Self {
        Self {
            interned: interned.into_iter().collect(),
        }
    }

    /// Adds caller-known shared objects.
    pub fn extend(&mut self, interned: impl IntoIterator<Item = H>) {
        self.interned.extend(interned);
    }

    /// The caller-supplied shared objects.
    pub fn interned(&self) -> &[H] {
        &self.interned
    }

    /// Returns `true` if `obj` is a flyweight. First matching category wins;
    /// the caller-supplied list is only consulted for objects of no known
    /// category.
    ///
    /// # Errors
    /// Propagates host errors from [`ObjectModel::value_class`].
    pub fn is_flyweight<M>(&self, model: &M, obj: H) -> Result<bool, SizeError>
    where
        M: ObjectModel<Handle = H> + ?Sized,
    {
        Ok(match model.value_class(obj)? {
            ValueClass::EnumConstant | ValueClass::TypeDescriptor | ValueClass::TypeLoader => true,
            ValueClass::Str { canonical }
            | ValueClass::Boolean { canonical }
            | ValueClass::Boxed { canonical } => canonical == Some(obj),
            ValueClass::Other => self.interned.contains(&obj),
        })
    }
}
