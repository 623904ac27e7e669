//! Host object-model seams.
//!
//! The measurement engine never inspects objects directly. A host runtime
//! exposes its heap through these traits:
//! - `ObjectModel`: identity, runtime type, array shape and canonical-value
//!   classification of an object
//! - `TypeIntrospector`: the ancestor-first field table of a type and a field reader
//!
//! The third collaborator, the footprint oracle, lives in [`crate::oracle`].

mod field;

pub use field::{FieldDescriptor, FieldType, Primitive};

use core::fmt;
use core::hash::Hash;

use crate::SizeError;

/// The storage shape of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a, H> {
    /// A plain object whose contents are described by its type's fields.
    Instance,
    /// An array whose elements are references, in index order.
    ReferenceArray(&'a [Option<H>]),
    /// An array of scalars. Opaque to the traversal.
    PrimitiveArray {
        /// Element kind.
        element: Primitive,
        /// Number of elements.
        len: usize,
    },
}

/// Canonical-value category of an object, as reported by the host.
///
/// The host says *what kind* of value an object is and, where the runtime keeps
/// one, which instance is the canonical representative for the object's
/// content. Whether the object is a flyweight is decided by
/// [`crate::flyweight::FlyweightClassifier`] alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass<H> {
    /// A constant of an enumerated type.
    EnumConstant,
    /// A string; `canonical` is the interned instance with equal content, if any.
    Str {
        /// Interned representative.
        canonical: Option<H>,
    },
    /// A boxed truth value; `canonical` is the shared instance for that value.
    Boolean {
        /// Shared `true`/`false` instance.
        canonical: Option<H>,
    },
    /// A boxed integral value; `canonical` is the cached instance for that
    /// value, or `None` when the value lies outside the cache range.
    Boxed {
        /// Cached representative.
        canonical: Option<H>,
    },
    /// An object describing a runtime type.
    TypeDescriptor,
    /// An object that loads runtime types.
    TypeLoader,
    /// Anything else.
    Other,
}

/// Identity and shape of objects in a host heap.
///
/// `Handle` equality **must** be object identity: two handles compare equal iff
/// they denote the same object, regardless of content.
pub trait ObjectModel {
    /// Identity-comparable reference to an object.
    type Handle: Copy + Eq + Hash + fmt::Debug;
    /// Runtime type handle.
    type Type: Copy + Eq + fmt::Debug;

    /// Runtime type of `obj`.
    ///
    /// # Errors
    /// Host-defined; propagated unchanged by the engine.
    fn type_of(&self, obj: Self::Handle) -> Result<Self::Type, SizeError>;

    /// Display name of a type. Array types end in `[]`.
    fn type_name(&self, ty: Self::Type) -> &str;

    /// A stable numeric identity marker for diagnostics.
    fn identity(&self, obj: Self::Handle) -> u64;

    /// Storage shape of `obj`.
    ///
    /// # Errors
    /// Host-defined; propagated unchanged by the engine.
    fn shape(&self, obj: Self::Handle) -> Result<Shape<'_, Self::Handle>, SizeError>;

    /// Canonical-value category of `obj`.
    ///
    /// # Errors
    /// Host-defined; propagated unchanged by the engine.
    fn value_class(&self, obj: Self::Handle) -> Result<ValueClass<Self::Handle>, SizeError>;
}

/// Field enumeration and field reads.
pub trait TypeIntrospector: ObjectModel {
    /// Declared fields of `ty` across its whole hierarchy, ancestors first,
    /// declaration order within each type. Static fields are included and
    /// flagged.
    ///
    /// # Errors
    /// Host-defined.
    fn fields_of(&self, ty: Self::Type) -> Result<&[FieldDescriptor], SizeError>;

    /// Reads a reference-typed field of `obj`.
    ///
    /// # Errors
    /// Returns [`SizeError::AccessDenied`] if the runtime forbids the read.
    fn read_field(
        &self,
        obj: Self::Handle,
        field: &FieldDescriptor,
    ) -> Result<Option<Self::Handle>, SizeError>;
}
