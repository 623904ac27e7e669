//! Field descriptors and primitive kinds.

use core::fmt;

/// A primitive scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// 1-byte truth value.
    Boolean,
    /// Signed 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 16-bit code unit.
    Char,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
}

impl Primitive {
    /// Storage size of one value of this kind, in bytes.
    pub const fn size(self) -> u64 {
        match self {
            Primitive::Boolean | Primitive::Byte => 1,
            Primitive::Short | Primitive::Char => 2,
            Primitive::Int | Primitive::Float => 4,
            Primitive::Long | Primitive::Double => 8,
        }
    }

    /// Source-level name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A scalar stored inline in the owner.
    Primitive(Primitive),
    /// A reference to another object, named by its declared type.
    Reference(String),
}

impl FieldType {
    /// Whether values of this type are references to other objects.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Reference(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(p) => f.write_str(p.name()),
            FieldType::Reference(name) => f.write_str(name),
        }
    }
}

/// One declared field of a type, as reported by a `TypeIntrospector`.
///
/// Descriptors are immutable. A type's list is ordered ancestor-first and in
/// declaration order within each type, which makes traversal order
/// reproducible across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    declaring_type: String,
    name: String,
    declared: FieldType,
    is_static: bool,
    slot: usize,
}

impl FieldDescriptor {
    /// Creates a descriptor.
    ///
    /// `slot` is host-defined storage addressing; the engine never interprets it.
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        declared: FieldType,
        is_static: bool,
        slot: usize,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            declared,
            is_static,
            slot,
        }
    }

    /// Name of the type that declares this field.
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn declared_type(&self) -> &FieldType {
        &self.declared
    }

    /// Whether the field belongs to the type rather than to each instance.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the field holds a reference.
    pub fn is_reference(&self) -> bool {
        self.declared.is_reference()
    }

    /// Host storage slot.
    pub fn slot(&self) -> usize {
        self.slot
    }
}
