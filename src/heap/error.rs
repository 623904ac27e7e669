use core::fmt;

/// The error type for building object graphs in a [`super::Heap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// A type with this name is already registered.
    DuplicateType(String),
    /// A class declares the same field name twice.
    DuplicateField {
        /// Declaring class.
        type_name: String,
        /// Field name.
        field: String,
    },
    /// No field of this name exists on the type or its ancestors.
    NoSuchField {
        /// Searched type.
        type_name: String,
        /// Field name.
        field: String,
    },
    /// The stored value does not match the field's declared type.
    TypeMismatch {
        /// Owning type.
        type_name: String,
        /// Field name.
        field: String,
    },
    /// The operation needs a class, not an array type (or vice versa for
    /// instances of array types).
    NotAnInstanceType(String),
    /// The object is not a reference array.
    NotAnArray,
    /// Array index out of range.
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Array length.
        len: usize,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::DuplicateType(name) => write!(f, "type `{name}` is already defined"),
            HeapError::DuplicateField { type_name, field } => {
                write!(f, "field `{field}` declared twice in `{type_name}`")
            }
            HeapError::NoSuchField { type_name, field } => {
                write!(f, "no field `{field}` on `{type_name}`")
            }
            HeapError::TypeMismatch { type_name, field } => {
                write!(f, "value does not match the declared type of `{type_name}.{field}`")
            }
            HeapError::NotAnInstanceType(name) => write!(f, "`{name}` is not an instance type"),
            HeapError::NotAnArray => f.write_str("object is not a reference array"),
            HeapError::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
        }
    }
}

impl std::error::Error for HeapError {}
