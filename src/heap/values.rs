//! Scalar values stored in heap slots.

use crate::model::Primitive;

use super::ObjectId;

/// A primitive scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimValue {
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `char`
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
}

impl PrimValue {
    /// The zero value of `kind`.
    pub const fn zero(kind: Primitive) -> Self {
        match kind {
            Primitive::Boolean => PrimValue::Boolean(false),
            Primitive::Byte => PrimValue::Byte(0),
            Primitive::Short => PrimValue::Short(0),
            Primitive::Char => PrimValue::Char(0),
            Primitive::Int => PrimValue::Int(0),
            Primitive::Long => PrimValue::Long(0),
            Primitive::Float => PrimValue::Float(0.0),
            Primitive::Double => PrimValue::Double(0.0),
        }
    }

    /// Kind of this value.
    pub const fn kind(&self) -> Primitive {
        match self {
            PrimValue::Boolean(_) => Primitive::Boolean,
            PrimValue::Byte(_) => Primitive::Byte,
            PrimValue::Short(_) => Primitive::Short,
            PrimValue::Char(_) => Primitive::Char,
            PrimValue::Int(_) => Primitive::Int,
            PrimValue::Long(_) => Primitive::Long,
            PrimValue::Float(_) => Primitive::Float,
            PrimValue::Double(_) => Primitive::Double,
        }
    }
}

/// A value that can be boxed into one of the integral wrapper types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boxed {
    /// Boxed as `Byte`.
    Byte(i8),
    /// Boxed as `Short`.
    Short(i16),
    /// Boxed as `Character`.
    Char(u16),
    /// Boxed as `Integer`.
    Int(i32),
    /// Boxed as `Long`.
    Long(i64),
}

/// Lowest and highest value of the shared small-value box cache.
const SMALL_MIN: i64 = -128;
const SMALL_MAX: i64 = 127;
const CHAR_MAX: u16 = 127;

impl Boxed {
    /// Kind of the wrapped scalar.
    pub const fn kind(&self) -> Primitive {
        match self {
            Boxed::Byte(_) => Primitive::Byte,
            Boxed::Short(_) => Primitive::Short,
            Boxed::Char(_) => Primitive::Char,
            Boxed::Int(_) => Primitive::Int,
            Boxed::Long(_) => Primitive::Long,
        }
    }

    /// The wrapped scalar.
    pub const fn to_prim(self) -> PrimValue {
        match self {
            Boxed::Byte(v) => PrimValue::Byte(v),
            Boxed::Short(v) => PrimValue::Short(v),
            Boxed::Char(v) => PrimValue::Char(v),
            Boxed::Int(v) => PrimValue::Int(v),
            Boxed::Long(v) => PrimValue::Long(v),
        }
    }

    /// Recovers a boxable value from a scalar.
    pub const fn from_prim(value: PrimValue) -> Option<Self> {
        match value {
            PrimValue::Byte(v) => Some(Boxed::Byte(v)),
            PrimValue::Short(v) => Some(Boxed::Short(v)),
            PrimValue::Char(v) => Some(Boxed::Char(v)),
            PrimValue::Int(v) => Some(Boxed::Int(v)),
            PrimValue::Long(v) => Some(Boxed::Long(v)),
            _ => None,
        }
    }

    /// Whether the runtime keeps one shared box for this value.
    ///
    /// Every `byte` is cached; `short`, `int` and `long` are cached in
    /// `-128..=127`; `char` in `0..=127`.
    pub const fn is_cached(&self) -> bool {
        match *self {
            Boxed::Byte(_) => true,
            Boxed::Char(c) => c <= CHAR_MAX,
            Boxed::Short(v) => v as i64 >= SMALL_MIN && v as i64 <= SMALL_MAX,
            Boxed::Int(v) => v as i64 >= SMALL_MIN && v as i64 <= SMALL_MAX,
            Boxed::Long(v) => v >= SMALL_MIN && v <= SMALL_MAX,
        }
    }
}

/// One storage cell of an instance or a type's static area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Slot<'brand> {
    Ref(Option<ObjectId<'brand>>),
    Prim(PrimValue),
}
