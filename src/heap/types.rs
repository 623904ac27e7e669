//! The heap's type table.
//!
//! Each registered type owns a flattened field table: inherited fields first,
//! then the type's own fields in declaration order. Instance fields are
//! numbered in that same order, so a field's slot is identical in every
//! subtype.

use std::collections::HashMap;

use super::values::{PrimValue, Slot};
use super::HeapError;
use crate::brand::InvariantLifetime;
use crate::model::{FieldDescriptor, FieldType, Primitive};

/// A handle to a type registered in a specific branded heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId<'brand> {
    index: u32,
    _brand: InvariantLifetime<'brand>,
}

impl<'brand> TypeId<'brand> {
    #[inline(always)]
    pub(crate) fn new(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => Self {
                index,
                _brand: InvariantLifetime::new(),
            },
            Err(_) => panic!("type table overflow: type {index} exceeds u32::MAX"),
        }
    }

    /// Returns the underlying index.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Element type of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType<'brand> {
    /// Scalars stored inline.
    Primitive(Primitive),
    /// References to instances of the given type.
    Reference(TypeId<'brand>),
}

/// Canonical-value role of a class, inherited by subclasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Plain,
    Str,
    Boolean,
    Boxed,
    Enum,
    TypeDescriptor,
    TypeLoader,
}

/// Declaration of one field of a [`ClassDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    name: String,
    declared: FieldType,
    is_static: bool,
    sealed: bool,
}

impl FieldDef {
    /// A reference field whose declared type is named `type_name`.
    ///
    /// The name is descriptive; it need not be registered yet, so a class
    /// may refer to itself.
    pub fn reference(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared: FieldType::Reference(type_name.into()),
            is_static: false,
            sealed: false,
        }
    }

    /// A primitive field.
    pub fn primitive(name: impl Into<String>, kind: Primitive) -> Self {
        Self {
            name: name.into(),
            declared: FieldType::Primitive(kind),
            is_static: false,
            sealed: false,
        }
    }

    /// Makes the field belong to the type instead of each instance.
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Forbids reflective reads of this field.
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }
}

/// Declaration of a class, consumed by [`super::Heap::define_class`].
#[derive(Debug, Clone)]
pub struct ClassDef<'brand> {
    name: String,
    superclass: Option<TypeId<'brand>>,
    fields: Vec<FieldDef>,
}

impl<'brand> ClassDef<'brand> {
    /// Starts a class named `name`. Without [`ClassDef::extends`] it derives
    /// from `Object`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            fields: Vec::new(),
        }
    }

    /// Sets the superclass.
    #[must_use]
    pub fn extends(mut self, superclass: TypeId<'brand>) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Appends a field declaration.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

pub(crate) enum TypeKind<'brand> {
    Class,
    Array(ElementType<'brand>),
}

pub(crate) struct TypeInfo<'brand> {
    pub(crate) name: String,
    pub(crate) kind: TypeKind<'brand>,
    pub(crate) role: Role,
    /// Flattened, ancestor-first; statics included.
    pub(crate) fields: Vec<FieldDescriptor>,
    /// Read permission per instance slot.
    pub(crate) sealed: Vec<bool>,
    /// Values of the statics this type itself declares.
    pub(crate) statics: Vec<Slot<'brand>>,
}

impl<'brand> TypeInfo<'brand> {
    /// Default instance slots, in slot order.
    pub(crate) fn blank_slots(&self) -> Vec<Slot<'brand>> {
        self.fields
            .iter()
            .filter(|f| !f.is_static())
            .map(|f| blank(f.declared_type()))
            .collect()
    }

    /// The most-derived field called `name` with the given staticness.
    pub(crate) fn field(&self, name: &str, is_static: bool) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.name() == name && f.is_static() == is_static)
    }
}

fn blank<'brand>(declared: &FieldType) -> Slot<'brand> {
    match declared {
        FieldType::Primitive(kind) => Slot::Prim(PrimValue::zero(*kind)),
        FieldType::Reference(_) => Slot::Ref(None),
    }
}

#[derive(Default)]
pub(crate) struct TypeTable<'brand> {
    types: Vec<TypeInfo<'brand>>,
    by_name: HashMap<String, TypeId<'brand>>,
    arrays: HashMap<ElementType<'brand>, TypeId<'brand>>,
}

impl<'brand> TypeTable<'brand> {
    #[inline]
    pub(crate) fn get(&self, ty: TypeId<'brand>) -> &TypeInfo<'brand> {
        &self.types[ty.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, ty: TypeId<'brand>) -> &mut TypeInfo<'brand> {
        &mut self.types[ty.index()]
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<TypeId<'brand>> {
        self.by_name.get(name).copied()
    }

    /// Registers a class. `role` overrides the inherited role.
    pub(crate) fn define(
        &mut self,
        def: ClassDef<'brand>,
        default_super: Option<TypeId<'brand>>,
        role: Option<Role>,
    ) -> Result<TypeId<'brand>, HeapError> {
        if self.by_name.contains_key(&def.name) {
            return Err(HeapError::DuplicateType(def.name));
        }
        for (i, field) in def.fields.iter().enumerate() {
            if def.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(HeapError::DuplicateField {
                    type_name: def.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        let (mut fields, mut sealed, inherited_role) = match def.superclass.or(default_super) {
            Some(parent) => {
                let parent = self.get(parent);
                if matches!(parent.kind, TypeKind::Array(_)) {
                    return Err(HeapError::NotAnInstanceType(parent.name.clone()));
                }
                (parent.fields.clone(), parent.sealed.clone(), parent.role)
            }
            None => (Vec::new(), Vec::new(), Role::Plain),
        };

        let mut statics = Vec::new();
        for field in def.fields {
            let slot = if field.is_static {
                statics.push(blank(&field.declared));
                statics.len() - 1
            } else {
                sealed.push(field.sealed);
                sealed.len() - 1
            };
            fields.push(FieldDescriptor::new(
                def.name.clone(),
                field.name,
                field.declared,
                field.is_static,
                slot,
            ));
        }

        Ok(self.push(TypeInfo {
            name: def.name,
            kind: TypeKind::Class,
            role: role.unwrap_or(inherited_role),
            fields,
            sealed,
            statics,
        }))
    }

    /// The array type with the given element type, registered on first use.
    pub(crate) fn array_of(&mut self, element: ElementType<'brand>) -> TypeId<'brand> {
        if let Some(&ty) = self.arrays.get(&element) {
            return ty;
        }
        let name = match element {
            ElementType::Primitive(kind) => format!("{}[]", kind.name()),
            ElementType::Reference(ty) => format!("{}[]", self.get(ty).name),
        };
        let ty = self.push(TypeInfo {
            name,
            kind: TypeKind::Array(element),
            role: Role::Plain,
            fields: Vec::new(),
            sealed: Vec::new(),
            statics: Vec::new(),
        });
        self.arrays.insert(element, ty);
        ty
    }

    fn push(&mut self, info: TypeInfo<'brand>) -> TypeId<'brand> {
        let ty = TypeId::new(self.types.len());
        self.by_name.insert(info.name.clone(), ty);
        self.types.push(info);
        ty
    }
}
