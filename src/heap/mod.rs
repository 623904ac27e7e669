//! An arena-backed managed heap with explicit type tables.
//!
//! The heap is the reference host for the measurement engine. Objects live in
//! one append-only arena and are addressed by branded `ObjectId`s, so identity
//! is the arena index and handles from different heaps cannot be confused.
//!
//! Besides plain instances and arrays, the heap keeps the canonical tables a
//! managed runtime maintains:
//! - an interned string pool
//! - the shared `true` / `false` booleans
//! - small-value box caches for `Byte`, `Short`, `Integer`, `Long` and `Character`
//! - one type-descriptor object per type, and a system type loader
//!
//! # Example
//!
//! ```rust
//! use heapsize::heap::{ClassDef, FieldDef, Heap};
//!
//! Heap::new(|mut heap| {
//!     let node = heap
//!         .define_class(ClassDef::new("Node").field(FieldDef::reference("next", "Node")))
//!         .unwrap();
//!     let a = heap.alloc(node).unwrap();
//!     let b = heap.alloc(node).unwrap();
//!     heap.set_ref(a, "next", Some(b)).unwrap();
//!     assert_eq!(heap.get_ref(a, "next").unwrap(), Some(b));
//! });
//! ```

mod error;
mod types;
mod values;


pub use error::HeapError;
pub use types::{ClassDef, ElementType, FieldDef, TypeId};
pub use values::{Boxed, PrimValue};

use std::collections::HashMap;

use crate::brand::InvariantLifetime;
use crate::model::{
    FieldDescriptor, FieldType, ObjectModel, Primitive, Shape, TypeIntrospector, ValueClass,
};
use crate::SizeError;
use types::{Role, TypeKind, TypeTable};
use values::Slot;

/// A handle to an object in a specific branded heap. Equality is identity.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId<'brand>(u32, InvariantLifetime<'brand>);

impl<'brand> ObjectId<'brand> {
    /// # Panics
    /// Panics if `index` does not fit in a `u32`; truncating would alias two
    /// objects.
    #[inline(always)]
    fn new(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => Self(index, InvariantLifetime::new()),
            Err(_) => panic!("heap index overflow: object {index} exceeds u32::MAX"),
        }
    }

    /// Returns the arena index.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

enum Payload<'brand> {
    Instance(Vec<Slot<'brand>>),
    RefArray(Vec<Option<ObjectId<'brand>>>),
    PrimArray { element: Primitive, data: Vec<u8> },
}

struct HeapObject<'brand> {
    ty: TypeId<'brand>,
    payload: Payload<'brand>,
}

struct Builtins<'brand> {
    object: TypeId<'brand>,
    string: TypeId<'brand>,
    boolean: TypeId<'brand>,
    byte: TypeId<'brand>,
    short: TypeId<'brand>,
    integer: TypeId<'brand>,
    long: TypeId<'brand>,
    character: TypeId<'brand>,
    enumeration: TypeId<'brand>,
    class: TypeId<'brand>,
    class_loader: TypeId<'brand>,
}

// Slot numbers of built-in fields; stable in subtypes because inherited
// fields are numbered first.
const STRING_VALUE: usize = 0;
const BOX_VALUE: usize = 0;
const ENUM_NAME: usize = 0;
const ENUM_ORDINAL: usize = 1;
const CLASS_NAME: usize = 0;

// Arena positions of the objects created during bootstrap.
const FALSE: usize = 0;
const TRUE: usize = 1;
const SYSTEM_LOADER: usize = 2;

/// An arena-backed managed heap.
///
/// Objects and types are addressed by `u32` indices, so one heap holds at most
/// `2^32` objects and `2^32` types. Allocating past that limit panics rather
/// than reusing an identity.
pub struct Heap<'brand> {
    types: TypeTable<'brand>,
    objects: Vec<HeapObject<'brand>>,
    builtins: Builtins<'brand>,
    strings: HashMap<Box<str>, ObjectId<'brand>>,
    boxes: HashMap<Boxed, ObjectId<'brand>>,
    descriptors: HashMap<TypeId<'brand>, ObjectId<'brand>>,
    _brand: InvariantLifetime<'brand>,
}

impl<'brand> Heap<'brand> {
    /// Creates a fresh heap and runs `f` with it.
    ///
    /// The heap's brand is unique to this call, so its handles cannot escape
    /// into or be mixed with another heap.
    pub fn new<F, R>(f: F) -> R
    where
        F: for<'new_brand> FnOnce(Heap<'new_brand>) -> R,
    {
        f(Heap::bootstrap())
    }

    fn bootstrap() -> Self {
        let mut types = TypeTable::default();
        let builtins = Builtins::register(&mut types);
        let mut heap = Heap {
            types,
            objects: Vec::new(),
            builtins,
            strings: HashMap::new(),
            boxes: HashMap::new(),
            descriptors: HashMap::new(),
            _brand: InvariantLifetime::new(),
        };

        let boolean = heap.builtins.boolean;
        for value in [false, true] {
            heap.push(
                boolean,
                Payload::Instance(vec![Slot::Prim(PrimValue::Boolean(value))]),
            );
        }
        let loader = heap.builtins.class_loader;
        let slots = heap.types.get(loader).blank_slots();
        let id = heap.push(loader, Payload::Instance(slots));
        debug_assert_eq!(id.index(), SYSTEM_LOADER);
        heap
    }

    fn push(&mut self, ty: TypeId<'brand>, payload: Payload<'brand>) -> ObjectId<'brand> {
        let id = ObjectId::new(self.objects.len());
        self.objects.push(HeapObject { ty, payload });
        id
    }

    #[inline]
    fn object(&self, obj: ObjectId<'brand>) -> &HeapObject<'brand> {
        &self.objects[obj.index()]
    }

    /// Number of objects allocated so far, including bootstrap objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap holds no objects. Always `false` after bootstrap.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    /// Registers a class.
    ///
    /// # Errors
    /// Fails if the name is taken, a field name repeats within the class, or
    /// the superclass is an array type.
    pub fn define_class(&mut self, def: ClassDef<'brand>) -> Result<TypeId<'brand>, HeapError> {
        self.types.define(def, Some(self.builtins.object), None)
    }

    /// Registers an enumerated type and allocates its constants in order.
    ///
    /// # Errors
    /// Fails if the type name is taken.
    pub fn define_enum(
        &mut self,
        name: &str,
        constants: &[&str],
    ) -> Result<(TypeId<'brand>, Vec<ObjectId<'brand>>), HeapError> {
        let ty = self
            .types
            .define(ClassDef::new(name).extends(self.builtins.enumeration), None, None)?;
        let mut ids = Vec::with_capacity(constants.len());
        for (ordinal, constant) in constants.iter().enumerate() {
            let label = self.intern(constant);
            let mut slots = self.types.get(ty).blank_slots();
            slots[ENUM_NAME] = Slot::Ref(Some(label));
            slots[ENUM_ORDINAL] = Slot::Prim(PrimValue::Int(ordinal as i32));
            ids.push(self.push(ty, Payload::Instance(slots)));
        }
        Ok((ty, ids))
    }

    /// Finds a registered type by name, including array types such as `"int[]"`.
    pub fn lookup_type(&self, name: &str) -> Option<TypeId<'brand>> {
        self.types.lookup(name)
    }

    /// The root `Object` type.
    pub fn object_type(&self) -> TypeId<'brand> {
        self.builtins.object
    }

    /// The array type with the given element type.
    pub fn array_type(&mut self, element: ElementType<'brand>) -> TypeId<'brand> {
        self.types.array_of(element)
    }

    /// Element type of an array type; `None` for classes.
    pub fn element_type(&self, ty: TypeId<'brand>) -> Option<ElementType<'brand>> {
        match self.types.get(ty).kind {
            TypeKind::Array(element) => Some(element),
            TypeKind::Class => None,
        }
    }

    /// The type-descriptor object for `ty`, created on first request.
    pub fn type_descriptor(&mut self, ty: TypeId<'brand>) -> ObjectId<'brand> {
        if let Some(&id) = self.descriptors.get(&ty) {
            return id;
        }
        let name = self.types.get(ty).name.clone();
        let label = self.intern(&name);
        let class = self.builtins.class;
        let mut slots = self.types.get(class).blank_slots();
        slots[CLASS_NAME] = Slot::Ref(Some(label));
        let id = self.push(class, Payload::Instance(slots));
        self.descriptors.insert(ty, id);
        id
    }

    /// The system type loader.
    pub fn system_loader(&self) -> ObjectId<'brand> {
        ObjectId::new(SYSTEM_LOADER)
    }

    // ---------------------------------------------------------------------
    // Instances and fields
    // ---------------------------------------------------------------------

    /// Allocates an instance of `ty` with null references and zero scalars.
    ///
    /// # Errors
    /// Returns [`HeapError::NotAnInstanceType`] for array types.
    pub fn alloc(&mut self, ty: TypeId<'brand>) -> Result<ObjectId<'brand>, HeapError> {
        let info = self.types.get(ty);
        if matches!(info.kind, TypeKind::Array(_)) {
            return Err(HeapError::NotAnInstanceType(info.name.clone()));
        }
        let slots = info.blank_slots();
        Ok(self.push(ty, Payload::Instance(slots)))
    }

    fn instance_field(
        &self,
        obj: ObjectId<'brand>,
        name: &str,
    ) -> Result<&FieldDescriptor, HeapError> {
        let info = self.types.get(self.object(obj).ty);
        info.field(name, false).ok_or_else(|| HeapError::NoSuchField {
            type_name: info.name.clone(),
            field: name.to_owned(),
        })
    }

    fn mismatch(&self, obj: ObjectId<'brand>, name: &str) -> HeapError {
        HeapError::TypeMismatch {
            type_name: self.types.get(self.object(obj).ty).name.clone(),
            field: name.to_owned(),
        }
    }

    fn slots_mut(&mut self, obj: ObjectId<'brand>) -> Result<&mut Vec<Slot<'brand>>, HeapError> {
        let object = &mut self.objects[obj.index()];
        match &mut object.payload {
            Payload::Instance(slots) => Ok(slots),
            _ => Err(HeapError::NotAnInstanceType(
                self.types.get(object.ty).name.clone(),
            )),
        }
    }

    fn slot(&self, obj: ObjectId<'brand>, slot: usize) -> Option<Slot<'brand>> {
        match &self.object(obj).payload {
            Payload::Instance(slots) => slots.get(slot).copied(),
            _ => None,
        }
    }

    /// Stores a reference into the most-derived instance field called `name`.
    ///
    /// # Errors
    /// Fails if there is no such field or it is primitive.
    pub fn set_ref(
        &mut self,
        obj: ObjectId<'brand>,
        name: &str,
        value: Option<ObjectId<'brand>>,
    ) -> Result<(), HeapError> {
        let field = self.instance_field(obj, name)?;
        if !field.is_reference() {
            return Err(self.mismatch(obj, name));
        }
        let slot = field.slot();
        self.slots_mut(obj)?[slot] = Slot::Ref(value);
        Ok(())
    }

    /// Stores a scalar into the most-derived instance field called `name`.
    ///
    /// # Errors
    /// Fails if there is no such field or its kind differs from `value`'s.
    pub fn set_prim(
        &mut self,
        obj: ObjectId<'brand>,
        name: &str,
        value: PrimValue,
    ) -> Result<(), HeapError> {
        let field = self.instance_field(obj, name)?;
        if *field.declared_type() != FieldType::Primitive(value.kind()) {
            return Err(self.mismatch(obj, name));
        }
        let slot = field.slot();
        self.slots_mut(obj)?[slot] = Slot::Prim(value);
        Ok(())
    }

    /// Reads a reference field.
    ///
    /// # Errors
    /// Fails if there is no such field or it is primitive.
    pub fn get_ref(
        &self,
        obj: ObjectId<'brand>,
        name: &str,
    ) -> Result<Option<ObjectId<'brand>>, HeapError> {
        let field = self.instance_field(obj, name)?;
        match self.slot(obj, field.slot()) {
            Some(Slot::Ref(value)) => Ok(value),
            _ => Err(self.mismatch(obj, name)),
        }
    }

    /// Reads a primitive field.
    ///
    /// # Errors
    /// Fails if there is no such field or it holds a reference.
    pub fn get_prim(&self, obj: ObjectId<'brand>, name: &str) -> Result<PrimValue, HeapError> {
        let field = self.instance_field(obj, name)?;
        match self.slot(obj, field.slot()) {
            Some(Slot::Prim(value)) => Ok(value),
            _ => Err(self.mismatch(obj, name)),
        }
    }

    /// Stores a reference into a static field visible from `ty`.
    ///
    /// # Errors
    /// Fails if `ty` has no static reference field called `name`.
    pub fn set_static(
        &mut self,
        ty: TypeId<'brand>,
        name: &str,
        value: Option<ObjectId<'brand>>,
    ) -> Result<(), HeapError> {
        let info = self.types.get(ty);
        let (owner, slot) = match info.field(name, true) {
            Some(field) if field.is_reference() => {
                (field.declaring_type().to_owned(), field.slot())
            }
            Some(_) => {
                return Err(HeapError::TypeMismatch {
                    type_name: info.name.clone(),
                    field: name.to_owned(),
                })
            }
            None => {
                return Err(HeapError::NoSuchField {
                    type_name: info.name.clone(),
                    field: name.to_owned(),
                })
            }
        };
        let owner = self
            .types
            .lookup(&owner)
            .ok_or_else(|| HeapError::NotAnInstanceType(owner.clone()))?;
        self.types.get_mut(owner).statics[slot] = Slot::Ref(value);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Arrays
    // ---------------------------------------------------------------------

    /// Allocates an array of references to `element_type`.
    pub fn alloc_ref_array(
        &mut self,
        element_type: TypeId<'brand>,
        elements: Vec<Option<ObjectId<'brand>>>,
    ) -> ObjectId<'brand> {
        let ty = self.types.array_of(ElementType::Reference(element_type));
        self.push(ty, Payload::RefArray(elements))
    }

    /// Allocates a zero-filled array of `len` scalars.
    pub fn alloc_prim_array(&mut self, element: Primitive, len: usize) -> ObjectId<'brand> {
        let data = vec![0; len * element.size() as usize];
        self.prim_array(element, data)
    }

    fn prim_array(&mut self, element: Primitive, data: Vec<u8>) -> ObjectId<'brand> {
        let ty = self.types.array_of(ElementType::Primitive(element));
        self.push(ty, Payload::PrimArray { element, data })
    }

    /// Replaces one element of a reference array.
    ///
    /// # Errors
    /// Fails if `array` is not a reference array or `index` is out of range.
    pub fn set_element(
        &mut self,
        array: ObjectId<'brand>,
        index: usize,
        value: Option<ObjectId<'brand>>,
    ) -> Result<(), HeapError> {
        match &mut self.objects[array.index()].payload {
            Payload::RefArray(elements) => {
                let len = elements.len();
                let slot = elements
                    .get_mut(index)
                    .ok_or(HeapError::IndexOutOfBounds { index, len })?;
                *slot = value;
                Ok(())
            }
            _ => Err(HeapError::NotAnArray),
        }
    }

    // ---------------------------------------------------------------------
    // Canonical values
    // ---------------------------------------------------------------------

    fn alloc_string(&mut self, text: &str) -> ObjectId<'brand> {
        let bytes = self.prim_array(Primitive::Byte, text.as_bytes().to_vec());
        let string = self.builtins.string;
        let mut slots = self.types.get(string).blank_slots();
        slots[STRING_VALUE] = Slot::Ref(Some(bytes));
        self.push(string, Payload::Instance(slots))
    }

    /// The interned string with this content, allocated on first request.
    pub fn intern(&mut self, text: &str) -> ObjectId<'brand> {
        if let Some(&id) = self.strings.get(text) {
            return id;
        }
        let id = self.alloc_string(text);
        self.strings.insert(text.into(), id);
        id
    }

    /// A fresh string that is never the interned representative.
    pub fn new_string(&mut self, text: &str) -> ObjectId<'brand> {
        self.alloc_string(text)
    }

    /// Content of a string object.
    pub fn string_content(&self, obj: ObjectId<'brand>) -> Option<&str> {
        if self.types.get(self.object(obj).ty).role != Role::Str {
            return None;
        }
        let Some(Slot::Ref(Some(bytes))) = self.slot(obj, STRING_VALUE) else {
            return None;
        };
        match &self.object(bytes).payload {
            Payload::PrimArray { data, .. } => core::str::from_utf8(data).ok(),
            _ => None,
        }
    }

    /// The shared boolean instance for `value`.
    pub fn boolean(&self, value: bool) -> ObjectId<'brand> {
        ObjectId::new(if value { TRUE } else { FALSE })
    }

    /// A fresh boolean box that is not the shared instance.
    pub fn new_boolean(&mut self, value: bool) -> ObjectId<'brand> {
        self.push(
            self.builtins.boolean,
            Payload::Instance(vec![Slot::Prim(PrimValue::Boolean(value))]),
        )
    }

    /// Boxes `value`, returning the cached box when the value is in the cache
    /// range and a fresh box otherwise.
    pub fn boxed(&mut self, value: Boxed) -> ObjectId<'brand> {
        if !value.is_cached() {
            return self.new_boxed(value);
        }
        if let Some(&id) = self.boxes.get(&value) {
            return id;
        }
        let id = self.new_boxed(value);
        self.boxes.insert(value, id);
        id
    }

    /// A fresh box that is never the cached instance.
    pub fn new_boxed(&mut self, value: Boxed) -> ObjectId<'brand> {
        let ty = self.builtins.box_type(value.kind());
        self.push(ty, Payload::Instance(vec![Slot::Prim(value.to_prim())]))
    }

    fn canonical_box(&self, obj: ObjectId<'brand>) -> Option<ObjectId<'brand>> {
        let Some(Slot::Prim(value)) = self.slot(obj, BOX_VALUE) else {
            return None;
        };
        let boxed = Boxed::from_prim(value)?;
        self.boxes.get(&boxed).copied()
    }

    fn canonical_boolean(&self, obj: ObjectId<'brand>) -> Option<ObjectId<'brand>> {
        match self.slot(obj, BOX_VALUE) {
            Some(Slot::Prim(PrimValue::Boolean(value))) => Some(self.boolean(value)),
            _ => None,
        }
    }
}

impl<'brand> Builtins<'brand> {
    fn register(types: &mut TypeTable<'brand>) -> Self {
        let mut define = |def: ClassDef<'brand>, parent: Option<TypeId<'brand>>, role: Role| {
            match types.define(def, parent, Some(role)) {
                Ok(ty) => ty,
                // The table is empty and every built-in name is distinct.
                Err(err) => unreachable!("built-in type registration failed: {err}"),
            }
        };

        let object = define(ClassDef::new("Object"), None, Role::Plain);
        let root = Some(object);
        let string = define(
            ClassDef::new("String")
                .field(FieldDef::reference("value", "byte[]"))
                .field(FieldDef::primitive("hash", Primitive::Int)),
            root,
            Role::Str,
        );
        let boolean = define(
            ClassDef::new("Boolean").field(FieldDef::primitive("value", Primitive::Boolean)),
            root,
            Role::Boolean,
        );
        let mut boxed = |name: &str, kind: Primitive| {
            define(
                ClassDef::new(name).field(FieldDef::primitive("value", kind)),
                root,
                Role::Boxed,
            )
        };
        let byte = boxed("Byte", Primitive::Byte);
        let short = boxed("Short", Primitive::Short);
        let integer = boxed("Integer", Primitive::Int);
        let long = boxed("Long", Primitive::Long);
        let character = boxed("Character", Primitive::Char);
        let enumeration = define(
            ClassDef::new("Enum")
                .field(FieldDef::reference("name", "String"))
                .field(FieldDef::primitive("ordinal", Primitive::Int)),
            root,
            Role::Enum,
        );
        let class = define(
            ClassDef::new("Class").field(FieldDef::reference("name", "String")),
            root,
            Role::TypeDescriptor,
        );
        let class_loader = define(
            ClassDef::new("ClassLoader").field(FieldDef::reference("parent", "ClassLoader")),
            root,
            Role::TypeLoader,
        );

        Self {
            object,
            string,
            boolean,
            byte,
            short,
            integer,
            long,
            character,
            enumeration,
            class,
            class_loader,
        }
    }

    fn box_type(&self, kind: Primitive) -> TypeId<'brand> {
        match kind {
            Primitive::Byte => self.byte,
            Primitive::Short => self.short,
            Primitive::Char => self.character,
            Primitive::Long => self.long,
            _ => self.integer,
        }
    }
}

impl<'brand> ObjectModel for Heap<'brand> {
    type Handle = ObjectId<'brand>;
    type Type = TypeId<'brand>;

    fn type_of(&self, obj: ObjectId<'brand>) -> Result<TypeId<'brand>, SizeError> {
        Ok(self.object(obj).ty)
    }

    fn type_name(&self, ty: TypeId<'brand>) -> &str {
        &self.types.get(ty).name
    }

    fn identity(&self, obj: ObjectId<'brand>) -> u64 {
        obj.index() as u64
    }

    fn shape(&self, obj: ObjectId<'brand>) -> Result<Shape<'_, ObjectId<'brand>>, SizeError> {
        Ok(match &self.object(obj).payload {
            Payload::Instance(_) => Shape::Instance,
            Payload::RefArray(elements) => Shape::ReferenceArray(elements),
            Payload::PrimArray { element, data } => Shape::PrimitiveArray {
                element: *element,
                len: data.len() / element.size() as usize,
            },
        })
    }

    fn value_class(&self, obj: ObjectId<'brand>) -> Result<ValueClass<ObjectId<'brand>>, SizeError> {
        let object = self.object(obj);
        if !matches!(object.payload, Payload::Instance(_)) {
            return Ok(ValueClass::Other);
        }
        Ok(match self.types.get(object.ty).role {
            Role::Plain => ValueClass::Other,
            Role::Enum => ValueClass::EnumConstant,
            Role::Str => ValueClass::Str {
                canonical: self
                    .string_content(obj)
                    .and_then(|text| self.strings.get(text).copied()),
            },
            Role::Boolean => ValueClass::Boolean {
                canonical: self.canonical_boolean(obj),
            },
            Role::Boxed => ValueClass::Boxed {
                canonical: self.canonical_box(obj),
            },
            Role::TypeDescriptor => ValueClass::TypeDescriptor,
            Role::TypeLoader => ValueClass::TypeLoader,
        })
    }
}

impl<'brand> TypeIntrospector for Heap<'brand> {
    fn fields_of(&self, ty: TypeId<'brand>) -> Result<&[FieldDescriptor], SizeError> {
        Ok(&self.types.get(ty).fields)
    }

    fn read_field(
        &self,
        obj: ObjectId<'brand>,
        field: &FieldDescriptor,
    ) -> Result<Option<ObjectId<'brand>>, SizeError> {
        let slot = if field.is_static() {
            self.types
                .lookup(field.declaring_type())
                .and_then(|owner| self.types.get(owner).statics.get(field.slot()).copied())
        } else {
            let info = self.types.get(self.object(obj).ty);
            if info.sealed.get(field.slot()).copied().unwrap_or(false) {
                return Err(SizeError::access_denied(field.declaring_type(), field.name()));
            }
            self.slot(obj, field.slot())
        };
        Ok(match slot {
            Some(Slot::Ref(value)) => value,
            _ => None,
        })
    }
}
