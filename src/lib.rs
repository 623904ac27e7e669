//! # `heapsize` - Deep-Size Measurement for Managed Object Graphs
//!
//! Measures the total retained footprint of an object graph: the shallow size
//! of every object reachable from a root, each counted once, with shared
//! canonical instances ("flyweights") left out when they are reached through a
//! reference.
//!
//! ## Architecture
//!
//! The engine is host-agnostic. A host runtime plugs in through three seams:
//!
//! 1. **Object model** ([`model::ObjectModel`], [`model::TypeIntrospector`]):
//!    - identity-comparable handles
//!    - array shapes and canonical-value categories
//!    - ancestor-first field tables and field reads
//!
//! 2. **Footprint oracle** ([`oracle::FootprintOracle`]):
//!    - shallow size of one object
//!    - [`oracle::LayoutOracle`] derives it from a [`oracle::LayoutConfig`]
//!
//! 3. **Visitor** ([`visitor::Visitor`]):
//!    - push/pop notifications in strict stack order
//!    - [`visitor::NullVisitor`] and [`visitor::TreeDump`] adapters
//!
//! [`heap::Heap`] is a complete reference host: a branded, arena-backed heap
//! with interned strings, shared booleans, small-value box caches, type
//! descriptors and a system type loader.
//!
//! ## Guarantees
//!
//! - **Identity deduplication**: cycles terminate and shared objects are
//!   charged once, on first touch.
//! - **Root exemption**: the root is always charged its full shallow size,
//!   even when it is a flyweight.
//! - **Determinism**: fields are visited ancestor-first in declaration order.
//! - **All-or-nothing**: any failure aborts the measurement with an error.
//!
//! ## Example
//!
//! ```rust
//! use heapsize::heap::{ClassDef, FieldDef, Heap};
//! use heapsize::oracle::LayoutOracle;
//! use heapsize::DeepSizer;
//!
//! Heap::new(|mut heap| {
//!     let node = heap
//!         .define_class(ClassDef::new("Node").field(FieldDef::reference("next", "Node")))
//!         .unwrap();
//!     let a = heap.alloc(node).unwrap();
//!     let b = heap.alloc(node).unwrap();
//!     heap.set_ref(a, "next", Some(b)).unwrap();
//!     heap.set_ref(b, "next", Some(a)).unwrap();
//!
//!     let oracle = LayoutOracle::default();
//!     let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
//!     assert_eq!(sizer.deep_size_of(a).unwrap(), 32);
//! });
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

macro_rules! trace_event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            tracing::$level!($($arg)+);
        }
    };
}

pub mod brand;
pub mod error;
pub mod flyweight;
pub mod heap;
pub mod model;
pub mod oracle;
pub mod traversal;
pub mod visitor;

pub use error::SizeError;
pub use flyweight::FlyweightClassifier;
pub use heap::{Heap, HeapError, ObjectId, TypeId};
pub use model::{FieldDescriptor, FieldType, ObjectModel, Primitive, Shape, TypeIntrospector, ValueClass};
pub use oracle::{FootprintOracle, LayoutConfig, LayoutOracle};
pub use traversal::DeepSizer;
pub use visitor::{NullVisitor, Observed, TreeDump, Visitor};

// Compile-time assertions for handle layout.
const _: () = {
    use core::mem;

    // Brands are zero-sized, so handles are plain indices.
    assert!(mem::size_of::<brand::InvariantLifetime<'static>>() == 0);
    assert!(mem::size_of::<ObjectId<'static>>() == mem::size_of::<u32>());
    assert!(mem::size_of::<Option<ObjectId<'static>>>() <= mem::size_of::<u64>());
};
