//! Prints the measurement tree of a small object graph.
//!
//! ```text
//! cargo run --example dump_tree [layout.json]
//! ```
//!
//! The optional argument is a JSON `LayoutConfig`; missing keys keep their
//! compressed-reference defaults.

use std::fs;

use anyhow::{Context, Result};
use heapsize::heap::{Boxed, ClassDef, FieldDef, Heap};
use heapsize::model::Primitive;
use heapsize::oracle::{LayoutConfig, LayoutOracle};
use heapsize::{DeepSizer, TreeDump};

fn load_layout() -> Result<LayoutConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(LayoutConfig::default());
    };
    let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    LayoutConfig::from_json(&json).with_context(|| format!("parsing {path}"))
}

fn main() -> Result<()> {
    let oracle = LayoutOracle::new(load_layout()?)?;

    Heap::new(|mut heap| -> Result<()> {
        let (level_type, levels) = heap.define_enum("Level", &["LOW", "HIGH"])?;
        let entry = heap.define_class(
            ClassDef::new("Entry")
                .field(FieldDef::reference("key", "String"))
                .field(FieldDef::reference("count", "Integer"))
                .field(FieldDef::reference("level", "Level"))
                .field(FieldDef::reference("next", "Entry"))
                .field(FieldDef::primitive("hash", Primitive::Int)),
        )?;
        let table = heap.define_class(
            ClassDef::new("Table")
                .field(FieldDef::reference("buckets", "Entry[]"))
                .field(FieldDef::reference("kind", "Class"))
                .field(FieldDef::primitive("size", Primitive::Int)),
        )?;

        let first = heap.alloc(entry)?;
        let second = heap.alloc(entry)?;
        let key = heap.intern("alpha");
        let fresh_key = heap.new_string("beta");
        let small = heap.boxed(Boxed::Int(1));
        let large = heap.boxed(Boxed::Int(100_000));
        heap.set_ref(first, "key", Some(key))?;
        heap.set_ref(first, "count", Some(small))?;
        heap.set_ref(first, "level", Some(levels[0]))?;
        heap.set_ref(first, "next", Some(second))?;
        heap.set_ref(second, "key", Some(fresh_key))?;
        heap.set_ref(second, "count", Some(large))?;
        heap.set_ref(second, "level", Some(levels[1]))?;
        heap.set_ref(second, "next", Some(first))?;

        let buckets = heap.alloc_ref_array(entry, vec![Some(first), None, Some(second)]);
        let root = heap.alloc(table)?;
        let descriptor = heap.type_descriptor(level_type);
        heap.set_ref(root, "buckets", Some(buckets))?;
        heap.set_ref(root, "kind", Some(descriptor))?;

        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(TreeDump::stdout());
        let total = sizer.deep_size_of(root)?;
        println!("total: {total} bytes");
        Ok(())
    })
}
