use std::io;

use super::*;
use crate::heap::{Boxed, ClassDef, FieldDef, Heap, ObjectId, TypeId};
use crate::model::{FieldType, ObjectModel, Primitive};
use crate::oracle::LayoutOracle;

/// Charges every object the same number of bytes.
struct Fixed(u64);

impl<M: ObjectModel + ?Sized> FootprintOracle<M> for Fixed {
    fn shallow_size(&self, _model: &M, _obj: M::Handle) -> Result<u64, SizeError> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Start(String, usize, u64),
    End(String, usize, u64),
    FieldStart(String, usize),
    FieldEnd(String, usize),
}

#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl<M: ObjectModel + ?Sized> Visitor<M> for Recorder {
    fn start_object(&mut self, obj: Observed<'_, M>, level: usize, bytes: u64) -> Result<(), SizeError> {
        let name = obj.type_name().unwrap_or("null").to_owned();
        self.events.push(Event::Start(name, level, bytes));
        Ok(())
    }

    fn end_object(&mut self, obj: Observed<'_, M>, level: usize, bytes: u64) -> Result<(), SizeError> {
        let name = obj.type_name().unwrap_or("null").to_owned();
        self.events.push(Event::End(name, level, bytes));
        Ok(())
    }

    fn start_field(&mut self, name: &str, _declared: &FieldType, level: usize) -> Result<(), SizeError> {
        self.events.push(Event::FieldStart(name.to_owned(), level));
        Ok(())
    }

    fn end_field(&mut self, name: &str, _declared: &FieldType, level: usize) -> Result<(), SizeError> {
        self.events.push(Event::FieldEnd(name.to_owned(), level));
        Ok(())
    }
}

impl Recorder {
    /// Checks that the events form a well-nested tree and returns the
    /// deepest level seen.
    fn assert_nested(&self) -> usize {
        let mut stack: Vec<&Event> = Vec::new();
        let mut deepest = 0;
        for event in &self.events {
            match event {
                Event::Start(_, level, _) | Event::FieldStart(_, level) => {
                    deepest = deepest.max(*level);
                    stack.push(event);
                }
                Event::End(name, level, _) => match stack.pop() {
                    Some(Event::Start(open, open_level, _)) => {
                        assert_eq!((open, open_level), (name, level));
                    }
                    other => panic!("unbalanced end_object: {other:?}"),
                },
                Event::FieldEnd(name, level) => match stack.pop() {
                    Some(Event::FieldStart(open, open_level)) => {
                        assert_eq!((open, open_level), (name, level));
                    }
                    other => panic!("unbalanced end_field: {other:?}"),
                },
            }
        }
        assert!(stack.is_empty(), "unclosed events: {stack:?}");
        deepest
    }
}

/// Fails on the first object entered at `level`.
struct FailAt(usize);

impl<M: ObjectModel + ?Sized> Visitor<M> for FailAt {
    fn start_object(&mut self, _obj: Observed<'_, M>, level: usize, _bytes: u64) -> Result<(), SizeError> {
        if level == self.0 {
            return Err(io::Error::new(io::ErrorKind::Other, "visitor gave up").into());
        }
        Ok(())
    }
}

fn node_type<'b>(heap: &mut Heap<'b>) -> TypeId<'b> {
    heap.define_class(ClassDef::new("Node").field(FieldDef::reference("next", "Node")))
        .unwrap()
}

fn link<'b>(heap: &mut Heap<'b>, from: ObjectId<'b>, to: ObjectId<'b>) {
    heap.set_ref(from, "next", Some(to)).unwrap();
}

#[test]
fn test_acyclic_chain_sums_shallow_sizes() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let a = heap.alloc(node).unwrap();
        let b = heap.alloc(node).unwrap();
        let c = heap.alloc(node).unwrap();
        link(&mut heap, a, b);
        link(&mut heap, b, c);

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        assert_eq!(sizer.deep_size_of(a).unwrap(), 48);
        assert_eq!(sizer.deep_size_of(c).unwrap(), 16);
        // Each call starts from an empty visited set.
        assert_eq!(sizer.deep_size_of(a).unwrap(), 48);
    });
}

#[test]
fn test_cycles_terminate() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let a = heap.alloc(node).unwrap();
        let b = heap.alloc(node).unwrap();
        let lone = heap.alloc(node).unwrap();
        link(&mut heap, a, b);
        link(&mut heap, b, a);
        link(&mut heap, lone, lone);

        let oracle = Fixed(10);
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        assert_eq!(sizer.deep_size_of(a).unwrap(), 20);
        assert_eq!(sizer.deep_size_of(b).unwrap(), 20);
        assert_eq!(sizer.deep_size_of(lone).unwrap(), 10);
    });
}

#[test]
fn test_null_root_needs_no_oracle() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let a = heap.alloc(node).unwrap();

        let mut sizer = DeepSizer::new(&heap);
        assert_eq!(sizer.deep_size_of(None).unwrap(), 0);
        assert!(matches!(sizer.deep_size_of(a), Err(SizeError::OracleUnavailable)));
        assert!(matches!(sizer.shallow_size_of(a), Err(SizeError::OracleUnavailable)));
    });
}

#[test]
fn test_root_is_exempt_from_flyweight_rules() {
    Heap::new(|mut heap| {
        let cached = heap.boxed(Boxed::Int(1));
        let interned = heap.intern("abc");
        let loader = heap.system_loader();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        assert_eq!(sizer.deep_size_of(cached).unwrap(), 16);
        // 24 (string) + 24 (byte[3]); the backing array is not itself shared.
        assert_eq!(sizer.deep_size_of(interned).unwrap(), 48);
        // The loader's parent is null.
        assert_eq!(sizer.deep_size_of(loader).unwrap(), 16);
    });
}

#[test]
fn test_flyweight_field_costs_nothing_but_is_observed() {
    Heap::new(|mut heap| {
        let holder = heap
            .define_class(ClassDef::new("Holder").field(FieldDef::reference("count", "Integer")))
            .unwrap();
        let obj = heap.alloc(holder).unwrap();
        let count = heap.boxed(Boxed::Int(42));
        heap.set_ref(obj, "count", Some(count)).unwrap();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(Recorder::default());
        assert_eq!(sizer.deep_size_of(obj).unwrap(), 16);
        assert_eq!(
            sizer.into_visitor().events,
            vec![
                Event::Start("Holder".into(), 0, 16),
                Event::FieldStart("count".into(), 1),
                Event::Start("Integer".into(), 1, 0),
                Event::End("Integer".into(), 1, 0),
                Event::FieldEnd("count".into(), 1),
                Event::End("Holder".into(), 0, 16),
            ]
        );
    });
}

#[test]
fn test_cached_box_and_fresh_string() {
    Heap::new(|mut heap| {
        let g = heap
            .define_class(
                ClassDef::new("G")
                    .field(FieldDef::reference("x", "Integer"))
                    .field(FieldDef::reference("y", "String")),
            )
            .unwrap();
        let obj = heap.alloc(g).unwrap();
        let x = heap.boxed(Boxed::Int(5));
        let y = heap.new_string("fresh");
        heap.set_ref(obj, "x", Some(x)).unwrap();
        heap.set_ref(obj, "y", Some(y)).unwrap();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        let shallow = sizer.shallow_size_of(obj).unwrap();
        let string = sizer.deep_size_of(y).unwrap();
        assert_eq!(sizer.deep_size_of(obj).unwrap(), shallow + string);
        assert_eq!(shallow + string, 24 + 48);
    });
}

#[test]
fn test_shared_child_is_charged_once() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let pair = heap
            .define_class(
                ClassDef::new("L")
                    .field(FieldDef::reference("left", "Node"))
                    .field(FieldDef::reference("right", "Node")),
            )
            .unwrap();
        let l = heap.alloc(pair).unwrap();
        let c = heap.alloc(node).unwrap();
        heap.set_ref(l, "left", Some(c)).unwrap();
        heap.set_ref(l, "right", Some(c)).unwrap();

        let oracle = LayoutOracle::default();
        let mut recorder = Recorder::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(&mut recorder);
        assert_eq!(sizer.deep_size_of(l).unwrap(), 24 + 16);
        drop(sizer);

        let starts: Vec<_> = recorder
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Start(name, _, bytes) if name == "Node" => Some(*bytes),
                _ => None,
            })
            .collect();
        // Second touch is still reported, at zero cost.
        assert_eq!(starts, vec![16, 0]);
    });
}

#[test]
fn test_reference_array_elements() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let a = heap.alloc(node).unwrap();
        let b = heap.alloc(node).unwrap();
        let array = heap.alloc_ref_array(node, vec![Some(a), Some(a), None, Some(b)]);
        let ints = heap.alloc_prim_array(Primitive::Int, 10);

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(Recorder::default());
        // 16 + 4 * 4 for the array, then a and b once each.
        assert_eq!(sizer.deep_size_of(array).unwrap(), 32 + 16 + 16);
        assert_eq!(sizer.visitor().assert_nested(), 2);
        assert!(sizer
            .visitor()
            .events
            .contains(&Event::Start("null".into(), 1, 0)));

        sizer.visitor_mut().events.clear();
        assert_eq!(sizer.deep_size_of(ints).unwrap(), 56);
        assert_eq!(sizer.visitor().events.len(), 2);
    });
}

#[test]
fn test_static_fields_are_skipped() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let registry = heap
            .define_class(ClassDef::new("Registry").field(FieldDef::reference("all", "Node").into_static()))
            .unwrap();
        let big = heap.alloc(node).unwrap();
        heap.set_static(registry, "all", Some(big)).unwrap();
        let obj = heap.alloc(registry).unwrap();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(Recorder::default());
        assert_eq!(sizer.deep_size_of(obj).unwrap(), 16);
        assert_eq!(sizer.visitor().events.len(), 2);
    });
}

#[test]
fn test_shared_runtime_objects_below_the_root() {
    Heap::new(|mut heap| {
        let (color, constants) = heap.define_enum("Color", &["RED"]).unwrap();
        let meta = heap
            .define_class(
                ClassDef::new("Meta")
                    .field(FieldDef::reference("color", "Color"))
                    .field(FieldDef::reference("kind", "Class"))
                    .field(FieldDef::reference("loader", "ClassLoader"))
                    .field(FieldDef::reference("flag", "Boolean")),
            )
            .unwrap();
        let obj = heap.alloc(meta).unwrap();
        let descriptor = heap.type_descriptor(color);
        let loader = heap.system_loader();
        let flag = heap.boolean(true);
        heap.set_ref(obj, "color", Some(constants[0])).unwrap();
        heap.set_ref(obj, "kind", Some(descriptor)).unwrap();
        heap.set_ref(obj, "loader", Some(loader)).unwrap();
        heap.set_ref(obj, "flag", Some(flag)).unwrap();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        // 12 + 4 * 4 = 28, aligned to 32.
        assert_eq!(sizer.deep_size_of(obj).unwrap(), 32);
    });
}

#[test]
fn test_caller_interned_objects() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let holder = heap
            .define_class(
                ClassDef::new("Holder")
                    .field(FieldDef::reference("node", "Node"))
                    .field(FieldDef::reference("label", "String")),
            )
            .unwrap();
        let obj = heap.alloc(holder).unwrap();
        let shared = heap.alloc(node).unwrap();
        let label = heap.new_string("x");
        heap.set_ref(obj, "node", Some(shared)).unwrap();
        heap.set_ref(obj, "label", Some(label)).unwrap();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_interned([shared, label]);
        // The node is free; the string's own category says it is not
        // canonical, so the list does not apply to it.
        assert_eq!(sizer.deep_size_of(obj).unwrap(), 24 + 24 + 24);
        assert_eq!(sizer.deep_size_of(shared).unwrap(), 16);
    });
}

#[test]
fn test_access_denied_aborts() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let vault = heap
            .define_class(
                ClassDef::new("Vault")
                    .field(FieldDef::reference("open", "Node"))
                    .field(FieldDef::reference("secret", "Node").sealed()),
            )
            .unwrap();
        let obj = heap.alloc(vault).unwrap();
        let child = heap.alloc(node).unwrap();
        heap.set_ref(obj, "open", Some(child)).unwrap();

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        let err = sizer.deep_size_of(obj).unwrap_err();
        assert!(matches!(err, SizeError::AccessDenied { ref field, .. } if field == "secret"));
    });
}

#[test]
fn test_visitor_errors_propagate() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let a = heap.alloc(node).unwrap();
        let b = heap.alloc(node).unwrap();
        link(&mut heap, a, b);

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(FailAt(1));
        let err = sizer.deep_size_of(a).unwrap_err();
        assert!(matches!(err, SizeError::Visitor(_)));
        assert_eq!(sizer.deep_size_of(b).unwrap_err().to_string(), err.to_string());
    });
}

#[test]
fn test_events_nest_with_levels() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let tree = heap
            .define_class(
                ClassDef::new("Tree")
                    .field(FieldDef::primitive("weight", Primitive::Long))
                    .field(FieldDef::reference("left", "Tree"))
                    .field(FieldDef::reference("right", "Tree"))
                    .field(FieldDef::reference("leaves", "Node[]")),
            )
            .unwrap();
        let root = heap.alloc(tree).unwrap();
        let left = heap.alloc(tree).unwrap();
        let right = heap.alloc(tree).unwrap();
        let leaf = heap.alloc(node).unwrap();
        let leaves = heap.alloc_ref_array(node, vec![Some(leaf), None]);
        heap.set_ref(root, "left", Some(left)).unwrap();
        heap.set_ref(root, "right", Some(right)).unwrap();
        heap.set_ref(left, "right", Some(root)).unwrap();
        heap.set_ref(right, "leaves", Some(leaves)).unwrap();

        let oracle = Fixed(8);
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(Recorder::default());
        assert_eq!(sizer.deep_size_of(root).unwrap(), 8 * 5);

        let recorder = sizer.into_visitor();
        // root(0) -> right(1) -> leaves(2) -> leaf(3) -> next(4)
        assert_eq!(recorder.assert_nested(), 4);
        assert_eq!(recorder.events.first(), Some(&Event::Start("Tree".into(), 0, 8)));
        assert_eq!(recorder.events.last(), Some(&Event::End("Tree".into(), 0, 40)));
        assert!(recorder.events.contains(&Event::FieldStart("weight".into(), 1)));
    });
}

#[test]
fn test_flyweight_array_elements_cost_nothing() {
    Heap::new(|mut heap| {
        let string = heap.lookup_type("String").unwrap();
        let a = heap.intern("a");
        let fresh = heap.new_string("b");
        let strings = heap.alloc_ref_array(string, vec![Some(a), Some(fresh), Some(a)]);

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap)
            .with_oracle(&oracle)
            .with_visitor(Recorder::default());
        let shallow = sizer.shallow_size_of(strings).unwrap();
        let fresh_bytes = sizer.deep_size_of(fresh).unwrap();
        assert_eq!((shallow, fresh_bytes), (32, 48));

        sizer.visitor_mut().events.clear();
        assert_eq!(sizer.deep_size_of(strings).unwrap(), shallow + fresh_bytes);
        let recorder = sizer.into_visitor();
        recorder.assert_nested();
        let elements: Vec<_> = recorder
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Start(name, 1, bytes) => Some((name.as_str(), *bytes)),
                _ => None,
            })
            .collect();
        assert_eq!(elements, vec![("String", 0), ("String", 24), ("String", 0)]);
        assert_eq!(
            recorder
                .events
                .iter()
                .filter(|e| **e == Event::End("String".into(), 1, 0))
                .count(),
            2
        );
    });
}

#[test]
fn test_runtime_flyweights_in_object_array() {
    Heap::new(|mut heap| {
        let (color, constants) = heap.define_enum("Color", &["RED"]).unwrap();
        let object = heap.object_type();
        let elements = vec![
            Some(heap.boxed(Boxed::Int(1))),
            Some(constants[0]),
            Some(heap.boolean(true)),
            Some(heap.type_descriptor(color)),
            Some(heap.system_loader()),
        ];
        let array = heap.alloc_ref_array(object, elements);

        let oracle = LayoutOracle::default();
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        // 16 + 5 * 4 = 36, aligned to 40; every element is canonical.
        assert_eq!(sizer.deep_size_of(array).unwrap(), 40);
    });
}

#[test]
fn test_total_overflow_is_an_error() {
    Heap::new(|mut heap| {
        let node = node_type(&mut heap);
        let a = heap.alloc(node).unwrap();
        let b = heap.alloc(node).unwrap();
        link(&mut heap, a, b);

        let oracle = Fixed(u64::MAX / 2 + 1);
        let mut sizer = DeepSizer::new(&heap).with_oracle(&oracle);
        assert_eq!(sizer.deep_size_of(b).unwrap(), u64::MAX / 2 + 1);
        assert!(matches!(sizer.deep_size_of(a), Err(SizeError::Overflow)));
    });
}
