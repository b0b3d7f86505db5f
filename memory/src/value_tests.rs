use crate::{Heap, Key, Table, Value};
use proptest::prelude::*;

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_falsey_is_only_nil_and_false() {
    assert!(Value::nil().is_falsey());
    assert!(Value::false_val().is_falsey());
    assert!(Value::true_val().is_truthy());
    assert!(Value::int(0).is_truthy());
    assert!(Value::number(0.0).is_truthy());
}

#[test]
fn test_as_int_truncates_floats() {
    assert_eq!(Value::number(3.9).as_int(), Some(3));
    assert_eq!(Value::number(-3.9).as_int(), Some(-3));
    assert_eq!(Value::number(f64::NAN).as_int(), None);
    assert_eq!(Value::number(f64::MAX).as_int(), None);
    assert_eq!(Value::nil().as_int(), None);
}

#[test]
fn test_type_names() {
    assert_eq!(Value::int(1).type_name(), "number");
    assert_eq!(Value::number(1.5).type_name(), "number");
    assert_eq!(Value::native(0).type_name(), "function");
    assert_eq!(Value::closure(0).type_name(), "function");
    assert_eq!(Value::default().type_name(), "nil");
}

#[test]
fn test_handles() {
    assert_eq!(Value::table(4).as_handle(), Some(4));
    assert!(Value::int(4).as_handle().is_none());
    assert!(Value::string(0).is_obj());
}

// ============================================================================
// Heap
// ============================================================================

#[test]
fn test_interning_gives_equal_handles() {
    let mut heap = Heap::new();
    let a = heap.string_value(b"hello");
    let b = heap.string_value(b"hello");
    let c = heap.string_value(b"world");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(heap.string_count(), 2);
}

#[test]
fn test_strings_are_raw_bytes() {
    let mut heap = Heap::new();
    let h = heap.intern(&[0xff, 0x00, b'a']);
    assert_eq!(heap.get_bytes(h), Some(&[0xff, 0x00, b'a'][..]));
}

#[test]
fn test_cells_are_shared_by_handle() {
    let mut heap = Heap::new();
    let c = heap.alloc_cell(Value::int(1));
    heap.set_cell(c, Value::int(2));
    assert_eq!(heap.get_cell(c), Value::int(2));
}

#[test]
fn test_table_keys_by_interned_string() {
    let mut heap = Heap::new();
    let k1 = heap.string_value(b"x");
    let t = heap.alloc_table(Table::new());
    heap.get_table_mut(t)
        .unwrap()
        .set(Key::from_value(k1).unwrap(), Value::int(9));
    let k2 = heap.string_value(b"x");
    assert_eq!(heap.get_table(t).unwrap().get_value(k2), Value::int(9));
}

proptest! {
    #[test]
    fn prop_sequential_pushes_form_array(n in 0usize..64) {
        let mut t = Table::new();
        for i in 0..n {
            t.push(Value::int(i as i64));
        }
        prop_assert_eq!(t.len(), n);
        for i in 0..n {
            prop_assert_eq!(t.get_int(i as i64 + 1), Value::int(i as i64));
        }
    }

    #[test]
    fn prop_key_roundtrip_for_ints(i in any::<i64>()) {
        let k = Key::from_value(Value::int(i)).unwrap();
        prop_assert_eq!(k.to_value(), Value::int(i));
    }
}
