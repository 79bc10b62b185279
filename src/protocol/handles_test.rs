use crate::protocol::handles::HandleTable;
use crate::runtime::value::Value;

#[test]
fn handles_are_strictly_increasing_and_distinct() {
    let mut table = HandleTable::new();
    let handles: Vec<u64> = (0..10).map(|i| table.allocate(Value::Int(i))).collect();
    for pair in handles.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert_eq!(table.len(), 10);
}

#[test]
fn release_removes_exactly_one_entry() {
    let mut table = HandleTable::new();
    let a = table.allocate(Value::str("a"));
    let b = table.allocate(Value::str("b"));
    table.release(a).unwrap();
    assert!(table.lookup(a).is_none());
    assert_eq!(table.lookup(b), Some(&Value::str("b")));
}

#[test]
fn releasing_an_unknown_handle_reports_an_error() {
    let mut table = HandleTable::new();
    let err = table.release(7).unwrap_err();
    assert!(err.contains("handle 7"), "{err}");
}

#[test]
fn double_release_fails_the_second_time() {
    let mut table = HandleTable::new();
    let handle = table.allocate(Value::None);
    table.release(handle).unwrap();
    assert!(table.release(handle).is_err());
}

#[test]
fn released_handles_are_never_reused() {
    let mut table = HandleTable::new();
    let first = table.allocate(Value::Int(1));
    table.release(first).unwrap();
    let second = table.allocate(Value::Int(2));
    assert!(second > first);
}
