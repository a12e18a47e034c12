// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use cascade_core::{CascadeError, StreamItem};

#[test]
fn test_value_accessors() {
    let item = StreamItem::Value(7);

    assert!(!item.is_error());
    assert_eq!(item.clone().ok(), Some(7));
    assert_eq!(item.unwrap(), 7);
}

#[test]
fn test_error_accessors() {
    let item: StreamItem<i32> = StreamItem::Error(CascadeError::source_error(0, "boom"));

    assert!(item.is_error());
    assert!(item.clone().ok().is_none());
    assert!(matches!(
        item.unwrap_err(),
        CascadeError::SourceError { index: 0, .. }
    ));
}

#[test]
fn test_errors_are_never_equal() {
    let a: StreamItem<i32> = StreamItem::Error(CascadeError::Cancelled);
    let b: StreamItem<i32> = StreamItem::Error(CascadeError::Cancelled);

    assert_ne!(a, b);
    assert_eq!(StreamItem::Value(1), StreamItem::Value(1));
}

#[test]
fn test_result_conversion() {
    let item: StreamItem<u8> = Ok(3).into();
    assert_eq!(item, StreamItem::Value(3));

    let item: StreamItem<u8> = Err(CascadeError::Cancelled).into();
    assert!(item.is_error());
}

#[test]
#[should_panic(expected = "called `StreamItem::unwrap()` on an `Error` value")]
fn test_unwrap_on_error_panics() {
    let item: StreamItem<i32> = StreamItem::Error(CascadeError::Cancelled);
    item.unwrap();
}
