// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested array begin/end rules.

use cdts::{ArrayStateError, Cdt, Cdts, MetaffiType, SerError, Serializer, Value};
use cdts_conformance::{build, read_int32_rows, write_int32_rows};

#[test]
fn matrix_round_trips_exactly() {
    let rows: [&[i32]; 2] = [&[1, 2, 3], &[4, 5, 6]];
    let mut data = build(1, |ser| write_int32_rows(ser, &rows)).unwrap();
    let mut ser = Serializer::new(&mut data);
    assert_eq!(
        read_int32_rows(&mut ser).unwrap(),
        [vec![1, 2, 3], vec![4, 5, 6]]
    );
    assert!(!ser.has_more());
}

#[test]
fn closing_a_half_written_matrix_fails() {
    let mut data = Cdts::new(1);
    let mut ser = Serializer::new(&mut data);
    ser.add_array_begin(2, MetaffiType::INT32).unwrap();
    ser.add_slice(&[1_i32, 2, 3]).unwrap();
    assert_eq!(
        ser.add_array_end(),
        Err(SerError::InvalidArrayState(ArrayStateError::NotPopulated {
            index: 1,
            length: 2
        }))
    );
    // The failed end changed nothing; finishing the second row fixes it.
    assert_eq!(ser.depth(), 1);
    ser.add_slice(&[4_i32, 5, 6]).unwrap();
    ser.add_array_end().unwrap();
    drop(ser);

    let mut ser = Serializer::new(&mut data);
    assert_eq!(
        read_int32_rows(&mut ser).unwrap(),
        [vec![1, 2, 3], vec![4, 5, 6]]
    );
}

#[test]
fn a_scalar_after_a_row_is_a_second_element() {
    // The parent only advances at the inner end, so `[1, 2, 3]` then `4` fills both outer slots.
    let mut data = Cdts::new(1);
    let mut ser = Serializer::new(&mut data);
    ser.add_array_begin(2, MetaffiType::INT32).unwrap();
    ser.add_slice(&[1_i32, 2, 3]).unwrap();
    ser.add_int32(4).unwrap();
    ser.add_array_end().unwrap();
    assert_eq!(ser.add_int32(5), Err(SerError::Bounds { index: 1, length: 1 }));

    // Reading it back as a matrix fails on the second row.
    ser.reset();
    ser.get_array_begin().unwrap();
    assert_eq!(ser.get_vec::<i32>().unwrap(), [1, 2, 3]);
    assert_eq!(
        ser.get_array_begin(),
        Err(SerError::TypeMismatch {
            expected: MetaffiType::ARRAY,
            actual: MetaffiType::INT32
        })
    );
    assert_eq!(ser.get_int32(), Ok(4));
    ser.get_array_end().unwrap();
}

#[test]
fn ragged_rows() {
    let rows: [&[i32]; 3] = [&[1], &[2, 3], &[4, 5, 6]];
    let mut data = build(1, |ser| write_int32_rows(ser, &rows)).unwrap();
    let mut ser = Serializer::new(&mut data);
    let back = read_int32_rows(&mut ser).unwrap();
    assert_eq!(back, [vec![1], vec![2, 3], vec![4, 5, 6]]);

    ser.reset();
    assert_eq!(
        ser.get_value().unwrap(),
        Value::Array {
            element_type: MetaffiType::INT32,
            items: vec![
                Value::array(MetaffiType::INT32, [1_i32]),
                Value::array(MetaffiType::INT32, [2_i32, 3]),
                Value::array(MetaffiType::INT32, [4_i32, 5, 6]),
            ],
        }
    );
}

#[test]
fn bounds_hold_at_every_level() {
    let mut data = Cdts::new(2);
    let mut ser = Serializer::new(&mut data);
    ser.add_array_begin(1, MetaffiType::INT8).unwrap();
    ser.add_int8(1).unwrap();
    assert_eq!(ser.add_int8(2), Err(SerError::Bounds { index: 1, length: 1 }));
    assert_eq!(ser.index(), 1);
    ser.add_array_end().unwrap();
    ser.add_int8(3).unwrap();
    assert_eq!(ser.add_int8(4), Err(SerError::Bounds { index: 2, length: 2 }));
    assert_eq!(ser.index(), 2);
    assert!(!ser.has_more());
}

#[test]
fn end_without_begin() {
    let mut data = Cdts::new(1);
    let mut ser = Serializer::new(&mut data);
    let not_in_array = Err(SerError::InvalidArrayState(ArrayStateError::NotInArray));
    assert_eq!(ser.add_array_end(), not_in_array);
    assert_eq!(ser.get_array_end(), not_in_array);
    assert_eq!(
        ser.add_array_end().unwrap_err().to_string(),
        "Not in array context"
    );
}

#[test]
fn reading_must_visit_every_element() {
    let mut data = build(1, |ser| ser.add_slice(&[1_u16, 2])).unwrap();
    let mut ser = Serializer::new(&mut data);
    assert_eq!(ser.get_array_begin(), Ok((2, MetaffiType::UINT16)));
    assert_eq!(ser.get_uint16(), Ok(1));
    let err = ser.get_array_end().unwrap_err();
    assert_eq!(err.to_string(), "Array not fully read: 1/2 elements");
    assert_eq!(ser.get_uint16(), Ok(2));
    ser.get_array_end().unwrap();
}

#[test]
fn reset_closes_open_arrays_in_place() {
    let mut data = Cdts::new(1);
    let mut ser = Serializer::new(&mut data);
    ser.add_array_begin(3, MetaffiType::INT8).unwrap();
    ser.add_array_begin(3, MetaffiType::INT8).unwrap();
    assert_eq!(ser.depth(), 2);
    ser.reset();
    assert_eq!((ser.depth(), ser.index(), ser.size()), (0, 0, 1));
    // The half-written array is still in the slot.
    assert_eq!(ser.peek_type(), Ok(MetaffiType::INT8.array_of()));
}

#[test]
fn nested_arrays_record_their_depth() {
    let rows: [&[i32]; 1] = [&[7]];
    let data = build(1, |ser| write_int32_rows(ser, &rows)).unwrap();
    let Some(Cdt::Array { items: outer, .. }) = data.get(0) else {
        panic!("expected an array");
    };
    assert_eq!(outer.fixed_dimensions(), 1);
    let Some(Cdt::Array { items: inner, .. }) = outer.get(0) else {
        panic!("expected a row");
    };
    assert_eq!(inner.fixed_dimensions(), 2);
}
