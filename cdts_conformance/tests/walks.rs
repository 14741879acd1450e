// Copyright 2026 the MetaFFI CDTS Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pool reuse, traversal, and construction from a source.

use cdts::construct::{ValueSliceSource, construct_cdts};
use cdts::memory::system;
use cdts::traverse::{TraverseError, Visit, Visitor, traverse_cdts};
use cdts::{Cdt, Cdts, CdtsPool, MetaffiType, PoolConfig, Serializer, Value};
use cdts_conformance::{MIXED_SCRIPT_ROOT_LEN, build, mixed_script};

#[derive(Default)]
struct Collect {
    paths: Vec<Vec<usize>>,
}

impl Visitor for Collect {
    fn value(&mut self, path: &[usize], _: &Cdt) -> Visit {
        self.paths.push(path.to_vec());
        Visit::Continue
    }

    fn array(&mut self, path: &[usize], _: &Cdts, _: MetaffiType) -> Visit {
        self.paths.push(path.to_vec());
        Visit::Continue
    }
}

#[test]
fn pooled_call_buffers_come_back_empty() {
    let mut pool = CdtsPool::new(PoolConfig::default());
    for round in 0..3 {
        let mut bufs = pool.alloc_call_buffers(system(), 2, 1).unwrap();
        assert!(bufs.params.is_pooled());
        assert!(bufs.params.iter().all(Cdt::is_empty), "round {round}");
        let mut ser = Serializer::new(&mut bufs.params);
        ser.add_string8(Some(b"arg")).unwrap();
        ser.add_slice(&[1.5_f32]).unwrap();
        drop(ser);
        Serializer::new(&mut bufs.rets).add_bool(true).unwrap();
        pool.release_call_buffers(bufs);
        assert_eq!(pool.cached(), 2);
    }
}

#[test]
fn traversal_visits_the_mixed_tree_in_pre_order() {
    let script = mixed_script();
    let data = build(MIXED_SCRIPT_ROOT_LEN, |ser| {
        script.iter().try_for_each(|step| step.apply(ser))
    })
    .unwrap();
    let mut v = Collect::default();
    assert_eq!(traverse_cdts(&data, &mut v), Ok(true));
    let expected: Vec<Vec<usize>> = vec![
        vec![0],
        vec![1],
        vec![1, 0],
        vec![1, 0, 0],
        vec![1, 1],
        vec![2],
        vec![3],
    ];
    assert_eq!(v.paths, expected);
}

#[test]
fn traversal_rejects_unwritten_slots() {
    let mut data = Cdts::new(1);
    {
        let mut ser = Serializer::new(&mut data);
        ser.add_array_begin(2, MetaffiType::INT8).unwrap();
        ser.add_int8(1).unwrap();
    }
    assert_eq!(
        traverse_cdts(&data, &mut Collect::default()),
        Err(TraverseError::EmptySlot { path: vec![0, 1] })
    );
}

#[test]
fn construction_matches_the_serializer_and_reads_back() {
    let values = vec![
        Value::from("name"),
        Value::Array {
            element_type: MetaffiType::INT64,
            items: vec![
                Value::array(MetaffiType::INT64, [1_i64]),
                Value::array(MetaffiType::INT64, Vec::<i64>::new()),
            ],
        },
        Value::Null,
        Value::from(2.5_f64),
    ];
    let mut built = construct_cdts(&mut ValueSliceSource::new(&values), system()).unwrap();
    let mut ser = Serializer::new(&mut built);
    for v in &values {
        assert_eq!(&ser.get_value().unwrap(), v);
    }
    assert!(!ser.has_more());
}

#[test]
fn deep_trees_survive_every_walk() {
    const DEPTH: usize = 20_000;
    let data = build(1, |ser| {
        for _ in 0..DEPTH {
            ser.add_array_begin(1, MetaffiType::UINT8)?;
        }
        ser.add_uint8(9)?;
        (0..DEPTH).try_for_each(|_| ser.add_array_end())
    })
    .unwrap();

    let mut copy = data.clone();
    assert!(copy == data, "clone differs");
    let mut v = Collect::default();
    assert_eq!(traverse_cdts(&copy, &mut v), Ok(true));
    assert_eq!(v.paths.len(), DEPTH + 1);

    let mut ser = Serializer::new(&mut copy);
    let value = ser.get_value().unwrap();
    assert!(!ser.has_more());
    drop(ser);
    let rebuilt = build(1, |ser| ser.add_value(&value.clone())).unwrap();
    assert!(rebuilt == data, "rewritten tree differs");
    drop(value);
}
