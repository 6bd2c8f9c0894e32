//! Map-to-map copying.

use reval_copy::{copy, copy_with, ignore_non_copyable_types, ErrorKind};
use reval_reflect::{TypeRegistry, Value, ValueKind};

#[test]
fn map_with_value_conversion() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let f32t = reg.basic(ValueKind::Float32);
    let src_ty = reg.map_of(int, int);
    let dst_ty = reg.map_of(int, f32t);

    let src = Value::map_with(
        &reg,
        src_ty,
        vec![
            (Value::int(&reg, 1), Value::int(&reg, 11)),
            (Value::int(&reg, 2), Value::int(&reg, 22)),
            (Value::int(&reg, 3), Value::int(&reg, 33)),
        ],
    );
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();

    assert_eq!(dst.map_len(), 3);
    for (k, want) in [(1, 11.0), (2, 22.0), (3, 33.0)] {
        let got = dst.map_get(&Value::int(&reg, k)).and_then(Value::as_float);
        assert_eq!(got, Some(want));
    }
}

#[test]
fn nil_map_produces_nil() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let mty = reg.map_of(int, int);

    let src = Value::zero(&reg, mty);
    let mut dst = Value::map_with(&reg, mty, vec![(Value::int(&reg, 1), Value::int(&reg, 2))]);
    copy(&reg, &mut dst, &src).unwrap();
    assert!(dst.is_nil());
}

#[test]
fn key_conversion_between_named_types() {
    let mut reg = TypeRegistry::new();
    let str_ty = reg.basic(ValueKind::String);
    let int = reg.basic(ValueKind::Int);
    let i8t = reg.basic(ValueKind::Int8);
    let map_key = reg.named("MapKey", str_ty);
    let src_ty = reg.map_of(str_ty, int);
    let dst_ty = reg.map_of(map_key, i8t);

    let src = Value::map_with(
        &reg,
        src_ty,
        vec![(Value::str(&reg, "a"), Value::int(&reg, 130))],
    );
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();

    let key = Value::of_str(&reg, map_key, "a");
    // 130 wraps at int8 width.
    assert_eq!(dst.map_get(&key).and_then(Value::as_int), Some(-126));
}

#[test]
fn deep_values_are_independent() {
    let mut reg = TypeRegistry::new();
    let str_ty = reg.basic(ValueKind::String);
    let int = reg.basic(ValueKind::Int);
    let ints = reg.slice_of(int);
    let mty = reg.map_of(str_ty, ints);

    let src = Value::map_with(
        &reg,
        mty,
        vec![(
            Value::str(&reg, "xs"),
            Value::slice_with(&reg, ints, vec![Value::int(&reg, 1)]),
        )],
    );
    let mut dst = Value::zero(&reg, mty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn map_to_non_map_fails_and_ignores() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let mty = reg.map_of(int, int);

    let src = Value::map_with(&reg, mty, vec![(Value::int(&reg, 1), Value::int(&reg, 2))]);
    let mut dst = Value::int(&reg, 5);
    let err = copy(&reg, &mut dst, &src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeNonCopyable);

    copy_with(&reg, &mut dst, &src, &[ignore_non_copyable_types(true)]).unwrap();
    assert_eq!(dst.as_int(), Some(5));
}

#[test]
fn unbuildable_value_copier_fails_build() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let src_ty = reg.map_of(int, str_ty);
    let dst_ty = reg.map_of(int, int);

    let src = Value::map_with(
        &reg,
        src_ty,
        vec![(Value::int(&reg, 1), Value::str(&reg, "a"))],
    );
    let mut dst = Value::zero(&reg, dst_ty);
    let err = copy(&reg, &mut dst, &src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeNonCopyable);
}
