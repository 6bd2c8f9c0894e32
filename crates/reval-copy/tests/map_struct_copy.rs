//! Copying between maps and structs.

use std::sync::Arc;

use reval_copy::{copy, copy_with, ignore_non_copyable_types, ErrorKind};
use reval_reflect::{MethodSig, TypeRegistry, Value, ValueKind};

#[test]
fn map_to_struct_simple() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let uint = reg.basic(ValueKind::Uint);
    let str_ty = reg.basic(ValueKind::String);
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", int);
    let f_u = reg.field("U", uint);
    let dst_ty = reg.struct_of(vec![f_i, f_u]);

    let src = Value::map_with(
        &reg,
        mty,
        vec![
            (Value::str(&reg, "I"), Value::int(&reg, 1)),
            (Value::str(&reg, "U"), Value::int(&reg, 2)),
        ],
    );
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(1));
    assert_eq!(dst.field(1).and_then(Value::as_uint), Some(2));
}

#[test]
fn map_to_struct_with_tag_key() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", int).tagged(r#"copy:"i""#);
    let dst_ty = reg.struct_of(vec![f_i]);

    let src = Value::map_with(&reg, mty, vec![(Value::str(&reg, "i"), Value::int(&reg, 4))]);
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(4));
}

#[test]
fn map_to_struct_with_lossy_conversion() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let i8t = reg.basic(ValueKind::Int8);
    let str_ty = reg.basic(ValueKind::String);
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", i8t);
    let dst_ty = reg.struct_of(vec![f_i]);

    let src = Value::map_with(&reg, mty, vec![(Value::str(&reg, "I"), Value::int(&reg, 128))]);
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(-128));
}

#[test]
fn map_to_struct_through_any_values() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let any = reg.interface_any();
    let ptr_int = reg.pointer_to(int);
    let mty = reg.map_of(str_ty, any);
    let f_i = reg.field("I", int);
    let f_s = reg.field("S", str_ty);
    let dst_ty = reg.struct_of(vec![f_i, f_s]);

    let src = Value::map_with(
        &reg,
        mty,
        vec![
            (
                Value::str(&reg, "I"),
                Value::iface_with(&reg, any, Value::ptr_to(&reg, ptr_int, Value::int(&reg, 9))),
            ),
            (
                Value::str(&reg, "S"),
                Value::iface_with(&reg, any, Value::str(&reg, "abc")),
            ),
        ],
    );
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(9));
    assert_eq!(dst.field(1).and_then(Value::as_str), Some("abc"));
}

#[test]
fn map_to_struct_missing_entry_skips_or_fails() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", int);
    let f_u = reg.field("U", int).tagged(r#"copy:",required""#);
    let dst_ty = reg.struct_of(vec![f_i.clone(), f_u]);

    let src = Value::map_with(&reg, mty, vec![(Value::str(&reg, "I"), Value::int(&reg, 1))]);
    let mut dst = Value::zero(&reg, dst_ty);
    let err = copy(&reg, &mut dst, &src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldRequireCopying);

    // Without `required`, the missing entry just leaves the field alone.
    let relaxed_ty = {
        let f_u2 = reg.field("U", int);
        reg.struct_of(vec![f_i, f_u2])
    };
    let mut dst = Value::zero(&reg, relaxed_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(1));
    assert_eq!(dst.field(1).and_then(Value::as_int), Some(0));
}

#[test]
fn map_to_struct_embedded_fields() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let any = reg.interface_any();
    let mty = reg.map_of(str_ty, any);
    let f_code = reg.field("Code", int).tagged(r#"copy:"code""#);
    let base_body = reg.struct_of(vec![f_code]);
    let base = reg.named("Base", base_body);
    let ptr_base = reg.pointer_to(base);
    let f_base = reg.field("Base", ptr_base).embedded();
    let dst_ty = reg.struct_of(vec![f_base]);

    let src = Value::map_with(
        &reg,
        mty,
        vec![(
            Value::str(&reg, "code"),
            Value::iface_with(&reg, any, Value::int(&reg, 6)),
        )],
    );
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    let through = dst
        .field(0)
        .and_then(Value::deref)
        .and_then(|b| b.field(0))
        .and_then(Value::as_int);
    assert_eq!(through, Some(6));
}

#[test]
fn nil_map_to_struct_is_a_no_op() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", int);
    let dst_ty = reg.struct_of(vec![f_i]);

    let src = Value::zero(&reg, mty);
    let mut dst = Value::struct_with(&reg, dst_ty, vec![Value::int(&reg, 1)]);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(1));
}

#[test]
fn map_to_struct_nilonzero() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let ptr_int = reg.pointer_to(int);
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", ptr_int).tagged(r#"copy:",nilonzero""#);
    let dst_ty = reg.struct_of(vec![f_i]);

    let src = Value::map_with(&reg, mty, vec![(Value::str(&reg, "I"), Value::int(&reg, 0))]);
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert!(dst.field(0).unwrap().is_nil());
}

#[test]
fn map_to_struct_post_copy() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let any = reg.interface_any();
    let mty = reg.map_of(str_ty, int);
    let f_i = reg.field("I", int);
    let dst_body = reg.struct_of(vec![f_i]);
    let dst_ty = reg.named("FromMap", dst_body);
    reg.register_method(
        dst_ty,
        "PostCopy",
        MethodSig::erroring(any),
        Arc::new(|recv, _| {
            let v = recv.field(0).and_then(Value::as_int).unwrap();
            if v == 100 {
                return Err("overflow".into());
            }
            Ok(())
        }),
    );

    let src = Value::map_with(&reg, mty, vec![(Value::str(&reg, "I"), Value::int(&reg, 1))]);
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();

    let src = Value::map_with(&reg, mty, vec![(Value::str(&reg, "I"), Value::int(&reg, 100))]);
    let err = copy(&reg, &mut dst, &src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MethodFailure);
}

#[test]
fn non_string_keyed_map_to_struct_fails_then_ignores() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let mty = reg.map_of(int, str_ty);
    let f_i = reg.field("I", int);
    let dst_ty = reg.struct_of(vec![f_i]);

    let src = Value::map_with(&reg, mty, vec![(Value::int(&reg, 1), Value::str(&reg, "a"))]);
    let mut dst = Value::zero(&reg, dst_ty);
    let err = copy(&reg, &mut dst, &src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeNonCopyable);

    copy_with(&reg, &mut dst, &src, &[ignore_non_copyable_types(true)]).unwrap();
    assert_eq!(dst, Value::zero(&reg, dst_ty));
}

#[test]
fn struct_to_map_simple() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let uint = reg.basic(ValueKind::Uint);
    let str_ty = reg.basic(ValueKind::String);
    let f_i = reg.field("I", int).tagged(r#"copy:"i""#);
    let f_u = reg.field("U", uint);
    let src_ty = reg.struct_of(vec![f_i, f_u]);
    let mty = reg.map_of(str_ty, int);

    let src = Value::struct_with(&reg, src_ty, vec![Value::int(&reg, 1), Value::uint(&reg, 2)]);
    let mut dst = Value::zero(&reg, mty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.map_len(), 2);
    assert_eq!(dst.map_get(&Value::str(&reg, "i")).and_then(Value::as_int), Some(1));
    assert_eq!(dst.map_get(&Value::str(&reg, "U")).and_then(Value::as_int), Some(2));
}

#[test]
fn struct_to_map_named_key_and_value_types() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let i8t = reg.basic(ValueKind::Int8);
    let str_ty = reg.basic(ValueKind::String);
    let map_key = reg.named("MapKey", str_ty);
    let map_val = reg.named("MapValue", i8t);
    let f_i = reg.field("I", int);
    let src_ty = reg.struct_of(vec![f_i]);
    let mty = reg.map_of(map_key, map_val);

    let src = Value::struct_with(&reg, src_ty, vec![Value::int(&reg, 128)]);
    let mut dst = Value::zero(&reg, mty);
    copy(&reg, &mut dst, &src).unwrap();
    let key = Value::of_str(&reg, map_key, "I");
    assert_eq!(dst.map_get(&key).and_then(Value::as_int), Some(-128));
}

#[test]
fn struct_to_map_nil_pointer_field_zeroes_entry() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let ptr_int = reg.pointer_to(int);
    let f_i = reg.field("I", ptr_int).tagged(r#"copy:"i""#);
    let src_ty = reg.struct_of(vec![f_i]);
    let mty = reg.map_of(str_ty, int);

    let src = Value::struct_with(&reg, src_ty, vec![Value::zero(&reg, ptr_int)]);
    let mut dst = Value::zero(&reg, mty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.map_get(&Value::str(&reg, "i")).and_then(Value::as_int), Some(0));
}

#[test]
fn struct_to_map_ignored_field_has_no_entry() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let f_i = reg.field("I", int).tagged(r#"copy:"-""#);
    let f_u = reg.field("U", int);
    let src_ty = reg.struct_of(vec![f_i, f_u]);
    let mty = reg.map_of(str_ty, int);

    let src = Value::struct_with(&reg, src_ty, vec![Value::int(&reg, 1), Value::int(&reg, 22)]);
    let mut dst = Value::zero(&reg, mty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.map_len(), 1);
    assert_eq!(dst.map_get(&Value::str(&reg, "U")).and_then(Value::as_int), Some(22));
}

#[test]
fn struct_to_map_non_copyable_values_ignored_yields_empty_map() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let strs = reg.slice_of(str_ty);
    let f_i = reg.field("I", strs);
    let src_ty = reg.struct_of(vec![f_i]);
    let mty = reg.map_of(str_ty, int);

    let src = Value::struct_with(
        &reg,
        src_ty,
        vec![Value::slice_with(&reg, strs, vec![Value::str(&reg, "a")])],
    );
    let mut dst = Value::zero(&reg, mty);
    copy_with(&reg, &mut dst, &src, &[ignore_non_copyable_types(true)]).unwrap();
    assert!(!dst.is_nil());
    assert_eq!(dst.map_len(), 0);
}

#[test]
fn struct_to_map_inherited_fields() {
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let str_ty = reg.basic(ValueKind::String);
    let f_code = reg.field("Code", int);
    let base_body = reg.struct_of(vec![f_code]);
    let base = reg.named("Base", base_body);
    let f_base = reg.field("Base", base).embedded();
    let f_name = reg.field("Name", str_ty);
    let src_ty = reg.struct_of(vec![f_base, f_name]);
    let any = reg.interface_any();
    let mty = reg.map_of(str_ty, any);

    let base_val = Value::struct_with(&reg, base, vec![Value::int(&reg, 3)]);
    let src = Value::struct_with(&reg, src_ty, vec![base_val, Value::str(&reg, "n")]);
    let mut dst = Value::zero(&reg, mty);
    copy(&reg, &mut dst, &src).unwrap();
    // The embedded field itself and its flattened leaf both get entries.
    assert_eq!(dst.map_len(), 3);
    assert_eq!(
        dst.map_get(&Value::str(&reg, "Code"))
            .and_then(Value::iface_value)
            .and_then(Value::as_int),
        Some(3)
    );
}
