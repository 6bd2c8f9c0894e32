//! Process-wide default tag name.
//!
//! Kept in its own test binary: the default tag name is process-global, and
//! changing it here must not race against the other suites.

use reval_copy::{copy, default_tag_name, set_default_tag_name, DEFAULT_TAG_NAME};
use reval_reflect::{TypeRegistry, Value, ValueKind};

#[test]
fn tag_name_switch_and_invalid_inputs() {
    // Invalid candidates are silently rejected.
    set_default_tag_name("");
    set_default_tag_name(" abc");
    set_default_tag_name("abc ");
    set_default_tag_name("a-b");
    assert_eq!(default_tag_name(), DEFAULT_TAG_NAME);

    set_default_tag_name("clone");
    assert_eq!(default_tag_name(), "clone");

    // Directives are now read from the `clone` tag; `copy` tags are inert.
    let mut reg = TypeRegistry::new();
    let int = reg.basic(ValueKind::Int);
    let f_a = reg.field("A", int).tagged(r#"clone:"code""#);
    let f_b = reg.field("B", int).tagged(r#"copy:"code""#);
    let src_ty = reg.struct_of(vec![f_a, f_b]);
    let f_code = reg.field("Code", int).tagged(r#"clone:"code""#);
    let dst_ty = reg.struct_of(vec![f_code]);

    let src = Value::struct_with(&reg, src_ty, vec![Value::int(&reg, 1), Value::int(&reg, 2)]);
    let mut dst = Value::zero(&reg, dst_ty);
    copy(&reg, &mut dst, &src).unwrap();
    assert_eq!(dst.field(0).and_then(Value::as_int), Some(1));

    set_default_tag_name(DEFAULT_TAG_NAME);
    assert_eq!(default_tag_name(), DEFAULT_TAG_NAME);
}
