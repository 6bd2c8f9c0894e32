//! Primitive conversions.
//!
//! Follows Go conversion semantics: integer narrowing wraps, float-to-int
//! truncates (saturating at the width bounds), `float32` rounds through
//! `f32`, and integer-to-string produces the code point. No range checks are
//! added on top of these rules.

use crate::kind::ValueKind;
use crate::registry::TypeRegistry;
use crate::types::TypeId;
use crate::value::{Repr, Value};

/// Wraps `v` to the width of a signed integer kind.
pub(crate) fn wrap_signed(kind: ValueKind, v: i64) -> i64 {
    match kind {
        ValueKind::Int8 => v as i8 as i64,
        ValueKind::Int16 => v as i16 as i64,
        ValueKind::Int32 => v as i32 as i64,
        ValueKind::Int | ValueKind::Int64 => v,
        _ => panic!("wrap_signed: {:?} is not a signed integer kind", kind),
    }
}

/// Wraps `v` to the width of an unsigned integer kind.
pub(crate) fn wrap_unsigned(kind: ValueKind, v: u64) -> u64 {
    match kind {
        ValueKind::Uint8 => v as u8 as u64,
        ValueKind::Uint16 => v as u16 as u64,
        ValueKind::Uint32 => v as u32 as u64,
        ValueKind::Uint | ValueKind::Uint64 | ValueKind::Uintptr => v,
        _ => panic!("wrap_unsigned: {:?} is not an unsigned integer kind", kind),
    }
}

fn as_i128(v: &Value) -> i128 {
    match v.repr() {
        Repr::Bool(_) => panic!("bool is not numeric"),
        Repr::Int(i) => *i as i128,
        Repr::Uint(u) => *u as i128,
        // Truncation toward zero, saturating at the i128 bounds.
        Repr::Float(f) => *f as i128,
        _ => panic!("non-numeric payload in numeric conversion"),
    }
}

fn as_f64(v: &Value) -> f64 {
    match v.repr() {
        Repr::Int(i) => *i as f64,
        Repr::Uint(u) => *u as f64,
        Repr::Float(f) => *f,
        _ => panic!("non-numeric payload in float conversion"),
    }
}

/// Converts `val` to `dst_ty`.
///
/// The caller must have checked `TypeRegistry::convertible` first; this
/// panics on pairs that relation rejects.
pub fn convert(reg: &TypeRegistry, val: &Value, dst_ty: TypeId) -> Value {
    let dkind = reg.kind_of(dst_ty);
    let skind = val.kind(reg);

    let repr = if dkind.is_signed_int() {
        Repr::Int(wrap_signed(dkind, as_i128(val) as i64))
    } else if dkind.is_unsigned_int() {
        Repr::Uint(wrap_unsigned(dkind, as_i128(val) as u64))
    } else if dkind.is_float() {
        let f = as_f64(val);
        Repr::Float(if dkind == ValueKind::Float32 { f as f32 as f64 } else { f })
    } else if dkind.is_complex() {
        let (re, im) = val.as_complex().expect("complex converts only from complex");
        if dkind == ValueKind::Complex64 {
            Repr::Complex(re as f32 as f64, im as f32 as f64)
        } else {
            Repr::Complex(re, im)
        }
    } else {
        match (dkind, skind) {
            (ValueKind::Bool, ValueKind::Bool) => Repr::Bool(val.as_bool().unwrap()),
            (ValueKind::String, ValueKind::String) => {
                Repr::Str(val.as_str().unwrap().to_string())
            }
            (ValueKind::String, k) if k.is_integer() => {
                let code = as_i128(val);
                let ch = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or('\u{FFFD}');
                Repr::Str(ch.to_string())
            }
            (ValueKind::Func, ValueKind::Func) => {
                Repr::Func(val.as_func().cloned())
            }
            _ => panic!(
                "convert: non-convertible kinds {:?} -> {:?}",
                skind, dkind
            ),
        }
    };
    Value::from_parts(dst_ty, repr)
}
