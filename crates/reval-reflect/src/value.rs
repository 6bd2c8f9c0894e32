//! Dynamic values: an owned, typed storage tree.
//!
//! Every `Value` carries the `TypeId` it was created with; the payload is a
//! per-kind representation. Nil states (nil pointer, nil slice, nil map, nil
//! interface, nil func) are `None` payloads, matching Go zero-value
//! semantics: a zero map is a nil map, not an empty one.
//!
//! Integer payloads are width-normalized on construction (wrapping), and
//! `Float32`-kinded payloads round through `f32`, so equality and conversion
//! observe the declared width rather than the storage width.

use std::fmt;
use std::sync::Arc;

use crate::convert::{wrap_signed, wrap_unsigned};
use crate::kind::ValueKind;
use crate::registry::TypeRegistry;
use crate::types::{Type, TypeId};

/// Opaque function handle. Functions are copied by reference: cloning a
/// `FuncRef` yields a handle to the same function, and equality is handle
/// identity.
#[derive(Clone)]
pub struct FuncRef(Arc<str>);

impl FuncRef {
    pub fn new(label: &str) -> Self {
        Self(Arc::from(label))
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl PartialEq for FuncRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FuncRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncRef({})", self.0)
    }
}

/// Typed dynamic value.
#[derive(Clone, PartialEq)]
pub struct Value {
    ty: TypeId,
    repr: Repr,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Repr {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(f64, f64),
    Str(String),
    Func(Option<FuncRef>),
    Ptr(Option<Box<Value>>),
    Iface(Option<Box<Value>>),
    Slice(Option<Vec<Value>>),
    Array(Vec<Value>),
    Map(Option<Vec<(Value, Value)>>),
    Struct(Vec<Value>),
}

impl Value {
    pub(crate) fn from_parts(ty: TypeId, repr: Repr) -> Self {
        Self { ty, repr }
    }

    pub(crate) fn repr(&self) -> &Repr {
        &self.repr
    }

    /// Zero value of `ty`: false/0/"" for basics, nil for pointer, slice,
    /// map, interface and func, recursively zeroed arrays and structs.
    pub fn zero(reg: &TypeRegistry, ty: TypeId) -> Self {
        let repr = match reg.underlying_ty(ty) {
            Type::Basic(ValueKind::Bool) => Repr::Bool(false),
            Type::Basic(k) if k.is_signed_int() => Repr::Int(0),
            Type::Basic(k) if k.is_unsigned_int() => Repr::Uint(0),
            Type::Basic(k) if k.is_float() => Repr::Float(0.0),
            Type::Basic(k) if k.is_complex() => Repr::Complex(0.0, 0.0),
            Type::Basic(ValueKind::String) => Repr::Str(String::new()),
            Type::Basic(ValueKind::Func) => Repr::Func(None),
            Type::Basic(_) => unreachable!("non-basic kind in Basic type"),
            Type::Pointer(_) => Repr::Ptr(None),
            Type::Interface => Repr::Iface(None),
            Type::Slice(_) => Repr::Slice(None),
            Type::Map { .. } => Repr::Map(None),
            Type::Array { len, elem } => {
                let (len, elem) = (*len, *elem);
                Repr::Array((0..len).map(|_| Value::zero(reg, elem)).collect())
            }
            Type::Struct { fields } => {
                let tys: Vec<TypeId> = fields.iter().map(|f| f.ty).collect();
                Repr::Struct(tys.into_iter().map(|t| Value::zero(reg, t)).collect())
            }
            Type::Named { .. } => unreachable!("underlying_ty resolved named"),
        };
        Self { ty, repr }
    }

    // === Typed constructors ===
    //
    // All constructors panic when `ty`'s kind does not match the payload;
    // they are the boundary where typed storage is created.

    pub fn of_bool(reg: &TypeRegistry, ty: TypeId, v: bool) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Bool, "of_bool: kind mismatch");
        Self { ty, repr: Repr::Bool(v) }
    }

    pub fn of_int(reg: &TypeRegistry, ty: TypeId, v: i64) -> Self {
        let kind = reg.kind_of(ty);
        assert!(kind.is_signed_int(), "of_int: kind mismatch: {:?}", kind);
        Self { ty, repr: Repr::Int(wrap_signed(kind, v)) }
    }

    pub fn of_uint(reg: &TypeRegistry, ty: TypeId, v: u64) -> Self {
        let kind = reg.kind_of(ty);
        assert!(kind.is_unsigned_int(), "of_uint: kind mismatch: {:?}", kind);
        Self { ty, repr: Repr::Uint(wrap_unsigned(kind, v)) }
    }

    pub fn of_float(reg: &TypeRegistry, ty: TypeId, v: f64) -> Self {
        let kind = reg.kind_of(ty);
        assert!(kind.is_float(), "of_float: kind mismatch: {:?}", kind);
        let v = if kind == ValueKind::Float32 { v as f32 as f64 } else { v };
        Self { ty, repr: Repr::Float(v) }
    }

    pub fn of_complex(reg: &TypeRegistry, ty: TypeId, re: f64, im: f64) -> Self {
        let kind = reg.kind_of(ty);
        assert!(kind.is_complex(), "of_complex: kind mismatch: {:?}", kind);
        let (re, im) = if kind == ValueKind::Complex64 {
            (re as f32 as f64, im as f32 as f64)
        } else {
            (re, im)
        };
        Self { ty, repr: Repr::Complex(re, im) }
    }

    pub fn of_str(reg: &TypeRegistry, ty: TypeId, v: &str) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::String, "of_str: kind mismatch");
        Self { ty, repr: Repr::Str(v.to_string()) }
    }

    pub fn of_func(reg: &TypeRegistry, ty: TypeId, f: FuncRef) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Func, "of_func: kind mismatch");
        Self { ty, repr: Repr::Func(Some(f)) }
    }

    /// A pointer value of type `ty` pointing at a fresh copy of `pointee`.
    pub fn ptr_to(reg: &TypeRegistry, ty: TypeId, pointee: Value) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Pointer, "ptr_to: kind mismatch");
        Self { ty, repr: Repr::Ptr(Some(Box::new(pointee))) }
    }

    pub fn slice_with(reg: &TypeRegistry, ty: TypeId, items: Vec<Value>) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Slice, "slice_with: kind mismatch");
        Self { ty, repr: Repr::Slice(Some(items)) }
    }

    pub fn array_with(reg: &TypeRegistry, ty: TypeId, items: Vec<Value>) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Array, "array_with: kind mismatch");
        let len = reg.array_len(ty).expect("array type has a length");
        assert_eq!(items.len(), len, "array_with: wrong element count");
        Self { ty, repr: Repr::Array(items) }
    }

    pub fn struct_with(reg: &TypeRegistry, ty: TypeId, fields: Vec<Value>) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Struct, "struct_with: kind mismatch");
        let want = reg.struct_fields(ty).map(|f| f.len()).unwrap_or(0);
        assert_eq!(fields.len(), want, "struct_with: wrong field count");
        Self { ty, repr: Repr::Struct(fields) }
    }

    pub fn map_with(reg: &TypeRegistry, ty: TypeId, entries: Vec<(Value, Value)>) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Map, "map_with: kind mismatch");
        let mut m = Self { ty, repr: Repr::Map(Some(Vec::with_capacity(entries.len()))) };
        for (k, v) in entries {
            m.map_insert(k, v);
        }
        m
    }

    /// An allocated, empty (non-nil) map.
    pub fn empty_map(reg: &TypeRegistry, ty: TypeId) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Map, "empty_map: kind mismatch");
        Self { ty, repr: Repr::Map(Some(Vec::new())) }
    }

    /// An interface value of `ty` boxing `dynamic`.
    pub fn iface_with(reg: &TypeRegistry, ty: TypeId, dynamic: Value) -> Self {
        assert_eq!(reg.kind_of(ty), ValueKind::Interface, "iface_with: kind mismatch");
        Self { ty, repr: Repr::Iface(Some(Box::new(dynamic))) }
    }

    // === Shorthand constructors over pre-registered basics ===

    pub fn int(reg: &TypeRegistry, v: i64) -> Self {
        Self::of_int(reg, reg.basic(ValueKind::Int), v)
    }

    pub fn uint(reg: &TypeRegistry, v: u64) -> Self {
        Self::of_uint(reg, reg.basic(ValueKind::Uint), v)
    }

    pub fn float64(reg: &TypeRegistry, v: f64) -> Self {
        Self::of_float(reg, reg.basic(ValueKind::Float64), v)
    }

    pub fn str(reg: &TypeRegistry, v: &str) -> Self {
        Self::of_str(reg, reg.basic(ValueKind::String), v)
    }

    pub fn bool(reg: &TypeRegistry, v: bool) -> Self {
        Self::of_bool(reg, reg.basic(ValueKind::Bool), v)
    }

    // === Inspection ===

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    #[inline]
    pub fn kind(&self, reg: &TypeRegistry) -> ValueKind {
        reg.kind_of(self.ty)
    }

    /// True for nil pointer, slice, map, interface and func values.
    pub fn is_nil(&self) -> bool {
        matches!(
            self.repr,
            Repr::Ptr(None)
                | Repr::Slice(None)
                | Repr::Map(None)
                | Repr::Iface(None)
                | Repr::Func(None)
        )
    }

    /// Structural equality with the zero value of the declared type.
    pub fn is_zero(&self, reg: &TypeRegistry) -> bool {
        *self == Value::zero(reg, self.ty)
    }

    /// Zero check that dereferences pointer chains first: a nil pointer at
    /// any level counts as zero, otherwise the innermost value is compared
    /// against its own type's zero.
    pub fn is_zero_deref(&self, reg: &TypeRegistry) -> bool {
        let mut cur = self;
        while cur.kind(reg) == ValueKind::Pointer {
            match cur.deref() {
                Some(p) => cur = p,
                None => return true,
            }
        }
        cur.is_zero(reg)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.repr {
            Repr::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.repr {
            Repr::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.repr {
            Repr::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.repr {
            Repr::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self.repr {
            Repr::Complex(re, im) => Some((re, im)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            Repr::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncRef> {
        match &self.repr {
            Repr::Func(f) => f.as_ref(),
            _ => None,
        }
    }

    // === Pointer access ===

    pub fn deref(&self) -> Option<&Value> {
        match &self.repr {
            Repr::Ptr(p) => p.as_deref(),
            _ => None,
        }
    }

    pub fn deref_mut(&mut self) -> Option<&mut Value> {
        match &mut self.repr {
            Repr::Ptr(p) => p.as_deref_mut(),
            _ => None,
        }
    }

    /// Points this pointer value at a fresh allocation holding `pointee`.
    pub fn set_pointee(&mut self, pointee: Value) {
        match &mut self.repr {
            Repr::Ptr(p) => *p = Some(Box::new(pointee)),
            _ => panic!("set_pointee on non-pointer value"),
        }
    }

    // === Interface access ===

    /// The boxed dynamic value, or `None` for a nil interface.
    pub fn iface_value(&self) -> Option<&Value> {
        match &self.repr {
            Repr::Iface(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Boxes `dynamic` into this interface value.
    pub fn iface_set(&mut self, dynamic: Value) {
        match &mut self.repr {
            Repr::Iface(v) => *v = Some(Box::new(dynamic)),
            _ => panic!("iface_set on non-interface value"),
        }
    }

    // === Sequence (slice/array) access ===

    /// Element count: array length, or slice length (0 for a nil slice).
    pub fn seq_len(&self) -> usize {
        match &self.repr {
            Repr::Slice(items) => items.as_ref().map(Vec::len).unwrap_or(0),
            Repr::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn seq_item(&self, i: usize) -> Option<&Value> {
        match &self.repr {
            Repr::Slice(items) => items.as_ref().and_then(|v| v.get(i)),
            Repr::Array(items) => items.get(i),
            _ => None,
        }
    }

    pub fn seq_item_mut(&mut self, i: usize) -> Option<&mut Value> {
        match &mut self.repr {
            Repr::Slice(items) => items.as_mut().and_then(|v| v.get_mut(i)),
            Repr::Array(items) => items.get_mut(i),
            _ => None,
        }
    }

    /// Replaces the backing storage of a slice value (making it non-nil).
    pub fn set_slice_items(&mut self, new_items: Vec<Value>) {
        match &mut self.repr {
            Repr::Slice(items) => *items = Some(new_items),
            _ => panic!("set_slice_items on non-slice value"),
        }
    }

    // === Map access ===

    pub fn map_len(&self) -> usize {
        match &self.repr {
            Repr::Map(entries) => entries.as_ref().map(Vec::len).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn map_entries(&self) -> Option<&[(Value, Value)]> {
        match &self.repr {
            Repr::Map(entries) => entries.as_deref(),
            _ => None,
        }
    }

    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.map_entries()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Inserts an entry, replacing an existing one with an equal key.
    /// Allocates the map when it is nil.
    pub fn map_insert(&mut self, key: Value, val: Value) {
        match &mut self.repr {
            Repr::Map(entries) => {
                let entries = entries.get_or_insert_with(Vec::new);
                match entries.iter_mut().find(|(k, _)| *k == key) {
                    Some(slot) => slot.1 = val,
                    None => entries.push((key, val)),
                }
            }
            _ => panic!("map_insert on non-map value"),
        }
    }

    // === Struct access ===

    pub fn num_fields(&self) -> usize {
        match &self.repr {
            Repr::Struct(fields) => fields.len(),
            _ => 0,
        }
    }

    pub fn field(&self, i: usize) -> Option<&Value> {
        match &self.repr {
            Repr::Struct(fields) => fields.get(i),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, i: usize) -> Option<&mut Value> {
        match &mut self.repr {
            Repr::Struct(fields) => fields.get_mut(i),
            _ => None,
        }
    }

    pub fn set_field(&mut self, i: usize, v: Value) {
        match &mut self.repr {
            Repr::Struct(fields) => fields[i] = v,
            _ => panic!("set_field on non-struct value"),
        }
    }

    // === In-place leaf mutation ===
    //
    // Registry-free setters for primitive payloads, reusing the declared
    // width of the existing value. Handy inside method bodies, which see
    // values but not the registry.

    pub fn set_bool(&mut self, v: bool) {
        match &mut self.repr {
            Repr::Bool(slot) => *slot = v,
            _ => panic!("set_bool on non-bool value"),
        }
    }

    pub fn set_int(&mut self, v: i64) {
        match &mut self.repr {
            Repr::Int(slot) => *slot = v,
            _ => panic!("set_int on non-integer value"),
        }
    }

    pub fn set_uint(&mut self, v: u64) {
        match &mut self.repr {
            Repr::Uint(slot) => *slot = v,
            _ => panic!("set_uint on non-integer value"),
        }
    }

    pub fn set_float(&mut self, v: f64) {
        match &mut self.repr {
            Repr::Float(slot) => *slot = v,
            _ => panic!("set_float on non-float value"),
        }
    }

    pub fn set_str(&mut self, v: &str) {
        match &mut self.repr {
            Repr::Str(slot) => *slot = v.to_string(),
            _ => panic!("set_str on non-string value"),
        }
    }

    /// Wholesale assignment. The replacement must carry the same type id.
    pub fn assign(&mut self, v: Value) {
        debug_assert_eq!(self.ty, v.ty, "assign across type identities");
        *self = v;
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value(ty#{}, {:?})", self.ty.as_u32(), self.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ValueKind;

    #[test]
    fn test_zero_values() {
        let mut reg = TypeRegistry::new();
        let int = reg.basic(ValueKind::Int);
        let ptr = reg.pointer_to(int);
        let slice = reg.slice_of(int);
        let map = reg.map_of(int, int);

        assert_eq!(Value::zero(&reg, int).as_int(), Some(0));
        assert!(Value::zero(&reg, ptr).is_nil());
        assert!(Value::zero(&reg, slice).is_nil());
        assert!(Value::zero(&reg, map).is_nil());
        assert_eq!(Value::zero(&reg, slice).seq_len(), 0);
    }

    #[test]
    fn test_width_normalization() {
        let reg = TypeRegistry::new();
        let i8t = reg.basic(ValueKind::Int8);
        // 128 wraps to -128 at int8 width.
        assert_eq!(Value::of_int(&reg, i8t, 128).as_int(), Some(-128));

        let f32t = reg.basic(ValueKind::Float32);
        let v = Value::of_float(&reg, f32t, 0.1);
        assert_eq!(v.as_float(), Some(0.1f32 as f64));
    }

    #[test]
    fn test_func_identity() {
        let reg = TypeRegistry::new();
        let fty = reg.basic(ValueKind::Func);
        let f = FuncRef::new("handler");
        let a = Value::of_func(&reg, fty, f.clone());
        let b = a.clone();
        // Cloning copies the handle, not the function.
        assert_eq!(a, b);
        assert_ne!(a, Value::of_func(&reg, fty, FuncRef::new("handler")));
    }

    #[test]
    fn test_map_insert_replaces() {
        let mut reg = TypeRegistry::new();
        let int = reg.basic(ValueKind::Int);
        let mty = reg.map_of(int, int);
        let mut m = Value::empty_map(&reg, mty);
        m.map_insert(Value::int(&reg, 1), Value::int(&reg, 10));
        m.map_insert(Value::int(&reg, 1), Value::int(&reg, 20));

        assert_eq!(m.map_len(), 1);
        assert_eq!(m.map_get(&Value::int(&reg, 1)).and_then(Value::as_int), Some(20));
    }

    #[test]
    fn test_is_zero_deref() {
        let mut reg = TypeRegistry::new();
        let int = reg.basic(ValueKind::Int);
        let ptr = reg.pointer_to(int);
        let pptr = reg.pointer_to(ptr);

        assert!(Value::zero(&reg, ptr).is_zero_deref(&reg));
        let p0 = Value::ptr_to(&reg, ptr, Value::int(&reg, 0));
        assert!(p0.is_zero_deref(&reg));
        let p1 = Value::ptr_to(&reg, ptr, Value::int(&reg, 1));
        assert!(!p1.is_zero_deref(&reg));
        let pp = Value::ptr_to(&reg, pptr, p1);
        assert!(!pp.is_zero_deref(&reg));
    }
}
