//! Type interning and lookup.
//!
//! A `TypeRegistry` assigns unique `TypeId`s to structurally identical types,
//! which enables O(1) type identity checks. Basic types are pre-registered so
//! that their id equals their `ValueKind` discriminant; the empty interface
//! is pre-registered right after them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::kind::ValueKind;
use crate::symbol::{Symbol, SymbolInterner};
use crate::types::{Field, Method, MethodFn, MethodSig, Type, TypeId};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(0);

/// A type interner plus the name and method tables that hang off it.
#[derive(Debug)]
pub struct TypeRegistry {
    id: u32,
    types: Vec<Type>,
    cache: HashMap<Type, TypeId>,
    names: SymbolInterner,
    methods: HashMap<TypeId, Vec<Method>>,
}

impl TypeRegistry {
    /// Creates a registry with all basic types and the empty interface
    /// pre-registered.
    pub fn new() -> Self {
        let mut reg = Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            types: Vec::with_capacity(ValueKind::BASIC_COUNT as usize + 1),
            cache: HashMap::new(),
            names: SymbolInterner::new(),
            methods: HashMap::new(),
        };
        for raw in 0..ValueKind::BASIC_COUNT {
            let ty = Type::Basic(ValueKind::from_u8(raw as u8));
            let id = TypeId::from_raw(raw);
            reg.cache.insert(ty.clone(), id);
            reg.types.push(ty);
        }
        reg.cache
            .insert(Type::Interface, TypeId::from_raw(ValueKind::BASIC_COUNT));
        reg.types.push(Type::Interface);
        reg
    }

    /// Process-unique id of this registry, used to partition shared caches.
    #[inline]
    pub fn registry_id(&self) -> u32 {
        self.id
    }

    /// Interns a type, returning its id.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.cache.get(&ty) {
            return id;
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.cache.insert(ty.clone(), id);
        self.types.push(ty);
        id
    }

    /// True if `id` was issued by this registry.
    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.types.len()
    }

    /// Returns the descriptor for `id`.
    ///
    /// Panics when the id was not issued by this registry.
    #[inline]
    pub fn ty(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    // === Constructors ===

    /// Id of a basic type (pre-registered).
    #[inline]
    pub fn basic(&self, kind: ValueKind) -> TypeId {
        debug_assert!(kind.is_primitive(), "basic() takes primitive kinds");
        TypeId::from_raw(kind as u32)
    }

    /// Id of the empty interface (pre-registered).
    #[inline]
    pub fn interface_any(&self) -> TypeId {
        TypeId::from_raw(ValueKind::BASIC_COUNT)
    }

    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Pointer(elem))
    }

    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        self.intern(Type::Slice(elem))
    }

    pub fn array_of(&mut self, len: usize, elem: TypeId) -> TypeId {
        self.intern(Type::Array { len, elem })
    }

    pub fn map_of(&mut self, key: TypeId, val: TypeId) -> TypeId {
        self.intern(Type::Map { key, val })
    }

    pub fn struct_of(&mut self, fields: Vec<Field>) -> TypeId {
        self.intern(Type::Struct { fields })
    }

    /// Declares a named type over `underlying`.
    pub fn named(&mut self, name: &str, underlying: TypeId) -> TypeId {
        let name = self.names.intern(name);
        self.intern(Type::Named { name, underlying })
    }

    /// Declares a named type whose underlying type is not known yet, for
    /// self-referential shapes. The placeholder must be filled with
    /// `complete_named` before the type is used; resolving it earlier
    /// panics.
    pub fn declare_named(&mut self, name: &str) -> TypeId {
        let name = self.names.intern(name);
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(Type::Named {
            name,
            underlying: TypeId::from_raw(u32::MAX),
        });
        id
    }

    /// Fills in the underlying type of a declared named type.
    pub fn complete_named(&mut self, id: TypeId, underlying: TypeId) {
        let name = match &self.types[id.index()] {
            Type::Named { name, .. } => *name,
            _ => panic!("complete_named on a non-named type"),
        };
        let ty = Type::Named { name, underlying };
        self.types[id.index()] = ty.clone();
        self.cache.insert(ty, id);
    }

    /// Builds a field descriptor, deriving the export flag from the name
    /// (uppercase first letter, the Go convention).
    pub fn field(&mut self, name: &str, ty: TypeId) -> Field {
        let exported = name.chars().next().is_some_and(|c| c.is_uppercase());
        Field {
            name: self.names.intern(name),
            ty,
            tag: None,
            embedded: false,
            exported,
        }
    }

    // === Names ===

    #[inline]
    pub fn intern_name(&mut self, name: &str) -> Symbol {
        self.names.intern(name)
    }

    #[inline]
    pub fn resolve_name(&self, sym: Symbol) -> Option<&str> {
        self.names.resolve(sym)
    }

    // === Methods ===

    /// Registers a method on a named type's pointer-receiver set.
    pub fn register_method(&mut self, ty: TypeId, name: &str, sig: MethodSig, func: MethodFn) {
        let name = self.names.intern(name);
        self.methods
            .entry(ty)
            .or_default()
            .push(Method { name, sig, func });
    }

    /// Methods registered on `ty`, in registration order.
    pub fn methods_of(&self, ty: TypeId) -> &[Method] {
        self.methods.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    // === Resolution ===

    /// Kind of a type, resolving through named types.
    pub fn kind_of(&self, id: TypeId) -> ValueKind {
        match self.ty(id) {
            Type::Basic(k) => *k,
            Type::Named { underlying, .. } => self.kind_of(*underlying),
            Type::Pointer(_) => ValueKind::Pointer,
            Type::Array { .. } => ValueKind::Array,
            Type::Slice(_) => ValueKind::Slice,
            Type::Map { .. } => ValueKind::Map,
            Type::Struct { .. } => ValueKind::Struct,
            Type::Interface => ValueKind::Interface,
        }
    }

    /// Resolves named chains to the underlying type id.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        match self.ty(id) {
            Type::Named { underlying, .. } => self.underlying(*underlying),
            _ => id,
        }
    }

    /// Descriptor of the underlying type.
    #[inline]
    pub fn underlying_ty(&self, id: TypeId) -> &Type {
        self.ty(self.underlying(id))
    }

    /// Element type of a pointer, slice or array (through named types).
    pub fn elem_of(&self, id: TypeId) -> Option<TypeId> {
        match self.underlying_ty(id) {
            Type::Pointer(elem) | Type::Slice(elem) => Some(*elem),
            Type::Array { elem, .. } => Some(*elem),
            _ => None,
        }
    }

    /// Key/value types of a map (through named types).
    pub fn map_types(&self, id: TypeId) -> Option<(TypeId, TypeId)> {
        match self.underlying_ty(id) {
            Type::Map { key, val } => Some((*key, *val)),
            _ => None,
        }
    }

    /// Fields of a struct (through named types).
    pub fn struct_fields(&self, id: TypeId) -> Option<&[Field]> {
        match self.underlying_ty(id) {
            Type::Struct { fields } => Some(fields),
            _ => None,
        }
    }

    /// Array length (through named types).
    pub fn array_len(&self, id: TypeId) -> Option<usize> {
        match self.underlying_ty(id) {
            Type::Array { len, .. } => Some(*len),
            _ => None,
        }
    }

    // === Relations ===

    /// Assignability: identity, or the destination is the empty interface.
    pub fn assignable(&self, from: TypeId, to: TypeId) -> bool {
        from == to || matches!(self.underlying_ty(to), Type::Interface)
    }

    /// Convertibility between primitive kinds, following Go conversion rules
    /// over the underlying basic kinds.
    pub fn convertible(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        let (fk, tk) = (self.kind_of(from), self.kind_of(to));
        if !fk.is_primitive() || !tk.is_primitive() {
            return false;
        }
        if fk.is_numeric() && tk.is_numeric() {
            return true;
        }
        if fk.is_complex() && tk.is_complex() {
            return true;
        }
        match tk {
            // Same-kind conversion covers named variants (MyString <-> string).
            ValueKind::Bool | ValueKind::String if fk == tk => true,
            // Integer -> string produces the code point, as in Go.
            ValueKind::String if fk.is_integer() => true,
            // Opaque func types convert only between identical structures.
            ValueKind::Func if fk == ValueKind::Func => {
                self.underlying(from) == self.underlying(to)
            }
            _ => false,
        }
    }

    /// Renders a type in Go-like notation for error messages.
    pub fn display(&self, id: TypeId) -> String {
        match self.ty(id) {
            Type::Basic(k) => k.name().to_string(),
            Type::Named { name, .. } => self
                .resolve_name(*name)
                .unwrap_or("<anonymous>")
                .to_string(),
            Type::Pointer(elem) => format!("*{}", self.display(*elem)),
            Type::Array { len, elem } => format!("[{}]{}", len, self.display(*elem)),
            Type::Slice(elem) => format!("[]{}", self.display(*elem)),
            Type::Map { key, val } => {
                format!("map[{}]{}", self.display(*key), self.display(*val))
            }
            Type::Struct { fields } => format!("struct{{{} fields}}", fields.len()),
            Type::Interface => "interface {}".to_string(),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
