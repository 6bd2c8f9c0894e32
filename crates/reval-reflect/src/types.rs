//! Structural runtime type descriptors.
//!
//! All nested types store `TypeId` instead of boxed descriptors, which keeps
//! `Type` cheap to hash and lets the registry intern structurally identical
//! types to the same id.

use std::fmt;
use std::sync::Arc;

use crate::kind::ValueKind;
use crate::symbol::Symbol;
use crate::value::Value;

/// Index of an interned type in a `TypeRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Runtime type descriptor.
///
/// Named types are nominal: `Named` interns by `(name, underlying)`, so two
/// distinct names are two distinct identities over the same structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Basic types: bool, the integer families, floats, complex numbers,
    /// string, and the opaque func type.
    Basic(ValueKind),

    /// Named (defined) type over an underlying type.
    Named { name: Symbol, underlying: TypeId },

    /// Pointer type: *T.
    Pointer(TypeId),

    /// Array type: [N]T.
    Array { len: usize, elem: TypeId },

    /// Slice type: []T.
    Slice(TypeId),

    /// Map type: map[K]V.
    Map { key: TypeId, val: TypeId },

    /// Anonymous struct type.
    Struct { fields: Vec<Field> },

    /// The empty interface (untyped-any abstraction).
    Interface,
}

/// A field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Field name (interned in the owning registry).
    pub name: Symbol,
    /// Declared field type.
    pub ty: TypeId,
    /// Raw tag string, e.g. `copy:"key,required"`.
    pub tag: Option<String>,
    /// Whether this field is embedded (anonymous).
    pub embedded: bool,
    /// Whether the field is exported. Derived from the Go convention
    /// (uppercase first letter) by `TypeRegistry::field`.
    pub exported: bool,
}

impl Field {
    /// Attaches a raw tag string to the field.
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    /// Marks the field as embedded.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }
}

/// Error type returned by user-registered methods.
pub type MethodError = Box<dyn std::error::Error + Send + Sync>;

/// Callable body of a registered method. The receiver is the value the
/// method set belongs to, passed mutably (pointer receiver).
pub type MethodFn = Arc<dyn Fn(&mut Value, Value) -> Result<(), MethodError> + Send + Sync>;

/// Return shape of a method, used for shape matching only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetKind {
    /// Returns the engine's error abstraction.
    Error,
    /// Returns nothing.
    None,
    /// Returns some other type.
    Other(TypeId),
}

/// Declared shape of a method: explicit argument types and return kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub args: Vec<TypeId>,
    pub ret: RetKind,
}

impl MethodSig {
    /// The `fn(T) -> error` shape consumed by copying methods and hooks.
    pub fn erroring(arg: TypeId) -> Self {
        Self {
            args: vec![arg],
            ret: RetKind::Error,
        }
    }
}

/// A method registered on a named type (pointer-receiver method set).
#[derive(Clone)]
pub struct Method {
    pub name: Symbol,
    pub sig: MethodSig,
    pub func: MethodFn,
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("sig", &self.sig)
            .finish()
    }
}
