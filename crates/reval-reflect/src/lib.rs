//! Runtime type descriptors and dynamic values.
//!
//! This crate is the substrate the `reval-copy` engine operates on: a
//! `TypeRegistry` interns structural type descriptors (identical structure,
//! identical `TypeId`), and `Value` is an owned, typed storage tree with
//! Go-like nil semantics for pointers, slices, maps and interfaces.
//!
//! Type identity is `TypeId` equality. Named types are nominal: two named
//! types with different names are never identical even when their underlying
//! types are, which is what makes conversion (`int` -> `MyInt`) observable.

pub mod convert;
pub mod kind;
pub mod registry;
pub mod symbol;
pub mod types;
pub mod value;

pub use convert::convert;
pub use kind::ValueKind;
pub use registry::TypeRegistry;
pub use symbol::{Symbol, SymbolInterner};
pub use types::{Field, Method, MethodError, MethodFn, MethodSig, RetKind, Type, TypeId};
pub use value::{FuncRef, Value};
