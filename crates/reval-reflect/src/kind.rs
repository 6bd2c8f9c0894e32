//! Runtime kind classification.
//!
//! `ValueKind` partitions the type space the same way the registry does:
//! primitive kinds first (everything up to and including `Func`), then the
//! structural kinds. Several predicates rely on that ordering.

use num_enum::TryFromPrimitive;

/// Runtime kind of a type or value.
///
/// The discriminant order matters: all primitive kinds come before
/// `Pointer`, and the signed/unsigned integer families are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueKind {
    // === Primitive kinds (leaf copy: direct or convert) ===
    Bool = 0,
    Int = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Uint = 6,
    Uint8 = 7,
    Uint16 = 8,
    Uint32 = 9,
    Uint64 = 10,
    Uintptr = 11,
    Float32 = 12,
    Float64 = 13,
    Complex64 = 14,
    Complex128 = 15,
    String = 16,
    Func = 17,

    // === Structural kinds ===
    Pointer = 18,
    Interface = 19,
    Slice = 20,
    Array = 21,
    Map = 22,
    Struct = 23,
}

impl ValueKind {
    /// Number of basic kinds pre-registered in a `TypeRegistry`.
    pub const BASIC_COUNT: u32 = ValueKind::Func as u32 + 1;

    #[inline]
    pub fn from_u8(v: u8) -> Self {
        Self::try_from(v).unwrap_or(ValueKind::Bool)
    }

    /// True for kinds eligible for direct/convert leaf copying.
    #[inline]
    pub fn is_primitive(self) -> bool {
        (self as u8) <= ValueKind::Func as u8
    }

    #[inline]
    pub fn is_signed_int(self) -> bool {
        let v = self as u8;
        v >= ValueKind::Int as u8 && v <= ValueKind::Int64 as u8
    }

    #[inline]
    pub fn is_unsigned_int(self) -> bool {
        let v = self as u8;
        v >= ValueKind::Uint as u8 && v <= ValueKind::Uintptr as u8
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, ValueKind::Float32 | ValueKind::Float64)
    }

    #[inline]
    pub fn is_complex(self) -> bool {
        matches!(self, ValueKind::Complex64 | ValueKind::Complex128)
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Lowercase name used in type display and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Int8 => "int8",
            ValueKind::Int16 => "int16",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Uint => "uint",
            ValueKind::Uint8 => "uint8",
            ValueKind::Uint16 => "uint16",
            ValueKind::Uint32 => "uint32",
            ValueKind::Uint64 => "uint64",
            ValueKind::Uintptr => "uintptr",
            ValueKind::Float32 => "float32",
            ValueKind::Float64 => "float64",
            ValueKind::Complex64 => "complex64",
            ValueKind::Complex128 => "complex128",
            ValueKind::String => "string",
            ValueKind::Func => "func",
            ValueKind::Pointer => "pointer",
            ValueKind::Interface => "interface",
            ValueKind::Slice => "slice",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Struct => "struct",
        }
    }
}
