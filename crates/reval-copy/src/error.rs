//! Copy errors.

use std::fmt;

use reval_reflect::{MethodError, TypeId, TypeRegistry};

/// Error kind, distinguished for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Top-level destination is unusable, or an impossible type appears.
    TypeInvalid,
    /// No plan exists for the (dst, src) pair under the current flags.
    TypeNonCopyable,
    /// A top-level argument does not belong to the registry in use.
    ValueInvalid,
    /// Unexported field access requires addressability that is absent.
    ValueUnaddressable,
    /// A field marked `required` has no counterpart, or matched a no-op.
    FieldRequireCopying,
    /// A would-be copying method exists by name but has an incompatible
    /// signature.
    MethodInvalid,
    /// A user copying method or post-copy hook returned an error.
    MethodFailure,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            ErrorKind::TypeInvalid => "invalid type",
            ErrorKind::TypeNonCopyable => "non-copyable types",
            ErrorKind::ValueInvalid => "invalid value",
            ErrorKind::ValueUnaddressable => "value not addressable",
            ErrorKind::FieldRequireCopying => "field requires copying",
            ErrorKind::MethodInvalid => "invalid copying method",
            ErrorKind::MethodFailure => "copying method failed",
        }
    }
}

/// Error returned by the copy engine.
#[derive(Debug)]
pub struct CopyError {
    kind: ErrorKind,
    detail: String,
    source: Option<MethodError>,
}

impl CopyError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            source: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn non_copyable(reg: &TypeRegistry, dst: TypeId, src: TypeId) -> Self {
        Self::new(
            ErrorKind::TypeNonCopyable,
            format!("{} -> {}", reg.display(src), reg.display(dst)),
        )
    }

    pub(crate) fn require_copying(reg: &TypeRegistry, owner: TypeId, field: &str) -> Self {
        Self::new(
            ErrorKind::FieldRequireCopying,
            format!("struct field '{}[{}]'", reg.display(owner), field),
        )
    }

    pub(crate) fn unaddressable() -> Self {
        Self::new(
            ErrorKind::ValueUnaddressable,
            "accessing an unexported field requires the source to be passed as a pointer",
        )
    }

    /// Wraps an error returned by a user method, surfacing it unmodified
    /// through `source()`.
    pub(crate) fn method_failed(err: MethodError) -> Self {
        Self {
            kind: ErrorKind::MethodFailure,
            detail: err.to_string(),
            source: Some(err),
        }
    }
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind.label())
        } else {
            write!(f, "{}: {}", self.kind.label(), self.detail)
        }
    }
}

impl std::error::Error for CopyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, CopyError>;
