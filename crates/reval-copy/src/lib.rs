//! Deep copy between runtime-typed values.
//!
//! Given a destination location and a source value, the engine recursively
//! produces a fully independent copy in the destination. On the first copy
//! between a (destination type, source type, options) triple it compiles a
//! copier plan, caches it, and reuses it for subsequent calls.
//!
//! ```
//! use reval_reflect::{TypeRegistry, Value, ValueKind};
//!
//! let reg = TypeRegistry::new();
//! let int = reg.basic(ValueKind::Int);
//! let f64t = reg.basic(ValueKind::Float64);
//!
//! let src = Value::of_int(&reg, int, 111);
//! let mut dst = Value::zero(&reg, f64t);
//! reval_copy::copy(&reg, &mut dst, &src).unwrap();
//! assert_eq!(dst.as_float(), Some(111.0));
//! ```
//!
//! The destination is a `&mut Value` (the settable location); the source may
//! be a plain value or a `Pointer` value. Copying unexported struct fields
//! out of the source requires the pointer form, which is what makes the
//! source chain addressable.

mod builder;
mod cache;
mod context;
mod copier;
mod error;
mod iface;
mod map;
mod map_struct;
mod slice;
mod structs;
mod tag;

use reval_reflect::{TypeRegistry, Value};

use crate::builder::Builder;
use crate::copier::{Env, SrcRef};

pub use crate::context::{
    copy_between_ptr_and_value, copy_between_struct_field_and_method, default_tag_name,
    ignore_non_copyable_types, set_default_tag_name, use_global_cache, Context, CopyOption,
    DEFAULT_TAG_NAME,
};
pub use crate::error::{CopyError, ErrorKind, Result};

/// Performs a deep copy from `src` into `dst` with default options.
pub fn copy(reg: &TypeRegistry, dst: &mut Value, src: &Value) -> Result<()> {
    copy_with(reg, dst, src, &[])
}

/// Performs a deep copy from `src` into `dst`, applying `options` to a
/// fresh context first.
pub fn copy_with(
    reg: &TypeRegistry,
    dst: &mut Value,
    src: &Value,
    options: &[CopyOption],
) -> Result<()> {
    if !reg.contains(dst.ty()) || !reg.contains(src.ty()) {
        return Err(CopyError::new(
            ErrorKind::ValueInvalid,
            "source and destination must belong to the given registry",
        ));
    }

    let mut ctx = Context::default_context();
    for opt in options {
        opt(&mut ctx);
    }
    ctx.prepare();

    let env = Env { reg, ctx: &ctx };
    if ctx.use_global_cache {
        let key = env.cache_key(dst.ty(), src.ty());
        if let Some(cp) = ctx.cache().get(&key) {
            return cp.copy(&env, dst, SrcRef::root(src));
        }
    }

    let cp = Builder::new(env).build(dst.ty(), src.ty())?;
    cp.copy(&env, dst, SrcRef::root(src))
}

/// Empties the global plan cache. Contexts bound to private caches are
/// unaffected.
pub fn clear_cache() {
    cache::global_cache().clear();
}
