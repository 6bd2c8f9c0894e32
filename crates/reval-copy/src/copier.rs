//! Copier plans and their executors.
//!
//! A plan is a tagged variant built once per (destination type, source type,
//! flags) triple and cached. Dispatch happens by kind-pair at build time, so
//! execution is a direct walk over already-resolved child nodes. The only
//! lazily-built site is `FromIface`, where the dynamic type is unknown until
//! copy time.

use reval_reflect::{convert, Value, TypeId, TypeRegistry, ValueKind};

use crate::builder::Builder;
use crate::context::Context;
use crate::error::{CopyError, ErrorKind, Result};
use crate::iface::{FromIfaceCopier, ToIfaceCopier};
use crate::map::MapCopier;
use crate::map_struct::{MapToStructCopier, StructToMapCopier};
use crate::slice::SliceCopier;
use crate::structs::StructCopier;

/// Shared build/execution environment.
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    pub reg: &'a TypeRegistry,
    pub ctx: &'a Context,
}

impl<'a> Env<'a> {
    pub fn cache_key(&self, dst: TypeId, src: TypeId) -> crate::cache::CacheKey {
        crate::cache::CacheKey {
            registry: self.reg.registry_id(),
            dst,
            src,
            flags: self.ctx.flags(),
        }
    }
}

/// A borrowed source location plus its addressability.
///
/// Addressability mirrors the Go `reflect` rules the engine's access
/// bridging depends on: the top-level source is unaddressable unless it was
/// passed as a pointer; dereferencing makes the chain addressable; slice
/// elements are always addressable; interface unwrapping and map values are
/// not; struct and array elements inherit.
#[derive(Clone, Copy)]
pub(crate) struct SrcRef<'a> {
    pub value: &'a Value,
    pub addressable: bool,
}

impl<'a> SrcRef<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            addressable: false,
        }
    }

    pub fn deref(self) -> Option<SrcRef<'a>> {
        self.value.deref().map(|value| SrcRef {
            value,
            addressable: true,
        })
    }

    pub fn iface_elem(self) -> Option<SrcRef<'a>> {
        self.value.iface_value().map(|value| SrcRef {
            value,
            addressable: false,
        })
    }

    pub fn field(self, i: usize) -> Option<SrcRef<'a>> {
        self.value.field(i).map(|value| SrcRef {
            value,
            addressable: self.addressable,
        })
    }

    pub fn seq_item(self, reg: &TypeRegistry, i: usize) -> Option<SrcRef<'a>> {
        let addressable = match self.value.kind(reg) {
            ValueKind::Slice => true,
            _ => self.addressable,
        };
        self.value.seq_item(i).map(|value| SrcRef { value, addressable })
    }

    pub fn unaddressable(value: &'a Value) -> Self {
        Self {
            value,
            addressable: false,
        }
    }
}

/// Compiled copier plan.
pub(crate) enum Copier {
    /// Writes nothing.
    Nop,
    /// Writes nothing but still dispatches the destination's post-copy hook.
    HookOnly(HookOnlyCopier),
    /// Identity assignment between identical primitive types.
    Direct,
    /// Primitive conversion into the destination type.
    Convert(ConvertCopier),
    Value2Ptr(Value2PtrCopier),
    Ptr2Value(Ptr2ValueCopier),
    Ptr2Ptr(Ptr2PtrCopier),
    FromIface(FromIfaceCopier),
    ToIface(ToIfaceCopier),
    Slice(SliceCopier),
    Map(MapCopier),
    Struct(StructCopier),
    MapToStruct(MapToStructCopier),
    StructToMap(StructToMapCopier),
}

impl Copier {
    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        match self {
            Copier::Nop => Ok(()),
            Copier::HookOnly(c) => c.copy(env, dst, src),
            Copier::Direct => {
                dst.assign(src.value.clone());
                Ok(())
            }
            Copier::Convert(c) => c.copy(env, dst, src),
            Copier::Value2Ptr(c) => c.copy(env, dst, src),
            Copier::Ptr2Value(c) => c.copy(env, dst, src),
            Copier::Ptr2Ptr(c) => c.copy(env, dst, src),
            Copier::FromIface(c) => c.copy(env, dst, src),
            Copier::ToIface(c) => c.copy(env, dst, src),
            Copier::Slice(c) => c.copy(env, dst, src),
            Copier::Map(c) => c.copy(env, dst, src),
            Copier::Struct(c) => c.copy(env, dst, src),
            Copier::MapToStruct(c) => c.copy(env, dst, src),
            Copier::StructToMap(c) => c.copy(env, dst, src),
        }
    }

    /// True for plans that write nothing into the destination.
    pub fn is_nop(&self) -> bool {
        matches!(self, Copier::Nop | Copier::HookOnly(_))
    }
}

pub(crate) struct ConvertCopier {
    pub dst: TypeId,
}

impl ConvertCopier {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        dst.assign(convert(env.reg, src.value, self.dst));
        Ok(())
    }
}

pub(crate) struct Value2PtrCopier {
    pub elem: TypeId,
    pub inner: std::sync::Arc<Copier>,
}

impl Value2PtrCopier {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        if dst.deref().is_none() {
            dst.set_pointee(Value::zero(env.reg, self.elem));
        }
        let pointee = dst.deref_mut().expect("pointee just allocated");
        self.inner.copy(env, pointee, src)
    }
}

pub(crate) struct Ptr2ValueCopier {
    pub inner: std::sync::Arc<Copier>,
}

impl Ptr2ValueCopier {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        match src.deref() {
            None => {
                *dst = Value::zero(env.reg, dst.ty());
                Ok(())
            }
            Some(pointee) => self.inner.copy(env, dst, pointee),
        }
    }
}

pub(crate) struct Ptr2PtrCopier {
    pub elem: TypeId,
    pub inner: std::sync::Arc<Copier>,
}

impl Ptr2PtrCopier {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let pointee_src = match src.deref() {
            None => {
                *dst = Value::zero(env.reg, dst.ty());
                return Ok(());
            }
            Some(p) => p,
        };
        if dst.deref().is_none() {
            dst.set_pointee(Value::zero(env.reg, self.elem));
        }
        let pointee_dst = dst.deref_mut().expect("pointee just allocated");
        self.inner.copy(env, pointee_dst, pointee_src)
    }
}

/// Plan for a non-copyable pair under the ignore flag whose destination is a
/// struct with a post-copy hook: nothing is written, the hook still fires.
pub(crate) struct HookOnlyCopier {
    pub dst_ty: TypeId,
    pub method: usize,
}

impl HookOnlyCopier {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let arg = Value::iface_with(env.reg, env.reg.interface_any(), src.value.clone());
        call_method(env, self.dst_ty, self.method, dst, arg)
    }
}

/// Invokes a registered method on `recv`, converting a user error into a
/// `MethodFailure` that surfaces the original unmodified.
pub(crate) fn call_method(
    env: &Env<'_>,
    recv_ty: TypeId,
    index: usize,
    recv: &mut Value,
    arg: Value,
) -> Result<()> {
    let methods = env.reg.methods_of(recv_ty);
    let method = methods.get(index).ok_or_else(|| {
        CopyError::new(
            ErrorKind::TypeInvalid,
            format!("method index {} out of range on {}", index, env.reg.display(recv_ty)),
        )
    })?;
    (method.func)(recv, arg).map_err(CopyError::method_failed)
}

/// Builds a copier on demand during execution (the `FromIface` path).
pub(crate) fn build_at_copy_time(
    env: &Env<'_>,
    dst: TypeId,
    src: TypeId,
) -> Result<std::sync::Arc<Copier>> {
    Builder::new(*env).build(dst, src)
}
