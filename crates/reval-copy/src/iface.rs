//! Interface bridges.
//!
//! Both bridges unwrap nested interface wrapping until a concrete dynamic
//! value (or nil) is found. The dynamic type is only known at copy time, so
//! this is the one place where plans are built during execution.

use reval_reflect::{TypeId, Value, ValueKind};

use crate::copier::{build_at_copy_time, Env, SrcRef};
use crate::error::Result;

/// Copies out of an interface source into a concrete destination.
pub(crate) struct FromIfaceCopier {
    pub dst: TypeId,
}

impl FromIfaceCopier {
    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let mut cur = src;
        while cur.value.kind(env.reg) == ValueKind::Interface {
            match cur.iface_elem() {
                Some(inner) => cur = inner,
                None => {
                    *dst = Value::zero(env.reg, dst.ty());
                    return Ok(());
                }
            }
        }
        let cp = build_at_copy_time(env, self.dst, cur.value.ty())?;
        cp.copy(env, dst, cur)
    }
}

/// Copies a source into an interface destination by boxing a deep clone of
/// the source's dynamic value. The clone shares no storage with the source.
pub(crate) struct ToIfaceCopier;

impl ToIfaceCopier {
    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let mut cur = src;
        while cur.value.kind(env.reg) == ValueKind::Interface {
            match cur.iface_elem() {
                Some(inner) => cur = inner,
                None => {
                    *dst = Value::zero(env.reg, dst.ty());
                    return Ok(());
                }
            }
        }
        let dynamic_ty = cur.value.ty();
        let cp = build_at_copy_time(env, dynamic_ty, dynamic_ty)?;
        let mut clone = Value::zero(env.reg, dynamic_ty);
        cp.copy(env, &mut clone, cur)?;
        dst.iface_set(clone);
        Ok(())
    }
}
