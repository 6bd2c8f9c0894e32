//! Map copier.

use std::sync::Arc;

use reval_reflect::{TypeId, Value};

use crate::builder::Builder;
use crate::copier::{Copier, Env, SrcRef};
use crate::error::Result;

pub(crate) struct MapCopier {
    key: Arc<Copier>,
    val: Arc<Copier>,
    dst_key: TypeId,
    dst_val: TypeId,
}

impl MapCopier {
    pub fn build(b: &mut Builder<'_>, dst: TypeId, src: TypeId) -> Result<Self> {
        let env = b.env();
        let (dst_key, dst_val) = env.reg.map_types(dst).expect("map has key/value types");
        let (src_key, src_val) = env.reg.map_types(src).expect("map has key/value types");
        let key = b.build_inner(dst_key, src_key)?;
        let val = b.build_inner(dst_val, src_val)?;
        Ok(Self {
            key,
            val,
            dst_key,
            dst_val,
        })
    }

    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let Some(entries) = src.value.map_entries() else {
            // Nil source map produces a nil destination.
            *dst = Value::zero(env.reg, dst.ty());
            return Ok(());
        };
        let mut out = Value::empty_map(env.reg, dst.ty());
        for (k, v) in entries {
            // Map keys and values are never addressable.
            let mut dk = Value::zero(env.reg, self.dst_key);
            self.key.copy(env, &mut dk, SrcRef::unaddressable(k))?;
            let mut dv = Value::zero(env.reg, self.dst_val);
            self.val.copy(env, &mut dv, SrcRef::unaddressable(v))?;
            out.map_insert(dk, dv);
        }
        dst.assign(out);
        Ok(())
    }
}
