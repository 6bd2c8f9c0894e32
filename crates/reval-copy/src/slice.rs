//! Slice and array copier.

use std::sync::Arc;

use reval_reflect::{TypeId, Value, ValueKind};

use crate::builder::Builder;
use crate::copier::{ConvertCopier, Copier, Env, SrcRef};
use crate::error::Result;

pub(crate) struct SliceCopier {
    item: Arc<Copier>,
    dst_elem: TypeId,
}

impl SliceCopier {
    pub fn build(b: &mut Builder<'_>, dst: TypeId, src: TypeId) -> Result<Self> {
        let env = b.env();
        let dst_elem = env.reg.elem_of(dst).expect("sequence has an element type");
        let src_elem = env.reg.elem_of(src).expect("sequence has an element type");

        // Primitive elements short-circuit to a leaf copier without the
        // extra dispatch layer a recursive build would add.
        let src_kind = env.reg.kind_of(src_elem);
        let item = if src_kind.is_primitive() && src_elem == dst_elem {
            Arc::new(Copier::Direct)
        } else if src_kind.is_primitive() && env.reg.convertible(src_elem, dst_elem) {
            Arc::new(Copier::Convert(ConvertCopier { dst: dst_elem }))
        } else {
            b.build_inner(dst_elem, src_elem)?
        };
        Ok(Self { item, dst_elem })
    }

    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let reg = env.reg;
        let src_len = src.value.seq_len();

        if reg.kind_of(dst.ty()) == ValueKind::Slice {
            // Slice/array -> slice: a nil source slice produces a nil
            // destination; otherwise the destination is reallocated at the
            // source length.
            if src.value.kind(reg) == ValueKind::Slice && src.value.is_nil() {
                *dst = Value::zero(reg, dst.ty());
                return Ok(());
            }
            let mut items = Vec::with_capacity(src_len);
            for i in 0..src_len {
                let mut item = Value::zero(reg, self.dst_elem);
                let s = src.seq_item(reg, i).expect("index within source length");
                self.item.copy(env, &mut item, s)?;
                items.push(item);
            }
            dst.set_slice_items(items);
            return Ok(());
        }

        // Slice/array -> array: copy the overlap, zero the tail.
        let dst_len = dst.seq_len();
        let n = src_len.min(dst_len);
        for i in 0..n {
            let s = src.seq_item(reg, i).expect("index within source length");
            let d = dst.seq_item_mut(i).expect("index within destination length");
            self.item.copy(env, d, s)?;
        }
        for i in n..dst_len {
            let d = dst.seq_item_mut(i).expect("index within destination length");
            *d = Value::zero(reg, d.ty());
        }
        Ok(())
    }
}
