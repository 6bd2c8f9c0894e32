//! Copiers bridging maps and structs.
//!
//! Both directions require the map side's key type to be string-kinded; the
//! builder checks that before routing here. Field keys follow the same tag
//! resolution as struct-to-struct copying.

use std::sync::Arc;

use reval_reflect::{TypeId, Value, ValueKind};

use crate::builder::Builder;
use crate::copier::{call_method, ConvertCopier, Copier, Env, SrcRef};
use crate::error::{CopyError, ErrorKind, Result};
use crate::structs::{find_post_copy, parse_all_fields, walk_dst_with_init, walk_src};

/// Copies map entries into the matching struct fields.
pub(crate) struct MapToStructCopier {
    dst_ty: TypeId,
    fields: Vec<MapFieldStep>,
    post_copy: Option<usize>,
}

struct MapFieldStep {
    key: String,
    field_name: String,
    dst_path: Vec<usize>,
    required: bool,
    nil_on_zero: bool,
    inner: Option<Arc<Copier>>,
}

impl MapToStructCopier {
    pub fn build(b: &mut Builder<'_>, dst: TypeId, src: TypeId) -> Result<Self> {
        let env = b.env();
        let (_, val_ty) = env.reg.map_types(src).expect("map has key/value types");
        let mut table = parse_all_fields(&env, dst);
        let mut fields = Vec::new();

        for key in table.keys() {
            let Some(df) = table.get_mut(&key) else {
                continue;
            };
            if df.done {
                continue;
            }
            df.done = true;
            let df_key = df.key.clone();
            let df_path = df.path.clone();
            let df_name = df.name.clone();
            let df_ty = df.ty;
            let df_exported = df.exported;
            let df_required = df.required;
            let df_nil_on_zero = df.nil_on_zero;

            if df_nil_on_zero
                && !matches!(
                    env.reg.kind_of(df_ty),
                    ValueKind::Pointer | ValueKind::Slice | ValueKind::Map | ValueKind::Interface
                )
            {
                return Err(CopyError::new(
                    ErrorKind::TypeInvalid,
                    format!(
                        "'nilonzero' requires a pointer-shaped field, '{}[{}]' is {}",
                        env.reg.display(dst),
                        df_name,
                        env.reg.display(df_ty),
                    ),
                ));
            }

            let inner = match build_entry_copier(b, df_ty, val_ty) {
                Ok(cp) => cp,
                // An unexported field that cannot take the map's value type
                // is skipped unless it insists on being copied.
                Err(err)
                    if err.kind() == ErrorKind::TypeNonCopyable
                        && !df_exported
                        && !df_required =>
                {
                    continue;
                }
                Err(err) => return Err(err),
            };
            if env.ctx.ignore_non_copyable_types
                && inner.as_ref().is_some_and(|cp| cp.is_nop())
                && df_required
            {
                return Err(CopyError::require_copying(env.reg, dst, &df_name));
            }

            fields.push(MapFieldStep {
                key: df_key,
                field_name: df_name,
                dst_path: df_path,
                required: df_required,
                nil_on_zero: df_nil_on_zero,
                inner,
            });
        }

        Ok(Self {
            dst_ty: dst,
            fields,
            post_copy: find_post_copy(&env, dst),
        })
    }

    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let Some(entries) = src.value.map_entries() else {
            // Nil source map leaves the destination untouched.
            return Ok(());
        };
        for step in &self.fields {
            let entry = entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(step.key.as_str()));
            let Some((_, value)) = entry else {
                if step.required {
                    return Err(CopyError::require_copying(
                        env.reg,
                        self.dst_ty,
                        &step.field_name,
                    ));
                }
                continue;
            };
            let nil_on_zero = step.nil_on_zero && value.is_zero_deref(env.reg);

            let dst_field = walk_dst_with_init(env.reg, dst, &step.dst_path);
            match &step.inner {
                Some(cp) => cp.copy(env, dst_field, SrcRef::unaddressable(value))?,
                None => dst_field.assign(value.clone()),
            }
            if nil_on_zero {
                *dst_field = Value::zero(env.reg, dst_field.ty());
            }
        }
        if let Some(index) = self.post_copy {
            let arg = Value::iface_with(env.reg, env.reg.interface_any(), src.value.clone());
            call_method(env, self.dst_ty, index, dst, arg)?;
        }
        Ok(())
    }
}

/// Copies struct fields into map entries keyed by the resolved field keys.
pub(crate) struct StructToMapCopier {
    dst_key: TypeId,
    dst_val: TypeId,
    entries: Vec<StructEntryStep>,
}

struct StructEntryStep {
    key: String,
    src_path: Vec<usize>,
    src_unexported: bool,
    inner: Option<Arc<Copier>>,
}

impl StructToMapCopier {
    pub fn build(b: &mut Builder<'_>, dst: TypeId, src: TypeId) -> Result<Self> {
        let env = b.env();
        let (dst_key, dst_val) = env.reg.map_types(dst).expect("map has key/value types");
        let mut table = parse_all_fields(&env, src);
        let mut entries = Vec::new();

        for key in table.keys() {
            let Some(sf) = table.get_mut(&key) else {
                continue;
            };
            if sf.done {
                continue;
            }
            sf.done = true;
            let sf_key = sf.key.clone();
            let sf_path = sf.path.clone();
            let sf_name = sf.name.clone();
            let sf_ty = sf.ty;
            let sf_exported = sf.exported;
            let sf_required = sf.required;

            let inner = match build_entry_copier(b, dst_val, sf_ty) {
                Ok(cp) => cp,
                Err(err)
                    if err.kind() == ErrorKind::TypeNonCopyable
                        && !sf_exported
                        && !sf_required =>
                {
                    continue;
                }
                Err(err) => return Err(err),
            };
            if inner.as_ref().is_some_and(|cp| cp.is_nop()) {
                if sf_required {
                    return Err(CopyError::require_copying(env.reg, src, &sf_name));
                }
                // Non-copyable field under the ignore flag: drop the entry.
                continue;
            }

            entries.push(StructEntryStep {
                key: sf_key,
                src_path: sf_path,
                src_unexported: !sf_exported,
                inner,
            });
        }

        Ok(Self {
            dst_key,
            dst_val,
            entries,
        })
    }

    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let mut out = Value::empty_map(env.reg, dst.ty());
        for step in &self.entries {
            let Some(src_field) = walk_src(env.reg, src, &step.src_path) else {
                // Field unreachable through a nil embedded pointer: no entry.
                continue;
            };
            if step.src_unexported && !src_field.addressable {
                return Err(CopyError::unaddressable());
            }
            let mut value = Value::zero(env.reg, self.dst_val);
            match &step.inner {
                Some(cp) => cp.copy(env, &mut value, src_field)?,
                None => value.assign(src_field.value.clone()),
            }
            let key = Value::of_str(env.reg, self.dst_key, &step.key);
            out.map_insert(key, value);
        }
        dst.assign(out);
        Ok(())
    }
}

/// Child copier for one field/entry pair; `None` means plain assignment.
/// Build failures of a whole subtree are rolled back so a skipped field
/// leaves no half-built plans behind.
fn build_entry_copier(
    b: &mut Builder<'_>,
    dst_ty: TypeId,
    src_ty: TypeId,
) -> Result<Option<Arc<Copier>>> {
    let env = b.env();
    if env.reg.kind_of(src_ty).is_primitive() {
        if src_ty == dst_ty {
            return Ok(None);
        }
        if env.reg.convertible(src_ty, dst_ty) {
            return Ok(Some(Arc::new(Copier::Convert(ConvertCopier { dst: dst_ty }))));
        }
    }
    let snapshot = b.pending_snapshot();
    match b.build_inner(dst_ty, src_ty) {
        Ok(cp) => Ok(Some(cp)),
        Err(err) => {
            b.restore_pending(snapshot);
            Err(err)
        }
    }
}
