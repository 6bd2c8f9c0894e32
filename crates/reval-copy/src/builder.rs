//! Plan building: the type-pair dispatch that turns a (destination type,
//! source type) pair into a cached copier.
//!
//! A build session keeps its freshly built plans in a pending set and flushes
//! them into the bound cache only when the whole session succeeds. Cyclic
//! struct types are resolved through the pending set: the struct copier is
//! registered before its field children are built, so a self-reference links
//! to the partially initialized plan by `Arc` handle instead of recursing.
//! Failed builds flush nothing, which keeps retries safe and keeps plans
//! referencing unsealed children out of the shared cache.

use std::collections::HashMap;
use std::sync::Arc;

use reval_reflect::{TypeId, ValueKind};

use crate::cache::CacheKey;
use crate::copier::{
    ConvertCopier, Copier, Env, HookOnlyCopier, Ptr2PtrCopier, Ptr2ValueCopier, Value2PtrCopier,
};
use crate::error::{CopyError, Result};
use crate::iface::{FromIfaceCopier, ToIfaceCopier};
use crate::map::MapCopier;
use crate::map_struct::{MapToStructCopier, StructToMapCopier};
use crate::slice::SliceCopier;
use crate::structs::{find_post_copy, StructCopier};

pub(crate) struct Builder<'a> {
    env: Env<'a>,
    pending: HashMap<CacheKey, Arc<Copier>>,
}

impl<'a> Builder<'a> {
    pub fn new(env: Env<'a>) -> Self {
        Self {
            env,
            pending: HashMap::new(),
        }
    }

    #[inline]
    pub fn env(&self) -> Env<'a> {
        self.env
    }

    /// Builds a copier for `src -> dst` and, on success, installs the
    /// session's plans into the bound cache.
    pub fn build(&mut self, dst: TypeId, src: TypeId) -> Result<Arc<Copier>> {
        let cp = self.build_inner(dst, src)?;
        let cache = self.env.ctx.cache();
        for (key, plan) in self.pending.drain() {
            cache.insert(key, plan);
        }
        Ok(cp)
    }

    pub(crate) fn pending_snapshot(&self) -> HashMap<CacheKey, Arc<Copier>> {
        self.pending.clone()
    }

    pub(crate) fn restore_pending(&mut self, snapshot: HashMap<CacheKey, Arc<Copier>>) {
        self.pending = snapshot;
    }

    pub(crate) fn build_inner(&mut self, dst: TypeId, src: TypeId) -> Result<Arc<Copier>> {
        let key = self.env.cache_key(dst, src);
        if let Some(cp) = self.env.ctx.cache().get(&key) {
            return Ok(cp);
        }
        if let Some(cp) = self.pending.get(&key) {
            return Ok(cp.clone());
        }

        let reg = self.env.reg;
        let (dst_kind, src_kind) = (reg.kind_of(dst), reg.kind_of(src));

        // Trivial case.
        if src_kind.is_primitive() {
            if dst == src {
                return self.install(key, Copier::Direct);
            }
            if reg.convertible(src, dst) {
                return self.install(key, Copier::Convert(ConvertCopier { dst }));
            }
        }

        if dst_kind == ValueKind::Interface {
            return self.install(key, Copier::ToIface(ToIfaceCopier));
        }
        if src_kind == ValueKind::Interface {
            return self.install(key, Copier::FromIface(FromIfaceCopier { dst }));
        }

        if src_kind == ValueKind::Pointer {
            if dst_kind == ValueKind::Pointer {
                let elem = reg.elem_of(dst).expect("pointer has an element type");
                let src_elem = reg.elem_of(src).expect("pointer has an element type");
                let inner = self.build_inner(elem, src_elem)?;
                return self.install(key, Copier::Ptr2Ptr(Ptr2PtrCopier { elem, inner }));
            }
            // ptr -> value
            if !self.env.ctx.copy_between_ptr_and_value {
                return self.non_copyable(dst, src);
            }
            let src_elem = reg.elem_of(src).expect("pointer has an element type");
            let inner = self.build_inner(dst, src_elem)?;
            return self.install(key, Copier::Ptr2Value(Ptr2ValueCopier { inner }));
        } else if dst_kind == ValueKind::Pointer {
            // value -> ptr
            if !self.env.ctx.copy_between_ptr_and_value {
                return self.non_copyable(dst, src);
            }
            let elem = reg.elem_of(dst).expect("pointer has an element type");
            let inner = self.build_inner(elem, src)?;
            return self.install(key, Copier::Value2Ptr(Value2PtrCopier { elem, inner }));
        }

        // Both sides are not pointers.
        if matches!(src_kind, ValueKind::Slice | ValueKind::Array) {
            if !matches!(dst_kind, ValueKind::Slice | ValueKind::Array) {
                return self.non_copyable(dst, src);
            }
            let cp = SliceCopier::build(self, dst, src)?;
            return self.install(key, Copier::Slice(cp));
        }

        if src_kind == ValueKind::Struct {
            if dst_kind == ValueKind::Struct {
                return self.build_struct(key, dst, src);
            }
            if dst_kind == ValueKind::Map && self.map_key_is_string(dst) {
                let cp = StructToMapCopier::build(self, dst, src)?;
                return self.install(key, Copier::StructToMap(cp));
            }
            return self.non_copyable(dst, src);
        }

        if src_kind == ValueKind::Map {
            if dst_kind == ValueKind::Map {
                let cp = MapCopier::build(self, dst, src)?;
                return self.install(key, Copier::Map(cp));
            }
            if dst_kind == ValueKind::Struct && self.map_key_is_string(src) {
                let cp = MapToStructCopier::build(self, dst, src)?;
                return self.install(key, Copier::MapToStruct(cp));
            }
        }

        self.non_copyable(dst, src)
    }

    /// Registers the struct copier before resolving its fields so cyclic
    /// source types link to the pending entry instead of recursing.
    fn build_struct(&mut self, key: CacheKey, dst: TypeId, src: TypeId) -> Result<Arc<Copier>> {
        let cp = Arc::new(Copier::Struct(StructCopier::new(dst, src)));
        self.pending.insert(key, cp.clone());
        let init = match &*cp {
            Copier::Struct(sc) => sc.init(self),
            _ => unreachable!(),
        };
        match init {
            Ok(()) => Ok(cp),
            Err(err) => {
                self.pending.remove(&key);
                Err(err)
            }
        }
    }

    fn map_key_is_string(&self, map_ty: TypeId) -> bool {
        self.env
            .reg
            .map_types(map_ty)
            .is_some_and(|(key, _)| self.env.reg.kind_of(key) == ValueKind::String)
    }

    fn install(&mut self, key: CacheKey, cp: Copier) -> Result<Arc<Copier>> {
        let cp = Arc::new(cp);
        self.pending.insert(key, cp.clone());
        Ok(cp)
    }

    /// The fallback for pairs no dispatch row accepts. Nop plans are not
    /// cached, same as failed builds: the pair stays re-evaluable.
    fn non_copyable(&self, dst: TypeId, src: TypeId) -> Result<Arc<Copier>> {
        if self.env.ctx.ignore_non_copyable_types {
            if let Some(method) = find_post_copy(&self.env, dst) {
                return Ok(Arc::new(Copier::HookOnly(HookOnlyCopier { dst_ty: dst, method })));
            }
            return Ok(Arc::new(Copier::Nop));
        }
        Err(CopyError::non_copyable(self.env.reg, dst, src))
    }
}
