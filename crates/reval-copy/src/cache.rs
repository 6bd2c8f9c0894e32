//! Compiled-plan cache.
//!
//! Plans are immutable once installed; reads take the shared half of the
//! lock, installs the exclusive half. Two callers may race to build the same
//! key; both succeed and the second install overwrites the first with an
//! operationally identical plan.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use reval_reflect::TypeId;

use crate::copier::Copier;

/// Key of a cached copier. `TypeId`s are registry-scoped, so the registry id
/// partitions the process-wide cache between registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub registry: u32,
    pub dst: TypeId,
    pub src: TypeId,
    pub flags: u8,
}

pub(crate) struct CopierCache {
    map: RwLock<HashMap<CacheKey, Arc<Copier>>>,
}

impl CopierCache {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Copier>> {
        self.map.read().expect("cache lock poisoned").get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, cp: Arc<Copier>) {
        self.map.write().expect("cache lock poisoned").insert(key, cp);
    }

    pub fn clear(&self) {
        self.map.write().expect("cache lock poisoned").clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.read().expect("cache lock poisoned").len()
    }
}

static GLOBAL_CACHE: OnceLock<Arc<CopierCache>> = OnceLock::new();

/// The process-wide cache shared by contexts with `use_global_cache`.
pub(crate) fn global_cache() -> Arc<CopierCache> {
    GLOBAL_CACHE.get_or_init(|| Arc::new(CopierCache::new())).clone()
}
