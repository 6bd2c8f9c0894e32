//! Copy context and options.
//!
//! A fresh `Context` is created per top-level copy; options are applicator
//! closures mutating it before `prepare` binds the cache and reduces the
//! boolean options to the flag bitset used in cache keys.

use std::sync::{Arc, OnceLock, RwLock};

use crate::cache::{global_cache, CopierCache};

/// Tag name used when none has been configured.
pub const DEFAULT_TAG_NAME: &str = "copy";

// Flag bit positions. Shared with the cache key, so changing them
// invalidates nothing but separates plans built before and after.
const FLAG_COPY_BETWEEN_PTR_AND_VALUE: u8 = 1;
const FLAG_COPY_BETWEEN_STRUCT_FIELD_AND_METHOD: u8 = 2;
const FLAG_IGNORE_NON_COPYABLE_TYPES: u8 = 3;

static TAG_NAME: OnceLock<RwLock<String>> = OnceLock::new();

fn tag_name_store() -> &'static RwLock<String> {
    TAG_NAME.get_or_init(|| RwLock::new(DEFAULT_TAG_NAME.to_string()))
}

/// The process-wide default tag name.
pub fn default_tag_name() -> String {
    tag_name_store().read().expect("tag name lock poisoned").clone()
}

/// Sets the process-wide default tag name.
///
/// Only a non-empty identifier (alphabetic or `_` start, alphanumeric or `_`
/// continuation) is accepted; anything else is silently rejected. Intended
/// to be called once at startup, before any copying.
pub fn set_default_tag_name(name: &str) {
    if !is_identifier(name) {
        return;
    }
    *tag_name_store().write().expect("tag name lock poisoned") = name.to_string();
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Per-copy configuration.
pub struct Context {
    /// Allow copying between pointers and values (default `true`).
    pub copy_between_ptr_and_value: bool,

    /// Allow copying between struct fields and methods (default `true`).
    pub copy_between_struct_field_and_method: bool,

    /// Ignore non-copyable pairs instead of failing (default `false`).
    pub ignore_non_copyable_types: bool,

    /// Bind to the process-wide plan cache (default `true`); otherwise a
    /// private cache is allocated and dropped with the context.
    pub use_global_cache: bool,

    /// Tag name struct-field directives are looked up under.
    pub tag_name: String,

    cache: Option<Arc<CopierCache>>,
    flags: u8,
}

impl Context {
    pub(crate) fn default_context() -> Self {
        Self {
            copy_between_ptr_and_value: true,
            copy_between_struct_field_and_method: true,
            ignore_non_copyable_types: false,
            use_global_cache: true,
            tag_name: default_tag_name(),
            cache: None,
            flags: 0,
        }
    }

    /// Binds the cache and recalculates the flags.
    pub(crate) fn prepare(&mut self) {
        self.cache = Some(if self.use_global_cache {
            global_cache()
        } else {
            Arc::new(CopierCache::new())
        });
        self.flags = 0;
        if self.copy_between_ptr_and_value {
            self.flags |= 1 << FLAG_COPY_BETWEEN_PTR_AND_VALUE;
        }
        if self.copy_between_struct_field_and_method {
            self.flags |= 1 << FLAG_COPY_BETWEEN_STRUCT_FIELD_AND_METHOD;
        }
        if self.ignore_non_copyable_types {
            self.flags |= 1 << FLAG_IGNORE_NON_COPYABLE_TYPES;
        }
    }

    #[inline]
    pub(crate) fn cache(&self) -> &Arc<CopierCache> {
        self.cache.as_ref().expect("context not prepared")
    }

    #[inline]
    pub(crate) fn flags(&self) -> u8 {
        self.flags
    }
}

/// Applicator mutating a fresh context.
pub type CopyOption = Box<dyn Fn(&mut Context) + Send + Sync>;

/// Allow or forbid copying between pointers and values.
pub fn copy_between_ptr_and_value(flag: bool) -> CopyOption {
    Box::new(move |ctx| ctx.copy_between_ptr_and_value = flag)
}

/// Allow or forbid copying between struct fields and methods.
pub fn copy_between_struct_field_and_method(flag: bool) -> CopyOption {
    Box::new(move |ctx| ctx.copy_between_struct_field_and_method = flag)
}

/// Skip non-copyable pairs instead of failing the build.
pub fn ignore_non_copyable_types(flag: bool) -> CopyOption {
    Box::new(move |ctx| ctx.ignore_non_copyable_types = flag)
}

/// Bind to the global plan cache, or a private one.
pub fn use_global_cache(flag: bool) -> CopyOption {
    Box::new(move |ctx| ctx.use_global_cache = flag)
}
