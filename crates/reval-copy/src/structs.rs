//! Struct copier: field/method resolution, embedded traversal, access
//! bridging.
//!
//! Matching runs over the source's direct fields, then its inherited
//! (embedded) fields. Each field moves through one of four terminal states:
//! method-bound, field-bound, skipped, or required-failed. The `done` marker
//! is the terminal latch that keeps a field from matching twice when both a
//! direct and an inherited resolution would otherwise fire.
//!
//! The step list lives behind a `OnceLock`: the copier is registered with
//! the builder before its children are resolved (cyclic types link to it by
//! handle) and sealed before the build returns, so execution always observes
//! a complete plan.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use reval_reflect::{RetKind, TypeId, TypeRegistry, Value, ValueKind};

use crate::builder::Builder;
use crate::copier::{call_method, ConvertCopier, Copier, Env, SrcRef};
use crate::error::{CopyError, ErrorKind, Result};
use crate::tag::parse_field_tag;

pub(crate) struct StructCopier {
    dst_ty: TypeId,
    src_ty: TypeId,
    plan: OnceLock<StructPlan>,
}

struct StructPlan {
    steps: Vec<Step>,
    post_copy: Option<usize>,
}

enum Step {
    Field2Field(Field2FieldStep),
    Field2Method(Field2MethodStep),
}

/// Field copying detail resolved at build time.
pub(crate) struct FieldDetail {
    /// Positional path from the struct root; length > 1 for fields reached
    /// through embedded structs.
    pub path: Vec<usize>,
    /// Resolved matching key: tag override or field name.
    pub key: String,
    /// Original field name, for error messages.
    pub name: String,
    pub ty: TypeId,
    pub exported: bool,
    pub required: bool,
    pub nil_on_zero: bool,
    pub done: bool,
}

/// Direct and inherited field descriptors of one struct type.
pub(crate) struct FieldTable {
    pub direct_keys: Vec<String>,
    pub direct: HashMap<String, FieldDetail>,
    pub inherited_keys: Vec<String>,
    pub inherited: HashMap<String, FieldDetail>,
}

impl FieldTable {
    /// Direct fields shadow inherited fields of the same key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldDetail> {
        if self.direct.contains_key(key) {
            self.direct.get_mut(key)
        } else {
            self.inherited.get_mut(key)
        }
    }

    /// Iteration order for matching: direct keys, then inherited keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.direct_keys.clone();
        keys.extend(self.inherited_keys.iter().cloned());
        keys
    }
}

/// Parses all fields of a struct type: direct fields in declaration order,
/// then fields inherited through embedded structs, flattened depth-first.
/// Ignored fields are dropped here and never participate in matching.
pub(crate) fn parse_all_fields(env: &Env<'_>, ty: TypeId) -> FieldTable {
    let mut table = FieldTable {
        direct_keys: Vec::new(),
        direct: HashMap::new(),
        inherited_keys: Vec::new(),
        inherited: HashMap::new(),
    };
    let Some(fields) = env.reg.struct_fields(ty) else {
        return table;
    };
    for (i, f) in fields.iter().enumerate() {
        let tag = parse_field_tag(f.tag.as_deref(), &env.ctx.tag_name);
        if tag.ignored {
            continue;
        }
        let name = env.reg.resolve_name(f.name).unwrap_or_default().to_string();
        let key = tag.key.unwrap_or_else(|| name.clone());
        table.direct_keys.push(key.clone());
        table.direct.insert(
            key.clone(),
            FieldDetail {
                path: vec![i],
                key,
                name,
                ty: f.ty,
                exported: f.exported,
                required: tag.required,
                nil_on_zero: tag.nil_on_zero,
                done: false,
            },
        );
        if f.embedded {
            parse_nested_fields(env, f.ty, &[i], &mut table);
        }
    }
    table
}

/// Collects the fields of an embedded struct under `base`. An embedded
/// struct pointer is traversed through its element type; access bridging
/// through the pointer is deferred to execution.
fn parse_nested_fields(env: &Env<'_>, ty: TypeId, base: &[usize], table: &mut FieldTable) {
    let ty = match env.reg.kind_of(ty) {
        ValueKind::Pointer => env.reg.elem_of(ty).expect("pointer has an element type"),
        _ => ty,
    };
    let Some(fields) = env.reg.struct_fields(ty) else {
        return;
    };
    for (i, f) in fields.iter().enumerate() {
        let tag = parse_field_tag(f.tag.as_deref(), &env.ctx.tag_name);
        if tag.ignored {
            continue;
        }
        let name = env.reg.resolve_name(f.name).unwrap_or_default().to_string();
        let key = tag.key.unwrap_or_else(|| name.clone());
        let mut path = base.to_vec();
        path.push(i);
        table.inherited_keys.push(key.clone());
        table.inherited.insert(
            key.clone(),
            FieldDetail {
                path: path.clone(),
                key,
                name,
                ty: f.ty,
                exported: f.exported,
                required: tag.required,
                nil_on_zero: tag.nil_on_zero,
                done: false,
            },
        );
        if f.embedded {
            parse_nested_fields(env, f.ty, &path, table);
        }
    }
}

/// Copying methods of the destination type: name pattern `Copy*`, exactly
/// one argument, returning the error abstraction. Methods of any other
/// shape are ignored silently.
fn collect_copying_methods(env: &Env<'_>, ty: TypeId) -> HashMap<String, (usize, TypeId)> {
    let mut out = HashMap::new();
    for (i, m) in env.reg.methods_of(ty).iter().enumerate() {
        let Some(name) = env.reg.resolve_name(m.name) else {
            continue;
        };
        if !name.starts_with("Copy") {
            continue;
        }
        if m.sig.args.len() != 1 || m.sig.ret != RetKind::Error {
            continue;
        }
        out.insert(name.to_string(), (i, m.sig.args[0]));
    }
    out
}

/// `PostCopy(any) error` in the destination's method set, if present.
/// Any deviation from that shape is ignored.
pub(crate) fn find_post_copy(env: &Env<'_>, ty: TypeId) -> Option<usize> {
    env.reg.methods_of(ty).iter().position(|m| {
        env.reg.resolve_name(m.name) == Some("PostCopy")
            && m.sig.args.len() == 1
            && m.sig.args[0] == env.reg.interface_any()
            && m.sig.ret == RetKind::Error
    })
}

fn copy_method_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    out.push_str("Copy");
    let mut chars = key.chars();
    if let Some(c) = chars.next() {
        out.extend(c.to_uppercase());
        out.push_str(chars.as_str());
    }
    out
}

impl StructCopier {
    pub fn new(dst_ty: TypeId, src_ty: TypeId) -> Self {
        Self {
            dst_ty,
            src_ty,
            plan: OnceLock::new(),
        }
    }

    pub fn init(&self, b: &mut Builder<'_>) -> Result<()> {
        let env = b.env();
        let methods = if env.ctx.copy_between_struct_field_and_method {
            Some(collect_copying_methods(&env, self.dst_ty))
        } else {
            None
        };

        let mut dst_table = parse_all_fields(&env, self.dst_ty);
        let mut src_table = parse_all_fields(&env, self.src_ty);
        let mut steps = Vec::new();

        for key in src_table.keys() {
            let Some(sf) = src_table.get_mut(&key) else {
                continue;
            };
            if sf.done {
                continue;
            }

            // Copying methods take precedence over field matches.
            if let Some(methods) = &methods {
                let method_name = copy_method_name(&key);
                if let Some(&(index, arg_ty)) = methods.get(&method_name) {
                    if !env.reg.assignable(sf.ty, arg_ty) {
                        return Err(CopyError::new(
                            ErrorKind::MethodInvalid,
                            format!(
                                "struct method '{}.{}' does not accept argument type '{}' from '{}[{}]'",
                                env.reg.display(self.dst_ty),
                                method_name,
                                env.reg.display(sf.ty),
                                env.reg.display(self.src_ty),
                                sf.name,
                            ),
                        ));
                    }
                    steps.push(Step::Field2Method(Field2MethodStep {
                        src_path: sf.path.clone(),
                        src_unexported: !sf.exported,
                        recv_ty: self.dst_ty,
                        method: index,
                        arg_any: arg_ty != sf.ty,
                    }));
                    sf.done = true;
                    continue;
                }
            }

            let sf_path = sf.path.clone();
            let sf_name = sf.name.clone();
            let sf_ty = sf.ty;
            let sf_exported = sf.exported;
            let sf_required = sf.required;

            let Some(df) = dst_table.get_mut(&key) else {
                if sf_required {
                    return Err(CopyError::require_copying(env.reg, self.src_ty, &sf_name));
                }
                continue;
            };
            if df.done {
                if sf_required {
                    return Err(CopyError::require_copying(env.reg, self.src_ty, &sf_name));
                }
                continue;
            }

            if df.nil_on_zero
                && !matches!(
                    env.reg.kind_of(df.ty),
                    ValueKind::Pointer | ValueKind::Slice | ValueKind::Map | ValueKind::Interface
                )
            {
                return Err(CopyError::new(
                    ErrorKind::TypeInvalid,
                    format!(
                        "'nilonzero' requires a pointer-shaped field, '{}[{}]' is {}",
                        env.reg.display(self.dst_ty),
                        df.name,
                        env.reg.display(df.ty),
                    ),
                ));
            }

            let df_ty = df.ty;
            let df_name = df.name.clone();
            let df_required = df.required;
            let df_exported = df.exported;

            let snapshot = b.pending_snapshot();
            let inner = match build_field_copier(
                b,
                self.dst_ty,
                self.src_ty,
                df_ty,
                &df_name,
                df_required,
                sf_ty,
                &sf_name,
                sf_required,
            ) {
                Ok(inner) => inner,
                // An unexported field pair with no copier is skipped unless
                // a side insists on being copied.
                Err(err)
                    if err.kind() == ErrorKind::TypeNonCopyable
                        && !(sf_exported && df_exported)
                        && !sf_required
                        && !df_required =>
                {
                    b.restore_pending(snapshot);
                    dst_table.get_mut(&key).expect("dst field still present").done = true;
                    src_table.get_mut(&key).expect("src field still present").done = true;
                    continue;
                }
                Err(err) => return Err(err),
            };
            let df = dst_table.get_mut(&key).expect("dst field still present");
            steps.push(Step::Field2Field(Field2FieldStep {
                src_path: sf_path,
                dst_path: df.path.clone(),
                src_unexported: !sf_exported,
                inner,
                nil_on_zero: df.nil_on_zero,
            }));
            df.done = true;
            src_table
                .get_mut(&key)
                .expect("src field still present")
                .done = true;
        }

        // Remaining dst fields have no source; required ones fail the build.
        for df in dst_table.direct.values().chain(dst_table.inherited.values()) {
            if !df.done && df.required {
                return Err(CopyError::require_copying(env.reg, self.dst_ty, &df.name));
            }
        }

        let plan = StructPlan {
            steps,
            post_copy: find_post_copy(&env, self.dst_ty),
        };
        self.plan
            .set(plan)
            .unwrap_or_else(|_| panic!("struct plan initialized twice"));
        Ok(())
    }

    pub fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let plan = self.plan.get().expect("struct plan sealed before execution");
        for step in &plan.steps {
            match step {
                Step::Field2Field(s) => s.copy(env, dst, src)?,
                Step::Field2Method(s) => s.copy(env, dst, src)?,
            }
        }
        if let Some(index) = plan.post_copy {
            let arg = Value::iface_with(env.reg, env.reg.interface_any(), src.value.clone());
            call_method(env, self.dst_ty, index, dst, arg)?;
        }
        Ok(())
    }
}

/// Builds the child copier of a field pair, with the primitive shortcut
/// (`None` means plain assignment) and the required-versus-nop check.
#[allow(clippy::too_many_arguments)]
fn build_field_copier(
    b: &mut Builder<'_>,
    dst_owner: TypeId,
    src_owner: TypeId,
    dst_fty: TypeId,
    dst_fname: &str,
    dst_required: bool,
    src_fty: TypeId,
    src_fname: &str,
    src_required: bool,
) -> Result<Option<Arc<Copier>>> {
    let env = b.env();
    if env.reg.kind_of(src_fty).is_primitive() {
        if src_fty == dst_fty {
            // Unset child copier triggers plain assignment.
            return Ok(None);
        }
        if env.reg.convertible(src_fty, dst_fty) {
            return Ok(Some(Arc::new(Copier::Convert(ConvertCopier { dst: dst_fty }))));
        }
    }

    let cp = b.build_inner(dst_fty, src_fty)?;
    if env.ctx.ignore_non_copyable_types && cp.is_nop() {
        if dst_required {
            return Err(CopyError::require_copying(env.reg, dst_owner, dst_fname));
        }
        if src_required {
            return Err(CopyError::require_copying(env.reg, src_owner, src_fname));
        }
    }
    Ok(Some(cp))
}

struct Field2FieldStep {
    src_path: Vec<usize>,
    dst_path: Vec<usize>,
    /// Access bridge for the source side: reading an unexported field
    /// requires the enclosing value to be addressable. The destination is
    /// reached through the settable root and needs no bridge.
    src_unexported: bool,
    inner: Option<Arc<Copier>>,
    nil_on_zero: bool,
}

impl Field2FieldStep {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let src_field = match walk_src(env.reg, src, &self.src_path) {
            Some(f) => f,
            None => {
                // A nil embedded pointer makes the source field absent:
                // reset the destination field if it is reachable.
                zero_dst_field(env.reg, dst, &self.dst_path);
                return Ok(());
            }
        };
        if self.src_unexported && !src_field.addressable {
            return Err(CopyError::unaddressable());
        }
        let nil_on_zero = self.nil_on_zero && src_field.value.is_zero_deref(env.reg);

        let dst_field = walk_dst_with_init(env.reg, dst, &self.dst_path);
        match &self.inner {
            Some(cp) => cp.copy(env, dst_field, src_field)?,
            None => dst_field.assign(src_field.value.clone()),
        }
        if nil_on_zero {
            *dst_field = Value::zero(env.reg, dst_field.ty());
        }
        Ok(())
    }
}

struct Field2MethodStep {
    src_path: Vec<usize>,
    src_unexported: bool,
    recv_ty: TypeId,
    method: usize,
    /// The method takes the untyped-any abstraction; box the field into it.
    arg_any: bool,
}

impl Field2MethodStep {
    fn copy(&self, env: &Env<'_>, dst: &mut Value, src: SrcRef<'_>) -> Result<()> {
        let src_field = match walk_src(env.reg, src, &self.src_path) {
            // Field unreachable through a nil embedded pointer: skip.
            None => return Ok(()),
            Some(f) => f,
        };
        if self.src_unexported && !src_field.addressable {
            return Err(CopyError::unaddressable());
        }
        let mut arg = src_field.value.clone();
        if self.arg_any {
            arg = Value::iface_with(env.reg, env.reg.interface_any(), arg);
        }
        call_method(env, self.recv_ty, self.method, dst, arg)
    }
}

/// Walks a positional field path on the source side, dereferencing embedded
/// struct pointers between hops. Returns `None` when a nil pointer makes
/// the field unreachable.
pub(crate) fn walk_src<'a>(
    reg: &TypeRegistry,
    mut cur: SrcRef<'a>,
    path: &[usize],
) -> Option<SrcRef<'a>> {
    for (hop, &index) in path.iter().enumerate() {
        if hop > 0 {
            while cur.value.kind(reg) == ValueKind::Pointer {
                cur = cur.deref()?;
            }
        }
        cur = cur.field(index)?;
    }
    Some(cur)
}

/// Walks a positional field path on the destination side, allocating nil
/// embedded struct pointers along the way.
pub(crate) fn walk_dst_with_init<'a>(
    reg: &TypeRegistry,
    root: &'a mut Value,
    path: &[usize],
) -> &'a mut Value {
    let mut cur = root;
    for &index in path {
        while reg.kind_of(cur.ty()) == ValueKind::Pointer {
            if cur.deref().is_none() {
                let elem = reg.elem_of(cur.ty()).expect("pointer has an element type");
                let zero = Value::zero(reg, elem);
                cur.set_pointee(zero);
            }
            cur = Value::deref_mut(cur).expect("pointee allocated above");
        }
        cur = Value::field_mut(cur, index).expect("field path within bounds");
    }
    cur
}

/// Zeroes a destination field if it is reachable without allocating; a nil
/// embedded pointer on the way leaves the destination untouched.
fn zero_dst_field(reg: &TypeRegistry, root: &mut Value, path: &[usize]) {
    let mut cur = root;
    for (hop, &index) in path.iter().enumerate() {
        if hop > 0 {
            while reg.kind_of(cur.ty()) == ValueKind::Pointer {
                match Value::deref_mut(cur) {
                    Some(p) => cur = p,
                    None => return,
                }
            }
        }
        cur = match Value::field_mut(cur, index) {
            Some(f) => f,
            None => return,
        };
    }
    *cur = Value::zero(reg, cur.ty());
}
