//! Recursive reference and call-result resolution across files.
//!
//! Every public entry point is depth-bounded and carries a (file, binding)
//! seen-set, so cyclic aliasing terminates as a deterministic resolution
//! failure instead of recursing forever. Resolution never panics and never
//! guesses: anything that cannot be statically determined comes back as
//! `None` and is treated as dynamic by callers.

use crate::aliases::AliasRegistry;
use crate::ast::{ArrayElem, Expr, FnBody, Func, ObjectEntry, Stmt, TemplatePart};
use crate::config::Config;
use crate::symbols::{ExportTarget, ImportKind, ReExport, SymbolIndex, is_key_factory_name};
use crate::util;
use std::collections::{HashMap, HashSet};

/// Passthrough helpers that return their sole object/array argument
/// unchanged.
const IDENTITY_WRAPPERS: &[&str] = &["queryOptions", "infiniteQueryOptions"];

/// Fixed search order when a module specifier omits its extension.
const MODULE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "d.ts"];

/// An expression resolved to its defining file. Nested identifiers inside
/// `expr` must be resolved against `file`, not against the original caller.
#[derive(Debug, Clone)]
pub struct ResolvedExpr {
    pub expr: Expr,
    pub file: String,
}

/// Outcome of a reference lookup.
#[derive(Debug, Clone)]
pub enum Resolved {
    Expr(ResolvedExpr),
    /// `import * as ns from "mod"`; members resolve as exports of `file`.
    Namespace { file: String },
}

impl Resolved {
    pub fn into_expr(self) -> Option<ResolvedExpr> {
        match self {
            Resolved::Expr(resolved) => Some(resolved),
            Resolved::Namespace { .. } => None,
        }
    }
}

struct Trace {
    depth: usize,
    seen: HashSet<(String, String)>,
}

impl Trace {
    fn new() -> Self {
        Self {
            depth: 0,
            seen: HashSet::new(),
        }
    }

    fn enter(&mut self, cap: usize) -> bool {
        if self.depth >= cap {
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn mark(&mut self, file: &str, binding: &str) -> bool {
        self.seen.insert((file.to_string(), binding.to_string()))
    }
}

pub struct Resolver<'i> {
    index: &'i SymbolIndex,
    aliases: &'i AliasRegistry,
    depth_cap: usize,
    /// Memoized module-specifier resolution, keyed per run.
    module_cache: HashMap<(String, String), Option<String>>,
}

impl<'i> Resolver<'i> {
    pub fn new(index: &'i SymbolIndex, aliases: &'i AliasRegistry) -> Self {
        Self {
            index,
            aliases,
            depth_cap: Config::get().resolve_depth,
            module_cache: HashMap::new(),
        }
    }

    pub fn with_depth_cap(mut self, cap: usize) -> Self {
        self.depth_cap = cap;
        self
    }

    pub fn index(&self) -> &SymbolIndex {
        self.index
    }

    /// Resolve an identifier in the context of `file`.
    pub fn resolve_reference(&mut self, file: &str, name: &str) -> Option<Resolved> {
        let mut trace = Trace::new();
        self.reference_at(file, name, &mut trace)
    }

    /// Resolve any expression to a structural value (literal, array, object,
    /// template or function) plus its defining file.
    pub fn resolve_expr(&mut self, file: &str, expr: &Expr) -> Option<ResolvedExpr> {
        let mut trace = Trace::new();
        self.expr_at(file, expr, &mut trace)?.into_expr()
    }

    /// Resolve the statically-known result of calling `callee(args…)`.
    pub fn resolve_call_result(
        &mut self,
        file: &str,
        callee: &Expr,
        args: &[Expr],
    ) -> Option<ResolvedExpr> {
        let mut trace = Trace::new();
        self.call_result_at(file, callee, args, &mut trace)?
            .into_expr()
    }

    /// Resolve a module specifier to a repo-relative file known to the index.
    pub fn resolve_module(&mut self, from_file: &str, specifier: &str) -> Option<String> {
        let from_dir = util::parent_dir(from_file).to_string();
        let cache_key = (from_dir.clone(), specifier.to_string());
        if let Some(cached) = self.module_cache.get(&cache_key) {
            return cached.clone();
        }
        let resolved = self.resolve_module_uncached(from_file, &from_dir, specifier);
        self.module_cache.insert(cache_key, resolved.clone());
        resolved
    }

    fn resolve_module_uncached(
        &self,
        from_file: &str,
        from_dir: &str,
        specifier: &str,
    ) -> Option<String> {
        let specifier = specifier
            .split(|ch| ch == '?' || ch == '#')
            .next()
            .unwrap_or(specifier)
            .trim();
        if specifier.is_empty() {
            return None;
        }
        if specifier.starts_with("./") || specifier.starts_with("../") {
            let base = util::join_rel(from_dir, specifier)?;
            return self.probe_module(&base);
        }
        if let Some(stripped) = specifier.strip_prefix('/') {
            return self.probe_module(stripped);
        }
        for candidate in self.aliases.resolve(from_file, specifier) {
            if let Some(found) = self.probe_module(&candidate) {
                return Some(found);
            }
        }
        None
    }

    fn probe_module(&self, base: &str) -> Option<String> {
        if has_module_extension(base) && self.index.contains_file(base) {
            return Some(base.to_string());
        }
        for ext in MODULE_EXTENSIONS {
            let candidate = format!("{base}.{ext}");
            if self.index.contains_file(&candidate) {
                return Some(candidate);
            }
        }
        for ext in MODULE_EXTENSIONS {
            let candidate = format!("{base}/index.{ext}");
            if self.index.contains_file(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn reference_at(&mut self, file: &str, name: &str, trace: &mut Trace) -> Option<Resolved> {
        if !trace.enter(self.depth_cap) {
            return None;
        }
        let result = self.reference_at_inner(file, name, trace);
        trace.leave();
        result
    }

    fn reference_at_inner(
        &mut self,
        file: &str,
        name: &str,
        trace: &mut Trace,
    ) -> Option<Resolved> {
        if !trace.mark(file, name) {
            // Cycle through the same (file, binding).
            return None;
        }
        let table = self.index.table(file)?;
        if let Some(value) = table.values.get(name) {
            let value = value.clone();
            return self.chase(file, value, trace);
        }
        if let Some(func) = table.functions.get(name) {
            return Some(Resolved::Expr(ResolvedExpr {
                expr: Expr::Func(Box::new(func.clone())),
                file: file.to_string(),
            }));
        }
        if let Some(import) = table.imports.get(name) {
            let import = import.clone();
            let target = self.resolve_module(file, &import.source)?;
            return match import.kind {
                ImportKind::Named { imported } => self.export_at(&target, &imported, trace),
                ImportKind::Default => self.export_at(&target, "default", trace),
                ImportKind::Namespace => Some(Resolved::Namespace { file: target }),
            };
        }
        if is_key_factory_name(name) {
            return self.factory_fallback(file, name, trace);
        }
        None
    }

    fn export_at(&mut self, file: &str, name: &str, trace: &mut Trace) -> Option<Resolved> {
        if !trace.enter(self.depth_cap) {
            return None;
        }
        let result = self.export_at_inner(file, name, trace);
        trace.leave();
        result
    }

    fn export_at_inner(&mut self, file: &str, name: &str, trace: &mut Trace) -> Option<Resolved> {
        let table = self.index.table(file)?;
        if let Some(target) = table.exports.get(name) {
            return match target.clone() {
                ExportTarget::Binding(local) => self.reference_at(file, &local, trace),
                ExportTarget::Expr(expr) => self.chase(file, expr, trace),
            };
        }
        // Named re-exports redirect; wildcard re-exports are only tried when
        // the name is not found locally.
        let reexports: Vec<ReExport> = table.reexports.clone();
        for reexport in &reexports {
            if let ReExport::Named {
                source,
                source_name,
                exported_name,
            } = reexport
            {
                if exported_name == name {
                    let target = self.resolve_module(file, source)?;
                    return self.export_at(&target, source_name, trace);
                }
            }
        }
        for reexport in &reexports {
            if let ReExport::All { source } = reexport {
                let Some(target) = self.resolve_module(file, source) else {
                    continue;
                };
                if !trace.mark(&target, &format!("*{name}")) {
                    continue;
                }
                if let Some(found) = self.export_at(&target, name, trace) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Whole-index fallback for key-factory names: used when local and import
    /// lookup both fail. A unique best-ranked candidate is used; ties across
    /// different files are ambiguous and discarded.
    fn factory_fallback(&mut self, file: &str, name: &str, trace: &mut Trace) -> Option<Resolved> {
        let mut candidates: Vec<(usize, String, Expr)> = Vec::new();
        for (candidate_file, table) in self.index.tables() {
            let mut found: Option<Expr> = None;
            if let Some(value) = table.values.get(name) {
                found = Some(value.clone());
            } else if let Some(func) = table.functions.get(name) {
                found = Some(Expr::Func(Box::new(func.clone())));
            } else if let Some(value) = table.key_factories.get(name) {
                found = Some(value.clone());
            }
            if let Some(expr) = found {
                let rank = util::shared_prefix_len(candidate_file, file);
                candidates.push((rank, candidate_file.clone(), expr));
            }
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        match candidates.as_slice() {
            [] => None,
            [single] => {
                let (_, candidate_file, expr) = single.clone();
                self.chase(&candidate_file, expr, trace)
            }
            [first, second, ..] => {
                if first.0 == second.0 && first.1 != second.1 {
                    // Equally-ranked candidates in different files.
                    return None;
                }
                let (_, candidate_file, expr) = first.clone();
                self.chase(&candidate_file, expr, trace)
            }
        }
    }

    /// Keep resolving while the expression is itself a reference shape.
    fn chase(&mut self, file: &str, expr: Expr, trace: &mut Trace) -> Option<Resolved> {
        match &expr {
            Expr::Ident(_) | Expr::Member { .. } | Expr::Call { .. } => {
                self.expr_at(file, &expr, trace)
            }
            _ => Some(Resolved::Expr(ResolvedExpr {
                expr,
                file: file.to_string(),
            })),
        }
    }

    fn expr_at(&mut self, file: &str, expr: &Expr, trace: &mut Trace) -> Option<Resolved> {
        if !trace.enter(self.depth_cap) {
            return None;
        }
        let result = self.expr_at_inner(file, expr, trace);
        trace.leave();
        result
    }

    fn expr_at_inner(&mut self, file: &str, expr: &Expr, trace: &mut Trace) -> Option<Resolved> {
        match expr {
            Expr::Ident(name) => self.reference_at(file, name, trace),
            Expr::Member { object, key } => {
                let crate::ast::MemberKey::Name(prop) = key else {
                    return None;
                };
                match self.expr_at(file, object, trace)? {
                    Resolved::Namespace { file: ns_file } => {
                        self.export_at(&ns_file, prop, trace)
                    }
                    Resolved::Expr(resolved) => {
                        let ResolvedExpr {
                            expr: Expr::Object(entries),
                            file: obj_file,
                        } = resolved
                        else {
                            return None;
                        };
                        self.object_property(&obj_file, &entries, prop, trace)
                    }
                }
            }
            Expr::Call { callee, args, .. } => self.call_result_at(file, callee, args, trace),
            Expr::Lit(_)
            | Expr::Array(_)
            | Expr::Object(_)
            | Expr::Template(_)
            | Expr::Func(_) => Some(Resolved::Expr(ResolvedExpr {
                expr: expr.clone(),
                file: file.to_string(),
            })),
            _ => None,
        }
    }

    /// Property lookup on a resolved object literal. Later entries override
    /// earlier ones, so entries are searched in reverse; a spread source is
    /// resolved recursively when it too yields an object literal.
    fn object_property(
        &mut self,
        file: &str,
        entries: &[ObjectEntry],
        prop: &str,
        trace: &mut Trace,
    ) -> Option<Resolved> {
        for entry in entries.iter().rev() {
            match entry {
                ObjectEntry::Pair { key, value } if key == prop => {
                    return self.chase(file, value.clone(), trace);
                }
                ObjectEntry::Shorthand(name) if name == prop => {
                    return self.reference_at(file, name, trace);
                }
                ObjectEntry::Method { key, func } if key == prop => {
                    return Some(Resolved::Expr(ResolvedExpr {
                        expr: Expr::Func(Box::new(func.clone())),
                        file: file.to_string(),
                    }));
                }
                ObjectEntry::Spread(source) => {
                    let Some(Resolved::Expr(resolved)) = self.expr_at(file, source, trace) else {
                        continue;
                    };
                    if let Expr::Object(inner) = resolved.expr {
                        if let Some(found) =
                            self.object_property(&resolved.file, &inner, prop, trace)
                        {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn call_result_at(
        &mut self,
        file: &str,
        callee: &Expr,
        args: &[Expr],
        trace: &mut Trace,
    ) -> Option<Resolved> {
        if !trace.enter(self.depth_cap) {
            return None;
        }
        let result = self.call_result_inner(file, callee, args, trace);
        trace.leave();
        result
    }

    fn call_result_inner(
        &mut self,
        file: &str,
        callee: &Expr,
        args: &[Expr],
        trace: &mut Trace,
    ) -> Option<Resolved> {
        if let Expr::Ident(name) = callee {
            if IDENTITY_WRAPPERS.contains(&name.as_str()) {
                let sole = args.first()?;
                return self.chase(file, sole.clone(), trace);
            }
        }
        let resolved = self.expr_at(file, callee, trace)?.into_expr()?;
        let ResolvedExpr {
            expr: Expr::Func(func),
            file: fn_file,
        } = resolved
        else {
            return None;
        };
        let return_expr = function_return_expr(&func)?;
        let substitutions = self.bind_params(file, &func, args, trace);
        let inlined = if substitutions.is_empty() {
            return_expr.clone()
        } else {
            substitute(return_expr, &substitutions)
        };
        self.chase(&fn_file, inlined, trace)
    }

    /// Inline statically-resolvable call arguments into the function body.
    /// Arguments that do not resolve to self-contained values are left as
    /// parameters, which later normalize to dynamic `$name` segments.
    fn bind_params(
        &mut self,
        caller_file: &str,
        func: &Func,
        args: &[Expr],
        trace: &mut Trace,
    ) -> HashMap<String, Expr> {
        let mut map = HashMap::new();
        for (i, param) in func.params.iter().enumerate() {
            let crate::ast::Pat::Ident { name, .. } = param else {
                continue;
            };
            let Some(arg) = args.get(i) else {
                continue;
            };
            let Some(Resolved::Expr(resolved)) = self.expr_at(caller_file, arg, trace) else {
                continue;
            };
            if is_self_contained(&resolved.expr) {
                map.insert(name.clone(), resolved.expr);
            }
        }
        map
    }
}

fn has_module_extension(path: &str) -> bool {
    MODULE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
}

/// First reachable return expression of a function body. Arrow expression
/// bodies return directly; block bodies are walked in statement order,
/// descending into nested control flow.
pub fn function_return_expr(func: &Func) -> Option<&Expr> {
    match &func.body {
        FnBody::Expr(expr) => Some(expr),
        FnBody::Block(stmts) => first_return(stmts),
    }
}

fn first_return(stmts: &[Stmt]) -> Option<&Expr> {
    for stmt in stmts {
        match stmt {
            Stmt::Return(Some(expr)) => return Some(expr),
            Stmt::Return(None) => return None,
            Stmt::If { then, alt, .. } => {
                if let Some(found) = first_return(then) {
                    return Some(found);
                }
                if let Some(found) = first_return(alt) {
                    return Some(found);
                }
            }
            Stmt::Block(body) | Stmt::Loop(body) => {
                if let Some(found) = first_return(body) {
                    return Some(found);
                }
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                if let Some(found) = first_return(block) {
                    return Some(found);
                }
                if let Some(found) = first_return(handler) {
                    return Some(found);
                }
                if let Some(found) = first_return(finalizer) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// True when an expression references nothing outside itself, making it safe
/// to splice into another file's context.
pub fn is_self_contained(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(_) => true,
        Expr::Template(parts) => parts.iter().all(|part| match part {
            TemplatePart::Text(_) => true,
            TemplatePart::Interp(inner) => is_self_contained(inner),
        }),
        Expr::Array(elems) => elems.iter().all(|elem| match elem {
            ArrayElem::Item(inner) | ArrayElem::Spread(inner) => is_self_contained(inner),
        }),
        Expr::Object(entries) => entries.iter().all(|entry| match entry {
            ObjectEntry::Pair { value, .. } => is_self_contained(value),
            ObjectEntry::Computed { key, value } => {
                is_self_contained(key) && is_self_contained(value)
            }
            ObjectEntry::Spread(inner) => is_self_contained(inner),
            ObjectEntry::Shorthand(_) | ObjectEntry::Method { .. } => false,
        }),
        _ => false,
    }
}

/// Replace free identifiers with their bound expressions. Shadowing inside
/// nested functions is not tracked; bound names are rare and collision with
/// an inner binding of the same name is acceptable imprecision.
pub fn substitute(expr: &Expr, bindings: &HashMap<String, Expr>) -> Expr {
    match expr {
        Expr::Ident(name) => match bindings.get(name) {
            Some(replacement) => replacement.clone(),
            None => expr.clone(),
        },
        Expr::Member { object, key } => Expr::Member {
            object: Box::new(substitute(object, bindings)),
            key: match key {
                crate::ast::MemberKey::Name(name) => crate::ast::MemberKey::Name(name.clone()),
                crate::ast::MemberKey::Index(index) => {
                    crate::ast::MemberKey::Index(Box::new(substitute(index, bindings)))
                }
            },
        },
        Expr::Call { callee, args, loc } => Expr::Call {
            callee: Box::new(substitute(callee, bindings)),
            args: args.iter().map(|arg| substitute(arg, bindings)).collect(),
            loc: *loc,
        },
        Expr::New { callee, args, loc } => Expr::New {
            callee: Box::new(substitute(callee, bindings)),
            args: args.iter().map(|arg| substitute(arg, bindings)).collect(),
            loc: *loc,
        },
        Expr::Array(elems) => Expr::Array(
            elems
                .iter()
                .map(|elem| match elem {
                    ArrayElem::Item(inner) => ArrayElem::Item(substitute(inner, bindings)),
                    ArrayElem::Spread(inner) => ArrayElem::Spread(substitute(inner, bindings)),
                })
                .collect(),
        ),
        Expr::Object(entries) => Expr::Object(
            entries
                .iter()
                .map(|entry| match entry {
                    ObjectEntry::Pair { key, value } => ObjectEntry::Pair {
                        key: key.clone(),
                        value: substitute(value, bindings),
                    },
                    ObjectEntry::Shorthand(name) => match bindings.get(name) {
                        Some(replacement) => ObjectEntry::Pair {
                            key: name.clone(),
                            value: replacement.clone(),
                        },
                        None => ObjectEntry::Shorthand(name.clone()),
                    },
                    ObjectEntry::Spread(inner) => ObjectEntry::Spread(substitute(inner, bindings)),
                    ObjectEntry::Computed { key, value } => ObjectEntry::Computed {
                        key: substitute(key, bindings),
                        value: substitute(value, bindings),
                    },
                    ObjectEntry::Method { key, func } => ObjectEntry::Method {
                        key: key.clone(),
                        func: func.clone(),
                    },
                })
                .collect(),
        ),
        Expr::Template(parts) => Expr::Template(
            parts
                .iter()
                .map(|part| match part {
                    TemplatePart::Text(text) => TemplatePart::Text(text.clone()),
                    TemplatePart::Interp(inner) => TemplatePart::Interp(substitute(inner, bindings)),
                })
                .collect(),
        ),
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => Expr::Cond {
            test: Box::new(substitute(test, bindings)),
            consequent: Box::new(substitute(consequent, bindings)),
            alternate: Box::new(substitute(alternate, bindings)),
        },
        Expr::Logical { op, left, right } => Expr::Logical {
            op: *op,
            left: Box::new(substitute(left, bindings)),
            right: Box::new(substitute(right, bindings)),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: op.clone(),
            left: Box::new(substitute(left, bindings)),
            right: Box::new(substitute(right, bindings)),
        },
        Expr::Unary { op, operand } => Expr::Unary {
            op: op.clone(),
            operand: Box::new(substitute(operand, bindings)),
        },
        Expr::Lit(_) | Expr::Func(_) | Expr::Raw(_) => expr.clone(),
    }
}
