//! Call-site classification: recognizes declaration and mutation call
//! shapes, infers match modes, and expands iterator-driven fan-out.
//!
//! Classification is state-free per call expression. Every call in a module
//! is visited exactly once; the traversal carries only lexical context
//! (enclosing bindings, parameters and iterator callbacks), never results
//! from other files.

use crate::ast::{ArrayElem, Expr, FnBody, Func, Lit, Loc, MemberKey, Module, ObjectEntry, Pat,
    Stmt, TemplatePart};
use crate::model::{CallSiteRecord, KeySource, MatchMode, NormalizedKey, Relation};
use crate::normalize;
use crate::resolve::{self, Resolver};
use std::collections::{HashMap, HashSet};

/// Hook-style declaration calls, recognized by bare callee name.
const DECLARE_HOOKS: &[&str] = &[
    "useQuery",
    "useInfiniteQuery",
    "useSuspenseQuery",
    "useSuspenseInfiniteQuery",
    "usePrefetchQuery",
    "usePrefetchInfiniteQuery",
];

/// Client methods that fetch/ensure/prefetch and thereby declare a key.
const DECLARE_METHODS: &[&str] = &[
    "fetchQuery",
    "fetchInfiniteQuery",
    "prefetchQuery",
    "prefetchInfiniteQuery",
    "ensureQueryData",
    "ensureInfiniteQueryData",
];

const CLIENT_TYPE: &str = "QueryClient";
const CLIENT_HOOK: &str = "useQueryClient";

fn mutation_relation(method: &str) -> Option<Relation> {
    match method {
        "invalidateQueries" => Some(Relation::Invalidates),
        "refetchQueries" => Some(Relation::Refetches),
        "cancelQueries" => Some(Relation::Cancels),
        "resetQueries" => Some(Relation::Resets),
        "removeQueries" => Some(Relation::Removes),
        "setQueryData" | "setQueriesData" => Some(Relation::Sets),
        "clear" => Some(Relation::Clears),
        _ => None,
    }
}

/// Classify every call expression in one parsed module.
pub fn classify_module(
    resolver: &mut Resolver,
    file: &str,
    module: &Module,
) -> Vec<CallSiteRecord> {
    let mut classifier = Classifier {
        resolver,
        file,
        records: Vec::new(),
        scopes: vec![ScopeFrame::default()],
        iterators: Vec::new(),
    };
    classifier.walk_stmts(&module.body);
    classifier.records
}

#[derive(Default)]
struct ScopeFrame {
    bindings: HashMap<String, Expr>,
    params: Vec<Pat>,
}

/// One enclosing `.map`/`.forEach` callback: the parameter it binds and the
/// receiver collection as written.
struct IteratorFrame {
    param: String,
    receiver: Expr,
}

struct Classifier<'r, 'i> {
    resolver: &'r mut Resolver<'i>,
    file: &'r str,
    records: Vec<CallSiteRecord>,
    scopes: Vec<ScopeFrame>,
    iterators: Vec<IteratorFrame>,
}

impl Classifier<'_, '_> {
    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) | Stmt::ExportDefault(expr) => self.walk_expr(expr),
            Stmt::Decl { bindings, .. } => {
                for (name, value) in bindings {
                    if let Some(value) = value {
                        self.walk_expr(value);
                        if !name.is_empty() {
                            if let Some(scope) = self.scopes.last_mut() {
                                scope.bindings.insert(name.clone(), value.clone());
                            }
                        }
                    }
                }
            }
            Stmt::FuncDecl { func, .. } => self.walk_func(func),
            Stmt::Return(Some(expr)) => self.walk_expr(expr),
            Stmt::Return(None) => {}
            Stmt::If { test, then, alt } => {
                self.walk_expr(test);
                self.walk_stmts(then);
                self.walk_stmts(alt);
            }
            Stmt::Block(body) | Stmt::Loop(body) => self.walk_stmts(body),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.walk_stmts(block);
                self.walk_stmts(handler);
                self.walk_stmts(finalizer);
            }
            Stmt::Import(_)
            | Stmt::ExportNamed { .. }
            | Stmt::ExportAll { .. }
            | Stmt::Other => {}
        }
    }

    fn walk_func(&mut self, func: &Func) {
        self.scopes.push(ScopeFrame {
            bindings: HashMap::new(),
            params: func.params.clone(),
        });
        match &func.body {
            FnBody::Expr(expr) => self.walk_expr(expr),
            FnBody::Block(stmts) => self.walk_stmts(stmts),
        }
        self.scopes.pop();
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call { callee, args, loc } => {
                self.classify_call(callee, args, *loc);
                if let Some((receiver, callback)) = iterator_call(callee, args) {
                    self.walk_expr(receiver);
                    let receiver = receiver.clone();
                    self.walk_iterator_callback(receiver, callback);
                    for arg in args.iter().skip(1) {
                        self.walk_expr(arg);
                    }
                    return;
                }
                self.walk_expr(callee);
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::New { callee, args, .. } => {
                self.walk_expr(callee);
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::Member { object, key } => {
                self.walk_expr(object);
                if let MemberKey::Index(index) = key {
                    self.walk_expr(index);
                }
            }
            Expr::Array(elems) => {
                for elem in elems {
                    match elem {
                        ArrayElem::Item(inner) | ArrayElem::Spread(inner) => self.walk_expr(inner),
                    }
                }
            }
            Expr::Object(entries) => {
                for entry in entries {
                    match entry {
                        ObjectEntry::Pair { value, .. } => self.walk_expr(value),
                        ObjectEntry::Computed { key, value } => {
                            self.walk_expr(key);
                            self.walk_expr(value);
                        }
                        ObjectEntry::Spread(inner) => self.walk_expr(inner),
                        ObjectEntry::Method { func, .. } => self.walk_func(func),
                        ObjectEntry::Shorthand(_) => {}
                    }
                }
            }
            Expr::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Interp(inner) = part {
                        self.walk_expr(inner);
                    }
                }
            }
            Expr::Cond {
                test,
                consequent,
                alternate,
            } => {
                self.walk_expr(test);
                self.walk_expr(consequent);
                self.walk_expr(alternate);
            }
            Expr::Logical { left, right, .. } | Expr::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            Expr::Unary { operand, .. } => self.walk_expr(operand),
            Expr::Func(func) => self.walk_func(func),
            Expr::Lit(_) | Expr::Ident(_) | Expr::Raw(_) => {}
        }
    }

    fn walk_iterator_callback(&mut self, receiver: Expr, callback: &Func) {
        let param = callback.params.first().and_then(|pat| match pat {
            Pat::Ident { name, .. } => Some(name.clone()),
            _ => None,
        });
        if let Some(param) = param {
            self.iterators.push(IteratorFrame { param, receiver });
            self.walk_func(callback);
            self.iterators.pop();
        } else {
            self.walk_func(callback);
        }
    }

    fn classify_call(&mut self, callee: &Expr, args: &[Expr], loc: Loc) {
        match callee {
            Expr::Ident(name) if DECLARE_HOOKS.contains(&name.as_str()) => {
                self.record_declaration(name, args.first(), loc);
            }
            Expr::Member {
                object,
                key: MemberKey::Name(method),
            } => {
                if DECLARE_METHODS.contains(&method.as_str()) && self.is_client(object) {
                    self.record_declaration(method, args.first(), loc);
                } else if let Some(relation) = mutation_relation(method) {
                    if self.is_client(object) {
                        self.record_mutation(relation, method, args, loc);
                    }
                }
            }
            _ => {}
        }
    }

    /// Certainty that an expression denotes a cache-client instance:
    /// constructor calls, the client-vending hook, bindings tracing back to
    /// either, or parameters whose declared type names the client type.
    fn is_client(&mut self, object: &Expr) -> bool {
        self.is_client_bounded(object, 0)
    }

    fn is_client_bounded(&mut self, object: &Expr, depth: usize) -> bool {
        if depth > 8 {
            return false;
        }
        match object {
            Expr::New { callee, .. } => matches!(&**callee, Expr::Ident(name) if name == CLIENT_TYPE),
            Expr::Call { callee, .. } => {
                matches!(last_name(callee), Some(name) if name == CLIENT_HOOK)
            }
            Expr::Ident(name) => {
                for scope in self.scopes.iter().rev() {
                    if let Some(bound) = scope.bindings.get(name) {
                        let bound = bound.clone();
                        return self.is_client_bounded(&bound, depth + 1);
                    }
                    for pat in &scope.params {
                        if pat.binds(name) && pat_names_client(pat) {
                            return true;
                        }
                    }
                }
                if let Some(table) = self.resolver_index_value(name) {
                    return self.is_client_bounded(&table, depth + 1);
                }
                match self.resolver.resolve_reference(self.file, name) {
                    Some(resolved) => match resolved.into_expr() {
                        Some(value) => self.is_client_bounded(&value.expr, depth + 1),
                        None => false,
                    },
                    None => false,
                }
            }
            Expr::Member { .. } => match self.resolver.resolve_expr(self.file, object) {
                Some(resolved) => self.is_client_bounded(&resolved.expr, depth + 1),
                None => false,
            },
            _ => false,
        }
    }

    /// Raw file-level binding lookup; unlike full resolution this sees
    /// unresolvable initializers such as `useQueryClient()`.
    fn resolver_index_value(&self, name: &str) -> Option<Expr> {
        self.resolver
            .index()
            .table(self.file)?
            .values
            .get(name)
            .cloned()
    }

    fn record_declaration(&mut self, operation: &str, arg: Option<&Expr>, loc: Loc) {
        let Some(arg) = arg else {
            return;
        };
        let Some((key_file, key_expr, direct)) = self.extract_declared_key(arg) else {
            // Options that hide their key entirely still mark a declaration
            // site; the key collapses to a dynamic placeholder.
            let key = normalize::normalize(self.resolver, self.file, arg, MatchMode::Exact);
            self.push(Relation::Declares, operation, loc, key, false);
            return;
        };
        self.emit_with_expansion(
            Relation::Declares,
            operation,
            loc,
            &key_file,
            &key_expr,
            MatchMode::Exact,
            direct,
        );
    }

    /// Key extraction for declarations: the first argument is either the key
    /// itself, an options object with a `queryKey` property, or a reference
    /// that resolves to one of those.
    fn extract_declared_key(&mut self, arg: &Expr) -> Option<(String, Expr, bool)> {
        match arg {
            Expr::Array(_) => Some((self.file.to_string(), arg.clone(), true)),
            Expr::Object(entries) => {
                if let Some(value) = object_query_key(entries) {
                    let direct = matches!(value, Expr::Array(_) | Expr::Object(_));
                    return Some((self.file.to_string(), value, direct));
                }
                // Spread-hidden `queryKey`: resolve a synthetic member access
                // so spread sources are searched too.
                let member = Expr::Member {
                    object: Box::new(arg.clone()),
                    key: MemberKey::Name("queryKey".to_string()),
                };
                let resolved = self.resolver.resolve_expr(self.file, &member)?;
                Some((resolved.file, resolved.expr, false))
            }
            Expr::Ident(_) | Expr::Member { .. } | Expr::Call { .. } => {
                let resolved = self.resolver.resolve_expr(self.file, arg)?;
                match resolved.expr {
                    Expr::Object(ref entries) => {
                        let value = object_query_key(entries)?;
                        Some((resolved.file, value, false))
                    }
                    Expr::Array(_) => Some((resolved.file, resolved.expr, false)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn record_mutation(&mut self, relation: Relation, method: &str, args: &[Expr], loc: Loc) {
        if method == "clear" {
            let key = NormalizedKey::wildcard(MatchMode::All);
            self.push_wildcard(relation, method, loc, key);
            return;
        }
        if method == "setQueryData" {
            let Some(arg) = args.first() else {
                return;
            };
            self.emit_mutation_key(relation, method, loc, arg, MatchMode::Exact, args.get(1));
            return;
        }
        let Some(arg) = args.first() else {
            self.push_wildcard(relation, method, loc, NormalizedKey::wildcard(MatchMode::All));
            return;
        };
        match arg {
            Expr::Object(entries) => {
                self.classify_filters(relation, method, loc, entries);
            }
            _ => {
                // Legacy `(key, filters)` signature.
                let mode = if filters_exact(args.get(1)) {
                    MatchMode::Exact
                } else {
                    MatchMode::Prefix
                };
                self.emit_mutation_key(relation, method, loc, arg, mode, args.get(1));
            }
        }
    }

    /// Filters-object form: `{ queryKey, exact, predicate, … }`.
    fn classify_filters(
        &mut self,
        relation: Relation,
        method: &str,
        loc: Loc,
        entries: &[ObjectEntry],
    ) {
        if let Some(key_expr) = object_query_key(entries) {
            let mode = if object_exact_flag(entries) {
                MatchMode::Exact
            } else {
                MatchMode::Prefix
            };
            self.emit_mutation_key(relation, method, loc, &key_expr, mode, None);
            return;
        }
        if let Some(predicate) = object_entry(entries, "predicate") {
            if let Some(segments) = self.convert_predicate(&predicate) {
                let key = NormalizedKey::from_segments(
                    segments,
                    MatchMode::Predicate,
                    KeySource::Expression,
                );
                self.push_wildcard(relation, method, loc, key);
            } else {
                // Unconvertible predicates keep the predicate mode but carry
                // no segment constraint; scoping happens at link time.
                self.push_wildcard(
                    relation,
                    method,
                    loc,
                    NormalizedKey::wildcard(MatchMode::Predicate),
                );
            }
            return;
        }
        self.push_wildcard(relation, method, loc, NormalizedKey::wildcard(MatchMode::All));
    }

    /// Predicate-to-constraint conversion: scan the predicate body for
    /// equality comparisons against indexed accesses into the seen key and
    /// assemble the earliest contiguous run of resolved indices.
    fn convert_predicate(&mut self, predicate: &Expr) -> Option<Vec<crate::model::KeySegment>> {
        let func = match predicate {
            Expr::Func(func) => (**func).clone(),
            Expr::Ident(_) | Expr::Member { .. } => {
                let resolved = self.resolver.resolve_expr(self.file, predicate)?;
                match resolved.expr {
                    Expr::Func(func) => *func,
                    _ => return None,
                }
            }
            _ => return None,
        };
        let Some(Pat::Ident { name: param, .. }) = func.params.first() else {
            return None;
        };
        let mut by_index: HashMap<usize, Expr> = HashMap::new();
        collect_key_comparisons(&func.body, param, &mut by_index);
        let mut segments = Vec::new();
        let mut i = 0;
        while let Some(expr) = by_index.get(&i) {
            segments.push(normalize::segment(self.resolver, self.file, expr));
            i += 1;
        }
        (!segments.is_empty()).then_some(segments)
    }

    fn emit_mutation_key(
        &mut self,
        relation: Relation,
        method: &str,
        loc: Loc,
        key_expr: &Expr,
        mode: MatchMode,
        legacy_filters: Option<&Expr>,
    ) {
        let mode = if mode == MatchMode::Prefix && filters_exact(legacy_filters) {
            MatchMode::Exact
        } else {
            mode
        };
        // Bare passthrough of an ambient queryKey parameter: keep it as an
        // unknown-mode dynamic observation instead of fanning out.
        if let Expr::Ident(name) = key_expr {
            if self.is_ambient_query_key_param(name)
                && self.resolver.resolve_reference(self.file, name).is_none()
            {
                let key = normalize::normalize(self.resolver, self.file, key_expr, MatchMode::Unknown);
                self.push_wildcard(relation, method, loc, key);
                return;
            }
        }
        self.emit_with_expansion(relation, method, loc, self.file, key_expr, mode, false);
    }

    fn is_ambient_query_key_param(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            for pat in &scope.params {
                if !pat.binds(name) {
                    continue;
                }
                if name == "queryKey" {
                    return true;
                }
                let type_name = match pat {
                    Pat::Ident { type_name, .. } | Pat::Object { type_name, .. } => type_name,
                    Pat::Other => &None,
                };
                if matches!(type_name, Some(t) if t.contains("QueryKey")) {
                    return true;
                }
            }
        }
        false
    }

    /// Normalize and record, expanding across a finite iterator fan-out when
    /// the key references exactly one enclosing `.map`/`.forEach` parameter
    /// whose receiver resolves to a literal array.
    fn emit_with_expansion(
        &mut self,
        relation: Relation,
        operation: &str,
        loc: Loc,
        key_file: &str,
        key_expr: &Expr,
        mode: MatchMode,
        direct: bool,
    ) {
        if let Some((param, elements)) = self.iterator_elements(key_expr) {
            for element in elements {
                let mut bindings = HashMap::new();
                bindings.insert(param.clone(), element);
                let substituted = resolve::substitute(key_expr, &bindings);
                let key = normalize::normalize(self.resolver, key_file, &substituted, mode);
                self.push(relation, operation, loc, key, direct);
            }
            return;
        }
        let key = normalize::normalize(self.resolver, key_file, key_expr, mode);
        self.push(relation, operation, loc, key, direct);
    }

    /// When expansion applies, the matched callback parameter and the
    /// receiver's element expressions, each statically self-contained.
    fn iterator_elements(&mut self, key_expr: &Expr) -> Option<(String, Vec<Expr>)> {
        if self.iterators.is_empty() {
            return None;
        }
        let mut free = HashSet::new();
        free_idents(key_expr, &mut free);
        let mut matched: Option<&IteratorFrame> = None;
        for frame in self.iterators.iter().rev() {
            if free.contains(frame.param.as_str()) {
                if matched.is_some() {
                    return None;
                }
                matched = Some(frame);
            }
        }
        let frame = matched?;
        let receiver = frame.receiver.clone();
        let param = frame.param.clone();
        let resolved = self.resolver.resolve_expr(self.file, &receiver)?;
        let Expr::Array(elems) = resolved.expr else {
            return None;
        };
        let mut elements = Vec::with_capacity(elems.len());
        for elem in &elems {
            let ArrayElem::Item(item) = elem else {
                return None;
            };
            let item = if resolve::is_self_contained(item) {
                item.clone()
            } else {
                let inner = self.resolver.resolve_expr(&resolved.file, item)?;
                if !resolve::is_self_contained(&inner.expr) {
                    return None;
                }
                inner.expr
            };
            elements.push(item);
        }
        Some((param, elements))
    }

    fn push_wildcard(&mut self, relation: Relation, method: &str, loc: Loc, key: NormalizedKey) {
        self.push(relation, method, loc, key, false);
    }

    fn push(
        &mut self,
        relation: Relation,
        operation: &str,
        loc: Loc,
        key: NormalizedKey,
        declares_directly: bool,
    ) {
        let resolution = key.resolution;
        self.records.push(CallSiteRecord {
            relation,
            operation: operation.to_string(),
            file: self.file.to_string(),
            line: loc.line,
            column: loc.column,
            query_key: key,
            resolution,
            declares_directly,
        });
    }
}

fn iterator_call<'e>(callee: &'e Expr, args: &'e [Expr]) -> Option<(&'e Expr, &'e Func)> {
    let Expr::Member {
        object,
        key: MemberKey::Name(method),
    } = callee
    else {
        return None;
    };
    if method != "map" && method != "forEach" {
        return None;
    }
    let Some(Expr::Func(callback)) = args.first() else {
        return None;
    };
    Some((object, callback))
}

fn last_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Ident(name) => Some(name),
        Expr::Member {
            key: MemberKey::Name(name),
            ..
        } => Some(name),
        _ => None,
    }
}

fn pat_names_client(pat: &Pat) -> bool {
    let type_name = match pat {
        Pat::Ident { type_name, .. } | Pat::Object { type_name, .. } => type_name,
        Pat::Other => &None,
    };
    matches!(type_name, Some(t) if t.contains(CLIENT_TYPE))
}

fn object_entry(entries: &[ObjectEntry], name: &str) -> Option<Expr> {
    entries.iter().find_map(|entry| match entry {
        ObjectEntry::Pair { key, value } if key == name => Some(value.clone()),
        ObjectEntry::Shorthand(short) if short == name => Some(Expr::Ident(short.clone())),
        _ => None,
    })
}

fn object_query_key(entries: &[ObjectEntry]) -> Option<Expr> {
    object_entry(entries, "queryKey")
}

fn object_exact_flag(entries: &[ObjectEntry]) -> bool {
    matches!(
        object_entry(entries, "exact"),
        Some(Expr::Lit(Lit::Bool(true)))
    )
}

fn filters_exact(filters: Option<&Expr>) -> bool {
    match filters {
        Some(Expr::Object(entries)) => object_exact_flag(entries),
        _ => false,
    }
}

/// Free identifier names of an expression. Function bodies are included;
/// shadowing is not tracked.
fn free_idents(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Ident(name) => {
            out.insert(name.clone());
        }
        Expr::Member { object, key } => {
            free_idents(object, out);
            if let MemberKey::Index(index) = key {
                free_idents(index, out);
            }
        }
        Expr::Call { callee, args, .. } | Expr::New { callee, args, .. } => {
            free_idents(callee, out);
            for arg in args {
                free_idents(arg, out);
            }
        }
        Expr::Array(elems) => {
            for elem in elems {
                match elem {
                    ArrayElem::Item(inner) | ArrayElem::Spread(inner) => free_idents(inner, out),
                }
            }
        }
        Expr::Object(entries) => {
            for entry in entries {
                match entry {
                    ObjectEntry::Pair { value, .. } => free_idents(value, out),
                    ObjectEntry::Shorthand(name) => {
                        out.insert(name.clone());
                    }
                    ObjectEntry::Spread(inner) => free_idents(inner, out),
                    ObjectEntry::Computed { key, value } => {
                        free_idents(key, out);
                        free_idents(value, out);
                    }
                    ObjectEntry::Method { .. } => {}
                }
            }
        }
        Expr::Template(parts) => {
            for part in parts {
                if let TemplatePart::Interp(inner) = part {
                    free_idents(inner, out);
                }
            }
        }
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => {
            free_idents(test, out);
            free_idents(consequent, out);
            free_idents(alternate, out);
        }
        Expr::Logical { left, right, .. } | Expr::Binary { left, right, .. } => {
            free_idents(left, out);
            free_idents(right, out);
        }
        Expr::Unary { operand, .. } => free_idents(operand, out),
        Expr::Lit(_) | Expr::Func(_) | Expr::Raw(_) => {}
    }
}

/// Collect `param.queryKey[i] === expr` style comparisons from a predicate
/// body, keyed by index.
fn collect_key_comparisons(body: &FnBody, param: &str, out: &mut HashMap<usize, Expr>) {
    match body {
        FnBody::Expr(expr) => collect_expr_comparisons(expr, param, out),
        FnBody::Block(stmts) => collect_stmt_comparisons(stmts, param, out),
    }
}

fn collect_stmt_comparisons(stmts: &[Stmt], param: &str, out: &mut HashMap<usize, Expr>) {
    for stmt in stmts {
        match stmt {
            Stmt::Expr(expr) | Stmt::Return(Some(expr)) => {
                collect_expr_comparisons(expr, param, out)
            }
            Stmt::If { test, then, alt } => {
                collect_expr_comparisons(test, param, out);
                collect_stmt_comparisons(then, param, out);
                collect_stmt_comparisons(alt, param, out);
            }
            Stmt::Block(body) | Stmt::Loop(body) => collect_stmt_comparisons(body, param, out),
            _ => {}
        }
    }
}

fn collect_expr_comparisons(expr: &Expr, param: &str, out: &mut HashMap<usize, Expr>) {
    match expr {
        Expr::Binary { op, left, right } if op == "===" || op == "==" => {
            if let Some(index) = key_index_access(left, param) {
                out.entry(index).or_insert_with(|| (**right).clone());
            } else if let Some(index) = key_index_access(right, param) {
                out.entry(index).or_insert_with(|| (**left).clone());
            }
        }
        Expr::Logical { left, right, .. } => {
            collect_expr_comparisons(left, param, out);
            collect_expr_comparisons(right, param, out);
        }
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => {
            collect_expr_comparisons(test, param, out);
            collect_expr_comparisons(consequent, param, out);
            collect_expr_comparisons(alternate, param, out);
        }
        _ => {}
    }
}

/// `param.queryKey[n]` → `n`.
fn key_index_access(expr: &Expr, param: &str) -> Option<usize> {
    let Expr::Member {
        object,
        key: MemberKey::Index(index),
    } = expr
    else {
        return None;
    };
    let Expr::Member {
        object: inner,
        key: MemberKey::Name(prop),
    } = &**object
    else {
        return None;
    };
    if prop != "queryKey" {
        return None;
    }
    let Expr::Ident(name) = &**inner else {
        return None;
    };
    if name != param {
        return None;
    }
    let Expr::Lit(Lit::Num(num)) = &**index else {
        return None;
    };
    num.parse().ok()
}
