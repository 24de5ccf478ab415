//! Per-file symbol tables and the cross-file symbol index.
//!
//! Index construction is purely syntactic: no file ever inspects another
//! file's table here. Cross-file lookups happen later, in the resolver,
//! against the completed read-only index.

use crate::ast::{Expr, Func, ImportSpec, Module, ObjectEntry, Stmt};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    Named { imported: String },
    Default,
    Namespace,
}

#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub source: String,
    pub kind: ImportKind,
}

#[derive(Debug, Clone)]
pub enum ExportTarget {
    /// Exported name redirects to a local binding.
    Binding(String),
    /// Exported value written inline (`export default [..]`).
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ReExport {
    Named {
        source: String,
        source_name: String,
        exported_name: String,
    },
    /// `export * from "mod"`; expanded lazily at resolution time.
    All { source: String },
}

/// Symbol table for one file. Built once, read-only afterward.
#[derive(Debug, Default)]
pub struct FileSymbolTable {
    /// Top-level `const`/`let`/`var` bindings with initializers.
    pub values: HashMap<String, Expr>,
    /// Top-level function declarations.
    pub functions: HashMap<String, Func>,
    /// Local name of an import binding.
    pub imports: HashMap<String, ImportBinding>,
    /// Exported name to its target.
    pub exports: HashMap<String, ExportTarget>,
    pub reexports: Vec<ReExport>,
    /// Non-top-level bindings whose name matches the key-factory naming
    /// pattern; needed by the whole-index fallback search.
    pub key_factories: HashMap<String, Expr>,
}

/// Aggregated tables for every successfully parsed file.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    tables: HashMap<String, FileSymbolTable>,
    files: BTreeSet<String>,
}

impl SymbolIndex {
    pub fn build(parsed: &[(String, Module)]) -> Self {
        let mut index = SymbolIndex::default();
        for (rel_path, module) in parsed {
            let table = build_file_table(module);
            index.files.insert(rel_path.clone());
            index.tables.insert(rel_path.clone(), table);
        }
        index
    }

    pub fn table(&self, rel_path: &str) -> Option<&FileSymbolTable> {
        self.tables.get(rel_path)
    }

    pub fn contains_file(&self, rel_path: &str) -> bool {
        self.files.contains(rel_path)
    }

    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.files.iter()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&String, &FileSymbolTable)> {
        self.tables.iter()
    }
}

/// Case-insensitive naming pattern for cache-key factories: any name
/// containing `querykey`/`qkey`, or the short alias `qk` itself.
pub fn is_key_factory_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("querykey") || lower.contains("qkey") || lower == "qk"
}

pub fn build_file_table(module: &Module) -> FileSymbolTable {
    let mut table = FileSymbolTable::default();
    for stmt in &module.body {
        record_top_level(stmt, &mut table);
    }
    // Opportunistic pass for nested key-factory bindings.
    for stmt in &module.body {
        record_nested_factories(stmt, true, &mut table);
    }
    table
}

fn record_top_level(stmt: &Stmt, table: &mut FileSymbolTable) {
    match stmt {
        Stmt::Decl { bindings, exported } => {
            for (name, value) in bindings {
                if name.is_empty() {
                    // Destructuring declarator kept only for its initializer.
                    continue;
                }
                if let Some(value) = value {
                    table.values.insert(name.clone(), value.clone());
                }
                if *exported {
                    table
                        .exports
                        .insert(name.clone(), ExportTarget::Binding(name.clone()));
                }
            }
        }
        Stmt::FuncDecl {
            name,
            func,
            exported,
        } => {
            table.functions.insert(name.clone(), func.clone());
            if *exported {
                table
                    .exports
                    .insert(name.clone(), ExportTarget::Binding(name.clone()));
            }
        }
        Stmt::Import(decl) => {
            for spec in &decl.specifiers {
                match spec {
                    ImportSpec::Named { imported, local } => {
                        table.imports.insert(
                            local.clone(),
                            ImportBinding {
                                source: decl.source.clone(),
                                kind: ImportKind::Named {
                                    imported: imported.clone(),
                                },
                            },
                        );
                    }
                    ImportSpec::Default(local) => {
                        table.imports.insert(
                            local.clone(),
                            ImportBinding {
                                source: decl.source.clone(),
                                kind: ImportKind::Default,
                            },
                        );
                    }
                    ImportSpec::Namespace(local) => {
                        table.imports.insert(
                            local.clone(),
                            ImportBinding {
                                source: decl.source.clone(),
                                kind: ImportKind::Namespace,
                            },
                        );
                    }
                }
            }
        }
        Stmt::ExportNamed { specifiers, source } => match source {
            Some(module_source) => {
                for (source_name, exported_name) in specifiers {
                    table.reexports.push(ReExport::Named {
                        source: module_source.clone(),
                        source_name: source_name.clone(),
                        exported_name: exported_name.clone(),
                    });
                }
            }
            None => {
                for (local, exported_name) in specifiers {
                    table
                        .exports
                        .insert(exported_name.clone(), ExportTarget::Binding(local.clone()));
                }
            }
        },
        Stmt::ExportDefault(expr) => {
            let target = match expr {
                Expr::Ident(name) => ExportTarget::Binding(name.clone()),
                other => ExportTarget::Expr(other.clone()),
            };
            table.exports.insert("default".to_string(), target);
        }
        Stmt::ExportAll { source } => {
            table.reexports.push(ReExport::All {
                source: source.clone(),
            });
        }
        _ => {}
    }
}

fn record_nested_factories(stmt: &Stmt, top_level: bool, table: &mut FileSymbolTable) {
    match stmt {
        Stmt::Decl { bindings, .. } => {
            if !top_level {
                for (name, value) in bindings {
                    if let Some(value) = value {
                        if is_key_factory_name(name) {
                            table.key_factories.insert(name.clone(), value.clone());
                        }
                    }
                }
            }
            for (_, value) in bindings {
                if let Some(value) = value {
                    record_expr_factories(value, table);
                }
            }
        }
        Stmt::FuncDecl { func, .. } => record_body_factories(&func.body, table),
        Stmt::Expr(expr) | Stmt::ExportDefault(expr) => record_expr_factories(expr, table),
        Stmt::Return(Some(expr)) => record_expr_factories(expr, table),
        Stmt::If { then, alt, .. } => {
            for inner in then.iter().chain(alt) {
                record_nested_factories(inner, false, table);
            }
        }
        Stmt::Block(body) | Stmt::Loop(body) => {
            for inner in body {
                record_nested_factories(inner, false, table);
            }
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            for inner in block.iter().chain(handler).chain(finalizer) {
                record_nested_factories(inner, false, table);
            }
        }
        _ => {}
    }
}

fn record_expr_factories(expr: &Expr, table: &mut FileSymbolTable) {
    match expr {
        Expr::Func(func) => record_body_factories(&func.body, table),
        Expr::Call { callee, args, .. } | Expr::New { callee, args, .. } => {
            record_expr_factories(callee, table);
            for arg in args {
                record_expr_factories(arg, table);
            }
        }
        Expr::Object(entries) => {
            for entry in entries {
                match entry {
                    ObjectEntry::Pair { value, .. } => record_expr_factories(value, table),
                    ObjectEntry::Computed { value, .. } => record_expr_factories(value, table),
                    ObjectEntry::Spread(inner) => record_expr_factories(inner, table),
                    ObjectEntry::Method { func, .. } => record_body_factories(&func.body, table),
                    ObjectEntry::Shorthand(_) => {}
                }
            }
        }
        Expr::Array(elems) => {
            for elem in elems {
                match elem {
                    crate::ast::ArrayElem::Item(inner)
                    | crate::ast::ArrayElem::Spread(inner) => record_expr_factories(inner, table),
                }
            }
        }
        Expr::Logical { left, right, .. } | Expr::Binary { left, right, .. } => {
            record_expr_factories(left, table);
            record_expr_factories(right, table);
        }
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => {
            record_expr_factories(test, table);
            record_expr_factories(consequent, table);
            record_expr_factories(alternate, table);
        }
        _ => {}
    }
}

fn record_body_factories(body: &crate::ast::FnBody, table: &mut FileSymbolTable) {
    match body {
        crate::ast::FnBody::Expr(expr) => record_expr_factories(expr, table),
        crate::ast::FnBody::Block(stmts) => {
            for stmt in stmts {
                record_nested_factories(stmt, false, table);
            }
        }
    }
}
