//! Expression and statement tree shared by the symbol index, the resolver,
//! the normalizer and the classifier.
//!
//! The variant set is closed on purpose: every consumer pattern-matches
//! exhaustively, so adding a shape forces every dispatch site to handle it.
//! Syntax the analysis has no use for is lowered to `Expr::Raw` (a textual
//! approximation) or `Stmt::Other`, never silently dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loc {
    pub line: i64,
    pub column: i64,
}

impl Loc {
    pub fn new(line: i64, column: i64) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Str(String),
    Num(String),
    Bool(bool),
    Null,
    Undefined,
}

impl Lit {
    /// Canonical text used by the normalizer for a literal segment.
    pub fn text(&self) -> String {
        match self {
            Lit::Str(value) => value.clone(),
            Lit::Num(value) => value.clone(),
            Lit::Bool(value) => value.to_string(),
            Lit::Null => "null".to_string(),
            Lit::Undefined => "undefined".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKey {
    /// `obj.name` or `obj["name"]`
    Name(String),
    /// `obj[expr]` with a non-literal index
    Index(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElem {
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEntry {
    /// `key: value` with a statically-known key name
    Pair { key: String, value: Expr },
    /// `{ name }`
    Shorthand(String),
    /// `...expr`
    Spread(Expr),
    /// `[expr]: value`
    Computed { key: Expr, value: Expr },
    /// `key() { … }`
    Method { key: String, func: Func },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Interp(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Ident(String),
    Member {
        object: Box<Expr>,
        key: MemberKey,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: Loc,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: Loc,
    },
    Array(Vec<ArrayElem>),
    Object(Vec<ObjectEntry>),
    Template(Vec<TemplatePart>),
    Cond {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    Func(Box<Func>),
    /// Unmodeled syntax, kept as source text for best-effort display.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
    Ident {
        name: String,
        type_name: Option<String>,
    },
    Object {
        fields: Vec<String>,
        type_name: Option<String>,
    },
    Other,
}

impl Pat {
    pub fn binds(&self, name: &str) -> bool {
        match self {
            Pat::Ident { name: n, .. } => n == name,
            Pat::Object { fields, .. } => fields.iter().any(|f| f == name),
            Pat::Other => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FnBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub params: Vec<Pat>,
    pub body: FnBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpec {
    Named { imported: String, local: String },
    Default(String),
    Namespace(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub source: String,
    pub specifiers: Vec<ImportSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    /// `const`/`let`/`var` declarators with optional initializers.
    Decl {
        bindings: Vec<(String, Option<Expr>)>,
        exported: bool,
    },
    FuncDecl {
        name: String,
        func: Func,
        exported: bool,
    },
    Return(Option<Expr>),
    If {
        test: Expr,
        then: Vec<Stmt>,
        alt: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Try {
        block: Vec<Stmt>,
        handler: Vec<Stmt>,
        finalizer: Vec<Stmt>,
    },
    /// for/for-in/for-of/while/do bodies; only the body is analyzed.
    Loop(Vec<Stmt>),
    Import(ImportDecl),
    /// `export { a as b }` / `export { a } from "mod"`
    ExportNamed {
        specifiers: Vec<(String, String)>,
        source: Option<String>,
    },
    ExportDefault(Expr),
    /// `export * from "mod"`
    ExportAll {
        source: String,
    },
    Other,
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub body: Vec<Stmt>,
}

/// Render a compact single-line approximation of an expression, used for
/// dynamic key segments that cannot be resolved further.
pub fn approximate(expr: &Expr) -> String {
    match expr {
        Expr::Lit(lit) => lit.text(),
        Expr::Ident(name) => format!("${name}"),
        Expr::Member { object, key } => {
            let obj = approximate_plain(object);
            match key {
                MemberKey::Name(name) => format!("{obj}.{name}"),
                MemberKey::Index(idx) => format!("{obj}[{}]", approximate_plain(idx)),
            }
        }
        Expr::Call { callee, args, .. } => {
            let mut out = String::new();
            out.push_str(&approximate_plain(callee));
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&approximate_plain(arg));
            }
            out.push(')');
            out
        }
        Expr::New { callee, .. } => format!("new {}", approximate_plain(callee)),
        Expr::Array(_) => "[…]".to_string(),
        Expr::Object(_) => "{…}".to_string(),
        Expr::Template(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplatePart::Text(text) => out.push_str(text),
                    TemplatePart::Interp(expr) => {
                        out.push_str("${");
                        out.push_str(&approximate_plain(expr));
                        out.push('}');
                    }
                }
            }
            out
        }
        Expr::Cond { .. } => "?:".to_string(),
        Expr::Logical { left, op, right } => {
            let sym = match op {
                LogicalOp::And => "&&",
                LogicalOp::Or => "||",
                LogicalOp::Coalesce => "??",
            };
            format!(
                "{} {sym} {}",
                approximate_plain(left),
                approximate_plain(right)
            )
        }
        Expr::Binary { op, left, right } => {
            format!(
                "{} {op} {}",
                approximate_plain(left),
                approximate_plain(right)
            )
        }
        Expr::Unary { op, operand } => format!("{op}{}", approximate_plain(operand)),
        Expr::Func(_) => "fn".to_string(),
        Expr::Raw(text) => text.clone(),
    }
}

/// Like `approximate` but renders identifiers without the `$` marker, for use
/// inside larger approximations (`obj.prop(arg)` rather than `$obj.prop($arg)`).
fn approximate_plain(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        other => approximate(other),
    }
}
