use crate::ast::{
    ArrayElem, Expr, FnBody, Func, ImportDecl, ImportSpec, Lit, Loc, LogicalOp, MemberKey, Module,
    ObjectEntry, Pat, Stmt, TemplatePart,
};
use anyhow::{Result, anyhow};
use tree_sitter::{Node, Parser};

/// Parser for one grammar. Lowering is shared; only the grammar differs.
pub struct ModuleParser {
    parser: Parser,
}

impl ModuleParser {
    pub fn javascript() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_javascript::LANGUAGE;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    pub fn typescript() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    pub fn tsx() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_typescript::LANGUAGE_TSX;
        parser.set_language(&language.into())?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Module> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("parser produced no tree"))?;
        let root = tree.root_node();
        Ok(Module {
            body: lower_statements(root, source),
        })
    }
}

/// One parser per grammar, selected by the scanner's language tag.
pub struct ParserSet {
    javascript: ModuleParser,
    typescript: ModuleParser,
    tsx: ModuleParser,
}

impl ParserSet {
    pub fn new() -> Result<Self> {
        Ok(Self {
            javascript: ModuleParser::javascript()?,
            typescript: ModuleParser::typescript()?,
            tsx: ModuleParser::tsx()?,
        })
    }

    pub fn parse(&mut self, language: &str, source: &str) -> Result<Module> {
        match language {
            "javascript" => self.javascript.parse(source),
            "typescript" => self.typescript.parse(source),
            "tsx" => self.tsx.parse(source),
            other => Err(anyhow!("unknown language {other}")),
        }
    }
}

fn node_text(node: Node<'_>, source: &str) -> String {
    source
        .get(node.start_byte()..node.end_byte())
        .unwrap_or("")
        .to_string()
}

fn loc(node: Node<'_>) -> Loc {
    let pos = node.start_position();
    Loc::new(pos.row as i64 + 1, pos.column as i64 + 1)
}

fn lower_statements(node: Node<'_>, source: &str) -> Vec<Stmt> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        out.push(lower_statement(child, source));
    }
    out
}

fn lower_statement(node: Node<'_>, source: &str) -> Stmt {
    match node.kind() {
        "lexical_declaration" | "variable_declaration" => Stmt::Decl {
            bindings: lower_declarators(node, source),
            exported: false,
        },
        "function_declaration" | "generator_function_declaration" => {
            lower_function_declaration(node, source, false)
        }
        "expression_statement" => match node.named_child(0) {
            Some(child) => Stmt::Expr(lower_expr(child, source)),
            None => Stmt::Other,
        },
        "return_statement" => Stmt::Return(node.named_child(0).map(|n| lower_expr(n, source))),
        "if_statement" => {
            let test = node
                .child_by_field_name("condition")
                .map(|n| lower_expr(unwrap_node(n), source))
                .unwrap_or(Expr::Raw(String::new()));
            let then = node
                .child_by_field_name("consequence")
                .map(|n| lower_block_or_single(n, source))
                .unwrap_or_default();
            let alt = node
                .child_by_field_name("alternative")
                .map(|n| lower_block_or_single(n, source))
                .unwrap_or_default();
            Stmt::If { test, then, alt }
        }
        "statement_block" => Stmt::Block(lower_statements(node, source)),
        "for_statement" | "for_in_statement" | "while_statement" | "do_statement" => {
            let body = node
                .child_by_field_name("body")
                .map(|n| lower_block_or_single(n, source))
                .unwrap_or_default();
            Stmt::Loop(body)
        }
        "try_statement" => {
            let block = node
                .child_by_field_name("body")
                .map(|n| lower_statements(n, source))
                .unwrap_or_default();
            let handler = catch_block(node, source);
            let finalizer = node
                .child_by_field_name("finalizer")
                .and_then(|n| n.named_child(0))
                .map(|n| lower_statements(n, source))
                .unwrap_or_default();
            Stmt::Try {
                block,
                handler,
                finalizer,
            }
        }
        "import_statement" => lower_import(node, source),
        "export_statement" => lower_export(node, source),
        "class_declaration" | "abstract_class_declaration" => {
            // Classes are not indexed as bindings, but their method bodies
            // still contain classifiable call sites.
            Stmt::Block(class_method_functions(node, source))
        }
        "labeled_statement" | "switch_statement" | "switch_body" | "switch_case"
        | "switch_default" => {
            let mut nested = Vec::new();
            collect_nested_statements(node, source, &mut nested);
            Stmt::Block(nested)
        }
        _ => Stmt::Other,
    }
}

fn catch_block(node: Node<'_>, source: &str) -> Vec<Stmt> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "catch_clause" {
            return child
                .child_by_field_name("body")
                .map(|n| lower_statements(n, source))
                .unwrap_or_default();
        }
    }
    Vec::new()
}

fn collect_nested_statements(node: Node<'_>, source: &str, out: &mut Vec<Stmt>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "switch_body" | "switch_case" | "switch_default" => {
                collect_nested_statements(child, source, out);
            }
            "comment" | "identifier" | "property_identifier" => {}
            kind if kind.ends_with("_expression") || kind == "parenthesized_expression" => {
                out.push(Stmt::Expr(lower_expr(child, source)));
            }
            _ => out.push(lower_statement(child, source)),
        }
    }
}

fn class_method_functions(node: Node<'_>, source: &str) -> Vec<Stmt> {
    let mut out = Vec::new();
    let Some(body) = node.child_by_field_name("body") else {
        return out;
    };
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() != "method_definition" {
            continue;
        }
        if let Some(func) = lower_function_parts(child, source) {
            out.push(Stmt::Expr(Expr::Func(Box::new(func))));
        }
    }
    out
}

fn lower_declarators(node: Node<'_>, source: &str) -> Vec<(String, Option<Expr>)> {
    let mut bindings = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        if name_node.kind() != "identifier" {
            // Destructuring declarators carry no single resolvable binding,
            // but the initializer must stay visible to call traversal.
            let value = child
                .child_by_field_name("value")
                .map(|n| lower_expr(unwrap_node(n), source));
            if value.is_some() {
                bindings.push((String::new(), value));
            }
            continue;
        }
        let name = node_text(name_node, source);
        let value = child
            .child_by_field_name("value")
            .map(|n| lower_expr(unwrap_node(n), source));
        bindings.push((name, value));
    }
    bindings
}

fn lower_function_declaration(node: Node<'_>, source: &str, exported: bool) -> Stmt {
    let Some(name_node) = node.child_by_field_name("name") else {
        return Stmt::Other;
    };
    let name = node_text(name_node, source);
    match lower_function_parts(node, source) {
        Some(func) => Stmt::FuncDecl {
            name,
            func,
            exported,
        },
        None => Stmt::Other,
    }
}

fn lower_import(node: Node<'_>, source: &str) -> Stmt {
    let Some(source_node) = node.child_by_field_name("source") else {
        return Stmt::Other;
    };
    let module_source = string_content(source_node, source);
    let mut specifiers = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for part in child.named_children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => {
                    specifiers.push(ImportSpec::Default(node_text(part, source)));
                }
                "namespace_import" => {
                    if let Some(name) = first_identifier(part, source) {
                        specifiers.push(ImportSpec::Namespace(name));
                    }
                }
                "named_imports" => {
                    let mut spec_cursor = part.walk();
                    for spec in part.named_children(&mut spec_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name_node) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = node_text(name_node, source);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|n| node_text(n, source))
                            .unwrap_or_else(|| imported.clone());
                        specifiers.push(ImportSpec::Named { imported, local });
                    }
                }
                _ => {}
            }
        }
    }
    Stmt::Import(ImportDecl {
        source: module_source,
        specifiers,
    })
}

fn lower_export(node: Node<'_>, source: &str) -> Stmt {
    let module_source = node
        .child_by_field_name("source")
        .map(|n| string_content(n, source));

    // export * from "mod"
    let mut has_star = false;
    let mut cursor = node.walk();
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "*" {
                has_star = true;
            }
        }
    }
    if has_star {
        if let Some(source_mod) = module_source {
            return Stmt::ExportAll { source: source_mod };
        }
        return Stmt::Other;
    }

    if let Some(decl) = node.child_by_field_name("declaration") {
        return match decl.kind() {
            "lexical_declaration" | "variable_declaration" => Stmt::Decl {
                bindings: lower_declarators(decl, source),
                exported: true,
            },
            "function_declaration" | "generator_function_declaration" => {
                lower_function_declaration(decl, source, true)
            }
            _ => Stmt::Other,
        };
    }

    // export default <expr>
    if let Some(value) = node.child_by_field_name("value") {
        return Stmt::ExportDefault(lower_expr(unwrap_node(value), source));
    }
    let mut is_default = false;
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == "default" {
                is_default = true;
            }
        }
    }
    if is_default {
        if let Some(expr_node) = node.named_children(&mut cursor).find(|n| {
            n.kind() != "comment" && n.kind() != "export_clause" && n.kind() != "string"
        }) {
            return Stmt::ExportDefault(lower_expr(unwrap_node(expr_node), source));
        }
        return Stmt::Other;
    }

    // export { a as b } [from "mod"]
    let mut specifiers = Vec::new();
    let mut clause_cursor = node.walk();
    for child in node.named_children(&mut clause_cursor) {
        if child.kind() != "export_clause" {
            continue;
        }
        let mut spec_cursor = child.walk();
        for spec in child.named_children(&mut spec_cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let local = node_text(name_node, source);
            let exported = spec
                .child_by_field_name("alias")
                .map(|n| node_text(n, source))
                .unwrap_or_else(|| local.clone());
            specifiers.push((local, exported));
        }
    }
    if specifiers.is_empty() {
        return Stmt::Other;
    }
    Stmt::ExportNamed {
        specifiers,
        source: module_source,
    }
}

fn lower_block_or_single(node: Node<'_>, source: &str) -> Vec<Stmt> {
    if node.kind() == "statement_block" {
        lower_statements(node, source)
    } else if node.kind() == "else_clause" {
        match node.named_child(0) {
            Some(inner) => lower_block_or_single(inner, source),
            None => Vec::new(),
        }
    } else {
        vec![lower_statement(node, source)]
    }
}

/// Strip wrapper nodes that carry no analysis meaning: parentheses, await,
/// TS assertions and non-null operators.
fn unwrap_node(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    loop {
        match current.kind() {
            "parenthesized_expression" => {
                let Some(inner) = current.named_child(0) else {
                    return current;
                };
                current = inner;
            }
            "await_expression" => {
                let Some(inner) = current.named_child(0) else {
                    return current;
                };
                current = inner;
            }
            "as_expression" | "satisfies_expression" | "non_null_expression"
            | "type_assertion" => {
                let Some(inner) = current.named_child(0) else {
                    return current;
                };
                current = inner;
            }
            _ => return current,
        }
    }
}

pub(crate) fn lower_expr(node: Node<'_>, source: &str) -> Expr {
    let node = unwrap_node(node);
    match node.kind() {
        "identifier" => {
            let text = node_text(node, source);
            if text == "undefined" {
                Expr::Lit(Lit::Undefined)
            } else {
                Expr::Ident(text)
            }
        }
        "string" => Expr::Lit(Lit::Str(string_content(node, source))),
        "number" => Expr::Lit(Lit::Num(node_text(node, source))),
        "true" => Expr::Lit(Lit::Bool(true)),
        "false" => Expr::Lit(Lit::Bool(false)),
        "null" => Expr::Lit(Lit::Null),
        "undefined" => Expr::Lit(Lit::Undefined),
        "template_string" => lower_template(node, source),
        "array" => lower_array(node, source),
        "object" => lower_object(node, source),
        "member_expression" | "optional_member_expression" => {
            let object = node
                .child_by_field_name("object")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Raw(node_text(node, source)));
            let key = node
                .child_by_field_name("property")
                .map(|n| MemberKey::Name(node_text(n, source)))
                .unwrap_or(MemberKey::Name(String::new()));
            Expr::Member {
                object: Box::new(object),
                key,
            }
        }
        "subscript_expression" => {
            let object = node
                .child_by_field_name("object")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Raw(node_text(node, source)));
            let key = match node.child_by_field_name("index") {
                Some(index) => match lower_expr(index, source) {
                    Expr::Lit(Lit::Str(name)) => MemberKey::Name(name),
                    other => MemberKey::Index(Box::new(other)),
                },
                None => MemberKey::Name(String::new()),
            };
            Expr::Member {
                object: Box::new(object),
                key,
            }
        }
        "call_expression" => {
            let callee = node
                .child_by_field_name("function")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Raw(String::new()));
            Expr::Call {
                callee: Box::new(callee),
                args: call_arguments(node, source),
                loc: loc(node),
            }
        }
        "new_expression" => {
            let callee = node
                .child_by_field_name("constructor")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Raw(String::new()));
            Expr::New {
                callee: Box::new(callee),
                args: call_arguments(node, source),
                loc: loc(node),
            }
        }
        "ternary_expression" => {
            let test = field_expr(node, "condition", source);
            let consequent = field_expr(node, "consequence", source);
            let alternate = field_expr(node, "alternative", source);
            Expr::Cond {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }
        }
        "binary_expression" => {
            let op = node
                .child_by_field_name("operator")
                .map(|n| node_text(n, source))
                .unwrap_or_default();
            let left = field_expr(node, "left", source);
            let right = field_expr(node, "right", source);
            match op.as_str() {
                "&&" => Expr::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                "||" => Expr::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                "??" => Expr::Logical {
                    op: LogicalOp::Coalesce,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                _ => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            }
        }
        "unary_expression" => {
            let op = node
                .child_by_field_name("operator")
                .map(|n| node_text(n, source))
                .unwrap_or_default();
            let operand = node
                .child_by_field_name("argument")
                .map(|n| lower_expr(n, source))
                .unwrap_or(Expr::Raw(String::new()));
            Expr::Unary {
                op,
                operand: Box::new(operand),
            }
        }
        // Assignments lower to their right-hand side so call sites inside
        // the assigned value stay visible to traversal.
        "assignment_expression" | "augmented_assignment_expression" => {
            field_expr(node, "right", source)
        }
        "arrow_function" | "function_expression" | "function" | "generator_function" => {
            match lower_function_parts(node, source) {
                Some(func) => Expr::Func(Box::new(func)),
                None => Expr::Raw(node_text(node, source)),
            }
        }
        _ => Expr::Raw(node_text(node, source)),
    }
}

fn field_expr(node: Node<'_>, field: &str, source: &str) -> Expr {
    node.child_by_field_name(field)
        .map(|n| lower_expr(n, source))
        .unwrap_or(Expr::Raw(String::new()))
}

fn call_arguments(node: Node<'_>, source: &str) -> Vec<Expr> {
    let mut out = Vec::new();
    let Some(args) = node.child_by_field_name("arguments") else {
        return out;
    };
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        out.push(lower_expr(child, source));
    }
    out
}

fn lower_template(node: Node<'_>, source: &str) -> Expr {
    let mut parts = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" => parts.push(TemplatePart::Text(node_text(child, source))),
            "template_substitution" => {
                if let Some(inner) = child.named_child(0) {
                    parts.push(TemplatePart::Interp(lower_expr(inner, source)));
                }
            }
            "escape_sequence" => parts.push(TemplatePart::Text(node_text(child, source))),
            _ => {}
        }
    }
    Expr::Template(parts)
}

fn lower_array(node: Node<'_>, source: &str) -> Expr {
    let mut elems = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "comment" => {}
            "spread_element" => {
                if let Some(inner) = child.named_child(0) {
                    elems.push(ArrayElem::Spread(lower_expr(inner, source)));
                }
            }
            _ => elems.push(ArrayElem::Item(lower_expr(child, source))),
        }
    }
    Expr::Array(elems)
}

fn lower_object(node: Node<'_>, source: &str) -> Expr {
    let mut entries = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "pair" => {
                let Some(key_node) = child.child_by_field_name("key") else {
                    continue;
                };
                let value = child
                    .child_by_field_name("value")
                    .map(|n| lower_expr(n, source))
                    .unwrap_or(Expr::Raw(String::new()));
                if key_node.kind() == "computed_property_name" {
                    let key = key_node
                        .named_child(0)
                        .map(|n| lower_expr(n, source))
                        .unwrap_or(Expr::Raw(String::new()));
                    // A computed key over a plain string literal is static.
                    if let Expr::Lit(Lit::Str(name)) = &key {
                        entries.push(ObjectEntry::Pair {
                            key: name.clone(),
                            value,
                        });
                    } else {
                        entries.push(ObjectEntry::Computed {
                            key,
                            value,
                        });
                    }
                } else {
                    entries.push(ObjectEntry::Pair {
                        key: property_name(key_node, source),
                        value,
                    });
                }
            }
            "shorthand_property_identifier" => {
                entries.push(ObjectEntry::Shorthand(node_text(child, source)));
            }
            "spread_element" => {
                if let Some(inner) = child.named_child(0) {
                    entries.push(ObjectEntry::Spread(lower_expr(inner, source)));
                }
            }
            "method_definition" => {
                let Some(name_node) = child.child_by_field_name("name") else {
                    continue;
                };
                if let Some(func) = lower_function_parts(child, source) {
                    entries.push(ObjectEntry::Method {
                        key: property_name(name_node, source),
                        func,
                    });
                }
            }
            _ => {}
        }
    }
    Expr::Object(entries)
}

fn property_name(node: Node<'_>, source: &str) -> String {
    match node.kind() {
        "string" => string_content(node, source),
        _ => node_text(node, source),
    }
}

fn lower_function_parts(node: Node<'_>, source: &str) -> Option<Func> {
    let params = lower_params(node, source);
    let body_node = node.child_by_field_name("body")?;
    let body = if body_node.kind() == "statement_block" {
        FnBody::Block(lower_statements(body_node, source))
    } else {
        FnBody::Expr(Box::new(lower_expr(body_node, source)))
    };
    Some(Func { params, body })
}

fn lower_params(node: Node<'_>, source: &str) -> Vec<Pat> {
    // Arrow functions with a single bare parameter use the `parameter` field.
    if let Some(single) = node.child_by_field_name("parameter") {
        if single.kind() == "identifier" {
            return vec![Pat::Ident {
                name: node_text(single, source),
                type_name: None,
            }];
        }
        return vec![Pat::Other];
    }
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(Pat::Ident {
                name: node_text(child, source),
                type_name: None,
            }),
            "object_pattern" => out.push(lower_object_pattern(child, source, None)),
            "required_parameter" | "optional_parameter" => {
                let type_name = child
                    .child_by_field_name("type")
                    .map(|n| type_annotation_text(n, source));
                match child.child_by_field_name("pattern") {
                    Some(pat) if pat.kind() == "identifier" => out.push(Pat::Ident {
                        name: node_text(pat, source),
                        type_name,
                    }),
                    Some(pat) if pat.kind() == "object_pattern" => {
                        out.push(lower_object_pattern(pat, source, type_name))
                    }
                    _ => out.push(Pat::Other),
                }
            }
            "assignment_pattern" => match child.child_by_field_name("left") {
                Some(left) if left.kind() == "identifier" => out.push(Pat::Ident {
                    name: node_text(left, source),
                    type_name: None,
                }),
                Some(left) if left.kind() == "object_pattern" => {
                    out.push(lower_object_pattern(left, source, None))
                }
                _ => out.push(Pat::Other),
            },
            "comment" => {}
            _ => out.push(Pat::Other),
        }
    }
    out
}

fn lower_object_pattern(node: Node<'_>, source: &str, type_name: Option<String>) -> Pat {
    let mut fields = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "shorthand_property_identifier_pattern" => fields.push(node_text(child, source)),
            "pair_pattern" => {
                if let Some(value) = child.child_by_field_name("value") {
                    if value.kind() == "identifier" {
                        fields.push(node_text(value, source));
                    }
                }
            }
            "object_assignment_pattern" => {
                if let Some(left) = child.child_by_field_name("left") {
                    if left.kind() == "shorthand_property_identifier_pattern" {
                        fields.push(node_text(left, source));
                    }
                }
            }
            _ => {}
        }
    }
    Pat::Object { fields, type_name }
}

fn type_annotation_text(node: Node<'_>, source: &str) -> String {
    let raw = node_text(node, source);
    raw.trim_start_matches(':').trim().to_string()
}

fn string_content(node: Node<'_>, source: &str) -> String {
    let mut out = String::new();
    let mut saw_fragment = false;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" | "escape_sequence" => {
                saw_fragment = true;
                out.push_str(&node_text(child, source));
            }
            _ => {}
        }
    }
    if saw_fragment {
        return out;
    }
    node_text(node, source)
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

fn first_identifier(node: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "identifier" {
            return Some(node_text(child, source));
        }
    }
    None
}
