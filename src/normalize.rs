//! Cache-key normalization: a structural fold from any expression to an
//! ordered list of canonical segments plus a certainty bit per segment.
//!
//! Everything here is best-effort but deterministic. Unresolvable structure
//! degrades to a `$name`-style dynamic segment; it never disappears and
//! never throws.

use crate::ast::{self, ArrayElem, Expr, Lit, ObjectEntry, TemplatePart};
use crate::model::{KeySegment, KeySource, MatchMode, NormalizedKey, Resolution};
use crate::resolve::Resolver;

/// Normalize a key expression found at a call site in `file`.
pub fn normalize(
    resolver: &mut Resolver,
    file: &str,
    expr: &Expr,
    match_mode: MatchMode,
) -> NormalizedKey {
    let source = match expr {
        Expr::Array(_) | Expr::Object(_) => KeySource::Literal,
        _ => KeySource::Expression,
    };
    let (file, expr) = deref(resolver, file, expr);
    let segments = top_level_segments(resolver, &file, &expr);
    NormalizedKey::from_segments(segments, match_mode, source)
}

/// Normalize a single expression to one canonical segment. Used by the
/// classifier when assembling synthetic keys from predicate comparisons.
pub fn segment(resolver: &mut Resolver, file: &str, expr: &Expr) -> KeySegment {
    segment_of(resolver, file, expr)
}

/// Resolve reference-shaped expressions to their structural value. On
/// failure the original expression is kept and will normalize dynamically.
fn deref(resolver: &mut Resolver, file: &str, expr: &Expr) -> (String, Expr) {
    match expr {
        Expr::Ident(_) | Expr::Member { .. } | Expr::Call { .. } => {
            match resolver.resolve_expr(file, expr) {
                Some(resolved) => (resolved.file, resolved.expr),
                None => (file.to_string(), expr.clone()),
            }
        }
        _ => (file.to_string(), expr.clone()),
    }
}

fn top_level_segments(resolver: &mut Resolver, file: &str, expr: &Expr) -> Vec<KeySegment> {
    match expr {
        Expr::Array(elems) => {
            // Helper wrappers commonly nest as `[{queryKey: […]}]`; unwrap
            // the embedded key instead of normalizing the outer array.
            if let Some(inner) = embedded_query_key(elems) {
                let (inner_file, inner_expr) = deref(resolver, file, inner);
                return top_level_segments(resolver, &inner_file, &inner_expr);
            }
            array_segments(resolver, file, elems)
        }
        _ => vec![segment_of(resolver, file, expr)],
    }
}

/// `[{queryKey: …}]` → the embedded key expression.
fn embedded_query_key(elems: &[ArrayElem]) -> Option<&Expr> {
    let [ArrayElem::Item(Expr::Object(entries))] = elems else {
        return None;
    };
    let [ObjectEntry::Pair { key, value }] = entries.as_slice() else {
        return None;
    };
    (key == "queryKey").then_some(value)
}

fn array_segments(resolver: &mut Resolver, file: &str, elems: &[ArrayElem]) -> Vec<KeySegment> {
    let mut segments = Vec::with_capacity(elems.len());
    for elem in elems {
        match elem {
            ArrayElem::Item(item) => segments.push(segment_of(resolver, file, item)),
            ArrayElem::Spread(source) => splice_spread(resolver, file, source, &mut segments),
        }
    }
    segments
}

/// Inline a spread element by resolving its source and splicing that array's
/// elements. A source that does not resolve to an array collapses to one
/// dynamic `...` segment.
fn splice_spread(resolver: &mut Resolver, file: &str, source: &Expr, out: &mut Vec<KeySegment>) {
    let (src_file, resolved) = deref(resolver, file, source);
    match resolved {
        Expr::Array(elems) => out.extend(array_segments(resolver, &src_file, &elems)),
        _ => out.push(KeySegment::dynamic(format!(
            "...{}",
            ast::approximate(source)
        ))),
    }
}

/// One canonical segment for one structural element.
fn segment_of(resolver: &mut Resolver, file: &str, expr: &Expr) -> KeySegment {
    match expr {
        Expr::Lit(lit) => KeySegment::fixed(lit.text()),
        Expr::Ident(_) | Expr::Member { .. } | Expr::Call { .. } => {
            match resolver.resolve_expr(file, expr) {
                Some(resolved) => segment_of(resolver, &resolved.file, &resolved.expr),
                None => KeySegment::dynamic(ast::approximate(expr)),
            }
        }
        Expr::Template(parts) => template_segment(resolver, file, parts),
        Expr::Array(elems) => {
            let inner = array_segments(resolver, file, elems);
            let resolution = fold_resolution(&inner);
            let text = format!(
                "[{}]",
                inner
                    .iter()
                    .map(|seg| seg.text.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            KeySegment { text, resolution }
        }
        Expr::Object(entries) => object_segment(resolver, file, entries),
        // Conditionals are not evaluated or branched here; without further
        // context they collapse to an opaque dynamic placeholder.
        _ => KeySegment::dynamic(ast::approximate(expr)),
    }
}

fn template_segment(resolver: &mut Resolver, file: &str, parts: &[TemplatePart]) -> KeySegment {
    let mut text = String::new();
    let mut resolution = Resolution::Static;
    for part in parts {
        match part {
            TemplatePart::Text(run) => text.push_str(run),
            TemplatePart::Interp(inner) => {
                let seg = segment_of(resolver, file, inner);
                text.push_str(&seg.text);
                resolution = resolution.merge(seg.resolution);
            }
        }
    }
    KeySegment { text, resolution }
}

/// Object entries render as `key: value`. When no entry is spread or
/// computed, entries sort by key name and statically-undefined values are
/// dropped, making the canonical form order-independent. Any spread or
/// computed entry disables both: source order is kept as written.
fn object_segment(resolver: &mut Resolver, file: &str, entries: &[ObjectEntry]) -> KeySegment {
    let canonical = entries
        .iter()
        .all(|entry| !matches!(entry, ObjectEntry::Spread(_) | ObjectEntry::Computed { .. }));
    let mut rendered: Vec<(String, KeySegment)> = Vec::with_capacity(entries.len());
    let mut resolution = Resolution::Static;
    for entry in entries {
        match entry {
            ObjectEntry::Pair { key, value } => {
                if canonical && is_statically_undefined(resolver, file, value) {
                    continue;
                }
                rendered.push((key.clone(), segment_of(resolver, file, value)));
            }
            ObjectEntry::Shorthand(name) => {
                let value = Expr::Ident(name.clone());
                if canonical && is_statically_undefined(resolver, file, &value) {
                    continue;
                }
                rendered.push((name.clone(), segment_of(resolver, file, &value)));
            }
            ObjectEntry::Method { key, .. } => {
                rendered.push((key.clone(), KeySegment::dynamic("fn")));
            }
            ObjectEntry::Computed { key, value } => {
                let key_seg = segment_of(resolver, file, key);
                let value_seg = segment_of(resolver, file, value);
                resolution = resolution.merge(key_seg.resolution);
                rendered.push((format!("[{}]", key_seg.text), value_seg));
            }
            ObjectEntry::Spread(source) => {
                let (src_file, resolved) = deref(resolver, file, source);
                if let Expr::Object(inner) = resolved {
                    let spliced = object_segment(resolver, &src_file, &inner);
                    resolution = resolution.merge(spliced.resolution);
                    rendered.push((
                        format!("...{}", ast::approximate(source)),
                        KeySegment {
                            text: spliced.text,
                            resolution: spliced.resolution,
                        },
                    ));
                } else {
                    rendered.push((
                        format!("...{}", ast::approximate(source)),
                        KeySegment::dynamic("?"),
                    ));
                }
            }
        }
    }
    if canonical {
        rendered.sort_by(|a, b| a.0.cmp(&b.0));
    }
    let mut text = String::from("{");
    for (i, (key, seg)) in rendered.iter().enumerate() {
        if i > 0 {
            text.push_str(", ");
        }
        if key.starts_with("...") {
            // Spread entries render as the spliced/approximated value alone.
            text.push_str(&seg.text);
        } else {
            text.push_str(key);
            text.push_str(": ");
            text.push_str(&seg.text);
        }
        resolution = resolution.merge(seg.resolution);
    }
    text.push('}');
    KeySegment { text, resolution }
}

fn fold_resolution(segments: &[KeySegment]) -> Resolution {
    segments
        .iter()
        .fold(Resolution::Static, |acc, seg| acc.merge(seg.resolution))
}

/// True when the value is `undefined` (or `void 0`) as written, or resolves
/// statically to `undefined`.
fn is_statically_undefined(resolver: &mut Resolver, file: &str, expr: &Expr) -> bool {
    match expr {
        Expr::Lit(Lit::Undefined) => true,
        Expr::Unary { op, .. } if op == "void" => true,
        Expr::Ident(_) | Expr::Member { .. } | Expr::Call { .. } => {
            matches!(
                resolver.resolve_expr(file, expr),
                Some(resolved) if matches!(resolved.expr, Expr::Lit(Lit::Undefined))
            )
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::AliasRegistry;
    use crate::symbols::SymbolIndex;

    fn lit(text: &str) -> Expr {
        Expr::Lit(Lit::Str(text.to_string()))
    }

    fn item(expr: Expr) -> ArrayElem {
        ArrayElem::Item(expr)
    }

    #[test]
    fn object_entries_sort_canonically() {
        let index = SymbolIndex::default();
        let aliases = AliasRegistry::default();
        let mut resolver = Resolver::new(&index, &aliases);
        let forward = Expr::Object(vec![
            ObjectEntry::Pair {
                key: "a".into(),
                value: lit("1"),
            },
            ObjectEntry::Pair {
                key: "b".into(),
                value: lit("2"),
            },
        ]);
        let backward = Expr::Object(vec![
            ObjectEntry::Pair {
                key: "b".into(),
                value: lit("2"),
            },
            ObjectEntry::Pair {
                key: "a".into(),
                value: lit("1"),
            },
        ]);
        let f = normalize(&mut resolver, "a.ts", &forward, MatchMode::Exact);
        let b = normalize(&mut resolver, "a.ts", &backward, MatchMode::Exact);
        assert_eq!(f.display, b.display);
        assert_eq!(f.id, b.id);
    }

    #[test]
    fn undefined_valued_entries_are_dropped() {
        let index = SymbolIndex::default();
        let aliases = AliasRegistry::default();
        let mut resolver = Resolver::new(&index, &aliases);
        let with = Expr::Object(vec![
            ObjectEntry::Pair {
                key: "a".into(),
                value: lit("1"),
            },
            ObjectEntry::Pair {
                key: "b".into(),
                value: Expr::Lit(Lit::Undefined),
            },
        ]);
        let without = Expr::Object(vec![ObjectEntry::Pair {
            key: "a".into(),
            value: lit("1"),
        }]);
        let a = normalize(&mut resolver, "a.ts", &with, MatchMode::Exact);
        let b = normalize(&mut resolver, "a.ts", &without, MatchMode::Exact);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn unresolved_identifier_becomes_dynamic_marker() {
        let index = SymbolIndex::default();
        let aliases = AliasRegistry::default();
        let mut resolver = Resolver::new(&index, &aliases);
        let expr = Expr::Array(vec![item(lit("todos")), item(Expr::Ident("id".into()))]);
        let key = normalize(&mut resolver, "a.ts", &expr, MatchMode::Exact);
        assert_eq!(key.display, "[todos, $id]");
        assert_eq!(key.resolution, Resolution::Dynamic);
        assert_eq!(key.segments[0].resolution, Resolution::Static);
        assert_eq!(key.segments[1].resolution, Resolution::Dynamic);
    }

    #[test]
    fn embedded_query_key_wrapper_is_unwrapped() {
        let index = SymbolIndex::default();
        let aliases = AliasRegistry::default();
        let mut resolver = Resolver::new(&index, &aliases);
        let expr = Expr::Array(vec![item(Expr::Object(vec![ObjectEntry::Pair {
            key: "queryKey".into(),
            value: Expr::Array(vec![item(lit("todos")), item(lit("list"))]),
        }]))]);
        let key = normalize(&mut resolver, "a.ts", &expr, MatchMode::Exact);
        assert_eq!(key.display, "[todos, list]");
        assert_eq!(key.resolution, Resolution::Static);
    }

    #[test]
    fn spread_of_unknown_source_collapses_to_dynamic_segment() {
        let index = SymbolIndex::default();
        let aliases = AliasRegistry::default();
        let mut resolver = Resolver::new(&index, &aliases);
        let expr = Expr::Array(vec![
            item(lit("todos")),
            ArrayElem::Spread(Expr::Ident("rest".into())),
        ]);
        let key = normalize(&mut resolver, "a.ts", &expr, MatchMode::Exact);
        assert_eq!(key.display, "[todos, ...$rest]");
        assert_eq!(key.resolution, Resolution::Dynamic);
    }
}
