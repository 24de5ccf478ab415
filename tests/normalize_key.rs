use querylens::aliases::AliasRegistry;
use querylens::classify::classify_module;
use querylens::model::{CallSiteRecord, Resolution};
use querylens::parse::ParserSet;
use querylens::resolve::Resolver;
use querylens::scan::language_for_path;
use querylens::symbols::SymbolIndex;
use std::path::Path;

fn classify(files: &[(&str, &str)]) -> Vec<CallSiteRecord> {
    let mut parsers = ParserSet::new().unwrap();
    let mut parsed = Vec::new();
    for (path, source) in files {
        let language = language_for_path(Path::new(path)).unwrap();
        parsed.push((path.to_string(), parsers.parse(language, source).unwrap()));
    }
    let index = SymbolIndex::build(&parsed);
    let aliases = AliasRegistry::default();
    let mut resolver = Resolver::new(&index, &aliases);
    let mut records = Vec::new();
    for (path, module) in &parsed {
        records.extend(classify_module(&mut resolver, path, module));
    }
    records
}

fn single_key(files: &[(&str, &str)]) -> CallSiteRecord {
    let mut records = classify(files);
    assert_eq!(records.len(), 1);
    records.remove(0)
}

#[test]
fn normalization_is_idempotent_across_identical_sites() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

export function useA() {
    return useQuery({ queryKey: ["todos", "list"] });
}

export function useB() {
    return useQuery({ queryKey: ["todos", "list"] });
}
"#;
    let records = classify(&[("src/a.ts", source)]);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].query_key.id, records[1].query_key.id);
    assert_eq!(records[0].query_key.display, records[1].query_key.display);
}

#[test]
fn object_segment_is_order_independent() {
    let first = r#"
import { useQuery } from "@tanstack/react-query";
export function useA() {
    return useQuery({ queryKey: ["todos", { page: 1, sort: "asc" }] });
}
"#;
    let second = r#"
import { useQuery } from "@tanstack/react-query";
export function useB() {
    return useQuery({ queryKey: ["todos", { sort: "asc", page: 1 }] });
}
"#;
    let a = single_key(&[("src/a.ts", first)]);
    let b = single_key(&[("src/b.ts", second)]);
    assert_eq!(a.query_key.id, b.query_key.id);
    assert_eq!(a.query_key.display, "[todos, {page: 1, sort: asc}]");
}

#[test]
fn undefined_filter_values_are_dropped() {
    let with_undefined = r#"
import { useQuery } from "@tanstack/react-query";
export function useA() {
    return useQuery({ queryKey: ["todos", { page: 1, cursor: undefined }] });
}
"#;
    let without = r#"
import { useQuery } from "@tanstack/react-query";
export function useB() {
    return useQuery({ queryKey: ["todos", { page: 1 }] });
}
"#;
    let a = single_key(&[("src/a.ts", with_undefined)]);
    let b = single_key(&[("src/b.ts", without)]);
    assert_eq!(a.query_key.id, b.query_key.id);
    assert_eq!(a.resolution, Resolution::Static);
}

#[test]
fn spread_disables_object_canonicalization() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";
export function useA(extra) {
    return useQuery({ queryKey: ["todos", { sort: "asc", ...extra }] });
}
"#;
    let record = single_key(&[("src/a.ts", source)]);
    assert_eq!(record.resolution, Resolution::Dynamic);
    // Source order preserved: `sort` stays ahead of the spread.
    assert!(record.query_key.display.starts_with("[todos, {sort: asc, "));
}

#[test]
fn template_segments_concatenate() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

const scope = "admin";

export function useTodos(id) {
    return useQuery({ queryKey: [`${scope}-todos`, `todo-${id}`] });
}
"#;
    let record = single_key(&[("src/a.ts", source)]);
    assert_eq!(record.query_key.display, "[admin-todos, todo-$id]");
    assert_eq!(record.query_key.segments[0].resolution, Resolution::Static);
    assert_eq!(record.query_key.segments[1].resolution, Resolution::Dynamic);
}

#[test]
fn local_spread_splices_statically() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

const base = ["todos"];

export function useTodoList() {
    return useQuery({ queryKey: [...base, "list"] });
}
"#;
    let record = single_key(&[("src/a.ts", source)]);
    assert_eq!(record.query_key.display, "[todos, list]");
    assert_eq!(record.resolution, Resolution::Static);
}

#[test]
fn wrapped_query_key_array_is_unwrapped() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

const entry = [{ queryKey: ["todos", "list"] }];

export function refresh() {
    const client = useQueryClient();
    client.invalidateQueries({ queryKey: entry });
}
"#;
    let record = single_key(&[("src/a.ts", source)]);
    assert_eq!(record.query_key.display, "[todos, list]");
}

#[test]
fn conditional_key_collapses_to_dynamic_placeholder() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

export function useEither(flag) {
    return useQuery({ queryKey: [flag ? "todos" : "boards"] });
}
"#;
    let record = single_key(&[("src/a.ts", source)]);
    assert_eq!(record.resolution, Resolution::Dynamic);
    assert_eq!(record.query_key.segments.len(), 1);
    assert_eq!(record.query_key.segments[0].resolution, Resolution::Dynamic);
}
