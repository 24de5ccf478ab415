use querylens::aliases::{AliasConfig, AliasPattern, AliasRegistry};
use querylens::ast::Expr;
use querylens::classify::classify_module;
use querylens::model::{CallSiteRecord, Resolution};
use querylens::parse::ParserSet;
use querylens::resolve::Resolver;
use querylens::scan::language_for_path;
use querylens::symbols::SymbolIndex;
use std::path::Path;

fn classify_with_aliases(
    files: &[(&str, &str)],
    aliases: AliasRegistry,
) -> Vec<CallSiteRecord> {
    let mut parsers = ParserSet::new().unwrap();
    let mut parsed = Vec::new();
    for (path, source) in files {
        let language = language_for_path(Path::new(path)).unwrap();
        parsed.push((path.to_string(), parsers.parse(language, source).unwrap()));
    }
    let index = SymbolIndex::build(&parsed);
    let mut resolver = Resolver::new(&index, &aliases);
    let mut records = Vec::new();
    for (path, module) in &parsed {
        records.extend(classify_module(&mut resolver, path, module));
    }
    records
}

fn classify(files: &[(&str, &str)]) -> Vec<CallSiteRecord> {
    classify_with_aliases(files, AliasRegistry::default())
}

const KEYS_TS: &str = r#"
export const todoKeys = {
    all: ["todos"],
    detail: (id) => [...todoKeys.all, "detail", id],
};
"#;

#[test]
fn factory_resolves_across_relative_import() {
    let app = r#"
import { useQuery } from "@tanstack/react-query";
import { todoKeys } from "./keys";

export function useTodoDetail(id) {
    return useQuery({ queryKey: todoKeys.detail(id) });
}
"#;
    let records = classify(&[("src/keys.ts", KEYS_TS), ("src/app.ts", app)]);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.query_key.display, "[todos, detail, $id]");
    assert_eq!(record.resolution, Resolution::Dynamic);
    assert!(!record.declares_directly);
}

#[test]
fn inlined_argument_makes_factory_key_static() {
    let app = r#"
import { useQueryClient } from "@tanstack/react-query";
import { todoKeys } from "./keys";

export function refresh() {
    const client = useQueryClient();
    client.invalidateQueries({ queryKey: todoKeys.detail("42") });
}
"#;
    let records = classify(&[("src/keys.ts", KEYS_TS), ("src/app.ts", app)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[todos, detail, 42]");
    assert_eq!(records[0].resolution, Resolution::Static);
}

#[test]
fn factory_resolves_through_path_alias() {
    let app = r#"
import { useQuery } from "@tanstack/react-query";
import { todoKeys } from "@app/keys";

export function useTodos() {
    return useQuery({ queryKey: todoKeys.all });
}
"#;
    let aliases = AliasRegistry::from_configs(vec![AliasConfig {
        config_dir: ".".to_string(),
        patterns: vec![AliasPattern {
            pattern: "@app/*".to_string(),
            targets: vec!["src/*".to_string()],
        }],
    }]);
    let records =
        classify_with_aliases(&[("src/keys.ts", KEYS_TS), ("src/pages/app.ts", app)], aliases);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[todos]");
    assert_eq!(records[0].resolution, Resolution::Static);
}

#[test]
fn wildcard_reexport_is_walked_lazily() {
    let barrel = r#"
export * from "./keys";
"#;
    let app = r#"
import { useQuery } from "@tanstack/react-query";
import { todoKeys } from "./store";

export function useTodos() {
    return useQuery({ queryKey: todoKeys.all });
}
"#;
    let records = classify(&[
        ("src/keys.ts", KEYS_TS),
        ("src/store.ts", barrel),
        ("src/app.ts", app),
    ]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[todos]");
}

#[test]
fn named_reexport_redirects() {
    let barrel = r#"
export { todoKeys as keys } from "./keys";
"#;
    let app = r#"
import { useQuery } from "@tanstack/react-query";
import { keys } from "./store";

export function useTodos() {
    return useQuery({ queryKey: keys.all });
}
"#;
    let records = classify(&[
        ("src/keys.ts", KEYS_TS),
        ("src/store.ts", barrel),
        ("src/app.ts", app),
    ]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[todos]");
}

#[test]
fn identity_wrapper_options_are_unwrapped() {
    let source = r#"
import { queryOptions, useQuery } from "@tanstack/react-query";

export const todoOptions = queryOptions({ queryKey: ["todos", "list"] });

export function useTodos() {
    return useQuery(todoOptions);
}
"#;
    let records = classify(&[("src/options.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[todos, list]");
    assert_eq!(records[0].resolution, Resolution::Static);
    assert!(!records[0].declares_directly);
}

#[test]
fn unimported_factory_found_by_name_heuristic() {
    let factory = r#"
export function buildKeys() {
    const boardQueryKeys = { all: ["boards"] };
    return boardQueryKeys;
}
"#;
    let app = r#"
import { useQuery } from "@tanstack/react-query";

export function useBoards() {
    return useQuery({ queryKey: boardQueryKeys.all });
}
"#;
    let records = classify(&[("src/factories.ts", factory), ("src/boards.ts", app)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[boards]");
}

#[test]
fn ambiguous_factory_candidates_stay_unresolved() {
    let one = r#"
export function a() {
    const sharedQueryKeys = { all: ["one"] };
    return sharedQueryKeys;
}
"#;
    let two = r#"
export function b() {
    const sharedQueryKeys = { all: ["two"] };
    return sharedQueryKeys;
}
"#;
    let app = r#"
import { useQuery } from "@tanstack/react-query";

export function useShared() {
    return useQuery({ queryKey: sharedQueryKeys.all });
}
"#;
    let records = classify(&[
        ("packages/x/one.ts", one),
        ("packages/y/two.ts", two),
        ("packages/z/app.ts", app),
    ]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resolution, Resolution::Dynamic);
    assert_eq!(records[0].query_key.display, "[sharedQueryKeys.all]");
}

#[test]
fn depth_cap_bounds_binding_chains() {
    let mut source = String::from("export const k0 = [\"todos\"];\n");
    for i in 1..=8 {
        source.push_str(&format!("export const k{i} = k{};\n", i - 1));
    }
    let mut parsers = ParserSet::new().unwrap();
    let language = language_for_path(Path::new("src/chain.ts")).unwrap();
    let parsed = vec![(
        "src/chain.ts".to_string(),
        parsers.parse(language, &source).unwrap(),
    )];
    let index = SymbolIndex::build(&parsed);
    let aliases = AliasRegistry::default();

    let mut bounded = Resolver::new(&index, &aliases).with_depth_cap(3);
    assert!(bounded
        .resolve_expr("src/chain.ts", &Expr::Ident("k8".into()))
        .is_none());

    let mut full = Resolver::new(&index, &aliases);
    let resolved = full
        .resolve_expr("src/chain.ts", &Expr::Ident("k8".into()))
        .unwrap();
    assert!(matches!(resolved.expr, Expr::Array(_)));
}

#[test]
fn cyclic_aliases_terminate_as_dynamic() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

const first = second;
const second = first;

export function useLoop() {
    return useQuery({ queryKey: first });
}
"#;
    let records = classify(&[("src/loop.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resolution, Resolution::Dynamic);
    assert_eq!(records[0].query_key.display, "[$first]");
}
