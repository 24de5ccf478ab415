use querylens::aliases::AliasRegistry;
use querylens::classify::classify_module;
use querylens::model::{CallSiteRecord, MatchMode, Relation, Resolution};
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

#[test]
fn hook_declaration_with_inline_key() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

export function useTodo(id) {
    return useQuery({ queryKey: ["todos", id], queryFn: () => load(id) });
}
"#;
    let records = classify(&[("src/use-todo.ts", source)]);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.relation, Relation::Declares);
    assert_eq!(record.operation, "useQuery");
    assert!(record.declares_directly);
    assert_eq!(record.query_key.display, "[todos, $id]");
    assert_eq!(record.resolution, Resolution::Dynamic);
}

#[test]
fn destructured_hook_result_is_still_seen() {
    let source = r#"
import { useQuery } from "@tanstack/react-query";

export function TodoList() {
    const { data, isLoading } = useQuery({ queryKey: ["todos", "list"] });
    return data;
}
"#;
    let records = classify(&[("src/todo-list.tsx", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_key.display, "[todos, list]");
    assert_eq!(records[0].resolution, Resolution::Static);
}

#[test]
fn client_from_hook_binding_marks_mutations() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

export function useRefresh() {
    const queryClient = useQueryClient();
    return () => queryClient.invalidateQueries({ queryKey: ["todos"] });
}
"#;
    let records = classify(&[("src/use-refresh.ts", source)]);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.relation, Relation::Invalidates);
    assert_eq!(record.query_key.match_mode, MatchMode::Prefix);
    assert_eq!(record.query_key.display, "[todos]");
}

#[test]
fn typed_parameter_counts_as_client() {
    let source = r#"
import { QueryClient } from "@tanstack/react-query";

export function cancelTodos(client: QueryClient) {
    client.cancelQueries({ queryKey: ["todos"], exact: true });
}
"#;
    let records = classify(&[("src/cancel.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relation, Relation::Cancels);
    assert_eq!(records[0].query_key.match_mode, MatchMode::Exact);
}

#[test]
fn constructed_client_clear_is_scope_wide() {
    let source = r#"
import { QueryClient } from "@tanstack/react-query";

const client = new QueryClient();

export function resetApp() {
    client.clear();
}
"#;
    let records = classify(&[("src/reset.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relation, Relation::Clears);
    assert_eq!(records[0].query_key.match_mode, MatchMode::All);
    assert!(records[0].query_key.is_wildcard());
}

#[test]
fn set_query_data_is_exact() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

export function markDone(id) {
    const client = useQueryClient();
    client.setQueryData(["todos", "detail"], (old) => old);
}
"#;
    let records = classify(&[("src/mark-done.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relation, Relation::Sets);
    assert_eq!(records[0].query_key.match_mode, MatchMode::Exact);
    assert_eq!(records[0].query_key.display, "[todos, detail]");
}

#[test]
fn predicate_converts_to_prefix_constraint() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

export function dropTodos() {
    const client = useQueryClient();
    client.removeQueries({
        predicate: (query) => query.queryKey[0] === "todos" && query.queryKey[1] === "list",
    });
}
"#;
    let records = classify(&[("src/drop.ts", source)]);
    assert_eq!(records.len(), 1);
    let key = &records[0].query_key;
    assert_eq!(records[0].relation, Relation::Removes);
    assert_eq!(key.match_mode, MatchMode::Predicate);
    assert_eq!(key.display, "[todos, list]");
}

#[test]
fn unconvertible_predicate_keeps_no_constraint() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

export function dropStale() {
    const client = useQueryClient();
    client.removeQueries({ predicate: (query) => query.isStale() });
}
"#;
    let records = classify(&[("src/drop-stale.ts", source)]);
    assert_eq!(records.len(), 1);
    let key = &records[0].query_key;
    assert_eq!(key.match_mode, MatchMode::Predicate);
    assert!(key.segments.is_empty());
}

#[test]
fn missing_filters_mean_all() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

export function refetchEverything() {
    const client = useQueryClient();
    client.refetchQueries();
}
"#;
    let records = classify(&[("src/refetch.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relation, Relation::Refetches);
    assert_eq!(records[0].query_key.match_mode, MatchMode::All);
}

#[test]
fn iterator_over_literal_array_expands_records() {
    let source = r#"
import { useQueryClient } from "@tanstack/react-query";

const statuses = ["active", "done"];

export function refreshBoards(client: QueryClient) {
    statuses.forEach((status) => {
        client.invalidateQueries({ queryKey: ["todos", status] });
    });
}
"#;
    let records = classify(&[("src/refresh-boards.ts", source)]);
    assert_eq!(records.len(), 2);
    let displays: Vec<&str> = records.iter().map(|r| r.query_key.display.as_str()).collect();
    assert!(displays.contains(&"[todos, active]"));
    assert!(displays.contains(&"[todos, done]"));
    assert!(records.iter().all(|r| r.resolution == Resolution::Static));
}

#[test]
fn query_key_passthrough_stays_unknown() {
    let source = r#"
import { QueryClient } from "@tanstack/react-query";

export function invalidate(client: QueryClient, queryKey) {
    client.invalidateQueries({ queryKey });
}
"#;
    let records = classify(&[("src/passthrough.ts", source)]);
    assert_eq!(records.len(), 1);
    let key = &records[0].query_key;
    assert_eq!(key.match_mode, MatchMode::Unknown);
    assert_eq!(key.resolution, Resolution::Dynamic);
}

#[test]
fn prefetch_method_declares() {
    let source = r#"
import { QueryClient } from "@tanstack/react-query";

export async function warm(client: QueryClient) {
    await client.prefetchQuery({ queryKey: ["todos", "list"] });
}
"#;
    let records = classify(&[("src/warm.ts", source)]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].relation, Relation::Declares);
    assert_eq!(records[0].operation, "prefetchQuery");
    assert!(records[0].declares_directly);
}
