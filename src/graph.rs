//! Graph assembly: two strictly ordered passes over the call-site records.
//!
//! Pass 1 collects the declared-key set per project scope. Pass 2 creates
//! nodes and edges, linking each mutation to the declared keys it can affect
//! without ever crossing a project-scope boundary. A final pruning pass
//! drops query-key nodes that nothing declares or concretely sets.

use crate::model::{
    CallSiteRecord, Graph, GraphEdge, GraphNode, GraphSummary, KeySegment, MatchMode, NodeKind,
    NodeMetrics, NormalizedKey, ParseError, Relation, Resolution,
};
use crate::project::ProjectScopes;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub fn assemble(
    records: &[CallSiteRecord],
    scopes: &ProjectScopes,
    parse_errors: Vec<ParseError>,
) -> Graph {
    let mut builder = Builder::default();

    // Pass 1: declared keys per project scope.
    for record in records {
        let scope = scopes.scope_for(&record.file);
        if record.relation.is_declaration() && !record.query_key.is_wildcard() {
            builder.declare(&scope, &record.query_key);
        }
    }

    // Pass 2: nodes and edges.
    for record in records {
        let scope = scopes.scope_for(&record.file);
        builder.link(record, &scope);
    }

    builder.finish(parse_errors)
}

fn key_node_id(scope: &str, key: &NormalizedKey) -> String {
    format!("querykey:{scope}:{}", key.id)
}

fn file_node_id(file: &str) -> String {
    format!("file:{file}")
}

fn action_node_id(record: &CallSiteRecord) -> String {
    format!(
        "action:{}:{}:{}:{}:{}",
        record.file,
        record.line,
        record.column,
        record.relation.as_str(),
        record.query_key.id
    )
}

/// Two segments are compatible when textually equal or when either side is
/// dynamic. Permissive on purpose: a dynamic segment matches anything,
/// trading false positives for no false negatives.
fn segments_compatible(a: &KeySegment, b: &KeySegment) -> bool {
    a.resolution == Resolution::Dynamic || b.resolution == Resolution::Dynamic || a.text == b.text
}

fn key_matches(mutation: &NormalizedKey, declared: &NormalizedKey) -> bool {
    match mutation.match_mode {
        MatchMode::Exact => {
            mutation.segments.len() == declared.segments.len()
                && mutation
                    .segments
                    .iter()
                    .zip(&declared.segments)
                    .all(|(a, b)| segments_compatible(a, b))
        }
        MatchMode::Prefix | MatchMode::Predicate => {
            mutation.segments.len() <= declared.segments.len()
                && mutation
                    .segments
                    .iter()
                    .zip(&declared.segments)
                    .all(|(a, b)| segments_compatible(a, b))
        }
        MatchMode::All => true,
        MatchMode::Unknown => false,
    }
}

/// Scope-wide records: explicit wildcards and predicates that carried no
/// convertible key constraint.
fn is_scope_wide(key: &NormalizedKey) -> bool {
    match key.match_mode {
        MatchMode::All => true,
        MatchMode::Predicate => key.segments.is_empty(),
        _ => false,
    }
}

struct KeyNodeState {
    key: NormalizedKey,
    scope: String,
    declares: usize,
    /// Concretely anchored by a static, non-wildcard `sets` record.
    anchored: bool,
    touching_files: BTreeSet<String>,
}

#[derive(Default)]
struct Builder {
    declared: HashMap<String, Vec<NormalizedKey>>,
    files: BTreeMap<String, String>,
    actions: BTreeMap<String, (CallSiteRecord, String)>,
    keys: BTreeMap<String, KeyNodeState>,
    edges: BTreeMap<(String, String, &'static str), GraphEdge>,
}

impl Builder {
    fn declare(&mut self, scope: &str, key: &NormalizedKey) {
        let declared = self.declared.entry(scope.to_string()).or_default();
        if !declared.iter().any(|existing| existing.id == key.id) {
            declared.push(key.clone());
        }
    }

    fn link(&mut self, record: &CallSiteRecord, scope: &str) {
        let file_id = file_node_id(&record.file);
        self.files
            .entry(file_id.clone())
            .or_insert_with(|| scope.to_string());

        let action_id = action_node_id(record);
        self.actions
            .entry(action_id.clone())
            .or_insert_with(|| (record.clone(), scope.to_string()));

        self.add_edge(&file_id, &action_id, record.relation, record.resolution);

        let targets = self.target_keys(record, scope);
        for key in targets {
            let key_id = key_node_id(scope, &key);
            let state = self.keys.entry(key_id.clone()).or_insert_with(|| KeyNodeState {
                key: key.clone(),
                scope: scope.to_string(),
                declares: 0,
                anchored: false,
                touching_files: BTreeSet::new(),
            });
            state.touching_files.insert(record.file.clone());
            if record.relation.is_declaration() {
                state.declares += 1;
            }
            if record.relation == Relation::Sets
                && record.resolution == Resolution::Static
                && !record.query_key.is_wildcard()
                && record.query_key.match_mode != MatchMode::Unknown
            {
                state.anchored = true;
            }
            self.add_edge(&action_id, &key_id, record.relation, record.resolution);
        }
    }

    /// Declared keys a record's key reaches within its own scope. Unmatched
    /// mutations fall back to their own key node, preserved as a dangling
    /// observation until pruning.
    fn target_keys(&self, record: &CallSiteRecord, scope: &str) -> Vec<NormalizedKey> {
        let key = &record.query_key;
        if record.relation.is_declaration() {
            return vec![key.clone()];
        }
        if key.match_mode == MatchMode::Unknown {
            return vec![key.clone()];
        }
        let declared = self.declared.get(scope).map(Vec::as_slice).unwrap_or(&[]);
        let matched: Vec<NormalizedKey> = if is_scope_wide(key) {
            declared.to_vec()
        } else {
            declared
                .iter()
                .filter(|candidate| key_matches(key, candidate))
                .cloned()
                .collect()
        };
        if matched.is_empty() && !is_scope_wide(key) {
            return vec![key.clone()];
        }
        matched
    }

    fn add_edge(&mut self, source: &str, target: &str, relation: Relation, resolution: Resolution) {
        let edge_key = (source.to_string(), target.to_string(), relation.as_str());
        self.edges
            .entry(edge_key)
            .and_modify(|edge| edge.resolution = edge.resolution.merge(resolution))
            .or_insert_with(|| GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                relation,
                resolution,
            });
    }

    fn finish(mut self, parse_errors: Vec<ParseError>) -> Graph {
        // Final pruning: a query-key node survives only when declared at
        // least once or concretely anchored by a static `sets` record.
        let pruned: BTreeSet<String> = self
            .keys
            .iter()
            .filter(|(_, state)| state.declares == 0 && !state.anchored)
            .map(|(id, _)| id.clone())
            .collect();
        self.keys.retain(|id, _| !pruned.contains(id));
        self.edges
            .retain(|_, edge| !pruned.contains(&edge.target) && !pruned.contains(&edge.source));

        let mut action_key_targets: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut file_key_targets: HashMap<String, BTreeSet<String>> = HashMap::new();
        for edge in self.edges.values() {
            if self.keys.contains_key(&edge.target) {
                action_key_targets
                    .entry(edge.source.clone())
                    .or_default()
                    .insert(edge.target.clone());
            }
        }
        for edge in self.edges.values() {
            if let Some(keys) = action_key_targets.get(&edge.target) {
                file_key_targets
                    .entry(edge.source.clone())
                    .or_default()
                    .extend(keys.iter().cloned());
            }
        }

        let mut declared_per_file: HashMap<String, usize> = HashMap::new();
        for (record, _) in self.actions.values() {
            if record.relation.is_declaration() {
                *declared_per_file
                    .entry(file_node_id(&record.file))
                    .or_default() += 1;
            }
        }

        let mut nodes = Vec::new();
        for (id, scope) in &self.files {
            let file = id.strip_prefix("file:").unwrap_or(id).to_string();
            nodes.push(GraphNode {
                id: id.clone(),
                kind: NodeKind::File,
                label: file.clone(),
                file: Some(file),
                project: Some(scope.clone()),
                relation: None,
                metrics: NodeMetrics {
                    affected_keys: file_key_targets.get(id).map_or(0, BTreeSet::len),
                    affected_files: 0,
                    declared_call_sites: declared_per_file.get(id).copied().unwrap_or(0),
                },
            });
        }
        for (id, (record, scope)) in &self.actions {
            nodes.push(GraphNode {
                id: id.clone(),
                kind: NodeKind::Action,
                label: record.operation.clone(),
                file: Some(record.file.clone()),
                project: Some(scope.clone()),
                relation: Some(record.relation),
                metrics: NodeMetrics {
                    affected_keys: action_key_targets.get(id).map_or(0, BTreeSet::len),
                    affected_files: 0,
                    declared_call_sites: 0,
                },
            });
        }
        for (id, state) in &self.keys {
            nodes.push(GraphNode {
                id: id.clone(),
                kind: NodeKind::QueryKey,
                label: state.key.display.clone(),
                file: None,
                project: Some(state.scope.clone()),
                relation: None,
                metrics: NodeMetrics {
                    affected_keys: 0,
                    affected_files: state.touching_files.len(),
                    declared_call_sites: state.declares,
                },
            });
        }

        let edges: Vec<GraphEdge> = self.edges.into_values().collect();
        let mut by_relation: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &edges {
            if self.keys.contains_key(&edge.target) {
                *by_relation.entry(edge.relation.as_str().to_string()).or_default() += 1;
            }
        }
        let summary = GraphSummary {
            files: self.files.len(),
            actions: self.actions.len(),
            query_keys: self.keys.len(),
            edges: edges.len(),
            by_relation,
        };
        Graph {
            nodes,
            edges,
            summary,
            parse_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KeySource, KeySegment};
    use std::collections::BTreeSet as Dirs;

    fn key(segments: &[(&str, Resolution)], mode: MatchMode) -> NormalizedKey {
        let segments = segments
            .iter()
            .map(|(text, resolution)| KeySegment {
                text: (*text).to_string(),
                resolution: *resolution,
            })
            .collect();
        NormalizedKey::from_segments(segments, mode, KeySource::Literal)
    }

    fn record(relation: Relation, file: &str, line: i64, key: NormalizedKey) -> CallSiteRecord {
        let resolution = key.resolution;
        CallSiteRecord {
            relation,
            operation: relation.as_str().to_string(),
            file: file.to_string(),
            line,
            column: 1,
            query_key: key,
            resolution,
            declares_directly: true,
        }
    }

    fn scopes(dirs: &[&str]) -> ProjectScopes {
        let set: Dirs<String> = dirs.iter().map(|d| d.to_string()).collect();
        ProjectScopes::new(&set)
    }

    #[test]
    fn declared_key_produces_a_surviving_node() {
        use Resolution::Static;
        let records = vec![record(
            Relation::Declares,
            "src/a.ts",
            1,
            key(&[("todos", Static)], MatchMode::Exact),
        )];
        let graph = assemble(&records, &scopes(&["."]), Vec::new());
        assert_eq!(graph.summary.query_keys, 1);
        let node = graph
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::QueryKey)
            .unwrap();
        assert_eq!(node.label, "[todos]");
        assert_eq!(node.metrics.declared_call_sites, 1);
        assert_eq!(node.metrics.affected_files, 1);
    }

    #[test]
    fn prefix_mutation_reaches_longer_declared_keys() {
        use Resolution::Static;
        let records = vec![
            record(
                Relation::Declares,
                "src/a.ts",
                1,
                key(&[("todos", Static), ("list", Static)], MatchMode::Exact),
            ),
            record(
                Relation::Invalidates,
                "src/b.ts",
                2,
                key(&[("todos", Static)], MatchMode::Prefix),
            ),
            record(
                Relation::Invalidates,
                "src/b.ts",
                3,
                key(&[("todos", Static), ("detail", Static)], MatchMode::Prefix),
            ),
        ];
        let graph = assemble(&records, &scopes(&["."]), Vec::new());
        let declared_id = key_node_id(".", &key(&[("todos", Static), ("list", Static)], MatchMode::Exact));
        let hits: Vec<&GraphEdge> = graph
            .edges
            .iter()
            .filter(|e| e.target == declared_id && e.relation == Relation::Invalidates)
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].source.contains(":2:"));
    }

    #[test]
    fn dynamic_segment_matches_any_suffix() {
        use Resolution::{Dynamic, Static};
        let records = vec![
            record(
                Relation::Declares,
                "src/a.ts",
                1,
                key(&[("todos", Static), ("list", Static)], MatchMode::Exact),
            ),
            record(
                Relation::Invalidates,
                "src/b.ts",
                2,
                key(&[("todos", Static), ("$id", Dynamic)], MatchMode::Prefix),
            ),
        ];
        let graph = assemble(&records, &scopes(&["."]), Vec::new());
        assert_eq!(graph.summary.by_relation.get("invalidates"), Some(&1));
    }

    #[test]
    fn wildcard_mutation_stays_inside_its_project_scope() {
        use Resolution::Static;
        let items_a = key(&[("items", Static)], MatchMode::Exact);
        let items_b = key(&[("items", Static)], MatchMode::Exact);
        let records = vec![
            record(Relation::Declares, "packages/a/src/x.ts", 1, items_a),
            record(Relation::Declares, "packages/b/src/y.ts", 1, items_b),
            record(
                Relation::Clears,
                "packages/a/src/z.ts",
                5,
                NormalizedKey::wildcard(MatchMode::All),
            ),
        ];
        let graph = assemble(&records, &scopes(&["packages/a", "packages/b"]), Vec::new());
        let clear_targets: Vec<&String> = graph
            .edges
            .iter()
            .filter(|e| e.relation == Relation::Clears && e.target.starts_with("querykey:"))
            .map(|e| &e.target)
            .collect();
        assert_eq!(clear_targets.len(), 1);
        assert!(clear_targets[0].starts_with("querykey:packages/a:"));
    }

    #[test]
    fn undeclared_passthrough_key_is_pruned() {
        use Resolution::Dynamic;
        let records = vec![record(
            Relation::Invalidates,
            "src/a.ts",
            1,
            key(&[("$queryKey", Dynamic)], MatchMode::Unknown),
        )];
        let graph = assemble(&records, &scopes(&["."]), Vec::new());
        assert_eq!(graph.summary.query_keys, 0);
        assert!(graph.nodes.iter().all(|n| n.kind != NodeKind::QueryKey));
    }

    #[test]
    fn concrete_set_anchors_a_dangling_key() {
        use Resolution::Static;
        let records = vec![record(
            Relation::Sets,
            "src/a.ts",
            1,
            key(&[("draft", Static)], MatchMode::Exact),
        )];
        let graph = assemble(&records, &scopes(&["."]), Vec::new());
        assert_eq!(graph.summary.query_keys, 1);
    }
}
