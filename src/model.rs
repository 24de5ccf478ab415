use serde::Serialize;
use std::collections::BTreeMap;

/// Certainty that a value's full shape was statically determined.
///
/// Forms a two-point lattice: merging anything with `Dynamic` yields
/// `Dynamic`; `Static` is the identity.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Static,
    Dynamic,
}

impl Resolution {
    pub fn merge(self, other: Resolution) -> Resolution {
        match (self, other) {
            (Resolution::Static, Resolution::Static) => Resolution::Static,
            _ => Resolution::Dynamic,
        }
    }
}

/// Comparison policy used to decide which declared keys a mutation affects.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Prefix,
    All,
    Predicate,
    Unknown,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Literal,
    Expression,
    Wildcard,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct KeySegment {
    pub text: String,
    pub resolution: Resolution,
}

impl KeySegment {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            resolution: Resolution::Static,
        }
    }

    pub fn dynamic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            resolution: Resolution::Dynamic,
        }
    }
}

/// Canonical representation of a cache key.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NormalizedKey {
    pub id: String,
    pub display: String,
    pub segments: Vec<KeySegment>,
    pub match_mode: MatchMode,
    pub resolution: Resolution,
    pub source: KeySource,
}

impl NormalizedKey {
    /// Build a key from segments. `id` and `display` are pure functions of
    /// the segment list, so identical segments always produce identical ids.
    pub fn from_segments(
        segments: Vec<KeySegment>,
        match_mode: MatchMode,
        source: KeySource,
    ) -> Self {
        let resolution = segments
            .iter()
            .fold(Resolution::Static, |acc, seg| acc.merge(seg.resolution));
        let id = key_id(&segments);
        let display = key_display(&segments);
        Self {
            id,
            display,
            segments,
            match_mode,
            resolution,
            source,
        }
    }

    /// Wildcard key for mutations carrying no key constraint at all.
    pub fn wildcard(match_mode: MatchMode) -> Self {
        Self {
            id: "key:*".to_string(),
            display: "[*]".to_string(),
            segments: Vec::new(),
            match_mode,
            resolution: Resolution::Static,
            source: KeySource::Wildcard,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.source == KeySource::Wildcard
    }
}

fn key_id(segments: &[KeySegment]) -> String {
    let mut out = String::from("key:");
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push('\u{1f}');
        }
        out.push_str(&seg.text);
    }
    out
}

fn key_display(segments: &[KeySegment]) -> String {
    let mut out = String::from("[");
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&seg.text);
    }
    out.push(']');
    out
}

/// How a call site relates to a cache key.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Declares,
    Invalidates,
    Refetches,
    Cancels,
    Resets,
    Clears,
    Removes,
    Sets,
}

impl Relation {
    pub fn is_declaration(self) -> bool {
        matches!(self, Relation::Declares)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Declares => "declares",
            Relation::Invalidates => "invalidates",
            Relation::Refetches => "refetches",
            Relation::Cancels => "cancels",
            Relation::Resets => "resets",
            Relation::Clears => "clears",
            Relation::Removes => "removes",
            Relation::Sets => "sets",
        }
    }
}

/// One recognized call site. Created once during classification, immutable
/// afterward, consumed exactly once by the graph assembler.
#[derive(Debug, Serialize, Clone)]
pub struct CallSiteRecord {
    pub relation: Relation,
    pub operation: String,
    pub file: String,
    pub line: i64,
    pub column: i64,
    pub query_key: NormalizedKey,
    pub resolution: Resolution,
    pub declares_directly: bool,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Action,
    QueryKey,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct NodeMetrics {
    pub affected_keys: usize,
    pub affected_files: usize,
    pub declared_call_sites: usize,
}

#[derive(Debug, Serialize, Clone)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    pub metrics: NodeMetrics,
}

#[derive(Debug, Serialize, Clone)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: Relation,
    pub resolution: Resolution,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct GraphSummary {
    pub files: usize,
    pub actions: usize,
    pub query_keys: usize,
    pub edges: usize,
    pub by_relation: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ParseError {
    pub file: String,
    pub message: String,
}

/// Final analysis output.
#[derive(Debug, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub summary: GraphSummary,
    pub parse_errors: Vec<ParseError>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeStats {
    pub scanned: usize,
    pub parsed: usize,
    pub skipped: usize,
    pub parse_errors: usize,
    pub call_sites: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub graph: Graph,
    pub stats: AnalyzeStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_monotone_commutative_idempotent() {
        use Resolution::*;
        assert_eq!(Static.merge(Static), Static);
        assert_eq!(Static.merge(Dynamic), Dynamic);
        assert_eq!(Dynamic.merge(Static), Dynamic);
        assert_eq!(Dynamic.merge(Dynamic), Dynamic);
    }

    #[test]
    fn key_id_is_pure_function_of_segments() {
        let segs = vec![KeySegment::fixed("todos"), KeySegment::dynamic("$id")];
        let a = NormalizedKey::from_segments(segs.clone(), MatchMode::Exact, KeySource::Literal);
        let b = NormalizedKey::from_segments(segs, MatchMode::Prefix, KeySource::Expression);
        assert_eq!(a.id, b.id);
        assert_eq!(a.display, "[todos, $id]");
        assert_eq!(a.resolution, Resolution::Dynamic);
    }
}
