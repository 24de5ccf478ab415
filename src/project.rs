//! Monorepo-aware project scoping.
//!
//! A call site's project scope is the nearest ancestor directory holding a
//! package manifest, relative to the workspace root. Mutations never link to
//! declarations across scope boundaries.

use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct ProjectScopes {
    /// Manifest directories sorted deepest-first ("." sorts last).
    dirs: Vec<String>,
}

impl ProjectScopes {
    pub fn new(manifest_dirs: &BTreeSet<String>) -> Self {
        let mut dirs: Vec<String> = manifest_dirs.iter().cloned().collect();
        dirs.sort_by(|a, b| {
            let da = if a == "." { 0 } else { a.split('/').count() };
            let db = if b == "." { 0 } else { b.split('/').count() };
            db.cmp(&da).then(a.cmp(b))
        });
        Self { dirs }
    }

    /// Scope for a repo-relative file path.
    pub fn scope_for(&self, rel_path: &str) -> String {
        for dir in &self.dirs {
            if dir == "." {
                return ".".to_string();
            }
            if is_segment_prefix(dir, rel_path) {
                return dir.clone();
            }
        }
        // No manifest anywhere near the file: shallow path-segment heuristic.
        match rel_path.split_once('/') {
            Some((first, rest)) if rest.contains('/') => first.to_string(),
            _ => ".".to_string(),
        }
    }
}

fn is_segment_prefix(dir: &str, rel_path: &str) -> bool {
    match rel_path.strip_prefix(dir) {
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(dirs: &[&str]) -> ProjectScopes {
        let set: BTreeSet<String> = dirs.iter().map(|d| d.to_string()).collect();
        ProjectScopes::new(&set)
    }

    #[test]
    fn nearest_manifest_wins() {
        let scopes = scopes(&[".", "packages/web", "packages/web/admin"]);
        assert_eq!(scopes.scope_for("packages/web/admin/src/a.ts"), "packages/web/admin");
        assert_eq!(scopes.scope_for("packages/web/src/a.ts"), "packages/web");
        assert_eq!(scopes.scope_for("tools/x.ts"), ".");
    }

    #[test]
    fn segment_heuristic_without_manifests() {
        let scopes = scopes(&[]);
        assert_eq!(scopes.scope_for("apps/web/src/a.ts"), "apps");
        assert_eq!(scopes.scope_for("index.ts"), ".");
    }
}
