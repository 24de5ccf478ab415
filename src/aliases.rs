//! Path-alias configuration discovered from tsconfig.json / jsconfig.json.
//!
//! Bare import specifiers (`@app/keys`) are mapped to repo-relative module
//! paths via `compilerOptions.paths`. The most specific pattern wins; ties
//! are broken by the config file's proximity to the referencing file.

use crate::util;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct AliasPattern {
    /// Pattern as written, e.g. `@app/*` or `lib`.
    pub pattern: String,
    /// Repo-relative target templates with the wildcard intact.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AliasConfig {
    /// Repo-relative directory of the config file ("." for root).
    pub config_dir: String,
    pub patterns: Vec<AliasPattern>,
}

#[derive(Debug, Default)]
pub struct AliasRegistry {
    configs: Vec<AliasConfig>,
}

impl AliasRegistry {
    pub fn discover(repo_root: &Path, tsconfig_files: &[String]) -> Self {
        let mut configs = Vec::new();
        for rel in tsconfig_files {
            let abs = repo_root.join(rel);
            let content = match std::fs::read_to_string(&abs) {
                Ok(value) => value,
                Err(err) => {
                    eprintln!("querylens: read error {rel}: {err}");
                    continue;
                }
            };
            let dir = util::parent_dir(rel);
            let dir = if dir.is_empty() { "." } else { dir };
            match parse_config(dir, &content) {
                Some(config) if !config.patterns.is_empty() => configs.push(config),
                Some(_) => {}
                None => eprintln!("querylens: unreadable tsconfig {rel}"),
            }
        }
        Self { configs }
    }

    pub fn from_configs(configs: Vec<AliasConfig>) -> Self {
        Self { configs }
    }

    /// Candidate repo-relative module paths for a bare specifier, best
    /// pattern first. Empty when no pattern matches.
    pub fn resolve(&self, from_file: &str, specifier: &str) -> Vec<String> {
        let mut matches: Vec<(usize, usize, usize, &AliasPattern, &AliasConfig)> = Vec::new();
        for config in &self.configs {
            for pattern in &config.patterns {
                let Some(specificity) = pattern_specificity(&pattern.pattern, specifier) else {
                    continue;
                };
                let proximity = if config.config_dir == "." {
                    0
                } else {
                    util::shared_prefix_len(&config.config_dir, from_file)
                };
                let depth = if config.config_dir == "." {
                    0
                } else {
                    config.config_dir.split('/').count()
                };
                matches.push((specificity, proximity, depth, pattern, config));
            }
        }
        // Longest/most-specific pattern first; proximity and nearest-ancestor
        // depth break ties.
        matches.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(b.2.cmp(&a.2)));
        let Some((_, _, _, pattern, config)) = matches.first() else {
            return Vec::new();
        };
        expand_pattern(pattern, config, specifier)
    }
}

/// Length of the literal (non-wildcard) portion when the pattern matches,
/// None otherwise. An exact pattern outranks any wildcard of the same length.
fn pattern_specificity(pattern: &str, specifier: &str) -> Option<usize> {
    match pattern.split_once('*') {
        None => (pattern == specifier).then_some(pattern.len() * 2 + 1),
        Some((prefix, suffix)) => {
            if specifier.len() >= prefix.len() + suffix.len()
                && specifier.starts_with(prefix)
                && specifier.ends_with(suffix)
            {
                Some((prefix.len() + suffix.len()) * 2)
            } else {
                None
            }
        }
    }
}

fn expand_pattern(pattern: &AliasPattern, config: &AliasConfig, specifier: &str) -> Vec<String> {
    let captured = match pattern.pattern.split_once('*') {
        None => String::new(),
        Some((prefix, suffix)) => {
            specifier[prefix.len()..specifier.len() - suffix.len()].to_string()
        }
    };
    let mut out = Vec::new();
    for target in &pattern.targets {
        let filled = match target.split_once('*') {
            None => target.clone(),
            Some((prefix, suffix)) => format!("{prefix}{captured}{suffix}"),
        };
        if let Some(joined) = util::join_rel(&config.config_dir, &filled) {
            out.push(joined);
        } else if config.config_dir == "." {
            out.push(filled);
        }
    }
    out
}

fn parse_config(config_dir: &str, content: &str) -> Option<AliasConfig> {
    let cleaned = strip_jsonc(content);
    let value: Value = serde_json::from_str(&cleaned).ok()?;
    let options = value.get("compilerOptions")?;
    let base_url = options
        .get("baseUrl")
        .and_then(|v| v.as_str())
        .unwrap_or(".");
    let mut patterns = Vec::new();
    if let Some(paths) = options.get("paths").and_then(|v| v.as_object()) {
        for (pattern, targets) in paths {
            let Some(list) = targets.as_array() else {
                continue;
            };
            let targets: Vec<String> = list
                .iter()
                .filter_map(|t| t.as_str())
                .filter_map(|t| join_base(base_url, t))
                .collect();
            if !targets.is_empty() {
                patterns.push(AliasPattern {
                    pattern: pattern.clone(),
                    targets,
                });
            }
        }
    }
    Some(AliasConfig {
        config_dir: config_dir.to_string(),
        patterns,
    })
}

fn join_base(base_url: &str, target: &str) -> Option<String> {
    let base = base_url.trim_start_matches("./");
    if base.is_empty() || base == "." {
        return Some(target.trim_start_matches("./").to_string());
    }
    Some(format!("{base}/{}", target.trim_start_matches("./")))
}

/// Strip // and /* */ comments plus trailing commas so lenient tsconfig
/// documents parse as JSON. String contents are preserved. Comments are
/// removed first so the trailing-comma lookahead only ever skips
/// whitespace before the closing brace.
fn strip_jsonc(content: &str) -> String {
    strip_trailing_commas(&strip_comments(content))
}

fn strip_comments(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let ch = bytes[i] as char;
        if in_string {
            out.push(ch);
            if ch == '\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
                i += 1;
            }
            '/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }
    out
}

fn strip_trailing_commas(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        let ch = bytes[i] as char;
        if in_string {
            out.push(ch);
            if ch == '\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
                i += 1;
            }
            ',' => {
                // Drop the comma when the next meaningful byte closes a scope.
                let mut j = i + 1;
                while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b']') {
                    i += 1;
                } else {
                    out.push(ch);
                    i += 1;
                }
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }
    out
}
