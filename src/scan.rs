use anyhow::{Context, Result};
use blake3::Hasher;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub hash: String,
    pub size: i64,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct LanguageSpec {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { no_ignore: false }
    }
}

static LANGUAGE_SPECS: &[LanguageSpec] = &[
    LanguageSpec {
        name: "javascript",
        extensions: &["js", "jsx", "mjs", "cjs"],
    },
    LanguageSpec {
        name: "typescript",
        extensions: &["ts", "mts", "cts"],
    },
    LanguageSpec {
        name: "tsx",
        extensions: &["tsx"],
    },
];

/// Result of walking a repository: analyzable sources plus the config files
/// later phases need (package manifests for project scoping, tsconfig files
/// for path-alias resolution).
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<ScannedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Repo-relative directories containing a package.json ("." for root).
    pub manifest_dirs: BTreeSet<String>,
    /// Repo-relative paths of tsconfig.json / jsconfig.json files.
    pub tsconfig_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub rel_path: String,
    pub reason: String,
}

pub fn scan_repo_with_options(repo_root: &Path, options: ScanOptions) -> Result<ScanResult> {
    let max_size = Config::get().max_file_size_mb * 1024 * 1024;
    let mut result = ScanResult::default();
    let mut builder = WalkBuilder::new(repo_root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                eprintln!("querylens: walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let file_name = path.file_name().and_then(|name| name.to_str());
        if file_name == Some("package.json") {
            if let Ok(rel) = crate::util::normalize_rel_path(repo_root, path) {
                let dir = crate::util::parent_dir(&rel);
                let dir = if dir.is_empty() { "." } else { dir };
                result.manifest_dirs.insert(dir.to_string());
            }
            continue;
        }
        if file_name == Some("tsconfig.json") || file_name == Some("jsconfig.json") {
            if let Ok(rel) = crate::util::normalize_rel_path(repo_root, path) {
                result.tsconfig_files.push(rel);
            }
            continue;
        }
        let language = match detect_language(path) {
            Some(value) => value,
            None => continue,
        };
        let rel_path = crate::util::normalize_rel_path(repo_root, path)?;
        let metadata = fs::metadata(path)?;
        let size = metadata.len();
        if size > max_size {
            eprintln!(
                "querylens: Skipping large file ({}MB): {}",
                size / (1024 * 1024),
                rel_path
            );
            result.skipped.push(SkippedFile {
                rel_path,
                reason: format!("file exceeds {}MB size ceiling", Config::get().max_file_size_mb),
            });
            continue;
        }
        let hash = hash_file(path).with_context(|| format!("hash {}", path.display()))?;
        result.files.push(ScannedFile {
            rel_path,
            abs_path: path.to_path_buf(),
            hash,
            size: size as i64,
            language: language.to_string(),
        });
    }
    result.files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    result.tsconfig_files.sort();
    Ok(result)
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    match entry.file_name() {
        name if name == OsStr::new(".git") => true,
        name if name == OsStr::new("node_modules") => true,
        _ => false,
    }
}

fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|ext| ext.to_str())?;
    for spec in LANGUAGE_SPECS {
        if spec.extensions.iter().any(|candidate| *candidate == ext) {
            return Some(spec.name);
        }
    }
    None
}

pub fn language_for_path(path: &Path) -> Option<&'static str> {
    detect_language(path)
}

fn hash_file(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&data);
    Ok(hasher.finalize().to_hex().to_string())
}
