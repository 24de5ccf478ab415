//! End-to-end analysis pipeline: scan, parse, index, classify, assemble.
//!
//! Three strictly ordered phases. Parsing is independent per file; the
//! symbol index must be complete before any cross-file resolution starts;
//! classification runs against the finished read-only index.

use crate::aliases::AliasRegistry;
use crate::ast::Module;
use crate::classify;
use crate::graph;
use crate::model::{AnalysisResult, AnalyzeStats, CallSiteRecord, ParseError};
use crate::parse::ParserSet;
use crate::project::ProjectScopes;
use crate::resolve::Resolver;
use crate::scan::{self, ScanOptions};
use crate::symbols::SymbolIndex;
use crate::util;
use anyhow::Result;
use std::path::Path;
use std::time::Instant;

pub fn analyze_repo(repo_root: &Path, options: ScanOptions) -> Result<AnalysisResult> {
    let started = Instant::now();
    let scanned = scan::scan_repo_with_options(repo_root, options)?;

    let mut parsers = ParserSet::new()?;
    let mut parsed: Vec<(String, Module)> = Vec::with_capacity(scanned.files.len());
    let mut parse_errors: Vec<ParseError> = Vec::new();
    for file in &scanned.files {
        let source = match util::read_to_string(&file.abs_path) {
            Ok(value) => value,
            Err(err) => {
                parse_errors.push(ParseError {
                    file: file.rel_path.clone(),
                    message: err.to_string(),
                });
                continue;
            }
        };
        match parsers.parse(&file.language, &source) {
            Ok(module) => parsed.push((file.rel_path.clone(), module)),
            Err(err) => parse_errors.push(ParseError {
                file: file.rel_path.clone(),
                message: err.to_string(),
            }),
        }
    }

    let index = SymbolIndex::build(&parsed);
    let aliases = AliasRegistry::discover(repo_root, &scanned.tsconfig_files);
    let scopes = ProjectScopes::new(&scanned.manifest_dirs);

    let mut resolver = Resolver::new(&index, &aliases);
    let mut records: Vec<CallSiteRecord> = Vec::new();
    for (rel_path, module) in &parsed {
        records.extend(classify::classify_module(&mut resolver, rel_path, module));
    }

    let parse_error_count = parse_errors.len();
    let graph = graph::assemble(&records, &scopes, parse_errors);
    let stats = AnalyzeStats {
        scanned: scanned.files.len() + scanned.skipped.len(),
        parsed: parsed.len(),
        skipped: scanned.skipped.len(),
        parse_errors: parse_error_count,
        call_sites: records.len(),
        duration_ms: started.elapsed().as_millis() as u64,
    };
    Ok(AnalysisResult { graph, stats })
}
