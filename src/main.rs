use anyhow::Result;
use clap::Parser;
use querylens::model::NodeKind;
use querylens::{analyze, cli, scan};
use serde_json::json;
use std::fs;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Analyze {
            repo,
            no_ignore,
            pretty,
            out,
        } => {
            let result = analyze::analyze_repo(&repo, scan::ScanOptions::new(no_ignore))?;
            let rendered = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            match out {
                Some(path) => fs::write(path, rendered)?,
                None => println!("{rendered}"),
            }
            Ok(())
        }
        cli::Command::Summary { repo, no_ignore } => {
            let result = analyze::analyze_repo(&repo, scan::ScanOptions::new(no_ignore))?;
            let summary = json!({
                "summary": result.graph.summary,
                "stats": result.stats,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        cli::Command::Keys { repo, no_ignore } => {
            let result = analyze::analyze_repo(&repo, scan::ScanOptions::new(no_ignore))?;
            let keys: Vec<_> = result
                .graph
                .nodes
                .iter()
                .filter(|node| node.kind == NodeKind::QueryKey)
                .map(|node| {
                    json!({
                        "key": node.label,
                        "project": node.project,
                        "declaredCallSites": node.metrics.declared_call_sites,
                        "affectedFiles": node.metrics.affected_files,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&keys)?);
            Ok(())
        }
    }
}
