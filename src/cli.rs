use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "querylens",
    version,
    about = "Static analyzer for cache/query key usage",
    after_help = r#"Examples:
  querylens analyze --repo .
  querylens analyze --repo . --pretty --out graph.json
  querylens summary --repo .
  querylens keys --repo ./apps/web
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze a repository and print the usage graph as JSON.
    Analyze {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
        /// Write the graph to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Analyze and print only the summary counts and stats.
    Summary {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Analyze and list declared query keys with their backing files.
    Keys {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
}
