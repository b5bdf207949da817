use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "junksweep", version, about = "Find and clear disposable build artifacts, caches and logs")]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the activity log to this CSV file on exit
    #[arg(long, global = true, value_name = "FILE")]
    pub activity_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the configured roots (or the given ones) and store the results
    Scan {
        /// Root directory to scan instead of the configured roots; repeatable
        #[arg(long = "root", value_name = "DIR")]
        roots: Vec<PathBuf>,

        /// Write a per-pattern CSV report
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Show the patterns from the last scan
    Show {
        /// Write a per-pattern CSV report
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Ask a question about the last scan
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Move every item of a pattern to the trash
    Clean {
        /// Pattern name or id
        pattern: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete the stored scan results
    Clear,
}
