//! Junksweep — finds disposable artifacts and rates how safe they are to delete.
//!
//! Thin binary entry point. All logic lives in the `junksweep-core` crate.

mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Commands};
use junksweep_core::analysis::AiCapability;
use junksweep_core::model::{format_count, format_size, Pattern};
use junksweep_core::scanner::progress::ScanProgress;
use junksweep_core::{CleanupSession, Config};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    let mut session = CleanupSession::from_config(config, AiCapability::resolve(None));

    let result = run(&mut session, cli.command);

    if let Some(path) = &cli.activity_log {
        let file = File::create(path)
            .with_context(|| format!("creating activity log {}", path.display()))?;
        session
            .log()
            .export_csv(file)
            .with_context(|| format!("writing activity log {}", path.display()))?;
    }
    result
}

fn run(session: &mut CleanupSession, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Scan { roots, report } => {
            let scan = session.start_scan(&roots)?;
            for msg in scan.progress().iter() {
                match msg {
                    ScanProgress::RootStarted { index, total, root } => {
                        eprintln!("[{}/{}] {}", index + 1, total, root.display());
                    }
                    ScanProgress::RootSkipped { reason, .. } => eprintln!("  skipped: {reason}"),
                    ScanProgress::RootFinished { found, .. } => {
                        eprintln!("  {} entries", format_count(found as u64));
                    }
                    ScanProgress::Batch { .. } => {}
                    ScanProgress::Complete { .. } | ScanProgress::Cancelled { .. } => break,
                }
            }
            let outcome = session.finish_scan(scan);
            println!(
                "Found {} entries in {} patterns in {:.1}s",
                format_count(outcome.entries as u64),
                outcome.patterns,
                outcome.duration.as_secs_f64()
            );
            print_patterns(session.patterns());
            write_report(session, report.as_deref())?;
        }
        Commands::Show { report } => {
            if !session.restore() {
                bail!("no stored scan results; run `junksweep scan` first");
            }
            if let Some(age) = session.snapshot_age() {
                println!("Last scan: {age}");
            }
            print_patterns(session.patterns());
            write_report(session, report.as_deref())?;
        }
        Commands::Ask { question } => {
            session.restore();
            println!("{}", session.ask(&question.join(" ")).text);
        }
        Commands::Clean { pattern, yes } => {
            if !session.restore() {
                bail!("no stored scan results; run `junksweep scan` first");
            }
            let Some(target) = session
                .patterns()
                .iter()
                .find(|p| p.id() == pattern || p.name() == pattern)
            else {
                bail!("no pattern named '{pattern}'");
            };
            let prompt = format!(
                "Move {} items ({}) in '{}' to the {}?",
                format_count(target.item_count() as u64),
                format_size(target.total_size()),
                target.name(),
                session.executor_name()
            );
            if !yes && !confirm(&prompt)? {
                return Ok(());
            }
            if let Some(report) = session.remove_pattern(&pattern) {
                println!(
                    "Moved {} items to trash, {} failed",
                    report.success_count, report.fail_count
                );
                for (path, reason) in &report.failed {
                    println!("  {path}: {reason}");
                }
            }
        }
        Commands::Clear => {
            session.clear_cache()?;
            println!("Stored scan results cleared");
        }
    }
    Ok(())
}

fn print_patterns(patterns: &[Pattern]) {
    if patterns.is_empty() {
        println!("Nothing found.");
        return;
    }
    for p in patterns {
        println!(
            "{:>10}  {:<6}  {:>7}  {}",
            format_size(p.total_size()),
            p.safety().label(),
            format_count(p.item_count() as u64),
            p.name()
        );
    }
    let total: u64 = patterns.iter().map(Pattern::total_size).sum();
    println!("{:>10}  total", format_size(total));
}

fn write_report(session: &CleanupSession, path: Option<&Path>) -> anyhow::Result<()> {
    let (Some(path), Some(snapshot)) = (path, session.snapshot()) else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    snapshot
        .write_patterns_csv(file)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Report written to {}", path.display());
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt} (y/N): ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim(), "y" | "Y" | "yes"))
}
