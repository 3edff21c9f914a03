//! Command-line host for the zipload library.
//!
//! Loads an archive into memory and either lists the retained files or
//! writes their contents to stdout.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use tracing_subscriber::{EnvFilter, fmt};

use zipload::{ArchiveFile, Cli, load_archive};

fn main() {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = run(&cli) {
        tracing::debug!("Loading failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let files = load_archive(&cli.file)?;

    let mut stdout = std::io::stdout().lock();
    if cli.pipe {
        for file in &files {
            stdout.write_all(&file.content)?;
        }
        stdout.flush()?;
        return Ok(());
    }

    list_files(&mut stdout, &files)?;
    if !cli.is_quiet() {
        let total: usize = files.iter().map(|f| f.content.len()).sum();
        writeln!(stdout, "{}", "-".repeat(40))?;
        writeln!(stdout, "{:>10}  {} files", total, files.len())?;
    }
    Ok(())
}

fn list_files(out: &mut impl Write, files: &[ArchiveFile]) -> Result<()> {
    for file in files {
        writeln!(out, "{:>10}  {}", file.content.len(), file.relative_path)?;
    }
    Ok(())
}
