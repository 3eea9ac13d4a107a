//! AFP Combine CLI tool
//!
//! A command-line tool for combining multiple AFP print files into one.

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::glob;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

use afp_combine::combine::{combine_files, CombineOptions, DigestAlgorithm};

/// Environment variable overriding the default content hash algorithm
const DIGEST_ENV: &str = "AFP_COMBINE_DIGEST";

/// AFP Combine - Merge AFP print files, sharing identical resources
#[derive(Parser)]
#[command(name = "afp-combine")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Combine two statements
    afp-combine -o combined.afp january.afp february.afp

    # Combine everything in a directory, in name order
    afp-combine -o combined.afp \"statements/*.afp\"

    # Decide resource equality with SHA-256 instead of MD5
    afp-combine -o combined.afp --digest sha256 a.afp b.afp")]
struct Cli {
    /// Input AFP files (in order). Supports glob patterns like "*.afp"
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output AFP file path
    #[arg(short, long)]
    output: PathBuf,

    /// Content hash for resource equality: md5 (default) or sha256
    #[arg(long)]
    digest: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let inputs = expand_globs(cli.inputs)?;
    let digest = resolve_digest(cli.digest.as_deref())?;

    info!(
        "combining {} AFP files into {}",
        inputs.len(),
        cli.output.display()
    );

    let options = CombineOptions {
        input_paths: inputs,
        output_path: cli.output.clone(),
        digest,
    };

    combine_files(&options)
        .with_context(|| format!("combining into {}", cli.output.display()))?;

    info!("done, wrote {}", cli.output.display());
    Ok(())
}

/// The --digest flag wins over the environment variable; both absent means
/// MD5
fn resolve_digest(flag: Option<&str>) -> Result<DigestAlgorithm> {
    let spelled = match flag {
        Some(s) => Some(s.to_string()),
        None => std::env::var(DIGEST_ENV).ok(),
    };
    match spelled {
        Some(s) => Ok(s.parse()?),
        None => Ok(DigestAlgorithm::default()),
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("bad pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // sort within the pattern only; the argument order decides the
            // document order of the output
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}
