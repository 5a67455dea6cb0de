use anyhow::{Context, Result};
use clap::Parser;
use espack::{BuildOptions, OsFileSystem, build};
use std::path::PathBuf;

/// Bundle an ES-module graph into a single file.
#[derive(Parser, Debug)]
#[command(name = "espack", version)]
struct Args {
    /// Entry module
    input: PathBuf,

    /// Bundle destination; the source map lands next to it
    #[arg(short, long, default_value = "bundle.js")]
    output: PathBuf,
}

fn main() -> Result<()> {
    // Tracing only when ESPACK_LOG or RUST_LOG is set.
    init_tracing();

    let args = Args::parse();
    let fs = OsFileSystem;
    let bundle = build(
        BuildOptions {
            input: args.input.clone(),
            output: args.output.clone(),
        },
        &fs,
    )
    .with_context(|| format!("failed to bundle {}", args.input.display()))?;
    bundle
        .write(&fs)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    Ok(())
}

/// Initialise the tracing subscriber from `ESPACK_LOG` (preferred) or
/// `RUST_LOG`. Does nothing when neither is set, keeping startup cost at
/// zero. All output goes to stderr.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let espack_log = std::env::var("ESPACK_LOG").ok();
    if espack_log.is_none() && std::env::var("RUST_LOG").is_err() {
        return;
    }
    let filter = match espack_log {
        Some(value) => EnvFilter::builder().parse_lossy(value),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
