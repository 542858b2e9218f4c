use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};

use rss_slicer::config::SliceConfig;
use rss_slicer::slicer::slice_feeds;
use rss_slicer::util::save_feed;
use rss_slicer::xml::Document;

/// SEC-014: Maximum size of an input feed file (32 MB).
const MAX_FEED_SIZE: u64 = 32 * 1_048_576;

#[derive(Parser, Debug)]
#[command(name = "rss-slicer", about = "Combine and filter RSS feeds")]
struct Args {
    /// Slice definition (TOML). Without one, feeds are concatenated with
    /// merged metadata.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the combined feed here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Input feed files, in merge order
    #[arg(value_name = "FEED", required = true)]
    inputs: Vec<PathBuf>,
}

fn read_feed(path: &Path) -> Result<Document> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Feed path must be a regular file: {}", path.display());
    }
    if metadata.len() > MAX_FEED_SIZE {
        anyhow::bail!(
            "Feed file '{}' is {} bytes (max {} bytes)",
            path.display(),
            metadata.len(),
            MAX_FEED_SIZE
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
    Document::parse_str(&content).with_context(|| format!("Failed to parse feed: {}", path.display()))
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the combined feed
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SliceConfig::load(path)
            .with_context(|| format!("Failed to load slice definition: {}", path.display()))?,
        None => SliceConfig::default(),
    };
    let definition = config
        .into_definition()
        .context("Invalid slice definition")?;

    let mut inputs = args
        .inputs
        .iter()
        .map(|path| read_feed(path))
        .collect::<Result<Vec<_>>>()?;

    let output = slice_feeds(&mut inputs, &definition).context("Failed to slice feeds")?;

    match &args.output {
        Some(path) => {
            save_feed(&output, path).with_context(|| format!("Failed to write output: {}", path.display()))?;
            tracing::info!(path = %path.display(), inputs = inputs.len(), "Wrote combined feed");
        }
        None => {
            let mut stdout = output
                .write_xml(std::io::stdout().lock())
                .context("Failed to serialize combined feed")?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
