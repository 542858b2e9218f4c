//! Output helpers for the command-line entry point.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::xml::Document;

/// Temporary sibling of an output file. Deleted on drop unless it was moved
/// over the destination.
struct PendingFile {
    path: PathBuf,
    persisted: bool,
}

impl PendingFile {
    fn create(dst: &Path) -> Result<(Self, File)> {
        // SEC-009: Unpredictable name, created exclusively, so no pre-placed
        // file or symlink can be written through.
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let name = dst.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let path = dst.with_file_name(format!(".{name}.{}-{nanos:x}.partial", std::process::id()));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Cannot create {} next to the output feed", path.display()))?;
        Ok((Self { path, persisted: false }, file))
    }

    fn persist(mut self, dst: &Path) -> Result<()> {
        std::fs::rename(&self.path, dst)
            .with_context(|| format!("Cannot move finished feed into place at {}", dst.display()))?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Serializes `doc` to `dst`, replacing any existing file in one step.
///
/// The feed is streamed into a temporary file in the same directory, synced,
/// and renamed over `dst`. Readers of `dst` see either the old feed or the
/// complete new one.
pub fn save_feed(doc: &Document, dst: &Path) -> Result<()> {
    let (pending, file) = PendingFile::create(dst)?;

    let mut out = doc
        .write_xml(BufWriter::new(file))
        .context("Cannot serialize combined feed")?;
    out.write_all(b"\n").context("Cannot write combined feed")?;
    let file = out
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Cannot flush combined feed")?;
    file.sync_all().context("Cannot sync combined feed to disk")?;
    drop(file);

    pending.persist(dst)
}
