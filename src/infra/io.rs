use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::warn;

const UTF8_BOM: char = '\u{feff}';

/// Drop a leading UTF-8 byte-order mark.
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix(UTF8_BOM).unwrap_or(s)
}

/// Read a UTF-8 text file, dropping a leading byte-order mark if present.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {}", path.display()))?;

    Ok(match content.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

/// Replace `path` with `bytes` atomically.
///
/// Writes go to a temp file in the destination directory, which is fsynced
/// and then renamed over the target, so readers see either the old or the
/// new content, never a partial write.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".postguard-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;

    tmp.write_all(bytes)
        .with_context(|| format!("write temp file for {}", path.display()))?;
    synced(tmp.as_file().sync_all(), "temp file", path);

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replace {}", path.display()))?;

    // Durably record the rename.
    synced(sync_dir(dir), "directory", dir);
    Ok(())
}

/// Log an fsync failure. The write itself already succeeded, so it is not
/// an error for the caller.
fn synced(result: std::io::Result<()>, what: &str, path: &Path) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not fsync {what} for {}: {e}", path.display());
            false
        }
    }
}

/// Cross-platform directory fsync helper.
#[cfg(unix)]
fn sync_dir(p: &Path) -> std::io::Result<()> {
    File::open(p)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_p: &Path) -> std::io::Result<()> {
    // No reliable directory fsync; best-effort no-op.
    Ok(())
}
