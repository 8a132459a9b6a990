// Atomic file replacement
//
// Bytes go to a temp file in the destination's directory, then the temp file
// is renamed over the destination. A failure at any step drops the temp file,
// so the destination is either the old content or the complete new content.
// A rename ignores the replaced file's permissions, so a read-only destination
// is refused up front.

use std::fs;
use std::io::Write;
use std::path::Path;

use boqsheet_engine::{BoqError, Result};

pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    match fs::metadata(dest) {
        Ok(meta) if meta.permissions().readonly() => {
            return Err(BoqError::write(dest, "destination is read-only"));
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(BoqError::write(dest, e)),
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(".boqsheet-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| BoqError::write(dest, format!("cannot create temp file: {e}")))?;

    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| BoqError::write(dest, format!("failed to write temp file: {e}")))?;

    tmp.persist(dest)
        .map_err(|e| BoqError::write(dest, format!("failed to move into place: {}", e.error)))?;

    Ok(())
}
