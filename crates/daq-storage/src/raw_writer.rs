//! Raw readout export.
//!
//! Writes readout bytes exactly as the camera delivered them: no header,
//! no conversion. Pixel layout is described by the camera's pixel format.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the first `byte_length` bytes of `data` to `path`.
///
/// The file is created or truncated.
///
/// # Errors
///
/// Returns an error if `byte_length` exceeds the buffer, or if the file
/// cannot be created or written.
pub fn write_raw<P: AsRef<Path>>(data: &[u8], byte_length: usize, path: P) -> Result<()> {
    let path = path.as_ref();
    let bytes = data.get(..byte_length).ok_or_else(|| {
        anyhow!(
            "Readout length mismatch: requested {} bytes, buffer holds {}",
            byte_length,
            data.len()
        )
    })?;

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .with_context(|| format!("Failed to write readout to {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;

    tracing::debug!(path = ?path, bytes = byte_length, "Wrote raw readout");
    Ok(())
}
