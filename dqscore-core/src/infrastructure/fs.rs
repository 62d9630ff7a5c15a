// dqscore-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

/// Writes a report atomically: `write` fills a temporary file created next to
/// `path`, which is then renamed over the target. Readers see either the
/// previous report or the complete new one.
pub fn atomic_write_with<P, F>(path: P, write: F) -> Result<(), InfrastructureError>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> Result<(), InfrastructureError>,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Same directory, so the rename never crosses filesystems
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    write(temp_file.as_file_mut())?;
    temp_file.as_file_mut().flush()?;

    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}
