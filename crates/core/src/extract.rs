//! Unpack an EPUB (or any zip) into a directory, the inverse of packing.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::FolderError;

pub fn extract_zip(input: &Path, outdir: &Path) -> Result<(), FolderError> {
    let data = fs::read(input).map_err(|_| FolderError::NotFound {
        path: input.display().to_string(),
    })?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        // Entries with traversal components are dropped, not an error.
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(name = entry.name(), "skipping unsafe zip entry name");
            continue;
        };
        let target = outdir.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        fs::write(&target, data)?;
    }
    Ok(())
}
