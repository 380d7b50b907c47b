//! Input folder abstraction: a conversion job reads its files through this
//! interface whether the input is a directory on disk or a zip archive.
//!
//! Paths are forward-slash relative names. Zip lookups are case-insensitive
//! so archives produced on case-insensitive filesystems keep working.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::FolderError;

pub enum InputFolder {
    Dir { root: PathBuf },
    Zip { archive: ZipArchive<Cursor<Vec<u8>>> },
}

impl InputFolder {
    /// Open a directory, or a zip archive when the path names a regular file.
    pub fn open_path(path: &Path) -> Result<Self, FolderError> {
        let meta = fs::metadata(path).map_err(|_| FolderError::NotFound {
            path: path.display().to_string(),
        })?;
        if meta.is_dir() {
            Ok(Self::Dir {
                root: path.to_path_buf(),
            })
        } else {
            Self::from_zip_bytes(fs::read(path)?)
        }
    }

    pub fn from_zip_bytes(data: Vec<u8>) -> Result<Self, FolderError> {
        let archive = ZipArchive::new(Cursor::new(data))?;
        Ok(Self::Zip { archive })
    }

    /// Read one file by relative name.
    pub fn open(&mut self, name: &str) -> Result<Vec<u8>, FolderError> {
        match self {
            Self::Dir { root } => {
                let full = root.join(name);
                fs::read(&full).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => FolderError::NotFound {
                        path: name.to_string(),
                    },
                    _ => FolderError::Io(e),
                })
            }
            Self::Zip { archive } => {
                let actual = archive
                    .file_names()
                    .find(|n| n.eq_ignore_ascii_case(name))
                    .map(str::to_string)
                    .ok_or_else(|| FolderError::NotFound {
                        path: name.to_string(),
                    })?;
                let mut entry = archive.by_name(&actual)?;
                let mut data = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut data)?;
                Ok(data)
            }
        }
    }

    /// All file names in the folder, relative with forward slashes.
    /// Directory entries are not listed.
    pub fn file_names(&mut self) -> Result<Vec<String>, FolderError> {
        match self {
            Self::Dir { root } => {
                let mut names = Vec::new();
                walk_dir(root, "", &mut names)?;
                Ok(names)
            }
            Self::Zip { archive } => Ok(archive
                .file_names()
                .filter(|n| !n.ends_with('/'))
                .map(str::to_string)
                .collect()),
        }
    }
}

fn walk_dir(dir: &Path, prefix: &str, names: &mut Vec<String>) -> Result<(), FolderError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if entry.file_type()?.is_dir() {
            walk_dir(&entry.path(), &relative, names)?;
        } else {
            names.push(relative);
        }
    }
    Ok(())
}
