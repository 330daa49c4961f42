//! Partial download file management
//!
//! This module provides RAII-based handling of in-progress downloads with
//! automatic cleanup.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Guard for a file that is still being written
///
/// The partial file lives next to its final destination so that it can be
/// moved into place with a rename. Unless [`PartialFile::persist`] is called,
/// the file is deleted when the guard is dropped.
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    destination: PathBuf,
    persisted: bool,
}

impl PartialFile {
    /// Creates an empty partial file for the given destination
    ///
    /// The name is `.{file_name}.{ulid}.part` in the destination's directory,
    /// using a ULID so that concurrent runs never share a partial file.
    pub fn create(destination: &Path) -> io::Result<(Self, File)> {
        let file_name = destination
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("destination has no file name: {}", destination.display()),
                )
            })?;

        let ulid = ulid::Ulid::new();
        let path = destination.with_file_name(format!(".{}.{}.part", file_name, ulid));
        let file = File::create(&path)?;

        Ok((
            Self {
                path,
                destination: destination.to_path_buf(),
                persisted: false,
            },
            file,
        ))
    }

    /// Get the path of the partial file
    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the partial file onto its destination
    pub fn persist(mut self) -> io::Result<()> {
        fs::rename(&self.path, &self.destination)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.persisted {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(&self.path);
        }
    }
}
