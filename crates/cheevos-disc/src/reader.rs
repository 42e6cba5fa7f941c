//! Executable byte readers
//!
//! The emulator records the boot executable as a disc path such as
//! `cdrom0:\SLUS_200.62;1`. A reader turns that path into bytes.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;

/// Disc read failures
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("File not found on disc: {0}")]
    NotFound(String),

    #[error("Invalid disc path: {0:?}")]
    InvalidPath(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Byte access to files on the active disc
pub trait ExecutableReader {
    /// Size of the file in bytes
    fn size(&self, path: &str) -> Result<u64, ReadError>;

    /// Read up to `len` bytes from the start of the file
    fn read(&self, path: &str, len: usize) -> Result<Vec<u8>, ReadError>;
}

/// Reads executables from an extracted disc folder on the host
#[derive(Debug, Clone)]
pub struct FolderReader {
    root: PathBuf,
}

impl FolderReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Map a disc path onto the host folder.
    ///
    /// The device prefix (`cdrom0:`) and version suffix (`;1`) are dropped and
    /// backslashes become path components. Parent references are rejected.
    pub fn host_path(&self, disc_path: &str) -> Result<PathBuf, ReadError> {
        let without_device = match disc_path.split_once(':') {
            Some((_, rest)) => rest,
            None => disc_path,
        };
        let without_version = match without_device.split_once(';') {
            Some((name, _)) => name,
            None => without_device,
        };

        let mut path = self.root.clone();
        let mut components = 0;
        for component in without_version.split(['\\', '/']) {
            match component {
                "" | "." => continue,
                ".." => return Err(ReadError::InvalidPath(disc_path.to_string())),
                name => {
                    path.push(name);
                    components += 1;
                }
            }
        }

        if components == 0 {
            return Err(ReadError::InvalidPath(disc_path.to_string()));
        }
        Ok(path)
    }

    fn open(&self, disc_path: &str) -> Result<File, ReadError> {
        let host = self.host_path(disc_path)?;
        File::open(&host).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ReadError::NotFound(disc_path.to_string())
            } else {
                ReadError::Io {
                    path: disc_path.to_string(),
                    source,
                }
            }
        })
    }
}

impl ExecutableReader for FolderReader {
    fn size(&self, path: &str) -> Result<u64, ReadError> {
        let file = self.open(path)?;
        let metadata = file.metadata().map_err(|source| ReadError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(metadata.len())
    }

    fn read(&self, path: &str, len: usize) -> Result<Vec<u8>, ReadError> {
        let file = self.open(path)?;
        let mut data = Vec::with_capacity(len);
        file.take(len as u64)
            .read_to_end(&mut data)
            .map_err(|source| ReadError::Io {
                path: path.to_string(),
                source,
            })?;

        tracing::trace!("Read {} bytes of {}", data.len(), path);
        Ok(data)
    }
}
