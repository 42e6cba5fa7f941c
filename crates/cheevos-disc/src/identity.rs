//! Game identity hashing
//!
//! A game is identified by the MD5 of its boot executable's name (without
//! directory or version suffix) followed by the executable's leading bytes.

use crate::reader::ExecutableReader;
use cheevos_core::IdentityError;
use md5::{Digest, Md5};

/// At most this many executable bytes contribute to the hash (64 MiB)
pub const MAX_HASH_SIZE: u64 = 64 * 1024 * 1024;

/// Strip the directory and version suffix from a disc path.
///
/// `cdrom0:\SLUS_200.62;1` becomes `SLUS_200.62`.
pub fn name_for_hash(path: &str) -> Result<&str, IdentityError> {
    let name = match path.rfind(['\\', '/']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    };
    let name = match name.find(';') {
        Some(pos) => &name[..pos],
        None => name,
    };

    if name.is_empty() {
        return Err(IdentityError::InvalidName(path.to_string()));
    }
    Ok(name)
}

/// Lowercase hex MD5 over `name` followed by `data`
pub fn game_hash(name: &str, data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(name.as_bytes());
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash the executable at `path` on the disc behind `reader`
pub fn compute_game_hash(path: &str, reader: &dyn ExecutableReader) -> Result<String, IdentityError> {
    if path.is_empty() {
        return Err(IdentityError::NoExecutable);
    }
    let name = name_for_hash(path)?;

    let read_failed = |e: crate::reader::ReadError| IdentityError::ReadFailed {
        path: path.to_string(),
        message: e.to_string(),
    };

    let size = reader.size(path).map_err(read_failed)?;
    let wanted = size.min(MAX_HASH_SIZE) as usize;
    let data = reader.read(path, wanted).map_err(read_failed)?;
    if data.len() != wanted {
        return Err(IdentityError::ShortRead {
            path: path.to_string(),
            expected: wanted,
            actual: data.len(),
        });
    }

    let hash = game_hash(name, &data);
    tracing::debug!("Hashed {} ({} bytes): {}", name, wanted, hash);
    Ok(hash)
}

/// Outcome of resolving the running executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Same game as last time; nothing to do
    Unchanged,
    /// A different game (or no readable game). `hash` is empty when the
    /// executable could not be hashed.
    Changed { hash: String },
}

/// Remembers the last checksum/hash pair so identity is only recomputed
/// when the executable changes
#[derive(Debug, Default)]
pub struct IdentityResolver {
    last_checksum: Option<u32>,
    last_hash: Option<String>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    pub fn last_checksum(&self) -> Option<u32> {
        self.last_checksum
    }

    /// Forget the current game so the next resolve always reports a change
    pub fn clear(&mut self) {
        self.last_checksum = None;
        self.last_hash = None;
    }

    /// Resolve the executable at `path` whose CRC is `checksum`.
    ///
    /// An unchanged checksum short-circuits without touching the disc. A
    /// new checksum that hashes to the current hash also reports
    /// `Unchanged`.
    pub fn resolve(&mut self, checksum: u32, path: &str, reader: &dyn ExecutableReader) -> Resolution {
        if self.last_checksum == Some(checksum) {
            return Resolution::Unchanged;
        }

        let hash = match compute_game_hash(path, reader) {
            Ok(hash) => hash,
            Err(IdentityError::NoExecutable) => String::new(),
            Err(e) => {
                tracing::warn!("Failed to hash executable {:?}: {}", path, e);
                String::new()
            }
        };

        self.last_checksum = Some(checksum);
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            return Resolution::Unchanged;
        }

        self.last_hash = Some(hash.clone());
        Resolution::Changed { hash }
    }
}
