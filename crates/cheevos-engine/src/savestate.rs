//! Save-state codec
//!
//! The runtime's progress blob is stored in the emulator's save state as a
//! tagged section:
//!
//! ```text
//! "CHVS" | version: u32 LE | length: u32 LE | payload[length]
//! ```
//!
//! A missing or invalid section loads like an empty blob.

use crate::engine::Engine;
use thiserror::Error;

pub const SECTION_MAGIC: [u8; 4] = *b"CHVS";
pub const SECTION_VERSION: u32 = 1;
pub const SECTION_HEADER_SIZE: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    #[error("Section header truncated ({0} bytes)")]
    Truncated(usize),

    #[error("Bad section magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("Unsupported section version {0}")]
    UnsupportedVersion(u32),

    #[error("Section claims {declared} bytes but only {available} remain")]
    LengthOverflow { declared: u32, available: usize },

    #[error("Payload of {0} bytes is too large for a section")]
    TooLarge(usize),
}

/// Frame `payload` as a save-state section
pub fn write_section(payload: &[u8]) -> Result<Vec<u8>, SectionError> {
    let length = u32::try_from(payload.len()).map_err(|_| SectionError::TooLarge(payload.len()))?;

    let mut section = Vec::with_capacity(SECTION_HEADER_SIZE + payload.len());
    section.extend_from_slice(&SECTION_MAGIC);
    section.extend_from_slice(&SECTION_VERSION.to_le_bytes());
    section.extend_from_slice(&length.to_le_bytes());
    section.extend_from_slice(payload);
    Ok(section)
}

/// Split a section into its payload and the bytes following it
pub fn read_section(data: &[u8]) -> Result<(&[u8], &[u8]), SectionError> {
    if data.len() < SECTION_HEADER_SIZE {
        return Err(SectionError::Truncated(data.len()));
    }

    let (header, rest) = data.split_at(SECTION_HEADER_SIZE);
    let magic = [header[0], header[1], header[2], header[3]];
    if magic != SECTION_MAGIC {
        return Err(SectionError::BadMagic(magic));
    }

    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != SECTION_VERSION {
        return Err(SectionError::UnsupportedVersion(version));
    }

    let declared = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    if declared as usize > rest.len() {
        return Err(SectionError::LengthOverflow {
            declared,
            available: rest.len(),
        });
    }

    Ok(rest.split_at(declared as usize))
}

impl Engine {
    /// Runtime progress, or an empty vector if there is none or it could
    /// not be serialized
    pub fn save_state(&self) -> Vec<u8> {
        if !self.active {
            return Vec::new();
        }

        let size = match self.runtime.progress_size() {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!("{}", e);
                return Vec::new();
            }
        };

        let mut buffer = vec![0u8; size];
        if let Err(e) = self.runtime.serialize_progress(&mut buffer) {
            tracing::warn!("{}", e);
            return Vec::new();
        }
        buffer
    }

    /// Restore runtime progress. Empty or rejected data resets the runtime.
    ///
    /// Ignored while the engine is inactive.
    pub fn load_state(&mut self, data: &[u8]) {
        if !self.active {
            return;
        }

        if data.is_empty() {
            // Saved without achievements, or by an older version
            tracing::warn!("State is missing cheevos data, resetting runtime");
            self.runtime.reset();
            return;
        }

        if let Err(e) = self.runtime.deserialize_progress(data) {
            tracing::warn!("{}, resetting", e);
            self.runtime.reset();
        }
    }

    /// `save_state` framed as a save-state section
    pub fn save_state_section(&self) -> Vec<u8> {
        match write_section(&self.save_state()) {
            Ok(section) => section,
            Err(e) => {
                tracing::warn!("{}", e);
                write_section(&[]).unwrap_or_default()
            }
        }
    }

    /// Restore from a save-state section; invalid sections reset the runtime
    pub fn load_state_section(&mut self, data: &[u8]) {
        match read_section(data) {
            Ok((payload, _)) => self.load_state(payload),
            Err(e) => {
                tracing::warn!("Ignoring cheevos section: {}", e);
                self.load_state(&[]);
            }
        }
    }
}
