//! Persisted cell profile
//!
//! The active [`CellConfig`] is stored as postcard bytes behind a small
//! header (magic, version) and a CRC32 over the encoded cell.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{CellConfig, ConfigError};
use crate::traits::{Storage, StorageError, StorageKey};

/// Magic number to identify a valid profile
pub const PROFILE_MAGIC: u32 = 0x504C_5452; // "PLTR"

/// Current profile format version
pub const PROFILE_VERSION: u8 = 1;

/// Profile persistence errors
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("profile encoding failed: {0}")]
    Encoding(#[from] postcard::Error),
    /// Invalid magic or version
    #[error("profile has an unknown magic or version")]
    InvalidFormat,
    #[error("profile CRC mismatch")]
    CrcMismatch,
    /// Stored profile decodes but fails validation
    #[error("stored profile is invalid: {0}")]
    Invalid(#[from] ConfigError),
}

/// Complete profile record as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    pub cell: CellConfig,
    /// CRC32 of the postcard encoding of `cell`
    pub crc: u32,
}

impl StoredProfile {
    /// Wrap a cell configuration, computing its CRC
    pub fn new(cell: CellConfig) -> Result<Self, ProfileError> {
        let crc = Self::calculate_crc(&cell)?;
        Ok(Self {
            magic: PROFILE_MAGIC,
            version: PROFILE_VERSION,
            cell,
            crc,
        })
    }

    /// Check if the header is valid (magic and version match)
    pub fn is_valid(&self) -> bool {
        self.magic == PROFILE_MAGIC && self.version == PROFILE_VERSION
    }

    /// CRC32 over the postcard encoding of a cell configuration
    pub fn calculate_crc(cell: &CellConfig) -> Result<u32, ProfileError> {
        let bytes = postcard::to_allocvec(cell)?;
        Ok(!crc32_update(0xFFFF_FFFF, &bytes))
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        Self::calculate_crc(&self.cell).is_ok_and(|crc| crc == self.crc)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ProfileError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Decode and check header, CRC and configuration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProfileError> {
        let profile: StoredProfile = postcard::from_bytes(bytes)?;
        if !profile.is_valid() {
            return Err(ProfileError::InvalidFormat);
        }
        if !profile.verify_crc() {
            return Err(ProfileError::CrcMismatch);
        }
        profile.cell.validate()?;
        Ok(profile)
    }
}

/// Load the active profile from storage
pub fn load_profile<S: Storage>(storage: &mut S) -> Result<CellConfig, ProfileError> {
    let bytes = storage.read(StorageKey::ActiveProfile)?;
    Ok(StoredProfile::from_bytes(&bytes)?.cell)
}

/// Overwrite the active profile in storage
pub fn save_profile<S: Storage>(storage: &mut S, cell: &CellConfig) -> Result<(), ProfileError> {
    let bytes = StoredProfile::new(cell.clone())?.to_bytes()?;
    storage.write(StorageKey::ActiveProfile, &bytes)?;
    Ok(())
}

/// CRC32 update (IEEE 802.3 polynomial, reflected)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
