//! Persistent storage abstraction
//!
//! Key-value storage for the active cell profile. Implementations decide
//! where the bytes live (files on the host, flash on a controller board).

use thiserror::Error;

/// Storage keys for persisted data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StorageKey {
    /// Active cell profile (binary postcard format)
    ActiveProfile = 0,
    /// Active cell profile as TOML text
    ProfileToml = 1,
}

impl StorageKey {
    /// All keys, in numeric order
    pub const ALL: [StorageKey; 2] = [StorageKey::ActiveProfile, StorageKey::ProfileToml];

    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Stable name used for file-backed storage
    pub fn name(self) -> &'static str {
        match self {
            StorageKey::ActiveProfile => "active_profile.bin",
            StorageKey::ProfileToml => "active_profile.toml",
        }
    }
}

/// Errors from storage operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Key not found
    #[error("key not found")]
    NotFound,
    /// Underlying medium failed
    #[error("storage i/o failed: {0}")]
    Io(String),
    /// Data corrupted or invalid
    #[error("stored data is corrupted")]
    Corrupted,
}

/// Key-value storage trait
pub trait Storage {
    /// Read the value stored under `key`
    fn read(&mut self, key: StorageKey) -> Result<Vec<u8>, StorageError>;

    /// Replace the value stored under `key`
    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError>;

    /// Check if a key exists
    fn exists(&mut self, key: StorageKey) -> bool;

    /// Erase all stored data
    fn erase_all(&mut self) -> Result<(), StorageError>;
}

/// In-memory storage, used by tests and as a fallback when no state
/// directory is available
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    slots: [Option<Vec<u8>>; 2],
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&mut self, key: StorageKey) -> Result<Vec<u8>, StorageError> {
        self.slots[key.as_u8() as usize]
            .clone()
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        self.slots[key.as_u8() as usize] = Some(data.to_vec());
        Ok(())
    }

    fn exists(&mut self, key: StorageKey) -> bool {
        self.slots[key.as_u8() as usize].is_some()
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        self.slots = [None, None];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_are_distinct() {
        let [a, b] = StorageKey::ALL;
        assert_ne!(a.name(), b.name());
        assert_ne!(a.as_u8(), b.as_u8());
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        assert_eq!(
            storage.read(StorageKey::ActiveProfile),
            Err(StorageError::NotFound)
        );

        storage.write(StorageKey::ActiveProfile, &[1, 2, 3]).unwrap();
        assert!(storage.exists(StorageKey::ActiveProfile));
        assert!(!storage.exists(StorageKey::ProfileToml));
        assert_eq!(storage.read(StorageKey::ActiveProfile).unwrap(), vec![1, 2, 3]);

        storage.erase_all().unwrap();
        assert!(!storage.exists(StorageKey::ActiveProfile));
    }
}
