//! File-backed profile storage
//!
//! One file per storage key under the state directory. Writes land in a
//! temporary file first and are renamed over the old value, so a crash
//! mid-write leaves the previous profile intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use palletron_core::traits::{Storage, StorageError, StorageKey};

/// Storage rooted at a state directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) the state directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(key.name())
    }

    fn temp_path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.tmp", key.name()))
    }
}

impl Storage for FileStorage {
    fn read(&mut self, key: StorageKey) -> Result<Vec<u8>, StorageError> {
        fs::read(self.path(key)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => io_error(e),
        })
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), StorageError> {
        let temp = self.temp_path(key);
        fs::write(&temp, data).map_err(io_error)?;
        fs::rename(&temp, self.path(key)).map_err(io_error)
    }

    fn exists(&mut self, key: StorageKey) -> bool {
        self.path(key).is_file()
    }

    fn erase_all(&mut self) -> Result<(), StorageError> {
        for key in StorageKey::ALL {
            match fs::remove_file(self.path(key)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(e)),
            }
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> StorageError {
    StorageError::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use palletron_core::config::{
        load_profile, save_profile, CellConfig, ProfileError, StoredProfile,
    };
    use tempfile::TempDir;

    #[test]
    fn test_missing_key() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        assert!(!storage.exists(StorageKey::ActiveProfile));
        assert_eq!(
            storage.read(StorageKey::ActiveProfile),
            Err(StorageError::NotFound)
        );
    }

    #[test]
    fn test_write_replaces_value() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();

        storage.write(StorageKey::ProfileToml, b"first").unwrap();
        storage.write(StorageKey::ProfileToml, b"second").unwrap();

        assert!(storage.exists(StorageKey::ProfileToml));
        assert_eq!(storage.read(StorageKey::ProfileToml).unwrap(), b"second");
        assert!(!dir.path().join("active_profile.toml.tmp").exists());
    }

    #[test]
    fn test_creates_state_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::open(&nested).unwrap();
        assert!(storage.dir().is_dir());
    }

    #[test]
    fn test_erase_all() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();
        storage.write(StorageKey::ActiveProfile, &[1, 2, 3]).unwrap();

        storage.erase_all().unwrap();
        assert!(!storage.exists(StorageKey::ActiveProfile));
        // Erasing an empty directory is fine
        storage.erase_all().unwrap();
    }

    #[test]
    fn test_profile_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let mut cell = CellConfig::default();
        cell.grid.rows = 5;

        let mut storage = FileStorage::open(dir.path()).unwrap();
        save_profile(&mut storage, &cell).unwrap();

        let mut reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(load_profile(&mut reopened).unwrap().grid.rows, 5);
    }

    #[test]
    fn test_corrupted_profile_rejected() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileStorage::open(dir.path()).unwrap();

        // Edited after the CRC was computed
        let mut profile = StoredProfile::new(CellConfig::default()).unwrap();
        profile.cell.grid.rows = 3;
        storage
            .write(StorageKey::ActiveProfile, &profile.to_bytes().unwrap())
            .unwrap();

        assert!(matches!(
            load_profile(&mut storage),
            Err(ProfileError::CrcMismatch)
        ));
    }
}
