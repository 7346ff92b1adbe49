use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use timelapse_core::models::{Storage, StorageError};

/// Filesystem-backed storage: every object is a file under the root
/// directory.
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {

    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirStorage {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for DirStorage {

    fn create(&self, name: &str) -> Result<(), StorageError> {
        File::create(self.path_for(name))
            .map(|_| ())
            .map_err(|err| StorageError::FailedToCreate {
                description: format!("{}: {}", name, err),
            })
    }

    fn append(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(self.path_for(name))
            .map_err(|err| StorageError::FailedToWrite {
                description: format!("{}: {}", name, err),
            })?;

        file.write_all(data).map_err(|err| StorageError::FailedToWrite {
            description: format!("{}: {}", name, err),
        })
    }

    fn read_range(&self, name: &str, offset: u64, length: usize) -> Result<Vec<u8>, StorageError> {
        let mut file = File::open(self.path_for(name)).map_err(|err| StorageError::FailedToRead {
            description: format!("{}: {}", name, err),
        })?;

        file.seek(SeekFrom::Start(offset)).map_err(|err| StorageError::FailedToRead {
            description: format!("{}: {}", name, err),
        })?;

        let mut data = Vec::new();
        file.take(length as u64)
            .read_to_end(&mut data)
            .map_err(|err| StorageError::FailedToRead {
                description: format!("{}: {}", name, err),
            })?;

        Ok(data)
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        fs::remove_file(self.path_for(name)).map_err(|err| StorageError::FailedToDelete {
            description: format!("{}: {}", name, err),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    #[test]
    fn test_create_append_read_delete() {
        let dir = env::temp_dir().join("timelapse_storage_test");
        fs::create_dir_all(&dir).expect("failed to create test dir");
        let storage = DirStorage::new(&dir);

        storage.create("clip.gif").expect("failed to create");
        storage.append("clip.gif", b"GIF89a").expect("failed to append");
        storage.append("clip.gif", &[0x3B]).expect("failed to append");

        assert_eq!(storage.read_range("clip.gif", 0, 6).expect("failed to read"), b"GIF89a");
        assert_eq!(storage.read_range("clip.gif", 6, 100).expect("failed to read"), vec![0x3B]);
        assert_eq!(storage.read_range("clip.gif", 7, 100).expect("failed to read"), Vec::<u8>::new());

        storage.delete("clip.gif").expect("failed to delete");
        assert!(storage.read_range("clip.gif", 0, 1).is_err());

        fs::remove_dir_all(&dir).expect("failed to clean up");
    }

    #[test]
    fn test_create_truncates_existing_object() {
        let dir = env::temp_dir().join("timelapse_storage_truncate_test");
        fs::create_dir_all(&dir).expect("failed to create test dir");
        let storage = DirStorage::new(&dir);

        storage.create("clip.gif").expect("failed to create");
        storage.append("clip.gif", b"stale").expect("failed to append");
        storage.create("clip.gif").expect("failed to recreate");

        assert_eq!(storage.read_range("clip.gif", 0, 16).expect("failed to read"), Vec::<u8>::new());

        fs::remove_dir_all(&dir).expect("failed to clean up");
    }
}
