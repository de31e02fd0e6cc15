//! Attached schedule images.
//!
//! Image bytes are written off the caller's thread into `<data-dir>/images/`.
//! Only once the file is on disk is the relative path written back into the
//! owning schedule, so the schedule is usable while the write is in flight and
//! never points at a missing file.

use super::{SharedStore, lock};
use crate::models::{Schedule, SchedulePatch};
use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Directory under the data root that holds image files.
pub const IMAGES_DIR: &str = "images";

/// File-backed image storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

/// An image write running in the background.
pub struct ImageUpload {
    handle: JoinHandle<Result<String>>,
}

impl ImageUpload {
    /// Block until the write finishes. Returns the stored relative path.
    pub fn wait(self) -> Result<String> {
        self.handle
            .join()
            .map_err(|_| Error::Other("Image writer thread panicked".to_string()))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl ImageStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.to_path_buf(),
        }
    }

    /// Absolute location of a stored relative path.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        let contained = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !contained || relative.is_empty() {
            return Err(Error::InvalidFieldValue(format!(
                "image path must be relative to the data directory: {}",
                relative
            )));
        }
        Ok(self.root.join(path))
    }

    /// Write `bytes` to a new image file, returning its relative path.
    pub fn save(&self, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(IMAGES_DIR);
        std::fs::create_dir_all(&dir)?;
        let relative = format!("{}/{}.jpg", IMAGES_DIR, Uuid::new_v4());
        std::fs::write(self.resolve(&relative)?, bytes)?;
        Ok(relative)
    }

    /// Read a stored image.
    pub fn load(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(format!("image not found: {}", relative)),
            _ => Error::Io(e),
        })
    }

    /// Remove a stored image. A missing file is not an error.
    pub fn delete(&self, relative: &str) -> Result<()> {
        match std::fs::remove_file(self.resolve(relative)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Persist an image for a schedule on a background thread.
    ///
    /// When the file is written, the schedule's `image_path` is set and any
    /// image it previously referenced is removed. If the schedule was deleted
    /// meanwhile the new file is removed again and `NotFound` is reported.
    pub fn save_for_schedule(
        &self,
        store: SharedStore,
        schedule_id: Uuid,
        bytes: Vec<u8>,
    ) -> ImageUpload {
        let images = self.clone();
        let handle = thread::spawn(move || {
            let relative = images.save(&bytes)?;

            let previous = {
                let mut store = lock(&store)?;
                let current = match store.get::<Schedule>(schedule_id) {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        drop(store);
                        images.delete(&relative)?;
                        return Err(e);
                    }
                };
                store.update::<Schedule>(
                    schedule_id,
                    SchedulePatch {
                        image_path: Some(Some(relative.clone())),
                        ..Default::default()
                    },
                )?;
                current.image_path
            };

            if let Some(old) = previous.filter(|old| *old != relative) {
                if let Err(e) = images.delete(&old) {
                    tracing::warn!(path = %old, error = %e, "failed to remove replaced image");
                }
            }
            tracing::debug!(schedule = %schedule_id, path = %relative, "stored schedule image");
            Ok(relative)
        });
        ImageUpload { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleDraft;
    use crate::storage::Store;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_save_load_delete() {
        let env = TestEnv::new();
        let images = ImageStore::new(env.data_path());

        let path = images.save(b"jpeg bytes").unwrap();
        assert!(path.starts_with("images/"));
        assert!(path.ends_with(".jpg"));
        assert_eq!(images.load(&path).unwrap(), b"jpeg bytes");

        images.delete(&path).unwrap();
        assert!(matches!(images.load(&path), Err(Error::NotFound(_))));
        // Second delete is fine
        images.delete(&path).unwrap();
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let env = TestEnv::new();
        let images = ImageStore::new(env.data_path());
        assert!(images.resolve("../outside.jpg").is_err());
        assert!(images.resolve("/etc/passwd").is_err());
        assert!(images.resolve("").is_err());
    }

    #[test]
    fn test_save_for_schedule_sets_path_when_done() {
        let env = TestEnv::new();
        let store = env.init_store().into_shared();
        let images = ImageStore::new(env.data_path());

        let schedule = lock(&store)
            .unwrap()
            .create::<Schedule>(ScheduleDraft::default())
            .unwrap();
        assert!(schedule.image_path.is_none());

        let path = images
            .save_for_schedule(store.clone(), schedule.id, b"first".to_vec())
            .wait()
            .unwrap();
        let stored: Schedule = lock(&store).unwrap().get(schedule.id).unwrap();
        assert_eq!(stored.image_path.as_deref(), Some(path.as_str()));
        assert_eq!(images.load(&path).unwrap(), b"first");

        // Replacing removes the previous file
        let second = images
            .save_for_schedule(store.clone(), schedule.id, b"second".to_vec())
            .wait()
            .unwrap();
        assert_ne!(second, path);
        assert!(images.load(&path).is_err());
        assert_eq!(images.load(&second).unwrap(), b"second");
    }

    #[test]
    fn test_save_for_missing_schedule_cleans_up() {
        let env = TestEnv::new();
        let store = env.init_store().into_shared();
        let images = ImageStore::new(env.data_path());

        let err = images
            .save_for_schedule(store, Uuid::new_v4(), b"orphan".to_vec())
            .wait()
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let leftover = std::fs::read_dir(env.data_path().join(IMAGES_DIR))
            .unwrap()
            .count();
        assert_eq!(leftover, 0);
    }

    #[test]
    fn test_delete_schedule_removes_image() {
        let env = TestEnv::new();
        let store = env.init_store().into_shared();
        let images = ImageStore::new(env.data_path());

        let id = lock(&store)
            .unwrap()
            .create::<Schedule>(ScheduleDraft::default())
            .unwrap()
            .id;
        let path = images
            .save_for_schedule(store.clone(), id, b"bytes".to_vec())
            .wait()
            .unwrap();

        let mut guard = lock(&store).unwrap();
        guard.relations().delete_schedule(id, Some(&images)).unwrap();
        drop(guard);
        assert!(images.load(&path).is_err());

        let reopened = Store::open(env.data_path()).unwrap();
        assert!(reopened.get::<Schedule>(id).is_err());
    }
}
