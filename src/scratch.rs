//! Scratch storage for one run
use std::{
    fs::{create_dir, create_dir_all, remove_dir_all},
    path::{Path, PathBuf},
};

use log::{info, warn};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

use crate::errors::DuplicatorError;

/// Uniquely named directory, removed when dropped
#[derive(Debug)]
pub struct ScratchDir {
    /// Path of the directory
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<root>/git-duplicator-<random>`
    /// # Errors
    /// Error if the directory can't be created
    pub fn new(root: &Path) -> Result<Self, DuplicatorError> {
        let rand_string: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        Self::create(root, &format!("git-duplicator-{rand_string}"))
    }

    /// Create `<root>/<name>`, failing if it already exists
    fn create(root: &Path, name: &str) -> Result<Self, DuplicatorError> {
        create_dir_all(root)
            .map_err(|e| DuplicatorError::new_with_source("Unable to create scratch root", e))?;
        let path = root.join(name);
        create_dir(&path)
            .map_err(|e| DuplicatorError::new_with_source("Unable to create scratch dir", e))?;
        Ok(Self { path })
    }

    /// Path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        info!("Cleaning up {}", self.path.display());
        if let Err(e) = remove_dir_all(&self.path) {
            warn!("Couldn't remove {}: {e}", self.path.display());
        }
    }
}
