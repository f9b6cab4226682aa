//! Frame segments backed by files in a shared-memory directory
//!
//! On Linux a camera process creates `/dev/shm/<segment>`, writes pixels while
//! holding an exclusive `flock` on the file, and announces the frame. Readers
//! map the same file read-only and hold a shared `flock` while copying.

use super::frame_buffer::{SegmentGuard, SharedMemory, SharedMemoryFactory};
use crate::error::{Error, Result};
use memmap2::Mmap;
use std::fs::{self, File};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default directory for POSIX shared memory on Linux
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Attaches to segments stored as files under one directory
#[derive(Debug, Clone)]
pub struct ShmDirectory {
    root: PathBuf,
}

impl ShmDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Segment names are single path components
    fn segment_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        plain.then(|| self.root.join(name))
    }
}

impl Default for ShmDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_SHM_DIR)
    }
}

impl SharedMemoryFactory for ShmDirectory {
    fn attach(&self, name: &str) -> Option<Arc<dyn SharedMemory>> {
        let Some(path) = self.segment_path(name) else {
            log::debug!("Shm: rejecting segment name '{}'", name);
            return None;
        };
        match MappedSegment::open(name, path) {
            Ok(segment) => Some(Arc::new(segment)),
            Err(e) => {
                log::debug!("Shm: cannot attach to '{}': {}", name, e);
                None
            }
        }
    }
}

/// Read-only mapping of one segment file
pub struct MappedSegment {
    name: String,
    path: PathBuf,
    file: File,
    map: Mmap,
}

impl MappedSegment {
    pub fn open(name: impl Into<String>, path: PathBuf) -> Result<Self> {
        let name = name.into();
        let file = File::open(&path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::TransientInput(format!("segment '{}' is empty", name)));
        }
        // SAFETY: the mapping is read-only and only read while holding the
        // shared file lock, after checking the file has not shrunk below it.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self {
            name,
            path,
            file,
            map,
        })
    }

    fn current_len(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }
}

impl SharedMemory for MappedSegment {
    fn name(&self) -> &str {
        &self.name
    }

    /// The file is still present and at least as large as the mapping
    fn is_valid(&self) -> bool {
        self.current_len()
            .is_some_and(|len| len >= self.map.len() as u64)
    }

    fn size(&self) -> usize {
        self.map.len()
    }

    fn lock(&self) -> Result<SegmentGuard<'_>> {
        self.file.lock_shared()?;
        let guard = FileLockGuard {
            file: &self.file,
            bytes: &self.map,
        };
        // Re-check under the lock; touching pages past a truncated end faults
        if self.file.metadata()?.len() < self.map.len() as u64 {
            return Err(Error::TransientInput(format!(
                "segment '{}' shrank below its mapping",
                self.name
            )));
        }
        Ok(Box::new(guard))
    }
}

/// Shared `flock` held for the lifetime of a borrow of the mapping
struct FileLockGuard<'a> {
    file: &'a File,
    bytes: &'a [u8],
}

impl Deref for FileLockGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!("Shm: failed to release segment lock: {}", e);
        }
    }
}
