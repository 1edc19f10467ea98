// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-exclusive build lock for one cache entry.
//!
//! The lock is an advisory exclusive lock on `<cache file>.lock`. Whoever
//! holds it may check for a cached engine and, if there is none, build and
//! persist one. Dropping the guard removes the lock file and then unlocks it.
//! A waiter that wins the lock on a file that has since been unlinked notices
//! the inode change and retries on the current file.

use super::store::open_envelope;
use super::CacheKey;
use crate::config::LockPolicy;
use crate::CacheError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct CacheLock {
    file: File,
    lock_path: PathBuf,
    cache_path: PathBuf,
    key: CacheKey,
}

impl CacheLock {
    pub(crate) fn acquire(cache_path: PathBuf, key: CacheKey, policy: LockPolicy) -> Result<Self, CacheError> {
        let lock_path = lock_path_for(&cache_path);
        let deadline = match policy {
            LockPolicy::Timeout { timeout_ms } => Some(Instant::now() + Duration::from_millis(timeout_ms)),
            LockPolicy::Block | LockPolicy::NoWait => None,
        };

        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(|e| CacheError::io(&lock_path, e))?;

            match policy {
                LockPolicy::Block => file.lock_exclusive().map_err(|e| CacheError::io(&lock_path, e))?,
                LockPolicy::NoWait => try_lock(&file, &lock_path)?,
                LockPolicy::Timeout { .. } => loop {
                    match try_lock(&file, &lock_path) {
                        Ok(()) => break,
                        Err(CacheError::Contention { .. }) if deadline.is_some_and(|d| Instant::now() < d) => {
                            std::thread::sleep(POLL_INTERVAL);
                        }
                        Err(e) => return Err(e),
                    }
                },
            }

            if still_linked(&file, &lock_path).map_err(|e| CacheError::io(&lock_path, e))? {
                debug!(lock = %lock_path.display(), "Acquired engine cache lock");
                return Ok(Self {
                    file,
                    lock_path,
                    cache_path,
                    key,
                });
            }
            debug!(lock = %lock_path.display(), "Lock file replaced while waiting, retrying");
        }
    }

    /// Whether a complete, valid engine is already cached under this key.
    pub fn ready(&self) -> bool {
        match fs::read(&self.cache_path) {
            Ok(bytes) => match open_envelope(&self.cache_path, Some(&self.key), &bytes) {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid cached engine; it will be rebuilt");
                    false
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %self.cache_path.display(), error = %e, "Cannot read cached engine");
                false
            }
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!(lock = %self.lock_path.display(), error = %e, "Cannot remove lock file");
        }
        let _ = FileExt::unlock(&self.file);
        debug!(lock = %self.lock_path.display(), "Released engine cache lock");
    }
}

/// `<cache file>.lock`
pub fn lock_path_for(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn try_lock(file: &File, lock_path: &Path) -> Result<(), CacheError> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Err(CacheError::Contention {
            path: lock_path.to_path_buf(),
        }),
        Err(e) => Err(CacheError::io(lock_path, e)),
    }
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let held = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// An open file cannot be unlinked on other platforms.
#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}
