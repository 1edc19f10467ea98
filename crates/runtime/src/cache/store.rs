// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! On-disk engine store.
//!
//! Each engine lives in `<dir>/<key>.engine` inside a checksummed envelope:
//!
//! ```text
//! "TRTE" | version: u32 | key: [u8; 64] | payload_len: u64 | crc32: u32 | payload
//! ```
//!
//! Integers are little-endian. The payload is whatever the device's engine
//! serializer produced and is never interpreted here. Files are written to a
//! temporary sibling, synced and renamed into place, so readers see either
//! the old file, no file, or the complete new one.

use super::{CacheKey, CacheLock};
use crate::config::LockPolicy;
use crate::CacheError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENVELOPE_MAGIC: &[u8; 4] = b"TRTE";
pub const ENVELOPE_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 4 + 4 + CacheKey::LEN + 8 + 4;

const ENGINE_SUFFIX: &str = ".engine";
const TMP_SUFFIX: &str = ".engine.tmp";

/// A cache file found by [`CacheStore::list`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Whether the envelope checks out.
    pub valid: bool,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Takes the exclusive build lock for `key`, creating the cache
    /// directory if needed.
    pub fn lock(&self, key: &CacheKey, policy: LockPolicy) -> Result<CacheLock, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        CacheLock::acquire(self.path_for(key), key.clone(), policy)
    }

    /// Returns the payload stored under `key`, or `None` if there is none.
    /// An invalid file is an error.
    pub fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => {
                let payload = open_envelope(&path, Some(key), &bytes)?;
                debug!(path = %path.display(), bytes = payload.len(), "Read cached engine");
                Ok(Some(payload.to_vec()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Persists `payload` under `key`, replacing any previous file.
    pub fn store(&self, key: &CacheKey, payload: &[u8]) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{}{TMP_SUFFIX}", key.as_str()));

        let header = envelope_header(key, payload);
        let written = fs::File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(&header)?;
                file.write_all(payload)?;
                file.sync_all()
            })
            .map_err(|e| CacheError::io(&tmp_path, e))
            .and_then(|_| fs::rename(&tmp_path, &path).map_err(|e| CacheError::io(&path, e)));
        if let Err(e) = written {
            if let Err(rm) = fs::remove_file(&tmp_path) {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!(path = %tmp_path.display(), error = %rm, "Cannot remove partial engine file");
                }
            }
            return Err(e);
        }
        sync_dir(&self.dir)?;

        info!(path = %path.display(), bytes = payload.len(), "Persisted engine");
        Ok(path)
    }

    /// Every `.engine` file in the directory, sorted by key. Leftover
    /// `.engine.tmp` files from interrupted writes are listed as invalid.
    pub fn list(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let mut entries = Vec::new();
        for path in self.engine_files()? {
            let Some(key) = key_of(&path) else { continue };
            let bytes = fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
            let valid = !is_partial(&path) && open_envelope(&path, Some(&key), &bytes).is_ok();
            entries.push(CacheEntry {
                key: key.as_str().to_string(),
                path,
                size_bytes: bytes.len() as u64,
                valid,
            });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }

    /// Removes every cached engine, and any leftover partial write, and
    /// returns how many files were removed. Lock files are left alone; their
    /// holders remove them.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let files = self.engine_files()?;
        for path in &files {
            fs::remove_file(path).map_err(|e| CacheError::io(path, e))?;
        }
        if !files.is_empty() {
            sync_dir(&self.dir)?;
        }
        info!(dir = %self.dir.display(), removed = files.len(), "Cleared engine cache");
        Ok(files.len())
    }

    fn engine_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };
        let mut files = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(|e| CacheError::io(&self.dir, e))?.path();
            if path.is_file() && key_of(&path).is_some() {
                files.push(path);
            }
        }
        Ok(files)
    }
}

// ── Envelope ───────────────────────────────────────────────────

fn envelope_header(key: &CacheKey, payload: &[u8]) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(ENVELOPE_MAGIC);
    header.extend_from_slice(&ENVELOPE_VERSION.to_le_bytes());
    header.extend_from_slice(key.as_str().as_bytes());
    header.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    header.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    header
}

/// Checks the envelope and returns the payload it wraps. With `expected`
/// set, the embedded key must match it.
pub(crate) fn open_envelope<'a>(
    path: &Path,
    expected: Option<&CacheKey>,
    bytes: &'a [u8],
) -> Result<&'a [u8], CacheError> {
    let corrupt = |detail: String| CacheError::Corrupt {
        path: path.to_path_buf(),
        detail,
    };
    if bytes.len() < HEADER_LEN {
        return Err(corrupt(format!("{} bytes is shorter than the header", bytes.len())));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    if &header[0..4] != ENVELOPE_MAGIC {
        return Err(corrupt("bad magic".into()));
    }
    let version = u32::from_le_bytes(le_array(&header[4..8]));
    if version != ENVELOPE_VERSION {
        return Err(corrupt(format!("unsupported envelope version {version}")));
    }
    let key = &header[8..8 + CacheKey::LEN];
    if let Some(expected) = expected {
        if key != expected.as_str().as_bytes() {
            return Err(corrupt("embedded key does not match file name".into()));
        }
    }
    let rest = &header[8 + CacheKey::LEN..];
    let declared = u64::from_le_bytes(le_array(&rest[0..8]));
    if declared != payload.len() as u64 {
        return Err(corrupt(format!(
            "declares {declared} payload bytes, holds {}",
            payload.len()
        )));
    }
    let crc = u32::from_le_bytes(le_array(&rest[8..12]));
    if crc != crc32fast::hash(payload) {
        return Err(corrupt("payload checksum mismatch".into()));
    }
    Ok(payload)
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// The key named by `<key>.engine` or `<key>.engine.tmp`.
fn key_of(path: &Path) -> Option<CacheKey> {
    let name = path.file_name()?.to_str()?;
    let stem = name
        .strip_suffix(TMP_SUFFIX)
        .or_else(|| name.strip_suffix(ENGINE_SUFFIX))?;
    CacheKey::parse(stem)
}

fn is_partial(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(TMP_SUFFIX))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), CacheError> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| CacheError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), CacheError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(c: char) -> CacheKey {
        CacheKey::parse(&c.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache"));
        let k = key('a');

        assert!(store.load(&k).unwrap().is_none());
        let path = store.store(&k, b"engine bytes").unwrap();
        assert_eq!(path, store.path_for(&k));
        assert_eq!(fs::metadata(&path).unwrap().len() as usize, HEADER_LEN + 12);
        assert_eq!(store.load(&k).unwrap().unwrap(), b"engine bytes");
        assert!(!path.with_extension("engine.tmp").exists());
    }

    #[test]
    fn test_truncated_and_flipped_files_rejected() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let k = key('b');
        let path = store.store(&k, &[7u8; 100]).unwrap();
        let good = fs::read(&path).unwrap();

        fs::write(&path, &good[..good.len() - 1]).unwrap();
        assert!(matches!(store.load(&k), Err(CacheError::Corrupt { .. })));

        let mut flipped = good.clone();
        *flipped.last_mut().unwrap() ^= 0xff;
        fs::write(&path, &flipped).unwrap();
        assert!(matches!(store.load(&k), Err(CacheError::Corrupt { .. })));

        fs::write(&path, &good[..10]).unwrap();
        assert!(matches!(store.load(&k), Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_key_must_match_file() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let src = store.store(&key('c'), b"x").unwrap();
        fs::copy(&src, store.path_for(&key('d'))).unwrap();
        assert!(store.load(&key('d')).is_err());
    }

    #[test]
    fn test_list_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());

        store.store(&key('1'), b"one").unwrap();
        store.store(&key('2'), b"two").unwrap();
        fs::write(store.path_for(&key('3')), b"junk").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().filter(|e| e.valid).count(), 2);
        assert!(!entries[2].valid);

        assert_eq!(store.clear().unwrap(), 3);
        assert!(store.list().unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_stale_partial_write_listed_and_cleared() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let k = key('a');
        let stale = dir.path().join(format!("{}.engine.tmp", k.as_str()));
        fs::write(&stale, b"half an engine").unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, k.as_str());
        assert!(!entries[0].valid);
        assert!(store.load(&k).unwrap().is_none());

        assert_eq!(store.clear().unwrap(), 1);
        assert!(!stale.exists());
    }

    #[test]
    fn test_failed_store_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let k = key('e');
        // A non-empty directory where the engine file belongs makes the
        // rename fail after the temporary file is fully written.
        fs::create_dir(store.path_for(&k)).unwrap();
        fs::write(store.path_for(&k).join("blocker"), b"x").unwrap();

        assert!(matches!(store.store(&k, b"engine"), Err(CacheError::Io { .. })));
        assert!(!dir.path().join(format!("{}.engine.tmp", k.as_str())).exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_dir_lists_empty() {
        let store = CacheStore::new("/nonexistent/trt-cache-dir");
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.clear().unwrap(), 0);
    }
}
