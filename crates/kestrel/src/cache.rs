//! Metadata cache files.
//!
//! A cache file is an opaque serialized body followed by exactly 32 raw bytes:
//! the checksum of the metadata the cache was built from. A cache is valid iff
//! that trailing checksum equals the currently advertised metadata checksum.
//! The tail layout is load-bearing; changing it invalidates every existing
//! cache.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::{Error, Result};

/// The width of the trailing checksum.
pub const CHECKSUM_BYTES: usize = 32;

/// `<cachedir>/<reponame>.solv`, the main metadata cache of a repo.
pub fn main_cache_path(cachedir: &Path, reponame: &str) -> PathBuf {
    cachedir.join(format!("{reponame}.solv"))
}

/// `<cachedir>/<reponame>-<ext>.solvx`, an extension cache of a repo.
pub fn ext_cache_path(cachedir: &Path, reponame: &str, ext: &str) -> PathBuf {
    cachedir.join(format!("{reponame}-{ext}.solvx"))
}

/// Checksums a metadata blob the way cache tails expect it.
pub fn checksum_bytes(data: &[u8]) -> [u8; CHECKSUM_BYTES] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Writes a cache file: serialized payload, then the 32-byte checksum tail.
/// The write goes through a temporary file renamed into place.
pub fn write_cache<T: Serialize>(
    path: &Path,
    payload: &T,
    checksum: &[u8; CHECKSUM_BYTES],
) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::FileInvalid(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent)
        .map_err(|err| Error::FileInvalid(format!("cannot create {}: {err}", parent.display())))?;
    let body = serde_json::to_vec(payload)
        .map_err(|err| Error::Internal(format!("cache serialization failed: {err}")))?;

    let tmp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)
        .map_err(|err| Error::FileInvalid(format!("cannot create {}: {err}", tmp_path.display())))?;
    file.write_all(&body)
        .and_then(|()| file.write_all(checksum))
        .and_then(|()| file.sync_all())
        .map_err(|err| Error::FileInvalid(format!("cannot write {}: {err}", tmp_path.display())))?;
    drop(file);
    fs::rename(&tmp_path, path)
        .map_err(|err| Error::FileInvalid(format!("cannot rename to {}: {err}", path.display())))?;
    debug!("wrote cache {}", path.display());
    Ok(())
}

/// Reads a cache file if it exists and its trailing checksum matches
/// `expected`. A missing file or a stale checksum yields `Ok(None)`; a present
/// but unreadable file is an error.
pub fn read_cache<T: DeserializeOwned>(
    path: &Path,
    expected: &[u8; CHECKSUM_BYTES],
) -> Result<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(Error::FileInvalid(format!(
                "cannot read {}: {err}",
                path.display()
            )))
        }
    };
    if data.len() < CHECKSUM_BYTES {
        return Ok(None);
    }
    let (body, tail) = data.split_at(data.len() - CHECKSUM_BYTES);
    if tail != expected {
        debug!("stale cache {}", path.display());
        return Ok(None);
    }
    let payload = serde_json::from_slice(body)
        .map_err(|err| Error::FileInvalid(format!("corrupt cache {}: {err}", path.display())))?;
    Ok(Some(payload))
}
