// src/changes/fingerprint.rs

//! Helpers for building snapshots from on-disk state.
//!
//! The change detector itself only compares precomputed snapshots; these
//! functions are the glue an embedder (or a test) uses to produce them.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;

use crate::changes::snapshot::{
    ContentFingerprint, FileCollectionSnapshot, FileSnapshot, Fingerprint,
};
use crate::errors::Result;

/// Compute the content hash of a single regular file.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading file for hashing: {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Fingerprint::from_hash(hasher.finalize()))
}

/// Fingerprint one file-system entry, recording missing paths as such.
pub fn content_fingerprint(path: &Path) -> Result<ContentFingerprint> {
    if path.is_dir() {
        Ok(ContentFingerprint::Directory)
    } else if path.is_file() {
        Ok(ContentFingerprint::Regular(fingerprint_file(path)?))
    } else {
        Ok(ContentFingerprint::Missing)
    }
}

/// Snapshot the given paths as one file collection.
///
/// Paths are sorted and deduplicated so the resulting combined hash is
/// stable independent of iteration order. Missing paths stay part of the
/// collection; a path coming into existence later is a content change.
pub fn snapshot_paths<I, P>(paths: I) -> Result<FileCollectionSnapshot>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut sorted: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    sorted.sort();
    sorted.dedup();

    let mut entries = BTreeMap::new();
    for path in sorted {
        debug!(path = %path.display(), "fingerprinting");
        let content = content_fingerprint(&path)?;
        let normalized = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        entries.insert(path, FileSnapshot { normalized, content });
    }

    let snapshot = FileCollectionSnapshot::new(entries);
    debug!(hash = %snapshot.hash().to_hex(), "computed collection snapshot");
    Ok(snapshot)
}
