use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::{MethylNormError, Result};

/// Persists a table next to a SHA-256 sidecar so later loads can verify
/// integrity.
///
/// The sidecar holds `"<hex digest>  <file name>"`, mirroring the common
/// checksum-file layout, and is written after the payload so a crash leaves
/// a missing sidecar rather than a stale one.
pub fn store<T: Serialize>(
    value: &T,
    path: &Path,
) -> Result<()> {
    let payload = bincode::serialize(value)?;
    fs::write(path, &payload)?;

    let digest = hex_digest(&payload);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    fs::write(checksum_path(path), format!("{}  {}\n", digest, name))?;
    debug!("stored {} bytes at {}", payload.len(), path.display());
    Ok(())
}

/// Loads a table stored by [`store`], verifying the checksum before
/// deserializing.
///
/// A digest mismatch is reported as its own condition so callers can tell
/// corruption apart from a missing file.
pub fn retrieve<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let expected = fs::read_to_string(checksum_path(path))?
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| {
            MethylNormError::InvalidInput(format!(
                "checksum file for '{}' is empty",
                path.display()
            ))
        })?;

    let payload = fs::read(path)?;
    let actual = hex_digest(&payload);
    if actual != expected {
        return Err(MethylNormError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }

    Ok(bincode::deserialize(&payload)?)
}

fn checksum_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".sha256");
    PathBuf::from(name)
}

fn hex_digest(payload: &[u8]) -> String {
    Sha256::digest(payload)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
