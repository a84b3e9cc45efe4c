// Content hashes used to key cached artifacts.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Hex SHA-256 of a byte string.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hex SHA-256 of a file's contents; `"no_file"` when no file is given.
pub fn file_hash(path: Option<&Path>) -> Result<String, CoreError> {
    match path {
        None => Ok("no_file".to_string()),
        Some(p) => {
            let bytes = std::fs::read(p).map_err(|e| CoreError::io(p, e))?;
            Ok(digest_hex(&bytes))
        }
    }
}

/// Order-independent hash of a set of strings.
pub fn set_hash<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = items.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();
    let mut hasher = Sha256::new();
    for item in sorted {
        hasher.update(item.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
