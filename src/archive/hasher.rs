//! SHA-256 digests over archive bytes; the hex digest doubles as the
//! deletion key.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Streaming digest of a file, lowercase hex.
pub fn sha256_hex_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
