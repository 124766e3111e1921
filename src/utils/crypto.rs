//! Cryptographic utility functions

use std::io::Read;

use sha2::{Digest, Sha256};

/// Calculate SHA-256 hash and return as a lowercase hex string
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Calculate SHA-256 over a reader's full contents, streaming
/// `chunk_size` bytes at a time so hashing a large file doesn't require
/// loading it all into memory.
pub fn sha256_hex_reader<R: Read>(mut reader: R, chunk_size: usize) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha256_hex_reader_matches_sha256_hex() {
        let data = b"hello";
        let digest = sha256_hex_reader(&data[..], 2).unwrap();
        assert_eq!(digest, sha256_hex("hello"));
    }

    #[test]
    fn test_sha256_hex_reader_empty() {
        let digest = sha256_hex_reader(&b""[..], 8192).unwrap();
        assert_eq!(digest, sha256_hex(""));
    }
}
