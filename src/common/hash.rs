// Content digests for extracted files
//
// Several algorithms are computed side by side in a single pass over the content,
// so a file pulled out of an image is read exactly once.

use blake2::Blake2b512;
use blake3::Hasher as Blake3Hasher;
use crc32fast::Hasher as Crc32Hasher;
use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha512};
use std::collections::BTreeMap;
use xxhash_rust::xxh3::Xxh3;
use xxhash_rust::xxh64::Xxh64;

// =============================================================================
// Hash Algorithm Enum
// =============================================================================

/// Supported digest algorithms
/// - MD5/SHA1/SHA256: the triple reported for collected files by default
/// - SHA512/BLAKE3/BLAKE2b: stronger cryptographic options
/// - XXH3/XXH64/CRC32: fast non-cryptographic checks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Blake3,
    Blake2,
    Xxh3,
    Xxh64,
    Crc32,
}

impl HashAlgorithm {
    /// Parse algorithm name (case-insensitive)
    pub fn from_str(algorithm: &str) -> Result<Self, String> {
        match algorithm.trim().to_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            "blake3" => Ok(HashAlgorithm::Blake3),
            "blake2" | "blake2b" => Ok(HashAlgorithm::Blake2),
            "xxh3" | "xxhash3" => Ok(HashAlgorithm::Xxh3),
            "xxh64" | "xxhash64" => Ok(HashAlgorithm::Xxh64),
            "crc32" | "crc-32" => Ok(HashAlgorithm::Crc32),
            _ => Err(format!(
                "Unsupported hash algorithm: '{}'. Supported: md5, sha1, sha256, sha512, blake3, blake2, xxh3, xxh64, crc32",
                algorithm
            )),
        }
    }

    /// Lowercase key used in reports (`md5`, `sha256`, ...)
    pub fn key(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Blake2 => "blake2b",
            HashAlgorithm::Xxh3 => "xxh3",
            HashAlgorithm::Xxh64 => "xxh64",
            HashAlgorithm::Crc32 => "crc32",
        }
    }
}

// =============================================================================
// Streaming Hasher
// =============================================================================

/// Incremental hasher for any supported algorithm.
/// Blake3Hasher is boxed to keep the enum small.
pub enum StreamingHasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<Blake3Hasher>),
    Blake2(Blake2b512),
    Xxh3(Box<Xxh3>),
    Xxh64(Xxh64),
    Crc32(Crc32Hasher),
}

impl StreamingHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Md5 => StreamingHasher::Md5(Md5::new()),
            HashAlgorithm::Sha1 => StreamingHasher::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => StreamingHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => StreamingHasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => StreamingHasher::Blake3(Box::new(Blake3Hasher::new())),
            HashAlgorithm::Blake2 => StreamingHasher::Blake2(Blake2b512::new()),
            HashAlgorithm::Xxh3 => StreamingHasher::Xxh3(Box::new(Xxh3::new())),
            HashAlgorithm::Xxh64 => StreamingHasher::Xxh64(Xxh64::new(0)),
            HashAlgorithm::Crc32 => StreamingHasher::Crc32(Crc32Hasher::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamingHasher::Md5(h) => Digest::update(h, data),
            StreamingHasher::Sha1(h) => Digest::update(h, data),
            StreamingHasher::Sha256(h) => Digest::update(h, data),
            StreamingHasher::Sha512(h) => Digest::update(h, data),
            StreamingHasher::Blake3(h) => {
                h.update(data);
            }
            StreamingHasher::Blake2(h) => Digest::update(h, data),
            StreamingHasher::Xxh3(h) => h.update(data),
            StreamingHasher::Xxh64(h) => h.update(data),
            StreamingHasher::Crc32(h) => h.update(data),
        }
    }

    /// Finalize as a lowercase hex string
    pub fn finalize(self) -> String {
        match self {
            StreamingHasher::Md5(h) => hex::encode(h.finalize()),
            StreamingHasher::Sha1(h) => hex::encode(h.finalize()),
            StreamingHasher::Sha256(h) => hex::encode(h.finalize()),
            StreamingHasher::Sha512(h) => hex::encode(h.finalize()),
            StreamingHasher::Blake3(h) => h.finalize().to_hex().to_string(),
            StreamingHasher::Blake2(h) => hex::encode(h.finalize()),
            StreamingHasher::Xxh3(h) => format!("{:032x}", h.digest128()),
            StreamingHasher::Xxh64(h) => format!("{:016x}", h.digest()),
            StreamingHasher::Crc32(h) => format!("{:08x}", h.finalize()),
        }
    }
}

// =============================================================================
// Digest Set
// =============================================================================

/// Several hashers fed from the same stream
pub struct DigestSet {
    hashers: Vec<(HashAlgorithm, StreamingHasher)>,
}

impl DigestSet {
    pub fn new(algorithms: &[HashAlgorithm]) -> Self {
        let mut hashers: Vec<(HashAlgorithm, StreamingHasher)> = Vec::with_capacity(algorithms.len());
        for &algorithm in algorithms {
            if !hashers.iter().any(|(a, _)| *a == algorithm) {
                hashers.push((algorithm, StreamingHasher::new(algorithm)));
            }
        }
        Self { hashers }
    }

    pub fn update(&mut self, data: &[u8]) {
        for (_, hasher) in &mut self.hashers {
            hasher.update(data);
        }
    }

    /// Digests keyed by [`HashAlgorithm::key`]
    pub fn finalize(self) -> BTreeMap<String, String> {
        self.hashers
            .into_iter()
            .map(|(algorithm, hasher)| (algorithm.key().to_string(), hasher.finalize()))
            .collect()
    }
}

/// One-shot digest of a small buffer
pub fn compute_hash(data: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = StreamingHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithms() {
        assert_eq!(HashAlgorithm::from_str("MD5").unwrap(), HashAlgorithm::Md5);
        assert_eq!(HashAlgorithm::from_str(" sha-256 ").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(HashAlgorithm::from_str("blake2b").unwrap(), HashAlgorithm::Blake2);
        assert!(HashAlgorithm::from_str("whirlpool").is_err());
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(compute_hash(b"", HashAlgorithm::Md5), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(compute_hash(b"abc", HashAlgorithm::Sha1), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            compute_hash(b"abc", HashAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(compute_hash(b"123456789", HashAlgorithm::Crc32), "cbf43926");
    }

    #[test]
    fn test_digest_set_matches_one_shot() {
        let algorithms = [HashAlgorithm::Md5, HashAlgorithm::Sha256, HashAlgorithm::Xxh64, HashAlgorithm::Md5];
        let mut set = DigestSet::new(&algorithms);
        set.update(b"hello ");
        set.update(b"world");
        let digests = set.finalize();

        assert_eq!(digests.len(), 3);
        assert_eq!(digests["md5"], compute_hash(b"hello world", HashAlgorithm::Md5));
        assert_eq!(digests["sha256"], compute_hash(b"hello world", HashAlgorithm::Sha256));
        assert_eq!(digests["xxh64"].len(), 16);
    }
}
