// Shared helpers for extracted content: digests, type sniffing, header fields, dumps

pub mod binary;
pub mod hash;
pub mod hex;
pub mod magic;

pub use hash::{compute_hash, DigestSet, HashAlgorithm, StreamingHasher};
pub use magic::{mime_type, sniff, FileCategory, Signature, FALLBACK_MIME};
