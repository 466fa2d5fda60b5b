// src/hash.rs

//! Configurable hashing for fixity values and copy verification
//!
//! This module provides a unified interface for the digest families an
//! equality check or a PREMIS fixity entry may ask for:
//! - **MD5**: legacy fixity value, still expected in PREMIS records
//! - **SHA-256**: the digest recorded in stage manifests and archive manifests
//! - **CRC32** / **Adler-32**: cheap checksums, only useful as equality metrics
//!
//! | Use Case | Algorithm |
//! |----------|-----------|
//! | PREMIS fixity | MD5 + SHA-256 |
//! | Stage manifest lines | SHA-256 |
//! | "Is a copy necessary?" | any, caller's choice |

use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};

/// Block size used when streaming a reader through a hasher
const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    Md5,
    #[default]
    Sha256,
    Crc32,
    Adler32,
}

impl HashAlgorithm {
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Crc32 => "crc32",
            Self::Adler32 => "adler32",
        }
    }

    /// Name of the algorithm as PREMIS `messageDigestAlgorithm` spells it
    pub const fn premis_name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
            Self::Crc32 => "CRC32",
            Self::Adler32 => "Adler-32",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finished digest: lowercase hex, tagged with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl Hash {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Incremental digest over any supported algorithm
pub struct Hasher {
    state: HasherState,
}

enum HasherState {
    Md5(Md5),
    Sha256(Sha256),
    Crc32(crc32fast::Hasher),
    Adler32(adler2::Adler32),
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Md5 => HasherState::Md5(Md5::new()),
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Crc32 => HasherState::Crc32(crc32fast::Hasher::new()),
            HashAlgorithm::Adler32 => HasherState::Adler32(adler2::Adler32::new()),
        };
        Self { state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Md5(hasher) => hasher.update(data),
            HasherState::Sha256(hasher) => hasher.update(data),
            HasherState::Crc32(hasher) => hasher.update(data),
            HasherState::Adler32(hasher) => hasher.write_slice(data),
        }
    }

    pub fn finalize(self) -> Hash {
        let (algorithm, value) = match self.state {
            HasherState::Md5(hasher) => (HashAlgorithm::Md5, format!("{:x}", hasher.finalize())),
            HasherState::Sha256(hasher) => {
                (HashAlgorithm::Sha256, format!("{:x}", hasher.finalize()))
            }
            HasherState::Crc32(hasher) => {
                (HashAlgorithm::Crc32, format!("{:08x}", hasher.finalize()))
            }
            HasherState::Adler32(hasher) => {
                (HashAlgorithm::Adler32, format!("{:08x}", hasher.checksum()))
            }
        };
        Hash { algorithm, value }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self.state {
            HasherState::Md5(_) => HashAlgorithm::Md5,
            HasherState::Sha256(_) => HashAlgorithm::Sha256,
            HasherState::Crc32(_) => HashAlgorithm::Crc32,
            HasherState::Adler32(_) => HashAlgorithm::Adler32,
        }
    }
}

/// Digest of an in-memory buffer
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Hash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Stream a reader through one hasher
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> io::Result<Hash> {
    let mut digests = hash_reader_multi(&[algorithm], reader)?;
    digests
        .pop()
        .ok_or_else(|| io::Error::other("no digest produced"))
}

/// Several digests from a single pass over a reader, in the order asked for
pub fn hash_reader_multi<R: Read>(
    algorithms: &[HashAlgorithm],
    reader: &mut R,
) -> io::Result<Vec<Hash>> {
    let mut hashers: Vec<Hasher> = algorithms.iter().copied().map(Hasher::new).collect();
    let mut block = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        match reader.read(&mut block)? {
            0 => break,
            n => hashers.iter_mut().for_each(|h| h.update(&block[..n])),
        }
    }
    Ok(hashers.into_iter().map(Hasher::finalize).collect())
}

/// Hex SHA-256 of a buffer
#[inline]
pub fn sha256(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data).value
}
