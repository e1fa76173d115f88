//! Stable title hashes for the cybersecurity fallback pick.
//!
//! The pick must be identical across runs, machines and releases, so only
//! fixed, documented algorithms are offered. `std::hash` is randomized per
//! process and is not one of them.

use serde::{Deserialize, Serialize};

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash applied to the UTF-8 bytes of a resource title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleHash {
    /// 32-bit FNV-1a.
    #[default]
    Fnv1a32,
    /// 64-bit FNV-1a.
    Fnv1a64,
    /// CRC-32 (IEEE).
    Crc32,
}

impl TitleHash {
    pub fn hash(&self, title: &str) -> u64 {
        let bytes = title.as_bytes();
        match self {
            TitleHash::Fnv1a32 => u64::from(fnv1a32(bytes)),
            TitleHash::Fnv1a64 => fnv1a64(bytes),
            TitleHash::Crc32 => u64::from(crc32fast::hash(bytes)),
        }
    }

    /// Index into a list of `len` candidates. `len` must be non-zero.
    pub fn pick(&self, title: &str, len: usize) -> usize {
        (self.hash(title) % len as u64) as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TitleHash::Fnv1a32 => "fnv1a32",
            TitleHash::Fnv1a64 => "fnv1a64",
            TitleHash::Crc32 => "crc32",
        }
    }
}

fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut h = FNV32_OFFSET;
    for b in bytes {
        h ^= u32::from(*b);
        h = h.wrapping_mul(FNV32_PRIME);
    }
    h
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut h = FNV64_OFFSET;
    for b in bytes {
        h ^= u64::from(*b);
        h = h.wrapping_mul(FNV64_PRIME);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(TitleHash::Crc32.hash("123456789"), 0xcbf4_3926);
    }

    #[test]
    fn test_pick_is_stable_and_in_range() {
        for hash in [TitleHash::Fnv1a32, TitleHash::Fnv1a64, TitleHash::Crc32] {
            let first = hash.pick("Network Defense Fundamentals", 3);
            assert!(first < 3);
            assert_eq!(first, hash.pick("Network Defense Fundamentals", 3));
        }
    }

    #[test]
    fn test_serde_names() {
        let hash: TitleHash = serde_yaml::from_str("crc32").unwrap();
        assert_eq!(hash, TitleHash::Crc32);
        assert_eq!(serde_yaml::to_string(&TitleHash::Fnv1a32).unwrap().trim(), "fnv1a32");
    }
}
