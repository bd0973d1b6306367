//! Collision-resistant directory-name encoding for `(uuid, tree_hash)`
//! (spec.md GLOSSARY "Slug").
//!
//! This is a simplified scheme, not a byte-for-byte reimplementation of
//! any particular ecosystem's slug algorithm: two five-character groups
//! of a base32 encoding of a composite SHA-256, stable and short enough
//! to use as a directory name.

use uuid::Uuid;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Derive a short, stable slug from a package UUID and its tree hash.
#[must_use]
pub fn slug(uuid: Uuid, tree_hash: &[u8; 20]) -> String {
    let uuid_digest = depot_util::hash::sha256_bytes(uuid.as_bytes());
    let combined_digest = depot_util::hash::sha256_multi(&[&uuid_digest, &hex::encode(tree_hash)]);
    let bytes = hex_to_bytes(&combined_digest);
    format!("{}-{}", base32_chunk(&bytes[0..4]), base32_chunk(&bytes[4..8]))
}

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .filter_map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

fn base32_chunk(bytes: &[u8]) -> String {
    let mut acc: u64 = 0;
    for b in bytes {
        acc = (acc << 8) | u64::from(*b);
    }
    let total_bits = bytes.len() * 8;
    (0..5)
        .map(|i| {
            let shift = total_bits.saturating_sub((i + 1) * 5);
            let idx = ((acc >> shift) & 0b1_1111) as usize;
            ALPHABET[idx] as char
        })
        .collect()
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
