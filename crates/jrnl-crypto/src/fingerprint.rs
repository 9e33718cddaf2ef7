//! SHA-256 hashing and human-comparable public key fingerprints

use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Lowercase hex SHA-256, e.g. for journal uids.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Fingerprint of a public key for out-of-band identity checks.
///
/// Eight groups of five digits: each group is a big-endian 4-byte chunk of
/// SHA-256(public key), read unsigned, modulo 100000. Four groups per line.
pub fn pretty_fingerprint(public_key: &[u8]) -> String {
    let digest = sha256(public_key);
    let groups: Vec<String> = digest
        .chunks_exact(4)
        .map(|chunk| {
            let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            format!("{:05}", value % 100_000)
        })
        .collect();

    format!("{}\n{}", groups[..4].join("   "), groups[4..].join("   "))
}
