//! Seed hash type and provider trait.

use std::fmt;

/// 32-byte seed digest for a block height. Only used to name dataset files here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeedHash([u8; 32]);

impl SeedHash {
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lower-case hex encoding without a `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First `len` hex characters, clamped to the full 64.
    #[must_use]
    pub fn hex_prefix(&self, len: usize) -> String {
        let mut encoded = self.to_hex();
        encoded.truncate(len);
        encoded
    }
}

impl From<[u8; 32]> for SeedHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for SeedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for SeedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeedHash({self})")
    }
}

/// Derives the seed hash for a height.
///
/// Implemented for any `Fn(u64) -> SeedHash` closure.
pub trait SeedHashProvider: Send + Sync {
    fn seed_hash(&self, height: u64) -> SeedHash;
}

impl<F> SeedHashProvider for F
where
    F: Fn(u64) -> SeedHash + Send + Sync,
{
    fn seed_hash(&self, height: u64) -> SeedHash {
        self(height)
    }
}
