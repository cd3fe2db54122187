//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives). The false positive rate depends on the
//! number of bits and hash functions used.
//!
//! ## Usage
//!
//! Each segment embeds a bloom filter built from its keys while it is being
//! written. During point lookups the engine checks the bloom filter first --
//! if it says "not present", the segment is skipped entirely, avoiding a
//! block-index lookup and disk I/O. The filter is never written to disk: it
//! is rebuilt from the segment's keys every time the segment is opened.
//!
//! ## Example
//!
//! ```rust
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::with_defaults();
//! bf.add(b"hello");
//! assert!(bf.might_contain(b"hello"));
//! ```

/// Default number of bits in a filter created with [`BloomFilter::with_defaults`].
pub const DEFAULT_NUM_BITS: u64 = 1000;
/// Default number of hash functions used with [`BloomFilter::with_defaults`].
pub const DEFAULT_NUM_HASHES: u32 = 3;

/// A fixed-size bloom filter backed by a bit vector with `k` independent hash
/// functions.
///
/// Uses double hashing: `h(i) = h1 + i * h2` where `h1` and `h2` are derived
/// from FNV-1a with two different seeds. Unlike a filter sized from an
/// expected item count and a target false-positive rate, this filter has a
/// fixed bit count and hash count chosen up front (see `bloom_bits` /
/// `bloom_hashes` in `EngineConfig`) -- the false-positive rate simply rises
/// as more keys are added, which is acceptable because a false positive only
/// costs an extra block-index probe.
pub struct BloomFilter {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a new, empty filter with the given bit count and hash count.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits` or `num_hashes` is zero.
    pub fn new(num_bits: u64, num_hashes: u32) -> Self {
        assert!(num_bits > 0, "num_bits must be > 0");
        assert!(num_hashes > 0, "num_hashes must be > 0");

        let byte_len = ((num_bits + 7) / 8) as usize;
        Self {
            bits: vec![0u8; byte_len],
            num_bits,
            num_hashes,
        }
    }

    /// Creates a filter using the reference defaults (1000 bits, 3 hashes).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_NUM_BITS, DEFAULT_NUM_HASHES)
    }

    /// Adds a key to the filter, setting its `k` bit positions.
    pub fn add(&mut self, key: &[u8]) {
        let (h1, h2) = self.hash_pair(key);
        for i in 0..self.num_hashes {
            let bit_idx = self.bit_index(h1, h2, i);
            self.set_bit(bit_idx);
        }
    }

    /// Returns `true` if the key **might** be in the set, `false` if it is
    /// **definitely not** in the set. Never returns `false` for a key that
    /// was previously [`add`](BloomFilter::add)ed.
    #[must_use]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = self.hash_pair(key);
        (0..self.num_hashes).all(|i| self.get_bit(self.bit_index(h1, h2, i)))
    }

    /// Returns the number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Returns the number of hash functions (`k`).
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    // ---- Internal helpers ----

    fn hash_pair(&self, key: &[u8]) -> (u64, u64) {
        let h1 = fnv1a_64(key, 0xcbf2_9ce4_8422_2325);
        let h2 = fnv1a_64(key, 0x517c_c1b7_2722_0a95);
        (h1, h2)
    }

    /// Double hashing: `h(i) = (h1 + i * h2) mod num_bits`.
    fn bit_index(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits
    }

    fn set_bit(&mut self, idx: u64) {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        self.bits[byte_idx] |= 1 << bit_offset;
    }

    fn get_bit(&self, idx: u64) -> bool {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        (self.bits[byte_idx] >> bit_offset) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("bytes", &self.bits.len())
            .finish()
    }
}

/// FNV-1a 64-bit hash with a configurable starting basis, used to derive two
/// independent hash functions for double hashing.
fn fnv1a_64(data: &[u8], basis: u64) -> u64 {
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = basis;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
