// flow_pvp_prng — seedable pseudo-random source for the session authority.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) seeded through SplitMix64.
// Every random decision the server makes goes through one `GameRng`: opaque
// user ids, lobby codes, the player color picked on join, and the shuffled
// order of boards handed out by `start_game`. Seeding it from a fixed value
// (the server config's `seed`) makes whole sessions reproducible in tests.
//
// The generator only ever uses integer arithmetic, so identical seeds give
// identical sequences on every platform. Helpers built on top of the raw
// stream (`shuffle`, `choose`, `hex_token`) consume it in a fixed pattern and
// stay deterministic too.

use serde::{Deserialize, Serialize};

/// Hex digits used by `hex_token`.
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Xoshiro256++ PRNG.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// SplitMix64 expands the seed into the 256-bit internal state, so even
    /// small or adjacent seeds give unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Create a PRNG seeded from the system clock. Used when the server is
    /// started without an explicit seed.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos ^ u64::from(std::process::id()).rotate_left(32))
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a `u32` from the upper half of a `u64`.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Rejection sampling keeps the result free of modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Shuffle a slice in place (Fisher-Yates, walking down from the end).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }

    /// Pick one element uniformly. Returns `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let i = self.range_usize(0, items.len());
        items.get(i)
    }

    /// Generate a lowercase hexadecimal token of `len` characters, the shape
    /// of a truncated UUID. User ids and lobby codes are built from these.
    pub fn hex_token(&mut self, len: usize) -> String {
        let mut out = String::with_capacity(len);
        let mut bits = 0u64;
        let mut remaining = 0;
        for _ in 0..len {
            if remaining == 0 {
                bits = self.next_u64();
                remaining = 16;
            }
            out.push(char::from(HEX_DIGITS[(bits & 0xF) as usize]));
            bits >>= 4;
            remaining -= 1;
        }
        out
    }
}

/// SplitMix64, used only to expand a `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
