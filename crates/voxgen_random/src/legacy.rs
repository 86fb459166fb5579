use crate::{Random, md5_halves};
use rand_xoshiro::rand_core::{RngCore, impls};

const STATE_BITS: u32 = 48;
const STATE_MASK: u64 = (1 << STATE_BITS) - 1;
const MULTIPLIER: u64 = 0x5_DEEC_E66D;
const INCREMENT: u64 = 0xB;

/// 48-bit linear congruential generator, bit-compatible with `java.util.Random`.
///
/// Seeds derived from it are part of the preset format, so every draw has to
/// match the reference stream exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRandom {
    state: u64,
}

impl LegacyRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            state: (seed ^ MULTIPLIER) & STATE_MASK,
        }
    }

    #[inline]
    fn advance(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT) & STATE_MASK;
        self.state
    }

    /// Skips `count` 32-bit draws.
    pub fn consume(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }
}

impl RngCore for LegacyRandom {
    fn next_u32(&mut self) -> u32 {
        self.next_bits(32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        // the low word is added as a signed int
        let hi = self.next_bits(32) as u32 as i32 as i64;
        let lo = self.next_bits(32) as u32 as i32 as i64;
        (hi << 32).wrapping_add(lo) as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }
}

impl Random for LegacyRandom {
    fn is_legacy(&self) -> bool {
        true
    }

    #[inline]
    fn next_bits(&mut self, bits: u32) -> u64 {
        self.advance() >> (STATE_BITS - bits)
    }

    fn next_u32_bound(&mut self, bound: u32) -> u32 {
        let bound = u64::from(bound);
        if bound.count_ones() <= 1 {
            return (bound.wrapping_mul(self.next_bits(31)) >> 31) as u32;
        }
        // reject draws from the last, incomplete multiple of `bound`
        loop {
            let draw = self.next_bits(31);
            let value = draw % bound;
            if draw - value + (bound - 1) < 1 << 31 {
                return value as u32;
            }
        }
    }

    /// Two draws of 26 and 27 bits, as the reference stream does.
    fn next_f64(&mut self) -> f64 {
        let hi = self.next_bits(26);
        let lo = self.next_bits(27);
        ((hi << 27) | lo) as f64 / (1u64 << 53) as f64
    }

    fn fork(&mut self) -> Self {
        LegacyRandom::new(self.next_u64())
    }

    fn fork_hash(&mut self, seed: impl AsRef<[u8]>) -> Self {
        let (lo, _) = md5_halves(seed);
        LegacyRandom::new(self.next_u64() ^ lo)
    }
}
