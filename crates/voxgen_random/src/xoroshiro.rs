use crate::{Random, md5_halves};
use rand_xoshiro::Xoroshiro128PlusPlus;
use rand_xoshiro::rand_core::{RngCore, SeedableRng};

/// xoroshiro128++ seeded the way world presets expect: a 64-bit seed is
/// spread over 128 bits with two stafford-13 mixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XoroshiroRandom(Xoroshiro128PlusPlus);

impl XoroshiroRandom {
    pub fn new(seed: u64) -> Self {
        let lo = seed ^ 0x6a09_e667_f3bc_c909;
        let hi = lo.wrapping_add(0x9e37_79b9_7f4a_7c15);
        Self::from_u128_seed(stafford_13(lo), stafford_13(hi))
    }

    pub fn from_u128_seed(lo: u64, hi: u64) -> Self {
        let seed = (u128::from(hi) << 64 | u128::from(lo)).to_le_bytes();
        Self(Xoroshiro128PlusPlus::from_seed(seed))
    }
}

fn stafford_13(v: u64) -> u64 {
    let v = (v ^ v >> 30).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    let v = (v ^ v >> 27).wrapping_mul(0x94d0_49bb_1331_11eb);
    v ^ v >> 31
}

impl Random for XoroshiroRandom {
    fn is_legacy(&self) -> bool {
        false
    }

    #[inline]
    fn next_bits(&mut self, bits: u32) -> u64 {
        self.next_u64() >> (64 - bits)
    }

    /// Lowest bit, not highest.
    fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    /// Lemire's multiply-and-reject over 32-bit draws.
    fn next_u32_bound(&mut self, bound: u32) -> u32 {
        let mut product = u64::from(self.next_u32()) * u64::from(bound);
        if (product as u32) < bound {
            let threshold = bound.wrapping_neg() % bound;
            while (product as u32) < threshold {
                product = u64::from(self.next_u32()) * u64::from(bound);
            }
        }
        (product >> 32) as u32
    }

    fn fork(&mut self) -> Self {
        let lo = self.next_u64();
        let hi = self.next_u64();
        Self::from_u128_seed(lo, hi)
    }

    fn fork_hash(&mut self, seed: impl AsRef<[u8]>) -> Self {
        let lo = self.next_u64();
        let hi = self.next_u64();
        let (key_lo, key_hi) = md5_halves(seed);
        Self::from_u128_seed(lo ^ key_lo, hi ^ key_hi)
    }
}

impl RngCore for XoroshiroRandom {
    /// Low half of the next 64-bit output.
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u64() as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
}
