//! Murmur3-style integer mixing for order-independent, position-keyed randomness.
//!
//! All arithmetic wraps at 32 bits so that results are reproducible across
//! implementations of the preset format.

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;
const R1: u32 = 15;
const R2: u32 = 13;
const M: u32 = 5;
const N: u32 = 0xe6546b64;

/// Mixes one 32-bit word into `hash`.
#[inline]
pub fn hash_int(hash: u32, value: u32) -> u32 {
    let hash = hash ^ value.wrapping_mul(C1).rotate_left(R1).wrapping_mul(C2);
    hash.rotate_left(R2).wrapping_mul(M).wrapping_add(N)
}

#[inline]
pub fn hash_coords(hash: u32, x: i32, y: i32, z: i32) -> u32 {
    let hash = hash_int(hash, x as u32);
    let hash = hash_int(hash, y as u32);
    hash_int(hash, z as u32)
}

#[inline]
pub fn finalize(mut hash: u32) -> u32 {
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^ (hash >> 16)
}

/// Seed for a noise generator owned by a feature with its own small seed.
pub fn combine_seeds_for_noise(world_seed: u64, feature_seed: i32) -> i32 {
    finalize(hash_coords(
        0,
        world_seed as i32,
        (world_seed >> 32) as i32,
        feature_seed,
    )) as i32
}

/// Starting hash for per-voxel decisions of one feature.
pub fn feature_hash_init(world_seed: u64, feature_seed: i32) -> u32 {
    let hash = hash_int(world_seed as u32, (world_seed >> 32) as u32);
    hash_int(hash, feature_seed as u32)
}
