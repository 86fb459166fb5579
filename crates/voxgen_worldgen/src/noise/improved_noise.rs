use bevy_math::DVec3;
use voxgen_random::{Random, RandomSource};

const GRADIENTS: [[f64; 3]; 16] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
    [1.0, 1.0, 0.0],
    [0.0, -1.0, 1.0],
    [-1.0, 1.0, 0.0],
    [0.0, -1.0, -1.0],
];

/// Number of 32-bit draws consumed by [`ImprovedNoise::from_random`] on a legacy stream.
pub const LEGACY_DRAWS: usize = 262;

#[derive(Debug, Clone, PartialEq)]
pub struct ImprovedNoise {
    permutation: [u8; 256],
    pub origin: DVec3,
}

impl Default for ImprovedNoise {
    fn default() -> Self {
        Self::from_random(&mut RandomSource::new(0, true))
    }
}

#[inline(always)]
fn grad_dot(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let [gx, gy, gz] = GRADIENTS[(hash & 15) as usize];
    gx.mul_add(x, gy.mul_add(y, gz * z))
}

#[inline(always)]
fn smoothstep(t: f64) -> f64 {
    t * t * t * t.mul_add(t.mul_add(6.0, -15.0), 10.0)
}

#[inline(always)]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    (b - a).mul_add(t, a)
}

impl ImprovedNoise {
    pub fn from_random<T>(random: &mut T) -> Self
    where
        T: Random,
    {
        let origin = DVec3::new(
            random.next_f64() * 256.0,
            random.next_f64() * 256.0,
            random.next_f64() * 256.0,
        );
        let mut permutation = [0u8; 256];
        for (i, p) in permutation.iter_mut().enumerate() {
            *p = i as u8;
        }
        for i in 0..256u32 {
            let j = random.next_u32_bound(256 - i);
            permutation.swap(i as usize, (i + j) as usize);
        }
        Self {
            permutation,
            origin,
        }
    }

    #[inline(always)]
    fn perm(&self, i: i32) -> i32 {
        self.permutation[(i & 0xFF) as usize] as i32
    }

    #[inline]
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let shifted = DVec3::new(x, y, z) + self.origin;
        let section = shifted.floor();
        let local = shifted - section;
        self.sample_and_lerp(
            section.x as i32,
            section.y as i32,
            section.z as i32,
            local,
        )
    }

    #[inline]
    fn sample_and_lerp(&self, sx: i32, sy: i32, sz: i32, local: DVec3) -> f64 {
        let i = self.perm(sx);
        let j = self.perm(sx.wrapping_add(1));
        let k = self.perm(i.wrapping_add(sy));
        let l = self.perm(i.wrapping_add(sy).wrapping_add(1));
        let m = self.perm(j.wrapping_add(sy));
        let n = self.perm(j.wrapping_add(sy).wrapping_add(1));

        let hash = |base: i32, dz: i32| self.perm(base.wrapping_add(sz).wrapping_add(dz)) as u8;
        let DVec3 { x, y, z } = local;
        let d000 = grad_dot(hash(k, 0), x, y, z);
        let d100 = grad_dot(hash(m, 0), x - 1.0, y, z);
        let d010 = grad_dot(hash(l, 0), x, y - 1.0, z);
        let d110 = grad_dot(hash(n, 0), x - 1.0, y - 1.0, z);
        let d001 = grad_dot(hash(k, 1), x, y, z - 1.0);
        let d101 = grad_dot(hash(m, 1), x - 1.0, y, z - 1.0);
        let d011 = grad_dot(hash(l, 1), x, y - 1.0, z - 1.0);
        let d111 = grad_dot(hash(n, 1), x - 1.0, y - 1.0, z - 1.0);

        let fx = smoothstep(x);
        let fy = smoothstep(y);
        let fz = smoothstep(z);
        let l00 = lerp(fx, d000, d100);
        let l10 = lerp(fx, d010, d110);
        let l01 = lerp(fx, d001, d101);
        let l11 = lerp(fx, d011, d111);
        lerp(fz, lerp(fy, l00, l10), lerp(fy, l01, l11))
    }
}
