use ::noise::{Fbm, MultiFractal, NoiseFn, Simplex};

/// Summed simplex octaves, each at twice the frequency and half the
/// amplitude of the one before. The sum is scaled back to about `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct OctaveSimplexNoise {
    seed: u32,
    octaves: usize,
    fbm: Fbm<Simplex>,
}

impl OctaveSimplexNoise {
    pub fn new(seed: u64, octaves: u32) -> Self {
        // both halves of the seed matter
        let seed = seed as u32 ^ (seed >> 32) as u32;
        let octaves = octaves as usize;
        let fbm = Fbm::<Simplex>::new(seed)
            .set_octaves(octaves)
            .set_frequency(1.0)
            .set_lacunarity(2.0)
            .set_persistence(0.5);
        Self { seed, octaves, fbm }
    }

    #[inline]
    pub fn get(&self, x: f64, y: f64, z: f64) -> f64 {
        self.fbm.get([x, y, z])
    }
}

impl PartialEq for OctaveSimplexNoise {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed && self.octaves == other.octaves
    }
}
