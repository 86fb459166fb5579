use crate::noise::improved_noise::{ImprovedNoise, LEGACY_DRAWS};
use voxgen_random::Random;

/// Sum of gradient-noise octaves, lowest frequency first.
///
/// Octave `i` is sampled at `lacunarity * 2^i` and weighted by
/// `amplitudes[i] * persistence / 2^i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OctavePerlinNoise {
    lacunarity: f64,
    persistence: f64,
    amplitudes: Vec<f64>,
    octave_samplers: Vec<Option<ImprovedNoise>>,
}

impl OctavePerlinNoise {
    /// Builds the octave samplers.
    ///
    /// Legacy construction draws every octave from one sequential stream,
    /// highest frequency first, and needs `first_octave <= 0` with at most
    /// `1 - first_octave` amplitudes.
    pub fn new<T>(random: &mut T, first_octave: i32, amplitudes: Vec<f64>, legacy: bool) -> Self
    where
        T: Random,
    {
        let mut octave_samplers = vec![None; amplitudes.len()];

        if !legacy {
            for (i, value) in amplitudes.iter().enumerate() {
                if *value != 0.0 {
                    let octave = (i as i32) + first_octave;
                    let mut octave_random = random
                        .clone()
                        .fork_hash(format!("octave_{}", octave).as_bytes());
                    octave_samplers[i] = Some(ImprovedNoise::from_random(&mut octave_random));
                }
            }
            random.fork();
        } else {
            for i in (0..=-first_octave.min(0)).rev() {
                let i = i as usize;
                if amplitudes.get(i).is_some_and(|a| *a != 0.0) {
                    octave_samplers[i] = Some(ImprovedNoise::from_random(random));
                } else {
                    for _ in 0..LEGACY_DRAWS {
                        random.next_i32();
                    }
                }
            }
        }

        let scale = 2.0_f64;
        let lacunarity = scale.powi(first_octave);
        let a = scale.powf(amplitudes.len() as f64 - 1.0);
        let b = scale.powf(amplitudes.len() as f64) - 1.0;
        let persistence = a / b;

        Self {
            lacunarity,
            persistence,
            amplitudes,
            octave_samplers,
        }
    }

    pub fn octaves(&self) -> usize {
        self.octave_samplers.len()
    }

    pub fn edge_value(&self, scale: f64) -> f64 {
        let mut value = 0.0;
        let mut factor = self.persistence;
        for (sampler, amplitude) in self.octave_samplers.iter().zip(&self.amplitudes) {
            if sampler.is_some() {
                value += amplitude * scale * factor;
            }
            factor *= 0.5;
        }
        value
    }

    #[inline(always)]
    pub fn maintain_precision(value: f64) -> f64 {
        const FACTOR: f64 = 3.3554432E7;
        value - (value / FACTOR + 0.5).floor() * FACTOR
    }

    #[inline]
    pub fn get(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut lx = x * self.lacunarity;
        let mut ly = y * self.lacunarity;
        let mut lz = z * self.lacunarity;
        let mut persistence = self.persistence;
        let mut acc = 0.0;
        for (sampler, amplitude) in self.octave_samplers.iter().zip(&self.amplitudes) {
            if let Some(sampler) = sampler {
                let sample = sampler.sample(
                    Self::maintain_precision(lx),
                    Self::maintain_precision(ly),
                    Self::maintain_precision(lz),
                );
                acc = sample.mul_add(persistence * amplitude, acc);
            }
            lx *= 2.0;
            ly *= 2.0;
            lz *= 2.0;
            persistence *= 0.5;
        }
        acc
    }
}

#[cfg(test)]
mod test {
    use crate::noise::octave_perlin_noise::OctavePerlinNoise;
    use voxgen_random::legacy::LegacyRandom;
    use voxgen_random::xoroshiro::XoroshiroRandom;

    #[test]
    fn sample_legacy() {
        let mut random = LegacyRandom::new(381);
        let noise = OctavePerlinNoise::new(&mut random, -6, vec![1.0, 1.0], true);

        assert_eq!(
            format!("{:.4}", noise.get(0.0, 0.0, 0.0)),
            format!("{:.4}", 0.02904968471563733)
        );
        assert_eq!(
            format!("{:.4}", noise.get(0.5, 4.0, -2.0)),
            format!("{:.4}", -0.003498819899307167)
        );
        assert_eq!(
            format!("{:.4}", noise.get(-204.0, 28.0, 12.0)),
            format!("{:.4}", 0.19407799903721645)
        );
    }

    #[test]
    fn unit_amplitudes_have_unit_edge() {
        let mut random = XoroshiroRandom::new(5);
        let noise = OctavePerlinNoise::new(&mut random, -7, vec![1.0; 8], false);
        assert_eq!(noise.octaves(), 8);
        assert!((noise.edge_value(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn silent_octaves_are_skipped() {
        let mut random = LegacyRandom::new(11);
        let noise = OctavePerlinNoise::new(&mut random, -2, vec![0.0, 0.0, 0.0], true);
        assert_eq!(noise.edge_value(1.0), 0.0);
        assert_eq!(noise.get(12.5, -3.0, 7.25), 0.0);
    }

    #[test]
    fn precision_wrap_keeps_small_values() {
        assert_eq!(OctavePerlinNoise::maintain_precision(12.5), 12.5);
        let far = 3.3554432E7 * 3.0 + 1.5;
        assert!((OctavePerlinNoise::maintain_precision(far) - 1.5).abs() < 1e-6);
    }
}
