pub mod improved_noise;
pub mod octave_perlin_noise;
pub mod simplex_noise;

use crate::field::ScalarField;
use crate::noise::octave_perlin_noise::OctavePerlinNoise;
use crate::noise::simplex_noise::OctaveSimplexNoise;
use crate::proto::ConfigError;
use bevy_math::DVec3;
use serde::{Deserialize, Serialize};
use voxgen_random::RandomSource;

pub const MAX_OCTAVES: u32 = 32;

/// Output range of the normalized noise before `factor` and `offset` apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseRange {
    /// Roughly `[-1, 1]`.
    #[default]
    Signed,
    /// Roughly `[0, 1]`.
    Unsigned,
}

/// Gradient noise family behind a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    /// Improved perlin octaves, built from the channel's random source.
    #[default]
    Perlin,
    /// Simplex octaves seeded directly from the channel seed.
    Simplex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParam {
    pub noise_type: NoiseType,
    /// Frequency of the lowest octave per axis, in cycles per block.
    pub frequency: [f64; 3],
    pub octaves: u32,
    pub factor: f64,
    pub offset: f64,
    pub range: NoiseRange,
}

impl Default for NoiseParam {
    fn default() -> Self {
        Self {
            noise_type: NoiseType::Perlin,
            frequency: [1.0 / 64.0; 3],
            octaves: 4,
            factor: 1.0,
            offset: 0.0,
            range: NoiseRange::Signed,
        }
    }
}

impl NoiseParam {
    pub fn new(frequency: [f64; 3], octaves: u32, factor: f64, offset: f64) -> Self {
        Self {
            noise_type: NoiseType::Perlin,
            frequency,
            octaves,
            factor,
            offset,
            range: NoiseRange::Signed,
        }
    }

    pub fn with_range(mut self, range: NoiseRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_type(mut self, noise_type: NoiseType) -> Self {
        self.noise_type = noise_type;
        self
    }

    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(ConfigError::Octaves {
                field: field.to_owned(),
                octaves: self.octaves,
            });
        }
        let axes = ["x", "y", "z"];
        for (axis, value) in axes.iter().zip(self.frequency) {
            ConfigError::check_finite(&format!("{field}.frequency.{axis}"), value)?;
        }
        ConfigError::check_finite(&format!("{field}.factor"), self.factor)?;
        ConfigError::check_finite(&format!("{field}.offset"), self.offset)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Source {
    Perlin {
        noise: OctavePerlinNoise,
        normalize: f64,
    },
    Simplex(OctaveSimplexNoise),
}

/// A seeded, normalized octave noise mapped through `value * factor + offset`.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseChannel {
    source: Source,
    scale: DVec3,
    factor: f64,
    offset: f64,
    range: NoiseRange,
}

impl NoiseChannel {
    pub fn new(param: &NoiseParam, seed: u64, legacy: bool) -> Self {
        let octaves = param.octaves.clamp(1, MAX_OCTAVES);
        let frequency = DVec3::from_array(param.frequency);
        let (source, scale) = match param.noise_type {
            NoiseType::Perlin => {
                let mut random = RandomSource::new(seed, legacy);
                let noise = OctavePerlinNoise::new(
                    &mut random,
                    1 - octaves as i32,
                    vec![1.0; octaves as usize],
                    legacy,
                );
                let edge = noise.edge_value(1.0);
                let normalize = if edge > 0.0 { 1.0 / edge } else { 0.0 };
                // the lowest octave runs at 2^(1 - octaves); stretch it to the configured frequency
                let scale = frequency * 2.0_f64.powi(octaves as i32 - 1);
                (Source::Perlin { noise, normalize }, scale)
            }
            NoiseType::Simplex => (
                Source::Simplex(OctaveSimplexNoise::new(seed, octaves)),
                frequency,
            ),
        };
        Self {
            source,
            scale,
            factor: param.factor,
            offset: param.offset,
            range: param.range,
        }
    }

    /// True when the channel ignores `y`.
    pub fn is_flat(&self) -> bool {
        self.scale.y == 0.0
    }

    /// Normalized noise before `factor` and `offset`.
    #[inline]
    pub fn raw(&self, x: f64, y: f64, z: f64) -> f64 {
        let (x, y, z) = (x * self.scale.x, y * self.scale.y, z * self.scale.z);
        let v = match &self.source {
            Source::Perlin { noise, normalize } => noise.get(x, y, z) * normalize,
            Source::Simplex(noise) => noise.get(x, y, z),
        };
        match self.range {
            NoiseRange::Signed => v,
            NoiseRange::Unsigned => v.mul_add(0.5, 0.5),
        }
    }
}

impl ScalarField for NoiseChannel {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.raw(x, y, z).mul_add(self.factor, self.offset)
    }
}
