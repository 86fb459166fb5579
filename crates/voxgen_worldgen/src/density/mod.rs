//! Raw terrain density on a coarse grid.
//!
//! Four noise channels and the biome's height and volatility make one
//! density value per grid point; [`expander`] turns the grid into per-voxel
//! samples.

pub mod expander;

use crate::biome::{BiomeError, BiomeProvider};
use crate::field::ScalarField;
use crate::noise::NoiseChannel;
use crate::proto::Settings;
use bevy_math::IVec3;
use voxgen_random::Random;
use voxgen_random::legacy::LegacyRandom;

/// Edge length of a region in blocks.
pub const REGION_SIZE: i32 = 16;
pub const REGION_VOLUME: usize = (REGION_SIZE * REGION_SIZE * REGION_SIZE) as usize;

const TERRAIN_CACHE_SIZE: usize = 4096;
const DEPTH_CACHE_SIZE: usize = 256;

/// Index of a local voxel in a region array.
#[inline]
pub fn voxel_index(x: i32, y: i32, z: i32) -> usize {
    ((y << 8) | (z << 4) | x) as usize
}

/// Density samples for one region, indexed `[x][z][y]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CoarseGrid {
    scale: IVec3,
    size: IVec3,
    values: Box<[f64]>,
}

impl CoarseGrid {
    /// `scale` must divide [`REGION_SIZE`] on every axis.
    pub fn new(scale: IVec3) -> Self {
        let size = IVec3::splat(REGION_SIZE) / scale + 1;
        Self {
            scale,
            size,
            values: vec![0.0; (size.x * size.y * size.z) as usize].into_boxed_slice(),
        }
    }

    pub fn scale(&self) -> IVec3 {
        self.scale
    }

    /// Points per axis, margin included.
    pub fn size(&self) -> IVec3 {
        self.size
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        ((x * self.size.z + z) * self.size.y + y) as usize
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> f64 {
        self.values[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: f64) {
        let index = self.index(x, y, z);
        self.values[index] = value;
    }

    /// The eight corners of cell `(x, y, z)`, indexed `dx | dy << 1 | dz << 2`.
    pub fn corners(&self, x: i32, y: i32, z: i32) -> [f64; 8] {
        let mut corners = [0.0; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let i = i as i32;
            *corner = self.get(x + (i & 1), y + ((i >> 1) & 1), z + ((i >> 2) & 1));
        }
        corners
    }
}

/// Post-processing of the raw depth channel.
pub fn depth_curve(raw: f64) -> f64 {
    let mut d = raw;
    if d < 0.0 {
        d *= -0.3;
    }
    d = (d * 3.0 - 2.0).clamp(-2.0, 1.0);
    if d < 0.0 {
        d /= 5.6;
    } else {
        d /= 8.0;
    }
    d * 0.2 * 17.0 / 64.0
}

/// Evaluates the terrain density function. Holds memo caches, so each
/// worker owns its own sampler.
pub struct DensitySampler {
    terrain: Box<dyn ScalarField + Send>,
    depth: Box<dyn ScalarField + Send>,
    scale: IVec3,
    height_factor: f64,
    height_offset: f64,
    variation_factor: f64,
    variation_offset: f64,
    below_average_damping: f64,
}

impl DensitySampler {
    pub fn new(seed: u64, settings: &Settings) -> Self {
        let legacy = settings.legacy_random_source;
        let mut random = LegacyRandom::new(seed);
        let selector = NoiseChannel::new(&settings.selector_noise, random.next_i64() as u64, legacy);
        let low = NoiseChannel::new(&settings.low_noise, random.next_i64() as u64, legacy);
        let high = NoiseChannel::new(&settings.high_noise, random.next_i64() as u64, legacy);
        let depth = NoiseChannel::new(&settings.depth_noise, random.next_i64() as u64, legacy);

        let [sx, sy, sz] = settings.grid_scale;
        let scale = IVec3::new(sx, sy, sz);
        let terrain = selector.clamp(0.0, 1.0).lerp(low, high).cached3d(
            TERRAIN_CACHE_SIZE,
            move |p: IVec3| {
                (p.x / sx)
                    .wrapping_add((p.z / sz).wrapping_mul(5))
                    .wrapping_add((p.y / sy).wrapping_mul(25))
            },
        );
        let depth = depth.map(depth_curve).cached2d(DEPTH_CACHE_SIZE, move |p: IVec3| {
            (p.x / sx).wrapping_add((p.z / sz).wrapping_mul(5))
        });

        Self {
            terrain: Box::new(terrain),
            depth: Box::new(depth),
            scale,
            height_factor: settings.height_factor,
            height_offset: settings.height_offset,
            variation_factor: settings.height_variation_factor,
            variation_offset: settings.height_variation_offset,
            below_average_damping: settings.special_height_variation_factor_below_average_y,
        }
    }

    pub fn scale(&self) -> IVec3 {
        self.scale
    }

    /// Density at one block position given the biome's normalized height
    /// and volatility for its column.
    pub fn sample(&self, x: f64, y: f64, z: f64, biome_height: f64, biome_volatility: f64) -> f64 {
        let height = biome_height.mul_add(self.height_factor, self.height_offset);
        let damping = if height > y {
            self.below_average_damping
        } else {
            1.0
        };
        let volatility = (biome_volatility * damping).mul_add(self.variation_factor, self.variation_offset);
        let depth = self.depth.sample(x, 0.0, z);
        let density = (self.terrain.sample(x, y, z) + depth).mul_add(volatility, height);
        if volatility > 0.0 {
            density - y
        } else {
            density + y
        }
    }

    /// Fills `grid` for the region whose lowest corner is block `origin`.
    pub fn fill_grid(
        &self,
        origin: IVec3,
        biomes: &dyn BiomeProvider,
        grid: &mut CoarseGrid,
    ) -> Result<(), BiomeError> {
        let size = grid.size();
        let scale = grid.scale();
        for gx in 0..size.x {
            for gz in 0..size.z {
                let x = origin.x + gx * scale.x;
                let z = origin.z + gz * scale.z;
                let (height, volatility) = biomes.column_at(x, z)?;
                for gy in 0..size.y {
                    let y = origin.y + gy * scale.y;
                    let density = self.sample(x as f64, y as f64, z as f64, height, volatility);
                    grid.set(gx, gy, gz, density);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::biome::{BiomeDesc, BiomeError, BiomeId, BiomeProvider, SurfaceBlocks, UniformBiomes};
    use crate::block::BlockId;
    use crate::density::{CoarseGrid, DensitySampler, depth_curve, voxel_index};
    use crate::proto::Settings;
    use bevy_math::IVec3;

    #[test]
    fn grid_shape_follows_scale() {
        let grid = CoarseGrid::new(IVec3::new(4, 8, 4));
        assert_eq!(grid.size(), IVec3::new(5, 3, 5));
        let grid = CoarseGrid::new(IVec3::new(8, 16, 2));
        assert_eq!(grid.size(), IVec3::new(3, 2, 9));
    }

    #[test]
    fn corners_are_ordered_by_axis_bits() {
        let mut grid = CoarseGrid::new(IVec3::new(4, 8, 4));
        for x in 0..5 {
            for z in 0..5 {
                for y in 0..3 {
                    grid.set(x, y, z, (x * 100 + y * 10 + z) as f64);
                }
            }
        }
        assert_eq!(
            grid.corners(1, 1, 2),
            [112.0, 212.0, 122.0, 222.0, 113.0, 213.0, 123.0, 223.0]
        );
    }

    #[test]
    fn voxel_layout() {
        assert_eq!(voxel_index(0, 0, 0), 0);
        assert_eq!(voxel_index(15, 0, 0), 15);
        assert_eq!(voxel_index(0, 0, 1), 16);
        assert_eq!(voxel_index(0, 1, 0), 256);
        assert_eq!(voxel_index(15, 15, 15), 4095);
    }

    #[test]
    fn depth_curve_is_bounded() {
        for i in -400..400 {
            let d = depth_curve(i as f64 * 0.05);
            assert!((-2.0 / 5.6 * 0.2 * 17.0 / 64.0 - 1e-12..=1.0 / 8.0 * 0.2 * 17.0 / 64.0 + 1e-12).contains(&d));
        }
        assert_eq!(depth_curve(1.0), 1.0 / 8.0 * 0.2 * 17.0 / 64.0);
    }

    #[test]
    fn flat_settings_give_a_flat_surface() {
        let mut settings = Settings::default();
        for noise in [
            &mut settings.selector_noise,
            &mut settings.low_noise,
            &mut settings.high_noise,
            &mut settings.depth_noise,
        ] {
            noise.factor = 0.0;
        }
        let sampler = DensitySampler::new(1, &settings);
        let depth = depth_curve(0.0);
        // height 64; volatility 64, damped to 16 below the average height
        for y in [0.0, 40.0, 64.0, 100.0] {
            let volatility = if y < 64.0 { 16.0 } else { 64.0 };
            let d = sampler.sample(10.0, y, -3.0, 0.0, 1.0);
            assert!((d - (depth * volatility + 64.0 - y)).abs() < 1e-9, "{y}: {d}");
        }
    }

    #[test]
    fn negative_volatility_flips_the_height_term() {
        let mut settings = Settings::default();
        settings.selector_noise.factor = 0.0;
        settings.low_noise.factor = 0.0;
        settings.high_noise.factor = 0.0;
        settings.depth_noise.factor = 0.0;
        let sampler = DensitySampler::new(5, &settings);
        let d = sampler.sample(0.0, 100.0, 0.0, 0.0, -1.0);
        let depth = depth_curve(0.0);
        assert!((d - (depth * -64.0 + 64.0 + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn samplers_agree_across_instances() {
        let settings = Settings::default();
        let a = DensitySampler::new(77, &settings);
        let b = DensitySampler::new(77, &settings);
        let biomes = UniformBiomes::new(
            BiomeId(1),
            BiomeDesc::new(0.1, 0.3, BlockId::GRASS, BlockId::DIRT),
        );
        let mut ga = CoarseGrid::new(a.scale());
        let mut gb = CoarseGrid::new(b.scale());
        a.fill_grid(IVec3::new(32, 48, -16), &biomes, &mut ga).unwrap();
        // warm caches must not change results
        a.fill_grid(IVec3::new(32, 48, -16), &biomes, &mut ga).unwrap();
        b.fill_grid(IVec3::new(32, 48, -16), &biomes, &mut gb).unwrap();
        assert_eq!(ga, gb);
    }

    struct Broken;

    impl BiomeProvider for Broken {
        fn height_at(&self, x: i32, z: i32) -> Result<f64, BiomeError> {
            Err(BiomeError::Unavailable { x, z })
        }

        fn volatility_at(&self, _x: i32, _z: i32) -> Result<f64, BiomeError> {
            Ok(0.0)
        }

        fn biome_at(&self, _x: i32, _z: i32) -> Result<BiomeId, BiomeError> {
            Ok(BiomeId(0))
        }

        fn surface_blocks(&self, _biome: BiomeId) -> SurfaceBlocks {
            SurfaceBlocks::default()
        }
    }

    #[test]
    fn provider_errors_propagate() {
        let sampler = DensitySampler::new(0, &Settings::default());
        let mut grid = CoarseGrid::new(sampler.scale());
        assert_eq!(
            sampler.fill_grid(IVec3::new(16, 0, 32), &Broken, &mut grid),
            Err(BiomeError::Unavailable { x: 16, z: 32 })
        );
    }
}
