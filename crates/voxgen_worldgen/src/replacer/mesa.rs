use crate::block::BlockId;
use crate::field::ScalarField;
use crate::noise::NoiseChannel;
use crate::proto::MesaSurfaceProto;
use crate::replacer::{ColumnMemo, ColumnNoise, VoxelContext};
use std::f64::consts::PI;
use voxgen_random::Random;
use voxgen_random::legacy::LegacyRandom;

const BAND_COUNT: usize = 64;

/// Clay band sequence picked by `random`.
fn generate_bands(random: &mut LegacyRandom) -> Vec<BlockId> {
    let mut bands = vec![BlockId::HARDENED_CLAY; BAND_COUNT];

    let mut at = 0;
    while at < BAND_COUNT {
        at += random.next_i32_bound(5) as usize + 1;
        if at < BAND_COUNT {
            bands[at] = BlockId::ORANGE_CLAY;
        }
        at += 1;
    }

    for (block, min_width) in [
        (BlockId::YELLOW_CLAY, 1),
        (BlockId::BROWN_CLAY, 2),
        (BlockId::RED_CLAY, 1),
    ] {
        let stripes = random.next_i32_bound(4) + 2;
        for _ in 0..stripes {
            let width = (random.next_i32_bound(3) + min_width) as usize;
            let start = random.next_i32_bound(BAND_COUNT as i32) as usize;
            bands
                .iter_mut()
                .skip(start)
                .take(width)
                .for_each(|band| *band = block);
        }
    }

    // thin white stripes, sometimes edged in light gray
    let stripes = random.next_i32_bound(3) + 3;
    let mut at = 0;
    for _ in 0..stripes {
        at += random.next_i32_bound(16) as usize + 4;
        if at >= BAND_COUNT {
            continue;
        }
        bands[at] = BlockId::WHITE_CLAY;
        if at > 1 && random.next_bool() {
            bands[at - 1] = BlockId::LIGHT_GRAY_CLAY;
        }
        if at < BAND_COUNT - 1 && random.next_bool() {
            bands[at + 1] = BlockId::LIGHT_GRAY_CLAY;
        }
    }
    bands
}

#[derive(Clone, Debug, PartialEq)]
struct Pillars {
    noise: NoiseChannel,
    roof: NoiseChannel,
}

impl Pillars {
    /// Pillar top on the reference scale (sea level 64), if a pillar
    /// stands in the column.
    fn top(&self, x: f64, z: f64, noise_depth: f64) -> Option<f64> {
        let scale = noise_depth.abs().min(self.noise.sample(x, 0.0, z));
        if scale <= 0.0 {
            return None;
        }
        let cutoff = (self.roof.sample(x, 0.0, z).abs() * 50.0).ceil() + 14.0;
        Some((scale * scale * 2.5).min(cutoff) + 64.0)
    }
}

/// Badlands surface: stacked clay bands shifted by a slow offset noise,
/// optional pillars rising out of the terrain and an orange rim near the
/// water line.
#[derive(Clone, Debug, PartialEq)]
pub struct MesaRule {
    depth_noise: NoiseChannel,
    band_noise: NoiseChannel,
    pillars: Option<Pillars>,
    bands: Box<[BlockId]>,
    mesa_depth: f64,
    height_offset: f64,
    height_scale: f64,
    water_height: f64,
    forest: bool,
}

impl MesaRule {
    pub fn new(proto: &MesaSurfaceProto, depth_noise: NoiseChannel, world_seed: u64) -> Self {
        let mut random = LegacyRandom::new(world_seed);
        let band_noise = NoiseChannel::new(&proto.clay_bands_noise, random.next_i64() as u64, false);
        let generated = generate_bands(&mut random);
        let bands = match &proto.clay_bands {
            Some(bands) => bands.clone(),
            None => generated,
        };
        let pillar_seed = random.next_i64() as u64;
        let roof_seed = random.next_i64() as u64;
        let pillars = proto.bryce_pillars.then(|| Pillars {
            noise: NoiseChannel::new(&proto.pillar_noise, pillar_seed, false),
            roof: NoiseChannel::new(&proto.pillar_roof_noise, roof_seed, false),
        });
        Self {
            depth_noise,
            band_noise,
            pillars,
            bands: bands.into_boxed_slice(),
            mesa_depth: proto.mesa_depth,
            height_offset: proto.height_offset,
            height_scale: proto.height_scale,
            water_height: proto.water_height,
            forest: proto.forest,
        }
    }

    /// Maps a height on the reference scale into this world.
    fn from_reference(&self, y: f64) -> f64 {
        (y - 64.0) / 64.0 * self.height_scale + self.height_offset
    }

    /// Surface depth, pillar top (`-inf` without a pillar) and band offset.
    fn column(&self, x: i32, z: i32) -> ColumnNoise {
        let (x, z) = (x as f64, z as f64);
        let depth = self.depth_noise.sample(x, 0.0, z);
        let pillar = self
            .pillars
            .as_ref()
            .and_then(|pillars| pillars.top(x, z, depth - 3.0))
            .map_or(f64::NEG_INFINITY, |top| self.from_reference(top));
        [depth, pillar, self.band_noise.sample(x, 0.0, z)]
    }

    fn band(&self, y: i32, offset: f64) -> BlockId {
        let shift = (offset * 2.0).round() as i64;
        let len = self.bands.len() as i64;
        self.bands[(i64::from(y) + shift + 64).rem_euclid(len) as usize]
    }

    #[inline]
    pub fn apply(&self, prev: BlockId, ctx: &VoxelContext, column: &ColumnMemo) -> BlockId {
        let mut density = ctx.density;
        if density < 0.0 {
            return prev;
        }
        let (x, y, z) = (ctx.pos.x, ctx.pos.y, ctx.pos.z);
        let [depth, pillar, band_offset] = column.get(x, z, || self.column(x, z));
        let fy = y as f64;
        if fy < pillar {
            density = density.max(pillar - fy);
        }

        let coarse = ((depth - 3.0) * PI).cos() > 0.0;
        let (mut top, mut filler) = if depth < 0.0 {
            (BlockId::AIR, BlockId::STONE)
        } else {
            (BlockId::WHITE_CLAY, ctx.surface.filler)
        };
        if fy >= self.water_height - 1.0 {
            if self.forest && fy >= self.from_reference(86.0) + depth * 2.0 {
                top = if coarse { BlockId::COARSE_DIRT } else { BlockId::GRASS };
                filler = self.band(y, band_offset);
            } else if fy > self.water_height + 3.0 + depth {
                filler = self.band(y, band_offset);
                top = if coarse { BlockId::HARDENED_CLAY } else { filler };
            } else {
                top = BlockId::ORANGE_CLAY;
                filler = BlockId::ORANGE_CLAY;
            }
        }

        let dy = ctx.gradient.y;
        if density + dy <= 0.0 {
            return top;
        }
        if density / dy.abs() < self.mesa_depth {
            return filler;
        }
        prev
    }
}

#[cfg(test)]
mod test {
    use crate::biome::{BiomeId, SurfaceBlocks};
    use crate::block::BlockId;
    use crate::noise::{NoiseChannel, NoiseParam};
    use crate::proto::MesaSurfaceProto;
    use crate::replacer::mesa::{MesaRule, generate_bands};
    use crate::replacer::{ColumnMemo, VoxelContext};
    use bevy_math::{DVec3, IVec3};
    use voxgen_random::legacy::LegacyRandom;

    const BANDS: [BlockId; 3] = [BlockId::RED_CLAY, BlockId::YELLOW_CLAY, BlockId::BROWN_CLAY];

    fn constant(value: f64) -> NoiseParam {
        NoiseParam::new([0.01, 0.0, 0.01], 1, 0.0, value)
    }

    fn rule(depth: f64, proto: MesaSurfaceProto) -> MesaRule {
        let proto = MesaSurfaceProto {
            clay_bands: Some(BANDS.to_vec()),
            clay_bands_noise: constant(0.0),
            ..proto
        };
        MesaRule::new(&proto, NoiseChannel::new(&constant(depth), 0, false), 1)
    }

    fn ctx(y: i32, density: f64) -> VoxelContext {
        VoxelContext {
            biome: BiomeId(37),
            surface: SurfaceBlocks {
                top: BlockId::RED_SAND,
                filler: BlockId::RED_SAND,
            },
            pos: IVec3::new(5, y, -3),
            gradient: DVec3::new(0.0, -1.0, 0.0),
            density,
        }
    }

    fn apply(rule: &MesaRule, prev: BlockId, ctx: &VoxelContext) -> BlockId {
        rule.apply(prev, ctx, &ColumnMemo::default())
    }

    #[test]
    fn band_lookup_wraps_and_shifts() {
        let rule = rule(3.0, MesaSurfaceProto::default());
        assert_eq!(rule.band(0, 0.0), BlockId::YELLOW_CLAY);
        assert_eq!(rule.band(0, 0.5), BlockId::BROWN_CLAY);
        assert_eq!(rule.band(0, -0.74), BlockId::RED_CLAY);
        assert_eq!(rule.band(-70, 0.0), BlockId::RED_CLAY);
        assert_eq!(rule.band(i32::MAX, 0.0), BlockId::BROWN_CLAY);
    }

    #[test]
    fn generated_bands_follow_the_seed() {
        let a = generate_bands(&mut LegacyRandom::new(42));
        let b = generate_bands(&mut LegacyRandom::new(42));
        let c = generate_bands(&mut LegacyRandom::new(43));
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.contains(&BlockId::ORANGE_CLAY));
        assert!(a.contains(&BlockId::HARDENED_CLAY));
        assert!(a.contains(&BlockId::WHITE_CLAY));
    }

    #[test]
    fn air_above_picks_the_top_block() {
        let rule = rule(3.0, MesaSurfaceProto::default());
        // high above the water: hardened clay where the surface noise is coarse
        assert_eq!(apply(&rule, BlockId::STONE, &ctx(70, 0.5)), BlockId::HARDENED_CLAY);
        // just above the water line
        assert_eq!(apply(&rule, BlockId::STONE, &ctx(64, 0.5)), BlockId::ORANGE_CLAY);
        // below it
        assert_eq!(apply(&rule, BlockId::STONE, &ctx(50, 0.5)), BlockId::WHITE_CLAY);
        // negative surface depth strips the top
        let bare = self::rule(-1.0, MesaSurfaceProto::default());
        assert_eq!(apply(&bare, BlockId::STONE, &ctx(50, 0.5)), BlockId::AIR);
        // air stays air
        assert_eq!(apply(&rule, BlockId::AIR, &ctx(70, -0.5)), BlockId::AIR);
    }

    #[test]
    fn forest_tops_above_the_tree_line() {
        let forest = rule(
            4.0,
            MesaSurfaceProto {
                forest: true,
                ..Default::default()
            },
        );
        assert_eq!(apply(&forest, BlockId::STONE, &ctx(100, 0.5)), BlockId::GRASS);
        // under the tree line the plain band rules apply
        assert_eq!(apply(&forest, BlockId::STONE, &ctx(80, 0.5)), BlockId::RED_CLAY);
    }

    #[test]
    fn filler_reaches_mesa_depth() {
        let rule = rule(3.0, MesaSurfaceProto::default());
        // (70 + 64) % 3 == 2
        assert_eq!(apply(&rule, BlockId::STONE, &ctx(70, 10.0)), BlockId::BROWN_CLAY);
        assert_eq!(apply(&rule, BlockId::STONE, &ctx(70, 20.0)), BlockId::STONE);
        // under the water line the biome filler is used
        assert_eq!(apply(&rule, BlockId::STONE, &ctx(50, 5.0)), BlockId::RED_SAND);
    }

    #[test]
    fn pillars_raise_the_density() {
        let pillars = MesaSurfaceProto {
            bryce_pillars: true,
            pillar_noise: constant(10.0),
            pillar_roof_noise: constant(0.5),
            ..Default::default()
        };
        // depth 9: pillar scale min(6, 10), height min(90, 39) + 64 = 103
        let tall = rule(9.0, pillars);
        let flat = rule(9.0, MesaSurfaceProto::default());

        // (95 + 64) % 3 == 0
        assert_eq!(apply(&tall, BlockId::STONE, &ctx(95, 0.0)), BlockId::RED_CLAY);
        assert_eq!(apply(&flat, BlockId::STONE, &ctx(95, 0.0)), BlockId::HARDENED_CLAY);
        // above the pillar top nothing changes
        assert_eq!(apply(&tall, BlockId::STONE, &ctx(110, 0.0)), BlockId::HARDENED_CLAY);
        // deep inside the pillar the density passes mesa depth
        assert_eq!(apply(&tall, BlockId::STONE, &ctx(80, 0.0)), BlockId::STONE);
    }
}
