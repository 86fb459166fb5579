use crate::block::BlockId;
use crate::field::ScalarField;
use crate::noise::NoiseChannel;
use crate::proto::SurfaceDecorationProto;
use crate::replacer::{ColumnMemo, VoxelContext};

/// Noise-gated blocks on either side of a density crossing: the ground
/// block just below it, the feature block just above.
#[derive(Clone, Debug, PartialEq)]
pub struct DecorationRule {
    ground: Option<BlockId>,
    feature: Option<BlockId>,
    threshold: f64,
    noise: NoiseChannel,
    ground_range: (f64, f64),
    feature_range: (f64, f64),
    min_y: i32,
    max_y: i32,
}

impl DecorationRule {
    pub fn new(proto: &SurfaceDecorationProto, noise: NoiseChannel, min_y: i32, max_y: i32) -> Self {
        Self {
            ground: proto.ground_block,
            feature: proto.feature_block,
            threshold: proto.density_threshold,
            noise,
            ground_range: (proto.ground_min, proto.ground_max),
            feature_range: (proto.feature_min, proto.feature_max),
            min_y,
            max_y,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.ground.is_none() && self.feature.is_none()
    }

    #[inline]
    pub fn apply(&self, prev: BlockId, ctx: &VoxelContext, column: &ColumnMemo) -> BlockId {
        let (x, y, z) = (ctx.pos.x, ctx.pos.y, ctx.pos.z);
        let density = ctx.density;
        let dy = ctx.gradient.y;
        let t = self.threshold;
        let sample = || {
            if self.noise.is_flat() {
                column.get(x, z, || [self.noise.sample(x as f64, 0.0, z as f64), 0.0, 0.0])[0]
            } else {
                self.noise.sample(x as f64, y as f64, z as f64)
            }
        };

        // the block above must still fit inside the range
        if let Some(ground) = self.ground
            && y < self.max_y
            && density > t
            && density + dy <= t
        {
            let v = sample();
            let (min, max) = self.ground_range;
            return if v >= min && v <= max { ground } else { prev };
        }
        if let Some(feature) = self.feature
            && y > self.min_y
            && density <= t
            && density - dy > t
        {
            let v = sample();
            let (min, max) = self.feature_range;
            return if v >= min && v < max { feature } else { prev };
        }
        prev
    }
}

#[cfg(test)]
mod test {
    use crate::biome::{BiomeId, SurfaceBlocks};
    use crate::block::BlockId;
    use crate::noise::{NoiseChannel, NoiseParam};
    use crate::proto::SurfaceDecorationProto;
    use crate::replacer::{ColumnMemo, VoxelContext};
    use crate::replacer::decoration::DecorationRule;
    use bevy_math::{DVec3, IVec3};

    fn constant_noise(value: f64) -> NoiseChannel {
        NoiseChannel::new(&NoiseParam::new([0.1, 0.0, 0.1], 1, 0.0, value), 0, false)
    }

    fn ctx(y: i32, density: f64) -> VoxelContext {
        VoxelContext {
            biome: BiomeId(0),
            surface: SurfaceBlocks::default(),
            pos: IVec3::new(0, y, 0),
            gradient: DVec3::new(0.0, -1.0, 0.0),
            density,
        }
    }

    fn proto() -> SurfaceDecorationProto {
        SurfaceDecorationProto {
            ground_block: Some(BlockId::CLAY),
            feature_block: Some(BlockId::SNOW),
            ..Default::default()
        }
    }

    #[test]
    fn ground_and_feature_straddle_the_crossing() {
        let rule = DecorationRule::new(&proto(), constant_noise(0.5), 0, 100);
        // density 0.5 with dy -1: solid here, air above
        assert_eq!(rule.apply(BlockId::GRASS, &ctx(50, 0.5), &ColumnMemo::default()), BlockId::CLAY);
        // density -0.5 with dy -1: air here, solid below
        assert_eq!(rule.apply(BlockId::AIR, &ctx(51, -0.5), &ColumnMemo::default()), BlockId::SNOW);
        // deep inside or far above
        assert_eq!(rule.apply(BlockId::STONE, &ctx(40, 10.0), &ColumnMemo::default()), BlockId::STONE);
        assert_eq!(rule.apply(BlockId::AIR, &ctx(60, -10.0), &ColumnMemo::default()), BlockId::AIR);
    }

    #[test]
    fn range_edges_block_placement() {
        let rule = DecorationRule::new(&proto(), constant_noise(0.5), 50, 51);
        assert_eq!(rule.apply(BlockId::GRASS, &ctx(51, 0.5), &ColumnMemo::default()), BlockId::GRASS);
        assert_eq!(rule.apply(BlockId::AIR, &ctx(50, -0.5), &ColumnMemo::default()), BlockId::AIR);
    }

    #[test]
    fn noise_outside_window_keeps_previous() {
        let rule = DecorationRule::new(&proto(), constant_noise(1.0), 0, 100);
        // ground window is inclusive, feature window is half-open
        assert_eq!(rule.apply(BlockId::GRASS, &ctx(50, 0.5), &ColumnMemo::default()), BlockId::CLAY);
        assert_eq!(rule.apply(BlockId::AIR, &ctx(51, -0.5), &ColumnMemo::default()), BlockId::AIR);
    }
}
