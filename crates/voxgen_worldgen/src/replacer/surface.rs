use crate::biome::SurfaceBlocks;
use crate::block::BlockId;
use crate::field::ScalarField;
use crate::noise::NoiseChannel;
use crate::proto::{DepthThreshold, MainSurfaceProto};
use crate::replacer::{ColumnMemo, VoxelContext};

/// Depth thresholds sorted ascending; the highest one below the surface
/// depth picks the block.
#[derive(Clone, Debug, Default, PartialEq)]
struct Thresholds(Box<[(f64, Option<BlockId>)]>);

impl Thresholds {
    fn new(entries: &[DepthThreshold]) -> Self {
        let mut entries: Vec<_> = entries.iter().map(|e| (e.depth, e.block)).collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));
        Thresholds(entries.into_boxed_slice())
    }

    #[inline]
    fn pick(&self, depth: f64, fallback: BlockId) -> BlockId {
        self.0
            .iter()
            .rev()
            .find(|(threshold, _)| depth > *threshold)
            .and_then(|(_, block)| *block)
            .unwrap_or(fallback)
    }
}

/// Biome top and filler blocks near the density surface, with gravel under
/// deep water and sandstone under sand.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceRule {
    depth_noise: NoiseChannel,
    gradient_weight: f64,
    ocean_level: f64,
    max_depth: f64,
    top: Option<BlockId>,
    filler: Option<BlockId>,
    top_thresholds: Thresholds,
    filler_thresholds: Thresholds,
}

impl SurfaceRule {
    pub fn new(proto: &MainSurfaceProto, depth_noise: NoiseChannel) -> Self {
        Self {
            depth_noise,
            gradient_weight: proto.horizontal_gradient_depth_decrease_weight,
            ocean_level: proto.ocean_level,
            max_depth: proto.max_surface_depth,
            top: proto.top_block,
            filler: proto.filler_block,
            top_thresholds: Thresholds::new(&proto.top_thresholds),
            filler_thresholds: Thresholds::new(&proto.filler_thresholds),
        }
    }

    fn top(&self, surface: SurfaceBlocks, depth: f64) -> BlockId {
        self.top_thresholds
            .pick(depth, self.top.unwrap_or(surface.top))
    }

    fn filler(&self, surface: SurfaceBlocks, depth: f64) -> BlockId {
        self.filler_thresholds
            .pick(depth, self.filler.unwrap_or(surface.filler))
    }

    #[inline]
    pub fn apply(&self, prev: BlockId, ctx: &VoxelContext, column: &ColumnMemo) -> BlockId {
        if prev.is_air() {
            return prev;
        }
        let density = ctx.density;
        let dy = ctx.gradient.y;
        if density > self.max_depth * dy.abs() || density < 0.0 {
            return prev;
        }

        let y = ctx.pos.y as f64;
        let (x, z) = (ctx.pos.x, ctx.pos.z);
        let depth = column.get(x, z, || {
            [self.depth_noise.sample(x as f64, 0.0, z as f64), 0.0, 0.0]
        })[0];

        if density + dy <= 0.0 {
            // nothing solid above
            if y < self.ocean_level - 7.0 - depth {
                return BlockId::GRAVEL;
            }
            if y < self.ocean_level - 1.0 {
                return if depth > 0.0 {
                    self.filler(ctx.surface, depth)
                } else {
                    prev
                };
            }
            return if depth > 0.0 {
                self.top(ctx.surface, depth)
            } else {
                BlockId::AIR
            };
        }

        let filler = self.filler(ctx.surface, depth);
        let horizontal = ctx.gradient.x.hypot(ctx.gradient.z);
        if dy < 0.0 && density / dy.abs() < depth + 1.0 - self.gradient_weight * horizontal / dy {
            return filler;
        }
        if depth > 1.0 && y > self.ocean_level - depth {
            if filler == BlockId::SAND {
                return BlockId::SANDSTONE;
            }
            if filler == BlockId::RED_SAND {
                return BlockId::RED_SANDSTONE;
            }
        }
        prev
    }
}
