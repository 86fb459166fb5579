//! Block replacers: rules that turn a voxel's density sample into a block.
//!
//! A replacer is a y range plus a [`ReplacerRule`]. Outside the range it
//! returns the previous block unchanged. Rules are compiled from
//! [`ReplacerProto`]s into the narrowest variant that expresses them, so the
//! per-voxel match stays cheap.

pub mod decoration;
pub mod filter;
pub mod gradient;
pub mod mesa;
pub mod surface;

use crate::biome::{BiomeId, SurfaceBlocks};
use crate::block::BlockId;
use crate::noise::{NoiseChannel, NoiseParam};
use crate::proto::{ConfigError, DensityRangeProto, ReplacerKind, ReplacerProto};
use crate::replacer::decoration::DecorationRule;
use crate::replacer::filter::BlockFilter;
use crate::replacer::gradient::{GradientRule, UserFunction};
use crate::replacer::mesa::MesaRule;
use crate::replacer::surface::SurfaceRule;
use bevy_math::{DVec3, IVec3};
use std::cell::Cell;
use voxgen_random::hash::combine_seeds_for_noise;

/// Everything a replacer may look at for one voxel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelContext {
    pub biome: BiomeId,
    pub surface: SurfaceBlocks,
    pub pos: IVec3,
    /// Forward differences of density along each axis.
    pub gradient: DVec3,
    pub density: f64,
}

impl VoxelContext {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.density.is_finite() && self.gradient.is_finite()
    }
}

/// Flat noise values a rule reads once per column, in the order the rule
/// fills them.
pub type ColumnNoise = [f64; 3];

/// The last column a rule sampled its flat noise for.
///
/// Workers visit voxels column by column, so one entry per rule catches
/// nearly every repeat. A key mismatch always resamples.
#[derive(Clone, Debug, Default)]
pub struct ColumnMemo(Cell<Option<(i32, i32, ColumnNoise)>>);

impl ColumnMemo {
    #[inline]
    pub fn get(&self, x: i32, z: i32, sample: impl FnOnce() -> ColumnNoise) -> ColumnNoise {
        if let Some((cx, cz, values)) = self.0.get()
            && cx == x
            && cz == z
        {
            return values;
        }
        let values = sample();
        self.0.set(Some((x, z, values)));
        values
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReplacerRule {
    Noop,
    Always(BlockId),
    /// `density > threshold`.
    Above {
        threshold: f64,
        inside: Option<BlockId>,
        outside: Option<BlockId>,
    },
    /// `density <= threshold`.
    Below {
        threshold: f64,
        inside: Option<BlockId>,
        outside: Option<BlockId>,
    },
    /// `min < density < max`.
    Window {
        min: f64,
        max: f64,
        inside: Option<BlockId>,
        outside: Option<BlockId>,
    },
    /// Replaces every block the filter accepts.
    Filtered { filter: BlockFilter, block: BlockId },
    /// Window test on blocks the filter accepts; unbounded sides are infinite.
    FilteredWindow {
        filter: BlockFilter,
        min: f64,
        max: f64,
        inside: Option<BlockId>,
        outside: Option<BlockId>,
    },
    Surface(Box<SurfaceRule>),
    Mesa(Box<MesaRule>),
    Decoration(Box<DecorationRule>),
    Gradient(Box<GradientRule>),
}

impl ReplacerRule {
    /// Applies the rule, ignoring the replacer's y range.
    #[inline]
    pub fn apply(&self, prev: BlockId, ctx: &VoxelContext) -> BlockId {
        self.apply_in(prev, ctx, &ColumnMemo::default())
    }

    /// [`apply`](Self::apply) with flat noise served from `column`.
    #[inline]
    pub fn apply_in(&self, prev: BlockId, ctx: &VoxelContext, column: &ColumnMemo) -> BlockId {
        let density = ctx.density;
        match self {
            ReplacerRule::Noop => prev,
            ReplacerRule::Always(block) => *block,
            ReplacerRule::Above {
                threshold,
                inside,
                outside,
            } => pick(density > *threshold, *inside, *outside, prev),
            ReplacerRule::Below {
                threshold,
                inside,
                outside,
            } => pick(density <= *threshold, *inside, *outside, prev),
            ReplacerRule::Window {
                min,
                max,
                inside,
                outside,
            } => pick(*min < density && density < *max, *inside, *outside, prev),
            ReplacerRule::Filtered { filter, block } => {
                if filter.test(prev) {
                    *block
                } else {
                    prev
                }
            }
            ReplacerRule::FilteredWindow {
                filter,
                min,
                max,
                inside,
                outside,
            } => {
                if !filter.test(prev) {
                    return prev;
                }
                pick(*min < density && density < *max, *inside, *outside, prev)
            }
            ReplacerRule::Surface(rule) => rule.apply(prev, ctx, column),
            ReplacerRule::Mesa(rule) => rule.apply(prev, ctx, column),
            ReplacerRule::Decoration(rule) => rule.apply(prev, ctx, column),
            ReplacerRule::Gradient(rule) => rule.apply(prev, ctx.pos.x, ctx.pos.y, ctx.pos.z),
        }
    }
}

#[inline(always)]
fn pick(condition: bool, inside: Option<BlockId>, outside: Option<BlockId>, prev: BlockId) -> BlockId {
    (if condition { inside } else { outside }).unwrap_or(prev)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Replacer {
    pub min_y: i32,
    pub max_y: i32,
    pub rule: ReplacerRule,
}

impl Replacer {
    pub fn new(min_y: i32, max_y: i32, rule: ReplacerRule) -> Self {
        Self { min_y, max_y, rule }
    }

    /// Compiles one configured replacer. `index` only labels errors.
    pub fn build(
        proto: &ReplacerProto,
        world_seed: u64,
        legacy: bool,
        index: usize,
    ) -> Result<Replacer, ConfigError> {
        let rule = match &proto.kind {
            ReplacerKind::DensityRange(range) => {
                let rule = compile_density_range(range);
                if matches!(rule, ReplacerRule::Always(_)) && proto.min_y > proto.max_y {
                    return Err(ConfigError::replacer(
                        index,
                        format!(
                            "unconditional replacement with an empty y range {}..={}",
                            proto.min_y, proto.max_y
                        ),
                    ));
                }
                rule
            }
            ReplacerKind::MainSurface(surface) => {
                let noise = replacer_noise(&surface.depth_noise, world_seed, surface.seed, legacy);
                ReplacerRule::Surface(Box::new(SurfaceRule::new(surface, noise)))
            }
            ReplacerKind::MesaSurface(mesa) => {
                let noise = replacer_noise(&mesa.depth_noise, world_seed, mesa.seed, legacy);
                ReplacerRule::Mesa(Box::new(MesaRule::new(mesa, noise, world_seed)))
            }
            ReplacerKind::SurfaceDecoration(decoration) => {
                let noise = replacer_noise(&decoration.noise, world_seed, decoration.seed, legacy);
                let rule = DecorationRule::new(decoration, noise, proto.min_y, proto.max_y);
                if rule.is_noop() {
                    ReplacerRule::Noop
                } else {
                    ReplacerRule::Decoration(Box::new(rule))
                }
            }
            ReplacerKind::RandomGradient(gradient) => match gradient.block {
                Some(block) => ReplacerRule::Gradient(Box::new(GradientRule::new(
                    block,
                    UserFunction::new(&gradient.probability),
                    world_seed,
                    gradient.seed,
                ))),
                None => ReplacerRule::Noop,
            },
        };
        Ok(Replacer::new(proto.min_y, proto.max_y, rule))
    }

    #[inline]
    pub fn in_range(&self, y: i32) -> bool {
        self.min_y <= y && y <= self.max_y
    }

    #[inline]
    pub fn replace(&self, prev: BlockId, ctx: &VoxelContext) -> BlockId {
        if !self.in_range(ctx.pos.y) {
            return prev;
        }
        self.rule.apply(prev, ctx)
    }

    /// True when the replacer provably never changes a block.
    ///
    /// Only covers configurations that are cheap to recognize; a `false`
    /// says nothing.
    pub fn always_fails(&self) -> bool {
        self.min_y > self.max_y || matches!(self.rule, ReplacerRule::Noop)
    }
}

fn replacer_noise(param: &NoiseParam, world_seed: u64, seed: i32, legacy: bool) -> NoiseChannel {
    let seed = combine_seeds_for_noise(world_seed, seed) as i64 as u64;
    NoiseChannel::new(param, seed, legacy)
}

/// Picks the narrowest rule equivalent to a density range configuration.
pub fn compile_density_range(proto: &DensityRangeProto) -> ReplacerRule {
    let inside = proto.block_in_range;
    let outside = proto.block_out_of_range;
    let filter = BlockFilter::new(&proto.filter_blocks, proto.filter_type);
    let bounded = proto.min_density.is_some() || proto.max_density.is_some();
    let empty_window = matches!(
        (proto.min_density, proto.max_density),
        (Some(min), Some(max)) if !(min < max)
    );

    if inside.is_none() && outside.is_none() {
        return ReplacerRule::Noop;
    }
    if inside.is_none() && !bounded {
        return ReplacerRule::Noop;
    }
    if outside.is_none() && empty_window {
        return ReplacerRule::Noop;
    }
    if filter.as_ref().is_some_and(BlockFilter::rejects_all) {
        return ReplacerRule::Noop;
    }

    match filter {
        None => match (proto.min_density, proto.max_density, inside, outside) {
            (None, None, Some(block), _) => ReplacerRule::Always(block),
            (Some(_), Some(_), _, Some(block)) if empty_window => ReplacerRule::Always(block),
            (Some(threshold), None, _, _) => ReplacerRule::Above {
                threshold,
                inside,
                outside,
            },
            (None, Some(threshold), _, _) => ReplacerRule::Below {
                threshold,
                inside,
                outside,
            },
            (Some(min), Some(max), _, _) => ReplacerRule::Window {
                min,
                max,
                inside,
                outside,
            },
            (None, None, None, _) => ReplacerRule::Noop,
        },
        Some(filter) => match (bounded, inside) {
            (false, Some(block)) => ReplacerRule::Filtered { filter, block },
            _ => ReplacerRule::FilteredWindow {
                filter,
                min: proto.min_density.unwrap_or(f64::NEG_INFINITY),
                max: proto.max_density.unwrap_or(f64::INFINITY),
                inside,
                outside,
            },
        },
    }
}
