//! Per-mask specialization of replacer chains.
//!
//! A [`SpecializedChain`] keeps only the replacers a biome mask enables and
//! that can change a block at all, with each y range folded into a
//! [`YRange`] so unbounded sides cost nothing. [`SpecializedChain::restrict`]
//! goes one step further for a single region: ranges that cover the whole
//! region disappear and ranges that miss it drop their step.

use crate::biome::BiomeId;
use crate::block::BlockId;
use crate::chain::{ReplacerChain, ReplacerMask};
use crate::replacer::{ColumnMemo, ReplacerRule, VoxelContext};
use bitvec::prelude::{BitSlice, Lsb0};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YRange {
    All,
    Exact(i32),
    AtLeast(i32),
    AtMost(i32),
    Between(i32, i32),
}

impl YRange {
    /// The inclusive range `min..=max`, or `None` when it is empty.
    pub fn of(min: i32, max: i32) -> Option<YRange> {
        if min > max {
            return None;
        }
        Some(match (min == i32::MIN, max == i32::MAX) {
            (true, true) => YRange::All,
            (false, true) => YRange::AtLeast(min),
            (true, false) => YRange::AtMost(max),
            (false, false) if min == max => YRange::Exact(min),
            (false, false) => YRange::Between(min, max),
        })
    }

    fn bounds(self) -> (i32, i32) {
        match self {
            YRange::All => (i32::MIN, i32::MAX),
            YRange::Exact(y) => (y, y),
            YRange::AtLeast(min) => (min, i32::MAX),
            YRange::AtMost(max) => (i32::MIN, max),
            YRange::Between(min, max) => (min, max),
        }
    }

    #[inline(always)]
    pub fn contains(self, y: i32) -> bool {
        match self {
            YRange::All => true,
            YRange::Exact(v) => y == v,
            YRange::AtLeast(min) => y >= min,
            YRange::AtMost(max) => y <= max,
            YRange::Between(min, max) => min <= y && y <= max,
        }
    }

    /// This range as seen by voxels in `lo..=hi`: `All` when it covers them,
    /// `None` when it misses them.
    pub fn restrict(self, lo: i32, hi: i32) -> Option<YRange> {
        let (min, max) = self.bounds();
        if max < lo || min > hi {
            None
        } else if min <= lo && max >= hi {
            Some(YRange::All)
        } else {
            Some(self)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Step {
    range: YRange,
    rule: ReplacerRule,
}

/// The live replacers of a chain under one mask, in chain order.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecializedChain {
    steps: Box<[Step]>,
}

impl SpecializedChain {
    pub fn new(chain: &ReplacerChain, mask: &BitSlice<u64, Lsb0>) -> Self {
        let steps = chain
            .replacers()
            .iter()
            .zip(mask.iter().by_vals())
            .filter(|(replacer, enabled)| *enabled && !replacer.always_fails())
            .filter_map(|(replacer, _)| {
                let range = YRange::of(replacer.min_y, replacer.max_y)?;
                Some(Step {
                    range,
                    rule: replacer.rule.clone(),
                })
            })
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[inline]
    pub fn evaluate(&self, prev: BlockId, ctx: &VoxelContext) -> BlockId {
        if !ctx.is_finite() {
            return prev;
        }
        let y = ctx.pos.y;
        let mut block = prev;
        for step in self.steps.iter() {
            if step.range.contains(y) {
                block = step.rule.apply(block, ctx);
            }
        }
        block
    }

    /// The steps that can fire for voxels with `lo <= y <= hi`.
    pub fn restrict(&self, lo: i32, hi: i32) -> RegionPlan<'_> {
        let steps = self
            .steps
            .iter()
            .filter_map(|step| Some((step.range.restrict(lo, hi)?, &step.rule, ColumnMemo::default())))
            .collect();
        RegionPlan { lo, hi, steps }
    }
}

/// A [`SpecializedChain`] narrowed to one vertical span.
///
/// Owned by one worker. Each step remembers the flat noise of the last
/// column it saw.
#[derive(Clone, Debug)]
pub struct RegionPlan<'a> {
    lo: i32,
    hi: i32,
    steps: Vec<(YRange, &'a ReplacerRule, ColumnMemo)>,
}

impl RegionPlan<'_> {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Only valid for voxels inside the span the plan was made for.
    #[inline]
    pub fn evaluate(&self, prev: BlockId, ctx: &VoxelContext) -> BlockId {
        let y = ctx.pos.y;
        debug_assert!(self.lo <= y && y <= self.hi, "y {y} outside {}..={}", self.lo, self.hi);
        if !ctx.is_finite() {
            return prev;
        }
        let mut block = prev;
        for (range, rule, column) in self.steps.iter() {
            if range.contains(y) {
                block = rule.apply_in(block, ctx, column);
            }
        }
        block
    }
}

/// Specialized chains for every biome, shared between biomes with equal
/// masks.
#[derive(Clone, Debug)]
pub struct ChainSet {
    fallback: Arc<SpecializedChain>,
    by_biome: FxHashMap<BiomeId, Arc<SpecializedChain>>,
}

impl ChainSet {
    pub fn new(chain: &ReplacerChain) -> Self {
        let mut distinct: FxHashMap<ReplacerMask, Arc<SpecializedChain>> = FxHashMap::default();
        let mut specialize = |mask: &BitSlice<u64, Lsb0>| {
            distinct
                .entry(mask.to_bitvec())
                .or_insert_with(|| Arc::new(SpecializedChain::new(chain, mask)))
                .clone()
        };

        let fallback = specialize(chain.default_mask());
        let by_biome: FxHashMap<_, _> = chain
            .masks()
            .map(|(biome, mask)| (biome, specialize(mask)))
            .collect();

        debug!(
            replacers = chain.len(),
            live = fallback.len(),
            biomes = by_biome.len(),
            distinct = distinct.len(),
            "specialized replacer chains"
        );
        Self { fallback, by_biome }
    }

    pub fn for_biome(&self, biome: BiomeId) -> &Arc<SpecializedChain> {
        self.by_biome.get(&biome).unwrap_or(&self.fallback)
    }
}
