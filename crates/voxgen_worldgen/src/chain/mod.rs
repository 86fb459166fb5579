//! Ordered replacer chains with per-biome activation masks.

pub mod specialize;

use crate::biome::BiomeId;
use crate::block::BlockId;
use crate::proto::{ConfigError, ReplacerProto};
use crate::replacer::{Replacer, VoxelContext};
use bitvec::prelude::{BitSlice, BitVec, Lsb0};
use rustc_hash::{FxHashMap, FxHashSet};

/// Bit `i` enables replacer `i`.
pub type ReplacerMask = BitVec<u64, Lsb0>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplacerChain {
    replacers: Vec<Replacer>,
    default_mask: ReplacerMask,
    masks: FxHashMap<BiomeId, ReplacerMask>,
}

impl ReplacerChain {
    /// A chain whose replacers are active in every biome.
    pub fn new(replacers: Vec<Replacer>) -> Self {
        let default_mask = BitVec::repeat(true, replacers.len());
        Self {
            replacers,
            default_mask,
            masks: FxHashMap::default(),
        }
    }

    pub fn from_protos(
        protos: &[ReplacerProto],
        world_seed: u64,
        legacy: bool,
    ) -> Result<Self, ConfigError> {
        let replacers = protos
            .iter()
            .enumerate()
            .map(|(index, proto)| Replacer::build(proto, world_seed, legacy, index))
            .collect::<Result<Vec<_>, _>>()?;

        let default_mask: ReplacerMask = protos.iter().map(|p| p.biomes.is_none()).collect();
        let listed: FxHashSet<BiomeId> = protos
            .iter()
            .filter_map(|p| p.biomes.as_deref())
            .flatten()
            .copied()
            .collect();
        let masks = listed
            .into_iter()
            .map(|biome| (biome, protos.iter().map(|p| p.applies_to(biome)).collect()))
            .collect();

        Ok(Self {
            replacers,
            default_mask,
            masks,
        })
    }

    pub fn set_mask(&mut self, biome: BiomeId, mask: ReplacerMask) {
        self.masks.insert(biome, mask);
    }

    pub fn replacers(&self) -> &[Replacer] {
        &self.replacers
    }

    pub fn len(&self) -> usize {
        self.replacers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacers.is_empty()
    }

    pub fn default_mask(&self) -> &BitSlice<u64, Lsb0> {
        &self.default_mask
    }

    pub fn mask_for(&self, biome: BiomeId) -> &BitSlice<u64, Lsb0> {
        self.masks.get(&biome).unwrap_or(&self.default_mask)
    }

    /// Biomes with a mask of their own.
    pub fn masks(&self) -> impl Iterator<Item = (BiomeId, &BitSlice<u64, Lsb0>)> {
        self.masks.iter().map(|(biome, mask)| (*biome, mask.as_bitslice()))
    }

    /// Folds every enabled replacer over `prev`, in order. Bits past the end
    /// of `mask` count as disabled.
    pub fn evaluate_naive(
        &self,
        mask: &BitSlice<u64, Lsb0>,
        prev: BlockId,
        ctx: &VoxelContext,
    ) -> BlockId {
        if !ctx.is_finite() {
            return prev;
        }
        self.replacers
            .iter()
            .zip(mask.iter().by_vals())
            .filter(|(_, enabled)| *enabled)
            .fold(prev, |block, (replacer, _)| replacer.replace(block, ctx))
    }
}
