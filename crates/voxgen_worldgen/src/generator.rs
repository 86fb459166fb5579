//! Region generation and live reconfiguration.
//!
//! [`TerrainGenerator`] is shared by every worker. It holds the validated
//! settings and the specialized chains behind a lock that is only taken to
//! swap them. Each worker owns a [`RegionWorker`] with its own density
//! sampler, so noise caches are never shared.

use crate::biome::{BiomeError, BiomeId, BiomeProvider, SurfaceBlocks};
use crate::block::BlockId;
use crate::chain::ReplacerChain;
use crate::chain::specialize::{ChainSet, RegionPlan};
use crate::density::expander::{VoxelSample, expand};
use crate::density::{CoarseGrid, DensitySampler, REGION_SIZE, REGION_VOLUME, voxel_index};
use crate::proto::{ConfigError, Settings};
use crate::replacer::VoxelContext;
use bevy_math::IVec3;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, debug_span, info, warn};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("biome lookup failed for region {region}")]
    Biome {
        region: IVec3,
        #[source]
        source: BiomeError,
    },
}

/// One configuration of the pipeline.
#[derive(Debug)]
pub struct GeneratorState {
    pub generation: u64,
    pub settings: Settings,
    pub chains: ChainSet,
}

impl GeneratorState {
    fn build(seed: u64, settings: Settings, generation: u64) -> Result<Self, ConfigError> {
        settings.validate()?;
        let chain = ReplacerChain::from_protos(&settings.replacers, seed, settings.legacy_random_source)?;
        Ok(Self {
            generation,
            chains: ChainSet::new(&chain),
            settings,
        })
    }
}

#[derive(Debug)]
pub struct TerrainGenerator {
    seed: u64,
    state: RwLock<Arc<GeneratorState>>,
    generation: AtomicU64,
}

impl TerrainGenerator {
    pub fn new(seed: u64, settings: Settings) -> Result<Self, ConfigError> {
        let state = GeneratorState::build(seed, settings, 0)?;
        Ok(Self {
            seed,
            state: RwLock::new(Arc::new(state)),
            generation: AtomicU64::new(0),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Bumped by every successful [`reconfigure`](Self::reconfigure).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Arc<GeneratorState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the settings. Nothing changes unless the new settings
    /// validate and their chains build; workers pick the new state up
    /// before their next region.
    pub fn reconfigure(&self, settings: Settings) -> Result<u64, ConfigError> {
        let mut next = match GeneratorState::build(self.seed, settings, 0) {
            Ok(state) => state,
            Err(err) => {
                warn!(generation = self.generation(), "rejected terrain settings: {err}");
                return Err(err);
            }
        };

        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        next.generation = current.generation + 1;
        let generation = next.generation;
        *current = Arc::new(next);
        self.generation.store(generation, Ordering::Release);
        drop(current);

        info!(generation, "terrain settings reloaded");
        Ok(generation)
    }
}

/// Block ids for one region, indexed by [`voxel_index`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    /// Region coordinates; the lowest block is `pos * 16`.
    pub pos: IVec3,
    pub blocks: Box<[BlockId; REGION_VOLUME]>,
}

impl Region {
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.blocks[voxel_index(x, y, z)]
    }
}

/// Per-worker pipeline state. Not shareable; create one per thread.
pub struct RegionWorker {
    generator: Arc<TerrainGenerator>,
    state: Arc<GeneratorState>,
    sampler: DensitySampler,
    grid: CoarseGrid,
    samples: Box<[VoxelSample; REGION_VOLUME]>,
}

impl RegionWorker {
    pub fn new(generator: Arc<TerrainGenerator>) -> Self {
        let state = generator.snapshot();
        let sampler = DensitySampler::new(generator.seed(), &state.settings);
        let grid = CoarseGrid::new(sampler.scale());
        Self {
            generator,
            state,
            sampler,
            grid,
            samples: Box::new([VoxelSample::default(); REGION_VOLUME]),
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    fn refresh(&mut self) {
        if self.generator.generation() == self.state.generation {
            return;
        }
        let state = self.generator.snapshot();
        debug!(from = self.state.generation, to = state.generation, "rebuilding density sampler");
        self.sampler = DensitySampler::new(self.generator.seed(), &state.settings);
        self.grid = CoarseGrid::new(self.sampler.scale());
        self.state = state;
    }

    pub fn generate(&mut self, region: IVec3, biomes: &dyn BiomeProvider) -> Result<Region, GenerateError> {
        let _span = debug_span!("generate_region", x = region.x, y = region.y, z = region.z).entered();
        self.refresh();

        let origin = region * REGION_SIZE;
        let biome_error = |source| GenerateError::Biome { region, source };
        self.sampler
            .fill_grid(origin, biomes, &mut self.grid)
            .map_err(biome_error)?;
        expand(&self.grid, &mut self.samples);

        let (lo, hi) = (origin.y, origin.y + REGION_SIZE - 1);
        let chains = &self.state.chains;
        let mut plans: FxHashMap<BiomeId, (SurfaceBlocks, RegionPlan<'_>)> = FxHashMap::default();
        let mut blocks = Box::new([BlockId::AIR; REGION_VOLUME]);

        for z in 0..REGION_SIZE {
            for x in 0..REGION_SIZE {
                let (wx, wz) = (origin.x + x, origin.z + z);
                let biome = biomes.biome_at(wx, wz).map_err(biome_error)?;
                let (surface, plan) = plans.entry(biome).or_insert_with(|| {
                    (
                        biomes.surface_blocks(biome),
                        chains.for_biome(biome).restrict(lo, hi),
                    )
                });
                for y in 0..REGION_SIZE {
                    let index = voxel_index(x, y, z);
                    let sample = self.samples[index];
                    let ctx = VoxelContext {
                        biome,
                        surface: *surface,
                        pos: IVec3::new(wx, origin.y + y, wz),
                        gradient: sample.gradient,
                        density: sample.density,
                    };
                    blocks[index] = plan.evaluate(BlockId::AIR, &ctx);
                }
            }
        }
        debug!(biomes = plans.len(), "region done");

        Ok(Region { pos: region, blocks })
    }
}
