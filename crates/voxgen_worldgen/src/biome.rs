//! The biome collaborator: per-column terrain shape and surface blocks.

use crate::block::BlockId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiomeId(pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceBlocks {
    pub top: BlockId,
    pub filler: BlockId,
}

impl Default for SurfaceBlocks {
    fn default() -> Self {
        Self {
            top: BlockId::GRASS,
            filler: BlockId::DIRT,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BiomeError {
    #[error("biome data unavailable at column ({x}, {z})")]
    Unavailable { x: i32, z: i32 },
    #[error("biome {0:?} has no descriptor")]
    UnknownBiome(BiomeId),
}

/// Supplies biome data by block column.
///
/// Heights and volatilities are in normalized units; the density sampler
/// scales them by its height settings.
pub trait BiomeProvider: Send + Sync {
    fn height_at(&self, x: i32, z: i32) -> Result<f64, BiomeError>;

    fn volatility_at(&self, x: i32, z: i32) -> Result<f64, BiomeError>;

    fn biome_at(&self, x: i32, z: i32) -> Result<BiomeId, BiomeError>;

    fn surface_blocks(&self, biome: BiomeId) -> SurfaceBlocks;

    /// Height and volatility together, for providers that share work between them.
    fn column_at(&self, x: i32, z: i32) -> Result<(f64, f64), BiomeError> {
        Ok((self.height_at(x, z)?, self.volatility_at(x, z)?))
    }
}

impl<T: BiomeProvider + ?Sized> BiomeProvider for Arc<T> {
    fn height_at(&self, x: i32, z: i32) -> Result<f64, BiomeError> {
        (**self).height_at(x, z)
    }

    fn volatility_at(&self, x: i32, z: i32) -> Result<f64, BiomeError> {
        (**self).volatility_at(x, z)
    }

    fn biome_at(&self, x: i32, z: i32) -> Result<BiomeId, BiomeError> {
        (**self).biome_at(x, z)
    }

    fn surface_blocks(&self, biome: BiomeId) -> SurfaceBlocks {
        (**self).surface_blocks(biome)
    }

    fn column_at(&self, x: i32, z: i32) -> Result<(f64, f64), BiomeError> {
        (**self).column_at(x, z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomeDesc {
    pub height: f64,
    pub volatility: f64,
    #[serde(flatten)]
    pub surface: SurfaceBlocks,
}

impl BiomeDesc {
    pub const fn new(height: f64, volatility: f64, top: BlockId, filler: BlockId) -> Self {
        Self {
            height,
            volatility,
            surface: SurfaceBlocks { top, filler },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomeTable {
    biomes: FxHashMap<BiomeId, BiomeDesc>,
    #[serde(default)]
    fallback: SurfaceBlocks,
}

impl BiomeTable {
    pub const OCEAN: BiomeId = BiomeId(0);
    pub const PLAINS: BiomeId = BiomeId(1);
    pub const DESERT: BiomeId = BiomeId(2);
    pub const MOUNTAINS: BiomeId = BiomeId(3);
    pub const FOREST: BiomeId = BiomeId(4);
    pub const SWAMP: BiomeId = BiomeId(6);
    pub const RIVER: BiomeId = BiomeId(7);
    pub const BEACH: BiomeId = BiomeId(16);
    pub const MESA: BiomeId = BiomeId(37);

    /// A small overworld-like palette.
    pub fn overworld() -> Self {
        let mut table = Self::default();
        table
            .insert(Self::OCEAN, BiomeDesc::new(-1.0, 0.1, BlockId::GRASS, BlockId::DIRT))
            .insert(Self::PLAINS, BiomeDesc::new(0.125, 0.05, BlockId::GRASS, BlockId::DIRT))
            .insert(Self::DESERT, BiomeDesc::new(0.125, 0.05, BlockId::SAND, BlockId::SAND))
            .insert(Self::MOUNTAINS, BiomeDesc::new(1.0, 0.5, BlockId::GRASS, BlockId::DIRT))
            .insert(Self::FOREST, BiomeDesc::new(0.1, 0.2, BlockId::GRASS, BlockId::DIRT))
            .insert(Self::SWAMP, BiomeDesc::new(-0.2, 0.1, BlockId::GRASS, BlockId::DIRT))
            .insert(Self::RIVER, BiomeDesc::new(-0.5, 0.0, BlockId::GRASS, BlockId::DIRT))
            .insert(Self::BEACH, BiomeDesc::new(0.0, 0.025, BlockId::SAND, BlockId::SAND))
            .insert(
                Self::MESA,
                BiomeDesc::new(0.1, 0.2, BlockId::RED_SAND, BlockId::RED_SAND),
            );
        table
    }

    pub fn insert(&mut self, id: BiomeId, desc: BiomeDesc) -> &mut Self {
        self.biomes.insert(id, desc);
        self
    }

    pub fn get(&self, id: BiomeId) -> Result<&BiomeDesc, BiomeError> {
        self.biomes.get(&id).ok_or(BiomeError::UnknownBiome(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = BiomeId> + '_ {
        self.biomes.keys().copied()
    }

    pub fn surface_blocks(&self, id: BiomeId) -> SurfaceBlocks {
        self.biomes
            .get(&id)
            .map(|desc| desc.surface)
            .unwrap_or(self.fallback)
    }
}

/// One biome everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformBiomes {
    pub biome: BiomeId,
    pub desc: BiomeDesc,
}

impl UniformBiomes {
    pub fn new(biome: BiomeId, desc: BiomeDesc) -> Self {
        Self { biome, desc }
    }
}

impl BiomeProvider for UniformBiomes {
    fn height_at(&self, _x: i32, _z: i32) -> Result<f64, BiomeError> {
        Ok(self.desc.height)
    }

    fn volatility_at(&self, _x: i32, _z: i32) -> Result<f64, BiomeError> {
        Ok(self.desc.volatility)
    }

    fn biome_at(&self, _x: i32, _z: i32) -> Result<BiomeId, BiomeError> {
        Ok(self.biome)
    }

    fn surface_blocks(&self, _biome: BiomeId) -> SurfaceBlocks {
        self.desc.surface
    }
}

/// Blends height and volatility of the biomes around a column.
///
/// `layout` maps 4×4-block section coordinates to a biome. Each neighbor
/// section within `radius` contributes with weight
/// `10 / sqrt(dx² + dz² + 0.2) / (height + 2)`, halved when it sits higher
/// than the center biome.
pub struct SmoothedBiomes<F> {
    layout: F,
    table: BiomeTable,
    radius: i32,
    weights: Box<[f64]>,
}

impl<F> SmoothedBiomes<F>
where
    F: Fn(i32, i32) -> BiomeId + Send + Sync,
{
    pub fn new(layout: F, table: BiomeTable, radius: u8) -> Self {
        let radius = radius as i32;
        let diameter = radius * 2 + 1;
        let mut weights = Vec::with_capacity((diameter * diameter) as usize);
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                weights.push(10.0 / ((dx * dx + dz * dz) as f64 + 0.2).sqrt());
            }
        }
        Self {
            layout,
            table,
            radius,
            weights: weights.into_boxed_slice(),
        }
    }

    pub fn table(&self) -> &BiomeTable {
        &self.table
    }

    fn smooth(&self, x: i32, z: i32) -> Result<(f64, f64), BiomeError> {
        let (sx, sz) = (x >> 2, z >> 2);
        let center = self.table.get((self.layout)(sx, sz))?.height;

        let mut height = 0.0;
        let mut volatility = 0.0;
        let mut total = 0.0;
        let neighbors = (-self.radius..=self.radius)
            .flat_map(|dz| (-self.radius..=self.radius).map(move |dx| (dx, dz)));
        for ((dx, dz), base) in neighbors.zip(self.weights.iter()) {
            let desc = self.table.get((self.layout)(sx + dx, sz + dz))?;
            let mut weight = (base / (desc.height + 2.0)).abs();
            if desc.height > center {
                weight /= 2.0;
            }
            height += desc.height * weight;
            volatility += desc.volatility * weight;
            total += weight;
        }
        if total <= 0.0 || !total.is_finite() {
            return Err(BiomeError::Unavailable { x, z });
        }
        Ok((height / total, volatility / total))
    }
}

impl<F> BiomeProvider for SmoothedBiomes<F>
where
    F: Fn(i32, i32) -> BiomeId + Send + Sync,
{
    fn height_at(&self, x: i32, z: i32) -> Result<f64, BiomeError> {
        self.smooth(x, z).map(|(height, _)| height)
    }

    fn volatility_at(&self, x: i32, z: i32) -> Result<f64, BiomeError> {
        self.smooth(x, z).map(|(_, volatility)| volatility)
    }

    fn biome_at(&self, x: i32, z: i32) -> Result<BiomeId, BiomeError> {
        Ok((self.layout)(x >> 2, z >> 2))
    }

    fn surface_blocks(&self, biome: BiomeId) -> SurfaceBlocks {
        self.table.surface_blocks(biome)
    }

    fn column_at(&self, x: i32, z: i32) -> Result<(f64, f64), BiomeError> {
        self.smooth(x, z)
    }
}

#[cfg(test)]
mod test {
    use crate::biome::{
        BiomeDesc, BiomeError, BiomeId, BiomeProvider, BiomeTable, SmoothedBiomes, UniformBiomes,
    };
    use crate::block::BlockId;

    #[test]
    fn uniform_layout_smooths_to_itself() {
        let biomes = SmoothedBiomes::new(|_, _| BiomeTable::PLAINS, BiomeTable::overworld(), 2);
        let (height, volatility) = biomes.column_at(123, -77).unwrap();
        assert!((height - 0.125).abs() < 1e-12);
        assert!((volatility - 0.05).abs() < 1e-12);
        assert_eq!(biomes.biome_at(5, 5), Ok(BiomeTable::PLAINS));
        assert_eq!(biomes.surface_blocks(BiomeTable::DESERT).top, BlockId::SAND);
    }

    #[test]
    fn higher_neighbors_pull_less() {
        // ocean on the west half, mountains on the east half
        let layout = |sx: i32, _sz: i32| {
            if sx < 0 {
                BiomeTable::OCEAN
            } else {
                BiomeTable::MOUNTAINS
            }
        };
        let biomes = SmoothedBiomes::new(layout, BiomeTable::overworld(), 2);
        let (west, _) = biomes.column_at(-4, 0).unwrap();
        let (east, _) = biomes.column_at(0, 0).unwrap();
        assert!(west > -1.0 && west < 0.0, "{west}");
        assert!(east > west && east < 1.0, "{east}");
    }

    #[test]
    fn unknown_biomes_are_reported() {
        let biomes = SmoothedBiomes::new(|_, _| BiomeId(999), BiomeTable::overworld(), 1);
        assert_eq!(
            biomes.height_at(0, 0),
            Err(BiomeError::UnknownBiome(BiomeId(999)))
        );
        assert_eq!(biomes.surface_blocks(BiomeId(999)).filler, BlockId::DIRT);
    }

    #[test]
    fn uniform_biomes() {
        let desc = BiomeDesc::new(0.5, 0.25, BlockId::SNOW, BlockId::DIRT);
        let biomes = UniformBiomes::new(BiomeId(12), desc);
        assert_eq!(biomes.column_at(1, 2), Ok((0.5, 0.25)));
        assert_eq!(biomes.surface_blocks(BiomeId(0)).top, BlockId::SNOW);
    }

    #[test]
    fn table_roundtrips_through_json() {
        let json = serde_json::to_string(&BiomeTable::overworld()).unwrap();
        let table: BiomeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(table, BiomeTable::overworld());
    }
}
