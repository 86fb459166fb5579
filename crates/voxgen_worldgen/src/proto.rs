//! Serialized generator settings and their validation.

use crate::biome::BiomeId;
use crate::block::BlockId;
use crate::density::REGION_SIZE;
use crate::noise::{NoiseParam, NoiseRange, NoiseType};
use crate::replacer::filter::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("`{field}` must be finite, got {value}")]
    NonFinite { field: String, value: f64 },
    #[error("`{field}` needs between 1 and 32 octaves, got {octaves}")]
    Octaves { field: String, octaves: u32 },
    #[error("grid scale {scale:?} must be positive and divide the region size")]
    GridScale { scale: [i32; 3] },
    #[error("replacer #{index}: {reason}")]
    Replacer { index: usize, reason: String },
}

impl ConfigError {
    pub fn check_finite(field: &str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::NonFinite {
                field: field.to_owned(),
                value,
            })
        }
    }

    pub fn replacer(index: usize, reason: impl Into<String>) -> ConfigError {
        ConfigError::Replacer {
            index,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub water_level: i32,
    pub legacy_random_source: bool,
    /// Blocks between coarse density samples along x, y and z.
    pub grid_scale: [i32; 3],
    pub height_factor: f64,
    pub height_offset: f64,
    pub height_variation_factor: f64,
    pub height_variation_offset: f64,
    pub special_height_variation_factor_below_average_y: f64,
    pub selector_noise: NoiseParam,
    pub low_noise: NoiseParam,
    pub high_noise: NoiseParam,
    pub depth_noise: NoiseParam,
    pub replacers: Vec<ReplacerProto>,
}

impl Default for Settings {
    fn default() -> Self {
        let water_level = 63;
        Self {
            water_level,
            legacy_random_source: true,
            grid_scale: [4, 8, 4],
            height_factor: 64.0,
            height_offset: 64.0,
            height_variation_factor: 64.0,
            height_variation_offset: 0.0,
            special_height_variation_factor_below_average_y: 0.25,
            selector_noise: NoiseParam::new([0.008355, 0.002089, 0.008355], 8, 23.4, 0.5),
            low_noise: NoiseParam::new([0.00261083, 0.00130542, 0.00261083], 16, 1.0, 0.0),
            high_noise: NoiseParam::new([0.00261083, 0.00130542, 0.00261083], 16, 1.0, 0.0),
            depth_noise: NoiseParam::new([0.000762939, 0.0, 0.000762939], 16, 1.024, 0.0),
            replacers: default_replacers(water_level),
        }
    }
}

/// Stone under the density surface, water up to the water level, then the
/// biome surface.
pub fn default_replacers(water_level: i32) -> Vec<ReplacerProto> {
    vec![
        ReplacerProto::new(ReplacerKind::DensityRange(DensityRangeProto {
            block_in_range: Some(BlockId::STONE),
            min_density: Some(0.0),
            ..Default::default()
        })),
        ReplacerProto {
            max_y: water_level - 1,
            ..ReplacerProto::new(ReplacerKind::DensityRange(DensityRangeProto {
                block_in_range: Some(BlockId::WATER),
                max_density: Some(0.0),
                filter_blocks: vec![BlockId::AIR],
                filter_type: FilterType::Whitelist,
                ..Default::default()
            }))
        },
        ReplacerProto::new(ReplacerKind::MainSurface(MainSurfaceProto {
            ocean_level: water_level as f64,
            ..Default::default()
        })),
    ]
}

impl Settings {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Settings, ConfigError> {
        let settings: Settings = serde_json::from_slice(bytes)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        Settings::from_json_slice(&std::fs::read(path)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks everything that can be checked without building the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .grid_scale
            .iter()
            .any(|s| *s <= 0 || REGION_SIZE % *s != 0)
        {
            return Err(ConfigError::GridScale {
                scale: self.grid_scale,
            });
        }
        for (field, value) in [
            ("height_factor", self.height_factor),
            ("height_offset", self.height_offset),
            ("height_variation_factor", self.height_variation_factor),
            ("height_variation_offset", self.height_variation_offset),
            (
                "special_height_variation_factor_below_average_y",
                self.special_height_variation_factor_below_average_y,
            ),
        ] {
            ConfigError::check_finite(field, value)?;
        }
        self.selector_noise.validate("selector_noise")?;
        self.low_noise.validate("low_noise")?;
        self.high_noise.validate("high_noise")?;
        self.depth_noise.validate("depth_noise")?;
        for (index, replacer) in self.replacers.iter().enumerate() {
            replacer.validate(index)?;
        }
        Ok(())
    }
}

fn min_y_default() -> i32 {
    i32::MIN
}

fn max_y_default() -> i32 {
    i32::MAX
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplacerProto {
    #[serde(default = "min_y_default")]
    pub min_y: i32,
    #[serde(default = "max_y_default")]
    pub max_y: i32,
    /// Biomes the replacer runs in; every biome when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biomes: Option<Vec<BiomeId>>,
    #[serde(flatten)]
    pub kind: ReplacerKind,
}

impl ReplacerProto {
    pub fn new(kind: ReplacerKind) -> Self {
        Self {
            min_y: i32::MIN,
            max_y: i32::MAX,
            biomes: None,
            kind,
        }
    }

    pub fn applies_to(&self, biome: BiomeId) -> bool {
        self.biomes
            .as_ref()
            .is_none_or(|biomes| biomes.contains(&biome))
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let field = |name: &str| format!("replacers[{index}].{name}");
        match &self.kind {
            ReplacerKind::DensityRange(proto) => {
                for (name, value) in [
                    ("min_density", proto.min_density),
                    ("max_density", proto.max_density),
                ] {
                    if let Some(value) = value {
                        ConfigError::check_finite(&field(name), value)?;
                    }
                }
            }
            ReplacerKind::MainSurface(proto) => {
                proto.depth_noise.validate(&field("depth_noise"))?;
                for (name, value) in [
                    (
                        "horizontal_gradient_depth_decrease_weight",
                        proto.horizontal_gradient_depth_decrease_weight,
                    ),
                    ("ocean_level", proto.ocean_level),
                    ("max_surface_depth", proto.max_surface_depth),
                ] {
                    ConfigError::check_finite(&field(name), value)?;
                }
                for threshold in proto.top_thresholds.iter().chain(&proto.filler_thresholds) {
                    ConfigError::check_finite(&field("thresholds.depth"), threshold.depth)?;
                }
            }
            ReplacerKind::SurfaceDecoration(proto) => {
                proto.noise.validate(&field("noise"))?;
                for (name, value) in [
                    ("density_threshold", proto.density_threshold),
                    ("ground_min", proto.ground_min),
                    ("ground_max", proto.ground_max),
                    ("feature_min", proto.feature_min),
                    ("feature_max", proto.feature_max),
                ] {
                    ConfigError::check_finite(&field(name), value)?;
                }
            }
            ReplacerKind::MesaSurface(proto) => {
                for (name, noise) in [
                    ("depth_noise", &proto.depth_noise),
                    ("clay_bands_noise", &proto.clay_bands_noise),
                    ("pillar_noise", &proto.pillar_noise),
                    ("pillar_roof_noise", &proto.pillar_roof_noise),
                ] {
                    noise.validate(&field(name))?;
                }
                for (name, value) in [
                    ("mesa_depth", proto.mesa_depth),
                    ("height_offset", proto.height_offset),
                    ("height_scale", proto.height_scale),
                    ("water_height", proto.water_height),
                ] {
                    ConfigError::check_finite(&field(name), value)?;
                }
                if proto.clay_bands.as_ref().is_some_and(Vec::is_empty) {
                    return Err(ConfigError::replacer(index, "clay_bands must not be empty"));
                }
            }
            ReplacerKind::RandomGradient(proto) => {
                for point in &proto.probability {
                    ConfigError::check_finite(&field("probability.y"), point.y)?;
                    ConfigError::check_finite(&field("probability.v"), point.v)?;
                }
                let mut ys: Vec<f64> = proto.probability.iter().map(|p| p.y).collect();
                ys.sort_by(f64::total_cmp);
                if let Some(pair) = ys.windows(2).find(|pair| pair[0] == pair[1]) {
                    return Err(ConfigError::replacer(
                        index,
                        format!("duplicate probability point at y = {}", pair[0]),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplacerKind {
    DensityRange(DensityRangeProto),
    MainSurface(MainSurfaceProto),
    SurfaceDecoration(SurfaceDecorationProto),
    RandomGradient(RandomGradientProto),
    MesaSurface(MesaSurfaceProto),
}

/// Absent blocks keep the previous block; absent bounds are unbounded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityRangeProto {
    pub block_in_range: Option<BlockId>,
    pub block_out_of_range: Option<BlockId>,
    pub min_density: Option<f64>,
    pub max_density: Option<f64>,
    pub filter_blocks: Vec<BlockId>,
    pub filter_type: FilterType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthThreshold {
    pub depth: f64,
    #[serde(default)]
    pub block: Option<BlockId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainSurfaceProto {
    pub seed: i32,
    pub depth_noise: NoiseParam,
    pub horizontal_gradient_depth_decrease_weight: f64,
    pub ocean_level: f64,
    pub max_surface_depth: f64,
    pub top_block: Option<BlockId>,
    pub filler_block: Option<BlockId>,
    pub top_thresholds: Vec<DepthThreshold>,
    pub filler_thresholds: Vec<DepthThreshold>,
}

impl Default for MainSurfaceProto {
    fn default() -> Self {
        Self {
            seed: 0,
            depth_noise: NoiseParam::new([0.0625 / 8.0, 0.0, 0.0625 / 8.0], 4, 7.0 / 3.0, 3.0),
            horizontal_gradient_depth_decrease_weight: 1.0,
            ocean_level: 63.0,
            max_surface_depth: 9.0,
            top_block: None,
            filler_block: None,
            top_thresholds: Vec::new(),
            filler_thresholds: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceDecorationProto {
    pub ground_block: Option<BlockId>,
    pub feature_block: Option<BlockId>,
    pub density_threshold: f64,
    pub seed: i32,
    pub noise: NoiseParam,
    pub ground_min: f64,
    pub ground_max: f64,
    pub feature_min: f64,
    pub feature_max: f64,
}

impl Default for SurfaceDecorationProto {
    fn default() -> Self {
        Self {
            ground_block: None,
            feature_block: None,
            density_threshold: 0.0,
            seed: 0,
            noise: NoiseParam::new([1.0 / 16.0, 0.0, 1.0 / 16.0], 1, 1.0, 0.0)
                .with_range(NoiseRange::Unsigned),
            ground_min: 0.0,
            ground_max: 1.0,
            feature_min: 0.0,
            feature_max: 1.0,
        }
    }
}

/// Badlands surface. Heights are given on a reference scale with sea
/// level at 64 and mapped through `height_offset` and `height_scale`.
/// Without `clay_bands` the band sequence is derived from the world seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesaSurfaceProto {
    pub seed: i32,
    pub depth_noise: NoiseParam,
    pub clay_bands_noise: NoiseParam,
    pub clay_bands: Option<Vec<BlockId>>,
    pub bryce_pillars: bool,
    pub pillar_noise: NoiseParam,
    pub pillar_roof_noise: NoiseParam,
    pub forest: bool,
    pub mesa_depth: f64,
    pub height_offset: f64,
    pub height_scale: f64,
    pub water_height: f64,
}

impl Default for MesaSurfaceProto {
    fn default() -> Self {
        let broad = NoiseParam::new([1.0 / 512.0, 0.0, 1.0 / 512.0], 1, 1.0, 0.0)
            .with_type(NoiseType::Simplex);
        Self {
            seed: 0,
            depth_noise: NoiseParam::new([0.0625 / 8.0, 0.0, 0.0625 / 8.0], 4, 7.0 / 3.0, 3.0)
                .with_type(NoiseType::Simplex),
            clay_bands_noise: broad.clone(),
            clay_bands: None,
            bryce_pillars: false,
            pillar_noise: NoiseParam::new([0.25 / 8.0, 0.0, 0.25 / 8.0], 4, 15.0, 0.0)
                .with_type(NoiseType::Simplex),
            pillar_roof_noise: broad,
            forest: false,
            mesa_depth: 16.0,
            height_offset: 64.0,
            height_scale: 64.0,
            water_height: 63.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub y: f64,
    pub v: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomGradientProto {
    pub block: Option<BlockId>,
    pub seed: i32,
    /// Placement probability as a piecewise-linear function of y.
    pub probability: Vec<CurvePoint>,
}
