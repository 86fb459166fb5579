use anyhow::Context;
use bevy_math::IVec3;
use clap::Parser;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use voxgen_worldgen::biome::{BiomeId, BiomeProvider, BiomeTable, SmoothedBiomes};
use voxgen_worldgen::block::BlockId;
use voxgen_worldgen::generator::{RegionWorker, TerrainGenerator};
use voxgen_worldgen::proto::Settings;

#[derive(Parser, Debug, Clone)]
struct Args {
    /// World seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Settings file. Built-in defaults are used without one.
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Regions generated on each side of the origin along x and z
    #[arg(short, long, default_value_t = 4)]
    radius: i32,

    #[arg(long, default_value_t = 0)]
    min_region_y: i32,

    #[arg(long, default_value_t = 7)]
    max_region_y: i32,

    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Times to generate the batch. The settings file is read again before
    /// every pass after the first.
    #[arg(long, default_value_t = 1)]
    passes: u32,

    /// Print the default settings as JSON and exit
    #[arg(long)]
    dump_defaults: bool,
}

const LAYOUT: [BiomeId; 7] = [
    BiomeTable::PLAINS,
    BiomeTable::FOREST,
    BiomeTable::DESERT,
    BiomeTable::MOUNTAINS,
    BiomeTable::SWAMP,
    BiomeTable::OCEAN,
    BiomeTable::MESA,
];

/// Biomes in 64-block cells picked by a hash of the cell and seed.
fn cell_layout(seed: u64) -> impl Fn(i32, i32) -> BiomeId + Send + Sync {
    move |x, z| {
        let (cx, cz) = (x >> 4, z >> 4);
        let h = (cx.wrapping_mul(73_856_093) ^ cz.wrapping_mul(19_349_663)) as u32 ^ seed as u32;
        LAYOUT[(h.wrapping_mul(0x9E37_79B9) >> 29) as usize % LAYOUT.len()]
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Settings::default()),
    }
}

async fn generate_batch(
    generator: &Arc<TerrainGenerator>,
    biomes: &Arc<dyn BiomeProvider>,
    positions: &[IVec3],
    workers: usize,
) -> anyhow::Result<FxHashMap<BlockId, u64>> {
    let per_worker = positions.len().div_ceil(workers.max(1)).max(1);
    let mut handles = Vec::new();
    for chunk in positions.chunks(per_worker) {
        let chunk = chunk.to_vec();
        let generator = generator.clone();
        let biomes = biomes.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let mut worker = RegionWorker::new(generator);
            let mut histogram: FxHashMap<BlockId, u64> = FxHashMap::default();
            for pos in chunk {
                let region = worker.generate(pos, &*biomes)?;
                for block in region.blocks.iter() {
                    *histogram.entry(*block).or_default() += 1;
                }
            }
            anyhow::Ok(histogram)
        }));
    }

    let mut total: FxHashMap<BlockId, u64> = FxHashMap::default();
    for handle in handles {
        for (block, count) in handle.await?? {
            *total.entry(block).or_default() += count;
        }
    }
    Ok(total)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.dump_defaults {
        println!("{}", Settings::default().to_json_pretty()?);
        return Ok(());
    }

    let settings = load_settings(args.settings.as_ref())?;
    let generator = Arc::new(TerrainGenerator::new(args.seed, settings)?);
    let biomes: Arc<dyn BiomeProvider> =
        Arc::new(SmoothedBiomes::new(cell_layout(args.seed), BiomeTable::overworld(), 2));

    let r = args.radius.max(0);
    let positions: Vec<IVec3> = (-r..=r)
        .flat_map(|x| (-r..=r).map(move |z| (x, z)))
        .flat_map(|(x, z)| (args.min_region_y..=args.max_region_y).map(move |y| IVec3::new(x, y, z)))
        .collect();
    info!(seed = args.seed, regions = positions.len(), workers = args.workers, "generating");

    for pass in 0..args.passes.max(1) {
        if pass > 0 && args.settings.is_some() {
            match load_settings(args.settings.as_ref()) {
                Ok(settings) => {
                    if let Err(err) = generator.reconfigure(settings) {
                        debug!(pass, "reload rejected: {err}");
                    }
                }
                Err(err) => warn!("keeping current settings: {err:#}"),
            }
        }

        let started = Instant::now();
        let histogram = generate_batch(&generator, &biomes, &positions, args.workers).await?;
        let elapsed = started.elapsed();
        info!(
            pass,
            generation = generator.generation(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            per_region_us = elapsed.as_secs_f64() * 1e6 / positions.len().max(1) as f64,
            "batch done"
        );

        let mut counts: Vec<_> = histogram.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (block, count) in counts {
            info!("{block:>16} {count}");
        }
    }
    Ok(())
}
