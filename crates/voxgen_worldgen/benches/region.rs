use bevy_math::{DVec3, IVec3};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use voxgen_worldgen::biome::{BiomeId, BiomeTable, SmoothedBiomes, SurfaceBlocks};
use voxgen_worldgen::block::BlockId;
use voxgen_worldgen::chain::ReplacerChain;
use voxgen_worldgen::chain::specialize::SpecializedChain;
use voxgen_worldgen::generator::{RegionWorker, TerrainGenerator};
use voxgen_worldgen::proto::Settings;
use voxgen_worldgen::replacer::VoxelContext;

fn layout(x: i32, z: i32) -> BiomeId {
    match (x >> 6).wrapping_add(z >> 6).rem_euclid(4) {
        0 => BiomeTable::PLAINS,
        1 => BiomeTable::FOREST,
        2 => BiomeTable::DESERT,
        _ => BiomeTable::MOUNTAINS,
    }
}

fn region_benchmarks(c: &mut Criterion) {
    let generator = Arc::new(TerrainGenerator::new(0, Settings::default()).unwrap());
    let biomes = SmoothedBiomes::new(layout, BiomeTable::overworld(), 2);
    let mut worker = RegionWorker::new(generator);

    let mut z = 0;
    c.bench_function("ground_level", |b| {
        b.iter(|| {
            z += 1;
            worker.generate(IVec3::new(1, 3, z), &biomes).unwrap()
        })
    });

    c.bench_function("underground", |b| {
        b.iter(|| {
            z += 1;
            worker.generate(IVec3::new(1, 0, z), &biomes).unwrap()
        })
    });

    c.bench_function("high_up", |b| {
        b.iter(|| {
            z += 1;
            worker.generate(IVec3::new(1, 12, z), &biomes).unwrap()
        })
    });
}

fn chain_benchmarks(c: &mut Criterion) {
    let settings = Settings::default();
    let chain = ReplacerChain::from_protos(&settings.replacers, 0, true).unwrap();
    let specialized = SpecializedChain::new(&chain, chain.default_mask());
    let contexts: Vec<VoxelContext> = (0..4096)
        .map(|i| VoxelContext {
            biome: BiomeTable::PLAINS,
            surface: SurfaceBlocks::default(),
            pos: IVec3::new(i & 15, 48 + ((i >> 8) & 15), (i >> 4) & 15),
            gradient: DVec3::new(0.05, -1.0, 0.02),
            density: 64.0 - (48 + ((i >> 8) & 15)) as f64 - 0.3,
        })
        .collect();

    c.bench_function("chain_naive", |b| {
        b.iter(|| {
            for ctx in &contexts {
                black_box(chain.evaluate_naive(chain.default_mask(), BlockId::AIR, ctx));
            }
        })
    });

    c.bench_function("chain_specialized", |b| {
        b.iter(|| {
            for ctx in &contexts {
                black_box(specialized.evaluate(BlockId::AIR, ctx));
            }
        })
    });

    let plan = specialized.restrict(48, 63);
    c.bench_function("chain_region_plan", |b| {
        b.iter(|| {
            for ctx in &contexts {
                black_box(plan.evaluate(BlockId::AIR, ctx));
            }
        })
    });
}

criterion_group!(benches, region_benchmarks, chain_benchmarks);
criterion_main!(benches);
