use crate::generator::TerrainGenerator;
use crate::proto::{ConfigError, Settings};
use bevy_app::{App, Plugin, Startup, Update};
use bevy_asset::io::Reader;
use bevy_asset::{Asset, AssetApp, AssetEvent, AssetLoader, AssetServer, Assets, Handle, LoadContext};
use bevy_ecs::message::MessageReader;
use bevy_ecs::prelude::{Commands, Res, Resource};
use bevy_reflect::TypePath;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Loads terrain settings as an asset and keeps a [`TerrainGeneratorResource`]
/// in sync with the file. Editing the file with bevy's file watcher enabled
/// reconfigures the running generator.
pub struct TerrainSettingsPlugin {
    pub seed: u64,
    pub path: String,
}

impl Plugin for TerrainSettingsPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<TerrainSettingsAsset>()
            .register_asset_loader(TerrainSettingsLoader)
            .insert_resource(TerrainSeed(self.seed))
            .insert_resource(TerrainSettingsPath(self.path.clone()))
            .add_systems(Update, apply_terrain_settings);

        app.add_systems(Startup, load_terrain_settings);
    }
}

#[derive(Resource)]
pub struct TerrainSeed(pub u64);

#[derive(Resource)]
pub struct TerrainSettingsPath(pub String);

#[derive(Resource)]
pub struct TerrainSettingsHandle(pub Handle<TerrainSettingsAsset>);

#[derive(Resource, Clone)]
pub struct TerrainGeneratorResource(pub Arc<TerrainGenerator>);

#[derive(TypePath, Asset, Debug, Clone)]
pub struct TerrainSettingsAsset {
    pub settings: Settings,
}

fn load_terrain_settings(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    path: Res<TerrainSettingsPath>,
) {
    commands.insert_resource(TerrainSettingsHandle(asset_server.load(path.0.clone())))
}

fn apply_terrain_settings(
    mut commands: Commands,
    mut messages: MessageReader<AssetEvent<TerrainSettingsAsset>>,
    assets: Res<Assets<TerrainSettingsAsset>>,
    seed: Res<TerrainSeed>,
    current: Option<Res<TerrainGeneratorResource>>,
) {
    let mut current = current.map(|res| TerrainGeneratorResource::clone(&res));
    for event in messages.read() {
        let (AssetEvent::LoadedWithDependencies { id } | AssetEvent::Modified { id }) = event else {
            continue;
        };
        let Some(asset) = assets.get(*id) else {
            continue;
        };
        if let Some(created) = apply_settings(current.as_ref(), seed.0, &asset.settings) {
            commands.insert_resource(created.clone());
            current = Some(created);
        }
    }
}

/// Reconfigures `current` in place, or builds a first generator when there
/// is none. Returns the generator only when a new one was created.
fn apply_settings(
    current: Option<&TerrainGeneratorResource>,
    seed: u64,
    settings: &Settings,
) -> Option<TerrainGeneratorResource> {
    match current {
        // reloads fire more than one event per change
        Some(current) if current.0.snapshot().settings == *settings => None,
        // rejections are logged by the generator
        Some(current) => {
            if let Err(err) = current.0.reconfigure(settings.clone()) {
                debug!("keeping generation {}: {err}", current.0.generation());
            }
            None
        }
        None => match TerrainGenerator::new(seed, settings.clone()) {
            Ok(generator) => Some(TerrainGeneratorResource(Arc::new(generator))),
            Err(err) => {
                warn!("terrain settings rejected: {err}");
                None
            }
        },
    }
}

#[derive(Default, TypePath)]
pub struct TerrainSettingsLoader;

#[derive(Debug, Error)]
pub enum TerrainSettingsLoaderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AssetLoader for TerrainSettingsLoader {
    type Asset = TerrainSettingsAsset;
    type Settings = ();
    type Error = TerrainSettingsLoaderError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let settings = Settings::from_json_slice(&bytes)?;
        Ok(TerrainSettingsAsset { settings })
    }
}
