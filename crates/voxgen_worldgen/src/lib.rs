pub mod biome;
pub mod block;
pub mod chain;
pub mod density;
pub mod field;
pub mod generator;
pub mod noise;
pub mod proto;
pub mod replacer;

#[cfg(feature = "bevy")]
pub mod bevy;
