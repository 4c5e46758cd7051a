pub mod gltf_loader;
pub mod cache_builder;

pub use gltf_loader::HalaGltfLoader;
pub use cache_builder::{
  HalaSceneCacheBuilder,
  HalaCacheBuildStats,
};
