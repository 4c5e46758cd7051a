use std::collections::{
  BTreeMap,
  BTreeSet,
};
use std::rc::Rc;

use super::backend::{
  HalaGpuBackendRef,
  HalaTextureHandle,
};
use super::mesh::HalaMeshCache;
use super::material::HalaMaterialCache;
use super::light::{
  HalaLightCache,
  HalaLightRegistry,
};
use super::texture::HalaTextureCache;

/// The GPU side derivatives of a scene, keyed by the index of their resource.
/// A resource is built once, a failed build is remembered and not retried.
pub struct HalaSceneCache {
  pub backend: HalaGpuBackendRef,
  pub light_registry: HalaLightRegistry,
  pub meshes: BTreeMap<u32, HalaMeshCache>,
  pub materials: BTreeMap<u32, HalaMaterialCache>,
  pub lights: BTreeMap<u32, HalaLightCache>,
  pub textures: BTreeMap<u32, HalaTextureCache>,
  pub failed_meshes: BTreeSet<u32>,
  pub failed_materials: BTreeSet<u32>,
  pub failed_lights: BTreeSet<u32>,
  pub failed_textures: BTreeSet<u32>,
}

/// The Drop implementation of the scene cache.
impl Drop for HalaSceneCache {
  fn drop(&mut self) {
    log::debug!(
      "A HalaSceneCache dropped with {} meshes, {} materials, {} lights and {} textures.",
      self.meshes.len(), self.materials.len(), self.lights.len(), self.textures.len());
  }
}

/// The implementation of the scene cache.
impl HalaSceneCache {
  /// Create an empty cache.
  /// param backend: The GPU backend the caches upload to.
  /// param light_registry: The registry assigning light slots.
  /// return: The cache.
  pub fn new(backend: &HalaGpuBackendRef, light_registry: &HalaLightRegistry) -> Self {
    log::debug!("A HalaSceneCache created.");
    Self {
      backend: Rc::clone(backend),
      light_registry: light_registry.clone(),
      meshes: BTreeMap::new(),
      materials: BTreeMap::new(),
      lights: BTreeMap::new(),
      textures: BTreeMap::new(),
      failed_meshes: BTreeSet::new(),
      failed_materials: BTreeSet::new(),
      failed_lights: BTreeSet::new(),
      failed_textures: BTreeSet::new(),
    }
  }

  /// Check whether a mesh was already visited, built or failed.
  pub fn is_mesh_visited(&self, mesh: u32) -> bool {
    self.meshes.contains_key(&mesh) || self.failed_meshes.contains(&mesh)
  }

  pub fn is_material_visited(&self, material: u32) -> bool {
    self.materials.contains_key(&material) || self.failed_materials.contains(&material)
  }

  pub fn is_light_visited(&self, light: u32) -> bool {
    self.lights.contains_key(&light) || self.failed_lights.contains(&light)
  }

  pub fn is_texture_visited(&self, texture: u32) -> bool {
    self.textures.contains_key(&texture) || self.failed_textures.contains(&texture)
  }

  /// The GPU handles of the loaded textures.
  pub fn texture_handles(&self) -> BTreeMap<u32, HalaTextureHandle> {
    self.textures.iter().map(|(index, texture)| (*index, texture.handle)).collect()
  }

  /// Drop every cache, the failure records included.
  pub fn clear(&mut self) {
    self.meshes.clear();
    self.materials.clear();
    self.lights.clear();
    self.textures.clear();
    self.failed_meshes.clear();
    self.failed_materials.clear();
    self.failed_lights.clear();
    self.failed_textures.clear();
  }
}
