use std::path::{
  Path,
  PathBuf,
};

use rayon::prelude::*;

use crate::config::HalaSceneCacheConfig;
use crate::error::HalaRendererError;
use crate::scene::cpu::HalaScene;
use crate::scene::cpu::image_data::HalaImageData;
use crate::scene::cpu::node::HalaNodeAttribute;
use crate::scene::cpu::scene::ROOT_NODE;
use crate::scene::cpu::texture::HalaFileTexture;
use crate::scene::gpu::{
  HalaSceneCache,
  HalaMeshCache,
  HalaMeshCacheData,
  HalaMaterialCache,
  HalaLightCache,
  HalaTextureCache,
};

/// What one build pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaCacheBuildStats {
  pub textures_loaded: u32,
  pub textures_failed: u32,
  pub materials_built: u32,
  pub materials_failed: u32,
  pub meshes_built: u32,
  pub meshes_failed: u32,
  pub lights_built: u32,
  pub lights_failed: u32,
}

/// Builds the GPU caches of a scene.
pub struct HalaSceneCacheBuilder {
  pub config: HalaSceneCacheConfig,
}

/// The implementation of the scene cache builder.
impl HalaSceneCacheBuilder {
  pub fn new(config: HalaSceneCacheConfig) -> Self {
    Self { config }
  }

  /// The paths tried for a file texture, in order: the stored file name when it is
  /// absolute, the relative file name under the scene folder, the bare file name
  /// under the scene folder. Nothing is resolved against the working directory.
  /// param scene_folder: The folder of the scene file.
  /// param texture: The file texture.
  /// return: The candidate paths.
  pub fn texture_candidates(scene_folder: &Path, texture: &HalaFileTexture) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if !texture.file_name.is_empty() && Path::new(&texture.file_name).is_absolute() {
      candidates.push(PathBuf::from(&texture.file_name));
    }
    if !texture.relative_file_name.is_empty() {
      candidates.push(scene_folder.join(&texture.relative_file_name));
    }
    // Stored paths may come from another platform.
    let file_name = texture.file_name.rsplit(['/', '\\']).next().unwrap_or("");
    if !file_name.is_empty() {
      let bare = scene_folder.join(file_name);
      if !candidates.contains(&bare) {
        candidates.push(bare);
      }
    }
    candidates
  }

  /// Decode a file texture from the first candidate path that works.
  /// param scene_folder: The folder of the scene file.
  /// param texture: The file texture.
  /// return: The decoded image and the path it was read from.
  pub fn load_texture(&self, scene_folder: &Path, texture: &HalaFileTexture) -> Result<(HalaImageData, PathBuf), HalaRendererError> {
    if !self.config.is_texture_supported(&texture.file_name) {
      return Err(HalaRendererError::new(
        &format!("The texture \"{}\" is not in a supported format.", texture.file_name),
        None));
    }

    let mut last_error = None;
    for path in Self::texture_candidates(scene_folder, texture) {
      match HalaImageData::new_with_file(&path) {
        Ok(image) => return Ok((image, path)),
        Err(err) => {
          log::debug!("Load texture from \"{}\" failed: {}", path.to_string_lossy(), err);
          last_error = Some(err);
        },
      }
    }
    Err(HalaRendererError::new(
      &format!("Failed to load texture file \"{}\".", texture.file_name),
      last_error.map(|err| Box::new(err) as Box<dyn std::error::Error + Send + Sync>)))
  }

  /// Build every cache the scene still misses.
  /// Resources already built, or failed before, are skipped, so a second call does nothing.
  /// A resource that fails is logged and left uncached.
  /// param scene: The scene.
  /// param cache: The scene cache.
  /// return: What the pass did.
  pub fn build(&self, scene: &HalaScene, cache: &mut HalaSceneCache) -> HalaCacheBuildStats {
    let mut stats = HalaCacheBuildStats::default();

    // Textures first, materials look their handles up.
    let scene_folder = scene.folder();
    for (index, texture) in scene.textures.iter().enumerate() {
      let index = index as u32;
      if cache.is_texture_visited(index) {
        continue;
      }
      match self.load_texture(scene_folder, texture) {
        Ok((image, path)) => {
          cache.textures.insert(index, HalaTextureCache::new(&cache.backend, &image, path));
          stats.textures_loaded += 1;
        },
        Err(err) => {
          log::warn!("{}", err);
          cache.failed_textures.insert(index);
          stats.textures_failed += 1;
        },
      }
    }
    let texture_handles = cache.texture_handles();

    // Depth first from the root, children in order.
    let mut pending_meshes = Vec::new();
    let mut stack = vec![ROOT_NODE];
    let anim_layer = scene.current_anim_layer();
    while let Some(node_index) = stack.pop() {
      let Some(node) = scene.nodes.get(node_index as usize) else {
        continue;
      };

      for &material_index in node.materials.iter() {
        if cache.is_material_visited(material_index) {
          continue;
        }
        let result = scene.materials
          .get(material_index as usize)
          .ok_or(HalaRendererError::new(&format!("The material {} does not exist.", material_index), None))
          .and_then(|material| HalaMaterialCache::initialize(material, &texture_handles, self.config.default_shininess));
        match result {
          Ok(material_cache) => {
            cache.materials.insert(material_index, material_cache);
            stats.materials_built += 1;
          },
          Err(err) => {
            log::warn!("Build the material cache {} failed: {}", material_index, err);
            cache.failed_materials.insert(material_index);
            stats.materials_failed += 1;
          },
        }
      }

      for attribute in node.attributes.iter() {
        match *attribute {
          HalaNodeAttribute::Mesh(mesh_index) => {
            if !cache.is_mesh_visited(mesh_index) && !pending_meshes.contains(&mesh_index) {
              pending_meshes.push(mesh_index);
            }
          },
          HalaNodeAttribute::Light(light_index) => {
            if cache.is_light_visited(light_index) {
              continue;
            }
            let result = scene.lights
              .get(light_index as usize)
              .ok_or(HalaRendererError::new(&format!("The light {} does not exist.", light_index), None))
              .and_then(|light| HalaLightCache::initialize(light, light_index, anim_layer, &cache.light_registry));
            match result {
              Ok(light_cache) => {
                cache.lights.insert(light_index, light_cache);
                stats.lights_built += 1;
              },
              Err(err) => {
                log::warn!("Build the light cache {} failed: {}", light_index, err);
                cache.failed_lights.insert(light_index);
                stats.lights_failed += 1;
              },
            }
          },
          _ => (),
        }
      }

      stack.extend(node.children.iter().rev());
    }

    // Prepare the mesh arrays on the pool, upload on this thread.
    let prepare = |mesh_index: &u32| {
      let result = scene.meshes
        .get(*mesh_index as usize)
        .ok_or(HalaRendererError::new(&format!("The mesh {} does not exist.", mesh_index), None))
        .and_then(HalaMeshCacheData::new);
      (*mesh_index, result)
    };
    let prepared: Vec<(u32, Result<HalaMeshCacheData, HalaRendererError>)> = if self.config.parallel_cache_build {
      pending_meshes.par_iter().map(prepare).collect()
    } else {
      pending_meshes.iter().map(prepare).collect()
    };
    for (mesh_index, result) in prepared {
      match result {
        Ok(data) => {
          cache.meshes.insert(mesh_index, HalaMeshCache::upload(&cache.backend, &data));
          stats.meshes_built += 1;
        },
        Err(err) => {
          log::warn!("Build the mesh cache {} failed: {}", mesh_index, err);
          cache.failed_meshes.insert(mesh_index);
          stats.meshes_failed += 1;
        },
      }
    }

    log::debug!("The scene cache build finished: {:?}", stats);
    stats
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn candidates_follow_the_three_strategies() {
    let texture = HalaFileTexture {
      name: "wall".to_string(),
      file_name: "/art/textures/wall.tga".to_string(),
      relative_file_name: "textures/wall.tga".to_string(),
    };
    let candidates = HalaSceneCacheBuilder::texture_candidates(Path::new("/scenes"), &texture);
    assert_eq!(candidates, vec![
      PathBuf::from("/art/textures/wall.tga"),
      PathBuf::from("/scenes/textures/wall.tga"),
      PathBuf::from("/scenes/wall.tga"),
    ]);
  }

  #[test]
  fn relative_file_names_stay_under_the_scene_folder() {
    let texture = HalaFileTexture {
      name: "wall".to_string(),
      file_name: "C:\\art\\textures\\wall.tga".to_string(),
      relative_file_name: "textures/wall.tga".to_string(),
    };
    let candidates = HalaSceneCacheBuilder::texture_candidates(Path::new("/scenes"), &texture);
    assert_eq!(candidates, vec![
      PathBuf::from("/scenes/textures/wall.tga"),
      PathBuf::from("/scenes/wall.tga"),
    ]);

    let texture = HalaFileTexture { file_name: "wall.tga".to_string(), ..Default::default() };
    let candidates = HalaSceneCacheBuilder::texture_candidates(Path::new("/scenes"), &texture);
    assert_eq!(candidates, vec![PathBuf::from("/scenes/wall.tga")]);
  }

  #[test]
  fn unsupported_format_is_not_decoded() {
    let builder = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default());
    let texture = HalaFileTexture { file_name: "a.dds".to_string(), ..Default::default() };
    let err = builder.load_texture(Path::new("."), &texture).err().unwrap();
    assert!(err.message().contains("not in a supported format"));
  }
}
