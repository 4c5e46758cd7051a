use std::path::Path;

use serde::{
  Deserialize,
  Serialize,
};

use crate::error::HalaRendererError;

fn default_texture_extensions() -> Vec<String> {
  ["tga", "png", "jpg", "jpeg", "pnm"].iter().map(|ext| ext.to_string()).collect()
}

/// The configuration of the scene cache and the per-frame deformation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HalaSceneCacheConfig {
  /// The blend weight used by "blend" skinning for control points without a declared weight.
  /// 0.0 means pure linear skinning, 1.0 pure dual quaternion skinning.
  pub default_blend_weight: f64,
  /// The shininess used when a material does not carry one.
  pub default_shininess: f32,
  /// The lower-case file extensions accepted by the texture pass.
  pub texture_extensions: Vec<String>,
  /// Prepare the mesh cache arrays on the rayon pool.
  pub parallel_cache_build: bool,
  /// Deform the skinned meshes of a frame on the rayon pool.
  pub parallel_skinning: bool,
  /// The animation frame rate, one frame step per timer click.
  pub frames_per_second: f64,
}

impl Default for HalaSceneCacheConfig {
  fn default() -> Self {
    Self {
      default_blend_weight: 0.0,
      default_shininess: 32.0,
      texture_extensions: default_texture_extensions(),
      parallel_cache_build: true,
      parallel_skinning: true,
      frames_per_second: 30.0,
    }
  }
}

/// The implementation of the scene cache configuration.
impl HalaSceneCacheConfig {
  /// Load the configuration from a JSON file.
  /// Missing fields take their default values.
  /// param path: The path of the JSON file.
  /// return: The configuration.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HalaRendererError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|err| HalaRendererError::new(&format!("Read config file \"{:?}\" failed.", path), Some(Box::new(err))))?;
    Self::from_json(&content)
  }

  /// Parse the configuration from a JSON string.
  /// param content: The JSON text.
  /// return: The configuration.
  pub fn from_json(content: &str) -> Result<Self, HalaRendererError> {
    let config: Self = serde_json::from_str(content)
      .map_err(|err| HalaRendererError::new("Parse scene cache config failed.", Some(Box::new(err))))?;
    config.validate()?;
    Ok(config)
  }

  /// Check the values a file or a caller may get wrong.
  /// return: An error naming the first bad value.
  pub fn validate(&self) -> Result<(), HalaRendererError> {
    if !(0.0..=1.0).contains(&self.default_blend_weight) {
      return Err(HalaRendererError::new(
        &format!("The default blend weight {} is out of [0, 1].", self.default_blend_weight),
        None));
    }
    if !(self.frames_per_second.is_finite() && self.frames_per_second > 0.0) {
      return Err(HalaRendererError::new(
        &format!("The frame rate {} must be a positive number.", self.frames_per_second),
        None));
    }
    Ok(())
  }

  /// Check whether a texture file is in a supported format.
  /// param path: The texture file path.
  /// return: True if the extension is in the supported list.
  pub fn is_texture_supported<P: AsRef<Path>>(&self, path: P) -> bool {
    path.as_ref()
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| {
        let ext = ext.to_ascii_lowercase();
        self.texture_extensions.iter().any(|supported| *supported == ext)
      })
      .unwrap_or(false)
  }

  /// The duration of one animation frame in seconds.
  pub fn frame_time(&self) -> f64 {
    1.0 / self.frames_per_second
  }
}
