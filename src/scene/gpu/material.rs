use std::collections::BTreeMap;

use glam::{
  DVec3,
  Vec4,
};

use crate::error::HalaRendererError;
use crate::scene::cpu::material::{
  HalaMaterial,
  HalaMaterialChannel,
};
use super::backend::{
  HalaGpuBackend,
  HalaTextureHandle,
};
use super::render_state::{
  HalaRenderState,
  DIFFUSE_TEXTURE_UNIT,
};

/// The shininess of the default material.
pub const DEFAULT_SHININESS: f32 = 32.0;

/// One colour of a cached material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalaColorChannel {
  pub color: Vec4,
  pub texture: Option<HalaTextureHandle>,
}

impl HalaColorChannel {
  fn new(color: DVec3, texture: Option<HalaTextureHandle>) -> Self {
    Self {
      color: color.as_vec3().extend(1.0),
      texture,
    }
  }
}

/// Read a colour property scaled by its factor property.
/// return: The colour, black if the property is absent.
fn channel_color(channel: &HalaMaterialChannel) -> DVec3 {
  let color = channel.color.unwrap_or(DVec3::ZERO);
  match channel.factor {
    Some(factor) if factor != 1.0 => color * factor,
    _ => color,
  }
}

/// The colours of a material, ready to be bound to the scene shader.
#[derive(Clone, Debug, PartialEq)]
pub struct HalaMaterialCache {
  pub emissive: HalaColorChannel,
  pub ambient: HalaColorChannel,
  pub diffuse: HalaColorChannel,
  pub specular: HalaColorChannel,
  pub shininess: f32,
}

/// The implementation of the material cache.
impl HalaMaterialCache {
  /// Extract the colours of a material.
  /// param material: The material.
  /// param textures: The GPU textures already loaded, keyed by scene texture index.
  /// param default_shininess: The shininess used when the material has none.
  /// return: The material cache, an error for non-finite values.
  pub fn initialize(
    material: &HalaMaterial,
    textures: &BTreeMap<u32, HalaTextureHandle>,
    default_shininess: f32,
  ) -> Result<Self, HalaRendererError> {
    let texture_of = |channel: &HalaMaterialChannel| channel.texture.and_then(|index| textures.get(&index).copied());

    let mut emissive = channel_color(&material.emissive);
    if emissive == DVec3::ZERO {
      if let Some(legacy) = material.legacy_emissive {
        emissive = legacy;
      }
    }
    let ambient = channel_color(&material.ambient);
    let diffuse = channel_color(&material.diffuse);
    let specular = channel_color(&material.specular);
    let shininess = material.shininess.map_or(default_shininess, |s| s as f32);

    if ![emissive, ambient, diffuse, specular].iter().all(|c| c.is_finite()) || !shininess.is_finite() {
      return Err(HalaRendererError::new(&format!("The material \"{}\" has non-finite values.", material.name), None));
    }

    Ok(Self {
      emissive: HalaColorChannel::new(emissive, texture_of(&material.emissive)),
      ambient: HalaColorChannel::new(ambient, texture_of(&material.ambient)),
      diffuse: HalaColorChannel::new(diffuse, texture_of(&material.diffuse)),
      specular: HalaColorChannel::new(specular, texture_of(&material.specular)),
      shininess,
    })
  }

  /// The neutral material used for slots without a cached material.
  pub fn default_material() -> Self {
    let black = HalaColorChannel { color: Vec4::new(0.0, 0.0, 0.0, 1.0), texture: None };
    Self {
      emissive: black,
      ambient: HalaColorChannel { color: Vec4::new(0.2, 0.2, 0.2, 1.0), texture: None },
      diffuse: HalaColorChannel { color: Vec4::new(0.8, 0.8, 0.8, 1.0), texture: None },
      specular: black,
      shininess: DEFAULT_SHININESS,
    }
  }

  /// Upload the colours and bind the diffuse texture.
  /// param backend: The GPU backend.
  /// param render_state: The shader state.
  pub fn set_current_material(&self, backend: &mut dyn HalaGpuBackend, render_state: &HalaRenderState) {
    let uniforms = &render_state.uniforms;
    let colors = [
      (uniforms.material_emissive, self.emissive.color),
      (uniforms.material_ambient, self.ambient.color),
      (uniforms.material_diffuse, self.diffuse.color),
      (uniforms.material_specular, self.specular.color),
    ];
    for (location, color) in colors {
      if let Some(location) = location {
        backend.set_uniform_vec4(location, color);
      }
    }
    if let Some(location) = uniforms.material_shininess {
      backend.set_uniform_f32(location, self.shininess);
    }

    backend.bind_texture(DIFFUSE_TEXTURE_UNIT, self.diffuse.texture);
    if let Some(location) = uniforms.texture {
      backend.set_uniform_i32(location, DIFFUSE_TEXTURE_UNIT as i32);
    }
  }

  /// Upload the neutral material.
  /// param backend: The GPU backend.
  /// param render_state: The shader state.
  pub fn set_default_material(backend: &mut dyn HalaGpuBackend, render_state: &HalaRenderState) {
    Self::default_material().set_current_material(backend, render_state);
  }
}
