use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use glam::{
  DMat4,
  DVec3,
  Vec3,
};

use crate::error::HalaRendererError;
use crate::scene::cpu::anim::{
  HalaAnimCurve,
  HalaAnimLayer,
};
use crate::scene::cpu::light::{
  HalaLight,
  HalaLightType,
};
use super::backend::HalaGpuBackend;
use super::render_state::{
  HalaRenderState,
  MAX_LIGHT_COUNT,
};

/// The colour of the environment light.
pub const ENVIRONMENT_LIGHT_COLOR: Vec3 = Vec3::ONE;
/// The position of the environment light.
pub const ENVIRONMENT_LIGHT_POSITION: Vec3 = Vec3::new(200.0, 200.0, 200.0);

/// Hands out light slots, the lowest free slot first.
/// Clones share the same slots, so caches of several scenes never hold the same slot at once.
#[derive(Clone, Debug, Default)]
pub struct HalaLightRegistry {
  slots: Rc<RefCell<BTreeSet<u32>>>,
}

impl HalaLightRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Take the lowest free light slot.
  pub fn allocate(&self) -> u32 {
    let mut slots = self.slots.borrow_mut();
    let index = (0..).find(|slot| !slots.contains(slot)).unwrap_or(slots.len() as u32);
    slots.insert(index);
    index
  }

  /// Give a slot back, releasing a free slot does nothing.
  pub fn release(&self, index: u32) {
    self.slots.borrow_mut().remove(&index);
  }

  /// The number of lights alive.
  pub fn count(&self) -> u32 {
    self.slots.borrow().len() as u32
  }
}

/// A light value, either constant or sampled from a curve.
#[derive(Clone, Debug, PartialEq)]
pub enum HalaLightChannel {
  Constant(f64),
  Curve {
    curve: HalaAnimCurve,
    /// Used when the curve has no key.
    fallback: f64,
  },
}

impl HalaLightChannel {
  fn new(value: f64, curve: Option<&HalaAnimCurve>) -> Self {
    match curve {
      Some(curve) => Self::Curve { curve: curve.clone(), fallback: value },
      None => Self::Constant(value),
    }
  }

  /// The value at a time.
  pub fn evaluate(&self, time: f64) -> f64 {
    match self {
      Self::Constant(value) => *value,
      Self::Curve { curve, fallback } => curve.evaluate(time).unwrap_or(*fallback),
    }
  }

  pub fn is_animated(&self) -> bool {
    matches!(self, Self::Curve { .. })
  }
}

/// The cached state of a light.
pub struct HalaLightCache {
  registry: HalaLightRegistry,
  index: u32,
  pub name: String,
  pub light_type: HalaLightType,
  pub intensity: f64,
  /// Red, green and blue.
  pub color: [HalaLightChannel; 3],
  /// Spot lights only, in degrees.
  pub cone_angle: Option<HalaLightChannel>,
}

/// The Drop implementation of the light cache.
impl Drop for HalaLightCache {
  fn drop(&mut self) {
    self.registry.release(self.index);
    log::debug!("A HalaLightCache \"{}\" dropped.", self.name);
  }
}

/// The implementation of the light cache.
impl HalaLightCache {
  /// Capture the values of a light and bind its animated channels.
  /// param light: The light.
  /// param light_index: The index of the light in the scene, key of its curves.
  /// param anim_layer: The current animation layer.
  /// param registry: The light registry.
  /// return: The light cache.
  pub fn initialize(
    light: &HalaLight,
    light_index: u32,
    anim_layer: Option<&HalaAnimLayer>,
    registry: &HalaLightRegistry,
  ) -> Result<Self, HalaRendererError> {
    if !light.color.is_finite() || !light.intensity.is_finite() || !light.cone_angle.is_finite() {
      return Err(HalaRendererError::new(&format!("The light \"{}\" has non-finite values.", light.name), None));
    }

    let curves = anim_layer.and_then(|layer| layer.light_curves.get(&light_index));
    let color_curve = |i: usize| curves.and_then(|c| c.color[i].as_ref());
    let color = [
      HalaLightChannel::new(light.color.x, color_curve(0)),
      HalaLightChannel::new(light.color.y, color_curve(1)),
      HalaLightChannel::new(light.color.z, color_curve(2)),
    ];
    let cone_angle = if light.light_type == HalaLightType::SPOT {
      Some(HalaLightChannel::new(light.cone_angle, curves.and_then(|c| c.cone_angle.as_ref())))
    } else {
      None
    };

    let index = registry.allocate();
    log::debug!("A HalaLightCache \"{}\" created in slot {}.", light.name, index);
    Ok(Self {
      registry: registry.clone(),
      index,
      name: light.name.clone(),
      light_type: light.light_type,
      intensity: light.intensity,
      color,
      cone_angle,
    })
  }

  /// The light slot of the shader.
  pub fn index(&self) -> u32 {
    self.index
  }

  /// The colour at a time, intensity applied.
  pub fn color_at(&self, time: f64) -> DVec3 {
    DVec3::new(
      self.color[0].evaluate(time),
      self.color[1].evaluate(time),
      self.color[2].evaluate(time),
    ) * self.intensity
  }

  /// The cone angle at a time, spot lights only.
  pub fn cone_angle_at(&self, time: f64) -> Option<f64> {
    self.cone_angle.as_ref().map(|channel| channel.evaluate(time))
  }

  /// Resolve the channels at a time and upload them to the light slot.
  /// param backend: The GPU backend.
  /// param render_state: The shader state.
  /// param time: The time in seconds.
  /// param global_transform: The global transform of the light node.
  /// return: False if the slot is beyond the shader light slots.
  pub fn set_light(
    &self,
    backend: &mut dyn HalaGpuBackend,
    render_state: &HalaRenderState,
    time: f64,
    global_transform: &DMat4,
  ) -> bool {
    let Some(uniforms) = render_state.uniforms.lights.get(self.index as usize) else {
      log::warn!("The light \"{}\" in slot {} exceeds {} light slots.", self.name, self.index, MAX_LIGHT_COUNT);
      return false;
    };

    let position = global_transform.transform_point3(DVec3::ZERO);
    // Lights point down their local -Z axis.
    let direction = global_transform.transform_vector3(DVec3::NEG_Z).normalize_or_zero();

    if let Some(location) = uniforms.light_type {
      backend.set_uniform_i32(location, self.light_type.to_u8() as i32);
    }
    if let Some(location) = uniforms.color {
      backend.set_uniform_vec3(location, self.color_at(time).as_vec3());
    }
    if let Some(location) = uniforms.position {
      backend.set_uniform_vec3(location, position.as_vec3());
    }
    if let Some(location) = uniforms.direction {
      backend.set_uniform_vec3(location, direction.as_vec3());
    }
    if let (Some(location), Some(cone_angle)) = (uniforms.cone_angle, self.cone_angle_at(time)) {
      backend.set_uniform_f32(location, cone_angle as f32);
    }
    true
  }

  /// Light a scene without lights with one white point light.
  /// param backend: The GPU backend.
  /// param render_state: The shader state.
  pub fn initialize_environment(backend: &mut dyn HalaGpuBackend, render_state: &HalaRenderState) {
    let Some(uniforms) = render_state.uniforms.lights.first() else {
      return;
    };
    if let Some(location) = uniforms.light_type {
      backend.set_uniform_i32(location, HalaLightType::POINT.to_u8() as i32);
    }
    if let Some(location) = uniforms.color {
      backend.set_uniform_vec3(location, ENVIRONMENT_LIGHT_COLOR);
    }
    if let Some(location) = uniforms.position {
      backend.set_uniform_vec3(location, ENVIRONMENT_LIGHT_POSITION);
    }
    render_state.set_light_count(backend, 1);
  }
}
