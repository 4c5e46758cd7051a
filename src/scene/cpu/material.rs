use glam::DVec3;

/// One colour property of a material with its parallel factor property.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HalaMaterialChannel {
  pub color: Option<DVec3>,
  pub factor: Option<f64>,
  /// The file texture bound to the property, an index into the scene textures.
  pub texture: Option<u32>,
}

impl HalaMaterialChannel {
  pub fn with_color(color: DVec3) -> Self {
    Self {
      color: Some(color),
      ..Default::default()
    }
  }
}

/// A surface material.
#[derive(Clone, Debug, Default)]
pub struct HalaMaterial {
  pub name: String,
  pub emissive: HalaMaterialChannel,
  pub ambient: HalaMaterialChannel,
  pub diffuse: HalaMaterialChannel,
  pub specular: HalaMaterialChannel,
  pub shininess: Option<f64>,
  /// The emissive colour of the older material definition.
  /// Read when the emissive property evaluates to black.
  pub legacy_emissive: Option<DVec3>,
}
