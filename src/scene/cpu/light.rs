use glam::DVec3;

/// The type of the light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalaLightType(u8);
impl HalaLightType {
  pub const POINT: Self = Self(0);
  pub const DIRECTIONAL: Self = Self(1);
  pub const SPOT: Self = Self(2);
  pub const AREA: Self = Self(3);

  pub fn from_u8(value: u8) -> Option<Self> {
    match value {
      0 => Some(Self::POINT),
      1 => Some(Self::DIRECTIONAL),
      2 => Some(Self::SPOT),
      3 => Some(Self::AREA),
      _ => None,
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// A light source in the scene.
#[derive(Clone, Debug)]
pub struct HalaLight {
  pub name: String,
  pub light_type: HalaLightType,
  pub color: DVec3,
  pub intensity: f64,
  /// The outer cone angle in degrees, spot lights only.
  pub cone_angle: f64,
}

impl Default for HalaLight {
  fn default() -> Self {
    Self {
      name: String::new(),
      light_type: HalaLightType::POINT,
      color: DVec3::ONE,
      intensity: 1.0,
      cone_angle: 45.0,
    }
  }
}
