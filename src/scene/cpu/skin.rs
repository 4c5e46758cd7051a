use glam::DMat4;

use crate::error::HalaRendererError;

/// How the influences of several clusters on one control point combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HalaLinkMode(u8);
impl HalaLinkMode {
  /// The weights are divided by their sum.
  pub const NORMALIZE: Self = Self(0);
  /// The influences compose multiplicatively.
  pub const ADDITIVE: Self = Self(1);
  /// The remainder of a weight sum below one stays at the bind pose.
  pub const TOTAL_ONE: Self = Self(2);

  pub fn from_u8(value: u8) -> Result<Self, HalaRendererError> {
    match value {
      0 => Ok(Self::NORMALIZE),
      1 => Ok(Self::ADDITIVE),
      2 => Ok(Self::TOTAL_ONE),
      _ => Err(HalaRendererError::new(&format!("Invalid link mode {}.", value), None)),
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The deformation algorithm declared by a skin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HalaSkinningType(u8);
impl HalaSkinningType {
  pub const LINEAR: Self = Self(0);
  /// Evaluated as linear.
  pub const RIGID: Self = Self(1);
  pub const DUAL_QUATERNION: Self = Self(2);
  /// Per control point mix of linear and dual quaternion.
  pub const BLEND: Self = Self(3);

  pub fn from_u8(value: u8) -> Result<Self, HalaRendererError> {
    match value {
      0 => Ok(Self::LINEAR),
      1 => Ok(Self::RIGID),
      2 => Ok(Self::DUAL_QUATERNION),
      3 => Ok(Self::BLEND),
      _ => Err(HalaRendererError::new(&format!("Invalid skinning type {}.", value), None)),
    }
  }

  pub fn to_u8(&self) -> u8 {
    self.0
  }
}

/// The influence of one bone over a subset of the control points.
#[derive(Clone, Debug)]
pub struct HalaCluster {
  /// The bone node.
  pub link: Option<u32>,
  pub link_mode: HalaLinkMode,
  /// The global transform of the mesh node at bind time.
  pub transform: DMat4,
  /// The global transform of the bone at bind time.
  pub transform_link: DMat4,
  /// The associate model node, additive mode only.
  pub associate_model: Option<u32>,
  pub transform_associate_model: DMat4,
  /// (control point index, weight) pairs.
  pub influences: Vec<(u32, f64)>,
}

impl Default for HalaCluster {
  fn default() -> Self {
    Self {
      link: None,
      link_mode: HalaLinkMode::NORMALIZE,
      transform: DMat4::IDENTITY,
      transform_link: DMat4::IDENTITY,
      associate_model: None,
      transform_associate_model: DMat4::IDENTITY,
      influences: Vec::new(),
    }
  }
}

/// A skin deformer, an ordered list of clusters.
#[derive(Clone, Debug)]
pub struct HalaSkin {
  pub skinning_type: HalaSkinningType,
  pub clusters: Vec<HalaCluster>,
  /// Per control point blend weights, used by blend skinning.
  /// An empty list means no point declares one.
  pub blend_weights: Vec<f64>,
}

impl Default for HalaSkin {
  fn default() -> Self {
    Self {
      skinning_type: HalaSkinningType::LINEAR,
      clusters: Vec::new(),
      blend_weights: Vec::new(),
    }
  }
}

impl HalaSkin {
  /// The declared blend weight of a control point, clamped to [0, 1].
  /// A non-finite weight counts as undeclared.
  pub fn blend_weight(&self, control_point: usize) -> Option<f64> {
    self.blend_weights
      .get(control_point)
      .filter(|weight| weight.is_finite())
      .map(|weight| weight.clamp(0.0, 1.0))
  }
}
