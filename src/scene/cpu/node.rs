use glam::{
  DMat4,
  DQuat,
  DVec3,
};

/// The node-local offset applied to attached attributes only.
/// Children never inherit it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalaGeometricOffset {
  pub translation: DVec3,
  pub rotation: DQuat,
  pub scale: DVec3,
}

impl Default for HalaGeometricOffset {
  fn default() -> Self {
    Self {
      translation: DVec3::ZERO,
      rotation: DQuat::IDENTITY,
      scale: DVec3::ONE,
    }
  }
}

impl HalaGeometricOffset {
  /// The offset as a T * R * S matrix.
  pub fn to_mat4(&self) -> DMat4 {
    DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
  }
}

/// An attribute attached to a node, referencing the scene arenas by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaNodeAttribute {
  Mesh(u32),
  Light(u32),
  Skeleton,
  Null,
}

/// A node is a collection of transforms, attributes and child indices.
#[derive(Clone, Debug)]
pub struct HalaNode {
  pub name: String,
  pub parent: Option<u32>,
  pub children: Vec<u32>,
  pub translation: DVec3,
  pub rotation: DQuat,
  pub scale: DVec3,
  pub geometric: HalaGeometricOffset,
  pub attributes: Vec<HalaNodeAttribute>,
  /// The material slots of the node, indices into the scene materials.
  pub materials: Vec<u32>,
}

/// The default implementation of the node.
impl Default for HalaNode {
  fn default() -> Self {
    Self {
      name: String::new(),
      parent: None,
      children: Vec::new(),
      translation: DVec3::ZERO,
      rotation: DQuat::IDENTITY,
      scale: DVec3::ONE,
      geometric: HalaGeometricOffset::default(),
      attributes: Vec::new(),
      materials: Vec::new(),
    }
  }
}

/// The implementation of the node.
impl HalaNode {
  /// Create a named node with identity transforms.
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      ..Default::default()
    }
  }

  /// The static local transform, T * R * S.
  pub fn local_transform(&self) -> DMat4 {
    DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
  }

  /// The geometric offset matrix of the node.
  pub fn geometry(&self) -> DMat4 {
    self.geometric.to_mat4()
  }

  /// The first mesh attribute of the node.
  pub fn mesh(&self) -> Option<u32> {
    self.attributes.iter().find_map(|attribute| match attribute {
      HalaNodeAttribute::Mesh(index) => Some(*index),
      _ => None,
    })
  }

  /// The first light attribute of the node.
  pub fn light(&self) -> Option<u32> {
    self.attributes.iter().find_map(|attribute| match attribute {
      HalaNodeAttribute::Light(index) => Some(*index),
      _ => None,
    })
  }
}
