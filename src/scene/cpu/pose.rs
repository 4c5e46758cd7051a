use glam::DMat4;

/// One node matrix stored in a pose.
#[derive(Clone, Debug)]
pub struct HalaPoseEntry {
  pub node: u32,
  pub matrix: DMat4,
  /// The matrix is relative to the parent node.
  pub is_local: bool,
}

/// A bind pose or a rest pose.
#[derive(Clone, Debug, Default)]
pub struct HalaPose {
  pub name: String,
  pub is_bind_pose: bool,
  pub entries: Vec<HalaPoseEntry>,
}

impl HalaPose {
  /// Find the entry of a node.
  pub fn find(&self, node: u32) -> Option<&HalaPoseEntry> {
    self.entries.iter().find(|entry| entry.node == node)
  }
}
