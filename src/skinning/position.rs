use glam::DMat4;

use crate::scene::cpu::HalaScene;
use crate::scene::cpu::pose::HalaPose;

/// The geometric offset of a node, identity for an invalid index.
pub fn get_geometry(scene: &HalaScene, node: u32) -> DMat4 {
  scene.nodes.get(node as usize).map(|n| n.geometry()).unwrap_or(DMat4::IDENTITY)
}

/// Resolve the global transform of a node.
///
/// A pose entry is used as is when the pose is a bind pose or the entry is global.
/// A local entry is composed with the parent global transform, taken from
/// `parent_global_position` or resolved through the parent chain with the same pose.
/// Nodes without an entry are evaluated at `time`.
/// param scene: The scene.
/// param node: The node index.
/// param time: The time in seconds.
/// param pose: The optional bind or rest pose.
/// param parent_global_position: The global transform of the parent, if known.
/// return: The global transform, without the geometric offset.
pub fn get_global_position(
  scene: &HalaScene,
  node: u32,
  time: f64,
  pose: Option<&HalaPose>,
  parent_global_position: Option<&DMat4>,
) -> DMat4 {
  let Some(pose) = pose else {
    return scene.evaluate_global_transform(node, time);
  };

  // Local pose matrices from the node upwards.
  let mut locals = Vec::new();
  let mut parent_global_position = parent_global_position.copied();
  let mut current = node;
  let base = loop {
    match pose.find(current) {
      Some(entry) if pose.is_bind_pose || !entry.is_local => break entry.matrix,
      Some(entry) => {
        locals.push(entry.matrix);
        if let Some(parent_global) = parent_global_position.take() {
          break parent_global;
        }
        match scene.nodes.get(current as usize).and_then(|n| n.parent) {
          Some(parent) if locals.len() <= scene.nodes.len() => current = parent,
          _ => break DMat4::IDENTITY,
        }
      },
      None => break scene.evaluate_global_transform(current, time),
    }
  };

  locals.iter().rev().fold(base, |global, local| global * *local)
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use super::*;
  use crate::scene::cpu::node::HalaNode;
  use crate::scene::cpu::pose::HalaPoseEntry;
  use crate::scene::cpu::scene::ROOT_NODE;

  fn chain() -> (HalaScene, u32, u32) {
    let mut scene = HalaScene::new();
    let a = scene.add_node(ROOT_NODE, HalaNode {
      translation: DVec3::new(0.0, 5.0, 0.0),
      ..HalaNode::new("a")
    });
    let b = scene.add_node(a, HalaNode {
      translation: DVec3::new(1.0, 0.0, 0.0),
      ..HalaNode::new("b")
    });
    (scene, a, b)
  }

  fn translation(m: &DMat4) -> DVec3 {
    m.transform_point3(DVec3::ZERO)
  }

  #[test]
  fn without_pose_the_node_is_evaluated() {
    let (scene, _, b) = chain();
    let m = get_global_position(&scene, b, 0.0, None, None);
    assert!(translation(&m).abs_diff_eq(DVec3::new(1.0, 5.0, 0.0), 1e-12));
  }

  #[test]
  fn bind_pose_entry_is_returned_directly() {
    let (scene, _, b) = chain();
    let stored = DMat4::from_translation(DVec3::new(7.0, 7.0, 7.0));
    let pose = HalaPose {
      is_bind_pose: true,
      entries: vec![HalaPoseEntry { node: b, matrix: stored, is_local: true }],
      ..Default::default()
    };
    assert_eq!(get_global_position(&scene, b, 0.0, Some(&pose), None), stored);
  }

  #[test]
  fn local_rest_pose_entries_compose_through_parents() {
    let (scene, a, b) = chain();
    let pose = HalaPose {
      is_bind_pose: false,
      entries: vec![
        HalaPoseEntry { node: b, matrix: DMat4::from_translation(DVec3::new(0.0, 0.0, 2.0)), is_local: true },
        HalaPoseEntry { node: a, matrix: DMat4::from_translation(DVec3::new(3.0, 0.0, 0.0)), is_local: true },
      ],
      ..Default::default()
    };
    // a has no parent entry, the root is evaluated.
    let m = get_global_position(&scene, b, 0.0, Some(&pose), None);
    assert!(translation(&m).abs_diff_eq(DVec3::new(3.0, 0.0, 2.0), 1e-12));

    let parent = DMat4::from_translation(DVec3::new(0.0, -1.0, 0.0));
    let m = get_global_position(&scene, b, 0.0, Some(&pose), Some(&parent));
    assert!(translation(&m).abs_diff_eq(DVec3::new(0.0, -1.0, 2.0), 1e-12));
  }

  #[test]
  fn node_missing_from_pose_falls_back_to_evaluation() {
    let (scene, a, b) = chain();
    let pose = HalaPose {
      entries: vec![HalaPoseEntry { node: a, matrix: DMat4::IDENTITY, is_local: false }],
      ..Default::default()
    };
    let m = get_global_position(&scene, b, 0.0, Some(&pose), None);
    assert!(translation(&m).abs_diff_eq(DVec3::new(1.0, 5.0, 0.0), 1e-12));
  }
}
