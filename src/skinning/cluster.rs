use glam::DMat4;

use crate::scene::cpu::HalaScene;
use crate::scene::cpu::mesh::HalaMesh;
use crate::scene::cpu::pose::HalaPose;
use crate::scene::cpu::skin::{
  HalaCluster,
  HalaLinkMode,
};
use super::position::{
  get_geometry,
  get_global_position,
};

/// Compute the matrix that carries a mesh vertex from the bind pose to the
/// current pose through one cluster.
/// Every bind time transform has the geometric offset of its node folded in.
/// param scene: The scene.
/// param global_position: The current global transform of the mesh node, geometric offset included.
/// param mesh: The deformed mesh.
/// param cluster: The cluster.
/// param time: The time in seconds.
/// param pose: The optional bind or rest pose.
/// return: The deformation matrix, None if the cluster has no bone.
pub fn compute_cluster_deformation(
  scene: &HalaScene,
  global_position: &DMat4,
  mesh: &HalaMesh,
  cluster: &HalaCluster,
  time: f64,
  pose: Option<&HalaPose>,
) -> Option<DMat4> {
  let link = cluster.link?;

  let reference_geometry = mesh.node.map(|node| get_geometry(scene, node)).unwrap_or(DMat4::IDENTITY);
  let reference_global_init_position = cluster.transform * reference_geometry;
  let cluster_global_init_position = cluster.transform_link * get_geometry(scene, link);
  let cluster_global_current_position = get_global_position(scene, link, time, pose, None);

  match cluster.associate_model {
    Some(associate_model) if cluster.link_mode == HalaLinkMode::ADDITIVE => {
      let associate_global_init_position =
        cluster.transform_associate_model * get_geometry(scene, associate_model);
      let associate_global_current_position = get_global_position(scene, associate_model, time, pose, None);

      Some(
        reference_global_init_position.inverse()
          * associate_global_init_position
          * associate_global_current_position.inverse()
          * cluster_global_current_position
          * cluster_global_init_position.inverse()
          * reference_global_init_position,
      )
    },
    _ => {
      // The bone relative to the mesh at bind time, and the inverse of it at the current time.
      let cluster_relative_init_position = cluster_global_init_position.inverse() * reference_global_init_position;
      let cluster_relative_current_position_inverse = global_position.inverse() * cluster_global_current_position;
      Some(cluster_relative_current_position_inverse * cluster_relative_init_position)
    },
  }
}
