use glam::{
  DMat4,
  DVec4,
};

use crate::config::HalaSceneCacheConfig;
use crate::scene::cpu::HalaScene;
use crate::scene::cpu::mesh::HalaMesh;
use crate::scene::cpu::pose::HalaPose;
use crate::scene::cpu::skin::HalaSkinningType;
use super::linear::compute_linear_deformation;
use super::dual_quaternion::compute_dual_quaternion_deformation;

/// Deform the control points of a skinned mesh with the algorithm its first skin declares.
/// Blend skinning mixes the dual quaternion result into the linear one per control
/// point, points without a declared blend weight use the configured default.
/// param scene: The scene.
/// param global_position: The current global transform of the mesh node, geometric offset included.
/// param mesh: The skinned mesh.
/// param time: The time in seconds.
/// param vertices: The homogeneous control points, deformed in place.
/// param pose: The optional bind or rest pose.
/// param config: The configuration.
pub fn compute_skin_deformation(
  scene: &HalaScene,
  global_position: &DMat4,
  mesh: &HalaMesh,
  time: f64,
  vertices: &mut [DVec4],
  pose: Option<&HalaPose>,
  config: &HalaSceneCacheConfig,
) {
  let Some(skin) = mesh.skins.first() else {
    return;
  };

  match skin.skinning_type {
    HalaSkinningType::LINEAR | HalaSkinningType::RIGID => {
      compute_linear_deformation(scene, global_position, mesh, time, vertices, pose);
    },
    HalaSkinningType::DUAL_QUATERNION => {
      compute_dual_quaternion_deformation(scene, global_position, mesh, time, vertices, pose);
    },
    HalaSkinningType::BLEND => {
      let mut linear_vertices = vertices.to_vec();
      let mut dual_quat_vertices = vertices.to_vec();
      compute_linear_deformation(scene, global_position, mesh, time, &mut linear_vertices, pose);
      compute_dual_quaternion_deformation(scene, global_position, mesh, time, &mut dual_quat_vertices, pose);

      for (i, vertex) in vertices.iter_mut().enumerate() {
        let blend_weight = skin.blend_weight(i).unwrap_or(config.default_blend_weight);
        *vertex = dual_quat_vertices[i] * blend_weight + linear_vertices[i] * (1.0 - blend_weight);
      }
    },
    skinning_type => log::warn!("Mesh \"{}\" has an unknown skinning type {:?}.", mesh.name, skinning_type),
  }
}
