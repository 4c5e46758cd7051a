use glam::{
  DMat4,
  DVec4,
};

use crate::math::HalaDualQuat;
use crate::scene::cpu::HalaScene;
use crate::scene::cpu::mesh::HalaMesh;
use crate::scene::cpu::pose::HalaPose;
use crate::scene::cpu::skin::HalaLinkMode;
use super::linear::{
  for_each_influence,
  resolve_weighted_position,
};

/// Fold one weighted cluster deformation into the accumulator of a control point.
/// Contributions whose rotation lies in the opposite hemisphere of the running
/// sum are subtracted so both covers of a rotation reinforce each other.
/// param accumulator: The running dual quaternion.
/// param weight_accumulator: The running weight, zero until the first contribution.
/// param deformation: The cluster deformation as a dual quaternion.
/// param weight: The weight of the control point in the cluster.
/// param link_mode: The link mode of the mesh.
pub fn accumulate_dual_quat_influence(
  accumulator: &mut HalaDualQuat,
  weight_accumulator: &mut f64,
  deformation: &HalaDualQuat,
  weight: f64,
  link_mode: HalaLinkMode,
) {
  let influence = *deformation * weight;
  if link_mode == HalaLinkMode::ADDITIVE {
    *accumulator = influence;
    *weight_accumulator = 1.0;
    return;
  }

  if *weight_accumulator == 0.0 {
    *accumulator = influence;
  } else if accumulator.real_dot(&influence) >= 0.0 {
    *accumulator += influence;
  } else {
    *accumulator -= influence;
  }
  *weight_accumulator += weight;
}

/// Deform the control points of a mesh with dual quaternion skinning.
/// param scene: The scene.
/// param global_position: The current global transform of the mesh node, geometric offset included.
/// param mesh: The skinned mesh.
/// param time: The time in seconds.
/// param vertices: The homogeneous control points, deformed in place.
/// param pose: The optional bind or rest pose.
pub fn compute_dual_quaternion_deformation(
  scene: &HalaScene,
  global_position: &DMat4,
  mesh: &HalaMesh,
  time: f64,
  vertices: &mut [DVec4],
  pose: Option<&HalaPose>,
) {
  let link_mode = mesh.link_mode();
  let vertex_count = vertices.len();

  let mut deformations = vec![HalaDualQuat::ZERO; vertex_count];
  let mut weights = vec![0.0f64; vertex_count];

  for_each_influence(scene, global_position, mesh, time, pose, vertex_count, |deformation, index, weight| {
    let dual_quat = HalaDualQuat::from_mat4(deformation);
    accumulate_dual_quat_influence(&mut deformations[index], &mut weights[index], &dual_quat, weight, link_mode);
  });

  for ((vertex, deformation), &weight) in vertices.iter_mut().zip(deformations.iter()).zip(weights.iter()) {
    if weight == 0.0 {
      continue;
    }
    let Some(unit) = deformation.normalize() else {
      log::warn!("Mesh \"{}\" has a control point whose rotations cancel out.", mesh.name);
      continue;
    };
    // Weighted the same way as the linear sum before the policy is applied.
    let weighted = unit.deform(*vertex) * weight;
    *vertex = resolve_weighted_position(weighted, *vertex, weight, link_mode);
  }
}
