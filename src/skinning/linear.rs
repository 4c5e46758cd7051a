use glam::{
  DMat4,
  DVec4,
};

use crate::scene::cpu::HalaScene;
use crate::scene::cpu::mesh::HalaMesh;
use crate::scene::cpu::pose::HalaPose;
use crate::scene::cpu::skin::HalaLinkMode;
use super::cluster::compute_cluster_deformation;

/// Visit every usable influence of every cluster of the mesh.
/// Clusters without a bone, non-positive weights and control points beyond
/// `vertex_count` are skipped.
pub(crate) fn for_each_influence<F>(
  scene: &HalaScene,
  global_position: &DMat4,
  mesh: &HalaMesh,
  time: f64,
  pose: Option<&HalaPose>,
  vertex_count: usize,
  mut f: F,
) where
  F: FnMut(&DMat4, usize, f64),
{
  for skin in mesh.skins.iter() {
    for cluster in skin.clusters.iter() {
      let Some(deformation) = compute_cluster_deformation(scene, global_position, mesh, cluster, time, pose) else {
        continue;
      };
      for &(index, weight) in cluster.influences.iter() {
        let index = index as usize;
        // Meshes may have fewer points than at bind time.
        if index >= vertex_count || weight.is_nan() || weight <= 0.0 {
          continue;
        }
        f(&deformation, index, weight);
      }
    }
  }
}

/// Fold one weighted cluster deformation into the accumulator of a control point.
/// param accumulator: The running matrix, zero or identity for additive mode.
/// param weight_accumulator: The running weight.
/// param deformation: The cluster deformation.
/// param weight: The weight of the control point in the cluster.
/// param link_mode: The link mode of the mesh.
pub fn accumulate_linear_influence(
  accumulator: &mut DMat4,
  weight_accumulator: &mut f64,
  deformation: &DMat4,
  weight: f64,
  link_mode: HalaLinkMode,
) {
  let mut influence = *deformation * weight;
  if link_mode == HalaLinkMode::ADDITIVE {
    let rest = 1.0 - weight;
    influence.x_axis.x += rest;
    influence.y_axis.y += rest;
    influence.z_axis.z += rest;
    influence.w_axis.w += rest;
    *accumulator = influence * *accumulator;
    // Only marks that the point has an influence.
    *weight_accumulator = 1.0;
  } else {
    *accumulator += influence;
    *weight_accumulator += weight;
  }
}

/// Apply the weight policy of the link mode to a weighted deformed position.
/// param weighted: The sum of the weighted deformed positions.
/// param original: The bind pose position.
/// param weight: The accumulated weight, non-zero.
/// param link_mode: The link mode of the mesh.
/// return: The final position.
pub fn resolve_weighted_position(weighted: DVec4, original: DVec4, weight: f64, link_mode: HalaLinkMode) -> DVec4 {
  if link_mode == HalaLinkMode::NORMALIZE {
    weighted / weight
  } else if link_mode == HalaLinkMode::TOTAL_ONE {
    weighted + original * (1.0 - weight)
  } else {
    weighted
  }
}

/// Deform the control points of a mesh with linear blend skinning.
/// param scene: The scene.
/// param global_position: The current global transform of the mesh node, geometric offset included.
/// param mesh: The skinned mesh.
/// param time: The time in seconds.
/// param vertices: The homogeneous control points, deformed in place.
/// param pose: The optional bind or rest pose.
pub fn compute_linear_deformation(
  scene: &HalaScene,
  global_position: &DMat4,
  mesh: &HalaMesh,
  time: f64,
  vertices: &mut [DVec4],
  pose: Option<&HalaPose>,
) {
  let link_mode = mesh.link_mode();
  let vertex_count = vertices.len();

  let initial = if link_mode == HalaLinkMode::ADDITIVE { DMat4::IDENTITY } else { DMat4::ZERO };
  let mut deformations = vec![initial; vertex_count];
  let mut weights = vec![0.0f64; vertex_count];

  for_each_influence(scene, global_position, mesh, time, pose, vertex_count, |deformation, index, weight| {
    accumulate_linear_influence(&mut deformations[index], &mut weights[index], deformation, weight, link_mode);
  });

  for ((vertex, deformation), &weight) in vertices.iter_mut().zip(deformations.iter()).zip(weights.iter()) {
    if weight != 0.0 {
      *vertex = resolve_weighted_position(*deformation * *vertex, *vertex, weight, link_mode);
    }
  }
}
