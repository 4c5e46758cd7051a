use glam::{
  DMat4,
  DQuat,
  DVec3,
  DVec4,
};

use hala_scene_cache::config::HalaSceneCacheConfig;
use hala_scene_cache::scene::cpu::HalaScene;
use hala_scene_cache::scene::cpu::mesh::HalaMesh;
use hala_scene_cache::scene::cpu::node::HalaNode;
use hala_scene_cache::scene::cpu::scene::ROOT_NODE;
use hala_scene_cache::scene::cpu::skin::{
  HalaCluster,
  HalaLinkMode,
  HalaSkin,
  HalaSkinningType,
};
use hala_scene_cache::skinning::{
  compute_cluster_deformation,
  compute_skin_deformation,
};

/// A mesh node at the origin and one bone per given current transform, all bound at the origin.
fn bones_scene(bones: &[(DVec3, DQuat)]) -> (HalaScene, u32, Vec<u32>) {
  let mut scene = HalaScene::new();
  let mesh_node = scene.add_node(ROOT_NODE, HalaNode::new("mesh"));
  let bones = bones.iter().enumerate().map(|(i, (translation, rotation))| {
    scene.add_node(ROOT_NODE, HalaNode {
      translation: *translation,
      rotation: *rotation,
      ..HalaNode::new(&format!("bone{}", i))
    })
  }).collect();
  (scene, mesh_node, bones)
}

fn skinned_mesh(
  mesh_node: u32,
  points: Vec<DVec3>,
  skinning_type: HalaSkinningType,
  clusters: Vec<HalaCluster>,
) -> HalaMesh {
  HalaMesh {
    name: "skinned".to_string(),
    control_points: points,
    node: Some(mesh_node),
    skins: vec![HalaSkin { skinning_type, clusters, blend_weights: Vec::new() }],
    ..Default::default()
  }
}

fn cluster(link: u32, link_mode: HalaLinkMode, influences: Vec<(u32, f64)>) -> HalaCluster {
  HalaCluster { link: Some(link), link_mode, influences, ..Default::default() }
}

fn deform(scene: &HalaScene, mesh: &HalaMesh) -> Vec<DVec4> {
  let mut vertices = mesh.control_points_homogeneous();
  compute_skin_deformation(scene, &DMat4::IDENTITY, mesh, 0.0, &mut vertices, None, &HalaSceneCacheConfig::default());
  vertices
}

fn quad() -> Vec<DVec3> {
  vec![
    DVec3::new(0.0, 0.0, 0.0),
    DVec3::new(1.0, 0.0, 0.0),
    DVec3::new(1.0, 1.0, 0.0),
    DVec3::new(0.0, 1.0, 0.0),
  ]
}

#[test]
fn half_weights_follow_half_the_moved_bone() {
  let (scene, mesh_node, bones) = bones_scene(&[
    (DVec3::new(10.0, 0.0, 0.0), DQuat::IDENTITY),
    (DVec3::ZERO, DQuat::IDENTITY),
  ]);
  let all_half = (0..4).map(|i| (i, 0.5)).collect::<Vec<_>>();
  let mesh = skinned_mesh(mesh_node, quad(), HalaSkinningType::LINEAR, vec![
    cluster(bones[0], HalaLinkMode::NORMALIZE, all_half.clone()),
    cluster(bones[1], HalaLinkMode::NORMALIZE, all_half),
  ]);

  let deformed = deform(&scene, &mesh);
  for (point, original) in deformed.iter().zip(quad()) {
    assert!(point.truncate().abs_diff_eq(original + DVec3::new(5.0, 0.0, 0.0), 1e-12));
    assert_eq!(point.w, 1.0);
  }
}

#[test]
fn additive_full_weight_applies_the_raw_deformation() {
  let (scene, mesh_node, bones) = bones_scene(&[
    (DVec3::new(1.0, 2.0, 3.0), DQuat::from_rotation_z(0.7)),
  ]);
  let mesh = skinned_mesh(mesh_node, quad(), HalaSkinningType::LINEAR, vec![
    cluster(bones[0], HalaLinkMode::ADDITIVE, (0..4).map(|i| (i, 1.0)).collect()),
  ]);

  let deformation = compute_cluster_deformation(&scene, &DMat4::IDENTITY, &mesh, &mesh.skins[0].clusters[0], 0.0, None)
    .unwrap();
  let deformed = deform(&scene, &mesh);
  for (point, original) in deformed.iter().zip(mesh.control_points_homogeneous()) {
    assert!(point.abs_diff_eq(deformation * original, 1e-12));
  }
}

#[test]
fn points_without_influence_keep_their_bind_position() {
  for link_mode in [HalaLinkMode::NORMALIZE, HalaLinkMode::TOTAL_ONE] {
    for skinning_type in [HalaSkinningType::LINEAR, HalaSkinningType::DUAL_QUATERNION] {
      let (scene, mesh_node, bones) = bones_scene(&[
        (DVec3::new(3.0, -1.0, 0.5), DQuat::from_rotation_x(1.1)),
      ]);
      // The last point has a zero weight, the out of range index is ignored.
      let mesh = skinned_mesh(mesh_node, quad(), skinning_type, vec![
        cluster(bones[0], link_mode, vec![(0, 1.0), (3, 0.0), (42, 1.0)]),
      ]);

      let deformed = deform(&scene, &mesh);
      let original = mesh.control_points_homogeneous();
      assert_eq!(&deformed[1..], &original[1..]);
      assert!(!deformed[0].abs_diff_eq(original[0], 1e-6));
    }
  }
}

#[test]
fn total_one_partial_weight_is_a_convex_combination() {
  let (scene, mesh_node, bones) = bones_scene(&[
    (DVec3::new(10.0, 0.0, 0.0), DQuat::IDENTITY),
  ]);
  let mesh = skinned_mesh(mesh_node, quad(), HalaSkinningType::LINEAR, vec![
    cluster(bones[0], HalaLinkMode::TOTAL_ONE, vec![(0, 0.3), (2, 1.0)]),
  ]);

  let deformed = deform(&scene, &mesh);
  let original = quad();
  let full = original[0] + DVec3::new(10.0, 0.0, 0.0);
  assert!(deformed[0].truncate().abs_diff_eq(full * 0.3 + original[0] * 0.7, 1e-12));
  assert!(deformed[2].truncate().abs_diff_eq(original[2] + DVec3::new(10.0, 0.0, 0.0), 1e-12));
  assert_eq!(deformed[1].truncate(), original[1]);
}

#[test]
fn dual_quaternion_blend_across_the_half_turn_does_not_cancel() {
  // Both rotations are one degree away from a half turn, on either side of it.
  let angle = 179f64.to_radians();
  let (scene, mesh_node, bones) = bones_scene(&[
    (DVec3::ZERO, DQuat::from_rotation_z(angle)),
    (DVec3::ZERO, DQuat::from_rotation_z(-angle)),
  ]);
  let mesh = skinned_mesh(mesh_node, vec![DVec3::X], HalaSkinningType::DUAL_QUATERNION, vec![
    cluster(bones[0], HalaLinkMode::NORMALIZE, vec![(0, 0.5)]),
    cluster(bones[1], HalaLinkMode::NORMALIZE, vec![(0, 0.5)]),
  ]);

  let deformed = deform(&scene, &mesh);
  assert!(deformed[0].truncate().abs_diff_eq(DVec3::new(-1.0, 0.0, 0.0), 1e-9));
}

#[test]
fn rigid_skinning_is_linear() {
  let (scene, mesh_node, bones) = bones_scene(&[
    (DVec3::new(0.0, 4.0, 0.0), DQuat::from_rotation_y(0.3)),
    (DVec3::ZERO, DQuat::IDENTITY),
  ]);
  let clusters = vec![
    cluster(bones[0], HalaLinkMode::NORMALIZE, vec![(0, 0.25), (1, 0.75)]),
    cluster(bones[1], HalaLinkMode::NORMALIZE, vec![(0, 0.75), (1, 0.25)]),
  ];
  let linear = deform(&scene, &skinned_mesh(mesh_node, quad(), HalaSkinningType::LINEAR, clusters.clone()));
  let rigid = deform(&scene, &skinned_mesh(mesh_node, quad(), HalaSkinningType::RIGID, clusters));
  assert_eq!(linear, rigid);
}
