mod common;

use glam::{
  DMat4,
  DVec3,
  DVec4,
};

use hala_scene_cache::config::HalaSceneCacheConfig;
use hala_scene_cache::scene::cpu::HalaScene;
use hala_scene_cache::scene::cpu::light::HalaLightType;
use hala_scene_cache::scene::cpu::mesh::HalaMappingMode;
use hala_scene_cache::scene::cpu::node::HalaNodeAttribute;
use hala_scene_cache::scene::cpu::skin::{
  HalaLinkMode,
  HalaSkinningType,
};
use hala_scene_cache::scene::gpu::headless::HalaUniformValue;
use hala_scene_cache::scene::gpu::HalaLightRegistry;
use hala_scene_cache::scene_context::{
  HalaSceneContext,
  HalaSceneStatus,
};
use hala_scene_cache::skinning::compute_skin_deformation;

#[test]
fn import_materialises_the_scene_graph() -> anyhow::Result<()> {
  common::init_logger();
  let folder = tempfile::tempdir()?;
  let path = common::write_skinned_gltf(folder.path())?;

  let scene = HalaScene::load(&path)?;
  assert!(scene.validate().is_empty());
  let names = scene.nodes.iter().map(|node| node.name.as_str()).collect::<Vec<_>>();
  assert_eq!(names, vec!["RootNode", "mesh", "root_joint", "tip_joint"]);
  assert_eq!(scene.nodes[3].parent, Some(2));
  assert_eq!(scene.nodes[1].attributes, vec![HalaNodeAttribute::Mesh(0)]);
  assert_eq!(scene.nodes[1].materials, vec![0]);
  assert!(scene.nodes[2].attributes.contains(&HalaNodeAttribute::Light(0)));
  assert!(scene.nodes[3].attributes.contains(&HalaNodeAttribute::Skeleton));

  let mesh = &scene.meshes[0];
  assert_eq!(mesh.node, Some(1));
  assert_eq!(mesh.control_points.len(), 3);
  assert_eq!(mesh.polygons, vec![vec![0, 1, 2]]);
  assert_eq!(mesh.materials.as_ref().map(|m| m.mapping_mode), Some(HalaMappingMode::ByPolygon));
  assert!(mesh.normals.is_none());

  let skin = &mesh.skins[0];
  assert_eq!(skin.skinning_type, HalaSkinningType::LINEAR);
  assert_eq!(skin.clusters.len(), 2);
  assert_eq!(skin.clusters[0].link, Some(2));
  assert_eq!(skin.clusters[0].link_mode, HalaLinkMode::NORMALIZE);
  assert_eq!(skin.clusters[0].influences, vec![(0, 1.0), (1, 1.0), (2, 0.5)]);
  assert_eq!(skin.clusters[1].influences, vec![(2, 0.5)]);
  assert!(skin.clusters[1].transform_link.abs_diff_eq(DMat4::from_translation(DVec3::Y), 1e-6));

  assert_eq!(scene.poses.len(), 1);
  assert!(scene.poses[0].is_bind_pose);
  assert_eq!(scene.poses[0].entries.len(), 3);

  let material = &scene.materials[0];
  assert_eq!(material.diffuse.color, Some(DVec3::new(1.0, 0.0, 0.0)));
  assert_eq!(material.diffuse.texture, Some(0));
  assert!((material.shininess.unwrap_or_default() - 30.0).abs() < 1e-9);
  assert_eq!(scene.textures[0].relative_file_name, "textures/red.png");

  let light = &scene.lights[0];
  assert_eq!(light.light_type, HalaLightType::SPOT);
  assert!((light.cone_angle - 45.0).abs() < 1e-4);

  let stack = &scene.anim_stacks[0];
  assert_eq!((stack.name.as_str(), stack.start, stack.stop), ("reach", 0.0, 1.0));
  Ok(())
}

#[test]
fn imported_skin_follows_the_animated_joint() -> anyhow::Result<()> {
  let folder = tempfile::tempdir()?;
  let mut scene = HalaScene::load(common::write_skinned_gltf(folder.path())?)?;
  scene.set_current_anim_stack(Some(0))?;

  let mesh = &scene.meshes[0];
  let global_position = scene.evaluate_global_transform(1, 1.0);
  let mut vertices = mesh.control_points_homogeneous();
  compute_skin_deformation(&scene, &global_position, mesh, 1.0, &mut vertices, None, &HalaSceneCacheConfig::default());
  assert!(vertices[0].abs_diff_eq(DVec4::new(0.0, 0.0, 0.0, 1.0), 1e-6));
  assert!(vertices[1].abs_diff_eq(DVec4::new(1.0, 0.0, 0.0, 1.0), 1e-6));
  assert!(vertices[2].abs_diff_eq(DVec4::new(5.0, 2.0, 0.0, 1.0), 1e-6));
  Ok(())
}

#[test]
fn context_loads_animates_and_draws() -> anyhow::Result<()> {
  common::init_logger();
  let folder = tempfile::tempdir()?;
  let path = common::write_skinned_gltf(folder.path())?;
  let (headless, backend) = common::headless();
  let registry = HalaLightRegistry::new();

  let config = HalaSceneCacheConfig { frames_per_second: 4.0, ..Default::default() };
  let mut context = HalaSceneContext::new(&path, config)?;
  context.load_file(&backend, &registry)?;
  assert_eq!(context.status(), HalaSceneStatus::MustBeRefreshed);
  assert_eq!(context.time_bounds(), (0.0, 1.0));
  let stats = context.build_stats();
  assert_eq!((stats.textures_loaded, stats.materials_built, stats.meshes_built, stats.lights_built), (1, 1, 1, 1));
  assert_eq!(registry.count(), 1);

  // A second load is refused.
  assert!(context.load_file(&backend, &registry).is_err());

  context.on_timer_click();
  assert_eq!(context.current_time(), 0.25);

  let render_state = common::render_state(&headless);
  let frame = context.on_display(&render_state).ok_or(anyhow::anyhow!("nothing drawn"))?;
  assert_eq!(context.status(), HalaSceneStatus::Refreshed);
  assert_eq!((frame.drawn_meshes, frame.skinned_meshes, frame.draw_calls, frame.lights), (1, 1, 1, 1));

  {
    let recorded = headless.borrow();
    let positions = recorded.buffers.values()
      .find(|buffer| buffer.debug_name.ends_with(".positions"))
      .ok_or(anyhow::anyhow!("no position buffer"))?;
    assert_eq!(positions.upload_count, 2);
    assert!((positions.vertex_data[8] - 1.25).abs() < 1e-5);
    assert!((positions.vertex_data[9] - 2.0).abs() < 1e-5);
    assert_eq!(recorded.uniform("lights[0].type"), Some(HalaUniformValue::I32(HalaLightType::SPOT.to_u8() as i32)));
    assert_eq!(recorded.uniform("light_count"), Some(HalaUniformValue::I32(1)));
    assert!(recorded.draws[0].texture.is_some());
  }

  // The clock wraps from the stop time back to the start time.
  for _ in 0..3 {
    context.on_timer_click();
  }
  assert_eq!(context.current_time(), 1.0);
  context.on_timer_click();
  assert_eq!(context.current_time(), 0.0);

  context.set_pause(true);
  context.on_timer_click();
  assert_eq!(context.current_time(), 0.0);

  // The bind pose puts every vertex back where it was authored.
  context.set_current_pose(Some(0))?;
  assert!(context.set_current_pose(Some(5)).is_err());
  context.on_display(&render_state);
  {
    let recorded = headless.borrow();
    let positions = recorded.buffers.values()
      .find(|buffer| buffer.debug_name.ends_with(".positions"))
      .ok_or(anyhow::anyhow!("no position buffer"))?;
    assert!((positions.vertex_data[8] - 0.0).abs() < 1e-5);
    assert!((positions.vertex_data[9] - 2.0).abs() < 1e-5);
  }

  drop(context);
  assert_eq!(registry.count(), 0);
  assert_eq!(headless.borrow().live_buffers(), 0);
  Ok(())
}
