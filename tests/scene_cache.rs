mod common;

use glam::{
  DVec3,
  Vec4,
};

use hala_scene_cache::config::HalaSceneCacheConfig;
use hala_scene_cache::renderer::HalaSceneRenderer;
use hala_scene_cache::scene::cpu::material::{
  HalaMaterial,
  HalaMaterialChannel,
};
use hala_scene_cache::scene::cpu::light::HalaLight;
use hala_scene_cache::scene::cpu::node::{
  HalaNode,
  HalaNodeAttribute,
};
use hala_scene_cache::scene::cpu::scene::ROOT_NODE;
use hala_scene_cache::scene::cpu::texture::HalaFileTexture;
use hala_scene_cache::scene::cpu::mesh::{
  HalaLayerElement,
  HalaMappingMode,
  HalaMesh,
};
use hala_scene_cache::scene::gpu::headless::HalaUniformValue;
use hala_scene_cache::scene::gpu::{
  HalaLightRegistry,
  HalaSceneCache,
  HalaSubMesh,
};
use hala_scene_cache::scene::loader::HalaSceneCacheBuilder;

#[test]
fn single_triangle_builds_one_sub_mesh() -> anyhow::Result<()> {
  common::init_logger();
  let (headless, backend) = common::headless();
  let (mut scene, _) = common::single_mesh_scene(common::triangle(), vec![0]);
  scene.materials.push(HalaMaterial {
    name: "grey".to_string(),
    diffuse: HalaMaterialChannel::with_color(DVec3::splat(0.5)),
    ..Default::default()
  });

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let stats = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default()).build(&scene, &mut cache);
  assert_eq!(stats.meshes_built, 1);
  assert_eq!(stats.materials_built, 1);

  let mesh_cache = cache.meshes.get(&0).ok_or(anyhow::anyhow!("mesh not cached"))?;
  assert_eq!(mesh_cache.sub_meshes(), &[HalaSubMesh { index_offset: 0, triangle_count: 1 }]);
  assert_eq!(mesh_cache.vertex_count(), 3);
  assert_eq!(mesh_cache.index_count(), 3);
  let positions = headless.borrow().buffers[&mesh_cache.position_buffer()].vertex_data.clone();
  assert_eq!(positions, vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
  Ok(())
}

#[test]
fn slot_without_material_draws_with_default_colors() {
  let (headless, backend) = common::headless();
  let (scene, _) = common::single_mesh_scene(common::triangle(), Vec::new());
  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default()).build(&scene, &mut cache);

  let render_state = common::render_state(&headless);
  let mut renderer = HalaSceneRenderer::new(HalaSceneCacheConfig::default());
  let stats = renderer.render(&scene, &cache, &render_state, 0.0, None);
  assert_eq!(stats.drawn_meshes, 1);
  assert_eq!(stats.draw_calls, 1);

  let recorded = headless.borrow();
  assert_eq!(recorded.uniform("material.diffuse"), Some(HalaUniformValue::Vec4(Vec4::new(0.8, 0.8, 0.8, 1.0))));
  assert_eq!(recorded.uniform("material.shininess"), Some(HalaUniformValue::F32(32.0)));
  // No light in the scene, the environment light fills the first slot.
  assert_eq!(recorded.uniform("light_count"), Some(HalaUniformValue::I32(1)));
  assert_eq!(recorded.draws.len(), 1);
  assert_eq!((recorded.draws[0].first_index, recorded.draws[0].index_count), (0, 3));
}

#[test]
fn second_build_allocates_nothing() {
  let (headless, backend) = common::headless();
  let (mut scene, _) = common::single_mesh_scene(common::triangle(), vec![0]);
  scene.materials.push(HalaMaterial::default());
  // A second node sharing the mesh and the material.
  scene.add_node(ROOT_NODE, HalaNode {
    attributes: vec![HalaNodeAttribute::Mesh(0)],
    materials: vec![0],
    ..HalaNode::new("instance")
  });

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let builder = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default());
  let first = builder.build(&scene, &mut cache);
  assert_eq!(first.meshes_built, 1);
  assert_eq!(first.materials_built, 1);
  let created = headless.borrow().created_buffers;
  assert_eq!(created, 2);

  let second = builder.build(&scene, &mut cache);
  assert_eq!(second, Default::default());
  assert_eq!(headless.borrow().created_buffers, created);
}

#[test]
fn failed_resources_are_skipped_and_not_retried() {
  let (headless, backend) = common::headless();
  // No control points, the mesh cannot be cached.
  let (mut scene, node) = common::single_mesh_scene(HalaMesh { name: "empty".to_string(), ..Default::default() }, vec![3]);
  scene.nodes[node as usize].attributes.push(HalaNodeAttribute::Light(9));

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let builder = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default());
  let stats = builder.build(&scene, &mut cache);
  assert_eq!((stats.meshes_failed, stats.materials_failed, stats.lights_failed), (1, 1, 1));
  assert!(cache.failed_meshes.contains(&0));

  let stats = builder.build(&scene, &mut cache);
  assert_eq!(stats, Default::default());

  let render_state = common::render_state(&headless);
  let frame = HalaSceneRenderer::new(HalaSceneCacheConfig::default()).render(&scene, &cache, &render_state, 0.0, None);
  assert_eq!(frame.drawn_meshes, 0);
  assert!(headless.borrow().draws.is_empty());
}

#[test]
fn stray_material_slot_fails_only_its_mesh() {
  let (_, backend) = common::headless();
  let mut mesh = common::triangle();
  mesh.materials = Some(HalaLayerElement::new_direct(HalaMappingMode::ByPolygon, vec![u32::MAX]));
  let (mut scene, _) = common::single_mesh_scene(mesh, vec![0]);
  scene.materials.push(HalaMaterial::default());
  assert_eq!(scene.validate().len(), 1);

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let stats = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default()).build(&scene, &mut cache);
  assert_eq!((stats.meshes_failed, stats.materials_built), (1, 1));
  assert!(cache.failed_meshes.contains(&0));
}

#[test]
fn texture_resolves_by_bare_file_name() -> anyhow::Result<()> {
  let folder = tempfile::tempdir()?;
  image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30])).save(folder.path().join("wall.png"))?;

  let (headless, backend) = common::headless();
  let (mut scene, _) = common::single_mesh_scene(common::triangle(), vec![0]);
  scene.file_path = folder.path().join("scene.gltf");
  scene.textures.push(HalaFileTexture {
    name: "wall".to_string(),
    file_name: "/missing/art/wall.png".to_string(),
    relative_file_name: "textures/wall.png".to_string(),
  });
  scene.materials.push(HalaMaterial {
    diffuse: HalaMaterialChannel { color: Some(DVec3::ONE), factor: None, texture: Some(0) },
    ..Default::default()
  });

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let stats = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default()).build(&scene, &mut cache);
  assert_eq!(stats.textures_loaded, 1);

  let texture = cache.textures.get(&0).ok_or(anyhow::anyhow!("texture not cached"))?;
  assert_eq!(texture.path, folder.path().join("wall.png"));
  assert_eq!((texture.width, texture.height), (4, 2));
  assert_eq!(cache.materials[&0].diffuse.texture, Some(texture.handle));
  assert_eq!(headless.borrow().created_textures, 1);
  Ok(())
}

#[test]
fn relative_texture_ignores_the_working_directory() -> anyhow::Result<()> {
  let decoy = tempfile::Builder::new()
    .prefix("scene_cache_decoy_")
    .suffix(".png")
    .tempfile_in(std::env::current_dir()?)?;
  image::RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0])).save(decoy.path())?;
  let file_name = decoy.path()
    .file_name()
    .and_then(|name| name.to_str())
    .ok_or(anyhow::anyhow!("bad decoy name"))?
    .to_string();

  let folder = tempfile::tempdir()?;
  image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255])).save(folder.path().join(&file_name))?;

  let (_, backend) = common::headless();
  let (mut scene, _) = common::single_mesh_scene(common::triangle(), Vec::new());
  scene.file_path = folder.path().join("scene.gltf");
  scene.textures.push(HalaFileTexture {
    name: "decoyed".to_string(),
    file_name: file_name.clone(),
    relative_file_name: file_name.clone(),
  });

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let stats = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default()).build(&scene, &mut cache);
  assert_eq!(stats.textures_loaded, 1);

  let texture = cache.textures.get(&0).ok_or(anyhow::anyhow!("texture not cached"))?;
  assert_eq!(texture.path, folder.path().join(&file_name));
  assert_eq!((texture.width, texture.height), (2, 2));
  Ok(())
}

#[test]
fn missing_texture_is_recorded_once()-> anyhow::Result<()> {
  let folder = tempfile::tempdir()?;
  let (headless, backend) = common::headless();
  let (mut scene, _) = common::single_mesh_scene(common::triangle(), Vec::new());
  scene.file_path = folder.path().join("scene.gltf");
  scene.textures.push(HalaFileTexture {
    name: "gone".to_string(),
    file_name: "gone.tga".to_string(),
    relative_file_name: "gone.tga".to_string(),
  });

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  let builder = HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default());
  assert_eq!(builder.build(&scene, &mut cache).textures_failed, 1);
  assert_eq!(builder.build(&scene, &mut cache).textures_failed, 0);
  assert_eq!(headless.borrow().created_textures, 0);
  Ok(())
}

#[test]
fn dropping_the_cache_releases_gpu_objects_and_light_slots() {
  let (headless, backend) = common::headless();
  let (mut scene, node) = common::single_mesh_scene(common::triangle(), Vec::new());
  scene.lights.push(HalaLight::default());
  scene.nodes[node as usize].attributes.push(HalaNodeAttribute::Light(0));

  let registry = HalaLightRegistry::new();
  let mut cache = HalaSceneCache::new(&backend, &registry);
  HalaSceneCacheBuilder::new(HalaSceneCacheConfig::default()).build(&scene, &mut cache);
  assert_eq!(registry.count(), 1);
  assert_eq!(headless.borrow().live_buffers(), 2);

  drop(cache);
  assert_eq!(registry.count(), 0);
  assert_eq!(headless.borrow().live_buffers(), 0);
}
