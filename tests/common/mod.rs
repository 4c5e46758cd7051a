#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use glam::DVec3;

use hala_scene_cache::scene::cpu::HalaScene;
use hala_scene_cache::scene::cpu::mesh::HalaMesh;
use hala_scene_cache::scene::cpu::node::{
  HalaNode,
  HalaNodeAttribute,
};
use hala_scene_cache::scene::cpu::scene::ROOT_NODE;
use hala_scene_cache::scene::gpu::backend::HalaProgramHandle;
use hala_scene_cache::scene::gpu::{
  HalaGpuBackendRef,
  HalaHeadlessBackend,
  HalaRenderState,
};

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// A recording backend, shared as the trait object the caches expect.
pub fn headless() -> (Rc<RefCell<HalaHeadlessBackend>>, HalaGpuBackendRef) {
  let headless = Rc::new(RefCell::new(HalaHeadlessBackend::new()));
  let backend: HalaGpuBackendRef = headless.clone();
  (headless, backend)
}

pub fn render_state(headless: &Rc<RefCell<HalaHeadlessBackend>>) -> HalaRenderState {
  HalaRenderState::new(&mut *headless.borrow_mut(), HalaProgramHandle(1))
}

/// A scene with one mesh node holding the mesh 0 and the given material slots.
pub fn single_mesh_scene(mesh: HalaMesh, materials: Vec<u32>) -> (HalaScene, u32) {
  let mut scene = HalaScene::new();
  let node = scene.add_node(ROOT_NODE, HalaNode {
    attributes: vec![HalaNodeAttribute::Mesh(0)],
    materials,
    ..HalaNode::new("mesh")
  });
  scene.meshes.push(mesh);
  scene.update_node_hierarchies();
  (scene, node)
}

pub fn triangle() -> HalaMesh {
  HalaMesh {
    name: "triangle".to_string(),
    control_points: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
    polygons: vec![vec![0, 1, 2]],
    ..Default::default()
  }
}

/// Write a small skinned glTF scene next to its buffer and texture.
///
/// Nodes: "mesh" (skinned triangle), "root_joint" holding a spot light, and its
/// child "tip_joint" one unit up. The animation moves the tip from (0, 1, 0) to
/// (10, 1, 0) over one second. The third vertex is shared half and half by the
/// joints, the other two follow the root joint.
pub fn write_skinned_gltf(folder: &Path) -> anyhow::Result<std::path::PathBuf> {
  fn push_f32(bytes: &mut Vec<u8>, values: &[f32]) {
    for v in values {
      bytes.extend_from_slice(&v.to_le_bytes());
    }
  }

  let mut bytes: Vec<u8> = Vec::new();

  // Positions, offset 0, 36 bytes.
  push_f32(&mut bytes, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
  // Indices, offset 36, 6 bytes padded to 8.
  for i in [0u16, 1, 2] {
    bytes.extend_from_slice(&i.to_le_bytes());
  }
  bytes.extend_from_slice(&[0, 0]);
  // Joints, offset 44, 24 bytes.
  for _ in 0..3 {
    for j in [0u16, 1, 0, 0] {
      bytes.extend_from_slice(&j.to_le_bytes());
    }
  }
  // Weights, offset 68, 48 bytes.
  push_f32(&mut bytes, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0]);
  // Inverse bind matrices, offset 116, 128 bytes.
  push_f32(&mut bytes, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
  push_f32(&mut bytes, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 1.0]);
  // Key times, offset 244, 8 bytes.
  push_f32(&mut bytes, &[0.0, 1.0]);
  // Key translations, offset 252, 24 bytes.
  push_f32(&mut bytes, &[0.0, 1.0, 0.0, 10.0, 1.0, 0.0]);
  assert_eq!(bytes.len(), 276);
  std::fs::write(folder.join("scene.bin"), &bytes)?;

  let document = serde_json::json!({
    "asset": { "version": "2.0" },
    "extensionsUsed": ["KHR_lights_punctual"],
    "extensions": {
      "KHR_lights_punctual": {
        "lights": [{
          "name": "spot",
          "type": "spot",
          "color": [1.0, 0.5, 0.25],
          "intensity": 2.0,
          "spot": { "innerConeAngle": 0.1, "outerConeAngle": std::f64::consts::FRAC_PI_4 }
        }]
      }
    },
    "scene": 0,
    "scenes": [{ "name": "main", "nodes": [0, 1] }],
    "nodes": [
      { "name": "mesh", "mesh": 0, "skin": 0 },
      {
        "name": "root_joint",
        "children": [2],
        "extensions": { "KHR_lights_punctual": { "light": 0 } }
      },
      { "name": "tip_joint", "translation": [0.0, 1.0, 0.0] }
    ],
    "meshes": [{
      "name": "triangle",
      "primitives": [{
        "attributes": { "POSITION": 0, "JOINTS_0": 2, "WEIGHTS_0": 3 },
        "indices": 1,
        "material": 0
      }]
    }],
    "skins": [{ "name": "skeleton", "joints": [1, 2], "inverseBindMatrices": 4 }],
    "materials": [{
      "name": "red",
      "pbrMetallicRoughness": {
        "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
        "baseColorTexture": { "index": 0 },
        "roughnessFactor": 0.5
      }
    }],
    "textures": [{ "name": "red", "source": 0 }],
    "images": [{ "uri": "textures/red.png" }],
    "animations": [{
      "name": "reach",
      "channels": [{ "sampler": 0, "target": { "node": 2, "path": "translation" } }],
      "samplers": [{ "input": 5, "output": 6, "interpolation": "LINEAR" }]
    }],
    "buffers": [{ "uri": "scene.bin", "byteLength": 276 }],
    "bufferViews": [
      { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
      { "buffer": 0, "byteOffset": 36, "byteLength": 6 },
      { "buffer": 0, "byteOffset": 44, "byteLength": 24 },
      { "buffer": 0, "byteOffset": 68, "byteLength": 48 },
      { "buffer": 0, "byteOffset": 116, "byteLength": 128 },
      { "buffer": 0, "byteOffset": 244, "byteLength": 8 },
      { "buffer": 0, "byteOffset": 252, "byteLength": 24 }
    ],
    "accessors": [
      { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 2.0, 0.0] },
      { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
      { "bufferView": 2, "componentType": 5123, "count": 3, "type": "VEC4" },
      { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC4" },
      { "bufferView": 4, "componentType": 5126, "count": 2, "type": "MAT4" },
      { "bufferView": 5, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0] },
      { "bufferView": 6, "componentType": 5126, "count": 2, "type": "VEC3" }
    ]
  });

  let path = folder.join("scene.gltf");
  std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;

  std::fs::create_dir_all(folder.join("textures"))?;
  image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 0])).save(folder.join("textures").join("red.png"))?;
  Ok(path)
}
