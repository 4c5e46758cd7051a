use std::path::Path;
use std::collections::{
  BTreeMap,
  VecDeque,
};

use glam::{
  DMat4,
  DQuat,
  DVec2,
  DVec3,
  Mat4,
};
use serde::{
  Deserialize, Serialize
};
use serde_json;

use crate::error::HalaRendererError;
use super::super::{
  cpu::scene::{HalaScene, ROOT_NODE},
  cpu::node::{HalaNode, HalaNodeAttribute, HalaGeometricOffset},
  cpu::mesh::{HalaMesh, HalaLayerElement, HalaMappingMode},
  cpu::skin::{HalaSkin, HalaCluster, HalaLinkMode, HalaSkinningType},
  cpu::pose::{HalaPose, HalaPoseEntry},
  cpu::material::{HalaMaterial, HalaMaterialChannel},
  cpu::texture::HalaFileTexture,
  cpu::light::{HalaLightType, HalaLight},
  cpu::anim::{HalaAnimStack, HalaAnimLayer, HalaTrackVec3, HalaTrackQuat},
};

/// The glTF loader.
pub struct HalaGltfLoader;

/// The glTF node custom info.
#[derive(Serialize, Deserialize, Default)]
struct _NodeCustomInfo {
  #[serde(default)]
  pub geometric_translation: Option<[f64; 3]>,
  /// x, y, z, w.
  #[serde(default)]
  pub geometric_rotation: Option<[f64; 4]>,
  #[serde(default)]
  pub geometric_scale: Option<[f64; 3]>,
}

/// The glTF mesh custom info.
#[derive(Serialize, Deserialize, Default)]
struct _MeshCustomInfo {
  /// 0: Linear, 1: Rigid, 2: Dual quaternion, 3: Blend.
  #[serde(default)]
  pub skinning_type: u8,
  /// 0: Normalize, 1: Additive, 2: Total one.
  #[serde(default)]
  pub link_mode: u8,
  /// Per vertex blend weights, in the order the vertices are read.
  #[serde(default)]
  pub blend_weights: Vec<f64>,
}

/// The glTF material custom info.
#[derive(Serialize, Deserialize, Default)]
struct _MaterialCustomInfo {
  #[serde(default)]
  pub ambient: Option<[f64; 3]>,
  #[serde(default)]
  pub shininess: Option<f64>,
}

/// A mesh read from the primitives of one glTF mesh.
struct LoadedMesh {
  mesh: HalaMesh,
  /// The glTF material of each slot, None for the default material.
  slots: Vec<Option<usize>>,
  /// (vertex, joint slots, weights) of every skinned vertex.
  joints: Vec<(u32, [u16; 4], [f32; 4])>,
  custom_info: _MeshCustomInfo,
}

fn parse_extras<T: for<'de> Deserialize<'de> + Default>(
  extras: &Option<Box<serde_json::value::RawValue>>,
  what: &str,
) -> Result<T, HalaRendererError> {
  match extras {
    Some(extras) => {
      serde_json::from_str::<T>(extras.get())
        .map_err(|err| HalaRendererError::new(&format!("Parse {} extras failed.", what), Some(Box::new(err))))
    },
    None => Ok(T::default()),
  }
}

/// Keep the key values of a sampler output, cubic spline outputs carry tangents around each value.
fn key_values<T>(values: impl Iterator<Item = T>, is_cubic_spline: bool) -> Vec<T> {
  if is_cubic_spline {
    values.skip(1).step_by(3).collect()
  } else {
    values.collect()
  }
}

/// The implementation of the glTF loader.
impl HalaGltfLoader {
  /// Load the glTF file from the given path.
  /// Only the buffers are read, images stay on disk for the texture pass.
  /// param path: The path of the glTF file.
  /// return: The loaded scene.
  pub fn load<P: AsRef<Path>>(path: P) -> Result<HalaScene, HalaRendererError> {
    let path = path.as_ref();
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
      .map_err(|err| HalaRendererError::new(&format!("Load glTF file \"{:?}\" failed.", path), Some(Box::new(err))))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
      .map_err(|err| HalaRendererError::new(&format!("Load buffers of glTF file \"{:?}\" failed.", path), Some(Box::new(err))))?;

    let mut scene = HalaScene::new();
    scene.file_path = path.to_path_buf();

    // Load all textures referenced by file.
    let mut texture_mapping = Vec::new();
    for texture in document.textures() {
      let index = Self::load_texture(&texture).map(|loaded| {
        scene.textures.push(loaded);
        (scene.textures.len() - 1) as u32
      });
      texture_mapping.push(index);
    }

    // Load all materials.
    for material in document.materials() {
      scene.materials.push(Self::load_material(&material, &texture_mapping)?);
    }

    // Load all meshes.
    let mut loaded_meshes = Vec::new();
    for mesh in document.meshes() {
      loaded_meshes.push(Self::load_mesh(&mesh, &buffers)?);
    }
    let mut default_material = None;
    let mut slot_materials = Vec::with_capacity(loaded_meshes.len());
    for loaded in loaded_meshes.iter() {
      let mut materials = Vec::with_capacity(loaded.slots.len());
      for slot in loaded.slots.iter() {
        let index = match slot {
          Some(index) => *index as u32,
          None => *default_material.get_or_insert_with(|| {
            scene.materials.push(HalaMaterial {
              name: "<Default>".to_string(),
              diffuse: HalaMaterialChannel::with_color(DVec3::ONE),
              ..Default::default()
            });
            (scene.materials.len() - 1) as u32
          }),
        };
        materials.push(index);
      }
      slot_materials.push(materials);
    }

    // Load all lights.
    if let Some(lights) = document.lights() {
      for light in lights {
        scene.lights.push(Self::load_light(&light));
      }
    }

    // Load all nodes.
    let gltf_scene = match document.default_scene() {
      Some(gltf_scene) => gltf_scene,
      None => document.scenes().next()
        .ok_or(HalaRendererError::new(&format!("No scene in glTF file \"{:?}\".", path), None))?,
    };
    if document.scenes().len() > 1 {
      log::warn!("More than one scene in glTF file \"{:?}\". Only \"{}\" will be loaded.", path, gltf_scene.name().unwrap_or("<Unnamed>"));
    }
    log::debug!("Loading scene \"{}\".", gltf_scene.name().unwrap_or("<Unnamed>"));

    let mut node_mapping = BTreeMap::new();
    let mut node_queue = VecDeque::new();
    node_queue.extend(gltf_scene.nodes().map(|node| (ROOT_NODE, node)));
    while let Some((parent_idx, node)) = node_queue.pop_front() {
      let (translation, rotation, scale) = node.transform().decomposed();
      let custom_info: _NodeCustomInfo = parse_extras(node.extras(), "node")?;

      let mut geometric = HalaGeometricOffset::default();
      if let Some(t) = custom_info.geometric_translation {
        geometric.translation = DVec3::from_array(t);
      }
      if let Some(r) = custom_info.geometric_rotation {
        geometric.rotation = DQuat::from_array(r).normalize();
      }
      if let Some(s) = custom_info.geometric_scale {
        geometric.scale = DVec3::from_array(s);
      }

      let mut loaded_node = HalaNode {
        name: node.name().unwrap_or("<Unnamed>").to_owned(),
        translation: DVec3::from_array(translation.map(f64::from)),
        rotation: DQuat::from_array(rotation.map(f64::from)).normalize(),
        scale: DVec3::from_array(scale.map(f64::from)),
        geometric,
        ..Default::default()
      };

      // If the node has a mesh, attach it with its material slots.
      if let Some(mesh) = node.mesh() {
        loaded_node.attributes.push(HalaNodeAttribute::Mesh(mesh.index() as u32));
        loaded_node.materials = slot_materials.get(mesh.index()).cloned().unwrap_or_default();
      }

      // If the node has a light, attach it.
      if let Some(light) = node.light() {
        loaded_node.attributes.push(HalaNodeAttribute::Light(light.index() as u32));
      }

      let current_index = scene.add_node(parent_idx, loaded_node);
      node_mapping.insert(node.index(), current_index);
      node_queue.extend(node.children().map(|child| (current_index, child)));
    }

    for (mesh_index, loaded) in loaded_meshes.into_iter().enumerate() {
      let LoadedMesh { mesh, joints, custom_info, .. } = loaded;
      scene.meshes.push(mesh);
      Self::load_skins(&document, &mut scene, &node_mapping, mesh_index, &joints, &custom_info, &buffers)?;
    }
    scene.update_node_hierarchies();

    // Load all animations.
    for animation in document.animations() {
      scene.anim_stacks.push(Self::load_animation(&animation, &node_mapping, &buffers));
    }

    log::debug!(
      "Loaded glTF file \"{:?}\": {} nodes, {} meshes, {} materials, {} textures, {} lights, {} animations.",
      path, scene.nodes.len(), scene.meshes.len(), scene.materials.len(),
      scene.textures.len(), scene.lights.len(), scene.anim_stacks.len());
    Ok(scene)
  }

  /// Load the mesh, all triangle primitives merged with one material slot per primitive material.
  /// param mesh: The gltf mesh.
  /// param buffers: The buffer data.
  fn load_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<LoadedMesh, HalaRendererError> {
    let mesh_name = mesh.name().unwrap_or("<Unnamed>");
    log::debug!("Loading mesh \"{}\".", mesh_name);
    let custom_info: _MeshCustomInfo = parse_extras(mesh.extras(), "mesh")?;

    let mut control_points = Vec::new();
    let mut polygons = Vec::new();
    let mut polygon_slots = Vec::new();
    let mut normals = Some(Vec::new());
    let mut uvs = Some(Vec::new());
    let mut slots: Vec<Option<usize>> = Vec::new();
    let mut joints = Vec::new();

    for primitive in mesh.primitives() {
      if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("Skip primitive {} of mesh \"{}\", only triangles are supported.", primitive.index(), mesh_name);
        continue;
      }
      log::debug!("Loading primitive {} from mesh \"{}\".", primitive.index(), mesh_name);
      let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

      let positions = reader.read_positions()
        .ok_or(HalaRendererError::new(&format!("Read positions from mesh \"{}\" failed.", mesh_name), None))?
        .map(|p| DVec3::from_array(p.map(f64::from)))
        .collect::<Vec<_>>();
      let base = control_points.len() as u32;
      let count = positions.len() as u32;
      let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect::<Vec<_>>(),
        None => (0..count).collect(),
      };

      // A channel is kept only when every primitive provides it.
      match (normals.as_mut(), reader.read_normals()) {
        (Some(normals), Some(read)) => normals.extend(read.map(|n| DVec3::from_array(n.map(f64::from)))),
        _ => normals = None,
      }
      match (uvs.as_mut(), reader.read_tex_coords(0)) {
        // glTF puts the texture origin at the top left.
        (Some(uvs), Some(read)) => uvs.extend(read.into_f32().map(|uv| DVec2::new(uv[0] as f64, 1.0 - uv[1] as f64))),
        _ => uvs = None,
      }

      if let (Some(read_joints), Some(read_weights)) = (reader.read_joints(0), reader.read_weights(0)) {
        for (i, (j, w)) in read_joints.into_u16().zip(read_weights.into_f32()).enumerate() {
          joints.push((base + i as u32, j, w));
        }
      }

      let material_key = primitive.material().index();
      let slot = match slots.iter().position(|key| *key == material_key) {
        Some(slot) => slot,
        None => {
          slots.push(material_key);
          slots.len() - 1
        },
      };

      for triangle in indices.chunks_exact(3) {
        if triangle.iter().any(|&i| i >= count) {
          return Err(HalaRendererError::new(&format!("Mesh \"{}\" has indices out of range.", mesh_name), None));
        }
        polygons.push(vec![base + triangle[0], base + triangle[1], base + triangle[2]]);
        polygon_slots.push(slot as u32);
      }
      control_points.extend(positions);
    }

    let num_of_points = control_points.len();
    let loaded = HalaMesh {
      name: mesh_name.to_owned(),
      control_points,
      polygons,
      normals: normals
        .filter(|n| n.len() == num_of_points && num_of_points > 0)
        .map(|n| HalaLayerElement::new_direct(HalaMappingMode::ByControlPoint, n)),
      uvs: uvs
        .filter(|u| u.len() == num_of_points && num_of_points > 0)
        .map(|u| HalaLayerElement::new_direct(HalaMappingMode::ByControlPoint, u)),
      materials: Some(HalaLayerElement::new_direct(HalaMappingMode::ByPolygon, polygon_slots)),
      ..Default::default()
    };
    Ok(LoadedMesh {
      mesh: loaded,
      slots,
      joints,
      custom_info,
    })
  }

  /// Attach the skin of the first skinned node using the mesh, one cluster per joint.
  /// The bind pose holds the mesh node and every joint.
  fn load_skins(
    document: &gltf::Document,
    scene: &mut HalaScene,
    node_mapping: &BTreeMap<usize, u32>,
    mesh_index: usize,
    joints: &[(u32, [u16; 4], [f32; 4])],
    custom_info: &_MeshCustomInfo,
    buffers: &[gltf::buffer::Data],
  ) -> Result<(), HalaRendererError> {
    let mut skinned_nodes = document.nodes()
      .filter(|node| node.mesh().map(|m| m.index()) == Some(mesh_index))
      .filter_map(|node| node.skin().zip(node_mapping.get(&node.index()).copied()));
    let Some((skin, node_index)) = skinned_nodes.next() else {
      return Ok(());
    };
    if skinned_nodes.next().is_some() {
      log::warn!("The mesh {} is skinned by more than one node, only the first skin is used.", mesh_index);
    }

    let bind_global = scene.evaluate_global_transform(node_index, 0.0);
    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let inverse_bind_matrices = reader.read_inverse_bind_matrices()
      .map(|matrices| matrices.map(|m| Mat4::from_cols_array_2d(&m).as_dmat4()).collect::<Vec<_>>())
      .unwrap_or_default();
    let link_mode = HalaLinkMode::from_u8(custom_info.link_mode)?;
    let skinning_type = HalaSkinningType::from_u8(custom_info.skinning_type)?;

    let mut clusters = Vec::new();
    let mut entries = vec![HalaPoseEntry { node: node_index, matrix: bind_global, is_local: false }];
    for (i, joint) in skin.joints().enumerate() {
      let Some(&link) = node_mapping.get(&joint.index()) else {
        log::warn!("The joint \"{}\" is not in the loaded scene.", joint.name().unwrap_or("<Unnamed>"));
        clusters.push(HalaCluster::default());
        continue;
      };
      let inverse_bind_matrix = inverse_bind_matrices.get(i).copied().unwrap_or(DMat4::IDENTITY);
      let transform_link = bind_global * inverse_bind_matrix.inverse();
      clusters.push(HalaCluster {
        link: Some(link),
        link_mode,
        transform: bind_global,
        transform_link,
        ..Default::default()
      });
      entries.push(HalaPoseEntry { node: link, matrix: transform_link, is_local: false });
      if let Some(joint_node) = scene.nodes.get_mut(link as usize) {
        if !joint_node.attributes.contains(&HalaNodeAttribute::Skeleton) {
          joint_node.attributes.push(HalaNodeAttribute::Skeleton);
        }
      }
    }

    for &(vertex, joint_slots, weights) in joints.iter() {
      for (slot, weight) in joint_slots.iter().zip(weights.iter()) {
        if *weight <= 0.0 {
          continue;
        }
        if let Some(cluster) = clusters.get_mut(*slot as usize) {
          cluster.influences.push((vertex, *weight as f64));
        }
      }
    }

    if let Some(mesh) = scene.meshes.get_mut(mesh_index) {
      mesh.skins.push(HalaSkin {
        skinning_type,
        clusters,
        blend_weights: custom_info.blend_weights.clone(),
      });
    }
    scene.poses.push(HalaPose {
      name: skin.name().unwrap_or("<Unnamed>").to_owned(),
      is_bind_pose: true,
      entries,
    });
    Ok(())
  }

  /// Load the file texture.
  /// param texture: The gltf texture.
  /// return: The file texture, None for embedded images.
  fn load_texture(texture: &gltf::Texture) -> Option<HalaFileTexture> {
    let name = texture.name().unwrap_or("<Unnamed>");
    match texture.source().source() {
      gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
        let file_name = decode_uri(uri);
        Some(HalaFileTexture {
          name: name.to_owned(),
          relative_file_name: file_name.clone(),
          file_name,
        })
      },
      _ => {
        log::warn!("The texture \"{}\" is embedded, only file textures are supported.", name);
        None
      },
    }
  }

  /// Load the material.
  /// param material: The gltf material.
  /// param texture_mapping: The scene texture of each glTF texture.
  /// return: The loaded material.
  fn load_material(material: &gltf::Material, texture_mapping: &[Option<u32>]) -> Result<HalaMaterial, HalaRendererError> {
    log::debug!("Loading material \"{}\".", material.name().unwrap_or("<Unnamed>"));
    let pbr = material.pbr_metallic_roughness();
    let custom_info: _MaterialCustomInfo = parse_extras(material.extras(), "material")?;

    let base_color = pbr.base_color_factor();
    let diffuse = HalaMaterialChannel {
      color: Some(DVec3::new(base_color[0] as f64, base_color[1] as f64, base_color[2] as f64)),
      factor: None,
      texture: pbr.base_color_texture()
        .and_then(|info| texture_mapping.get(info.texture().index()).copied().flatten()),
    };

    let emissive = HalaMaterialChannel {
      color: Some(DVec3::from_array(material.emissive_factor().map(f64::from))),
      factor: material.emissive_strength().map(f64::from),
      texture: material.emissive_texture()
        .and_then(|info| texture_mapping.get(info.texture().index()).copied().flatten()),
    };

    let specular = match material.specular() {
      Some(specular) => HalaMaterialChannel {
        color: Some(DVec3::from_array(specular.specular_color_factor().map(f64::from))),
        factor: Some(specular.specular_factor() as f64),
        texture: None,
      },
      None => HalaMaterialChannel::default(),
    };

    let ambient = HalaMaterialChannel {
      color: custom_info.ambient.map(DVec3::from_array),
      ..Default::default()
    };

    // Blinn-Phong exponent of the same highlight width.
    let shininess = custom_info.shininess.or_else(|| {
      let alpha = (pbr.roughness_factor() as f64).powi(2);
      Some(if alpha > 0.0 { (2.0 / (alpha * alpha) - 2.0).clamp(1.0, 512.0) } else { 512.0 })
    });

    Ok(HalaMaterial {
      name: material.name().unwrap_or("<Unnamed>").to_owned(),
      emissive,
      ambient,
      diffuse,
      specular,
      shininess,
      legacy_emissive: None,
    })
  }

  /// Load the light.
  /// param light: The gltf light.
  /// return: The loaded light.
  fn load_light(light: &gltf::khr_lights_punctual::Light) -> HalaLight {
    log::debug!("Loading light \"{}\".", light.name().unwrap_or("<Unnamed>"));

    let (light_type, cone_angle) = match light.kind() {
      gltf::khr_lights_punctual::Kind::Directional => (HalaLightType::DIRECTIONAL, 0.0),
      gltf::khr_lights_punctual::Kind::Point => (HalaLightType::POINT, 0.0),
      gltf::khr_lights_punctual::Kind::Spot {
        outer_cone_angle,
        ..
      } => (HalaLightType::SPOT, (outer_cone_angle as f64).to_degrees().clamp(0.0, 90.0)),
    };

    HalaLight {
      name: light.name().unwrap_or("<Unnamed>").to_owned(),
      light_type,
      color: DVec3::from_array(light.color().map(f64::from)),
      intensity: light.intensity() as f64,
      cone_angle,
    }
  }

  /// Load the animation as a stack with one layer of node tracks.
  /// Step samplers are read as linear.
  fn load_animation(
    animation: &gltf::Animation,
    node_mapping: &BTreeMap<usize, u32>,
    buffers: &[gltf::buffer::Data],
  ) -> HalaAnimStack {
    let name = animation.name().unwrap_or("<Unnamed>").to_owned();
    log::debug!("Loading animation \"{}\".", name);

    let mut layer = HalaAnimLayer {
      name: "BaseLayer".to_string(),
      ..Default::default()
    };
    let (mut start, mut stop) = (f64::MAX, f64::MIN);
    for channel in animation.channels() {
      let Some(&node) = node_mapping.get(&channel.target().node().index()) else {
        continue;
      };
      let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
      let Some(inputs) = reader.read_inputs() else {
        continue;
      };
      let times = inputs.map(f64::from).collect::<Vec<_>>();
      for &t in times.iter() {
        start = start.min(t);
        stop = stop.max(t);
      }
      let is_cubic_spline = matches!(channel.sampler().interpolation(), gltf::animation::Interpolation::CubicSpline);

      let tracks = layer.node_tracks.entry(node).or_default();
      match reader.read_outputs() {
        Some(gltf::animation::util::ReadOutputs::Translations(values)) => {
          let values = key_values(values.map(|v| DVec3::from_array(v.map(f64::from))), is_cubic_spline);
          tracks.translation = Some(HalaTrackVec3 { keys: times.iter().copied().zip(values).collect() });
        },
        Some(gltf::animation::util::ReadOutputs::Rotations(values)) => {
          let values = key_values(values.into_f32().map(|v| DQuat::from_array(v.map(f64::from)).normalize()), is_cubic_spline);
          tracks.rotation = Some(HalaTrackQuat { keys: times.iter().copied().zip(values).collect() });
        },
        Some(gltf::animation::util::ReadOutputs::Scales(values)) => {
          let values = key_values(values.map(|v| DVec3::from_array(v.map(f64::from))), is_cubic_spline);
          tracks.scale = Some(HalaTrackVec3 { keys: times.iter().copied().zip(values).collect() });
        },
        _ => log::debug!("Skip an unsupported channel of animation \"{}\".", name),
      }
    }
    if start > stop {
      start = 0.0;
      stop = 0.0;
    }

    HalaAnimStack {
      name,
      start,
      stop,
      layers: vec![layer],
    }
  }
}

fn hex_digit(byte: u8) -> Option<u8> {
  match byte {
    b'0'..=b'9' => Some(byte - b'0'),
    b'a'..=b'f' => Some(byte - b'a' + 10),
    b'A'..=b'F' => Some(byte - b'A' + 10),
    _ => None,
  }
}

/// Decode the percent escapes of a relative URI.
/// Malformed escapes are kept as written.
/// param uri: The URI.
/// return: The decoded path.
fn decode_uri(uri: &str) -> String {
  let bytes = uri.as_bytes();
  let mut decoded = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' && i + 2 < bytes.len() {
      if let (Some(high), Some(low)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
        decoded.push((high << 4) | low);
        i += 3;
        continue;
      }
    }
    decoded.push(bytes[i]);
    i += 1;
  }
  String::from_utf8_lossy(&decoded).into_owned()
}
