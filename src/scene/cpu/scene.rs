use std::path::{
  Path,
  PathBuf,
};

use glam::DMat4;

use crate::error::HalaRendererError;
use super::node::{
  HalaNode,
  HalaNodeAttribute,
};
use super::mesh::{
  HalaMesh,
  HalaMappingMode,
};
use super::material::HalaMaterial;
use super::texture::HalaFileTexture;
use super::light::HalaLight;
use super::pose::HalaPose;
use super::anim::{
  HalaAnimStack,
  HalaAnimLayer,
};
use super::super::loader::HalaGltfLoader;

/// The index of the synthetic root node.
pub const ROOT_NODE: u32 = 0;

/// An imported scene. Resources live in arenas and are referenced by index.
pub struct HalaScene {
  /// The file the scene was imported from, used to resolve relative texture paths.
  pub file_path: PathBuf,
  pub nodes: Vec<HalaNode>,
  pub meshes: Vec<HalaMesh>,
  pub materials: Vec<HalaMaterial>,
  pub textures: Vec<HalaFileTexture>,
  pub lights: Vec<HalaLight>,
  pub poses: Vec<HalaPose>,
  pub anim_stacks: Vec<HalaAnimStack>,
  pub current_anim_stack: Option<u32>,
}

/// The Drop implementation of the scene.
impl Drop for HalaScene {
  fn drop(&mut self) {
    log::debug!("A HalaScene dropped.");
  }
}

impl Default for HalaScene {
  fn default() -> Self {
    Self::new()
  }
}

/// The implementation of the scene.
impl HalaScene {
  /// Create an empty scene holding only the root node.
  pub fn new() -> Self {
    Self {
      file_path: PathBuf::new(),
      nodes: vec![HalaNode::new("RootNode")],
      meshes: Vec::new(),
      materials: Vec::new(),
      textures: Vec::new(),
      lights: Vec::new(),
      poses: Vec::new(),
      anim_stacks: Vec::new(),
      current_anim_stack: None,
    }
  }

  /// Import a scene file.
  /// param path: The path to the scene file.
  /// return: The scene.
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HalaRendererError> {
    // Check the file extension.
    let path = path.as_ref();
    let extension = path.extension()
      .ok_or(HalaRendererError::new(&format!("Get file \"{:?}\" extension failed.", path), None))?;
    let mut scene = match extension.to_str().map(|ext| ext.to_ascii_lowercase()).as_deref() {
      // glTF file.
      Some("gltf") | Some("glb") => HalaGltfLoader::load(path),
      // Unsupported file.
      _ => Err(HalaRendererError::new(&format!("Unsupported file \"{:?}\".", path), None)),
    }?;
    scene.update_node_hierarchies();

    log::debug!("A HalaScene created.");
    Ok(scene)
  }

  /// The folder of the scene file.
  pub fn folder(&self) -> &Path {
    self.file_path.parent().unwrap_or_else(|| Path::new(""))
  }

  /// Link a node under a parent.
  /// param parent: The parent node index.
  /// param node: The node.
  /// return: The index of the new node.
  pub fn add_node(&mut self, parent: u32, mut node: HalaNode) -> u32 {
    let index = self.nodes.len() as u32;
    node.parent = Some(parent);
    node.children.clear();
    self.nodes.push(node);
    if let Some(parent_node) = self.nodes.get_mut(parent as usize) {
      parent_node.children.push(index);
    }
    index
  }

  /// Update the node hierarchies.
  /// Rebuild the children of each node from the parent links and
  /// record the first owning node of each mesh.
  pub fn update_node_hierarchies(&mut self) {
    let mut temp_children = vec![vec![]; self.nodes.len()];
    for (idx, node) in self.nodes.iter().enumerate() {
      if let Some(parent_idx) = node.parent {
        if let Some(children) = temp_children.get_mut(parent_idx as usize) {
          children.push(idx as u32);
        }
      }
    }
    for (idx, node) in self.nodes.iter_mut().enumerate() {
      node.children = std::mem::take(&mut temp_children[idx]);
    }

    for mesh in self.meshes.iter_mut() {
      mesh.node = None;
    }
    for (idx, node) in self.nodes.iter().enumerate() {
      for attribute in node.attributes.iter() {
        if let HalaNodeAttribute::Mesh(mesh_index) = attribute {
          if let Some(mesh) = self.meshes.get_mut(*mesh_index as usize) {
            if mesh.node.is_none() {
              mesh.node = Some(idx as u32);
            }
          }
        }
      }
    }
  }

  /// Select the animation stack used for evaluation.
  /// param index: The stack index, None for the static scene.
  pub fn set_current_anim_stack(&mut self, index: Option<u32>) -> Result<(), HalaRendererError> {
    if let Some(i) = index {
      if i as usize >= self.anim_stacks.len() {
        return Err(HalaRendererError::new(&format!("The animation stack {} does not exist.", i), None));
      }
    }
    self.current_anim_stack = index;
    Ok(())
  }

  /// The selected animation stack.
  pub fn current_anim_stack(&self) -> Option<&HalaAnimStack> {
    self.current_anim_stack.and_then(|i| self.anim_stacks.get(i as usize))
  }

  /// The base layer of the selected animation stack.
  pub fn current_anim_layer(&self) -> Option<&HalaAnimLayer> {
    self.current_anim_stack().and_then(|stack| stack.base_layer())
  }

  /// Evaluate the local transform of a node, animated components override the static ones.
  /// param node: The node index.
  /// param time: The time in seconds.
  /// return: The local transform.
  pub fn evaluate_local_transform(&self, node: u32, time: f64) -> DMat4 {
    let Some(n) = self.nodes.get(node as usize) else {
      return DMat4::IDENTITY;
    };
    let Some(tracks) = self.current_anim_layer().and_then(|layer| layer.node_tracks.get(&node)) else {
      return n.local_transform();
    };

    let translation = tracks.translation.as_ref().and_then(|t| t.evaluate(time)).unwrap_or(n.translation);
    let rotation = tracks.rotation.as_ref().and_then(|t| t.evaluate(time)).unwrap_or(n.rotation);
    let scale = tracks.scale.as_ref().and_then(|t| t.evaluate(time)).unwrap_or(n.scale);
    DMat4::from_scale_rotation_translation(scale, rotation.normalize(), translation)
  }

  /// Evaluate the global transform of a node by walking up the parent chain.
  /// The geometric offset is not included.
  /// param node: The node index.
  /// param time: The time in seconds.
  /// return: The global transform.
  pub fn evaluate_global_transform(&self, node: u32, time: f64) -> DMat4 {
    let mut result = DMat4::IDENTITY;
    let mut current = Some(node);
    let mut depth = 0usize;
    while let Some(index) = current {
      if depth > self.nodes.len() {
        log::warn!("The parent chain of node {} has a cycle.", node);
        break;
      }
      result = self.evaluate_local_transform(index, time) * result;
      current = self.nodes.get(index as usize).and_then(|n| n.parent);
      depth += 1;
    }
    result
  }

  /// Fan-triangulate every mesh.
  /// return: The number of meshes changed.
  pub fn triangulate(&mut self) -> usize {
    self.meshes.iter_mut().filter_map(|mesh| mesh.triangulate().then_some(())).count()
  }

  /// Check the integrity of the scene.
  /// return: One line per problem found, empty if the scene is consistent.
  pub fn validate(&self) -> Vec<String> {
    let mut details = Vec::new();
    let num_of_nodes = self.nodes.len();

    for (idx, node) in self.nodes.iter().enumerate() {
      if let Some(parent) = node.parent {
        if parent as usize >= num_of_nodes {
          details.push(format!("Node {} \"{}\" has an invalid parent {}.", idx, node.name, parent));
        }
      }
      if idx as u32 == ROOT_NODE && node.parent.is_some() {
        details.push("The root node has a parent.".to_string());
      }
      for attribute in node.attributes.iter() {
        match attribute {
          HalaNodeAttribute::Mesh(i) if *i as usize >= self.meshes.len() =>
            details.push(format!("Node {} \"{}\" references the invalid mesh {}.", idx, node.name, i)),
          HalaNodeAttribute::Light(i) if *i as usize >= self.lights.len() =>
            details.push(format!("Node {} \"{}\" references the invalid light {}.", idx, node.name, i)),
          _ => (),
        }
      }
      for material in node.materials.iter() {
        if *material as usize >= self.materials.len() {
          details.push(format!("Node {} \"{}\" references the invalid material {}.", idx, node.name, material));
        }
      }
    }

    for (idx, mesh) in self.meshes.iter().enumerate() {
      let num_of_points = mesh.control_points.len();
      if mesh.polygons.iter().flatten().any(|&i| i as usize >= num_of_points) {
        details.push(format!("Mesh {} \"{}\" has polygon vertices out of range.", idx, mesh.name));
      }
      if let Some(materials) = mesh.materials.as_ref() {
        if materials.mapping_mode == HalaMappingMode::ByPolygon && materials.len() != mesh.polygons.len() {
          details.push(format!(
            "Mesh {} \"{}\" has {} polygon materials for {} polygons.",
            idx, mesh.name, materials.len(), mesh.polygons.len()));
        }
      }
      if let Some(owner) = mesh.node.and_then(|node| self.nodes.get(node as usize)) {
        let slot_count = owner.materials.len().max(1);
        if mesh.materials.is_some()
          && (0..mesh.polygons.len() as u32).any(|p| mesh.material_index(p) as usize >= slot_count) {
          details.push(format!(
            "Mesh {} \"{}\" has polygon materials beyond the {} material slots of its node.",
            idx, mesh.name, slot_count));
        }
      }
      for (skin_idx, skin) in mesh.skins.iter().enumerate() {
        for (cluster_idx, cluster) in skin.clusters.iter().enumerate() {
          if let Some(link) = cluster.link {
            if link as usize >= num_of_nodes {
              details.push(format!(
                "Mesh {} \"{}\" skin {} cluster {} links the invalid node {}.",
                idx, mesh.name, skin_idx, cluster_idx, link));
            }
          }
          if cluster.influences.iter().any(|(_, w)| !w.is_finite()) {
            details.push(format!(
              "Mesh {} \"{}\" skin {} cluster {} has non-finite weights.",
              idx, mesh.name, skin_idx, cluster_idx));
          }
        }
        if !skin.blend_weights.is_empty() && skin.blend_weights.len() != num_of_points {
          details.push(format!(
            "Mesh {} \"{}\" skin {} has {} blend weights for {} control points.",
            idx, mesh.name, skin_idx, skin.blend_weights.len(), num_of_points));
        }
        if skin.blend_weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
          details.push(format!(
            "Mesh {} \"{}\" skin {} has blend weights out of [0, 1].",
            idx, mesh.name, skin_idx));
        }
      }
    }

    for (idx, material) in self.materials.iter().enumerate() {
      for channel in [&material.emissive, &material.ambient, &material.diffuse, &material.specular] {
        if let Some(texture) = channel.texture {
          if texture as usize >= self.textures.len() {
            details.push(format!("Material {} \"{}\" references the invalid texture {}.", idx, material.name, texture));
          }
        }
      }
    }

    for (idx, pose) in self.poses.iter().enumerate() {
      if pose.entries.iter().any(|entry| entry.node as usize >= num_of_nodes) {
        details.push(format!("Pose {} \"{}\" references invalid nodes.", idx, pose.name));
      }
    }

    details
  }
}
