use std::rc::Rc;

use glam::{
  DMat4,
  DVec2,
  DVec3,
  DVec4,
};

use crate::error::HalaRendererError;
use crate::scene::cpu::mesh::{
  HalaMesh,
  HalaMappingMode,
};
use super::backend::{
  HalaGpuBackendRef,
  HalaBufferHandle,
  HalaBufferKind,
  HalaBufferUsage,
};
use super::render_state::HalaRenderState;

pub const POSITION_STRIDE: usize = 4;
pub const NORMAL_STRIDE: usize = 3;
pub const UV_STRIDE: usize = 2;

/// The most material slots one mesh cache partitions its triangles into.
pub const MAX_MATERIAL_SLOTS: usize = 4096;

pub const POSITION_ATTRIBUTE: u32 = 0;
pub const NORMAL_ATTRIBUTE: u32 = 1;
pub const UV_ATTRIBUTE: u32 = 2;

/// A range of the index buffer drawn with one material.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalaSubMesh {
  /// The first index, in indices.
  pub index_offset: u32,
  pub triangle_count: u32,
}

/// The vertex and index arrays of a mesh, ready for upload.
/// Built without touching the GPU so meshes can be prepared in parallel.
#[derive(Clone, Debug, Default)]
pub struct HalaMeshCacheData {
  pub name: String,
  pub positions: Vec<f32>,
  pub normals: Option<Vec<f32>>,
  pub uvs: Option<Vec<f32>>,
  pub indices: Vec<u32>,
  pub sub_meshes: Vec<HalaSubMesh>,
  /// One vertex per control point, otherwise one vertex per polygon vertex.
  pub all_by_control_point: bool,
  pub vertex_count: u32,
  pub is_deformable: bool,
}

/// Check whether a layer element carries values.
fn element_mapping<T: Copy>(element: Option<&crate::scene::cpu::mesh::HalaLayerElement<T>>) -> Option<HalaMappingMode> {
  element
    .filter(|e| !e.is_empty())
    .map(|e| e.mapping_mode)
    .filter(|mode| *mode != HalaMappingMode::None)
}

fn write_position(positions: &mut [f32], vertex: usize, point: DVec4) {
  let offset = vertex * POSITION_STRIDE;
  positions[offset] = point.x as f32;
  positions[offset + 1] = point.y as f32;
  positions[offset + 2] = point.z as f32;
  positions[offset + 3] = 1.0;
}

fn write_normal(normals: &mut [f32], vertex: usize, normal: DVec3) {
  let offset = vertex * NORMAL_STRIDE;
  normals[offset] = normal.x as f32;
  normals[offset + 1] = normal.y as f32;
  normals[offset + 2] = normal.z as f32;
}

fn write_uv(uvs: &mut [f32], vertex: usize, uv: DVec2) {
  let offset = vertex * UV_STRIDE;
  uvs[offset] = uv.x as f32;
  uvs[offset + 1] = uv.y as f32;
}

/// The implementation of the mesh cache data.
impl HalaMeshCacheData {
  /// Build the arrays of a triangulated mesh.
  /// param mesh: The mesh.
  /// return: The arrays, an error if the mesh has no node, no control points, non-triangle polygons
  /// or a material slot beyond MAX_MATERIAL_SLOTS.
  pub fn new(mesh: &HalaMesh) -> Result<Self, HalaRendererError> {
    if mesh.node.is_none() {
      return Err(HalaRendererError::new(&format!("The mesh \"{}\" is not attached to a node.", mesh.name), None));
    }
    if mesh.control_points.is_empty() {
      return Err(HalaRendererError::new(&format!("The mesh \"{}\" has no control points.", mesh.name), None));
    }
    if !mesh.is_triangle_mesh() {
      return Err(HalaRendererError::new(&format!("The mesh \"{}\" is not triangulated.", mesh.name), None));
    }

    let polygon_count = mesh.polygons.len();

    // Count the triangles of each material, then turn the counts into offsets.
    let material_indices = (0..polygon_count as u32).map(|p| mesh.material_index(p)).collect::<Vec<_>>();
    let material_count = material_indices.iter().max().map_or(1, |max| *max as usize + 1);
    if material_count > MAX_MATERIAL_SLOTS {
      return Err(HalaRendererError::new(
        &format!("The mesh \"{}\" uses the material slot {}, more than {} slots.", mesh.name, material_count - 1, MAX_MATERIAL_SLOTS),
        None));
    }
    let mut sub_meshes = vec![HalaSubMesh::default(); material_count];
    for &material_index in material_indices.iter() {
      sub_meshes[material_index as usize].triangle_count += 1;
    }
    let mut offset = 0u32;
    for sub_mesh in sub_meshes.iter_mut() {
      sub_mesh.index_offset = offset;
      offset += sub_mesh.triangle_count * 3;
      // Reused as the fill cursor.
      sub_mesh.triangle_count = 0;
    }
    debug_assert_eq!(offset as usize, polygon_count * 3);

    let normal_mapping = element_mapping(mesh.normals.as_ref());
    let uv_mapping = element_mapping(mesh.uvs.as_ref());
    let has_normal = normal_mapping.is_some();
    let has_uv = uv_mapping.is_some();
    let all_by_control_point = normal_mapping.map_or(true, |mode| mode == HalaMappingMode::ByControlPoint)
      && uv_mapping.map_or(true, |mode| mode == HalaMappingMode::ByControlPoint);

    let vertex_count = if all_by_control_point { mesh.control_points.len() } else { polygon_count * 3 };
    let mut positions = vec![0f32; vertex_count * POSITION_STRIDE];
    let mut normals = if has_normal { Some(vec![0f32; vertex_count * NORMAL_STRIDE]) } else { None };
    let mut uvs = if has_uv { Some(vec![0f32; vertex_count * UV_STRIDE]) } else { None };
    let mut indices = vec![0u32; polygon_count * 3];

    if all_by_control_point {
      for (i, point) in mesh.control_points.iter().enumerate() {
        write_position(&mut positions, i, point.extend(1.0));
        if let (Some(normals), Some(element)) = (normals.as_mut(), mesh.normals.as_ref()) {
          write_normal(normals, i, element.get(i as u32, 0, 0).unwrap_or(DVec3::ZERO));
        }
        if let (Some(uvs), Some(element)) = (uvs.as_mut(), mesh.uvs.as_ref()) {
          write_uv(uvs, i, element.get(i as u32, 0, 0).unwrap_or(DVec2::ZERO));
        }
      }
    }

    let mut vertex = 0usize;
    for (polygon_index, polygon) in mesh.polygons.iter().enumerate() {
      let sub_mesh = &mut sub_meshes[material_indices[polygon_index] as usize];
      let index_offset = (sub_mesh.index_offset + sub_mesh.triangle_count * 3) as usize;
      for (corner, &control_point) in polygon.iter().enumerate() {
        if all_by_control_point {
          indices[index_offset + corner] = control_point;
        } else {
          indices[index_offset + corner] = vertex as u32;
          let point = mesh.control_points.get(control_point as usize).copied().unwrap_or(DVec3::ZERO);
          write_position(&mut positions, vertex, point.extend(1.0));
          if let (Some(normals), Some(element)) = (normals.as_mut(), mesh.normals.as_ref()) {
            let normal = element.get(control_point, polygon_index as u32, vertex as u32).unwrap_or(DVec3::ZERO);
            write_normal(normals, vertex, normal);
          }
          if let (Some(uvs), Some(element)) = (uvs.as_mut(), mesh.uvs.as_ref()) {
            let uv = element.get(control_point, polygon_index as u32, vertex as u32).unwrap_or(DVec2::ZERO);
            write_uv(uvs, vertex, uv);
          }
        }
        vertex += 1;
      }
      sub_mesh.triangle_count += 1;
    }

    Ok(Self {
      name: mesh.name.clone(),
      positions,
      normals,
      uvs,
      indices,
      sub_meshes,
      all_by_control_point,
      vertex_count: vertex_count as u32,
      is_deformable: mesh.has_deformation(),
    })
  }
}

/// The GPU buffers of a mesh.
pub struct HalaMeshCache {
  backend: HalaGpuBackendRef,
  pub name: String,
  position_buffer: HalaBufferHandle,
  normal_buffer: Option<HalaBufferHandle>,
  uv_buffer: Option<HalaBufferHandle>,
  index_buffer: HalaBufferHandle,
  sub_meshes: Vec<HalaSubMesh>,
  all_by_control_point: bool,
  vertex_count: u32,
  index_count: u32,
}

/// The Drop implementation of the mesh cache.
impl Drop for HalaMeshCache {
  fn drop(&mut self) {
    let mut backend = self.backend.borrow_mut();
    backend.delete_buffer(self.position_buffer);
    if let Some(buffer) = self.normal_buffer {
      backend.delete_buffer(buffer);
    }
    if let Some(buffer) = self.uv_buffer {
      backend.delete_buffer(buffer);
    }
    backend.delete_buffer(self.index_buffer);
    log::debug!("A HalaMeshCache \"{}\" dropped.", self.name);
  }
}

/// The implementation of the mesh cache.
impl HalaMeshCache {
  /// Build the arrays of a mesh and upload them.
  /// param backend: The GPU backend.
  /// param mesh: The mesh.
  /// return: The mesh cache.
  pub fn initialize(backend: &HalaGpuBackendRef, mesh: &HalaMesh) -> Result<Self, HalaRendererError> {
    let data = HalaMeshCacheData::new(mesh)?;
    Ok(Self::upload(backend, &data))
  }

  /// Upload prepared arrays, one buffer each.
  /// param backend: The GPU backend.
  /// param data: The arrays.
  /// return: The mesh cache.
  pub fn upload(backend: &HalaGpuBackendRef, data: &HalaMeshCacheData) -> Self {
    let mut gpu = backend.borrow_mut();
    let position_usage = if data.is_deformable { HalaBufferUsage::DynamicDraw } else { HalaBufferUsage::StaticDraw };

    let position_buffer = gpu.create_buffer(
      HalaBufferKind::Vertex, position_usage, &format!("{}.positions", data.name));
    gpu.upload_vertex_data(position_buffer, &data.positions);

    let normal_buffer = data.normals.as_ref().map(|normals| {
      let buffer = gpu.create_buffer(HalaBufferKind::Vertex, HalaBufferUsage::StaticDraw, &format!("{}.normals", data.name));
      gpu.upload_vertex_data(buffer, normals);
      buffer
    });
    let uv_buffer = data.uvs.as_ref().map(|uvs| {
      let buffer = gpu.create_buffer(HalaBufferKind::Vertex, HalaBufferUsage::StaticDraw, &format!("{}.uvs", data.name));
      gpu.upload_vertex_data(buffer, uvs);
      buffer
    });

    let index_buffer = gpu.create_buffer(HalaBufferKind::Index, HalaBufferUsage::StaticDraw, &format!("{}.indices", data.name));
    gpu.upload_index_data(index_buffer, &data.indices);
    drop(gpu);

    log::debug!(
      "A HalaMeshCache \"{}\" created with {} vertices and {} sub-meshes.",
      data.name, data.vertex_count, data.sub_meshes.len());
    Self {
      backend: Rc::clone(backend),
      name: data.name.clone(),
      position_buffer,
      normal_buffer,
      uv_buffer,
      index_buffer,
      sub_meshes: data.sub_meshes.clone(),
      all_by_control_point: data.all_by_control_point,
      vertex_count: data.vertex_count,
      index_count: data.indices.len() as u32,
    }
  }

  /// Bind the vertex buffers and the index buffer.
  pub fn begin_draw(&self) {
    let mut backend = self.backend.borrow_mut();
    backend.bind_vertex_attribute(POSITION_ATTRIBUTE, self.position_buffer, POSITION_STRIDE as u32);
    if let Some(buffer) = self.normal_buffer {
      backend.bind_vertex_attribute(NORMAL_ATTRIBUTE, buffer, NORMAL_STRIDE as u32);
    }
    if let Some(buffer) = self.uv_buffer {
      backend.bind_vertex_attribute(UV_ATTRIBUTE, buffer, UV_STRIDE as u32);
    }
    backend.bind_index_buffer(Some(self.index_buffer));
  }

  /// Draw the triangles of one material.
  /// param render_state: The camera and shader state.
  /// param world_transform: The global transform of the node, geometric offset included.
  /// param material_index: The material slot.
  /// return: The number of draw calls issued, 0 for an empty or missing slot.
  pub fn draw(&self, render_state: &HalaRenderState, world_transform: &DMat4, material_index: u32) -> u32 {
    let Some(sub_mesh) = self.sub_meshes.get(material_index as usize) else {
      return 0;
    };
    if sub_mesh.triangle_count == 0 {
      return 0;
    }

    let mut backend = self.backend.borrow_mut();
    render_state.set_transforms(&mut *backend, world_transform);
    backend.draw_indexed_triangles(sub_mesh.index_offset, sub_mesh.triangle_count * 3);
    1
  }

  /// Unbind the buffers.
  pub fn end_draw(&self) {
    let mut backend = self.backend.borrow_mut();
    backend.disable_vertex_attribute(POSITION_ATTRIBUTE);
    if self.normal_buffer.is_some() {
      backend.disable_vertex_attribute(NORMAL_ATTRIBUTE);
    }
    if self.uv_buffer.is_some() {
      backend.disable_vertex_attribute(UV_ATTRIBUTE);
    }
    backend.bind_index_buffer(None);
  }

  /// Re-upload the position buffer from deformed control points.
  /// param mesh: The mesh the cache was built from.
  /// param vertices: The deformed homogeneous control points.
  pub fn update_vertex_position(&self, mesh: &HalaMesh, vertices: &[DVec4]) {
    let mut positions = vec![0f32; self.vertex_count as usize * POSITION_STRIDE];
    if self.all_by_control_point {
      for (i, point) in vertices.iter().take(self.vertex_count as usize).enumerate() {
        write_position(&mut positions, i, *point);
      }
    } else {
      let mut vertex = 0usize;
      for &control_point in mesh.polygons.iter().flatten() {
        if vertex >= self.vertex_count as usize {
          break;
        }
        let point = vertices.get(control_point as usize).copied().unwrap_or(DVec4::W);
        write_position(&mut positions, vertex, point);
        vertex += 1;
      }
      debug_assert_eq!(vertex, self.vertex_count as usize);
    }

    self.backend.borrow_mut().upload_vertex_data(self.position_buffer, &positions);
  }

  pub fn sub_meshes(&self) -> &[HalaSubMesh] {
    &self.sub_meshes
  }

  pub fn sub_mesh_count(&self) -> u32 {
    self.sub_meshes.len() as u32
  }

  pub fn vertex_count(&self) -> u32 {
    self.vertex_count
  }

  pub fn index_count(&self) -> u32 {
    self.index_count
  }

  pub fn is_all_by_control_point(&self) -> bool {
    self.all_by_control_point
  }

  pub fn has_normal(&self) -> bool {
    self.normal_buffer.is_some()
  }

  pub fn has_uv(&self) -> bool {
    self.uv_buffer.is_some()
  }

  pub fn position_buffer(&self) -> HalaBufferHandle {
    self.position_buffer
  }
}
