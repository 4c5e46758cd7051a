use glam::{
  DVec2,
  DVec3,
  DVec4,
};

use super::skin::{
  HalaSkin,
  HalaLinkMode,
};

/// How the values of a layer element are addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaMappingMode {
  None,
  ByControlPoint,
  ByPolygonVertex,
  ByPolygon,
  AllSame,
}

/// Whether values are read directly or through an index array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaReferenceMode {
  Direct,
  IndexToDirect,
}

/// A per-vertex or per-polygon data channel of a mesh.
#[derive(Clone, Debug)]
pub struct HalaLayerElement<T> {
  pub mapping_mode: HalaMappingMode,
  pub reference_mode: HalaReferenceMode,
  pub direct: Vec<T>,
  pub index: Vec<u32>,
}

/// The implementation of the layer element.
impl<T: Copy> HalaLayerElement<T> {
  /// Create a layer element with direct reference.
  pub fn new_direct(mapping_mode: HalaMappingMode, direct: Vec<T>) -> Self {
    Self {
      mapping_mode,
      reference_mode: HalaReferenceMode::Direct,
      direct,
      index: Vec::new(),
    }
  }

  /// Create a layer element referenced through an index array.
  pub fn new_indexed(mapping_mode: HalaMappingMode, direct: Vec<T>, index: Vec<u32>) -> Self {
    Self {
      mapping_mode,
      reference_mode: HalaReferenceMode::IndexToDirect,
      direct,
      index,
    }
  }

  /// Read the value of one polygon vertex.
  /// param control_point: The control point referenced by the polygon vertex.
  /// param polygon: The polygon index.
  /// param polygon_vertex: The running polygon vertex index over the whole mesh.
  /// return: The value, None if the element has no value there.
  pub fn get(&self, control_point: u32, polygon: u32, polygon_vertex: u32) -> Option<T> {
    let index = match self.mapping_mode {
      HalaMappingMode::None => return None,
      HalaMappingMode::ByControlPoint => control_point,
      HalaMappingMode::ByPolygonVertex => polygon_vertex,
      HalaMappingMode::ByPolygon => polygon,
      HalaMappingMode::AllSame => 0,
    } as usize;
    let index = match self.reference_mode {
      HalaReferenceMode::Direct => index,
      HalaReferenceMode::IndexToDirect => *self.index.get(index)? as usize,
    };
    self.direct.get(index).copied()
  }

  /// The number of addressable entries.
  pub fn len(&self) -> usize {
    match self.reference_mode {
      HalaReferenceMode::Direct => self.direct.len(),
      HalaReferenceMode::IndexToDirect => self.index.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Rebuild the addressable entries from a list of old entry indices.
  fn remap(&mut self, sources: &[usize]) {
    match self.reference_mode {
      HalaReferenceMode::Direct => {
        let direct = &self.direct;
        self.direct = sources.iter().filter_map(|&i| direct.get(i).copied()).collect();
      },
      HalaReferenceMode::IndexToDirect => {
        let index = &self.index;
        self.index = sources.iter().filter_map(|&i| index.get(i).copied()).collect();
      },
    }
  }
}

/// A mesh, control points and polygons with optional normal, UV and material channels.
#[derive(Clone, Debug, Default)]
pub struct HalaMesh {
  pub name: String,
  pub control_points: Vec<DVec3>,
  /// Each polygon is an ordered list of control point indices.
  pub polygons: Vec<Vec<u32>>,
  pub normals: Option<HalaLayerElement<DVec3>>,
  pub uvs: Option<HalaLayerElement<DVec2>>,
  /// Material slot per polygon, mapped by polygon or all same.
  pub materials: Option<HalaLayerElement<u32>>,
  pub skins: Vec<HalaSkin>,
  /// The first node the mesh is attached to.
  pub node: Option<u32>,
}

/// The implementation of the mesh.
impl HalaMesh {
  /// The total number of polygon vertices.
  pub fn polygon_vertex_count(&self) -> usize {
    self.polygons.iter().map(|polygon| polygon.len()).sum()
  }

  /// Check whether every polygon is a triangle.
  pub fn is_triangle_mesh(&self) -> bool {
    self.polygons.iter().all(|polygon| polygon.len() == 3)
  }

  /// The material slot of a polygon, 0 without a material channel.
  pub fn material_index(&self, polygon: u32) -> u32 {
    self.materials
      .as_ref()
      .and_then(|element| match element.mapping_mode {
        HalaMappingMode::ByPolygon | HalaMappingMode::AllSame => element.get(0, polygon, 0),
        _ => None,
      })
      .unwrap_or(0)
  }

  /// Check whether the mesh has at least one cluster to deform it.
  pub fn has_deformation(&self) -> bool {
    self.skins.iter().any(|skin| !skin.clusters.is_empty())
  }

  /// The link mode of the first cluster.
  /// All clusters of one mesh are expected to share it.
  pub fn link_mode(&self) -> HalaLinkMode {
    let mode = self.skins
      .iter()
      .flat_map(|skin| skin.clusters.iter())
      .map(|cluster| cluster.link_mode)
      .next()
      .unwrap_or(HalaLinkMode::NORMALIZE);
    debug_assert!(
      self.skins.iter().flat_map(|skin| skin.clusters.iter()).all(|cluster| cluster.link_mode == mode),
      "Mixed link modes on mesh \"{}\".", self.name);
    mode
  }

  /// The control points as homogeneous positions.
  pub fn control_points_homogeneous(&self) -> Vec<DVec4> {
    self.control_points.iter().map(|p| p.extend(1.0)).collect()
  }

  /// Fan-triangulate every polygon with more than three vertices.
  /// Polygons with fewer than three vertices are removed.
  /// Per polygon and per polygon vertex channels are expanded to match.
  /// return: True if the mesh changed.
  pub fn triangulate(&mut self) -> bool {
    if self.is_triangle_mesh() {
      return false;
    }

    let mut polygons = Vec::with_capacity(self.polygons.len());
    let mut polygon_sources = Vec::with_capacity(self.polygons.len());
    let mut vertex_sources = Vec::with_capacity(self.polygon_vertex_count());
    let mut dropped = 0usize;
    let mut vertex_start = 0usize;
    for (polygon_index, polygon) in self.polygons.iter().enumerate() {
      let size = polygon.len();
      if size >= 3 {
        for i in 1..size - 1 {
          polygons.push(vec![polygon[0], polygon[i], polygon[i + 1]]);
          polygon_sources.push(polygon_index);
          vertex_sources.extend_from_slice(&[vertex_start, vertex_start + i, vertex_start + i + 1]);
        }
      } else {
        dropped += 1;
      }
      vertex_start += size;
    }
    if dropped > 0 {
      log::warn!("Mesh \"{}\" has {} degenerate polygons, they are removed.", self.name, dropped);
    }

    fn remap_element<T: Copy>(element: &mut Option<HalaLayerElement<T>>, polygons: &[usize], vertices: &[usize]) {
      if let Some(element) = element.as_mut() {
        match element.mapping_mode {
          HalaMappingMode::ByPolygonVertex => element.remap(vertices),
          HalaMappingMode::ByPolygon => element.remap(polygons),
          _ => (),
        }
      }
    }
    remap_element(&mut self.normals, &polygon_sources, &vertex_sources);
    remap_element(&mut self.uvs, &polygon_sources, &vertex_sources);
    remap_element(&mut self.materials, &polygon_sources, &vertex_sources);

    self.polygons = polygons;
    true
  }
}
