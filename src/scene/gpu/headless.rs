use std::collections::BTreeMap;

use glam::{
  Mat4,
  Vec3,
  Vec4,
};

use super::backend::{
  HalaGpuBackend,
  HalaBufferHandle,
  HalaBufferKind,
  HalaBufferUsage,
  HalaTextureHandle,
  HalaProgramHandle,
  HalaUniformLocation,
};

/// A buffer recorded by the headless backend.
#[derive(Clone, Debug)]
pub struct HalaHeadlessBuffer {
  pub kind: HalaBufferKind,
  pub usage: HalaBufferUsage,
  pub debug_name: String,
  pub vertex_data: Vec<f32>,
  pub index_data: Vec<u32>,
  pub upload_count: u32,
}

/// A texture recorded by the headless backend.
#[derive(Clone, Debug)]
pub struct HalaHeadlessTexture {
  pub width: u32,
  pub height: u32,
  pub debug_name: String,
}

/// A uniform value recorded by the headless backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HalaUniformValue {
  Mat4(Mat4),
  Vec4(Vec4),
  Vec3(Vec3),
  F32(f32),
  I32(i32),
}

/// A draw call with the state bound when it was issued.
#[derive(Clone, Debug)]
pub struct HalaHeadlessDraw {
  pub first_index: u32,
  pub index_count: u32,
  pub index_buffer: Option<HalaBufferHandle>,
  /// Attribute location to (buffer, components).
  pub attributes: BTreeMap<u32, (HalaBufferHandle, u32)>,
  pub texture: Option<HalaTextureHandle>,
  pub model_matrix: Option<Mat4>,
}

/// A backend that records every call instead of talking to a GPU.
#[derive(Default)]
pub struct HalaHeadlessBackend {
  next_handle: u32,
  pub buffers: BTreeMap<HalaBufferHandle, HalaHeadlessBuffer>,
  pub textures: BTreeMap<HalaTextureHandle, HalaHeadlessTexture>,
  pub created_buffers: u32,
  pub deleted_buffers: u32,
  pub created_textures: u32,
  pub deleted_textures: u32,
  pub uniform_locations: BTreeMap<String, HalaUniformLocation>,
  pub uniform_values: BTreeMap<HalaUniformLocation, HalaUniformValue>,
  pub draws: Vec<HalaHeadlessDraw>,
  attributes: BTreeMap<u32, (HalaBufferHandle, u32)>,
  index_buffer: Option<HalaBufferHandle>,
  texture_units: BTreeMap<u32, HalaTextureHandle>,
}

/// The implementation of the headless backend.
impl HalaHeadlessBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn next(&mut self) -> u32 {
    self.next_handle += 1;
    self.next_handle
  }

  /// The last value written to a uniform by name.
  pub fn uniform(&self, name: &str) -> Option<HalaUniformValue> {
    self.uniform_locations.get(name).and_then(|location| self.uniform_values.get(location).copied())
  }

  /// The number of buffers alive.
  pub fn live_buffers(&self) -> usize {
    self.buffers.len()
  }

  /// Forget the recorded draws, between frames.
  pub fn clear_draws(&mut self) {
    self.draws.clear();
  }

  fn set_uniform(&mut self, location: HalaUniformLocation, value: HalaUniformValue) {
    self.uniform_values.insert(location, value);
  }
}

impl HalaGpuBackend for HalaHeadlessBackend {
  fn create_buffer(&mut self, kind: HalaBufferKind, usage: HalaBufferUsage, debug_name: &str) -> HalaBufferHandle {
    let handle = HalaBufferHandle(self.next());
    self.buffers.insert(handle, HalaHeadlessBuffer {
      kind,
      usage,
      debug_name: debug_name.to_string(),
      vertex_data: Vec::new(),
      index_data: Vec::new(),
      upload_count: 0,
    });
    self.created_buffers += 1;
    handle
  }

  fn upload_vertex_data(&mut self, buffer: HalaBufferHandle, data: &[f32]) {
    match self.buffers.get_mut(&buffer) {
      Some(recorded) => {
        recorded.vertex_data = data.to_vec();
        recorded.upload_count += 1;
      },
      None => log::warn!("Upload to the unknown buffer {:?}.", buffer),
    }
  }

  fn upload_index_data(&mut self, buffer: HalaBufferHandle, data: &[u32]) {
    match self.buffers.get_mut(&buffer) {
      Some(recorded) => {
        recorded.index_data = data.to_vec();
        recorded.upload_count += 1;
      },
      None => log::warn!("Upload to the unknown buffer {:?}.", buffer),
    }
  }

  fn delete_buffer(&mut self, buffer: HalaBufferHandle) {
    if self.buffers.remove(&buffer).is_some() {
      self.deleted_buffers += 1;
    }
  }

  fn bind_vertex_attribute(&mut self, location: u32, buffer: HalaBufferHandle, components: u32) {
    self.attributes.insert(location, (buffer, components));
  }

  fn disable_vertex_attribute(&mut self, location: u32) {
    self.attributes.remove(&location);
  }

  fn bind_index_buffer(&mut self, buffer: Option<HalaBufferHandle>) {
    self.index_buffer = buffer;
  }

  fn create_texture_rgb8(&mut self, width: u32, height: u32, data: &[u8], debug_name: &str) -> HalaTextureHandle {
    debug_assert_eq!(data.len(), (width * height * 3) as usize);
    let handle = HalaTextureHandle(self.next());
    self.textures.insert(handle, HalaHeadlessTexture {
      width,
      height,
      debug_name: debug_name.to_string(),
    });
    self.created_textures += 1;
    handle
  }

  fn delete_texture(&mut self, texture: HalaTextureHandle) {
    if self.textures.remove(&texture).is_some() {
      self.deleted_textures += 1;
    }
  }

  fn bind_texture(&mut self, unit: u32, texture: Option<HalaTextureHandle>) {
    match texture {
      Some(texture) => self.texture_units.insert(unit, texture),
      None => self.texture_units.remove(&unit),
    };
  }

  fn uniform_location(&mut self, _program: HalaProgramHandle, name: &str) -> Option<HalaUniformLocation> {
    let next = self.uniform_locations.len() as i32;
    Some(*self.uniform_locations.entry(name.to_string()).or_insert(HalaUniformLocation(next)))
  }

  fn set_uniform_mat4(&mut self, location: HalaUniformLocation, value: &Mat4) {
    self.set_uniform(location, HalaUniformValue::Mat4(*value));
  }

  fn set_uniform_vec4(&mut self, location: HalaUniformLocation, value: Vec4) {
    self.set_uniform(location, HalaUniformValue::Vec4(value));
  }

  fn set_uniform_vec3(&mut self, location: HalaUniformLocation, value: Vec3) {
    self.set_uniform(location, HalaUniformValue::Vec3(value));
  }

  fn set_uniform_f32(&mut self, location: HalaUniformLocation, value: f32) {
    self.set_uniform(location, HalaUniformValue::F32(value));
  }

  fn set_uniform_i32(&mut self, location: HalaUniformLocation, value: i32) {
    self.set_uniform(location, HalaUniformValue::I32(value));
  }

  fn draw_indexed_triangles(&mut self, first_index: u32, index_count: u32) {
    let model_matrix = self.uniform("modelMatrix").and_then(|value| match value {
      HalaUniformValue::Mat4(m) => Some(m),
      _ => None,
    });
    self.draws.push(HalaHeadlessDraw {
      first_index,
      index_count,
      index_buffer: self.index_buffer,
      attributes: self.attributes.clone(),
      texture: self.texture_units.get(&0).copied(),
      model_matrix,
    });
  }
}
