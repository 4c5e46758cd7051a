use std::cell::RefCell;
use std::rc::Rc;

use glam::{
  Mat4,
  Vec3,
  Vec4,
};

/// A GPU buffer object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalaBufferHandle(pub u32);

/// A GPU texture object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalaTextureHandle(pub u32);

/// A linked shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalaProgramHandle(pub u32);

/// The location of a uniform in a shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalaUniformLocation(pub i32);

/// The binding target of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaBufferKind {
  Vertex,
  Index,
}

/// The update frequency hint of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaBufferUsage {
  /// Written once.
  StaticDraw,
  /// Rewritten every frame, deformed positions.
  DynamicDraw,
}

/// The buffer, texture, uniform and draw calls issued by the caches.
///
/// Object creation is not checked for failure, running out of GPU memory is
/// left to the backend.
pub trait HalaGpuBackend {
  fn create_buffer(&mut self, kind: HalaBufferKind, usage: HalaBufferUsage, debug_name: &str) -> HalaBufferHandle;
  fn upload_vertex_data(&mut self, buffer: HalaBufferHandle, data: &[f32]);
  fn upload_index_data(&mut self, buffer: HalaBufferHandle, data: &[u32]);
  fn delete_buffer(&mut self, buffer: HalaBufferHandle);

  /// Bind a vertex buffer to an attribute location and enable the attribute array.
  /// param location: The attribute location.
  /// param buffer: The vertex buffer.
  /// param components: The number of floats per vertex.
  fn bind_vertex_attribute(&mut self, location: u32, buffer: HalaBufferHandle, components: u32);
  fn disable_vertex_attribute(&mut self, location: u32);
  fn bind_index_buffer(&mut self, buffer: Option<HalaBufferHandle>);

  /// Create a texture from tightly packed RGB8 pixels, bottom row first.
  fn create_texture_rgb8(&mut self, width: u32, height: u32, data: &[u8], debug_name: &str) -> HalaTextureHandle;
  fn delete_texture(&mut self, texture: HalaTextureHandle);
  fn bind_texture(&mut self, unit: u32, texture: Option<HalaTextureHandle>);

  /// Look up a uniform of a program.
  /// return: None if the program has no active uniform with that name.
  fn uniform_location(&mut self, program: HalaProgramHandle, name: &str) -> Option<HalaUniformLocation>;
  fn set_uniform_mat4(&mut self, location: HalaUniformLocation, value: &Mat4);
  fn set_uniform_vec4(&mut self, location: HalaUniformLocation, value: Vec4);
  fn set_uniform_vec3(&mut self, location: HalaUniformLocation, value: Vec3);
  fn set_uniform_f32(&mut self, location: HalaUniformLocation, value: f32);
  fn set_uniform_i32(&mut self, location: HalaUniformLocation, value: i32);

  /// Draw triangles from the bound index buffer.
  /// param first_index: The first index, in indices not bytes.
  /// param index_count: The number of indices.
  fn draw_indexed_triangles(&mut self, first_index: u32, index_count: u32);
}

/// The shared handle the caches keep to release their GPU objects on drop.
pub type HalaGpuBackendRef = Rc<RefCell<dyn HalaGpuBackend>>;
