use glam::{
  DMat4,
  Mat4,
  Vec3,
};

use crate::math::transform;
use super::backend::{
  HalaGpuBackend,
  HalaProgramHandle,
  HalaUniformLocation,
};

/// The number of light slots of the shader.
pub const MAX_LIGHT_COUNT: usize = 8;

/// The texture unit the diffuse texture is bound to.
pub const DIFFUSE_TEXTURE_UNIT: u32 = 0;

/// The uniforms of one light slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct HalaLightUniforms {
  pub light_type: Option<HalaUniformLocation>,
  pub color: Option<HalaUniformLocation>,
  pub position: Option<HalaUniformLocation>,
  pub direction: Option<HalaUniformLocation>,
  pub cone_angle: Option<HalaUniformLocation>,
}

/// The uniform locations of the scene shader, looked up once.
#[derive(Clone, Debug, Default)]
pub struct HalaUniformTable {
  pub model_matrix: Option<HalaUniformLocation>,
  pub view_matrix: Option<HalaUniformLocation>,
  pub projection_matrix: Option<HalaUniformLocation>,
  pub view_position: Option<HalaUniformLocation>,
  pub material_emissive: Option<HalaUniformLocation>,
  pub material_ambient: Option<HalaUniformLocation>,
  pub material_diffuse: Option<HalaUniformLocation>,
  pub material_specular: Option<HalaUniformLocation>,
  pub material_shininess: Option<HalaUniformLocation>,
  pub texture: Option<HalaUniformLocation>,
  pub light_count: Option<HalaUniformLocation>,
  pub lights: Vec<HalaLightUniforms>,
}

impl HalaUniformTable {
  /// Look up every uniform of the program.
  pub fn new(backend: &mut dyn HalaGpuBackend, program: HalaProgramHandle) -> Self {
    let mut find = |name: &str| {
      let location = backend.uniform_location(program, name);
      if location.is_none() {
        log::debug!("The uniform \"{}\" is not active.", name);
      }
      location
    };
    let mut table = Self {
      model_matrix: find("modelMatrix"),
      view_matrix: find("viewMatrix"),
      projection_matrix: find("proMatrix"),
      view_position: find("view_position"),
      material_emissive: find("material.emissive"),
      material_ambient: find("material.ambient"),
      material_diffuse: find("material.diffuse"),
      material_specular: find("material.specular"),
      material_shininess: find("material.shininess"),
      texture: find("our_texture"),
      light_count: find("light_count"),
      lights: Vec::with_capacity(MAX_LIGHT_COUNT),
    };
    for i in 0..MAX_LIGHT_COUNT {
      table.lights.push(HalaLightUniforms {
        light_type: find(&format!("lights[{}].type", i)),
        color: find(&format!("lights[{}].color", i)),
        position: find(&format!("lights[{}].position", i)),
        direction: find(&format!("lights[{}].direction", i)),
        cone_angle: find(&format!("lights[{}].cone_angle", i)),
      });
    }
    table
  }
}

/// The camera and shader state the caches draw with.
pub struct HalaRenderState {
  pub program: HalaProgramHandle,
  pub uniforms: HalaUniformTable,
  pub view_matrix: Mat4,
  pub projection_matrix: Mat4,
  pub eye: Vec3,
}

/// The implementation of the render state.
impl HalaRenderState {
  /// Create the render state of a program.
  /// param backend: The GPU backend.
  /// param program: The linked scene shader program.
  /// return: The render state with identity matrices.
  pub fn new(backend: &mut dyn HalaGpuBackend, program: HalaProgramHandle) -> Self {
    Self {
      program,
      uniforms: HalaUniformTable::new(backend, program),
      view_matrix: Mat4::IDENTITY,
      projection_matrix: Mat4::IDENTITY,
      eye: Vec3::ZERO,
    }
  }

  /// Recompute the view and projection matrices.
  /// The far plane grows with the eye distance beyond 100 units.
  /// param eye: The eye position.
  /// param look_at: The point looked at.
  /// param up: The up direction.
  /// param aspect: Width over height.
  pub fn update_camera(&mut self, eye: Vec3, look_at: Vec3, up: Vec3, aspect: f32) {
    let distance = (look_at - eye).length();
    let far_z = if distance > 100.0 { 2.0 * distance } else { 200.0 };
    self.view_matrix = transform::look_at(eye, look_at, up);
    self.projection_matrix = transform::perspective(60.0, aspect, 0.1, far_z);
    self.eye = eye;
  }

  /// Upload the model, view and projection matrices and the eye position.
  /// param backend: The GPU backend.
  /// param world_transform: The global transform of the drawn node.
  pub fn set_transforms(&self, backend: &mut dyn HalaGpuBackend, world_transform: &DMat4) {
    if let Some(location) = self.uniforms.model_matrix {
      backend.set_uniform_mat4(location, &transform::to_gpu_matrix(world_transform));
    }
    if let Some(location) = self.uniforms.view_matrix {
      backend.set_uniform_mat4(location, &self.view_matrix);
    }
    if let Some(location) = self.uniforms.projection_matrix {
      backend.set_uniform_mat4(location, &self.projection_matrix);
    }
    if let Some(location) = self.uniforms.view_position {
      backend.set_uniform_vec3(location, self.eye);
    }
  }

  /// Upload the number of active light slots.
  pub fn set_light_count(&self, backend: &mut dyn HalaGpuBackend, count: u32) {
    if let Some(location) = self.uniforms.light_count {
      backend.set_uniform_i32(location, count.min(MAX_LIGHT_COUNT as u32) as i32);
    }
  }
}
