//! 4x4 matrix helpers used to build the model, view and projection matrices.
//!
//! Convention: glam storage, i.e. column-major with column vectors
//! (`v' = M * v`), right-handed, OpenGL clip space with z in [-1, 1].
//! Every composing helper returns `m * op`, so `op` is applied to a vertex
//! before `m`.

use glam::{
  DMat4,
  Mat4,
  Vec3,
  Vec4,
};

/// The identity matrix.
pub fn identity() -> Mat4 {
  Mat4::IDENTITY
}

/// Multiply two matrices, `a * b`.
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
  *a * *b
}

/// Append a non-uniform scale.
/// param m: The matrix to compose with.
/// param sx, sy, sz: The scale factors.
/// return: m * S.
pub fn scale(m: &Mat4, sx: f32, sy: f32, sz: f32) -> Mat4 {
  *m * Mat4::from_scale(Vec3::new(sx, sy, sz))
}

/// Append a translation.
/// param m: The matrix to compose with.
/// param tx, ty, tz: The translation.
/// return: m * T.
pub fn translate(m: &Mat4, tx: f32, ty: f32, tz: f32) -> Mat4 {
  *m * Mat4::from_translation(Vec3::new(tx, ty, tz))
}

/// Append a rotation around an arbitrary axis.
/// A zero-length axis leaves the matrix unchanged.
/// param m: The matrix to compose with.
/// param angle: The angle in degrees.
/// param axis: The rotation axis, not necessarily normalized.
/// return: m * R.
pub fn rotate(m: &Mat4, angle: f32, axis: Vec3) -> Mat4 {
  let length = axis.length();
  if length <= f32::EPSILON {
    return *m;
  }
  *m * Mat4::from_axis_angle(axis / length, angle.to_radians())
}

/// Build a perspective frustum.
/// param left, right, bottom, top: The near plane extents.
/// param near_z, far_z: The clip distances, both positive.
/// return: The projection matrix, or identity for a degenerate frustum.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near_z: f32, far_z: f32) -> Mat4 {
  let delta_x = right - left;
  let delta_y = top - bottom;
  let delta_z = far_z - near_z;
  if near_z <= 0.0 || far_z <= 0.0 || delta_x <= 0.0 || delta_y <= 0.0 || delta_z <= 0.0 {
    return Mat4::IDENTITY;
  }

  Mat4::from_cols(
    Vec4::new(2.0 * near_z / delta_x, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 2.0 * near_z / delta_y, 0.0, 0.0),
    Vec4::new((right + left) / delta_x, (top + bottom) / delta_y, -(near_z + far_z) / delta_z, -1.0),
    Vec4::new(0.0, 0.0, -2.0 * near_z * far_z / delta_z, 0.0),
  )
}

/// Build a symmetric perspective projection.
/// param fovy: The vertical field of view in degrees.
/// param aspect: Width over height.
/// param near_z, far_z: The clip distances.
/// return: The projection matrix.
pub fn perspective(fovy: f32, aspect: f32, near_z: f32, far_z: f32) -> Mat4 {
  let frustum_h = (fovy / 360.0 * std::f32::consts::PI).tan() * near_z;
  let frustum_w = frustum_h * aspect;
  frustum(-frustum_w, frustum_w, -frustum_h, frustum_h, near_z, far_z)
}

/// Build an orthographic projection.
/// return: The projection matrix, or identity for a degenerate box.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near_z: f32, far_z: f32) -> Mat4 {
  let delta_x = right - left;
  let delta_y = top - bottom;
  let delta_z = far_z - near_z;
  if delta_x == 0.0 || delta_y == 0.0 || delta_z == 0.0 {
    return Mat4::IDENTITY;
  }

  Mat4::from_cols(
    Vec4::new(2.0 / delta_x, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 2.0 / delta_y, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -2.0 / delta_z, 0.0),
    Vec4::new(-(right + left) / delta_x, -(top + bottom) / delta_y, -(near_z + far_z) / delta_z, 1.0),
  )
}

/// Build a right-handed view matrix.
/// param eye: The eye position.
/// param target: The point looked at.
/// param up: The up direction.
/// return: The view matrix.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
  let forward = (target - eye).normalize();
  let side = forward.cross(up).normalize();
  let up = side.cross(forward);

  Mat4::from_cols(
    Vec4::new(side.x, up.x, -forward.x, 0.0),
    Vec4::new(side.y, up.y, -forward.y, 0.0),
    Vec4::new(side.z, up.z, -forward.z, 0.0),
    Vec4::new(-side.dot(eye), -up.dot(eye), forward.dot(eye), 1.0),
  )
}

/// Narrow a scene-space double precision matrix for upload.
pub fn to_gpu_matrix(m: &DMat4) -> Mat4 {
  m.as_mat4()
}
