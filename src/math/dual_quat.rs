use glam::{
  DMat4,
  DQuat,
  DVec3,
  DVec4,
};

/// Hamilton product that does not require unit quaternions.
fn quat_mul(a: DQuat, b: DQuat) -> DQuat {
  DQuat::from_xyzw(
    a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
    a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
    a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
    a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
  )
}

/// A dual quaternion `real + ε·dual` encoding a rigid rotation and translation.
///
/// Same convention as the matrices: `a.compose(&b)` applies `b` first.
/// The scalar operators are component-wise over all eight values, which is
/// what weighted blending needs; they do not keep the value unit length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalaDualQuat {
  pub real: DQuat,
  pub dual: DQuat,
}

impl Default for HalaDualQuat {
  fn default() -> Self {
    Self::IDENTITY
  }
}

/// The implementation of the dual quaternion.
impl HalaDualQuat {
  pub const IDENTITY: Self = Self {
    real: DQuat::IDENTITY,
    dual: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
  };

  pub const ZERO: Self = Self {
    real: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    dual: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
  };

  /// Create a dual quaternion from a rotation and a translation.
  /// The rotation is applied first.
  /// param rotation: The unit rotation.
  /// param translation: The translation.
  /// return: The dual quaternion.
  pub fn from_rotation_translation(rotation: DQuat, translation: DVec3) -> Self {
    let t = DQuat::from_xyzw(translation.x, translation.y, translation.z, 0.0);
    Self {
      real: rotation,
      dual: quat_mul(t, rotation) * 0.5,
    }
  }

  /// Create a dual quaternion from the rigid part of an affine matrix.
  /// Scale and shear are dropped.
  /// param m: The affine matrix.
  /// return: The dual quaternion.
  pub fn from_mat4(m: &DMat4) -> Self {
    let (_scale, rotation, translation) = m.to_scale_rotation_translation();
    Self::from_rotation_translation(rotation, translation)
  }

  /// The dot product of the rotational parts.
  pub fn real_dot(&self, other: &Self) -> f64 {
    self.real.dot(other.real)
  }

  /// Scale both parts so the rotational part has unit length.
  /// return: None if the rotational part is zero.
  pub fn normalize(&self) -> Option<Self> {
    let length = self.real.length();
    if length <= f64::EPSILON {
      return None;
    }
    let inv_length = 1.0 / length;
    Some(Self {
      real: self.real * inv_length,
      dual: self.dual * inv_length,
    })
  }

  /// The rotational part.
  pub fn rotation(&self) -> DQuat {
    self.real
  }

  /// The translation of a unit dual quaternion.
  pub fn translation(&self) -> DVec3 {
    let t = quat_mul(self.dual, self.real.conjugate()) * 2.0;
    DVec3::new(t.x, t.y, t.z)
  }

  /// Transform a point by a unit dual quaternion.
  /// The homogeneous coordinate is carried through unchanged.
  /// param point: The point, w is usually 1.
  /// return: The transformed point.
  pub fn deform(&self, point: DVec4) -> DVec4 {
    let q = DVec3::new(self.real.x, self.real.y, self.real.z);
    let w = self.real.w;
    let v = point.truncate();
    let uv = q.cross(v);
    let uuv = q.cross(uv);
    let rotated = v + (uv * w + uuv) * 2.0;
    (rotated + self.translation()).extend(point.w)
  }

  /// Compose two dual quaternions, `rhs` is applied first.
  pub fn compose(&self, rhs: &Self) -> Self {
    Self {
      real: quat_mul(self.real, rhs.real),
      dual: quat_mul(self.real, rhs.dual) + quat_mul(self.dual, rhs.real),
    }
  }

  /// The conjugate, which is the inverse for unit dual quaternions.
  pub fn conjugate(&self) -> Self {
    Self {
      real: self.real.conjugate(),
      dual: self.dual.conjugate(),
    }
  }

  /// Convert a unit dual quaternion into a rigid matrix.
  pub fn to_mat4(&self) -> DMat4 {
    DMat4::from_rotation_translation(self.real.normalize(), self.translation())
  }
}

impl std::ops::Add for HalaDualQuat {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    Self {
      real: self.real + rhs.real,
      dual: self.dual + rhs.dual,
    }
  }
}

impl std::ops::AddAssign for HalaDualQuat {
  fn add_assign(&mut self, rhs: Self) {
    *self = *self + rhs;
  }
}

impl std::ops::Sub for HalaDualQuat {
  type Output = Self;

  fn sub(self, rhs: Self) -> Self {
    Self {
      real: self.real - rhs.real,
      dual: self.dual - rhs.dual,
    }
  }
}

impl std::ops::SubAssign for HalaDualQuat {
  fn sub_assign(&mut self, rhs: Self) {
    *self = *self - rhs;
  }
}

impl std::ops::Mul<f64> for HalaDualQuat {
  type Output = Self;

  fn mul(self, rhs: f64) -> Self {
    Self {
      real: self.real * rhs,
      dual: self.dual * rhs,
    }
  }
}

impl std::ops::Neg for HalaDualQuat {
  type Output = Self;

  fn neg(self) -> Self {
    Self {
      real: -self.real,
      dual: -self.dual,
    }
  }
}
