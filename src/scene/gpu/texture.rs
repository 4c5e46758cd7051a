use std::path::PathBuf;
use std::rc::Rc;

use crate::scene::cpu::image_data::HalaImageData;
use super::backend::{
  HalaGpuBackendRef,
  HalaTextureHandle,
};

/// A texture uploaded to the GPU.
pub struct HalaTextureCache {
  backend: HalaGpuBackendRef,
  pub handle: HalaTextureHandle,
  pub width: u32,
  pub height: u32,
  /// The path the image was decoded from.
  pub path: PathBuf,
}

/// The Drop implementation of the texture cache.
impl Drop for HalaTextureCache {
  fn drop(&mut self) {
    self.backend.borrow_mut().delete_texture(self.handle);
    log::debug!("A HalaTextureCache \"{}\" dropped.", self.path.to_string_lossy());
  }
}

impl HalaTextureCache {
  /// Upload decoded pixels.
  /// param backend: The GPU backend.
  /// param image: The decoded image.
  /// param path: The path the image was decoded from.
  /// return: The texture cache.
  pub fn new(backend: &HalaGpuBackendRef, image: &HalaImageData, path: PathBuf) -> Self {
    let handle = backend.borrow_mut().create_texture_rgb8(
      image.width, image.height, &image.data, &path.to_string_lossy());
    log::debug!("A HalaTextureCache \"{}\" created.", path.to_string_lossy());
    Self {
      backend: Rc::clone(backend),
      handle,
      width: image.width,
      height: image.height,
      path,
    }
  }
}
