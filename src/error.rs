use thiserror::Error;

/// The error type of the hala-scene-cache crate.
#[derive(Error, Debug)]
#[error("{msg}")]
pub struct HalaRendererError {
  msg: String,
  #[source]
  source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The implementation of the error type of the hala-scene-cache crate.
impl HalaRendererError {
  /// Create a new error.
  /// param msg: The message of the error.
  /// param source: The source of the error.
  /// return: The error.
  pub fn new(msg: &str, source: Option<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self {
      msg: msg.to_string(),
      source,
    }
  }

  pub fn message(&self) -> &str {
    &self.msg
  }
}

impl std::convert::From<std::io::Error> for HalaRendererError {
  fn from(err: std::io::Error) -> Self {
    Self::new(&format!("I/O error: {}", err), Some(Box::new(err)))
  }
}

impl std::convert::From<image::ImageError> for HalaRendererError {
  fn from(err: image::ImageError) -> Self {
    Self::new(&format!("Image error: {}", err), Some(Box::new(err)))
  }
}

impl std::convert::From<gltf::Error> for HalaRendererError {
  fn from(err: gltf::Error) -> Self {
    Self::new(&format!("glTF error: {}", err), Some(Box::new(err)))
  }
}

impl std::convert::From<serde_json::Error> for HalaRendererError {
  fn from(err: serde_json::Error) -> Self {
    Self::new(&format!("JSON error: {}", err), Some(Box::new(err)))
  }
}
