/// A texture read from an image file.
#[derive(Clone, Debug, Default)]
pub struct HalaFileTexture {
  pub name: String,
  /// The path as stored in the scene, usually absolute on the authoring machine.
  pub file_name: String,
  /// The path relative to the scene file.
  pub relative_file_name: String,
}
