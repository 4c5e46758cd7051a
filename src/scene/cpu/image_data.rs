use std::path::Path;

use image::GenericImageView;

use crate::error::HalaRendererError;

/// Decoded texture pixels, tightly packed RGB8 rows, bottom row first.
pub struct HalaImageData {
  pub width: u32,
  pub height: u32,
  pub data: Vec<u8>,
}

impl HalaImageData {
  /// Decode an image file into RGB8 pixels.
  /// Rows are flipped so the first row is the bottom of the image.
  /// param path: The file path.
  /// return: The result.
  pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, HalaRendererError> {
    let path = path.as_ref();

    let img = image::open(path)
      .map_err(|e| HalaRendererError::new(&format!("Failed to open image \"{}\".", path.to_string_lossy()), Some(Box::new(e))))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
      return Err(HalaRendererError::new(&format!("The image \"{}\" is empty.", path.to_string_lossy()), None));
    }

    let img = match img.color() {
      image::ColorType::Rgb8 => img,
      image::ColorType::L8
      | image::ColorType::La8
      | image::ColorType::Rgba8
      | image::ColorType::L16
      | image::ColorType::La16
      | image::ColorType::Rgb16
      | image::ColorType::Rgba16 => image::DynamicImage::ImageRgb8(img.into_rgb8()),
      color_type => return Err(HalaRendererError::new(&format!("Unsupported color type: {:?}", color_type), None)),
    };

    let data = img.flipv().into_rgb8().into_raw();
    Ok(Self {
      width,
      height,
      data,
    })
  }
}
