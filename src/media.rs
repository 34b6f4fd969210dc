use image::{DynamicImage, ImageFormat};

use crate::error::BotError;

/// A downloaded photo that has been verified to decode as an image.
///
/// The downloaded bytes are kept so they can be forwarded without re-encoding.
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn decode(bytes: Vec<u8>) -> Result<Self, BotError> {
        let format = image::guess_format(&bytes)?;
        let image = image::load_from_memory_with_format(&bytes, format)?;
        Ok(Self {
            image,
            format,
            bytes,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

#[cfg(test)]
pub(crate) fn png_fixture() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image::RgbImage::new(3, 2))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
