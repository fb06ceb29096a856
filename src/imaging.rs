//! Image sizes, decoding fetched bytes and re-encoding for download.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{DOWNLOAD_FILE_NAME, DOWNLOAD_MIME_TYPE};
use crate::error::ServiceError;

/// Pixel sizes the image model accepts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    /// 1024x1024
    #[default]
    Square,
    /// 1792x1024
    Landscape,
    /// 1024x1792
    Portrait,
}

impl ImageSize {
    /// All sizes, in the order they're offered.
    pub const ALL: [ImageSize; 3] = [ImageSize::Square, ImageSize::Landscape, ImageSize::Portrait];

    /// The wire value, eg `1792x1024`.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }

    /// Width and height in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ImageSize::Square => (1024, 1024),
            ImageSize::Landscape => (1792, 1024),
            ImageSize::Portrait => (1024, 1792),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a size string isn't one of [`ImageSize::ALL`].
#[derive(Debug, Eq, PartialEq)]
pub struct UnknownImageSize(pub String);

impl fmt::Display for UnknownImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported image size: {}", self.0)
    }
}

impl std::error::Error for UnknownImageSize {}

impl FromStr for ImageSize {
    type Err = UnknownImageSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str() == value)
            .ok_or(UnknownImageSize(value))
    }
}

/// A decoded image, alive for a single render of the page.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    bitmap: DynamicImage,
    /// The size that was requested, which the bitmap may not match
    pub requested_size: ImageSize,
    /// The model's rewrite of the prompt, when it sends one back
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    /// Decodes raw bytes (PNG or JPEG) into a bitmap.
    pub fn decode(bytes: &[u8], requested_size: ImageSize) -> Result<Self, ServiceError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| {
                debug!("Failed to guess image format: {}", err);
                ServiceError::Decode(err.to_string())
            })?;
        let image = Self {
            bitmap: reader.decode()?,
            requested_size,
            revised_prompt: None,
        };
        if image.matches_requested_size() {
            debug!("Decoded {} image", requested_size);
        } else {
            warn!(
                "Decoded {}x{} image, but {} was requested",
                image.bitmap.width(),
                image.bitmap.height(),
                requested_size
            );
        }
        Ok(image)
    }

    /// The decoded pixels.
    pub fn bitmap(&self) -> &DynamicImage {
        &self.bitmap
    }

    /// Whether the service drew the size that was asked for.
    pub fn matches_requested_size(&self) -> bool {
        (self.bitmap.width(), self.bitmap.height()) == self.requested_size.dimensions()
    }

    /// Encodes the bitmap as PNG for download.
    pub fn to_png(&self) -> Result<Vec<u8>, ServiceError> {
        let mut output = Cursor::new(Vec::new());
        self.bitmap
            .write_to(&mut output, ImageFormat::Png)
            .map_err(|err| ServiceError::Encode(err.to_string()))?;
        Ok(output.into_inner())
    }
}

/// An image ready to be shown and offered as a one-shot download.
#[derive(Clone, Debug)]
pub struct ImageOffer {
    /// The decoded image
    pub image: GeneratedImage,
    png: Vec<u8>,
}

impl ImageOffer {
    /// Encodes the image to PNG once, up front.
    pub fn new(image: GeneratedImage) -> Result<Self, ServiceError> {
        let png = image.to_png()?;
        Ok(Self { image, png })
    }

    /// The PNG bytes offered for download.
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// File name the download is saved under.
    pub fn file_name(&self) -> &'static str {
        DOWNLOAD_FILE_NAME
    }

    /// A `data:` URL carrying the PNG. The page embeds it once, in the `<img>`.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            DOWNLOAD_MIME_TYPE,
            general_purpose::STANDARD.encode(&self.png)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_png;

    #[test]
    fn sizes_parse_from_wire_values() {
        assert_eq!("1024x1024".parse::<ImageSize>(), Ok(ImageSize::Square));
        assert_eq!("1792x1024".parse::<ImageSize>(), Ok(ImageSize::Landscape));
        assert_eq!(" 1024X1792".parse::<ImageSize>(), Ok(ImageSize::Portrait));
        assert!("512x512".parse::<ImageSize>().is_err());
        assert_eq!(ImageSize::Landscape.dimensions(), (1792, 1024));
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        let bytes = sample_png();
        let image = GeneratedImage::decode(&bytes, ImageSize::Square).expect("decode");
        let encoded = image.to_png().expect("encode");
        let again = GeneratedImage::decode(&encoded, ImageSize::Square).expect("decode again");
        assert_eq!(image.bitmap().to_rgba8(), again.bitmap().to_rgba8());
    }

    #[test]
    fn size_mismatch_is_reported_but_not_fatal() {
        let image = GeneratedImage::decode(&sample_png(), ImageSize::Landscape).expect("decode");
        assert!(!image.matches_requested_size());

        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(1024, 1792)
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encode");
        let image =
            GeneratedImage::decode(bytes.get_ref(), ImageSize::Portrait).expect("decode");
        assert!(image.matches_requested_size());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(GeneratedImage::decode(&[], ImageSize::Square).is_err());
        assert!(GeneratedImage::decode(b"This is not an image.", ImageSize::Square).is_err());
    }

    #[test]
    fn offer_is_a_png_download() {
        let image = GeneratedImage::decode(&sample_png(), ImageSize::Portrait).expect("decode");
        let offer = ImageOffer::new(image).expect("encode");
        assert!(offer.png_bytes().starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(offer.file_name(), "generated_image.png");
        assert!(offer.data_url().starts_with("data:image/png;base64,"));
    }
}
