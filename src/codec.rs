//! QR image collaborator.
//!
//! The payload logic only deals in strings. Turning a string into a QR raster
//! and reading one back out of image bytes happens behind the [`ImageCodec`]
//! trait, with [`QrImageCodec`] as the default implementation.

use std::{fmt, io::Cursor};

use clap::ValueEnum;
use image::{codecs::jpeg::JpegEncoder, GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode, Version};
use thiserror::Error;

/// Width of the quiet zone in modules, per side.
pub const QUIET_ZONE_MODULES: usize = 4;

/// Default pixels per module.
pub const DEFAULT_SCALE: u32 = 10;

/// Largest accepted pixels per module.
pub const MAX_SCALE: u32 = 64;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Errors that can occur while rendering or reading a QR image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No QR code could be decoded from the image.
    #[error("No decodable QR code found in image")]
    NotFound,

    /// Image bytes could not be read or written.
    #[error("Image error: {0}")]
    Image(String),

    /// Payload could not be encoded as a QR symbol.
    #[error("QR encoding failed: {0}")]
    Encode(String),
}

/// Output raster format.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum RasterFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// JPEG at [`RenderOptions::jpeg_quality`].
    Jpeg,
}

/// QR error correction level.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, ValueEnum)]
pub enum ErrorCorrection {
    /// ~7% recovery.
    #[value(name = "L")]
    L,
    /// ~15% recovery.
    #[default]
    #[value(name = "M")]
    M,
    /// ~25% recovery.
    #[value(name = "Q")]
    Q,
    /// ~30% recovery.
    #[value(name = "H")]
    H,
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorCorrection::L => write!(f, "L"),
            ErrorCorrection::M => write!(f, "M"),
            ErrorCorrection::Q => write!(f, "Q"),
            ErrorCorrection::H => write!(f, "H"),
        }
    }
}

/// Rendering options for [`ImageCodec::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Output raster format.
    pub format: RasterFormat,
    /// Fixed QR version (1-40), or `None` for the smallest that fits.
    pub version: Option<i16>,
    /// Error correction level.
    pub error_correction: ErrorCorrection,
    /// Pixels per module.
    pub scale: u32,
    /// Surround the symbol with a 4-module white border.
    pub quiet_zone: bool,
    /// JPEG quality (1-100), ignored for PNG.
    pub jpeg_quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: RasterFormat::Png,
            version: None,
            error_correction: ErrorCorrection::M,
            scale: DEFAULT_SCALE,
            quiet_zone: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Converts between payload strings and QR image bytes.
pub trait ImageCodec {
    /// Reads the text payload of the first QR code found in `image`.
    ///
    /// # Errors
    /// `NotFound` if no code decodes, `Image` if the bytes are not an image.
    fn decode_text(&self, image: &[u8]) -> Result<String, CodecError>;

    /// Renders `payload` as a QR image.
    ///
    /// # Errors
    /// `Encode` if the payload does not fit the requested version/level,
    /// `Image` if the raster cannot be written.
    fn encode(&self, payload: &str, options: &RenderOptions) -> Result<Vec<u8>, CodecError>;
}

/// Default codec backed by `qrcode` (rendering) and `rqrr` (detection).
#[derive(Debug, Clone, Copy, Default)]
pub struct QrImageCodec;

impl QrImageCodec {
    /// Rasterizes `payload` into a grayscale image.
    ///
    /// # Errors
    /// See [`ImageCodec::encode`].
    pub fn render(&self, payload: &str, options: &RenderOptions) -> Result<GrayImage, CodecError> {
        let ec_level = EcLevel::from(options.error_correction);
        let code = match options.version {
            Some(version) => {
                QrCode::with_version(payload.as_bytes(), Version::Normal(version), ec_level)
            }
            None => QrCode::with_error_correction_level(payload.as_bytes(), ec_level),
        }
        .map_err(|e| CodecError::Encode(e.to_string()))?;

        if !(1..=MAX_SCALE).contains(&options.scale) {
            return Err(CodecError::Encode(format!(
                "scale {} out of range 1-{}",
                options.scale, MAX_SCALE
            )));
        }
        let scale = options.scale as usize;
        let margin = if options.quiet_zone {
            QUIET_ZONE_MODULES
        } else {
            0
        };
        let modules = code.width();
        let side = (modules + 2 * margin)
            .checked_mul(scale)
            .and_then(|side| u32::try_from(side).ok())
            .ok_or_else(|| CodecError::Encode(format!("image too large at scale {}", scale)))?;

        let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));
        for qy in 0..modules {
            for qx in 0..modules {
                if code[(qx, qy)] != Color::Dark {
                    continue;
                }
                for cy in 0..scale {
                    for cx in 0..scale {
                        let px = ((margin + qx) * scale + cx) as u32;
                        let py = ((margin + qy) * scale + cy) as u32;
                        img.put_pixel(px, py, Luma([0u8]));
                    }
                }
            }
        }

        Ok(img)
    }
}

impl ImageCodec for QrImageCodec {
    fn decode_text(&self, image: &[u8]) -> Result<String, CodecError> {
        let img = image::load_from_memory(image)
            .map_err(|e| CodecError::Image(e.to_string()))?
            .to_luma8();

        let (width, height) = img.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                img.get_pixel(x as u32, y as u32).0[0]
            });

        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_, content)) => return Ok(content),
                Err(e) => log::debug!("QR grid found but failed to decode: {}", e),
            }
        }

        Err(CodecError::NotFound)
    }

    fn encode(&self, payload: &str, options: &RenderOptions) -> Result<Vec<u8>, CodecError> {
        let img = self.render(payload, options)?;

        let mut bytes = Vec::new();
        match options.format {
            RasterFormat::Png => img
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|e| CodecError::Image(e.to_string()))?,
            RasterFormat::Jpeg => {
                let quality = options.jpeg_quality.clamp(1, 100);
                JpegEncoder::new_with_quality(&mut bytes, quality)
                    .encode_image(&img)
                    .map_err(|e| CodecError::Image(e.to_string()))?;
            }
        }

        Ok(bytes)
    }
}
