//! Reading and writing payloads as text files or QR images.

use std::{fs, path::Path};

use thiserror::Error;

use crate::codec::{CodecError, ImageCodec, RasterFormat, RenderOptions};

/// Errors that can occur while reading or writing payload files.
#[derive(Error, Debug)]
pub enum FileError {
    /// Source file could not be read or holds no decodable code.
    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    /// Destination extension is not txt, png, jpg or jpeg.
    #[error("Unsupported destination {0:?}: expected .txt, .png, .jpg or .jpeg")]
    UnsupportedDestination(String),

    /// Writing the destination failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendering the QR image failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Kind of file a payload is written to, chosen by extension.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FileKind {
    /// Plain text, payload written verbatim.
    Text,
    /// QR code as PNG.
    Png,
    /// QR code as JPEG.
    Jpeg,
}

impl FileKind {
    /// Determines the kind from the path extension (case-insensitive).
    ///
    /// # Errors
    /// Returns `UnsupportedDestination` for any other extension.
    pub fn from_path(path: &Path) -> Result<Self, FileError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("txt") => Ok(Self::Text),
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            _ => Err(FileError::UnsupportedDestination(
                path.display().to_string(),
            )),
        }
    }

    /// Raster format for image kinds.
    #[must_use]
    pub fn raster_format(self) -> Option<RasterFormat> {
        match self {
            Self::Text => None,
            Self::Png => Some(RasterFormat::Png),
            Self::Jpeg => Some(RasterFormat::Jpeg),
        }
    }
}

/// Reads a payload from a `.txt` file verbatim, or decodes it from any
/// other file as a QR image.
///
/// # Errors
/// Returns `UnreadableSource` if the file cannot be read or contains no
/// decodable QR code.
pub fn read_payload(path: &Path, codec: &dyn ImageCodec) -> Result<String, FileError> {
    let unreadable =
        |reason: String| FileError::UnreadableSource(format!("{}: {}", path.display(), reason));

    if matches!(FileKind::from_path(path), Ok(FileKind::Text)) {
        return fs::read_to_string(path).map_err(|e| unreadable(e.to_string()));
    }

    let bytes = fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    let payload = codec
        .decode_text(&bytes)
        .map_err(|e| unreadable(e.to_string()))?;
    log::debug!("Decoded {} characters from {}", payload.len(), path.display());
    Ok(payload)
}

/// Writes a payload to `path`, as text or as a rendered QR image depending
/// on the extension. The raster format in `options` is overridden by the
/// extension.
///
/// # Errors
/// `UnsupportedDestination` for unknown extensions, `Codec` if rendering
/// fails, `Io` if the file cannot be written.
pub fn write_payload(
    path: &Path,
    payload: &str,
    codec: &dyn ImageCodec,
    options: &RenderOptions,
) -> Result<(), FileError> {
    let kind = FileKind::from_path(path)?;

    match kind.raster_format() {
        None => fs::write(path, payload)?,
        Some(format) => {
            let options = RenderOptions {
                format,
                ..options.clone()
            };
            let bytes = codec.encode(payload, &options)?;
            fs::write(path, bytes)?;
        }
    }

    log::debug!("Wrote payload to {} as {:?}", path.display(), kind);
    Ok(())
}
