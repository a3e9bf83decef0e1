//! Crate-level error type.

use thiserror::Error;

use crate::{
    codec::CodecError, configuration::ConfigurationError, file::FileError, payload::PayloadError,
    tlv::TlvError,
};

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum QrisError {
    /// Payload conversion failed.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Payload is not well-formed TLV.
    #[error("Malformed payload: {0}")]
    Tlv(#[from] TlvError),

    /// Reading or writing a payload file failed.
    #[error(transparent)]
    File(#[from] FileError),

    /// QR image rendering or detection failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Command-line configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
}
