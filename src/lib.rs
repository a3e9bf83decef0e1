//! QRIS dynamic - static to dynamic QR payment code conversion.
//!
//! This crate turns a static merchant QR payment payload (TLV-encoded, no
//! amount) into a dynamic one carrying a transaction amount and an optional
//! convenience fee, recomputing the CRC-16 checksum. It also extracts the
//! merchant metadata from any such payload.
//!
//! # Usage
//!
//! Convert a static code image into a dynamic one:
//! ```bash
//! qris-dynamic -i static.png -o dynamic.png --price 50000 --tax 10%
//! ```
//!
//! Show the merchant behind a code:
//! ```bash
//! qris-dynamic -i static.txt --info --format json
//! ```

/// QR image rendering and detection.
pub mod codec;
/// Command-line configuration and validation.
pub mod configuration;
/// CRC-16/CCITT-FALSE payload checksum.
pub mod crc;
/// Crate-level error type.
pub mod error;
/// Payload file input and output.
pub mod file;
/// Merchant metadata extraction.
pub mod metadata;
/// Static to dynamic payload mutation.
pub mod payload;
/// Dynamic payload object.
pub mod qris;
/// Metadata report output.
pub mod report;
/// TLV codec.
pub mod tlv;

pub use error::QrisError;
pub use metadata::QrisMetadata;
pub use qris::Qris;
