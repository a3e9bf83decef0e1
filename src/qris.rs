//! Dynamic payload object.
//!
//! [`Qris`] owns one payload string and keeps the price and fee it was last
//! given for display. The payload string is the only authoritative state.
//!
//! ```
//! use qris_dynamic::qris::Qris;
//!
//! let mut qris = Qris::new("0002010102115802ID6304A3CF")?;
//! qris.set_price(25000)?.set_tax("10%".parse()?)?;
//! assert!(qris.is_dynamic());
//! assert_eq!(qris.price(), Some(25000));
//! # Ok::<(), qris_dynamic::error::QrisError>(())
//! ```

use std::{fmt, path::Path, str::FromStr};

use crate::{
    codec::{CodecError, ImageCodec, RenderOptions},
    crc,
    error::QrisError,
    file::{self, FileError},
    metadata::{self, QrisMetadata, ServiceFee},
    payload::{self, PayloadError, PointOfInitiation, Tax},
    tlv::{tags, TlvError, TlvList},
};

/// A QR payment payload with cached price and fee.
///
/// Not meant to be shared across threads while being mutated; use one
/// object per transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qris {
    payload: String,
    price: Option<i64>,
    tax: Option<Tax>,
}

impl Qris {
    /// Wraps a payload string. Surrounding whitespace is trimmed.
    ///
    /// Price and fee are read from the payload when it already carries them.
    ///
    /// # Errors
    /// Returns `EmptyPayload` if nothing is left after trimming.
    pub fn new(payload: impl Into<String>) -> Result<Self, PayloadError> {
        let payload = payload.into();
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(PayloadError::EmptyPayload);
        }

        let (price, tax) = match TlvList::parse(payload) {
            Ok(list) => (cached_price(&list), cached_tax(&list)),
            Err(e) => {
                log::debug!("Payload does not decode, no cached price or fee: {}", e);
                (None, None)
            }
        };

        Ok(Self {
            payload: payload.to_string(),
            price,
            tax,
        })
    }

    /// Loads a payload from a text file or QR image.
    ///
    /// # Errors
    /// `UnreadableSource` if the file cannot be read or decoded,
    /// `EmptyPayload` if it holds an empty payload.
    pub fn from_file(path: impl AsRef<Path>, codec: &dyn ImageCodec) -> Result<Self, QrisError> {
        let payload = file::read_payload(path.as_ref(), codec)?;
        Ok(Self::new(payload)?)
    }

    /// Current payload string.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Consumes the object, returning the payload string.
    #[must_use]
    pub fn into_payload(self) -> String {
        self.payload
    }

    /// Price last set, or read from the payload.
    #[must_use]
    pub fn price(&self) -> Option<i64> {
        self.price
    }

    /// Fee last set, or read from the payload.
    #[must_use]
    pub fn tax(&self) -> Option<&Tax> {
        self.tax.as_ref()
    }

    /// Returns true if the point of initiation is dynamic.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        payload::point_of_initiation(&self.payload) == Some(PointOfInitiation::Dynamic)
    }

    /// Returns true if the trailing checksum matches the payload.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        crc::verify(&self.payload)
    }

    /// Sets the transaction amount. The object is unchanged on error.
    ///
    /// # Errors
    /// See [`payload::set_price`].
    pub fn set_price(&mut self, price: i64) -> Result<&mut Self, PayloadError> {
        self.payload = payload::set_price(&self.payload, price)?;
        self.price = Some(price);
        Ok(self)
    }

    /// Sets the convenience fee. The object is unchanged on error.
    ///
    /// # Errors
    /// See [`payload::set_tax`].
    pub fn set_tax(&mut self, tax: Tax) -> Result<&mut Self, PayloadError> {
        self.payload = payload::set_tax(&self.payload, &tax)?;
        self.tax = Some(tax);
        Ok(self)
    }

    /// Extracts merchant metadata from the current payload.
    ///
    /// # Errors
    /// Returns the TLV error if the payload is not well-formed.
    pub fn metadata(&self) -> Result<QrisMetadata, TlvError> {
        metadata::extract(&self.payload)
    }

    /// Renders the payload as QR image bytes.
    ///
    /// # Errors
    /// See [`ImageCodec::encode`].
    pub fn to_image_bytes(
        &self,
        codec: &dyn ImageCodec,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CodecError> {
        codec.encode(&self.payload, options)
    }

    /// Writes the payload to a `.txt`, `.png`, `.jpg` or `.jpeg` file.
    ///
    /// # Errors
    /// See [`file::write_payload`].
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        codec: &dyn ImageCodec,
        options: &RenderOptions,
    ) -> Result<(), FileError> {
        file::write_payload(path.as_ref(), &self.payload, codec, options)
    }
}

fn cached_price(list: &TlvList) -> Option<i64> {
    list.get(tags::TRANSACTION_AMOUNT)?.parse().ok()
}

fn cached_tax(list: &TlvList) -> Option<Tax> {
    match metadata::service_fee(list)? {
        ServiceFee::Nominal(value) => value.parse().ok().map(Tax::Nominal),
        ServiceFee::Percentage(value) => Some(Tax::Percentage(value)),
        ServiceFee::Prompted => None,
    }
}

impl FromStr for Qris {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Qris {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.payload)
    }
}
