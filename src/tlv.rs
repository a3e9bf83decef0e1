//! TLV (Tag-Length-Value) codec for QR payment payloads.
//!
//! A payload is a flat concatenation of TLV records. Some values (merchant
//! account information) are themselves TLV-encoded and can be decoded with
//! the same codec.
//!
//! # Record Format
//!
//! ```text
//! +-----+--------+---------------------------+
//! | Tag | Length |          Value            |
//! +-----+--------+---------------------------+
//!  2 ch   2 ch     Length characters
//! ```
//!
//! - **Tag (2 characters)**: field identifier, conventionally two ASCII digits
//! - **Length (2 characters)**: decimal length of the value, zero-padded ("05")
//! - **Value**: exactly `Length` characters
//!
//! Tags are unique within one level. When a tag repeats, the value of the
//! last occurrence is kept at the position of the first one.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// TLV header size in characters (2 tag + 2 length).
pub const TLV_HEADER_SIZE: usize = 4;

/// Tag width in characters.
pub const TAG_SIZE: usize = 2;

/// Largest value length expressible by the 2-digit length field.
pub const MAX_VALUE_LENGTH: usize = 99;

/// Well-known top-level and nested tags.
pub mod tags {
    /// Payload format indicator.
    pub const PAYLOAD_FORMAT: &str = "00";
    /// Point of initiation method ("11" static, "12" dynamic).
    pub const POINT_OF_INITIATION: &str = "01";
    /// Merchant account information tags, in lookup order.
    pub const MERCHANT_ACCOUNTS: [&str; 3] = ["26", "27", "51"];
    /// Merchant category code.
    pub const MERCHANT_CATEGORY: &str = "52";
    /// Transaction currency.
    pub const TRANSACTION_CURRENCY: &str = "53";
    /// Transaction amount.
    pub const TRANSACTION_AMOUNT: &str = "54";
    /// Tip or convenience indicator ("02" fixed fee, "03" percentage).
    pub const FEE_INDICATOR: &str = "55";
    /// Fixed convenience fee value.
    pub const FEE_FIXED: &str = "56";
    /// Percentage convenience fee value.
    pub const FEE_PERCENTAGE: &str = "57";
    /// Country code.
    pub const COUNTRY_CODE: &str = "58";
    /// Merchant name.
    pub const MERCHANT_NAME: &str = "59";
    /// Merchant city.
    pub const MERCHANT_CITY: &str = "60";
    /// Postal code.
    pub const POSTAL_CODE: &str = "61";
    /// CRC checksum, always last.
    pub const CRC: &str = "63";

    /// Globally unique identifier inside a merchant account template.
    pub const GLOBALLY_UNIQUE_ID: &str = "00";
    /// Merchant PAN inside a merchant account template.
    pub const MERCHANT_PAN: &str = "01";
}

/// Errors that can occur during TLV parsing or serialization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvError {
    /// Input ends before a complete record at `offset`.
    #[error("Truncated payload at offset {offset}: {remaining} characters left for a TLV record")]
    TruncatedPayload { offset: usize, remaining: usize },

    /// The 2-character length field is not a decimal number.
    #[error("Malformed length field {field:?} at offset {offset}")]
    MalformedLength { offset: usize, field: String },

    /// A value boundary falls inside a multi-byte character.
    #[error("TLV record at offset {0} splits a multi-byte character")]
    SplitCharacter(usize),

    /// Value does not fit the 2-digit length field.
    #[error("TLV value length {0} exceeds maximum of {MAX_VALUE_LENGTH}")]
    ValueTooLong(usize),

    /// Tag is not exactly two characters.
    #[error("Invalid tag {0:?}: expected {TAG_SIZE} characters")]
    InvalidTag(String),
}

/// A single TLV record with its raw string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTlv {
    /// Two-character tag.
    pub tag: String,
    /// Raw value, possibly nested TLV.
    pub value: String,
}

impl RawTlv {
    /// Creates a new record.
    #[must_use]
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }

    /// Parses a single record from the beginning of `buf`.
    ///
    /// `offset` is the position of `buf` within the enclosing payload and is
    /// only used for error reporting. Returns the record and the number of
    /// characters consumed (`4 + length`).
    ///
    /// # Errors
    /// Returns `TruncatedPayload` if fewer than 4 characters remain or the
    /// declared length exceeds the rest of the input, and `MalformedLength`
    /// if the length field is not two decimal digits.
    pub fn parse(buf: &str, offset: usize) -> Result<(Self, usize), TlvError> {
        let bytes = buf.as_bytes();
        if bytes.len() < TLV_HEADER_SIZE {
            return Err(TlvError::TruncatedPayload {
                offset,
                remaining: bytes.len(),
            });
        }

        let tag = buf
            .get(..TAG_SIZE)
            .ok_or(TlvError::SplitCharacter(offset))?;
        let length_field = buf
            .get(TAG_SIZE..TLV_HEADER_SIZE)
            .ok_or(TlvError::SplitCharacter(offset))?;

        if !length_field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TlvError::MalformedLength {
                offset,
                field: length_field.to_string(),
            });
        }
        // Two ASCII digits always parse.
        let length = length_field
            .parse::<usize>()
            .map_err(|_| TlvError::MalformedLength {
                offset,
                field: length_field.to_string(),
            })?;

        let total_size = TLV_HEADER_SIZE + length;
        if bytes.len() < total_size {
            return Err(TlvError::TruncatedPayload {
                offset,
                remaining: bytes.len(),
            });
        }

        let value = buf
            .get(TLV_HEADER_SIZE..total_size)
            .ok_or(TlvError::SplitCharacter(offset))?;

        Ok((Self::new(tag, value), total_size))
    }

    /// Serializes the record to a new string.
    ///
    /// # Errors
    /// Returns an error if the tag is not 2 characters or the value is
    /// longer than 99 characters.
    pub fn encode(&self) -> Result<String, TlvError> {
        let mut buf = String::with_capacity(self.wire_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Appends the serialized record to `buf`.
    ///
    /// # Errors
    /// Same as [`RawTlv::encode`]. `buf` is left untouched on error.
    pub fn write_to(&self, buf: &mut String) -> Result<(), TlvError> {
        if self.tag.len() != TAG_SIZE {
            return Err(TlvError::InvalidTag(self.tag.clone()));
        }
        if self.value.len() > MAX_VALUE_LENGTH {
            return Err(TlvError::ValueTooLong(self.value.len()));
        }

        buf.push_str(&self.tag);
        buf.push_str(&format!("{:02}", self.value.len()));
        buf.push_str(&self.value);
        Ok(())
    }

    /// Returns the serialized size of the record (header + value).
    #[must_use]
    pub fn wire_size(&self) -> usize {
        TLV_HEADER_SIZE + self.value.len()
    }
}

/// An ordered list of TLV records, unique by tag.
///
/// Order is the order of first appearance, so re-encoding an unmodified list
/// reproduces the parsed input exactly (for inputs without duplicate tags).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvList {
    entries: Vec<RawTlv>,
}

impl TlvList {
    /// Creates a new empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the list holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns an iterator over the records in order.
    pub fn iter(&self) -> impl Iterator<Item = &RawTlv> {
        self.entries.iter()
    }

    /// Parses a complete TLV string.
    ///
    /// # Errors
    /// Returns the first structural error encountered; see [`RawTlv::parse`].
    pub fn parse(buf: &str) -> Result<Self, TlvError> {
        let mut list = Self::new();
        let mut offset = 0;

        while offset < buf.len() {
            let rest = buf.get(offset..).ok_or(TlvError::SplitCharacter(offset))?;
            let (tlv, consumed) = RawTlv::parse(rest, offset)?;
            list.push(tlv);
            offset += consumed;
        }

        Ok(list)
    }

    /// Adds a record, overwriting the value of an existing record with the
    /// same tag in place.
    pub fn push(&mut self, tlv: RawTlv) {
        match self.entries.iter_mut().find(|e| e.tag == tlv.tag) {
            Some(existing) => {
                log::debug!("Duplicate tag {} in TLV list, keeping last value", tlv.tag);
                existing.value = tlv.value;
            }
            None => self.entries.push(tlv),
        }
    }

    /// Returns the value for `tag`, if present.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.value.as_str())
    }

    /// Returns true if a record with `tag` exists.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    /// Returns the index of the record with `tag`.
    #[must_use]
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.tag == tag)
    }

    /// Replaces the value of an existing record, returning the old value.
    ///
    /// Does nothing and returns `None` if `tag` is absent.
    pub fn replace(&mut self, tag: &str, value: impl Into<String>) -> Option<String> {
        self.entries
            .iter_mut()
            .find(|e| e.tag == tag)
            .map(|e| std::mem::replace(&mut e.value, value.into()))
    }

    /// Inserts `tlv` immediately before the record tagged `anchor`.
    ///
    /// Any existing record with the same tag is removed first. Returns false
    /// (and leaves the list unchanged) if `anchor` is absent.
    pub fn insert_before(&mut self, anchor: &str, tlv: RawTlv) -> bool {
        self.insert_relative(anchor, tlv, 0)
    }

    /// Inserts `tlv` immediately after the record tagged `anchor`.
    ///
    /// Any existing record with the same tag is removed first. Returns false
    /// (and leaves the list unchanged) if `anchor` is absent.
    pub fn insert_after(&mut self, anchor: &str, tlv: RawTlv) -> bool {
        self.insert_relative(anchor, tlv, 1)
    }

    fn insert_relative(&mut self, anchor: &str, tlv: RawTlv, shift: usize) -> bool {
        if anchor == tlv.tag || !self.contains(anchor) {
            return false;
        }
        self.remove(&tlv.tag);
        match self.position(anchor) {
            Some(index) => {
                self.entries.insert(index + shift, tlv);
                true
            }
            None => false,
        }
    }

    /// Removes the record tagged `tag`, returning its value.
    pub fn remove(&mut self, tag: &str) -> Option<String> {
        let index = self.position(tag)?;
        Some(self.entries.remove(index).value)
    }

    /// Serializes all records in order.
    ///
    /// # Errors
    /// Returns the first record error; see [`RawTlv::write_to`].
    pub fn encode(&self) -> Result<String, TlvError> {
        let mut buf = String::with_capacity(self.wire_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Appends all serialized records to `buf`.
    ///
    /// # Errors
    /// Same as [`TlvList::encode`]. Records written before the failing one
    /// remain in `buf`.
    pub fn write_to(&self, buf: &mut String) -> Result<(), TlvError> {
        for tlv in &self.entries {
            tlv.write_to(buf)?;
        }
        Ok(())
    }

    /// Returns the total serialized size of the list.
    #[must_use]
    pub fn wire_size(&self) -> usize {
        self.entries.iter().map(RawTlv::wire_size).sum()
    }
}

impl FromStr for TlvList {
    type Err = TlvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TlvList {
    /// Writes the records as `tag[len]=value`, one per line.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for tlv in &self.entries {
            writeln!(f, "{}[{:02}]={}", tlv.tag, tlv.value.len(), tlv.value)?;
        }
        Ok(())
    }
}

/// Decodes a TLV string into an ordered list.
///
/// ```
/// use qris_dynamic::tlv::decode;
/// let list = decode("000201010211").unwrap();
/// assert_eq!(list.get("01"), Some("11"));
/// ```
///
/// # Errors
/// See [`TlvList::parse`].
pub fn decode(payload: &str) -> Result<TlvList, TlvError> {
    TlvList::parse(payload)
}
