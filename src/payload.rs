//! Static to dynamic payload conversion.
//!
//! The mutator decodes the payload into an ordered [`TlvList`], rewrites the
//! point-of-initiation, amount and convenience fee records, re-encodes the
//! list in original order and appends a fresh checksum field:
//!
//! ```text
//! 000201 010211 ... 5303360          5802ID ... 6304XXXX   (static)
//! 000201 010212 ... 5303360 54LLnnnn 5802ID ... 6304YYYY   (dynamic)
//! ```
//!
//! Untouched records keep their exact bytes and positions.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{
    crc::{checksum16, CHECKSUM_SIZE},
    tlv::{tags, RawTlv, TlvError, TlvList},
};

/// Country code record used as the structural split point.
pub const COUNTRY_ANCHOR: &str = "5802ID";

/// Country code value of the anchor record.
pub const COUNTRY_ID: &str = "ID";

/// Checksum record header (tag 63, length 04).
pub const CHECKSUM_HEADER: &str = "6304";

/// Errors that can occur while converting a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload string is empty.
    #[error("Payload is empty")]
    EmptyPayload,

    /// Price is negative.
    #[error("Invalid amount {0}: must not be negative")]
    InvalidAmount(i64),

    /// Tax is neither a number nor a percentage string.
    #[error("Invalid tax format {0:?}: expected a number or a value ending in '%'")]
    InvalidTaxFormat(String),

    /// Tax is a negative number or a negative percentage.
    #[error("Invalid tax value {0:?}: must not be negative")]
    InvalidTaxValue(String),

    /// The country anchor is absent or appears more than once.
    #[error("Expected exactly one country anchor {COUNTRY_ANCHOR}, found {0}")]
    MissingCountryAnchor(usize),

    /// Fee mutation attempted before an amount was set.
    #[error("Transaction amount is not set, call set_price first")]
    AmountNotSet,

    /// Payload is not well-formed TLV.
    #[error("Malformed payload: {0}")]
    Tlv(#[from] TlvError),
}

/// Point of initiation method carried by tag 01.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOfInitiation {
    /// Reusable code without an amount ("11").
    Static,
    /// Single-transaction code ("12").
    Dynamic,
}

impl PointOfInitiation {
    /// Decodes the tag 01 value.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "11" => Some(Self::Static),
            "12" => Some(Self::Dynamic),
            _ => None,
        }
    }

    /// Returns the tag 01 value.
    #[must_use]
    pub fn value(self) -> &'static str {
        match self {
            Self::Static => "11",
            Self::Dynamic => "12",
        }
    }
}

/// Convenience fee to attach to a dynamic payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tax {
    /// Fixed fee amount, encoded as indicator "02" plus tag 56.
    Nominal(i64),
    /// Percentage of the amount, encoded as indicator "03" plus tag 57.
    /// Holds the decimal string without the trailing '%'.
    Percentage(String),
}

impl Tax {
    /// Fee type indicator stored in tag 55.
    #[must_use]
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Nominal(_) => "02",
            Self::Percentage(_) => "03",
        }
    }

    /// Tag carrying the fee value (56 or 57).
    #[must_use]
    pub fn value_tag(&self) -> &'static str {
        match self {
            Self::Nominal(_) => tags::FEE_FIXED,
            Self::Percentage(_) => tags::FEE_PERCENTAGE,
        }
    }

    /// Fee value as written to the payload.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Nominal(amount) => amount.to_string(),
            Self::Percentage(percent) => percent.clone(),
        }
    }

    /// Checks the fee for negative or empty values.
    ///
    /// # Errors
    /// Returns `InvalidTaxValue` for negative fees and `InvalidTaxFormat` for
    /// an empty percentage.
    pub fn validate(&self) -> Result<(), PayloadError> {
        match self {
            Self::Nominal(amount) if *amount < 0 => {
                Err(PayloadError::InvalidTaxValue(amount.to_string()))
            }
            Self::Percentage(percent) if percent.is_empty() => {
                Err(PayloadError::InvalidTaxFormat("%".to_string()))
            }
            Self::Percentage(percent) if percent.starts_with('-') => {
                Err(PayloadError::InvalidTaxValue(format!("{}%", percent)))
            }
            _ => Ok(()),
        }
    }

    /// Builds the indicator and value records.
    fn to_tlvs(&self) -> (RawTlv, RawTlv) {
        (
            RawTlv::new(tags::FEE_INDICATOR, self.indicator()),
            RawTlv::new(self.value_tag(), self.value()),
        )
    }
}

impl From<i64> for Tax {
    fn from(amount: i64) -> Self {
        Self::Nominal(amount)
    }
}

impl FromStr for Tax {
    type Err = PayloadError;

    /// Parses "5000" as a nominal fee and "10%" as a percentage.
    ///
    /// A nominal fee must be written the way it is encoded: plain digits,
    /// no sign, no leading zeros. The percentage body is only checked for
    /// presence and sign.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(percent) = s.strip_suffix('%') {
            let tax = Self::Percentage(percent.to_string());
            tax.validate()?;
            return Ok(tax);
        }

        if let Some(digits) = s.strip_prefix('-') {
            if is_canonical_decimal(digits) {
                return Err(PayloadError::InvalidTaxValue(s.to_string()));
            }
        }
        if !is_canonical_decimal(s) {
            return Err(PayloadError::InvalidTaxFormat(s.to_string()));
        }

        s.parse::<i64>()
            .map(Self::Nominal)
            .map_err(|_| PayloadError::InvalidTaxFormat(s.to_string()))
    }
}

/// Digits only, and no leading zero unless the value is "0".
fn is_canonical_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'))
}

impl fmt::Display for Tax {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Nominal(amount) => write!(f, "{}", amount),
            Self::Percentage(percent) => write!(f, "{}%", percent),
        }
    }
}

/// Removes the checksum field from the end of `payload`.
///
/// Strips the whole `6304XXXX` field when present, otherwise the trailing
/// 4 characters (a payload stored without the checksum header).
///
/// # Errors
/// Returns `EmptyPayload` for an empty string and `TruncatedPayload` when
/// fewer than 4 characters are available.
pub fn strip_checksum(payload: &str) -> Result<&str, PayloadError> {
    if payload.is_empty() {
        return Err(PayloadError::EmptyPayload);
    }
    let len = payload.len();
    if len < CHECKSUM_SIZE {
        return Err(TlvError::TruncatedPayload {
            offset: 0,
            remaining: len,
        }
        .into());
    }

    let field_size = CHECKSUM_HEADER.len() + CHECKSUM_SIZE;
    let has_header = len >= field_size
        && payload.get(len - field_size..len - CHECKSUM_SIZE) == Some(CHECKSUM_HEADER);
    let cut = if has_header {
        len - field_size
    } else {
        len - CHECKSUM_SIZE
    };

    payload
        .get(..cut)
        .ok_or_else(|| TlvError::SplitCharacter(cut).into())
}

/// Decodes the payload body and promotes it to dynamic.
fn prepare(payload: &str) -> Result<TlvList, PayloadError> {
    let body = strip_checksum(payload)?;

    let anchors = body.matches(COUNTRY_ANCHOR).count();
    if anchors != 1 {
        return Err(PayloadError::MissingCountryAnchor(anchors));
    }

    let mut list = TlvList::parse(body)?;
    if list.get(tags::COUNTRY_CODE) != Some(COUNTRY_ID) {
        // The anchor text sits inside another value.
        return Err(PayloadError::MissingCountryAnchor(0));
    }

    promote_to_dynamic(&mut list);
    Ok(list)
}

/// Switches tag 01 from static to dynamic.
///
/// A missing or unrecognized point-of-initiation field is left as-is.
fn promote_to_dynamic(list: &mut TlvList) {
    match list
        .get(tags::POINT_OF_INITIATION)
        .map(PointOfInitiation::from_value)
    {
        Some(Some(PointOfInitiation::Static)) => {
            list.replace(
                tags::POINT_OF_INITIATION,
                PointOfInitiation::Dynamic.value(),
            );
        }
        Some(Some(PointOfInitiation::Dynamic)) => {}
        Some(None) | None => {
            log::warn!("Point of initiation field missing or unrecognized, left unchanged");
        }
    }
}

/// Encodes the list and appends the checksum field.
fn seal(list: &TlvList) -> Result<String, PayloadError> {
    let mut payload = String::with_capacity(list.wire_size() + 8);
    list.write_to(&mut payload)?;
    payload.push_str(CHECKSUM_HEADER);
    let checksum = checksum16(&payload);
    payload.push_str(&checksum);
    Ok(payload)
}

/// Sets the transaction amount and returns the dynamic payload.
///
/// An existing amount is rewritten in place, otherwise the amount record is
/// inserted immediately before the country code.
///
/// ```
/// use qris_dynamic::payload::set_price;
/// let dynamic = set_price("0002010102115802ID6304A3CF", 1000).unwrap();
/// assert!(dynamic.starts_with("000201010212540410005802ID6304"));
/// ```
///
/// # Errors
/// `InvalidAmount` for a negative price, `MissingCountryAnchor` when the
/// payload does not carry `5802ID` exactly once, or a TLV error for a
/// malformed payload.
pub fn set_price(payload: &str, price: i64) -> Result<String, PayloadError> {
    if price < 0 {
        return Err(PayloadError::InvalidAmount(price));
    }

    let mut list = prepare(payload)?;
    let amount = price.to_string();
    if list.replace(tags::TRANSACTION_AMOUNT, amount.as_str()).is_none()
        && !list.insert_before(
            tags::COUNTRY_CODE,
            RawTlv::new(tags::TRANSACTION_AMOUNT, amount.as_str()),
        )
    {
        return Err(PayloadError::MissingCountryAnchor(0));
    }

    log::debug!("Transaction amount set to {}", amount);
    seal(&list)
}

/// Sets the convenience fee and returns the dynamic payload.
///
/// Any existing fee records (55, 56, 57) are dropped; the new indicator and
/// value records follow the amount record directly.
///
/// # Errors
/// `InvalidTaxValue`/`InvalidTaxFormat` for an invalid fee,
/// `MissingCountryAnchor` as in [`set_price`], `AmountNotSet` when the
/// payload has no amount record.
pub fn set_tax(payload: &str, tax: &Tax) -> Result<String, PayloadError> {
    tax.validate()?;
    let (indicator, value) = tax.to_tlvs();

    let mut list = prepare(payload)?;
    for tag in [tags::FEE_INDICATOR, tags::FEE_FIXED, tags::FEE_PERCENTAGE] {
        list.remove(tag);
    }
    if !list.insert_after(tags::TRANSACTION_AMOUNT, indicator)
        || !list.insert_after(tags::FEE_INDICATOR, value)
    {
        return Err(PayloadError::AmountNotSet);
    }

    log::debug!("Convenience fee set to {}", tax);
    seal(&list)
}

/// Returns the point of initiation of `payload`, if it can be decoded.
#[must_use]
pub fn point_of_initiation(payload: &str) -> Option<PointOfInitiation> {
    let list = TlvList::parse(payload).ok()?;
    list.get(tags::POINT_OF_INITIATION)
        .and_then(PointOfInitiation::from_value)
}
