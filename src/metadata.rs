//! Merchant metadata extraction.
//!
//! Reads the merchant identity, location and transaction fields from the
//! top-level records and the nested merchant account templates (26, 27, 51).

use serde::Serialize;

use crate::tlv::{tags, TlvError, TlvList};

/// Generic identifier of the national QR standard, skipped when looking for
/// the acquirer.
pub const GENERIC_GUI: &str = "ID.CO.QRIS.WWW";

/// Country code assumed when tag 58 is absent.
pub const DEFAULT_COUNTRY: &str = "ID";

/// Merchant account template decoded from tag 26, 27 or 51.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerchantAccount {
    /// Template tag the account was read from.
    pub tag: String,
    /// Reverse-domain identifier of the acquirer (sub-tag 00).
    pub gui: String,
    /// Merchant account number (sub-tag 01).
    pub pan: Option<String>,
}

impl MerchantAccount {
    /// Returns true if the identifier is the generic QR standard marker.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.gui.eq_ignore_ascii_case(GENERIC_GUI)
    }
}

/// Convenience fee decoded from tags 55, 56 and 57.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ServiceFee {
    /// Consumer is prompted for a tip (indicator "01").
    Prompted,
    /// Fixed fee from tag 56 (indicator "02").
    Nominal(String),
    /// Percentage fee from tag 57 (indicator "03").
    Percentage(String),
}

/// Snapshot of the merchant fields of one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrisMetadata {
    /// Merchant name (tag 59).
    pub merchant: String,
    /// Acquirer identifier from the first non-generic merchant account.
    pub company: String,
    /// Merchant city (tag 60).
    pub region: String,
    /// Country code (tag 58).
    pub country: String,
    /// Postal code (tag 61).
    pub postal_code: String,
    /// Merchant account number paired with `company`.
    pub merchant_pan: String,
    /// Raw transaction amount (tag 54).
    pub price: Option<String>,
    /// Raw fee indicator (tag 55).
    pub tax: Option<String>,
    /// Decoded convenience fee.
    pub service_fee: Option<ServiceFee>,
}

/// Returns the first merchant account whose identifier is not the generic
/// marker, searching tags 26, 27 and 51 in that order.
///
/// Templates that fail to decode are skipped.
#[must_use]
pub fn merchant_account(list: &TlvList) -> Option<MerchantAccount> {
    for tag in tags::MERCHANT_ACCOUNTS {
        let value = match list.get(tag) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };

        let nested = match TlvList::parse(value) {
            Ok(nested) => nested,
            Err(e) => {
                log::debug!("Skipping merchant account template {}: {}", tag, e);
                continue;
            }
        };

        let Some(gui) = nested.get(tags::GLOBALLY_UNIQUE_ID) else {
            continue;
        };
        let account = MerchantAccount {
            tag: tag.to_string(),
            gui: gui.to_string(),
            pan: nested.get(tags::MERCHANT_PAN).map(str::to_string),
        };
        if !account.is_generic() {
            return Some(account);
        }
    }
    None
}

/// Decodes the convenience fee records, if any.
#[must_use]
pub fn service_fee(list: &TlvList) -> Option<ServiceFee> {
    match list.get(tags::FEE_INDICATOR)? {
        "01" => Some(ServiceFee::Prompted),
        "02" => list
            .get(tags::FEE_FIXED)
            .map(|v| ServiceFee::Nominal(v.to_string())),
        "03" => list
            .get(tags::FEE_PERCENTAGE)
            .map(|v| ServiceFee::Percentage(v.to_string())),
        _ => None,
    }
}

/// Extracts merchant metadata from a decoded payload.
#[must_use]
pub fn from_list(list: &TlvList) -> QrisMetadata {
    let field = |tag: &str| list.get(tag).unwrap_or_default().to_string();
    let account = merchant_account(list);

    QrisMetadata {
        merchant: field(tags::MERCHANT_NAME),
        company: account.as_ref().map(|a| a.gui.clone()).unwrap_or_default(),
        region: field(tags::MERCHANT_CITY),
        country: list
            .get(tags::COUNTRY_CODE)
            .unwrap_or(DEFAULT_COUNTRY)
            .to_string(),
        postal_code: field(tags::POSTAL_CODE),
        merchant_pan: account.and_then(|a| a.pan).unwrap_or_default(),
        price: list.get(tags::TRANSACTION_AMOUNT).map(str::to_string),
        tax: list.get(tags::FEE_INDICATOR).map(str::to_string),
        service_fee: service_fee(list),
    }
}

/// Decodes `payload` and extracts its merchant metadata.
///
/// # Errors
/// Returns the TLV error if the payload is not well-formed.
pub fn extract(payload: &str) -> Result<QrisMetadata, TlvError> {
    let list = TlvList::parse(payload)?;
    Ok(from_list(&list))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATIC: &str = "00020101021126460015ID.CO.GOPAY.WWW011612345678901234500303UMI\
                          51440014ID.CO.QRIS.WWW0215ID10200123456780303UMI520454115303360\
                          5802ID5917MERCHANT NATIONAL6008SURABAYA61056011162070703A016304C84F";

    #[test]
    fn test_extract_static() {
        let meta = extract(STATIC).unwrap();
        assert_eq!(meta.merchant, "MERCHANT NATIONAL");
        assert_eq!(meta.company, "ID.CO.GOPAY.WWW");
        assert_eq!(meta.merchant_pan, "1234567890123450");
        assert_eq!(meta.region, "SURABAYA");
        assert_eq!(meta.country, "ID");
        assert_eq!(meta.postal_code, "60111");
        assert_eq!(meta.price, None);
        assert_eq!(meta.tax, None);
        assert_eq!(meta.service_fee, None);
    }

    #[test]
    fn test_extract_skips_generic_identifier() {
        // Tag 26 carries only the generic marker, tag 51 the acquirer.
        let payload = "26180014id.co.qris.www51260013ID.CO.BCA.WWW0105123455802ID";
        let meta = extract(payload).unwrap();
        assert_eq!(meta.company, "ID.CO.BCA.WWW");
        assert_eq!(meta.merchant_pan, "12345");
    }

    #[test]
    fn test_extract_first_match_wins() {
        let payload = "26170013ID.CO.OVO.WWW51310014ID.CO.DANA.WWW0109987654321";
        let meta = extract(payload).unwrap();
        assert_eq!(meta.company, "ID.CO.OVO.WWW");
        // No PAN in the winning template; nothing is merged from tag 51.
        assert_eq!(meta.merchant_pan, "");
    }

    #[test]
    fn test_extract_defaults() {
        let meta = extract("000201").unwrap();
        assert_eq!(meta.merchant, "");
        assert_eq!(meta.company, "");
        assert_eq!(meta.country, DEFAULT_COUNTRY);
        assert_eq!(meta.merchant_pan, "");
        assert_eq!(meta.price, None);
    }

    #[test]
    fn test_extract_only_generic_identifier() {
        let meta = extract("51180014ID.CO.QRIS.WWW").unwrap();
        assert_eq!(meta.company, "");
    }

    #[test]
    fn test_extract_skips_broken_template() {
        let payload = "2604XXXX27170013ID.CO.OVO.WWW";
        let meta = extract(payload).unwrap();
        assert_eq!(meta.company, "ID.CO.OVO.WWW");
    }

    #[test]
    fn test_extract_price_and_fee() {
        let payload = "540550000550203570210";
        let meta = extract(payload).unwrap();
        assert_eq!(meta.price.as_deref(), Some("50000"));
        assert_eq!(meta.tax.as_deref(), Some("03"));
        assert_eq!(
            meta.service_fee,
            Some(ServiceFee::Percentage("10".to_string()))
        );
    }

    #[test]
    fn test_service_fee_variants() {
        let nominal = TlvList::parse("550202560450005802ID").unwrap();
        assert_eq!(
            service_fee(&nominal),
            Some(ServiceFee::Nominal("5000".to_string()))
        );

        let prompted = TlvList::parse("550201").unwrap();
        assert_eq!(service_fee(&prompted), Some(ServiceFee::Prompted));

        let dangling = TlvList::parse("550203").unwrap();
        assert_eq!(service_fee(&dangling), None);
    }

    #[test]
    fn test_extract_malformed() {
        assert!(matches!(
            extract("5917MERCHANT"),
            Err(TlvError::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn test_metadata_serialize() {
        let meta = extract("540550000550202560450005802ID").unwrap();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["price"], "50000");
        assert_eq!(json["service_fee"]["type"], "nominal");
        assert_eq!(json["service_fee"]["value"], "5000");
    }
}
