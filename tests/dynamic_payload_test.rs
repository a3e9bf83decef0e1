//! End-to-end tests for static to dynamic conversion.
//!
//! These tests drive the public API the way the CLI does: load a static
//! code, set price and fee, check the resulting payload and write it out.

use qris_dynamic::codec::{ImageCodec, QrImageCodec, RasterFormat, RenderOptions};
use qris_dynamic::crc::{checksum16, verify};
use qris_dynamic::file::FileError;
use qris_dynamic::metadata::{extract, ServiceFee};
use qris_dynamic::payload::{set_price, set_tax, PayloadError, Tax};
use qris_dynamic::tlv::{decode, tags};
use qris_dynamic::{Qris, QrisError};

/// Static code with a GoPay account in tag 26 and the generic QRIS
/// template in tag 51.
const STATIC: &str = "00020101021126460015ID.CO.GOPAY.WWW011612345678901234500303UMI\
                      51440014ID.CO.QRIS.WWW0215ID10200123456780303UMI520454115303360\
                      5802ID5917MERCHANT NATIONAL6008SURABAYA61056011162070703A016304C84F";

/// Checks the invariants every converted payload must satisfy.
fn assert_dynamic(payload: &str, amount: &str) {
    let list = decode(payload).unwrap();
    assert_eq!(list.get(tags::POINT_OF_INITIATION), Some("12"));
    assert_eq!(list.get(tags::TRANSACTION_AMOUNT), Some(amount));
    assert_eq!(list.get(tags::COUNTRY_CODE), Some("ID"));

    let (prefix, checksum) = payload.split_at(payload.len() - 4);
    assert!(prefix.ends_with("6304"));
    assert_eq!(checksum16(prefix), checksum);
}

#[test]
fn test_crc_reference_vector() {
    assert_eq!(checksum16("123456789"), "29B1");
}

#[test]
fn test_static_fixture_is_valid() {
    assert!(verify(STATIC));
}

#[test]
fn test_set_price_roundtrip() {
    for amount in [0i64, 1, 999, 50000, 1_000_000_000] {
        let payload = set_price(STATIC, amount).unwrap();
        assert_dynamic(&payload, &amount.to_string());
    }
}

#[test]
fn test_untouched_fields_preserved() {
    let payload = set_price(STATIC, 50000).unwrap();
    let before = decode(STATIC).unwrap();
    let after = decode(&payload).unwrap();

    for tlv in before.iter() {
        if tlv.tag == tags::POINT_OF_INITIATION || tlv.tag == tags::CRC {
            continue;
        }
        assert_eq!(after.get(&tlv.tag), Some(tlv.value.as_str()), "tag {}", tlv.tag);
    }
    // Amount sits right before the country code.
    assert_eq!(
        after.position(tags::TRANSACTION_AMOUNT).map(|p| p + 1),
        after.position(tags::COUNTRY_CODE)
    );
}

#[test]
fn test_tax_percentage_composition() {
    let payload = set_tax(&set_price(STATIC, 50000).unwrap(), &"10%".parse().unwrap()).unwrap();
    assert_dynamic(&payload, "50000");

    let meta = extract(&payload).unwrap();
    assert_eq!(meta.tax.as_deref(), Some("03"));
    assert_eq!(
        meta.service_fee,
        Some(ServiceFee::Percentage("10".to_string()))
    );
}

#[test]
fn test_tax_nominal_composition() {
    let payload = set_tax(&set_price(STATIC, 50000).unwrap(), &Tax::Nominal(5000)).unwrap();
    assert_dynamic(&payload, "50000");

    let meta = extract(&payload).unwrap();
    assert_eq!(meta.tax.as_deref(), Some("02"));
    assert_eq!(
        meta.service_fee,
        Some(ServiceFee::Nominal("5000".to_string()))
    );
}

#[test]
fn test_missing_and_duplicate_anchor() {
    let none = STATIC.replace("5802ID", "5802SG");
    let twice = STATIC.replace("6008SURABAYA", "60065802ID");

    for payload in [&none, &twice] {
        assert!(matches!(
            set_price(payload, 100),
            Err(PayloadError::MissingCountryAnchor(_))
        ));
        assert!(matches!(
            set_tax(payload, &Tax::Nominal(100)),
            Err(PayloadError::MissingCountryAnchor(_))
        ));
    }
}

#[test]
fn test_negative_inputs() {
    assert_eq!(set_price(STATIC, -1), Err(PayloadError::InvalidAmount(-1)));
    let dynamic = set_price(STATIC, 100).unwrap();
    assert!(matches!(
        set_tax(&dynamic, &Tax::Nominal(-5)),
        Err(PayloadError::InvalidTaxValue(_))
    ));
    assert!(matches!(
        "-5".parse::<Tax>(),
        Err(PayloadError::InvalidTaxValue(_))
    ));
}

#[test]
fn test_fee_before_amount() {
    assert_eq!(
        set_tax(STATIC, &Tax::Nominal(5000)),
        Err(PayloadError::AmountNotSet)
    );
}

#[test]
fn test_metadata_scenario() {
    let meta = extract(STATIC).unwrap();
    assert_eq!(meta.merchant, "MERCHANT NATIONAL");
    assert_eq!(meta.company, "ID.CO.GOPAY.WWW");
    assert_eq!(meta.merchant_pan, "1234567890123450");
}

#[test]
fn test_qris_file_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("static.txt");
    std::fs::write(&source, format!("{}\n", STATIC)).unwrap();

    let codec = QrImageCodec;
    let mut qris = Qris::from_file(&source, &codec).unwrap();
    qris.set_price(50000)
        .unwrap()
        .set_tax("10%".parse().unwrap())
        .unwrap();

    let png = dir.path().join("dynamic.png");
    qris.save(&png, &codec, &RenderOptions::default()).unwrap();

    let reloaded = Qris::from_file(&png, &codec).unwrap();
    assert_eq!(reloaded.payload(), qris.payload());
    assert_eq!(reloaded.price(), Some(50000));
    assert_eq!(reloaded.tax(), Some(&Tax::Percentage("10".to_string())));
}

#[test]
fn test_jpeg_bytes_decode() {
    let qris = Qris::new(set_price(STATIC, 75000).unwrap()).unwrap();
    let options = RenderOptions {
        format: RasterFormat::Jpeg,
        scale: 8,
        ..Default::default()
    };
    let bytes = qris.to_image_bytes(&QrImageCodec, &options).unwrap();
    assert_eq!(QrImageCodec.decode_text(&bytes).unwrap(), qris.payload());
}

#[test]
fn test_unsupported_destination() {
    let dir = tempfile::tempdir().unwrap();
    let qris = Qris::new(STATIC).unwrap();
    let result = qris.save(dir.path().join("out.svg"), &QrImageCodec, &RenderOptions::default());
    assert!(matches!(result, Err(FileError::UnsupportedDestination(_))));
}

#[test]
fn test_unreadable_source() {
    let dir = tempfile::tempdir().unwrap();
    let blank = dir.path().join("blank.png");
    std::fs::write(&blank, b"definitely not a png").unwrap();

    let result = Qris::from_file(&blank, &QrImageCodec);
    assert!(matches!(
        result,
        Err(QrisError::File(FileError::UnreadableSource(_)))
    ));
}

#[test]
fn test_empty_source() {
    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.txt");
    std::fs::write(&empty, "").unwrap();

    assert!(matches!(
        Qris::from_file(&empty, &QrImageCodec),
        Err(QrisError::Payload(PayloadError::EmptyPayload))
    ));
}
