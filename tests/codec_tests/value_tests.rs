//! Value Codec Tests
//!
//! Tests for type tags, scalar encoding and key validation.

use embedkv::codec::{validate_key, validate_key_len, Scalar, Value, ValueType};
use embedkv::KvError;

// =============================================================================
// Type Tag Tests
// =============================================================================

#[test]
fn test_tag_numbering() {
    let expected = [
        (ValueType::I8, 0),
        (ValueType::U8, 1),
        (ValueType::I16, 2),
        (ValueType::U16, 3),
        (ValueType::I32, 4),
        (ValueType::U32, 5),
        (ValueType::I64, 6),
        (ValueType::U64, 7),
        (ValueType::Str, 8),
        (ValueType::Blob, 9),
        (ValueType::Invalid, 10),
    ];

    for (value_type, tag) in expected {
        assert_eq!(value_type.tag(), tag);
        assert_eq!(ValueType::from_tag(tag), Some(value_type));
    }
    assert_eq!(ValueType::from_tag(11), None);
}

#[test]
fn test_type_names_parse_back() {
    for tag in 0..10 {
        let value_type = ValueType::from_tag(tag).unwrap();
        let parsed: ValueType = value_type.to_string().parse().unwrap();
        assert_eq!(parsed, value_type);
    }
    assert_eq!("string".parse::<ValueType>().unwrap(), ValueType::Str);
    assert!("float".parse::<ValueType>().is_err());
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_scalar_encoding_is_native_order() {
    assert_eq!(Value::I32(-42).encode(), (-42i32).to_ne_bytes().to_vec());
    assert_eq!(Value::U16(0xBEEF).encode(), 0xBEEFu16.to_ne_bytes().to_vec());
    assert_eq!(Value::U64(u64::MAX).encode(), vec![0xFF; 8]);
    assert_eq!(Value::I8(-1).encode(), vec![0xFF]);
}

#[test]
fn test_encoded_len_matches_width() {
    assert_eq!(Value::I8(0).encoded_len(), 1);
    assert_eq!(Value::U16(0).encoded_len(), 2);
    assert_eq!(Value::I32(0).encoded_len(), 4);
    assert_eq!(Value::U64(0).encoded_len(), 8);
    assert_eq!(Value::Str("pippo".to_string()).encoded_len(), 5);
    assert_eq!(Value::Blob(vec![0; 5000]).encoded_len(), 5000);
}

#[test]
fn test_decode_every_scalar_type() {
    let values = [
        Value::I8(i8::MIN),
        Value::U8(u8::MAX),
        Value::I16(-12345),
        Value::U16(54321),
        Value::I32(-42),
        Value::U32(4_000_000_000),
        Value::I64(i64::MIN),
        Value::U64(u64::MAX),
    ];

    for value in values {
        let decoded = Value::decode(value.value_type(), &value.encode()).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn test_decode_rejects_short_scalar() {
    let err = Value::decode(ValueType::I32, &[1, 2, 3]).unwrap_err();
    match err {
        KvError::LengthMismatch {
            value_type,
            expected,
            actual,
        } => {
            assert_eq!(value_type, ValueType::I32);
            assert_eq!(expected, 4);
            assert_eq!(actual, 3);
        }
        other => panic!("Expected LengthMismatch, got {:?}", other),
    }
}

#[test]
fn test_decode_rejects_long_scalar() {
    let err = Value::decode(ValueType::U8, &[1, 2]).unwrap_err();
    assert!(matches!(err, KvError::LengthMismatch { expected: 1, actual: 2, .. }));
}

#[test]
fn test_decode_invalid_tag_fails() {
    assert!(matches!(
        Value::decode(ValueType::Invalid, &[]),
        Err(KvError::InvalidValue(_))
    ));
}

#[test]
fn test_decode_string_requires_utf8() {
    assert!(Value::decode(ValueType::Str, &[0xFF, 0xFE]).is_err());
    assert_eq!(
        Value::decode(ValueType::Str, b"pippo").unwrap(),
        Value::Str("pippo".to_string())
    );
}

// =============================================================================
// Text Form Tests
// =============================================================================

#[test]
fn test_from_i128_range_checks() {
    assert_eq!(Value::from_i128(ValueType::U8, 255), Some(Value::U8(255)));
    assert_eq!(Value::from_i128(ValueType::U8, 256), None);
    assert_eq!(Value::from_i128(ValueType::U32, -1), None);
    assert_eq!(Value::from_i128(ValueType::Str, 1), None);
}

#[test]
fn test_parse_scalar_text() {
    assert_eq!(Value::parse(ValueType::I32, "-42").unwrap(), Value::I32(-42));
    assert_eq!(Value::parse(ValueType::U16, " 7 ").unwrap(), Value::U16(7));
    assert!(Value::parse(ValueType::I8, "200").is_err());
    assert!(Value::parse(ValueType::U32, "abc").is_err());
}

#[test]
fn test_display_forms() {
    assert_eq!(Value::I64(-5).to_string(), "-5");
    assert_eq!(Value::Str("hello".to_string()).to_string(), "hello");
    assert_eq!(Value::Blob(vec![0xDE, 0xAD]).to_string(), "dead");
}

// =============================================================================
// Scalar Marshaling Tests
// =============================================================================

#[test]
fn test_untagged_scalars_travel_as_blobs() {
    assert_eq!(1.5f32.into_value(), Value::Blob(1.5f32.to_ne_bytes().to_vec()));
    assert_eq!(2.25f64.into_value().encoded_len(), 8);
    assert_eq!(true.into_value(), Value::Blob(vec![1]));
}

#[test]
fn test_scalar_round_trip_through_value() {
    assert_eq!(i16::from_value((-300i16).into_value()).unwrap(), -300);
    assert_eq!(f64::from_value(3.75f64.into_value()).unwrap(), 3.75);
    assert!(!bool::from_value(false.into_value()).unwrap());
}

// =============================================================================
// Key Validation Tests
// =============================================================================

#[test]
fn test_key_rules() {
    assert!(validate_key("temp").is_ok());
    assert!(validate_key("with space").is_ok());
    assert!(validate_key("").is_err());
    assert!(validate_key("a,b").is_err());
    assert!(validate_key("a\r\nb").is_err());
    assert!(validate_key("caf\u{e9}").is_err());
}

#[test]
fn test_key_length_limit() {
    assert!(validate_key_len("fifteen_chars__", 15).is_ok());
    let err = validate_key_len("sixteen_chars___", 15).unwrap_err();
    assert!(matches!(err, KvError::InvalidKey { .. }));
}
