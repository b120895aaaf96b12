use time::macros::datetime;
use uuid::Uuid;

use super::*;

#[test]
fn etype_discriminants_are_pinned() {
    // these values are part of the wire format and must never change
    const PINNED: &[(EType, u32)] = &[
        (EType::String, 0),
        (EType::Octets, 1),
        (EType::Int, 2),
        (EType::Long, 3),
        (EType::UnsignedLong, 4),
        (EType::Double, 5),
        (EType::Boolean, 6),
        (EType::None, 7),
        (EType::Int64, 8),
        (EType::Int16, 9),
        (EType::DateTime, 10),
        (EType::Guid, 11),
    ];

    for &(etype, value) in PINNED {
        assert_eq!(u32::from(etype), value, "tag of {etype:?} changed");
        assert_eq!(
            EType::try_from(value).expect("pinned tag must decode"),
            etype,
            "tag {value} maps to the wrong type"
        );
    }

    EType::try_from(12u32).expect_err("12 is not assigned yet");
}

#[test]
fn ensure_compat() {
    let mut buf = ByteBuffer::new();
    buf.write_u16(0x0102);
    buf.write_i32(-2);
    buf.write_string("abc").expect("short string");
    buf.write_bool(true);
    buf.write_tagged(&TaggedValue::Int32(3)).expect("int is supported");

    #[rustfmt::skip]
    const EXPECTED: &[u8] = &[
        0x02, 0x01,                   // u16 LE
        0xFE, 0xFF, 0xFF, 0xFF,       // i32 -2
        0x03, 0x00, 0x00, 0x00,       // string length
        b'a', b'b', b'c',
        0x01,                         // bool
        0x03, 0x00, 0x00, 0x00,       // EType::Long
        0x03, 0x00, 0x00, 0x00,       // payload
    ];

    assert_eq!(
        buf.as_bytes(),
        EXPECTED,
        "this test breaking implies the byte layout changed unexpectedly"
    );
    assert_eq!(buf.to_hex(), "0201FEFFFFFF03000000616263010300000003000000");
}

#[test]
fn primitives_read_back() {
    let guid = Uuid::from_u128(0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF);
    let when = datetime!(2019-11-05 16:30:00 UTC);

    let mut buf = ByteBuffer::new();
    buf.write_u16(u16::MAX);
    buf.write_i16(i16::MIN);
    buf.write_i32(-123_456);
    buf.write_u32(4_000_000_000);
    buf.write_i64(i64::MIN + 1);
    buf.write_f64(-0.5);
    buf.write_bool(false);
    buf.write_string("").expect("empty string");
    buf.write_datetime(when).expect("in range");
    buf.write_ctime(Some(when));
    buf.write_ctime(None);
    buf.write_guid(guid);

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    assert_eq!(buf.read_u16().expect("u16"), u16::MAX);
    assert_eq!(buf.read_i16().expect("i16"), i16::MIN);
    assert_eq!(buf.read_i32().expect("i32"), -123_456);
    assert_eq!(buf.read_u32().expect("u32"), 4_000_000_000);
    assert_eq!(buf.read_i64().expect("i64"), i64::MIN + 1);
    assert_eq!(buf.read_f64().expect("f64").to_bits(), (-0.5f64).to_bits());
    assert!(!buf.read_bool().expect("bool"), "false must stay false");
    assert_eq!(buf.read_string().expect("string"), "");
    assert_eq!(buf.read_datetime().expect("datetime"), when);
    assert_eq!(buf.read_ctime().expect("ctime"), Some(when));
    assert_eq!(buf.read_ctime().expect("ctime"), None);
    assert_eq!(buf.read_guid().expect("guid"), guid);
    assert!(buf.is_eof(), "everything must be consumed");
}

#[test]
fn guid_uses_mixed_endian_layout() {
    let guid = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").expect("valid guid");
    let mut buf = ByteBuffer::new();
    buf.write_guid(guid);

    assert_eq!(buf.to_hex(), "33221100554477668899AABBCCDDEEFF");
}

#[test]
fn read_past_end_fails() {
    let mut buf = ByteBuffer::from_bytes(vec![1, 2, 3]);
    buf.read_u8().expect("one byte is there");

    let err = buf.read_bytes(3).expect_err("only 2 bytes remain");
    match err {
        Error::OutOfBounds {
            position,
            requested,
            length,
        } => {
            assert_eq!((position, requested, length), (1, 3, 3), "wrong bounds info");
        },
        _ => panic!("incorrect error kind: {err:?}"),
    }

    // a failed read must not advance
    assert_eq!(buf.read_position(), 1);
    assert_eq!(buf.read_bytes(2).expect("exactly 2 remain"), &[2, 3]);
    assert!(buf.is_eof(), "all bytes read");
    buf.read_u8().expect_err("nothing left");
}

#[test]
fn string_length_past_end_fails() {
    let mut buf = ByteBuffer::new();
    buf.write_u32(10);
    buf.write_bytes(b"short");

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    let err = buf.read_string().expect_err("length prefix exceeds data");
    assert!(matches!(err, Error::OutOfBounds { requested: 10, .. }), "{err:?}");
}

#[test]
fn read_position_range() {
    let mut buf = ByteBuffer::from_bytes(vec![10, 20, 30]);
    buf.set_read_position(2).expect("in range");
    assert_eq!(buf.read_u8().expect("last byte"), 30);

    buf.set_read_position(0).expect("start is in range");
    assert_eq!(buf.remaining(), 3);

    let err = buf.set_read_position(3).expect_err("length is out of range");
    assert!(
        matches!(err, Error::ReadPosition { position: 3, length: 3 }),
        "{err:?}"
    );
}

#[test]
fn bool_nonzero_is_true() {
    let mut buf = ByteBuffer::from_bytes(vec![0, 1, 2, 0xFF]);
    assert!(!buf.read_bool().expect("0"), "0 is false");
    assert!(buf.read_bool().expect("1"), "1 is true");
    assert!(buf.read_bool().expect("2"), "2 is true");
    assert!(buf.read_bool().expect("255"), "255 is true");
}

#[test]
fn non_ascii_written_as_question_mark() {
    let mut buf = ByteBuffer::new();
    buf.write_string("caf\u{e9} \u{1F600}").expect("short string");

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    assert_eq!(buf.read_string().expect("ascii only"), "caf? ?");
}

#[test]
fn non_ascii_read_fails() {
    let mut buf = ByteBuffer::new();
    buf.write_u32(2);
    buf.write_bytes(&[b'o', 0xC3]);

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    let err = buf.read_string().expect_err("0xC3 is not ascii");
    assert!(matches!(err, Error::InvalidAscii { position: 5 }), "{err:?}");
}

#[test]
fn get_bytes_pads() {
    let mut buf = ByteBuffer::new();
    buf.write_bytes(&[1, 2, 3]);

    assert_eq!(buf.get_bytes(1), vec![1, 2, 3]);
    assert_eq!(buf.get_bytes(0), vec![1, 2, 3]);
    assert_eq!(buf.get_bytes(8), vec![1, 2, 3, 0, 0, 0, 0, 0]);
    assert_eq!(buf.get_bytes(3), vec![1, 2, 3]);
    assert_eq!(ByteBuffer::new().get_bytes(8), Vec::<u8>::new());

    // padding does not touch the buffer itself
    assert_eq!(buf.len(), 3);
}

#[test]
fn nested_buffers() {
    let mut inner = ByteBuffer::new();
    inner.write_string("inner").expect("short string");
    inner.write_i32(7);

    let mut outer = ByteBuffer::new();
    outer.write_bool(true);
    outer.write_nested(&inner).expect("small nested buffer");
    outer.write_i32(8);

    let mut outer = ByteBuffer::from_bytes(outer.into_bytes());
    assert!(outer.read_bool().expect("flag"), "flag was true");

    let mut nested = outer.read_nested().expect("nested present");
    assert_eq!(nested.read_position(), 0);
    assert_eq!(nested.read_string().expect("string"), "inner");
    assert_eq!(nested.read_i32().expect("i32"), 7);
    assert!(nested.is_eof(), "nested fully consumed");

    assert_eq!(outer.read_i32().expect("trailing value"), 8);
    assert!(outer.is_eof(), "outer fully consumed");
}

#[test]
fn nested_read_in_place() {
    let mut inner = ByteBuffer::new();
    inner.write_string("inner").expect("short string");
    inner.write_i32(7);
    inner.write_u8(0xFF);

    let mut outer = ByteBuffer::new();
    outer.write_nested(&inner).expect("small nested buffer");
    outer.write_i32(8);

    let mut outer = ByteBuffer::from_bytes(outer.into_bytes());
    let (text, value) = outer
        .read_nested_with(|nested| -> Result<_> {
            let text = nested.read_string()?;
            let value = nested.read_i32()?;
            assert_eq!(nested.remaining(), 1, "only the nested data is visible");

            let err = nested.read_i32().expect_err("nested data ends first");
            assert!(matches!(err, Error::OutOfBounds { length: 18, .. }), "{err:?}");
            Ok((text, value))
        })
        .expect("nested data is valid");

    assert_eq!((text.as_str(), value), ("inner", 7));

    // the unread trailing byte of the nested data is skipped
    assert_eq!(outer.read_i32().expect("trailing value"), 8);
    assert!(outer.is_eof(), "outer fully consumed");
}

#[test]
fn nested_read_in_place_failure_rewinds() {
    let mut outer = ByteBuffer::new();
    outer.write_u32(4);
    outer.write_u16(1);
    outer.write_u16(2);

    let mut outer = ByteBuffer::from_bytes(outer.into_bytes());
    outer
        .read_nested_with(|nested| nested.read_i64())
        .expect_err("nested data is too short");
    assert_eq!(outer.read_position(), 0, "failed read must not advance");

    let mut short = ByteBuffer::new();
    short.write_u32(100);
    short.write_u8(1);

    let mut short = ByteBuffer::from_bytes(short.into_bytes());
    let err = short
        .read_nested_with(|nested| nested.read_u8())
        .expect_err("length prefix exceeds data");
    assert!(matches!(err, Error::OutOfBounds { requested: 100, .. }), "{err:?}");
    assert_eq!(short.read_position(), 0, "failed read must not advance");
}

#[test]
fn failed_prefixed_reads_rewind() {
    let mut buf = ByteBuffer::new();
    buf.write_u32(2);
    buf.write_bytes(&[b'o', 0xC3]);
    buf.write_u32(50);
    buf.write_u32(EType::Int64.into());
    buf.write_u8(0);

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    let err = buf.read_string().expect_err("string is not ascii");
    assert!(matches!(err, Error::InvalidAscii { position: 5 }), "{err:?}");
    assert_eq!(buf.read_position(), 0, "failed string read must not advance");

    buf.set_read_position(6).expect("in range");
    buf.read_nested().expect_err("nested length exceeds data");
    assert_eq!(buf.read_position(), 6, "failed nested read must not advance");

    buf.set_read_position(10).expect("in range");
    buf.read_tagged().expect_err("tagged payload is cut short");
    assert_eq!(buf.read_position(), 10, "failed tagged read must not advance");

    let mut buf = ByteBuffer::from_bytes(i64::MAX.to_le_bytes());
    buf.read_datetime().expect_err("binary date time is out of range");
    assert_eq!(buf.read_position(), 0, "failed date time read must not advance");
}

#[test]
fn hex_round_trip() {
    let mut buf = ByteBuffer::new();
    buf.write_u32(0xDEAD_BEEF);
    let hex = buf.to_hex();
    assert_eq!(hex, "EFBEADDE");

    let mut back = ByteBuffer::from_hex(&hex.to_lowercase()).expect("valid hex");
    assert_eq!(back.read_u32().expect("u32"), 0xDEAD_BEEF);

    let err = ByteBuffer::from_hex("ABC").expect_err("odd length");
    assert!(matches!(err, Error::Hex(hex::FromHexError::OddLength)), "{err:?}");

    let err = ByteBuffer::from_hex("0G").expect_err("G is not a hex digit");
    assert!(
        matches!(err, Error::Hex(hex::FromHexError::InvalidHexCharacter { c: 'G', index: 1 })),
        "{err:?}"
    );
}

#[test]
fn tagged_values_read_back() {
    let values = [
        TaggedValue::from("text"),
        TaggedValue::from(true),
        TaggedValue::from(-7i16),
        TaggedValue::from(3i32),
        TaggedValue::from(1i64 << 40),
        TaggedValue::from(u32::MAX),
        TaggedValue::from(2.25f64),
        TaggedValue::from(datetime!(2000-01-01 0:00 UTC)),
        TaggedValue::from(Uuid::from_u128(42)),
    ];

    let mut buf = ByteBuffer::new();
    for value in &values {
        buf.write_tagged(value).expect("supported value");
    }

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    for value in &values {
        assert_eq!(&buf.read_tagged().expect("must decode"), value);
    }

    assert!(buf.is_eof(), "all values consumed");
}

#[test]
fn tagged_int_alias_reads_as_int32() {
    let mut buf = ByteBuffer::new();
    buf.write_u32(EType::Int.into());
    buf.write_i32(-99);

    let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
    assert_eq!(buf.read_tagged().expect("legacy tag"), TaggedValue::Int32(-99));
}

#[test]
fn tagged_unknown_tag_fails() {
    for tag in [EType::Octets.into(), EType::None.into(), 12u32, u32::MAX] {
        let mut buf = ByteBuffer::new();
        buf.write_u32(tag);
        buf.write_u32(0);

        let mut buf = ByteBuffer::from_bytes(buf.into_bytes());
        let err = buf.read_tagged().expect_err("tag cannot be decoded");
        assert!(matches!(err, Error::UnknownType(t) if t == tag), "{err:?}");
    }
}

#[test]
fn tagged_from_any() {
    assert_eq!(
        TaggedValue::from_any(&5i32).expect("i32 supported"),
        TaggedValue::Int32(5)
    );
    assert_eq!(
        TaggedValue::from_any(&"x").expect("str supported"),
        TaggedValue::String("x".to_owned())
    );
    assert_eq!(
        TaggedValue::from_any(&7u32).expect("u32 supported").etype(),
        EType::UnsignedLong
    );

    let err = TaggedValue::from_any(&7u8).expect_err("u8 is not supported");
    assert!(matches!(err, Error::UnsupportedType("u8")), "{err:?}");

    TaggedValue::from_any(&vec![1u8]).expect_err("vectors are not supported");
}

#[test]
fn tagged_display() {
    assert_eq!(TaggedValue::from(3i32).to_string(), "3");
    assert_eq!(TaggedValue::from("plain").to_string(), "plain");
    assert_eq!(TaggedValue::from(false).to_string(), "false");
    assert_eq!(
        TaggedValue::from(datetime!(2020-05-17 10:00:00 UTC)).to_string(),
        "2020-05-17T10:00:00Z"
    );
}
