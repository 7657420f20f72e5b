use binres::defs::ResTableRef;
use binres::res_value::{ResValue, ResValueType};
use binres::stream::{ByteReader, ByteWriter, ParseErrorKind};
use binres::string_pool::ResStringPoolRef;

#[test]
fn test_read_res_value() {
    let mut reader = ByteReader::new(b"\x08\x00\x00\x10\x2a\x00\x00\x00");
    let value = ResValue::parse(&mut reader).unwrap();

    assert_eq!(value.data, ResValueType::IntDec(42));
    assert_eq!(value.data.code(), 0x10);
    assert_eq!(value.data.raw_data(), 42);
}

#[test]
fn test_write_res_value() {
    let mut writer = ByteWriter::new();
    ResValue::new(ResValueType::String(ResStringPoolRef { index: 5 })).write(&mut writer);

    assert_eq!(writer.into_bytes(), b"\x08\x00\x00\x03\x05\x00\x00\x00");
}

#[test]
fn test_res_value_round_trip() {
    let values = [
        ResValueType::Null(1),
        ResValueType::Reference(ResTableRef::new(0x7f, 2, 10)),
        ResValueType::Float(1.5),
        ResValueType::IntBoolean(0xffffffff),
        ResValueType::IntColorArgb8(0xff00ff00),
    ];

    for data in values {
        let mut writer = ByteWriter::new();
        ResValue::new(data).write(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[0], 8);
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes[2], 0); // res0

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(ResValue::parse(&mut reader).unwrap().data, data);
    }
}

#[test]
fn test_float_bits_survive() {
    let mut writer = ByteWriter::new();
    ResValue::new(ResValueType::Float(6.25)).write(&mut writer);
    let bytes = writer.into_bytes();
    assert_eq!(bytes[4..], 6.25f32.to_bits().to_le_bytes());
}

#[test]
fn test_bad_value_size() {
    let mut reader = ByteReader::new(b"\x06\x00\x00\x10\x2a\x00\x00\x00");
    let err = ResValue::parse(&mut reader).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::BadValueSize(6));
}

#[test]
fn test_unknown_value_type() {
    let mut reader = ByteReader::new(b"\x08\x00\x00\x55\x2a\x00\x00\x00");
    let err = ResValue::parse(&mut reader).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnknownValueType(0x55));
}

#[test]
fn test_truncated_value() {
    let mut reader = ByteReader::new(b"\x08\x00\x00\x10");
    let err = ResValue::parse(&mut reader).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Truncated { .. }));
}

#[test]
fn test_res_table_ref_from_packed() {
    let reference = ResTableRef::from(0x01234567);
    assert_eq!(reference.package_index, 0x01);
    assert_eq!(reference.type_index, 0x23);
    assert_eq!(reference.entry_index, 0x4567);
    assert_eq!(u32::from(reference), 0x01234567);

    let reference = ResTableRef::from(0xFEDCBA98);
    assert_eq!(reference.package_index, 0xFE);
    assert_eq!(reference.type_index, 0xDC);
    assert_eq!(reference.entry_index, 0xBA98);
    assert_eq!(u32::from(reference), 0xFEDCBA98);
}

#[test]
fn test_res_table_ref_new_matches_packed() {
    assert_eq!(
        ResTableRef::new(0x01, 0x23, 0x4567),
        ResTableRef::from(0x01234567)
    );
    assert_eq!(format!("{}", ResTableRef::from(0x01234567)), "@01234567");
}
