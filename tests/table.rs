use binres::defs::{Chunk, ResTableRef, UnknownChunk};
use binres::res_value::{ResValue, ResValueType};
use binres::stream::ParseErrorKind;
use binres::string_pool::ResStringPoolRef;
use binres::table::{Entry, PackageChunk, ResTableConfig, TableChunk, TypeChunk};
use binres::ResourceFile;

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn utf8_pool_chunk(offsets: &[u32], encoded: &[u8]) -> Vec<u8> {
    let strings_start = 28 + 4 * offsets.len() as u32;
    let mut out = Vec::new();
    push_u16(&mut out, 0x0001);
    push_u16(&mut out, 28);
    push_u32(&mut out, strings_start + encoded.len() as u32);
    push_u32(&mut out, offsets.len() as u32);
    push_u32(&mut out, 0);
    push_u32(&mut out, 0x100);
    push_u32(&mut out, if offsets.is_empty() { 0 } else { strings_start });
    push_u32(&mut out, 0);
    for &offset in offsets {
        push_u32(&mut out, offset);
    }
    out.extend_from_slice(encoded);
    out
}

fn fixed_utf16_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in name.encode_utf16() {
        push_u16(&mut out, unit);
    }
    out.resize(256, 0);
    out
}

/// One package (id 0x7f) with types ["attr", "string"], four keys, a spec
/// and a type chunk for type 2 holding a simple entry, a hole, a complex
/// entry and a string-valued entry.
fn build_arsc() -> Vec<u8> {
    let global_pool = utf8_pool_chunk(&[0], b"\x05\x05hello\x00");
    let type_pool = utf8_pool_chunk(&[0, 7], b"\x04\x04attr\x00\x06\x06string\x00");
    let key_pool = utf8_pool_chunk(
        &[0, 5, 10, 15],
        b"\x02\x02k0\x00\x02\x02k1\x00\x02\x02k2\x00\x02\x02k3\x00",
    );

    let mut spec = Vec::new();
    push_u16(&mut spec, 0x0202);
    push_u16(&mut spec, 16);
    push_u32(&mut spec, 32);
    spec.push(2); // type id
    spec.extend([0, 0, 0]);
    push_u32(&mut spec, 4);
    for mask in [1, 2, 3, 4] {
        push_u32(&mut spec, mask);
    }

    let mut type_chunk = Vec::new();
    push_u16(&mut type_chunk, 0x0201);
    push_u16(&mut type_chunk, 48); // 20 byte fixed part + 28 byte config
    push_u32(&mut type_chunk, 136);
    type_chunk.push(2); // type id
    type_chunk.extend([0, 0, 0]);
    push_u32(&mut type_chunk, 4); // entry count
    push_u32(&mut type_chunk, 64); // entries start
    push_u32(&mut type_chunk, 28); // config size
    type_chunk.extend([0u8; 24]);
    // offsets: simple, hole, complex, simple
    push_u32(&mut type_chunk, 0);
    push_u32(&mut type_chunk, 0xFFFFFFFF);
    push_u32(&mut type_chunk, 16);
    push_u32(&mut type_chunk, 56);
    // entry 0: k0 = (dec) 42
    push_u16(&mut type_chunk, 8);
    push_u16(&mut type_chunk, 0);
    push_u32(&mut type_chunk, 0);
    type_chunk.extend(b"\x08\x00\x00\x10\x2a\x00\x00\x00");
    // entry 2: complex under k2 with two mappings
    push_u16(&mut type_chunk, 16);
    push_u16(&mut type_chunk, 1);
    push_u32(&mut type_chunk, 2);
    push_u32(&mut type_chunk, 0); // no parent
    push_u32(&mut type_chunk, 2);
    push_u32(&mut type_chunk, 0x01010001);
    type_chunk.extend(b"\x08\x00\x00\x11\xff\x00\x00\x00");
    push_u32(&mut type_chunk, 0x01010002);
    type_chunk.extend(b"\x08\x00\x00\x12\x01\x00\x00\x00");
    // entry 3: k3 = string "hello" (global pool index 0)
    push_u16(&mut type_chunk, 8);
    push_u16(&mut type_chunk, 0);
    push_u32(&mut type_chunk, 3);
    type_chunk.extend(b"\x08\x00\x00\x03\x00\x00\x00\x00");
    assert_eq!(type_chunk.len(), 136);

    let children_len =
        (type_pool.len() + key_pool.len() + spec.len() + type_chunk.len()) as u32;
    let mut package = Vec::new();
    push_u16(&mut package, 0x0200);
    push_u16(&mut package, 288);
    push_u32(&mut package, 288 + children_len);
    push_u32(&mut package, 0x7f);
    package.extend(fixed_utf16_name("com.example"));
    push_u32(&mut package, 288); // typeStrings
    push_u32(&mut package, 2); // lastPublicType
    push_u32(&mut package, 288 + type_pool.len() as u32); // keyStrings
    push_u32(&mut package, 4); // lastPublicKey
    push_u32(&mut package, 0); // typeIdOffset
    package.extend(&type_pool);
    package.extend(&key_pool);
    package.extend(&spec);
    package.extend(&type_chunk);

    let mut table = Vec::new();
    push_u16(&mut table, 0x0002);
    push_u16(&mut table, 12);
    push_u32(&mut table, 12 + global_pool.len() as u32 + package.len() as u32);
    push_u32(&mut table, 1); // package count
    table.extend(&global_pool);
    table.extend(&package);
    assert_eq!(table.len(), 624);
    table
}

fn table_of(file: &ResourceFile) -> &TableChunk {
    match &file.chunks()[0] {
        Chunk::Table(table) => table,
        other => panic!("expected a table chunk, got {other:?}"),
    }
}

fn package_of(table: &TableChunk) -> &PackageChunk {
    table.packages().next().unwrap()
}

fn type_chunk_of(package: &PackageChunk) -> &TypeChunk {
    package
        .children()
        .iter()
        .find_map(|c| c.as_type())
        .unwrap()
}

fn with_type_chunk_mut(file: &mut ResourceFile, f: impl FnOnce(&mut TypeChunk)) {
    let Chunk::Table(table) = &mut file.chunks_mut()[0] else {
        panic!("expected a table chunk");
    };
    let package = table
        .children_mut()
        .iter_mut()
        .find_map(|c| c.as_package_mut())
        .unwrap();
    let type_chunk = package
        .children_mut()
        .iter_mut()
        .find_map(|c| c.as_type_mut())
        .unwrap();
    f(type_chunk);
}

#[test]
fn test_arsc_round_trip() {
    let data = build_arsc();
    let file = ResourceFile::parse(&data).unwrap();
    assert_eq!(file.to_bytes(), data);
}

#[test]
fn test_table_structure() {
    let data = build_arsc();
    let file = ResourceFile::parse(&data).unwrap();
    let table = table_of(&file);

    assert_eq!(table.string_pool().unwrap().get(0).unwrap(), "hello");
    assert_eq!(table.packages().count(), 1);

    let package = package_of(table);
    assert_eq!(package.id(), 0x7f);
    assert_eq!(package.name(), "com.example");
    assert_eq!(package.type_string_pool().unwrap().get(1).unwrap(), "string");
    assert_eq!(package.key_string_pool().unwrap().get(3).unwrap(), "k3");
}

#[test]
fn test_entry_access() {
    let data = build_arsc();
    let file = ResourceFile::parse(&data).unwrap();
    let type_chunk = type_chunk_of(package_of(table_of(&file)));

    assert_eq!(type_chunk.id(), 2);
    assert_eq!(type_chunk.total_entry_count(), 4);

    assert_eq!(
        type_chunk.get(0),
        Some(Entry::simple(0, ResValue::new(ResValueType::IntDec(42))))
    );
    assert_eq!(type_chunk.get(1), None);
    assert_eq!(
        type_chunk.get(2),
        Some(Entry::complex(
            2,
            ResTableRef::from(0),
            vec![
                (
                    ResTableRef::from(0x01010001),
                    ResValue::new(ResValueType::IntHex(0xff)),
                ),
                (
                    ResTableRef::from(0x01010002),
                    ResValue::new(ResValueType::IntBoolean(1)),
                ),
            ],
        ))
    );
    assert_eq!(
        type_chunk.get(3),
        Some(Entry::simple(
            3,
            ResValue::new(ResValueType::String(ResStringPoolRef { index: 0 })),
        ))
    );
    assert_eq!(type_chunk.get(4), None);
}

#[test]
fn test_type_names() {
    let data = build_arsc();
    let file = ResourceFile::parse(&data).unwrap();
    let package = package_of(table_of(&file));

    let type_chunk = type_chunk_of(package);
    assert_eq!(type_chunk.type_name(package).unwrap(), "string");

    let spec = package
        .children()
        .iter()
        .find_map(|c| match c {
            Chunk::TableTypeSpec(spec) => Some(spec),
            _ => None,
        })
        .unwrap();
    assert_eq!(spec.id(), 2);
    assert_eq!(spec.type_name(package).unwrap(), "string");
    assert_eq!(spec.resource_count(), 4);
    assert_eq!(spec.resource_flags(2), Some(3));
    assert_eq!(spec.resource_flags(4), None);
}

#[test]
fn test_contains_resource() {
    let data = build_arsc();
    let file = ResourceFile::parse(&data).unwrap();
    let package = package_of(table_of(&file));
    let type_chunk = type_chunk_of(package);

    assert!(type_chunk.contains_resource(package, ResTableRef::new(0x7f, 2, 0)));
    assert!(type_chunk.contains_resource(package, ResTableRef::new(0x7f, 2, 3)));
    // a hole is not contained
    assert!(!type_chunk.contains_resource(package, ResTableRef::new(0x7f, 2, 1)));
    // wrong package, type, or out-of-range entry
    assert!(!type_chunk.contains_resource(package, ResTableRef::new(0x01, 2, 0)));
    assert!(!type_chunk.contains_resource(package, ResTableRef::new(0x7f, 3, 0)));
    assert!(!type_chunk.contains_resource(package, ResTableRef::new(0x7f, 2, 9)));
}

#[test]
fn test_override_entry_to_removal() {
    let data = build_arsc();
    let mut file = ResourceFile::parse(&data).unwrap();

    with_type_chunk_mut(&mut file, |type_chunk| {
        assert!(type_chunk.get(3).is_some());
        type_chunk.override_entry(3, None);
        assert_eq!(type_chunk.get(3), None);
        // out-of-range overrides are a no-op
        type_chunk.override_entry(99, Some(Entry::simple(0, ResValue::new(ResValueType::Null(0)))));
        assert_eq!(type_chunk.total_entry_count(), 4);
    });

    let reparsed = ResourceFile::parse(&file.to_bytes()).unwrap();
    let package = package_of(table_of(&reparsed));
    let type_chunk = type_chunk_of(package);
    assert_eq!(type_chunk.get(3), None);
    assert!(!type_chunk.contains_resource(package, ResTableRef::new(0x7f, 2, 3)));
    assert_eq!(type_chunk.total_entry_count(), 4);
}

#[test]
fn test_override_entry_replace() {
    let data = build_arsc();
    let mut file = ResourceFile::parse(&data).unwrap();

    let replacement = Entry::simple(1, ResValue::new(ResValueType::IntDec(7)));
    with_type_chunk_mut(&mut file, |type_chunk| {
        type_chunk.override_entry(0, Some(replacement.clone()));
    });

    let reparsed = ResourceFile::parse(&file.to_bytes()).unwrap();
    let type_chunk = type_chunk_of(package_of(table_of(&reparsed)));
    assert_eq!(type_chunk.get(0), Some(replacement));
    // untouched entries are carried over byte for byte
    assert_eq!(
        type_chunk.get(3),
        Some(Entry::simple(
            3,
            ResValue::new(ResValueType::String(ResStringPoolRef { index: 0 })),
        ))
    );
}

#[test]
fn test_add_entry() {
    let data = build_arsc();
    let mut file = ResourceFile::parse(&data).unwrap();

    let added = Entry::simple(2, ResValue::new(ResValueType::IntHex(0xcafe)));
    with_type_chunk_mut(&mut file, |type_chunk| {
        assert_eq!(type_chunk.add_entry(Some(added.clone())), 4);
        assert_eq!(type_chunk.total_entry_count(), 5);
        assert_eq!(type_chunk.get(4), Some(added.clone()));
        assert_eq!(type_chunk.add_entry(None), 5);
    });

    let reparsed = ResourceFile::parse(&file.to_bytes()).unwrap();
    let type_chunk = type_chunk_of(package_of(table_of(&reparsed)));
    assert_eq!(type_chunk.total_entry_count(), 6);
    assert_eq!(type_chunk.get(4), Some(added));
    assert_eq!(type_chunk.get(5), None);
}

#[test]
fn test_add_string_to_global_pool() {
    let data = build_arsc();
    let mut file = ResourceFile::parse(&data).unwrap();

    let Chunk::Table(table) = &mut file.chunks_mut()[0] else {
        panic!("expected a table chunk");
    };
    let index = table.string_pool_mut().unwrap().add("abcdef", false);
    assert_eq!(index, 1);

    let reparsed = ResourceFile::parse(&file.to_bytes()).unwrap();
    let pool = table_of(&reparsed).string_pool().unwrap();
    assert_eq!(pool.get(index).unwrap(), "abcdef");
    assert_eq!(pool.get(0).unwrap(), "hello");
}

#[test]
fn test_config_is_preserved_opaquely() {
    let data = build_arsc();
    let mut file = ResourceFile::parse(&data).unwrap();

    {
        let type_chunk = type_chunk_of(package_of(table_of(&file)));
        assert_eq!(type_chunk.config().size(), 28);
        assert_eq!(type_chunk.config().bytes()[..4], 28u32.to_le_bytes());
    }

    // replacing the configuration with another blob of the same size keeps
    // the header layout intact
    let mut blob = 28u32.to_le_bytes().to_vec();
    blob.resize(28, 0);
    blob[4] = 0x42;
    with_type_chunk_mut(&mut file, |type_chunk| {
        type_chunk.set_config(ResTableConfig::new(blob.clone()));
    });

    let reparsed = ResourceFile::parse(&file.to_bytes()).unwrap();
    let type_chunk = type_chunk_of(package_of(table_of(&reparsed)));
    assert_eq!(type_chunk.config().bytes(), blob);
}

/// A table whose payload carries a chunk type the engine does not interpret
/// (TABLE_OVERLAYABLE, 0x0204).
fn build_table_with_unknown() -> Vec<u8> {
    let pool = utf8_pool_chunk(&[], b"");

    let mut unknown = Vec::new();
    push_u16(&mut unknown, 0x0204);
    push_u16(&mut unknown, 16);
    push_u32(&mut unknown, 24);
    unknown.extend([1, 2, 3, 4, 5, 6, 7, 8]); // header tail
    unknown.extend([0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18]); // payload

    let mut table = Vec::new();
    push_u16(&mut table, 0x0002);
    push_u16(&mut table, 12);
    push_u32(&mut table, 12 + pool.len() as u32 + unknown.len() as u32);
    push_u32(&mut table, 0);
    table.extend(&pool);
    table.extend(&unknown);
    table
}

#[test]
fn test_nested_unknown_chunk_preserved() {
    let data = build_table_with_unknown();
    let file = ResourceFile::parse(&data).unwrap();

    let table = table_of(&file);
    let unknown = match &table.children()[1] {
        Chunk::Unknown(unknown) => unknown,
        other => panic!("expected an unknown chunk, got {other:?}"),
    };
    assert_eq!(unknown.type_code(), 0x0204);

    assert_eq!(file.to_bytes(), data);
}

#[test]
fn test_insert_unknown_chunk() {
    let data = build_arsc();
    let mut file = ResourceFile::parse(&data).unwrap();

    let Chunk::Table(table) = &mut file.chunks_mut()[0] else {
        panic!("expected a table chunk");
    };
    table.insert(
        2,
        Chunk::Unknown(UnknownChunk::new(0x0204, Vec::new(), vec![1, 2, 3, 4])),
    );

    let reparsed = ResourceFile::parse(&file.to_bytes()).unwrap();
    let table = table_of(&reparsed);
    assert_eq!(table.children().len(), 3);
    assert_eq!(table.packages().count(), 1);
    assert!(matches!(table.children()[2], Chunk::Unknown(_)));
}

fn build_library_chunk() -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, 0x0203);
    push_u16(&mut out, 12);
    push_u32(&mut out, 12 + 260);
    push_u32(&mut out, 1);
    push_u32(&mut out, 2); // package id
    for unit in "lib.pkg".encode_utf16() {
        push_u16(&mut out, unit);
    }
    out.resize(12 + 260, 0);
    out
}

#[test]
fn test_library_chunk_round_trip() {
    let data = build_library_chunk();
    let file = ResourceFile::parse(&data).unwrap();

    let Chunk::TableLibrary(library) = &file.chunks()[0] else {
        panic!("expected a library chunk");
    };
    assert_eq!(library.entries().len(), 1);
    assert_eq!(library.entries()[0].package_id, 2);
    assert_eq!(library.entries()[0].package_name, "lib.pkg");

    assert_eq!(file.to_bytes(), data);
}

#[test]
fn test_truncated_input() {
    let data = build_arsc();
    let err = ResourceFile::parse(&data[..6]).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Truncated { .. }));
}

#[test]
fn test_chunk_extending_past_buffer() {
    let data = build_arsc();
    let err = ResourceFile::parse(&data[..100]).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::BadChunkSize { .. }));
}

#[test]
fn test_chunk_smaller_than_header() {
    let mut data = Vec::new();
    push_u16(&mut data, 0x0002);
    push_u16(&mut data, 12);
    push_u32(&mut data, 8); // smaller than the declared header
    push_u32(&mut data, 0);
    let err = ResourceFile::parse(&data).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::BadChunkSize { .. }));
}

#[test]
fn test_bad_header_size() {
    let mut data = Vec::new();
    push_u16(&mut data, 0x0002);
    push_u16(&mut data, 4); // below the 8 framing bytes
    push_u32(&mut data, 12);
    push_u32(&mut data, 0);
    let err = ResourceFile::parse(&data).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::BadHeaderSize { .. }));
}

#[test]
fn test_unknown_top_level_type_code() {
    let mut data = Vec::new();
    push_u16(&mut data, 0x0299);
    push_u16(&mut data, 8);
    push_u32(&mut data, 12);
    push_u32(&mut data, 0);
    let err = ResourceFile::parse(&data).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnknownTypeCode(0x0299));
}
