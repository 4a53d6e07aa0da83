use structclone::{
    decode, decode_with_options, encode, DecodeOptions, StructCloneError, Value,
};

fn hex(s: &str) -> Vec<u8> {
    s.split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16).expect("valid hex byte"))
        .collect()
}

fn options() -> DecodeOptions {
    DecodeOptions::default()
}

#[test]
fn default_options() {
    let opts = DecodeOptions::default();
    assert_eq!(opts.max_depth, 1000);
    assert_eq!(opts.max_size, 0);
    assert_eq!(opts.max_array_len, 10_000_000);
    assert_eq!(opts.max_object_keys, 1_000_000);
}

#[test]
fn max_size_rejects_oversized_input_up_front() {
    let data = hex("ff 0f 30");
    let err = decode_with_options(
        &data,
        DecodeOptions {
            max_size: 2,
            ..options()
        },
    )
    .unwrap_err();
    assert_eq!(err, StructCloneError::MaxSizeExceeded { size: 3, limit: 2 });
}

#[test]
fn max_size_boundary_and_unlimited() {
    let data = hex("ff 0f 30");
    let exact = DecodeOptions {
        max_size: 3,
        ..options()
    };
    assert_eq!(decode_with_options(&data, exact).unwrap(), Value::Null);
    // 0 means unlimited.
    assert_eq!(decode(&data).unwrap(), Value::Null);
}

#[test]
fn max_depth_stops_recursion() {
    // Four nested dense arrays; the fourth descent exceeds the limit.
    let data = hex("ff 0f 41 01 41 01 41 01 30");
    let err = decode_with_options(
        &data,
        DecodeOptions {
            max_depth: 3,
            ..options()
        },
    )
    .unwrap_err();
    assert_eq!(err, StructCloneError::MaxDepthExceeded);
}

#[test]
fn max_depth_boundary_is_inclusive() {
    // [[null]] needs exactly depth 3.
    let data = hex("ff 0f 41 01 41 01 30 24 00 01 24 00 01");
    let opts = DecodeOptions {
        max_depth: 3,
        ..options()
    };
    let value = decode_with_options(&data, opts).unwrap();
    assert_eq!(
        value,
        Value::dense_array(vec![Value::dense_array(vec![Value::Null])])
    );
}

#[test]
fn deeply_nested_but_legal_payload_decodes() {
    let mut value = Value::Null;
    for _ in 0..50 {
        value = Value::dense_array(vec![value]);
    }
    let bytes = encode(&value).unwrap();
    assert_eq!(decode(&bytes).unwrap(), value);
}

#[test]
fn max_array_len_checked_before_allocation() {
    let opts = || DecodeOptions {
        max_array_len: 2,
        ..options()
    };
    // Dense array declaring length 3.
    let err = decode_with_options(&hex("ff 0f 41 03 30 30 30 24 00 03"), opts()).unwrap_err();
    assert!(matches!(err, StructCloneError::MalformedData(_)), "{err:?}");
    // Sparse array declaring length 3.
    let err = decode_with_options(&hex("ff 0f 61 03 40 00 03"), opts()).unwrap_err();
    assert!(matches!(err, StructCloneError::MalformedData(_)), "{err:?}");
    // Length 2 passes.
    let value = decode_with_options(&hex("ff 0f 41 02 30 30 24 00 02"), opts()).unwrap();
    assert_eq!(value, Value::dense_array(vec![Value::Null, Value::Null]));
}

#[test]
fn huge_declared_array_length_fails_without_allocating() {
    // Length 10_000_001 with default options and a 6-byte payload.
    let err = decode(&hex("ff 0f 41 81 ad e2 04 30")).unwrap_err();
    assert!(matches!(err, StructCloneError::MalformedData(_)), "{err:?}");
}

#[test]
fn max_object_keys_bounds_objects_maps_and_sets() {
    let opts = || DecodeOptions {
        max_object_keys: 2,
        ..options()
    };
    // Object with three properties.
    let err = decode_with_options(
        &hex("ff 0f 6f 22 01 61 49 02 22 01 62 49 04 22 01 63 49 06 7b 03"),
        opts(),
    )
    .unwrap_err();
    assert!(matches!(err, StructCloneError::MalformedData(_)), "{err:?}");
    // Map with three entries.
    let err = decode_with_options(
        &hex("ff 0f 3b 49 02 30 49 04 30 49 06 30 3a 06"),
        opts(),
    )
    .unwrap_err();
    assert!(matches!(err, StructCloneError::MalformedData(_)), "{err:?}");
    // Set with three values.
    let err = decode_with_options(&hex("ff 0f 27 49 02 49 04 49 06 2c 03"), opts()).unwrap_err();
    assert!(matches!(err, StructCloneError::MalformedData(_)), "{err:?}");
    // Two entries pass everywhere.
    let value = decode_with_options(&hex("ff 0f 27 49 02 49 04 2c 02"), opts()).unwrap();
    assert_eq!(value, Value::set(vec![Value::Int32(1), Value::Int32(2)]));
}

#[test]
fn varint_overflow_surfaces() {
    // Uint32 payload worth 2^32.
    assert_eq!(
        decode(&hex("ff 0f 55 80 80 80 80 10")).unwrap_err(),
        StructCloneError::VarintOverflow
    );
    // BigInt bitfield with continuation past the 10th byte.
    assert_eq!(
        decode(&hex("ff 0f 5a ff ff ff ff ff ff ff ff ff ff")).unwrap_err(),
        StructCloneError::VarintOverflow
    );
}

#[test]
fn cyclic_graph_fails_to_encode() {
    // Build the cycle through a decode, where it is legal.
    let value = decode(&hex("ff 0f 6f 22 04 73 65 6c 66 5e 00 7b 01")).unwrap();
    assert_eq!(
        encode(&value).unwrap_err(),
        StructCloneError::CyclicNotSupported
    );
}

#[test]
fn mutually_referencing_containers_fail_to_encode() {
    let value = decode(&hex("ff 0f 41 01 5e 00 24 00 01")).unwrap();
    assert_eq!(
        encode(&value).unwrap_err(),
        StructCloneError::CyclicNotSupported
    );
}
