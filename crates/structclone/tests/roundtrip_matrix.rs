use num_bigint::BigInt;
use structclone::{
    decode, encode, shared, BoxedKind, ErrorKind, JsArrayBuffer, JsArrayBufferView, JsBoxed,
    JsError, JsRegExp, JsString, RegExpFlags, Value, ViewKind,
};

fn hex(s: &str) -> Vec<u8> {
    s.split_whitespace()
        .map(|byte| u8::from_str_radix(byte, 16).expect("valid hex byte"))
        .collect()
}

fn round_trip(value: &Value) -> Value {
    let bytes = encode(value).unwrap_or_else(|e| panic!("encode failed for {value:?}: {e}"));
    decode(&bytes).unwrap_or_else(|e| panic!("decode failed for {value:?}: {e}"))
}

#[test]
fn scalar_round_trips() {
    let values = vec![
        Value::Null,
        Value::Undefined,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int32(0),
        Value::Int32(42),
        Value::Int32(-12345),
        Value::Int32(i32::MAX),
        Value::Int32(i32::MIN),
        Value::Uint32(0),
        Value::Uint32(u32::MAX),
        Value::Double(std::f64::consts::PI),
        Value::Double(f64::INFINITY),
        Value::Double(f64::NEG_INFINITY),
        Value::from(""),
        Value::from("hello"),
        Value::from("café"),
        Value::from("你好🌍"),
        Value::BigInt(BigInt::from(0)),
        Value::BigInt(BigInt::from(42)),
        Value::BigInt(BigInt::from(-42)),
        Value::BigInt(BigInt::from(u64::MAX) * BigInt::from(u64::MAX)),
        Value::Date(0.0),
        Value::Date(1704067200000.0),
        Value::Hole,
    ];
    for value in values {
        assert_eq!(round_trip(&value), value, "round trip failed for {value:?}");
    }
}

#[test]
fn double_bit_patterns_survive() {
    for bits in [
        (-0.0f64).to_bits(),
        f64::NAN.to_bits(),
        (-f64::NAN).to_bits(),
        0x7ff8_0000_0000_cafe, // NaN payload
    ] {
        let Value::Double(out) = round_trip(&Value::Double(f64::from_bits(bits))) else {
            panic!("expected double");
        };
        assert_eq!(out.to_bits(), bits, "bits {bits:#018x}");
    }
}

#[test]
fn date_nan_survives() {
    let Value::Date(ms) = round_trip(&Value::Date(f64::NAN)) else {
        panic!("expected date");
    };
    assert!(ms.is_nan());
}

#[test]
fn unpaired_surrogates_survive() {
    let value = Value::Str(JsString::from_units(vec![0xd800, 0x0061, 0xdfff]));
    assert_eq!(round_trip(&value), value);
}

#[test]
fn exact_scalar_encodings() {
    let cases = vec![
        (Value::Null, "ff 0f 30"),
        (Value::Undefined, "ff 0f 5f"),
        (Value::Bool(true), "ff 0f 54"),
        (Value::Bool(false), "ff 0f 46"),
        (Value::Int32(0), "ff 0f 49 00"),
        (Value::Int32(42), "ff 0f 49 54"),
        (Value::Int32(-42), "ff 0f 49 53"),
        (Value::Uint32(42), "ff 0f 55 2a"),
        (Value::from(""), "ff 0f 22 00"),
        (Value::from("hello"), "ff 0f 22 05 68 65 6c 6c 6f"),
        (Value::BigInt(BigInt::from(42)), "ff 0f 5a 02 2a"),
        (Value::BigInt(BigInt::from(-42)), "ff 0f 5a 03 2a"),
        (Value::BigInt(BigInt::from(0)), "ff 0f 5a 00"),
    ];
    for (value, expected) in cases {
        assert_eq!(
            encode(&value).unwrap(),
            hex(expected),
            "encoding mismatch for {value:?}"
        );
    }
}

#[test]
fn exact_container_encodings() {
    assert_eq!(
        encode(&Value::dense_array(vec![
            Value::Int32(1),
            Value::Int32(2),
            Value::Int32(3)
        ]))
        .unwrap(),
        hex("ff 0f 41 03 49 02 49 04 49 06 24 00 03")
    );
    assert_eq!(
        encode(&Value::object(vec![
            ("a", Value::Int32(1)),
            ("b", Value::Int32(2))
        ]))
        .unwrap(),
        hex("ff 0f 6f 22 01 61 49 02 22 01 62 49 04 7b 02")
    );
    assert_eq!(
        encode(&Value::sparse_array(vec![
            Value::Hole,
            Value::Int32(42),
            Value::Hole
        ]))
        .unwrap(),
        hex("ff 0f 61 03 49 02 49 54 40 01 03")
    );
    assert_eq!(
        encode(&Value::map(vec![(Value::Int32(1), Value::from("one"))])).unwrap(),
        hex("ff 0f 3b 49 02 22 03 6f 6e 65 3a 02")
    );
    assert_eq!(
        encode(&Value::set(vec![Value::Int32(1), Value::Int32(2)])).unwrap(),
        hex("ff 0f 27 49 02 49 04 2c 02")
    );
    assert_eq!(
        encode(&Value::array_buffer(vec![1, 2, 3])).unwrap(),
        hex("ff 0f 42 03 01 02 03")
    );
}

#[test]
fn two_byte_string_alignment_pad() {
    // Key "ab" pushes the two-byte payload to an odd offset; the encoder
    // must land it on an even one with a single zero pad.
    let value = Value::object(vec![("ab", Value::from("你"))]);
    let bytes = encode(&value).unwrap();
    assert_eq!(bytes, hex("ff 0f 6f 22 02 61 62 63 02 00 60 4f 7b 01"));
    assert_eq!(bytes[9], 0x00);
    assert_eq!(decode(&bytes).unwrap(), value);
}

#[test]
fn string_form_selection() {
    // All code units <= U+00FF take the one-byte form.
    let latin1 = encode(&Value::from("café")).unwrap();
    assert_eq!(latin1, hex("ff 0f 22 04 63 61 66 e9"));
    // Anything above forces the two-byte form.
    let cjk = encode(&Value::from("你")).unwrap();
    assert_eq!(cjk[2], 0x63);
}

#[test]
fn container_round_trips() {
    let values = vec![
        Value::object::<&str>(vec![]),
        Value::object(vec![
            ("nested", Value::object(vec![("x", Value::Double(1.5))])),
            ("list", Value::dense_array(vec![Value::Null, Value::from("s")])),
        ]),
        Value::dense_array(vec![]),
        Value::dense_array(vec![Value::Hole, Value::Hole, Value::Int32(7)]),
        Value::sparse_array(vec![Value::Hole; 5]),
        Value::sparse_array(vec![Value::from("end"), Value::Hole, Value::Int32(1)]),
        Value::map(vec![
            (Value::from("k"), Value::Int32(1)),
            (Value::Int32(2), Value::dense_array(vec![Value::Bool(true)])),
        ]),
        Value::set(vec![Value::from("a"), Value::from("b")]),
        Value::array_buffer(vec![]),
        Value::array_buffer(vec![0xde, 0xad, 0xbe, 0xef]),
    ];
    for value in values {
        assert_eq!(round_trip(&value), value, "round trip failed for {value:?}");
    }
}

#[test]
fn typed_array_round_trips() {
    for kind in [
        ViewKind::Int8,
        ViewKind::Uint8,
        ViewKind::Uint8Clamped,
        ViewKind::Int16,
        ViewKind::Uint16,
        ViewKind::Int32,
        ViewKind::Uint32,
        ViewKind::Float32,
        ViewKind::Float64,
        ViewKind::DataView,
        ViewKind::Float16,
        ViewKind::BigInt64,
        ViewKind::BigUint64,
    ] {
        let value = Value::ArrayBufferView(JsArrayBufferView {
            buffer: shared(JsArrayBuffer {
                data: vec![0; 16],
            }),
            kind,
            byte_offset: 0,
            byte_length: 16,
        });
        assert_eq!(round_trip(&value), value, "round trip failed for {kind:?}");
    }
}

#[test]
fn view_with_offset_collapses_to_window() {
    // The baseline wire form has no offset field; the encoder emits the
    // view's window and the decoder reads it back as a full buffer.
    let value = Value::ArrayBufferView(JsArrayBufferView {
        buffer: shared(JsArrayBuffer {
            data: vec![1, 2, 3, 4, 5],
        }),
        kind: ViewKind::Uint8,
        byte_offset: 2,
        byte_length: 2,
    });
    let Value::ArrayBufferView(view) = round_trip(&value) else {
        panic!("expected view");
    };
    assert_eq!(view.byte_offset, 0);
    assert_eq!(view.byte_length, 2);
    assert_eq!(view.buffer.borrow().data, vec![3, 4]);
}

#[test]
fn error_round_trips() {
    let values = vec![
        Value::error(ErrorKind::Error, "boom"),
        Value::error(ErrorKind::Range, ""),
        Value::Error(Box::new(JsError {
            kind: ErrorKind::Syntax,
            message: JsString::from("bad token"),
            stack: JsString::from("SyntaxError: bad token\n    at <anonymous>"),
            cause: Some(Value::error(ErrorKind::Error, "root cause")),
        })),
    ];
    for value in values {
        assert_eq!(round_trip(&value), value, "round trip failed for {value:?}");
    }
}

#[test]
fn exact_error_encodings() {
    assert_eq!(
        encode(&Value::error(ErrorKind::Error, "boom")).unwrap(),
        hex("ff 0f 72 6d 22 04 62 6f 6f 6d 2e")
    );
    let typed = Value::Error(Box::new(JsError {
        kind: ErrorKind::Type,
        message: JsString::from("t"),
        stack: JsString::from("s1"),
        cause: None,
    }));
    assert_eq!(
        encode(&typed).unwrap(),
        hex("ff 0f 72 54 6d 22 01 74 73 22 02 73 31 2e")
    );
}

#[test]
fn boxed_round_trips() {
    let values = vec![
        Value::Boxed(Box::new(JsBoxed {
            kind: BoxedKind::Number,
            inner: Value::Double(42.0),
        })),
        Value::Boxed(Box::new(JsBoxed {
            kind: BoxedKind::Boolean,
            inner: Value::Bool(true),
        })),
        Value::Boxed(Box::new(JsBoxed {
            kind: BoxedKind::Boolean,
            inner: Value::Bool(false),
        })),
        Value::Boxed(Box::new(JsBoxed {
            kind: BoxedKind::String,
            inner: Value::from("x"),
        })),
        Value::Boxed(Box::new(JsBoxed {
            kind: BoxedKind::BigInt,
            inner: Value::BigInt(BigInt::from(7)),
        })),
    ];
    for value in values {
        assert_eq!(round_trip(&value), value, "round trip failed for {value:?}");
    }
}

#[test]
fn regexp_round_trip() {
    let value = Value::RegExp(JsRegExp {
        source: JsString::from("ab+c"),
        flags: RegExpFlags::parse("gi"),
    });
    assert_eq!(encode(&value).unwrap(), hex("ff 0f 52 22 04 61 62 2b 63 03"));
    assert_eq!(round_trip(&value), value);
}

#[test]
fn shared_handle_encodes_as_copies() {
    // Without back-reference emission, a value reachable twice is written
    // twice; the decode is structurally equal but no longer shared.
    let inner = Value::array_buffer(vec![9]);
    let value = Value::dense_array(vec![inner.clone(), inner]);
    assert_eq!(round_trip(&value), value);
}

#[test]
fn generic_integer_constructor_round_trips() {
    // i64 beyond int32 range encodes as a double, like V8 does for plain
    // numbers.
    let value = Value::from(10_000_000_000i64);
    assert_eq!(value, Value::Double(1e10));
    assert_eq!(round_trip(&value), value);
}
