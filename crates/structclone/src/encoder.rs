//! Encoder, symmetric to the decoder minus back-reference emission.

use num_bigint::{BigInt, Sign};
use structclone_buffers::Writer;

use crate::error::StructCloneError;
use crate::tags;
use crate::value::{BoxedKind, ErrorKind, JsError, JsString, Value};

/// Recursion guard for the encoder. The baseline encoder carries no
/// identity table, so a cyclic value graph would recurse forever; the
/// guard turns that into [`StructCloneError::CyclicNotSupported`].
const MAX_ENCODE_DEPTH: usize = 1000;

/// Encodes a [`Value`] tree into Structured Clone bytes (format version 15).
///
/// The encoder is deterministic: the same value always produces the same
/// bytes. It does not emit back-references, so values that share a
/// container encode as independent copies and cyclic graphs fail.
#[derive(Default)]
pub struct Encoder {
    writer: Writer,
    depth: usize,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(),
            depth: 0,
        }
    }

    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>, StructCloneError> {
        self.writer.reset();
        self.depth = 0;
        self.writer.u8(tags::VERSION);
        self.writer.varint32(tags::SERIALIZE_VERSION);
        self.write_value(value)?;
        Ok(self.writer.flush())
    }

    fn write_value(&mut self, value: &Value) -> Result<(), StructCloneError> {
        self.depth += 1;
        if self.depth > MAX_ENCODE_DEPTH {
            self.depth -= 1;
            return Err(StructCloneError::CyclicNotSupported);
        }
        let result = self.write_tagged(value);
        self.depth -= 1;
        result
    }

    fn write_tagged(&mut self, value: &Value) -> Result<(), StructCloneError> {
        match value {
            Value::Undefined => self.writer.u8(tags::UNDEFINED),
            Value::Null => self.writer.u8(tags::NULL),
            Value::Bool(true) => self.writer.u8(tags::TRUE),
            Value::Bool(false) => self.writer.u8(tags::FALSE),
            Value::Hole => self.writer.u8(tags::HOLE),

            Value::Int32(n) => {
                self.writer.u8(tags::INT32);
                self.writer.zigzag32(*n);
            }
            Value::Uint32(n) => {
                self.writer.u8(tags::UINT32);
                self.writer.varint32(*n);
            }
            Value::Double(f) => {
                self.writer.u8(tags::DOUBLE);
                self.writer.f64(*f);
            }
            Value::BigInt(n) => {
                self.writer.u8(tags::BIGINT);
                self.write_bigint_payload(n);
            }

            Value::Str(s) => self.write_string(s),
            Value::Date(ms) => {
                self.writer.u8(tags::DATE);
                self.writer.f64(*ms);
            }
            Value::RegExp(re) => {
                self.writer.u8(tags::REGEXP);
                self.write_string(&re.source);
                self.writer.varint32(re.flags.bits());
            }

            Value::Object(obj) => {
                self.writer.u8(tags::BEGIN_OBJECT);
                let obj = obj.borrow();
                for (key, val) in &obj.properties {
                    self.write_string(key);
                    self.write_value(val)?;
                }
                self.writer.u8(tags::END_OBJECT);
                self.writer.varint32(obj.properties.len() as u32);
            }

            Value::DenseArray(arr) => {
                self.writer.u8(tags::BEGIN_DENSE_ARRAY);
                let arr = arr.borrow();
                self.writer.varint32(arr.elements.len() as u32);
                for elem in &arr.elements {
                    self.write_value(elem)?;
                }
                self.writer.u8(tags::END_DENSE_ARRAY);
                self.writer.varint32(0); // no extra properties
                self.writer.varint32(arr.elements.len() as u32);
            }

            Value::SparseArray(arr) => {
                self.writer.u8(tags::BEGIN_SPARSE_ARRAY);
                let arr = arr.borrow();
                self.writer.varint32(arr.elements.len() as u32);
                let mut pairs = 0u32;
                for (index, elem) in arr.elements.iter().enumerate() {
                    if matches!(elem, Value::Hole) {
                        continue;
                    }
                    match i32::try_from(index) {
                        Ok(index) => {
                            self.writer.u8(tags::INT32);
                            self.writer.zigzag32(index);
                        }
                        Err(_) => {
                            self.writer.u8(tags::DOUBLE);
                            self.writer.f64(index as f64);
                        }
                    }
                    self.write_value(elem)?;
                    pairs += 1;
                }
                self.writer.u8(tags::END_SPARSE_ARRAY);
                self.writer.varint32(pairs);
                self.writer.varint32(arr.elements.len() as u32);
            }

            Value::Map(map) => {
                self.writer.u8(tags::BEGIN_MAP);
                let map = map.borrow();
                for (key, val) in &map.entries {
                    self.write_value(key)?;
                    self.write_value(val)?;
                }
                self.writer.u8(tags::END_MAP);
                self.writer.varint32(map.entries.len() as u32 * 2);
            }

            Value::Set(set) => {
                self.writer.u8(tags::BEGIN_SET);
                let set = set.borrow();
                for val in &set.values {
                    self.write_value(val)?;
                }
                self.writer.u8(tags::END_SET);
                self.writer.varint32(set.values.len() as u32);
            }

            Value::ArrayBuffer(buf) => {
                self.writer.u8(tags::ARRAY_BUFFER);
                let data = &buf.borrow().data;
                self.writer.varint32(data.len() as u32);
                self.writer.bytes(data);
            }

            Value::ArrayBufferView(view) => {
                let buffer = view.buffer.borrow();
                let window = buffer
                    .data
                    .get(view.byte_offset..view.byte_offset + view.byte_length)
                    .ok_or_else(|| {
                        StructCloneError::MalformedData(format!(
                            "{} window {}..{} out of range for buffer of {} bytes",
                            view.kind.name(),
                            view.byte_offset,
                            view.byte_offset + view.byte_length,
                            buffer.data.len()
                        ))
                    })?;
                self.writer.u8(tags::TYPED_ARRAY);
                self.writer.u8(view.kind.to_wire());
                self.writer.varint32(window.len() as u32);
                self.writer.bytes(window);
            }

            Value::Error(error) => self.write_error(error)?,

            Value::Boxed(boxed) => match (boxed.kind, &boxed.inner) {
                (BoxedKind::Number, Value::Double(f)) => {
                    self.writer.u8(tags::NUMBER_OBJECT);
                    self.writer.f64(*f);
                }
                (BoxedKind::Boolean, Value::Bool(true)) => self.writer.u8(tags::TRUE_OBJECT),
                (BoxedKind::Boolean, Value::Bool(false)) => self.writer.u8(tags::FALSE_OBJECT),
                (BoxedKind::String, Value::Str(s)) => {
                    self.writer.u8(tags::STRING_OBJECT);
                    self.write_string(s);
                }
                (BoxedKind::BigInt, Value::BigInt(n)) => {
                    self.writer.u8(tags::BIGINT_OBJECT);
                    self.write_bigint_payload(n);
                }
                (kind, inner) => {
                    return Err(StructCloneError::MalformedData(format!(
                        "boxed {kind:?} contains {}",
                        inner.type_name()
                    )))
                }
            },
        }
        Ok(())
    }

    /// One-byte form iff every code unit fits Latin-1; otherwise the
    /// two-byte form with its byte-length prefix and 2-byte alignment pad.
    fn write_string(&mut self, s: &JsString) {
        match s.to_latin1() {
            Some(bytes) => {
                self.writer.u8(tags::ONE_BYTE_STRING);
                self.writer.varint32(bytes.len() as u32);
                self.writer.bytes(&bytes);
            }
            None => {
                self.writer.u8(tags::TWO_BYTE_STRING);
                self.writer.varint32(s.utf16_len() as u32 * 2);
                self.writer.two_byte_units(s.units());
            }
        }
    }

    fn write_bigint_payload(&mut self, n: &BigInt) {
        if n.sign() == Sign::NoSign {
            self.writer.varint(0);
            return;
        }
        let (sign, bytes) = n.to_bytes_le();
        let mut bitfield = (bytes.len() as u64) << 1;
        if sign == Sign::Minus {
            bitfield |= 1;
        }
        self.writer.varint(bitfield);
        self.writer.bytes(&bytes);
    }

    fn write_error(&mut self, error: &JsError) -> Result<(), StructCloneError> {
        self.writer.u8(tags::ERROR);
        // For a generic Error, 'm' is both the type byte and the message
        // marker, with the message value following directly; the typed
        // subclasses write their letter and then a framed 'm' sub-tag.
        self.writer.u8(match error.kind {
            ErrorKind::Error => tags::ERROR_MESSAGE,
            ErrorKind::Eval => tags::ERROR_EVAL,
            ErrorKind::Range => tags::ERROR_RANGE,
            ErrorKind::Reference => tags::ERROR_REFERENCE,
            ErrorKind::Syntax => tags::ERROR_SYNTAX,
            ErrorKind::Type => tags::ERROR_TYPE,
            ErrorKind::Uri => tags::ERROR_URI,
        });
        if error.kind != ErrorKind::Error {
            self.writer.u8(tags::ERROR_MESSAGE);
        }
        self.write_string(&error.message);
        if !error.stack.is_empty() {
            self.writer.u8(tags::ERROR_STACK);
            self.write_string(&error.stack);
        }
        if let Some(cause) = &error.cause {
            self.writer.u8(tags::ERROR_CAUSE);
            self.write_value(cause)?;
        }
        self.writer.u8(tags::ERROR_END);
        Ok(())
    }
}

/// Encodes a value with a fresh [`Encoder`].
pub fn encode(value: &Value) -> Result<Vec<u8>, StructCloneError> {
    Encoder::new().encode(value)
}
