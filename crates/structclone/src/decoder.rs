//! Tag-dispatched decoder with reference-table and resource-limit support.

use num_bigint::{BigInt, Sign};
use structclone_buffers::Reader;

use crate::error::StructCloneError;
use crate::tags;
use crate::value::{
    shared, BoxedKind, ErrorKind, JsArray, JsArrayBuffer, JsArrayBufferView, JsBoxed, JsError,
    JsMap, JsObject, JsRegExp, JsSet, JsString, RegExpFlags, Value, ViewKind,
};

/// Resource limits for a single decode.
///
/// Each limit is checked before the offending structure is allocated, so a
/// hostile payload cannot make the decoder commit memory it has not paid
/// for in input bytes and configured budget.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Hard ceiling on recursive descent.
    pub max_depth: usize,
    /// Reject inputs larger than this many bytes; 0 means unlimited.
    pub max_size: usize,
    /// Reject dense or sparse arrays whose declared length exceeds this.
    pub max_array_len: usize,
    /// Reject objects (and maps/sets) that would accumulate more entries
    /// than this.
    pub max_object_keys: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 1000;
pub const DEFAULT_MAX_ARRAY_LEN: usize = 10_000_000;
pub const DEFAULT_MAX_OBJECT_KEYS: usize = 1_000_000;

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_size: 0,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
            max_object_keys: DEFAULT_MAX_OBJECT_KEYS,
        }
    }
}

/// Decodes one Structured Clone payload into a [`Value`].
///
/// The decoder owns a reference table for the duration of the decode:
/// every string, date, container, buffer, regexp, error, and boxed
/// primitive is appended in order of first appearance, and an
/// `ObjectReference` tag resolves to the entry with that ID. Containers
/// are registered before their contents are read, which is what makes
/// cyclic graphs come out connected.
pub struct Decoder<'a> {
    reader: Reader<'a>,
    options: DecodeOptions,
    version: u32,
    depth: usize,
    refs: Vec<Value>,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_options(data, DecodeOptions::default())
    }

    pub fn with_options(data: &'a [u8], options: DecodeOptions) -> Self {
        Self {
            reader: Reader::new(data),
            options,
            version: 0,
            depth: 0,
            refs: Vec::with_capacity(16),
        }
    }

    /// The format version from the header; valid after a successful
    /// [`Self::decode`].
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Reads the header and the root value. Trailing bytes after the root
    /// are permitted and ignored; the format has no length prefix.
    pub fn decode(&mut self) -> Result<Value, StructCloneError> {
        if self.options.max_size > 0 && self.reader.len() > self.options.max_size {
            return Err(StructCloneError::MaxSizeExceeded {
                size: self.reader.len(),
                limit: self.options.max_size,
            });
        }
        self.read_header()?;
        self.read_value()
    }

    fn read_header(&mut self) -> Result<(), StructCloneError> {
        let tag = self
            .reader
            .u8()
            .map_err(|_| StructCloneError::InvalidHeader)?;
        if tag != tags::VERSION {
            return Err(StructCloneError::InvalidHeader);
        }
        let version = self
            .reader
            .varint32()
            .map_err(|_| StructCloneError::InvalidHeader)?;
        if !(tags::MIN_VERSION..=tags::MAX_VERSION).contains(&version) {
            return Err(StructCloneError::UnsupportedVersion(version));
        }
        self.version = version;
        Ok(())
    }

    fn read_value(&mut self) -> Result<Value, StructCloneError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            self.depth -= 1;
            return Err(StructCloneError::MaxDepthExceeded);
        }
        let result = self.read_tagged();
        self.depth -= 1;
        result
    }

    fn read_tagged(&mut self) -> Result<Value, StructCloneError> {
        while self.reader.peek()? == tags::PADDING {
            self.reader.u8()?;
        }

        let pos = self.reader.pos();
        let tag = self.reader.u8()?;
        match tag {
            tags::NULL => Ok(Value::Null),
            tags::UNDEFINED => Ok(Value::Undefined),
            tags::TRUE => Ok(Value::Bool(true)),
            tags::FALSE => Ok(Value::Bool(false)),
            tags::HOLE => Ok(Value::Hole),

            tags::INT32 => Ok(Value::Int32(self.reader.zigzag32()?)),
            tags::UINT32 => Ok(Value::Uint32(self.reader.varint32()?)),
            tags::DOUBLE => Ok(Value::Double(self.reader.f64()?)),
            tags::BIGINT => self.read_bigint(),

            tags::ONE_BYTE_STRING => self.read_one_byte_string(),
            tags::TWO_BYTE_STRING => self.read_two_byte_string(),
            tags::DATE => self.read_date(),

            tags::BEGIN_OBJECT => self.read_object(),
            tags::BEGIN_DENSE_ARRAY => self.read_dense_array(),
            tags::BEGIN_SPARSE_ARRAY => self.read_sparse_array(),

            tags::OBJECT_REFERENCE => self.read_object_reference(),

            tags::BEGIN_MAP => self.read_map(),
            tags::BEGIN_SET => self.read_set(),

            tags::ARRAY_BUFFER => self.read_array_buffer(),
            tags::TYPED_ARRAY => self.read_typed_array(),

            tags::REGEXP => self.read_regexp(),
            tags::NUMBER_OBJECT => self.read_number_object(),
            tags::TRUE_OBJECT => Ok(self.register_boxed(BoxedKind::Boolean, Value::Bool(true))),
            tags::FALSE_OBJECT => Ok(self.register_boxed(BoxedKind::Boolean, Value::Bool(false))),
            tags::STRING_OBJECT => self.read_string_object(),
            tags::BIGINT_OBJECT => self.read_bigint_object(),

            tags::ERROR => self.read_error(),

            tags::SHARED_ARRAY_BUFFER => {
                Err(StructCloneError::UnsupportedFeature("SharedArrayBuffer"))
            }
            tags::ARRAY_BUFFER_TRANSFER => {
                Err(StructCloneError::UnsupportedFeature("ArrayBufferTransfer"))
            }
            tags::RESIZABLE_ARRAY_BUFFER => {
                Err(StructCloneError::UnsupportedFeature("ResizableArrayBuffer"))
            }

            _ => Err(StructCloneError::UnexpectedTag { tag, pos }),
        }
    }

    /// Appends a finished value to the reference table and hands it back.
    fn register(&mut self, value: Value) -> Value {
        self.refs.push(value.clone());
        value
    }

    fn register_boxed(&mut self, kind: BoxedKind, inner: Value) -> Value {
        self.register(Value::Boxed(Box::new(JsBoxed { kind, inner })))
    }

    /// BigInt wire form: a varint bitfield whose bit 0 is the sign and
    /// whose remaining bits give the magnitude byte count, then that many
    /// little-endian magnitude bytes. A zero-length magnitude is zero even
    /// with the sign bit set. BigInts are not added to the reference table.
    fn read_bigint(&mut self) -> Result<Value, StructCloneError> {
        let bitfield = self.reader.varint()?;
        let negative = bitfield & 1 == 1;
        let byte_len = (bitfield >> 1) as usize;
        if byte_len == 0 {
            return Ok(Value::BigInt(BigInt::default()));
        }
        let bytes = self.reader.buf(byte_len)?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(Value::BigInt(BigInt::from_bytes_le(sign, bytes)))
    }

    fn read_one_byte_string(&mut self) -> Result<Value, StructCloneError> {
        let len = self.reader.varint32()? as usize;
        let bytes = self.reader.buf(len)?;
        Ok(self.register(Value::Str(JsString::from_latin1(bytes))))
    }

    fn read_two_byte_string(&mut self) -> Result<Value, StructCloneError> {
        let byte_len = self.reader.varint32()? as usize;
        if byte_len % 2 != 0 {
            return Err(StructCloneError::MalformedData(format!(
                "two-byte string byte length {byte_len} is odd"
            )));
        }
        let units = self.reader.two_byte_units(byte_len)?;
        Ok(self.register(Value::Str(JsString::from_units(units))))
    }

    fn read_date(&mut self) -> Result<Value, StructCloneError> {
        let ms = self.reader.f64()?;
        Ok(self.register(Value::Date(ms)))
    }

    fn read_object(&mut self) -> Result<Value, StructCloneError> {
        let obj = shared(JsObject::default());
        let value = self.register(Value::Object(obj.clone()));

        loop {
            if self.reader.peek()? == tags::END_OBJECT {
                self.reader.u8()?;
                // Property count; V8's own writer is the authority on it,
                // so it is read but not validated.
                self.reader.varint32()?;
                break;
            }
            let key = self.read_key()?;
            let val = self.read_value()?;
            let mut inner = obj.borrow_mut();
            if inner.properties.len() >= self.options.max_object_keys {
                return Err(StructCloneError::MalformedData(format!(
                    "object key count exceeds limit {}",
                    self.options.max_object_keys
                )));
            }
            inner.properties.push((key, val));
        }
        Ok(value)
    }

    /// Object keys arrive as full values; strings are used as-is and
    /// numeric keys are decimal-stringified.
    fn read_key(&mut self) -> Result<JsString, StructCloneError> {
        match self.read_value()? {
            Value::Str(s) => Ok(s),
            Value::Int32(n) => Ok(JsString::from(n.to_string())),
            Value::Uint32(n) => Ok(JsString::from(n.to_string())),
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => {
                Ok(JsString::from(d.to_string()))
            }
            other => Err(StructCloneError::MalformedData(format!(
                "object key must be a string or integer, got {}",
                other.type_name()
            ))),
        }
    }

    fn read_dense_array(&mut self) -> Result<Value, StructCloneError> {
        let length = self.reader.varint32()? as usize;
        if length > self.options.max_array_len {
            return Err(StructCloneError::MalformedData(format!(
                "array length {length} exceeds limit {}",
                self.options.max_array_len
            )));
        }

        // Each element costs at least one input byte, so the declared
        // length cannot demand more capacity than bytes remain.
        let capacity = length.min(self.reader.remaining());
        let arr = shared(JsArray {
            elements: Vec::with_capacity(capacity),
        });
        let value = self.register(Value::DenseArray(arr.clone()));

        for _ in 0..length {
            let elem = self.read_value()?;
            arr.borrow_mut().elements.push(elem);
        }

        // Arrays can carry extra named properties; the baseline contract
        // reads and discards them.
        loop {
            if self.reader.peek()? == tags::END_DENSE_ARRAY {
                self.reader.u8()?;
                self.reader.varint32()?; // property count
                self.reader.varint32()?; // length, repeated
                break;
            }
            self.read_value()?;
            self.read_value()?;
        }
        Ok(value)
    }

    fn read_sparse_array(&mut self) -> Result<Value, StructCloneError> {
        let length = self.reader.varint32()? as usize;
        if length > self.options.max_array_len {
            return Err(StructCloneError::MalformedData(format!(
                "array length {length} exceeds limit {}",
                self.options.max_array_len
            )));
        }

        let arr = shared(JsArray {
            elements: vec![Value::Hole; length],
        });
        let value = self.register(Value::SparseArray(arr.clone()));

        loop {
            if self.reader.peek()? == tags::END_SPARSE_ARRAY {
                self.reader.u8()?;
                self.reader.varint32()?; // property count
                self.reader.varint32()?; // length, repeated
                break;
            }
            let key = self.read_value()?;
            let val = self.read_value()?;
            let index = match key {
                Value::Int32(n) if n >= 0 => n as u64,
                Value::Uint32(n) => u64::from(n),
                Value::Double(d) if d.is_finite() && d.fract() == 0.0 && d >= 0.0 => d as u64,
                other => {
                    return Err(StructCloneError::MalformedData(format!(
                        "sparse array index must be a non-negative integer, got {}",
                        other.type_name()
                    )))
                }
            };
            if index >= length as u64 {
                return Err(StructCloneError::MalformedData(format!(
                    "sparse array index {index} out of range for length {length}"
                )));
            }
            arr.borrow_mut().elements[index as usize] = val;
        }
        Ok(value)
    }

    fn read_object_reference(&mut self) -> Result<Value, StructCloneError> {
        let id = self.reader.varint32()?;
        match self.refs.get(id as usize) {
            Some(value) => Ok(value.clone()),
            None => Err(StructCloneError::InvalidReference {
                id,
                len: self.refs.len(),
            }),
        }
    }

    fn read_map(&mut self) -> Result<Value, StructCloneError> {
        let map = shared(JsMap::default());
        let value = self.register(Value::Map(map.clone()));

        loop {
            if self.reader.peek()? == tags::END_MAP {
                self.reader.u8()?;
                self.reader.varint32()?; // 2 * entry count
                break;
            }
            let key = self.read_value()?;
            let val = self.read_value()?;
            let mut inner = map.borrow_mut();
            if inner.entries.len() >= self.options.max_object_keys {
                return Err(StructCloneError::MalformedData(format!(
                    "map entry count exceeds limit {}",
                    self.options.max_object_keys
                )));
            }
            inner.entries.push((key, val));
        }
        Ok(value)
    }

    fn read_set(&mut self) -> Result<Value, StructCloneError> {
        let set = shared(JsSet::default());
        let value = self.register(Value::Set(set.clone()));

        loop {
            if self.reader.peek()? == tags::END_SET {
                self.reader.u8()?;
                self.reader.varint32()?; // value count
                break;
            }
            let val = self.read_value()?;
            let mut inner = set.borrow_mut();
            if inner.values.len() >= self.options.max_object_keys {
                return Err(StructCloneError::MalformedData(format!(
                    "set value count exceeds limit {}",
                    self.options.max_object_keys
                )));
            }
            inner.values.push(val);
        }
        Ok(value)
    }

    fn read_array_buffer(&mut self) -> Result<Value, StructCloneError> {
        let byte_len = self.reader.varint32()? as usize;
        // Copied out so the decoded value does not alias the input slice.
        let data = self.reader.buf(byte_len)?.to_vec();
        Ok(self.register(Value::ArrayBuffer(shared(JsArrayBuffer { data }))))
    }

    /// Baseline TypedArray form: sub-kind byte, byte length, then the raw
    /// data as the view's own buffer. Offset is 0 and the view spans the
    /// whole buffer.
    fn read_typed_array(&mut self) -> Result<Value, StructCloneError> {
        let pos = self.reader.pos();
        let sub_kind = self.reader.u8()?;
        let kind = ViewKind::from_wire(sub_kind)
            .ok_or(StructCloneError::UnexpectedTag { tag: sub_kind, pos })?;
        let byte_len = self.reader.varint32()? as usize;
        let data = self.reader.buf(byte_len)?.to_vec();
        let view = JsArrayBufferView {
            buffer: shared(JsArrayBuffer { data }),
            kind,
            byte_offset: 0,
            byte_length: byte_len,
        };
        Ok(self.register(Value::ArrayBufferView(view)))
    }

    fn read_regexp(&mut self) -> Result<Value, StructCloneError> {
        let pattern = self.read_value()?;
        let Value::Str(source) = pattern else {
            return Err(StructCloneError::MalformedData(format!(
                "regexp pattern must be a string, got {}",
                pattern.type_name()
            )));
        };
        let bits = self.reader.varint32()?;
        Ok(self.register(Value::RegExp(JsRegExp {
            source,
            flags: RegExpFlags::from_bits(bits),
        })))
    }

    /// Boxed Number carries its double directly, with no inner tag.
    fn read_number_object(&mut self) -> Result<Value, StructCloneError> {
        let value = self.reader.f64()?;
        Ok(self.register_boxed(BoxedKind::Number, Value::Double(value)))
    }

    fn read_string_object(&mut self) -> Result<Value, StructCloneError> {
        let inner = self.read_value()?;
        if !matches!(inner, Value::Str(_)) {
            return Err(StructCloneError::MalformedData(format!(
                "boxed String contains {}, not a string",
                inner.type_name()
            )));
        }
        Ok(self.register_boxed(BoxedKind::String, inner))
    }

    fn read_bigint_object(&mut self) -> Result<Value, StructCloneError> {
        let inner = self.read_value()?;
        if !matches!(inner, Value::BigInt(_)) {
            return Err(StructCloneError::MalformedData(format!(
                "boxed BigInt contains {}, not a bigint",
                inner.type_name()
            )));
        }
        Ok(self.register_boxed(BoxedKind::BigInt, inner))
    }

    /// Error sub-protocol. One type byte follows the error tag; `'m'`
    /// doubles as "generic Error" with the message value coming right
    /// after it, unframed. Then message/stack/cause sub-tags repeat until
    /// the `'.'` sentinel.
    fn read_error(&mut self) -> Result<Value, StructCloneError> {
        let pos = self.reader.pos();
        let type_byte = self.reader.u8()?;

        let mut error = JsError::default();
        if type_byte == tags::ERROR_MESSAGE {
            error.message = self.read_error_string("message")?;
        } else {
            error.kind = match type_byte {
                tags::ERROR_EVAL => ErrorKind::Eval,
                tags::ERROR_RANGE => ErrorKind::Range,
                tags::ERROR_REFERENCE => ErrorKind::Reference,
                tags::ERROR_SYNTAX => ErrorKind::Syntax,
                tags::ERROR_TYPE => ErrorKind::Type,
                tags::ERROR_URI => ErrorKind::Uri,
                tag => return Err(StructCloneError::UnexpectedTag { tag, pos }),
            };
        }

        loop {
            let pos = self.reader.pos();
            let sub_tag = self.reader.u8()?;
            match sub_tag {
                tags::ERROR_END => break,
                tags::ERROR_MESSAGE => error.message = self.read_error_string("message")?,
                tags::ERROR_STACK => error.stack = self.read_error_string("stack")?,
                tags::ERROR_CAUSE => error.cause = Some(self.read_value()?),
                tag => return Err(StructCloneError::UnexpectedTag { tag, pos }),
            }
        }

        Ok(self.register(Value::Error(Box::new(error))))
    }

    fn read_error_string(&mut self, field: &str) -> Result<JsString, StructCloneError> {
        match self.read_value()? {
            Value::Str(s) => Ok(s),
            other => Err(StructCloneError::MalformedData(format!(
                "error {field} must be a string, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Decodes a payload with default options.
pub fn decode(data: &[u8]) -> Result<Value, StructCloneError> {
    Decoder::new(data).decode()
}

/// Decodes a payload with explicit resource limits.
pub fn decode_with_options(
    data: &[u8],
    options: DecodeOptions,
) -> Result<Value, StructCloneError> {
    Decoder::with_options(data, options).decode()
}

/// Quick check that `data` starts with a plausible format header. Does not
/// validate the payload.
pub fn validate_header(data: &[u8]) -> bool {
    if data.len() < 2 || data[0] != tags::VERSION {
        return false;
    }
    let b = data[1];
    if b & 0x80 != 0 {
        // Multi-byte version varint; header shape is right even though the
        // version itself may still be rejected by a full decode.
        return true;
    }
    (tags::MIN_VERSION..=tags::MAX_VERSION).contains(&u32::from(b))
}
