//! In-memory representation of every JavaScript value the wire format can
//! carry.
//!
//! Containers that can participate in reference cycles (objects, arrays,
//! maps, sets) are held through [`Shared`] handles so a back-reference in
//! the byte stream resolves to the same allocation it points at. Everything
//! else is plain owned data.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

/// Shared container handle. Cloning is cheap and clones refer to the same
/// contents; the interior is only mutated while the decode that created it
/// is still filling placeholders.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps a container value in a fresh [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// A JavaScript string: a sequence of UTF-16 code units.
///
/// JS strings are not required to be well-formed Unicode — unpaired
/// surrogates are legal and the wire format carries them verbatim — so the
/// code units are stored as-is rather than as a Rust `String`. Conversion
/// to UTF-8 happens at the host boundary and is lossy for lone surrogates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsString {
    units: Vec<u16>,
}

impl JsString {
    /// The empty string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a string from raw UTF-16 code units, paired or not.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self { units }
    }

    /// Builds a string from Latin-1 bytes; each byte is the code point
    /// U+0000..=U+00FF it names.
    pub fn from_latin1(bytes: &[u8]) -> Self {
        Self {
            units: bytes.iter().map(|&b| u16::from(b)).collect(),
        }
    }

    /// The UTF-16 code units.
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Number of UTF-16 code units (BMP code points count 1, supplementary
    /// count 2).
    pub fn utf16_len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// True iff some code unit exceeds U+00FF, forcing the two-byte wire
    /// form.
    pub fn needs_utf16(&self) -> bool {
        self.units.iter().any(|&u| u > 0xff)
    }

    /// The Latin-1 byte form, or `None` when [`Self::needs_utf16`].
    pub fn to_latin1(&self) -> Option<Vec<u8>> {
        self.units
            .iter()
            .map(|&u| u8::try_from(u).ok())
            .collect()
    }

    /// Strict UTF-8 conversion; `None` when the string contains an unpaired
    /// surrogate.
    pub fn to_utf8(&self) -> Option<String> {
        char::decode_utf16(self.units.iter().copied())
            .collect::<Result<String, _>>()
            .ok()
    }
}

impl fmt::Display for JsString {
    /// Lossy: unpaired surrogates render as U+FFFD.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.units.iter().copied()) {
            write!(f, "{}", c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.units.iter().copied().eq(other.encode_utf16())
    }
}

/// RegExp flag bitfield: g=1, i=2, m=4, s=8, u=16, y=32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegExpFlags(u32);

impl RegExpFlags {
    pub const GLOBAL: u32 = 1;
    pub const IGNORE_CASE: u32 = 2;
    pub const MULTILINE: u32 = 4;
    pub const DOT_ALL: u32 = 8;
    pub const UNICODE: u32 = 16;
    pub const STICKY: u32 = 32;

    const MASK: u32 = 0x3f;

    /// Builds a flag set from wire bits; bits outside the six known flags
    /// are dropped.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::MASK)
    }

    /// Parses a JS flags string like `"gi"`; unknown characters are
    /// ignored.
    pub fn parse(flags: &str) -> Self {
        let mut bits = 0;
        for c in flags.chars() {
            bits |= match c {
                'g' => Self::GLOBAL,
                'i' => Self::IGNORE_CASE,
                'm' => Self::MULTILINE,
                's' => Self::DOT_ALL,
                'u' => Self::UNICODE,
                'y' => Self::STICKY,
                _ => 0,
            };
        }
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

impl fmt::Display for RegExpFlags {
    /// Canonical order: `gimsuy`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, c) in [
            (Self::GLOBAL, 'g'),
            (Self::IGNORE_CASE, 'i'),
            (Self::MULTILINE, 'm'),
            (Self::DOT_ALL, 's'),
            (Self::UNICODE, 'u'),
            (Self::STICKY, 'y'),
        ] {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// A JavaScript RegExp: source pattern plus flags. The pattern is never
/// compiled or executed.
#[derive(Debug, Clone, PartialEq)]
pub struct JsRegExp {
    pub source: JsString,
    pub flags: RegExpFlags,
}

/// TypedArray / DataView kind, identified on the wire by a sub-kind byte
/// after the TypedArray tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    DataView,
    /// V8 12.x+ (Node 22+) only.
    Float16,
    BigInt64,
    BigUint64,
}

impl ViewKind {
    /// Maps a wire sub-kind byte to a view kind.
    pub fn from_wire(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => ViewKind::Int8,
            1 => ViewKind::Uint8,
            2 => ViewKind::Uint8Clamped,
            3 => ViewKind::Int16,
            4 => ViewKind::Uint16,
            5 => ViewKind::Int32,
            6 => ViewKind::Uint32,
            7 => ViewKind::Float32,
            8 => ViewKind::Float64,
            9 => ViewKind::DataView,
            10 => ViewKind::Float16,
            11 => ViewKind::BigInt64,
            12 => ViewKind::BigUint64,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        match self {
            ViewKind::Int8 => 0,
            ViewKind::Uint8 => 1,
            ViewKind::Uint8Clamped => 2,
            ViewKind::Int16 => 3,
            ViewKind::Uint16 => 4,
            ViewKind::Int32 => 5,
            ViewKind::Uint32 => 6,
            ViewKind::Float32 => 7,
            ViewKind::Float64 => 8,
            ViewKind::DataView => 9,
            ViewKind::Float16 => 10,
            ViewKind::BigInt64 => 11,
            ViewKind::BigUint64 => 12,
        }
    }

    /// The JS constructor name.
    pub fn name(self) -> &'static str {
        match self {
            ViewKind::Int8 => "Int8Array",
            ViewKind::Uint8 => "Uint8Array",
            ViewKind::Uint8Clamped => "Uint8ClampedArray",
            ViewKind::Int16 => "Int16Array",
            ViewKind::Uint16 => "Uint16Array",
            ViewKind::Int32 => "Int32Array",
            ViewKind::Uint32 => "Uint32Array",
            ViewKind::Float32 => "Float32Array",
            ViewKind::Float64 => "Float64Array",
            ViewKind::DataView => "DataView",
            ViewKind::Float16 => "Float16Array",
            ViewKind::BigInt64 => "BigInt64Array",
            ViewKind::BigUint64 => "BigUint64Array",
        }
    }
}

/// The seven cloneable Error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorKind {
    #[default]
    Error,
    Eval,
    Range,
    Reference,
    Syntax,
    Type,
    Uri,
}

impl ErrorKind {
    /// The JS constructor name.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Eval => "EvalError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Uri => "URIError",
        }
    }
}

/// Primitive wrapper-object kind (`new Number(42)` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxedKind {
    Number,
    Boolean,
    String,
    BigInt,
}

/// Plain object: insertion-ordered string-keyed properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsObject {
    pub properties: Vec<(JsString, Value)>,
}

impl JsObject {
    /// Looks up a property by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(k, _)| k == &key)
            .map(|(_, v)| v)
    }
}

/// Array storage shared by the dense and sparse variants; absent elements
/// are explicit [`Value::Hole`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsArray {
    pub elements: Vec<Value>,
}

/// JavaScript Map: insertion-ordered entries, keys not deduplicated here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsMap {
    pub entries: Vec<(Value, Value)>,
}

/// JavaScript Set: insertion-ordered values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsSet {
    pub values: Vec<Value>,
}

/// Opaque byte blob.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsArrayBuffer {
    pub data: Vec<u8>,
}

/// A typed view into an ArrayBuffer.
#[derive(Debug, Clone, PartialEq)]
pub struct JsArrayBufferView {
    pub buffer: Shared<JsArrayBuffer>,
    pub kind: ViewKind,
    pub byte_offset: usize,
    pub byte_length: usize,
}

/// A JavaScript Error object. Empty `message`/`stack` mean absent, which
/// is also how the encoder decides what to emit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsError {
    pub kind: ErrorKind,
    pub message: JsString,
    pub stack: JsString,
    pub cause: Option<Value>,
}

/// A boxed primitive; `inner` must match `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsBoxed {
    pub kind: BoxedKind,
    pub inner: Value,
}

/// A decoded (or to-be-encoded) JavaScript value.
///
/// Equality is structural. Comparing or dropping graphs that contain
/// reference cycles is outside the baseline contract: equality recurses
/// forever on a cycle, and a cycle's `Rc` ring is leaked on drop.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Double(f64),
    BigInt(BigInt),
    Str(JsString),
    /// Milliseconds since the Unix epoch; NaN is JS "Invalid Date".
    Date(f64),
    RegExp(JsRegExp),
    Object(Shared<JsObject>),
    DenseArray(Shared<JsArray>),
    SparseArray(Shared<JsArray>),
    /// Only legal inside arrays.
    Hole,
    Map(Shared<JsMap>),
    Set(Shared<JsSet>),
    ArrayBuffer(Shared<JsArrayBuffer>),
    ArrayBufferView(JsArrayBufferView),
    Error(Box<JsError>),
    Boxed(Box<JsBoxed>),
}

impl Value {
    /// Builds an object from key-value pairs, preserving order.
    pub fn object<K: Into<JsString>>(properties: Vec<(K, Value)>) -> Value {
        Value::Object(shared(JsObject {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }))
    }

    pub fn dense_array(elements: Vec<Value>) -> Value {
        Value::DenseArray(shared(JsArray { elements }))
    }

    pub fn sparse_array(elements: Vec<Value>) -> Value {
        Value::SparseArray(shared(JsArray { elements }))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Value {
        Value::Map(shared(JsMap { entries }))
    }

    pub fn set(values: Vec<Value>) -> Value {
        Value::Set(shared(JsSet { values }))
    }

    pub fn array_buffer(data: Vec<u8>) -> Value {
        Value::ArrayBuffer(shared(JsArrayBuffer { data }))
    }

    pub fn error(kind: ErrorKind, message: &str) -> Value {
        Value::Error(Box::new(JsError {
            kind,
            message: JsString::from(message),
            ..JsError::default()
        }))
    }

    /// The JS-facing type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int32(_) => "int32",
            Value::Uint32(_) => "uint32",
            Value::Double(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Str(_) => "string",
            Value::Date(_) => "Date",
            Value::RegExp(_) => "RegExp",
            Value::Object(_) => "object",
            Value::DenseArray(_) | Value::SparseArray(_) => "Array",
            Value::Hole => "hole",
            Value::Map(_) => "Map",
            Value::Set(_) => "Set",
            Value::ArrayBuffer(_) => "ArrayBuffer",
            Value::ArrayBufferView(_) => "ArrayBufferView",
            Value::Error(_) => "Error",
            Value::Boxed(_) => "BoxedPrimitive",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

/// Explicitly unsigned input keeps the Uint32 wire form.
impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Uint32(n)
    }
}

/// Generic signed input: int32 range stays Int32, everything else becomes
/// Double, matching what V8 emits for plain numbers.
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(n) => Value::Int32(n),
            Err(_) => Value::Double(n as f64),
        }
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i32::try_from(n) {
            Ok(n) => Value::Int32(n),
            Err(_) => Value::Double(n as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(JsString::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(JsString::from(s))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::array_buffer(data)
    }
}
