//! Codec for V8's Structured Clone wire format.
//!
//! This is the binary format produced by Node.js `v8.serialize()` /
//! `v8.deserialize()` and by the web Structured Clone algorithm. The crate
//! decodes any payload from format versions 13 through 15 (Node.js 18-22)
//! into a [`Value`] tree and re-encodes [`Value`] trees into bytes V8
//! accepts.
//!
//! # Decoding
//!
//! ```
//! use structclone::{decode, Value};
//!
//! // v8.serialize(42)
//! let data = [0xff, 0x0f, 0x49, 0x54];
//! assert_eq!(decode(&data).unwrap(), Value::Int32(42));
//! ```
//!
//! # Encoding
//!
//! ```
//! use structclone::{encode, Value};
//!
//! let bytes = encode(&Value::from("hello")).unwrap();
//! assert_eq!(&bytes[..2], &[0xff, 0x0f]); // header: version 15
//! ```
//!
//! # Supported values
//!
//! Primitives (null, undefined, booleans, int32/uint32/double numbers,
//! BigInt, strings), Date, RegExp (pattern and flags only, never
//! executed), plain objects, dense and sparse arrays with holes, Map and
//! Set with insertion order, ArrayBuffer, TypedArrays and DataView, Error
//! objects with message/stack/cause, and boxed primitives. Cyclic graphs
//! decode correctly through the format's back-reference table; the
//! encoder does not emit back-references, so encoding a cyclic graph
//! fails with [`StructCloneError::CyclicNotSupported`].
//!
//! SharedArrayBuffer, transferred and resizable ArrayBuffers, host
//! objects, and WebAssembly modules are out of scope and decode to
//! [`StructCloneError::UnsupportedFeature`].

mod decoder;
mod encoder;
mod error;
pub mod tags;
mod to_json;
mod value;

pub use decoder::{
    decode, decode_with_options, validate_header, DecodeOptions, Decoder, DEFAULT_MAX_ARRAY_LEN,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_OBJECT_KEYS,
};
pub use encoder::{encode, Encoder};
pub use error::StructCloneError;
pub use tags::{MAX_VERSION, MIN_VERSION};
pub use to_json::to_json;
pub use value::{
    shared, BoxedKind, ErrorKind, JsArray, JsArrayBuffer, JsArrayBufferView, JsBoxed, JsError,
    JsMap, JsObject, JsRegExp, JsSet, JsString, RegExpFlags, Shared, Value, ViewKind,
};
