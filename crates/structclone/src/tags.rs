//! Wire tag bytes for the Structured Clone format.
//!
//! One byte introduces every encoded value. The assignments come from V8's
//! `ValueSerializer` (`src/objects/value-serializer.cc`); most are printable
//! ASCII chosen mnemonically by the V8 authors.

/// Header tag, followed by the format version as a varint.
pub const VERSION: u8 = 0xff;

// Primitives.
pub const NULL: u8 = b'0';
pub const UNDEFINED: u8 = b'_';
pub const TRUE: u8 = b'T';
pub const FALSE: u8 = b'F';
/// Followed by a ZigZag-encoded varint.
pub const INT32: u8 = b'I';
/// Followed by a plain varint.
pub const UINT32: u8 = b'U';
/// Followed by a little-endian IEEE 754 double.
pub const DOUBLE: u8 = b'N';
/// Followed by a sign/length bitfield varint and little-endian magnitude bytes.
pub const BIGINT: u8 = b'Z';
/// Followed by a double holding milliseconds since the Unix epoch.
pub const DATE: u8 = b'D';

// Strings.
/// Latin-1 payload; varint character count.
pub const ONE_BYTE_STRING: u8 = b'"';
/// UTF-16LE payload; varint byte count, 2-byte aligned.
pub const TWO_BYTE_STRING: u8 = b'c';

// Objects and arrays.
pub const BEGIN_OBJECT: u8 = b'o';
/// Followed by the property count as a varint.
pub const END_OBJECT: u8 = b'{';
pub const BEGIN_DENSE_ARRAY: u8 = b'A';
/// Followed by property count and length varints.
pub const END_DENSE_ARRAY: u8 = b'$';
pub const BEGIN_SPARSE_ARRAY: u8 = b'a';
/// Followed by property count and length varints.
pub const END_SPARSE_ARRAY: u8 = b'@';
/// Absent element inside an array.
pub const HOLE: u8 = b'-';

/// Back-reference to a previously decoded value; varint table ID follows.
pub const OBJECT_REFERENCE: u8 = b'^';

// Collections.
pub const BEGIN_MAP: u8 = b';';
/// Followed by a varint equal to twice the entry count.
pub const END_MAP: u8 = b':';
pub const BEGIN_SET: u8 = b'\'';
/// Followed by the value count as a varint.
pub const END_SET: u8 = b',';

// Binary data.
pub const ARRAY_BUFFER: u8 = b'B';
pub const RESIZABLE_ARRAY_BUFFER: u8 = b'~';
pub const ARRAY_BUFFER_TRANSFER: u8 = b't';
pub const SHARED_ARRAY_BUFFER: u8 = b'u';
/// Followed by a view sub-kind byte, a varint byte length, and the data.
pub const TYPED_ARRAY: u8 = b'\\';

// Wrapper objects.
pub const REGEXP: u8 = b'R';
pub const NUMBER_OBJECT: u8 = b'n';
pub const BIGINT_OBJECT: u8 = b'z';
pub const TRUE_OBJECT: u8 = b'y';
pub const FALSE_OBJECT: u8 = b'x';
pub const STRING_OBJECT: u8 = b's';

/// Error object; opens the error sub-protocol.
pub const ERROR: u8 = b'r';

/// Alignment padding, skipped wherever a value tag is expected.
pub const PADDING: u8 = 0x00;

// Error sub-protocol bytes. After the `ERROR` tag comes one type byte;
// `ERROR_MESSAGE` doubles as "generic Error" there, with the message value
// following directly. The remaining sub-tags repeat until `ERROR_END`.
pub const ERROR_EVAL: u8 = b'E';
pub const ERROR_RANGE: u8 = b'R';
pub const ERROR_REFERENCE: u8 = b'F';
pub const ERROR_SYNTAX: u8 = b'S';
pub const ERROR_TYPE: u8 = b'T';
pub const ERROR_URI: u8 = b'U';
pub const ERROR_MESSAGE: u8 = b'm';
pub const ERROR_STACK: u8 = b's';
pub const ERROR_CAUSE: u8 = b'c';
pub const ERROR_END: u8 = b'.';

/// Oldest format version the decoder accepts (Node.js 18).
pub const MIN_VERSION: u32 = 13;
/// Newest format version the decoder accepts (Node.js 22).
pub const MAX_VERSION: u32 = 15;
/// Version the encoder stamps on its output.
pub const SERIALIZE_VERSION: u32 = 15;

/// Human-readable name for a tag byte, for diagnostics.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        VERSION => "Version",
        NULL => "Null",
        UNDEFINED => "Undefined",
        TRUE => "True",
        FALSE => "False",
        INT32 => "Int32",
        UINT32 => "Uint32",
        DOUBLE => "Double",
        BIGINT => "BigInt",
        DATE => "Date",
        ONE_BYTE_STRING => "OneByteString",
        TWO_BYTE_STRING => "TwoByteString",
        BEGIN_OBJECT => "BeginObject",
        END_OBJECT => "EndObject",
        BEGIN_DENSE_ARRAY => "BeginDenseArray",
        END_DENSE_ARRAY => "EndDenseArray",
        BEGIN_SPARSE_ARRAY => "BeginSparseArray",
        END_SPARSE_ARRAY => "EndSparseArray",
        HOLE => "Hole",
        OBJECT_REFERENCE => "ObjectReference",
        BEGIN_MAP => "BeginMap",
        END_MAP => "EndMap",
        BEGIN_SET => "BeginSet",
        END_SET => "EndSet",
        ARRAY_BUFFER => "ArrayBuffer",
        RESIZABLE_ARRAY_BUFFER => "ResizableArrayBuffer",
        ARRAY_BUFFER_TRANSFER => "ArrayBufferTransfer",
        SHARED_ARRAY_BUFFER => "SharedArrayBuffer",
        TYPED_ARRAY => "TypedArray",
        REGEXP => "RegExp",
        NUMBER_OBJECT => "NumberObject",
        BIGINT_OBJECT => "BigIntObject",
        TRUE_OBJECT => "TrueObject",
        FALSE_OBJECT => "FalseObject",
        STRING_OBJECT => "StringObject",
        ERROR => "Error",
        PADDING => "Padding",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_match_wire_values() {
        assert_eq!(NULL, 0x30);
        assert_eq!(UNDEFINED, 0x5f);
        assert_eq!(INT32, 0x49);
        assert_eq!(ONE_BYTE_STRING, 0x22);
        assert_eq!(TWO_BYTE_STRING, 0x63);
        assert_eq!(BEGIN_OBJECT, 0x6f);
        assert_eq!(END_OBJECT, 0x7b);
        assert_eq!(OBJECT_REFERENCE, 0x5e);
        assert_eq!(TYPED_ARRAY, 0x5c);
    }

    #[test]
    fn tag_name_known_and_unknown() {
        assert_eq!(tag_name(BEGIN_MAP), "BeginMap");
        assert_eq!(tag_name(0x01), "Unknown");
    }
}
