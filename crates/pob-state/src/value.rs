//! State cell values

use crate::{StateError, StateResult};
use std::fmt;

const TAG_NIL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_STR: u8 = 3;
const TAG_BYTES: u8 = 4;

/// Value stored under a (category, key).
///
/// `Nil` written into a layer is a tombstone: it hides any value below it and
/// deletes the key from the store when the root is flushed.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Absent / deleted
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer; balances use this variant
    Int(i128),
    /// UTF-8 string
    Str(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

impl Value {
    /// Type name, for errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Whether this is the tombstone
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Truthiness used by conditional jumps: nil, false, 0 and empty
    /// strings/bytes are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
        }
    }

    /// Tag byte followed by the payload. Integers are 16 bytes big endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::Nil => vec![TAG_NIL],
            Value::Bool(b) => vec![TAG_BOOL, u8::from(*b)],
            Value::Int(v) => {
                let mut bytes = Vec::with_capacity(17);
                bytes.push(TAG_INT);
                bytes.extend_from_slice(&v.to_be_bytes());
                bytes
            }
            Value::Str(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len());
                bytes.push(TAG_STR);
                bytes.extend_from_slice(s.as_bytes());
                bytes
            }
            Value::Bytes(b) => {
                let mut bytes = Vec::with_capacity(1 + b.len());
                bytes.push(TAG_BYTES);
                bytes.extend_from_slice(b);
                bytes
            }
        }
    }

    /// Inverse of [`Value::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> StateResult<Self> {
        let (tag, payload) = bytes
            .split_first()
            .ok_or_else(|| StateError::Decode("empty value".to_string()))?;
        match *tag {
            TAG_NIL if payload.is_empty() => Ok(Value::Nil),
            TAG_BOOL => match payload {
                [0] => Ok(Value::Bool(false)),
                [1] => Ok(Value::Bool(true)),
                _ => Err(StateError::Decode("bad bool payload".to_string())),
            },
            TAG_INT => {
                let arr: [u8; 16] = payload
                    .try_into()
                    .map_err(|_| StateError::Decode(format!("int payload of {} bytes", payload.len())))?;
                Ok(Value::Int(i128::from_be_bytes(arr)))
            }
            TAG_STR => String::from_utf8(payload.to_vec())
                .map(Value::Str)
                .map_err(|e| StateError::Decode(e.to_string())),
            TAG_BYTES => Ok(Value::Bytes(payload.to_vec())),
            other => Err(StateError::Decode(format!("unknown tag {other}"))),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "0x{}", hex_string(b)),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
