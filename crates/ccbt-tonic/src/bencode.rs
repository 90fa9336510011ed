//! Plain bencode implementation: byte-strings, integers, lists, and
//! dictionaries with byte-string keys. Dictionary keys are sorted
//! ascending by their raw bytes on emit, matching the reference
//! implementation's key ordering (sorted by bytes, not by decoded text).

use std::collections::BTreeMap;

use crate::error::{TonicError, TonicResult};

/// A decoded (or to-be-encoded) bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A bencoded integer (`i<digits>e`).
    Int(i64),
    /// A bencoded byte-string (`<len>:<bytes>`).
    Bytes(Vec<u8>),
    /// A bencoded list (`l...e`).
    List(Vec<Value>),
    /// A bencoded dictionary (`d...e`) keyed by raw byte-strings.
    ///
    /// `BTreeMap<Vec<u8>, _>` orders keys lexicographically by byte value,
    /// which is exactly the ordering bencode requires on emit.
    Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
    /// Construct a byte-string value from anything convertible to bytes.
    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(value.into())
    }

    /// Construct a byte-string value from a UTF-8 string.
    #[must_use]
    pub fn string(value: impl AsRef<str>) -> Self {
        Self::Bytes(value.as_ref().as_bytes().to_vec())
    }

    /// Borrow this value as a byte-string, if it is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow this value as a UTF-8 string, if it is a valid one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Borrow this value as an integer, if it is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow this value as a list, if it is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow this value as a dictionary, if it is one.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, Value>> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key in this value if it is a dictionary.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict().and_then(|map| map.get(key))
    }
}

/// Encode a value into its canonical bencode byte representation.
#[must_use]
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(map) => {
            out.push(b'd');
            // BTreeMap<Vec<u8>, _> iterates in ascending byte order already.
            for (key, val) in map {
                encode_into(&Value::Bytes(key.clone()), out);
                encode_into(val, out);
            }
            out.push(b'e');
        }
    }
}

/// Decode a complete bencode value from a byte slice.
///
/// # Errors
///
/// Returns [`TonicError::MalformedBencode`] if the input is truncated,
/// contains trailing garbage, or does not conform to the bencode grammar.
pub fn decode(input: &[u8]) -> TonicResult<Value> {
    let mut cursor = 0usize;
    let value = decode_value(input, &mut cursor)?;
    if cursor != input.len() {
        return Err(TonicError::MalformedBencode { offset: cursor });
    }
    Ok(value)
}

fn decode_value(input: &[u8], cursor: &mut usize) -> TonicResult<Value> {
    match input.get(*cursor) {
        Some(b'i') => decode_int(input, cursor),
        Some(b'l') => decode_list(input, cursor),
        Some(b'd') => decode_dict(input, cursor),
        Some(c) if c.is_ascii_digit() => decode_bytes(input, cursor),
        _ => Err(TonicError::MalformedBencode { offset: *cursor }),
    }
}

fn take_until(input: &[u8], cursor: &mut usize, delim: u8) -> TonicResult<Vec<u8>> {
    let start = *cursor;
    while let Some(&b) = input.get(*cursor) {
        if b == delim {
            let slice = input[start..*cursor].to_vec();
            *cursor += 1;
            return Ok(slice);
        }
        *cursor += 1;
    }
    Err(TonicError::MalformedBencode { offset: start })
}

fn decode_int(input: &[u8], cursor: &mut usize) -> TonicResult<Value> {
    let start = *cursor;
    *cursor += 1; // consume 'i'
    let digits = take_until(input, cursor, b'e')?;
    let text = std::str::from_utf8(&digits).map_err(|_| TonicError::MalformedBencode {
        offset: start,
    })?;
    let n: i64 = text
        .parse()
        .map_err(|_| TonicError::MalformedBencode { offset: start })?;
    Ok(Value::Int(n))
}

fn decode_bytes(input: &[u8], cursor: &mut usize) -> TonicResult<Value> {
    let start = *cursor;
    let len_digits = take_until(input, cursor, b':')?;
    let len_text =
        std::str::from_utf8(&len_digits).map_err(|_| TonicError::MalformedBencode { offset: start })?;
    let len: usize = len_text
        .parse()
        .map_err(|_| TonicError::MalformedBencode { offset: start })?;
    let end = cursor
        .checked_add(len)
        .ok_or(TonicError::MalformedBencode { offset: start })?;
    let bytes = input
        .get(*cursor..end)
        .ok_or(TonicError::MalformedBencode { offset: start })?
        .to_vec();
    *cursor = end;
    Ok(Value::Bytes(bytes))
}

fn decode_list(input: &[u8], cursor: &mut usize) -> TonicResult<Value> {
    *cursor += 1; // consume 'l'
    let mut items = Vec::new();
    loop {
        match input.get(*cursor) {
            Some(b'e') => {
                *cursor += 1;
                return Ok(Value::List(items));
            }
            Some(_) => items.push(decode_value(input, cursor)?),
            None => return Err(TonicError::MalformedBencode { offset: *cursor }),
        }
    }
}

fn decode_dict(input: &[u8], cursor: &mut usize) -> TonicResult<Value> {
    *cursor += 1; // consume 'd'
    let mut map = BTreeMap::new();
    loop {
        match input.get(*cursor) {
            Some(b'e') => {
                *cursor += 1;
                return Ok(Value::Dict(map));
            }
            Some(_) => {
                let key = match decode_bytes(input, cursor)? {
                    Value::Bytes(k) => k,
                    _ => unreachable!("decode_bytes always returns Value::Bytes"),
                };
                let value = decode_value(input, cursor)?;
                map.insert(key, value);
            }
            None => return Err(TonicError::MalformedBencode { offset: *cursor }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars() {
        assert_eq!(decode(&encode(&Value::Int(-42))).unwrap(), Value::Int(-42));
        assert_eq!(
            decode(&encode(&Value::bytes(*b"hello"))).unwrap(),
            Value::bytes(*b"hello")
        );
    }

    #[test]
    fn dict_keys_emit_in_byte_order() {
        let mut map = BTreeMap::new();
        map.insert(b"z".to_vec(), Value::Int(1));
        map.insert(b"a".to_vec(), Value::Int(2));
        map.insert(b"m".to_vec(), Value::Int(3));
        let encoded = encode(&Value::Dict(map));
        assert_eq!(encoded, b"d1:ai2e1:mi3e1:zi1ee");
    }

    #[test]
    fn decodes_nested_structures() {
        let encoded = b"d4:listl1:a1:be4:dictd3:keyi7eee";
        let decoded = decode(encoded).unwrap();
        let dict = decoded.as_dict().unwrap();
        assert_eq!(
            dict.get(b"list".as_slice()).unwrap().as_list().unwrap().len(),
            2
        );
        assert_eq!(
            dict.get(b"dict".as_slice())
                .unwrap()
                .get(b"key")
                .unwrap()
                .as_int(),
            Some(7)
        );
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(decode(b"i42").is_err());
        assert!(decode(b"5:ab").is_err());
        assert!(decode(b"l1:ae extra").is_err());
    }
}
