//! Record value codec
//!
//! A record value is a sequence of chunks, each a 4 byte header (type tag,
//! payload length; both big-endian u16) followed by the payload. Every
//! variable takes two consecutive chunks: a string chunk holding the name,
//! prefixed with `!` when the variable is unique, then the typed value.
//!
//! Decoding is strict: a stream that does not split into whole chunks, has an
//! odd chunk count, or places a non-string chunk in a name position is
//! rejected with `MalformedEncoding`. Callers treat such a record as absent.

use crate::errors::{CfgError, Result};
use crate::value::{Value, ValueType, Variable};
use std::net::{Ipv4Addr, Ipv6Addr};

const HEADER_LEN: usize = 4;
const UNIQUE_PREFIX: u8 = b'!';

/// Encode variables into a record value, preserving their order
///
/// Names must be non-empty and must not start with `!` or contain NUL, since
/// neither would decode back to the same variable.
pub fn encode(vars: &[Variable]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for var in vars {
        check_name(&var.name)?;
        let mut name = Vec::with_capacity(var.name.len() + 1);
        if var.unique {
            name.push(UNIQUE_PREFIX);
        }
        name.extend_from_slice(var.name.as_bytes());
        push_chunk(&mut out, ValueType::String.tag(), &name)?;
        push_chunk(&mut out, var.value.value_type().tag(), &encode_value(&var.value))?;
    }
    Ok(out)
}

/// Decode a record value
pub fn decode(bytes: &[u8]) -> Result<Vec<Variable>> {
    let chunks = split_chunks(bytes)?;
    if chunks.len() % 2 != 0 {
        return Err(malformed(format!(
            "odd chunk count {}: every name needs a value",
            chunks.len()
        )));
    }
    let mut vars = Vec::with_capacity(chunks.len() / 2);
    for pair in chunks.chunks_exact(2) {
        let (name_tag, name_bytes) = pair[0];
        let (value_tag, value_bytes) = pair[1];
        if name_tag != ValueType::String.tag() {
            return Err(malformed(format!(
                "name chunk has type tag {}, expected string",
                name_tag
            )));
        }
        let name = decode_string(name_bytes.strip_suffix(&[0]).unwrap_or(name_bytes))?;
        let (unique, name) = match name.strip_prefix('!') {
            Some(rest) => (true, rest.to_string()),
            None => (false, name),
        };
        if name.is_empty() {
            return Err(malformed("empty variable name".to_string()));
        }
        let ty = ValueType::from_tag(value_tag)
            .ok_or_else(|| malformed(format!("unknown value type tag {}", value_tag)))?;
        let value = decode_value(ty, value_bytes)?;
        vars.push(Variable {
            name,
            value,
            unique,
        });
    }
    Ok(vars)
}

fn malformed(reason: String) -> CfgError {
    CfgError::MalformedEncoding { reason }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(malformed("empty variable name".to_string()));
    }
    if name.as_bytes()[0] == UNIQUE_PREFIX || name.contains('\0') {
        return Err(malformed(format!(
            "variable name {:?} starts with '!' or contains NUL",
            name
        )));
    }
    Ok(())
}

fn push_chunk(out: &mut Vec<u8>, tag: u16, payload: &[u8]) -> Result<()> {
    let len = u16::try_from(payload.len()).map_err(|_| {
        malformed(format!(
            "chunk of {} bytes exceeds the {} byte limit",
            payload.len(),
            u16::MAX
        ))
    })?;
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

fn split_chunks(bytes: &[u8]) -> Result<Vec<(u16, &[u8])>> {
    let mut chunks = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        if rest.len() < HEADER_LEN {
            return Err(malformed(format!(
                "truncated chunk header ({} trailing bytes)",
                rest.len()
            )));
        }
        let tag = u16::from_be_bytes([rest[0], rest[1]]);
        let len = usize::from(u16::from_be_bytes([rest[2], rest[3]]));
        let body = &rest[HEADER_LEN..];
        if body.len() < len {
            return Err(malformed(format!(
                "chunk declares {} bytes but only {} remain",
                len,
                body.len()
            )));
        }
        chunks.push((tag, &body[..len]));
        rest = &body[len..];
    }
    Ok(chunks)
}

fn encode_value(value: &Value) -> Vec<u8> {
    match value {
        Value::Int32(v) => v.to_be_bytes().to_vec(),
        Value::Int64(v) => v.to_be_bytes().to_vec(),
        Value::UInt32(v) => v.to_be_bytes().to_vec(),
        Value::UInt64(v) => v.to_be_bytes().to_vec(),
        Value::Bool(v) => vec![u8::from(*v)],
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Ipv4Addr(a) => a.octets().to_vec(),
        Value::Ipv4Prefix(a, len) => {
            let mut out = a.octets().to_vec();
            out.push(*len);
            out
        }
        Value::Ipv6Addr(a) => a.octets().to_vec(),
        Value::MacAddr(m) => m.to_vec(),
    }
}

fn fixed<const N: usize>(ty: ValueType, bytes: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| {
        malformed(format!(
            "{} value needs {} bytes, got {}",
            ty,
            N,
            bytes.len()
        ))
    })
}

fn decode_value(ty: ValueType, bytes: &[u8]) -> Result<Value> {
    let value = match ty {
        ValueType::Int32 => Value::Int32(i32::from_be_bytes(fixed(ty, bytes)?)),
        ValueType::Int64 => Value::Int64(i64::from_be_bytes(fixed(ty, bytes)?)),
        ValueType::UInt32 => Value::UInt32(u32::from_be_bytes(fixed(ty, bytes)?)),
        ValueType::UInt64 => Value::UInt64(u64::from_be_bytes(fixed(ty, bytes)?)),
        ValueType::Bool => {
            let [b] = fixed::<1>(ty, bytes)?;
            Value::Bool(b != 0)
        }
        ValueType::String => Value::String(decode_string(bytes)?),
        ValueType::Ipv4Addr => Value::Ipv4Addr(Ipv4Addr::from(fixed::<4>(ty, bytes)?)),
        ValueType::Ipv4Prefix => {
            let raw = fixed::<5>(ty, bytes)?;
            if raw[4] > 32 {
                return Err(malformed(format!("ipv4 prefix length {} > 32", raw[4])));
            }
            Value::Ipv4Prefix(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]), raw[4])
        }
        ValueType::Ipv6Addr => Value::Ipv6Addr(Ipv6Addr::from(fixed::<16>(ty, bytes)?)),
        ValueType::MacAddr => Value::MacAddr(fixed::<6>(ty, bytes)?),
    };
    Ok(value)
}

fn decode_string(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| malformed(format!("invalid utf-8: {}", e)))
}
