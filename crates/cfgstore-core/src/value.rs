//! Typed configuration values and record variables

use crate::errors::{CfgError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Type tag of a variable value
///
/// The numeric tag is what the codec writes into each chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Bool,
    String,
    Ipv4Addr,
    Ipv4Prefix,
    Ipv6Addr,
    MacAddr,
}

impl ValueType {
    pub fn tag(&self) -> u16 {
        match self {
            ValueType::Int32 => 1,
            ValueType::Int64 => 2,
            ValueType::UInt32 => 3,
            ValueType::UInt64 => 4,
            ValueType::Bool => 5,
            ValueType::String => 6,
            ValueType::Ipv4Addr => 7,
            ValueType::Ipv4Prefix => 8,
            ValueType::Ipv6Addr => 9,
            ValueType::MacAddr => 10,
        }
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        let ty = match tag {
            1 => ValueType::Int32,
            2 => ValueType::Int64,
            3 => ValueType::UInt32,
            4 => ValueType::UInt64,
            5 => ValueType::Bool,
            6 => ValueType::String,
            7 => ValueType::Ipv4Addr,
            8 => ValueType::Ipv4Prefix,
            9 => ValueType::Ipv6Addr,
            10 => ValueType::MacAddr,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical key-spec name
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::UInt32 => "uint32",
            ValueType::UInt64 => "uint64",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Ipv4Addr => "ipv4addr",
            ValueType::Ipv4Prefix => "ipv4prefix",
            ValueType::Ipv6Addr => "ipv6addr",
            ValueType::MacAddr => "macaddr",
        }
    }

    /// Parse a key-spec type name, accepting the legacy aliases
    pub fn from_name(name: &str) -> Result<Self> {
        let ty = match name {
            "int32" | "int" => ValueType::Int32,
            "int64" | "long" => ValueType::Int64,
            "uint32" => ValueType::UInt32,
            "uint64" => ValueType::UInt64,
            "bool" | "boolean" => ValueType::Bool,
            "string" => ValueType::String,
            "ipv4addr" => ValueType::Ipv4Addr,
            "ipv4prefix" => ValueType::Ipv4Prefix,
            "ipv6addr" => ValueType::Ipv6Addr,
            "macaddr" => ValueType::MacAddr,
            other => {
                return Err(CfgError::UnknownType {
                    name: other.to_string(),
                })
            }
        };
        Ok(ty)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    String(String),
    Ipv4Addr(Ipv4Addr),
    Ipv4Prefix(Ipv4Addr, u8),
    Ipv6Addr(Ipv6Addr),
    MacAddr([u8; 6]),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::UInt32(_) => ValueType::UInt32,
            Value::UInt64(_) => ValueType::UInt64,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::Ipv4Addr(_) => ValueType::Ipv4Addr,
            Value::Ipv4Prefix(_, _) => ValueType::Ipv4Prefix,
            Value::Ipv6Addr(_) => ValueType::Ipv6Addr,
            Value::MacAddr(_) => ValueType::MacAddr,
        }
    }

    /// Parse the text form of a value of type `ty`
    ///
    /// Text forms are the ones produced by `Display`, so document bodies
    /// parse back to the value they were rendered from.
    pub fn parse(ty: ValueType, text: &str) -> Result<Self> {
        let invalid = || CfgError::InvalidValue {
            type_name: ty.name().to_string(),
            text: text.to_string(),
        };
        let trimmed = text.trim();
        let value = match ty {
            ValueType::Int32 => Value::Int32(trimmed.parse().map_err(|_| invalid())?),
            ValueType::Int64 => Value::Int64(trimmed.parse().map_err(|_| invalid())?),
            ValueType::UInt32 => Value::UInt32(trimmed.parse().map_err(|_| invalid())?),
            ValueType::UInt64 => Value::UInt64(trimmed.parse().map_err(|_| invalid())?),
            ValueType::Bool => match trimmed {
                "true" | "on" | "1" => Value::Bool(true),
                "false" | "off" | "0" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            ValueType::String => Value::String(text.to_string()),
            ValueType::Ipv4Addr => {
                Value::Ipv4Addr(Ipv4Addr::from_str(trimmed).map_err(|_| invalid())?)
            }
            ValueType::Ipv4Prefix => {
                let (addr, len) = trimmed.split_once('/').ok_or_else(invalid)?;
                let addr = Ipv4Addr::from_str(addr).map_err(|_| invalid())?;
                let len: u8 = len.parse().map_err(|_| invalid())?;
                if len > 32 {
                    return Err(invalid());
                }
                Value::Ipv4Prefix(addr, len)
            }
            ValueType::Ipv6Addr => {
                Value::Ipv6Addr(Ipv6Addr::from_str(trimmed).map_err(|_| invalid())?)
            }
            ValueType::MacAddr => {
                let mut mac = [0u8; 6];
                let mut parts = trimmed.split(':');
                for byte in mac.iter_mut() {
                    let part = parts.next().ok_or_else(invalid)?;
                    if part.len() != 2 {
                        return Err(invalid());
                    }
                    *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
                }
                if parts.next().is_some() {
                    return Err(invalid());
                }
                Value::MacAddr(mac)
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Ipv4Addr(v) => write!(f, "{}", v),
            Value::Ipv4Prefix(addr, len) => write!(f, "{}/{}", addr, len),
            Value::Ipv6Addr(v) => write!(f, "{}", v),
            Value::MacAddr(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
        }
    }
}

/// One named, typed value of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    /// Part of the identity of the list entry this record belongs to
    pub unique: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            unique: false,
        }
    }

    pub fn unique(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            unique: true,
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Value::String(value.into()))
    }
}

/// Find the first variable with the given name
pub fn find_var<'a>(vars: &'a [Variable], name: &str) -> Option<&'a Variable> {
    vars.iter().find(|v| v.name == name)
}

/// Merge `update` into `base`
///
/// A variable of `update` replaces the first same-named variable of `base`.
/// Names not present in `base` are appended in `update` order.
pub fn merge_vars(base: &mut Vec<Variable>, update: &[Variable]) {
    for var in update {
        match base.iter_mut().find(|v| v.name == var.name) {
            Some(existing) => *existing = var.clone(),
            None => base.push(var.clone()),
        }
    }
}

/// Order-insensitive equality of two variable lists
pub fn same_var_set(a: &[Variable], b: &[Variable]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&Variable> = a.iter().collect();
    let mut b: Vec<&Variable> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_aliases() {
        assert_eq!(ValueType::from_name("int").unwrap(), ValueType::Int32);
        assert_eq!(ValueType::from_name("long").unwrap(), ValueType::Int64);
        assert_eq!(ValueType::from_name("boolean").unwrap(), ValueType::Bool);
        assert!(matches!(
            ValueType::from_name("float"),
            Err(CfgError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_tag_round_trip() {
        for tag in 1..=10 {
            let ty = ValueType::from_tag(tag).unwrap();
            assert_eq!(ty.tag(), tag);
        }
        assert!(ValueType::from_tag(0).is_none());
        assert!(ValueType::from_tag(11).is_none());
    }

    #[test]
    fn test_parse_display_agree() {
        let cases = [
            (ValueType::Int32, "-42"),
            (ValueType::UInt64, "18446744073709551615"),
            (ValueType::Bool, "true"),
            (ValueType::Ipv4Addr, "10.0.0.1"),
            (ValueType::Ipv4Prefix, "192.168.0.0/16"),
            (ValueType::Ipv6Addr, "fe80::1"),
            (ValueType::MacAddr, "00:1b:21:3a:4f:9e"),
            (ValueType::String, "eth0"),
        ];
        for (ty, text) in cases {
            let value = Value::parse(ty, text).unwrap();
            assert_eq!(value.value_type(), ty);
            assert_eq!(value.to_string(), text);
        }
    }

    #[test]
    fn test_parse_rejects_bad_text() {
        assert!(Value::parse(ValueType::Int32, "forty").is_err());
        assert!(Value::parse(ValueType::Ipv4Prefix, "10.0.0.0/33").is_err());
        assert!(Value::parse(ValueType::MacAddr, "00:11:22:33:44").is_err());
        assert!(Value::parse(ValueType::Bool, "maybe").is_err());
    }

    #[test]
    fn test_merge_replaces_and_appends() {
        let mut base = vec![Variable::string("name", "eth0"), Variable::string("mtu", "1500")];
        merge_vars(
            &mut base,
            &[Variable::string("mtu", "9000"), Variable::string("desc", "uplink")],
        );
        assert_eq!(
            base,
            vec![
                Variable::string("name", "eth0"),
                Variable::string("mtu", "9000"),
                Variable::string("desc", "uplink"),
            ]
        );
    }

    #[test]
    fn test_same_var_set_ignores_order() {
        let a = vec![Variable::string("a", "1"), Variable::string("b", "2")];
        let b = vec![Variable::string("b", "2"), Variable::string("a", "1")];
        assert!(same_var_set(&a, &b));
        assert!(!same_var_set(&a, &b[..1]));
    }
}
