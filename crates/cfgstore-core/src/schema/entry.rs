//! Schema entry and variable specification

use crate::keylang;
use crate::value::{Value, ValueType, Variable};
use std::fmt;

/// Declaration of one variable of a schema entry
#[derive(Debug, Clone, PartialEq)]
pub struct VarSpec {
    pub name: String,
    pub ty: ValueType,
    pub unique: bool,
    /// Default value, already checked against `ty`
    pub default: Option<Value>,
}

impl VarSpec {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            unique: false,
            default: None,
        }
    }

    pub fn unique(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            unique: true,
            ..Self::new(name, ty)
        }
    }
}

impl fmt::Display for VarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}{}", if self.unique { "!" } else { "" }, self.name)?;
        if self.ty != ValueType::String {
            write!(f, ":{}", self.ty)?;
        }
        if let Some(default) = &self.default {
            write!(f, "={}", default)?;
        }
        Ok(())
    }
}

/// Specification of every concrete key matching `pattern`
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    pub pattern: String,
    pub vars: Vec<VarSpec>,
}

impl SchemaEntry {
    pub fn new(pattern: impl Into<String>, vars: Vec<VarSpec>) -> Self {
        Self {
            pattern: pattern.into(),
            vars,
        }
    }

    /// Entries of this pattern are list entries (`a.b[]`)
    pub fn is_list(&self) -> bool {
        keylang::is_list_entry_pattern(&self.pattern)
    }

    pub fn var(&self, name: &str) -> Option<&VarSpec> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Identity variables, in declaration order
    pub fn unique_vars(&self) -> impl Iterator<Item = &VarSpec> {
        self.vars.iter().filter(|v| v.unique)
    }

    /// The values of this entry's unique variables found in `vars`
    ///
    /// Returns `None` when any unique variable is absent.
    pub fn identity_of(&self, vars: &[Variable]) -> Option<Vec<Value>> {
        self.unique_vars()
            .map(|spec| {
                vars.iter()
                    .find(|v| v.name == spec.name)
                    .map(|v| v.value.clone())
            })
            .collect()
    }
}

impl fmt::Display for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)?;
        for var in &self.vars {
            write!(f, " {}", var)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_key_spec_syntax() {
        let mut mtu = VarSpec::new("mtu", ValueType::Int32);
        mtu.default = Some(Value::Int32(1500));
        let entry = SchemaEntry::new(
            "interface[]",
            vec![VarSpec::unique("name", ValueType::String), mtu],
        );
        assert_eq!(entry.to_string(), "interface[] $!name $mtu:int32=1500");
        assert!(entry.is_list());
    }

    #[test]
    fn test_identity_requires_all_unique_vars() {
        let entry = SchemaEntry::new(
            "a[].b[]",
            vec![
                VarSpec::unique("a", ValueType::String),
                VarSpec::unique("b", ValueType::String),
                VarSpec::new("c", ValueType::String),
            ],
        );
        let full = vec![Variable::string("b", "2"), Variable::string("a", "1")];
        assert_eq!(
            entry.identity_of(&full),
            Some(vec![Value::String("1".into()), Value::String("2".into())])
        );
        assert_eq!(entry.identity_of(&full[..1]), None);
    }
}
