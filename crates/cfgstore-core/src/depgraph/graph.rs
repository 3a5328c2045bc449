use super::hooks::{HookBinding, Phase};
use crate::diff::{Diff, DiffEntry};
use crate::errors::{CfgError, Result};
use crate::keylang;
use crate::value::Variable;
use regex::Regex;
use std::collections::HashSet;

/// Weight given to descriptors registered without one
pub const UNWEIGHTED: u16 = u16::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepHandle(u64);

/// Granularity of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepType {
    /// One invocation per matching diff entry
    #[default]
    Key,
    /// One invocation per distinct matched key prefix
    Tree,
}

/// A dependency key pattern with an optional variable filter
///
/// Written `pattern[:regex]`; with a filter an entry matches only if one of
/// its variables on either side has a name matching the regex.
#[derive(Debug, Clone)]
pub struct DepPattern {
    pub key: String,
    pub var_filter: Option<Regex>,
}

impl DepPattern {
    pub fn parse(text: &str) -> Result<Self> {
        let (key, filter) = match text.split_once(':') {
            Some((key, filter)) => (key, Some(filter)),
            None => (text, None),
        };
        if key.is_empty() {
            return Err(CfgError::MalformedKey {
                key: text.to_string(),
                reason: "empty dependency pattern".to_string(),
            });
        }
        let var_filter = filter
            .map(|f| {
                Regex::new(f).map_err(|e| CfgError::InvalidRegex {
                    pattern: f.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self {
            key: key.to_string(),
            var_filter,
        })
    }

    fn filter_passes(&self, entry: &DiffEntry) -> bool {
        let Some(re) = &self.var_filter else {
            return true;
        };
        let names = |vars: &Option<Vec<Variable>>| {
            vars.iter().flatten().any(|v| re.is_match(&v.name))
        };
        names(&entry.vars1) || names(&entry.vars2)
    }
}

/// A plugin's registered interest in a set of key patterns
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub handle: DepHandle,
    pub plugin: String,
    pub patterns: Vec<DepPattern>,
    pub weight: Option<u16>,
    pub dep_type: DepType,
    pub binding: HookBinding,
}

impl Descriptor {
    pub fn effective_weight(&self) -> u16 {
        self.weight.unwrap_or(UNWEIGHTED)
    }
}

/// One hook invocation resolved from a diff
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub descriptor: &'a Descriptor,
    pub entry: &'a DiffEntry,
    pub matched_key1: Option<String>,
    pub matched_key2: Option<String>,
}

#[derive(Debug, Default)]
pub struct DepGraph {
    descriptors: Vec<Descriptor>,
    next_handle: u64,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor
    ///
    /// # Errors
    ///
    /// Fails if a pattern is empty or its variable filter is not a valid
    /// regular expression.
    pub fn register(
        &mut self,
        plugin: &str,
        patterns: &[&str],
        weight: Option<u16>,
        dep_type: DepType,
        binding: HookBinding,
    ) -> Result<DepHandle> {
        let patterns = patterns
            .iter()
            .map(|p| DepPattern::parse(p))
            .collect::<Result<Vec<_>>>()?;
        let handle = DepHandle(self.next_handle);
        self.next_handle += 1;
        tracing::debug!(
            plugin,
            weight = weight.unwrap_or(UNWEIGHTED),
            patterns = patterns.len(),
            "dependency registered"
        );
        self.descriptors.push(Descriptor {
            handle,
            plugin: plugin.to_string(),
            patterns,
            weight,
            dep_type,
            binding,
        });
        Ok(handle)
    }

    pub fn unregister(&mut self, handle: DepHandle) -> bool {
        let before = self.descriptors.len();
        self.descriptors.retain(|d| d.handle != handle);
        before != self.descriptors.len()
    }

    /// Remove every descriptor of a plugin, returning how many were removed
    pub fn unregister_plugin(&mut self, plugin: &str) -> usize {
        let before = self.descriptors.len();
        self.descriptors.retain(|d| d.plugin != plugin);
        before - self.descriptors.len()
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Every (descriptor, entry) match for `phase`, by ascending weight
    ///
    /// An entry is matched on `key1` when it exists in the first store and
    /// on `key2` otherwise. Each descriptor pairs with an entry at most once;
    /// a tree descriptor pairs once per matched prefix.
    pub fn resolve<'a>(&'a self, diff: &'a Diff, phase: Phase) -> Vec<Invocation<'a>> {
        let mut out = Vec::new();
        for desc in self.descriptors.iter().filter(|d| d.binding.serves(phase)) {
            let mut seen_prefixes: HashSet<&str> = HashSet::new();
            for entry in diff {
                let key = entry.key();
                let Some((pattern, len)) = desc.patterns.iter().find_map(|p| {
                    keylang::dep_match(key, &p.key)
                        .filter(|_| p.filter_passes(entry))
                        .map(|len| (p, len))
                }) else {
                    continue;
                };
                let invocation = match desc.dep_type {
                    DepType::Key => Invocation {
                        descriptor: desc,
                        entry,
                        matched_key1: entry.key1.clone(),
                        matched_key2: entry.key2.clone(),
                    },
                    DepType::Tree => {
                        if !seen_prefixes.insert(&key[..len]) {
                            continue;
                        }
                        let prefix = |k: &Option<String>| {
                            k.as_deref().map(|k| match keylang::dep_match(k, &pattern.key) {
                                Some(n) => k[..n].to_string(),
                                None => k.to_string(),
                            })
                        };
                        Invocation {
                            descriptor: desc,
                            entry,
                            matched_key1: prefix(&entry.key1),
                            matched_key2: prefix(&entry.key2),
                        }
                    }
                };
                out.push(invocation);
            }
        }
        out.sort_by_key(|inv| inv.descriptor.effective_weight());
        out
    }
}
