use super::unique_scope::{UniqueScope, UniqueStack};
use super::MappingReport;
use crate::codec;
use crate::document::{Document, NodeId};
use crate::errors::{CfgError, ExError, ExErrorKind};
use crate::keylang;
use crate::schema::{SchemaEntry, SchemaIndex};
use crate::store::{compile_scan, write_vars, Datastore, MemoryStore, StoreResult};
use crate::value::{same_var_set, Value, Variable};

/// Write the records described by `doc` into `store`
///
/// List entries are upserted: an entry whose unique variables equal those of
/// a stored entry reuses its index, otherwise the lowest free index is taken.
///
/// # Errors
///
/// Fails with `WriteFailure` when the store rejects a write; records
/// written before the failure stay in the store.
pub fn from_document(
    doc: &Document,
    schema: &SchemaIndex,
    store: &mut dyn Datastore,
) -> StoreResult<MappingReport> {
    let mut walker = Walker {
        doc,
        schema,
        store,
        report: MappingReport::default(),
    };
    let mut stack = UniqueStack::new();
    walker.children(doc.root(), "", "", None, &mut stack)?;
    Ok(walker.report)
}

/// Flatten a document into decoded records, ordered by key
pub fn document_to_records(
    doc: &Document,
    schema: &SchemaIndex,
) -> StoreResult<(Vec<(String, Vec<Variable>)>, MappingReport)> {
    let mut store = MemoryStore::new("document");
    let report = from_document(doc, schema, &mut store)?;
    let mut records = Vec::new();
    for (key, bytes) in store.records()? {
        let vars = codec::decode(&bytes).map_err(ExError::from)?;
        records.push((key, vars));
    }
    Ok((records, report))
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

struct Walker<'a> {
    doc: &'a Document,
    schema: &'a SchemaIndex,
    store: &'a mut dyn Datastore,
    report: MappingReport,
}

impl Walker<'_> {
    /// Visit the element children of `node`, skipping the ones `entry`
    /// declares as variables
    fn children(
        &mut self,
        node: NodeId,
        key: &str,
        pattern: &str,
        entry: Option<&SchemaEntry>,
        stack: &mut UniqueStack,
    ) -> StoreResult<()> {
        let doc = self.doc;
        for child in doc.child_elements(node) {
            let name = doc.name(child);
            if doc.is_leaf(child) && entry.is_some_and(|e| e.var(name).is_some()) {
                continue;
            }
            self.element(child, key, pattern, stack)?;
        }
        Ok(())
    }

    fn element(
        &mut self,
        node: NodeId,
        key_prefix: &str,
        pattern_prefix: &str,
        stack: &mut UniqueStack,
    ) -> StoreResult<()> {
        let name = self.doc.name(node);
        let key = join(key_prefix, name);
        let pattern = join(pattern_prefix, name);
        let schema = self.schema;

        if let Some(entry) = schema.get(&pattern) {
            let vars = match self.leaf_vars(node, &key, entry, stack.vars()) {
                Some(vars) => vars,
                None => return Ok(()),
            };
            self.write(&key, &vars)?;
            return self.children(node, &key, &pattern, Some(entry), stack);
        }

        let list_pattern = format!("{}{}", pattern, keylang::LIST_MARKER);
        let list_entry = schema.get(&list_pattern);
        if list_entry.is_some() || schema.has_descendants(&list_pattern) {
            return self.list_entry(node, &key, &list_pattern, list_entry, stack);
        }

        if schema.has_descendants(&pattern) {
            return self.children(node, &key, &pattern, None, stack);
        }

        self.report.warn(&key, CfgError::SchemaNotFound { key: key.clone() });
        Ok(())
    }

    fn list_entry(
        &mut self,
        node: NodeId,
        list_key: &str,
        pattern: &str,
        entry: Option<&SchemaEntry>,
        stack: &mut UniqueStack,
    ) -> StoreResult<()> {
        let mut identity = Vec::new();
        for spec in entry
            .into_iter()
            .flat_map(|e| e.unique_vars())
            .filter(|s| !stack.contains(&s.name))
        {
            let Some(text) = self.doc.child_body(node, &spec.name) else {
                let err = CfgError::MissingUniqueVariable {
                    key: list_key.to_string(),
                    variable: spec.name.clone(),
                };
                self.report.warn(list_key, err);
                return Ok(());
            };
            match Value::parse(spec.ty, text) {
                Ok(value) => identity.push(Variable::unique(spec.name.clone(), value)),
                Err(e) => {
                    self.report.warn(list_key, mismatch(list_key, &spec.name, e));
                    return Ok(());
                }
            }
        }

        let mut scope = UniqueScope::push(stack, identity);
        let index = self.allocate_index(list_key, scope.vars())?;
        let key = format!("{}.{}", list_key, index);
        if let Some(entry) = entry {
            let Some(vars) = self.leaf_vars(node, &key, entry, scope.vars()) else {
                return Ok(());
            };
            self.write(&key, &vars)?;
        }
        self.children(node, &key, pattern, entry, &mut scope)
    }

    /// Inherited unique variables followed by the declared leaf children in
    /// document order
    ///
    /// Returns `None` when a leaf does not parse as its declared type.
    fn leaf_vars(
        &mut self,
        node: NodeId,
        key: &str,
        entry: &SchemaEntry,
        inherited: &[Variable],
    ) -> Option<Vec<Variable>> {
        let doc = self.doc;
        let mut vars = inherited.to_vec();
        for child in doc.child_elements(node) {
            let name = doc.name(child);
            let (Some(spec), Some(text)) = (entry.var(name), doc.body(child)) else {
                continue;
            };
            if !doc.is_leaf(child) || inherited.iter().any(|v| v.name == name) {
                continue;
            }
            match Value::parse(spec.ty, text) {
                Ok(value) => vars.push(Variable {
                    name: name.to_string(),
                    value,
                    unique: spec.unique,
                }),
                Err(e) => {
                    self.report.warn(key, mismatch(key, name, e));
                    return None;
                }
            }
        }
        Some(vars)
    }

    /// Index of the stored entry with the same unique set, else the lowest
    /// free one
    fn allocate_index(&mut self, list_key: &str, identity: &[Variable]) -> StoreResult<u64> {
        let re = compile_scan(&keylang::entries_regex(list_key)).map_err(ExError::from)?;
        let mut taken = Vec::new();
        for (key, bytes) in self.store.scan(&re)? {
            let Some(index) = key
                .rsplit('.')
                .next()
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            let Ok(vars) = codec::decode(&bytes) else {
                taken.push(index);
                continue;
            };
            let uniques: Vec<Variable> = vars.into_iter().filter(|v| v.unique).collect();
            if same_var_set(&uniques, identity) {
                return Ok(index);
            }
            taken.push(index);
        }
        taken.sort_unstable();
        let mut free = 0;
        for index in taken {
            if index == free {
                free += 1;
            } else if index > free {
                break;
            }
        }
        Ok(free)
    }

    fn write(&mut self, key: &str, vars: &[Variable]) -> StoreResult<()> {
        write_vars(&mut *self.store, key, vars).map_err(|e| {
            ExError::new(ExErrorKind::WriteFailure)
                .with_op("from_document")
                .with_key(key)
                .with_message(format!("failed to write {}", key))
                .with_source(e)
        })?;
        self.report.mapped += 1;
        Ok(())
    }
}

fn mismatch(key: &str, variable: &str, err: CfgError) -> CfgError {
    CfgError::SchemaMismatch {
        key: key.to_string(),
        variable: variable.to_string(),
        reason: err.to_string(),
    }
}
