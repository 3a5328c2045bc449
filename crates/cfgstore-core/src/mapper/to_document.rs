use super::MappingReport;
use crate::codec;
use crate::document::{Document, NodeId};
use crate::errors::{CfgError, Result};
use crate::keylang;
use crate::schema::SchemaIndex;
use crate::store::{Datastore, StoreResult};
use crate::value::{find_var, Variable};
use std::cmp::Ordering;

/// Build the document of everything in `store`
///
/// Records that fail to decode count as absent and are reported.
pub fn to_document(
    store: &dyn Datastore,
    schema: &SchemaIndex,
) -> StoreResult<(Document, MappingReport)> {
    let mut report = MappingReport::default();
    let mut records = Vec::new();
    for (key, bytes) in store.records()? {
        match codec::decode(&bytes) {
            Ok(vars) => records.push((key, vars)),
            Err(e) => report.warn(&key, e),
        }
    }
    let doc = build(&records, schema, &mut report);
    Ok((doc, report))
}

/// Build a document from decoded records
pub fn records_to_document(
    records: &[(String, Vec<Variable>)],
    schema: &SchemaIndex,
) -> (Document, MappingReport) {
    let mut report = MappingReport::default();
    let doc = build(records, schema, &mut report);
    (doc, report)
}

fn build(
    records: &[(String, Vec<Variable>)],
    schema: &SchemaIndex,
    report: &mut MappingReport,
) -> Document {
    let mut ordered: Vec<&(String, Vec<Variable>)> = records.iter().collect();
    ordered.sort_by(|a, b| key_order(&a.0, &b.0));

    let mut doc = Document::default();
    for (key, vars) in ordered {
        match place(&mut doc, schema, key, vars) {
            Ok(()) => report.mapped += 1,
            Err(e) => report.warn(key, e),
        }
    }
    doc
}

/// Shallow keys first; segments compare numerically when both are indices
fn key_order(a: &str, b: &str) -> Ordering {
    let (sa, sb) = (keylang::segments(a), keylang::segments(b));
    sa.len().cmp(&sb.len()).then_with(|| {
        for (x, y) in sa.iter().zip(&sb) {
            let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                (Ok(i), Ok(j)) => i.cmp(&j),
                _ => x.cmp(y),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    })
}

fn place(doc: &mut Document, schema: &SchemaIndex, key: &str, vars: &[Variable]) -> Result<()> {
    keylang::validate_key(key)?;
    if schema.lookup(key).is_none() {
        return Err(CfgError::SchemaNotFound {
            key: key.to_string(),
        });
    }

    let segs = keylang::segments(key);
    let mut node = doc.root();
    let mut pattern = String::new();
    // literal segment without its own schema entry, not yet in the tree
    let mut pending: Option<&str> = None;
    let mut placed_uniques: Vec<&str> = Vec::new();

    for (n, &seg) in segs.iter().enumerate() {
        if keylang::is_index_segment(seg) {
            pattern.push_str(keylang::LIST_MARKER);
        } else {
            if !pattern.is_empty() {
                pattern.push('.');
            }
            pattern.push_str(seg);
        }

        let Some(entry) = schema.get(&pattern) else {
            node = materialize(doc, node, pending.take());
            pending = Some(seg);
            continue;
        };

        if entry.is_list() {
            let (parent, name) = match pending.take() {
                Some(name) => (node, name),
                None => (
                    doc.parent(node).unwrap_or(doc.root()),
                    segs[..n].last().copied().unwrap_or(seg),
                ),
            };
            let mut identity = Vec::new();
            for spec in entry
                .unique_vars()
                .filter(|s| !placed_uniques.contains(&s.name.as_str()))
            {
                let var = find_var(vars, &spec.name).ok_or_else(|| {
                    CfgError::MissingUniqueVariable {
                        key: key.to_string(),
                        variable: spec.name.clone(),
                    }
                })?;
                identity.push(var);
            }
            node = match find_entry(doc, parent, name, &identity) {
                Some(existing) => existing,
                None => {
                    let created = doc.add_element(parent, name);
                    for var in &identity {
                        doc.add_leaf(created, &var.name, &var.value.to_string());
                    }
                    created
                }
            };
            placed_uniques.extend(identity.iter().map(|v| v.name.as_str()));
        } else {
            node = materialize(doc, node, pending.take());
            node = doc.find_or_create(node, seg);
        }
    }

    // repeats within this record are kept; only leaves placed by another
    // record for the same element count as duplicates
    let earlier: Vec<NodeId> = doc.child_elements(node).collect();
    for var in vars
        .iter()
        .filter(|v| !placed_uniques.contains(&v.name.as_str()))
    {
        let text = var.value.to_string();
        let duplicate = earlier
            .iter()
            .any(|&c| doc.name(c) == var.name && doc.body(c) == Some(text.as_str()));
        if !duplicate {
            doc.add_leaf(node, &var.name, &text);
        }
    }
    Ok(())
}

/// Put a pending literal segment into the tree; indices of unschema'd lists
/// are dropped
fn materialize(doc: &mut Document, node: NodeId, pending: Option<&str>) -> NodeId {
    match pending {
        Some(seg) if !keylang::is_index_segment(seg) => doc.find_or_create(node, seg),
        _ => node,
    }
}

/// The sibling named `name` whose unique leaves equal `identity`
fn find_entry(
    doc: &Document,
    parent: NodeId,
    name: &str,
    identity: &[&Variable],
) -> Option<NodeId> {
    doc.child_elements(parent).find(|&c| {
        doc.name(c) == name
            && identity
                .iter()
                .all(|v| doc.child_body(c, &v.name) == Some(v.value.to_string().as_str()))
    })
}
