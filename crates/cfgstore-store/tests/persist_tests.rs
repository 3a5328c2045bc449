#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cfgstore_core::diff::diff;
use cfgstore_core::store::{read_vars, Datastore};
use cfgstore_store::{load_into, save_store, SqliteStore};
use common::*;
use tempfile::TempDir;

#[test]
fn test_save_then_load_reproduces_store() {
    let dir = TempDir::new().unwrap();
    let schema = schema();
    let mut running = SqliteStore::open("running", &dir.path().join("r.db")).unwrap();
    fill(&mut running, &sample_records());

    let file = dir.path().join("saved").join("running.json");
    let report = save_store(&running, &schema, &file).unwrap();
    assert!(report.is_clean());

    let mut candidate = SqliteStore::open("candidate", &dir.path().join("c.db")).unwrap();
    let report = load_into(&file, &schema, &mut candidate, true).unwrap();
    assert_eq!(report.mapped, sample_records().len());
    assert!(diff(&running, &candidate, &schema).unwrap().is_empty());
}

#[test]
fn test_load_without_replace_upserts_by_identity() {
    let dir = TempDir::new().unwrap();
    let schema = schema();
    let mut source = SqliteStore::open_in_memory("source").unwrap();
    fill(&mut source, &[("interface.0", interface("eth1", 1400))]);
    let file = dir.path().join("eth1.json");
    save_store(&source, &schema, &file).unwrap();

    let mut candidate = SqliteStore::open_in_memory("candidate").unwrap();
    fill(&mut candidate, &sample_records());
    load_into(&file, &schema, &mut candidate, false).unwrap();

    // eth1 keeps its index; nothing else is touched
    assert_eq!(candidate.len().unwrap(), sample_records().len());
    assert_eq!(
        read_vars(&candidate, "interface.1").unwrap(),
        Some(interface("eth1", 1400))
    );
    assert_eq!(
        read_vars(&candidate, "interface.0").unwrap(),
        Some(interface("eth0", 1500))
    );
}

#[test]
fn test_load_with_replace_drops_absent_records() {
    let dir = TempDir::new().unwrap();
    let schema = schema();
    let mut source = SqliteStore::open_in_memory("source").unwrap();
    fill(&mut source, &[("system.hostname", vec![cfgstore_core::Variable::string("name", "x")])]);
    let file = dir.path().join("host.json");
    save_store(&source, &schema, &file).unwrap();

    let mut candidate = SqliteStore::open_in_memory("candidate").unwrap();
    fill(&mut candidate, &sample_records());
    load_into(&file, &schema, &mut candidate, true).unwrap();
    assert_eq!(candidate.keys().unwrap(), ["system.hostname"]);
}

#[test]
fn test_failed_load_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let schema = schema();
    let mut source = SqliteStore::open_in_memory("source").unwrap();
    fill(&mut source, &sample_records());
    let file = dir.path().join("full.json");
    save_store(&source, &schema, &file).unwrap();

    let existing = [("system.hostname", vec![cfgstore_core::Variable::string("name", "old")])];
    let mut candidate = FlakyStore::new(&existing, 1);
    let before = candidate.records().unwrap();

    for replace in [true, false] {
        let err = load_into(&file, &schema, &mut candidate, replace).unwrap_err();
        assert_eq!(err.kind(), cfgstore_core::ExErrorKind::WriteFailure);
        assert_eq!(candidate.records().unwrap(), before);
    }
}
