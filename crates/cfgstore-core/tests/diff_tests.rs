#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cfgstore_core::diff::{diff, render_summary, ChangeOp, DiffOp};
use cfgstore_core::schema::SchemaIndex;
use common::*;

#[test]
fn test_first_only_and_second_only() {
    let schema = SchemaIndex::new();
    let a = store_with("a", &[("k1", vec![s("v", "1")]), ("k2", vec![s("v", "2")])]);
    let b = store_with("b", &[("k2", vec![s("v", "2")]), ("k3", vec![s("v", "3")])]);

    let d = diff(&a, &b, &schema).unwrap();
    let got: Vec<(&str, DiffOp)> = d.iter().map(|e| (e.key(), e.op)).collect();
    assert_eq!(got, [("k1", DiffOp::First), ("k3", DiffOp::Second)]);
    assert_eq!(d.count(DiffOp::Both), 0);
}

#[test]
fn test_changed_value_is_both() {
    let schema = schema();
    let a = store_with("running", &[("interface.0", interface("eth0", 1500))]);
    let b = store_with("candidate", &[("interface.0", interface("eth0", 9000))]);
    let d = diff(&a, &b, &schema).unwrap();
    assert_eq!(d.len(), 1);
    assert_eq!(d.entries()[0].change_op(), ChangeOp::Changed);
}

#[test]
fn test_list_entries_paired_by_identity_not_index() {
    let schema = schema();
    let a = store_with(
        "running",
        &[
            ("interface.0", interface("eth0", 1500)),
            ("interface.1", interface("eth1", 1500)),
        ],
    );
    let b = store_with(
        "candidate",
        &[
            ("interface.0", interface("eth1", 1500)),
            ("interface.1", interface("eth2", 1500)),
        ],
    );
    let d = diff(&a, &b, &schema).unwrap();
    let summary = render_summary(&d);
    assert_eq!(d.len(), 2, "{}", summary);
    assert!(summary.contains("- interface.0 !name=eth0 mtu=1500"));
    assert!(summary.contains("+ interface.1 !name=eth2 mtu=1500"));
}

#[test]
fn test_diff_is_deterministic() {
    let schema = schema();
    let a = store_with("a", &sample_records());
    let b = store_with("b", &[]);
    let first = diff(&a, &b, &schema).unwrap();
    let second = diff(&a, &b, &schema).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.count(DiffOp::First), sample_records().len());
}
