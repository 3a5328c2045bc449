#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use cfgstore_core::depgraph::{DepType, HookBinding, HookError, TransactionData, ValidateHook};
use cfgstore_core::diff::ChangeOp;
use cfgstore_core::store::{read_vars, Datastore};
use cfgstore_core::ExErrorKind;
use cfgstore_engine::{
    Backend, BackendSettings, ClientRequest, Datastores, DbName, TransactionState,
};
use cfgstore_store::list_archive;
use common::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

fn register(backend: &mut Backend, recorder: &Recorder, patterns: &[&str], weight: Option<u16>) {
    backend
        .plugins_mut()
        .register_dependency(
            &recorder.name,
            patterns,
            weight,
            DepType::Key,
            HookBinding::both(recorder.clone()),
        )
        .unwrap();
}

#[test]
fn test_callbacks_run_in_weight_order_and_lifecycle() {
    let log = journal();
    let mut backend = backend();
    let heavy = Recorder::new("heavy", &log);
    let light = Recorder::new("light", &log);
    let mid = Recorder::new("mid", &log);
    backend.plugins_mut().add_plugin("heavy", heavy.clone()).unwrap();
    register(&mut backend, &heavy, &["system.hostname"], Some(5));
    register(&mut backend, &light, &["system.hostname"], Some(1));
    register(&mut backend, &mid, &["system.hostname"], Some(3));

    request(&mut backend, 1, set("system.hostname", hostname("edge")));
    backend.commit(1).unwrap();

    assert_eq!(
        entries(&log),
        [
            "heavy:begin",
            "light:validate system.hostname",
            "mid:validate system.hostname",
            "heavy:validate system.hostname",
            "heavy:complete",
            "light:commit system.hostname",
            "mid:commit system.hostname",
            "heavy:commit system.hostname",
            "heavy:end",
        ]
    );
    assert_eq!(backend.transaction_state(), TransactionState::Committed);
}

#[test]
fn test_commit_hook_failure_leaves_running_byte_identical() {
    let dir = TempDir::new().unwrap();
    let stores = Datastores::open(&dir.path().join("c.db"), &dir.path().join("r.db")).unwrap();
    let mut backend = Backend::new(schema(), stores, BackendSettings::default());
    request(&mut backend, 1, set("system.hostname", hostname("before")));
    backend.commit(1).unwrap();
    let running_before = backend.store(DbName::Running).records().unwrap();

    let log = journal();
    let mut failing = Recorder::new("ifmgr", &log);
    failing.fail_commit = Some(5);
    backend.plugins_mut().add_plugin("ifmgr", failing.clone()).unwrap();
    register(&mut backend, &failing, &["interface[]", "system*"], None);

    request(&mut backend, 1, set("system.hostname", hostname("after")));
    request(&mut backend, 1, set("interface.0", interface("eth0", 1500)));
    let candidate_before = backend.store(DbName::Candidate).records().unwrap();

    let err = backend.commit(1).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::CommitFailed);
    assert_eq!(err.sub_code(), 5);
    assert_eq!(err.plugin(), Some("ifmgr"));
    assert_eq!(backend.transaction_state(), TransactionState::CommitFailed);

    assert_eq!(backend.store(DbName::Running).records().unwrap(), running_before);
    assert_eq!(backend.store(DbName::Candidate).records().unwrap(), candidate_before);
    assert_eq!(backend.lock_holder(DbName::Candidate), None);
    assert_eq!(entries(&log).last().map(String::as_str), Some("ifmgr:abort"));
}

#[test]
fn test_validate_failure_stops_before_commit_callbacks() {
    let log = journal();
    let mut backend = backend();
    let mut strict = Recorder::new("strict", &log);
    strict.fail_validate = Some(13);
    let other = Recorder::new("other", &log);
    register(&mut backend, &strict, &["system*"], Some(1));
    register(&mut backend, &other, &["system*"], Some(2));

    request(&mut backend, 1, set("system.hostname", hostname("x")));
    let reply = request(&mut backend, 1, ClientRequest::Commit);
    match reply {
        cfgstore_engine::ClientReply::Error { kind, sub_code, message } => {
            assert_eq!(kind, ExErrorKind::ValidateFailed);
            assert_eq!(sub_code, 13);
            assert!(message.contains("strict"));
        }
        cfgstore_engine::ClientReply::Ok => panic!("commit should fail"),
    }
    assert_eq!(entries(&log), ["strict:validate system.hostname"]);
    assert!(backend.store(DbName::Running).is_empty().unwrap());
}

#[test]
fn test_begin_failure_is_validate_failure() {
    let log = journal();
    let mut backend = backend();
    let mut busy = Recorder::new("busy", &log);
    busy.fail_begin = true;
    backend.plugins_mut().add_plugin("busy", busy).unwrap();

    request(&mut backend, 1, set("system.hostname", hostname("x")));
    let err = backend.commit(1).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ValidateFailed);
    assert_eq!(err.sub_code(), 16);
    assert_eq!(entries(&log), ["busy:begin", "busy:abort"]);
}

#[test]
fn test_validate_only_promotes_nothing() {
    let log = journal();
    let mut backend = backend();
    let recorder = Recorder::new("sys", &log);
    register(&mut backend, &recorder, &["system*"], None);

    request(&mut backend, 1, set("system.hostname", hostname("x")));
    let outcome = backend.validate(1).unwrap();
    assert_eq!(outcome.diff.len(), 1);
    assert!(backend.store(DbName::Running).is_empty().unwrap());
    assert_eq!(entries(&log), ["sys:validate system.hostname"]);
    assert_eq!(backend.transaction_state(), TransactionState::Validated);
}

#[test]
fn test_slow_callback_times_out() {
    let log = journal();
    let settings = BackendSettings {
        hook_timeout: Duration::from_millis(5),
        ..BackendSettings::default()
    };
    let mut backend = backend_with(settings);
    let mut slow = Recorder::new("slow", &log);
    slow.delay = Some(Duration::from_millis(40));
    register(&mut backend, &slow, &["system*"], None);

    request(&mut backend, 1, set("system.hostname", hostname("x")));
    let err = backend.commit(1).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Timeout);
    assert_eq!(err.plugin(), Some("slow"));
    assert!(backend.store(DbName::Running).is_empty().unwrap());
}

struct Capture(Rc<RefCell<Vec<TransactionData>>>);

impl ValidateHook for Capture {
    fn validate(&self, data: &TransactionData) -> Result<(), HookError> {
        self.0.borrow_mut().push(data.clone());
        Ok(())
    }
}

#[test]
fn test_hook_sees_old_and_new_values() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut backend = backend();
    backend
        .plugins_mut()
        .register_dependency(
            "ifmgr",
            &["interface[]"],
            None,
            DepType::Key,
            HookBinding::validate(Capture(seen.clone())),
        )
        .unwrap();

    request(&mut backend, 1, set("interface.0", interface("eth0", 1500)));
    backend.commit(1).unwrap();
    request(&mut backend, 1, set("interface.0", interface("eth0", 9000)));
    backend.commit(1).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].op, ChangeOp::Added);
    assert_eq!(seen[1].op, ChangeOp::Changed);
    assert_eq!(seen[1].plugin, "ifmgr");
    assert_eq!(seen[1].source_db, "running");
    assert_eq!(seen[1].target_db, "candidate");
    assert_eq!(seen[1].source_key.as_deref(), Some("interface.0"));
    assert_eq!(seen[1].matched_target_key.as_deref(), Some("interface.0"));
    assert_ne!(seen[1].source_vars, seen[1].target_vars);
}

#[test]
fn test_client_disconnect_mid_transaction_fails_and_unlocks() {
    struct Hangup(std::sync::Arc<std::sync::atomic::AtomicBool>);

    impl ValidateHook for Hangup {
        fn validate(&self, _data: &TransactionData) -> Result<(), HookError> {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    let mut backend = backend();
    let flag = backend.connect(9);
    backend
        .plugins_mut()
        .register_dependency("a", &["system*"], Some(1), DepType::Key, HookBinding::validate(Hangup(flag)))
        .unwrap();
    let log = journal();
    register(&mut backend, &Recorder::new("b", &log), &["system*"], Some(2));

    backend.lock(9, DbName::Candidate).unwrap();
    request(&mut backend, 9, set("system.hostname", hostname("x")));
    let err = backend.commit(9).unwrap_err();
    assert!(err.message().contains("disconnected"));
    assert!(entries(&log).is_empty());
    assert_eq!(backend.lock_holder(DbName::Candidate), None);
    assert!(backend.store(DbName::Running).is_empty().unwrap());
}

#[test]
fn test_commit_writes_archive_snapshot() {
    let dir = TempDir::new().unwrap();
    let settings = BackendSettings {
        archive_dir: Some(dir.path().join("archive")),
        ..BackendSettings::default()
    };
    let mut backend = backend_with(settings);
    request(&mut backend, 1, set("system.hostname", hostname("edge")));
    let outcome = backend.commit(1).unwrap();

    let archived = list_archive(&dir.path().join("archive")).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(outcome.archived.as_ref(), Some(&archived[0]));
}

#[test]
fn test_tree_dependency_invoked_once_per_prefix() {
    let log = journal();
    let mut backend = backend();
    let tree = Recorder::new("tree", &log);
    backend
        .plugins_mut()
        .register_dependency("tree", &["interface[]*"], None, DepType::Tree, HookBinding::validate(tree))
        .unwrap();

    request(&mut backend, 1, set("interface.0", interface("eth0", 1500)));
    request(&mut backend, 1, set("interface.0.address.0", address("eth0", "10.0.0.1/24")));
    request(&mut backend, 1, set("interface.1", interface("eth1", 1500)));
    backend.commit(1).unwrap();
    assert_eq!(entries(&log).len(), 2);

    let running = backend.store(DbName::Running);
    assert!(read_vars(running, "interface.1").unwrap().is_some());
}
