//! Transaction coordinator
//!
//! A transaction diffs running against candidate, runs the validate
//! callbacks of every matching dependency in weight order, then the commit
//! callbacks, and finally copies candidate over running:
//!
//! ```text
//! Idle -> Begin -> Validating -> Validated -> Committing -> Committed -> Idle
//!                      |                          |
//!                ValidateFailed              CommitFailed
//! ```
//!
//! Candidate is never modified here. Running changes only by the final copy,
//! so a failure at any step leaves it byte-identical. Commit callbacks that
//! already ran are not undone.

use crate::datastores::{DbName, Datastores};
use crate::locks::{LockTable, Pid};
use crate::plugins::{PluginRegistry, TransactionInfo};
use cfgstore_core::depgraph::{HookError, Invocation, Phase, TransactionData};
use cfgstore_core::diff::{diff, Diff};
use cfgstore_core::errors::{ExError, ExErrorKind};
use cfgstore_core::mapper::to_document;
use cfgstore_core::schema::SchemaIndex;
use cfgstore_core::store::copy_records;
use cfgstore_core::{log_op_end, log_op_error, log_op_start};
use cfgstore_store::archive_document;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Begin,
    Validating,
    ValidateFailed,
    Validated,
    Committing,
    CommitFailed,
    Committed,
}

/// How far a transaction goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    ValidateOnly,
    Commit,
}

/// Everything a transaction reads or writes besides the lock table
pub struct TransactionContext<'a> {
    pub stores: &'a mut Datastores,
    pub schema: &'a SchemaIndex,
    pub plugins: &'a PluginRegistry,
    /// Set when the requesting client goes away
    pub disconnected: &'a AtomicBool,
}

/// Result of a finished transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    pub id: u64,
    pub diff: Diff,
    /// Snapshot written to the archive, if one is configured
    pub archived: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Coordinator {
    locks: LockTable,
    hook_timeout: Duration,
    archive_dir: Option<PathBuf>,
    next_id: u64,
    state: TransactionState,
}

impl Coordinator {
    pub fn new(hook_timeout: Duration, archive_dir: Option<PathBuf>) -> Self {
        Self {
            locks: LockTable::new(),
            hook_timeout,
            archive_dir,
            next_id: 1,
            state: TransactionState::Idle,
        }
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub fn locks_mut(&mut self) -> &mut LockTable {
        &mut self.locks
    }

    /// State the last transaction ended in; `Idle` before the first one
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Validate candidate and promote it to running
    ///
    /// # Errors
    ///
    /// `LockConflict` if another client holds candidate, `ValidateFailed`
    /// or `CommitFailed` carrying the failing plugin and its sub code,
    /// `Timeout` when a callback overruns, `StoreIo` if promotion fails.
    pub fn commit(
        &mut self,
        pid: Pid,
        ctx: TransactionContext<'_>,
    ) -> Result<TransactionOutcome, ExError> {
        self.run(pid, ctx, Mode::Commit)
    }

    /// Run the validate phase only; nothing is promoted
    pub fn validate(
        &mut self,
        pid: Pid,
        ctx: TransactionContext<'_>,
    ) -> Result<TransactionOutcome, ExError> {
        self.run(pid, ctx, Mode::ValidateOnly)
    }

    fn run(
        &mut self,
        pid: Pid,
        ctx: TransactionContext<'_>,
        mode: Mode,
    ) -> Result<TransactionOutcome, ExError> {
        let op = match mode {
            Mode::Commit => "commit",
            Mode::ValidateOnly => "validate",
        };
        let start = Instant::now();
        log_op_start!(op, pid = pid);

        let transient = self.locks.holder(DbName::Candidate) != Some(pid);
        if let Err(err) = self.locks.lock(DbName::Candidate, pid) {
            log_op_error!(op, err, duration_ms = start.elapsed().as_millis() as u64, pid = pid);
            return Err(err);
        }

        let id = self.next_id;
        self.next_id += 1;
        let result = self.drive(id, pid, ctx, mode);

        if transient {
            self.locks.release_pid(pid);
        }
        match &result {
            Ok(outcome) => {
                self.state = match mode {
                    Mode::Commit => TransactionState::Committed,
                    Mode::ValidateOnly => TransactionState::Validated,
                };
                log_op_end!(
                    op,
                    duration_ms = start.elapsed().as_millis() as u64,
                    pid = pid,
                    diff_len = outcome.diff.len()
                );
            }
            Err(err) => {
                log_op_error!(op, err, duration_ms = start.elapsed().as_millis() as u64, pid = pid);
            }
        }
        result
    }

    fn drive(
        &mut self,
        id: u64,
        pid: Pid,
        ctx: TransactionContext<'_>,
        mode: Mode,
    ) -> Result<TransactionOutcome, ExError> {
        self.state = TransactionState::Begin;
        let diff = diff(ctx.stores.running(), ctx.stores.candidate(), ctx.schema)
            .map_err(|e| self.fail(TransactionState::ValidateFailed, e))?;
        let info = TransactionInfo {
            id,
            pid,
            changes: diff.len(),
        };
        tracing::debug!(tx = id, pid, diff_len = diff.len(), "transaction begun");

        let result = self.phases(&info, &diff, &ctx, mode);
        if let Err(err) = result {
            for plugin in ctx.plugins.plugins() {
                plugin.hooks.abort(&info);
            }
            return Err(err);
        }
        if mode == Mode::ValidateOnly {
            return Ok(TransactionOutcome {
                id,
                diff,
                archived: None,
            });
        }

        let (candidate, running) = ctx.stores.split_for_commit();
        copy_records(candidate, running).map_err(|e| {
            let err = ExError::new(ExErrorKind::StoreIo)
                .with_op("promote")
                .with_sub_code(e.sub_code())
                .with_message(format!("promoting candidate failed: {}", e.message()))
                .with_source(e);
            for plugin in ctx.plugins.plugins() {
                plugin.hooks.abort(&info);
            }
            self.fail(TransactionState::CommitFailed, err)
        })?;
        self.state = TransactionState::Committed;

        for plugin in ctx.plugins.plugins() {
            if let Err(e) = plugin.hooks.end(&info) {
                tracing::warn!(tx = id, plugin = %plugin.name, error = %e, "end hook failed");
            }
        }
        let archived = self.archive(ctx.stores, ctx.schema);
        Ok(TransactionOutcome { id, diff, archived })
    }

    /// begin, validate, complete and, in commit mode, the commit callbacks
    fn phases(
        &mut self,
        info: &TransactionInfo,
        diff: &Diff,
        ctx: &TransactionContext<'_>,
        mode: Mode,
    ) -> Result<(), ExError> {
        for plugin in ctx.plugins.plugins() {
            plugin.hooks.begin(info).map_err(|e| {
                self.fail(
                    TransactionState::ValidateFailed,
                    hook_failure(ExErrorKind::ValidateFailed, "begin", &plugin.name, e),
                )
            })?;
        }

        self.state = TransactionState::Validating;
        for inv in ctx.plugins.graph().resolve(diff, Phase::Validate) {
            self.invoke(&inv, Phase::Validate, ctx, info.pid)
                .map_err(|e| self.fail(TransactionState::ValidateFailed, e))?;
        }

        for plugin in ctx.plugins.plugins() {
            plugin.hooks.complete(info).map_err(|e| {
                self.fail(
                    TransactionState::ValidateFailed,
                    hook_failure(ExErrorKind::ValidateFailed, "complete", &plugin.name, e),
                )
            })?;
        }
        self.state = TransactionState::Validated;
        if mode == Mode::ValidateOnly {
            return Ok(());
        }

        self.state = TransactionState::Committing;
        for inv in ctx.plugins.graph().resolve(diff, Phase::Commit) {
            self.invoke(&inv, Phase::Commit, ctx, info.pid)
                .map_err(|e| self.fail(TransactionState::CommitFailed, e))?;
        }
        if ctx.disconnected.load(Ordering::SeqCst) {
            return Err(self.fail(
                TransactionState::CommitFailed,
                disconnected(ExErrorKind::CommitFailed, info.pid),
            ));
        }
        Ok(())
    }

    fn invoke(
        &self,
        inv: &Invocation<'_>,
        phase: Phase,
        ctx: &TransactionContext<'_>,
        pid: Pid,
    ) -> Result<(), ExError> {
        let (kind, op) = match phase {
            Phase::Validate => (ExErrorKind::ValidateFailed, "validate"),
            Phase::Commit => (ExErrorKind::CommitFailed, "commit"),
        };
        let plugin = inv.descriptor.plugin.as_str();
        if ctx.disconnected.load(Ordering::SeqCst) {
            return Err(disconnected(kind, pid).with_plugin(plugin));
        }

        let data = transaction_data(inv);
        let started = Instant::now();
        let result = inv.descriptor.binding.invoke(phase, &data);
        let elapsed = started.elapsed();

        result.map_err(|e| hook_failure(kind, op, plugin, e).with_key(inv.entry.key()))?;
        if elapsed > self.hook_timeout {
            return Err(ExError::new(ExErrorKind::Timeout)
                .with_op(op)
                .with_plugin(plugin)
                .with_key(inv.entry.key())
                .with_message(format!(
                    "plugin {} took {} ms, limit {} ms",
                    plugin,
                    elapsed.as_millis(),
                    self.hook_timeout.as_millis()
                )));
        }
        Ok(())
    }

    fn fail(&mut self, state: TransactionState, err: ExError) -> ExError {
        self.state = state;
        err
    }

    /// Snapshot the new running datastore; failures are logged only
    fn archive(&self, stores: &Datastores, schema: &SchemaIndex) -> Option<PathBuf> {
        let dir = self.archive_dir.as_ref()?;
        let written = to_document(stores.running(), schema)
            .and_then(|(doc, _)| archive_document(dir, &doc));
        match written {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "commit not archived");
                None
            }
        }
    }
}

fn transaction_data(inv: &Invocation<'_>) -> TransactionData {
    let entry = inv.entry;
    TransactionData {
        plugin: inv.descriptor.plugin.clone(),
        op: entry.change_op(),
        source_db: DbName::Running.to_string(),
        target_db: DbName::Candidate.to_string(),
        source_key: entry.key1.clone(),
        target_key: entry.key2.clone(),
        matched_source_key: inv.matched_key1.clone(),
        matched_target_key: inv.matched_key2.clone(),
        source_vars: entry.vars1.clone(),
        target_vars: entry.vars2.clone(),
    }
}

fn hook_failure(kind: ExErrorKind, op: &str, plugin: &str, err: HookError) -> ExError {
    ExError::new(kind)
        .with_op(op)
        .with_plugin(plugin)
        .with_sub_code(err.sub_code)
        .with_message(format!("{}: {}", plugin, err.message))
}

fn disconnected(kind: ExErrorKind, pid: Pid) -> ExError {
    ExError::new(kind)
        .with_op("transaction")
        .with_message(format!("client {} disconnected", pid))
}
