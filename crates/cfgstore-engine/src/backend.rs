//! Client operations
//!
//! `Backend` owns the schema, both datastores, the plugin registry and the
//! coordinator. Every client request either succeeds or produces a reply
//! carrying (kind code, sub code, message); no request can bring the
//! backend down.
//!
//! Candidate is shared by all clients. Whoever holds its lock is the only
//! one allowed to change it; while nobody holds it, anyone may. Running is
//! only ever changed by a commit.

use crate::datastores::{DbName, Datastores};
use crate::locks::Pid;
use crate::options::Options;
use crate::plugins::PluginRegistry;
use crate::transaction::{Coordinator, TransactionContext, TransactionOutcome, TransactionState};
use cfgstore_core::codec;
use cfgstore_core::errors::{CfgError, ExError, ExErrorKind};
use cfgstore_core::keylang;
use cfgstore_core::mapper::{to_document, MappingReport};
use cfgstore_core::schema::{load_key_spec, SchemaIndex};
use cfgstore_core::store::{copy_records, read_vars, write_vars, Datastore};
use cfgstore_core::value::{merge_vars, Variable};
use cfgstore_core::{log_op_end, log_op_error, log_op_start};
use cfgstore_core_types::RequestContext;
use cfgstore_store::{archive_document, load_into, save_store};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a change request edits a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Replace the record
    Set,
    Delete,
    /// Replace same-named variables and append the others
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Change {
        db: DbName,
        op: EditOp,
        key: String,
        /// Encoded variables; ignored for `Delete`
        value: Vec<u8>,
    },
    Lock {
        db: DbName,
    },
    Unlock {
        db: DbName,
    },
    Commit,
    Validate,
    Discard,
    Copy {
        from: DbName,
        to: DbName,
    },
    InitDb {
        db: DbName,
    },
    Save {
        db: DbName,
        file: PathBuf,
    },
    /// Save `db` as a timestamped document in the archive directory
    Snapshot {
        db: DbName,
    },
    Load {
        file: PathBuf,
        db: DbName,
        replace: bool,
    },
    Kill {
        pid: Pid,
    },
    Disconnect,
}

impl ClientRequest {
    pub fn op_name(&self) -> &'static str {
        match self {
            ClientRequest::Change { .. } => "change",
            ClientRequest::Lock { .. } => "lock",
            ClientRequest::Unlock { .. } => "unlock",
            ClientRequest::Commit => "commit",
            ClientRequest::Validate => "validate",
            ClientRequest::Discard => "discard",
            ClientRequest::Copy { .. } => "copy",
            ClientRequest::InitDb { .. } => "initdb",
            ClientRequest::Save { .. } => "save",
            ClientRequest::Snapshot { .. } => "snapshot",
            ClientRequest::Load { .. } => "load",
            ClientRequest::Kill { .. } => "kill",
            ClientRequest::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientReply {
    Ok,
    Error {
        kind: ExErrorKind,
        sub_code: i32,
        message: String,
    },
}

impl ClientReply {
    pub fn is_ok(&self) -> bool {
        matches!(self, ClientReply::Ok)
    }

    /// Stable error code, `None` on success
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ClientReply::Ok => None,
            ClientReply::Error { kind, .. } => Some(kind.code()),
        }
    }
}

impl From<&ExError> for ClientReply {
    fn from(err: &ExError) -> Self {
        ClientReply::Error {
            kind: err.kind(),
            sub_code: err.sub_code(),
            message: err.message().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub autocommit: bool,
    pub hook_timeout: Duration,
    pub archive_dir: Option<PathBuf>,
    pub startup_config: Option<PathBuf>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            autocommit: false,
            hook_timeout: Duration::from_millis(crate::options::DEFAULT_HOOK_TIMEOUT_MS),
            archive_dir: None,
            startup_config: None,
        }
    }
}

impl From<&Options> for BackendSettings {
    fn from(options: &Options) -> Self {
        Self {
            autocommit: options.autocommit,
            hook_timeout: options.hook_timeout(),
            archive_dir: options.archive_dir.clone(),
            startup_config: options.startup_config.clone(),
        }
    }
}

pub struct Backend {
    settings: BackendSettings,
    schema: SchemaIndex,
    stores: Datastores,
    plugins: PluginRegistry,
    coordinator: Coordinator,
    sessions: HashMap<Pid, Arc<AtomicBool>>,
}

impl Backend {
    pub fn new(schema: SchemaIndex, stores: Datastores, settings: BackendSettings) -> Self {
        let coordinator = Coordinator::new(settings.hook_timeout, settings.archive_dir.clone());
        Self {
            settings,
            schema,
            stores,
            plugins: PluginRegistry::new(),
            coordinator,
            sessions: HashMap::new(),
        }
    }

    /// A backend over the files named in `options`
    pub fn open(options: &Options) -> Result<Self, ExError> {
        let schema = load_key_spec(&options.schema_file)?;
        let stores = Datastores::open(&options.candidate_db, &options.running_db)?;
        Ok(Self::new(schema, stores, BackendSettings::from(options)))
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn plugins_mut(&mut self) -> &mut PluginRegistry {
        &mut self.plugins
    }

    pub fn schema(&self) -> &SchemaIndex {
        &self.schema
    }

    pub fn store(&self, db: DbName) -> &dyn Datastore {
        self.stores.get(db)
    }

    pub fn lock_holder(&self, db: DbName) -> Option<Pid> {
        self.coordinator.locks().holder(db)
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.coordinator.state()
    }

    pub fn is_connected(&self, pid: Pid) -> bool {
        self.sessions.contains_key(&pid)
    }

    /// Register a client; the returned flag marks it as gone when set
    pub fn connect(&mut self, pid: Pid) -> Arc<AtomicBool> {
        self.sessions
            .entry(pid)
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }

    /// Run reset hooks, then load and commit the startup document
    pub fn startup(&mut self) -> Result<(), ExError> {
        for plugin in self.plugins.plugins() {
            plugin.hooks.reset().map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("startup")
                    .with_plugin(plugin.name.as_str())
                    .with_sub_code(e.sub_code)
                    .with_message(format!("{}: reset failed: {}", plugin.name, e.message))
            })?;
        }
        let Some(file) = self.settings.startup_config.clone() else {
            return Ok(());
        };
        let pid = std::process::id();
        load_into(&file, &self.schema, self.stores.candidate_mut(), true)?;
        if let Err(err) = self.commit(pid) {
            self.reset_candidate()?;
            return Err(err.with_op("startup"));
        }
        tracing::info!(file = %file.display(), "startup configuration committed");
        Ok(())
    }

    /// Execute one request, turning every outcome into a reply
    pub fn handle(&mut self, ctx: &RequestContext, request: ClientRequest) -> ClientReply {
        let op = request.op_name();
        let pid = ctx.client_pid;
        let trace = ctx.trace_id.as_ref().map(ToString::to_string).unwrap_or_default();
        let start = Instant::now();
        log_op_start!(op, pid = pid, request_id = %ctx.request_id, trace_id = %trace);

        match self.execute(pid, request) {
            Ok(()) => {
                log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64, pid = pid, trace_id = %trace);
                ClientReply::Ok
            }
            Err(err) => {
                let mut err = err.with_request_id(ctx.request_id.clone());
                if let Some(trace_id) = &ctx.trace_id {
                    err = err.with_trace_id(trace_id.clone());
                }
                log_op_error!(op, err, duration_ms = start.elapsed().as_millis() as u64, pid = pid, trace_id = %trace);
                ClientReply::from(&err)
            }
        }
    }

    /// Execute one request for client `pid`
    pub fn execute(&mut self, pid: Pid, request: ClientRequest) -> Result<(), ExError> {
        match request {
            ClientRequest::Change { db, op, key, value } => self.change(pid, db, op, &key, &value),
            ClientRequest::Lock { db } => self.lock(pid, db),
            ClientRequest::Unlock { db } => self.unlock(pid, db),
            ClientRequest::Commit => self.commit(pid).map(|_| ()),
            ClientRequest::Validate => self.validate(pid).map(|_| ()),
            ClientRequest::Discard => self.discard(pid),
            ClientRequest::Copy { from, to } => self.copy(pid, from, to),
            ClientRequest::InitDb { db } => self.initdb(pid, db),
            ClientRequest::Save { db, file } => self.save(db, &file).map(|_| ()),
            ClientRequest::Snapshot { db } => self.snapshot(db).map(|_| ()),
            ClientRequest::Load { file, db, replace } => {
                self.load(pid, &file, db, replace).map(|_| ())
            }
            ClientRequest::Kill { pid: target } => {
                self.kill(target);
                Ok(())
            }
            ClientRequest::Disconnect => {
                self.disconnect(pid);
                Ok(())
            }
        }
    }

    /// Edit one candidate record
    ///
    /// With autocommit a successful change is committed at once; if that
    /// commit fails candidate is reset from running.
    pub fn change(
        &mut self,
        pid: Pid,
        db: DbName,
        op: EditOp,
        key: &str,
        value: &[u8],
    ) -> Result<(), ExError> {
        self.writable(pid, db, "change")?;
        keylang::validate_key(key).map_err(|e| ExError::from(e).with_op("change"))?;
        if self.schema.lookup(key).is_none() {
            return Err(ExError::from(CfgError::SchemaNotFound {
                key: key.to_string(),
            })
            .with_op("change"));
        }

        let store = self.stores.candidate_mut();
        match op {
            EditOp::Delete => {
                store.delete(key)?;
            }
            EditOp::Set => {
                let vars = decode_request(key, value)?;
                self.schema.sanity_check(key, &vars);
                store.set(key, value)?;
            }
            EditOp::Merge => {
                let incoming = decode_request(key, value)?;
                let mut merged = read_vars(store, key)?.unwrap_or_default();
                merge_vars(&mut merged, &incoming);
                self.schema.sanity_check(key, &merged);
                write_vars(store, key, &merged)?;
            }
        }

        if self.settings.autocommit {
            if let Err(err) = self.commit(pid) {
                self.reset_candidate()?;
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn lock(&mut self, pid: Pid, db: DbName) -> Result<(), ExError> {
        self.coordinator.locks_mut().lock(db, pid)
    }

    pub fn unlock(&mut self, pid: Pid, db: DbName) -> Result<(), ExError> {
        self.coordinator.locks_mut().unlock(db, pid)
    }

    /// Validate candidate and promote it to running
    ///
    /// A client that does not hold the candidate lock gets one for the
    /// duration of the transaction only.
    pub fn commit(&mut self, pid: Pid) -> Result<TransactionOutcome, ExError> {
        let known = self.sessions.contains_key(&pid);
        let flag = self.connect(pid);
        let result = self.coordinator.commit(
            pid,
            TransactionContext {
                stores: &mut self.stores,
                schema: &self.schema,
                plugins: &self.plugins,
                disconnected: &flag,
            },
        );
        self.reap(pid, &flag, known);
        result
    }

    pub fn validate(&mut self, pid: Pid) -> Result<TransactionOutcome, ExError> {
        let known = self.sessions.contains_key(&pid);
        let flag = self.connect(pid);
        let result = self.coordinator.validate(
            pid,
            TransactionContext {
                stores: &mut self.stores,
                schema: &self.schema,
                plugins: &self.plugins,
                disconnected: &flag,
            },
        );
        self.reap(pid, &flag, known);
        result
    }

    /// Throw away candidate changes: candidate becomes a copy of running
    pub fn discard(&mut self, pid: Pid) -> Result<(), ExError> {
        self.writable(pid, DbName::Candidate, "discard")?;
        self.reset_candidate()
    }

    /// Only `running -> candidate` is allowed
    pub fn copy(&mut self, pid: Pid, from: DbName, to: DbName) -> Result<(), ExError> {
        if (from, to) != (DbName::Running, DbName::Candidate) {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("copy")
                .with_message(format!("can not copy {} to {}, only running to candidate", from, to)));
        }
        self.writable(pid, to, "copy")?;
        self.reset_candidate()
    }

    /// Remove every record of candidate
    pub fn initdb(&mut self, pid: Pid, db: DbName) -> Result<(), ExError> {
        self.writable(pid, db, "initdb")?;
        self.stores.candidate_mut().clear()
    }

    /// Write the document view of `db` to `file`
    pub fn save(&self, db: DbName, file: &Path) -> Result<MappingReport, ExError> {
        save_store(self.stores.get(db), &self.schema, file)
    }

    /// Archive the document view of `db`, returning the file written
    pub fn snapshot(&self, db: DbName) -> Result<PathBuf, ExError> {
        let dir = self.settings.archive_dir.as_deref().ok_or_else(|| {
            ExError::new(ExErrorKind::Config)
                .with_op("snapshot")
                .with_message("no archive_dir configured")
        })?;
        let (doc, _) = to_document(self.stores.get(db), &self.schema)?;
        archive_document(dir, &doc)
    }

    /// Map a document file into candidate
    pub fn load(
        &mut self,
        pid: Pid,
        file: &Path,
        db: DbName,
        replace: bool,
    ) -> Result<MappingReport, ExError> {
        self.writable(pid, db, "load")?;
        load_into(file, &self.schema, self.stores.candidate_mut(), replace)
    }

    /// Treat client `target` as gone
    pub fn kill(&mut self, target: Pid) {
        if let Some(flag) = self.sessions.get(&target) {
            flag.store(true, Ordering::SeqCst);
        }
        self.disconnect(target);
    }

    /// Forget client `pid` and release its locks
    pub fn disconnect(&mut self, pid: Pid) {
        if let Some(flag) = self.sessions.remove(&pid) {
            flag.store(true, Ordering::SeqCst);
        }
        self.coordinator.locks_mut().release_pid(pid);
    }

    /// Clean up after a transaction: a client that vanished is disconnected,
    /// a session opened only for the transaction is dropped
    fn reap(&mut self, pid: Pid, flag: &AtomicBool, known: bool) {
        if flag.load(Ordering::SeqCst) {
            self.disconnect(pid);
        } else if !known {
            self.sessions.remove(&pid);
        }
    }

    fn writable(&self, pid: Pid, db: DbName, op: &str) -> Result<(), ExError> {
        if db == DbName::Running {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op(op)
                .with_message("running can only be changed by commit"));
        }
        self.coordinator.locks().check_writable(db, pid)
    }

    fn reset_candidate(&mut self) -> Result<(), ExError> {
        let (running, candidate) = self.stores.split_for_reset();
        copy_records(running, candidate)?;
        Ok(())
    }
}

fn decode_request(key: &str, value: &[u8]) -> Result<Vec<Variable>, ExError> {
    codec::decode(value).map_err(|e| ExError::from(e).with_op("change").with_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_from_error() {
        let err = ExError::new(ExErrorKind::LockConflict)
            .with_sub_code(4)
            .with_message("lock failed: locked by 4");
        let reply = ClientReply::from(&err);
        assert!(!reply.is_ok());
        assert_eq!(reply.code(), Some("ERR_LOCK_CONFLICT"));
        assert_eq!(ClientReply::Ok.code(), None);
    }

    #[test]
    fn test_op_names() {
        assert_eq!(ClientRequest::Commit.op_name(), "commit");
        assert_eq!(ClientRequest::Kill { pid: 3 }.op_name(), "kill");
    }
}
