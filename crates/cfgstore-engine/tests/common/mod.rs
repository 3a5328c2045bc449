//! Shared fixtures for cfgstore-engine integration tests

#![allow(dead_code)]

use cfgstore_core::codec;
use cfgstore_core::depgraph::{CommitHook, HookError, TransactionData, ValidateHook};
use cfgstore_core::schema::{parse_key_spec, SchemaIndex};
use cfgstore_core::value::{Value, ValueType, Variable};
use cfgstore_engine::{
    Backend, BackendSettings, ClientReply, ClientRequest, Datastores, DbName, EditOp,
    TransactionHooks, TransactionInfo,
};
use cfgstore_core_types::RequestContext;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

pub const KEY_SPEC: &str = "\
system.hostname $name
system.ntp.server[] $!address:ipv4addr
interface[] $!name $mtu:int32
interface[].address[] $!name $!ip:ipv4prefix
";

pub fn schema() -> SchemaIndex {
    parse_key_spec(KEY_SPEC).unwrap()
}

pub fn backend() -> Backend {
    backend_with(BackendSettings::default())
}

pub fn backend_with(settings: BackendSettings) -> Backend {
    Backend::new(schema(), Datastores::in_memory(), settings)
}

pub fn hostname(name: &str) -> Vec<u8> {
    codec::encode(&[Variable::string("name", name)]).unwrap()
}

pub fn interface(name: &str, mtu: i32) -> Vec<u8> {
    codec::encode(&[
        Variable::unique("name", Value::String(name.to_string())),
        Variable::new("mtu", Value::Int32(mtu)),
    ])
    .unwrap()
}

pub fn address(iface: &str, ip: &str) -> Vec<u8> {
    codec::encode(&[
        Variable::unique("name", Value::String(iface.to_string())),
        Variable::unique("ip", Value::parse(ValueType::Ipv4Prefix, ip).unwrap()),
    ])
    .unwrap()
}

pub fn set(key: &str, value: Vec<u8>) -> ClientRequest {
    ClientRequest::Change {
        db: DbName::Candidate,
        op: EditOp::Set,
        key: key.to_string(),
        value,
    }
}

pub fn request(backend: &mut Backend, pid: u32, req: ClientRequest) -> ClientReply {
    backend.handle(&RequestContext::new(pid), req)
}

/// Shared, ordered record of every callback a plugin saw
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

/// A plugin that writes each callback into a journal and fails on demand
#[derive(Clone, Default)]
pub struct Recorder {
    pub name: String,
    pub journal: Journal,
    pub fail_validate: Option<i32>,
    pub fail_commit: Option<i32>,
    pub fail_begin: bool,
    pub delay: Option<Duration>,
}

impl Recorder {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            ..Self::default()
        }
    }

    fn note(&self, what: &str) {
        self.journal
            .borrow_mut()
            .push(format!("{}:{}", self.name, what));
    }
}

impl ValidateHook for Recorder {
    fn validate(&self, data: &TransactionData) -> Result<(), HookError> {
        self.note(&format!("validate {}", data.target_key.as_deref().or(data.source_key.as_deref()).unwrap_or("-")));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match self.fail_validate {
            Some(code) => Err(HookError::new("rejected").with_sub_code(code)),
            None => Ok(()),
        }
    }
}

impl CommitHook for Recorder {
    fn commit(&self, data: &TransactionData) -> Result<(), HookError> {
        self.note(&format!("commit {}", data.target_key.as_deref().or(data.source_key.as_deref()).unwrap_or("-")));
        match self.fail_commit {
            Some(code) => Err(HookError::new("apply failed").with_sub_code(code)),
            None => Ok(()),
        }
    }
}

impl TransactionHooks for Recorder {
    fn reset(&self) -> Result<(), HookError> {
        self.note("reset");
        Ok(())
    }

    fn begin(&self, _tx: &TransactionInfo) -> Result<(), HookError> {
        self.note("begin");
        if self.fail_begin {
            return Err(HookError::new("busy").with_sub_code(16));
        }
        Ok(())
    }

    fn complete(&self, _tx: &TransactionInfo) -> Result<(), HookError> {
        self.note("complete");
        Ok(())
    }

    fn end(&self, _tx: &TransactionInfo) -> Result<(), HookError> {
        self.note("end");
        Ok(())
    }

    fn abort(&self, _tx: &TransactionInfo) {
        self.note("abort");
    }
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}
