//! Shared fixtures for cfgstore-store integration tests

#![allow(dead_code)]

use cfgstore_core::schema::{parse_key_spec, SchemaIndex};
use cfgstore_core::store::{write_vars, Datastore};
use cfgstore_core::value::{Value, ValueType, Variable};

pub const KEY_SPEC: &str = "\
system.hostname $name
interface[] $!name $mtu:int32
interface[].address[] $!name $!ip:ipv4prefix
";

pub fn schema() -> SchemaIndex {
    parse_key_spec(KEY_SPEC).unwrap()
}

fn unique(name: &str, value: &str) -> Variable {
    Variable::unique(name, Value::String(value.to_string()))
}

pub fn interface(name: &str, mtu: i32) -> Vec<Variable> {
    vec![unique("name", name), Variable::new("mtu", Value::Int32(mtu))]
}

pub fn address(iface: &str, ip: &str) -> Vec<Variable> {
    vec![
        unique("name", iface),
        Variable::unique("ip", Value::parse(ValueType::Ipv4Prefix, ip).unwrap()),
    ]
}

pub fn sample_records() -> Vec<(&'static str, Vec<Variable>)> {
    vec![
        ("system.hostname", vec![Variable::string("name", "core-1")]),
        ("interface.0", interface("eth0", 1500)),
        ("interface.0.address.0", address("eth0", "10.1.0.1/24")),
        ("interface.1", interface("eth1", 9000)),
    ]
}

pub fn fill(store: &mut dyn Datastore, records: &[(&str, Vec<Variable>)]) {
    for (key, vars) in records {
        write_vars(store, key, vars).unwrap();
    }
}

/// Store whose writes start failing after `sets_left` successful sets;
/// `replace_all` applies all records or none
pub struct FlakyStore {
    pub inner: cfgstore_core::MemoryStore,
    pub sets_left: usize,
}

impl FlakyStore {
    pub fn new(records: &[(&str, Vec<Variable>)], sets_left: usize) -> Self {
        let mut inner = cfgstore_core::MemoryStore::new("candidate");
        fill(&mut inner, records);
        Self { inner, sets_left }
    }

    fn take_set(&mut self, key: &str) -> cfgstore_core::store::StoreResult<()> {
        if self.sets_left == 0 {
            return Err(cfgstore_core::ExError::new(cfgstore_core::ExErrorKind::WriteFailure)
                .with_op("set")
                .with_key(key)
                .with_message("disk full"));
        }
        self.sets_left -= 1;
        Ok(())
    }
}

impl Datastore for FlakyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &str) -> cfgstore_core::store::StoreResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> cfgstore_core::store::StoreResult<()> {
        self.take_set(key)?;
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &str) -> cfgstore_core::store::StoreResult<bool> {
        self.inner.delete(key)
    }

    fn scan(&self, re: &regex::Regex) -> cfgstore_core::store::StoreResult<Vec<cfgstore_core::store::RawRecord>> {
        self.inner.scan(re)
    }

    fn records(&self) -> cfgstore_core::store::StoreResult<Vec<cfgstore_core::store::RawRecord>> {
        self.inner.records()
    }

    fn clear(&mut self) -> cfgstore_core::store::StoreResult<()> {
        self.inner.clear()
    }

    fn replace_all(&mut self, records: &[cfgstore_core::store::RawRecord]) -> cfgstore_core::store::StoreResult<()> {
        for (key, _) in records {
            self.take_set(key)?;
        }
        self.inner.replace_all(records)
    }
}
