//! Shared fixtures for cfgstore-core integration tests

#![allow(dead_code)]

use cfgstore_core::schema::{parse_key_spec, SchemaIndex};
use cfgstore_core::store::{write_vars, MemoryStore};
use cfgstore_core::value::{Value, ValueType, Variable};

/// Interfaces with nested addresses, a per-interface ipv4 block and a
/// plain system subtree
pub const KEY_SPEC: &str = "\
# test schema
system.hostname $name
system.ntp.server[] $!address:ipv4addr $prefer:bool=false
interface[] $!name $mtu:int32=1500 $enabled:bool
interface[].ipv4 $!name $dhcp:bool
interface[].address[] $!name $!ip:ipv4prefix $label
";

pub fn schema() -> SchemaIndex {
    parse_key_spec(KEY_SPEC).unwrap()
}

pub fn s(name: &str, value: &str) -> Variable {
    Variable::string(name, value)
}

pub fn u(name: &str, value: &str) -> Variable {
    Variable::unique(name, Value::String(value.to_string()))
}

pub fn typed_unique(name: &str, ty: ValueType, text: &str) -> Variable {
    Variable::unique(name, Value::parse(ty, text).unwrap())
}

pub fn interface(name: &str, mtu: i32) -> Vec<Variable> {
    vec![u("name", name), Variable::new("mtu", Value::Int32(mtu))]
}

pub fn address(iface: &str, ip: &str) -> Vec<Variable> {
    vec![u("name", iface), typed_unique("ip", ValueType::Ipv4Prefix, ip)]
}

/// A store holding the given decoded records
pub fn store_with(name: &str, records: &[(&str, Vec<Variable>)]) -> MemoryStore {
    let mut store = MemoryStore::new(name);
    for (key, vars) in records {
        write_vars(&mut store, key, vars).unwrap();
    }
    store
}

/// A representative configuration, closed under list ancestry
pub fn sample_records() -> Vec<(&'static str, Vec<Variable>)> {
    vec![
        ("system.hostname", vec![s("name", "edge-1")]),
        (
            "system.ntp.server.0",
            vec![typed_unique("address", ValueType::Ipv4Addr, "192.0.2.1")],
        ),
        ("interface.0", interface("eth0", 1500)),
        (
            "interface.0.ipv4",
            vec![u("name", "eth0"), Variable::new("dhcp", Value::Bool(true))],
        ),
        ("interface.0.address.0", address("eth0", "10.0.0.1/24")),
        ("interface.0.address.1", address("eth0", "10.0.1.1/24")),
        ("interface.1", interface("eth1", 9000)),
        ("interface.1.address.0", address("eth1", "172.16.0.1/16")),
    ]
}
