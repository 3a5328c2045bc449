//! Plugin registry
//!
//! A plugin is a named set of lifecycle hooks plus any number of dependency
//! registrations in the shared `DepGraph`. Lifecycle hooks see the whole
//! transaction; dependency callbacks see one matched diff entry each.

use crate::locks::Pid;
use cfgstore_core::depgraph::{DepGraph, DepHandle, DepType, HookBinding, HookError};
use cfgstore_core::errors::{ExError, ExErrorKind};
use std::sync::Arc;

/// What lifecycle hooks are told about the running transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionInfo {
    pub id: u64,
    pub pid: Pid,
    /// Number of diff entries between running and candidate
    pub changes: usize,
}

/// Whole-transaction callbacks; every one defaults to doing nothing
pub trait TransactionHooks {
    /// Backend startup, before any transaction
    fn reset(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// Before validation
    fn begin(&self, _tx: &TransactionInfo) -> Result<(), HookError> {
        Ok(())
    }

    /// After validation succeeded
    fn complete(&self, _tx: &TransactionInfo) -> Result<(), HookError> {
        Ok(())
    }

    /// After a successful commit
    fn end(&self, _tx: &TransactionInfo) -> Result<(), HookError> {
        Ok(())
    }

    /// After any failure once `begin` ran
    fn abort(&self, _tx: &TransactionInfo) {}
}

struct NoHooks;

impl TransactionHooks for NoHooks {}

pub struct Plugin {
    pub name: String,
    pub hooks: Arc<dyn TransactionHooks>,
    has_hooks: bool,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name).finish()
    }
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    graph: DepGraph,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin's lifecycle hooks
    ///
    /// # Errors
    ///
    /// `InvalidInput` if a plugin of that name already registered hooks.
    pub fn add_plugin<H: TransactionHooks + 'static>(
        &mut self,
        name: &str,
        hooks: H,
    ) -> Result<(), ExError> {
        let hooks: Arc<dyn TransactionHooks> = Arc::new(hooks);
        match self.plugins.iter_mut().find(|p| p.name == name) {
            Some(existing) if existing.has_hooks => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("add_plugin")
                .with_plugin(name)
                .with_message(format!("plugin {} already registered", name))),
            Some(existing) => {
                existing.hooks = hooks;
                existing.has_hooks = true;
                Ok(())
            }
            None => {
                self.plugins.push(Plugin {
                    name: name.to_string(),
                    hooks,
                    has_hooks: true,
                });
                tracing::debug!(plugin = name, "plugin registered");
                Ok(())
            }
        }
    }

    /// Register a dependency for `plugin`
    ///
    /// A plugin without lifecycle hooks is added with no-op hooks.
    pub fn register_dependency(
        &mut self,
        plugin: &str,
        patterns: &[&str],
        weight: Option<u16>,
        dep_type: DepType,
        binding: HookBinding,
    ) -> Result<DepHandle, ExError> {
        let handle = self
            .graph
            .register(plugin, patterns, weight, dep_type, binding)
            .map_err(|e| ExError::from(e).with_op("register_dependency").with_plugin(plugin))?;
        if !self.plugins.iter().any(|p| p.name == plugin) {
            self.plugins.push(Plugin {
                name: plugin.to_string(),
                hooks: Arc::new(NoHooks),
                has_hooks: false,
            });
        }
        Ok(handle)
    }

    /// Remove a plugin with all of its dependencies
    pub fn remove_plugin(&mut self, name: &str) -> bool {
        let before = self.plugins.len();
        self.plugins.retain(|p| p.name != name);
        let deps = self.graph.unregister_plugin(name);
        before != self.plugins.len() || deps > 0
    }

    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgstore_core::depgraph::ValidateHook;
    use cfgstore_core::TransactionData;

    struct Accept;

    impl ValidateHook for Accept {
        fn validate(&self, _data: &TransactionData) -> Result<(), HookError> {
            Ok(())
        }
    }

    impl TransactionHooks for Accept {}

    #[test]
    fn test_dependency_adds_plugin_once() {
        let mut registry = PluginRegistry::new();
        registry
            .register_dependency("ntp", &["system.ntp*"], Some(5), DepType::Key, HookBinding::validate(Accept))
            .unwrap();
        registry
            .register_dependency("ntp", &["system.clock"], None, DepType::Key, HookBinding::validate(Accept))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.graph().len(), 2);
    }

    #[test]
    fn test_duplicate_plugin_rejected() {
        let mut registry = PluginRegistry::new();
        registry.add_plugin("ifmgr", Accept).unwrap();
        let err = registry.add_plugin("ifmgr", Accept).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.plugin(), Some("ifmgr"));
    }

    #[test]
    fn test_hooks_may_follow_dependencies() {
        let mut registry = PluginRegistry::new();
        registry
            .register_dependency("ifmgr", &["interface[]"], None, DepType::Key, HookBinding::validate(Accept))
            .unwrap();
        registry.add_plugin("ifmgr", Accept).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_plugin_drops_dependencies() {
        let mut registry = PluginRegistry::new();
        registry
            .register_dependency("ifmgr", &["interface[]"], None, DepType::Tree, HookBinding::validate(Accept))
            .unwrap();
        assert!(registry.remove_plugin("ifmgr"));
        assert!(registry.is_empty());
        assert!(registry.graph().is_empty());
        assert!(!registry.remove_plugin("ifmgr"));
    }
}
