//! Module and command registry.
//!
//! Modules and commands are toggled through [`ModuleRegistry`] and
//! [`CommandRegistry`], both thin views over the same [`RegistryStore`].
//! A command may only run when both its own flag and its module's flag are set.

use std::path::Path;
use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;

pub use crate::registry::commands::{CommandRegistry, Upsert};
pub use crate::registry::modules::{ModuleRegistry, ModuleToggle};
pub use crate::registry::store::RegistryStore;
use crate::utils::prelude::*;

pub mod commands;
pub mod modules;
pub mod store;

/// Kind of a registry entry, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntryKind {
    #[display(fmt = "Module")]
    Module,

    #[display(fmt = "Command")]
    Command,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Referenced entry does not exist.
    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: EntryKind, name: String },

    /// Entry with the same name is already registered.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: EntryKind, name: String },

    /// Writing the registry document failed.
    #[error("Failed to persist the registry: {0:#}")]
    Io(anyhow::Error),
}

impl RegistryError {
    fn not_found(kind: EntryKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    fn already_exists(kind: EntryKind, name: &str) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    }
}

/// Result of an enable or disable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state was changed and persisted.
    Applied,

    /// Nothing to do, the entry was already in the requested state.
    AlreadyInState,
}

/// A module record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub enabled: bool,
}

/// A command record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub module: Option<String>,
    pub enabled: bool,
}

/// Registry handle shared by the bot.
#[derive(Debug, Clone)]
pub struct Registry {
    store: Arc<RegistryStore>,
}

impl Registry {
    /// Open the registry backed by the document at `path`.
    pub fn open(path: impl AsRef<Path>) -> AnyResult<Self> {
        Ok(Self::new(RegistryStore::open(path)?))
    }

    pub fn new(store: RegistryStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Module table.
    pub fn modules(&self) -> ModuleRegistry {
        ModuleRegistry::new(&self.store)
    }

    /// Command table.
    pub fn commands(&self) -> CommandRegistry {
        CommandRegistry::new(&self.store)
    }

    /// Return a reference to the inner store.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Returns `true` if the command and its module are both enabled.
    pub fn is_runnable(&self, name: &str) -> bool {
        self.store.read_with(|doc| {
            let Some(command) = doc.commands.get(name) else {
                return false;
            };
            command.enabled
                && command
                    .module
                    .as_ref()
                    .and_then(|m| doc.modules.get(m))
                    .map_or(false, |m| m.enabled)
        })
    }

    /// Register modules and commands found by a source scan.
    ///
    /// Missing modules are created enabled and commands are upserted, so this
    /// never fails on names that already exist.
    pub fn bootstrap<'a>(
        &self,
        modules: impl IntoIterator<Item = &'a str>,
        commands: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), RegistryError> {
        let modules_reg = self.modules();
        for module in modules {
            if modules_reg.get(module).is_none() {
                modules_reg.create(module)?;
            }
        }

        let commands_reg = self.commands();
        for (name, module) in commands {
            commands_reg.upsert(name, module)?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Registry in a temporary directory. Keep the guard alive for the test.
    pub fn temp_registry() -> (Registry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path().join("registry.json")).unwrap();
        (registry, dir)
    }

    #[test]
    fn dispatch_gate_needs_both_flags() {
        let (registry, _dir) = temp_registry();
        registry.modules().create("utility").unwrap();
        registry.commands().create("ping", "utility").unwrap();

        assert!(registry.is_runnable("ping"));

        registry.commands().disable("ping").unwrap();
        assert!(!registry.is_runnable("ping"));

        // Re-enabling the command alone is not enough while the module is off.
        registry.modules().disable("utility").unwrap();
        registry.commands().enable("ping").unwrap();
        assert!(!registry.is_runnable("ping"));

        registry.modules().enable("utility").unwrap();
        assert!(registry.is_runnable("ping"));

        assert!(!registry.is_runnable("unknown"));
    }

    #[test]
    fn command_without_module_is_not_runnable() {
        let (registry, _dir) = temp_registry();
        registry.commands().create("ping", "missing").unwrap();

        assert!(!registry.is_runnable("ping"));
    }

    #[test]
    fn bootstrap_is_repeatable() {
        let (registry, _dir) = temp_registry();

        for _ in 0..2 {
            registry
                .bootstrap(["utility", "bot"], [("ping", "bot"), ("avatar", "utility")])
                .unwrap();
        }

        assert_eq!(registry.modules().count(), 2);
        assert_eq!(registry.commands().count(), 2);
        assert!(registry.is_runnable("avatar"));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let registry = Registry::open(&path).unwrap();
        registry.modules().create("utility").unwrap();
        registry.modules().create("bot").unwrap();
        registry.commands().create("ping", "bot").unwrap();
        registry.commands().create("avatar", "utility").unwrap();
        registry.commands().disable("avatar").unwrap();
        registry.modules().disable("bot").unwrap();
        registry.commands().enable("ping").unwrap();
        let before = registry.store().snapshot();

        let reopened = Registry::open(&path).unwrap();
        assert_eq!(reopened.store().snapshot(), before);
    }
}
