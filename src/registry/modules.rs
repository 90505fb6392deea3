use crate::registry::store::{ModuleEntry, RegistryStore};
use crate::registry::{Command, EntryKind, Module, Outcome, RegistryError};
use crate::utils::prelude::*;

/// Result of toggling a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleToggle {
    pub outcome: Outcome,

    /// Commands of the module whose flag changed with it.
    pub cascaded: Vec<String>,
}

/// Access to the module table.
#[derive(Debug)]
pub struct ModuleRegistry<'a> {
    store: &'a RegistryStore,
}

impl<'a> ModuleRegistry<'a> {
    pub const fn new(store: &'a RegistryStore) -> Self {
        Self { store }
    }

    /// Register a new, enabled module.
    pub fn create(&self, name: &str) -> Result<Module, RegistryError> {
        self.store.save_with(|doc| {
            if doc.modules.contains_key(name) {
                return Err(RegistryError::already_exists(EntryKind::Module, name));
            }
            doc.modules
                .insert(name.to_string(), ModuleEntry { enabled: true });
            Ok(())
        })?;

        info!("Created module '{name}'");

        Ok(Module {
            name: name.to_string(),
            enabled: true,
        })
    }

    /// Get a module by name.
    pub fn get(&self, name: &str) -> Option<Module> {
        self.store.read_with(|doc| {
            doc.modules.get(name).map(|m| Module {
                name: name.to_string(),
                enabled: m.enabled,
            })
        })
    }

    /// Enable a module and all of its commands.
    pub fn enable(&self, name: &str) -> Result<ModuleToggle, RegistryError> {
        self.set_enabled(name, true)
    }

    /// Disable a module and all of its commands.
    pub fn disable(&self, name: &str) -> Result<ModuleToggle, RegistryError> {
        self.set_enabled(name, false)
    }

    /// Number of modules.
    pub fn count(&self) -> usize {
        self.store.read_with(|doc| doc.modules.len())
    }

    /// Number of enabled modules.
    pub fn enabled_count(&self) -> usize {
        self.store
            .read_with(|doc| doc.modules.values().filter(|m| m.enabled).count())
    }

    /// All commands assigned to the module.
    pub fn commands_of(&self, name: &str) -> Vec<Command> {
        self.store.read_with(|doc| {
            doc.commands
                .iter()
                .filter(|(_, c)| c.module.as_deref() == Some(name))
                .map(|(n, c)| Command {
                    name: n.to_owned(),
                    module: c.module.to_owned(),
                    enabled: c.enabled,
                })
                .collect()
        })
    }

    /// All modules, ordered by name.
    pub fn list(&self) -> Vec<Module> {
        self.store.read_with(|doc| {
            doc.modules
                .iter()
                .map(|(n, m)| Module {
                    name: n.to_owned(),
                    enabled: m.enabled,
                })
                .collect()
        })
    }

    /// Set the module flag and cascade it to every command of the module.
    ///
    /// The outcome is `AlreadyInState` only if neither the module nor any of
    /// its commands needed a change.
    fn set_enabled(&self, name: &str, enabled: bool) -> Result<ModuleToggle, RegistryError> {
        let toggle = self.store.save_with(|doc| {
            let module = doc
                .modules
                .get_mut(name)
                .ok_or_else(|| RegistryError::not_found(EntryKind::Module, name))?;

            let mut changed = module.enabled != enabled;
            module.enabled = enabled;

            let mut cascaded = Vec::new();
            for (command_name, command) in doc.commands.iter_mut() {
                if command.module.as_deref() == Some(name) && command.enabled != enabled {
                    command.enabled = enabled;
                    cascaded.push(command_name.to_owned());
                    changed = true;
                }
            }

            let outcome = if changed {
                Outcome::Applied
            } else {
                Outcome::AlreadyInState
            };

            Ok(ModuleToggle { outcome, cascaded })
        })?;

        match toggle.outcome {
            Outcome::Applied => info!(
                "{} module '{name}' with commands {:?}",
                if enabled { "Enabled" } else { "Disabled" },
                toggle.cascaded
            ),
            Outcome::AlreadyInState => debug!("Module '{name}' already in requested state"),
        }

        Ok(toggle)
    }
}
