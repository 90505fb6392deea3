use std::collections::btree_map::Entry;

use crate::registry::store::{CommandEntry, RegistryStore};
use crate::registry::{Command, EntryKind, Outcome, RegistryError};
use crate::utils::prelude::*;

/// Result of registering a scanned command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The command was new.
    Created,

    /// The command already existed under the same module.
    Unchanged,

    /// The command moved to another module.
    Reassigned { from: Option<String> },
}

/// Access to the command table.
#[derive(Debug)]
pub struct CommandRegistry<'a> {
    store: &'a RegistryStore,
}

impl<'a> CommandRegistry<'a> {
    pub const fn new(store: &'a RegistryStore) -> Self {
        Self { store }
    }

    /// Register a new, enabled command.
    pub fn create(&self, name: &str, module: &str) -> Result<Command, RegistryError> {
        self.store.save_with(|doc| match doc.commands.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RegistryError::already_exists(EntryKind::Command, name)),
            Entry::Vacant(v) => {
                v.insert(CommandEntry {
                    enabled: true,
                    module: Some(module.to_string()),
                });
                Ok(())
            },
        })?;

        info!("Created command '{name}' in module '{module}'");

        Ok(Command {
            name: name.to_string(),
            module: Some(module.to_string()),
            enabled: true,
        })
    }

    /// Register a command, or move an existing one to `module`.
    /// Used when re-scanning sources, where a known name is not an error.
    pub fn upsert(&self, name: &str, module: &str) -> Result<Upsert, RegistryError> {
        let upsert = self.store.save_with(|doc| {
            let upsert = match doc.commands.entry(name.to_string()) {
                Entry::Vacant(v) => {
                    v.insert(CommandEntry {
                        enabled: true,
                        module: Some(module.to_string()),
                    });
                    Upsert::Created
                },
                Entry::Occupied(mut o) if o.get().module.as_deref() != Some(module) => {
                    let from = o.get_mut().module.replace(module.to_string());
                    Upsert::Reassigned { from }
                },
                Entry::Occupied(_) => Upsert::Unchanged,
            };
            Ok(upsert)
        })?;

        match &upsert {
            Upsert::Created => info!("Registered command '{name}' in module '{module}'"),
            Upsert::Reassigned { from } => warn!(
                "Command '{name}' moved from module '{}' to '{module}'",
                from.as_deref().unwrap_or("<none>")
            ),
            Upsert::Unchanged => trace!("Command '{name}' already registered"),
        }

        Ok(upsert)
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> Option<Command> {
        self.store.read_with(|doc| {
            doc.commands.get(name).map(|c| Command {
                name: name.to_string(),
                module: c.module.to_owned(),
                enabled: c.enabled,
            })
        })
    }

    /// Enable a command. The owning module is not touched.
    pub fn enable(&self, name: &str) -> Result<Outcome, RegistryError> {
        self.set_enabled(name, true)
    }

    /// Disable a command. The owning module is not touched.
    pub fn disable(&self, name: &str) -> Result<Outcome, RegistryError> {
        self.set_enabled(name, false)
    }

    /// Number of commands.
    pub fn count(&self) -> usize {
        self.store.read_with(|doc| doc.commands.len())
    }

    /// Number of enabled commands.
    pub fn enabled_count(&self) -> usize {
        self.store
            .read_with(|doc| doc.commands.values().filter(|c| c.enabled).count())
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<Outcome, RegistryError> {
        let outcome = self.store.save_with(|doc| {
            let command = doc
                .commands
                .get_mut(name)
                .ok_or_else(|| RegistryError::not_found(EntryKind::Command, name))?;

            if command.enabled == enabled {
                return Ok(Outcome::AlreadyInState);
            }

            command.enabled = enabled;
            Ok(Outcome::Applied)
        })?;

        if outcome == Outcome::Applied {
            info!(
                "{} command '{name}'",
                if enabled { "Enabled" } else { "Disabled" }
            );
        }

        Ok(outcome)
    }
}
