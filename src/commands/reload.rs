use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::commands::source::{CommandSource, Duplicate, Load, Scan, ScanError, ScanFilter};
use crate::commands::Commands;
use crate::registry::{Registry, RegistryError};
use crate::utils::prelude::*;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("Command '{0}' not found")]
    CommandNotFound(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    #[error("Failed to scan commands: {0:#}")]
    Source(anyhow::Error),
}

/// Outcome of a reload pass.
#[derive(Debug, Default)]
pub struct ReloadSummary {
    /// Commands now live with their fresh definitions.
    pub reloaded: Vec<String>,

    /// Module of each reloaded command.
    pub assignments: Vec<(String, String)>,

    /// Modules seen by the scan.
    pub modules: BTreeSet<String>,

    /// Files that failed, their previous live entries are kept.
    pub failed: Vec<ScanError>,
    pub duplicates: Vec<Duplicate>,
}

impl ReloadSummary {
    /// Register the scanned modules and commands, so new files become runnable.
    pub fn register(&self, registry: &Registry) -> Result<(), RegistryError> {
        registry.bootstrap(
            self.modules.iter().map(String::as_str),
            self.assignments
                .iter()
                .map(|(name, module)| (name.as_str(), module.as_str())),
        )
    }
}

impl fmt::Display for ReloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reloaded.is_empty() && self.failed.is_empty() {
            return write!(f, "No commands found to reload.");
        }

        let mut lines = Vec::new();
        if !self.reloaded.is_empty() {
            lines.push(format!(
                "Reloaded {} commands: `{}`",
                self.reloaded.len(),
                self.reloaded.join("`, `")
            ));
        }
        if !self.failed.is_empty() {
            lines.push(format!("Failed to reload {} files:", self.failed.len()));
            lines.extend(self.failed.iter().map(|e| format!("- {e}")));
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// Make the commands of a scan live, replacing entries of the same name.
pub fn install(commands: &Commands, scan: Scan) -> ReloadSummary {
    let mut reloaded = Vec::with_capacity(scan.commands.len());
    let mut assignments = Vec::with_capacity(scan.commands.len());

    for command in scan.commands {
        let name = command.name.to_owned();
        assignments.push((name.to_owned(), command.module.to_owned()));
        match commands.insert(command) {
            Some(old) => trace!("Replaced live command '{name}' from '{}'", old.path.display()),
            None => trace!("Installed command '{name}'"),
        }
        reloaded.push(name);
    }

    ReloadSummary {
        reloaded,
        assignments,
        modules: scan.modules,
        failed: scan.errors,
        duplicates: scan.duplicates,
    }
}

/// Re-read definitions from disk, bypassing the definition cache, and swap
/// them into the live dispatch table. Failing files are reported and skipped.
pub fn reload(
    source: &CommandSource,
    commands: &Commands,
    target: ScanFilter,
) -> Result<ReloadSummary, ReloadError> {
    let scan = source
        .scan(target, Load::Fresh)
        .map_err(ReloadError::Source)?;

    match target {
        ScanFilter::Command(name) if scan.commands.is_empty() && scan.errors.is_empty() => {
            return Err(ReloadError::CommandNotFound(name.to_string()));
        },
        ScanFilter::Module(name) if !scan.modules.contains(name) => {
            return Err(ReloadError::ModuleNotFound(name.to_string()));
        },
        _ => (),
    }

    let summary = install(commands, scan);

    info!(
        "Reloaded {} commands, {} failed",
        summary.reloaded.len(),
        summary.failed.len()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::commands::source::tests::{temp_source, write_def};

    fn live(source: &CommandSource) -> Commands {
        let commands = Commands::new();
        install(&commands, source.scan(ScanFilter::All, Load::Cached).unwrap());
        commands
    }

    #[test]
    fn reload_replaces_live_entry() {
        let (source, dir) = temp_source();
        let commands = live(&source);
        assert_eq!(commands.get("ping").unwrap().schema.description, "Latency");

        write_def(dir.path(), "bot/ping.json", "ping", "ping", "Edited");
        let summary = reload(&source, &commands, ScanFilter::Command("ping")).unwrap();

        assert_eq!(summary.reloaded, ["ping"]);
        assert_eq!(commands.get("ping").unwrap().schema.description, "Edited");
        // Untouched entries stay.
        assert_eq!(commands.len(), 3);
    }

    #[test]
    fn failed_reload_keeps_previous_entry() {
        let (source, dir) = temp_source();
        let commands = live(&source);

        fs::write(dir.path().join("bot/ping.json"), "{ broken").unwrap();
        let summary = reload(&source, &commands, ScanFilter::Command("ping")).unwrap();

        assert!(summary.reloaded.is_empty());
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.to_string().contains("Failed to reload 1 files"));
        assert_eq!(commands.get("ping").unwrap().schema.description, "Latency");
    }

    #[test]
    fn module_reload_aggregates() {
        let (source, dir) = temp_source();
        let commands = live(&source);

        write_def(dir.path(), "utility/avatar.json", "avatar", "avatar", "New avatar");
        fs::write(dir.path().join("local/utility/broken.json"), "[]").unwrap();

        let summary = reload(&source, &commands, ScanFilter::Module("utility")).unwrap();

        assert_eq!(summary.reloaded, ["avatar", "test"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(commands.get("avatar").unwrap().schema.description, "New avatar");
        assert!(commands.get("test").unwrap().local);
    }

    #[test]
    fn reload_new_file_adds_command() {
        let (source, dir) = temp_source();
        let commands = live(&source);

        write_def(dir.path(), "bot/pong.json", "pong", "ping", "New");
        let summary = reload(&source, &commands, ScanFilter::All).unwrap();

        assert_eq!(summary.reloaded.len(), 4);
        assert!(commands.get("pong").is_some());
    }

    #[test]
    fn reloaded_commands_become_runnable() {
        let (source, dir) = temp_source();
        let commands = live(&source);
        let (registry, _reg_dir) = crate::registry::tests::temp_registry();

        write_def(dir.path(), "fun/pong.json", "pong", "ping", "New");
        let summary = reload(&source, &commands, ScanFilter::Module("fun")).unwrap();
        assert!(!registry.is_runnable("pong"));

        summary.register(&registry).unwrap();
        assert!(registry.is_runnable("pong"));
        assert_eq!(
            registry.commands().get("pong").unwrap().module.as_deref(),
            Some("fun")
        );
    }

    #[test]
    fn module_reload_leaves_other_module_winner() {
        let (source, dir) = temp_source();
        let commands = Commands::new();
        let (registry, _reg_dir) = crate::registry::tests::temp_registry();
        install(&commands, source.scan(ScanFilter::All, Load::Cached).unwrap())
            .register(&registry)
            .unwrap();

        write_def(dir.path(), "bot/test.json", "test", "ping", "Loses to utility");
        let summary = reload(&source, &commands, ScanFilter::Module("bot")).unwrap();
        summary.register(&registry).unwrap();

        assert_eq!(summary.reloaded, ["ping"]);
        assert_eq!(commands.get("test").unwrap().schema.description, "Local");
        assert_eq!(
            registry.commands().get("test").unwrap().module.as_deref(),
            Some("utility")
        );
    }

    #[test]
    fn unknown_targets() {
        let (source, _dir) = temp_source();
        let commands = live(&source);

        assert!(matches!(
            reload(&source, &commands, ScanFilter::Command("nope")),
            Err(ReloadError::CommandNotFound(_))
        ));
        assert!(matches!(
            reload(&source, &commands, ScanFilter::Module("nope")),
            Err(ReloadError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn empty_summary_text() {
        assert_eq!(ReloadSummary::default().to_string(), "No commands found to reload.");
    }
}
