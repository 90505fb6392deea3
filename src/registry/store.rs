use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::storage::JsonFile;
use crate::registry::RegistryError;
use crate::utils;
use crate::utils::prelude::*;

/// Persisted state of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub enabled: bool,
}

/// Persisted state of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub enabled: bool,
    pub module: Option<String>,
}

/// The registry document as written to disk.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleEntry>,

    #[serde(default)]
    pub commands: BTreeMap<String, CommandEntry>,
}

/// An entry that may still be in the old bare boolean encoding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry<T> {
    Legacy(bool),
    Current(T),
}

/// Registry document as found on disk, before migration.
#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    modules: BTreeMap<String, RawEntry<ModuleEntry>>,

    #[serde(default)]
    commands: BTreeMap<String, RawEntry<CommandEntry>>,
}

impl RawDocument {
    /// Upgrade legacy entries, returning the document and the number of upgraded entries.
    fn migrate(self) -> (RegistryDocument, usize) {
        let mut upgraded = 0;

        let modules = self
            .modules
            .into_iter()
            .map(|(name, entry)| {
                let entry = match entry {
                    RawEntry::Current(entry) => entry,
                    RawEntry::Legacy(enabled) => {
                        upgraded += 1;
                        ModuleEntry { enabled }
                    },
                };
                (name, entry)
            })
            .collect();

        let commands = self
            .commands
            .into_iter()
            .map(|(name, entry)| {
                let entry = match entry {
                    RawEntry::Current(entry) => entry,
                    RawEntry::Legacy(enabled) => {
                        upgraded += 1;
                        CommandEntry {
                            enabled,
                            module: None,
                        }
                    },
                };
                (name, entry)
            })
            .collect();

        (RegistryDocument { modules, commands }, upgraded)
    }
}

/// Persistent registry store.
///
/// Every mutation writes the whole document to disk before the in-memory
/// copy is replaced, so a failed write leaves both sides unchanged.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    document: Mutex<RegistryDocument>,
}

impl RegistryStore {
    /// Open the store, creating an empty document if the file does not exist.
    /// Legacy boolean entries are upgraded and written back once.
    pub fn open(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref().to_path_buf();

        let document = if path.exists() {
            let raw = JsonFile::read::<RawDocument>(&path).context("Failed to read registry")?;
            let (document, upgraded) = raw.migrate();
            if upgraded > 0 {
                info!("Upgraded {upgraded} legacy registry entries");
                JsonFile::write(&document, &path).context("Failed to write migrated registry")?;
            }
            document
        } else {
            JsonFile::read_or_create::<RegistryDocument>(&path)?
        };

        debug!(
            "Registry loaded with {} modules and {} commands",
            document.modules.len(),
            document.commands.len()
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access the document.
    pub fn read_with<R>(&self, f: impl FnOnce(&RegistryDocument) -> R) -> R {
        f(&utils::lock(&self.document))
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> RegistryDocument {
        self.read_with(Clone::clone)
    }

    /// Modify the document with a function and flush it to disk.
    ///
    /// The function works on a copy. If it fails, or leaves the document
    /// unchanged, nothing is written. The copy replaces the in-memory document
    /// only after it was written successfully.
    pub fn save_with<R>(
        &self,
        f: impl FnOnce(&mut RegistryDocument) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let mut document = utils::lock(&self.document);
        let mut next = document.clone();
        let out = f(&mut next)?;

        if next != *document {
            self.flush(&next)?;
            *document = next;
        }

        Ok(out)
    }

    /// Write a document, retrying once.
    fn flush(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        JsonFile::write(document, &self.path)
            .or_else(|e| {
                warn!("Registry write failed, retrying: {e:#}");
                JsonFile::write(document, &self.path)
            })
            .map_err(|e| {
                error!("Registry write failed: {e:#}");
                RegistryError::Io(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn legacy_entries_are_upgraded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(
            &path,
            r#"{
                "modules": { "utility": true, "bot": { "enabled": false } },
                "commands": {
                    "ping": false,
                    "avatar": { "enabled": true, "module": "utility" }
                }
            }"#,
        )
        .unwrap();

        let store = RegistryStore::open(&path).unwrap();
        let doc = store.snapshot();

        assert_eq!(doc.modules["utility"], ModuleEntry { enabled: true });
        assert_eq!(doc.modules["bot"], ModuleEntry { enabled: false });
        assert_eq!(doc.commands["ping"], CommandEntry {
            enabled: false,
            module: None
        });
        assert_eq!(doc.commands["avatar"].module.as_deref(), Some("utility"));

        // Never written back in the legacy form.
        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            on_disk["commands"]["ping"],
            serde_json::json!({ "enabled": false, "module": null })
        );
        assert_eq!(on_disk["modules"]["utility"], serde_json::json!({ "enabled": true }));
    }

    #[test]
    fn failed_mutation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let store = RegistryStore::open(&path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let res: Result<(), _> = store.save_with(|doc| {
            doc.modules
                .insert("x".to_string(), ModuleEntry { enabled: true });
            Err(RegistryError::NotFound {
                kind: crate::registry::EntryKind::Module,
                name: "x".to_string(),
            })
        });

        assert!(res.is_err());
        assert!(store.snapshot().modules.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn write_failure_keeps_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let store = RegistryStore::open(data.join("registry.json")).unwrap();

        // Replace the parent directory with a plain file so every write fails.
        fs::remove_dir_all(&data).unwrap();
        fs::write(&data, "").unwrap();

        let res = store.save_with(|doc| {
            doc.modules
                .insert("utility".to_string(), ModuleEntry { enabled: true });
            Ok(())
        });

        assert!(matches!(res, Err(RegistryError::Io(_))));
        assert!(store.snapshot().modules.is_empty());
    }
}
