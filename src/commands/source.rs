//! Discovery of command definition files.
//!
//! ```text
//! commands/
//! ├── admin/command.json
//! ├── utility/avatar.json
//! └── local/
//!     └── utility/avatar.json   <- visited last, wins over utility/avatar.json
//! ```
//!
//! Module folders are visited in name order, then the folders under `local/`
//! in name order, and the files of each folder in name order. When a name is
//! declared twice, the file visited last wins.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::commands::definition::twilight::{CommandValidationError, SlashCommand, TwilightCommand};
use crate::commands::definition::CommandDefinition;
use crate::commands::function::{Function, Handlers};
use crate::utils;
use crate::utils::consts::{DEFINITION_EXT, LOCAL_DIR};
use crate::utils::prelude::*;

/// A command definition paired with its compiled handler.
#[derive(Debug, Clone)]
pub struct LoadedCommand {
    pub name: String,
    pub module: String,
    pub path: PathBuf,

    /// Found under the local overrides folder.
    pub local: bool,
    pub definition: Arc<CommandDefinition>,
    pub schema: TwilightCommand,
    pub function: Function,
}

/// Per-file scan failure.
#[derive(Debug, Error)]
#[error("{}: {kind}", .path.display())]
pub struct ScanError {
    pub path: PathBuf,
    pub kind: ScanErrorKind,
}

#[derive(Debug, Error)]
pub enum ScanErrorKind {
    #[error("Failed to read: {0}")]
    Unreadable(#[source] io::Error),

    #[error("Malformed definition: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Definition has no command schema")]
    MissingSchema,

    #[error("Definition has no handler")]
    MissingHandler,

    #[error("Handler '{0}' is not compiled in")]
    UnknownHandler(String),

    #[error("Invalid command schema: {0}")]
    InvalidSchema(#[source] CommandValidationError),
}

/// A command name declared by more than one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub name: String,
    pub evicted: PathBuf,
    pub winner: PathBuf,
}

/// Which definitions a scan should yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFilter<'a> {
    All,
    Command(&'a str),
    Module(&'a str),
}

impl ScanFilter<'_> {
    /// Whether a scanned command is wanted.
    pub fn matches(&self, command: &LoadedCommand) -> bool {
        match *self {
            Self::All => true,
            Self::Command(name) => command.name == name,
            Self::Module(module) => command.module == module,
        }
    }

    /// Whether a failure of `file` should be reported.
    /// A broken file cannot tell its command name, so commands match by file name.
    fn matches_file(&self, file: &SourceFile) -> bool {
        match *self {
            Self::All => true,
            Self::Command(name) => file.path.file_stem().map_or(false, |stem| stem == name),
            Self::Module(module) => file.module == module,
        }
    }
}

/// How to treat previously parsed definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Load {
    /// Use the definition cache.
    Cached,

    /// Drop the cache entry of every visited file and read it again.
    Fresh,
}

/// Result of a scan.
#[derive(Debug, Default)]
pub struct Scan {
    /// Winning commands, in scan order.
    pub commands: Vec<LoadedCommand>,

    /// Module folder names that were visited.
    pub modules: BTreeSet<String>,
    pub errors: Vec<ScanError>,
    pub duplicates: Vec<Duplicate>,
}

impl Scan {
    pub fn get(&self, name: &str) -> Option<&LoadedCommand> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }

    /// Platform schemas of the scanned commands.
    pub fn schemas(&self) -> Vec<TwilightCommand> {
        self.commands.iter().map(|c| c.schema.to_owned()).collect()
    }
}

/// Parsed definitions memoised by canonical file path.
#[derive(Debug, Default)]
pub struct DefinitionCache(Mutex<HashMap<PathBuf, Arc<CommandDefinition>>>);

impl DefinitionCache {
    pub fn get(&self, path: &Path) -> Option<Arc<CommandDefinition>> {
        utils::lock(&self.0).get(path).cloned()
    }

    pub fn insert(&self, path: PathBuf, definition: Arc<CommandDefinition>) {
        utils::lock(&self.0).insert(path, definition);
    }

    /// Forget a path, returns `true` if it was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        utils::lock(&self.0).remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        utils::lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A definition file found on disk.
#[derive(Debug, Clone)]
struct SourceFile {
    path: PathBuf,
    module: String,
    local: bool,
}

/// The command definition tree.
#[derive(Debug)]
pub struct CommandSource {
    root: PathBuf,
    handlers: Handlers,
    cache: DefinitionCache,
}

impl CommandSource {
    pub fn new(root: impl Into<PathBuf>, handlers: Handlers) -> Self {
        Self {
            root: root.into(),
            handlers,
            cache: DefinitionCache::default(),
        }
    }

    pub fn cache(&self) -> &DefinitionCache {
        &self.cache
    }

    /// Scan the tree.
    ///
    /// # Errors
    /// Only if the root folder cannot be listed. Problems with single files
    /// are collected into [`Scan::errors`].
    pub fn scan(&self, filter: ScanFilter, load: Load) -> AnyResult<Scan> {
        let mut scan = Scan::default();

        // Filtered scans still visit the whole tree, so a name declared in a
        // later folder wins regardless of the filter.
        let files = self.source_files(&mut scan)?;

        // Slots keep scan order while earlier duplicates are evicted.
        let mut slots: Vec<Option<LoadedCommand>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for file in files {
            let loaded = match self.load(&file, load) {
                Ok(loaded) => loaded,
                Err(kind) => {
                    if filter.matches_file(&file) {
                        warn!("Skipping '{}': {kind}", file.path.display());
                        scan.errors.push(ScanError {
                            path: file.path,
                            kind,
                        });
                    }
                    continue;
                },
            };

            if let Some(previous) = index.get(&loaded.name).and_then(|&i| slots[i].take()) {
                if filter.matches(&previous) || filter.matches(&loaded) {
                    warn!(
                        "Command '{}' in '{}' replaces the one in '{}'",
                        loaded.name,
                        loaded.path.display(),
                        previous.path.display()
                    );
                    scan.duplicates.push(Duplicate {
                        name: loaded.name.to_owned(),
                        evicted: previous.path,
                        winner: loaded.path.to_owned(),
                    });
                }
            }

            index.insert(loaded.name.to_owned(), slots.len());
            slots.push(Some(loaded));
        }

        scan.commands = slots
            .into_iter()
            .flatten()
            .filter(|c| filter.matches(c))
            .collect();

        if let ScanFilter::Module(module) = filter {
            scan.modules.retain(|m| m == module);
        }

        debug!(
            "Scanned {} commands in {} modules ({} errors, {} duplicates)",
            scan.commands.len(),
            scan.modules.len(),
            scan.errors.len(),
            scan.duplicates.len()
        );

        Ok(scan)
    }

    /// List definition files in scan order.
    fn source_files(&self, scan: &mut Scan) -> AnyResult<Vec<SourceFile>> {
        let mut files = Vec::new();

        let regular = sorted_dirs(&self.root).with_context(|| {
            format!("Failed to list command folder '{}'", self.root.display())
        })?;

        let local_root = self.root.join(LOCAL_DIR);
        let local = if local_root.is_dir() {
            match sorted_dirs(&local_root) {
                Ok(dirs) => dirs,
                Err(e) => {
                    scan.errors.push(ScanError {
                        path: local_root,
                        kind: ScanErrorKind::Unreadable(e),
                    });
                    Vec::new()
                },
            }
        } else {
            Vec::new()
        };

        let regular = regular
            .into_iter()
            .filter(|(name, _)| name != LOCAL_DIR)
            .map(|dir| (dir, false));
        let local = local.into_iter().map(|dir| (dir, true));

        for ((name, dir), is_local) in regular.chain(local) {
            scan.modules.insert(name.to_owned());

            match definition_files(&dir) {
                Ok(paths) => files.extend(paths.into_iter().map(|path| SourceFile {
                    path,
                    module: name.to_owned(),
                    local: is_local,
                })),
                Err(e) => scan.errors.push(ScanError {
                    path: dir,
                    kind: ScanErrorKind::Unreadable(e),
                }),
            }
        }

        Ok(files)
    }

    /// Load one file through the cache and bind its handler.
    fn load(&self, file: &SourceFile, load: Load) -> Result<LoadedCommand, ScanErrorKind> {
        let key = fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.to_owned());

        if load == Load::Fresh && self.cache.invalidate(&key) {
            trace!("Invalidated cached definition '{}'", key.display());
        }

        let definition = match self.cache.get(&key) {
            Some(definition) => definition,
            None => {
                let definition = Arc::new(read_definition(&file.path)?);
                self.cache.insert(key, Arc::clone(&definition));
                definition
            },
        };

        let function = self
            .handlers
            .get(&definition.handler)
            .ok_or_else(|| ScanErrorKind::UnknownHandler(definition.handler.to_owned()))?;

        let schema = SlashCommand::try_from(&definition.data)
            .map_err(ScanErrorKind::InvalidSchema)?
            .into();

        Ok(LoadedCommand {
            name: definition.data.name.to_owned(),
            module: file.module.to_owned(),
            path: file.path.to_owned(),
            local: file.local,
            definition,
            schema,
            function,
        })
    }
}

/// Read and parse a definition file.
fn read_definition(path: &Path) -> Result<CommandDefinition, ScanErrorKind> {
    let text = fs::read_to_string(path).map_err(ScanErrorKind::Unreadable)?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(ScanErrorKind::Malformed)?;

    if value.get("data").is_none() {
        return Err(ScanErrorKind::MissingSchema);
    }
    if value.get("handler").is_none() {
        return Err(ScanErrorKind::MissingHandler);
    }

    serde_json::from_value(value).map_err(ScanErrorKind::Malformed)
}

/// Visible subfolders of `dir`, sorted by name.
fn sorted_dirs(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            warn!("Skipping non UTF-8 folder in '{}'", dir.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort();
    Ok(dirs)
}

/// Definition files directly in `dir`, sorted by name.
fn definition_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file()
            && path.extension().map_or(false, |ext| ext == DEFINITION_EXT)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
