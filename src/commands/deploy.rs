//! Remote command set reconciliation.
//!
//! The platform only supports replacing the whole command set of a scope, so
//! every deploy reads the remote set, merges local schemas into it and writes
//! the result back. Entries this process does not know about are kept as is.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;
use twilight_http::Client;
use twilight_model::id::marker::{ApplicationMarker, GuildMarker};
use twilight_model::id::Id;

use crate::commands::definition::twilight::TwilightCommand;
use crate::commands::source::{CommandSource, Duplicate, Load, ScanError, ScanFilter};
use crate::utils;
use crate::utils::prelude::*;

/// Which local commands to deploy.
pub type DeployTarget<'a> = ScanFilter<'a>;

/// Remote command set to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Scope {
    #[display(fmt = "globally")]
    Global,

    #[display(fmt = "to guild {}", _0)]
    Guild(Id<GuildMarker>),
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Command '{0}' not found")]
    CommandNotFound(String),

    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    /// Nothing valid to deploy.
    #[error("No valid commands found to deploy{}", .0.as_ref().map(|m| format!(" in module '{m}'")).unwrap_or_default())]
    Empty(Option<String>),

    /// Command source could not be scanned.
    #[error("Failed to scan commands: {0:#}")]
    Source(anyhow::Error),

    /// The platform rejected a read or write.
    #[error("Remote API error: {0:#}")]
    Remote(anyhow::Error),
}

/// Access to the platform's registered command sets.
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// Currently registered commands of a scope.
    async fn commands(&self, scope: Scope) -> AnyResult<Vec<TwilightCommand>>;

    /// Replace the whole command set of a scope.
    async fn set_commands(&self, scope: Scope, commands: &[TwilightCommand]) -> AnyResult<()>;
}

/// [`CommandApi`] over the discord http client.
#[derive(Debug, Clone)]
pub struct HttpCommandApi {
    http: Arc<Client>,
    application_id: Id<ApplicationMarker>,
}

impl HttpCommandApi {
    pub const fn new(http: Arc<Client>, application_id: Id<ApplicationMarker>) -> Self {
        Self {
            http,
            application_id,
        }
    }
}

#[async_trait]
impl CommandApi for HttpCommandApi {
    async fn commands(&self, scope: Scope) -> AnyResult<Vec<TwilightCommand>> {
        let interaction = self.http.interaction(self.application_id);
        let commands = match scope {
            Scope::Global => interaction.global_commands().await?.models().await?,
            Scope::Guild(id) => interaction.guild_commands(id).await?.models().await?,
        };
        Ok(commands)
    }

    async fn set_commands(&self, scope: Scope, commands: &[TwilightCommand]) -> AnyResult<()> {
        let interaction = self.http.interaction(self.application_id);
        match scope {
            Scope::Global => interaction.set_global_commands(commands).await?,
            Scope::Guild(id) => interaction.set_guild_commands(id, commands).await?,
        };
        Ok(())
    }
}

/// Remote entries with names not among `local` stay in place, `local` is appended.
pub fn merge_replacing(
    remote: Vec<TwilightCommand>,
    local: Vec<TwilightCommand>,
) -> Vec<TwilightCommand> {
    let names = local.iter().map(|c| c.name.to_owned()).collect::<HashSet<_>>();
    remote
        .into_iter()
        .filter(|c| !names.contains(&c.name))
        .chain(local)
        .collect()
}

/// Append local commands whose names are not registered yet.
/// Returns the merged set and the names that were added.
pub fn merge_missing(
    remote: Vec<TwilightCommand>,
    local: Vec<TwilightCommand>,
) -> (Vec<TwilightCommand>, Vec<String>) {
    let known = remote.iter().map(|c| c.name.to_owned()).collect::<HashSet<_>>();
    let missing = local
        .into_iter()
        .filter(|c| !known.contains(&c.name))
        .collect::<Vec<_>>();
    let added = missing.iter().map(|c| c.name.to_owned()).collect();

    let mut merged = remote;
    merged.extend(missing);
    (merged, added)
}

/// Outcome of a deploy.
#[derive(Debug)]
pub struct DeploySummary {
    pub scope: Scope,

    /// Names written to the remote set by this deploy.
    pub deployed: Vec<String>,

    /// Size of the remote set after the deploy.
    pub registered: usize,

    /// Files skipped by the scan.
    pub errors: Vec<ScanError>,
    pub duplicates: Vec<Duplicate>,
}

impl DeploySummary {
    /// Returns `true` if the remote set was left untouched.
    pub fn is_unchanged(&self) -> bool {
        self.deployed.is_empty()
    }
}

impl fmt::Display for DeploySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unchanged() {
            write!(f, "All commands already deployed {}, no changes made.", self.scope)?;
        } else {
            write!(
                f,
                "Deployed {} {}: `{}` ({} registered).",
                plural(self.deployed.len(), "command"),
                self.scope,
                self.deployed.join("`, `"),
                self.registered
            )?;
        }
        for duplicate in &self.duplicates {
            write!(
                f,
                "\nDuplicate `{}`: using '{}'",
                duplicate.name,
                duplicate.winner.display()
            )?;
        }
        for error in &self.errors {
            write!(f, "\nSkipped {error}")?;
        }
        Ok(())
    }
}

/// Outcome of removing a command from a remote set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeploySummary {
    pub scope: Scope,
    pub name: String,
    pub registered: usize,
}

impl fmt::Display for UndeploySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Removed `{}` {} ({} registered).",
            self.name, self.scope, self.registered
        )
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Deploys local schemas to the platform, one operation per scope at a time.
pub struct Deployer {
    api: Arc<dyn CommandApi>,
    locks: std::sync::Mutex<HashMap<Scope, Arc<tokio::sync::Mutex<()>>>>,
}

impl fmt::Debug for Deployer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployer").finish_non_exhaustive()
    }
}

impl Deployer {
    pub fn new(api: Arc<dyn CommandApi>) -> Self {
        Self {
            api,
            locks: Default::default(),
        }
    }

    fn scope_lock(&self, scope: Scope) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(utils::lock(&self.locks).entry(scope).or_default())
    }

    /// Deploy local commands to a scope.
    ///
    /// A command or module target replaces the remote entries of the same
    /// names. An unfiltered deploy only adds names the remote set lacks and
    /// skips the write when there are none.
    pub async fn deploy(
        &self,
        source: &CommandSource,
        target: DeployTarget<'_>,
        scope: Scope,
    ) -> Result<DeploySummary, DeployError> {
        let scan = source
            .scan(target, Load::Fresh)
            .map_err(DeployError::Source)?;

        match target {
            ScanFilter::Command(name) if scan.commands.is_empty() => {
                return Err(DeployError::CommandNotFound(name.to_string()));
            },
            ScanFilter::Module(name) if !scan.modules.contains(name) => {
                return Err(DeployError::ModuleNotFound(name.to_string()));
            },
            ScanFilter::Module(name) if scan.commands.is_empty() => {
                return Err(DeployError::Empty(Some(name.to_string())));
            },
            ScanFilter::All if scan.commands.is_empty() => {
                return Err(DeployError::Empty(None));
            },
            _ => (),
        }

        let local = scan.schemas();

        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let remote = self.api.commands(scope).await.map_err(|e| {
            error!("Failed to fetch commands {scope}: {e:#}");
            DeployError::Remote(e)
        })?;

        let (merged, deployed) = match target {
            ScanFilter::All => merge_missing(remote, local),
            ScanFilter::Command(_) | ScanFilter::Module(_) => {
                let names = scan.names().into_iter().map(String::from).collect();
                (merge_replacing(remote, local), names)
            },
        };

        if deployed.is_empty() {
            info!("All commands already deployed {scope}");
        } else {
            self.api.set_commands(scope, &merged).await.map_err(|e| {
                error!("Failed to write commands {scope}: {e:#}");
                DeployError::Remote(e)
            })?;
            info!("Deployed {deployed:?} {scope}, {} registered", merged.len());
        }

        Ok(DeploySummary {
            scope,
            deployed,
            registered: merged.len(),
            errors: scan.errors,
            duplicates: scan.duplicates,
        })
    }

    /// Remove one command from the remote set of a scope.
    pub async fn undeploy(&self, name: &str, scope: Scope) -> Result<UndeploySummary, DeployError> {
        let lock = self.scope_lock(scope);
        let _guard = lock.lock().await;

        let remote = self.api.commands(scope).await.map_err(DeployError::Remote)?;

        if !remote.iter().any(|c| c.name == name) {
            return Err(DeployError::CommandNotFound(name.to_string()));
        }

        let remaining = remote
            .into_iter()
            .filter(|c| c.name != name)
            .collect::<Vec<_>>();

        self.api
            .set_commands(scope, &remaining)
            .await
            .map_err(|e| {
                error!("Failed to write commands {scope}: {e:#}");
                DeployError::Remote(e)
            })?;

        info!("Removed command '{name}' {scope}");

        Ok(UndeploySummary {
            scope,
            name: name.to_string(),
            registered: remaining.len(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use twilight_model::application::command::CommandType;
    use twilight_util::builder::command::CommandBuilder;

    use super::*;
    use crate::commands::function::mock;
    use crate::commands::source::tests::{temp_source, write_def};

    /// In-memory remote command sets.
    #[derive(Debug, Default)]
    pub struct FakeApi {
        pub sets: Mutex<HashMap<Scope, Vec<TwilightCommand>>>,
        pub writes: Mutex<Vec<(Scope, Vec<TwilightCommand>)>>,
        pub fail: bool,
    }

    impl FakeApi {
        pub fn with(scope: Scope, commands: Vec<TwilightCommand>) -> Self {
            let api = Self::default();
            api.sets.lock().unwrap().insert(scope, commands);
            api
        }

        pub fn set(&self, scope: Scope) -> Vec<TwilightCommand> {
            self.sets
                .lock()
                .unwrap()
                .get(&scope)
                .cloned()
                .unwrap_or_default()
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommandApi for FakeApi {
        async fn commands(&self, scope: Scope) -> AnyResult<Vec<TwilightCommand>> {
            if self.fail {
                anyhow::bail!("Missing Access");
            }
            let set = self.set(scope);
            // Let concurrent deploys interleave here.
            tokio::task::yield_now().await;
            Ok(set)
        }

        async fn set_commands(&self, scope: Scope, commands: &[TwilightCommand]) -> AnyResult<()> {
            self.sets.lock().unwrap().insert(scope, commands.to_vec());
            self.writes.lock().unwrap().push((scope, commands.to_vec()));
            Ok(())
        }
    }

    const GUILD: Scope = Scope::Guild(Id::new(1234));

    /// A command as the platform returns it.
    pub fn remote(name: &str, description: &str, id: u64) -> TwilightCommand {
        let mut cmd = CommandBuilder::new(name, description, CommandType::ChatInput).build();
        cmd.id = Some(Id::new(id));
        cmd.application_id = Some(Id::new(99));
        cmd.version = Id::new(id);
        cmd
    }

    fn bytes(cmd: &TwilightCommand) -> Vec<u8> {
        serde_json::to_vec(cmd).unwrap()
    }

    #[tokio::test]
    async fn filtered_deploy_replaces_only_target() {
        let dir = tempfile::tempdir().unwrap();
        write_def(dir.path(), "utility/b.json", "b", "ping", "version 2");
        write_def(dir.path(), "utility/c.json", "c", "ping", "not deployed");
        let source = CommandSource::new(dir.path(), mock::handlers());

        let a = remote("a", "first", 1);
        let api = Arc::new(FakeApi::with(GUILD, vec![a.clone(), remote("b", "version 1", 2)]));
        let deployer = Deployer::new(api.clone());

        let summary = deployer
            .deploy(&source, DeployTarget::Command("b"), GUILD)
            .await
            .unwrap();

        assert_eq!(summary.deployed, ["b"]);
        assert_eq!(summary.registered, 2);

        let written = api.set(GUILD);
        assert_eq!(
            written.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["a", "b"]
        );
        assert_eq!(bytes(&written[0]), bytes(&a));
        assert_eq!(written[1].description, "version 2");
    }

    #[tokio::test]
    async fn unfiltered_deploy_only_adds_missing() {
        let (source, _dir) = temp_source();
        let ping = remote("ping", "deployed elsewhere", 1);
        let other = remote("other", "owned by another process", 2);
        let api = Arc::new(FakeApi::with(GUILD, vec![ping.clone(), other.clone()]));
        let deployer = Deployer::new(api.clone());

        let summary = deployer
            .deploy(&source, DeployTarget::All, GUILD)
            .await
            .unwrap();

        assert_eq!(summary.deployed, ["avatar", "test"]);
        assert_eq!(summary.duplicates.len(), 1);

        let written = api.set(GUILD);
        assert_eq!(
            written.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["ping", "other", "avatar", "test"]
        );
        assert_eq!(bytes(&written[0]), bytes(&ping));
        assert_eq!(bytes(&written[1]), bytes(&other));
    }

    #[tokio::test]
    async fn unfiltered_deploy_without_news_skips_write() {
        let (source, _dir) = temp_source();
        let api = Arc::new(FakeApi::with(GUILD, vec![
            remote("ping", "x", 1),
            remote("avatar", "x", 2),
            remote("test", "x", 3),
        ]));
        let deployer = Deployer::new(api.clone());

        let summary = deployer
            .deploy(&source, DeployTarget::All, GUILD)
            .await
            .unwrap();

        assert!(summary.is_unchanged());
        assert!(summary.to_string().starts_with("All commands already deployed"));
        assert_eq!(api.write_count(), 0);
    }

    #[tokio::test]
    async fn module_deploy_replaces_module_commands() {
        let (source, _dir) = temp_source();
        let api = Arc::new(FakeApi::with(Scope::Global, vec![
            remote("avatar", "old", 1),
            remote("ping", "kept", 2),
        ]));
        let deployer = Deployer::new(api.clone());

        let summary = deployer
            .deploy(&source, DeployTarget::Module("utility"), Scope::Global)
            .await
            .unwrap();

        assert_eq!(summary.deployed, ["avatar", "test"]);
        let written = api.set(Scope::Global);
        assert_eq!(
            written.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            ["ping", "avatar", "test"]
        );
        assert_eq!(written[0].description, "kept");
        assert_eq!(written[1].description, "Avatar");
        // Scopes are independent.
        assert!(api.set(GUILD).is_empty());
    }

    #[tokio::test]
    async fn module_deploy_skips_names_won_elsewhere() {
        let (source, dir) = temp_source();
        write_def(dir.path(), "bot/test.json", "test", "ping", "Loses to utility");
        let api = Arc::new(FakeApi::with(GUILD, vec![remote("test", "Local", 1)]));
        let deployer = Deployer::new(api.clone());

        let summary = deployer
            .deploy(&source, DeployTarget::Module("bot"), GUILD)
            .await
            .unwrap();

        assert_eq!(summary.deployed, ["ping"]);
        let written = api.set(GUILD);
        let test = written.iter().find(|c| c.name == "test").unwrap();
        assert_eq!(test.description, "Local");
    }

    #[tokio::test]
    async fn unknown_targets_fail_before_any_call() {
        let (source, _dir) = temp_source();
        let api = Arc::new(FakeApi {
            fail: true,
            ..Default::default()
        });
        let deployer = Deployer::new(api.clone());

        assert!(matches!(
            deployer.deploy(&source, DeployTarget::Command("nope"), GUILD).await,
            Err(DeployError::CommandNotFound(name)) if name == "nope"
        ));
        assert!(matches!(
            deployer.deploy(&source, DeployTarget::Module("nope"), GUILD).await,
            Err(DeployError::ModuleNotFound(_))
        ));
        assert_eq!(api.write_count(), 0);
    }

    #[tokio::test]
    async fn remote_failure_aborts() {
        let (source, _dir) = temp_source();
        let api = Arc::new(FakeApi {
            fail: true,
            ..Default::default()
        });
        let deployer = Deployer::new(api.clone());

        let err = deployer
            .deploy(&source, DeployTarget::Command("ping"), GUILD)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::Remote(_)));
        assert!(err.to_string().contains("Missing Access"));
        assert_eq!(api.write_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_deploys_to_one_scope_do_not_clobber() {
        let (source, _dir) = temp_source();
        let api = Arc::new(FakeApi::default());
        let deployer = Deployer::new(api.clone());

        let (a, b) = tokio::join!(
            deployer.deploy(&source, DeployTarget::Command("ping"), GUILD),
            deployer.deploy(&source, DeployTarget::Command("avatar"), GUILD),
        );
        a.unwrap();
        b.unwrap();

        let mut names = api
            .set(GUILD)
            .into_iter()
            .map(|c| c.name)
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, ["avatar", "ping"]);
    }

    #[tokio::test]
    async fn undeploy() {
        let api = Arc::new(FakeApi::with(GUILD, vec![
            remote("a", "x", 1),
            remote("b", "x", 2),
        ]));
        let deployer = Deployer::new(api.clone());

        let summary = deployer.undeploy("a", GUILD).await.unwrap();
        assert_eq!(summary.registered, 1);
        assert_eq!(api.set(GUILD)[0].name, "b");

        assert!(matches!(
            deployer.undeploy("a", GUILD).await,
            Err(DeployError::CommandNotFound(_))
        ));
        assert_eq!(api.write_count(), 1);
    }
}
