//! Plugin lifecycle: load, unload, directory scans.

use std::path::{Path, PathBuf};

use routesh_terminal::{Command, CommandRegistry, Owner, STATUS_OK, ViewId};
use routesh_types::config::DEFAULT_MAX_PLUGINS;
use routesh_types::error::PluginError;

use crate::api::{PLUGIN_API_VERSION, PluginContext, Registrar, ShellPlugin};
use crate::descriptor::{DeclaredCommand, PluginDescriptor, is_descriptor_file};
use crate::loader::{CodeUnit, ModuleLoader};

/// A plugin command that was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCommand {
    pub name: String,
    pub view: ViewId,
    pub reason: String,
}

/// Outcome of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub name: String,
    pub version: String,
    /// Commands admitted into the registry.
    pub registered: usize,
    /// Commands rejected (collisions, malformed definitions).
    pub skipped: Vec<SkippedCommand>,
    /// The descriptor's informational command list.
    pub declared: Vec<DeclaredCommand>,
}

/// Outcome of a directory scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub loaded: Vec<LoadReport>,
    pub failures: Vec<(PathBuf, PluginError)>,
}

impl ScanReport {
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

/// One row of `show plugins`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSummary {
    pub name: String,
    pub version: String,
    pub description: String,
    pub commands: usize,
    pub origin: String,
}

/// A loaded plugin.
///
/// Field order matters: the instance drops before the code unit it came
/// from.
struct LoadedPlugin {
    descriptor: PluginDescriptor,
    commands: usize,
    instance: Box<dyn ShellPlugin>,
    unit: Box<dyn CodeUnit>,
}

/// Owns every loaded plugin and drives its lifecycle.
///
/// Commands a plugin contributes live in the caller's registry, tagged
/// with the plugin's name. Callers must unload plugins (or call
/// [`unload_all`](Self::unload_all)) before dropping the registry's
/// plugin commands and this manager.
pub struct PluginManager {
    loader: Box<dyn ModuleLoader>,
    plugins: Vec<LoadedPlugin>,
    max_plugins: usize,
}

impl PluginManager {
    pub fn new(loader: Box<dyn ModuleLoader>) -> Self {
        Self::with_capacity(loader, DEFAULT_MAX_PLUGINS)
    }

    pub fn with_capacity(loader: Box<dyn ModuleLoader>, max_plugins: usize) -> Self {
        Self {
            loader,
            plugins: Vec::new(),
            max_plugins,
        }
    }

    /// Load the plugin described by the descriptor at `path`.
    ///
    /// On any error the registry and the plugin list are unchanged.
    pub fn load(
        &mut self,
        path: &Path,
        registry: &mut CommandRegistry,
        ctx: &PluginContext<'_>,
    ) -> Result<LoadReport, PluginError> {
        let descriptor = PluginDescriptor::from_file(path)?;
        if self.is_loaded(&descriptor.name) {
            return Err(PluginError::DuplicatePlugin(descriptor.name));
        }
        if self.plugins.len() >= self.max_plugins {
            return Err(PluginError::CapacityExceeded(self.max_plugins));
        }

        let reference = descriptor.library.clone();
        let unit = self
            .loader
            .open(&reference, descriptor.base_dir())
            .map_err(|reason| PluginError::LoadFailed {
                reference: reference.clone(),
                reason,
            })?;
        let entry = unit
            .entry_point()
            .ok_or_else(|| PluginError::MissingRegistrationEntry(unit.origin()))?;

        let mut registrar = Registrar::new();
        let status = entry(&mut registrar);
        if status != STATUS_OK {
            return Err(PluginError::RegistrationFailed { reference, status });
        }
        let Some((api_version, mut instance)) = registrar.into_registered() else {
            return Err(PluginError::RegistrationFailed { reference, status });
        };
        if api_version != PLUGIN_API_VERSION {
            return Err(PluginError::IncompatibleApi {
                reference,
                found: api_version,
                expected: PLUGIN_API_VERSION,
            });
        }

        let name = descriptor.name.clone();
        let status = instance.init(ctx);
        if status != STATUS_OK {
            return Err(PluginError::InitFailed { name, status });
        }
        let commands = match instance.get_commands() {
            Ok(commands) => commands,
            Err(status) => {
                let cleanup = instance.cleanup(ctx);
                if cleanup != STATUS_OK {
                    log::warn!("Plugin {name} cleanup returned {cleanup}");
                }
                return Err(PluginError::CommandEnumerationFailed { name, status });
            },
        };

        let (registered, skipped) = admit(&name, commands, registry);
        for s in &skipped {
            log::warn!(
                "Plugin {name}: skipped command '{}' in {} view: {}",
                s.name,
                s.view,
                s.reason
            );
        }
        for d in &descriptor.commands {
            log::info!(
                "Plugin {name} declares command '{}' with handler '{}'",
                d.name,
                d.handler
            );
        }
        log::info!(
            "Loaded plugin {name} v{} from {} ({registered} commands)",
            descriptor.version,
            unit.origin()
        );

        let report = LoadReport {
            name,
            version: descriptor.version.clone(),
            registered,
            skipped,
            declared: descriptor.commands.clone(),
        };
        self.plugins.push(LoadedPlugin {
            descriptor,
            commands: registered,
            instance,
            unit,
        });
        Ok(report)
    }

    /// Unload a plugin: cleanup, remove its commands, release its code.
    pub fn unload(
        &mut self,
        name: &str,
        registry: &mut CommandRegistry,
        ctx: &PluginContext<'_>,
    ) -> Result<(), PluginError> {
        let idx = self
            .plugins
            .iter()
            .position(|p| p.descriptor.name == name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        let mut plugin = self.plugins.remove(idx);
        let status = plugin.instance.cleanup(ctx);
        if status != STATUS_OK {
            log::warn!("Plugin {name} cleanup returned {status}");
        }
        let removed = registry.remove_all_for(name);
        drop(plugin);
        log::info!("Unloaded plugin {name} ({removed} commands removed)");
        Ok(())
    }

    /// Unload every plugin, most recently loaded first.
    pub fn unload_all(&mut self, registry: &mut CommandRegistry, ctx: &PluginContext<'_>) {
        while let Some(name) = self.plugins.last().map(|p| p.descriptor.name.clone()) {
            if let Err(e) = self.unload(&name, registry, ctx) {
                log::warn!("{e}");
                self.plugins.pop();
            }
        }
    }

    /// Load every descriptor in `dir`, in file-name order, continuing past
    /// failures.
    pub fn load_all(
        &mut self,
        dir: &Path,
        registry: &mut CommandRegistry,
        ctx: &PluginContext<'_>,
    ) -> Result<ScanReport, PluginError> {
        let entries = std::fs::read_dir(dir).map_err(|e| PluginError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut report = ScanReport::default();
        let paths = descriptor_paths(
            dir,
            entries.map(|entry| entry.map(|e| e.path())),
            &mut report.failures,
        );
        for path in paths {
            match self.load(&path, registry, ctx) {
                Ok(loaded) => report.loaded.push(loaded),
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    report.failures.push((path, e));
                },
            }
        }
        log::info!(
            "Loaded {} plugin(s) from {} ({} failed)",
            report.loaded.len(),
            dir.display(),
            report.failures.len()
        );
        Ok(report)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.descriptor.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn max_plugins(&self) -> usize {
        self.max_plugins
    }

    /// Summaries in load order.
    pub fn list(&self) -> Vec<PluginSummary> {
        self.plugins
            .iter()
            .map(|p| PluginSummary {
                name: p.descriptor.name.clone(),
                version: p.descriptor.version.clone(),
                description: p.descriptor.description.clone(),
                commands: p.commands,
                origin: p.unit.origin(),
            })
            .collect()
    }
}

/// Register each command under the plugin's name, skipping rejects.
/// Descriptor files among `entries`, sorted by name. An entry that cannot
/// be read is recorded against `dir` and the rest are still returned.
fn descriptor_paths<I>(
    dir: &Path,
    entries: I,
    failures: &mut Vec<(PathBuf, PluginError)>,
) -> Vec<PathBuf>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() && is_descriptor_file(&path) => paths.push(path),
            Ok(_) => {},
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                failures.push((
                    dir.to_path_buf(),
                    PluginError::DirectoryUnreadable {
                        path: dir.to_path_buf(),
                        reason: e.to_string(),
                    },
                ));
            },
        }
    }
    paths.sort();
    paths
}

fn admit(
    plugin: &str,
    commands: Vec<Box<dyn Command>>,
    registry: &mut CommandRegistry,
) -> (usize, Vec<SkippedCommand>) {
    let mut registered = 0;
    let mut skipped = Vec::new();
    for command in commands {
        let name = command.name().to_string();
        let view = command.view();
        match registry.register(command, Owner::Plugin(plugin.to_string())) {
            Ok(()) => registered += 1,
            Err(e) => skipped.push(SkippedCommand {
                name,
                view,
                reason: e.to_string(),
            }),
        }
    }
    (registered, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;

    use routesh_terminal::{CommandDef, ParamKind, ParamSpec, Status, ViewScope};

    use crate::api::RegisterFn;
    use crate::loader::NativeLoader;

    thread_local! {
        static EVENTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn record(event: impl Into<String>) {
        EVENTS.with(|e| e.borrow_mut().push(event.into()));
    }

    fn events() -> Vec<String> {
        EVENTS.with(|e| e.borrow_mut().drain(..).collect())
    }

    struct TestPlugin {
        init_status: Status,
        commands: Result<Vec<(&'static str, ViewId)>, Status>,
    }

    impl ShellPlugin for TestPlugin {
        fn init(&mut self, ctx: &PluginContext<'_>) -> Status {
            record(format!("init {}", ctx.product_name));
            self.init_status
        }

        fn cleanup(&mut self, _ctx: &PluginContext<'_>) -> Status {
            record("cleanup");
            STATUS_OK
        }

        fn get_commands(&mut self) -> Result<Vec<Box<dyn Command>>, Status> {
            record("get_commands");
            self.commands.clone().map(|list| {
                list.into_iter()
                    .map(|(name, view)| CommandDef::new(name, "test", view).boxed())
                    .collect()
            })
        }
    }

    impl Drop for TestPlugin {
        fn drop(&mut self) {
            record("drop");
        }
    }

    fn good(r: &mut Registrar) -> Status {
        r.register(
            PLUGIN_API_VERSION,
            Box::new(TestPlugin {
                init_status: 0,
                commands: Ok(vec![
                    ("status", ViewId::Privileged),
                    ("info", ViewId::Privileged),
                ]),
            }),
        );
        0
    }

    fn other(r: &mut Registrar) -> Status {
        r.register(
            PLUGIN_API_VERSION,
            Box::new(TestPlugin {
                init_status: 0,
                commands: Ok(vec![("ping", ViewId::User)]),
            }),
        );
        0
    }

    fn init_fails(r: &mut Registrar) -> Status {
        r.register(
            PLUGIN_API_VERSION,
            Box::new(TestPlugin {
                init_status: 3,
                commands: Ok(Vec::new()),
            }),
        );
        0
    }

    fn enumeration_fails(r: &mut Registrar) -> Status {
        r.register(
            PLUGIN_API_VERSION,
            Box::new(TestPlugin {
                init_status: 0,
                commands: Err(5),
            }),
        );
        0
    }

    fn wrong_version(r: &mut Registrar) -> Status {
        r.register(
            PLUGIN_API_VERSION + 1,
            Box::new(TestPlugin {
                init_status: 0,
                commands: Ok(Vec::new()),
            }),
        );
        0
    }

    fn registers_nothing(_: &mut Registrar) -> Status {
        0
    }

    fn refuses(_: &mut Registrar) -> Status {
        -1
    }

    /// A loader whose units may lack an entry point.
    struct NoEntryLoader;

    struct NoEntryUnit;

    impl CodeUnit for NoEntryUnit {
        fn entry_point(&self) -> Option<RegisterFn> {
            None
        }
        fn origin(&self) -> String {
            "no-entry".into()
        }
    }

    impl ModuleLoader for NoEntryLoader {
        fn open(&self, _: &str, _: Option<&Path>) -> Result<Box<dyn CodeUnit>, String> {
            Ok(Box::new(NoEntryUnit))
        }
    }

    fn loader() -> Box<dyn ModuleLoader> {
        Box::new(
            NativeLoader::new(None)
                .with_builtin("good", good)
                .with_builtin("other", other)
                .with_builtin("init_fails", init_fails)
                .with_builtin("enumeration_fails", enumeration_fails)
                .with_builtin("wrong_version", wrong_version)
                .with_builtin("registers_nothing", registers_nothing)
                .with_builtin("refuses", refuses),
        )
    }

    fn ctx() -> PluginContext<'static> {
        PluginContext {
            product_name: "Router",
            user_data: None,
        }
    }

    fn descriptor(dir: &Path, file: &str, name: &str, library: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(
            &path,
            format!(
                r#"{{"name":"{name}","description":"{name} plugin","version":"1.0","library":"{library}"}}"#
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn load_registers_commands_with_owner() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "sys.json", "system", "builtin:good");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        events();

        let report = mgr.load(&path, &mut reg, &ctx()).unwrap();
        assert_eq!(report.name, "system");
        assert_eq!(report.registered, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(
            reg.owner_of("status", &ViewId::Privileged),
            Some(&Owner::Plugin("system".into()))
        );
        assert_eq!(events(), vec!["init Router", "get_commands"]);
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.list()[0].origin, "builtin:good");

        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn duplicate_plugin_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = descriptor(dir.path(), "a.json", "system", "builtin:good");
        let b = descriptor(dir.path(), "b.json", "system", "builtin:other");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        mgr.load(&a, &mut reg, &ctx()).unwrap();
        let err = mgr.load(&b, &mut reg, &ctx()).unwrap_err();
        assert!(matches!(err, PluginError::DuplicatePlugin(ref n) if n == "system"));
        assert_eq!(reg.len(), 2);
        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn capacity_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let a = descriptor(dir.path(), "a.json", "a", "builtin:good");
        let b = descriptor(dir.path(), "b.json", "b", "builtin:other");
        let mut mgr = PluginManager::with_capacity(loader(), 1);
        let mut reg = CommandRegistry::new();
        mgr.load(&a, &mut reg, &ctx()).unwrap();
        assert!(matches!(
            mgr.load(&b, &mut reg, &ctx()),
            Err(PluginError::CapacityExceeded(1))
        ));
        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn invalid_descriptor_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"name":"x","description":"d","library":"builtin:good"}"#).unwrap();
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        assert!(matches!(
            mgr.load(&path, &mut reg, &ctx()),
            Err(PluginError::InvalidDescriptor { .. })
        ));
        assert!(reg.is_empty());
        assert!(mgr.is_empty());
    }

    #[test]
    fn load_failed_for_unknown_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "x.json", "x", "builtin:missing");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        assert!(matches!(
            mgr.load(&path, &mut reg, &ctx()),
            Err(PluginError::LoadFailed { .. })
        ));
    }

    #[test]
    fn missing_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "x.json", "x", "anything");
        let mut mgr = PluginManager::new(Box::new(NoEntryLoader));
        let mut reg = CommandRegistry::new();
        assert!(matches!(
            mgr.load(&path, &mut reg, &ctx()),
            Err(PluginError::MissingRegistrationEntry(_))
        ));
    }

    #[test]
    fn registration_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();

        let p = descriptor(dir.path(), "a.json", "a", "builtin:refuses");
        assert!(matches!(
            mgr.load(&p, &mut reg, &ctx()),
            Err(PluginError::RegistrationFailed { status: -1, .. })
        ));
        let p = descriptor(dir.path(), "b.json", "b", "builtin:registers_nothing");
        assert!(matches!(
            mgr.load(&p, &mut reg, &ctx()),
            Err(PluginError::RegistrationFailed { status: 0, .. })
        ));
        let p = descriptor(dir.path(), "c.json", "c", "builtin:wrong_version");
        assert!(matches!(
            mgr.load(&p, &mut reg, &ctx()),
            Err(PluginError::IncompatibleApi { found, expected, .. }) if found == expected + 1
        ));
        assert!(mgr.is_empty());
    }

    #[test]
    fn init_failure_drops_plugin_without_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "x.json", "x", "builtin:init_fails");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        events();
        let err = mgr.load(&path, &mut reg, &ctx()).unwrap_err();
        assert!(matches!(err, PluginError::InitFailed { status: 3, .. }));
        assert_eq!(events(), vec!["init Router", "drop"]);
    }

    #[test]
    fn enumeration_failure_runs_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "x.json", "x", "builtin:enumeration_fails");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        events();
        let err = mgr.load(&path, &mut reg, &ctx()).unwrap_err();
        assert!(matches!(err, PluginError::CommandEnumerationFailed { status: 5, .. }));
        assert_eq!(events(), vec!["init Router", "get_commands", "cleanup", "drop"]);
        assert!(reg.is_empty());
    }

    #[test]
    fn colliding_commands_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "x.json", "x", "builtin:good");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        reg.register(
            CommandDef::new("status", "builtin", ViewId::Privileged).boxed(),
            Owner::Builtin,
        )
        .unwrap();
        let report = mgr.load(&path, &mut reg, &ctx()).unwrap();
        assert_eq!(report.registered, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "status");
        assert_eq!(reg.owner_of("status", &ViewId::Privileged), Some(&Owner::Builtin));
        mgr.unload_all(&mut reg, &ctx());
        assert!(reg.find("status", &ViewId::Privileged).is_some());
    }

    #[test]
    fn malformed_plugin_command_is_skipped() {
        struct Bad;
        impl ShellPlugin for Bad {
            fn get_commands(&mut self) -> Result<Vec<Box<dyn Command>>, Status> {
                Ok(vec![
                    CommandDef::new("ok", "", ViewId::User).boxed(),
                    CommandDef::new("pick", "", ViewId::User)
                        .param(ParamSpec::new("x", ParamKind::Choice(Vec::new())))
                        .boxed(),
                ])
            }
        }
        fn bad(r: &mut Registrar) -> Status {
            r.register(PLUGIN_API_VERSION, Box::new(Bad));
            0
        }
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "bad.json", "bad", "builtin:bad");
        let mut mgr = PluginManager::new(Box::new(NativeLoader::new(None).with_builtin("bad", bad)));
        let mut reg = CommandRegistry::new();
        let report = mgr.load(&path, &mut reg, &ctx()).unwrap();
        assert_eq!(report.registered, 1);
        assert_eq!(report.skipped[0].name, "pick");
        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn unload_removes_commands_and_runs_cleanup_before_drop() {
        let dir = tempfile::tempdir().unwrap();
        let a = descriptor(dir.path(), "a.json", "system", "builtin:good");
        let b = descriptor(dir.path(), "b.json", "net", "builtin:other");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        mgr.load(&a, &mut reg, &ctx()).unwrap();
        mgr.load(&b, &mut reg, &ctx()).unwrap();
        events();

        mgr.unload("system", &mut reg, &ctx()).unwrap();
        assert_eq!(events(), vec!["cleanup", "drop"]);
        assert!(reg.find("status", &ViewId::Privileged).is_none());
        assert!(reg.find("ping", &ViewId::User).is_some());
        assert!(!mgr.is_loaded("system"));

        assert!(matches!(
            mgr.unload("system", &mut reg, &ctx()),
            Err(PluginError::NotFound(_))
        ));
        mgr.unload_all(&mut reg, &ctx());
        assert!(reg.is_empty());
    }

    #[test]
    fn declared_commands_are_reported_not_registered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.json");
        fs::write(
            &path,
            r#"{"name":"d","description":"d","version":"1","library":"builtin:other",
                "commands":[{"name":"ghost","help":"never registered","handler":"cmd_ghost"}]}"#,
        )
        .unwrap();
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        let report = mgr.load(&path, &mut reg, &ctx()).unwrap();
        assert_eq!(report.declared.len(), 1);
        assert!(reg.find("ghost", ViewScope::Any).is_none());
        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn scan_counts_successes_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        descriptor(d, "1.json", "p1", "builtin:good");
        descriptor(d, "2.json", "p2", "builtin:other");
        fs::write(
            d.join("3.toml"),
            "name = \"p3\"\ndescription = \"d\"\nversion = \"1\"\nlibrary = \"builtin:good\"\n",
        )
        .unwrap();
        fs::write(d.join("4.json"), r#"{"name":"p4"}"#).unwrap();
        fs::write(d.join("5.json"), "{ broken").unwrap();
        fs::write(d.join(".hidden.json"), "{ ignored").unwrap();
        fs::write(d.join("notes.txt"), "ignored").unwrap();
        fs::create_dir(d.join("sub.json")).unwrap();

        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        let report = mgr.load_all(d, &mut reg, &ctx()).unwrap();
        assert_eq!(report.loaded_count(), 3);
        assert_eq!(report.failures.len(), 2);
        let failed: Vec<_> = report
            .failures
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(failed, vec!["4.json", "5.json"]);
        // p3 reuses p1's command names; the collisions are skipped, not fatal.
        assert_eq!(report.loaded[2].registered, 0);
        assert_eq!(report.loaded[2].skipped.len(), 2);
        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn scan_continues_past_lifecycle_failures() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        descriptor(d, "a.json", "a", "builtin:init_fails");
        descriptor(d, "b.json", "b", "builtin:other");
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        let report = mgr.load_all(d, &mut reg, &ctx()).unwrap();
        assert_eq!(report.loaded_count(), 1);
        assert!(matches!(report.failures[0].1, PluginError::InitFailed { .. }));
        mgr.unload_all(&mut reg, &ctx());
    }

    #[test]
    fn unreadable_entry_is_a_failure_not_an_abort() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path();
        let b = descriptor(d, "b.json", "b", "builtin:other");
        let a = descriptor(d, "a.json", "a", "builtin:good");
        fs::write(d.join("notes.txt"), "ignored").unwrap();
        let entries = vec![
            Ok(b.clone()),
            Err(std::io::Error::other("stale handle")),
            Ok(d.join("notes.txt")),
            Ok(a.clone()),
        ];
        let mut failures = Vec::new();
        let paths = descriptor_paths(d, entries, &mut failures);
        assert_eq!(paths, vec![a, b]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, d.to_path_buf());
        match &failures[0].1 {
            PluginError::DirectoryUnreadable { reason, .. } => {
                assert!(reason.contains("stale handle"))
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scan_of_missing_directory_fails() {
        let mut mgr = PluginManager::new(loader());
        let mut reg = CommandRegistry::new();
        assert!(matches!(
            mgr.load_all(Path::new("/nonexistent/plugins"), &mut reg, &ctx()),
            Err(PluginError::DirectoryUnreadable { .. })
        ));
    }

    #[test]
    fn shared_state_survives_until_unload() {
        struct Counter(Rc<RefCell<u32>>);
        impl ShellPlugin for Counter {
            fn get_commands(&mut self) -> Result<Vec<Box<dyn Command>>, Status> {
                let hits = Rc::clone(&self.0);
                Ok(vec![CommandDef::new("hit", "", ViewId::User)
                    .handler(move |_| {
                        *hits.borrow_mut() += 1;
                        STATUS_OK
                    })
                    .boxed()])
            }
        }
        fn counter(r: &mut Registrar) -> Status {
            r.register(PLUGIN_API_VERSION, Box::new(Counter(Rc::new(RefCell::new(0)))));
            0
        }
        let dir = tempfile::tempdir().unwrap();
        let path = descriptor(dir.path(), "c.json", "counter", "builtin:counter");
        let mut mgr =
            PluginManager::new(Box::new(NativeLoader::new(None).with_builtin("counter", counter)));
        let mut reg = CommandRegistry::new();
        mgr.load(&path, &mut reg, &ctx()).unwrap();
        assert!(reg.find("hit", &ViewId::User).is_some());
        mgr.unload("counter", &mut reg, &ctx()).unwrap();
        assert!(reg.is_empty());
    }
}
