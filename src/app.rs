use crossterm::style::Stylize;
use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::cli::Command;
use crate::error::{CoziError, Result};
use crate::model::config::{AppConfig, Layout};
use crate::model::tracked::{TrackedPlugin, is_plugin_name};
use crate::plugin::resolver::{DeclaredDependencySet, DependencyResolver};
use crate::plugin::scanner::{HeuristicScanner, ImportScanner};
use crate::plugin::state::StateStore;
use crate::plugin::sync::PluginSynchronizer;
use crate::toolchain::{Toolchain, query_version};
use crate::ui;

/// Sequences the plugin components and the external toolchain for each command.
pub struct App<'a> {
    config: &'a AppConfig,
    layout: Layout,
    store: StateStore,
    scanner: Box<dyn ImportScanner>,
    resolver: DependencyResolver,
    sync: PluginSynchronizer,
    toolchain: Toolchain,
}

impl<'a> App<'a> {
    pub fn new(config: &'a AppConfig, toolchain: Toolchain) -> Self {
        let layout = config.layout();
        Self {
            store: StateStore::new(layout.plugin_list.clone(), layout.plugin_repos.clone()),
            scanner: Box::new(HeuristicScanner::new(&config.scanner)),
            resolver: DependencyResolver::new(&config.resolver),
            sync: PluginSynchronizer::new(
                layout.plugin_repos.clone(),
                layout.active_plugins.clone(),
                config.sync.mirror,
            ),
            config,
            layout,
            toolchain,
        }
    }

    pub fn run(&self, command: &Command) -> Result<()> {
        if command.needs_setup() {
            self.ensure_initialized()?;
        }

        match command {
            Command::Add { source } => self.add(source),
            Command::Patch => self.patch(),
            Command::Delete { name } => self.delete(name),
            Command::Export { file } => self.export(file),
            Command::Import { file } => self.import(file),
            Command::List => self.list(),
            Command::Status => self.status(),
            Command::Update => self.update().map(|_| ()),
            Command::Uninstall => self.uninstall(),
        }
    }

    /// Creates missing state; clones and installs the main repository if absent.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.layout.root.exists() {
            ui::heading("Initializing Cozi...");
        }

        fs::create_dir_all(&self.layout.plugin_repos)
            .map_err(|e| CoziError::io(format!("create {}", self.layout.plugin_repos.display()), e))?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.layout.plugin_list)
            .map_err(|e| CoziError::io(format!("create {}", self.layout.plugin_list.display()), e))?;

        let marker = &self.layout.setup_marker;
        if !self.layout.manifest.is_file() {
            self.clone_framework()?;
        } else if marker.is_file() {
            return Ok(());
        }

        self.toolchain.packages.install(None, &self.layout.main_repo)?;
        fs::write(marker, "")
            .map_err(|e| CoziError::io(format!("write {}", marker.display()), e))?;
        tracing::info!(path = %self.layout.main_repo.display(), "main repository ready");
        ui::success("Cozi setup complete!");
        Ok(())
    }

    /// A main repo without its manifest is a clone that never finished.
    fn clone_framework(&self) -> Result<()> {
        let main_repo = &self.layout.main_repo;
        let marker = &self.layout.setup_marker;
        if marker.exists() {
            fs::remove_file(marker)
                .map_err(|e| CoziError::io(format!("remove {}", marker.display()), e))?;
        }
        if main_repo.exists() {
            tracing::warn!(path = %main_repo.display(), "discarding incomplete main repository");
            fs::remove_dir_all(main_repo).map_err(|source| CoziError::Remove {
                name: main_repo.display().to_string(),
                source,
            })?;
        }

        ui::progress("Cloning Vencord repository...");
        self.toolchain
            .vcs
            .clone_repo(&self.config.framework.repo_url, main_repo)
    }

    /// `source` is either a git link or a file of git links.
    pub fn add(&self, source: &str) -> Result<()> {
        let source = source.trim();
        let path = Path::new(source);
        if path.is_file() {
            ui::success(&format!("Reading plugin links from file: {source}"));
            self.add_from_file(path)?;
            ui::success("All plugins installed successfully!");
        } else {
            self.add_single(source)?;
        }

        ui::progress("Now, enable with cozi patch");
        Ok(())
    }

    pub fn import(&self, file: &Path) -> Result<()> {
        if !file.is_file() {
            return Err(CoziError::NotFound(format!("import file {}", file.display())));
        }

        ui::success(&format!("Importing plugin configuration from: {}", file.display()));
        self.add_from_file(file)?;
        ui::success("All plugins imported successfully!");
        Ok(())
    }

    /// Adds each non-blank, non-`#` line in order. Stops at the first failure.
    pub fn add_from_file(&self, file: &Path) -> Result<Vec<TrackedPlugin>> {
        let raw = fs::read_to_string(file)
            .map_err(|e| CoziError::io(format!("read {}", file.display()), e))?;

        let mut added = Vec::new();
        for line in raw.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(plugin) = self.add_single(line)? {
                added.push(plugin);
            }
        }
        Ok(added)
    }

    /// Clone → track → install missing packages → activate. Returns `None`
    /// when the source is already tracked.
    pub fn add_single(&self, source: &str) -> Result<Option<TrackedPlugin>> {
        let source = source.trim();
        let candidate = TrackedPlugin::new(source);
        if self.store.contains(source)? {
            ui::progress(&format!("Plugin {} already added.", candidate.name));
            return Ok(None);
        }

        ui::success(&format!("Adding plugin: {}...", candidate.name));
        let clone_dir = self.store.cache_entry(&candidate.name);
        self.toolchain.vcs.clone_repo(source, &clone_dir)?;
        let plugin = self.store.add(source)?;

        let declared = DeclaredDependencySet::load(&self.layout.manifest)?;
        let imports = self.scanner.scan(&clone_dir);
        let missing = self.resolver.resolve(&imports, &declared);
        tracing::debug!(
            name = %plugin.name,
            imports = imports.len(),
            missing = missing.len(),
            "dependencies resolved"
        );

        for package in &missing {
            ui::progress(&format!("Installing missing dependency: {package}"));
            self.toolchain
                .packages
                .install(Some(package.as_str()), &self.layout.main_repo)?;
            tracing::info!(name = %plugin.name, package = %package, "dependency installed");
        }

        ui::success(&format!("Copying plugin: {}...", plugin.name));
        self.sync.activate(&plugin.name)?;
        Ok(Some(plugin))
    }

    /// Removes the clone, the active copy and the list entries of a tracked
    /// plugin. Names that aren't tracked never touch the filesystem.
    pub fn delete(&self, name: &str) -> Result<()> {
        if !is_plugin_name(name) || !self.store.tracks_name(name)? {
            return Err(CoziError::NotFound(format!("plugin {name:?}")));
        }

        ui::success(&format!("Deleting plugin repository: {name}..."));
        if self.store.has_cache_entry(name) {
            fs::remove_dir_all(self.store.cache_entry(name)).map_err(|source| {
                CoziError::Remove {
                    name: name.to_string(),
                    source,
                }
            })?;
        } else {
            tracing::warn!(name, "tracked plugin had no clone");
        }

        if self.sync.is_active(name) {
            self.sync.deactivate(name)?;
        }

        self.store.remove(name)?;
        Ok(())
    }

    pub fn export(&self, dest: &Path) -> Result<()> {
        let parent = dest.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent.filter(|p| !p.is_dir()) {
            return Err(CoziError::NotFound(format!("directory {}", parent.display())));
        }

        let list = self.store.list_path();
        if !list.is_file() {
            return Err(CoziError::NotFound(
                "plugin list file (are any plugins installed?)".to_string(),
            ));
        }

        fs::copy(list, dest)
            .map_err(|e| CoziError::io(format!("export to {}", dest.display()), e))?;
        ui::success(&format!(
            "Plugin configuration successfully exported to {}.",
            dest.display()
        ));
        Ok(())
    }

    pub fn tracked(&self) -> Result<Vec<TrackedPlugin>> {
        self.store.list()?.collect()
    }

    pub fn list(&self) -> Result<()> {
        ui::heading("\nInstalled Plugins:");
        let plugins = self.tracked()?;
        if plugins.is_empty() {
            ui::alert("No plugins are installed.");
            return Ok(());
        }

        for plugin in plugins {
            ui::field("Repo Name:", plugin.name.green());
            ui::field("Git Link: ", plugin.source.blue());
            println!();
        }
        Ok(())
    }

    /// Pulls and re-activates every tracked plugin in list order. The first
    /// failure aborts the rest; returns the names that were refreshed.
    pub fn update(&self) -> Result<Vec<String>> {
        ui::success("Updating all plugins...");
        let mut updated: Vec<String> = Vec::new();

        for plugin in self.store.list()? {
            let plugin = plugin?;
            if updated.contains(&plugin.name) {
                continue;
            }
            if !self.store.has_cache_entry(&plugin.name) {
                tracing::warn!(name = %plugin.name, "tracked plugin has no clone, skipping");
                continue;
            }

            ui::progress(&format!("Updating: {}", plugin.name));
            self.toolchain
                .vcs
                .pull(&self.store.cache_entry(&plugin.name))
                .and_then(|()| self.sync.activate(&plugin.name).map(|_| ()))
                .inspect_err(|err| {
                    tracing::error!(name = %plugin.name, "update failed: {err}");
                    ui::error(&format!("Failed to update {}.", plugin.name));
                })?;
            updated.push(plugin.name);
        }

        ui::success("All plugins updated!");
        Ok(updated)
    }

    pub fn patch(&self) -> Result<()> {
        if !self.layout.main_repo.is_dir() {
            return Err(CoziError::NotFound("main repository directory".to_string()));
        }

        ui::success("Building and injecting Vencord...");
        self.toolchain.packages.build(&self.layout.main_repo)?;

        ui::success("Attempting Auto-Patch");
        let code = {
            let _raw = ui::RawModeGuard::engage();
            self.toolchain.injector.inject(&self.layout.main_repo)?
        };

        if code != 0 {
            return Err(CoziError::subprocess(
                "inject",
                format!("patching completed with errors (exit code {code})"),
            ));
        }

        ui::success("Vencord successfully patched!");
        Ok(())
    }

    pub fn status(&self) -> Result<()> {
        ui::heading("\n=== Cozi Status Report ===");

        if !self.layout.main_repo.is_dir() {
            return Err(CoziError::NotFound(
                "Vencord repository (did you initialize Cozi?)".to_string(),
            ));
        }
        ui::field("Vencord Repository:", "Found".to_string().green());
        ui::detail(&format!("Path: {}", self.layout.main_repo.display()));

        self.status_plugins()?;
        self.status_toolchain();
        self.status_dependencies();
        self.status_worktree();

        ui::heading("\n=== End of Cozi Status Report ===");
        Ok(())
    }

    fn status_plugins(&self) -> Result<()> {
        let plugins = self.tracked()?;
        if plugins.is_empty() {
            ui::alert("\nNo plugins installed.");
            return Ok(());
        }

        println!();
        ui::field("Installed Plugins:", plugins.len().to_string().green());
        for plugin in &plugins {
            if !self.store.has_cache_entry(&plugin.name) {
                ui::alert(&format!("  - {}: Missing", plugin.name));
                continue;
            }

            let state = if self.sync.is_active(&plugin.name) {
                "Installed"
            } else {
                "Installed (not copied into Vencord)"
            };
            ui::success(&format!("  - {}: {state}", plugin.name));
            ui::detail(&format!("    Repository: {}", plugin.source));

            let clone = self.store.cache_entry(&plugin.name);
            let vcs = &self.toolchain.vcs;
            match vcs.current_commit(&clone).and_then(|commit| {
                vcs.current_branch(&clone).map(|branch| (commit, branch))
            }) {
                Ok((commit, branch)) => {
                    ui::detail(&format!("    Current Commit: {commit} (Branch: {branch})"));
                }
                Err(err) => {
                    tracing::debug!(name = %plugin.name, "commit lookup failed: {err}");
                    ui::alert("    Error: Unable to fetch commit details.");
                }
            }
        }
        Ok(())
    }

    fn status_toolchain(&self) {
        let runtime = &self.config.toolchain.runtime;
        match query_version(runtime) {
            Some(version) => ui::field(&format!("\n{runtime} Version:"), version.green()),
            None => ui::alert(&format!("\nError: {runtime} is not installed or not in PATH.")),
        }

        let manager = &self.config.toolchain.package_manager;
        match self.toolchain.packages.version() {
            Some(version) => ui::field(&format!("{manager} Version:"), version.green()),
            None => ui::alert(&format!("Error: {manager} is not installed or not in PATH.")),
        }
    }

    fn status_dependencies(&self) {
        let manifest = &self.layout.manifest;
        let declared = match DeclaredDependencySet::load(manifest) {
            Ok(declared) => declared,
            Err(CoziError::MalformedState { .. }) => {
                ui::alert(&format!("\nError: Unable to parse {}.", manifest.display()));
                return;
            }
            Err(err) => {
                ui::alert(&format!("\nError: {err}"));
                return;
            }
        };

        ui::progress(&format!(
            "\nDependencies in {} ({}):",
            self.config.framework.manifest,
            declared.len()
        ));
        if declared.is_empty() {
            ui::alert("  No dependencies found.");
        }
        for dep in &declared.runtime {
            ui::detail(&format!("  - {dep}"));
        }
        for dep in declared.dev.difference(&declared.runtime) {
            ui::detail(&format!("  - {dep} (dev)"));
        }
    }

    fn status_worktree(&self) {
        match self.toolchain.vcs.status_porcelain(&self.layout.main_repo) {
            Ok(changes) if changes.is_empty() => {
                ui::success("\nNo untracked or modified files in Vencord repository.");
            }
            Ok(changes) => {
                ui::progress("\nUntracked or Modified Files in Vencord Repository:");
                for change in changes {
                    ui::detail(&format!("  - {change}"));
                }
            }
            Err(err) => {
                tracing::debug!("porcelain status failed: {err}");
                ui::alert("\nError: Unable to check Vencord repository status.");
            }
        }
    }

    pub fn uninstall(&self) -> Result<()> {
        ui::alert("Uninstalling Cozi and removing all related files...");
        if self.layout.root.exists() {
            fs::remove_dir_all(&self.layout.root).map_err(|source| CoziError::Remove {
                name: self.layout.root.display().to_string(),
                source,
            })?;
        }
        tracing::info!(root = %self.layout.root.display(), "state removed");
        ui::success("Cozi has been successfully uninstalled.");
        Ok(())
    }
}
