use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub framework: FrameworkConfig,
    pub scanner: ScannerConfig,
    pub resolver: ResolverConfig,
    pub sync: SyncConfig,
    pub toolchain: ToolchainConfig,
    pub injector: InjectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub root_dir: String,
    pub plugin_repos: String,
    pub main_repo: String,
    pub plugin_list: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkConfig {
    pub repo_url: String,
    pub plugin_dir: String,
    pub manifest: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    pub extensions: Vec<String>,
    pub keyword: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    pub local_aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub mirror: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainConfig {
    pub vcs: String,
    pub package_manager: String,
    pub runtime: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InjectorConfig {
    pub args: Vec<String>,
    pub step_delay_ms: u64,
    pub keystrokes: Vec<String>,
}

/// Resolved on-disk locations, derived once from `[paths]` and `[framework]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub plugin_repos: PathBuf,
    pub main_repo: PathBuf,
    pub plugin_list: PathBuf,
    pub active_plugins: PathBuf,
    pub manifest: PathBuf,
    /// Written once the framework clone has had its frozen install.
    pub setup_marker: PathBuf,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config (merged per key).
    pub fn load() -> Result<Self> {
        let Some(config_path) = directories::ProjectDirs::from("", "", "cozi")
            .map(|d| d.config_dir().join("config.toml"))
            .filter(|path| path.exists())
        else {
            return Self::defaults();
        };

        let user_str = fs::read_to_string(&config_path)?;
        let user: toml::Table = toml::from_str(&user_str)
            .with_context(|| format!("invalid config {}", config_path.display()))?;

        let mut merged: toml::Table = toml::from_str(DEFAULTS)?;
        merge_tables(&mut merged, user);
        tracing::debug!(path = %config_path.display(), "user config merged");
        Self::from_table(merged)
    }

    /// Built-in defaults only, ignoring any user file.
    pub fn defaults() -> Result<Self> {
        Self::from_table(toml::from_str(DEFAULTS)?)
    }

    fn from_table(table: toml::Table) -> Result<Self> {
        let mut config: AppConfig = toml::Value::Table(table).try_into()?;

        // Expand ~ in root_dir
        if config.paths.root_dir.starts_with('~') {
            let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
            config.paths.root_dir =
                config
                    .paths
                    .root_dir
                    .replacen('~', &home.to_string_lossy(), 1);
        }

        Ok(config)
    }

    pub fn with_root(mut self, root: &Path) -> Self {
        self.paths.root_dir = root.to_string_lossy().into_owned();
        self
    }

    pub fn root_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.root_dir)
    }

    pub fn layout(&self) -> Layout {
        let root = self.root_dir();
        let main_repo = root.join(&self.paths.main_repo);
        Layout {
            plugin_repos: root.join(&self.paths.plugin_repos),
            plugin_list: root.join(&self.paths.plugin_list),
            active_plugins: main_repo.join(&self.framework.plugin_dir),
            manifest: main_repo.join(&self.framework.manifest),
            setup_marker: root.join(".setup-complete"),
            main_repo,
            root,
        }
    }
}

impl InjectorConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let toml::Value::Table(overlay_table) = value else {
            base.insert(key, value);
            continue;
        };

        if let Some(toml::Value::Table(base_table)) = base.get_mut(&key) {
            merge_tables(base_table, overlay_table);
            continue;
        }

        base.insert(key, toml::Value::Table(overlay_table));
    }
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_vencord_layout() {
        let config = AppConfig::defaults().unwrap().with_root(Path::new("/tmp/cozi"));
        let layout = config.layout();

        assert_eq!(layout.plugin_repos, PathBuf::from("/tmp/cozi/pluginRepos"));
        assert_eq!(layout.plugin_list, PathBuf::from("/tmp/cozi/pluginList.txt"));
        assert_eq!(
            layout.active_plugins,
            PathBuf::from("/tmp/cozi/mainRepo/src/userplugins")
        );
        assert_eq!(layout.manifest, PathBuf::from("/tmp/cozi/mainRepo/package.json"));
        assert_eq!(layout.setup_marker, PathBuf::from("/tmp/cozi/.setup-complete"));
        assert_eq!(config.scanner.extensions, vec!["js", "ts"]);
        assert_eq!(config.scanner.keyword, "from");
        assert!(!config.sync.mirror);
    }

    #[test]
    fn default_root_has_tilde_expanded() {
        let config = AppConfig::defaults().unwrap();
        assert!(!config.paths.root_dir.starts_with('~'));
        assert!(config.paths.root_dir.ends_with(".config/Vencord/cozi"));
    }

    #[test]
    fn user_keys_override_single_values_only() {
        let mut base: toml::Table = toml::from_str(DEFAULTS).unwrap();
        let user: toml::Table = toml::from_str("[sync]\nmirror = true\n").unwrap();
        merge_tables(&mut base, user);

        let config = AppConfig::from_table(base).unwrap();
        assert!(config.sync.mirror);
        assert_eq!(config.toolchain.package_manager, "pnpm");
    }

    #[test]
    fn keystrokes_decode_escape_sequences() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.injector.keystrokes[0], "\u{1b}[B\r\u{4}");
        assert_eq!(config.injector.step_delay(), Duration::from_secs(2));
    }
}
