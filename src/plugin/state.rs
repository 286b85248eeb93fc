use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

use crate::error::{CoziError, Result};
use crate::model::tracked::TrackedPlugin;

/// The tracked-plugin list (one source location per line) and the clone cache
/// it governs. Every mutation is written straight to disk.
#[derive(Debug, Clone)]
pub struct StateStore {
    list_path: PathBuf,
    cache_dir: PathBuf,
}

impl StateStore {
    pub fn new(list_path: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            list_path,
            cache_dir,
        }
    }

    pub fn list_path(&self) -> &Path {
        &self.list_path
    }

    /// Where the clone for `name` lives, whether or not it exists yet.
    pub fn cache_entry(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    pub fn has_cache_entry(&self, name: &str) -> bool {
        self.cache_entry(name).is_dir()
    }

    pub fn contains(&self, source: &str) -> Result<bool> {
        for plugin in self.list()? {
            if plugin?.source == source {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether any tracked source derives to `name`.
    pub fn tracks_name(&self, name: &str) -> Result<bool> {
        for plugin in self.list()? {
            if plugin?.name == name {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn add(&self, source: &str) -> Result<TrackedPlugin> {
        if self.contains(source)? {
            return Err(CoziError::AlreadyTracked(source.to_string()));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.list_path)
            .map_err(|e| CoziError::io(format!("open {}", self.list_path.display()), e))?;
        writeln!(file, "{source}")
            .map_err(|e| CoziError::io(format!("write {}", self.list_path.display()), e))?;

        let plugin = TrackedPlugin::new(source);
        tracing::info!(name = %plugin.name, source, "plugin tracked");
        Ok(plugin)
    }

    /// Drops every line whose derived name is exactly `name`.
    pub fn remove(&self, name: &str) -> Result<Vec<TrackedPlugin>> {
        let raw = self.read_raw()?;
        let mut kept = String::with_capacity(raw.len());
        let mut removed = Vec::new();

        for line in raw.lines() {
            let source = line.trim();
            if !source.is_empty() {
                let plugin = TrackedPlugin::new(source);
                if plugin.name == name {
                    removed.push(plugin);
                    continue;
                }
            }
            kept.push_str(line);
            kept.push('\n');
        }

        if removed.is_empty() {
            return Err(CoziError::NotFound(format!("plugin {name}")));
        }

        fs::write(&self.list_path, kept)
            .map_err(|e| CoziError::io(format!("write {}", self.list_path.display()), e))?;
        tracing::info!(name, count = removed.len(), "plugin untracked");
        Ok(removed)
    }

    /// Re-reads the list file on every call; yields entries in insertion order.
    pub fn list(&self) -> Result<TrackedPlugins> {
        let lines = match File::open(&self.list_path) {
            Ok(file) => Some(BufReader::new(file).lines()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(CoziError::io(
                    format!("open {}", self.list_path.display()),
                    e,
                ));
            }
        };

        Ok(TrackedPlugins {
            lines,
            path: self.list_path.clone(),
        })
    }

    fn read_raw(&self) -> Result<String> {
        match fs::read_to_string(&self.list_path) {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(CoziError::io(
                format!("read {}", self.list_path.display()),
                e,
            )),
        }
    }
}

/// Lazy iterator over the persisted list. Blank lines are skipped.
pub struct TrackedPlugins {
    lines: Option<Lines<BufReader<File>>>,
    path: PathBuf,
}

impl Iterator for TrackedPlugins {
    type Item = Result<TrackedPlugin>;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.lines.as_mut()?;
        loop {
            match lines.next()? {
                Ok(line) => {
                    let source = line.trim();
                    if !source.is_empty() {
                        return Some(Ok(TrackedPlugin::new(source)));
                    }
                }
                Err(e) => {
                    return Some(Err(CoziError::io(
                        format!("read {}", self.path.display()),
                        e,
                    )));
                }
            }
        }
    }
}
