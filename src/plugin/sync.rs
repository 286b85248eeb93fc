use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CoziError, Result};
use crate::plugin::scanner::VCS_DIR;

/// Copies plugin clones into the framework's plugin-loading directory.
#[derive(Debug, Clone)]
pub struct PluginSynchronizer {
    cache_dir: PathBuf,
    active_dir: PathBuf,
    mirror: bool,
}

impl PluginSynchronizer {
    pub fn new(cache_dir: PathBuf, active_dir: PathBuf, mirror: bool) -> Self {
        Self {
            cache_dir,
            active_dir,
            mirror,
        }
    }

    pub fn active_entry(&self, name: &str) -> PathBuf {
        self.active_dir.join(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_entry(name).is_dir()
    }

    /// Copies the clone of `name` over its active copy, minus VCS metadata.
    /// Files that exist only in the active copy are left alone unless mirroring.
    pub fn activate(&self, name: &str) -> Result<PathBuf> {
        let source = self.cache_dir.join(name);
        if !source.is_dir() {
            return Err(CoziError::NotFound(format!("plugin {name}")));
        }

        let dest = self.active_entry(name);
        if self.mirror && dest.exists() {
            fs::remove_dir_all(&dest).map_err(|source| CoziError::Copy {
                name: name.to_string(),
                source,
            })?;
        }

        copy_tree(&source, &dest).map_err(|source| CoziError::Copy {
            name: name.to_string(),
            source,
        })?;

        tracing::info!(name, dest = %dest.display(), mirror = self.mirror, "plugin activated");
        Ok(dest)
    }

    pub fn deactivate(&self, name: &str) -> Result<()> {
        let dest = self.active_entry(name);
        if !dest.is_dir() {
            return Err(CoziError::NotFound(format!("active plugin {name}")));
        }

        fs::remove_dir_all(&dest).map_err(|source| CoziError::Remove {
            name: name.to_string(),
            source,
        })?;

        tracing::info!(name, "plugin deactivated");
        Ok(())
    }
}

fn copy_tree(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;

    // Linked directories are copied as their contents, like regular ones.
    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(true)
        .filter_entry(|entry| entry.file_name() != VCS_DIR)
        .build();

    for entry in walker {
        let entry = entry.map_err(|err| io::Error::other(err.to_string()))?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if is_dir {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        cache: PathBuf,
        sync: PluginSynchronizer,
    }

    fn fixture(mirror: bool) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("pluginRepos");
        let active = tmp.path().join("mainRepo/src/userplugins");
        let clone = cache.join("foo");
        fs::create_dir_all(clone.join(".git/objects")).unwrap();
        fs::write(clone.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::create_dir_all(clone.join("components")).unwrap();
        fs::write(clone.join("index.tsx"), "export default {};\n").unwrap();
        fs::write(clone.join("components/Panel.tsx"), "panel v1\n").unwrap();
        fs::write(clone.join(".editorconfig"), "root = true\n").unwrap();

        Fixture {
            sync: PluginSynchronizer::new(cache.clone(), active, mirror),
            cache,
            _tmp: tmp,
        }
    }

    #[test]
    fn activate_copies_everything_but_git() {
        let f = fixture(false);
        let dest = f.sync.activate("foo").unwrap();

        assert!(dest.join("index.tsx").is_file());
        assert!(dest.join("components/Panel.tsx").is_file());
        assert!(dest.join(".editorconfig").is_file());
        assert!(!dest.join(".git").exists());
    }

    #[test]
    fn activate_is_idempotent_and_overwrites() {
        let f = fixture(false);
        f.sync.activate("foo").unwrap();
        fs::write(f.cache.join("foo/components/Panel.tsx"), "panel v2\n").unwrap();
        f.sync.activate("foo").unwrap();
        let dest = f.sync.activate("foo").unwrap();

        assert_eq!(
            fs::read_to_string(dest.join("components/Panel.tsx")).unwrap(),
            "panel v2\n"
        );
    }

    #[test]
    fn merge_keeps_files_removed_upstream() {
        let f = fixture(false);
        f.sync.activate("foo").unwrap();
        fs::remove_file(f.cache.join("foo/components/Panel.tsx")).unwrap();

        let dest = f.sync.activate("foo").unwrap();
        assert!(dest.join("components/Panel.tsx").exists());
    }

    #[test]
    fn mirror_prunes_files_removed_upstream() {
        let f = fixture(true);
        f.sync.activate("foo").unwrap();
        fs::remove_file(f.cache.join("foo/components/Panel.tsx")).unwrap();

        let dest = f.sync.activate("foo").unwrap();
        assert!(!dest.join("components/Panel.tsx").exists());
        assert!(dest.join("index.tsx").exists());
    }

    #[cfg(unix)]
    #[test]
    fn linked_directories_are_copied_as_contents() {
        let f = fixture(false);
        std::os::unix::fs::symlink("components", f.cache.join("foo/linked")).unwrap();

        let dest = f.sync.activate("foo").unwrap();
        let linked = dest.join("linked");
        assert!(linked.is_dir());
        assert!(!fs::symlink_metadata(&linked).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(linked.join("Panel.tsx")).unwrap(),
            "panel v1\n"
        );
    }

    #[test]
    fn activate_unknown_plugin_is_not_found() {
        let f = fixture(false);
        assert!(f.sync.activate("bar").unwrap_err().is_not_found());
    }

    #[test]
    fn deactivate_removes_active_copy_once() {
        let f = fixture(false);
        f.sync.activate("foo").unwrap();
        assert!(f.sync.is_active("foo"));

        f.sync.deactivate("foo").unwrap();
        assert!(!f.sync.is_active("foo"));
        assert!(f.cache.join("foo/index.tsx").exists());
        assert!(f.sync.deactivate("foo").unwrap_err().is_not_found());
    }
}
