use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{CoziError, Result};
use crate::model::config::ResolverConfig;
use crate::plugin::scanner::ImportReference;

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Package names the framework already declares, runtime and dev combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredDependencySet {
    pub runtime: BTreeSet<String>,
    pub dev: BTreeSet<String>,
}

impl DeclaredDependencySet {
    pub fn load(manifest_path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(manifest_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoziError::NotFound(manifest_path.display().to_string()));
            }
            Err(e) => {
                return Err(CoziError::io(
                    format!("read {}", manifest_path.display()),
                    e,
                ));
            }
        };

        let manifest: PackageManifest =
            serde_json::from_str(&raw).map_err(|source| CoziError::MalformedState {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            runtime: manifest.dependencies.into_keys().collect(),
            dev: manifest.dev_dependencies.into_keys().collect(),
        })
    }

    pub fn contains(&self, package: &str) -> bool {
        self.runtime.contains(package) || self.dev.contains(package)
    }

    pub fn len(&self) -> usize {
        self.runtime.union(&self.dev).count()
    }

    pub fn is_empty(&self) -> bool {
        self.runtime.is_empty() && self.dev.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DeclaredDependencySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            runtime: iter.into_iter().map(Into::into).collect(),
            dev: BTreeSet::new(),
        }
    }
}

/// Decides which scanned imports still need installing. Pure; installing is
/// left to the caller.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    local_aliases: Vec<String>,
}

impl DependencyResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            local_aliases: config.local_aliases.clone(),
        }
    }

    fn is_local(&self, import: &ImportReference) -> bool {
        import.is_local()
            || self
                .local_aliases
                .iter()
                .any(|alias| import.as_str().starts_with(alias.as_str()))
    }

    /// External packages referenced by `imports` that `declared` lacks.
    pub fn resolve(
        &self,
        imports: &BTreeSet<ImportReference>,
        declared: &DeclaredDependencySet,
    ) -> BTreeSet<String> {
        imports
            .iter()
            .filter(|import| !self.is_local(import) && !declared.contains(import.as_str()))
            .map(|import| import.package_name())
            .filter(|package| !package.is_empty() && !declared.contains(package))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn refs(values: &[&str]) -> BTreeSet<ImportReference> {
        values.iter().map(|v| ImportReference::new(*v)).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn local_references_are_never_installed() {
        let missing = DependencyResolver::default()
            .resolve(&refs(&["left-pad", "./local"]), &DeclaredDependencySet::default());
        assert_eq!(missing, set(&["left-pad"]));
    }

    #[test]
    fn declared_superset_resolves_to_nothing() {
        let declared: DeclaredDependencySet = ["react", "left-pad", "lodash"].into_iter().collect();
        let missing = DependencyResolver::default()
            .resolve(&refs(&["react", "left-pad", "../up", "/abs"]), &declared);
        assert!(missing.is_empty());
    }

    #[test]
    fn subpath_imports_match_their_package() {
        let declared: DeclaredDependencySet = ["lodash", "@scope/pkg"].into_iter().collect();
        let missing = DependencyResolver::default().resolve(
            &refs(&["lodash/fp", "@scope/pkg/sub", "@scope/other/x"]),
            &declared,
        );
        assert_eq!(missing, set(&["@scope/other"]));
    }

    #[test]
    fn declared_specifier_is_satisfied_as_written() {
        let declared: DeclaredDependencySet = ["lodash/fp", "@scope/pkg/sub"].into_iter().collect();
        let missing = DependencyResolver::default()
            .resolve(&refs(&["lodash/fp", "@scope/pkg/sub"]), &declared);
        assert!(missing.is_empty());
    }

    #[test]
    fn configured_aliases_count_as_local() {
        let resolver = DependencyResolver::new(&ResolverConfig {
            local_aliases: vec!["@utils/".into(), "@api/".into()],
        });
        let missing = resolver.resolve(
            &refs(&["@utils/text", "@api/Commands", "@vap/core"]),
            &DeclaredDependencySet::default(),
        );
        assert_eq!(missing, set(&["@vap/core"]));
    }

    #[test]
    fn manifest_unions_runtime_and_dev() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("package.json");
        fs::write(
            &path,
            r#"{"name":"vencord","dependencies":{"fflate":"^0.7"},"devDependencies":{"typescript":"^5"}}"#,
        )
        .unwrap();

        let declared = DeclaredDependencySet::load(&path).unwrap();
        assert!(declared.contains("fflate"));
        assert!(declared.contains("typescript"));
        assert_eq!(declared.len(), 2);
    }

    #[test]
    fn manifest_without_dependency_tables_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("package.json");
        fs::write(&path, r#"{"name":"bare"}"#).unwrap();

        assert!(DeclaredDependencySet::load(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_manifest_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = DeclaredDependencySet::load(&tmp.path().join("package.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn unparseable_manifest_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("package.json");
        fs::write(&path, "{ not json").unwrap();

        let err = DeclaredDependencySet::load(&path).unwrap_err();
        assert!(matches!(err, CoziError::MalformedState { .. }));
    }
}
