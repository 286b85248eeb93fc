use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::model::config::ScannerConfig;

pub const VCS_DIR: &str = ".git";

/// A module specifier pulled out of an import line, e.g. `left-pad` or `./utils`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImportReference(String);

impl ImportReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative (`./x`, `../x`) or absolute (`/x`) paths inside the plugin itself.
    pub fn is_local(&self) -> bool {
        self.0.starts_with('.') || self.0.starts_with('/')
    }

    /// The installable package a specifier points into:
    /// `lodash/fp` → `lodash`, `@scope/pkg/sub` → `@scope/pkg`.
    pub fn package_name(&self) -> &str {
        let mut segments = self.0.splitn(3, '/');
        let first = segments.next().unwrap_or_default();
        if !first.starts_with('@') {
            return first;
        }

        match segments.next() {
            Some(second) => &self.0[..first.len() + 1 + second.len()],
            None => first,
        }
    }
}

impl std::fmt::Display for ImportReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finds the module references a plugin source tree pulls in.
pub trait ImportScanner {
    fn scan(&self, root: &Path) -> BTreeSet<ImportReference>;
}

/// Line-based scanner: any line containing the keyword is an import, and the
/// text after its last occurrence is the specifier. Misfires on comments and
/// strings that mention the keyword; it errs on the side of finding too much.
#[derive(Debug, Clone)]
pub struct HeuristicScanner {
    extensions: Vec<String>,
    keyword: String,
}

impl HeuristicScanner {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            keyword: config.keyword.clone(),
        }
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }

    /// Extracts the specifier from one line, if the line mentions the keyword.
    pub fn extract(&self, line: &str) -> Option<ImportReference> {
        if self.keyword.is_empty() {
            return None;
        }

        let (_, tail) = line.rsplit_once(self.keyword.as_str())?;
        let token = tail.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '\'' | '"' | '`' | ';')
        });

        if token.is_empty() {
            None
        } else {
            Some(ImportReference::new(token))
        }
    }
}

impl ImportScanner for HeuristicScanner {
    fn scan(&self, root: &Path) -> BTreeSet<ImportReference> {
        let mut imports = BTreeSet::new();

        if !root.is_dir() {
            tracing::warn!(root = %root.display(), "scan root missing, no imports found");
            return imports;
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(true)
            .filter_entry(|entry| entry.file_name() != VCS_DIR)
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if !is_file || !self.is_source_file(path) {
                continue;
            }

            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::debug!(path = %path.display(), "skipping unreadable source: {err}");
                    continue;
                }
            };

            imports.extend(text.lines().filter_map(|line| self.extract(line)));
        }

        tracing::debug!(root = %root.display(), count = imports.len(), "imports scanned");
        imports
    }
}
