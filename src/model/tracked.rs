use std::path::{Component, Path};

/// A subscribed plugin source and the name its clone and active copy live under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedPlugin {
    pub source: String,
    pub name: String,
}

impl TrackedPlugin {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let name = derive_name(&source);
        Self { source, name }
    }
}

/// Last path segment of a source location with its extension stripped:
/// `https://example.com/foo.git` → `foo`.
pub fn derive_name(source: &str) -> String {
    let trimmed = source.trim().trim_end_matches('/');
    let segment = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);

    Path::new(segment)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("plugin")
        .to_string()
}

/// True when `name` is one plain path segment, so joining it onto a
/// directory can only ever name a child of that directory.
pub fn is_plugin_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(segment)), None) if segment == name
    )
}
