//! Template loaders — the sources of raw template text.
//!
//! A [`Loader`] maps a template name to its source. Loaders are chained in a
//! [`LoaderSet`]; the first loader that returns source wins and the errors of
//! the ones before it are discarded.
//!
//! | Loader        | Backing store                                         |
//! |---------------|-------------------------------------------------------|
//! | [`MapLoader`] | static in-memory `name → text` table                  |
//! | [`DirLoader`] | one or more base directories, extension allow-listed  |

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{io_err, LoadError};

/// A source of raw template text, addressed by name.
pub trait Loader: Send + Sync {
    /// Return the raw source of `name`.
    fn load(&self, name: &str) -> Result<String, LoadError>;

    /// Every name this loader can resolve, sorted.
    fn list_templates(&self) -> Result<Vec<String>, LoadError>;
}

// ---------------------------------------------------------------------------
// MapLoader
// ---------------------------------------------------------------------------

/// In-memory loader backed by a `name → source` table.
#[derive(Debug, Clone, Default)]
pub struct MapLoader {
    templates: HashMap<String, String>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one template, builder style.
    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Add (or replace) one template.
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MapLoader
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let templates = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { templates }
    }
}

impl From<HashMap<String, String>> for MapLoader {
    fn from(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }
}

impl Loader for MapLoader {
    fn load(&self, name: &str) -> Result<String, LoadError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::not_found(name))
    }

    fn list_templates(&self) -> Result<Vec<String>, LoadError> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// DirLoader
// ---------------------------------------------------------------------------

/// Filesystem loader rooted at one or more base directories.
///
/// Names are relative paths (`/`-separated). Each base is tried in order and
/// the first existing file wins. Names that are absolute or contain `..` are
/// rejected so a loader never reads outside its bases. When an extension
/// allow-list is set, only names whose final extension is listed resolve.
#[derive(Debug, Clone)]
pub struct DirLoader {
    bases: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl DirLoader {
    /// A loader over a single base directory accepting any extension.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            bases: vec![base.into()],
            extensions: Vec::new(),
        }
    }

    /// A loader over several base directories, searched in order.
    pub fn with_bases<I, P>(bases: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            bases: bases.into_iter().map(Into::into).collect(),
            extensions: Vec::new(),
        }
    }

    /// Append another base directory (searched after the existing ones).
    pub fn add_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Restrict the loader to the given extensions (`"html"` or `".html"`).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn bases(&self) -> &[PathBuf] {
        &self.bases
    }

    fn allows(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

fn checked_relative(name: &str) -> Result<&Path, LoadError> {
    let invalid = |reason| LoadError::InvalidName {
        name: name.to_owned(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    let path = Path::new(name);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(invalid("parent directory reference")),
            Component::RootDir | Component::Prefix(_) => return Err(invalid("absolute path")),
        }
    }
    Ok(path)
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

impl Loader for DirLoader {
    fn load(&self, name: &str) -> Result<String, LoadError> {
        let rel = checked_relative(name)?;
        if !self.allows(rel) {
            return Err(LoadError::DisallowedExtension {
                name: name.to_owned(),
            });
        }
        for base in &self.bases {
            let path = base.join(rel);
            match std::fs::read_to_string(&path) {
                Ok(source) => return Ok(source),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err(path, e)),
            }
        }
        Err(LoadError::not_found(name))
    }

    fn list_templates(&self) -> Result<Vec<String>, LoadError> {
        let mut names = BTreeSet::new();
        for base in &self.bases {
            if !base.is_dir() {
                continue;
            }
            let mut files = Vec::new();
            collect_template_files(base, &mut files)?;
            for path in files {
                let rel = path.strip_prefix(base).unwrap_or(path.as_path());
                if self.allows(rel) {
                    names.insert(normalize_template_name(rel));
                }
            }
        }
        Ok(names.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// LoaderSet
// ---------------------------------------------------------------------------

/// Ordered collection of loaders; the first success wins.
#[derive(Clone, Default)]
pub struct LoaderSet {
    loaders: Vec<Arc<dyn Loader>>,
}

impl LoaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader after the existing ones.
    pub fn push(&mut self, loader: impl Loader + 'static) {
        self.loaders.push(Arc::new(loader));
    }

    /// Register an already shared loader.
    pub fn push_shared(&mut self, loader: Arc<dyn Loader>) {
        self.loaders.push(loader);
    }

    /// Append every loader of `other`, keeping its order.
    pub fn extend(&mut self, other: &LoaderSet) {
        self.loaders.extend(other.loaders.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl fmt::Debug for LoaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderSet")
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

impl Loader for LoaderSet {
    fn load(&self, name: &str) -> Result<String, LoadError> {
        for (index, loader) in self.loaders.iter().enumerate() {
            match loader.load(name) {
                Ok(source) => return Ok(source),
                Err(err) => {
                    tracing::debug!(template = name, loader = index, error = %err, "loader miss");
                }
            }
        }
        Err(LoadError::not_found(name))
    }

    fn list_templates(&self) -> Result<Vec<String>, LoadError> {
        let mut names = BTreeSet::new();
        for loader in &self.loaders {
            names.extend(loader.list_templates()?);
        }
        Ok(names.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn map_loader_returns_source() {
        let loader = MapLoader::new().with("a.html", "hello");
        assert_eq!(loader.load("a.html").unwrap(), "hello");
    }

    #[test]
    fn map_loader_missing_name_is_not_found() {
        let loader = MapLoader::new();
        let err = loader.load("nope").unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn checked_relative_rejects_escapes() {
        assert!(checked_relative("../secret").is_err());
        assert!(checked_relative("a/../../b").is_err());
        assert!(checked_relative("/etc/passwd").is_err());
        assert!(checked_relative("").is_err());
        assert!(checked_relative("./pages/index.html").is_ok());
    }

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        let loader = DirLoader::new("/nowhere").with_extensions([".HTML", "tera"]);
        assert!(loader.allows(Path::new("a.html")));
        assert!(loader.allows(Path::new("b/c.Tera")));
        assert!(!loader.allows(Path::new("c.txt")));
        assert!(!loader.allows(Path::new("noext")));
    }

    #[test]
    fn dir_loader_searches_bases_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(second.path().join("only.html"), "second").unwrap();
        std::fs::write(first.path().join("both.html"), "first").unwrap();
        std::fs::write(second.path().join("both.html"), "second").unwrap();

        let loader = DirLoader::with_bases([first.path(), second.path()]);
        assert_eq!(loader.load("both.html").unwrap(), "first");
        assert_eq!(loader.load("only.html").unwrap(), "second");
    }

    #[test]
    fn loader_set_first_success_wins() {
        let mut set = LoaderSet::new();
        set.push(MapLoader::new().with("x", "one"));
        set.push(MapLoader::new().with("x", "two").with("y", "why"));
        assert_eq!(set.load("x").unwrap(), "one");
        assert_eq!(set.load("y").unwrap(), "why");
        assert!(matches!(set.load("z"), Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn loader_set_lists_union_sorted() {
        let mut set = LoaderSet::new();
        set.push(MapLoader::new().with("b", "").with("a", ""));
        set.push(MapLoader::new().with("a", "").with("c", ""));
        assert_eq!(set.list_templates().unwrap(), vec!["a", "b", "c"]);
    }
}
