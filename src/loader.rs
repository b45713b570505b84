//! Loads an environment file and everything it imports into a [`NamespaceGraph`]
//!
//! Relative file imports are looked up on a search path. While a file's imports are
//! resolved its directory sits at the front of that path; the entry is removed again
//! before the file's loading returns, whether or not the imports succeeded. Each file
//! is parsed once per load, so import cycles terminate here as well as in the registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::commands::declared;
use crate::config_file::{ConfigError, ConfigFile, ConfigImport};
use crate::namespace::{Import, Namespace, NamespaceGraph, NamespaceId};
use crate::tools;

/// Result of loading a root environment file
#[derive(Debug)]
pub struct Loaded {
    pub graph: NamespaceGraph,
    pub root: NamespaceId,
    /// The parsed root file, holding `CONFIG`
    pub file: ConfigFile,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct Loader {
    search_path: Vec<PathBuf>,
    graph: NamespaceGraph,
    files: HashMap<PathBuf, NamespaceId>,
}

/// Warn if the file's `blt_version` doesn't match the binary version
fn validate_version(config_version: Option<&str>) {
    let binary_version = env!("CARGO_PKG_VERSION");
    if let Some(config_version) = config_version
        && config_version != binary_version
    {
        warn!(
            "Environment file blt_version '{config_version}' differs from binary version '{binary_version}'"
        );
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Loader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with extra directories on the search path, consulted after the
    /// importing file's own directory.
    #[must_use]
    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Load the root environment file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist, a parse error if it
    /// (or an imported file) is malformed, and `ConfigError::Import` for unresolvable imports.
    pub fn load(mut self, path: &Path) -> Result<Loaded, ConfigError> {
        let canonical = path
            .canonicalize()
            .map_err(|_| ConfigError::NotFound(path.to_path_buf()))?;
        let file = ConfigFile::from_file(&canonical)?;
        validate_version(file.blt_version.as_deref());
        let root = self.register(&canonical, &file)?;
        debug!(
            "Loaded {} namespace(s) from {}",
            self.graph.len(),
            canonical.display()
        );
        Ok(Loaded {
            graph: self.graph,
            root,
            file,
            path: path.to_path_buf(),
        })
    }

    fn load_file(&mut self, path: &Path) -> Result<NamespaceId, ConfigError> {
        let canonical = path
            .canonicalize()
            .map_err(|_| ConfigError::NotFound(path.to_path_buf()))?;
        if let Some(&id) = self.files.get(&canonical) {
            return Ok(id);
        }
        let file = ConfigFile::from_file(&canonical)?;
        self.register(&canonical, &file)
    }

    fn register(&mut self, canonical: &Path, file: &ConfigFile) -> Result<NamespaceId, ConfigError> {
        let dir = canonical.parent().unwrap_or(Path::new("/")).to_path_buf();
        let mut namespace = Namespace::new(canonical.display().to_string());
        for (name, group) in &file.groups {
            namespace
                .groups
                .push(Arc::new(declared::group_spec(name, group, &dir)?));
        }
        let id = self.graph.add(namespace);
        self.files.insert(canonical.to_path_buf(), id);

        self.search_path.insert(0, dir);
        let imports = self.resolve_imports(canonical, &file.imports);
        self.search_path.remove(0);

        let imports = imports?;
        if let Some(namespace) = self.graph.get_mut(id) {
            namespace.imports = imports;
        }
        Ok(id)
    }

    fn resolve_imports(
        &mut self,
        importer: &Path,
        imports: &[ConfigImport],
    ) -> Result<Vec<Import>, ConfigError> {
        let import_error = |target: &str, reason: &str| ConfigError::Import {
            target: target.to_string(),
            path: importer.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut resolved = Vec::with_capacity(imports.len());
        for import in imports {
            let target = import.target();
            let (binding, id) = if import.is_file() {
                let path = self
                    .locate(target)
                    .ok_or_else(|| import_error(target, "file not found on the search path"))?;
                let binding = import
                    .binding()
                    .map_or_else(|| file_stem(&path), str::to_string);
                (binding, self.load_file(&path)?)
            } else {
                let id = self
                    .builtin(target)
                    .ok_or_else(|| import_error(target, "no built-in tool with this name"))?;
                (import.binding().unwrap_or(target).to_string(), id)
            };

            if binding.is_empty() || binding.contains('.') {
                return Err(import_error(
                    target,
                    "binding names must be non-empty and contain no dots",
                ));
            }
            debug!("{} imports {target} as {binding}", importer.display());
            resolved.push(Import { binding, target: id });
        }
        Ok(resolved)
    }

    /// First existing match of `target` on the search path.
    fn locate(&self, target: &str) -> Option<PathBuf> {
        let target = Path::new(target);
        if target.is_absolute() {
            return target.is_file().then(|| target.to_path_buf());
        }
        self.search_path
            .iter()
            .map(|dir| dir.join(target))
            .find(|candidate| candidate.is_file())
    }

    fn builtin(&mut self, tool: &str) -> Option<NamespaceId> {
        let identity = format!("builtin:{tool}");
        if let Some(id) = self.graph.find(&identity) {
            return Some(id);
        }
        let group = tools::builtin(tool)?;
        let mut namespace = Namespace::new(identity);
        namespace.groups.push(Arc::new(group));
        Some(self.graph.add(namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_builtin_imports_share_one_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bltenv.yaml",
            "imports:\n  - heroku\n  - from: heroku\n    as: hk\nCONFIG: {}\n",
        );
        let loaded = Loader::new().load(&path).unwrap();
        let root = loaded.graph.get(loaded.root).unwrap();
        assert_eq!(root.imports.len(), 2);
        assert_eq!(root.imports[0].target, root.imports[1].target);
        assert_eq!(loaded.graph.len(), 2);
    }

    #[test]
    fn test_self_import_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bltenv.yaml",
            "imports: [bltenv.yaml]\nCONFIG: {}\n",
        );
        let loaded = Loader::new().load(&path).unwrap();
        let root = loaded.graph.get(loaded.root).unwrap();
        assert_eq!(root.imports[0].target, loaded.root);
        assert_eq!(root.imports[0].binding, "bltenv");
    }

    #[test]
    fn test_mutual_imports_resolve_relative_to_importer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tools")).unwrap();
        let path = write(dir.path(), "bltenv.yaml", "imports: [tools/a.yaml]\nCONFIG: {}\n");
        write(&dir.path().join("tools"), "a.yaml", "imports: [b.yaml]\n");
        write(&dir.path().join("tools"), "b.yaml", "imports: [a.yaml]\n");

        let loader = Loader::new();
        let loaded = loader.load(&path).unwrap();
        assert_eq!(loaded.graph.len(), 3);
        let a = loaded.graph.get(1).unwrap();
        let b = loaded.graph.get(2).unwrap();
        assert_eq!(b.imports[0].target, 1);
        assert_eq!(a.imports[0].target, 2);
    }

    #[test]
    fn test_search_path_restored_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bltenv.yaml", "imports: [missing.yaml]\nCONFIG: {}\n");
        let canonical = path.canonicalize().unwrap();
        let file = ConfigFile::from_file(&canonical).unwrap();

        let mut loader = Loader::with_search_path(vec![PathBuf::from("/opt/shared")]);
        let result = loader.register(&canonical, &file);
        assert!(matches!(result, Err(ConfigError::Import { .. })));
        assert_eq!(loader.search_path(), &[PathBuf::from("/opt/shared")]);
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bltenv.yaml", "imports: [kubernetes]\nCONFIG: {}\n");
        match Loader::new().load(&path) {
            Err(ConfigError::Import { target, .. }) => assert_eq!(target, "kubernetes"),
            other => panic!("Expected Import error, got: {other:?}"),
        }
    }
}
