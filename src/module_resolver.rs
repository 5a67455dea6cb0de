//! Specifier resolution.
//!
//! Maps an import specifier plus its importer to an absolute module id:
//! - absolute specifiers pass through unchanged
//! - `./` and `../` specifiers resolve against the importer's directory,
//!   with lexical `.`/`..` normalization and extension probing
//!   (`p`, `p.js`, `p/index.js`)
//! - everything else is external: not bundled, left as an unresolved
//!   reference
//!
//! Results are memoized per (specifier, importer). The cache lives on the
//! resolver instance, which lives on one bundle; nothing is process-wide.

use crate::host::FileSystem;
use rustc_hash::FxHashMap;
use std::path::{Component, Path, PathBuf};

/// Outcome of resolving one specifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedId {
    /// Bundled module, keyed by absolute normalized path.
    Internal(PathBuf),
    /// Bare specifier; stays external to the bundle.
    External,
}

/// Memoizing specifier resolver, scoped to one bundle.
pub struct ModuleResolver {
    cache: FxHashMap<(String, Option<PathBuf>), ResolvedId>,
}

impl ModuleResolver {
    pub fn new() -> Self {
        ModuleResolver {
            cache: FxHashMap::default(),
        }
    }

    pub fn resolve(
        &mut self,
        specifier: &str,
        importer: Option<&Path>,
        fs: &dyn FileSystem,
    ) -> ResolvedId {
        let key = (specifier.to_string(), importer.map(Path::to_path_buf));
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let resolved = self.resolve_uncached(specifier, importer, fs);
        tracing::trace!(specifier, ?importer, ?resolved, "resolved specifier");
        self.cache.insert(key, resolved.clone());
        resolved
    }

    /// Resolve the entry point itself: no importer, never external.
    pub fn resolve_entry(&self, path: &Path, fs: &dyn FileSystem) -> PathBuf {
        probe(fs, normalize(path))
    }

    fn resolve_uncached(
        &self,
        specifier: &str,
        importer: Option<&Path>,
        fs: &dyn FileSystem,
    ) -> ResolvedId {
        let raw = Path::new(specifier);
        if raw.is_absolute() {
            return ResolvedId::Internal(probe(fs, normalize(raw)));
        }
        if specifier.starts_with('.') {
            let base = importer
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return ResolvedId::Internal(probe(fs, normalize(&base.join(raw))));
        }
        ResolvedId::External
    }
}

/// Lexical normalization: resolve `.` and `..` components without touching
/// the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Extension probing: exact path, then `.js`, then `/index.js`. Falls back
/// to the exact path so a missing file surfaces as a read error with the
/// specifier's own name.
fn probe(fs: &dyn FileSystem, path: PathBuf) -> PathBuf {
    if fs.exists(&path) {
        return path;
    }
    let mut with_ext = path.clone().into_os_string();
    with_ext.push(".js");
    let with_ext = PathBuf::from(with_ext);
    if fs.exists(&with_ext) {
        return with_ext;
    }
    let index = path.join("index.js");
    if fs.exists(&index) {
        return index;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFileSystem;

    fn fs() -> MemoryFileSystem {
        MemoryFileSystem::new()
            .with_file("/src/a.js", "")
            .with_file("/src/lib/index.js", "")
    }

    #[test]
    fn relative_specifier_resolves_against_importer_dir() {
        let fs = fs();
        let mut resolver = ModuleResolver::new();
        let resolved = resolver.resolve("./a.js", Some(Path::new("/src/main.js")), &fs);
        assert_eq!(resolved, ResolvedId::Internal(PathBuf::from("/src/a.js")));
    }

    #[test]
    fn parent_traversal_normalizes() {
        let fs = fs();
        let mut resolver = ModuleResolver::new();
        let resolved = resolver.resolve("../a", Some(Path::new("/src/lib/util.js")), &fs);
        assert_eq!(resolved, ResolvedId::Internal(PathBuf::from("/src/a.js")));
    }

    #[test]
    fn extension_and_index_probing() {
        let fs = fs();
        let mut resolver = ModuleResolver::new();
        assert_eq!(
            resolver.resolve("./a", Some(Path::new("/src/main.js")), &fs),
            ResolvedId::Internal(PathBuf::from("/src/a.js"))
        );
        assert_eq!(
            resolver.resolve("./lib", Some(Path::new("/src/main.js")), &fs),
            ResolvedId::Internal(PathBuf::from("/src/lib/index.js"))
        );
    }

    #[test]
    fn bare_specifier_is_external() {
        let fs = fs();
        let mut resolver = ModuleResolver::new();
        assert_eq!(resolver.resolve("lodash", None, &fs), ResolvedId::External);
    }

    #[test]
    fn absolute_specifier_passes_through() {
        let fs = fs();
        let mut resolver = ModuleResolver::new();
        assert_eq!(
            resolver.resolve("/src/a.js", None, &fs),
            ResolvedId::Internal(PathBuf::from("/src/a.js"))
        );
    }

    #[test]
    fn results_are_memoized() {
        let fs = fs();
        let mut resolver = ModuleResolver::new();
        let first = resolver.resolve("./a", Some(Path::new("/src/main.js")), &fs);
        // A second identical query must hit the cache even if the file
        // disappears in between.
        let empty = MemoryFileSystem::new();
        let second = resolver.resolve("./a", Some(Path::new("/src/main.js")), &empty);
        assert_eq!(first, second);
    }
}
