//! The linker.
//!
//! `ModuleGraph::build` runs the whole link pipeline over one entry point:
//!
//! - fetch: resolve, read and parse every reachable module, memoized by
//!   resolved path; a module is registered in the id map before its
//!   dependencies are fetched so import cycles coalesce onto the
//!   in-flight module instead of re-parsing it
//! - bind: resolve every reference to a declaration, tracing imports and
//!   reexports across module boundaries
//! - mark: transitive `use` closure from the entry's exported names, plus
//!   force-inclusion of side-effect statements in every module
//! - order: depth-first post-order over dependency edges, cycle-tolerant
//! - deconflict: first occurrence of a rendered name keeps it, later
//!   collisions get `$1`, `$2`, … suffixes
//!
//! All cross-module state lives here: the module table, the declaration
//! arena, and the path→id map. Everything dies with the graph.

use crate::declaration::{DeclArena, DeclId, DeclKind, Declaration};
use crate::diagnostics::{BuildError, ResolutionError};
use crate::host::FileSystem;
use crate::module::{Module, ModuleRef};
use crate::module_resolver::{ModuleResolver, ResolvedId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;

/// Index into the graph's module table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct ModuleGraph {
    pub modules: Vec<Module>,
    pub arena: DeclArena,
    /// Always the first module fetched.
    pub entry: ModuleId,
    /// Emission order, dependencies before dependents.
    pub ordered: Vec<ModuleId>,
    /// The entry's exported surface after marking, in export order.
    /// `default` appears under its literal name.
    pub entry_exports: Vec<(String, DeclId)>,
    path_to_id: FxHashMap<std::path::PathBuf, ModuleId>,
}

impl ModuleGraph {
    /// Link everything reachable from `entry`.
    pub fn build(entry: &Path, fs: &dyn FileSystem) -> Result<ModuleGraph, BuildError> {
        let mut resolver = ModuleResolver::new();
        let entry_path = resolver.resolve_entry(entry, fs);
        tracing::debug!(entry = %entry_path.display(), "building module graph");

        let mut graph = ModuleGraph {
            modules: Vec::new(),
            arena: DeclArena::new(),
            entry: ModuleId(0),
            ordered: Vec::new(),
            entry_exports: Vec::new(),
            path_to_id: FxHashMap::default(),
        };
        graph.entry = graph.fetch_module(entry_path, &mut resolver, fs)?;
        graph.bind()?;
        graph.mark()?;
        graph.ordered = graph.sort_modules();
        graph.deconflict();
        tracing::debug!(
            modules = graph.modules.len(),
            declarations = graph.arena.len(),
            "graph linked"
        );
        Ok(graph)
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    fn fetch_module(
        &mut self,
        path: std::path::PathBuf,
        resolver: &mut ModuleResolver,
        fs: &dyn FileSystem,
    ) -> Result<ModuleId, BuildError> {
        if let Some(&id) = self.path_to_id.get(&path) {
            return Ok(id);
        }

        let source = fs
            .read_to_string(&path)
            .map_err(|source| BuildError::io(path.clone(), source))?;
        let id = ModuleId(self.modules.len() as u32);
        let module = Module::new(id, path.clone(), source, &mut self.arena)
            .map_err(|error| BuildError::syntax(path.clone(), error))?;
        tracing::trace!(
            path = %path.display(),
            statements = module.statements.len(),
            "loaded module"
        );
        self.modules.push(module);
        // Registered before dependencies are fetched; cycles land here.
        self.path_to_id.insert(path.clone(), id);

        let specifiers = self.modules[id.index()].dependencies.clone();
        for specifier in specifiers {
            match resolver.resolve(&specifier, Some(&path), fs) {
                ResolvedId::Internal(target) => {
                    let dependency = self.fetch_module(target, resolver, fs)?;
                    let module = &mut self.modules[id.index()];
                    module
                        .resolved_sources
                        .insert(specifier, ModuleRef::Internal(dependency));
                    module.dependency_modules.push(dependency);
                }
                ResolvedId::External => {
                    self.modules[id.index()]
                        .resolved_sources
                        .insert(specifier, ModuleRef::External);
                }
            }
        }
        Ok(id)
    }

    // =========================================================================
    // Bind
    // =========================================================================

    fn bind(&mut self) -> Result<(), BuildError> {
        for index in 0..self.modules.len() {
            let id = ModuleId(index as u32);

            // `export default <named binding>` forwards to the binding.
            if let (Some(decl), Some(local)) = (
                self.modules[index].default_decl,
                self.modules[index].default_local.clone(),
            ) {
                let mut visited = FxHashSet::default();
                let original = self.trace(id, &local, &mut visited)?;
                if let DeclKind::SyntheticDefault { original: slot } =
                    &mut self.arena.get_mut(decl).kind
                {
                    *slot = original;
                }
            }

            for statement in 0..self.modules[index].statements.len() {
                for reference in 0..self.modules[index].statements[statement].references.len() {
                    let (name, scope) = {
                        let r = &self.modules[index].statements[statement].references[reference];
                        (r.name.clone(), r.scope)
                    };
                    let resolved = match self.modules[index].statements[statement]
                        .scopes
                        .lookup(scope, &name)
                    {
                        Some(local) => Some(local),
                        None => {
                            let mut visited = FxHashSet::default();
                            self.trace(id, &name, &mut visited)?
                        }
                    };
                    self.modules[index].statements[statement].references[reference].declaration =
                        resolved;
                }
            }
        }
        Ok(())
    }

    /// Module-level name resolution: own top-level declarations, then
    /// imports traced into their source modules. `None` means external or
    /// global, which is accepted and left unrewritten.
    fn trace(
        &mut self,
        module: ModuleId,
        name: &str,
        visited: &mut FxHashSet<(ModuleId, String)>,
    ) -> Result<Option<DeclId>, BuildError> {
        if let Some(&decl) = self.modules[module.index()].declarations.get(name) {
            return Ok(Some(decl));
        }
        let Some(import) = self.modules[module.index()].imports.get(name).cloned() else {
            return Ok(None);
        };
        match self.modules[module.index()]
            .resolved_sources
            .get(&import.source)
            .copied()
        {
            Some(ModuleRef::Internal(target)) => {
                if import.imported == "*" {
                    return Ok(Some(self.namespace_declaration(target)));
                }
                match self.trace_export(target, &import.imported, visited)? {
                    Some(decl) => Ok(Some(decl)),
                    None => Err(ResolutionError {
                        name: import.imported,
                        target: self.modules[target.index()].path.clone(),
                        importer: self.modules[module.index()].path.clone(),
                    }
                    .into()),
                }
            }
            _ => Ok(None),
        }
    }

    /// Resolve an exported name of `module` to a declaration. Checks, in
    /// order: reexports, local exports, then every `export *` source. The
    /// visited set breaks reexport and `export *` cycles; a revisited
    /// (module, name) pair yields `None`.
    fn trace_export(
        &mut self,
        module: ModuleId,
        name: &str,
        visited: &mut FxHashSet<(ModuleId, String)>,
    ) -> Result<Option<DeclId>, BuildError> {
        if !visited.insert((module, name.to_string())) {
            return Ok(None);
        }

        if let Some(reexport) = self.modules[module.index()].reexports.get(name).cloned() {
            return match self.modules[module.index()]
                .resolved_sources
                .get(&reexport.source)
                .copied()
            {
                Some(ModuleRef::Internal(target)) => {
                    if reexport.imported == "*" {
                        Ok(Some(self.namespace_declaration(target)))
                    } else {
                        self.trace_export(target, &reexport.imported, visited)
                    }
                }
                _ => Ok(None),
            };
        }

        if let Some(export) = self.modules[module.index()].exports.get(name).cloned() {
            if name == "default" {
                if let Some(decl) = self.modules[module.index()].default_decl {
                    return Ok(Some(decl));
                }
            }
            return self.trace(module, &export.local, visited);
        }

        let sources = self.modules[module.index()].export_all_sources.clone();
        for source in sources {
            if let Some(ModuleRef::Internal(target)) = self.modules[module.index()]
                .resolved_sources
                .get(&source)
                .copied()
            {
                if let Some(decl) = self.trace(target, name, visited)? {
                    return Ok(Some(decl));
                }
            }
        }
        Ok(None)
    }

    /// The namespace declaration aggregating `target`'s exports, created
    /// on first demand.
    fn namespace_declaration(&mut self, target: ModuleId) -> DeclId {
        if let Some(decl) = self.modules[target.index()].namespace_decl {
            return decl;
        }
        let decl = self.arena.alloc(Declaration {
            name: self.modules[target.index()].name_stem(),
            is_used: false,
            is_function: false,
            statement: None,
            kind: DeclKind::SyntheticNamespace { module: target },
        });
        self.modules[target.index()].namespace_decl = Some(decl);
        decl
    }

    // =========================================================================
    // Mark
    // =========================================================================

    fn mark(&mut self) -> Result<(), BuildError> {
        let mut queue: Vec<DeclId> = Vec::new();

        // Everything the entry exports is the bundle's live surface.
        let entry = self.entry;
        for name in self.exported_names_deep(entry) {
            let mut visited = FxHashSet::default();
            match self.trace_export(entry, &name, &mut visited)? {
                Some(decl) => {
                    queue.push(decl);
                    self.entry_exports.push((name, decl));
                }
                None => {
                    return Err(ResolutionError {
                        name,
                        target: self.modules[entry.index()].path.clone(),
                        importer: self.modules[entry.index()].path.clone(),
                    }
                    .into())
                }
            }
        }

        // Statements that only exist for their side effects never show up
        // in any export chain; they are kept in every bundled module.
        for module in 0..self.modules.len() {
            for statement in 0..self.modules[module].statements.len() {
                if self.modules[module].statements[statement].is_side_effect() {
                    self.include_statement(module, statement, &mut queue);
                }
            }
        }

        while let Some(decl) = queue.pop() {
            if self.arena.get(decl).is_used {
                continue;
            }
            self.arena.get_mut(decl).is_used = true;

            match self.arena.get(decl).kind.clone() {
                DeclKind::SyntheticDefault {
                    original: Some(original),
                } => queue.push(original),
                DeclKind::SyntheticNamespace { module } => {
                    self.realize_namespace(module, &mut queue)?;
                }
                _ => {}
            }

            if let Some((module, statement)) = self.arena.get(decl).statement {
                self.include_statement(module.index(), statement, &mut queue);
            }
        }
        Ok(())
    }

    /// Mark one statement and queue every declaration it references.
    /// References were bound before marking, so this never resolves names.
    fn include_statement(&mut self, module: usize, statement: usize, queue: &mut Vec<DeclId>) {
        if !self.modules[module].statements[statement].mark() {
            return;
        }
        for reference in &self.modules[module].statements[statement].references {
            if let Some(decl) = reference.declaration {
                queue.push(decl);
            }
        }
    }

    /// Using a namespace uses every export of its module; the realized
    /// export list is what the frozen object literal renders from.
    fn realize_namespace(
        &mut self,
        target: ModuleId,
        queue: &mut Vec<DeclId>,
    ) -> Result<(), BuildError> {
        let mut entries = Vec::new();
        for name in self.exported_names_deep(target) {
            let mut visited = FxHashSet::default();
            match self.trace_export(target, &name, &mut visited)? {
                Some(decl) => {
                    queue.push(decl);
                    entries.push((name, decl));
                }
                None => {
                    // Reexport of an external binding; not representable
                    // inside the bundled namespace object.
                    tracing::debug!(
                        name,
                        module = %self.modules[target.index()].path.display(),
                        "namespace entry resolves externally, skipped"
                    );
                }
            }
        }
        self.modules[target.index()].namespace_exports = Some(entries);
        Ok(())
    }

    /// Exported names including `export *` expansion. Starred sources
    /// never forward `default`; a module's own `default` export stays.
    fn exported_names_deep(&self, module: ModuleId) -> Vec<String> {
        let mut names = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_exported_names(module, true, &mut visited, &mut names);
        names
    }

    fn collect_exported_names(
        &self,
        module: ModuleId,
        include_default: bool,
        visited: &mut FxHashSet<ModuleId>,
        names: &mut Vec<String>,
    ) {
        if !visited.insert(module) {
            return;
        }
        for name in self.modules[module.index()].exported_names() {
            if !include_default && name == "default" {
                continue;
            }
            if !names.contains(&name) {
                names.push(name);
            }
        }
        for source in &self.modules[module.index()].export_all_sources {
            if let Some(ModuleRef::Internal(target)) = self.modules[module.index()]
                .resolved_sources
                .get(source)
                .copied()
            {
                self.collect_exported_names(target, false, visited, names);
            }
        }
    }

    // =========================================================================
    // Order and deconflict
    // =========================================================================

    /// Depth-first post-order from the entry: dependencies first, entry
    /// last. A dependency seen while still unfinished is a cycle; it is
    /// logged and emitted at its normal post-order position.
    fn sort_modules(&self) -> Vec<ModuleId> {
        let mut ordered = Vec::new();
        let mut entered = vec![false; self.modules.len()];
        let mut finished = vec![false; self.modules.len()];
        self.visit(self.entry, &mut entered, &mut finished, &mut ordered);
        ordered
    }

    fn visit(
        &self,
        id: ModuleId,
        entered: &mut Vec<bool>,
        finished: &mut Vec<bool>,
        ordered: &mut Vec<ModuleId>,
    ) {
        if entered[id.index()] {
            return;
        }
        entered[id.index()] = true;
        for &dependency in &self.modules[id.index()].dependency_modules {
            if entered[dependency.index()] {
                if !finished[dependency.index()] {
                    tracing::debug!(
                        from = %self.modules[id.index()].path.display(),
                        to = %self.modules[dependency.index()].path.display(),
                        "circular dependency"
                    );
                }
                continue;
            }
            self.visit(dependency, entered, finished, ordered);
        }
        finished[id.index()] = true;
        ordered.push(id);
    }

    /// First-come-first-served top-level renaming across the whole
    /// bundle, in load order. References pick renames up through their
    /// `DeclId`, so only the declaration table is touched.
    fn deconflict(&mut self) {
        let mut ids: Vec<DeclId> = Vec::new();
        for module in &self.modules {
            ids.extend(module.declarations.values().copied());
            if let Some(decl) = module.default_decl {
                ids.push(decl);
            }
            if let Some(decl) = module.namespace_decl {
                ids.push(decl);
            }
        }

        let mut taken: FxHashSet<String> = FxHashSet::default();
        for id in ids {
            // Bound defaults render through their original declaration.
            if matches!(
                self.arena.get(id).kind,
                DeclKind::SyntheticDefault {
                    original: Some(_)
                }
            ) {
                continue;
            }
            let base = self.arena.get(id).name.clone();
            let mut candidate = base.clone();
            let mut count = 1;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{base}${count}");
                count += 1;
            }
            if candidate != base {
                tracing::trace!(from = %base, to = %candidate, "renamed to avoid collision");
                self.arena.get_mut(id).name = candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryFileSystem;

    fn build(fs: &MemoryFileSystem, entry: &str) -> ModuleGraph {
        ModuleGraph::build(Path::new(entry), fs).unwrap()
    }

    #[test]
    fn marks_only_reachable_statements() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/src/main.js",
                "import { used } from './lib.js';\nexport const out = used;\n",
            )
            .with_file(
                "/src/lib.js",
                "export const used = 1;\nexport const unused = 2;\n",
            );
        let graph = build(&fs, "/src/main.js");
        let lib = graph.module(ModuleId(1));
        assert!(lib.statements[0].is_included, "used export is kept");
        assert!(!lib.statements[1].is_included, "unused export is dropped");
    }

    #[test]
    fn reexport_chain_resolves_through_renames() {
        let fs = MemoryFileSystem::new()
            .with_file("/a.js", "export { x } from './b.js';")
            .with_file("/b.js", "export { y as x } from './c.js';")
            .with_file("/c.js", "export const y = 1;");
        let graph = build(&fs, "/a.js");
        let (name, decl) = &graph.entry_exports[0];
        assert_eq!(name, "x");
        assert_eq!(graph.arena.get(*decl).name, "y");
        let c = &graph.modules[2];
        assert!(c.statements[0].is_included);
    }

    #[test]
    fn colliding_names_get_numeric_suffixes() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/main.js",
                "import { a } from './a.js';\nimport { b } from './b.js';\nexport const out = a(b);\n",
            )
            .with_file("/a.js", "const helper = 1;\nexport function a() { return helper; }\n")
            .with_file("/b.js", "const helper = 2;\nexport const b = helper;\n");
        let graph = build(&fs, "/main.js");
        let first = graph.modules[1].declarations["helper"];
        let second = graph.modules[2].declarations["helper"];
        assert_eq!(graph.arena.get(first).name, "helper");
        assert_eq!(graph.arena.get(second).name, "helper$1");
        // The rename reaches the declaration site itself, not just uses.
        let (code, _) = graph.modules[2].render(&graph.arena);
        assert!(code.contains("const helper$1 = 2;"), "{code}");
    }

    #[test]
    fn missing_named_import_is_a_resolution_error() {
        let fs = MemoryFileSystem::new()
            .with_file("/main.js", "import { nope } from './lib.js';\nexport const out = nope;\n")
            .with_file("/lib.js", "export const yep = 1;");
        let error = ModuleGraph::build(Path::new("/main.js"), &fs).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("'nope' is not exported by /lib.js"), "{message}");
        assert!(message.contains("/main.js"), "{message}");
    }

    #[test]
    fn cycles_are_tolerated_and_ordered() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/a.js",
                "import { b } from './b.js';\nexport function a() { return b; }\n",
            )
            .with_file(
                "/b.js",
                "import { a } from './a.js';\nexport const b = a;\n",
            );
        let graph = build(&fs, "/a.js");
        assert_eq!(graph.ordered.len(), 2);
        // The entry comes last in post-order.
        assert_eq!(*graph.ordered.last().unwrap(), graph.entry);
    }

    #[test]
    fn export_all_cycle_terminates() {
        let fs = MemoryFileSystem::new()
            .with_file("/a.js", "export * from './b.js';\nexport const own = 1;")
            .with_file("/b.js", "export * from './a.js';");
        let graph = build(&fs, "/a.js");
        assert_eq!(graph.entry_exports.len(), 1);
        assert_eq!(graph.entry_exports[0].0, "own");
    }

    #[test]
    fn side_effect_statements_survive_in_every_module() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/main.js",
                "import { v } from './dep.js';\nexport const out = v;\n",
            )
            .with_file("/dep.js", "setup();\nexport const v = 1;\nconst dead = 2;\n");
        let graph = build(&fs, "/main.js");
        let dep = graph.module(ModuleId(1));
        assert!(dep.statements[0].is_included, "bare call is kept");
        assert!(!dep.statements[2].is_included, "unreferenced binding is dropped");
    }

    #[test]
    fn namespace_import_realizes_every_export() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/main.js",
                "import * as util from './util.js';\nexport const out = util.a;\n",
            )
            .with_file("/util.js", "export const a = 1;\nexport const b = 2;\n");
        let graph = build(&fs, "/main.js");
        let util = graph.module(ModuleId(1));
        let namespace = util.namespace_decl.expect("namespace realized");
        assert!(graph.arena.get(namespace).is_used);
        let exports = util.namespace_exports.as_ref().unwrap();
        let names: Vec<_> = exports.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        // Using the namespace uses every export.
        assert!(util.statements[0].is_included);
        assert!(util.statements[1].is_included);
    }

    #[test]
    fn modules_are_fetched_once() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "/main.js",
                "import { a } from './shared.js';\nimport { b } from './other.js';\nexport const out = combine(a, b);\n",
            )
            .with_file("/other.js", "import { a } from './shared.js';\nexport const b = a;\n")
            .with_file("/shared.js", "export const a = 1;\nexport const b = 2;\n");
        let graph = build(&fs, "/main.js");
        assert_eq!(graph.modules.len(), 3);
    }
}
