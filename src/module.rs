//! One source file's worth of the bundle.
//!
//! A `Module` owns its original text, its analysed top-level statements,
//! and the import/export/reexport tables the linker traces through. It is
//! created exactly once per resolved id, mutated during binding (resolved
//! sources, dependency modules) and marking (statement inclusion), and
//! rendered at the end by offset edits to its own source.

use crate::ast::Node;
use crate::declaration::{DeclArena, DeclId, DeclKind, Declaration};
use crate::diagnostics::SyntaxError;
use crate::module_graph::ModuleId;
use crate::parser::parse;
use crate::statement::Statement;
use crate::text_edit::{Chunk, Patcher};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// Name imported through `import`/reexport: either a real exported name,
/// `default`, or `*` for a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    pub source: String,
    pub imported: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportEntry {
    pub local: String,
    /// Index of the defining statement, when the export wraps one.
    pub statement: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReexportEntry {
    pub source: String,
    /// Name under which the target module exports it.
    pub imported: String,
}

/// Resolution of one dependency specifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleRef {
    Internal(ModuleId),
    External,
}

#[derive(Debug)]
pub struct Module {
    pub id: ModuleId,
    /// Identity: absolute resolved path.
    pub path: PathBuf,
    pub source: String,
    pub statements: Vec<Statement>,
    /// local name → where it comes from.
    pub imports: IndexMap<String, ImportEntry>,
    /// exported name → local binding.
    pub exports: IndexMap<String, ExportEntry>,
    /// exported name → forwarded binding in another module.
    pub reexports: IndexMap<String, ReexportEntry>,
    /// `export * from` sources, in statement order.
    pub export_all_sources: Vec<String>,
    /// Top-level name → declaration, in source order.
    pub declarations: IndexMap<String, DeclId>,
    /// Synthetic declaration for `export default`, if any.
    pub default_decl: Option<DeclId>,
    /// Local name `export default` evaluates to, when it is a named
    /// binding (`export default foo` / `export default function foo…`).
    pub default_local: Option<String>,
    /// Realized `import * as ns` declaration targeting this module.
    pub namespace_decl: Option<DeclId>,
    /// Export list backing the namespace object, filled during marking.
    pub namespace_exports: Option<Vec<(String, DeclId)>>,
    /// Dependency specifiers in first-occurrence order.
    pub dependencies: Vec<String>,
    /// Resolution per specifier, filled during binding.
    pub resolved_sources: FxHashMap<String, ModuleRef>,
    /// Internal dependencies in specifier order, filled during binding.
    pub dependency_modules: Vec<ModuleId>,
}

impl Module {
    pub fn new(
        id: ModuleId,
        path: PathBuf,
        source: String,
        arena: &mut DeclArena,
    ) -> Result<Self, SyntaxError> {
        let program = parse(&source)?;
        let body = match program {
            Node::Program { body, .. } => body,
            _ => unreachable!("parse always yields a program"),
        };

        let statements: Vec<Statement> = body
            .into_iter()
            .enumerate()
            .map(|(index, node)| Statement::new(node, id, index, arena))
            .collect();

        let mut module = Module {
            id,
            path,
            source,
            statements,
            imports: IndexMap::new(),
            exports: IndexMap::new(),
            reexports: IndexMap::new(),
            export_all_sources: Vec::new(),
            declarations: IndexMap::new(),
            default_decl: None,
            default_local: None,
            namespace_decl: None,
            namespace_exports: None,
            dependencies: Vec::new(),
            resolved_sources: FxHashMap::default(),
            dependency_modules: Vec::new(),
        };
        module.collect_tables(arena);
        Ok(module)
    }

    /// Populate import/export/reexport tables and the top-level
    /// declaration map from the analysed statements.
    fn collect_tables(&mut self, arena: &mut DeclArena) {
        for index in 0..self.statements.len() {
            // Top-level names defined by this statement.
            for name in self.statements[index].defines.clone() {
                if let Some(decl) = self.statements[index]
                    .scopes
                    .root()
                    .declarations
                    .get(&name)
                {
                    self.declarations.insert(name, *decl);
                }
            }

            match &self.statements[index].node {
                Node::ImportDeclaration {
                    specifiers, source, ..
                } => {
                    let source = source.literal_value().unwrap_or_default().to_string();
                    note_dependency(&mut self.dependencies, &source);
                    for specifier in specifiers {
                        let (local, imported) = match specifier {
                            Node::ImportSpecifier {
                                imported, local, ..
                            } => (
                                local.identifier_name().unwrap_or_default(),
                                imported.identifier_name().unwrap_or_default().to_string(),
                            ),
                            Node::ImportDefaultSpecifier { local, .. } => (
                                local.identifier_name().unwrap_or_default(),
                                "default".to_string(),
                            ),
                            Node::ImportNamespaceSpecifier { local, .. } => {
                                (local.identifier_name().unwrap_or_default(), "*".to_string())
                            }
                            _ => continue,
                        };
                        self.imports.insert(
                            local.to_string(),
                            ImportEntry {
                                source: source.clone(),
                                imported,
                            },
                        );
                    }
                }
                Node::ExportNamedDeclaration {
                    declaration: Some(_),
                    ..
                } => {
                    for name in self.statements[index].defines.clone() {
                        self.exports.insert(
                            name.clone(),
                            ExportEntry {
                                local: name,
                                statement: Some(index),
                            },
                        );
                    }
                }
                Node::ExportNamedDeclaration {
                    declaration: None,
                    specifiers,
                    source,
                    ..
                } => {
                    let source = source
                        .as_ref()
                        .map(|s| s.literal_value().unwrap_or_default().to_string());
                    if let Some(source) = &source {
                        note_dependency(&mut self.dependencies, source);
                    }
                    for specifier in specifiers {
                        if let Node::ExportSpecifier {
                            local, exported, ..
                        } = specifier
                        {
                            let local = local.identifier_name().unwrap_or_default().to_string();
                            let exported =
                                exported.identifier_name().unwrap_or_default().to_string();
                            match &source {
                                Some(source) => {
                                    self.reexports.insert(
                                        exported,
                                        ReexportEntry {
                                            source: source.clone(),
                                            imported: local,
                                        },
                                    );
                                }
                                None => {
                                    self.exports.insert(
                                        exported,
                                        ExportEntry {
                                            local,
                                            statement: None,
                                        },
                                    );
                                }
                            }
                        }
                    }
                }
                Node::ExportDefaultDeclaration { declaration, .. } => {
                    let (local, is_function) = match declaration.as_ref() {
                        Node::Identifier { name, .. } => (Some(name.clone()), false),
                        Node::FunctionDeclaration { id, .. } => {
                            (id.as_ref().and_then(|i| i.identifier_name()).map(String::from), true)
                        }
                        _ => (None, false),
                    };
                    let generated = format!("{}__default", self.name_stem());
                    let decl = arena.alloc(Declaration {
                        name: generated.clone(),
                        is_used: false,
                        is_function,
                        statement: Some((self.id, index)),
                        kind: DeclKind::SyntheticDefault { original: None },
                    });
                    self.default_decl = Some(decl);
                    self.default_local = local.clone();
                    self.exports.insert(
                        "default".to_string(),
                        ExportEntry {
                            local: local.unwrap_or(generated),
                            statement: Some(index),
                        },
                    );
                }
                Node::ExportAllDeclaration {
                    exported, source, ..
                } => {
                    let source = source.literal_value().unwrap_or_default().to_string();
                    note_dependency(&mut self.dependencies, &source);
                    match exported.as_ref().and_then(|e| e.identifier_name()) {
                        // `export * as ns from '…'` forwards the whole
                        // namespace under one name.
                        Some(name) => {
                            self.reexports.insert(
                                name.to_string(),
                                ReexportEntry {
                                    source,
                                    imported: "*".to_string(),
                                },
                            );
                        }
                        None => self.export_all_sources.push(source),
                    }
                }
                _ => {}
            }
        }
    }

    /// Names this module exports directly (exports and reexports);
    /// `export *` expansion happens in the graph, which can see the
    /// target modules.
    pub fn exported_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exports.keys().cloned().collect();
        for name in self.reexports.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Sanitized file stem for generated names.
    pub(crate) fn name_stem(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        let mut out = String::with_capacity(stem.len());
        for (i, c) in stem.chars().enumerate() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if i == 0 && c.is_ascii_digit() {
                    out.push('_');
                }
                out.push(c);
            } else {
                out.push('_');
            }
        }
        out
    }

    /// Render this module's contribution to the bundle: excise everything
    /// unmarked, strip export syntax, rewrite renamed references, and
    /// append the namespace object when one was realized.
    pub fn render(&self, arena: &DeclArena) -> (String, Vec<Chunk>) {
        let mut patcher = Patcher::new(&self.source);
        let source_len = self.source.len() as u32;

        for (index, statement) in self.statements.iter().enumerate() {
            // Deleting through to the next statement start also removes
            // trailing punctuation and whitespace.
            let removal_end = self
                .statements
                .get(index + 1)
                .map(|next| next.span.start)
                .unwrap_or(source_len);

            let is_export_list = matches!(
                statement.node,
                Node::ExportNamedDeclaration {
                    declaration: None,
                    ..
                }
            );
            // `export default <bound identifier>` forwards to the original
            // declaration; the statement itself is redundant.
            let is_forwarded_default = matches!(
                statement.node,
                Node::ExportDefaultDeclaration { .. }
            ) && self.default_local.is_some()
                && !matches!(
                    statement.node,
                    Node::ExportDefaultDeclaration { ref declaration, .. }
                        if matches!(declaration.as_ref(), Node::FunctionDeclaration { .. })
                );

            if !statement.is_included
                || statement.is_import
                || statement.is_reexport
                || is_export_list
                || is_forwarded_default
            {
                patcher.remove(statement.span.start, removal_end);
                continue;
            }

            match &statement.node {
                Node::ExportNamedDeclaration {
                    declaration: Some(declaration),
                    ..
                } => {
                    // Strip only the leading `export` keyword.
                    patcher.remove(statement.span.start, declaration.span().start);
                }
                Node::ExportDefaultDeclaration { declaration, .. } => {
                    match declaration.as_ref() {
                        Node::FunctionDeclaration { id: Some(_), .. } => {
                            patcher.remove(statement.span.start, declaration.span().start);
                        }
                        _ => {
                            let name = self
                                .default_decl
                                .map(|d| arena.get(d).name.clone())
                                .unwrap_or_else(|| format!("{}__default", self.name_stem()));
                            patcher.overwrite(
                                statement.span.start,
                                declaration.span().start,
                                format!("const {name} = "),
                            );
                        }
                    }
                }
                _ => {}
            }

            for reference in &statement.references {
                if let Some(decl) = reference.declaration {
                    let rendered = arena.rendered_name(decl);
                    if rendered != reference.name {
                        patcher.overwrite(
                            reference.span.start,
                            reference.span.end,
                            rendered.to_string(),
                        );
                    }
                }
            }
        }

        let (mut code, chunks) = patcher.apply();

        if let (Some(namespace), Some(entries)) = (self.namespace_decl, &self.namespace_exports) {
            if arena.get(namespace).is_used {
                if !code.is_empty() && !code.ends_with('\n') {
                    code.push('\n');
                }
                code.push_str(&format!("const {} = Object.freeze({{\n", arena.get(namespace).name));
                for (position, (exported, decl)) in entries.iter().enumerate() {
                    code.push_str(&format!("\t{exported}: {}", arena.rendered_name(*decl)));
                    if position + 1 < entries.len() {
                        code.push(',');
                    }
                    code.push('\n');
                }
                code.push_str("});\n");
            }
        }

        (code, chunks)
    }
}

/// Record a dependency specifier once, in first-occurrence order.
fn note_dependency(dependencies: &mut Vec<String>, source: &str) {
    if !dependencies.iter().any(|d| d == source) {
        dependencies.push(source.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(source: &str) -> (Module, DeclArena) {
        let mut arena = DeclArena::new();
        let module = Module::new(
            ModuleId(0),
            PathBuf::from("/src/main.js"),
            source.to_string(),
            &mut arena,
        )
        .unwrap();
        (module, arena)
    }

    #[test]
    fn import_table_forms() {
        let (m, _) = module("import def, { a, b as c } from './x';\nimport * as ns from './y';");
        assert_eq!(
            m.imports.get("def"),
            Some(&ImportEntry {
                source: "./x".to_string(),
                imported: "default".to_string()
            })
        );
        assert_eq!(m.imports.get("a").unwrap().imported, "a");
        assert_eq!(m.imports.get("c").unwrap().imported, "b");
        assert_eq!(m.imports.get("ns").unwrap().imported, "*");
        assert_eq!(m.dependencies, vec!["./x", "./y"]);
    }

    #[test]
    fn export_tables() {
        let (m, _) = module(
            "export const foo = 1;\nexport { foo as bar };\nexport { x as y } from './z';\nexport * from './w';",
        );
        assert_eq!(m.exports.get("foo").unwrap().statement, Some(0));
        assert_eq!(m.exports.get("bar").unwrap().local, "foo");
        assert_eq!(m.reexports.get("y").unwrap().imported, "x");
        assert_eq!(m.export_all_sources, vec!["./w"]);
        assert_eq!(m.exported_names(), vec!["foo", "bar", "y"]);
    }

    #[test]
    fn default_export_synthesizes_declaration() {
        let (m, arena) = module("export default function run() {}");
        let decl = arena.get(m.default_decl.unwrap());
        assert!(matches!(decl.kind, DeclKind::SyntheticDefault { .. }));
        assert!(decl.is_function);
        assert_eq!(m.default_local.as_deref(), Some("run"));
        assert_eq!(m.exports.get("default").unwrap().local, "run");
        // The named function itself is a top-level declaration.
        assert!(m.declarations.contains_key("run"));
    }

    #[test]
    fn render_strips_export_keyword_and_drops_unmarked() {
        let (mut m, arena) = module("export const kept = 1;\nconst dropped = 2;\n");
        m.statements[0].mark();
        let (code, _) = m.render(&arena);
        assert_eq!(code, "const kept = 1;\n");
    }

    #[test]
    fn render_rewrites_anonymous_default() {
        let (mut m, arena) = module("export default 42;");
        m.statements[0].mark();
        let (code, _) = m.render(&arena);
        assert_eq!(code, "const main__default = 42;");
    }

    #[test]
    fn render_removes_import_statements() {
        let (mut m, arena) = module("import { a } from './x';\nlog(a);\n");
        m.statements[1].mark();
        let (code, _) = m.render(&arena);
        assert_eq!(code, "log(a);\n");
    }
}
