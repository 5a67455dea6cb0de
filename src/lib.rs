//! espack, a small ES-module bundler.
//!
//! The pipeline: scan and parse each module, analyse per-statement scopes
//! and references, link the module graph (bind, tree-shake, order,
//! deconflict), then render the bundle by offset edits against the
//! original sources, with a version-3 source map.

// Byte spans over module source text
pub mod span;
pub use span::Span;

// Build error types
pub mod diagnostics;
pub use diagnostics::{BuildError, ResolutionError, SyntaxError};

// Scanner - token definitions and tokenizing
pub mod scanner;
pub use scanner::{Token, TokenKind, tokenize};

// AST node definitions
pub mod ast;
pub use ast::{Node, VarKind};

// Recursive-descent parser
pub mod parser;
pub use parser::parse;

// File provider boundary
pub mod host;
pub use host::{FileSystem, MemoryFileSystem, OsFileSystem};

// Specifier resolution
pub mod module_resolver;
pub use module_resolver::{ModuleResolver, ResolvedId};

// Lexical scope trees
pub mod scope;
pub use scope::{Scope, ScopeId, ScopeTree};

// Declarations, references, and the graph-owned arena
pub mod declaration;
pub use declaration::{DeclArena, DeclId, DeclKind, Declaration, Reference};

// Per-statement analysis
pub mod statement;
pub use statement::Statement;

// Modules and their import/export tables
pub mod module;
pub use module::Module;

// Offset-based source patching
pub mod text_edit;
pub use text_edit::{Chunk, Patcher};

// Version-3 source maps
pub mod source_map;
pub use source_map::{LineIndex, SourceMap, SourceMapBuilder};

// The linker
pub mod module_graph;
pub use module_graph::{ModuleGraph, ModuleId};

// Public build entry
pub mod bundle;
pub use bundle::{Bundle, BuildOptions, BundleOutput, build};

#[cfg(test)]
#[path = "tests/bundle_tests.rs"]
mod bundle_tests;
