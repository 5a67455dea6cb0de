//! Declarations and references.
//!
//! A `Declaration` is a named binding: where a name is defined, whether the
//! mark phase has reached it, and what it renders as after conflict
//! resolution. All declarations live in one `DeclArena` owned by the graph,
//! so cross-module links are plain `DeclId` indices instead of shared
//! mutable pointers.
//!
//! Two synthetic variants have no direct source binding:
//! - `SyntheticDefault` wraps an `export default`; it forwards rendering to
//!   the original declaration once bound, else falls back to a generated
//!   name
//! - `SyntheticNamespace` represents `import * as ns`; using it uses every
//!   export of the target module, and it renders as a frozen object literal

use crate::module_graph::ModuleId;
use crate::scope::ScopeId;
use crate::span::Span;

/// Index into the graph's declaration arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of declaration variants; behavior differences are pattern
/// matches in the linker, not inheritance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    /// Ordinary `let`/`const`/`var`/`function` binding.
    Plain,
    /// Function parameter; has no owning statement.
    Param,
    /// `export default …`; `original` is filled during binding when the
    /// exported value is itself a named binding.
    SyntheticDefault { original: Option<DeclId> },
    /// `import * as ns from '…'`; aggregates every export of `module`.
    SyntheticNamespace { module: ModuleId },
}

/// A named binding.
#[derive(Clone, Debug)]
pub struct Declaration {
    /// Rendered name; rewritten by conflict resolution.
    pub name: String,
    /// Mark-phase flag; transitions false→true only.
    pub is_used: bool,
    pub is_function: bool,
    /// Defining top-level statement, when there is one.
    pub statement: Option<(ModuleId, usize)>,
    pub kind: DeclKind,
}

/// Graph-owned arena of declarations.
#[derive(Debug, Default)]
pub struct DeclArena {
    declarations: Vec<Declaration>,
}

impl DeclArena {
    pub fn new() -> Self {
        DeclArena {
            declarations: Vec::new(),
        }
    }

    pub fn alloc(&mut self, declaration: Declaration) -> DeclId {
        let id = DeclId(self.declarations.len() as u32);
        self.declarations.push(declaration);
        id
    }

    pub fn get(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.declarations[id.index()]
    }

    /// Final rendered name of a declaration, following a synthetic
    /// default through to its original when bound.
    pub fn rendered_name(&self, id: DeclId) -> &str {
        let declaration = self.get(id);
        match declaration.kind {
            DeclKind::SyntheticDefault {
                original: Some(original),
            } => self.rendered_name(original),
            _ => &declaration.name,
        }
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A use-site of a name: the renamable root identifier of an expression,
/// its enclosing scope, and the declaration it resolved to. `None` after
/// binding means external/global, which is accepted and left unrewritten.
#[derive(Clone, Debug)]
pub struct Reference {
    pub name: String,
    /// Span of the renamable root identifier.
    pub span: Span,
    pub scope: ScopeId,
    pub declaration: Option<DeclId>,
}

impl Reference {
    pub fn new(name: impl Into<String>, span: Span, scope: ScopeId) -> Self {
        Reference {
            name: name.into(),
            span,
            scope,
            declaration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(name: &str) -> Declaration {
        Declaration {
            name: name.to_string(),
            is_used: false,
            is_function: false,
            statement: None,
            kind: DeclKind::Plain,
        }
    }

    #[test]
    fn rendered_name_follows_bound_default() {
        let mut arena = DeclArena::new();
        let original = arena.alloc(plain("foo"));
        let synthetic = arena.alloc(Declaration {
            name: "main__default".to_string(),
            is_used: false,
            is_function: false,
            statement: None,
            kind: DeclKind::SyntheticDefault {
                original: Some(original),
            },
        });
        assert_eq!(arena.rendered_name(synthetic), "foo");
        // After a rename of the original, the default follows.
        arena.get_mut(original).name = "foo$1".to_string();
        assert_eq!(arena.rendered_name(synthetic), "foo$1");
    }

    #[test]
    fn unbound_default_uses_generated_name() {
        let mut arena = DeclArena::new();
        let synthetic = arena.alloc(Declaration {
            name: "main__default".to_string(),
            is_used: false,
            is_function: false,
            statement: None,
            kind: DeclKind::SyntheticDefault { original: None },
        });
        assert_eq!(arena.rendered_name(synthetic), "main__default");
    }
}
