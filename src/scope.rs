//! Lexical scope trees.
//!
//! Each top-level statement owns one `ScopeTree`: a small arena of scopes
//! mirroring the statement's lexical nesting. The root scope (index 0) is a
//! function scope standing in for the statement's slice of module top
//! level. `var`/`function` declarations hoist to the nearest function
//! scope; `let`/`const` bind where they appear. Lookups walk the parent
//! chain; a miss falls through to module- and then cross-module resolution
//! in the linker.

use crate::declaration::DeclId;
use rustc_hash::FxHashMap;

/// Index of a scope within its statement's `ScopeTree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One lexical binding region.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub is_block: bool,
    pub declarations: FxHashMap<String, DeclId>,
}

/// Arena of scopes for one statement.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// New tree with a root function scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                parent: None,
                is_block: false,
                declarations: FxHashMap::default(),
            }],
        }
    }

    pub fn push(&mut self, parent: ScopeId, is_block: bool) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            is_block,
            declarations: FxHashMap::default(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Record a declaration, hoisting `var`/`function` bindings out of
    /// block scopes up to the nearest function scope. Returns the scope
    /// that actually received the name.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        decl: DeclId,
        is_block_declaration: bool,
    ) -> ScopeId {
        let mut target = scope;
        if !is_block_declaration {
            while self.scopes[target.index()].is_block {
                match self.scopes[target.index()].parent {
                    Some(parent) => target = parent,
                    None => break,
                }
            }
        }
        self.scopes[target.index()]
            .declarations
            .insert(name.to_string(), decl);
        target
    }

    /// Walk the parent chain looking for `name`.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<DeclId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(&decl) = scope.declarations.get(name) {
                return Some(decl);
            }
            current = scope.parent;
        }
        None
    }
}
