//! Per-statement static analysis.
//!
//! A `Statement` wraps one top-level AST node together with everything the
//! linker needs to know about it: its scope tree, the names it defines, the
//! names it depends on, every use-site reference, and the tree-shaking
//! mark. Analysis is one recursive walk threading the current scope as an
//! argument; scope never lives on the nodes themselves.

use crate::ast::Node;
use crate::declaration::{DeclArena, DeclId, DeclKind, Declaration, Reference};
use crate::module_graph::ModuleId;
use crate::scope::{ScopeId, ScopeTree};
use crate::span::Span;

/// One top-level statement of a module.
#[derive(Debug)]
pub struct Statement {
    pub node: Node,
    pub span: Span,
    pub scopes: ScopeTree,
    /// Top-level names this statement defines, in source order.
    pub defines: Vec<String>,
    /// Names referenced but not defined within this statement.
    pub depends_on: Vec<String>,
    pub references: Vec<Reference>,
    /// Tree-shaking mark; transitions false→true only.
    pub is_included: bool,
    pub is_import: bool,
    pub is_export: bool,
    pub is_reexport: bool,
}

impl Statement {
    pub fn new(node: Node, module: ModuleId, index: usize, arena: &mut DeclArena) -> Self {
        let span = node.span();
        let is_import = node.is_import_declaration();
        let is_export = node.is_export_declaration();
        let is_reexport = node.is_reexport_declaration();

        let mut statement = Statement {
            node,
            span,
            scopes: ScopeTree::new(),
            defines: Vec::new(),
            depends_on: Vec::new(),
            references: Vec::new(),
            is_included: false,
            is_import,
            is_export,
            is_reexport,
        };
        statement.analyse(module, index, arena);
        statement
    }

    /// No imports/exports, no defined names: the statement exists purely
    /// for its side effects and is force-included during the mark phase.
    pub fn is_side_effect(&self) -> bool {
        !self.is_import && !self.is_export && self.defines.is_empty()
    }

    /// Monotonic include mark. Returns true on the first transition.
    pub fn mark(&mut self) -> bool {
        if self.is_included {
            return false;
        }
        self.is_included = true;
        true
    }

    fn analyse(&mut self, module: ModuleId, index: usize, arena: &mut DeclArena) {
        // The walker borrows the node tree while filling the side tables,
        // so the node is taken out and put back around the walk.
        let node = std::mem::replace(
            &mut self.node,
            Node::Program {
                body: Vec::new(),
                span: self.span,
            },
        );
        {
            let mut walker = Walker {
                scopes: &mut self.scopes,
                defines: &mut self.defines,
                references: &mut self.references,
                arena,
                module,
                index,
            };
            walker.walk_statement(&node, ScopeId::ROOT);
        }
        self.node = node;

        // dependsOn: references that escape every scope in this statement.
        for reference in &self.references {
            if self.scopes.lookup(reference.scope, &reference.name).is_none()
                && !self.depends_on.contains(&reference.name)
            {
                self.depends_on.push(reference.name.clone());
            }
        }
    }
}

struct Walker<'a> {
    scopes: &'a mut ScopeTree,
    defines: &'a mut Vec<String>,
    references: &'a mut Vec<Reference>,
    arena: &'a mut DeclArena,
    module: ModuleId,
    index: usize,
}

impl Walker<'_> {
    fn declare(&mut self, name: &str, span: Span, scope: ScopeId, is_block: bool, is_function: bool) {
        let decl = self.arena.alloc(Declaration {
            name: name.to_string(),
            is_used: false,
            is_function,
            statement: Some((self.module, self.index)),
            kind: DeclKind::Plain,
        });
        let placed = self.scopes.declare(scope, name, decl, is_block);
        if placed == ScopeId::ROOT && !self.defines.contains(&name.to_string()) {
            self.defines.push(name.to_string());
        }
        // The definition site is a rename site like any use of the name.
        self.references.push(Reference::new(name, span, scope));
    }

    fn walk_statement(&mut self, node: &Node, scope: ScopeId) {
        match node {
            Node::VariableDeclaration {
                kind, declarations, ..
            } => {
                for declarator in declarations {
                    if let Node::VariableDeclarator { id, init, .. } = declarator {
                        if let Some(name) = id.identifier_name() {
                            self.declare(name, id.span(), scope, kind.is_block_scoped(), false);
                        }
                        if let Some(init) = init {
                            self.walk_expression(init, scope);
                        }
                    }
                }
            }
            Node::FunctionDeclaration {
                id, params, body, ..
            } => {
                if let Some(id) = id.as_deref() {
                    if let Some(name) = id.identifier_name() {
                        // `function` hoists like `var`.
                        self.declare(name, id.span(), scope, false, true);
                    }
                }
                let function_scope = self.scopes.push(scope, false);
                for param in params {
                    if let Some(name) = param.identifier_name() {
                        let decl = self.arena.alloc(Declaration {
                            name: name.to_string(),
                            is_used: false,
                            is_function: false,
                            statement: None,
                            kind: DeclKind::Param,
                        });
                        self.scopes.declare(function_scope, name, decl, true);
                    }
                }
                self.walk_statement(body, function_scope);
            }
            Node::BlockStatement { body, .. } => {
                let block = self.scopes.push(scope, true);
                for statement in body {
                    self.walk_statement(statement, block);
                }
            }
            Node::ExpressionStatement { expression, .. } => {
                self.walk_expression(expression, scope);
            }
            Node::ReturnStatement { argument, .. } => {
                if let Some(argument) = argument {
                    self.walk_expression(argument, scope);
                }
            }
            Node::ExportNamedDeclaration {
                declaration: Some(declaration),
                ..
            } => {
                self.walk_statement(declaration, scope);
            }
            Node::ExportDefaultDeclaration { declaration, .. } => match declaration.as_ref() {
                function @ Node::FunctionDeclaration { .. } => {
                    self.walk_statement(function, scope);
                }
                expression => self.walk_expression(expression, scope),
            },
            // Import declarations, export lists, and export-all carry no
            // renderable code and no use-site references.
            _ => {}
        }
    }

    fn walk_expression(&mut self, node: &Node, scope: ScopeId) {
        match node {
            Node::Identifier { name, span } => {
                self.references
                    .push(Reference::new(name.as_str(), *span, scope));
            }
            Node::MemberExpression { .. } => {
                // Only the chain root is renamable; `a` in `a.b.c`.
                if let Some(Node::Identifier { name, span }) = node.member_root() {
                    self.references
                        .push(Reference::new(name.as_str(), *span, scope));
                }
            }
            Node::CallExpression {
                callee, arguments, ..
            } => {
                self.walk_expression(callee, scope);
                for argument in arguments {
                    self.walk_expression(argument, scope);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn analyse(source: &str) -> (Vec<Statement>, DeclArena) {
        let mut arena = DeclArena::new();
        let body = match parse(source).unwrap() {
            Node::Program { body, .. } => body,
            _ => unreachable!(),
        };
        let statements = body
            .into_iter()
            .enumerate()
            .map(|(index, node)| Statement::new(node, ModuleId(0), index, &mut arena))
            .collect();
        (statements, arena)
    }

    #[test]
    fn top_level_defines_and_depends() {
        let (statements, _) = analyse("function add(a, b) { return a.plus(b); }\nadd(one, 2);");
        assert_eq!(statements[0].defines, vec!["add"]);
        assert!(statements[0].depends_on.is_empty(), "params are local");
        assert!(!statements[0].is_side_effect());

        assert!(statements[1].defines.is_empty());
        assert_eq!(statements[1].depends_on, vec!["add", "one"]);
        assert!(statements[1].is_side_effect());
    }

    #[test]
    fn block_scoped_locals_do_not_leak() {
        let (statements, _) = analyse("{ let hidden = 1; }\nlog(hidden);");
        assert!(statements[0].defines.is_empty());
        assert_eq!(statements[1].depends_on, vec!["log", "hidden"]);
    }

    #[test]
    fn var_hoists_out_of_blocks_to_top_level() {
        let (statements, _) = analyse("{ var leaked = 1; }");
        assert_eq!(statements[0].defines, vec!["leaked"]);
    }

    #[test]
    fn member_chain_records_root_only() {
        let (statements, _) = analyse("foo.bar.zoo");
        let names: Vec<_> = statements[0]
            .references
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["foo"]);
        // The span covers exactly the root identifier.
        assert_eq!(statements[0].references[0].span, Span::new(0, 3));
    }

    #[test]
    fn export_wrapped_declaration_defines_its_name() {
        let (statements, _) = analyse("export const answer = compute();");
        assert_eq!(statements[0].defines, vec!["answer"]);
        assert_eq!(statements[0].depends_on, vec!["compute"]);
        assert!(statements[0].is_export);
        assert!(!statements[0].is_reexport);
    }

    #[test]
    fn reexport_flags() {
        let (statements, _) = analyse("export { x } from './m';\nexport * from './n';");
        assert!(statements[0].is_reexport);
        assert!(statements[1].is_reexport);
        assert!(statements[0].references.is_empty());
    }

    #[test]
    fn definition_sites_are_recorded_as_references() {
        let (statements, _) = analyse("const base = other;\nfunction get() { return base; }");
        let names: Vec<_> = statements[0]
            .references
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["base", "other"]);
        // The span covers exactly the declared identifier, so a rename
        // rewrites the declaration together with its uses.
        assert_eq!(statements[0].references[0].span, Span::new(6, 10));

        let names: Vec<_> = statements[1]
            .references
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["get", "base"]);
    }

    #[test]
    fn mark_is_monotonic() {
        let (mut statements, _) = analyse("let a = 1;");
        assert!(statements[0].mark());
        assert!(!statements[0].mark());
        assert!(statements[0].is_included);
    }
}
