//! AST node types.
//!
//! One closed tagged enum over every node kind in the grammar, acorn-style:
//! statements, expressions, and import/export specifiers share the `Node`
//! type. Every node carries the `[start, end)` byte span derived from its
//! first and last consumed token; nodes are immutable once parsed.
//!
//! Scope is deliberately *not* stored on nodes; the binding structures
//! live in side tables keyed by statement (see `scope.rs`), so the tree
//! stays shared-state free.

use crate::span::Span;

/// Declaration keyword of a variable statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Let,
    Const,
    Var,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Let => "let",
            VarKind::Const => "const",
            VarKind::Var => "var",
        }
    }

    /// `let`/`const` bind to the innermost scope; `var` hoists.
    pub fn is_block_scoped(self) -> bool {
        !matches!(self, VarKind::Var)
    }
}

/// A parsed AST node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Program {
        body: Vec<Node>,
        span: Span,
    },
    VariableDeclaration {
        kind: VarKind,
        declarations: Vec<Node>,
        span: Span,
    },
    VariableDeclarator {
        id: Box<Node>,
        init: Option<Box<Node>>,
        span: Span,
    },
    FunctionDeclaration {
        id: Option<Box<Node>>,
        params: Vec<Node>,
        body: Box<Node>,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Literal {
        value: String,
        raw: String,
        span: Span,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
        span: Span,
    },
    /// Left-nested: `a.b.c` parses as `(a.b).c`.
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        span: Span,
    },
    BlockStatement {
        body: Vec<Node>,
        span: Span,
    },
    ExpressionStatement {
        expression: Box<Node>,
        span: Span,
    },
    ReturnStatement {
        argument: Option<Box<Node>>,
        span: Span,
    },
    ImportDeclaration {
        specifiers: Vec<Node>,
        source: Box<Node>,
        span: Span,
    },
    /// `import { imported as local }`
    ImportSpecifier {
        imported: Box<Node>,
        local: Box<Node>,
        span: Span,
    },
    /// `import local`
    ImportDefaultSpecifier {
        local: Box<Node>,
        span: Span,
    },
    /// `import * as local`
    ImportNamespaceSpecifier {
        local: Box<Node>,
        span: Span,
    },
    /// `export { … }` (optionally `from`), or `export <declaration>`.
    ExportNamedDeclaration {
        declaration: Option<Box<Node>>,
        specifiers: Vec<Node>,
        source: Option<Box<Node>>,
        span: Span,
    },
    /// `export { local as exported }`
    ExportSpecifier {
        local: Box<Node>,
        exported: Box<Node>,
        span: Span,
    },
    ExportDefaultDeclaration {
        declaration: Box<Node>,
        span: Span,
    },
    /// `export * from '…'` (optionally `as name`).
    ExportAllDeclaration {
        exported: Option<Box<Node>>,
        source: Box<Node>,
        span: Span,
    },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Program { span, .. }
            | Node::VariableDeclaration { span, .. }
            | Node::VariableDeclarator { span, .. }
            | Node::FunctionDeclaration { span, .. }
            | Node::Identifier { span, .. }
            | Node::Literal { span, .. }
            | Node::CallExpression { span, .. }
            | Node::MemberExpression { span, .. }
            | Node::BlockStatement { span, .. }
            | Node::ExpressionStatement { span, .. }
            | Node::ReturnStatement { span, .. }
            | Node::ImportDeclaration { span, .. }
            | Node::ImportSpecifier { span, .. }
            | Node::ImportDefaultSpecifier { span, .. }
            | Node::ImportNamespaceSpecifier { span, .. }
            | Node::ExportNamedDeclaration { span, .. }
            | Node::ExportSpecifier { span, .. }
            | Node::ExportDefaultDeclaration { span, .. }
            | Node::ExportAllDeclaration { span, .. } => *span,
        }
    }

    /// Identifier name, if this node is an identifier.
    pub fn identifier_name(&self) -> Option<&str> {
        match self {
            Node::Identifier { name, .. } => Some(name),
            _ => None,
        }
    }

    /// String value, if this node is a literal.
    pub fn literal_value(&self) -> Option<&str> {
        match self {
            Node::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_import_declaration(&self) -> bool {
        matches!(self, Node::ImportDeclaration { .. })
    }

    pub fn is_export_declaration(&self) -> bool {
        matches!(
            self,
            Node::ExportNamedDeclaration { .. }
                | Node::ExportDefaultDeclaration { .. }
                | Node::ExportAllDeclaration { .. }
        )
    }

    /// `export ... from '...'`: forwards names without defining them locally.
    pub fn is_reexport_declaration(&self) -> bool {
        match self {
            Node::ExportNamedDeclaration { source, .. } => source.is_some(),
            Node::ExportAllDeclaration { .. } => true,
            _ => false,
        }
    }

    /// Root identifier of a member-expression chain (`a` for `a.b.c`),
    /// or the node itself for a plain identifier.
    pub fn member_root(&self) -> Option<&Node> {
        match self {
            Node::Identifier { .. } => Some(self),
            Node::MemberExpression { object, .. } => object.member_root(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, start: u32) -> Node {
        Node::Identifier {
            name: name.to_string(),
            span: Span::new(start, start + name.len() as u32),
        }
    }

    #[test]
    fn member_root_walks_to_leftmost_identifier() {
        // foo.bar.zoo
        let inner = Node::MemberExpression {
            object: Box::new(ident("foo", 0)),
            property: Box::new(ident("bar", 4)),
            span: Span::new(0, 7),
        };
        let outer = Node::MemberExpression {
            object: Box::new(inner),
            property: Box::new(ident("zoo", 8)),
            span: Span::new(0, 11),
        };
        assert_eq!(outer.member_root().unwrap().identifier_name(), Some("foo"));
    }

    #[test]
    fn reexport_classification() {
        let source = Node::Literal {
            value: "./m".to_string(),
            raw: "'./m'".to_string(),
            span: Span::new(14, 19),
        };
        let all = Node::ExportAllDeclaration {
            exported: None,
            source: Box::new(source),
            span: Span::new(0, 19),
        };
        assert!(all.is_export_declaration());
        assert!(all.is_reexport_declaration());
    }
}
