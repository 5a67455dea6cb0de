//! Recursive-descent parser over the scanner's token list.
//!
//! Single forward cursor with no backtracking or error recovery: a token that
//! does not match the expected kind aborts the whole parse with an
//! expected-vs-actual message. Node spans run from the first to the last
//! consumed token (a trailing semicolon belongs to its statement, which is
//! what makes whole-statement excision exact).

use crate::ast::{Node, VarKind};
use crate::diagnostics::SyntaxError;
use crate::scanner::{Token, TokenKind, tokenize};
use crate::span::Span;

/// Parse one module's source into a `Node::Program`.
pub fn parse(source: &str) -> Result<Node, SyntaxError> {
    let tokens = tokenize(source)?;
    ParserState::new(tokens, source.len() as u32).parse_program()
}

/// Parser state: token list plus a forward-only cursor.
pub struct ParserState {
    tokens: Vec<Token>,
    pos: usize,
    source_len: u32,
}

impl ParserState {
    pub fn new(tokens: Vec<Token>, source_len: u32) -> Self {
        ParserState {
            tokens,
            pos: 0,
            source_len,
        }
    }

    pub fn parse_program(mut self) -> Result<Node, SyntaxError> {
        let mut body = Vec::new();
        while self.peek().is_some() {
            body.push(self.parse_statement()?);
        }
        Ok(Node::Program {
            body,
            span: Span::new(0, self.source_len),
        })
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        match self.peek() {
            Some(token) if token.kind == kind => Ok(self.advance()),
            Some(token) => Err(SyntaxError::new(
                format!("expected {}, found {}", kind.name(), token.kind.name()),
                token.span,
            )),
            None => Err(SyntaxError::new(
                format!("expected {}, found end of input", kind.name()),
                Span::new(self.source_len, self.source_len),
            )),
        }
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::new(
                format!("expected {wanted}, found {}", token.kind.name()),
                token.span,
            ),
            None => SyntaxError::new(
                format!("expected {wanted}, found end of input"),
                Span::new(self.source_len, self.source_len),
            ),
        }
    }

    /// Optional trailing semicolon; returns the statement's end offset.
    fn finish_statement(&mut self, end: u32) -> u32 {
        match self.eat(TokenKind::Semicolon) {
            Some(semi) => semi.span.end,
            None => end,
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Node, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Let) | Some(TokenKind::Const) | Some(TokenKind::Var) => {
                self.parse_variable_declaration()
            }
            Some(TokenKind::Function) => self.parse_function_declaration(),
            Some(TokenKind::Import) => self.parse_import_declaration(),
            Some(TokenKind::Export) => self.parse_export_declaration(),
            Some(TokenKind::LeftCurly) => self.parse_block_statement(),
            Some(TokenKind::Return) => self.parse_return_statement(),
            Some(TokenKind::Identifier) | Some(TokenKind::Number) | Some(TokenKind::String) => {
                self.parse_expression_statement()
            }
            _ => Err(self.unexpected("statement")),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<Node, SyntaxError> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            _ => VarKind::Var,
        };
        let mut declarations = Vec::new();
        loop {
            let id = self.parse_identifier()?;
            let init = if self.eat(TokenKind::Equals).is_some() {
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            let span = match &init {
                Some(node) => id.span().cover(node.span()),
                None => id.span(),
            };
            declarations.push(Node::VariableDeclarator {
                id: Box::new(id),
                init,
                span,
            });
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let last = declarations.last().map(|d| d.span().end).unwrap_or(0);
        let end = self.finish_statement(last);
        Ok(Node::VariableDeclaration {
            kind,
            declarations,
            span: Span::new(keyword.span.start, end),
        })
    }

    fn parse_function_declaration(&mut self) -> Result<Node, SyntaxError> {
        let keyword = self.expect(TokenKind::Function)?;
        let id = if self.check(TokenKind::Identifier) {
            Some(Box::new(self.parse_identifier()?))
        } else {
            None
        };
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RightParen) {
            params.push(self.parse_identifier()?);
            if !self.check(TokenKind::RightParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_block_statement()?;
        let span = Span::new(keyword.span.start, body.span().end);
        Ok(Node::FunctionDeclaration {
            id,
            params,
            body: Box::new(body),
            span,
        })
    }

    fn parse_block_statement(&mut self) -> Result<Node, SyntaxError> {
        let open = self.expect(TokenKind::LeftCurly)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RightCurly) {
            if self.peek().is_none() {
                return Err(self.unexpected("}"));
            }
            body.push(self.parse_statement()?);
        }
        let close = self.expect(TokenKind::RightCurly)?;
        Ok(Node::BlockStatement {
            body,
            span: Span::new(open.span.start, close.span.end),
        })
    }

    fn parse_return_statement(&mut self) -> Result<Node, SyntaxError> {
        let keyword = self.expect(TokenKind::Return)?;
        let argument = match self.peek_kind() {
            Some(TokenKind::Semicolon) | Some(TokenKind::RightCurly) | None => None,
            _ => Some(Box::new(self.parse_expression()?)),
        };
        let end = argument.as_ref().map(|a| a.span().end).unwrap_or(keyword.span.end);
        let end = self.finish_statement(end);
        Ok(Node::ReturnStatement {
            argument,
            span: Span::new(keyword.span.start, end),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Node, SyntaxError> {
        let expression = self.parse_expression()?;
        let start = expression.span().start;
        let end = self.finish_statement(expression.span().end);
        Ok(Node::ExpressionStatement {
            expression: Box::new(expression),
            span: Span::new(start, end),
        })
    }

    // ------------------------------------------------------------------
    // Expressions: Identifier (Call | Member)*, a left-associative chain
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Node, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Number) | Some(TokenKind::String) => return self.parse_literal(),
            _ => {}
        }
        let mut expression = self.parse_identifier()?;
        loop {
            if self.check(TokenKind::LeftParen) {
                expression = self.parse_call(expression)?;
            } else if self.eat(TokenKind::Dot).is_some() {
                let property = self.parse_identifier()?;
                let span = expression.span().cover(property.span());
                expression = Node::MemberExpression {
                    object: Box::new(expression),
                    property: Box::new(property),
                    span,
                };
            } else {
                break;
            }
        }
        Ok(expression)
    }

    fn parse_call(&mut self, callee: Node) -> Result<Node, SyntaxError> {
        self.expect(TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        while !self.check(TokenKind::RightParen) {
            arguments.push(self.parse_expression()?);
            if !self.check(TokenKind::RightParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        let close = self.expect(TokenKind::RightParen)?;
        let span = Span::new(callee.span().start, close.span.end);
        Ok(Node::CallExpression {
            callee: Box::new(callee),
            arguments,
            span,
        })
    }

    fn parse_identifier(&mut self) -> Result<Node, SyntaxError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Node::Identifier {
            name: token.text,
            span: token.span,
        })
    }

    fn parse_literal(&mut self) -> Result<Node, SyntaxError> {
        let token = self.advance();
        let raw = token.raw.clone().unwrap_or_else(|| token.text.clone());
        Ok(Node::Literal {
            value: token.text,
            raw,
            span: token.span,
        })
    }

    fn parse_string_literal(&mut self) -> Result<Node, SyntaxError> {
        if !self.check(TokenKind::String) {
            return Err(self.unexpected("String"));
        }
        self.parse_literal()
    }

    // ------------------------------------------------------------------
    // Imports and exports
    // ------------------------------------------------------------------

    fn parse_import_declaration(&mut self) -> Result<Node, SyntaxError> {
        let keyword = self.expect(TokenKind::Import)?;
        let mut specifiers = Vec::new();

        if self.check(TokenKind::Identifier) {
            let local = self.parse_identifier()?;
            let span = local.span();
            specifiers.push(Node::ImportDefaultSpecifier {
                local: Box::new(local),
                span,
            });
            self.eat(TokenKind::Comma);
        }

        if self.eat(TokenKind::LeftCurly).is_some() {
            while !self.check(TokenKind::RightCurly) {
                let imported = self.parse_identifier()?;
                let local = if self.eat(TokenKind::As).is_some() {
                    self.parse_identifier()?
                } else {
                    imported.clone()
                };
                let span = imported.span().cover(local.span());
                specifiers.push(Node::ImportSpecifier {
                    imported: Box::new(imported),
                    local: Box::new(local),
                    span,
                });
                if !self.check(TokenKind::RightCurly) {
                    self.expect(TokenKind::Comma)?;
                }
            }
            self.expect(TokenKind::RightCurly)?;
        } else if self.check(TokenKind::Star) {
            let star = self.advance();
            self.expect(TokenKind::As)?;
            let local = self.parse_identifier()?;
            let span = Span::new(star.span.start, local.span().end);
            specifiers.push(Node::ImportNamespaceSpecifier {
                local: Box::new(local),
                span,
            });
        }

        self.expect(TokenKind::From)?;
        let source = self.parse_string_literal()?;
        let end = self.finish_statement(source.span().end);
        Ok(Node::ImportDeclaration {
            specifiers,
            source: Box::new(source),
            span: Span::new(keyword.span.start, end),
        })
    }

    fn parse_export_declaration(&mut self) -> Result<Node, SyntaxError> {
        let keyword = self.expect(TokenKind::Export)?;
        match self.peek_kind() {
            Some(TokenKind::Default) => {
                self.advance();
                let declaration = if self.check(TokenKind::Function) {
                    self.parse_function_declaration()?
                } else {
                    self.parse_expression()?
                };
                let end = self.finish_statement(declaration.span().end);
                Ok(Node::ExportDefaultDeclaration {
                    declaration: Box::new(declaration),
                    span: Span::new(keyword.span.start, end),
                })
            }
            Some(TokenKind::LeftCurly) => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.check(TokenKind::RightCurly) {
                    let local = self.parse_identifier()?;
                    let exported = if self.eat(TokenKind::As).is_some() {
                        self.parse_identifier()?
                    } else {
                        local.clone()
                    };
                    let span = local.span().cover(exported.span());
                    specifiers.push(Node::ExportSpecifier {
                        local: Box::new(local),
                        exported: Box::new(exported),
                        span,
                    });
                    if !self.check(TokenKind::RightCurly) {
                        self.expect(TokenKind::Comma)?;
                    }
                }
                let close = self.expect(TokenKind::RightCurly)?;
                let source = if self.eat(TokenKind::From).is_some() {
                    Some(Box::new(self.parse_string_literal()?))
                } else {
                    None
                };
                let last = source.as_ref().map(|s| s.span().end).unwrap_or(close.span.end);
                let end = self.finish_statement(last);
                Ok(Node::ExportNamedDeclaration {
                    declaration: None,
                    specifiers,
                    source,
                    span: Span::new(keyword.span.start, end),
                })
            }
            Some(TokenKind::Star) => {
                self.advance();
                let exported = if self.eat(TokenKind::As).is_some() {
                    Some(Box::new(self.parse_identifier()?))
                } else {
                    None
                };
                self.expect(TokenKind::From)?;
                let source = self.parse_string_literal()?;
                let end = self.finish_statement(source.span().end);
                Ok(Node::ExportAllDeclaration {
                    exported,
                    source: Box::new(source),
                    span: Span::new(keyword.span.start, end),
                })
            }
            Some(TokenKind::Let) | Some(TokenKind::Const) | Some(TokenKind::Var) => {
                let declaration = self.parse_variable_declaration()?;
                let span = Span::new(keyword.span.start, declaration.span().end);
                Ok(Node::ExportNamedDeclaration {
                    declaration: Some(Box::new(declaration)),
                    specifiers: Vec::new(),
                    source: None,
                    span,
                })
            }
            Some(TokenKind::Function) => {
                let declaration = self.parse_function_declaration()?;
                let span = Span::new(keyword.span.start, declaration.span().end);
                Ok(Node::ExportNamedDeclaration {
                    declaration: Some(Box::new(declaration)),
                    specifiers: Vec::new(),
                    source: None,
                    span,
                })
            }
            _ => Err(self.unexpected("export declaration")),
        }
    }
}
