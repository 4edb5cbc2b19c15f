//! Recursive-descent parser (spec.md §4.3).
//!
//! Consumes the lexer's `TokenList`, ignoring trivia, and produces an
//! [`Ast`]. Error recovery skips to the next top-level boundary (a `;` or a
//! balanced `}` at namespace depth) so one bad top-level item doesn't stop
//! the whole unit from being parsed; anything below "unexpected token at
//! top level" is currently treated as fatal for the enclosing item.

use crate::ast::*;
use crate::diag::{Diagnostic, DiagnosticSink, Severity};
use crate::lexer::{Keyword, Operator, Punctuator, Token, TokenKind, TokenList};
use crate::position::SourcePosition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserErrorKind {
    UnexpectedToken,
    Syntax,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub position: SourcePosition,
    pub detail: String,
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.detail)
    }
}

impl std::error::Error for ParserError {}

/// Parses a frozen token list into an AST, logging recoverable errors to
/// `sink` and returning only if a fatal (unrecoverable) error is hit.
pub fn parse(tokens: &TokenList, sink: &mut DiagnosticSink, timestamp: u32) -> Result<Ast, ParserError> {
    let significant: Vec<Token> = tokens.significant().cloned().collect();
    let mut parser = Parser { tokens: significant, pos: 0, timestamp };
    let items = parser.parse_items(sink, None);
    Ok(Ast { items })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    timestamp: u32,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn position(&self) -> SourcePosition {
        self.peek().map(|t| t.position.clone()).unwrap_or_else(|| {
            self.tokens.last().map(|t| t.position.clone()).unwrap_or_else(|| {
                SourcePosition::start_of(std::sync::Arc::from(""))
            })
        })
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Keyword(k)) if *k == kw)
    }

    fn at_operator(&self, op: Operator) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Operator(o)) if *o == op)
    }

    fn at_punct(&self, p: Punctuator) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Punctuator(p2)) if *p2 == p)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if self.at_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, p: Punctuator) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punctuator) -> Result<(), ParserError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(format!("expected '{}'", p.as_str())))
        }
    }

    fn unexpected(&self, detail: impl Into<String>) -> ParserError {
        ParserError { kind: ParserErrorKind::UnexpectedToken, position: self.position(), detail: detail.into() }
    }

    fn report(&self, sink: &mut DiagnosticSink, err: &ParserError) {
        sink.push(Diagnostic::new(Severity::Error, err.detail.clone(), Some(err.position.clone()), self.timestamp));
    }

    /// Recovers from a bad top-level item by skipping to the next `;` or
    /// balanced `}`, whichever comes first at depth 0.
    fn recover_to_boundary(&mut self) {
        let mut depth = 0i32;
        while let Some(tok) = self.peek() {
            match &tok.kind {
                TokenKind::Punctuator(Punctuator::LBrace) => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Punctuator(Punctuator::RBrace) => {
                    self.advance();
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Punctuator(Punctuator::Semicolon) if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn identifier(&mut self) -> Result<String, ParserError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("expected an identifier")),
        }
    }

    fn type_name(&mut self) -> Result<String, ParserError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                Ok(name)
            }
            Some(TokenKind::Keyword(kw))
                if crate::lexer::is_scalar_type_name(kw.as_str())
                    || matches!(kw, Keyword::Void | Keyword::Bool | Keyword::Auto) =>
            {
                self.advance();
                Ok(kw.as_str().to_string())
            }
            _ => Err(self.unexpected("expected a type name")),
        }
    }

    /// Parses attribute blocks `#[NAME "VALUE"]` (surviving preprocessing
    /// only inside brace-nested field contexts) preceding a field.
    fn attributes(&mut self) -> Result<Vec<Attribute>, ParserError> {
        let mut attrs = Vec::new();
        while self.at_operator(Operator::Hash) {
            self.advance();
            self.expect_punct(Punctuator::LBracket)?;
            let key = self.identifier()?;
            let value = match self.peek_kind().cloned() {
                Some(TokenKind::StringLiteral { bytes, .. }) => {
                    self.advance();
                    String::from_utf8_lossy(&bytes).into_owned()
                }
                _ => return Err(self.unexpected("expected string value in attribute")),
            };
            self.expect_punct(Punctuator::RBracket)?;
            attrs.push(Attribute { key, value });
        }
        Ok(attrs)
    }

    fn array_size(&mut self) -> Result<ArraySize, ParserError> {
        if self.eat_punct(Punctuator::LBracket) {
            if self.eat_punct(Punctuator::RBracket) {
                return Ok(ArraySize::Dynamic);
            }
            match self.peek_kind().cloned() {
                Some(TokenKind::IntegerLiteral { value, .. }) => {
                    self.advance();
                    self.expect_punct(Punctuator::RBracket)?;
                    Ok(ArraySize::Fixed(value as u32))
                }
                _ => Err(self.unexpected("expected array size or ']'")),
            }
        } else {
            Ok(ArraySize::Scalar)
        }
    }

    fn bitfield_width(&mut self) -> Result<u32, ParserError> {
        if self.eat_punct(Punctuator::Colon) {
            match self.peek_kind().cloned() {
                Some(TokenKind::IntegerLiteral { value, .. }) => {
                    self.advance();
                    Ok(value as u32)
                }
                _ => Err(self.unexpected("expected bitfield width")),
            }
        } else {
            Ok(0)
        }
    }

    // -----------------------------------------------------------------
    // Top level
    // -----------------------------------------------------------------

    fn parse_items(&mut self, sink: &mut DiagnosticSink, closing: Option<Punctuator>) -> Vec<Item> {
        let mut items = Vec::new();
        loop {
            if self.peek().is_none() {
                break;
            }
            if let Some(close) = closing {
                if self.at_punct(close) {
                    break;
                }
            }
            match self.parse_item(sink) {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(err) => {
                    self.report(sink, &err);
                    self.recover_to_boundary();
                }
            }
        }
        items
    }

    fn parse_item(&mut self, sink: &mut DiagnosticSink) -> Result<Option<Item>, ParserError> {
        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(None);
        }
        if self.at_keyword(Keyword::Namespace) {
            return self.parse_subsystem(sink).map(|d| Some(Item::Definition(Definition::Subsystem(d))));
        }
        if self.at_keyword(Keyword::Typedef) {
            return self.parse_typedef().map(Some);
        }
        if self.at_keyword(Keyword::Struct) {
            return self.parse_struct().map(Some);
        }
        if self.at_keyword(Keyword::Union) {
            return self.parse_union().map(Some);
        }
        if self.at_keyword(Keyword::Enum) {
            return self.parse_enum().map(Some);
        }
        if self.at_keyword(Keyword::Class) {
            return self.parse_class().map(Some);
        }
        if self.at_keyword(Keyword::Extern) {
            return self.parse_external().map(Some);
        }
        if self.at_keyword(Keyword::Export) {
            return self.parse_export().map(Some);
        }
        if self.at_keyword(Keyword::Global) {
            return self.parse_var_decl(DeclKind::Var).map(Some);
        }
        if self.at_keyword(Keyword::Const) {
            return self.parse_var_decl(DeclKind::Const).map(Some);
        }
        // A leading type name followed by an identifier and '(' is a
        // function; followed by an identifier and ';'/'=' is a let binding.
        self.parse_function_or_let().map(Some)
    }

    fn parse_subsystem(&mut self, sink: &mut DiagnosticSink) -> Result<SubsystemDefinition, ParserError> {
        let position = self.position();
        self.advance(); // 'namespace'
        let name = self.identifier()?;
        let mut depends_on = Vec::new();
        if self.eat_keyword(Keyword::Using) {
            depends_on.push(self.identifier()?);
            while self.eat_operator(Operator::Comma) {
                depends_on.push(self.identifier()?);
            }
        }
        self.expect_punct(Punctuator::LBrace)?;
        let items = self.parse_items(sink, Some(Punctuator::RBrace));
        self.expect_punct(Punctuator::RBrace)?;
        Ok(SubsystemDefinition { name, depends_on, items, position })
    }

    fn parse_typedef(&mut self) -> Result<Item, ParserError> {
        self.advance(); // 'typedef'
        let underlying = self.type_name()?;
        let alias = self.identifier()?;
        self.expect_punct(Punctuator::Semicolon)?;
        Ok(Item::Declaration(Declaration::Type { alias, underlying }))
    }

    fn parse_struct(&mut self) -> Result<Item, ParserError> {
        let position = self.position();
        self.advance(); // 'struct'
        let name = self.identifier()?;
        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(Item::Declaration(Declaration::StructForward { name }));
        }
        let mut is_packed = false;
        if self.at_operator(Operator::Hash) {
            // `#[packed "true"]`-style attribute before the brace also
            // marks the struct, independent of per-field attributes.
            let attrs = self.attributes()?;
            is_packed = attrs.iter().any(|a| a.key.eq_ignore_ascii_case("packed"));
        }
        self.expect_punct(Punctuator::LBrace)?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut seen_names = std::collections::HashSet::new();
        while !self.at_punct(Punctuator::RBrace) && self.peek().is_some() {
            let attrs = self.attributes()?;
            let field_pos = self.position();
            let type_name = self.type_name()?;
            let field_name = self.identifier()?;

            if self.at_punct(Punctuator::LParen) {
                let function = self.parse_function_tail(field_name, type_name, field_pos)?;
                methods.push(StructMethod { function });
                continue;
            }

            let array_size = self.array_size()?;
            let bitfield_width = self.bitfield_width()?;
            let default_value_source = if self.eat_operator(Operator::Assign) {
                Some(self.parse_raw_default_value_text()?)
            } else {
                None
            };
            self.expect_punct(Punctuator::Semicolon)?;

            if !seen_names.insert(field_name.clone()) {
                return Err(ParserError {
                    kind: ParserErrorKind::Semantic,
                    position: field_pos,
                    detail: format!("duplicate field name '{field_name}' in struct '{name}'"),
                });
            }

            fields.push(StructField {
                name: field_name,
                type_name,
                bitfield_width,
                array_size,
                default_value_source,
                attributes: attrs,
                position: field_pos,
            });
        }
        self.expect_punct(Punctuator::RBrace)?;

        Ok(Item::Definition(Definition::Struct(StructDefinition {
            name,
            fields,
            methods,
            packed: is_packed,
            position,
        })))
    }

    /// Scans a default-value initializer as raw token text up to the next
    /// top-level `,`/`;`, re-tokenized lazily by the code generator. This
    /// mirrors spec.md §4.3's requirement that default values be re-emitted
    /// faithfully while keeping the parser simple for compound literals.
    fn parse_raw_default_value_text(&mut self) -> Result<String, ParserError> {
        let mut parts = Vec::new();
        let mut depth = 0i32;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Punctuator(Punctuator::Semicolon)) if depth == 0 => break,
                Some(TokenKind::Punctuator(Punctuator::LParen | Punctuator::LBracket | Punctuator::LBrace)) => {
                    depth += 1;
                }
                Some(TokenKind::Punctuator(Punctuator::RParen | Punctuator::RBracket | Punctuator::RBrace)) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                None => break,
                _ => {}
            }
            parts.push(token_text(self.peek().unwrap()));
            self.advance();
        }
        if parts.is_empty() {
            return Err(self.unexpected("expected a default value expression"));
        }
        Ok(parts.join(" "))
    }

    fn parse_union(&mut self) -> Result<Item, ParserError> {
        self.advance(); // 'union'
        let name = self.identifier()?;
        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(Item::Declaration(Declaration::UnionForward { name }));
        }
        self.expect_punct(Punctuator::LBrace)?;
        let mut fields = Vec::new();
        while !self.at_punct(Punctuator::RBrace) && self.peek().is_some() {
            let type_name = self.type_name()?;
            let field_name = self.identifier()?;
            self.expect_punct(Punctuator::Semicolon)?;
            fields.push(UnionField { name: field_name, type_name });
        }
        self.expect_punct(Punctuator::RBrace)?;
        Ok(Item::Definition(Definition::Union(UnionDefinition { name, fields })))
    }

    fn parse_enum(&mut self) -> Result<Item, ParserError> {
        self.advance(); // 'enum'
        let name = self.identifier()?;
        let underlying_type = if self.eat_punct(Punctuator::Colon) { self.type_name()? } else { "int".to_string() };
        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(Item::Declaration(Declaration::EnumForward { name }));
        }
        self.expect_punct(Punctuator::LBrace)?;
        let mut items = Vec::new();
        while !self.at_punct(Punctuator::RBrace) && self.peek().is_some() {
            let item_name = self.identifier()?;
            let value = if self.eat_operator(Operator::Assign) { Some(self.parse_expression()?) } else { None };
            items.push(EnumItem { name: item_name, value });
            if !self.eat_operator(Operator::Comma) {
                break;
            }
        }
        self.expect_punct(Punctuator::RBrace)?;
        Ok(Item::Definition(Definition::Enum(EnumDefinition { name, underlying_type, items })))
    }

    fn parse_class(&mut self) -> Result<Item, ParserError> {
        self.advance(); // 'class'
        let name = self.identifier()?;
        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(Item::Declaration(Declaration::Class { name, members: vec![], methods: vec![] }));
        }
        self.expect_punct(Punctuator::LBrace)?;
        let mut members = Vec::new();
        let mut methods = Vec::new();
        // spec.md §4.3: absent a modifier, members default Private, methods Public.
        let mut current_member_vis = Visibility::Private;
        let mut current_method_vis = Visibility::Public;
        while !self.at_punct(Punctuator::RBrace) && self.peek().is_some() {
            if self.eat_keyword(Keyword::Public) {
                self.expect_punct(Punctuator::Colon)?;
                current_member_vis = Visibility::Public;
                current_method_vis = Visibility::Public;
                continue;
            }
            if self.eat_keyword(Keyword::Protected) {
                self.expect_punct(Punctuator::Colon)?;
                current_member_vis = Visibility::Protected;
                current_method_vis = Visibility::Protected;
                continue;
            }
            if self.eat_keyword(Keyword::Private) {
                self.expect_punct(Punctuator::Colon)?;
                current_member_vis = Visibility::Private;
                current_method_vis = Visibility::Private;
                continue;
            }
            let field_pos = self.position();
            let type_name = self.type_name()?;
            let member_name = self.identifier()?;
            if self.at_punct(Punctuator::LParen) {
                let function = self.parse_function_tail(member_name, type_name, field_pos)?;
                methods.push(ClassMethodDeclaration { function, visibility: current_method_vis });
                continue;
            }
            let array_size = self.array_size()?;
            let default_value_source =
                if self.eat_operator(Operator::Assign) { Some(self.parse_raw_default_value_text()?) } else { None };
            self.expect_punct(Punctuator::Semicolon)?;
            members.push(ClassMemberDeclaration {
                name: member_name,
                type_name,
                visibility: current_member_vis,
                array_size,
                default_value_source,
            });
        }
        self.expect_punct(Punctuator::RBrace)?;
        Ok(Item::Declaration(Declaration::Class { name, members, methods }))
    }

    fn parse_external(&mut self) -> Result<Item, ParserError> {
        self.advance(); // 'extern'
        let type_name = self.type_name()?;
        let name = self.identifier()?;
        self.expect_punct(Punctuator::Semicolon)?;
        Ok(Item::Declaration(Declaration::External(ExternalDeclaration { name, type_name })))
    }

    fn parse_export(&mut self) -> Result<Item, ParserError> {
        let position = self.position();
        self.advance(); // 'export'
        let target = self.identifier()?;
        self.expect_punct(Punctuator::Semicolon)?;
        Ok(Item::Statement(Statement::Export { target, position }))
    }

    fn parse_var_decl(&mut self, kind: DeclKind) -> Result<Item, ParserError> {
        self.advance(); // 'global' or 'const'
        let type_name = self.type_name()?;
        let name = self.identifier()?;
        let initializer = if self.eat_operator(Operator::Assign) { Some(self.parse_expression()?) } else { None };
        self.expect_punct(Punctuator::Semicolon)?;
        Ok(match kind {
            DeclKind::Var => Item::Declaration(Declaration::Var(VarDeclaration {
                name,
                type_name: Some(type_name),
                initializer,
            })),
            DeclKind::Const => {
                let value = initializer.ok_or_else(|| self.unexpected("const declaration requires a value"))?;
                Item::Declaration(Declaration::Const(ConstDeclaration { name, type_name: Some(type_name), value }))
            }
        })
    }

    fn parse_function_or_let(&mut self) -> Result<Item, ParserError> {
        let position = self.position();
        let type_name = self.type_name()?;
        let name = self.identifier()?;
        if self.at_punct(Punctuator::LParen) {
            let function = self.parse_function_tail(name, type_name, position)?;
            return Ok(Item::Definition(Definition::Function(function)));
        }
        let array_size = self.array_size()?;
        let initializer = if self.eat_operator(Operator::Assign) { Some(self.parse_expression()?) } else { None };
        self.expect_punct(Punctuator::Semicolon)?;
        let _ = array_size;
        Ok(Item::Declaration(Declaration::Let(LetDeclaration { name, type_name: Some(type_name), initializer })))
    }

    fn parse_function_tail(
        &mut self,
        name: String,
        return_type: String,
        position: SourcePosition,
    ) -> Result<FunctionDefinition, ParserError> {
        self.expect_punct(Punctuator::LParen)?;
        let mut params = Vec::new();
        while !self.at_punct(Punctuator::RParen) {
            let is_const = self.eat_keyword(Keyword::Const);
            let is_reference = self.eat_operator(Operator::And);
            let type_name = self.type_name()?;
            let name = self.identifier()?;
            let array_size = self.array_size()?;
            let default_value =
                if self.eat_operator(Operator::Assign) { Some(self.parse_expression()?) } else { None };
            params.push(FunctionParameter { name, type_name, array_size, default_value, is_const, is_reference });
            if !self.eat_operator(Operator::Comma) {
                break;
            }
        }
        self.expect_punct(Punctuator::RParen)?;

        if self.eat_punct(Punctuator::Semicolon) {
            return Ok(FunctionDefinition {
                name,
                return_type,
                return_array_size: ArraySize::Scalar,
                params,
                body: Block::braced(vec![], position.clone()),
                position,
            });
        }

        let body = self.parse_block()?;
        Ok(FunctionDefinition { name, return_type, return_array_size: ArraySize::Scalar, params, body, position })
    }

    fn parse_block(&mut self) -> Result<Block, ParserError> {
        let position = self.position();
        self.expect_punct(Punctuator::LBrace)?;
        let mut children = Vec::new();
        while !self.at_punct(Punctuator::RBrace) && self.peek().is_some() {
            children.push(self.parse_statement()?);
        }
        self.expect_punct(Punctuator::RBrace)?;
        Ok(Block::braced(children, position))
    }

    fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        let position = self.position();
        if self.eat_keyword(Keyword::Return) {
            let value = if self.at_punct(Punctuator::Semicolon) { None } else { Some(self.parse_expression()?) };
            self.expect_punct(Punctuator::Semicolon)?;
            return Ok(Statement::Return { value, position });
        }
        if self.eat_keyword(Keyword::Export) {
            let target = self.identifier()?;
            self.expect_punct(Punctuator::Semicolon)?;
            return Ok(Statement::Export { target, position });
        }
        if self.at_punct(Punctuator::LBrace) {
            return Ok(Statement::Block(self.parse_block()?));
        }
        let expr = self.parse_expression()?;
        self.expect_punct(Punctuator::Semicolon)?;
        Ok(Statement::Expression(expr))
    }

    // -----------------------------------------------------------------
    // Expressions (precedence climbing over a small operator set)
    // -----------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression, ParserError> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expression, ParserError> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = self.peek_binary_op() {
            if prec < min_prec {
                break;
            }
            let position = self.position();
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            left = Expression::Binary { op, left: Box::new(left), right: Box::new(right), position };
        }
        Ok(left)
    }

    fn peek_binary_op(&self) -> Option<(String, u8)> {
        let op = match self.peek_kind()? {
            TokenKind::Operator(op) => *op,
            _ => return None,
        };
        let prec = match op {
            Operator::OrOr | Operator::XorXor => 1,
            Operator::AndAnd => 2,
            Operator::Or => 3,
            Operator::Xor => 4,
            Operator::And => 5,
            Operator::Eq | Operator::Ne => 6,
            Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => 7,
            Operator::Shl | Operator::Shr => 8,
            Operator::Add | Operator::Sub => 9,
            Operator::Mul | Operator::Div | Operator::Mod => 10,
            Operator::Coalesce => 1,
            _ => return None,
        };
        Some((op.as_str().to_string(), prec))
    }

    fn parse_unary(&mut self) -> Result<Expression, ParserError> {
        let position = self.position();
        for op in [Operator::Not, Operator::Tilde, Operator::Sub, Operator::Increment, Operator::Decrement] {
            if self.at_operator(op) {
                self.advance();
                let operand = self.parse_unary()?;
                return Ok(Expression::Unary { op: op.as_str().to_string(), operand: Box::new(operand), position });
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParserError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_punct(Punctuator::LParen) {
                let position = self.position();
                let callee = match &expr {
                    Expression::Name { name, .. } => name.clone(),
                    _ => break,
                };
                self.advance();
                let mut args = Vec::new();
                while !self.at_punct(Punctuator::RParen) {
                    args.push(self.parse_expression()?);
                    if !self.eat_operator(Operator::Comma) {
                        break;
                    }
                }
                self.expect_punct(Punctuator::RParen)?;
                expr = Expression::Call { callee, args, position };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParserError> {
        let position = self.position();
        match self.peek_kind().cloned() {
            Some(TokenKind::IntegerLiteral { value, .. }) => {
                self.advance();
                Ok(Expression::Literal { value: Literal::Integer(value), position })
            }
            Some(TokenKind::FloatLiteral(value)) => {
                self.advance();
                Ok(Expression::Literal { value: Literal::Float(value), position })
            }
            Some(TokenKind::StringLiteral { bytes, .. }) => {
                self.advance();
                Ok(Expression::Literal { value: Literal::String(bytes), position })
            }
            Some(TokenKind::Identifier(name)) => {
                self.advance();
                Ok(Expression::Name { name, position })
            }
            Some(TokenKind::Punctuator(Punctuator::LParen)) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_punct(Punctuator::RParen)?;
                Ok(inner)
            }
            Some(TokenKind::Operator(Operator::New)) => {
                self.advance();
                let target_type = self.type_name()?;
                let operand = if self.at_punct(Punctuator::LParen) { self.parse_primary()? } else { Expression::Null { position: position.clone() } };
                Ok(Expression::Cast { target_type, operand: Box::new(operand), position })
            }
            _ => Err(self.unexpected("expected an expression")),
        }
    }
}

enum DeclKind {
    Var,
    Const,
}

fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Identifier(s) => s.clone(),
        TokenKind::Keyword(k) => k.as_str().to_string(),
        TokenKind::Operator(o) => o.as_str().to_string(),
        TokenKind::Punctuator(p) => p.as_str().to_string(),
        TokenKind::IntegerLiteral { value, .. } => value.to_string(),
        TokenKind::FloatLiteral(f) => f.to_string(),
        TokenKind::StringLiteral { bytes, .. } => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        TokenKind::SingleLineComment(_) | TokenKind::MultiLineComment(_) | TokenKind::Whitespace(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(src: &str) -> (Ast, DiagnosticSink) {
        let tokens = lex(std::sync::Arc::from("t.j"), src).unwrap();
        let mut sink = DiagnosticSink::new("t.j");
        let ast = parse(&tokens, &mut sink, 0).unwrap();
        (ast, sink)
    }

    #[test]
    fn empty_source_yields_empty_ast() {
        let (ast, sink) = parse_source("");
        assert!(ast.items.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn parses_namespace_with_single_struct_field() {
        let (ast, sink) = parse_source("namespace N { struct A { int a; } }");
        assert!(sink.is_empty());
        let structs = ast.struct_definitions();
        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].0, vec!["N".to_string()]);
        assert_eq!(structs[0].1.fields.len(), 1);
        assert_eq!(structs[0].1.fields[0].name, "a");
        assert_eq!(structs[0].1.fields[0].type_name, "int");
    }

    #[test]
    fn parses_packed_struct_with_bitfield_and_array() {
        let (ast, sink) = parse_source(r#"struct P #[packed "true"] { int flags : 3; byte buf[8]; }"#);
        assert!(sink.is_empty());
        let structs = ast.struct_definitions();
        assert_eq!(structs.len(), 1);
        let s = structs[0].1;
        assert!(s.packed);
        assert_eq!(s.fields[0].bitfield_width, 3);
        assert_eq!(s.fields[1].array_size, ArraySize::Fixed(8));
    }

    #[test]
    fn duplicate_field_name_is_a_semantic_error() {
        let tokens = lex(std::sync::Arc::from("t.j"), "struct A { int a; int a; }").unwrap();
        let mut sink = DiagnosticSink::new("t.j");
        let significant: Vec<Token> = tokens.significant().cloned().collect();
        let mut parser = Parser { tokens: significant, pos: 0, timestamp: 0 };
        let mut sink = DiagnosticSink::new("t.j");
        let err = parser.parse_item(&mut sink).unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::Semantic);
    }

    #[test]
    fn finds_root_main_function() {
        let (ast, sink) = parse_source("int main() { return 0; }");
        assert!(sink.is_empty());
        assert!(ast.root_main_function().is_some());
    }

    #[test]
    fn unexpected_top_level_token_recovers_to_next_boundary() {
        let (ast, sink) = parse_source("@@@ ; struct A { int a; }");
        assert_eq!(sink.max_severity(), Some(Severity::Error));
        assert_eq!(ast.struct_definitions().len(), 1);
    }
}
