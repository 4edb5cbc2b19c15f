//! Token and TokenList (spec.md §3).

use super::keyword::Keyword;
use super::operator::{Operator, Punctuator};
use crate::position::SourcePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRadix {
    Dec,
    Hex,
    Bin,
    Oct,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Keyword(Keyword),
    IntegerLiteral { value: u64, radix: IntRadix },
    FloatLiteral(f64),
    StringLiteral { bytes: Vec<u8>, single_quoted: bool },
    Operator(Operator),
    Punctuator(Punctuator),
    SingleLineComment(String),
    MultiLineComment(String),
    Whitespace(String),
}

impl TokenKind {
    /// Whitespace and comments are retained for position-fidelity
    /// (spec.md invariant 8) but every downstream consumer skips them.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace(_) | TokenKind::SingleLineComment(_) | TokenKind::MultiLineComment(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: SourcePosition,
}

impl Token {
    pub fn new(kind: TokenKind, position: SourcePosition) -> Self {
        Token { kind, position }
    }
}

/// Ordered sequence of tokens. Once [`TokenList::freeze`] is called, no more
/// tokens may be pushed (spec.md §3 "TokenList").
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
    frozen: bool,
}

impl TokenList {
    pub fn new() -> Self {
        TokenList::default()
    }

    /// Returns `Err` (the token is not pushed) if the list is frozen.
    pub fn push(&mut self, token: Token) -> Result<(), ()> {
        if self.frozen {
            return Err(());
        }
        self.tokens.push(token);
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens with trivia (whitespace/comments) filtered out, the view every
    /// downstream consumer other than a pretty-printer should use.
    pub fn significant(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.kind.is_trivia())
    }

    /// spec.md invariant 1: token positions are strictly non-decreasing.
    pub fn positions_non_decreasing(&self) -> bool {
        self.tokens.windows(2).all(|pair| {
            let (a, b) = (&pair[0].position, &pair[1].position);
            (b.line, b.column) >= (a.line, a.column)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pos() -> SourcePosition {
        SourcePosition::new(Arc::from("a.j"), 1, 1)
    }

    #[test]
    fn frozen_list_rejects_pushes() {
        let mut list = TokenList::new();
        list.freeze();
        let result = list.push(Token::new(TokenKind::Whitespace(" ".into()), pos()));
        assert!(result.is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn significant_skips_trivia() {
        let mut list = TokenList::new();
        list.push(Token::new(TokenKind::Whitespace(" ".into()), pos())).unwrap();
        list.push(Token::new(TokenKind::Identifier("a".into()), pos())).unwrap();
        assert_eq!(list.significant().count(), 1);
    }
}
