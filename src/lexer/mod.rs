//! Lexer (spec.md §4.2): a single-pass hand-written state machine that
//! turns source text into a [`TokenList`].
//!
//! The entry point is [`lex`]. Callers are responsible for the UTF-8
//! validity check spec.md assigns to "the boundary layer" — `lex` takes a
//! `&str`, so that check has already happened by construction.

pub mod keyword;
pub mod number;
pub mod operator;
pub mod string_lit;
pub mod token;

pub use keyword::{is_scalar_type_name, Keyword};
pub use operator::{Operator, Punctuator};
pub use token::{IntRadix, Token, TokenKind, TokenList};

use crate::position::{FilePath, SourcePosition};
use number::{NumberError, NumberLiteral};
use operator::{OPERATORS, PUNCTUATORS, WORD_OPERATORS};
use std::fmt;
use string_lit::StringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    InvalidLiteral,
    InvalidIdentifier,
    InvalidOperator,
    InvalidPunctuator,
    UnexpectedEof,
    UnexpectedToken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub position: SourcePosition,
    pub detail: String,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}: {}", self.position, self.kind, self.detail)
    }
}

impl std::error::Error for LexerError {}

/// Lexes `source` (already known to be the content of `file`) into a frozen
/// [`TokenList`]. Returns at the first error — the lexer does not attempt
/// recovery (spec.md §7 "Lexer errors are not recoverable").
pub fn lex(file: FilePath, source: &str) -> Result<TokenList, LexerError> {
    let mut chars: Vec<char> = source.chars().collect();
    // "A trailing newline is appended logically so that EOF never occurs
    // mid-state-terminator check" (spec.md §4.2).
    if chars.last() != Some(&'\n') {
        chars.push('\n');
    }

    let mut tokens = TokenList::new();
    let mut i = 0usize;
    let mut pos = SourcePosition::start_of(file);

    while i < chars.len() {
        let c = chars[i];
        let start_pos = pos.clone();

        // Step 1: two-character comment openers take priority over the
        // operator table (so `//` never lexes as Operator::DoubleSlash).
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            let mut j = i + 2;
            while chars.get(j).is_some_and(|c| *c != '\n') {
                j += 1;
            }
            let text: String = chars[i..j].iter().collect();
            tokens.push(Token::new(TokenKind::SingleLineComment(text), start_pos)).ok();
            pos = advance_by(pos, j - i);
            i = j;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let mut j = i + 2;
            loop {
                if chars.get(j).is_none() {
                    return Err(LexerError {
                        kind: LexerErrorKind::UnexpectedEof,
                        position: start_pos,
                        detail: "unterminated block comment".to_string(),
                    });
                }
                if chars[j] == '*' && chars.get(j + 1) == Some(&'/') {
                    j += 2;
                    break;
                }
                j += 1;
            }
            let text: String = chars[i..j].iter().collect();
            let newlines = text.matches('\n').count() as u32;
            tokens.push(Token::new(TokenKind::MultiLineComment(text), start_pos)).ok();
            pos = advance_multiline(pos, j - i, newlines, &chars[i..j]);
            i = j;
            continue;
        }

        // Step 2: operators, longest-first, no backtracking once committed.
        if let Some((lexeme, op)) = match_longest(&chars, i, OPERATORS) {
            tokens.push(Token::new(TokenKind::Operator(op), start_pos)).ok();
            let len = lexeme.chars().count();
            pos = advance_by(pos, len);
            i += len;
            continue;
        }

        // Step 3: punctuators, `::` before `:`.
        if let Some((lexeme, p)) = match_longest(&chars, i, PUNCTUATORS) {
            tokens.push(Token::new(TokenKind::Punctuator(p), start_pos)).ok();
            let len = lexeme.chars().count();
            pos = advance_by(pos, len);
            i += len;
            continue;
        }

        // Step 4: string opener.
        if c == '"' || c == '\'' {
            match string_lit::scan_string(&chars, i) {
                Ok((bytes, consumed)) => {
                    tokens
                        .push(Token::new(
                            TokenKind::StringLiteral { bytes, single_quoted: c == '\'' },
                            start_pos,
                        ))
                        .ok();
                    pos = advance_by(pos, consumed);
                    i += consumed;
                }
                Err(StringError::Unterminated) => {
                    return Err(LexerError {
                        kind: LexerErrorKind::InvalidLiteral,
                        position: start_pos,
                        detail: "unterminated string literal".to_string(),
                    });
                }
            }
            continue;
        }

        // Steps 5-6: keyword (only if followed by a non-identifier char) or
        // identifier, and the word-shaped operators `new`/`delete`.
        if is_identifier_start(c) {
            let mut j = i + 1;
            while chars.get(j).is_some_and(|c| is_identifier_continue(*c)) {
                j += 1;
            }
            let text: String = chars[i..j].iter().collect();
            let kind = if let Some((_, op)) = WORD_OPERATORS.iter().find(|(w, _)| *w == text.as_str()) {
                TokenKind::Operator(*op)
            } else if let Some(kw) = Keyword::from_str(&text) {
                TokenKind::Keyword(kw)
            } else {
                TokenKind::Identifier(text)
            };
            tokens.push(Token::new(kind, start_pos)).ok();
            pos = advance_by(pos, j - i);
            i = j;
            continue;
        }

        // Step 7: digit start.
        if c.is_ascii_digit() {
            match number::scan_number(&chars, i) {
                Ok((NumberLiteral::Integer { value, radix }, consumed)) => {
                    tokens.push(Token::new(TokenKind::IntegerLiteral { value, radix }, start_pos)).ok();
                    pos = advance_by(pos, consumed);
                    i += consumed;
                }
                Ok((NumberLiteral::Float(value), consumed)) => {
                    tokens.push(Token::new(TokenKind::FloatLiteral(value), start_pos)).ok();
                    pos = advance_by(pos, consumed);
                    i += consumed;
                }
                Err(err) => {
                    let detail = match err {
                        NumberError::Malformed(m) => m,
                        NumberError::Overflow => "integer literal overflows 64 bits".to_string(),
                    };
                    return Err(LexerError { kind: LexerErrorKind::InvalidLiteral, position: start_pos, detail });
                }
            }
            continue;
        }

        // Step 8: ASCII whitespace.
        if c.is_ascii_whitespace() {
            let mut j = i;
            while chars.get(j).is_some_and(|c| c.is_ascii_whitespace()) {
                j += 1;
            }
            let text: String = chars[i..j].iter().collect();
            let newlines = text.matches('\n').count() as u32;
            tokens.push(Token::new(TokenKind::Whitespace(text.clone()), start_pos)).ok();
            pos = advance_multiline(pos, j - i, newlines, &chars[i..j]);
            i = j;
            continue;
        }

        // Step 9: nothing matched.
        return Err(LexerError {
            kind: LexerErrorKind::UnexpectedToken,
            position: start_pos,
            detail: format!("unexpected character '{c}'"),
        });
    }

    tokens.freeze();
    Ok(tokens)
}

fn match_longest<'a, T: Copy>(chars: &[char], i: usize, table: &[(&'a str, T)]) -> Option<(&'a str, T)> {
    for (lexeme, value) in table {
        let lexeme_chars: Vec<char> = lexeme.chars().collect();
        if i + lexeme_chars.len() <= chars.len() && chars[i..i + lexeme_chars.len()] == lexeme_chars[..] {
            return Some((lexeme, *value));
        }
    }
    None
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Advances a position by `n` chars known to contain no newlines.
fn advance_by(mut pos: SourcePosition, n: usize) -> SourcePosition {
    for _ in 0..n {
        pos = pos.advance();
    }
    pos
}

/// Advances a position by `n` chars, `newline_count` of which are `'\n'`.
/// Used for comments and whitespace runs, which may span lines.
fn advance_multiline(mut pos: SourcePosition, _n: usize, newline_count: u32, chars: &[char]) -> SourcePosition {
    if newline_count == 0 {
        return advance_by(pos, chars.len());
    }
    for &c in chars {
        pos = if c == '\n' { pos.newline() } else { pos.advance() };
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn lex_str(src: &str) -> TokenList {
        lex(Arc::from("unit.j"), src).expect("lex should succeed")
    }

    fn significant_kinds(list: &TokenList) -> Vec<TokenKind> {
        list.significant().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn empty_source_yields_empty_significant_tokens() {
        let list = lex_str("");
        assert_eq!(list.significant().count(), 0);
    }

    #[test]
    fn maximal_munch_prefers_longest_operator() {
        let list = lex_str(">>>=");
        let kinds = significant_kinds(&list);
        assert_eq!(kinds, vec![TokenKind::Operator(Operator::ShiftRightAssign3)]);
    }

    #[test]
    fn keyword_does_not_eat_identifier_prefix() {
        let list = lex_str("intN");
        let kinds = significant_kinds(&list);
        assert_eq!(kinds, vec![TokenKind::Identifier("intN".to_string())]);
    }

    #[test]
    fn exact_keyword_is_recognized() {
        let list = lex_str("int");
        assert_eq!(significant_kinds(&list), vec![TokenKind::Keyword(Keyword::Int)]);
    }

    #[test]
    fn double_colon_before_single_colon() {
        let list = lex_str("a::b");
        let kinds = significant_kinds(&list);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Punctuator(Punctuator::ColonColon),
                TokenKind::Identifier("b".to_string()),
            ]
        );
    }

    #[test]
    fn word_operators_are_recognized() {
        let list = lex_str("new delete");
        let kinds = significant_kinds(&list);
        assert_eq!(kinds, vec![TokenKind::Operator(Operator::New), TokenKind::Operator(Operator::Delete)]);
    }

    #[test]
    fn line_comment_stops_before_newline() {
        let list = lex_str("// hi\nint x;");
        match &list.as_slice()[0].kind {
            TokenKind::SingleLineComment(text) => assert_eq!(text, "// hi"),
            other => panic!("expected comment, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_block_comment_errors() {
        let err = lex(Arc::from("a.j"), "/* never closes").unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::UnexpectedEof);
    }

    #[test]
    fn malformed_hex_literal_errors_at_literal_start() {
        // scenario F: `0xG1` — the digit run after `0x` is empty, so the
        // error points at the start of the literal.
        let err = lex(Arc::from("a.j"), "0xG1").unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::InvalidLiteral);
        assert_eq!(err.position.column, 1);
    }

    #[test]
    fn positions_are_non_decreasing() {
        let list = lex_str("struct A {\n  int a;\n}\n");
        assert!(list.positions_non_decreasing());
    }

    #[test]
    fn comment_preserves_original_position_across_lines() {
        let list = lex_str("int a;\n/* c\nc */\nint b;");
        let comment = list.as_slice().iter().find(|t| matches!(t.kind, TokenKind::MultiLineComment(_))).unwrap();
        assert_eq!(comment.position.line, 2);
        let after = list.significant().find(|t| matches!(&t.kind, TokenKind::Identifier(n) if n == "b")).unwrap();
        assert_eq!(after.position.line, 4);
    }

    #[test]
    fn unexpected_character_is_reported() {
        let err = lex(Arc::from("a.j"), "int a = $;").unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::UnexpectedToken);
    }

    #[test]
    fn string_literal_escape_expansion() {
        let list = lex_str(r#""a\nb""#);
        match &list.as_slice()[0].kind {
            TokenKind::StringLiteral { bytes, single_quoted } => {
                assert_eq!(bytes, b"a\nb");
                assert!(!single_quoted);
            }
            other => panic!("expected string literal, got {other:?}"),
        }
    }
}
