//! The closed operator set, longest-lexeme-first (spec.md §6).
//!
//! [`OPERATORS`] is consulted by the lexer's maximal-munch step in lexeme
//! order, so a 4-character operator is always tried before any of its
//! prefixes. `new`/`delete` are word-shaped but are operators, not
//! identifiers or keywords — the lexer special-cases them after scanning an
//! identifier-shaped run (spec.md §6 "Word operators").

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    ShiftRightAssign3, // >>>=
    XorXorAssign,      // ^^=
    OrOrAssign,        // ||=
    AndAndAssign,      // &&=
    ShlAssign,         // <<=
    ShrAssign,         // >>=
    AddAssign,         // +=
    SubAssign,         // -=
    MulAssign,         // *=
    DivAssign,         // /=
    ModAssign,         // %=
    OrAssign,          // |=
    AndAssign,         // &=
    XorAssign,         // ^=
    Shl,               // <<
    Shr,               // >>
    Eq,                // ==
    Ne,                // !=
    AndAnd,            // &&
    OrOr,              // ||
    XorXor,            // ^^
    Le,                // <=
    Ge,                // >=
    Coalesce,          // ??
    DoubleSlash,       // //  (note: lexer tries the comment opener first)
    Increment,         // ++
    Decrement,         // --
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Not,
    Tilde,
    Lt,
    Gt,
    Assign,
    At,
    Question,
    Hash,
    Dot,
    Comma,
    New,
    Delete,
}

/// (lexeme, operator), ordered longest-first. The lexer's maximal-munch
/// step walks this in order and commits to the first match.
pub const OPERATORS: &[(&str, Operator)] = &[
    (">>>=", Operator::ShiftRightAssign3),
    ("^^=", Operator::XorXorAssign),
    ("||=", Operator::OrOrAssign),
    ("&&=", Operator::AndAndAssign),
    ("<<=", Operator::ShlAssign),
    (">>=", Operator::ShrAssign),
    ("+=", Operator::AddAssign),
    ("-=", Operator::SubAssign),
    ("*=", Operator::MulAssign),
    ("/=", Operator::DivAssign),
    ("%=", Operator::ModAssign),
    ("|=", Operator::OrAssign),
    ("&=", Operator::AndAssign),
    ("^=", Operator::XorAssign),
    ("<<", Operator::Shl),
    (">>", Operator::Shr),
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("&&", Operator::AndAnd),
    ("||", Operator::OrOr),
    ("^^", Operator::XorXor),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("??", Operator::Coalesce),
    ("//", Operator::DoubleSlash),
    ("++", Operator::Increment),
    ("--", Operator::Decrement),
    ("+", Operator::Add),
    ("-", Operator::Sub),
    ("*", Operator::Mul),
    ("/", Operator::Div),
    ("%", Operator::Mod),
    ("&", Operator::And),
    ("|", Operator::Or),
    ("^", Operator::Xor),
    ("~", Operator::Tilde),
    ("!", Operator::Not),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("=", Operator::Assign),
    ("@", Operator::At),
    ("?", Operator::Question),
    ("#", Operator::Hash),
    (".", Operator::Dot),
    (",", Operator::Comma),
];

/// Word-shaped operators. Checked only when an identifier-shaped run is not
/// a keyword.
pub const WORD_OPERATORS: &[(&str, Operator)] = &[("new", Operator::New), ("delete", Operator::Delete)];

impl Operator {
    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .chain(WORD_OPERATORS)
            .find(|(_, op)| *op == self)
            .map(|(lexeme, _)| *lexeme)
            .unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punctuator {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    ColonColon,
    Colon,
}

/// Longest-first: `::` must be tried before `:`.
pub const PUNCTUATORS: &[(&str, Punctuator)] = &[
    ("::", Punctuator::ColonColon),
    ("(", Punctuator::LParen),
    (")", Punctuator::RParen),
    ("{", Punctuator::LBrace),
    ("}", Punctuator::RBrace),
    ("[", Punctuator::LBracket),
    ("]", Punctuator::RBracket),
    (";", Punctuator::Semicolon),
    (",", Punctuator::Comma),
    (":", Punctuator::Colon),
];

impl Punctuator {
    pub fn as_str(self) -> &'static str {
        PUNCTUATORS.iter().find(|(_, p)| *p == self).map(|(lexeme, _)| *lexeme).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_are_ordered_longest_first() {
        let mut lengths: Vec<usize> = OPERATORS.iter().map(|(lexeme, _)| lexeme.len()).collect();
        let sorted = {
            let mut s = lengths.clone();
            s.sort_by(|a, b| b.cmp(a));
            s
        };
        // Not strictly required to be fully sorted length-descending across
        // same-length groups, but no shorter lexeme may precede a longer one
        // that it is a prefix of.
        for (i, (lexeme, _)) in OPERATORS.iter().enumerate() {
            for (other, _) in &OPERATORS[..i] {
                assert!(
                    !other.starts_with(lexeme) || other.len() <= lexeme.len(),
                    "{other} (earlier) should not be a longer match containing {lexeme} (later)"
                );
            }
        }
        lengths.sort_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn punctuators_try_double_colon_before_colon() {
        let idx_double = PUNCTUATORS.iter().position(|(l, _)| *l == "::").unwrap();
        let idx_single = PUNCTUATORS.iter().position(|(l, _)| *l == ":").unwrap();
        assert!(idx_double < idx_single);
    }

    #[test]
    fn word_operators_are_not_in_the_symbol_table() {
        assert!(OPERATORS.iter().all(|(l, _)| *l != "new" && *l != "delete"));
    }
}
