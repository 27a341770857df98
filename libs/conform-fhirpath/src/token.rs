//! Lexical token types produced by the tokenizer.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    String(String),
    Number(String),
    DateTime(String),
    Quantity { number: String, unit: Option<String> },
    Symbol(String),
    DelimitedSymbol(String),
    Keyword(Keyword),
    ExternalConstant(String),
    EmptySet, // `{}`
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Pipe,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    Equivalent,
    NotEquivalent,
    Comment(String),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    And,
    Or,
    Xor,
    Implies,
    Is,
    As,
    In,
    Contains,
    Div,
    Mod,
    This,
    Index,
    Total,
}

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        Some(match word {
            "true" => Keyword::True,
            "false" => Keyword::False,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "xor" => Keyword::Xor,
            "implies" => Keyword::Implies,
            "is" => Keyword::Is,
            "as" => Keyword::As,
            "in" => Keyword::In,
            "contains" => Keyword::Contains,
            "div" => Keyword::Div,
            "mod" => Keyword::Mod,
            _ => return None,
        })
    }
}

/// Calendar-duration keywords that, immediately following a numeric literal,
/// turn it into a `Quantity` token (`4 days`, as opposed to `4 'mg'`).
pub const CALENDAR_UNITS: &[&str] = &[
    "year", "years", "month", "months", "week", "weeks", "day", "days", "hour", "hours",
    "minute", "minutes", "second", "seconds", "millisecond", "milliseconds",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}
