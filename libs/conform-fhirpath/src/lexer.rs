//! Tokenizer for FHIRPath expressions.

use crate::error::{Error, Result};
use crate::token::{Keyword, Token, TokenKind, CALENDAR_UNITS};
use std::iter::Peekable;
use std::str::CharIndices;

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::parse(self.source, message)
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(&(pos, c)) = self.chars.peek() else {
                tokens.push(Token::new(TokenKind::Eof, self.source.len()));
                break;
            };

            let token = match c {
                '/' if self.is_comment_start() => self.lex_comment(pos)?,
                '\'' => self.lex_string(pos)?,
                '"' => self.lex_delimited_symbol(pos)?,
                '@' => self.lex_datetime(pos)?,
                '%' => self.lex_external_constant(pos)?,
                '$' => self.lex_special_variable(pos)?,
                '`' => self.lex_backtick_symbol(pos)?,
                c if c.is_ascii_digit() => self.lex_number(pos)?,
                c if is_ident_start(c) => self.lex_identifier(pos)?,
                _ => self.lex_operator(pos)?,
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn is_comment_start(&mut self) -> bool {
        let mut iter = self.chars.clone();
        iter.next();
        matches!(iter.peek(), Some((_, '/')) | Some((_, '*')))
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn lex_comment(&mut self, start: usize) -> Result<Token> {
        self.bump(); // '/'
        let (_, second) = self.bump().expect("checked by is_comment_start");
        if second == '/' {
            while let Some(&(_, c)) = self.chars.peek() {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
        } else {
            loop {
                match self.bump() {
                    None => return Err(self.err("unterminated block comment")),
                    Some((_, '*')) if self.peek_char() == Some('/') => {
                        self.bump();
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
        let end = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.source.len());
        Ok(Token::new(
            TokenKind::Comment(self.source[start..end].to_string()),
            start,
        ))
    }

    fn lex_string(&mut self, start: usize) -> Result<Token> {
        self.bump(); // opening quote
        let value = self.lex_quoted_body('\'')?;
        Ok(Token::new(TokenKind::String(value), start))
    }

    fn lex_delimited_symbol(&mut self, start: usize) -> Result<Token> {
        self.bump();
        let value = self.lex_quoted_body('"')?;
        Ok(Token::new(TokenKind::DelimitedSymbol(value), start))
    }

    fn lex_backtick_symbol(&mut self, start: usize) -> Result<Token> {
        self.bump();
        let value = self.lex_quoted_body('`')?;
        Ok(Token::new(TokenKind::DelimitedSymbol(value), start))
    }

    fn lex_quoted_body(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated quoted literal")),
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.bump() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, c)) if c == quote => out.push(quote),
                    Some((_, 'u')) => out.push(self.lex_unicode_escape()?),
                    Some((_, other)) => out.push(other),
                    None => return Err(self.err("unterminated escape sequence")),
                },
                Some((_, c)) => out.push(c),
            }
        }
        Ok(out)
    }

    fn lex_unicode_escape(&mut self) -> Result<char> {
        let mut hex = String::with_capacity(4);
        for _ in 0..4 {
            match self.bump() {
                Some((_, c)) => hex.push(c),
                None => return Err(self.err("unterminated unicode escape")),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.err(format!("invalid unicode escape \\u{hex}")))
    }

    fn lex_external_constant(&mut self, start: usize) -> Result<Token> {
        self.bump(); // '%'
        if self.peek_char() == Some('\'') {
            self.bump();
            let value = self.lex_quoted_body('\'')?;
            return Ok(Token::new(TokenKind::ExternalConstant(value), start));
        }
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.err("expected identifier after '%'"));
        }
        Ok(Token::new(TokenKind::ExternalConstant(name), start))
    }

    fn lex_special_variable(&mut self, start: usize) -> Result<Token> {
        self.bump(); // '$'
        let mut name = String::from("$");
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let keyword = match name.as_str() {
            "$this" => Keyword::This,
            "$index" => Keyword::Index,
            "$total" => Keyword::Total,
            other => return Err(self.err(format!("unknown special variable {other}"))),
        };
        Ok(Token::new(TokenKind::Keyword(keyword), start))
    }

    fn lex_datetime(&mut self, start: usize) -> Result<Token> {
        self.bump(); // '@'
        let mut value = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '.' | '+' | 'T' | 'Z') {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if value.is_empty() {
            return Err(self.err("expected date/time literal after '@'"));
        }
        Ok(Token::new(TokenKind::DateTime(value), start))
    }

    fn lex_number(&mut self, start: usize) -> Result<Token> {
        let mut number = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                number.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit()) {
                number.push('.');
                self.bump();
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        number.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }

        // A number directly followed by a quoted unit, or by a bare calendar
        // duration keyword, is a Quantity literal rather than a plain Number.
        self.skip_inline_space();
        if self.peek_char() == Some('\'') {
            self.bump();
            let unit = self.lex_quoted_body('\'')?;
            return Ok(Token::new(
                TokenKind::Quantity {
                    number,
                    unit: Some(unit),
                },
                start,
            ));
        }
        if let Some(word) = self.peek_bare_word() {
            if CALENDAR_UNITS.contains(&word.as_str()) {
                for _ in 0..word.chars().count() {
                    self.bump();
                }
                return Ok(Token::new(
                    TokenKind::Quantity {
                        number,
                        unit: Some(word),
                    },
                    start,
                ));
            }
        }
        Ok(Token::new(TokenKind::Number(number), start))
    }

    fn skip_inline_space(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == ' ' || c == '\t' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn peek_bare_word(&self) -> Option<String> {
        let mut iter = self.chars.clone();
        let mut word = String::new();
        while let Some((_, c)) = iter.peek().copied() {
            if c.is_ascii_alphabetic() {
                word.push(c);
                iter.next();
            } else {
                break;
            }
        }
        if word.is_empty() {
            None
        } else {
            Some(word)
        }
    }

    fn lex_identifier(&mut self, start: usize) -> Result<Token> {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if let Some(keyword) = Keyword::lookup(&name) {
            return Ok(Token::new(TokenKind::Keyword(keyword), start));
        }
        Ok(Token::new(TokenKind::Symbol(name), start))
    }

    fn lex_operator(&mut self, start: usize) -> Result<Token> {
        let (_, c) = self.bump().unwrap();
        let kind = match c {
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '&' => TokenKind::Ampersand,
            '|' => TokenKind::Pipe,
            '~' => TokenKind::Equivalent,
            '{' => {
                if self.peek_char() == Some('}') {
                    self.bump();
                    TokenKind::EmptySet
                } else {
                    return Err(self.err("expected '}' to close empty set literal"));
                }
            }
            '<' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '=' => TokenKind::Eq,
            '!' => match self.bump() {
                Some((_, '=')) => TokenKind::NotEq,
                Some((_, '~')) => TokenKind::NotEquivalent,
                _ => return Err(self.err("expected '=' or '~' after '!'")),
            },
            other => return Err(self.err(format!("unexpected character '{other}'"))),
        };
        Ok(Token::new(kind, start))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_string_number_datetime_quantity() {
        let tokens = tokenize("'hi' 5 @2020-01-01 5 'mg'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("hi".to_string()));
        assert_eq!(tokens[1].kind, TokenKind::Number("5".to_string()));
        assert_eq!(tokens[2].kind, TokenKind::DateTime("2020-01-01".to_string()));
        assert_eq!(
            tokens[3].kind,
            TokenKind::Quantity {
                number: "5".to_string(),
                unit: Some("mg".to_string())
            }
        );
    }

    #[test]
    fn tokenizes_calendar_duration_quantity() {
        let tokens = tokenize("4 days").unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::Quantity {
                number: "4".to_string(),
                unit: Some("days".to_string())
            }
        );
    }

    #[test]
    fn tokenizes_operators_and_keywords() {
        let tokens = tokenize("a.b = c and d").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].kind, TokenKind::Symbol("b".to_string()));
        assert_eq!(tokens[3].kind, TokenKind::Eq);
        assert_eq!(tokens[5].kind, TokenKind::Keyword(Keyword::And));
    }

    #[test]
    fn preserves_comments_as_tokens() {
        let tokens = tokenize("1 // trailing\n+ 2").unwrap();
        assert!(matches!(tokens[1].kind, TokenKind::Comment(_)));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize("'unterminated").is_err());
    }
}
