//! Recursive-descent parser implementing the Pratt precedence table from the
//! FHIRPath grammar: `.` binds tightest, `implies` loosest.
//!
//! ```text
//! implies > xor/or > and > in/contains > equality > comparison
//!         > union(|) > is/as > additive(+ - &) > multiplicative(* / div mod)
//!         > unary(+ -) > postfix(. [] ()) > primary
//! ```

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ast::{
    ArithmeticOp, AstNode, BooleanOp, ComparisonOp, EqualityOp, Literal, MembershipOp, Symbol,
    TypeOp, UnaryOp,
};
use crate::error::{Error, Result};
use crate::token::{Keyword, Token, TokenKind};

pub fn parse(source: &str) -> Result<AstNode> {
    let tokens: Vec<Token> = crate::lexer::tokenize(source)?
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Comment(_)))
        .collect();
    let mut parser = Parser { source, tokens, pos: 0 };
    let node = parser.parse_expression()?;
    parser.expect(TokenKind::Eof)?;
    Ok(node)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn err(&self, message: impl Into<String>) -> Error {
        Error::parse(self.source, message)
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn expect(&mut self, expected: TokenKind) -> Result<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {expected:?}, found {:?}", self.peek())))
        }
    }

    fn parse_expression(&mut self) -> Result<AstNode> {
        self.parse_implies()
    }

    fn parse_implies(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_xor_or()?;
        while *self.peek() == TokenKind::Keyword(Keyword::Implies) {
            self.advance();
            let rhs = self.parse_xor_or()?;
            lhs = AstNode::Boolean { op: BooleanOp::Implies, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_xor_or(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_and()?;
        loop {
            let op = match self.peek() {
                TokenKind::Keyword(Keyword::Or) => BooleanOp::Or,
                TokenKind::Keyword(Keyword::Xor) => BooleanOp::Xor,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_and()?;
            lhs = AstNode::Boolean { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_in_contains()?;
        while *self.peek() == TokenKind::Keyword(Keyword::And) {
            self.advance();
            let rhs = self.parse_in_contains()?;
            lhs = AstNode::Boolean { op: BooleanOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_in_contains(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_equality()?;
        loop {
            let op = match self.peek() {
                TokenKind::Keyword(Keyword::In) => MembershipOp::In,
                TokenKind::Keyword(Keyword::Contains) => MembershipOp::Contains,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = AstNode::Membership { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => EqualityOp::Equal,
                TokenKind::NotEq => EqualityOp::NotEqual,
                TokenKind::Equivalent => EqualityOp::Equivalent,
                TokenKind::NotEquivalent => EqualityOp::NotEquivalent,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = AstNode::Equality { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_union()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => ComparisonOp::Lt,
                TokenKind::LtEq => ComparisonOp::LtEq,
                TokenKind::Gt => ComparisonOp::Gt,
                TokenKind::GtEq => ComparisonOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_union()?;
            lhs = AstNode::Comparison { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_union(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_is_as()?;
        while *self.peek() == TokenKind::Pipe {
            self.advance();
            let rhs = self.parse_is_as()?;
            lhs = AstNode::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_is_as(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Keyword(Keyword::Is) => TypeOp::Is,
                TokenKind::Keyword(Keyword::As) => TypeOp::As,
                _ => break,
            };
            self.advance();
            let type_name = self.parse_type_name()?;
            lhs = AstNode::TypeOp { op, operand: Box::new(lhs), type_name };
        }
        Ok(lhs)
    }

    fn parse_type_name(&mut self) -> Result<String> {
        let mut parts = vec![self.parse_identifier_text()?];
        while *self.peek() == TokenKind::Dot {
            self.advance();
            parts.push(self.parse_identifier_text()?);
        }
        Ok(parts.join("."))
    }

    fn parse_identifier_text(&mut self) -> Result<String> {
        match self.advance() {
            TokenKind::Symbol(name) => Ok(name),
            TokenKind::DelimitedSymbol(name) => Ok(name),
            other => Err(self.err(format!("expected identifier, found {other:?}"))),
        }
    }

    fn parse_additive(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => ArithmeticOp::Add,
                TokenKind::Minus => ArithmeticOp::Sub,
                TokenKind::Ampersand => ArithmeticOp::Concat,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = AstNode::Arithmetic { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<AstNode> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => ArithmeticOp::Mul,
                TokenKind::Slash => ArithmeticOp::Div,
                TokenKind::Keyword(Keyword::Div) => ArithmeticOp::IntDiv,
                TokenKind::Keyword(Keyword::Mod) => ArithmeticOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = AstNode::Arithmetic { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<AstNode> {
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(AstNode::Unary { op, operand: Box::new(operand) });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<AstNode> {
        let mut node = self.parse_term()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    node = AstNode::Dot(Box::new(node), Box::new(rhs));
                }
                TokenKind::OpenBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::CloseBracket)?;
                    node = AstNode::Indexer { target: Box::new(node), index: Box::new(index) };
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// A `term` is a primary that additionally recognizes `name(args)` as a
    /// function call — function calls are only legal where the preceding
    /// token sequence parses as a bare [`Symbol::Name`].
    fn parse_term(&mut self) -> Result<AstNode> {
        let primary = self.parse_primary()?;
        if let AstNode::Symbol(Symbol::Name(name)) = &primary {
            if *self.peek() == TokenKind::OpenParen {
                let name = name.clone();
                self.advance();
                let args = self.parse_args()?;
                return Ok(AstNode::FunctionCall { name, args });
            }
        }
        Ok(primary)
    }

    fn parse_args(&mut self) -> Result<Vec<AstNode>> {
        let mut args = Vec::new();
        if *self.peek() == TokenKind::CloseParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::CloseParen => {
                    self.advance();
                    break;
                }
                other => return Err(self.err(format!("expected ',' or ')', found {other:?}"))),
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<AstNode> {
        match self.advance() {
            TokenKind::Keyword(Keyword::True) => Ok(AstNode::Literal(Literal::Boolean(true))),
            TokenKind::Keyword(Keyword::False) => Ok(AstNode::Literal(Literal::Boolean(false))),
            TokenKind::Keyword(Keyword::This) => Ok(AstNode::Symbol(Symbol::This)),
            TokenKind::Keyword(Keyword::Index) => Ok(AstNode::Symbol(Symbol::Index)),
            TokenKind::Keyword(Keyword::Total) => Ok(AstNode::Symbol(Symbol::Total)),
            TokenKind::String(s) => Ok(AstNode::Literal(Literal::String(s))),
            TokenKind::DateTime(s) => Ok(AstNode::Literal(Literal::DateTime(s))),
            TokenKind::Number(n) => {
                if n.contains('.') {
                    let value = Decimal::from_str(&n)
                        .map_err(|e| self.err(format!("invalid decimal literal {n}: {e}")))?;
                    Ok(AstNode::Literal(Literal::Decimal(value)))
                } else {
                    let value = n
                        .parse::<i64>()
                        .map_err(|e| self.err(format!("invalid integer literal {n}: {e}")))?;
                    Ok(AstNode::Literal(Literal::Integer(value)))
                }
            }
            TokenKind::Quantity { number, unit } => {
                let value = Decimal::from_str(&number)
                    .map_err(|e| self.err(format!("invalid quantity value {number}: {e}")))?;
                Ok(AstNode::Literal(Literal::Quantity { value, unit }))
            }
            TokenKind::ExternalConstant(name) => Ok(AstNode::Symbol(Symbol::Variable(name))),
            TokenKind::Symbol(name) => Ok(AstNode::Symbol(Symbol::Name(name))),
            TokenKind::DelimitedSymbol(name) => Ok(AstNode::Symbol(Symbol::Name(name))),
            TokenKind::EmptySet => Ok(AstNode::EmptySet),
            TokenKind::OpenParen => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            other => Err(self.err(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    #[test]
    fn parses_dot_chain_left_associatively() {
        let ast = parse("Patient.name.given").unwrap();
        assert_eq!(
            ast,
            AstNode::Dot(
                Box::new(AstNode::Dot(
                    Box::new(AstNode::Symbol(Symbol::Name("Patient".into()))),
                    Box::new(AstNode::Symbol(Symbol::Name("name".into()))),
                )),
                Box::new(AstNode::Symbol(Symbol::Name("given".into()))),
            )
        );
    }

    #[test]
    fn function_call_only_valid_on_bare_symbol() {
        assert!(parse("name.where(use = 'official')").is_ok());
        assert!(parse("5()").is_err());
    }

    #[test]
    fn respects_precedence_of_equality_over_and() {
        // `a = 1 and b = 2` should parse as `(a = 1) and (b = 2)`, not
        // `a = (1 and b) = 2`.
        let ast = parse("a = 1 and b = 2").unwrap();
        match ast {
            AstNode::Boolean { op: BooleanOp::And, lhs, rhs } => {
                assert!(matches!(*lhs, AstNode::Equality { op: EqualityOp::Equal, .. }));
                assert!(matches!(*rhs, AstNode::Equality { op: EqualityOp::Equal, .. }));
            }
            other => panic!("expected top-level And, got {other:?}"),
        }
    }

    #[test]
    fn parses_is_with_dotted_type_name() {
        let ast = parse("value is System.String").unwrap();
        match ast {
            AstNode::TypeOp { op: TypeOp::Is, type_name, .. } => {
                assert_eq!(type_name, "System.String");
            }
            other => panic!("expected TypeOp, got {other:?}"),
        }
    }

    #[test]
    fn indexer_binds_tighter_than_dot_chain_rhs() {
        let ast = parse("name[0].family").unwrap();
        assert!(matches!(ast, AstNode::Dot(_, _)));
    }

    #[test]
    fn empty_set_literal_parses() {
        assert_eq!(parse("{}").unwrap(), AstNode::EmptySet);
    }
}
