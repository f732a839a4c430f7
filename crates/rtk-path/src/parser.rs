// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive-descent parser for the JSONPath subset (§4.2).

use rtk_error::{ErrorCode, RtkError};

/// One step in a compiled path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or `['name']`.
    Child(String),
    /// `[n]`, negative counts from the tail.
    Index(i64),
    /// `[start:end]`, either bound may be absent.
    Slice(Option<i64>, Option<i64>),
    /// `[*]` or `.*`.
    Wildcard,
    /// `..name`.
    RecursiveDescent(String),
    /// `[?( ... )]`.
    Filter(FilterExpr),
}

/// A literal appearing on the right-hand side of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterLiteral {
    /// Single-quoted string literal.
    Text(String),
    /// Bare numeric literal.
    Number(f64),
    /// `true`/`false`.
    Bool(bool),
    /// `null`.
    Null,
}

/// A comparison operator recognised inside `[?( ... )]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Boolean expression tree for a filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `@.field OP literal`.
    Compare {
        /// Dotted field path relative to `@`, e.g. `["a", "b"]` for `@.a.b`.
        field: Vec<String>,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand literal.
        literal: FilterLiteral,
    },
    /// `lhs && rhs`.
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// `lhs || rhs`.
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

/// Parses `path` into a sequence of [`Segment`]s.
///
/// The path must start with `$`; a bare `$` parses to an empty segment
/// list (identity on the root).
pub fn parse(path: &str) -> Result<Vec<Segment>, RtkError> {
    let mut p = Parser::new(path);
    p.expect_char('$')?;
    let mut segments = Vec::new();
    while !p.at_end() {
        segments.push(p.parse_segment()?);
    }
    Ok(segments)
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn err(&self, reason: impl Into<String>) -> RtkError {
        RtkError::new(
            ErrorCode::InvalidPath,
            format!("invalid path `{}`: {}", self.src, reason.into()),
        )
    }

    fn expect_char(&mut self, want: char) -> Result<(), RtkError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.err(format!("expected `{want}`, found `{c}`"))),
            None => Err(self.err(format!("expected `{want}`, found end of input"))),
        }
    }

    fn parse_segment(&mut self) -> Result<Segment, RtkError> {
        match self.peek() {
            Some('.') => {
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    let name = self.parse_ident()?;
                    Ok(Segment::RecursiveDescent(name))
                } else if self.peek() == Some('*') {
                    self.bump();
                    Ok(Segment::Wildcard)
                } else {
                    let name = self.parse_ident()?;
                    Ok(Segment::Child(name))
                }
            }
            Some('[') => self.parse_bracket(),
            Some(c) => Err(self.err(format!("unexpected character `{c}`"))),
            None => Err(self.err("unexpected end of input")),
        }
    }

    fn parse_ident(&mut self) -> Result<String, RtkError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.err("expected a field name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_bracket(&mut self) -> Result<Segment, RtkError> {
        self.expect_char('[')?;
        let segment = match self.peek() {
            Some('\'') | Some('"') => {
                let name = self.parse_quoted()?;
                Segment::Child(name)
            }
            Some('*') => {
                self.bump();
                Segment::Wildcard
            }
            Some('?') => {
                self.bump();
                self.skip_ws();
                self.expect_char('(')?;
                let expr = self.parse_or()?;
                self.skip_ws();
                self.expect_char(')')?;
                Segment::Filter(expr)
            }
            _ => self.parse_index_or_slice()?,
        };
        self.expect_char(']')?;
        Ok(segment)
    }

    fn parse_quoted(&mut self) -> Result<String, RtkError> {
        let quote = self.bump().expect("checked by caller");
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.pos += 1;
        }
        if self.peek() != Some(quote) {
            return Err(self.err("unterminated quoted name"));
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        self.bump();
        Ok(name)
    }

    fn parse_index_or_slice(&mut self) -> Result<Segment, RtkError> {
        let first = self.parse_opt_int()?;
        if self.peek() == Some(':') {
            self.bump();
            let second = self.parse_opt_int()?;
            Ok(Segment::Slice(first, second))
        } else {
            match first {
                Some(n) => Ok(Segment::Index(n)),
                None => Err(self.err("expected an index, slice, or wildcard")),
            }
        }
    }

    fn parse_opt_int(&mut self) -> Result<Option<i64>, RtkError> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start || (self.pos == start + 1 && self.chars[start] == '-') {
            return Ok(None);
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| self.err("invalid integer"))
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    // filter grammar: or := and ('||' and)*; and := primary ('&&' primary)*
    fn parse_or(&mut self) -> Result<FilterExpr, RtkError> {
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('|') && self.chars.get(self.pos + 1) == Some(&'|') {
                self.pos += 2;
                let rhs = self.parse_and()?;
                lhs = FilterExpr::Or(Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, RtkError> {
        let mut lhs = self.parse_filter_primary()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('&') && self.chars.get(self.pos + 1) == Some(&'&') {
                self.pos += 2;
                let rhs = self.parse_filter_primary()?;
                lhs = FilterExpr::And(Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_filter_primary(&mut self) -> Result<FilterExpr, RtkError> {
        self.skip_ws();
        if self.peek() == Some('(') {
            self.bump();
            let inner = self.parse_or()?;
            self.skip_ws();
            self.expect_char(')')?;
            return Ok(inner);
        }
        self.skip_ws();
        self.expect_char('@')?;
        let mut field = Vec::new();
        while self.peek() == Some('.') {
            self.bump();
            field.push(self.parse_ident()?);
        }
        if field.is_empty() {
            return Err(self.err("expected `@.field` in filter"));
        }
        self.skip_ws();
        let op = self.parse_compare_op()?;
        self.skip_ws();
        let literal = self.parse_literal()?;
        Ok(FilterExpr::Compare { field, op, literal })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, RtkError> {
        let two: String = self.chars[self.pos..(self.pos + 2).min(self.chars.len())]
            .iter()
            .collect();
        match two.as_str() {
            "==" => {
                self.pos += 2;
                Ok(CompareOp::Eq)
            }
            "!=" => {
                self.pos += 2;
                Ok(CompareOp::Ne)
            }
            "<=" => {
                self.pos += 2;
                Ok(CompareOp::Le)
            }
            ">=" => {
                self.pos += 2;
                Ok(CompareOp::Ge)
            }
            _ => match self.peek() {
                Some('<') => {
                    self.pos += 1;
                    Ok(CompareOp::Lt)
                }
                Some('>') => {
                    self.pos += 1;
                    Ok(CompareOp::Gt)
                }
                _ => Err(self.err("expected a comparison operator")),
            },
        }
    }

    fn parse_literal(&mut self) -> Result<FilterLiteral, RtkError> {
        match self.peek() {
            Some('\'') => {
                let text = self.parse_quoted()?;
                Ok(FilterLiteral::Text(text))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                if self.peek() == Some('-') {
                    self.pos += 1;
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse::<f64>()
                    .map(FilterLiteral::Number)
                    .map_err(|_| self.err("invalid numeric literal"))
            }
            _ => {
                let ident = self.parse_ident()?;
                match ident.as_str() {
                    "true" => Ok(FilterLiteral::Bool(true)),
                    "false" => Ok(FilterLiteral::Bool(false)),
                    "null" => Ok(FilterLiteral::Null),
                    other => Err(self.err(format!("unrecognised literal `{other}`"))),
                }
            }
        }
    }
}
