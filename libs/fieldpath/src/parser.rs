//! Field-location parser - turns location strings into segment ASTs
//!
//! The grammar is the subset of JSONPath the immunization rules actually
//! use: dotted member access, numeric indexing, the `[*]` wildcard, and
//! string-equality filters of the form `[?(@.key=='value')]` where the key
//! itself may be dotted (`@.actor.type`).

use crate::ast::Segment;
use crate::error::{Error, Result};

/// The field-location parser
pub struct Parser {
    chars: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Parser {
    /// Create a new parser for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            chars,
            position: 0,
            current_char,
        }
    }

    /// Parse the input into a list of segments
    pub fn parse(mut self) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();

        loop {
            segments.push(Segment::Field(self.read_identifier()?));

            while self.current_char == Some('[') {
                segments.push(self.read_bracket()?);
            }

            match self.current_char {
                None => break,
                Some('.') => self.advance(),
                Some(c) => {
                    return Err(Error::ParseError(format!(
                        "unexpected character '{}' at position {}",
                        c, self.position
                    )));
                }
            }
        }

        Ok(segments)
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Consume an expected character or fail
    fn expect(&mut self, expected: char) -> Result<()> {
        if self.current_char == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(Error::ParseError(format!(
                "expected '{}' at position {}",
                expected, self.position
            )))
        }
    }

    /// Consume an expected literal sequence or fail
    fn expect_literal(&mut self, literal: &str) -> Result<()> {
        for c in literal.chars() {
            self.expect(c)?;
        }
        Ok(())
    }

    /// Read an identifier: `[A-Za-z_][A-Za-z0-9_]*`
    fn read_identifier(&mut self) -> Result<String> {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        if self.position == start_pos {
            return Err(Error::ParseError(format!(
                "expected identifier at position {}",
                start_pos
            )));
        }

        Ok(self.chars[start_pos..self.position].iter().collect())
    }

    /// Read a bracket suffix: `[0]`, `[*]` or `[?(@.key=='value')]`
    fn read_bracket(&mut self) -> Result<Segment> {
        self.expect('[')?;

        let segment = match self.current_char {
            Some('*') => {
                self.advance();
                Segment::Wildcard
            }
            Some('?') => self.read_filter()?,
            Some(c) if c.is_ascii_digit() => Segment::Index(self.read_index()?),
            _ => {
                return Err(Error::ParseError(format!(
                    "expected index, '*' or filter at position {}",
                    self.position
                )));
            }
        };

        self.expect(']')?;
        Ok(segment)
    }

    /// Read a numeric index
    fn read_index(&mut self) -> Result<usize> {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let digits: String = self.chars[start_pos..self.position].iter().collect();
        digits
            .parse::<usize>()
            .map_err(|_| Error::ParseError(format!("invalid index '{}'", digits)))
    }

    /// Read a filter: `?(@.key=='value')`, key possibly dotted
    fn read_filter(&mut self) -> Result<Segment> {
        self.expect_literal("?(@.")?;

        let mut key = vec![self.read_identifier()?];
        while self.current_char == Some('.') {
            self.advance();
            key.push(self.read_identifier()?);
        }

        self.expect_literal("==")?;
        let value = self.read_quoted()?;
        self.expect(')')?;

        Ok(Segment::Filter { key, value })
    }

    /// Read a single-quoted string literal
    fn read_quoted(&mut self) -> Result<String> {
        self.expect('\'')?;

        let mut value = String::new();
        loop {
            match self.current_char {
                Some('\'') => {
                    self.advance();
                    return Ok(value);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return Err(Error::ParseError(
                        "unterminated string literal in filter".into(),
                    ));
                }
            }
        }
    }
}
