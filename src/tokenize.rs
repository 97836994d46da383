// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Translating a character stream to a token stream. Strings,
//! characters, binary blobs and identifiers come out complete, while
//! numbers are only split into digit runs: fractions, dates, times
//! and timespans are put together from several tokens by the parser
//! (see [literal](../literal/index.html)).
//!
//! `next_token` and `peek_token` pull one token at a time; at most
//! one token is held back by `peek_token`, and below that at most one
//! character.

use crate::buffered_chars::buffered_chars;
use crate::context::{Context, FileContext, StringContext};
use crate::number::Suffix;
use crate::pos::Pos;
use crate::settings::Format;
use kstring::KString;
use thiserror::Error;
use unicode_general_category::{get_general_category, GeneralCategory};
use std::fmt::Write;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("IO error ({0})")]
    IOError(anyhow::Error),
    #[error("invalid character {0:?} ({1})")]
    UnexpectedChar(char, u32),
    #[error("unexpected suffix '{0}' after number")]
    UnexpectedSuffix(KString),
    #[error("missing delimiter '{0}'")]
    MissingDelimiter(char),
    #[error("read past the end of input")]
    Exhausted,
}

#[derive(Error, Debug)]
#[error("{err} {pos}")]
pub struct TokenizeErrorWithPos {
    pub err: TokenizeError,
    pub pos: Pos
}

impl TokenizeError {
    pub fn unexpected_char(c: char) -> Self {
        TokenizeError::UnexpectedChar(c, u32::from(c))
    }

    pub fn at(self, p: Pos) -> TokenizeErrorWithPos {
        TokenizeErrorWithPos {
            err: self,
            pos: p
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eof,
    Identifier(KString),
    /// Digits without suffix
    Number(KString),
    /// Digits of a number suffixed `l`
    Long(KString),
    /// Digits of a number suffixed `f`
    Float(KString),
    /// Digits of a number suffixed `d`, not followed by ':'
    Double(KString),
    /// Digits of a number suffixed `bd`
    Decimal(KString),
    /// Digits directly followed by '/'
    DatePart(KString),
    /// Digits directly followed by ':'
    TimePart(KString),
    /// Digits suffixed `d` and directly followed by ':'
    DaysPrefix(KString),
    Bool(bool),
    Null,
    String(KString),
    Char(char),
    /// Only the base64 characters between the brackets
    Binary(KString),
    /// One of `- : . / { } = ;` or a line break (always '\n')
    Punct(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Token::Eof => f.write_str("end of input"),
            Token::Identifier(s) => f.write_str(s),
            Token::Number(s) | Token::DatePart(s) | Token::TimePart(s) =>
                f.write_str(s),
            Token::Long(s) => f.write_fmt(format_args!("{}L", s)),
            Token::Float(s) => f.write_fmt(format_args!("{}f", s)),
            Token::Double(s) | Token::DaysPrefix(s) =>
                f.write_fmt(format_args!("{}d", s)),
            Token::Decimal(s) => f.write_fmt(format_args!("{}bd", s)),
            Token::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Token::Null => f.write_str("null"),
            Token::String(s) => f.write_fmt(format_args!("{:?}", s.as_str())),
            Token::Char(c) => f.write_fmt(format_args!("{:?}", c)),
            Token::Binary(s) => f.write_fmt(format_args!("[{}]", s)),
            Token::Punct(c) => {
                f.write_char('\'')?;
                for e in c.escape_debug() {
                    f.write_char(e)?;
                }
                f.write_char('\'')
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPos {
    pub token: Token,
    /// Position of the first character
    pub pos: Pos,
    /// Position right after the last character
    pub end: Pos,
}


fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic()
        || matches!(get_general_category(c),
                    GeneralCategory::ConnectorPunctuation
                    | GeneralCategory::CurrencySymbol)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphabetic()
        || matches!(get_general_category(c),
                    GeneralCategory::DecimalNumber
                    | GeneralCategory::ConnectorPunctuation
                    | GeneralCategory::CurrencySymbol
                    | GeneralCategory::LetterNumber
                    | GeneralCategory::SpacingMark
                    | GeneralCategory::NonspacingMark)
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='
}

fn is_inline_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

fn unescape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '"' => Some('"'),
        '\'' => Some('\''),
        '\\' => Some('\\'),
        _ => None
    }
}


/// The character layer below the tokens: one character of lookahead,
/// and the position of the next character.
struct Chars<'s> {
    inner: Box<dyn Iterator<Item = anyhow::Result<char>> + 's>,
    held: Option<char>,
    // `inner` must not be asked again after returning None
    exhausted: bool,
    pos: Pos,
    prev: Option<char>,
}

impl<'s> Chars<'s> {
    fn peek(&mut self) -> Result<Option<char>, TokenizeErrorWithPos> {
        if let Some(c) = self.held {
            return Ok(Some(c))
        }
        if self.exhausted {
            return Ok(None)
        }
        match self.inner.next() {
            None => {
                self.exhausted = true;
                Ok(None)
            }
            Some(Err(e)) => {
                self.exhausted = true;
                Err(TokenizeError::IOError(e).at(self.pos))
            }
            Some(Ok(c)) => {
                self.held = Some(c);
                Ok(Some(c))
            }
        }
    }

    fn consume(&mut self) {
        if let Some(c) = self.held.take() {
            self.pos = self.pos.after(c, self.prev);
            self.prev = Some(c);
        }
    }

    fn next(&mut self) -> Result<Option<char>, TokenizeErrorWithPos> {
        let c = self.peek()?;
        self.consume();
        Ok(c)
    }

    fn next_if(
        &mut self,
        accepted: impl Fn(char) -> bool
    ) -> Result<Option<char>, TokenizeErrorWithPos> {
        match self.peek()? {
            Some(c) if accepted(c) => {
                self.consume();
                Ok(Some(c))
            }
            _ => Ok(None)
        }
    }
}


pub struct Tokenizer<'s> {
    chars: Chars<'s>,
    context: Arc<dyn Context>,
    format: &'s Format,
    peeked: Option<TokenWithPos>,
    // the Eof token has been produced
    finished: bool,
}

impl<'s> Tokenizer<'s> {
    pub fn new(
        cs: impl Iterator<Item = anyhow::Result<char>> + 's,
        context: Arc<dyn Context>,
        format: &'s Format,
    ) -> Self {
        Tokenizer {
            chars: Chars {
                inner: Box::new(cs),
                held: None,
                exhausted: false,
                pos: Pos::START,
                prev: None,
            },
            context,
            format,
            peeked: None,
            finished: false,
        }
    }

    /// Tokenize an in-memory string, named `<string>` in errors.
    pub fn from_string(s: &'s str, format: &'s Format) -> Self {
        Tokenizer::new(s.chars().map(Ok),
                       Arc::new(StringContext::default()),
                       format)
    }

    /// Tokenize in-memory bytes, which must be valid UTF-8 as a
    /// whole.
    pub fn from_bytes(
        bs: &'s [u8],
        format: &'s Format
    ) -> Result<Self, TokenizeError> {
        match std::str::from_utf8(bs) {
            Ok(s) => Ok(Tokenizer::from_string(s, format)),
            Err(e) => Err(TokenizeError::IOError(anyhow::Error::new(e)))
        }
    }

    pub fn from_reader(
        fh: impl Read + 's,
        context: Arc<dyn Context>,
        format: &'s Format,
    ) -> Self {
        Tokenizer::new(buffered_chars(fh), context, format)
    }

    pub fn open(
        path: &Path,
        format: &'s Format
    ) -> Result<Self, std::io::Error> {
        let fh = std::fs::File::open(path)?;
        Ok(Tokenizer::from_reader(
            fh,
            Arc::new(FileContext { path: path.to_path_buf() }),
            format))
    }

    pub fn context(&self) -> &Arc<dyn Context> {
        &self.context
    }

    /// Consume and return the next token. After `Token::Eof` has been
    /// returned, this fails with `TokenizeError::Exhausted`.
    pub fn next_token(&mut self) -> Result<TokenWithPos, TokenizeErrorWithPos> {
        if let Some(t) = self.peeked.take() {
            return Ok(t)
        }
        self.scan()
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&TokenWithPos, TokenizeErrorWithPos> {
        let t = match self.peeked.take() {
            Some(t) => t,
            None => self.scan()?
        };
        Ok(self.peeked.insert(t))
    }

    fn scan(&mut self) -> Result<TokenWithPos, TokenizeErrorWithPos> {
        if self.finished {
            return Err(TokenizeError::Exhausted.at(self.chars.pos))
        }
        loop {
            let pos = self.chars.pos;
            let c = match self.chars.next()? {
                Some(c) => c,
                None => {
                    self.finished = true;
                    return Ok(TokenWithPos { token: Token::Eof, pos, end: pos })
                }
            };
            let token = match c {
                ' ' | '\t' => continue,
                '\r' => {
                    self.chars.next_if(|c| c == '\n')?;
                    Token::Punct('\n')
                }
                '\n' => Token::Punct('\n'),
                '#' => {
                    self.skip_line()?;
                    continue
                }
                '/' | '-' => {
                    // `//` and `--` comments
                    if self.chars.next_if(|c2| c2 == c)?.is_some() {
                        self.skip_line()?;
                        continue
                    }
                    Token::Punct(c)
                }
                '\\' => {
                    // Line continuation
                    match self.chars.next_if(is_line_break)? {
                        Some('\r') => {
                            self.chars.next_if(|c| c == '\n')?;
                            continue
                        }
                        Some(_) => continue,
                        None => return Err(TokenizeError::unexpected_char(c).at(pos))
                    }
                }
                ':' | '.' | '{' | '}' | '=' => Token::Punct(c),
                ';' if self.format.semicolon_separator => Token::Punct(c),
                '0'..='9' => self.read_number(c, pos)?,
                '[' => self.read_binary(pos)?,
                '"' => self.read_quoted(pos)?,
                '`' => self.read_backquoted(pos)?,
                '\'' => self.read_char(pos)?,
                _ if is_identifier_start(c) => self.read_identifier(c)?,
                _ => return Err(TokenizeError::unexpected_char(c).at(pos))
            };
            let t = TokenWithPos { token, pos, end: self.chars.pos };
            tracing::trace!(token = %t.token, pos = %t.pos, "token");
            return Ok(t)
        }
    }

    // Skip up to, but excluding, the line break
    fn skip_line(&mut self) -> Result<(), TokenizeErrorWithPos> {
        while self.chars.next_if(|c| ! is_line_break(c))?.is_some() {}
        Ok(())
    }

    fn read_number(
        &mut self,
        c: char,
        startpos: Pos
    ) -> Result<Token, TokenizeErrorWithPos> {
        let mut digits = String::new();
        digits.push(c);
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit())? {
            digits.push(c);
        }
        let mut suffix = String::new();
        while let Some(c) = self.chars.next_if(char::is_alphabetic)? {
            suffix.push(c);
        }
        let digits = KString::from_string(digits);
        let follower = self.chars.peek()?;
        match Suffix::try_from(suffix.as_str()) {
            Ok(Suffix::None) => Ok(match follower {
                Some('/') => Token::DatePart(digits),
                Some(':') => Token::TimePart(digits),
                _ => Token::Number(digits)
            }),
            Ok(Suffix::Long) => Ok(Token::Long(digits)),
            Ok(Suffix::Float) => Ok(Token::Float(digits)),
            Ok(Suffix::Double) => Ok(
                if follower == Some(':') {
                    Token::DaysPrefix(digits)
                } else {
                    Token::Double(digits)
                }),
            Ok(Suffix::Decimal) => Ok(Token::Decimal(digits)),
            Err(()) => Err(TokenizeError::UnexpectedSuffix(
                KString::from_string(suffix)).at(startpos))
        }
    }

    fn read_identifier(&mut self, c: char) -> Result<Token, TokenizeErrorWithPos> {
        let mut s = String::new();
        s.push(c);
        while let Some(c) = self.chars.next_if(is_identifier_char)? {
            s.push(c);
        }
        Ok(match s.as_str() {
            "true" | "on" => Token::Bool(true),
            "false" | "off" => Token::Bool(false),
            "null" => Token::Null,
            _ => Token::Identifier(KString::from_string(s))
        })
    }

    fn read_binary(&mut self, startpos: Pos) -> Result<Token, TokenizeErrorWithPos> {
        let mut s = String::new();
        loop {
            match self.chars.next()? {
                None => return Err(TokenizeError::MissingDelimiter(']').at(startpos)),
                Some(']') => return Ok(Token::Binary(KString::from_string(s))),
                Some(c) => {
                    if is_base64_char(c) {
                        s.push(c);
                    }
                }
            }
        }
    }

    fn read_quoted(&mut self, startpos: Pos) -> Result<Token, TokenizeErrorWithPos> {
        let missing = || TokenizeError::MissingDelimiter('"').at(startpos);
        let mut s = String::new();
        loop {
            match self.chars.next()? {
                None => return Err(missing()),
                Some('"') => return Ok(Token::String(KString::from_string(s))),
                Some(c) if is_line_break(c) => return Err(missing()),
                Some('\\') => {
                    match self.chars.next()? {
                        None => return Err(missing()),
                        Some(c) if is_line_break(c) => {
                            // Line continuation: keep the break, drop
                            // the indentation of the next line
                            if c == '\r' {
                                self.chars.next_if(|c| c == '\n')?;
                            }
                            s.push('\n');
                            while self.chars.next_if(is_inline_space)?.is_some() {}
                        }
                        Some(c) => {
                            if let Some(r) = unescape(c) {
                                s.push(r);
                            } else {
                                return Err(TokenizeError::unexpected_char(c).at(startpos))
                            }
                        }
                    }
                }
                Some(c) => s.push(c)
            }
        }
    }

    fn read_backquoted(&mut self, startpos: Pos) -> Result<Token, TokenizeErrorWithPos> {
        let mut s = String::new();
        loop {
            match self.chars.next()? {
                None => return Err(TokenizeError::MissingDelimiter('`').at(startpos)),
                Some('`') => return Ok(Token::String(KString::from_string(s))),
                Some('\r') => {
                    self.chars.next_if(|c| c == '\n')?;
                    s.push('\n');
                }
                Some(c) => s.push(c)
            }
        }
    }

    fn read_char(&mut self, startpos: Pos) -> Result<Token, TokenizeErrorWithPos> {
        let missing = || TokenizeError::MissingDelimiter('\'').at(startpos);
        let c = match self.chars.next()? {
            None | Some('\'') => return Err(missing()),
            Some('\\') => {
                match self.chars.next()? {
                    None => return Err(missing()),
                    Some(e) => match unescape(e) {
                        Some(c) => c,
                        None => return Err(TokenizeError::unexpected_char(e).at(startpos))
                    }
                }
            }
            Some(c) => c
        };
        match self.chars.next()? {
            Some('\'') => Ok(Token::Char(c)),
            _ => Err(missing())
        }
    }
}

impl<'s> Iterator for Tokenizer<'s> {
    type Item = Result<TokenWithPos, TokenizeErrorWithPos>;

    /// Yields tokens up to and including `Token::Eof`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished && self.peeked.is_none() {
            None
        } else {
            Some(self.next_token())
        }
    }
}
