// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Descent over the token stream, with open blocks kept on an explicit
//! stack, reporting each tag to a [Handler](Handler) as it is
//! recognized:
//!
//! ```text
//! document   := (tag separator)* EOF
//! tag        := IDENT? value* attr* block?
//! attr       := IDENT '=' value
//! block      := '{' (tag separator)* '}'
//! separator  := '\n' | ';'
//! ```
//!
//! `start_tag` is called once a tag's values and attributes are read,
//! before its block (if any) is parsed; `end_tag` after the block is
//! closed. A tag without a name must have at least one value; it is
//! reported with the name from `Format::anonymous_tag_name`.
//!
//! Handlers can hand over the rest of a block to another handler via
//! [Handlers::push](Handlers::push), which is undone by
//! [Handlers::pop](Handlers::pop), usually from the new handler's
//! `end_tag` for the tag that started the block. See
//! [read](../read/index.html) if interested in trees rather than
//! events.

use crate::context::{Context, FileContext, StringContext};
use crate::literal;
use crate::pos::Pos;
use crate::settings::{Settings, DEFAULT_SETTINGS};
use crate::tokenize::{Token, Tokenizer, TokenizeError, TokenizeErrorWithPos};
use crate::value::Literal;
use kstring::KString;
use thiserror::Error;
use std::fmt::{Formatter, Display};
use std::io::Read;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

/// The category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A character that cannot start any token
    UnexpectedChar,
    /// A string, character or binary literal that is not terminated
    MissingDelimiter,
    /// A token where the grammar expects another one
    Malformed,
    /// A literal with invalid content (range, calendar, time)
    BadLiteral,
    /// Reported by a handler callback
    Handler,
    /// The source could not be opened, read, or decoded
    Io,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{0}")]
    TE(TokenizeError),
    #[error("cannot open ({0})")]
    IO(std::io::Error),
    #[error("expected {expected}, got {got}")]
    Expected { expected: &'static str, got: Token },
    #[error("At least one value required for an anonymous tag")]
    AnonymousTagWithoutValue,
    #[error("number {0} needs a fraction to carry its suffix")]
    SuffixWithoutFraction(Token),
    #[error("nesting too deep")]
    NestingTooDeep,
    #[error("number out of range: {0}")]
    NumberOutOfRange(String),
    #[error("Invalid date")]
    InvalidDate,
    #[error("Invalid time in date/time")]
    InvalidTime,
    #[error("Invalid timespan")]
    InvalidTimespan,
    #[error("unsupported time zone '{0}'")]
    UnsupportedTimeZone(KString),
    #[error("invalid base64 in binary literal ({0})")]
    InvalidBase64(base64::DecodeError),
    #[error("{0}")]
    Handler(anyhow::Error),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::TE(e) => match e {
                TokenizeError::IOError(_) => ErrorKind::Io,
                TokenizeError::UnexpectedChar(..) => ErrorKind::UnexpectedChar,
                TokenizeError::UnexpectedSuffix(_) => ErrorKind::UnexpectedChar,
                TokenizeError::MissingDelimiter(_) => ErrorKind::MissingDelimiter,
                TokenizeError::Exhausted => ErrorKind::Malformed,
            },
            ParseError::IO(_) => ErrorKind::Io,
            ParseError::Expected { .. }
            | ParseError::AnonymousTagWithoutValue
            | ParseError::SuffixWithoutFraction(_)
            | ParseError::NestingTooDeep => ErrorKind::Malformed,
            ParseError::NumberOutOfRange(_)
            | ParseError::InvalidDate
            | ParseError::InvalidTime
            | ParseError::InvalidTimespan
            | ParseError::UnsupportedTimeZone(_)
            | ParseError::InvalidBase64(_) => ErrorKind::BadLiteral,
            ParseError::Handler(_) => ErrorKind::Handler,
        }
    }

    pub fn at(self, p: Pos) -> ParseErrorWithPos {
        ParseErrorWithPos {
            err: self,
            pos: p
        }
    }
}

#[derive(Error, Debug)]
#[error("{err} {pos}")]
pub struct ParseErrorWithPos {
    pub err: ParseError,
    pub pos: Pos
}

impl From<TokenizeErrorWithPos> for ParseErrorWithPos {
    fn from(ep: TokenizeErrorWithPos) -> ParseErrorWithPos {
        let TokenizeErrorWithPos { err, pos } = ep;
        ParseErrorWithPos {
            err: ParseError::TE(err),
            pos
        }
    }
}

/// A parse failure with the source it happened in. `pos` is the
/// start of the offending token, or `None` if the source could not
/// be opened or decoded in the first place.
#[derive(Error, Debug)]
pub struct ParseErrorWithLocation {
    pub err: ParseError,
    pub pos: Option<Pos>,
    pub context: Arc<dyn Context>,
}

impl ParseErrorWithLocation {
    pub fn kind(&self) -> ErrorKind {
        self.err.kind()
    }

    pub fn message(&self) -> String {
        self.err.to_string()
    }

    pub fn source_name(&self) -> String {
        self.context.to_string_without_pos()
    }

    pub fn pos(&self) -> Option<Pos> {
        self.pos
    }

    pub fn line(&self) -> Option<u32> {
        self.pos.map(|p| p.line)
    }

    pub fn column(&self) -> Option<u32> {
        self.pos.map(|p| p.col)
    }
}

impl Display for ParseErrorWithLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_fmt(format_args!("{} ", self.err))?;
        if let Some(pos) = self.pos {
            self.context.format_with_pos(pos, f)
        } else {
            f.write_str("in ")?;
            self.context.format_without_pos(f)
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: KString,
    pub value: Literal,
}

/// Callbacks receiving the tags of a document. `S` is the user state,
/// reachable through the `Handlers` passed to every call. Values are
/// only lent for the duration of a call; clone what you need to keep.
///
/// Returning an error from `start_tag` or `end_tag` stops the parse
/// just like a syntax error would.
pub trait Handler<S> {
    fn start_tag(
        &self,
        _cx: &mut Handlers<S>,
        _name: &str,
        _values: &[Literal],
        _attributes: &[Attribute],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn end_tag(&self, _cx: &mut Handlers<S>, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called with every error before the parse call returns it.
    fn error(&self, _cx: &mut Handlers<S>, _err: &ParseErrorWithLocation) {}
}

/// The active handler and its state, above the ones it replaced.
pub struct Handlers<S> {
    handler: Rc<dyn Handler<S>>,
    state: S,
    saved: Vec<(Rc<dyn Handler<S>>, S)>,
}

impl<S> Handlers<S> {
    pub fn new(handler: Rc<dyn Handler<S>>, state: S) -> Self {
        Handlers { handler, state, saved: Vec::new() }
    }

    /// Make `handler` with `state` receive all following events,
    /// until `pop` is called.
    pub fn push(&mut self, handler: Rc<dyn Handler<S>>, state: S) {
        let handler = std::mem::replace(&mut self.handler, handler);
        let state = std::mem::replace(&mut self.state, state);
        self.saved.push((handler, state));
        tracing::debug!(depth = self.saved.len(), "pushed handler");
    }

    /// Reinstate the handler that was active before the last `push`,
    /// returning the state of the one being removed. Panics if
    /// nothing was pushed.
    pub fn pop(&mut self) -> S {
        match self.saved.pop() {
            Some((handler, state)) => {
                self.handler = handler;
                tracing::debug!(depth = self.saved.len(), "popped handler");
                std::mem::replace(&mut self.state, state)
            }
            None => panic!("Handlers::pop: nothing was pushed")
        }
    }

    /// How many handlers are waiting below the active one.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    fn handler(&self) -> Rc<dyn Handler<S>> {
        self.handler.clone()
    }
}


/// A parser context: settings plus the handler stack. It can be used
/// for any number of documents; the handler stack carries over from
/// one to the next.
pub struct Parser<'t, S> {
    handlers: Handlers<S>,
    settings: Settings<'t>,
}

impl<S> Parser<'static, S> {
    pub fn new(handler: Rc<dyn Handler<S>>, state: S) -> Self {
        Parser::with_settings(handler, state, DEFAULT_SETTINGS)
    }
}

impl<'t, S> Parser<'t, S> {
    pub fn with_settings(
        handler: Rc<dyn Handler<S>>,
        state: S,
        settings: Settings<'t>
    ) -> Self {
        Parser {
            handlers: Handlers::new(handler, state),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings<'t> {
        &self.settings
    }

    pub fn handlers(&mut self) -> &mut Handlers<S> {
        &mut self.handlers
    }

    pub fn push(&mut self, handler: Rc<dyn Handler<S>>, state: S) {
        self.handlers.push(handler, state)
    }

    pub fn pop(&mut self) -> S {
        self.handlers.pop()
    }

    pub fn state(&self) -> &S {
        self.handlers.state()
    }

    pub fn state_mut(&mut self) -> &mut S {
        self.handlers.state_mut()
    }

    pub fn into_state(self) -> S {
        self.handlers.into_state()
    }

    pub fn parse_str(&mut self, s: &str) -> Result<(), ParseErrorWithLocation> {
        let ts = Tokenizer::from_string(s, self.settings.format);
        self.parse_tokens(ts)
    }

    /// Like `parse_str`, but the UTF-8 check is part of parsing.
    pub fn parse_bytes(&mut self, bs: &[u8]) -> Result<(), ParseErrorWithLocation> {
        match Tokenizer::from_bytes(bs, self.settings.format) {
            Ok(ts) => self.parse_tokens(ts),
            Err(e) => Err(self.report(ParseError::TE(e), None,
                                      Arc::new(StringContext::default())))
        }
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>)
                      -> Result<(), ParseErrorWithLocation> {
        let path = path.as_ref();
        match Tokenizer::open(path, self.settings.format) {
            Ok(ts) => self.parse_tokens(ts),
            Err(e) => Err(self.report(
                ParseError::IO(e), None,
                Arc::new(FileContext { path: path.to_path_buf() })))
        }
    }

    pub fn parse_reader(
        &mut self,
        fh: impl Read,
        context: Arc<dyn Context>
    ) -> Result<(), ParseErrorWithLocation> {
        let ts = Tokenizer::from_reader(fh, context, self.settings.format);
        self.parse_tokens(ts)
    }

    pub fn parse_tokens(&mut self, mut ts: Tokenizer<'_>)
                        -> Result<(), ParseErrorWithLocation> {
        tracing::debug!(source = %ts.context().to_string_without_pos(), "parsing");
        match self.document(&mut ts) {
            Ok(()) => {
                tracing::debug!("parsed");
                Ok(())
            }
            Err(ParseErrorWithPos { err, pos }) => {
                Err(self.report(err, Some(pos), ts.context().clone()))
            }
        }
    }

    fn report(
        &mut self,
        err: ParseError,
        pos: Option<Pos>,
        context: Arc<dyn Context>
    ) -> ParseErrorWithLocation {
        let e = ParseErrorWithLocation { err, pos, context };
        tracing::debug!(error = %e, "parse failed");
        let handler = self.handlers.handler();
        handler.error(&mut self.handlers, &e);
        e
    }

    fn document(&mut self, ts: &mut Tokenizer<'_>) -> Result<(), ParseErrorWithPos> {
        // tags whose block is open, with the position of their start
        let mut open: Vec<(KString, Pos)> = Vec::new();
        loop {
            let t = ts.peek_token()?;
            match t.token {
                Token::Punct('\n') | Token::Punct(';') => {
                    ts.next_token()?;
                }
                Token::Eof if open.is_empty() => {
                    ts.next_token()?;
                    return Ok(())
                }
                Token::Eof => {
                    return Err(ParseError::Expected {
                        expected: "'}'",
                        got: Token::Eof
                    }.at(t.pos))
                }
                Token::Punct('}') if ! open.is_empty() => {
                    ts.next_token()?;
                    if let Some((name, pos)) = open.pop() {
                        self.end_tag(&name, pos)?;
                    }
                    expect_separator(ts, ! open.is_empty())?;
                }
                _ => {
                    let (name, pos) = self.start_tag(ts)?;
                    let t = ts.peek_token()?;
                    if t.token == Token::Punct('{') {
                        if open.len() >= self.settings.limits.max_depth as usize {
                            return Err(ParseError::NestingTooDeep.at(t.pos))
                        }
                        ts.next_token()?;
                        open.push((name, pos));
                    } else {
                        self.end_tag(&name, pos)?;
                        expect_separator(ts, ! open.is_empty())?;
                    }
                }
            }
        }
    }

    // Everything of a tag up to its block; reports the start event
    fn start_tag(&mut self, ts: &mut Tokenizer<'_>)
                 -> Result<(KString, Pos), ParseErrorWithPos> {
        let first = ts.peek_token()?.clone();
        let pos = first.pos;
        let name = match first.token {
            Token::Identifier(name) => {
                ts.next_token()?;
                if ts.peek_token()?.token == Token::Punct('=') {
                    return Err(ParseError::AnonymousTagWithoutValue.at(pos))
                }
                name
            }
            ref t if literal::starts_literal(t) =>
                KString::from_static(self.settings.format.anonymous_tag_name),
            got => {
                return Err(ParseError::Expected {
                    expected: "identifier or value",
                    got
                }.at(pos))
            }
        };

        let mut values = Vec::new();
        while literal::starts_literal(&ts.peek_token()?.token) {
            values.push(literal::read_literal(ts, self.settings.format)?);
        }

        let mut attributes = Vec::new();
        loop {
            let attrname = match &ts.peek_token()?.token {
                Token::Identifier(attrname) => attrname.clone(),
                _ => break
            };
            ts.next_token()?;
            let eq = ts.next_token()?;
            if eq.token != Token::Punct('=') {
                return Err(ParseError::Expected {
                    expected: "'='",
                    got: eq.token
                }.at(eq.pos))
            }
            let t = ts.peek_token()?;
            if ! literal::starts_literal(&t.token) {
                return Err(ParseError::Expected {
                    expected: "value",
                    got: t.token.clone()
                }.at(t.pos))
            }
            let value = literal::read_literal(ts, self.settings.format)?;
            attributes.push(Attribute { name: attrname, value });
        }

        let handler = self.handlers.handler();
        handler.start_tag(&mut self.handlers, &name, &values, &attributes)
            .map_err(|e| ParseError::Handler(e).at(pos))?;
        Ok((name, pos))
    }

    fn end_tag(&mut self, name: &str, pos: Pos) -> Result<(), ParseErrorWithPos> {
        let handler = self.handlers.handler();
        handler.end_tag(&mut self.handlers, name)
            .map_err(|e| ParseError::Handler(e).at(pos))
    }
}

// What may follow a tag: a separator, or (without consuming it) the
// end of the enclosing block or document.
fn expect_separator(ts: &mut Tokenizer<'_>, in_block: bool)
                    -> Result<(), ParseErrorWithPos> {
    let t = ts.peek_token()?;
    match t.token {
        Token::Punct('\n') | Token::Punct(';') => {
            ts.next_token()?;
            Ok(())
        }
        Token::Punct('}') if in_block => Ok(()),
        Token::Eof if !in_block => Ok(()),
        _ => Err(ParseError::Expected {
            expected: if in_block {
                "line break, ';' or '}'"
            } else {
                "line break, ';' or end of input"
            },
            got: t.token.clone()
        }.at(t.pos))
    }
}
