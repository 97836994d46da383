// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A streaming parser for SDL, a line-oriented data language made of
//! tags with typed values, attributes and nested blocks:
//!
//! ```text
//! server "main" port=8080 enabled=true {
//!     started 2024/3/1 12:30:00-UTC
//!     timeout 00:00:30
//!     key [c2VjcmV0]
//! }
//! ```
//!
//! Goals:
//!
//! * Streaming: the document is never held in memory. Tags are
//!   reported to a [Handler](parse::Handler) as soon as their values
//!   and attributes are read (`sdlstream::parse`), and the input is
//!   pulled from the source character by character. `sdlstream::read`
//!   builds an in-memory tree if that is more convenient.
//!
//! * Typed literals: integers, fractions (binary floating point or
//!   exact decimal text), booleans, null, strings, characters, binary
//!   blobs, dates, date/times and timespans, each with a canonical
//!   string form (see [value](value)).
//!
//! * Good error reporting: every error carries a category, a message,
//!   the source name and the line and column where it happened.
//!
//! * Handler stacks: a handler can hand a block over to another
//!   handler (with its own state) and take it back afterwards, which
//!   keeps handlers for nested structures independent of each other.
//!
//! The tokenizer (`sdlstream::tokenize`) is usable directly as well.

pub mod buffered_chars; // although this is a hack
pub mod context;
pub mod debug;
pub mod literal;
pub mod number;
pub mod parse;
pub mod pos;
pub mod read;
pub mod settings;
pub mod tokenize;
pub mod value;
