// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cmp::Eq;

/// Both line and col are 1-based, the way an editor shows them.

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub const START: Pos = Pos { line: 1, col: 1 };

    /// The position of the character following `c`. `prev` is the
    /// character before `c`, so that CRLF only counts as one line
    /// break while a lone CR still counts as one.
    pub fn after(self, c: char, prev: Option<char>) -> Pos {
        match c {
            '\n' if prev == Some('\r') => self,
            '\n' | '\r' => Pos { line: self.line + 1, col: 1 },
            _ => Pos { line: self.line, col: self.col + 1 },
        }
    }
}

impl Default for Pos {
    fn default() -> Self {
        Pos::START
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        f.write_fmt(format_args!("@{}.{}", self.line, self.col))
    }
}
