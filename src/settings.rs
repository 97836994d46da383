// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Settings for the tokenizer and the parser.

#[derive(Debug)]
pub struct Format {
    /// Whether `;` separates tags like a line break does (older
    /// documents only know line breaks).
    pub semicolon_separator: bool,
    /// Name reported for tags that start with a value.
    pub anonymous_tag_name: &'static str,
    /// Whether malformed base64 in binary literals is an error
    /// (otherwise decoded on a best-effort basis).
    pub strict_base64: bool,
}

pub const SDL_FORMAT : Format = Format {
    semicolon_separator: true,
    anonymous_tag_name: "content",
    strict_base64: false,
};

pub const STRICT_FORMAT : Format = Format {
    semicolon_separator: true,
    anonymous_tag_name: "content",
    strict_base64: true,
};

pub const LINE_FORMAT : Format = Format {
    semicolon_separator: false,
    anonymous_tag_name: "content",
    strict_base64: false,
};


#[derive(Debug)]
pub struct Limits {
    /// Maximum nesting of `{ }` blocks.
    pub max_depth: u32,
}

pub const DEFAULT_LIMITS : Limits = Limits {
    max_depth: 500,
    // ^ open blocks live on the heap, not the call stack
};


#[derive(Debug, Clone, Copy)]
pub struct Settings<'t> {
    pub format: &'t Format,
    pub limits: &'t Limits,
}

pub const DEFAULT_SETTINGS : Settings<'static> = Settings {
    format: &SDL_FORMAT,
    limits: &DEFAULT_LIMITS,
};

impl Default for Settings<'static> {
    fn default() -> Self {
        DEFAULT_SETTINGS
    }
}
