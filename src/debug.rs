// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Utilities for debugging the sdlstream library: a handler that
//! writes every event it receives as a line of text.
//!
//! ```text
//! (name,kind:value,...,attr=kind:value,...     start_tag
//! name)                                        end_tag
//! E: message in source, line L, column C       error
//! ```

use crate::parse::{Attribute, Handler, Handlers, Parser, ParseErrorWithLocation};
use crate::value::Literal;
use std::fmt::Write;
use std::rc::Rc;

pub struct Recorder;

impl Handler<String> for Recorder {
    fn start_tag(
        &self,
        cx: &mut Handlers<String>,
        name: &str,
        values: &[Literal],
        attributes: &[Attribute],
    ) -> anyhow::Result<()> {
        let out = cx.state_mut();
        write!(out, "({}", name)?;
        for v in values {
            write!(out, ",{}:{}", v.kind(), v)?;
        }
        for a in attributes {
            write!(out, ",{}={}:{}", a.name, a.value.kind(), a.value)?;
        }
        out.push('\n');
        Ok(())
    }

    fn end_tag(&self, cx: &mut Handlers<String>, name: &str) -> anyhow::Result<()> {
        writeln!(cx.state_mut(), "{})", name)?;
        Ok(())
    }

    fn error(&self, cx: &mut Handlers<String>, err: &ParseErrorWithLocation) {
        cx.state_mut().push_str(&format!("E: {}\n", err));
    }
}

/// The transcript of parsing `s` with default settings, including the
/// error line if it fails.
pub fn record_str(s: &str) -> String {
    let mut parser = Parser::new(Rc::new(Recorder), String::new());
    // the error is in the transcript
    let _ = parser.parse_str(s);
    parser.into_state()
}
