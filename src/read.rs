// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading a whole document into memory, as a tree of [Tag](Tag)s.

use crate::context::StringContext;
use crate::parse::{Attribute, Handler, Handlers, Parser, ParseErrorWithLocation};
use crate::settings::{Settings, DEFAULT_SETTINGS};
use crate::value::Literal;
use anyhow::anyhow;
use kstring::KString;
use std::fmt::{Display, Formatter};
use std::io::Read;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: KString,
    pub values: Vec<Literal>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Tag>,
}

impl Tag {
    /// The value of the first attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&Literal> {
        self.attributes.iter().find(|a| a.name.as_str() == name).map(|a| &a.value)
    }

    /// The first value, if any.
    pub fn value(&self) -> Option<&Literal> {
        self.values.first()
    }

    pub fn child(&self, name: &str) -> Option<&Tag> {
        self.children.iter().find(|t| t.name.as_str() == name)
    }

    pub fn children_named<'t>(&'t self, name: &'t str) -> impl Iterator<Item = &'t Tag> {
        self.children.iter().filter(move |t| t.name.as_str() == name)
    }

    fn fmt_indented(&self, f: &mut Formatter<'_>, indent: usize)
                    -> Result<(), std::fmt::Error> {
        f.write_fmt(format_args!("{:indent$}{}", "", self.name, indent = indent))?;
        for v in &self.values {
            f.write_fmt(format_args!(" {}:{}", v.kind(), v))?;
        }
        for a in &self.attributes {
            f.write_fmt(format_args!(" {}={}:{}", a.name, a.value.kind(), a.value))?;
        }
        if ! self.children.is_empty() {
            f.write_str(" {\n")?;
            for c in &self.children {
                c.fmt_indented(f, indent + 2)?;
            }
            f.write_fmt(format_args!("{:indent$}}}", "", indent = indent))?;
        }
        f.write_str("\n")
    }
}

/// An outline with one tag per line, children indented within
/// braces, literals as `kind:canonical-form`.
impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        self.fmt_indented(f, 0)
    }
}


#[derive(Default)]
struct Tree {
    // tags whose end was not seen yet
    open: Vec<Tag>,
    done: Vec<Tag>,
}

struct TreeBuilder;

impl Handler<Tree> for TreeBuilder {
    fn start_tag(
        &self,
        cx: &mut Handlers<Tree>,
        name: &str,
        values: &[Literal],
        attributes: &[Attribute],
    ) -> anyhow::Result<()> {
        cx.state_mut().open.push(Tag {
            name: KString::from_ref(name),
            values: values.to_vec(),
            attributes: attributes.to_vec(),
            children: Vec::new(),
        });
        Ok(())
    }

    fn end_tag(&self, cx: &mut Handlers<Tree>, name: &str) -> anyhow::Result<()> {
        let tree = cx.state_mut();
        let tag = tree.open.pop().ok_or_else(
            || anyhow!("end of tag {:?} without a start", name))?;
        match tree.open.last_mut() {
            Some(parent) => parent.children.push(tag),
            None => tree.done.push(tag)
        }
        Ok(())
    }
}

fn tree_parser(settings: Settings<'_>) -> Parser<'_, Tree> {
    Parser::with_settings(Rc::new(TreeBuilder), Tree::default(), settings)
}

pub fn read_str(s: &str) -> Result<Vec<Tag>, ParseErrorWithLocation> {
    read_str_with(s, DEFAULT_SETTINGS)
}

pub fn read_str_with(
    s: &str,
    settings: Settings<'_>
) -> Result<Vec<Tag>, ParseErrorWithLocation> {
    let mut parser = tree_parser(settings);
    parser.parse_str(s)?;
    Ok(parser.into_state().done)
}

/// Errors name the source `<input>`.
pub fn read_all(fh: impl Read) -> Result<Vec<Tag>, ParseErrorWithLocation> {
    let mut parser = tree_parser(DEFAULT_SETTINGS);
    parser.parse_reader(fh, Arc::new(StringContext::new("input")))?;
    Ok(parser.into_state().done)
}

pub fn read_file(path: &Path) -> Result<Vec<Tag>, ParseErrorWithLocation> {
    let mut parser = tree_parser(DEFAULT_SETTINGS);
    parser.parse_file(path)?;
    Ok(parser.into_state().done)
}
