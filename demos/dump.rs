// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use sdlstream::parse::{Attribute, Handler, Handlers, Parser};
use sdlstream::read::read_file;
use sdlstream::settings::{Format, Settings, DEFAULT_LIMITS, SDL_FORMAT};
use sdlstream::value::Literal;
use clap::Parser as ClapParser;
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;
use anyhow::Result;
use tracing_subscriber::EnvFilter;


fn indentstr(i: usize) -> Option<&'static str> {
    "                                                                  ".get(0..i)
}

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Build up a tree of all tags (default: stream events)
    #[clap(short, long, value_parser)]
    tree: bool,
    /// Treat malformed base64 in binary literals as an error (streaming
    /// mode only)
    #[clap(long, value_parser)]
    strict: bool,
    /// Only line breaks separate tags, `;` is an error (streaming mode
    /// only)
    #[clap(long, value_parser)]
    no_semicolons: bool,
    /// Path to the input file
    #[clap(value_parser, required(true))]
    input_path: PathBuf,
}

// Prints events as they arrive, indented by nesting depth
struct Printer;

impl Handler<(BufWriter<std::io::Stdout>, usize)> for Printer {
    fn start_tag(
        &self,
        cx: &mut Handlers<(BufWriter<std::io::Stdout>, usize)>,
        name: &str,
        values: &[Literal],
        attributes: &[Attribute],
    ) -> Result<()> {
        let (out, depth) = cx.state_mut();
        write!(out, "{}{}", indentstr(*depth * 2).unwrap_or(""), name)?;
        for v in values {
            write!(out, " {}:{}", v.kind(), v)?;
        }
        for a in attributes {
            write!(out, " {}={}:{}", a.name, a.value.kind(), a.value)?;
        }
        writeln!(out)?;
        *depth += 1;
        Ok(())
    }

    fn end_tag(
        &self,
        cx: &mut Handlers<(BufWriter<std::io::Stdout>, usize)>,
        _name: &str
    ) -> Result<()> {
        let (_, depth) = cx.state_mut();
        *depth -= 1;
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.tree {
        let tags = read_file(&args.input_path)?;
        let mut out = BufWriter::new(stdout());
        for tag in &tags {
            write!(out, "{}", tag)?;
        }
        out.flush()?;
    } else {
        let format = Format {
            semicolon_separator: ! args.no_semicolons,
            strict_base64: args.strict,
            ..SDL_FORMAT
        };
        let settings = Settings { format: &format, limits: &DEFAULT_LIMITS };
        let mut parser = Parser::with_settings(
            Rc::new(Printer), (BufWriter::new(stdout()), 0), settings);
        let result = parser.parse_file(&args.input_path);
        parser.into_state().0.flush()?;
        result?;
    }
    Ok(())
}
