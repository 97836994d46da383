// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime data types representing a literal value.

//! Every [Literal](Literal) has a canonical string form, which is its
//! `Display` output: `YYYY-MM-DD` for dates,
//! `YYYY-MM-DDTHH:MM:SS[.mmm]±HHMM` for date/times, the microsecond
//! count for timespans, binary data with non-printable bytes escaped
//! as `\0` or `\xHH`, and the usual number and text formatting for
//! everything else. [Literal::from_canonical](Literal::from_canonical)
//! reads that form back.

use crate::number;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, FixedOffset, Local,
             TimeZone, Timelike};
use kstring::KString;
use thiserror::Error;
use std::fmt::{Display, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Boolean,
    Null,
    String,
    Char,
    Binary,
    Date,
    DateTime,
    Timespan,
}

impl LiteralKind {
    pub fn name(self) -> &'static str {
        match self {
            LiteralKind::Int32 => "int32",
            LiteralKind::Int64 => "int64",
            LiteralKind::Float32 => "float32",
            LiteralKind::Float64 => "float64",
            LiteralKind::Decimal => "decimal",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Null => "null",
            LiteralKind::String => "string",
            LiteralKind::Char => "char",
            LiteralKind::Binary => "binary",
            LiteralKind::Date => "date",
            LiteralKind::DateTime => "datetime",
            LiteralKind::Timespan => "timespan",
        }
    }

    pub const ALL: [LiteralKind; 13] = [
        LiteralKind::Int32, LiteralKind::Int64, LiteralKind::Float32,
        LiteralKind::Float64, LiteralKind::Decimal, LiteralKind::Boolean,
        LiteralKind::Null, LiteralKind::String, LiteralKind::Char,
        LiteralKind::Binary, LiteralKind::Date, LiteralKind::DateTime,
        LiteralKind::Timespan,
    ];
}

impl TryFrom<&str> for LiteralKind {
    type Error = ();
    fn try_from(s: &str) -> Result<LiteralKind, Self::Error> {
        LiteralKind::ALL.into_iter().find(|k| k.name() == s).ok_or(())
    }
}

impl std::fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        f.write_str(self.name())
    }
}


/// A signed duration, exact to the microsecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timespan(i64);

impl Timespan {
    pub const MICROS_PER_MILLI: i64 = 1_000;
    pub const MICROS_PER_SECOND: i64 = 1_000 * Timespan::MICROS_PER_MILLI;
    pub const MICROS_PER_MINUTE: i64 = 60 * Timespan::MICROS_PER_SECOND;
    pub const MICROS_PER_HOUR: i64 = 60 * Timespan::MICROS_PER_MINUTE;
    pub const MICROS_PER_DAY: i64 = 24 * Timespan::MICROS_PER_HOUR;

    pub fn from_micros(micros: i64) -> Timespan {
        Timespan(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    /// The sum of the given components, negated as a whole if
    /// `is_neg`. `None` on overflow.
    pub fn from_parts(
        is_neg: bool,
        days: i64,
        hours: i64,
        minutes: i64,
        seconds: i64,
        millis: i64,
    ) -> Option<Timespan> {
        let mut total: i64 = 0;
        for (n, unit) in [(days, Timespan::MICROS_PER_DAY),
                          (hours, Timespan::MICROS_PER_HOUR),
                          (minutes, Timespan::MICROS_PER_MINUTE),
                          (seconds, Timespan::MICROS_PER_SECOND),
                          (millis, Timespan::MICROS_PER_MILLI)] {
            total = total.checked_add(n.checked_mul(unit)?)?;
        }
        Some(Timespan(if is_neg { -total } else { total }))
    }
}

impl std::fmt::Display for Timespan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        f.write_fmt(format_args!("{}", self.0))
    }
}


/// A point in time with millisecond precision; without an offset it
/// is a local time in the system's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl DateTime {
    pub fn new(date: NaiveDate, time: NaiveTime,
               offset: Option<FixedOffset>) -> DateTime {
        DateTime { local: date.and_time(time), offset }
    }

    pub fn millisecond(&self) -> u32 {
        self.local.nanosecond() / 1_000_000
    }

    /// The explicit offset, or the system zone's offset in effect at
    /// this local time.
    pub fn resolved_offset(&self) -> FixedOffset {
        if let Some(offset) = self.offset {
            return offset
        }
        match Local.offset_from_local_datetime(&self.local).earliest() {
            Some(offset) => offset,
            // skipped by a DST change
            None => Local.offset_from_utc_datetime(&self.local)
        }
    }
}

fn fmt_offset(f: &mut std::fmt::Formatter<'_>, offset: FixedOffset)
              -> Result<(), std::fmt::Error> {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    f.write_fmt(format_args!("{}{:02}{:02}", sign, secs / 3600, secs % 3600 / 60))
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        f.write_fmt(format_args!("{}", self.local.format("%Y-%m-%dT%H:%M:%S")))?;
        let ms = self.millisecond();
        if ms != 0 {
            f.write_fmt(format_args!(".{:03}", ms))?;
        }
        fmt_offset(f, self.resolved_offset())
    }
}


#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Exact decimal number, the source text kept as is
    Decimal(KString),
    Boolean(bool),
    Null,
    String(KString),
    Char(char),
    Binary(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime),
    Timespan(Timespan),
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Int32(_) => LiteralKind::Int32,
            Literal::Int64(_) => LiteralKind::Int64,
            Literal::Float32(_) => LiteralKind::Float32,
            Literal::Float64(_) => LiteralKind::Float64,
            Literal::Decimal(_) => LiteralKind::Decimal,
            Literal::Boolean(_) => LiteralKind::Boolean,
            Literal::Null => LiteralKind::Null,
            Literal::String(_) => LiteralKind::String,
            Literal::Char(_) => LiteralKind::Char,
            Literal::Binary(_) => LiteralKind::Binary,
            Literal::Date(_) => LiteralKind::Date,
            Literal::DateTime(_) => LiteralKind::DateTime,
            Literal::Timespan(_) => LiteralKind::Timespan,
        }
    }

    /// Read the canonical string form (`Display` output) of a literal
    /// of the given kind.
    pub fn from_canonical(kind: LiteralKind, s: &str) -> Result<Literal, ValueError> {
        let invalid = || ValueError::Invalid(kind, s.to_string());
        let parsed = match kind {
            LiteralKind::Int32 => s.parse().ok().map(Literal::Int32),
            LiteralKind::Int64 => s.parse().ok().map(Literal::Int64),
            LiteralKind::Float32 => s.parse().ok().map(Literal::Float32),
            LiteralKind::Float64 => s.parse().ok().map(Literal::Float64),
            LiteralKind::Decimal =>
                if is_decimal_text(s) {
                    Some(Literal::Decimal(KString::from_ref(s)))
                } else {
                    None
                },
            LiteralKind::Boolean => match s {
                "true" => Some(Literal::Boolean(true)),
                "false" => Some(Literal::Boolean(false)),
                _ => None
            },
            LiteralKind::Null => if s == "null" { Some(Literal::Null) } else { None },
            LiteralKind::String => Some(Literal::String(KString::from_ref(s))),
            LiteralKind::Char => {
                let mut cs = s.chars();
                match (cs.next(), cs.next()) {
                    (Some(c), None) => Some(Literal::Char(c)),
                    _ => None
                }
            }
            LiteralKind::Binary => unescape_binary(s).map(Literal::Binary),
            LiteralKind::Date =>
                NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Literal::Date),
            LiteralKind::DateTime => read_canonical_datetime(s).map(Literal::DateTime),
            LiteralKind::Timespan =>
                s.parse().ok().map(|n| Literal::Timespan(Timespan::from_micros(n))),
        };
        parsed.ok_or_else(invalid)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ValueError {
    #[error("invalid canonical {0} literal {1:?}")]
    Invalid(LiteralKind, String),
}

// -?digits.digits
fn is_decimal_text(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    match s.split_once('.') {
        Some((int, frac)) =>
            !int.is_empty() && !frac.is_empty()
            && int.bytes().all(|b| b.is_ascii_digit())
            && frac.bytes().all(|b| b.is_ascii_digit()),
        None => false
    }
}

fn unescape_binary(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut bs = s.bytes();
    while let Some(b) = bs.next() {
        if b == b'\\' {
            match bs.next()? {
                b'0' => out.push(0),
                b'x' => {
                    let hi = char::from(bs.next()?).to_digit(16)?;
                    let lo = char::from(bs.next()?).to_digit(16)?;
                    out.push((hi * 16 + lo) as u8);
                }
                _ => return None
            }
        } else if b.is_ascii() && !b.is_ascii_control() {
            out.push(b);
        } else {
            return None
        }
    }
    Some(out)
}

fn read_canonical_datetime(s: &str) -> Option<DateTime> {
    let (date, rest) = s.split_once('T')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let zonepos = rest.rfind(|c: char| c == '+' || c == '-')?;
    let (time, zone) = rest.split_at(zonepos);
    let (hms, ms) = match time.split_once('.') {
        Some((hms, frac)) => (hms, number::to_millis(frac)?),
        None => (time, 0)
    };
    let time = NaiveTime::parse_from_str(hms, "%H:%M:%S").ok()?
        .with_nanosecond(ms * 1_000_000)?;
    if zone.len() != 5 || !zone[1..].bytes().all(|b| b.is_ascii_digit()) {
        return None
    }
    let hh: i32 = zone[1..3].parse().ok()?;
    let mm: i32 = zone[3..5].parse().ok()?;
    let secs = hh * 3600 + mm * 60;
    let offset = FixedOffset::east_opt(if zone.starts_with('-') { -secs } else { secs })?;
    Some(DateTime::new(date, time, Some(offset)))
}

fn fmt_binary(f: &mut std::fmt::Formatter<'_>, bytes: &[u8])
              -> Result<(), std::fmt::Error> {
    for &b in bytes {
        if b == 0 {
            f.write_str("\\0")?
        } else if b == b'\\' || !(0x20..0x7f).contains(&b) {
            f.write_fmt(format_args!("\\x{:02x}", b))?
        } else {
            f.write_char(char::from(b))?
        }
    }
    Ok(())
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Literal::Int32(n) => Display::fmt(n, f),
            Literal::Int64(n) => Display::fmt(n, f),
            Literal::Float32(x) => Display::fmt(x, f),
            Literal::Float64(x) => Display::fmt(x, f),
            Literal::Decimal(s) => f.write_str(s),
            Literal::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Literal::Null => f.write_str("null"),
            Literal::String(s) => f.write_str(s),
            Literal::Char(c) => f.write_char(*c),
            Literal::Binary(bs) => fmt_binary(f, bs),
            Literal::Date(d) => f.write_fmt(format_args!("{}", d.format("%Y-%m-%d"))),
            Literal::DateTime(dt) => Display::fmt(dt, f),
            Literal::Timespan(t) => Display::fmt(t, f),
        }
    }
}

/// Easily create a string literal
pub fn string(s: &str) -> Literal {
    Literal::String(KString::from_ref(s))
}

/// Easily create a decimal literal
pub fn decimal(s: &str) -> Literal {
    Literal::Decimal(KString::from_ref(s))
}
