// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembling literal values from one or more tokens:
//!
//! ```text
//! -?12   -?12L   -?1.5   -?1.5f   -?1.5d   -?1.5bd
//! 2024/3/1                      date
//! 2024/3/1 12:30[:00[.250]]     date/time, local
//! 2024/3/1 12:30:00-UTC         date/time with offset, also -GMT or -Z
//! 2024/3/1 12:30:00-07:00       negative offsets, also -GMT-07:00
//! -?[3d:]12:30:00[.250]         timespan
//! ```
//!
//! The zone introducer `-` must directly follow the time, otherwise
//! it would be the sign of the next value.

use crate::number;
use crate::parse::{ParseError, ParseErrorWithPos};
use crate::pos::Pos;
use crate::settings::Format;
use crate::tokenize::{Token, TokenWithPos, Tokenizer};
use crate::value::{DateTime, Literal, Timespan};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::engine::general_purpose::STANDARD;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use kstring::KString;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true));

/// Whether `t` can be the first token of a literal.
pub fn starts_literal(t: &Token) -> bool {
    match t {
        Token::Number(_) | Token::Long(_) | Token::Float(_)
            | Token::Double(_) | Token::Decimal(_)
            | Token::DatePart(_) | Token::TimePart(_) | Token::DaysPrefix(_)
            | Token::Bool(_) | Token::Null | Token::String(_) | Token::Char(_)
            | Token::Binary(_) | Token::Punct('-') => true,
        _ => false
    }
}

fn expected(expected: &'static str, got: Token, pos: Pos) -> ParseErrorWithPos {
    ParseError::Expected { expected, got }.at(pos)
}

fn expect_punct(
    ts: &mut Tokenizer<'_>,
    c: char,
    what: &'static str
) -> Result<(), ParseErrorWithPos> {
    let t = ts.next_token()?;
    if t.token == Token::Punct(c) {
        Ok(())
    } else {
        Err(expected(what, t.token, t.pos))
    }
}

// Whether the next token is `c` starting right at `end`
fn adjacent_punct(
    ts: &mut Tokenizer<'_>,
    c: char,
    end: Pos
) -> Result<bool, ParseErrorWithPos> {
    let t = ts.peek_token()?;
    Ok(t.token == Token::Punct(c) && t.pos == end)
}

// The digits after an adjacent '.', starting right at `end`
fn fraction_digits(ts: &mut Tokenizer<'_>, end: Pos) -> Result<TokenWithPos, ParseErrorWithPos> {
    let t = ts.next_token()?;
    if t.pos != end {
        return Err(expected("digits directly after '.'", t.token, t.pos))
    }
    Ok(t)
}

fn parse_u32(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

fn parse_i64(digits: &str) -> Option<i64> {
    digits.parse().ok()
}

/// Read a complete literal; the next token must satisfy
/// `starts_literal`.
pub fn read_literal(
    ts: &mut Tokenizer<'_>,
    format: &Format
) -> Result<Literal, ParseErrorWithPos> {
    let first = ts.next_token()?;
    let pos = first.pos;
    let (is_neg, t) = if first.token == Token::Punct('-') {
        let t = ts.next_token()?;
        match t.token {
            Token::Number(_) | Token::Long(_) | Token::Float(_)
                | Token::Double(_) | Token::Decimal(_)
                | Token::TimePart(_) | Token::DaysPrefix(_) => (true, t),
            _ => return Err(expected("number or timespan after '-'", t.token, t.pos))
        }
    } else {
        (false, first)
    };
    let end = t.end;
    match t.token {
        Token::Number(digits) => {
            if adjacent_punct(ts, '.', end)? {
                let dot = ts.next_token()?;
                read_fraction(ts, is_neg, &digits, dot.end, pos)
            } else {
                number::to_i32(is_neg, &digits).map(Literal::Int32).ok_or_else(
                    || ParseError::NumberOutOfRange(
                        format!("{}{}", if is_neg { "-" } else { "" }, digits)).at(pos))
            }
        }
        Token::Long(digits) => {
            number::to_i64(is_neg, &digits).map(Literal::Int64).ok_or_else(
                || ParseError::NumberOutOfRange(
                    format!("{}{}L", if is_neg { "-" } else { "" }, digits)).at(pos))
        }
        Token::Float(_) | Token::Double(_) | Token::Decimal(_) =>
            Err(ParseError::SuffixWithoutFraction(t.token).at(t.pos)),
        Token::DatePart(year) => read_date(ts, &year, pos),
        Token::TimePart(hours) => read_timespan(ts, is_neg, None, &hours, pos),
        Token::DaysPrefix(days) => {
            expect_punct(ts, ':', "':' after days")?;
            let t = ts.next_token()?;
            match t.token {
                Token::TimePart(hours) => read_timespan(ts, is_neg, Some(&days), &hours, pos),
                got => Err(expected("hours", got, t.pos))
            }
        }
        Token::Bool(b) => Ok(Literal::Boolean(b)),
        Token::Null => Ok(Literal::Null),
        Token::String(s) => Ok(Literal::String(s)),
        Token::Char(c) => Ok(Literal::Char(c)),
        Token::Binary(b64) => {
            decode_binary(&b64, format).map(Literal::Binary).map_err(
                |e| ParseError::InvalidBase64(e).at(pos))
        }
        got => Err(expected("value", got, t.pos))
    }
}

// After `int.`, with the '.' ending at `end`; the suffix of the
// digits after the '.' decides the type
fn read_fraction(
    ts: &mut Tokenizer<'_>,
    is_neg: bool,
    int: &str,
    end: Pos,
    pos: Pos
) -> Result<Literal, ParseErrorWithPos> {
    let t = fraction_digits(ts, end)?;
    let out_of_range = |text: String| ParseError::NumberOutOfRange(text).at(pos);
    match t.token {
        Token::Number(frac) | Token::Double(frac) => {
            let text = number::fraction_text(is_neg, int, &frac);
            number::to_f64(&text).map(Literal::Float64).ok_or_else(|| out_of_range(text))
        }
        Token::Float(frac) => {
            let text = number::fraction_text(is_neg, int, &frac);
            number::to_f32(&text).map(Literal::Float32).ok_or_else(|| out_of_range(text))
        }
        Token::Decimal(frac) => {
            Ok(Literal::Decimal(KString::from_string(
                number::fraction_text(is_neg, int, &frac))))
        }
        got => Err(expected("digits after '.'", got, t.pos))
    }
}

fn read_date(
    ts: &mut Tokenizer<'_>,
    year: &str,
    pos: Pos
) -> Result<Literal, ParseErrorWithPos> {
    expect_punct(ts, '/', "'/' after year")?;
    let t = ts.next_token()?;
    let month = match t.token {
        Token::DatePart(m) => m,
        got => return Err(expected("month", got, t.pos))
    };
    expect_punct(ts, '/', "'/' after month")?;
    let t = ts.next_token()?;
    let day = match t.token {
        Token::Number(d) => d,
        got => return Err(expected("day", got, t.pos))
    };
    let date = year.parse::<i32>().ok()
        .zip(parse_u32(&month))
        .zip(parse_u32(&day))
        .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
        .ok_or_else(|| ParseError::InvalidDate.at(pos))?;

    let t = ts.peek_token()?;
    if let Token::TimePart(hours) = &t.token {
        let hours = hours.clone();
        ts.next_token()?;
        let (time, end) = read_time_of_day(ts, &hours, pos)?;
        let offset = read_offset(ts, end, pos)?;
        Ok(Literal::DateTime(DateTime::new(date, time, offset)))
    } else {
        Ok(Literal::Date(date))
    }
}

// `HH:MM[:SS[.mmm]]` after the hour token; returns the end of the
// last token used
fn read_time_of_day(
    ts: &mut Tokenizer<'_>,
    hours: &str,
    pos: Pos
) -> Result<(NaiveTime, Pos), ParseErrorWithPos> {
    let invalid = || ParseError::InvalidTime.at(pos);
    expect_punct(ts, ':', "':' after hours")?;
    let t = ts.next_token()?;
    let (minutes, seconds, millis, end) = match t.token {
        Token::Number(m) => (m, KString::from_static("0"), 0, t.end),
        Token::TimePart(m) => {
            expect_punct(ts, ':', "':' after minutes")?;
            let t = ts.next_token()?;
            let s = match t.token {
                Token::Number(s) => s,
                got => return Err(expected("seconds", got, t.pos))
            };
            let mut end = t.end;
            let mut millis = 0;
            if adjacent_punct(ts, '.', end)? {
                let dot = ts.next_token()?;
                let t = fraction_digits(ts, dot.end)?;
                match t.token {
                    Token::Number(frac) => {
                        millis = number::to_millis(&frac).ok_or_else(invalid)?;
                        end = t.end;
                    }
                    got => return Err(expected("milliseconds", got, t.pos))
                }
            }
            (m, s, millis, end)
        }
        got => return Err(expected("minutes", got, t.pos))
    };
    let time = parse_u32(hours)
        .zip(parse_u32(&minutes))
        .zip(parse_u32(&seconds))
        .and_then(|((h, m), s)| NaiveTime::from_hms_milli_opt(h, m, s, millis))
        .ok_or_else(invalid)?;
    Ok((time, end))
}

// An optional `-UTC`, `-GMT`, `-Z`, `-HH[:MM]`, `-HHMM`, or a named
// zone followed by `-HH[:MM]`, directly adjacent to the time
fn read_offset(
    ts: &mut Tokenizer<'_>,
    end: Pos,
    pos: Pos
) -> Result<Option<FixedOffset>, ParseErrorWithPos> {
    if ! adjacent_punct(ts, '-', end)? {
        return Ok(None)
    }
    let dash = ts.next_token()?;
    let mut end = dash.end;
    let t = ts.peek_token()?;
    if t.pos != end {
        return Err(expected("time zone", t.token.clone(), t.pos))
    }
    if let Token::Identifier(zone) = &t.token {
        if ! matches!(zone.as_str(), "UTC" | "GMT" | "Z") {
            return Err(ParseError::UnsupportedTimeZone(zone.clone()).at(t.pos))
        }
        end = t.end;
        ts.next_token()?;
        if ! adjacent_punct(ts, '-', end)? {
            return Ok(FixedOffset::east_opt(0))
        }
        end = ts.next_token()?.end;
    }

    let invalid = || ParseError::InvalidTime.at(pos);
    let t = ts.next_token()?;
    if t.pos != end {
        return Err(expected("offset", t.token, t.pos))
    }
    let (hours, minutes) = match t.token {
        Token::TimePart(h) => {
            expect_punct(ts, ':', "':' after offset hours")?;
            let t = ts.next_token()?;
            match t.token {
                Token::Number(m) => (h, m),
                got => return Err(expected("offset minutes", got, t.pos))
            }
        }
        Token::Number(n) => {
            match n.len() {
                1 | 2 => (n, KString::from_static("0")),
                4 => (KString::from_ref(&n[..2]), KString::from_ref(&n[2..])),
                _ => return Err(invalid())
            }
        }
        got => return Err(expected("offset", got, t.pos))
    };
    let hours = parse_u32(&hours).filter(|h| *h <= 23).ok_or_else(invalid)?;
    let minutes = parse_u32(&minutes).filter(|m| *m <= 59).ok_or_else(invalid)?;
    let secs = (hours * 3600 + minutes * 60) as i32;
    FixedOffset::east_opt(-secs).map(Some).ok_or_else(invalid)
}

// `[days:]HH:MM:SS[.mmm]` after the hours token
fn read_timespan(
    ts: &mut Tokenizer<'_>,
    is_neg: bool,
    days: Option<&str>,
    hours: &str,
    pos: Pos
) -> Result<Literal, ParseErrorWithPos> {
    let invalid = || ParseError::InvalidTimespan.at(pos);
    expect_punct(ts, ':', "':' after hours")?;
    let t = ts.next_token()?;
    let minutes = match t.token {
        Token::TimePart(m) => m,
        got => return Err(expected("minutes", got, t.pos))
    };
    expect_punct(ts, ':', "':' after minutes")?;
    let t = ts.next_token()?;
    let seconds = match t.token {
        Token::Number(s) => s,
        got => return Err(expected("seconds", got, t.pos))
    };
    let mut millis = 0;
    if adjacent_punct(ts, '.', t.end)? {
        let dot = ts.next_token()?;
        let t = fraction_digits(ts, dot.end)?;
        millis = match t.token {
            Token::Number(frac) => number::to_millis(&frac).ok_or_else(invalid)?,
            got => return Err(expected("milliseconds", got, t.pos))
        };
    }
    let days = match days {
        Some(d) => parse_i64(d).ok_or_else(invalid)?,
        None => 0
    };
    let h = parse_i64(hours).ok_or_else(invalid)?;
    let m = parse_i64(&minutes).ok_or_else(invalid)?;
    let s = parse_i64(&seconds).ok_or_else(invalid)?;
    Timespan::from_parts(is_neg, days, h, m, s, i64::from(millis))
        .map(Literal::Timespan)
        .ok_or_else(invalid)
}

/// Decode the base64 text of a binary literal. Unless
/// `format.strict_base64` is set, padding is optional and a trailing
/// character that cannot form a byte is dropped.
pub fn decode_binary(b64: &str, format: &Format) -> Result<Vec<u8>, base64::DecodeError> {
    if format.strict_base64 {
        STANDARD.decode(b64)
    } else {
        let mut s: String = b64.chars().filter(|c| *c != '=').collect();
        if s.len() % 4 == 1 {
            s.pop();
        }
        LENIENT.decode(s)
    }
}
