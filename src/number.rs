// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Number suffixes and conversion of digit runs to numbers.

/// The letters directly following the digits of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    None,
    /// `l`: 64-bit integer
    Long,
    /// `f`: single-precision fraction
    Float,
    /// `d`: double-precision fraction, or days of a timespan
    Double,
    /// `bd`: exact decimal fraction
    Decimal,
}

impl TryFrom<&str> for Suffix {
    type Error = ();
    fn try_from(s: &str) -> Result<Suffix, Self::Error> {
        if s.is_empty() { Ok(Suffix::None) }
        else if s.eq_ignore_ascii_case("l") { Ok(Suffix::Long) }
        else if s.eq_ignore_ascii_case("f") { Ok(Suffix::Float) }
        else if s.eq_ignore_ascii_case("d") { Ok(Suffix::Double) }
        else if s.eq_ignore_ascii_case("bd") { Ok(Suffix::Decimal) }
        else { Err(()) }
    }
}

fn signed(is_neg: bool, digits: &str) -> String {
    if is_neg {
        format!("-{}", digits)
    } else {
        digits.to_string()
    }
}

/// `None` if out of range.
pub fn to_i32(is_neg: bool, digits: &str) -> Option<i32> {
    signed(is_neg, digits).parse().ok()
}

/// `None` if out of range.
pub fn to_i64(is_neg: bool, digits: &str) -> Option<i64> {
    signed(is_neg, digits).parse().ok()
}

/// The text of a fraction `int.frac`, with the sign if negative.
pub fn fraction_text(is_neg: bool, int: &str, frac: &str) -> String {
    signed(is_neg, &format!("{}.{}", int, frac))
}

/// `None` unless the result is finite.
pub fn to_f64(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// `None` unless the result is finite.
pub fn to_f32(text: &str) -> Option<f32> {
    text.parse::<f32>().ok().filter(|x| x.is_finite())
}

/// Milliseconds from the digits after a seconds '.', i.e. "5" is
/// 500. `None` if more precise than a millisecond.
pub fn to_millis(frac: &str) -> Option<u32> {
    if frac.is_empty() || frac.len() > 3 {
        return None
    }
    let mut n: u32 = frac.parse().ok()?;
    for _ in frac.len()..3 {
        n *= 10;
    }
    Some(n)
}
