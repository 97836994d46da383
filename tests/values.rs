use anyhow::Result;
use chrono::NaiveDate;
use sdlstream::parse::ErrorKind;
use sdlstream::read::{read_str, read_str_with, Tag};
use sdlstream::settings::{Settings, DEFAULT_LIMITS, STRICT_FORMAT};
use sdlstream::value::{decimal, string, Literal, LiteralKind, Timespan};

fn values(s: &str) -> Result<Vec<Literal>> {
    let mut tags: Vec<Tag> = read_str(s)?;
    assert_eq!(tags.len(), 1);
    Ok(tags.remove(0).values)
}

fn error_kind(s: &str) -> ErrorKind {
    match read_str(s) {
        Ok(tags) => panic!("{:?} parsed as {:?}", s, tags),
        Err(e) => e.kind()
    }
}

fn rendered(vals: &[Literal]) -> Vec<String> {
    vals.iter().map(|v| v.to_string()).collect()
}

#[test]
fn numbers() -> Result<()> {
    assert_eq!(values("tag 58 -5 2L -32L 69.2 -52.3 43.2D 25.3f -92.432f 53.25BD -8923.33bd")?,
               vec![Literal::Int32(58),
                    Literal::Int32(-5),
                    Literal::Int64(2),
                    Literal::Int64(-32),
                    Literal::Float64(69.2),
                    Literal::Float64(-52.3),
                    Literal::Float64(43.2),
                    Literal::Float32(25.3),
                    Literal::Float32(-92.432),
                    decimal("53.25"),
                    decimal("-8923.33")]);
    Ok(())
}

#[test]
fn integer_ranges() -> Result<()> {
    assert_eq!(values("tag 2147483647 -2147483648 9223372036854775807L")?,
               vec![Literal::Int32(i32::MAX),
                    Literal::Int32(i32::MIN),
                    Literal::Int64(i64::MAX)]);
    assert_eq!(error_kind("tag 2147483648"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 9223372036854775808L"), ErrorKind::BadLiteral);
    Ok(())
}

#[test]
fn suffix_needs_fraction() {
    assert_eq!(error_kind("tag 5f"), ErrorKind::Malformed);
    assert_eq!(error_kind("tag 5bd"), ErrorKind::Malformed);
    assert_eq!(error_kind("tag 5."), ErrorKind::Malformed);
}

#[test]
fn fraction_touches_its_number() -> Result<()> {
    assert_eq!(error_kind("tag 5 .3"), ErrorKind::Malformed);
    assert_eq!(error_kind("tag 5. 3"), ErrorKind::Malformed);
    assert_eq!(error_kind("tag 5 . 3f"), ErrorKind::Malformed);
    let e = read_str("tag 5. 3").unwrap_err();
    assert_eq!(e.message(), "expected digits directly after '.', got 3");
    assert_eq!((e.line(), e.column()), (Some(1), Some(8)));
    // the same for fractions of seconds
    assert_eq!(error_kind("tag 2020/1/1 12:00:00 .5"), ErrorKind::Malformed);
    assert_eq!(error_kind("tag 1:02:03. 5"), ErrorKind::Malformed);
    assert_eq!(values("tag 5.3 1:02:03.5")?,
               vec![Literal::Float64(5.3),
                    Literal::Timespan(Timespan::from_micros(3_723_500_000))]);
    Ok(())
}

#[test]
fn keywords() -> Result<()> {
    assert_eq!(values("tag true false null off on")?,
               vec![Literal::Boolean(true),
                    Literal::Boolean(false),
                    Literal::Null,
                    Literal::Boolean(false),
                    Literal::Boolean(true)]);
    Ok(())
}

#[test]
fn text() -> Result<()> {
    assert_eq!(values("tag \"a\\tb\" 'x' `raw\\n` \"\"")?,
               vec![string("a\tb"),
                    Literal::Char('x'),
                    string("raw\\n"),
                    string("")]);
    Ok(())
}

#[test]
fn dates() -> Result<()> {
    assert_eq!(values("tag 2042/4/20 2012/2/5")?,
               vec![Literal::Date(NaiveDate::from_ymd_opt(2042, 4, 20).unwrap()),
                    Literal::Date(NaiveDate::from_ymd_opt(2012, 2, 5).unwrap())]);
    assert_eq!(rendered(&values("tag 2042/4/20")?), vec!["2042-04-20"]);
    assert_eq!(error_kind("tag 2020/2/30"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 2020/13/1"), ErrorKind::BadLiteral);
    Ok(())
}

#[test]
fn local_datetimes() -> Result<()> {
    let vals = values("tag 1924/11/4 19:34:5 2012/2/5 5:30")?;
    assert_eq!(vals.len(), 2);
    match &vals[0] {
        Literal::DateTime(dt) => {
            assert_eq!(dt.offset, None);
            assert_eq!(dt.local.to_string(), "1924-11-04 19:34:05");
        }
        v => panic!("not a datetime: {:?}", v)
    }
    // rendered with the system zone's offset
    assert!(vals[1].to_string().starts_with("2012-02-05T05:30:00"));
    Ok(())
}

#[test]
fn datetimes_with_offset() -> Result<()> {
    assert_eq!(rendered(&values(
        "tag 2001/02/23 4:00:23.52-UTC 2020/1/1 12:00-07:00 \
         2020/1/1 12:00:00-GMT-0530 2020/1/1 12:00-Z 2020/1/1 0:00:00.001-GMT")?),
               vec!["2001-02-23T04:00:23.520+0000",
                    "2020-01-01T12:00:00-0700",
                    "2020-01-01T12:00:00-0530",
                    "2020-01-01T12:00:00+0000",
                    "2020-01-01T00:00:00.001+0000"]);
    Ok(())
}

#[test]
fn separated_dash_is_next_value() -> Result<()> {
    let vals = values("tag 2020/1/1 12:00-UTC -5")?;
    assert_eq!(vals.len(), 2);
    assert_eq!(vals[1], Literal::Int32(-5));
    Ok(())
}

#[test]
fn bad_times() {
    assert_eq!(error_kind("tag 2020/1/1 25:00"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 2020/1/1 12:60"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 2020/1/1 12:00:00.1234"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 2020/1/1 12:00-PST"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 1:2:3.1234"), ErrorKind::BadLiteral);
    assert_eq!(error_kind("tag 2020/1/1 12:"), ErrorKind::Malformed);
}

#[test]
fn timespans() -> Result<()> {
    let micros: Vec<i64> = values(
        "tag 00:40:20 42:00:52 30d:00:1:20 -50d:32:23:21 20:42:32.324 -323:00:00.342")?
        .into_iter()
        .map(|v| match v {
            Literal::Timespan(t) => t.micros(),
            v => panic!("not a timespan: {:?}", v)
        })
        .collect();
    assert_eq!(micros,
               vec![2420000000,
                    151252000000,
                    2592080000000,
                    -4436601000000,
                    74552324000,
                    -1162800342000]);
    assert_eq!(values("tag 0:0:0.5")?,
               vec![Literal::Timespan(Timespan::from_micros(500_000))]);
    Ok(())
}

#[test]
fn binary() -> Result<()> {
    assert_eq!(values("tag [YmluYXJ5] [cGFkZGVkI}GJpbmFyeQ==] [ZW1iZWRkZWQAbnVsbHM=] []")?,
               vec![Literal::Binary(b"binary".to_vec()),
                    Literal::Binary(b"padded binary".to_vec()),
                    Literal::Binary(b"embedded\0nulls".to_vec()),
                    Literal::Binary(Vec::new())]);
    assert_eq!(rendered(&values("tag [ZW1iZWRkZWQAbnVsbHM=] [XA==]")?),
               vec!["embedded\\0nulls", "\\x5c"]);
    Ok(())
}

#[test]
fn strict_binary() -> Result<()> {
    let strict = Settings { format: &STRICT_FORMAT, limits: &DEFAULT_LIMITS };
    let tags = read_str_with("tag [YmluYXJ5]", strict)?;
    assert_eq!(tags[0].values, vec![Literal::Binary(b"binary".to_vec())]);
    let e = read_str_with("tag [YmluYXJ5=]", strict).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::BadLiteral);
    // best effort without strict
    assert_eq!(values("tag [YmluYXJ5=]")?, vec![Literal::Binary(b"binary".to_vec())]);
    Ok(())
}

#[test]
fn kinds() -> Result<()> {
    let kinds: Vec<LiteralKind> = values(
        "tag 1 1L 1.5f 1.5 1.5bd true null \"s\" 'c' [AA==] 2020/1/1 2020/1/1 1:00-UTC 1:00:00")?
        .iter()
        .map(|v| v.kind())
        .collect();
    assert_eq!(kinds, LiteralKind::ALL.to_vec());
    for k in LiteralKind::ALL {
        assert_eq!(LiteralKind::try_from(k.name()), Ok(k));
    }
    Ok(())
}

#[test]
fn canonical_form_reads_back() -> Result<()> {
    let vals = values(
        "tag 7 -7L 2.5f -0.125 10.50bd off null \"two\\nlines\" 'é' [AAFc/w==] \
         2024/2/29 2024/2/29 23:59:59.999-08:00 2024/2/29 8:15 -1d:02:03:04.005")?;
    for v in &vals {
        let text = v.to_string();
        let back = Literal::from_canonical(v.kind(), &text)?;
        // local date/times come back with the offset made explicit
        assert_eq!(back.to_string(), text);
        if v.kind() != LiteralKind::DateTime {
            assert_eq!(&back, v);
        }
    }
    assert!(Literal::from_canonical(LiteralKind::Int32, "x").is_err());
    assert!(Literal::from_canonical(LiteralKind::Decimal, "1.").is_err());
    assert!(Literal::from_canonical(LiteralKind::Char, "ab").is_err());
    Ok(())
}
