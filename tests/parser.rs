use anyhow::{Result, bail};
use sdlstream::debug::{record_str, Recorder};
use sdlstream::parse::{Attribute, ErrorKind, Handler, Handlers, Parser,
                       ParseErrorWithLocation};
use sdlstream::pos::Pos;
use sdlstream::settings::{Format, Limits, Settings, DEFAULT_LIMITS, SDL_FORMAT};
use sdlstream::value::Literal;
use std::cell::Cell;
use std::io::Write;
use std::rc::Rc;

fn recorder(settings: Settings<'_>) -> Parser<'_, String> {
    Parser::with_settings(Rc::new(Recorder), String::new(), settings)
}

#[test]
fn nesting() {
    assert_eq!(record_str("outer { inner }"),
               "(outer\n(inner\ninner)\nouter)\n");
    assert_eq!(record_str("first { second { third } }"),
               "(first\n(second\n(third\nthird)\nsecond)\nfirst)\n");
}

#[test]
fn sequences() {
    assert_eq!(record_str("one; two\n three\n\nfour"),
               "(one\none)\n(two\ntwo)\n(three\nthree)\n(four\nfour)\n");
    assert_eq!(record_str("first { second; third\n }"),
               "(first\n(second\nsecond)\n(third\nthird)\nfirst)\n");
    assert_eq!(record_str("a {\n}\n;;\nb"),
               "(a\na)\n(b\nb)\n");
}

#[test]
fn empty_documents() {
    assert_eq!(record_str(""), "");
    assert_eq!(record_str("\n\n  # nothing\n;"), "");
}

#[test]
fn values_and_attributes() {
    assert_eq!(record_str("tag 1 \"two\" a=true b='c'"),
               "(tag,int32:1,string:two,a=boolean:true,b=char:c\ntag)\n");
    assert_eq!(record_str("tag a=1 a=2"),
               "(tag,a=int32:1,a=int32:2\ntag)\n");
}

#[test]
fn anonymous_tags() {
    assert_eq!(record_str("\"hello\" 5 x=1"),
               "(content,string:hello,int32:5,x=int32:1\ncontent)\n");
    assert_eq!(record_str("-3 { 4 }"),
               "(content,int32:-3\n(content,int32:4\ncontent)\ncontent)\n");
}

#[test]
fn anonymous_tag_name_from_format() {
    let format = Format { anonymous_tag_name: "anon", ..SDL_FORMAT };
    let mut p = recorder(Settings { format: &format, limits: &DEFAULT_LIMITS });
    p.parse_str("1").unwrap();
    assert_eq!(p.into_state(), "(anon,int32:1\nanon)\n");
}

#[test]
fn anonymous_tag_without_value() {
    assert_eq!(record_str("tag ="),
               "E: At least one value required for an anonymous tag \
                in <string>, line 1, column 1\n");
    let e = sdlstream::read::read_str("a 1\nb=2").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Malformed);
    assert_eq!(e.pos(), Some(Pos { line: 2, col: 1 }));
}

#[test]
fn malformed_structure() {
    assert_eq!(record_str("outer {\n inner\n"),
               "(outer\n(inner\ninner)\nE: expected '}', got end of input \
                in <string>, line 3, column 1\n");
    assert_eq!(record_str("}"),
               "E: expected identifier or value, got '}' in <string>, line 1, column 1\n");
    assert_eq!(record_str("a { b } c"),
               "(a\n(b\nb)\na)\nE: expected line break, ';' or end of input, got c \
                in <string>, line 1, column 9\n");
    assert_eq!(record_str("a x y"),
               "E: expected '=', got y in <string>, line 1, column 5\n");
}

#[test]
fn error_details() {
    let mut p = recorder(Settings::default());
    let e = p.parse_str("ok 1\nbad \"open").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::MissingDelimiter);
    assert_eq!(e.source_name(), "<string>");
    assert_eq!((e.line(), e.column()), (Some(2), Some(5)));
    assert_eq!(e.message(), "missing delimiter '\"'");
    assert_eq!(e.to_string(), "missing delimiter '\"' in <string>, line 2, column 5");
    assert_eq!(p.state(),
               "(ok,int32:1\nok)\nE: missing delimiter '\"' in <string>, line 2, column 5\n");

    let e = sdlstream::read::read_str("tag 1 + 2").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnexpectedChar);
}

#[test]
fn nesting_limit() {
    let limits = Limits { max_depth: 2 };
    let mut p = recorder(Settings { format: &SDL_FORMAT, limits: &limits });
    let e = p.parse_str("a { b { c { d } } }").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Malformed);
    assert_eq!(e.message(), "nesting too deep");
    assert_eq!(e.pos(), Some(Pos { line: 1, col: 11 }));

    let mut p = recorder(Settings { format: &SDL_FORMAT, limits: &limits });
    assert!(p.parse_str("a { b { c } }").is_ok());
}

#[test]
fn deepest_nesting_fits_a_small_stack() {
    let nested = |depth: usize| {
        format!("{}b{}", "a { ".repeat(depth), " }".repeat(depth))
    };
    let max = DEFAULT_LIMITS.max_depth as usize;
    let (deepest, too_deep) = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let deepest = sdlstream::read::read_str(&nested(max)).map(|tags| {
                let mut depth = 0;
                let mut tag = &tags[0];
                while let Some(child) = tag.children.first() {
                    depth += 1;
                    tag = child;
                }
                (tags.len(), depth, tag.name.to_string())
            }).map_err(|e| e.kind());
            let too_deep = sdlstream::read::read_str(&nested(max + 1))
                .map(|tags| tags.len()).map_err(|e| e.kind());
            (deepest, too_deep)
        })
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(deepest, Ok((1, max, "b".to_string())));
    assert_eq!(too_deep, Err(ErrorKind::Malformed));
}

#[test]
fn semicolons_optional() {
    let format = Format { semicolon_separator: false, ..SDL_FORMAT };
    let mut p = recorder(Settings { format: &format, limits: &DEFAULT_LIMITS });
    let e = p.parse_str("a; b").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::UnexpectedChar);
}

#[test]
fn format_switches_combine() {
    let format = Format { semicolon_separator: false, strict_base64: true, ..SDL_FORMAT };
    let mut p = recorder(Settings { format: &format, limits: &DEFAULT_LIMITS });
    assert_eq!(p.parse_str("a [YmluYXJ5=]").unwrap_err().kind(), ErrorKind::BadLiteral);
    assert_eq!(p.parse_str("a [YmluYXJ5]\nb; c").unwrap_err().kind(),
               ErrorKind::UnexpectedChar);
    assert!(p.into_state().contains("\n(a,binary:binary\na)\nE: "));
}

#[test]
fn parser_is_reusable() -> Result<()> {
    let mut p = recorder(Settings::default());
    p.parse_str("a")?;
    p.parse_str("b 1")?;
    assert_eq!(p.state(), "(a\na)\n(b,int32:1\nb)\n");
    p.state_mut().clear();
    p.parse_bytes(b"c")?;
    assert_eq!(p.into_state(), "(c\nc)\n");
    Ok(())
}

#[test]
fn invalid_utf8_is_reported_before_any_event() {
    let mut p = recorder(Settings::default());
    let e = p.parse_bytes(b"tag 1\n\xff").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Io);
    assert_eq!(e.pos(), None);
    let transcript = p.into_state();
    assert!(transcript.starts_with("E: "), "{}", transcript);
    assert_eq!(transcript.lines().count(), 1);
}

#[test]
fn file_source() -> Result<()> {
    let mut fh = tempfile::NamedTempFile::new()?;
    fh.write_all(b"server \"main\" {\r\n    port 8080\r\n}\r\n")?;
    fh.flush()?;
    let mut p = recorder(Settings::default());
    p.parse_file(fh.path())?;
    assert_eq!(p.state(),
               "(server,string:main\n(port,int32:8080\nport)\nserver)\n");

    let mut bad = tempfile::NamedTempFile::new()?;
    bad.write_all(b"a 1\nb \xff\n")?;
    bad.flush()?;
    let mut p = recorder(Settings::default());
    let e = p.parse_file(bad.path()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Io);
    assert_eq!(e.source_name(), bad.path().display().to_string());
    Ok(())
}

#[test]
fn missing_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("missing.sdl");
    let mut p = recorder(Settings::default());
    let e = p.parse_file(&path).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Io);
    assert_eq!(e.pos(), None);
    assert!(p.state().starts_with("E: cannot open"));
    Ok(())
}


// A handler that fails on tags named "bad"
struct Picky;

impl Handler<Vec<String>> for Picky {
    fn start_tag(
        &self,
        cx: &mut Handlers<Vec<String>>,
        name: &str,
        _values: &[Literal],
        _attributes: &[Attribute],
    ) -> Result<()> {
        if name == "bad" {
            bail!("tag {:?} is not allowed", name)
        }
        cx.state_mut().push(name.to_string());
        Ok(())
    }

    fn error(&self, cx: &mut Handlers<Vec<String>>, err: &ParseErrorWithLocation) {
        cx.state_mut().push(format!("error {:?}", err.kind()));
    }
}

#[test]
fn handler_errors_stop_the_parse() {
    let mut p = Parser::new(Rc::new(Picky), Vec::new());
    let e = p.parse_str("good\n  bad 1\nnever").unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Handler);
    assert_eq!(e.pos(), Some(Pos { line: 2, col: 3 }));
    assert_eq!(e.message(), "tag \"bad\" is not allowed");
    assert_eq!(p.into_state(), vec!["good", "error Handler"]);
}

#[test]
fn handlers_without_callbacks() -> Result<()> {
    struct Nothing;
    impl Handler<()> for Nothing {}
    let mut p = Parser::new(Rc::new(Nothing), ());
    p.parse_str("a 1 { b }")?;
    assert!(p.parse_str("a {").is_err());
    Ok(())
}


// Collects tag names; hands the contents of `script` blocks to
// `Script`, which counts them and reports back when the block ends.
struct Outline;

impl Handler<Vec<String>> for Outline {
    fn start_tag(
        &self,
        cx: &mut Handlers<Vec<String>>,
        name: &str,
        _values: &[Literal],
        _attributes: &[Attribute],
    ) -> Result<()> {
        cx.state_mut().push(format!("start {}", name));
        if name == "script" {
            cx.push(Rc::new(Script { depth: Cell::new(0) }), Vec::new());
        }
        Ok(())
    }

    fn end_tag(&self, cx: &mut Handlers<Vec<String>>, name: &str) -> Result<()> {
        cx.state_mut().push(format!("end {}", name));
        Ok(())
    }
}

struct Script {
    depth: Cell<u32>,
}

impl Handler<Vec<String>> for Script {
    fn start_tag(
        &self,
        cx: &mut Handlers<Vec<String>>,
        name: &str,
        _values: &[Literal],
        _attributes: &[Attribute],
    ) -> Result<()> {
        self.depth.set(self.depth.get() + 1);
        cx.state_mut().push(name.to_string());
        Ok(())
    }

    fn end_tag(&self, cx: &mut Handlers<Vec<String>>, name: &str) -> Result<()> {
        if self.depth.get() == 0 {
            let inner = cx.pop();
            cx.state_mut().push(format!("end {} with {}", name, inner.join(" ")));
        } else {
            self.depth.set(self.depth.get() - 1);
        }
        Ok(())
    }
}

#[test]
fn handler_stack() -> Result<()> {
    let mut p = Parser::new(Rc::new(Outline), Vec::new());
    p.parse_str("page {\n  script {\n    let 1\n    if { call }\n  }\n  footer\n}")?;
    assert_eq!(p.handlers().depth(), 0);
    assert_eq!(p.into_state(),
               vec!["start page",
                    "start script",
                    "end script with let if call",
                    "start footer",
                    "end footer",
                    "end page"]);
    Ok(())
}

#[test]
fn push_before_parsing() -> Result<()> {
    let mut p = Parser::new(Rc::new(Outline), vec!["outer".to_string()]);
    p.push(Rc::new(Script { depth: Cell::new(0) }), Vec::new());
    p.parse_str("x { y }")?;
    assert_eq!(p.state(), &vec!["x", "y"]);
    let inner = p.pop();
    assert_eq!(inner, vec!["x", "y"]);
    assert_eq!(p.state(), &vec!["outer"]);
    Ok(())
}

#[test]
#[should_panic]
fn pop_without_push() {
    let mut p = Parser::new(Rc::new(Outline), Vec::new());
    p.pop();
}


// Fails unless every end_tag closes the innermost open tag
struct Balance;

impl Handler<Vec<String>> for Balance {
    fn start_tag(
        &self,
        cx: &mut Handlers<Vec<String>>,
        name: &str,
        _values: &[Literal],
        _attributes: &[Attribute],
    ) -> Result<()> {
        cx.state_mut().push(name.to_string());
        Ok(())
    }

    fn end_tag(&self, cx: &mut Handlers<Vec<String>>, name: &str) -> Result<()> {
        match cx.state_mut().pop() {
            Some(open) if open == name => Ok(()),
            other => bail!("end of {:?} while {:?} is open", name, other)
        }
    }
}

#[test]
fn events_are_balanced() -> Result<()> {
    let mut p = Parser::new(Rc::new(Balance), Vec::new());
    p.parse_str(include_str!("t-input.sdl"))?;
    p.parse_str("a { b { c; d { e } } f }\ng")?;
    assert!(p.state().is_empty());
    Ok(())
}

#[test]
fn same_source_same_events() {
    let src = "tag 1 x=2 { inner 2020/1/1 [YQ==] }\n\"anon\"";
    assert_eq!(record_str(src), record_str(src));
}

#[test]
fn scenarios() {
    assert_eq!(record_str("tag"), "(tag\ntag)\n");
    assert_eq!(record_str("tag 58 -5 2L 69.2 true null \"abc\""),
               "(tag,int32:58,int32:-5,int64:2,float64:69.2,boolean:true,\
                null:null,string:abc\ntag)\n");
    assert_eq!(record_str("tag [YmluYXJ5]"), "(tag,binary:binary\ntag)\n");
}
