use core_render::{Interpreter, RenderOptions, Template, substitute};
use core_text::codec::Target;
use core_text::width::visible_length;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing::subscriber::with_default;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl<'a> Write for LockedWriter<'a> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = LockedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            guard: self.inner.lock().expect("log buffer poisoned"),
        }
    }
}

fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A message-header screen: colored frame, two markers, fixed-width fields.
const HEADER: &[u8] = b"|CL|09\xDA\xC4\xC4\xC4\xBF\r\n\
|15From:|07 ~FR@FROM|L12@\r\n\
|15Subj:|07 ~SJ@SUBJ:16@\r\n\
|15Time:|07 @TIME|R###@";

#[test]
fn header_screen_fields_and_render() {
    let t = Template::from_bytes("header", HEADER);

    let from = t.field("FR").expect("FR marker");
    assert_eq!((from.row, from.col), (2, 7));
    assert_eq!(from.style, "\x1b[0;37m");
    assert_eq!(from.goto(), "\x1b[2;7H");

    let subj = t.field("SJ").expect("SJ marker");
    assert_eq!((subj.row, subj.col), (3, 7));

    let time = t.locate("TIME").expect("TIME placeholder");
    assert_eq!((time.row, time.col), (4, 7));
    assert_eq!(t.style_at(1, 1).as_deref(), Some("\x1b[0;1;31m"));

    let v = values(&[
        ("FROM", "Sysop"),
        ("SUBJ", "Weekly maintenance window"),
        ("TIME", "3:04 PM"),
    ]);
    let rendered = t.render(&v);
    let lines: Vec<&str> = rendered.split("\r\n").collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("┌───┐"));
    assert_eq!(lines[1], "\x1b[0;1;37mFrom:\x1b[0;37m Sysop       ");
    assert_eq!(lines[2], "\x1b[0;1;37mSubj:\x1b[0;37m Weekly maintenan");
    assert_eq!(lines[3], "\x1b[0;1;37mTime:\x1b[0;37m     3:04 PM");
}

#[test]
fn unknown_placeholder_survives_render() {
    let t = Template::from_bytes("plain", b"clock @Q|R8@");
    assert_eq!(t.render(&values(&[("T", "now")])), "clock @Q|R8@");
}

#[test]
fn cp437_target_substitutes_unmappable() {
    let t = Template::from_bytes("plain", b"\xB0 @N@");
    let opts = RenderOptions {
        target: Target::Cp437,
        placeholder: '#',
    };
    let out = t.render_bytes(&values(&[("N", "日本")]), &opts);
    assert_eq!(out, b"\xB0 ##".to_vec());
}

#[test]
fn cp437_interpreter_keeps_raw_bytes() {
    let opts = RenderOptions {
        target: Target::Cp437,
        placeholder: '?',
    };
    let pass = opts.interpreter().run(b"\xC9\xCD~AB\xBB");
    assert_eq!(pass.output, b"\xC9\xCD\xBB".to_vec());
    assert_eq!(pass.cursor.position(), (1, 4));
}

#[test]
fn malformed_csi_logged_under_interpreter_target() {
    let (writer, buffer) = {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (BufferWriter { inner: buf.clone() }, buf)
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .with_writer(writer)
        .finish();
    let pass = with_default(subscriber, || Interpreter::new(Target::Utf8).run(b"\x1b[3\x07x"));
    assert_eq!(pass.output, b"\x1b[3\x07x".to_vec());
    let log = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(log.contains("DEBUG render.interpreter:"));
    assert!(log.contains("malformed_csi_recovered"));
}

proptest! {
    #[test]
    fn colon_width_is_exact(value in "[ -~]{0,40}", width in 1usize..40) {
        let text = format!("@V:{width}@");
        let out = substitute(&text, &values(&[("V", value.as_str())]));
        prop_assert_eq!(visible_length(&out), width);
    }

    #[test]
    fn text_without_delimiters_unchanged(text in "[^@\u{1b}]{0,60}") {
        let out = substitute(&text, &values(&[("A", "x")]));
        prop_assert_eq!(out, text);
    }
}
