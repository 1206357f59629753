//! `.enex` export documents.
//!
//! Renders an [`ExportedDocument`] into the `en-export` XML layout and
//! reads it back for splitting. The layout is fixed:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <en-export export-date="20230621T120000Z" application="Evernote" version="10.44.8">
//!   <note>
//!     <title>Trips - France</title>
//!     <created>20230601T090000Z</created>
//!     <updated>20230621T113000Z</updated>
//!     <tags>travel,europe</tags>
//!     <content>&lt;en-note&gt;...&lt;/en-note&gt;</content>
//!   </note>
//! </en-export>
//! ```
//!
//! Note content is written as escaped text so it reads back byte-for-byte.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

use crate::models::ExportedDocument;

/// Timestamp layout used for `export-date`, `created`, and `updated`.
pub const ENEX_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub const APPLICATION: &str = "Evernote";
pub const FORMAT_VERSION: &str = "10.44.8";

/// Tag text used when a note has no tags, so the element is never empty.
const EMPTY_TAGS: &str = " ";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Elements of ENML that end a block of text.
const BLOCK_ELEMENTS: &[&[u8]] = &[
    b"div", b"p", b"br", b"li", b"tr", b"h1", b"h2", b"h3", b"h4", b"h5", b"h6", b"en-todo",
    b"blockquote", b"pre",
];

pub fn format_time(t: &DateTime<Utc>) -> String {
    t.format(ENEX_TIME_FORMAT).to_string()
}

pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), ENEX_TIME_FORMAT)
        .ok()
        .map(|n| n.and_utc())
}

/// Render a document as pretty-printed `.enex` XML.
pub fn render(doc: &ExportedDocument, exported_at: &DateTime<Utc>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let export_date = format_time(exported_at);
    let mut root = BytesStart::new("en-export");
    root.push_attribute(("export-date", export_date.as_str()));
    root.push_attribute(("application", APPLICATION));
    root.push_attribute(("version", FORMAT_VERSION));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("note")))?;

    let title = format!("{} - {}", doc.notebook, doc.title);
    let tags = if doc.tags.is_empty() {
        EMPTY_TAGS.to_string()
    } else {
        doc.tags.join(",")
    };

    write_text_element(&mut writer, "title", &title)?;
    write_text_element(&mut writer, "created", &format_time(&doc.created))?;
    write_text_element(&mut writer, "updated", &format_time(&doc.updated))?;
    write_text_element(&mut writer, "tags", &tags)?;
    write_text_element(&mut writer, "content", &doc.content)?;

    writer.write_event(Event::End(BytesEnd::new("note")))?;
    writer.write_event(Event::End(BytesEnd::new("en-export")))?;

    let mut xml = String::from_utf8(writer.into_inner()).context("rendered enex is not UTF-8")?;
    xml.push('\n');
    Ok(xml)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// A note read back from an `.enex` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnexNote {
    pub export_date: Option<String>,
    /// Stored title, i.e. `"<notebook> - <title>"`.
    pub title: String,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub content: String,
}

/// Parse the first `note` of an `.enex` document.
pub fn parse(xml: &str) -> Result<EnexNote> {
    let mut reader = Reader::from_str(xml);
    let mut note = EnexNote::default();
    let mut seen_note = false;
    let mut field: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().context("malformed enex document")? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "en-export" => {
                        for attr in e.attributes() {
                            let attr = attr?;
                            if attr.key.as_ref() == b"export-date" {
                                note.export_date = Some(attr.unescape_value()?.to_string());
                            }
                        }
                    }
                    "note" => seen_note = true,
                    _ if seen_note => {
                        field = Some(name);
                        text.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(t) if field.is_some() => {
                text.push_str(&t.unescape()?);
            }
            Event::CData(c) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == b"note" {
                    break;
                }
                if let Some(f) = field.take() {
                    assign_field(&mut note, &f, std::mem::take(&mut text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_note {
        bail!("enex document has no <note> element");
    }
    Ok(note)
}

fn assign_field(note: &mut EnexNote, field: &str, value: String) {
    match field {
        "title" => note.title = value,
        "created" => note.created = parse_time(&value),
        "updated" => note.updated = parse_time(&value),
        "tags" => {
            note.tags = value
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        }
        "content" => note.content = value,
        _ => {}
    }
}

/// Flatten ENML note content to plain text, one block per paragraph.
///
/// Content that is not well-formed XML falls back to a tag strip.
pub fn enml_to_text(content: &str) -> String {
    let mut reader = Reader::from_str(content);
    let mut out = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => match t.unescape() {
                Ok(s) => out.push_str(&s),
                Err(_) => out.push_str(&String::from_utf8_lossy(&t)),
            },
            Ok(Event::CData(c)) => out.push_str(&String::from_utf8_lossy(&c)),
            Ok(Event::End(e)) if is_block(e.name().as_ref()) => out.push_str("\n\n"),
            Ok(Event::Empty(e)) if is_block(e.name().as_ref()) => out.push_str("\n\n"),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return normalize_blank_lines(&TAG_RE.replace_all(content, "\n\n")),
        }
    }

    normalize_blank_lines(&out)
}

fn is_block(name: &[u8]) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

fn normalize_blank_lines(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
