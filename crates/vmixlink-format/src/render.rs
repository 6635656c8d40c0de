//! Payload renderers

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use vmixlink_store::{Items, Scalar};

use crate::error::{FormatError, Result};
use crate::format::Format;

const XML_ROOT: &str = "data";
const XML_INSTANCE: &str = "item";

/// Render a payload in the requested format
///
/// An empty payload renders as one empty mapping, so the consumer always gets
/// a well-formed document.
pub fn render(payload: &[Items], format: Format) -> Result<Vec<u8>> {
    let empty = [Items::new()];
    let payload = if payload.is_empty() { &empty[..] } else { payload };

    match format {
        Format::Json => render_json(payload),
        Format::Xml => render_xml(payload),
        Format::Text => Ok(render_text(payload).into_bytes()),
    }
}

fn render_json(payload: &[Items]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(payload)?)
}

fn render_text(payload: &[Items]) -> String {
    payload
        .iter()
        .map(|items| {
            items
                .iter()
                .map(|(key, value)| format!("{key}: {value}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn render_xml(payload: &[Items]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    match payload {
        [items] if items.is_empty() => {
            write(&mut writer, Event::Empty(BytesStart::new(XML_ROOT)))?;
        }
        [items] => {
            write(&mut writer, Event::Start(BytesStart::new(XML_ROOT)))?;
            write_items(&mut writer, items)?;
            write(&mut writer, Event::End(BytesEnd::new(XML_ROOT)))?;
        }
        instances => {
            write(&mut writer, Event::Start(BytesStart::new(XML_ROOT)))?;
            for items in instances {
                if items.is_empty() {
                    write(&mut writer, Event::Empty(BytesStart::new(XML_INSTANCE)))?;
                    continue;
                }
                write(&mut writer, Event::Start(BytesStart::new(XML_INSTANCE)))?;
                write_items(&mut writer, items)?;
                write(&mut writer, Event::End(BytesEnd::new(XML_INSTANCE)))?;
            }
            write(&mut writer, Event::End(BytesEnd::new(XML_ROOT)))?;
        }
    }

    Ok(writer.into_inner())
}

fn write_items(writer: &mut Writer<Vec<u8>>, items: &Items) -> Result<()> {
    for (key, value) in items {
        let name = xml_element_name(key);
        match value {
            Scalar::Null => write(writer, Event::Empty(BytesStart::new(name.as_str())))?,
            value => {
                let raw = value.to_string();
                let text = xml_text(&raw);
                write(writer, Event::Start(BytesStart::new(name.as_str())))?;
                write(writer, Event::Text(BytesText::new(&text)))?;
                write(writer, Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
    }
    Ok(())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(|e| FormatError::Xml {
        message: e.to_string(),
    })
}

/// Replace characters XML 1.0 cannot carry with U+FFFD
///
/// Allowed: tab, newline, carriage return and everything from U+0020 up,
/// except U+FFFE and U+FFFF.
fn xml_text(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}');
    if text.chars().all(allowed) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if allowed(c) { c } else { char::REPLACEMENT_CHARACTER })
            .collect(),
    )
}

/// Turn an arbitrary key into a valid XML element name
///
/// Characters outside `[A-Za-z0-9_.-]` become `_`; a name that would start
/// with a digit, `-` or `.` gets a leading `_`.
pub fn xml_element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match name.chars().next() {
        None => name.push('_'),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => name.insert(0, '_'),
        _ => {}
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoreboard() -> Items {
        let mut items = Items::new();
        items.insert("home", "Lions");
        items.insert("score", 3);
        items.insert("live", true);
        items
    }

    fn as_string(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_json_is_pretty_array_of_one() {
        let out = as_string(render(&[scoreboard()], Format::Json).unwrap());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"home": "Lions", "score": 3, "live": true}])
        );
        assert!(out.starts_with("[\n  {\n    \"home\""));
    }

    #[test]
    fn test_empty_payload_renders_empty_documents() {
        assert_eq!(as_string(render(&[], Format::Json).unwrap()), "[\n  {}\n]");
        assert_eq!(as_string(render(&[], Format::Text).unwrap()), "");

        let xml = as_string(render(&[], Format::Xml).unwrap());
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.trim_end().ends_with("<data/>"));
    }

    #[test]
    fn test_text_lines() {
        let out = as_string(render(&[scoreboard()], Format::Text).unwrap());
        assert_eq!(out, "home: Lions\nscore: 3\nlive: true");
    }

    #[test]
    fn test_text_separates_instances() {
        let mut second = Items::new();
        second.insert("note", Scalar::Null);
        let out = as_string(render(&[scoreboard(), second], Format::Text).unwrap());
        assert_eq!(out, "home: Lions\nscore: 3\nlive: true\n---\nnote: null");
    }

    #[test]
    fn test_xml_elements_per_key() {
        let out = as_string(render(&[scoreboard()], Format::Xml).unwrap());
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains("<data>"));
        assert!(out.contains("  <home>Lions</home>"));
        assert!(out.contains("<score>3</score>"));
        assert!(out.contains("<live>true</live>"));
        assert!(out.trim_end().ends_with("</data>"));
    }

    #[test]
    fn test_xml_escapes_text_and_sanitizes_names() {
        let mut items = Items::new();
        items.insert("1st place", "<Tom & Jerry>");
        items.insert("empty", Scalar::Null);
        let out = as_string(render(&[items], Format::Xml).unwrap());

        assert!(out.contains("<_1st_place>&lt;Tom &amp; Jerry&gt;</_1st_place>"));
        assert!(out.contains("<empty/>"));
    }

    #[test]
    fn test_xml_replaces_forbidden_control_characters() {
        let mut items = Items::new();
        items.insert("k", "a\u{1}b\u{FFFF}c\td");
        let out = as_string(render(&[items], Format::Xml).unwrap());

        assert!(out.contains("<k>a\u{FFFD}b\u{FFFD}c\td</k>"));
        assert!(!out.contains('\u{1}'));
    }

    #[test]
    fn test_xml_multiple_instances_are_items() {
        let mut second = Items::new();
        second.insert("home", "Bears");
        let out = as_string(render(&[scoreboard(), second], Format::Xml).unwrap());
        assert_eq!(out.matches("<item>").count(), 2);
        assert!(out.contains("<home>Bears</home>"));
    }

    #[test]
    fn test_xml_element_name() {
        assert_eq!(xml_element_name("score"), "score");
        assert_eq!(xml_element_name("team-a.name"), "team-a.name");
        assert_eq!(xml_element_name("2nd"), "_2nd");
        assert_eq!(xml_element_name("a b/c"), "a_b_c");
        assert_eq!(xml_element_name(""), "_");
    }
}
