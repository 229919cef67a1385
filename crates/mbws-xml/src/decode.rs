//! Response decoding: service XML into a generic [`Value`] tree.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{Value, XmlError};

/// Parse a web service response document.
///
/// The root element (the service's `<metadata>` wrapper) is stripped; the
/// returned value is the mapping of its content. Fails on malformed or
/// truncated input.
pub fn parse_message(body: &[u8]) -> Result<Value, XmlError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(root) => return parse_element(&mut reader, &root),
            Event::Empty(root) => return Ok(Value::Map(attributes_of(&root)?)),
            Event::Eof => return Err(XmlError::Truncated),
            _ => {}
        }
    }
}

fn local_name_of(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attributes_of(start: &BytesStart) -> Result<BTreeMap<String, Value>, XmlError> {
    let mut map = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        // Namespace declarations carry no payload.
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(name, Value::Text(value));
    }
    Ok(map)
}

fn parse_element<'a>(
    reader: &mut Reader<&'a [u8]>,
    start: &BytesStart<'a>,
) -> Result<Value, XmlError> {
    let mut map = attributes_of(start)?;
    let mut text = String::new();
    let mut children: Vec<(String, Value)> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(child) => {
                let name = local_name_of(&child);
                let value = parse_element(reader, &child)?;
                children.push((name, value));
            }
            Event::Empty(child) => {
                let name = local_name_of(&child);
                let attrs = attributes_of(&child)?;
                let value = if attrs.is_empty() {
                    Value::Text(String::new())
                } else {
                    Value::Map(attrs)
                };
                children.push((name, value));
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::End(_) => break,
            Event::Eof => return Err(XmlError::Truncated),
            _ => {}
        }
    }

    if map.is_empty() && children.is_empty() {
        return Ok(Value::Text(text));
    }

    for (name, value) in children {
        match map.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::List(items) => items.push(value),
                _ => {
                    let first = slot.insert(Value::List(Vec::new()));
                    if let Value::List(items) = slot.get_mut() {
                        items.push(first);
                        items.push(value);
                    }
                }
            },
        }
    }

    if !text.is_empty() {
        map.insert("text".to_string(), Value::Text(text));
    }

    Ok(Value::Map(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_entities() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
            <metadata xmlns="http://musicbrainz.org/ns/mmd-2.0#">
                <artist id="a74b1b7f-71a5-4011-9441-d0b5e4122711" type="Group">
                    <name>Radiohead</name>
                    <sort-name>Radiohead</sort-name>
                    <country>GB</country>
                </artist>
            </metadata>"#;

        let message = parse_message(body).unwrap();
        let artist = message.get("artist").unwrap();
        assert_eq!(
            artist.get("id").and_then(Value::as_text),
            Some("a74b1b7f-71a5-4011-9441-d0b5e4122711")
        );
        assert_eq!(artist.get("type").and_then(Value::as_text), Some("Group"));
        assert_eq!(artist.get("name").and_then(Value::as_text), Some("Radiohead"));
        assert_eq!(artist.get("country").and_then(Value::as_text), Some("GB"));
    }

    #[test]
    fn groups_repeated_children_into_lists() {
        let body = br#"<metadata>
            <release-list count="2">
                <release id="r1"><title>One</title></release>
                <release id="r2"><title>Two</title></release>
            </release-list>
        </metadata>"#;

        let message = parse_message(body).unwrap();
        let list = message.get("release-list").unwrap();
        assert_eq!(list.get("count").and_then(Value::as_text), Some("2"));
        let releases = list.get("release").unwrap().as_list();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[1].get("id").and_then(Value::as_text), Some("r2"));
    }

    #[test]
    fn single_child_is_addressable_as_list() {
        let body = br#"<metadata><release-list><release id="r1"/></release-list></metadata>"#;

        let message = parse_message(body).unwrap();
        let releases = message
            .get("release-list")
            .and_then(|l| l.get("release"))
            .unwrap()
            .as_list();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].get("id").and_then(Value::as_text), Some("r1"));
    }

    #[test]
    fn mixed_text_and_attributes() {
        let body = br#"<metadata><rating votes-count="5">4.35</rating></metadata>"#;

        let message = parse_message(body).unwrap();
        let rating = message.get("rating").unwrap();
        assert_eq!(rating.get("votes-count").and_then(Value::as_text), Some("5"));
        assert_eq!(rating.get("text").and_then(Value::as_text), Some("4.35"));
    }

    #[test]
    fn unescapes_character_references() {
        let body = br#"<metadata><artist><name>Simon &amp; Garfunkel</name></artist></metadata>"#;

        let message = parse_message(body).unwrap();
        assert_eq!(
            message
                .get("artist")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_text),
            Some("Simon & Garfunkel")
        );
    }

    #[test]
    fn truncated_document_is_an_error() {
        let err = parse_message(b"<metadata><artist>").unwrap_err();
        assert!(matches!(err, XmlError::Truncated));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_message(b"not xml at all").is_err());
    }
}
