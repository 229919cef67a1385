//! Submission encoding: metadata documents POSTed back to the service.

use std::collections::BTreeMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::XmlError;

const MMD_NS: &str = "http://musicbrainz.org/ns/mmd-2.0#";

fn open_document() -> Result<Writer<Vec<u8>>, XmlError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut metadata = BytesStart::new("metadata");
    metadata.push_attribute(("xmlns", MMD_NS));
    writer.write_event(Event::Start(metadata))?;
    Ok(writer)
}

fn close_document(mut writer: Writer<Vec<u8>>) -> Result<String, XmlError> {
    writer.write_event(Event::End(BytesEnd::new("metadata")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), XmlError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Document attaching barcodes to releases: release MBID → barcode.
pub fn make_barcode_request(
    release_barcodes: &BTreeMap<String, String>,
) -> Result<String, XmlError> {
    let mut writer = open_document()?;
    writer.write_event(Event::Start(BytesStart::new("release-list")))?;
    for (release, barcode) in release_barcodes {
        let mut element = BytesStart::new("release");
        element.push_attribute(("id", release.as_str()));
        writer.write_event(Event::Start(element))?;
        write_text_element(&mut writer, "barcode", barcode)?;
        writer.write_event(Event::End(BytesEnd::new("release")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("release-list")))?;
    close_document(writer)
}

/// PUID, echoprint, and ISRC submissions share one shape: a recording
/// list where each recording carries a `<kind>-list` of id-only elements.
fn make_recording_id_list_request(
    kind: &str,
    recordings: &BTreeMap<String, Vec<String>>,
) -> Result<String, XmlError> {
    let list_name = format!("{kind}-list");
    let mut writer = open_document()?;
    writer.write_event(Event::Start(BytesStart::new("recording-list")))?;
    for (recording, ids) in recordings {
        let mut element = BytesStart::new("recording");
        element.push_attribute(("id", recording.as_str()));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Start(BytesStart::new(list_name.as_str())))?;
        for id in ids {
            let mut entry = BytesStart::new(kind);
            entry.push_attribute(("id", id.as_str()));
            writer.write_event(Event::Empty(entry))?;
        }
        writer.write_event(Event::End(BytesEnd::new(list_name.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new("recording")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("recording-list")))?;
    close_document(writer)
}

/// Document attaching PUIDs to recordings: recording MBID → PUIDs.
pub fn make_puid_request(
    recording_puids: &BTreeMap<String, Vec<String>>,
) -> Result<String, XmlError> {
    make_recording_id_list_request("puid", recording_puids)
}

/// Document attaching echoprints to recordings.
pub fn make_echoprint_request(
    recording_echoprints: &BTreeMap<String, Vec<String>>,
) -> Result<String, XmlError> {
    make_recording_id_list_request("echoprint", recording_echoprints)
}

/// Document attaching ISRCs to recordings.
pub fn make_isrc_request(
    recording_isrcs: &BTreeMap<String, Vec<String>>,
) -> Result<String, XmlError> {
    make_recording_id_list_request("isrc", recording_isrcs)
}

fn write_tag_list(
    writer: &mut Writer<Vec<u8>>,
    entity: &str,
    tags: &BTreeMap<String, Vec<String>>,
) -> Result<(), XmlError> {
    if tags.is_empty() {
        return Ok(());
    }
    let list_name = format!("{entity}-list");
    writer.write_event(Event::Start(BytesStart::new(list_name.as_str())))?;
    for (id, names) in tags {
        let mut element = BytesStart::new(entity);
        element.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Start(BytesStart::new("user-tag-list")))?;
        for name in names {
            writer.write_event(Event::Start(BytesStart::new("user-tag")))?;
            write_text_element(writer, "name", name)?;
            writer.write_event(Event::End(BytesEnd::new("user-tag")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("user-tag-list")))?;
        writer.write_event(Event::End(BytesEnd::new(entity)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(list_name.as_str())))?;
    Ok(())
}

/// Document submitting user tags for artists and recordings.
pub fn make_tag_request(
    artist_tags: &BTreeMap<String, Vec<String>>,
    recording_tags: &BTreeMap<String, Vec<String>>,
) -> Result<String, XmlError> {
    let mut writer = open_document()?;
    write_tag_list(&mut writer, "artist", artist_tags)?;
    write_tag_list(&mut writer, "recording", recording_tags)?;
    close_document(writer)
}

fn write_rating_list(
    writer: &mut Writer<Vec<u8>>,
    entity: &str,
    ratings: &BTreeMap<String, u8>,
) -> Result<(), XmlError> {
    if ratings.is_empty() {
        return Ok(());
    }
    let list_name = format!("{entity}-list");
    writer.write_event(Event::Start(BytesStart::new(list_name.as_str())))?;
    for (id, rating) in ratings {
        let mut element = BytesStart::new(entity);
        element.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Start(element))?;
        write_text_element(writer, "user-rating", &rating.to_string())?;
        writer.write_event(Event::End(BytesEnd::new(entity)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(list_name.as_str())))?;
    Ok(())
}

/// Document submitting user ratings (0-100) for artists and recordings.
pub fn make_rating_request(
    artist_ratings: &BTreeMap<String, u8>,
    recording_ratings: &BTreeMap<String, u8>,
) -> Result<String, XmlError> {
    let mut writer = open_document()?;
    write_rating_list(&mut writer, "artist", artist_ratings)?;
    write_rating_list(&mut writer, "recording", recording_ratings)?;
    close_document(writer)
}
