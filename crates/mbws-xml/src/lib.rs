//! XML codec for the MusicBrainz web service.
//!
//! Decodes service responses into a generic [`Value`] tree and encodes
//! metadata submission documents (barcodes, fingerprints, tags, ratings).
//! The crate knows nothing about which requests are legal; that is the
//! client's concern.

mod decode;
mod encode;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub use decode::parse_message;
pub use encode::{
    make_barcode_request, make_echoprint_request, make_isrc_request, make_puid_request,
    make_rating_request, make_tag_request,
};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML document: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error("malformed character reference: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("bad attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("unexpected end of document")]
    Truncated,

    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("failed to write document: {0}")]
    Write(#[from] std::io::Error),
}

/// Generic nested value decoded from a service response.
///
/// Element attributes and child elements become [`Value::Map`] entries;
/// children repeated under the same name are grouped into a
/// [`Value::List`]; leaf elements decode to [`Value::Text`]. Text content
/// of an element that also carries attributes or children is stored under
/// the `"text"` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Look up a key in a [`Value::Map`].
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The element sequence of a [`Value::List`]; a non-repeated element
    /// is returned as a one-element slice so list-or-single children can
    /// be treated uniformly.
    pub fn as_list(&self) -> &[Value] {
        match self {
            Value::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}
