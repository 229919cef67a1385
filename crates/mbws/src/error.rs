// SPDX-License-Identifier: GPL-3.0-or-later

use mbws_xml::XmlError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the MusicBrainz web service client.
///
/// Usage errors (see [`Error::is_usage`]) are raised before any network
/// activity and are safe to fix and retry. Network, response, and
/// authentication errors carry the underlying cause where one exists.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0:?} is not a valid include")]
    InvalidInclude(String),

    #[error("{field:?} is not a valid search field for {entity}")]
    InvalidSearchField { field: String, entity: &'static str },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("set a user agent with MusicBrainzClientBuilder::user_agent before issuing requests")]
    MissingUserAgent,

    #[error("application name and version must not be empty")]
    InvalidUserAgent,

    #[error("at least one query term or search field is required")]
    EmptySearchQuery,

    #[error("browse requires exactly one of: {0}")]
    BrowseLink(String),

    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(&'static str),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("error communicating with the MusicBrainz server")]
    Network(#[from] reqwest::Error),

    #[error("API responded with code {0}")]
    Response(u16),

    #[error("invalid response from the MusicBrainz API")]
    InvalidResponse(#[from] XmlError),

    #[error("authentication rejected by the MusicBrainz server (code {0})")]
    Authentication(u16),
}

impl Error {
    /// True for caller-misuse errors, which are detected before any
    /// request leaves the client.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::InvalidInclude(_)
                | Error::InvalidSearchField { .. }
                | Error::InvalidFilter(_)
                | Error::MissingUserAgent
                | Error::InvalidUserAgent
                | Error::EmptySearchQuery
                | Error::BrowseLink(_)
                | Error::InvalidRateLimit(_)
                | Error::InvalidUrl(_)
        )
    }
}
