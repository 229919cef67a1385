// SPDX-License-Identifier: GPL-3.0-or-later

//! Client library for the MusicBrainz XML web service.
//!
//! Requests are validated against the service schema before anything
//! goes on the wire: include tokens, browse includes, release filters,
//! and search fields are all checked per entity kind, and misuse is
//! reported as a typed usage error. Outbound traffic is throttled by a
//! continuous token bucket (one request per second by default, the
//! MusicBrainz guideline). Responses come back as generic [`Value`]
//! trees decoded by the `mbws-xml` codec.
//!
//! The service requires clients to identify themselves, so a user agent
//! must be configured before the first request:
//!
//! ```no_run
//! # use mbws::{MusicBrainzClient, SearchQuery};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MusicBrainzClient::builder()
//!     .user_agent("my-app", "0.1", Some("https://example.org/my-app"))
//!     .build()?;
//! let results = client
//!     .search_artists(&SearchQuery::new("").field("artist", "Radiohead"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod request;
pub mod schema;
mod validate;

pub use client::{MusicBrainzClient, MusicBrainzClientBuilder};
pub use error::{Error, Result};
pub use mbws_xml::{Value, XmlError};
pub use rate_limiter::{RateLimitPolicy, RateLimiter};
pub use request::{ReleaseFilter, SearchQuery};
pub use schema::{BrowseEntity, Entity};
