// SPDX-License-Identifier: GPL-3.0-or-later

//! Static tables describing the web service schema: which include tokens,
//! browse includes, search fields, and release filters are legal for each
//! entity kind. Pure lookup; validation lives in `validate`.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

/// Entity kinds addressable through the lookup and search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Artist,
    Annotation,
    Label,
    Recording,
    Release,
    ReleaseGroup,
    Work,
    Url,
    Discid,
    Echoprint,
    Puid,
    Isrc,
    Iswc,
    Collection,
}

impl Entity {
    /// The endpoint path segment for this entity kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Annotation => "annotation",
            Self::Label => "label",
            Self::Recording => "recording",
            Self::Release => "release",
            Self::ReleaseGroup => "release-group",
            Self::Work => "work",
            Self::Url => "url",
            Self::Discid => "discid",
            Self::Echoprint => "echoprint",
            Self::Puid => "puid",
            Self::Isrc => "isrc",
            Self::Iswc => "iswc",
            Self::Collection => "collection",
        }
    }

    /// Every entity kind, in table order.
    pub const ALL: [Entity; 14] = [
        Self::Artist,
        Self::Annotation,
        Self::Label,
        Self::Recording,
        Self::Release,
        Self::ReleaseGroup,
        Self::Work,
        Self::Url,
        Self::Discid,
        Self::Echoprint,
        Self::Puid,
        Self::Isrc,
        Self::Iswc,
        Self::Collection,
    ];
}

/// Entity kinds addressable through the browse endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowseEntity {
    Artists,
    Labels,
    Recordings,
    Releases,
    ReleaseGroups,
    Urls,
}

impl BrowseEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artists => "artists",
            Self::Labels => "labels",
            Self::Recordings => "recordings",
            Self::Releases => "releases",
            Self::ReleaseGroups => "release-groups",
            Self::Urls => "urls",
        }
    }

    /// The lookup entity a browse request resolves to (and the endpoint
    /// path segment it is issued against).
    pub fn entity(&self) -> Entity {
        match self {
            Self::Artists => Entity::Artist,
            Self::Labels => Entity::Label,
            Self::Recordings => Entity::Recording,
            Self::Releases => Entity::Release,
            Self::ReleaseGroups => Entity::ReleaseGroup,
            Self::Urls => Entity::Url,
        }
    }

    /// Every browse entity kind, in table order.
    pub const ALL: [BrowseEntity; 6] = [
        Self::Artists,
        Self::Labels,
        Self::Recordings,
        Self::Releases,
        Self::ReleaseGroups,
        Self::Urls,
    ];
}

/// Entity types that can appear on the far end of a relationship.
const RELATABLE_TYPES: [&str; 8] = [
    "area",
    "artist",
    "label",
    "recording",
    "release",
    "release-group",
    "url",
    "work",
];

/// Release status values accepted by the `status` filter.
pub const VALID_RELEASE_STATUSES: [&str; 4] =
    ["official", "promotion", "bootleg", "pseudo-release"];

/// Release type values accepted by the `type` filter.
pub const VALID_RELEASE_TYPES: [&str; 12] = [
    "nat",
    "album",
    "single",
    "ep",
    "compilation",
    "soundtrack",
    "spokenword",
    "interview",
    "audiobook",
    "live",
    "remix",
    "other",
];

/// Base include tokens plus the relation includes, which are legal for
/// every entity kind.
fn with_relations(base: &[&str]) -> HashSet<String> {
    base.iter()
        .map(|inc| inc.to_string())
        .chain(RELATION_INCLUDES.iter().cloned())
        .collect()
}

lazy_static! {
    /// `<type>-rels` include tokens, derived from the relatable types
    /// once at registry construction.
    pub static ref RELATION_INCLUDES: Vec<String> = RELATABLE_TYPES
        .iter()
        .map(|entity| format!("{entity}-rels"))
        .collect();

    static ref INCLUDES: HashMap<Entity, HashSet<String>> = {
        let mut table = HashMap::new();
        table.insert(
            Entity::Artist,
            with_relations(&[
                "recordings", "releases", "release-groups", "works",
                "various-artists", "discids", "media",
                "aliases", "tags", "user-tags", "ratings", "user-ratings",
                "annotation",
            ]),
        );
        table.insert(Entity::Annotation, with_relations(&[]));
        table.insert(
            Entity::Label,
            with_relations(&[
                "releases",
                "discids", "media",
                "aliases", "tags", "user-tags", "ratings", "user-ratings",
                "annotation",
            ]),
        );
        table.insert(
            Entity::Recording,
            with_relations(&[
                "artists", "releases",
                "discids", "media", "artist-credits",
                "tags", "user-tags", "ratings", "user-ratings",
                "annotation", "aliases",
            ]),
        );
        table.insert(
            Entity::Release,
            with_relations(&[
                "artists", "labels", "recordings", "release-groups", "media",
                "artist-credits", "discids", "puids", "echoprints", "isrcs",
                "recording-level-rels", "work-level-rels", "annotation", "aliases",
            ]),
        );
        table.insert(
            Entity::ReleaseGroup,
            with_relations(&[
                "artists", "releases", "discids", "media",
                "artist-credits", "tags", "user-tags", "ratings", "user-ratings",
                "annotation", "aliases",
            ]),
        );
        table.insert(
            Entity::Work,
            with_relations(&[
                "artists",
                "aliases", "tags", "user-tags", "ratings", "user-ratings",
                "annotation",
            ]),
        );
        table.insert(Entity::Url, with_relations(&[]));
        table.insert(
            Entity::Discid,
            with_relations(&[
                "artists", "labels", "recordings", "release-groups", "media",
                "artist-credits", "discids", "puids", "echoprints", "isrcs",
                "recording-level-rels", "work-level-rels",
            ]),
        );
        table.insert(Entity::Echoprint, with_relations(&["artists", "releases"]));
        table.insert(
            Entity::Puid,
            with_relations(&["artists", "releases", "puids", "echoprints", "isrcs"]),
        );
        table.insert(
            Entity::Isrc,
            with_relations(&["artists", "releases", "puids", "echoprints", "isrcs"]),
        );
        table.insert(Entity::Iswc, with_relations(&["artists"]));
        table.insert(Entity::Collection, with_relations(&["releases"]));
        table
    };

    static ref BROWSE_INCLUDES: HashMap<BrowseEntity, HashSet<String>> = {
        let mut table = HashMap::new();
        table.insert(
            BrowseEntity::Releases,
            with_relations(&[
                "artist-credits", "labels", "recordings",
                "release-groups", "media", "discids",
            ]),
        );
        table.insert(
            BrowseEntity::Recordings,
            with_relations(&["artist-credits", "tags", "ratings", "user-tags", "user-ratings"]),
        );
        table.insert(
            BrowseEntity::Labels,
            with_relations(&["aliases", "tags", "ratings", "user-tags", "user-ratings"]),
        );
        table.insert(
            BrowseEntity::Artists,
            with_relations(&["aliases", "tags", "ratings", "user-tags", "user-ratings"]),
        );
        table.insert(BrowseEntity::Urls, with_relations(&[]));
        table.insert(
            BrowseEntity::ReleaseGroups,
            with_relations(&["artist-credits", "tags", "ratings", "user-tags", "user-ratings"]),
        );
        table
    };

    static ref SEARCH_FIELDS: HashMap<Entity, HashSet<&'static str>> = {
        let mut table = HashMap::new();
        table.insert(
            Entity::Annotation,
            HashSet::from(["entity", "name", "text", "type"]),
        );
        table.insert(
            Entity::Artist,
            HashSet::from([
                "arid", "artist", "artistaccent", "alias", "begin", "comment",
                "country", "end", "ended", "gender", "ipi", "sortname", "tag", "type",
            ]),
        );
        table.insert(
            Entity::Label,
            HashSet::from([
                "alias", "begin", "code", "comment", "country", "end", "ended",
                "ipi", "label", "labelaccent", "laid", "sortname", "type", "tag",
            ]),
        );
        table.insert(
            Entity::Recording,
            HashSet::from([
                "arid", "artist", "artistname", "creditname", "comment",
                "country", "date", "dur", "format", "isrc", "number",
                "position", "primarytype", "puid", "qdur", "recording",
                "recordingaccent", "reid", "release", "rgid", "rid",
                "secondarytype", "status", "tnum", "tracks", "tracksrelease",
                "tag", "type",
            ]),
        );
        table.insert(
            Entity::ReleaseGroup,
            HashSet::from([
                "arid", "artist", "artistname", "comment", "creditname",
                "primarytype", "rgid", "releasegroup", "releasegroupaccent",
                "releases", "release", "reid", "secondarytype", "status",
                "tag", "type",
            ]),
        );
        table.insert(
            Entity::Release,
            HashSet::from([
                "arid", "artist", "artistname", "asin", "barcode", "creditname",
                "catno", "comment", "country", "date", "discids",
                "discidsmedium", "format", "laid", "label", "lang", "mediums",
                "primarytype", "puid", "reid", "release", "releaseaccent",
                "rgid", "script", "secondarytype", "status", "tag", "tracks",
                "tracksmedium", "type",
            ]),
        );
        table.insert(
            Entity::Work,
            HashSet::from([
                "alias", "arid", "artist", "comment", "iswc", "lang", "tag",
                "type", "wid", "work", "workaccent",
            ]),
        );
        table
    };

    static ref NO_SEARCH_FIELDS: HashSet<&'static str> = HashSet::new();
}

/// Include tokens legal for a lookup of the given entity kind.
pub fn allowed_includes(entity: Entity) -> &'static HashSet<String> {
    &INCLUDES[&entity]
}

/// Include tokens legal for a browse of the given entity kind.
pub fn allowed_browse_includes(entity: BrowseEntity) -> &'static HashSet<String> {
    &BROWSE_INCLUDES[&entity]
}

/// Search fields legal for the given entity kind; empty for kinds that
/// have no search endpoint.
pub fn allowed_search_fields(entity: Entity) -> &'static HashSet<&'static str> {
    SEARCH_FIELDS.get(&entity).unwrap_or(&NO_SEARCH_FIELDS)
}
