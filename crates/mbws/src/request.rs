// SPDX-License-Identifier: GPL-3.0-or-later

//! Assembly of the final query parameter set for lookup, search, and
//! browse requests, including Lucene query construction.

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::schema::Entity;
use crate::validate;

/// Lucene special characters escaped in search terms. Field values
/// additionally escape `/`.
const LUCENE_SPECIALS: &str = r#"+-&|!(){}[]^"~*?:\"#;

/// Release status/type filter, legal whenever releases or release groups
/// are part of a query (see `validate::check_filter_and_make_params`).
#[derive(Debug, Clone, Default)]
pub struct ReleaseFilter {
    pub status: Vec<String>,
    pub release_type: Vec<String>,
}

impl ReleaseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, value: impl Into<String>) -> Self {
        self.status.push(value.into());
        self
    }

    pub fn release_type(mut self, value: impl Into<String>) -> Self {
        self.release_type.push(value.into());
        self
    }
}

/// Full-text search request in Lucene syntax.
///
/// With no fields, `query` is passed to the server verbatim (Lucene
/// syntax and all). Once fields are involved, every term is escaped:
/// strict searches quote terms and join them with `AND`, non-strict
/// searches lowercase them and match loosely.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub(crate) query: String,
    pub(crate) fields: Vec<(String, String)>,
    pub(crate) limit: Option<u32>,
    pub(crate) offset: Option<u32>,
    pub(crate) strict: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Constrain a search field; the name must be valid for the entity
    /// being searched (see `schema::allowed_search_fields`).
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Merge validated filter params with the `inc` parameter. `inc` is
/// omitted entirely when no includes were requested.
pub(crate) fn query_params(
    includes: &[&str],
    extra: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut params = extra;
    if !includes.is_empty() {
        params.push(("inc".to_string(), includes.join(" ")));
    }
    params
}

/// Encode the query text and field constraints as one Lucene query
/// string, validating field names along the way.
pub(crate) fn build_search_query(entity: Entity, search: &SearchQuery) -> Result<String> {
    validate::check_search_fields(entity, search.fields.iter().map(|(name, _)| name.as_str()))?;

    let mut parts: Vec<String> = Vec::new();
    if !search.query.is_empty() {
        let clean: String = search.query.nfc().collect();
        if search.fields.is_empty() {
            parts.push(clean);
        } else if search.strict {
            parts.push(format!("\"{}\"", escape_lucene(&clean, false)));
        } else {
            parts.push(escape_lucene(&clean, false).to_lowercase());
        }
    }

    for (name, value) in &search.fields {
        let clean: String = value.nfc().collect();
        let escaped = escape_lucene(&clean, true);
        if escaped.is_empty() {
            continue;
        }
        if search.strict {
            parts.push(format!("{name}:\"{escaped}\""));
        } else {
            // Lowercased to avoid accidental AND / OR operators.
            parts.push(format!("{name}:({})", escaped.to_lowercase()));
        }
    }

    let joined = if search.strict {
        parts.join(" AND ")
    } else {
        parts.join(" ")
    };
    let joined = joined.trim().to_string();
    if joined.is_empty() {
        return Err(Error::EmptySearchQuery);
    }
    Ok(joined)
}

fn escape_lucene(text: &str, escape_slash: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if LUCENE_SPECIALS.contains(c) || (escape_slash && c == '/') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the parameter set for a browse request: exactly one link
/// parameter, pagination only when given, filter params last.
pub(crate) fn browse_params(
    links: &[(&str, Option<String>)],
    limit: Option<u32>,
    offset: Option<u32>,
    filter_params: Vec<(String, String)>,
) -> Result<Vec<(String, String)>> {
    let mut params: Vec<(String, String)> = links
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect();
    if params.len() != 1 {
        let names: Vec<&str> = links.iter().map(|(name, _)| *name).collect();
        return Err(Error::BrowseLink(names.join(", ")));
    }

    if let Some(limit) = limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params.extend(filter_params);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_query_is_passed_through() {
        let search = SearchQuery::new("foo bar");
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, "foo bar");
    }

    #[test]
    fn lucene_syntax_survives_without_fields() {
        let search = SearchQuery::new("artist:(radiohead OR thom) AND country:gb");
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, "artist:(radiohead OR thom) AND country:gb");
    }

    #[test]
    fn non_strict_field_is_escaped_and_lowercased() {
        let search = SearchQuery::new("").field("artist", "Wow!");
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, r"artist:(wow\!)");
    }

    #[test]
    fn strict_field_is_escaped_quoted_and_case_preserved() {
        let search = SearchQuery::new("").field("artist", "Wow!").strict(true);
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, r#"artist:"Wow\!""#);
    }

    #[test]
    fn free_text_is_escaped_once_fields_are_involved() {
        let search = SearchQuery::new("What's Up?").field("arid", "abc");
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, r"what's up\? arid:(abc)");
    }

    #[test]
    fn strict_parts_are_and_joined() {
        let search = SearchQuery::new("OK Computer")
            .field("arid", "a74b1b7f")
            .field("country", "GB")
            .strict(true);
        let query = build_search_query(Entity::Release, &search).unwrap();
        assert_eq!(
            query,
            r#""OK Computer" AND arid:"a74b1b7f" AND country:"GB""#
        );
    }

    #[test]
    fn slash_is_escaped_in_field_values_only() {
        let search = SearchQuery::new("AC/DC").field("artist", "AC/DC");
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, r"ac/dc artist:(ac\/dc)");
    }

    #[test]
    fn empty_field_values_are_skipped() {
        let search = SearchQuery::new("foo").field("artist", "");
        let query = build_search_query(Entity::Artist, &search).unwrap();
        assert_eq!(query, "foo");
    }

    #[test]
    fn empty_query_and_fields_fail() {
        let err = build_search_query(Entity::Artist, &SearchQuery::new("")).unwrap_err();
        assert!(matches!(err, Error::EmptySearchQuery));
    }

    #[test]
    fn invalid_field_fails_before_building() {
        let search = SearchQuery::new("foo").field("barcode", "123");
        let err = build_search_query(Entity::Artist, &search).unwrap_err();
        assert!(matches!(err, Error::InvalidSearchField { .. }));
    }

    #[test]
    fn includes_are_space_joined() {
        let params = query_params(&["releases", "tags"], Vec::new());
        assert_eq!(
            params,
            vec![("inc".to_string(), "releases tags".to_string())]
        );
    }

    #[test]
    fn inc_is_omitted_when_empty() {
        let params = query_params(&[], vec![("status".to_string(), "official".to_string())]);
        assert_eq!(
            params,
            vec![("status".to_string(), "official".to_string())]
        );
    }

    #[test]
    fn browse_requires_exactly_one_link() {
        let none: Vec<(&str, Option<String>)> = vec![("artist", None), ("release", None)];
        assert!(matches!(
            browse_params(&none, None, None, Vec::new()),
            Err(Error::BrowseLink(_))
        ));

        let two = vec![
            ("artist", Some("a".to_string())),
            ("release", Some("r".to_string())),
        ];
        assert!(matches!(
            browse_params(&two, None, None, Vec::new()),
            Err(Error::BrowseLink(_))
        ));

        let one = vec![("artist", Some("a".to_string())), ("release", None)];
        let params = browse_params(&one, Some(25), None, Vec::new()).unwrap();
        assert_eq!(
            params,
            vec![
                ("artist".to_string(), "a".to_string()),
                ("limit".to_string(), "25".to_string()),
            ]
        );
    }

    #[test]
    fn browse_merges_filter_params_last() {
        let links = vec![("artist", Some("a".to_string()))];
        let filter = vec![("status".to_string(), "official".to_string())];
        let params = browse_params(&links, None, Some(10), filter).unwrap();
        assert_eq!(
            params,
            vec![
                ("artist".to_string(), "a".to_string()),
                ("offset".to_string(), "10".to_string()),
                ("status".to_string(), "official".to_string()),
            ]
        );
    }
}
