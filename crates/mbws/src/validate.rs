// SPDX-License-Identifier: GPL-3.0-or-later

//! Pure request checks against the schema registry. All of these run
//! before a request leaves the client; a failure here has no side
//! effects.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::request::ReleaseFilter;
use crate::schema::{self, BrowseEntity, Entity};

pub(crate) fn check_includes(entity: Entity, includes: &[&str]) -> Result<()> {
    check_includes_against(includes, schema::allowed_includes(entity))
}

pub(crate) fn check_browse_includes(entity: BrowseEntity, includes: &[&str]) -> Result<()> {
    check_includes_against(includes, schema::allowed_browse_includes(entity))
}

fn check_includes_against(includes: &[&str], allowed: &HashSet<String>) -> Result<()> {
    for include in includes {
        if !allowed.contains(*include) {
            return Err(Error::InvalidInclude((*include).to_string()));
        }
    }
    Ok(())
}

pub(crate) fn check_search_fields<'a>(
    entity: Entity,
    fields: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let allowed = schema::allowed_search_fields(entity);
    for field in fields {
        if !allowed.contains(field) {
            return Err(Error::InvalidSearchField {
                field: field.to_string(),
                entity: entity.as_str(),
            });
        }
    }
    Ok(())
}

/// Check the release filter values against their enumerations and the
/// filter against the includes it is legal with, then build the query
/// parameters it contributes.
///
/// A status filter needs releases to be part of the response (a
/// `"releases"` include, or the release entity itself); a type filter
/// additionally accepts release groups.
pub(crate) fn check_filter_and_make_params(
    entity: Entity,
    includes: &[&str],
    filter: &ReleaseFilter,
) -> Result<Vec<(String, String)>> {
    check_filter_values(&filter.status, &schema::VALID_RELEASE_STATUSES)?;
    check_filter_values(&filter.release_type, &schema::VALID_RELEASE_TYPES)?;

    if !filter.status.is_empty() && !includes.contains(&"releases") && entity != Entity::Release {
        return Err(Error::InvalidFilter(
            "can't have a status with no release include".to_string(),
        ));
    }
    if !filter.release_type.is_empty()
        && !includes.contains(&"release-groups")
        && !includes.contains(&"releases")
        && !matches!(entity, Entity::Release | Entity::ReleaseGroup)
    {
        return Err(Error::InvalidFilter(
            "can't have a release type with no releases or release-groups involved".to_string(),
        ));
    }

    let mut params = Vec::new();
    if !filter.status.is_empty() {
        params.push(("status".to_string(), filter.status.join("|")));
    }
    if !filter.release_type.is_empty() {
        params.push(("type".to_string(), filter.release_type.join("|")));
    }
    Ok(params)
}

fn check_filter_values(values: &[String], valid: &[&str]) -> Result<()> {
    for value in values {
        if !valid.contains(&value.as_str()) {
            return Err(Error::InvalidFilter(value.clone()));
        }
    }
    Ok(())
}

/// Whether a request needs the caller's credentials attached.
pub(crate) fn is_auth_required(entity: Entity, includes: &[&str]) -> bool {
    includes.contains(&"user-tags")
        || includes.contains(&"user-ratings")
        || entity == Entity::Collection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_entity_includes_and_relation_includes() {
        assert!(check_includes(Entity::Artist, &["releases", "tags"]).is_ok());
        assert!(check_includes(Entity::Work, &["artist-rels", "url-rels"]).is_ok());
        // Relation includes are legal even for kinds whose base table is empty.
        assert!(check_includes(Entity::Annotation, &["work-rels"]).is_ok());
    }

    #[test]
    fn rejects_unknown_include_naming_the_token() {
        let err = check_includes(Entity::Artist, &["releases", "labels"]).unwrap_err();
        match err {
            Error::InvalidInclude(token) => assert_eq!(token, "labels"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn browse_includes_use_the_browse_table() {
        assert!(check_browse_includes(BrowseEntity::Artists, &["aliases"]).is_ok());
        // "releases" is a lookup include for artist, but not a browse include.
        assert!(check_browse_includes(BrowseEntity::Artists, &["releases"]).is_err());
    }

    #[test]
    fn checks_are_idempotent() {
        for _ in 0..2 {
            assert!(check_includes(Entity::Artist, &["releases"]).is_ok());
            assert!(check_includes(Entity::Artist, &["bogus"]).is_err());
        }
    }

    #[test]
    fn rejects_unknown_search_field() {
        let err = check_search_fields(Entity::Artist, ["arid", "barcode"]).unwrap_err();
        match err {
            Error::InvalidSearchField { field, entity } => {
                assert_eq!(field, "barcode");
                assert_eq!(entity, "artist");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn filter(status: &[&str], release_type: &[&str]) -> ReleaseFilter {
        ReleaseFilter {
            status: status.iter().map(|s| s.to_string()).collect(),
            release_type: release_type.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_values_outside_the_enumerations() {
        let err =
            check_filter_and_make_params(Entity::Release, &[], &filter(&["leaked"], &[]))
                .unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(value) if value == "leaked"));

        let err =
            check_filter_and_make_params(Entity::Release, &[], &filter(&[], &["mixtape"]))
                .unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(value) if value == "mixtape"));
    }

    #[test]
    fn status_needs_releases_involved() {
        // No releases include and not the release entity.
        assert!(
            check_filter_and_make_params(Entity::Work, &[], &filter(&["official"], &[])).is_err()
        );
        // The release entity itself qualifies.
        let params =
            check_filter_and_make_params(Entity::Release, &[], &filter(&["official"], &[]))
                .unwrap();
        assert_eq!(params, vec![("status".to_string(), "official".to_string())]);
        // So does a releases include on another entity.
        assert!(check_filter_and_make_params(
            Entity::Artist,
            &["releases"],
            &filter(&["official", "bootleg"], &[])
        )
        .is_ok());
    }

    #[test]
    fn type_needs_releases_or_release_groups_involved() {
        assert!(check_filter_and_make_params(Entity::Work, &[], &filter(&[], &["album"])).is_err());
        assert!(
            check_filter_and_make_params(Entity::ReleaseGroup, &[], &filter(&[], &["album"]))
                .is_ok()
        );
        assert!(check_filter_and_make_params(
            Entity::Artist,
            &["release-groups"],
            &filter(&[], &["album", "live"])
        )
        .is_ok());
    }

    #[test]
    fn filter_values_are_pipe_joined() {
        let params = check_filter_and_make_params(
            Entity::Release,
            &["release-groups"],
            &filter(&["official", "promotion"], &["album", "ep"]),
        )
        .unwrap();
        assert_eq!(
            params,
            vec![
                ("status".to_string(), "official|promotion".to_string()),
                ("type".to_string(), "album|ep".to_string()),
            ]
        );
    }

    #[test]
    fn empty_filter_contributes_no_params() {
        let params =
            check_filter_and_make_params(Entity::Artist, &[], &ReleaseFilter::default()).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn auth_detection() {
        assert!(is_auth_required(Entity::Artist, &["user-tags"]));
        assert!(is_auth_required(Entity::Recording, &["tags", "user-ratings"]));
        assert!(is_auth_required(Entity::Collection, &[]));
        assert!(!is_auth_required(Entity::Artist, &["tags", "ratings"]));
    }
}
