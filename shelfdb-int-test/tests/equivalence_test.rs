//! Cross-backend equivalence: for any specification and a dataset
//! reproduced on every backend, `filter` must select the same set of
//! record ids everywhere.

use chrono::{TimeZone, Utc};

use shelfdb::common::Value;
use shelfdb::filter::{field, FilterSpec};
use shelfdb::repository::{FindOptions, Repository};
use shelfdb_int_test::test_util::{open_backends, page_ids, seed_games};

/// Runs one specification against all four backends and asserts the
/// selected id sets agree with the expectation.
fn assert_selects(spec: &FilterSpec, expected_ids: &[i64]) {
    let backends = open_backends();
    for (_, repo) in backends.all() {
        seed_games(repo);
    }
    for (name, repo) in backends.all() {
        let page = repo
            .filter(spec, &FindOptions::new())
            .unwrap_or_else(|err| panic!("{} backend failed on {}: {:?}", name, spec, err));
        assert_eq!(
            page_ids(&page),
            expected_ids,
            "{} backend disagreed on spec {}",
            name,
            spec
        );
        assert_eq!(
            repo.count(spec).unwrap(),
            expected_ids.len(),
            "{} backend count disagreed on spec {}",
            name,
            spec
        );
        assert_eq!(
            repo.exists(spec).unwrap(),
            !expected_ids.is_empty(),
            "{} backend exists disagreed on spec {}",
            name,
            spec
        );
    }
}

#[test]
fn test_empty_spec_selects_everything() {
    assert_selects(&FilterSpec::new(), &[1, 2, 3, 4, 5]);
}

#[test]
fn test_eq_on_string_field() {
    assert_selects(&FilterSpec::new().with(field("title").eq("Celeste")), &[2]);
}

#[test]
fn test_eq_on_enum_field() {
    assert_selects(&FilterSpec::new().with(field("status").eq("playing")), &[2]);
}

#[test]
fn test_neq_includes_null_fields() {
    assert_selects(
        &FilterSpec::new().with(field("title").neq("Celeste")),
        &[1, 3, 4, 5],
    );
}

#[test]
fn test_ordering_operators_skip_null_scores() {
    assert_selects(&FilterSpec::new().with(field("score").gt(20i64)), &[1, 2, 3]);
    assert_selects(&FilterSpec::new().with(field("score").gte(92i64)), &[1, 2]);
    assert_selects(&FilterSpec::new().with(field("score").lt(92i64)), &[3, 4]);
    assert_selects(&FilterSpec::new().with(field("score").lte(40i64)), &[3, 4]);
}

#[test]
fn test_ordering_on_float_field() {
    assert_selects(&FilterSpec::new().with(field("rating").gte(9.0f64)), &[1, 2]);
}

#[test]
fn test_membership_operators() {
    assert_selects(
        &FilterSpec::new().with(field("status").one_of(vec!["playing", "inbox"])),
        &[2, 3],
    );
    assert_selects(
        &FilterSpec::new().with(field("status").not_one_of(vec!["playing", "inbox"])),
        &[1, 4, 5],
    );
}

#[test]
fn test_contains_on_string() {
    assert_selects(&FilterSpec::new().with(field("title").contains("lta")), &[3]);
}

#[test]
fn test_contains_on_list_field() {
    assert_selects(
        &FilterSpec::new().with(field("genres").contains(Value::Str("indie".into()))),
        &[1, 2],
    );
}

#[test]
fn test_icontains_is_case_insensitive_everywhere() {
    assert_selects(
        &FilterSpec::new().with(field("title").icontains("ALP")),
        &[4],
    );
    // case-sensitive contains must not match across case on any backend
    assert_selects(&FilterSpec::new().with(field("title").contains("ALP")), &[]);
}

#[test]
fn test_prefix_and_suffix_operators() {
    assert_selects(
        &FilterSpec::new().with(field("title").starts_with("Cel")),
        &[2],
    );
    assert_selects(
        &FilterSpec::new().with(field("title").istarts_with("cEL")),
        &[2],
    );
    assert_selects(
        &FilterSpec::new().with(field("title").ends_with("Knight")),
        &[1],
    );
    assert_selects(
        &FilterSpec::new().with(field("title").iends_with("KNIGHT")),
        &[1],
    );
}

#[test]
fn test_is_null_selects_null_scores() {
    assert_selects(&FilterSpec::new().with(field("score").is_null(true)), &[5]);
    assert_selects(
        &FilterSpec::new().with(field("score").is_null(false)),
        &[1, 2, 3, 4],
    );
}

#[test]
fn test_null_equivalence_across_backends() {
    // EQ with a null value and IS_NULL must select identical record sets
    assert_selects(&FilterSpec::new().with(field("score").eq(Value::Null)), &[5]);
    assert_selects(
        &FilterSpec::new().with(field("score").neq(Value::Null)),
        &[1, 2, 3, 4],
    );
}

#[test]
fn test_datetime_comparison() {
    let cutoff = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
    assert_selects(
        &FilterSpec::new().with(field("release_date").lt(cutoff)),
        &[1, 4],
    );
    assert_selects(
        &FilterSpec::new().with(field("release_date").gte(cutoff)),
        &[2, 3],
    );
}

#[test]
fn test_conjunction_of_predicates() {
    assert_selects(
        &FilterSpec::new()
            .with(field("score").gt(20i64))
            .with(field("status").neq("finished")),
        &[2, 3],
    );
}

#[test]
fn test_flat_map_spec_matches_fluent_spec() {
    let from_map = FilterSpec::from_map(vec![
        ("score__gt".to_string(), Value::Int(20)),
        ("title__icontains".to_string(), Value::from("e")),
    ])
    .unwrap();
    assert_selects(&from_map, &[2, 3]);
}

#[test]
fn test_unsupported_operator_fails_on_every_backend() {
    let result = FilterSpec::from_map(vec![("title__between".to_string(), Value::Int(1))]);
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().kind(),
        &shelfdb::ErrorKind::UnsupportedOperator
    );
}
