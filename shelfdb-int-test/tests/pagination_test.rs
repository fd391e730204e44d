//! Pagination behavior, checked identically on every backend: the
//! five-record cursor walk from the contract, pagination idempotence, and
//! ordering edge cases.

use shelfdb::common::{Record, SortOrder, Value};
use shelfdb::filter::{field, FilterSpec};
use shelfdb::repository::{FindOptions, Repository};
use shelfdb_int_test::test_util::{open_backends, ordered_ids, seed_games};

#[test]
fn test_cursor_walk_over_five_records() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);

        let options = FindOptions::new()
            .order_by("id", SortOrder::Ascending)
            .limit(2);
        let first = repo.filter(&FilterSpec::new(), &options).unwrap();
        assert_eq!(ordered_ids(&first), vec![1, 2], "{} first page", name);
        assert!(first.has_next, "{} first page has_next", name);
        assert_eq!(first.next_cursor, Some(2), "{} first cursor", name);

        let second = repo
            .filter(
                &FilterSpec::new(),
                &FindOptions::new()
                    .order_by("id", SortOrder::Ascending)
                    .limit(2)
                    .cursor(first.next_cursor.unwrap()),
            )
            .unwrap();
        assert_eq!(ordered_ids(&second), vec![3, 4], "{} second page", name);
        assert!(second.has_next, "{} second page has_next", name);

        let third = repo
            .filter(
                &FilterSpec::new(),
                &FindOptions::new()
                    .order_by("id", SortOrder::Ascending)
                    .limit(2)
                    .cursor(second.next_cursor.unwrap()),
            )
            .unwrap();
        assert_eq!(ordered_ids(&third), vec![5], "{} third page", name);
        assert!(!third.has_next, "{} third page exhausted", name);
        assert!(third.next_cursor.is_none(), "{} third cursor", name);
    }
}

#[test]
fn test_pagination_idempotence() {
    // concatenating cursor-fetched pages equals one unpaginated filter
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);

        let unpaginated = repo
            .filter(
                &FilterSpec::new(),
                &FindOptions::new().order_by("title", SortOrder::Ascending),
            )
            .unwrap();

        let mut collected = vec![];
        let mut cursor = None;
        loop {
            let mut options = FindOptions::new()
                .order_by("title", SortOrder::Ascending)
                .limit(2);
            if let Some(c) = cursor {
                options = options.cursor(c);
            }
            let page = repo.filter(&FilterSpec::new(), &options).unwrap();
            collected.extend(ordered_ids(&page));
            if !page.has_next {
                break;
            }
            cursor = page.next_cursor;
        }

        assert_eq!(
            collected,
            ordered_ids(&unpaginated),
            "{} page concatenation diverged",
            name
        );
    }
}

#[test]
fn test_total_counts_matches_before_slicing() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);

        let page = repo
            .filter(
                &FilterSpec::new().with(field("score").gt(20i64)),
                &FindOptions::new()
                    .order_by("score", SortOrder::Descending)
                    .limit(1),
            )
            .unwrap();
        assert_eq!(page.total, 3, "{} total before limit", name);
        assert_eq!(page.items.len(), 1, "{} limited items", name);
        assert_eq!(
            page.items[0].get("title"),
            Value::from("Hollow Knight"),
            "{} descending head",
            name
        );
    }
}

#[test]
fn test_ordering_drops_records_with_null_field() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);

        // record 5 has a null score and must vanish from a score ordering
        let page = repo
            .filter(
                &FilterSpec::new(),
                &FindOptions::new().order_by("score", SortOrder::Ascending),
            )
            .unwrap();
        assert_eq!(ordered_ids(&page), vec![4, 3, 2, 1], "{} score order", name);
        assert_eq!(page.total, 4, "{} null score dropped", name);
    }
}

#[test]
fn test_offset_applies_after_cursor() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);

        let page = repo
            .filter(
                &FilterSpec::new(),
                &FindOptions::new()
                    .order_by("id", SortOrder::Ascending)
                    .cursor(1)
                    .offset(1)
                    .limit(2),
            )
            .unwrap();
        // after cursor 1: [2, 3, 4, 5]; offset 1: [3, 4, 5]; limit 2
        assert_eq!(ordered_ids(&page), vec![3, 4], "{} cursor+offset", name);
        assert_eq!(page.total, 4, "{} total after cursor", name);
        assert!(page.has_next, "{} has_next", name);
    }
}

#[test]
fn test_unknown_cursor_yields_empty_page() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);
        let page = repo
            .filter(
                &FilterSpec::new(),
                &FindOptions::new()
                    .order_by("id", SortOrder::Ascending)
                    .cursor(99),
            )
            .unwrap();
        assert!(page.items.is_empty(), "{} unknown cursor", name);
        assert!(!page.has_next, "{} unknown cursor has_next", name);
    }
}

#[test]
fn test_filtered_cursor_walk_skips_non_matching_records() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        seed_games(repo);

        let spec = FilterSpec::new().with(field("score").gt(20i64));
        let first = repo
            .filter(
                &spec,
                &FindOptions::new()
                    .order_by("id", SortOrder::Ascending)
                    .limit(2),
            )
            .unwrap();
        assert_eq!(ordered_ids(&first), vec![1, 2], "{} filtered page", name);

        let second = repo
            .filter(
                &spec,
                &FindOptions::new()
                    .order_by("id", SortOrder::Ascending)
                    .limit(2)
                    .cursor(first.next_cursor.unwrap()),
            )
            .unwrap();
        assert_eq!(ordered_ids(&second), vec![3], "{} filtered tail", name);
        assert!(!second.has_next, "{} filtered exhausted", name);
    }
}

#[test]
fn test_pages_are_stable_without_intervening_writes() {
    let backends = open_backends();
    for (name, repo) in backends.all() {
        for i in 1..=7 {
            repo.create(&Record::new().with("title", format!("G{}", i)).with("score", i as i64))
                .unwrap();
        }
        let options = FindOptions::new()
            .order_by("score", SortOrder::Descending)
            .limit(3);
        let once = repo.filter(&FilterSpec::new(), &options).unwrap();
        let twice = repo.filter(&FilterSpec::new(), &options).unwrap();
        assert_eq!(
            ordered_ids(&once),
            ordered_ids(&twice),
            "{} repeated page diverged",
            name
        );
    }
}
