use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use shelfdb::common::{Record, Value};
use shelfdb::docstore::DocStore;
use shelfdb::repository::{
    DocStoreRepository, FileRepository, MemoryRepository, Page, Repository, SqliteRepository,
};
use shelfdb::sql::TableSchema;

#[ctor::ctor]
fn init() {
    colog::init();
}

/// One instance of every backend, over fresh storage in a scratch
/// directory that lives as long as this struct.
pub struct Backends {
    pub memory: MemoryRepository,
    pub file: FileRepository,
    pub doc: DocStoreRepository,
    pub sqlite: SqliteRepository,
    _scratch: TempDir,
}

impl Backends {
    /// The four backends with their display names, for equivalence loops.
    pub fn all(&self) -> Vec<(&'static str, &dyn Repository)> {
        vec![
            ("memory", &self.memory),
            ("file", &self.file),
            ("doc-store", &self.doc),
            ("sqlite", &self.sqlite),
        ]
    }
}

/// The table descriptor used by every integration suite: the shape of a
/// game-backlog metadata record.
pub fn game_schema() -> TableSchema {
    TableSchema::new(
        "games",
        vec![
            ("title", Value::from("")),
            ("score", Value::Int(0)),
            ("rating", Value::Float(0.0)),
            ("status", Value::Enum("inbox".into())),
            ("genres", Value::List(vec![])),
            (
                "release_date",
                Value::DateTime(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap()),
            ),
        ],
    )
    .expect("game schema is valid")
}

/// Opens all four backends over fresh storage.
pub fn open_backends() -> Backends {
    let scratch = TempDir::new().expect("scratch dir");
    let memory = MemoryRepository::new();
    let file = FileRepository::open(scratch.path(), "games").expect("file repository");
    let store = DocStore::open(scratch.path().join("app.json")).expect("doc store");
    let doc = DocStoreRepository::open(&store, "games").expect("doc repository");
    let sqlite =
        SqliteRepository::open(scratch.path().join("app.db"), game_schema()).expect("sqlite");

    Backends {
        memory,
        file,
        doc,
        sqlite,
        _scratch: scratch,
    }
}

/// Seeds the shared five-game dataset into one repository. Records get
/// ids 1..=5 in this order on every backend.
pub fn seed_games(repo: &dyn Repository) {
    let games = [
        (
            "Hollow Knight",
            Value::Int(95),
            Value::Float(9.4),
            "finished",
            vec!["action", "indie"],
            Some((2017, 2, 24)),
        ),
        (
            "Celeste",
            Value::Int(92),
            Value::Float(9.0),
            "playing",
            vec!["platformer", "indie"],
            Some((2018, 1, 25)),
        ),
        (
            "delta strike",
            Value::Int(40),
            Value::Null,
            "inbox",
            vec!["shooter"],
            Some((2020, 6, 11)),
        ),
        (
            "Alpha Protocol",
            Value::Int(10),
            Value::Float(6.5),
            "abandoned",
            vec!["rpg", "action"],
            Some((2010, 5, 27)),
        ),
        (
            "Mystery Title",
            Value::Null,
            Value::Null,
            "considering",
            vec![],
            None,
        ),
    ];

    for (title, score, rating, status, genres, release) in games {
        let genres = Value::List(
            genres
                .into_iter()
                .map(|g| Value::Enum(g.to_string()))
                .collect(),
        );
        let release: Value = match release {
            Some((y, m, d)) => Value::DateTime(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()),
            None => Value::Null,
        };
        let record = Record::new()
            .with("title", title)
            .with("score", score)
            .with("rating", rating)
            .with("status", Value::Enum(status.to_string()))
            .with("genres", genres)
            .with("release_date", release);
        repo.create(&record).expect("seed record");
    }
}

/// The sorted ids of a page's items.
pub fn page_ids(page: &Page) -> Vec<i64> {
    let mut ids: Vec<i64> = page.items.iter().filter_map(Record::id).collect();
    ids.sort_unstable();
    ids
}

/// The ids of a page's items, in returned order.
pub fn ordered_ids(page: &Page) -> Vec<i64> {
    page.items.iter().filter_map(Record::id).collect()
}
