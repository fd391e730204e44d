use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::docstore::condition::{Condition, JsonMap};
use crate::errors::{ErrorKind, ShelfError, ShelfResult};

/// An embedded document store backed by a single JSON file.
///
/// The file holds every table of the store instance as a JSON object of
/// arrays (`{"games": [...], "sessions": [...]}`). The whole store is
/// loaded at open and flushed back after each mutation - the design is
/// optimized for small datasets, not throughput.
///
/// All clones share the same underlying state through `Arc`.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::docstore::DocStore;
///
/// let store = DocStore::open("data/app.json")?;
/// let table = store.table("games");
/// table.insert(doc)?;
/// let hits = table.search(&condition)?;
/// ```
#[derive(Clone, Debug)]
pub struct DocStore {
    inner: Arc<DocStoreInner>,
}

#[derive(Debug)]
struct DocStoreInner {
    path: PathBuf,
    tables: RwLock<BTreeMap<String, Vec<JsonMap>>>,
}

impl DocStore {
    /// Opens a document store, loading the backing file when it exists.
    ///
    /// Parent directories are created as needed; the file itself is only
    /// written on the first mutation.
    pub fn open<P: AsRef<Path>>(path: P) -> ShelfResult<DocStore> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tables = if path.exists() {
            let content = fs::read_to_string(&path)?;
            Self::parse_tables(&content)?
        } else {
            BTreeMap::new()
        };

        log::debug!(
            "Opened document store at {} with {} table(s)",
            path.display(),
            tables.len()
        );
        Ok(DocStore {
            inner: Arc::new(DocStoreInner {
                path,
                tables: RwLock::new(tables),
            }),
        })
    }

    fn parse_tables(content: &str) -> ShelfResult<BTreeMap<String, Vec<JsonMap>>> {
        let json: JsonValue = serde_json::from_str(content)?;
        let object = json.as_object().ok_or_else(|| {
            ShelfError::new(
                "Document store file is not a JSON object",
                ErrorKind::SerializationError,
            )
        })?;

        let mut tables = BTreeMap::new();
        for (name, docs) in object.iter() {
            let array = docs.as_array().ok_or_else(|| {
                ShelfError::new(
                    &format!("Table {} is not a JSON array", name),
                    ErrorKind::SerializationError,
                )
            })?;
            let mut parsed = Vec::with_capacity(array.len());
            for doc in array {
                let map = doc.as_object().ok_or_else(|| {
                    ShelfError::new(
                        &format!("Document in table {} is not a JSON object", name),
                        ErrorKind::SerializationError,
                    )
                })?;
                parsed.push(map.clone());
            }
            tables.insert(name.clone(), parsed);
        }
        Ok(tables)
    }

    /// Gets a handle to a named table, creating it lazily.
    pub fn table(&self, name: &str) -> Table {
        Table {
            store: self.clone(),
            name: name.to_string(),
        }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn flush(&self, tables: &BTreeMap<String, Vec<JsonMap>>) -> ShelfResult<()> {
        let mut object = serde_json::Map::new();
        for (name, docs) in tables.iter() {
            let array = docs.iter().cloned().map(JsonValue::Object).collect();
            object.insert(name.clone(), JsonValue::Array(array));
        }
        let text = serde_json::to_string_pretty(&JsonValue::Object(object))?;
        fs::write(&self.inner.path, text)?;
        Ok(())
    }
}

/// A handle to one table of a [`DocStore`].
///
/// Tables expose the store's native primitives only: insert, scan, search
/// by [`Condition`], conditional update/remove, and truncate. Anything
/// richer - ordering, pagination, typed records - is layered on top by the
/// repository.
#[derive(Clone)]
pub struct Table {
    store: DocStore,
    name: String,
}

impl Table {
    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a document at the end of the table.
    pub fn insert(&self, doc: JsonMap) -> ShelfResult<()> {
        let mut tables = self.store.inner.tables.write();
        tables.entry(self.name.clone()).or_default().push(doc);
        self.store.flush(&tables)
    }

    /// Inserts a batch of documents, flushing once.
    pub fn insert_all(&self, docs: Vec<JsonMap>) -> ShelfResult<()> {
        let mut tables = self.store.inner.tables.write();
        tables.entry(self.name.clone()).or_default().extend(docs);
        self.store.flush(&tables)
    }

    /// Returns every document in insertion order.
    pub fn all(&self) -> ShelfResult<Vec<JsonMap>> {
        let tables = self.store.inner.tables.read();
        Ok(tables.get(&self.name).cloned().unwrap_or_default())
    }

    /// Returns the documents matching a condition, in insertion order.
    pub fn search(&self, condition: &Condition) -> ShelfResult<Vec<JsonMap>> {
        let tables = self.store.inner.tables.read();
        Ok(tables
            .get(&self.name)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| condition.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Merges the patch fields onto every matching document.
    ///
    /// Returns the number of documents updated.
    pub fn update_where(&self, patch: &JsonMap, condition: &Condition) -> ShelfResult<usize> {
        let mut tables = self.store.inner.tables.write();
        let mut updated = 0;
        if let Some(docs) = tables.get_mut(&self.name) {
            for doc in docs.iter_mut() {
                if condition.matches(doc) {
                    for (field, value) in patch.iter() {
                        doc.insert(field.clone(), value.clone());
                    }
                    updated += 1;
                }
            }
        }
        if updated > 0 {
            self.store.flush(&tables)?;
        }
        Ok(updated)
    }

    /// Removes every matching document.
    ///
    /// Returns the number of documents removed.
    pub fn remove_where(&self, condition: &Condition) -> ShelfResult<usize> {
        let mut tables = self.store.inner.tables.write();
        let mut removed = 0;
        if let Some(docs) = tables.get_mut(&self.name) {
            let before = docs.len();
            docs.retain(|doc| !condition.matches(doc));
            removed = before - docs.len();
        }
        if removed > 0 {
            self.store.flush(&tables)?;
        }
        Ok(removed)
    }

    /// Removes every document from the table.
    pub fn truncate(&self) -> ShelfResult<()> {
        let mut tables = self.store.inner.tables.write();
        tables.insert(self.name.clone(), vec![]);
        self.store.flush(&tables)
    }
}
