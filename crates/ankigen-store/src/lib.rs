//! Read/write access to decks and notes in an Anki SQLite collection.
//!
//! [`Collection`] wraps a `collection.anki2` file. It lists decks, creates
//! decks idempotently, and inserts Front/Back notes with their cards. Each
//! mutating call runs in its own `IMMEDIATE` transaction and is committed
//! before the call returns.
//!
//! # Example
//!
//! ```no_run
//! use ankigen_store::Collection;
//!
//! # fn example() -> ankigen_store::Result<()> {
//! let collection = Collection::open("/syncserver/alice/collection.anki2")?;
//!
//! collection.create_deck("Biology::Genetics")?;
//! let card = collection.add_card(
//!     "Biology::Genetics",
//!     "What does DNA stand for?",
//!     "Deoxyribonucleic acid",
//!     ["definition"],
//! )?;
//! println!("Stored note {}", card.note_id);
//!
//! for name in collection.list_decks()? {
//!     println!("{}", name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A `Collection` is `Send + Sync` and is meant to be shared behind an `Arc`.
//! Calls on one instance are serialized by an internal mutex, and writers in
//! other processes are serialized by SQLite's write lock. A call that cannot
//! obtain the lock within the busy timeout fails with
//! [`Error::StoreUnavailable`].

mod card;
mod deck;
mod error;
pub mod sql;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use serde_json::{Map, Value};
use tracing::{debug, info};

pub use card::{StoredCard, clean_tags};
pub use deck::{Deck, HIERARCHY_SEPARATOR, normalize_deck_name, validate_deck_name};
pub use error::{Error, Result};

use sql::{
    BASIC_MODEL_ID, BASIC_MODEL_NAME, DEFAULT_CONF, DEFAULT_DCONF, DEFAULT_DECK_ID,
    DEFAULT_DECK_NAME, FIELD_SEPARATOR, SCHEMA,
};

/// How long a call waits for another writer to release the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to an Anki collection file.
#[derive(Debug)]
pub struct Collection {
    path: PathBuf,
    conn: Mutex<Connection>,
    basic_model_id: i64,
}

impl Collection {
    /// Open a collection, creating an empty one if the file does not exist.
    ///
    /// Missing parent directories are created. A fresh collection contains
    /// the `Basic` note type and the built-in `Default` deck.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let basic_model_id = initialize(&mut conn)?;

        info!(path = %path.display(), basic_model_id, "Opened collection");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            basic_model_id,
        })
    }

    /// Path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sorted names of all decks.
    ///
    /// The built-in `Default` deck is omitted until it holds cards or has been
    /// named in [`Collection::ensure_deck`] or [`Collection::add_card`], so an
    /// untouched collection yields an empty set.
    pub fn list_decks(&self) -> Result<BTreeSet<String>> {
        Ok(self.decks()?.into_iter().map(|deck| deck.name).collect())
    }

    /// All decks with their card counts, sorted by name.
    ///
    /// Follows the same `Default` deck rule as [`Collection::list_decks`].
    pub fn decks(&self) -> Result<Vec<Deck>> {
        let conn = self.lock()?;
        let decks = load_json(&conn, "decks")?;
        let counts = card_counts(&conn)?;

        let mut result: Vec<Deck> = decks
            .values()
            .filter_map(|deck| {
                let id = deck.get("id")?.as_i64()?;
                let name = deck.get("name")?.as_str()?.to_string();
                let card_count = counts.get(&id).copied().unwrap_or(0);
                let hidden = id == DEFAULT_DECK_ID && card_count == 0 && !sql::is_claimed(deck);
                (!hidden).then_some(Deck {
                    id,
                    name,
                    card_count,
                })
            })
            .collect();

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    /// Create a deck, or return it if a deck with the same normalized name
    /// already exists.
    pub fn create_deck(&self, name: &str) -> Result<Deck> {
        self.ensure_deck(name).map(|(deck, _created)| deck)
    }

    /// Like [`Collection::create_deck`], also reporting whether the deck was
    /// newly created.
    ///
    /// The built-in `Default` deck always exists, so naming it reports
    /// `false`; from then on it is listed even while empty.
    pub fn ensure_deck(&self, name: &str) -> Result<(Deck, bool)> {
        let name = validate_deck_name(name)?;
        let now = now_ms();

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let (id, created) = insert_deck_if_missing(&tx, &name, now)?;
        let card_count: i64 =
            tx.query_row("SELECT COUNT(*) FROM cards WHERE did = ?", [id], |row| {
                row.get(0)
            })?;
        tx.commit()?;

        if created {
            info!(deck_id = id, name = %name, "Deck created");
        } else {
            debug!(deck_id = id, name = %name, "Deck already exists");
        }

        Ok((
            Deck {
                id,
                name,
                card_count: card_count as usize,
            },
            created,
        ))
    }

    /// Insert a Front/Back note and its card into `deck`.
    ///
    /// The deck is created if it does not exist; deck creation and note
    /// insertion commit together. Front and back are trimmed and must not be
    /// empty.
    pub fn add_card<I, S>(&self, deck: &str, front: &str, back: &str, tags: I) -> Result<StoredCard>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_card(deck, front, back, tags)
            .map(|(card, _created)| card)
    }

    /// Like [`Collection::add_card`], also reporting whether this call
    /// created the deck.
    ///
    /// Exactly one of any number of concurrent inserts into a new deck
    /// reports `true`, including inserts through other handles on the same
    /// file.
    pub fn insert_card<I, S>(
        &self,
        deck: &str,
        front: &str,
        back: &str,
        tags: I,
    ) -> Result<(StoredCard, bool)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let front = front.trim();
        let back = back.trim();
        if front.is_empty() {
            return Err(Error::EmptyField("front"));
        }
        if back.is_empty() {
            return Err(Error::EmptyField("back"));
        }
        let deck = validate_deck_name(deck)?;
        let tags = clean_tags(tags);
        let now = now_ms();

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (deck_id, deck_created) = insert_deck_if_missing(&tx, &deck, now)?;
        let note_id = next_id(&tx, "notes", now)?;
        let card_id = next_id(&tx, "cards", now)?;
        let due: i64 = tx.query_row(
            "SELECT COALESCE(MAX(due), 0) + 1 FROM cards WHERE type = 0",
            [],
            |row| row.get(0),
        )?;

        let fields = format!("{}{}{}", front, FIELD_SEPARATOR, back);
        tx.execute(
            "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
             VALUES (?, ?, ?, ?, -1, ?, ?, ?, ?, 0, '')",
            rusqlite::params![
                note_id,
                card::generate_guid(note_id),
                self.basic_model_id,
                now / 1000,
                card::tags_column(&tags),
                fields,
                front,
                card::field_checksum(front),
            ],
        )?;
        tx.execute(
            "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
             VALUES (?, ?, ?, 0, ?, -1, 0, 0, ?, 0, 0, 0, 0, 0, 0, 0, 0, '')",
            rusqlite::params![card_id, note_id, deck_id, now / 1000, due],
        )?;
        register_tags(&tx, &tags)?;
        tx.execute("UPDATE col SET mod = ?", [now])?;
        tx.commit()?;

        if deck_created {
            info!(deck_id, deck = %deck, "Deck auto-created");
        }
        debug!(note_id, card_id, deck = %deck, "Card added");

        Ok((
            StoredCard {
                note_id,
                card_id,
                deck,
                front: front.to_string(),
                back: back.to_string(),
                tags,
                created_ms: (now / 1000) * 1000,
            },
            deck_created,
        ))
    }

    /// All cards in a deck, oldest first.
    ///
    /// Returns an empty list if the deck does not exist.
    pub fn cards_in_deck(&self, deck: &str) -> Result<Vec<StoredCard>> {
        let deck = normalize_deck_name(deck);
        let conn = self.lock()?;
        let decks = load_json(&conn, "decks")?;
        let Some(deck_id) = find_deck(&decks, &deck) else {
            return Ok(Vec::new());
        };

        let mut stmt = conn.prepare(
            "SELECT n.id, c.id, n.flds, n.tags, n.mod FROM cards c
             JOIN notes n ON c.nid = n.id
             WHERE c.did = ?
             ORDER BY c.id",
        )?;
        let rows = stmt.query_map([deck_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut cards = Vec::new();
        for row in rows {
            let (note_id, card_id, fields, tags, modified) = row?;
            let (front, back) = fields
                .split_once(FIELD_SEPARATOR)
                .unwrap_or((fields.as_str(), ""));
            cards.push(StoredCard {
                note_id,
                card_id,
                deck: deck.clone(),
                front: front.to_string(),
                back: back.to_string(),
                tags: card::parse_tags_column(&tags),
                created_ms: modified * 1000,
            });
        }
        Ok(cards)
    }

    /// Total number of cards in the collection.
    pub fn card_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StoreUnavailable("collection lock poisoned".to_string()))
    }
}

/// Create the schema and `col` row if needed, and make sure a `Basic` note
/// type exists. Returns the id of that note type.
fn initialize(conn: &mut Connection) -> Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch(SCHEMA)?;

    let has_col: bool = tx.query_row("SELECT EXISTS(SELECT 1 FROM col)", [], |row| row.get(0))?;
    let now = now_ms();

    if !has_col {
        let mut models = Map::new();
        models.insert(
            BASIC_MODEL_ID.to_string(),
            sql::basic_model_json(BASIC_MODEL_ID, now / 1000),
        );
        let mut decks = Map::new();
        decks.insert(
            DEFAULT_DECK_ID.to_string(),
            sql::deck_json(DEFAULT_DECK_ID, DEFAULT_DECK_NAME, now / 1000),
        );

        tx.execute(
            "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
             VALUES (1, ?, ?, ?, 11, 0, 0, 0, ?, ?, ?, ?, '{}')",
            rusqlite::params![
                now / 1000,
                now,
                now,
                DEFAULT_CONF,
                serde_json::to_string(&models)?,
                serde_json::to_string(&decks)?,
                DEFAULT_DCONF,
            ],
        )?;
        tx.commit()?;
        info!("Initialized empty collection");
        return Ok(BASIC_MODEL_ID);
    }

    let mut models = load_json(&tx, "models")?;
    let existing = models.values().find_map(|model| {
        (model.get("name")?.as_str()? == BASIC_MODEL_NAME)
            .then(|| model.get("id")?.as_i64())
            .flatten()
    });

    let model_id = match existing {
        Some(id) => id,
        None => {
            let id = if models.contains_key(&BASIC_MODEL_ID.to_string()) {
                now
            } else {
                BASIC_MODEL_ID
            };
            models.insert(id.to_string(), sql::basic_model_json(id, now / 1000));
            tx.execute(
                "UPDATE col SET models = ?, mod = ?",
                rusqlite::params![serde_json::to_string(&models)?, now],
            )?;
            info!(model_id = id, "Added Basic note type to collection");
            id
        }
    };
    tx.commit()?;
    Ok(model_id)
}

/// Load one of the JSON columns of the `col` row as an object.
fn load_json(conn: &Connection, column: &str) -> Result<Map<String, Value>> {
    let raw: Option<String> = conn
        .query_row(&format!("SELECT {} FROM col LIMIT 1", column), [], |row| {
            row.get(0)
        })
        .optional()?;
    let raw = raw.ok_or_else(|| Error::Corrupt("missing col row".to_string()))?;

    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Corrupt(format!("col.{} is not a JSON object", column))),
    }
}

fn find_deck(decks: &Map<String, Value>, name: &str) -> Option<i64> {
    decks.values().find_map(|deck| {
        (deck.get("name")?.as_str()? == name)
            .then(|| deck.get("id")?.as_i64())
            .flatten()
    })
}

/// Look up a deck by normalized name, inserting it into `col.decks` if
/// absent. Returns the deck id and whether it was created.
///
/// Finding the built-in `Default` deck claims it so that it is listed.
fn insert_deck_if_missing(conn: &Connection, name: &str, now: i64) -> Result<(i64, bool)> {
    let mut decks = load_json(conn, "decks")?;
    if let Some(id) = find_deck(&decks, name) {
        if id == DEFAULT_DECK_ID {
            claim_default_deck(conn, &mut decks, now)?;
        }
        return Ok((id, false));
    }

    let max_id = decks
        .values()
        .filter_map(|deck| deck.get("id")?.as_i64())
        .max()
        .unwrap_or(DEFAULT_DECK_ID);
    let id = now.max(max_id + 1);

    decks.insert(id.to_string(), sql::deck_json(id, name, now / 1000));
    conn.execute(
        "UPDATE col SET decks = ?, mod = ?",
        rusqlite::params![serde_json::to_string(&decks)?, now],
    )?;
    Ok((id, true))
}

fn claim_default_deck(conn: &Connection, decks: &mut Map<String, Value>, now: i64) -> Result<()> {
    let Some(Value::Object(deck)) = decks.get_mut(&DEFAULT_DECK_ID.to_string()) else {
        return Ok(());
    };
    if deck.get(sql::CLAIMED_KEY).and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    deck.insert(sql::CLAIMED_KEY.to_string(), Value::Bool(true));
    conn.execute(
        "UPDATE col SET decks = ?, mod = ?",
        rusqlite::params![serde_json::to_string(&*decks)?, now],
    )?;
    debug!("Default deck claimed");
    Ok(())
}

/// Next free id in `table`, never smaller than the current time in ms.
fn next_id(conn: &Connection, table: &str, now: i64) -> Result<i64> {
    let max: i64 = conn.query_row(
        &format!("SELECT COALESCE(MAX(id), 0) FROM {}", table),
        [],
        |row| row.get(0),
    )?;
    Ok(now.max(max + 1))
}

/// Add new tags to the collection's tag registry.
fn register_tags(conn: &Connection, tags: &BTreeSet<String>) -> Result<()> {
    if tags.is_empty() {
        return Ok(());
    }
    let mut registry = load_json(conn, "tags")?;
    let before = registry.len();
    for tag in tags {
        registry
            .entry(tag.clone())
            .or_insert_with(|| Value::from(-1));
    }
    if registry.len() != before {
        conn.execute(
            "UPDATE col SET tags = ?",
            [serde_json::to_string(&registry)?],
        )?;
    }
    Ok(())
}

fn card_counts(conn: &Connection) -> Result<HashMap<i64, usize>> {
    let mut stmt = conn.prepare("SELECT did, COUNT(*) FROM cards GROUP BY did")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;

    let mut counts = HashMap::new();
    for row in rows {
        let (did, count) = row?;
        counts.insert(did, count as usize);
    }
    Ok(counts)
}

/// Current Unix time in milliseconds.
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
