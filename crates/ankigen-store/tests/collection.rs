//! Integration tests for collection reads and writes.

use std::sync::Arc;
use std::thread;

use ankigen_store::{Collection, Error};
use tempfile::{TempDir, tempdir};

fn open_temp() -> (TempDir, Collection) {
    let dir = tempdir().unwrap();
    let collection = Collection::open(dir.path().join("user1").join("collection.anki2")).unwrap();
    (dir, collection)
}

#[test]
fn test_empty_collection_lists_no_decks() {
    let (_dir, collection) = open_temp();

    assert!(collection.list_decks().unwrap().is_empty());
    assert_eq!(collection.card_count().unwrap(), 0);
}

#[test]
fn test_create_deck_is_idempotent() {
    let (_dir, collection) = open_temp();

    let first = collection.create_deck("Science").unwrap();
    let second = collection.create_deck("Science").unwrap();

    assert_eq!(first.id, second.id);
    let decks = collection.list_decks().unwrap();
    assert_eq!(decks.len(), 1);
    assert!(decks.contains("Science"));
}

#[test]
fn test_create_deck_normalizes_name() {
    let (_dir, collection) = open_temp();

    let first = collection.create_deck("Biology::Genetics").unwrap();
    let second = collection.create_deck("  Biology ::  Genetics ").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "Biology::Genetics");
    assert_eq!(collection.list_decks().unwrap().len(), 1);
}

#[test]
fn test_create_deck_rejects_blank_name() {
    let (_dir, collection) = open_temp();

    let result = collection.create_deck("   ");

    assert!(matches!(result, Err(Error::InvalidDeck(_))));
}

#[test]
fn test_add_card_auto_creates_deck() {
    let (_dir, collection) = open_temp();

    let card = collection
        .add_card(
            "Data Structures",
            "What property does a BST maintain?",
            "Left children are smaller, right children are larger",
            ["concept", "tree"],
        )
        .unwrap();

    assert_eq!(card.deck, "Data Structures");
    assert!(card.note_id > 0);
    assert!(card.card_id > 0);
    assert_eq!(card.tags.len(), 2);

    let decks = collection.decks().unwrap();
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].name, "Data Structures");
    assert_eq!(decks[0].card_count, 1);
}

#[test]
fn test_add_card_rejects_empty_fields() {
    let (_dir, collection) = open_temp();

    let front = collection.add_card("Deck", "  ", "answer", Vec::<String>::new());
    let back = collection.add_card("Deck", "question", "", Vec::<String>::new());

    assert!(matches!(front, Err(Error::EmptyField("front"))));
    assert!(matches!(back, Err(Error::EmptyField("back"))));
    assert!(collection.list_decks().unwrap().is_empty());
}

#[test]
fn test_default_deck_listed_once_it_has_cards() {
    let (_dir, collection) = open_temp();

    collection
        .add_card("Default", "front", "back", Vec::<String>::new())
        .unwrap();

    let decks = collection.decks().unwrap();
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].name, "Default");
    assert_eq!(decks[0].id, 1);
}

#[test]
fn test_cards_read_back_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collection.anki2");

    {
        let collection = Collection::open(&path).unwrap();
        collection
            .add_card("Spanish", "perro", "dog", ["vocab"])
            .unwrap();
        collection
            .add_card("Spanish", "gato", "cat", ["vocab"])
            .unwrap();
    }

    let collection = Collection::open(&path).unwrap();
    let cards = collection.cards_in_deck("Spanish").unwrap();

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].front, "perro");
    assert_eq!(cards[0].back, "dog");
    assert_eq!(cards[1].front, "gato");
    assert!(cards[1].tags.contains("vocab"));
    assert!(cards[0].note_id < cards[1].note_id);
}

#[test]
fn test_cards_in_missing_deck_is_empty() {
    let (_dir, collection) = open_temp();

    assert!(collection.cards_in_deck("Nope").unwrap().is_empty());
}

#[test]
fn test_open_rejects_non_database_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collection.anki2");
    std::fs::write(&path, b"this is definitely not an sqlite database file").unwrap();

    let result = Collection::open(&path);

    assert!(matches!(result, Err(Error::StoreUnavailable(_))));
}

#[test]
fn test_concurrent_writers_share_decks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collection.anki2");
    let shared = Arc::new(Collection::open(&path).unwrap());
    let other = Arc::new(Collection::open(&path).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let collection = if worker % 2 == 0 {
                Arc::clone(&shared)
            } else {
                Arc::clone(&other)
            };
            thread::spawn(move || {
                for i in 0..10 {
                    collection
                        .add_card(
                            "Shared",
                            &format!("question {} from {}", i, worker),
                            "answer",
                            ["load"],
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let decks = shared.decks().unwrap();
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].name, "Shared");
    assert_eq!(decks[0].card_count, 40);
    assert_eq!(other.card_count().unwrap(), 40);
}

#[test]
fn test_ensure_deck_reports_creation() {
    let (_dir, collection) = open_temp();

    let (_, created) = collection.ensure_deck("History").unwrap();
    let (deck, created_again) = collection.ensure_deck("History").unwrap();

    assert!(created);
    assert!(!created_again);
    assert_eq!(deck.name, "History");
}

#[test]
fn test_default_deck_listed_once_created() {
    let (_dir, collection) = open_temp();

    let (deck, created) = collection.ensure_deck("Default").unwrap();

    assert_eq!(deck.id, 1);
    assert!(!created);
    let decks = collection.decks().unwrap();
    assert_eq!(decks.len(), 1);
    assert_eq!(decks[0].name, "Default");
    assert_eq!(decks[0].card_count, 0);
}

#[test]
fn test_default_deck_stays_listed_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collection.anki2");

    Collection::open(&path).unwrap().create_deck("Default").unwrap();

    let collection = Collection::open(&path).unwrap();
    assert!(collection.list_decks().unwrap().contains("Default"));
}

#[test]
fn test_insert_into_default_deck_is_not_a_creation() {
    let (_dir, collection) = open_temp();

    let (_, created) = collection
        .insert_card("Default", "front", "back", Vec::<String>::new())
        .unwrap();

    assert!(!created);
}

#[test]
fn test_insert_card_reports_deck_creation_once() {
    let (_dir, collection) = open_temp();

    let (_, first) = collection
        .insert_card("Chemistry", "H2O?", "Water", Vec::<String>::new())
        .unwrap();
    let (_, second) = collection
        .insert_card("Chemistry", "NaCl?", "Salt", Vec::<String>::new())
        .unwrap();

    assert!(first);
    assert!(!second);
}

#[test]
fn test_concurrent_inserts_create_deck_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("collection.anki2");
    let handles_to_file: Vec<_> = (0..2)
        .map(|_| Arc::new(Collection::open(&path).unwrap()))
        .collect();

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let collection = Arc::clone(&handles_to_file[worker % 2]);
            thread::spawn(move || {
                collection
                    .insert_card("Fresh", &format!("question {}", worker), "answer", ["load"])
                    .unwrap()
                    .1
            })
        })
        .collect();

    let created = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .filter(|created| *created)
        .count();

    assert_eq!(created, 1);
    assert_eq!(handles_to_file[0].card_count().unwrap(), 8);
}

#[test]
fn test_created_time_matches_read_back() {
    let (_dir, collection) = open_temp();
    let before = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;

    let inserted = collection
        .add_card("Time", "front", "back", Vec::<String>::new())
        .unwrap();
    let read_back = collection.cards_in_deck("Time").unwrap();

    assert_eq!(read_back, vec![inserted.clone()]);
    assert!(inserted.created_ms > before - 1000);
    assert!(inserted.created_ms <= before + 60_000);
}
