//! `.apkg` package assembly.
//!
//! An `.apkg` file is a zip archive holding an Anki collection database
//! (`collection.anki2`, SQLite schema version 11) and a `media` manifest.
//! The collection database is staged in a scoped temp file (SQLite needs a
//! file target), read back, and zipped in memory; the temp file is removed
//! on every exit path when the handle drops.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::error::PackagingError;
use crate::models::{model_for, BASIC_MODEL_ID, ALL_MODELS};
use crate::types::{Card, Deck};

/// Anki collection schema, version 11. Every reader of `collection.anki2`
/// expects exactly these tables and indexes.
const COLLECTION_SCHEMA: &str = r#"
-- Collection metadata (single row; conf/models/decks/dconf are JSON blobs)
CREATE TABLE col (
    id     INTEGER PRIMARY KEY,
    crt    INTEGER NOT NULL,
    mod    INTEGER NOT NULL,
    scm    INTEGER NOT NULL,
    ver    INTEGER NOT NULL,
    dty    INTEGER NOT NULL,
    usn    INTEGER NOT NULL,
    ls     INTEGER NOT NULL,
    conf   TEXT NOT NULL,
    models TEXT NOT NULL,
    decks  TEXT NOT NULL,
    dconf  TEXT NOT NULL,
    tags   TEXT NOT NULL
);

-- Notes: field values separated by 0x1f, sfld is the sort field
CREATE TABLE notes (
    id    INTEGER PRIMARY KEY,
    guid  TEXT NOT NULL,
    mid   INTEGER NOT NULL,
    mod   INTEGER NOT NULL,
    usn   INTEGER NOT NULL,
    tags  TEXT NOT NULL,
    flds  TEXT NOT NULL,
    sfld  INTEGER NOT NULL,
    csum  INTEGER NOT NULL,
    flags INTEGER NOT NULL,
    data  TEXT NOT NULL
);

-- Cards: one per template ord (or cloze deletion) of a note
CREATE TABLE cards (
    id     INTEGER PRIMARY KEY,
    nid    INTEGER NOT NULL,
    did    INTEGER NOT NULL,
    ord    INTEGER NOT NULL,
    mod    INTEGER NOT NULL,
    usn    INTEGER NOT NULL,
    type   INTEGER NOT NULL,
    queue  INTEGER NOT NULL,
    due    INTEGER NOT NULL,
    ivl    INTEGER NOT NULL,
    factor INTEGER NOT NULL,
    reps   INTEGER NOT NULL,
    lapses INTEGER NOT NULL,
    left   INTEGER NOT NULL,
    odue   INTEGER NOT NULL,
    odid   INTEGER NOT NULL,
    flags  INTEGER NOT NULL,
    data   TEXT NOT NULL
);

-- Review log and deletion log: always empty in a fresh package
CREATE TABLE revlog (
    id      INTEGER PRIMARY KEY,
    cid     INTEGER NOT NULL,
    usn     INTEGER NOT NULL,
    ease    INTEGER NOT NULL,
    ivl     INTEGER NOT NULL,
    lastIvl INTEGER NOT NULL,
    factor  INTEGER NOT NULL,
    time    INTEGER NOT NULL,
    type    INTEGER NOT NULL
);

CREATE TABLE graves (
    usn  INTEGER NOT NULL,
    oid  INTEGER NOT NULL,
    type INTEGER NOT NULL
);

CREATE INDEX ix_notes_usn ON notes (usn);
CREATE INDEX ix_cards_usn ON cards (usn);
CREATE INDEX ix_revlog_usn ON revlog (usn);
CREATE INDEX ix_cards_nid ON cards (nid);
CREATE INDEX ix_cards_sched ON cards (did, queue, due);
CREATE INDEX ix_revlog_cid ON revlog (cid);
CREATE INDEX ix_notes_csum ON notes (csum);
"#;

/// Separator between note field values inside `notes.flds`.
const FIELD_SEPARATOR: char = '\u{1f}';

static CLOZE_INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{c(\d+)::").unwrap());

/// Serialize a deck into `.apkg` bytes.
pub fn build(deck: &Deck) -> Result<Vec<u8>, PackagingError> {
    // The temp file handle outlives the connection and is dropped (and
    // unlinked) when this function returns, on success and on error alike.
    let staging = NamedTempFile::new()?;
    let conn = Connection::open(staging.path())?;
    write_collection(&conn, deck)?;
    conn.close().map_err(|(_, err)| err)?;

    let collection = std::fs::read(staging.path())?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("collection.anki2", options)?;
    zip.write_all(&collection)?;

    // Media manifest; this service never attaches media.
    zip.start_file("media", options)?;
    zip.write_all(b"{}")?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Populate a fresh collection database with the deck, its notes, and the
/// three fixed models.
fn write_collection(conn: &Connection, deck: &Deck) -> Result<(), PackagingError> {
    conn.execute_batch(COLLECTION_SCHEMA)?;

    let now = Utc::now();
    let now_secs = now.timestamp();
    let now_millis = now.timestamp_millis();

    conn.execute(
        "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
         VALUES (1, ?1, ?2, ?3, 11, 0, 0, 0, ?4, ?5, ?6, ?7, '{}')",
        params![
            now_secs,
            now_millis,
            now_millis,
            conf_json().to_string(),
            models_json(deck.id, now_secs).to_string(),
            decks_json(deck, now_secs).to_string(),
            dconf_json().to_string(),
        ],
    )?;

    let mut insert_note = conn.prepare(
        "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
         VALUES (?1, ?2, ?3, ?4, -1, ?5, ?6, ?7, ?8, 0, '')",
    )?;
    let mut insert_card = conn.prepare(
        "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due,
                            ivl, factor, reps, lapses, left, odue, odid, flags, data)
         VALUES (?1, ?2, ?3, ?4, ?5, -1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, '')",
    )?;

    let mut next_card_id = now_millis;
    for (pos, card) in deck.cards.iter().enumerate() {
        let note_id = now_millis + pos as i64;
        let model = model_for(card.note_type);
        let flds = card.fields.join(&FIELD_SEPARATOR.to_string());
        let sfld = card.fields.first().map(String::as_str).unwrap_or_default();

        insert_note.execute(params![
            note_id,
            note_guid(&card.fields),
            model.id,
            now_secs,
            format_tags(&card.tags),
            flds,
            sfld,
            field_checksum(sfld),
        ])?;

        for ord in card_ords(card) {
            insert_card.execute(params![next_card_id, note_id, deck.id, ord, now_secs])?;
            next_card_id += 1;
        }
    }

    Ok(())
}

/// Template ordinals to instantiate for a card: one per template for the
/// standard models, one per distinct cloze index for cloze notes (a cloze
/// note without markers still yields a single ord-0 card).
fn card_ords(card: &Card) -> Vec<i64> {
    let model = model_for(card.note_type);
    if !model.cloze {
        return (0..model.templates.len() as i64).collect();
    }

    let text = card.fields.first().map(String::as_str).unwrap_or_default();
    let indices: BTreeSet<i64> = CLOZE_INDEX_RE
        .captures_iter(text)
        .filter_map(|cap| cap[1].parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .map(|n| n - 1)
        .collect();

    if indices.is_empty() {
        vec![0]
    } else {
        indices.into_iter().collect()
    }
}

/// Anki stores tags as a single space-separated string padded with spaces.
fn format_tags(tags: &[String]) -> String {
    format!(" {} ", tags.join(" "))
}

/// Stable note guid derived from the field values, so re-importing the
/// same content updates notes instead of duplicating them.
fn note_guid(fields: &[String]) -> String {
    let digest = format!(
        "{:x}",
        Sha256::digest(fields.join(&FIELD_SEPARATOR.to_string()).as_bytes())
    );
    digest[..10].to_string()
}

/// Checksum of the sort field: first 8 hex digits (4 bytes) of its SHA-1,
/// as an integer. Anki uses it for duplicate detection.
fn field_checksum(sfld: &str) -> i64 {
    let digest = Sha1::digest(sfld.as_bytes());
    i64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

fn conf_json() -> Value {
    json!({
        "nextPos": 1,
        "estTimes": true,
        "activeDecks": [1],
        "sortType": "noteFld",
        "timeLim": 0,
        "sortBackwards": false,
        "addToCur": true,
        "curDeck": 1,
        "newBury": true,
        "newSpread": 0,
        "dueCounts": true,
        "curModel": BASIC_MODEL_ID.to_string(),
        "collapseTime": 1200,
    })
}

/// All three models keyed by id, embedded regardless of which note types
/// the deck uses.
fn models_json(deck_id: i64, mod_ts: i64) -> Value {
    let mut models = serde_json::Map::new();
    for model in ALL_MODELS {
        models.insert(model.id.to_string(), model.to_json(mod_ts, deck_id));
    }
    Value::Object(models)
}

/// The generated deck plus the default deck every collection carries.
fn decks_json(deck: &Deck, mod_ts: i64) -> Value {
    let mut decks = serde_json::Map::new();
    decks.insert("1".to_string(), deck_entry(1, "Default", 0, mod_ts));
    decks.insert(
        deck.id.to_string(),
        deck_entry(deck.id, &deck.name, -1, mod_ts),
    );
    Value::Object(decks)
}

fn deck_entry(id: i64, name: &str, usn: i64, mod_ts: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "dyn": 0,
        "conf": 1,
        "usn": usn,
        "mod": mod_ts,
        "collapsed": false,
        "extendNew": 0,
        "extendRev": 50,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
    })
}

fn dconf_json() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "usn": 0,
            "mod": 0,
            "maxTaken": 60,
            "autoplay": true,
            "replayq": true,
            "timer": 0,
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
            "lapse": {
                "delays": [10],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoteType;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use zip::ZipArchive;

    fn basic_card(front: &str, back: &str, tags: &[&str]) -> Card {
        Card {
            note_type: NoteType::Basic,
            fields: vec![front.to_string(), back.to_string()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn cloze_card(text: &str) -> Card {
        Card {
            note_type: NoteType::Cloze,
            fields: vec![text.to_string()],
            tags: vec![],
        }
    }

    /// Unzip `collection.anki2` out of the archive and open it.
    fn open_collection(bytes: &[u8]) -> (NamedTempFile, Connection) {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entry = archive.by_name("collection.anki2").unwrap();
        let mut staging = NamedTempFile::new().unwrap();
        std::io::copy(&mut entry, &mut staging).unwrap();
        let conn = Connection::open(staging.path()).unwrap();
        (staging, conn)
    }

    fn note_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap()
    }

    fn card_ords_for_note(conn: &Connection, note_pos: i64) -> Vec<i64> {
        let mut stmt = conn
            .prepare(
                "SELECT ord FROM cards
                 WHERE nid = (SELECT MIN(id) FROM notes) + ?1
                 ORDER BY ord",
            )
            .unwrap();
        stmt.query_map([note_pos], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn archive_contains_collection_and_media_manifest() {
        let deck = Deck::new(Some("My Deck"), vec![basic_card("Q", "A", &[])]);
        let bytes = build(&deck).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut media = String::new();
        archive
            .by_name("media")
            .unwrap()
            .read_to_string(&mut media)
            .unwrap();
        assert_eq!(media, "{}");
        assert!(archive.by_name("collection.anki2").is_ok());
    }

    #[test]
    fn empty_deck_builds_with_zero_notes() {
        let deck = Deck::new(None, vec![]);
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);
        assert_eq!(note_count(&conn), 0);
    }

    #[test]
    fn notes_preserve_input_order_fields_and_tags() {
        let deck = Deck::new(
            Some("My Deck"),
            vec![
                basic_card("Q1", "A1", &["Source:my-topic"]),
                basic_card("Q2", "A2", &[]),
                cloze_card("{{c1::x}}"),
            ],
        );
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);

        let mut stmt = conn
            .prepare("SELECT flds, tags, mid FROM notes ORDER BY id")
            .unwrap();
        let rows: Vec<(String, String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "Q1\u{1f}A1");
        assert_eq!(rows[0].1, " Source:my-topic ");
        assert_eq!(rows[0].2, crate::models::BASIC_MODEL_ID);
        assert_eq!(rows[1].0, "Q2\u{1f}A2");
        assert_eq!(rows[2].0, "{{c1::x}}");
        assert_eq!(rows[2].2, crate::models::CLOZE_MODEL_ID);
    }

    #[test]
    fn reverse_note_yields_two_cards() {
        let deck = Deck::new(
            None,
            vec![Card {
                note_type: NoteType::BasicAndReverse,
                fields: vec!["Q".to_string(), "A".to_string()],
                tags: vec![],
            }],
        );
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);
        assert_eq!(card_ords_for_note(&conn, 0), vec![0, 1]);
    }

    #[test]
    fn cloze_note_yields_one_card_per_distinct_deletion() {
        let deck = Deck::new(
            None,
            vec![
                cloze_card("{{c1::a}} and {{c2::b}}"),
                cloze_card("{{c2::only}}"),
                cloze_card("{{c1::x}} {{c1::y}}"),
                cloze_card("no markers"),
            ],
        );
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);

        assert_eq!(card_ords_for_note(&conn, 0), vec![0, 1]);
        assert_eq!(card_ords_for_note(&conn, 1), vec![1]);
        assert_eq!(card_ords_for_note(&conn, 2), vec![0]);
        assert_eq!(card_ords_for_note(&conn, 3), vec![0]);
    }

    #[test]
    fn cards_belong_to_the_derived_deck() {
        let deck = Deck::new(Some("My Deck"), vec![basic_card("Q", "A", &[])]);
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);

        let did: i64 = conn
            .query_row("SELECT did FROM cards LIMIT 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(did, crate::types::deck_id("My Deck"));
    }

    #[test]
    fn collection_embeds_all_three_models_even_when_unused() {
        let deck = Deck::new(None, vec![basic_card("Q", "A", &[])]);
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);

        let models_raw: String = conn
            .query_row("SELECT models FROM col", [], |row| row.get(0))
            .unwrap();
        let models: Value = serde_json::from_str(&models_raw).unwrap();
        assert_eq!(models.as_object().unwrap().len(), 3);
        for model in ALL_MODELS {
            let key = model.id.to_string();
            assert_eq!(models[&key]["name"], model.name);
        }
    }

    #[test]
    fn collection_declares_deck_and_default_deck() {
        let deck = Deck::new(Some("My Deck"), vec![]);
        let bytes = build(&deck).unwrap();
        let (_staging, conn) = open_collection(&bytes);

        let decks_raw: String = conn
            .query_row("SELECT decks FROM col", [], |row| row.get(0))
            .unwrap();
        let decks: Value = serde_json::from_str(&decks_raw).unwrap();
        let key = deck.id.to_string();
        assert_eq!(decks["1"]["name"], "Default");
        assert_eq!(decks[&key]["name"], "My Deck");
    }

    #[test]
    fn note_guid_is_stable_and_field_sensitive() {
        let a = vec!["Q".to_string(), "A".to_string()];
        let b = vec!["Q".to_string(), "B".to_string()];
        assert_eq!(note_guid(&a), note_guid(&a));
        assert_ne!(note_guid(&a), note_guid(&b));
    }

    #[test]
    fn field_checksum_matches_sha1_prefix() {
        // First 8 hex digits of sha1("Q").
        assert_eq!(field_checksum("Q"), 0xc3156e00);
    }

    #[test]
    fn empty_tag_list_is_padded_spaces() {
        assert_eq!(format_tags(&[]), "  ");
        assert_eq!(
            format_tags(&["a".to_string(), "b".to_string()]),
            " a b "
        );
    }
}
