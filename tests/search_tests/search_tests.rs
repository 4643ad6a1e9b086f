//! Tests for SearchIndex
//!
//! These tests verify:
//! - Tokenization rules
//! - Indexing string fields into posting lists stored in the engine
//! - Multi-term intersection queries
//! - Document removal

use segkv::search::{SearchIndex, INDEX_PREFIX};
use segkv::{Config, StorageEngine};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, StorageEngine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .segment_size(4096)
        .build();
    (temp_dir, StorageEngine::open(config).unwrap())
}

fn postings(engine: &StorageEngine, term: &str) -> Option<Vec<String>> {
    engine
        .get(format!("{}{}", INDEX_PREFIX, term).as_bytes())
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
}

// =============================================================================
// Tokenization
// =============================================================================

#[test]
fn test_tokenize_lowercases_and_splits() {
    assert_eq!(
        SearchIndex::tokenize("Hello, World! rust2024 is-fun"),
        vec!["hello", "world", "rust2024", "is", "fun"]
    );
}

#[test]
fn test_tokenize_empty_and_punctuation_only() {
    assert!(SearchIndex::tokenize("").is_empty());
    assert!(SearchIndex::tokenize("  ...!!  ").is_empty());
}

#[test]
fn test_tokenize_non_ascii_is_separator() {
    assert_eq!(SearchIndex::tokenize("café au lait"), vec!["caf", "au", "lait"]);
}

// =============================================================================
// Indexing & Search
// =============================================================================

#[test]
fn test_index_document_writes_posting_lists() {
    let (_temp, engine) = setup_temp_engine();
    let index = SearchIndex::new(&engine);

    index
        .index_document("doc1", &json!({"title": "Rust Storage", "body": "storage engines"}))
        .unwrap();

    assert_eq!(postings(&engine, "rust"), Some(vec!["doc1".to_string()]));
    assert_eq!(postings(&engine, "storage"), Some(vec!["doc1".to_string()]));
    assert_eq!(postings(&engine, "engines"), Some(vec!["doc1".to_string()]));
}

#[test]
fn test_non_string_fields_are_skipped() {
    let (_temp, engine) = setup_temp_engine();
    let index = SearchIndex::new(&engine);

    index
        .index_document("doc1", &json!({"views": 42, "tags": ["hidden"], "title": "shown"}))
        .unwrap();

    assert!(postings(&engine, "42").is_none());
    assert!(postings(&engine, "hidden").is_none());
    assert!(postings(&engine, "shown").is_some());
}

#[test]
fn test_reindexing_does_not_duplicate_ids() {
    let (_temp, engine) = setup_temp_engine();
    let index = SearchIndex::new(&engine);

    let doc = json!({"title": "same words"});
    index.index_document("doc1", &doc).unwrap();
    index.index_document("doc1", &doc).unwrap();

    assert_eq!(postings(&engine, "same"), Some(vec!["doc1".to_string()]));
}

#[test]
fn test_search_intersects_terms() {
    let (_temp, engine) = setup_temp_engine();
    let index = SearchIndex::new(&engine);

    index.index_document("a", &json!({"text": "fast key value store"})).unwrap();
    index.index_document("b", &json!({"text": "slow key value store"})).unwrap();
    index.index_document("c", &json!({"text": "fast cars"})).unwrap();

    assert_eq!(index.search("key value").unwrap(), vec!["a", "b"]);
    assert_eq!(index.search("FAST store").unwrap(), vec!["a"]);
    assert_eq!(index.search("fast").unwrap(), vec!["a", "c"]);
}

#[test]
fn test_search_missing_term_matches_nothing() {
    let (_temp, engine) = setup_temp_engine();
    let index = SearchIndex::new(&engine);
    index.index_document("a", &json!({"text": "hello world"})).unwrap();

    assert!(index.search("hello nowhere").unwrap().is_empty());
    assert!(index.search("").unwrap().is_empty());
    assert!(index.search("!!!").unwrap().is_empty());
}

// =============================================================================
// Removal
// =============================================================================

#[test]
fn test_remove_document() {
    let (_temp, engine) = setup_temp_engine();
    let index = SearchIndex::new(&engine);

    index.index_document("a", &json!({"text": "shared only_a"})).unwrap();
    index.index_document("b", &json!({"text": "shared"})).unwrap();

    index.remove_document("a").unwrap();

    assert_eq!(index.search("shared").unwrap(), vec!["b"]);
    assert!(index.search("only").unwrap().is_empty());
    // emptied posting lists are erased, not left as "[]"
    assert!(postings(&engine, "only").is_none());
}

#[test]
fn test_remove_document_leaves_other_keys_alone() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"user:1", b"not a posting list").unwrap();

    let index = SearchIndex::new(&engine);
    index.index_document("a", &json!({"text": "word"})).unwrap();
    index.remove_document("a").unwrap();

    assert_eq!(engine.get(b"user:1"), Some(b"not a posting list".to_vec()));
}

#[test]
fn test_index_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let engine = StorageEngine::open_path(temp.path()).unwrap();
        SearchIndex::new(&engine)
            .index_document("doc", &json!({"title": "persistent terms"}))
            .unwrap();
        engine.close().unwrap();
    }

    let engine = StorageEngine::open_path(temp.path()).unwrap();
    assert_eq!(SearchIndex::new(&engine).search("persistent").unwrap(), vec!["doc"]);
}
