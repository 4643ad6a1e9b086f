//! Search Module
//!
//! A small inverted index kept inside the store itself.
//!
//! Each term's posting list is a JSON array of document ids stored under
//! `search_index:<term>`. Reads and writes go through the normal engine API,
//! so posting lists rotate, tombstone and survive restarts like any other
//! value. Updates are read-modify-write and are not atomic across callers;
//! serialize indexing of the same term externally if that matters.

use std::collections::{BTreeSet, HashSet};

use serde_json::Value;

use crate::engine::StorageEngine;
use crate::error::Result;

/// Key prefix under which posting lists are stored
pub const INDEX_PREFIX: &str = "search_index:";

/// Full-text index over documents with string fields
pub struct SearchIndex<'a> {
    engine: &'a StorageEngine,
}

impl<'a> SearchIndex<'a> {
    pub fn new(engine: &'a StorageEngine) -> Self {
        Self { engine }
    }

    /// Lowercased runs of ASCII letters and digits; everything else separates
    pub fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_ascii_lowercase)
            .collect()
    }

    /// Add `doc_id` to the posting list of every term in its string fields
    ///
    /// Only top-level string values of an object are indexed; other value
    /// kinds are skipped.
    pub fn index_document(&self, doc_id: &str, fields: &Value) -> Result<()> {
        let terms: BTreeSet<String> = fields
            .as_object()
            .into_iter()
            .flat_map(|object| object.values())
            .filter_map(Value::as_str)
            .flat_map(Self::tokenize)
            .collect();

        for term in &terms {
            let mut postings = self.postings(term)?.unwrap_or_default();
            if !postings.iter().any(|id| id == doc_id) {
                postings.push(doc_id.to_string());
                self.store_postings(term, &postings)?;
            }
        }

        tracing::debug!(doc_id, terms = terms.len(), "document indexed");
        Ok(())
    }

    /// Ids of the documents containing every term of `query`, sorted
    ///
    /// A query without terms matches nothing.
    pub fn search(&self, query: &str) -> Result<Vec<String>> {
        let mut matches: Option<HashSet<String>> = None;

        for term in Self::tokenize(query) {
            let Some(postings) = self.postings(&term)? else {
                return Ok(Vec::new());
            };
            let docs: HashSet<String> = postings.into_iter().collect();

            let narrowed = match matches {
                None => docs,
                Some(current) => current.intersection(&docs).cloned().collect(),
            };
            if narrowed.is_empty() {
                return Ok(Vec::new());
            }
            matches = Some(narrowed);
        }

        let mut ids: Vec<String> = matches.unwrap_or_default().into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Drop `doc_id` from every posting list, erasing lists left empty
    ///
    /// Walks the whole store, so its cost grows with the total data size.
    pub fn remove_document(&self, doc_id: &str) -> Result<()> {
        let mut touched = 0usize;

        for (key, value) in self.engine.get_all()? {
            if !key.starts_with(INDEX_PREFIX.as_bytes()) {
                continue;
            }

            let mut postings: Vec<String> = serde_json::from_slice(&value)?;
            let before = postings.len();
            postings.retain(|id| id != doc_id);
            if postings.len() == before {
                continue;
            }

            if postings.is_empty() {
                self.engine.erase(&key)?;
            } else {
                self.engine.put(&key, &serde_json::to_vec(&postings)?)?;
            }
            touched += 1;
        }

        tracing::debug!(doc_id, terms = touched, "document removed from index");
        Ok(())
    }

    fn term_key(term: &str) -> Vec<u8> {
        format!("{}{}", INDEX_PREFIX, term).into_bytes()
    }

    fn postings(&self, term: &str) -> Result<Option<Vec<String>>> {
        match self.engine.get(&Self::term_key(term)) {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn store_postings(&self, term: &str, postings: &[String]) -> Result<()> {
        self.engine
            .put(&Self::term_key(term), &serde_json::to_vec(postings)?)
    }
}
