use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::CorpusError;

pub type DocId = i64;

/// A candidate identifier as handed in by the caller.
///
/// Identifiers arrive either as integers or as their string form; both
/// coerce to a [`DocId`] before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateId {
    Int(DocId),
    Text(String),
}

impl CandidateId {
    pub fn to_doc_id(&self) -> Result<DocId, CorpusError> {
        match self {
            Self::Int(id) => Ok(*id),
            Self::Text(raw) => raw
                .trim()
                .parse::<DocId>()
                .map_err(|_| CorpusError::InvalidIdentifier(raw.clone())),
        }
    }
}

impl From<DocId> for CandidateId {
    fn from(id: DocId) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for CandidateId {
    fn from(id: i32) -> Self {
        Self::Int(DocId::from(id))
    }
}

impl From<u32> for CandidateId {
    fn from(id: u32) -> Self {
        Self::Int(DocId::from(id))
    }
}

impl From<&str> for CandidateId {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(raw: String) -> Self {
        Self::Text(raw)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCandidate<'a> {
    pub id: DocId,
    pub text: &'a str,
}

/// Read-only mapping from document id to document text.
///
/// Iteration is in ascending id order, so "first matching key" lookups are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    docs: BTreeMap<DocId, String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: DocId, text: impl Into<String>) -> Option<String> {
        self.docs.insert(id, text.into())
    }

    pub fn get(&self, id: DocId) -> Option<&str> {
        self.docs.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.docs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &str)> {
        self.docs.iter().map(|(id, text)| (*id, text.as_str()))
    }

    /// Resolves candidates to their texts, preserving candidate order and
    /// duplicates. Fails on the first identifier that cannot be coerced or
    /// is absent from the corpus.
    pub fn resolve<'a>(
        &'a self,
        candidates: &[CandidateId],
    ) -> Result<Vec<ResolvedCandidate<'a>>, CorpusError> {
        candidates
            .iter()
            .map(|candidate| {
                let id = candidate.to_doc_id()?;
                let text = self.get(id).ok_or(CorpusError::MissingEntry(id))?;
                Ok(ResolvedCandidate { id, text })
            })
            .collect()
    }

    /// First id (in iteration order) whose text equals `text` exactly.
    pub fn find_by_text(&self, text: &str) -> Option<DocId> {
        self.iter()
            .find(|(_, value)| *value == text)
            .map(|(id, _)| id)
    }
}

impl<S: Into<String>> FromIterator<(DocId, S)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (DocId, S)>>(iter: I) -> Self {
        Self {
            docs: iter
                .into_iter()
                .map(|(id, text)| (id, text.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<DocId, String>> for Corpus {
    fn from(docs: BTreeMap<DocId, String>) -> Self {
        Self { docs }
    }
}

impl From<HashMap<DocId, String>> for Corpus {
    fn from(docs: HashMap<DocId, String>) -> Self {
        docs.into_iter().collect()
    }
}
