use thiserror::Error;

use crate::corpus::DocId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorpusError {
    #[error("missing corpus entry for document id {0}")]
    MissingEntry(DocId),

    #[error("invalid document identifier: {0:?}")]
    InvalidIdentifier(String),
}
